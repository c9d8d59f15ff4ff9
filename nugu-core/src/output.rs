//! Output Router: where the engine's primary output channel goes for each [`OutputMode`].

use std::path::Path;
use std::process::Stdio;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{NuguError, Result};
use crate::options::OutputMode;

/// Live output inherits the caller's stdout; the other modes need a pipe.
pub fn stdout_stdio(mode: &OutputMode) -> Stdio {
    match mode {
        OutputMode::Live => Stdio::inherit(),
        OutputMode::File(_) | OutputMode::Buffered => Stdio::piped(),
    }
}

/// Opens the file-mode destination. Done before spawning so a bad path never
/// leaves an engine running with nowhere to write.
pub async fn open_sink(path: &Path) -> Result<File> {
    File::create(path).await.map_err(|e| {
        error!(error = ?e, path = %path.display(), "Failed to create output file");
        NuguError::from(e)
    })
}

/// Accumulates the channel until it closes and returns the bytes in arrival order.
pub async fn collect<R: AsyncRead + Unpin>(mut reader: R) -> std::io::Result<Vec<u8>> {
    let mut output = Vec::new();
    reader.read_to_end(&mut output).await?;
    debug!(bytes = output.len(), "Output channel closed");
    Ok(output)
}

pub fn spawn_file_sink<R>(mut reader: R, mut file: File, path: &Path) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let path = path.to_path_buf();
    tokio::spawn(async move {
        let copied = async {
            let bytes = tokio::io::copy(&mut reader, &mut file).await?;
            file.flush().await?;
            Ok::<_, std::io::Error>(bytes)
        }
        .await;
        match copied {
            Ok(bytes) => info!(path = %path.display(), bytes, "Output written to file"),
            Err(e) => error!(error = ?e, path = %path.display(), "Failed writing output file"),
        }
    })
}
