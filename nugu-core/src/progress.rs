//! Progress Decoder: best-effort structured decoding of the posting engine's
//! human-readable diagnostic log.
//!
//! Only two line shapes carry progress. Anything else, including malformed numbers,
//! is skipped without error. The scraping lives behind [`ProgressDecoder`] so a
//! structured-output decoder can replace it without touching the supervisor.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, trace, warn};

use crate::options::ProgressObserver;

// e.g. "Uploading 4137 article(s) from 1 file(s) totalling 2827.49 MiB."
static UPLOAD_INFO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Uploading (?P<articles>\d+) article\(s\) from (?P<files>\d+) file\(s\) totalling (?P<total_size>\d+(?:\.\d+)? [KMG]iB)",
    )
    .unwrap()
});

// e.g. "Article posting progress: 100 read, 98 posted, 95 checked"
static POSTING_PROGRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Article posting progress: (?P<read>\d+) read, (?P<posted>\d+) posted(?:, (?P<checked>\d+) checked)?",
    )
    .unwrap()
});

static LEVEL_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\W+\s+").unwrap());

/// Cumulative progress of one job. Fields only move when a log line reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub files: u64,
    pub articles: u64,
    /// Size as the engine prints it, unit included (`2827.49 MiB`).
    pub total_size: Option<String>,
    pub read: u64,
    pub posted: u64,
    pub checked: u64,
}

pub trait ProgressDecoder: Send {
    /// Folds one diagnostic line into the record. Returns the updated snapshot when the
    /// line carried progress, `None` when it was skipped.
    fn decode_line(&mut self, line: &str) -> Option<&ProgressRecord>;

    fn record(&self) -> &ProgressRecord;
}

/// Regex scraper for the engine's log format.
#[derive(Debug, Default)]
pub struct LogScraper {
    record: ProgressRecord,
}

impl LogScraper {
    pub fn new() -> Self {
        Self::default()
    }
}

fn overwrite(field: &mut u64, caps: &Captures<'_>, name: &str) {
    if let Some(value) = caps.name(name).and_then(|m| m.as_str().parse().ok()) {
        *field = value;
    }
}

impl ProgressDecoder for LogScraper {
    fn decode_line(&mut self, line: &str) -> Option<&ProgressRecord> {
        let line = LEVEL_PREFIX.replace(line, "");

        if let Some(caps) = UPLOAD_INFO.captures(&line) {
            overwrite(&mut self.record.articles, &caps, "articles");
            overwrite(&mut self.record.files, &caps, "files");
            if let Some(size) = caps.name("total_size") {
                self.record.total_size = Some(size.as_str().to_string());
            }
            debug!(record = ?self.record, "Upload summary decoded");
        } else if let Some(caps) = POSTING_PROGRESS.captures(&line) {
            overwrite(&mut self.record.read, &caps, "read");
            overwrite(&mut self.record.posted, &caps, "posted");
            overwrite(&mut self.record.checked, &caps, "checked");
            trace!(record = ?self.record, "Posting progress decoded");
        } else {
            return None;
        }
        Some(&self.record)
    }

    fn record(&self) -> &ProgressRecord {
        &self.record
    }
}

/// Reads a diagnostic stream line by line: every raw line is forwarded to `mirror`
/// unchanged, and lines that carry progress are handed to `observer` as the latest
/// cumulative snapshot. Returns the final record once the stream closes.
///
/// A failing mirror is logged once and dropped; only a read error ends the tap.
pub async fn tap_diagnostics<R, W, D>(
    reader: R,
    mut mirror: W,
    mut decoder: D,
    mut observer: ProgressObserver,
) -> std::io::Result<ProgressRecord>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    D: ProgressDecoder,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut mirroring = true;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        if mirroring {
            let mirrored = async {
                mirror.write_all(&buf).await?;
                mirror.flush().await
            }
            .await;
            // The engine's stderr must keep draining even when ours is gone.
            if let Err(e) = mirrored {
                warn!(error = ?e, "Diagnostic mirror closed, decoding continues unmirrored");
                mirroring = false;
            }
        }

        let line = String::from_utf8_lossy(&buf);
        if let Some(record) = decoder.decode_line(line.trim_end_matches(['\r', '\n'])) {
            observer(record);
        }
    }
    Ok(decoder.record().clone())
}
