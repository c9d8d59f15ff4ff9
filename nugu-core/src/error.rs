use thiserror::Error;

/// Every failure a posting job can surface to its caller.
///
/// Listing and probe failures happen before the engine is spawned, so a job that
/// fails with either of them never leaves a half-started subprocess behind.
#[derive(Error, Debug)]
pub enum NuguError {
    #[error("listing {source_path} failed: {reason}")]
    Listing { source_path: String, reason: String },

    #[error("archive size probe failed: {0}")]
    ArchiveProbe(String),

    #[error("could not start posting engine `{program}`: {error}")]
    EngineSpawn {
        program: String,
        #[source]
        error: std::io::Error,
    },

    #[error("posting engine exited abnormally (code: {code:?})")]
    EngineExitAbnormal { code: Option<i32> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NuguError {
    pub(crate) fn listing(source_path: &str, reason: impl Into<String>) -> Self {
        NuguError::Listing {
            source_path: source_path.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NuguError>;
