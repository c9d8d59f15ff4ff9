//! # contract: seams between the posting pipeline and its external collaborators
//!
//! The pipeline never touches remote storage itself. It asks a [`Lister`] what files
//! exist under a source path and, in archive mode, asks an [`ArchiveProbe`] how large
//! the bundled archive would be. Both traits are async and annotated for `mockall`
//! so tests can stand in for `rclone` without a network or a configured remote.
//!
//! [`FileEntry`] is the plain data that flows across both seams.

use std::collections::BTreeMap;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One input file, as reported by a listing of the source path.
///
/// Field names on the wire follow `rclone lsjson` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileEntry {
    /// Path relative to the listed source, unique within one listing.
    pub path: String,
    /// Base name of the file; the default name it is posted under.
    pub name: String,
    /// Size in bytes. The posting engine trusts this value.
    pub size: u64,
    /// Backend object ID. Not set for local files.
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Content hashes keyed by algorithm. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashes: Option<BTreeMap<String, String>>,
    /// Location the fetch command reads from, resolved against the source path.
    #[serde(default)]
    pub absolute_path: String,
}

/// Enumerates the files below a source path (recursive, files only).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Lister: Send + Sync {
    /// List every file under `source` in a stable order, with absolute paths resolved.
    async fn list(&self, source: &str) -> Result<Vec<FileEntry>>;
}

/// Simulates archiving a whole listing to learn the archive's exact size.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ArchiveProbe: Send + Sync {
    /// Returns one synthetic entry standing for the archive of `files` taken from `source`.
    /// No file bytes are read.
    async fn probe(&self, source: &str, files: &[FileEntry]) -> Result<FileEntry>;
}
