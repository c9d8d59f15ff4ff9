//! Dry-run archive sizing for archive mode.
//!
//! The archive itself is produced later by the fetch command the engine runs. Here we
//! only need its exact byte length, which for a tar stream follows from the names and
//! sizes alone.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::contract::{ArchiveProbe, FileEntry};
use crate::error::{NuguError, Result};
use crate::manifest::source_basename;

const BLOCK: u64 = 512;
/// Default blocking factor of 20 blocks.
const RECORD: u64 = BLOCK * 20;
/// Longest name a plain ustar header holds before a GNU long-name header is needed.
const MAX_HEADER_NAME: usize = 100;

fn padded(len: u64) -> u64 {
    len.div_ceil(BLOCK) * BLOCK
}

/// Sizes a tar archive of the listing without reading any file contents.
#[derive(Debug, Clone, Default)]
pub struct TarProbe;

impl TarProbe {
    /// Bytes one member occupies: header, optional long-name record, padded data.
    pub fn member_size(entry: &FileEntry) -> u64 {
        let name_len = entry.path.len();
        let long_name = if name_len > MAX_HEADER_NAME {
            BLOCK + padded(name_len as u64 + 1)
        } else {
            0
        };
        long_name + BLOCK + padded(entry.size)
    }

    pub fn archive_size(files: &[FileEntry]) -> u64 {
        let body: u64 = files.iter().map(Self::member_size).sum();
        // Two zero blocks terminate the archive; the total is padded to whole records.
        (body + 2 * BLOCK).div_ceil(RECORD) * RECORD
    }
}

#[async_trait]
impl ArchiveProbe for TarProbe {
    async fn probe(&self, source: &str, files: &[FileEntry]) -> Result<FileEntry> {
        if files.is_empty() {
            return Err(NuguError::ArchiveProbe(format!(
                "{source} has no files to archive"
            )));
        }
        let size = Self::archive_size(files);
        let name = format!("{}.tar", source_basename(source));
        debug!(source = %source, members = files.len(), "Simulated tar archive");
        info!(name = %name, size, "Archive size probed");
        Ok(FileEntry {
            path: name.clone(),
            name,
            size,
            id: None,
            hashes: None,
            absolute_path: source.to_string(),
        })
    }
}
