//! `rclone lsjson` backed [`Lister`].

use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::contract::{FileEntry, Lister};
use crate::error::{NuguError, Result};
use crate::manifest::resolve_locator;

/// Lists local or remote paths by running `rclone lsjson`.
#[derive(Debug, Clone)]
pub struct RcloneLister {
    program: String,
}

impl RcloneLister {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for RcloneLister {
    fn default() -> Self {
        Self::new("rclone")
    }
}

#[async_trait]
impl Lister for RcloneLister {
    async fn list(&self, source: &str) -> Result<Vec<FileEntry>> {
        debug!(program = %self.program, source = %source, "Running lsjson");
        let output = Command::new(&self.program)
            .arg("lsjson")
            .arg("--recursive")
            .arg("--files-only")
            .arg("--no-mimetype")
            .arg(source)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                error!(error = ?e, program = %self.program, "Failed to launch lister");
                NuguError::listing(source, format!("failed to launch {}: {e}", self.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(
                source = %source,
                status = ?output.status,
                "Lister exited with non-zero code: {}", stderr.trim()
            );
            return Err(NuguError::listing(
                source,
                format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            ));
        }

        let entries = parse_listing(source, &output.stdout)?;
        info!(source = %source, files = entries.len(), "lsjson listing parsed");
        Ok(entries)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawEntry {
    path: String,
    name: String,
    size: i64,
    #[serde(default)]
    is_dir: bool,
    #[serde(rename = "ID", default)]
    id: Option<String>,
    #[serde(default)]
    hashes: Option<std::collections::BTreeMap<String, String>>,
}

/// Parses `lsjson` output for `source`, dropping directories and resolving absolute paths.
///
/// An entry with an unknown (negative) size fails the whole listing: the engine
/// would trust whatever size the manifest declares.
pub fn parse_listing(source: &str, json: &[u8]) -> Result<Vec<FileEntry>> {
    let raw: Vec<RawEntry> = serde_json::from_slice(json)
        .map_err(|e| NuguError::listing(source, format!("malformed lsjson output: {e}")))?;

    raw.into_iter()
        .filter(|entry| !entry.is_dir)
        .map(|entry| {
            let size = u64::try_from(entry.size).map_err(|_| {
                NuguError::listing(
                    source,
                    format!("size of {} is unknown ({})", entry.path, entry.size),
                )
            })?;
            Ok(FileEntry {
                absolute_path: resolve_locator(source, &entry.path),
                path: entry.path,
                name: entry.name,
                size,
                id: entry.id,
                hashes: entry.hashes,
            })
        })
        .collect()
}
