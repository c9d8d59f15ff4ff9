//! Manifest Builder: turns a source path into the virtual file list the posting
//! engine reads on stdin.
//!
//! Each line is a `procjson://` descriptor carrying a name, a byte size, and a shell
//! command the engine runs itself to stream that file's bytes. Nothing is
//! materialised on local disk.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, error, info};

use crate::contract::{ArchiveProbe, FileEntry, Lister};
use crate::error::Result;
use crate::options::FileNaming;

pub const PROCJSON_SCHEME: &str = "procjson://";

/// Recovers the listing root by stripping the entry's relative path off the end of
/// `source`, then rejoins it with that relative path.
///
/// Works whether `source` named a single file (`remote:dir/a.txt` + `a.txt`) or a
/// directory (`remote:dir` + `sub/a.txt`).
pub fn resolve_locator(source: &str, relative: &str) -> String {
    let root = source
        .strip_suffix(relative)
        .filter(|root| root.is_empty() || root.ends_with('/') || root.ends_with(':'))
        .unwrap_or(source);
    if root.is_empty() || root.ends_with('/') || root.ends_with(':') {
        format!("{root}{relative}")
    } else {
        format!("{root}/{relative}")
    }
}

/// POSIX single-quote escaping.
pub fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Last path component of a local path or `remote:path` spec.
pub fn source_basename(source: &str) -> &str {
    let trimmed = source.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((_, base)) => base,
        None => match trimmed.split_once(':') {
            Some((remote, "")) => remote,
            Some((_, rest)) => rest,
            None => trimmed,
        },
    }
}

/// Builds the commands the posting engine runs to fetch bytes.
#[derive(Debug, Clone)]
pub struct FetchCommands {
    /// Program that can `cat` a remote path and `archive` a source to stdout.
    pub program: String,
}

impl Default for FetchCommands {
    fn default() -> Self {
        Self {
            program: "rclone".to_string(),
        }
    }
}

impl FetchCommands {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn cat(&self, entry: &FileEntry) -> String {
        format!("{} cat {}", self.program, shell_quote(&entry.absolute_path))
    }

    pub fn archive(&self, source: &str) -> String {
        format!("{} archive -- {} -", self.program, shell_quote(source))
    }
}

/// One virtual file: `procjson://"<name>",<size>,"<fetch-command>"`.
///
/// Name and command are JSON string literals, so quotes inside them stay escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestLine {
    pub name: String,
    pub size: u64,
    pub command: String,
}

impl fmt::Display for ManifestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = serde_json::to_string(&self.name).map_err(|_| fmt::Error)?;
        let command = serde_json::to_string(&self.command).map_err(|_| fmt::Error)?;
        write!(f, "{PROCJSON_SCHEME}{name},{},{command}", self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseManifestLineError(pub String);

impl fmt::Display for ParseManifestLineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid manifest line: {}", self.0)
    }
}

impl std::error::Error for ParseManifestLineError {}

impl FromStr for ManifestLine {
    type Err = ParseManifestLineError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let body = s
            .strip_prefix(PROCJSON_SCHEME)
            .ok_or_else(|| ParseManifestLineError(format!("missing {PROCJSON_SCHEME} scheme")))?;
        let (name, size, command): (String, u64, String) =
            serde_json::from_str(&format!("[{body}]"))
                .map_err(|e| ParseManifestLineError(e.to_string()))?;
        Ok(ManifestLine {
            name,
            size,
            command,
        })
    }
}

/// The full virtual file list for one job, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub lines: Vec<ManifestLine>,
}

impl Manifest {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total declared bytes across all lines.
    pub fn total_size(&self) -> u64 {
        self.lines.iter().map(|l| l.size).sum()
    }

    pub fn extend(&mut self, other: Manifest) {
        self.lines.extend(other.lines);
    }

    /// Newline-joined text written to the engine's stdin.
    pub fn to_text(&self) -> String {
        self.lines
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Lists a source and renders its manifest, optionally collapsing it into one archive entry.
pub struct ManifestBuilder<'a, L: Lister, A: ArchiveProbe> {
    lister: &'a L,
    archiver: &'a A,
    fetch: &'a FetchCommands,
}

impl<'a, L: Lister, A: ArchiveProbe> ManifestBuilder<'a, L, A> {
    pub fn new(lister: &'a L, archiver: &'a A, fetch: &'a FetchCommands) -> Self {
        Self {
            lister,
            archiver,
            fetch,
        }
    }

    pub async fn build(&self, source: &str, naming: &FileNaming, archive: bool) -> Result<Manifest> {
        info!(source = %source, archive, "Listing source");
        let files = self.lister.list(source).await.map_err(|e| {
            error!(source = %source, error = %e, "Listing failed");
            e
        })?;
        info!(source = %source, files = files.len(), "Source listed");

        if archive {
            let bundle = self.archiver.probe(source, &files).await.map_err(|e| {
                error!(source = %source, error = %e, "Archive size probe failed");
                e
            })?;
            let line = ManifestLine {
                name: naming.name_for(&bundle),
                size: bundle.size,
                command: self.fetch.archive(source),
            };
            info!(name = %line.name, size = line.size, "Manifest collapsed into one archive entry");
            return Ok(Manifest { lines: vec![line] });
        }

        let lines = files
            .iter()
            .map(|file| {
                let line = ManifestLine {
                    name: naming.name_for(file),
                    size: file.size,
                    command: self.fetch.cat(file),
                };
                debug!(path = %file.path, name = %line.name, size = line.size, "Manifest line");
                line
            })
            .collect();
        Ok(Manifest { lines })
    }
}
