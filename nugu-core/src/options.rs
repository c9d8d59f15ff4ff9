//! Job options: the ordered option map forwarded to the posting engine, plus the
//! typed fields (naming, progress observer, output mode) that never reach its argv.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Defaults;
use crate::contract::FileEntry;
use crate::progress::ProgressRecord;

/// A single option value. Booleans are presence-only flags on the engine's command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl OptionValue {
    pub fn is_bool(&self) -> bool {
        matches!(self, OptionValue::Bool(_))
    }

    /// Falsy values are `false`, `0`, and the empty string.
    pub fn is_truthy(&self) -> bool {
        match self {
            OptionValue::Bool(b) => *b,
            OptionValue::Int(n) => *n != 0,
            OptionValue::Float(f) => *f != 0.0,
            OptionValue::Text(s) => !s.is_empty(),
        }
    }

    /// Integer reading of the value; text is parsed, so `"563"` and `563` agree.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(n) => Some(*n),
            OptionValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            OptionValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Int(n) => write!(f, "{n}"),
            OptionValue::Float(x) => write!(f, "{x}"),
            OptionValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

impl From<i64> for OptionValue {
    fn from(n: i64) -> Self {
        OptionValue::Int(n)
    }
}

impl From<i32> for OptionValue {
    fn from(n: i32) -> Self {
        OptionValue::Int(n.into())
    }
}

impl From<f64> for OptionValue {
    fn from(x: f64) -> Self {
        OptionValue::Float(x)
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Text(s.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::Text(s)
    }
}

/// Insertion-ordered option map. Setting an existing key replaces its value in place,
/// so merged maps keep the position the key first appeared at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionMap {
    entries: Vec<(String, OptionValue)>,
}

impl OptionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Layers `other` over `self`: its values win, existing keys keep their position.
    pub fn merge(&mut self, other: &OptionMap) {
        for (key, value) in other.iter() {
            self.set(key, value.clone());
        }
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for OptionMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = OptionMap::new();
        map.extend(iter);
        map
    }
}

impl<K: Into<String>, V: Into<OptionValue>> Extend<(K, V)> for OptionMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

pub type Namer = Arc<dyn Fn(&FileEntry) -> String + Send + Sync>;
pub type ProgressObserver = Box<dyn FnMut(&ProgressRecord) + Send>;

/// How each manifest entry is named on the posting side.
#[derive(Clone, Default)]
pub enum FileNaming {
    /// Use the entry's own `Name`.
    #[default]
    Original,
    /// Every entry gets the same name.
    Fixed(String),
    Custom(Namer),
}

impl FileNaming {
    pub fn custom(f: impl Fn(&FileEntry) -> String + Send + Sync + 'static) -> Self {
        FileNaming::Custom(Arc::new(f))
    }

    pub fn name_for(&self, entry: &FileEntry) -> String {
        match self {
            FileNaming::Original => entry.name.clone(),
            FileNaming::Fixed(name) => name.clone(),
            FileNaming::Custom(f) => f(entry),
        }
    }
}

impl fmt::Debug for FileNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileNaming::Original => f.write_str("Original"),
            FileNaming::Fixed(name) => f.debug_tuple("Fixed").field(name).finish(),
            FileNaming::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Where the engine's primary output ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// `out = "-"`: inherit the caller's stdout.
    Live,
    /// `out = <path>`: stream into a file.
    File(PathBuf),
    /// `out` absent or falsy: collect everything and return it once the channel closes.
    Buffered,
}

impl OutputMode {
    pub fn from_option(value: Option<&OptionValue>) -> Self {
        match value {
            Some(v) if v.is_truthy() && !v.is_bool() => match v.to_string().as_str() {
                "-" => OutputMode::Live,
                path => OutputMode::File(PathBuf::from(path)),
            },
            _ => OutputMode::Buffered,
        }
    }
}

pub const OUT_KEY: &str = "out";
pub const ARCHIVE_KEY: &str = "archive";
pub const FILENAME_KEY: &str = "filename";
pub const PROGRESS_KEY: &str = "progress";
pub const INPUT_FILE_KEY: &str = "input-file";

/// Engine progress setting that routes progress lines into the diagnostic log.
pub const LOG_PROGRESS: &str = "log:2s";

/// Everything one job is configured with.
#[derive(Default)]
pub struct JobOptions {
    pub values: OptionMap,
    pub naming: FileNaming,
    pub progress: Option<ProgressObserver>,
}

impl JobOptions {
    /// Merges caller overrides over the injected defaults. Overrides win.
    pub fn new(defaults: &Defaults, overrides: OptionMap) -> Self {
        let mut values = defaults.options().clone();
        values.merge(&overrides);
        Self {
            values,
            naming: FileNaming::default(),
            progress: None,
        }
    }

    pub fn with_naming(mut self, naming: FileNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn on_progress(mut self, observer: impl FnMut(&ProgressRecord) + Send + 'static) -> Self {
        self.progress = Some(Box::new(observer));
        self
    }

    /// Splits the control keys out of the option map and rewrites the engine-facing
    /// options: `out` is captured then forced to `-`, and an observer forces
    /// `progress` into the log.
    pub fn into_plan(self) -> JobPlan {
        let JobOptions {
            mut values,
            mut naming,
            progress,
        } = self;

        let output = OutputMode::from_option(values.get(OUT_KEY));
        values.set(OUT_KEY, "-");

        if let Some(value) = values.remove(FILENAME_KEY) {
            if value.is_truthy() && matches!(naming, FileNaming::Original) {
                naming = FileNaming::Fixed(value.to_string());
            }
        }

        if progress.is_some() {
            values.set(PROGRESS_KEY, LOG_PROGRESS);
        }

        let archive = values
            .remove(ARCHIVE_KEY)
            .map(|v| v.is_truthy())
            .unwrap_or(false);

        debug!(?output, archive, ?naming, "Job plan prepared");

        JobPlan {
            engine_options: values,
            output,
            archive,
            naming,
            observer: progress,
        }
    }
}

impl fmt::Debug for JobOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobOptions")
            .field("values", &self.values)
            .field("naming", &self.naming)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// A job's options after control keys have been consumed.
pub struct JobPlan {
    /// Options forwarded to the engine, in order.
    pub engine_options: OptionMap,
    pub output: OutputMode,
    pub archive: bool,
    pub naming: FileNaming,
    pub observer: Option<ProgressObserver>,
}
