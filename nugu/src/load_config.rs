//! `load_config` module: reads a YAML file of default job options.
//!
//! The file is a flat mapping of engine option keys to scalars, in the same
//! spelling as the command line flags without the leading dashes:
//!
//! ```yaml
//! host: news.example.com
//! port: 563
//! connections: 8
//! article-size: 700K
//! ```
//!
//! Key order is preserved. Values layer over environment defaults and under
//! command line flags.

use anyhow::{anyhow, Context, Result};
use nugu_core::options::{OptionMap, OptionValue};
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<OptionMap> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading option file");

    let content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read option file");
            return Err(anyhow!("Failed to read option file {:?}: {}", path_ref, e));
        }
    };

    let mapping: serde_yaml::Mapping = match serde_yaml::from_str(&content) {
        Ok(mapping) => mapping,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse option file YAML");
            return Err(anyhow!("Failed to parse option file YAML: {e}"));
        }
    };

    let mut options = OptionMap::new();
    for (key, value) in mapping {
        let key = key
            .as_str()
            .ok_or_else(|| anyhow!("option keys must be strings, got {key:?}"))?
            .to_string();
        if value.is_null() {
            warn!(option = %key, "Ignoring option without a value");
            continue;
        }
        let value: OptionValue = serde_yaml::from_value(value)
            .with_context(|| format!("option `{key}` must be a string, number or boolean"))?;
        options.set(key, value);
    }

    info!(config_path = ?path_ref, options_count = options.len(), "Option file loaded");
    Ok(options)
}
