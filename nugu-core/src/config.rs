use tracing::{debug, info};

use crate::options::{OptionMap, ARCHIVE_KEY};

/// Environment variables containing this marker seed job defaults.
pub const ENV_PREFIX: &str = "USENET_POST_";

/// Immutable default options for every job, loaded once and injected where needed.
#[derive(Debug, Clone, PartialEq)]
pub struct Defaults {
    options: OptionMap,
}

impl Defaults {
    /// Built-in defaults: post-check with one connection, no archiving.
    pub fn builtin() -> Self {
        let mut options = OptionMap::new();
        options.set("check-connections", 1);
        options.set(ARCHIVE_KEY, false);
        Self { options }
    }

    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Layers `USENET_POST_*` variables over the built-in defaults.
    /// `USENET_POST_ARTICLE_SIZE=700K` becomes `article-size = "700K"`.
    ///
    /// Variables are applied in name order so the resulting option order does not
    /// depend on how the platform enumerates its environment.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut defaults = Self::builtin();
        let mut seeded: Vec<(String, String)> = vars
            .into_iter()
            .filter_map(|(key, value)| option_key(key.as_ref()).map(|k| (k, value.into())))
            .collect();
        seeded.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, value) in seeded {
            debug!(option = %key, "Seeding default from environment");
            defaults.options.set(key, value);
        }
        info!(
            options_count = defaults.options.len(),
            "Loaded default job options"
        );
        defaults
    }

    pub fn options(&self) -> &OptionMap {
        &self.options
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self::builtin()
    }
}

fn option_key(var: &str) -> Option<String> {
    if !var.contains(ENV_PREFIX) {
        return None;
    }
    let key = var
        .replacen(ENV_PREFIX, "", 1)
        .to_lowercase()
        .replace('_', "-");
    (!key.is_empty()).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_names_are_translated_to_option_keys() {
        assert_eq!(
            option_key("USENET_POST_ARTICLE_SIZE").as_deref(),
            Some("article-size")
        );
        assert_eq!(option_key("HOME"), None);
        assert_eq!(option_key("USENET_POST_"), None);
    }
}
