//! Turns the free-form tail of the command line into job options.
//!
//! Parsing follows the conventions of minimist-style parsers: `--key value`,
//! `--key=value`, bare `--key` for `true`. A `--no-key` negation is kept as its own
//! `true` flag so it reaches the engine unchanged. Integer-looking values become
//! numbers. A lone `-` is a value, not a flag, so `--out -` works.

use anyhow::{bail, Result};
use nugu_core::options::{OptionMap, OptionValue};

fn is_flag(arg: &str) -> bool {
    let rest = match arg.strip_prefix("--") {
        Some(rest) => rest,
        None => match arg.strip_prefix('-') {
            Some(rest) => rest,
            None => return false,
        },
    };
    !rest.is_empty() && !rest.starts_with('-')
}

fn coerce(value: &str) -> OptionValue {
    match value.parse::<i64>() {
        Ok(n) => OptionValue::Int(n),
        Err(_) => OptionValue::Text(value.to_string()),
    }
}

/// Splits leading source paths from the option flags that follow them.
pub fn split_sources(args: &[String]) -> (Vec<String>, &[String]) {
    let first_flag = args.iter().position(|a| is_flag(a)).unwrap_or(args.len());
    (args[..first_flag].to_vec(), &args[first_flag..])
}

pub fn parse_options(args: &[String]) -> Result<OptionMap> {
    let mut options = OptionMap::new();
    let mut iter = args.iter().peekable();

    while let Some(arg) = iter.next() {
        if !is_flag(arg) {
            bail!("unexpected argument `{arg}`: source paths must come before options");
        }
        let name = arg.trim_start_matches('-');

        if let Some((key, value)) = name.split_once('=') {
            options.set(key, coerce(value));
        } else if name.starts_with("no-") {
            // The engine understands its own negations; `false` would encode as `--key`.
            options.set(name, true);
        } else {
            match iter.next_if(|next| !is_flag(next)) {
                Some(value) => options.set(name, coerce(value)),
                None => options.set(name, true),
            }
        }
    }
    Ok(options)
}
