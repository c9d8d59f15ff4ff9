//! Job Encoder: option map → posting engine argv.

use tracing::debug;

use crate::options::OptionMap;

/// Ports on which the engine is always told to use TLS.
pub const SECURE_PORTS: [i64; 2] = [443, 563];

pub const SSL_FLAG: &str = "--ssl";

/// Emits `--<key>` for every option in map order, followed by the value unless the
/// value is a boolean. `--ssl` is appended whenever `port` is a secure port.
///
/// Identical maps always encode to identical argument lists.
pub fn encode_args(options: &OptionMap) -> Vec<String> {
    let mut args = Vec::with_capacity(options.len() * 2 + 1);
    for (key, value) in options.iter() {
        args.push(format!("--{key}"));
        if !value.is_bool() {
            args.push(value.to_string());
        }
    }

    if uses_secure_port(options) {
        args.push(SSL_FLAG.to_string());
    }
    debug!(args = args.len(), "Encoded engine arguments");
    args
}

pub fn uses_secure_port(options: &OptionMap) -> bool {
    options
        .get("port")
        .and_then(|port| port.as_int())
        .is_some_and(|port| SECURE_PORTS.contains(&port))
}
