pub mod cli;
pub mod load_config;
pub mod passthrough;

pub use cli::{run, Cli};
