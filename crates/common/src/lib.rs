//! Process-level helpers shared by the scrapbook binary and its crates.
//!
//! - `utils::logging`: tracing subscriber setup (compact or JSON).
//! - `env`: startup checks for the config file and the data directory.

pub mod env;
pub mod utils;
