//! Configuration module
//!
//! Settings for the attendance server connection, watch-mode refresh and
//! CSV export, loaded from a TOML file.

#[allow(clippy::module_inception)]
pub mod config;

pub use config::Config;
