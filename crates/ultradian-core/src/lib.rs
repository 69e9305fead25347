//! ultradian-core - Shared functionality for the ultradian timer
//!
//! Paths, runtime configuration and display formatting used by both the
//! engine library and the command line front end.

pub mod config;
pub mod format;
pub mod paths;

pub use config::Config;
pub use paths::Paths;
