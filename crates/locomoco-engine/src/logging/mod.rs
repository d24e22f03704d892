//! Logging utilities.
//!
//! The engine logs through the `log` facade only. This module installs the
//! `env_logger` backend for binaries.

mod init;

pub use init::{init_logging, LoggingConfig};
