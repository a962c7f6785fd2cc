//! Logging setup.
//!
//! The engine only talks to the `log` facade; binaries install `env_logger`
//! through [`init_logging`] early in `main`.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
