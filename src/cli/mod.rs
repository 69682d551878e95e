// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Command-line interface: argument parsing, console output and the `run` command.

// Modules
/// CLI arguments.
pub mod args;

/// Console output macros and the verbosity flag.
pub mod logging;

/// Overlay loop for cameras and file sources.
pub mod run;
