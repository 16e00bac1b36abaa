//! Command-line interface module.
//!
//! This module provides the CLI functionality for:
//! - Running the HTTP server
//! - Printing the effective configuration

pub mod commands;
pub mod handlers;

pub use handlers::{handle_config, handle_server};
