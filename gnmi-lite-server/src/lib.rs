//! gnmi-lite server - mock management server over a JSON-lines console
//!
//! Loads a model and an optional initial configuration, then serves
//! Capabilities, Get, Set and Subscribe requests read from a line stream.

pub mod bootstrap;
pub mod config;
pub mod console;
pub mod hook;

pub use config::ServerConfig;
pub use console::{ConsoleRequest, ConsoleResponse};
