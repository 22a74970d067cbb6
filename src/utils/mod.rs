//! Utility modules for common functionality.
//!
//! Logging configuration and small helpers shared by the runner and the
//! command-line front-end.

pub mod guard;
pub mod logger;
