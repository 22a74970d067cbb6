//! Error types for the process runner.
//!
//! Only synchronous rejections live here. Everything that happens after an
//! invocation was accepted (launch failures, supervision errors, cancellation)
//! is reported through [`CompletionResult`](crate::runner::CompletionResult).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunnerError {
    /// Another invocation currently owns the process slot.
    #[error("A command is already running")]
    AlreadyRunning,

    /// The runner was created outside of a tokio runtime.
    #[error("No tokio runtime available to drive the process runner")]
    NoRuntime,

    /// A custom tool source was selected but no path was given.
    #[error("h2mm-cli is not configured: {reason}")]
    ToolNotConfigured { reason: String },

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },
}
