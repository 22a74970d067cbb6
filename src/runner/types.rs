//! Value types flowing through the process runner.

use std::fmt;
use std::process::ExitStatus;

use serde::{Deserialize, Serialize};

use crate::error::RunnerError;

/// Identifier handed out for every accepted invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InvocationId(pub u64);

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An ordered list of arguments for the external tool.
///
/// The executable itself is not part of the invocation; it is supplied by
/// the runner's [`ResolvedTool`](crate::tool::ResolvedTool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a free-form command line typed by the user into arguments.
    ///
    /// Arguments are separated by runs of whitespace; no quoting is honoured.
    pub fn parse(line: &str) -> Result<Self, RunnerError> {
        let args: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if args.is_empty() {
            return Err(RunnerError::InvalidArgument {
                reason: "command line is empty".to_string(),
            });
        }
        Ok(Self { args })
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args.join(" "))
    }
}

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// One decoded line of output, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEvent {
    pub stream: StreamKind,
    pub line: String,
}

impl OutputEvent {
    pub fn stdout(line: impl Into<String>) -> Self {
        Self {
            stream: StreamKind::Stdout,
            line: line.into(),
        }
    }

    pub fn stderr(line: impl Into<String>) -> Self {
        Self {
            stream: StreamKind::Stderr,
            line: line.into(),
        }
    }
}

/// The single terminal outcome of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionResult {
    /// The process terminated on its own.
    ExitCode(i32),
    /// The process could not be started.
    LaunchFailure(String),
    /// Supervision of a started process failed.
    RuntimeFailure(String),
    /// The process was killed through [`ProcessRunner::cancel`](super::ProcessRunner::cancel).
    Cancelled,
}

impl CompletionResult {
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return CompletionResult::ExitCode(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                // Shell convention for signal deaths
                return CompletionResult::ExitCode(128 + signal);
            }
        }

        CompletionResult::ExitCode(-1)
    }

    pub fn success(&self) -> bool {
        matches!(self, CompletionResult::ExitCode(0))
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CompletionResult::ExitCode(code) => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for CompletionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionResult::ExitCode(code) => write!(f, "exited with code {}", code),
            CompletionResult::LaunchFailure(reason) => write!(f, "failed to start process: {}", reason),
            CompletionResult::RuntimeFailure(reason) => write!(f, "process error: {}", reason),
            CompletionResult::Cancelled => f.write_str("cancelled"),
        }
    }
}
