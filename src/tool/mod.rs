//! Locating and probing the external `h2mm-cli` executable.
//!
//! The tool is either the bundled one (looked up by name on `PATH`) or a
//! custom path chosen by the user. Inside a Flatpak sandbox a custom tool
//! lives on the host, so it is launched through `flatpak-spawn --host`.

mod commands;

use std::ffi::OsString;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RunnerError;
use crate::runner::Invocation;

pub use commands::{CommandInfo, ModCommand, available_commands};

/// Executable name of the bundled tool.
pub const DEFAULT_TOOL: &str = "h2mm-cli";

const FLATPAK_SPAWN: &str = "flatpak-spawn";

/// Where the external tool comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum ToolSource {
    #[default]
    Bundled,
    Custom {
        #[serde(default)]
        path: PathBuf,
    },
}

impl ToolSource {
    pub fn custom(path: impl Into<PathBuf>) -> Self {
        ToolSource::Custom { path: path.into() }
    }

    /// Resolve the source into a launchable program, checking `FLATPAK_ID`.
    pub fn resolve(&self) -> Result<ResolvedTool, RunnerError> {
        self.resolve_for(std::env::var_os("FLATPAK_ID").is_some())
    }

    /// Resolve the source, with sandbox detection supplied by the caller.
    pub fn resolve_for(&self, in_flatpak: bool) -> Result<ResolvedTool, RunnerError> {
        match self {
            ToolSource::Bundled => Ok(ResolvedTool::new(DEFAULT_TOOL)),
            ToolSource::Custom { path } => {
                if path.as_os_str().is_empty() {
                    return Err(RunnerError::ToolNotConfigured {
                        reason: "custom tool source selected without a path".to_string(),
                    });
                }
                if in_flatpak {
                    Ok(ResolvedTool {
                        program: OsString::from(FLATPAK_SPAWN),
                        prefix_args: vec![OsString::from("--host"), path.clone().into_os_string()],
                    })
                } else {
                    Ok(ResolvedTool::new(path.clone()))
                }
            }
        }
    }
}

/// A program plus the arguments that precede every invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    pub program: OsString,
    pub prefix_args: Vec<OsString>,
}

impl ResolvedTool {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
        }
    }

    pub fn with_prefix_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.prefix_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Build the full argument vector for `invocation`, program excluded.
    pub fn argv(&self, invocation: &Invocation) -> Vec<OsString> {
        self.prefix_args
            .iter()
            .cloned()
            .chain(invocation.args().iter().map(OsString::from))
            .collect()
    }

    pub fn command(&self, invocation: &Invocation) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(self.argv(invocation));
        cmd
    }

    /// Whether the program can be found right now.
    pub fn is_available(&self) -> bool {
        match which::which(&self.program) {
            Ok(path) => {
                debug!("Resolved {:?} to {}", self.program, path.display());
                true
            }
            Err(e) => {
                debug!("{:?} is not available: {}", self.program, e);
                false
            }
        }
    }
}

/// Synchronous check used before offering tool-backed features.
///
/// Bundled tools are looked up on `PATH`; custom paths are checked directly.
/// A custom source without a path is reported as unavailable.
pub fn is_available(source: &ToolSource) -> bool {
    match source.resolve_for(false) {
        Ok(tool) => tool.is_available(),
        Err(e) => {
            debug!("Tool unavailable: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_resolves_to_default_name() {
        let tool = ToolSource::Bundled.resolve_for(false).unwrap();
        assert_eq!(tool.program, OsString::from("h2mm-cli"));
        assert!(tool.prefix_args.is_empty());
    }

    #[test]
    fn test_bundled_ignores_flatpak() {
        let tool = ToolSource::Bundled.resolve_for(true).unwrap();
        assert_eq!(tool.program, OsString::from("h2mm-cli"));
    }

    #[test]
    fn test_custom_path() {
        let tool = ToolSource::custom("/opt/h2mm/h2mm-cli").resolve_for(false).unwrap();
        assert_eq!(tool.program, OsString::from("/opt/h2mm/h2mm-cli"));
    }

    #[test]
    fn test_custom_path_in_flatpak_goes_through_host() {
        let tool = ToolSource::custom("/opt/h2mm/h2mm-cli").resolve_for(true).unwrap();
        let argv = tool.argv(&Invocation::new(["list"]));
        assert_eq!(tool.program, OsString::from("flatpak-spawn"));
        assert_eq!(argv, vec!["--host", "/opt/h2mm/h2mm-cli", "list"]);
    }

    #[test]
    fn test_custom_without_path_is_not_configured() {
        let err = ToolSource::custom("").resolve_for(false).unwrap_err();
        assert!(matches!(err, RunnerError::ToolNotConfigured { .. }));
        assert!(!is_available(&ToolSource::custom("")));
    }

    #[test]
    fn test_argv_appends_invocation_after_prefix() {
        let tool = ResolvedTool::new("sh").with_prefix_args(["-c"]);
        let argv = tool.argv(&Invocation::new(["exit 0"]));
        assert_eq!(argv, vec!["-c", "exit 0"]);
    }

    #[test]
    fn test_missing_tool_is_unavailable() {
        assert!(!is_available(&ToolSource::custom("/nonexistent/h2mm-cli-missing")));
        assert!(!ResolvedTool::new("h2mm-cli-definitely-not-installed-42").is_available());
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_is_available() {
        assert!(ResolvedTool::new("sh").is_available());
        assert!(is_available(&ToolSource::custom("/bin/sh")));
    }

    #[test]
    fn test_source_serde_shape() {
        let json = serde_json::to_string(&ToolSource::custom("/x/h2mm-cli")).unwrap();
        assert_eq!(json, r#"{"source":"custom","path":"/x/h2mm-cli"}"#);

        let parsed: ToolSource = serde_json::from_str(r#"{"source":"bundled"}"#).unwrap();
        assert_eq!(parsed, ToolSource::Bundled);

        let parsed: ToolSource = serde_json::from_str(r#"{"source":"custom"}"#).unwrap();
        assert_eq!(parsed, ToolSource::custom(""));
    }
}
