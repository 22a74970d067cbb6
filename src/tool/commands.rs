//! Catalog of the mod-manager commands the front-end offers.

use std::fmt;

use crate::error::RunnerError;
use crate::runner::Invocation;

/// Static description of an offered command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandInfo {
    pub name: &'static str,
    pub command: &'static str,
    pub description: &'static str,
}

static CATALOG: [CommandInfo; 5] = [
    CommandInfo {
        name: "Install Mod",
        command: "install",
        description: "Install a new mod",
    },
    CommandInfo {
        name: "List Mods",
        command: "list",
        description: "List installed mods",
    },
    CommandInfo {
        name: "Remove Mod",
        command: "remove",
        description: "Remove an installed mod",
    },
    CommandInfo {
        name: "Update Mods",
        command: "update",
        description: "Update all mods",
    },
    CommandInfo {
        name: "Check Status",
        command: "status",
        description: "Check mod status",
    },
];

/// All commands, in menu order.
pub fn available_commands() -> &'static [CommandInfo] {
    &CATALOG
}

/// A typed request for one of the catalog commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModCommand {
    Install { source: String },
    List,
    Remove { name: String },
    Update,
    Status,
}

impl ModCommand {
    /// Install from a local archive path or URL. Surrounding whitespace is ignored.
    pub fn install(source: &str) -> Result<Self, RunnerError> {
        let source = required("mod path or URL", source)?;
        Ok(ModCommand::Install { source })
    }

    pub fn remove(name: &str) -> Result<Self, RunnerError> {
        let name = required("mod name", name)?;
        Ok(ModCommand::Remove { name })
    }

    pub fn info(&self) -> &'static CommandInfo {
        let idx = match self {
            ModCommand::Install { .. } => 0,
            ModCommand::List => 1,
            ModCommand::Remove { .. } => 2,
            ModCommand::Update => 3,
            ModCommand::Status => 4,
        };
        &CATALOG[idx]
    }

    pub fn invocation(&self) -> Invocation {
        let sub = self.info().command;
        match self {
            ModCommand::Install { source } => Invocation::new([sub, source.as_str()]),
            ModCommand::Remove { name } => Invocation::new([sub, name.as_str()]),
            ModCommand::List | ModCommand::Update | ModCommand::Status => Invocation::new([sub]),
        }
    }
}

impl fmt::Display for ModCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().name)
    }
}

impl From<ModCommand> for Invocation {
    fn from(cmd: ModCommand) -> Self {
        cmd.invocation()
    }
}

fn required(what: &str, value: &str) -> Result<String, RunnerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RunnerError::InvalidArgument {
            reason: format!("{} must not be empty", what),
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order() {
        let names: Vec<&str> = available_commands().iter().map(|c| c.command).collect();
        assert_eq!(names, vec!["install", "list", "remove", "update", "status"]);
    }

    #[test]
    fn test_info_matches_catalog() {
        assert_eq!(ModCommand::List.info().name, "List Mods");
        assert_eq!(ModCommand::Status.info().description, "Check mod status");
        assert_eq!(ModCommand::Update.to_string(), "Update Mods");
    }

    #[test]
    fn test_simple_invocations() {
        assert_eq!(ModCommand::List.invocation().args(), &["list"]);
        assert_eq!(ModCommand::Update.invocation().args(), &["update"]);
        assert_eq!(ModCommand::Status.invocation().args(), &["status"]);
    }

    #[test]
    fn test_install_trims_source() {
        let cmd = ModCommand::install("  /home/me/mods/cool.zip \n").unwrap();
        assert_eq!(cmd.invocation().args(), &["install", "/home/me/mods/cool.zip"]);
    }

    #[test]
    fn test_install_rejects_blank() {
        assert!(matches!(
            ModCommand::install("   "),
            Err(RunnerError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_remove_keeps_inner_spaces() {
        let inv: Invocation = ModCommand::remove("Better Flashlight").unwrap().into();
        // The mod name stays one argument
        assert_eq!(inv.args(), &["remove", "Better Flashlight"]);
    }

    #[test]
    fn test_remove_rejects_blank() {
        assert!(ModCommand::remove("").is_err());
    }
}
