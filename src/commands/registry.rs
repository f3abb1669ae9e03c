//! Command registry and execution framework

use crate::error::CommandError;
use crate::storage::MemoryStore;
use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

/// Trait for command implementations
#[async_trait]
pub trait Command: Send + Sync {
    /// Execute the command with given arguments (command name excluded)
    async fn execute(&self, args: &[String], store: &MemoryStore) -> CommandResult;

    /// Wire name of the command. Lookup is case-sensitive; all built-in
    /// commands use lower-case names.
    fn name(&self) -> &'static str;

    /// Total argument count including the command name itself
    fn arity(&self) -> usize;
}

/// Command execution result
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    Ok(super::ResponseValue),
    Error(CommandError),
}

impl CommandResult {
    /// Collapse into the tagged value sent to the client.
    pub fn into_value(self) -> super::ResponseValue {
        match self {
            CommandResult::Ok(value) => value,
            CommandResult::Error(err) => err.into(),
        }
    }
}

/// One decoded request: the command name plus its arguments, tagged with
/// the issuing connection for log correlation.
#[derive(Debug, Clone)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
    pub client_id: Uuid,
}

impl ParsedCommand {
    /// Build from the argument list of a decoded request frame; argument 0
    /// is the command name.
    pub fn from_frame(mut frame_args: Vec<String>, client_id: Uuid) -> Result<Self, CommandError> {
        if frame_args.is_empty() {
            return Err(CommandError::unknown_command(""));
        }
        let name = frame_args.remove(0);
        Ok(Self {
            name,
            args: frame_args,
            client_id,
        })
    }

    /// Total number of arguments including the command name
    pub fn total_args(&self) -> usize {
        self.args.len() + 1
    }
}

/// Command registry for lookup and dispatch
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, Box<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: Box<dyn Command>) {
        self.commands.insert(command.name(), command);
    }

    /// Execute a parsed command: resolve the handler, check arity, run.
    /// Every failure becomes a `CommandResult::Error`; nothing here can
    /// take the connection down.
    pub async fn execute(&self, cmd: &ParsedCommand, store: &MemoryStore) -> CommandResult {
        let Some(command) = self.commands.get(cmd.name.as_str()) else {
            return CommandResult::Error(CommandError::unknown_command(&cmd.name));
        };
        if cmd.total_args() != command.arity() {
            return CommandResult::Error(CommandError::bad_arity(&cmd.name));
        }
        command.execute(&cmd.args, store).await
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }
}
