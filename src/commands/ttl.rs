//! TTL command implementations (pexpire, pttl)

use crate::commands::{Command, CommandResult, ResponseValue};
use crate::error::CommandError;
use crate::storage::MemoryStore;
use async_trait::async_trait;

/// `pexpire key millis` — arm a millisecond TTL; 1 if the key existed
pub struct PexpireCommand;

#[async_trait]
impl Command for PexpireCommand {
    async fn execute(&self, args: &[String], store: &MemoryStore) -> CommandResult {
        let millis: i64 = match args[1].parse() {
            Ok(v) => v,
            Err(_) => return CommandResult::Error(CommandError::expect_int()),
        };
        let applied = store.pexpire(&args[0], millis);
        CommandResult::Ok(ResponseValue::Int(applied as i64))
    }

    fn name(&self) -> &'static str {
        "pexpire"
    }

    fn arity(&self) -> usize {
        3
    }
}

/// `pttl key` — remaining milliseconds, -1 without TTL, -2 when absent
pub struct PttlCommand;

#[async_trait]
impl Command for PttlCommand {
    async fn execute(&self, args: &[String], store: &MemoryStore) -> CommandResult {
        CommandResult::Ok(ResponseValue::Int(store.pttl(&args[0])))
    }

    fn name(&self) -> &'static str {
        "pttl"
    }

    fn arity(&self) -> usize {
        2
    }
}
