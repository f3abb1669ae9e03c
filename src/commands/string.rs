//! String command implementations (get, set, del)

use crate::commands::{Command, CommandResult, ResponseValue};
use crate::storage::MemoryStore;
use async_trait::async_trait;

/// `get key` — string value of a key, nil when absent or expired
pub struct GetCommand;

#[async_trait]
impl Command for GetCommand {
    async fn execute(&self, args: &[String], store: &MemoryStore) -> CommandResult {
        match store.get(&args[0]) {
            Ok(Some(value)) => CommandResult::Ok(ResponseValue::Str(value)),
            Ok(None) => CommandResult::Ok(ResponseValue::Nil),
            Err(e) => CommandResult::Error(e),
        }
    }

    fn name(&self) -> &'static str {
        "get"
    }

    fn arity(&self) -> usize {
        2
    }
}

/// `set key value` — create or overwrite a string entry, dropping any TTL
pub struct SetCommand;

#[async_trait]
impl Command for SetCommand {
    async fn execute(&self, args: &[String], store: &MemoryStore) -> CommandResult {
        store.set(&args[0], args[1].clone());
        CommandResult::Ok(ResponseValue::Nil)
    }

    fn name(&self) -> &'static str {
        "set"
    }

    fn arity(&self) -> usize {
        3
    }
}

/// `del key` — remove a key of either type, 1 if it existed
pub struct DelCommand;

#[async_trait]
impl Command for DelCommand {
    async fn execute(&self, args: &[String], store: &MemoryStore) -> CommandResult {
        let removed = store.del(&args[0]);
        CommandResult::Ok(ResponseValue::Int(removed as i64))
    }

    fn name(&self) -> &'static str {
        "del"
    }

    fn arity(&self) -> usize {
        2
    }
}
