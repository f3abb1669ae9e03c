//! Sorted-set command implementations (zadd, zscore, zrem, zcard, zquery)
//!
//! Scores and offsets arrive as string tokens on the wire; coercion happens
//! here, before the store is touched, so a malformed argument leaves the
//! keyspace unmodified.

use crate::commands::{Command, CommandResult, ResponseValue};
use crate::error::CommandError;
use crate::storage::MemoryStore;
use async_trait::async_trait;

/// Parse a score token. NaN is not a storable score: the composite
/// `(score, member)` ordering has no place for it.
fn parse_score(token: &str) -> Result<f64, CommandError> {
    match token.parse::<f64>() {
        Ok(v) if !v.is_nan() => Ok(v),
        _ => Err(CommandError::expect_float()),
    }
}

fn parse_uint(token: &str) -> Result<u64, CommandError> {
    token.parse::<u64>().map_err(|_| CommandError::expect_int())
}

/// `zadd key score member` — insert or update; 1 when newly inserted
pub struct ZaddCommand;

#[async_trait]
impl Command for ZaddCommand {
    async fn execute(&self, args: &[String], store: &MemoryStore) -> CommandResult {
        let score = match parse_score(&args[1]) {
            Ok(v) => v,
            Err(e) => return CommandResult::Error(e),
        };
        match store.zadd(&args[0], &args[2], score) {
            Ok(inserted) => CommandResult::Ok(ResponseValue::Int(inserted as i64)),
            Err(e) => CommandResult::Error(e),
        }
    }

    fn name(&self) -> &'static str {
        "zadd"
    }

    fn arity(&self) -> usize {
        4
    }
}

/// `zscore key member` — stored score, or nil
pub struct ZscoreCommand;

#[async_trait]
impl Command for ZscoreCommand {
    async fn execute(&self, args: &[String], store: &MemoryStore) -> CommandResult {
        match store.zscore(&args[0], &args[1]) {
            Ok(Some(score)) => CommandResult::Ok(ResponseValue::Dbl(score)),
            Ok(None) => CommandResult::Ok(ResponseValue::Nil),
            Err(e) => CommandResult::Error(e),
        }
    }

    fn name(&self) -> &'static str {
        "zscore"
    }

    fn arity(&self) -> usize {
        3
    }
}

/// `zrem key member` — 1 if removed, 0 if absent
pub struct ZremCommand;

#[async_trait]
impl Command for ZremCommand {
    async fn execute(&self, args: &[String], store: &MemoryStore) -> CommandResult {
        match store.zrem(&args[0], &args[1]) {
            Ok(removed) => CommandResult::Ok(ResponseValue::Int(removed as i64)),
            Err(e) => CommandResult::Error(e),
        }
    }

    fn name(&self) -> &'static str {
        "zrem"
    }

    fn arity(&self) -> usize {
        3
    }
}

/// `zcard key` — cardinality, 0 for a missing key
pub struct ZcardCommand;

#[async_trait]
impl Command for ZcardCommand {
    async fn execute(&self, args: &[String], store: &MemoryStore) -> CommandResult {
        match store.zcard(&args[0]) {
            Ok(count) => CommandResult::Ok(ResponseValue::Int(count as i64)),
            Err(e) => CommandResult::Error(e),
        }
    }

    fn name(&self) -> &'static str {
        "zcard"
    }

    fn arity(&self) -> usize {
        2
    }
}

/// `zquery key score member offset limit` — ordered range scan from the
/// `(score, member)` seek point, returned as alternating member/score pairs
pub struct ZqueryCommand;

#[async_trait]
impl Command for ZqueryCommand {
    async fn execute(&self, args: &[String], store: &MemoryStore) -> CommandResult {
        let score = match parse_score(&args[1]) {
            Ok(v) => v,
            Err(e) => return CommandResult::Error(e),
        };
        let offset = match parse_uint(&args[3]) {
            Ok(v) => v,
            Err(e) => return CommandResult::Error(e),
        };
        let limit = match parse_uint(&args[4]) {
            Ok(v) => v,
            Err(e) => return CommandResult::Error(e),
        };

        let items = store.zquery(&args[0], score, &args[2], offset, limit);
        let mut values = Vec::with_capacity(items.len() * 2);
        for (member, member_score) in items {
            values.push(ResponseValue::Str(member));
            values.push(ResponseValue::Dbl(member_score));
        }
        CommandResult::Ok(ResponseValue::Arr(values))
    }

    fn name(&self) -> &'static str {
        "zquery"
    }

    fn arity(&self) -> usize {
        6
    }
}
