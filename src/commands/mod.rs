//! Command implementations and dispatch
//!
//! Each wire command is a small handler behind the `Command` trait,
//! registered by name in the `CommandRegistry`. Handlers validate and
//! coerce their arguments, call into the store, and produce a tagged
//! `ResponseValue`.

pub mod registry;
pub mod string;
pub mod ttl;
pub mod zset;

pub use registry::{Command, CommandRegistry, CommandResult, ParsedCommand};
pub use string::{DelCommand, GetCommand, SetCommand};
pub use ttl::{PexpireCommand, PttlCommand};
pub use zset::{ZaddCommand, ZcardCommand, ZqueryCommand, ZremCommand, ZscoreCommand};

use crate::error::CommandError;

/// Tagged value returned to the client. Mirrors the wire encoding
/// one-to-one: nil, int, dbl, str, arr, err.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseValue {
    Nil,
    Int(i64),
    Dbl(f64),
    Str(String),
    Arr(Vec<ResponseValue>),
    Err { code: i32, message: String },
}

impl From<CommandError> for ResponseValue {
    fn from(err: CommandError) -> Self {
        ResponseValue::Err {
            code: err.code(),
            message: err.message,
        }
    }
}
