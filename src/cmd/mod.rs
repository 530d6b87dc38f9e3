// Command handlers and the registry the dispatcher resolves names against.
// A handler receives the arguments that followed the command name, parses them
// into one of the command structs below and executes it against the Backend.

mod hmap;
mod map;
mod ping;

use crate::{Backend, BulkString, RespFrame, SimpleError, SimpleString};
use lazy_static::lazy_static;
use std::collections::HashMap;
use thiserror::Error;

pub type CommandHandler = fn(&Backend, Vec<RespFrame>) -> RespFrame;

lazy_static! {
    static ref RESP_OK: RespFrame = SimpleString::new("OK").into();

    // Built once, never mutated; keys are upper case.
    static ref COMMANDS: HashMap<&'static str, CommandHandler> = {
        let mut m: HashMap<&'static str, CommandHandler> = HashMap::new();
        m.insert(Ping::NAME, run::<Ping>);
        m.insert(Get::NAME, run::<Get>);
        m.insert(Set::NAME, run::<Set>);
        m.insert(HGet::NAME, run::<HGet>);
        m.insert(HSet::NAME, run::<HSet>);
        m.insert(HGetAll::NAME, run::<HGetAll>);
        m
    };
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),
    #[error("ERR invalid argument: {0}")]
    InvalidArgument(String),

    #[error("ERR invalid UTF-8 in argument: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
}

pub trait CommandExecutor {
    fn execute(self, backend: &Backend) -> RespFrame;
}

// Argument parsing for one command; NAME is the upper-case registry key.
pub trait CommandArgs: Sized {
    const NAME: &'static str;
    fn from_args(args: Vec<RespFrame>) -> Result<Self, CommandError>;
}

// Looks up an upper-case command name.
pub fn lookup(name: &str) -> Option<CommandHandler> {
    COMMANDS.get(name).copied()
}

// Argument errors become a SimpleError reply, never a dropped connection.
fn run<C>(backend: &Backend, args: Vec<RespFrame>) -> RespFrame
where
    C: CommandArgs + CommandExecutor,
{
    match C::from_args(args) {
        Ok(cmd) => cmd.execute(backend),
        Err(e) => SimpleError::new(e.to_string()).into(),
    }
}

#[derive(Debug)]
pub struct Ping {
    message: Option<BulkString>,
}

#[derive(Debug)]
pub struct Get {
    key: String,
}

#[derive(Debug)]
pub struct Set {
    key: String,
    value: BulkString,
}

#[derive(Debug)]
pub struct HGet {
    key: String,
    field: String,
}

#[derive(Debug)]
pub struct HSet {
    key: String,
    field: String,
    value: BulkString,
}

#[derive(Debug)]
pub struct HGetAll {
    key: String,
}

fn validate_arity(
    args: &[RespFrame],
    name: &'static str,
    n_args: usize,
) -> Result<(), CommandError> {
    if args.len() != n_args {
        return Err(CommandError::WrongArity(name));
    }
    Ok(())
}

fn extract_string(frame: RespFrame) -> Result<String, CommandError> {
    match frame {
        RespFrame::BulkString(s) => Ok(String::from_utf8(s.0)?),
        RespFrame::SimpleString(s) => Ok(s.0),
        other => Err(CommandError::InvalidArgument(format!(
            "expected a string, got {:?}",
            other
        ))),
    }
}

fn extract_bulk(frame: RespFrame) -> Result<BulkString, CommandError> {
    match frame {
        RespFrame::BulkString(s) => Ok(s),
        RespFrame::SimpleString(s) => Ok(s.0.into()),
        RespFrame::Integer(n) => Ok(n.to_string().into()),
        other => Err(CommandError::InvalidArgument(format!(
            "expected a string, got {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RespArray, RespNull};

    fn args(items: &[&str]) -> Vec<RespFrame> {
        items
            .iter()
            .map(|s| BulkString::from(*s).into())
            .collect()
    }

    #[test]
    fn test_registry_has_every_command() {
        for name in ["PING", "GET", "SET", "HGET", "HSET", "HGETALL"] {
            assert!(lookup(name).is_some(), "{} missing", name);
        }
        assert!(lookup("FOO").is_none());
        // names are resolved after upper-casing by the caller
        assert!(lookup("get").is_none());
    }

    #[test]
    fn test_handlers_through_registry() {
        let backend = Backend::new();
        let set = lookup("SET").expect("SET registered");
        let get = lookup("GET").expect("GET registered");

        assert_eq!(set(&backend, args(&["k", "1"])), RESP_OK.clone());
        assert_eq!(
            get(&backend, args(&["k"])),
            RespFrame::BulkString(BulkString::from("1"))
        );

        let hset = lookup("HSET").expect("HSET registered");
        let hgetall = lookup("HGETALL").expect("HGETALL registered");
        assert_eq!(hset(&backend, args(&["h", "f1", "v1"])), RESP_OK.clone());
        assert_eq!(
            hgetall(&backend, args(&["h"])),
            RespFrame::Array(RespArray::new([b"f1".into(), b"v1".into()]))
        );
        assert_eq!(
            hgetall(&backend, args(&["missing-hash"])),
            RespFrame::Null(RespNull)
        );
    }

    #[test]
    fn test_arity_error_is_simple_error() {
        let backend = Backend::new();
        let set = lookup("SET").expect("SET registered");

        let ret = set(&backend, args(&["onlykey"]));
        assert_eq!(
            ret,
            RespFrame::Error(SimpleError::new(
                "ERR wrong number of arguments for 'SET' command"
            ))
        );
        assert_eq!(backend.get("onlykey"), None);
    }

    #[test]
    fn test_non_utf8_key_is_rejected() {
        let backend = Backend::new();
        let get = lookup("GET").expect("GET registered");

        let ret = get(&backend, vec![BulkString::new(vec![0xff, 0xfe]).into()]);
        assert!(matches!(ret, RespFrame::Error(_)));
    }

    #[test]
    fn test_non_string_argument_is_rejected() {
        let backend = Backend::new();
        let get = lookup("GET").expect("GET registered");

        let ret = get(&backend, vec![RespArray::new(Vec::<RespFrame>::new()).into()]);
        assert!(matches!(ret, RespFrame::Error(_)));
    }
}
