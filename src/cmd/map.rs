use super::{
    extract_bulk, extract_string, validate_arity, CommandArgs, CommandError, CommandExecutor, Get,
    Set, RESP_OK,
};
use crate::{Backend, BulkString, RespFrame};

// GET on a missing key answers an empty bulk string, not a null.
impl CommandExecutor for Get {
    fn execute(self, backend: &Backend) -> RespFrame {
        match backend.get(&self.key) {
            Some(value) => value.into(),
            None => BulkString::default().into(),
        }
    }
}

impl CommandExecutor for Set {
    fn execute(self, backend: &Backend) -> RespFrame {
        backend.set(self.key, self.value);
        RESP_OK.clone()
    }
}

impl CommandArgs for Get {
    const NAME: &'static str = "GET";

    fn from_args(args: Vec<RespFrame>) -> Result<Self, CommandError> {
        validate_arity(&args, Self::NAME, 1)?;

        let mut args = args.into_iter();
        match args.next() {
            Some(key) => Ok(Get {
                key: extract_string(key)?,
            }),
            None => Err(CommandError::WrongArity(Self::NAME)),
        }
    }
}

impl CommandArgs for Set {
    const NAME: &'static str = "SET";

    fn from_args(args: Vec<RespFrame>) -> Result<Self, CommandError> {
        validate_arity(&args, Self::NAME, 2)?;

        let mut args = args.into_iter();
        match (args.next(), args.next()) {
            (Some(key), Some(value)) => Ok(Set {
                key: extract_string(key)?,
                value: extract_bulk(value)?,
            }),
            _ => Err(CommandError::WrongArity(Self::NAME)),
        }
    }
}
