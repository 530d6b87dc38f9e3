use super::{
    extract_bulk, extract_string, validate_arity, CommandArgs, CommandError, CommandExecutor, HGet,
    HGetAll, HSet, RESP_OK,
};
use crate::{Backend, BulkString, RespArray, RespFrame, RespNull};

impl CommandExecutor for HGet {
    fn execute(self, backend: &Backend) -> RespFrame {
        match backend.hget(&self.key, &self.field) {
            Some(value) => value.into(),
            None => RespFrame::Null(RespNull),
        }
    }
}

// Replies field, value, field, value... sorted by field name.
// A hash that was never written answers null rather than an empty array.
impl CommandExecutor for HGetAll {
    fn execute(self, backend: &Backend) -> RespFrame {
        match backend.hgetall(&self.key) {
            Some(mut data) => {
                data.sort_by(|a, b| a.0.cmp(&b.0));
                let ret = data
                    .into_iter()
                    .flat_map(|(k, v)| {
                        [
                            RespFrame::BulkString(BulkString::from(k)),
                            RespFrame::BulkString(v),
                        ]
                    })
                    .collect::<Vec<RespFrame>>();

                RespArray::new(ret).into()
            }
            None => RespFrame::Null(RespNull),
        }
    }
}

impl CommandExecutor for HSet {
    fn execute(self, backend: &Backend) -> RespFrame {
        backend.hset(self.key, self.field, self.value);
        RESP_OK.clone()
    }
}

impl CommandArgs for HGet {
    const NAME: &'static str = "HGET";

    fn from_args(args: Vec<RespFrame>) -> Result<Self, CommandError> {
        validate_arity(&args, Self::NAME, 2)?;

        let mut args = args.into_iter();
        match (args.next(), args.next()) {
            (Some(key), Some(field)) => Ok(HGet {
                key: extract_string(key)?,
                field: extract_string(field)?,
            }),
            _ => Err(CommandError::WrongArity(Self::NAME)),
        }
    }
}

impl CommandArgs for HGetAll {
    const NAME: &'static str = "HGETALL";

    fn from_args(args: Vec<RespFrame>) -> Result<Self, CommandError> {
        validate_arity(&args, Self::NAME, 1)?;

        let mut args = args.into_iter();
        match args.next() {
            Some(key) => Ok(HGetAll {
                key: extract_string(key)?,
            }),
            None => Err(CommandError::WrongArity(Self::NAME)),
        }
    }
}

impl CommandArgs for HSet {
    const NAME: &'static str = "HSET";

    fn from_args(args: Vec<RespFrame>) -> Result<Self, CommandError> {
        validate_arity(&args, Self::NAME, 3)?;

        let mut args = args.into_iter();
        match (args.next(), args.next(), args.next()) {
            (Some(key), Some(field), Some(value)) => Ok(HSet {
                key: extract_string(key)?,
                field: extract_string(field)?,
                value: extract_bulk(value)?,
            }),
            _ => Err(CommandError::WrongArity(Self::NAME)),
        }
    }
}
