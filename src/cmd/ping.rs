use super::{extract_bulk, CommandArgs, CommandError, CommandExecutor, Ping};
use crate::{Backend, RespFrame, SimpleString};

// PING answers "PONG", PING <message> echoes the message back.
// Extra arguments after the first are ignored.
impl CommandExecutor for Ping {
    fn execute(self, _backend: &Backend) -> RespFrame {
        match self.message {
            Some(message) => message.into(),
            None => SimpleString::new("PONG").into(),
        }
    }
}

impl CommandArgs for Ping {
    const NAME: &'static str = "PING";

    fn from_args(args: Vec<RespFrame>) -> Result<Self, CommandError> {
        let message = match args.into_iter().next() {
            Some(frame) => Some(extract_bulk(frame)?),
            None => None,
        };
        Ok(Ping { message })
    }
}
