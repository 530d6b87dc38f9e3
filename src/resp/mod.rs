mod decode;
mod encode;

use bytes::BytesMut;
use enum_dispatch::enum_dispatch;
use std::ops::Deref;
use thiserror::Error;

pub use decode::{FrameScanner, MAX_BULK_LEN, MAX_LINE_LEN, MAX_NESTING_DEPTH};

#[enum_dispatch]
pub trait RespEncode {
    fn encode(self) -> Vec<u8>;
}

// decode consumes exactly one frame from the front of buf, or nothing at all
// when the buffer does not hold a complete frame yet (RespError::NotComplete).
// expect_length answers "how many bytes would decode consume" without touching buf.
pub trait RespDecode: Sized {
    const PREFIX: &'static str;
    fn decode(buf: &mut BytesMut) -> Result<Self, RespError>;
    fn expect_length(buf: &[u8]) -> Result<usize, RespError>;
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RespError {
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
    #[error("Invalid frame type: {0}")]
    InvalidFrameType(String),
    #[error("Invalid frame length: {0}")]
    InvalidFrameLength(i64),
    #[error("Frame is not complete")]
    NotComplete,
    #[error("Unexpected end of stream inside a frame")]
    UnexpectedEof,
    #[error("Array nesting deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error("Frame larger than {0} bytes")]
    FrameTooLarge(usize),

    #[error("Parse error: {0}")]
    ParseIntError(#[from] std::num::ParseIntError),
}

// The six kinds of value the server understands.
// Null has exactly one wire form ("$-1\r\n"); a negative array count decodes to it too.
#[enum_dispatch(RespEncode)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespFrame {
    SimpleString(SimpleString),
    Error(SimpleError),
    Integer(i64),
    BulkString(BulkString),
    Null(RespNull),
    Array(RespArray),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SimpleString(pub(crate) String);
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SimpleError(pub(crate) String);
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct BulkString(pub(crate) Vec<u8>);
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RespNull;
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RespArray(pub(crate) Vec<RespFrame>);

impl Deref for SimpleString {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Deref for SimpleError {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Deref for BulkString {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Deref for RespArray {
    type Target = Vec<RespFrame>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl SimpleString {
    pub fn new(s: impl Into<String>) -> Self {
        SimpleString(s.into())
    }
}

impl SimpleError {
    pub fn new(s: impl Into<String>) -> Self {
        SimpleError(s.into())
    }
}

impl BulkString {
    pub fn new(s: impl Into<Vec<u8>>) -> Self {
        BulkString(s.into())
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl RespArray {
    pub fn new(s: impl Into<Vec<RespFrame>>) -> Self {
        RespArray(s.into())
    }

    pub fn into_inner(self) -> Vec<RespFrame> {
        self.0
    }
}

impl From<&str> for BulkString {
    fn from(s: &str) -> Self {
        BulkString(s.as_bytes().to_vec())
    }
}

impl From<String> for BulkString {
    fn from(s: String) -> Self {
        BulkString(s.into_bytes())
    }
}

impl From<&[u8]> for BulkString {
    fn from(s: &[u8]) -> Self {
        BulkString(s.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for BulkString {
    fn from(s: &[u8; N]) -> Self {
        BulkString(s.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for RespFrame {
    fn from(s: &[u8; N]) -> Self {
        BulkString(s.to_vec()).into()
    }
}

impl AsRef<[u8]> for BulkString {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl RespFrame {
    // Text carried by a string-like frame, used for command names and keys.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RespFrame::BulkString(s) => Some(s.as_ref()),
            RespFrame::SimpleString(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_round_trip_preserves_every_non_null_kind() -> Result<()> {
        let frames: Vec<RespFrame> = vec![
            SimpleString::new("OK").into(),
            SimpleString::new("").into(),
            SimpleError::new("ERR boom").into(),
            0.into(),
            (-42).into(),
            i64::MAX.into(),
            BulkString::new(b"line1\r\nline2".to_vec()).into(),
            BulkString::new(Vec::new()).into(),
            RespArray::new(Vec::<RespFrame>::new()).into(),
            RespArray::new([
                RespArray::new([1.into(), 2.into()]).into(),
                RespArray::new([
                    SimpleString::new("a").into(),
                    SimpleError::new("b").into(),
                ])
                .into(),
                b"tail".into(),
            ])
            .into(),
        ];

        for frame in frames {
            let mut buf = BytesMut::from(&frame.clone().encode()[..]);
            let decoded = RespFrame::decode(&mut buf)?;
            assert_eq!(decoded, frame);
            assert!(buf.is_empty());
        }
        Ok(())
    }

    #[test]
    fn test_null_collapses_to_one_encoding() -> Result<()> {
        for input in [&b"$-1\r\n"[..], &b"$-7\r\n"[..], &b"*-1\r\n"[..]] {
            let mut buf = BytesMut::from(input);
            let frame = RespFrame::decode(&mut buf)?;
            assert_eq!(frame, RespFrame::Null(RespNull));
            assert_eq!(frame.encode(), b"$-1\r\n");
        }
        Ok(())
    }

    #[test]
    fn test_as_bytes() {
        let frame: RespFrame = b"get".into();
        assert_eq!(frame.as_bytes(), Some(&b"get"[..]));

        let frame: RespFrame = SimpleString::new("ping").into();
        assert_eq!(frame.as_bytes(), Some(&b"ping"[..]));

        let frame: RespFrame = 7.into();
        assert_eq!(frame.as_bytes(), None);
    }
}
