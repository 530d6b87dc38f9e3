/*
- How a frame is recognised
    - simple string: "+OK\r\n"
    - error: "-Error message\r\n"
    - integer: ":[<+|->]<value>\r\n"
    - bulk string: "$<length>\r\n<data>\r\n"
    - null bulk string: "$-1\r\n" (any negative length)
    - array: "*<number-of-elements>\r\n<element-1>...<element-n>"
        - "*2\r\n$3\r\nget\r\n$5\r\nhello\r\n"
    - null array: "*-1\r\n" (decoded to the same null as the bulk form)
 */

use crate::{
    BulkString, RespArray, RespDecode, RespError, RespFrame, RespNull, SimpleError, SimpleString,
};
use bytes::{Buf, BytesMut};

const CRLF: &[u8] = b"\r\n";
const CRLF_LEN: usize = CRLF.len();

/// Arrays nested deeper than this are rejected before anything is consumed.
pub const MAX_NESTING_DEPTH: usize = 128;
/// Largest bulk string body accepted, 512 MiB.
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;
/// Longest header or simple-string line accepted, 64 KiB, not counting the tag and CRLF.
pub const MAX_LINE_LEN: usize = 64 * 1024;

// The first byte decides the frame type. Nothing is consumed unless the whole
// frame (for arrays: every nested element) is already in the buffer.
impl RespDecode for RespFrame {
    const PREFIX: &'static str = "";

    fn decode(buf: &mut BytesMut) -> Result<Self, RespError> {
        match buf.first().copied() {
            Some(b'+') => Ok(SimpleString::decode(buf)?.into()),
            Some(b'-') => Ok(SimpleError::decode(buf)?.into()),
            Some(b':') => Ok(i64::decode(buf)?.into()),
            Some(b'$') => match parse_length(buf, BulkString::PREFIX)? {
                (_, len) if len < 0 => Ok(RespNull::decode(buf)?.into()),
                _ => Ok(BulkString::decode(buf)?.into()),
            },
            Some(b'*') => match parse_length(buf, RespArray::PREFIX)? {
                (_, len) if len < 0 => Ok(RespNull::decode(buf)?.into()),
                _ => Ok(RespArray::decode(buf)?.into()),
            },
            Some(other) => Err(unknown_type(other)),
            None => Err(RespError::NotComplete),
        }
    }

    fn expect_length(buf: &[u8]) -> Result<usize, RespError> {
        FrameScanner::default()
            .scan(buf)?
            .ok_or(RespError::NotComplete)
    }
}

impl RespDecode for SimpleString {
    const PREFIX: &'static str = "+";

    fn decode(buf: &mut BytesMut) -> Result<Self, RespError> {
        let end = extract_simple_frame_data(buf, Self::PREFIX)?;
        let s = utf8_line(&buf[Self::PREFIX.len()..end])?.to_string();
        buf.advance(end + CRLF_LEN);
        Ok(SimpleString::new(s))
    }

    fn expect_length(buf: &[u8]) -> Result<usize, RespError> {
        let end = extract_simple_frame_data(buf, Self::PREFIX)?;
        Ok(end + CRLF_LEN)
    }
}

impl RespDecode for SimpleError {
    const PREFIX: &'static str = "-";

    fn decode(buf: &mut BytesMut) -> Result<Self, RespError> {
        let end = extract_simple_frame_data(buf, Self::PREFIX)?;
        let s = utf8_line(&buf[Self::PREFIX.len()..end])?.to_string();
        buf.advance(end + CRLF_LEN);
        Ok(SimpleError::new(s))
    }

    fn expect_length(buf: &[u8]) -> Result<usize, RespError> {
        let end = extract_simple_frame_data(buf, Self::PREFIX)?;
        Ok(end + CRLF_LEN)
    }
}

impl RespDecode for i64 {
    const PREFIX: &'static str = ":";

    fn decode(buf: &mut BytesMut) -> Result<Self, RespError> {
        let end = extract_simple_frame_data(buf, Self::PREFIX)?;
        // parse before consuming so a syntax error leaves the buffer as it was
        let n = parse_line(&buf[Self::PREFIX.len()..end])?;
        buf.advance(end + CRLF_LEN);
        Ok(n)
    }

    fn expect_length(buf: &[u8]) -> Result<usize, RespError> {
        let end = extract_simple_frame_data(buf, Self::PREFIX)?;
        Ok(end + CRLF_LEN)
    }
}

// "$-1\r\n" and "*-1\r\n"; any negative count is accepted.
impl RespDecode for RespNull {
    const PREFIX: &'static str = "$";

    fn decode(buf: &mut BytesMut) -> Result<Self, RespError> {
        let end = null_header(buf)?;
        buf.advance(end + CRLF_LEN);
        Ok(RespNull)
    }

    fn expect_length(buf: &[u8]) -> Result<usize, RespError> {
        let end = null_header(buf)?;
        Ok(end + CRLF_LEN)
    }
}

impl RespDecode for BulkString {
    const PREFIX: &'static str = "$";

    fn decode(buf: &mut BytesMut) -> Result<Self, RespError> {
        let (end, len) = parse_length(buf, Self::PREFIX)?;
        let len = body_length(len)?;
        let body_start = end + CRLF_LEN;
        if buf.len() < body_start + len + CRLF_LEN {
            return Err(RespError::NotComplete);
        }
        check_body_terminator(&buf[body_start + len..body_start + len + CRLF_LEN])?;

        buf.advance(body_start);
        let data = buf.split_to(len + CRLF_LEN);
        Ok(BulkString::new(data[..len].to_vec()))
    }

    fn expect_length(buf: &[u8]) -> Result<usize, RespError> {
        let (end, len) = parse_length(buf, Self::PREFIX)?;
        if len < 0 {
            return Ok(end + CRLF_LEN);
        }
        let body_end = end + CRLF_LEN + body_length(len)?;
        if buf.len() < body_end + CRLF_LEN {
            return Err(RespError::NotComplete);
        }
        check_body_terminator(&buf[body_end..body_end + CRLF_LEN])?;
        Ok(body_end + CRLF_LEN)
    }
}

impl RespDecode for RespArray {
    const PREFIX: &'static str = "*";

    fn decode(buf: &mut BytesMut) -> Result<Self, RespError> {
        let (end, len) = parse_length(buf, Self::PREFIX)?;
        if len < 0 {
            return Err(RespError::InvalidFrameLength(len));
        }
        // walks every nested element: fails with NotComplete (or a depth error)
        // before a single byte is taken off the buffer
        Self::expect_length(buf)?;

        buf.advance(end + CRLF_LEN);
        let mut frames = Vec::with_capacity(len as usize);
        for _ in 0..len {
            frames.push(RespFrame::decode(buf)?);
        }
        Ok(RespArray::new(frames))
    }

    fn expect_length(buf: &[u8]) -> Result<usize, RespError> {
        extract_simple_frame_data(buf, Self::PREFIX)?;
        RespFrame::expect_length(buf)
    }
}

/// Finds where the first frame in a buffer ends, picking up where the
/// previous call stopped.
///
/// A frame that arrives over many reads is walked once in total rather than
/// once per read: `offset` only ever moves past elements that are complete,
/// and `open` remembers how many elements each enclosing array still expects.
/// The buffer may grow between calls but its front must not change; call
/// [`FrameScanner::reset`] after consuming a frame.
#[derive(Debug, Clone, Default)]
pub struct FrameScanner {
    offset: usize,
    open: Vec<usize>,
}

impl FrameScanner {
    /// `Ok(Some(len))` once `buf[..len]` holds a whole frame, `Ok(None)` while
    /// more bytes are needed.
    pub fn scan(&mut self, buf: &[u8]) -> Result<Option<usize>, RespError> {
        loop {
            let rest = &buf[self.offset..];
            let element = match rest.first() {
                None => return Ok(None),
                Some(b'+') => SimpleString::expect_length(rest),
                Some(b'-') => SimpleError::expect_length(rest),
                Some(b':') => i64::expect_length(rest),
                Some(b'$') => BulkString::expect_length(rest),
                Some(b'*') => {
                    if self.open.len() >= MAX_NESTING_DEPTH {
                        return Err(RespError::NestingTooDeep(MAX_NESTING_DEPTH));
                    }
                    match parse_length(rest, RespArray::PREFIX) {
                        Ok((_, len)) if len < 0 => RespNull::expect_length(rest),
                        Ok((end, 0)) => Ok(end + CRLF_LEN),
                        Ok((end, len)) => {
                            // the array header is complete, its elements follow
                            self.open.push(len as usize);
                            self.offset += end + CRLF_LEN;
                            continue;
                        }
                        Err(e) => Err(e),
                    }
                }
                Some(other) => Err(unknown_type(*other)),
            };

            match element {
                Ok(len) => self.offset += len,
                Err(RespError::NotComplete) => return Ok(None),
                Err(e) => return Err(e),
            }

            // one element done: close every array it completes
            loop {
                match self.open.last_mut() {
                    None => return Ok(Some(self.offset)),
                    Some(remaining) if *remaining > 1 => {
                        *remaining -= 1;
                        break;
                    }
                    Some(_) => {
                        self.open.pop();
                    }
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.offset = 0;
        self.open.clear();
    }
}

fn null_header(buf: &[u8]) -> Result<usize, RespError> {
    let prefix = match buf.first() {
        Some(b'$') => BulkString::PREFIX,
        Some(b'*') => RespArray::PREFIX,
        Some(other) => return Err(unknown_type(*other)),
        None => return Err(RespError::NotComplete),
    };
    match parse_length(buf, prefix)? {
        (end, len) if len < 0 => Ok(end),
        (_, len) => Err(RespError::InvalidFrame(format!(
            "expect: Null, got length {}",
            len
        ))),
    }
}

fn body_length(len: i64) -> Result<usize, RespError> {
    match usize::try_from(len) {
        Ok(n) if n <= MAX_BULK_LEN => Ok(n),
        _ => Err(RespError::InvalidFrameLength(len)),
    }
}

fn check_body_terminator(tail: &[u8]) -> Result<(), RespError> {
    if tail != CRLF {
        return Err(RespError::InvalidFrame(format!(
            "bulk string body not terminated by CRLF, got: {:?}",
            tail
        )));
    }
    Ok(())
}

// Returns the index of the '\r' that ends the first line of buf.
// At most MAX_LINE_LEN bytes of line body are searched; a line that runs past
// that without a CRLF is rejected instead of waiting for more input.
fn extract_simple_frame_data(buf: &[u8], prefix: &str) -> Result<usize, RespError> {
    if buf.is_empty() {
        return Err(RespError::NotComplete);
    }
    if !buf.starts_with(prefix.as_bytes()) {
        return Err(RespError::InvalidFrameType(format!(
            "expect: {}, got: {:?}",
            prefix,
            buf[0] as char
        )));
    }

    let limit = prefix.len() + MAX_LINE_LEN + CRLF_LEN;
    match find_crlf(&buf[..buf.len().min(limit)], prefix.len()) {
        Some(end) => Ok(end),
        None if buf.len() >= limit => Err(RespError::InvalidFrame(format!(
            "line longer than {} bytes",
            MAX_LINE_LEN
        ))),
        None => Err(RespError::NotComplete),
    }
}

fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    buf[from..]
        .windows(CRLF_LEN)
        .position(|w| w == CRLF)
        .map(|i| i + from)
}

fn parse_length(buf: &[u8], prefix: &str) -> Result<(usize, i64), RespError> {
    let end = extract_simple_frame_data(buf, prefix)?;
    Ok((end, parse_line(&buf[prefix.len()..end])?))
}

fn parse_line(line: &[u8]) -> Result<i64, RespError> {
    Ok(utf8_line(line)?.parse()?)
}

fn utf8_line(line: &[u8]) -> Result<&str, RespError> {
    std::str::from_utf8(line)
        .map_err(|e| RespError::InvalidFrame(format!("line is not valid UTF-8: {}", e)))
}

fn unknown_type(tag: u8) -> RespError {
    RespError::InvalidFrameType(format!("unknown frame type: {:?}", tag as char))
}
