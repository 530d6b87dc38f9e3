/*
- Wire forms produced by the encoder
    - simple string: "+OK\r\n"
    - error: "-Error message\r\n"
    - integer: ":[-]<value>\r\n", never with a "+" sign
    - bulk string: "$<length>\r\n<data>\r\n", data copied as raw bytes
    - null: "$-1\r\n", the only form ever written for a null
    - array: "*<number-of-elements>\r\n<element-1>...<element-n>"
 */

use crate::{BulkString, RespArray, RespEncode, RespNull, SimpleError, SimpleString};

const ARRAY_BUF_CAP: usize = 4096;

fn line(prefix: u8, body: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(body.len() + 3);
    buf.push(prefix);
    buf.extend_from_slice(body.as_bytes());
    buf.extend_from_slice(b"\r\n");
    buf
}

impl RespEncode for SimpleString {
    fn encode(self) -> Vec<u8> {
        line(b'+', &self.0)
    }
}

impl RespEncode for SimpleError {
    fn encode(self) -> Vec<u8> {
        line(b'-', &self.0)
    }
}

impl RespEncode for i64 {
    fn encode(self) -> Vec<u8> {
        line(b':', &self.to_string())
    }
}

impl RespEncode for BulkString {
    fn encode(self) -> Vec<u8> {
        let mut buf = line(b'$', &self.len().to_string());
        buf.reserve(self.len() + 2);
        buf.extend_from_slice(&self);
        buf.extend_from_slice(b"\r\n");
        buf
    }
}

impl RespEncode for RespNull {
    fn encode(self) -> Vec<u8> {
        b"$-1\r\n".to_vec()
    }
}

impl RespEncode for RespArray {
    fn encode(self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ARRAY_BUF_CAP);
        buf.extend(line(b'*', &self.len().to_string()));
        for frame in self.0 {
            buf.extend(frame.encode());
        }
        buf
    }
}
