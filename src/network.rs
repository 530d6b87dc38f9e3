// One Peer per accepted socket. The read half is framed with RespFrameCodec and
// every decoded frame is queued for the dispatcher together with a handle to the
// write half, which the dispatcher uses to send the reply back.

use crate::{dispatch::Command, FrameScanner, RespDecode, RespEncode, RespError, RespFrame};
use anyhow::Result;
use bytes::BytesMut;
use futures::SinkExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::StreamExt;
use tokio_util::codec::{Decoder, Encoder, FramedRead, FramedWrite};
use tracing::{debug, info};

pub type PeerId = u64;

/// Most bytes a client may have buffered towards one unfinished frame, 1 GiB.
pub const MAX_FRAME_LEN: usize = 1024 * 1024 * 1024;

// The codec keeps a FrameScanner between reads, so a frame that trickles in
// over many packets is walked once instead of once per packet. The scanner is
// reset whenever a frame is taken off the buffer.
#[derive(Debug, Clone)]
pub struct RespFrameCodec {
    scanner: FrameScanner,
    max_frame_len: usize,
}

// Write side of a connection. Shared by the Peer and every Command it queued;
// the socket is closed once the Peer and the last queued Command are gone.
#[derive(Debug)]
pub struct PeerHandle {
    id: PeerId,
    addr: SocketAddr,
    writer: Mutex<FramedWrite<OwnedWriteHalf, RespFrameCodec>>,
}

#[derive(Debug)]
pub struct Peer {
    handle: Arc<PeerHandle>,
    reader: FramedRead<OwnedReadHalf, RespFrameCodec>,
    cmd_tx: mpsc::Sender<Command>,
}

impl RespFrameCodec {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            scanner: FrameScanner::default(),
            max_frame_len,
        }
    }
}

impl Default for RespFrameCodec {
    fn default() -> Self {
        Self::new(MAX_FRAME_LEN)
    }
}

impl PeerHandle {
    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    // send() encodes, writes and flushes, so a reply never waits in the
    // buffer behind the next one.
    pub async fn respond(&self, frame: RespFrame) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.send(frame).await
    }
}

impl Peer {
    pub fn new(
        id: PeerId,
        stream: TcpStream,
        addr: SocketAddr,
        cmd_tx: mpsc::Sender<Command>,
    ) -> Self {
        let (read_half, write_half) = stream.into_split();
        let handle = Arc::new(PeerHandle {
            id,
            addr,
            writer: Mutex::new(FramedWrite::new(write_half, RespFrameCodec::default())),
        });
        Self {
            handle,
            reader: FramedRead::new(read_half, RespFrameCodec::default()),
            cmd_tx,
        }
    }

    // Reads frames until the client hangs up (Ok) or sends something that
    // cannot be decoded (Err). Frames are queued in the order they were read;
    // a full queue suspends this loop until the dispatcher catches up.
    pub async fn read_loop(mut self) -> Result<()> {
        loop {
            match self.reader.next().await {
                Some(Ok(frame)) => {
                    debug!("Received frame: {:?}", frame);
                    let cmd = Command::new(self.handle.clone(), frame);
                    if self.cmd_tx.send(cmd).await.is_err() {
                        info!("Command queue closed, dropping connection");
                        return Ok(());
                    }
                }
                Some(Err(e)) => return Err(e),
                None => return Ok(()),
            }
        }
    }
}

impl Encoder<RespFrame> for RespFrameCodec {
    type Error = anyhow::Error;

    fn encode(&mut self, item: RespFrame, dst: &mut BytesMut) -> Result<()> {
        let encoded = item.encode();
        dst.extend_from_slice(&encoded);
        Ok(())
    }
}

impl Decoder for RespFrameCodec {
    type Item = RespFrame;
    type Error = anyhow::Error;

    // FramedRead calls this after every read with everything buffered so far.
    // Ok(None) asks for more bytes; the scanner remembers how far it got, so
    // the next call only looks at what is new. Once the scanner has seen a
    // whole frame, RespFrame::decode takes exactly that frame off the front
    // and whatever follows it stays in the buffer for the next call.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RespFrame>> {
        match self.scanner.scan(src) {
            Ok(Some(_)) => {
                self.scanner.reset();
                Ok(Some(RespFrame::decode(src)?))
            }
            Ok(None) if src.len() > self.max_frame_len => {
                self.scanner.reset();
                Err(RespError::FrameTooLarge(self.max_frame_len).into())
            }
            Ok(None) => Ok(None),
            Err(e) => {
                self.scanner.reset();
                Err(e.into())
            }
        }
    }

    // Called once the socket reports EOF. An empty buffer means the client hung
    // up between commands, which ends the stream quietly. Bytes left over that
    // do not make a whole frame mean the client went away mid-command; that is
    // reported as an error so the read loop logs it.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<RespFrame>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(RespError::UnexpectedEof.into()),
        }
    }
}
