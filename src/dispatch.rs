// The single consumer of the command queue. Every command runs here, one at a
// time, so handlers never race each other on the Backend; connections only
// overlap in their socket I/O.

use crate::{cmd, network::PeerHandle, Backend, RespFrame, SimpleString};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct Command {
    peer: Arc<PeerHandle>,
    frame: RespFrame,
}

#[derive(Debug)]
pub struct Dispatcher {
    backend: Backend,
    cmd_rx: mpsc::Receiver<Command>,
}

impl Command {
    pub fn new(peer: Arc<PeerHandle>, frame: RespFrame) -> Self {
        Self { peer, frame }
    }
}

impl Dispatcher {
    pub fn new(backend: Backend, cmd_rx: mpsc::Receiver<Command>) -> Self {
        Self { backend, cmd_rx }
    }

    // Runs until every sender (the server and all peers) has been dropped.
    pub async fn run(mut self) {
        while let Some(cmd) = self.cmd_rx.recv().await {
            self.dispatch(cmd).await;
        }
        info!("Command queue closed, dispatcher stopped");
    }

    // The reply is written and flushed before the next command is taken off
    // the queue. A peer's commands enter the queue in the order they were
    // read, so its replies leave in that order too. A client that stops
    // reading its replies stalls the dispatcher here once its socket buffer
    // is full.
    async fn dispatch(&self, cmd: Command) {
        let Command { peer, frame } = cmd;
        let Some(reply) = execute(&self.backend, frame) else {
            warn!(
                "Malformed command from peer {} ({}): expected a non-empty array",
                peer.id(),
                peer.addr()
            );
            return;
        };

        debug!("Sending response to peer {}: {:?}", peer.id(), reply);
        if let Err(e) = peer.respond(reply).await {
            warn!("Failed to write response to {}: {:?}", peer.addr(), e);
        }
    }
}

// Resolves the leading token of a command frame and runs its handler.
// Returns None for frames that are not a non-empty array; those get no reply.
// Unknown commands get an empty simple string.
pub fn execute(backend: &Backend, frame: RespFrame) -> Option<RespFrame> {
    let args = match frame {
        RespFrame::Array(arr) if !arr.is_empty() => arr.into_inner(),
        _ => return None,
    };

    let mut args = args.into_iter();
    let name = args
        .next()
        .and_then(|f| f.as_bytes().map(|b| String::from_utf8_lossy(b).to_ascii_uppercase()))
        .unwrap_or_default();

    match cmd::lookup(&name) {
        Some(handler) => Some(handler(backend, args.collect())),
        None => {
            warn!("Unsupported command: {:?}", name);
            Some(SimpleString::new("").into())
        }
    }
}
