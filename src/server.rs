use crate::{
    dispatch::{Command, Dispatcher},
    network::{Peer, PeerId},
    Backend, Config,
};
use anyhow::Result;
use dashmap::DashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{error, info, info_span, warn, Instrument};

// Listener plus the state shared by every connection it accepts.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    backend: Backend,
    peers: PeerRegistry,
    queue_capacity: usize,
}

/// Addresses of the connections whose read loop is still running.
/// Only the address is kept: sockets are owned by the peer tasks, so
/// dropping an entry never closes anything.
#[derive(Debug, Clone, Default)]
pub struct PeerRegistry(Arc<DashMap<PeerId, SocketAddr>>);

impl PeerRegistry {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&self, id: PeerId, addr: SocketAddr) {
        self.0.insert(id, addr);
    }

    fn remove(&self, id: PeerId) {
        self.0.remove(&id);
    }
}

impl Server {
    pub async fn bind(config: &Config) -> Result<Self> {
        let listener = TcpListener::bind(config.addr()).await?;
        info!("Redis-Lite is listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            backend: Backend::new(),
            peers: PeerRegistry::default(),
            queue_capacity: config.queue_capacity.max(1),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    // Live view of the connected peers; stays valid after `run` takes the server.
    pub fn peers(&self) -> PeerRegistry {
        self.peers.clone()
    }

    // Serves until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Unable to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    // Accepts connections until `shutdown` completes. A failed accept ends the
    // server with that error: the listening socket is not retried.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        // Every peer gets a clone of cmd_tx; the dispatcher holds the only
        // receiver. With the queue full, a peer's send().await parks that
        // peer's read loop until the dispatcher frees a slot, so commands wait
        // instead of being dropped.
        let (cmd_tx, cmd_rx) = mpsc::channel(self.queue_capacity);
        tokio::spawn(Dispatcher::new(self.backend.clone(), cmd_rx).run());

        tokio::pin!(shutdown);
        let mut next_id: PeerId = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        next_id += 1;
                        self.spawn_peer(next_id, stream, addr, cmd_tx.clone());
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                        return Err(e.into());
                    }
                },
            }
        }
    }

    fn spawn_peer(
        &self,
        id: PeerId,
        stream: TcpStream,
        addr: SocketAddr,
        cmd_tx: mpsc::Sender<Command>,
    ) {
        self.peers.insert(id, addr);
        info!("Accepted connection from {} ({} connected)", addr, self.peers.len());

        let peers = self.peers.clone();
        let peer = Peer::new(id, stream, addr, cmd_tx);
        tokio::spawn(
            async move {
                match peer.read_loop().await {
                    Ok(_) => info!("Connection closed"),
                    Err(e) => warn!("Read error, closing connection: {:?}", e),
                }
                peers.remove(id);
                info!("{} connected", peers.len());
            }
            .instrument(info_span!("peer", id, %addr)),
        );
    }
}
