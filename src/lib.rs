mod backend;
pub mod cmd;
mod config;
pub mod dispatch;
pub mod network;
mod resp;
mod server;

pub use backend::*;
pub use config::*;
pub use resp::*;
pub use server::{PeerRegistry, Server};
