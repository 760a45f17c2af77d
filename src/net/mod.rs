//! Datagram transport: wire framing and the priority ingress queue.

pub mod priority_queue;
pub mod wire;

use std::net::SocketAddr;
use tokio::net::UdpSocket;

use wire::Message;

/// Best-effort send of an encoded message. Transport errors are logged and
/// swallowed; the caller's loop is expected to continue regardless.
pub async fn send(socket: &UdpSocket, msg: &Message, to: SocketAddr) {
    match msg.encode() {
        Ok(bytes) => {
            if let Err(e) = socket.send_to(&bytes, to).await {
                log::warn!("send to {} failed: {}", to, e);
            }
        }
        Err(e) => {
            log::warn!("failed to encode message for {}: {}", to, e);
        }
    }
}

/// Loopback socket address for `port`.
pub fn loopback(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}
