//! Best-effort multicast gossip between ring participants.
//!
//! Every participant binds the well-known port with address reuse and joins
//! the multicast group, so any number of them can co-reside on one host.
//! Sends go out on transient sockets and are never retried; a lost datagram
//! is covered by the next tick or restart announce.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::GossipConfig;
use crate::error::{Result, RingError};
use crate::state::{RingState, StopReason};
use crate::wire::Message;

/// Handle for multicasting gossip messages to the whole ring
#[derive(Debug, Clone, Copy)]
pub struct GossipSender {
    group: Ipv4Addr,
    port: u16,
}

impl GossipSender {
    pub fn new(config: &GossipConfig) -> Self {
        Self {
            group: config.group,
            port: config.port,
        }
    }

    /// Send one datagram to the group on a transient socket. Best-effort:
    /// failures are logged and never retried.
    pub async fn send(&self, msg: &Message) {
        let buf = msg.encode();
        let target = SocketAddrV4::new(self.group, self.port);
        match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await {
            Ok(socket) => {
                if let Err(e) = socket.send_to(&buf, SocketAddr::V4(target)).await {
                    warn!("failed to send gossip to {}: {}", target, e);
                }
            }
            Err(e) => warn!("failed to open gossip send socket: {}", e),
        }
    }
}

/// The bound, group-joined receive socket
pub struct GossipListener {
    socket: UdpSocket,
}

impl GossipListener {
    /// Bind the well-known port with address reuse and join the multicast
    /// group
    pub fn join(config: &GossipConfig) -> Result<Self> {
        let socket =
            Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(RingError::SocketError)?;
        socket
            .set_reuse_address(true)
            .map_err(RingError::SocketError)?;
        let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
        socket
            .bind(&bind_addr.into())
            .map_err(RingError::SocketError)?;
        socket
            .join_multicast_v4(&config.group, &Ipv4Addr::UNSPECIFIED)
            .map_err(RingError::SocketError)?;
        socket
            .set_nonblocking(true)
            .map_err(RingError::SocketError)?;

        let std_socket: std::net::UdpSocket = socket.into();
        let socket = UdpSocket::from_std(std_socket).map_err(RingError::SocketError)?;
        info!("joined gossip group {}:{}", config.group, config.port);
        Ok(Self { socket })
    }

    /// Start the receive loop. It runs for the life of the process and
    /// mutates the shared state as datagrams arrive; reception never blocks
    /// the main loop.
    pub fn spawn(self, state: Arc<RingState>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            loop {
                match self.socket.recv_from(&mut buf).await {
                    Ok((len, src)) => match Message::decode(&buf[..len]) {
                        Ok(Some(msg)) => handle_message(&state, msg).await,
                        Ok(None) => debug!("ignoring unknown opcode from {}", src),
                        Err(e) => warn!("dropping malformed datagram from {}: {}", src, e),
                    },
                    Err(e) => {
                        warn!("gossip receive error: {}", e);
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    }
                }
            }
        })
    }
}

/// Apply one decoded gossip message to the shared state
pub async fn handle_message(state: &RingState, msg: Message) {
    match msg {
        Message::Identity { position, handle } => {
            if position == state.pindex {
                // Someone else live on our slot; yield to the newer claim
                info!(
                    "ring position {} claimed by another process, stopping",
                    position
                );
                state.request_stop(StopReason::PositionConflict).await;
            } else if position < state.ring_size {
                debug!("position {} announced handle {}", position, handle);
                state.registry.set(position, handle as u32).await;
            }
        }
        Message::Count { count, tick_ms } => {
            if state.merge_count(count as u32, tick_ms as u32).await {
                debug!("adopted gossiped count {}", count);
            }
        }
        Message::Terminate => {
            info!("terminate broadcast received");
            state.request_stop(StopReason::TerminateReceived).await;
        }
    }
}
