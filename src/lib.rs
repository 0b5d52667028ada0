//! Ringward: a self-healing ring of cooperating processes that advance a
//! shared counter to a target value.
//!
//! Each participant supervises the ring position below its own, restarting
//! it on detected death, while liveness, identity, and counter state spread
//! over best-effort UDP multicast gossip. The ring tolerates the crash of
//! any individual participant without losing progress or duplicating work.
//! It is not byzantine-fault-tolerant: a permanently lost owner (highest
//! ring position) halts counting even though the rest of the ring keeps
//! healing itself.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod gossip;
pub mod launcher;
pub mod node;
pub mod owner;
pub mod registry;
pub mod state;
pub mod supervisor;
pub mod wire;

pub use bootstrap::BootstrapState;
pub use config::Config;
pub use error::{Result, RingError};
pub use node::RingNode;
pub use state::{RingState, StopReason};
