//! Shared state for one ring participant.
//!
//! A single `RingState` aggregate is shared by `Arc` between the cooperative
//! main loop and the gossip receive task. The registry and the counter sit
//! behind separate locks that are never held at the same time.

use std::sync::Arc;

use chrono::{Local, Timelike};
use tokio::sync::{Mutex, RwLock};

use crate::bootstrap::BootstrapState;
use crate::config::Config;
use crate::registry::RingRegistry;

/// Wall-clock millisecond-of-minute, the protocol's tick timestamp unit.
///
/// Stays below 60_000, which is why the wire can carry it in 16 bits. The
/// wrap at the top of each minute makes at most one tick fire early.
pub fn minute_millis() -> u32 {
    let now = Local::now();
    now.second() * 1000 + now.timestamp_subsec_millis()
}

/// Why the main loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// This participant is the owner and the counter reached the target
    TargetReached,
    /// A Terminate broadcast arrived
    TerminateReceived,
    /// Another live process announced a claim to our ring position
    PositionConflict,
}

/// The shared counter: count plus the timestamp of the last owner tick
#[derive(Debug, Clone, Copy)]
pub struct Counter {
    pub count: u32,
    pub last_tick_ms: u32,
}

/// State shared between the main loop and the gossip receive task
#[derive(Debug)]
pub struct RingState {
    /// This participant's ring position, fixed for the process lifetime
    pub pindex: u16,
    /// Number of ring positions
    pub ring_size: u16,
    /// Believed identity of every ring position
    pub registry: RingRegistry,
    /// Counter state, mutated by the owner tick and by gossip merges
    pub counter: Mutex<Counter>,
    /// Set once; observed at the top of every main loop iteration
    stop: RwLock<Option<StopReason>>,
}

impl RingState {
    /// Build the aggregate from bootstrap state and record our own handle in
    /// our registry slot
    pub async fn from_bootstrap(boot: &BootstrapState, config: &Config) -> Arc<Self> {
        let state = Arc::new(Self {
            pindex: boot.pindex,
            ring_size: config.ring_size,
            registry: RingRegistry::seed(config.ring_size, &boot.registry_snapshot),
            counter: Mutex::new(Counter {
                count: boot.count,
                last_tick_ms: boot.last_tick_ms,
            }),
            stop: RwLock::new(None),
        });
        state.registry.set(boot.pindex, std::process::id()).await;
        state
    }

    /// Whether this participant holds the highest ring position
    pub fn is_owner(&self) -> bool {
        self.pindex == self.ring_size.saturating_sub(1)
    }

    /// Adopt an observed counter value only if it is strictly greater than
    /// ours. Stale, duplicate, and lower values are discarded, so the local
    /// count never decreases.
    pub async fn merge_count(&self, count: u32, tick_ms: u32) -> bool {
        let mut counter = self.counter.lock().await;
        if count > counter.count {
            counter.count = count;
            counter.last_tick_ms = tick_ms;
            true
        } else {
            false
        }
    }

    /// Current counter snapshot
    pub async fn counter_snapshot(&self) -> Counter {
        *self.counter.lock().await
    }

    /// Request the main loop to stop. The first reason wins.
    pub async fn request_stop(&self, reason: StopReason) {
        let mut stop = self.stop.write().await;
        if stop.is_none() {
            *stop = Some(reason);
        }
    }

    /// The stop reason, if one has been requested
    pub async fn stop_reason(&self) -> Option<StopReason> {
        *self.stop.read().await
    }
}
