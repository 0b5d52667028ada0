//! The counter owner's tick loop.
//!
//! Only the participant at the highest ring position advances the counter.
//! Each poll compares the wall clock against the last tick; when the
//! interval has elapsed it increments the count and gossips it, all under
//! the counter lock so a concurrent merge either fully precedes or fully
//! follows the update. On reaching the target it persists the result,
//! broadcasts Terminate, and stops its own loop.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::error::{Result, RingError};
use crate::gossip::GossipSender;
use crate::state::{minute_millis, RingState, StopReason};
use crate::wire::{to_wire, Message};

/// Milliseconds between two minute-of-hour timestamps. The absolute
/// difference makes the once-a-minute wrap read as a large elapse, costing
/// at most one early tick.
fn elapsed_ms(now: u32, last: u32) -> u32 {
    (i64::from(now) - i64::from(last)).unsigned_abs() as u32
}

/// Write the final count to the result artifact, a single line, write-once
fn persist_result(path: &Path, count: u32) -> Result<()> {
    std::fs::write(path, format!("{}\n", count)).map_err(RingError::ResultFileError)
}

/// Tick driver for the owner participant
pub struct Owner {
    config: Arc<Config>,
    state: Arc<RingState>,
    gossip: GossipSender,
}

impl Owner {
    pub fn new(config: Arc<Config>, state: Arc<RingState>, gossip: GossipSender) -> Self {
        Self {
            config,
            state,
            gossip,
        }
    }

    /// One tick check. Advances and gossips the counter when the interval
    /// has elapsed; finishes the run when the target is reached.
    pub async fn poll(&self) -> Result<()> {
        let now = minute_millis();
        let mut counter = self.state.counter.lock().await;
        if elapsed_ms(now, counter.last_tick_ms) <= self.config.tick_interval_ms {
            return Ok(());
        }

        counter.last_tick_ms = now;
        counter.count += 1;
        let count = counter.count;
        self.gossip
            .send(&Message::Count {
                count: to_wire(count),
                tick_ms: to_wire(now),
            })
            .await;

        let reached = count >= self.config.target_count;
        if reached {
            persist_result(&self.config.result_file, count)?;
            self.gossip.send(&Message::Terminate).await;
        }
        drop(counter);

        info!("count {}", count);
        if reached {
            info!(
                "target {} reached, result persisted to {}",
                self.config.target_count,
                self.config.result_file.display()
            );
            self.state.request_stop(StopReason::TargetReached).await;
        }
        Ok(())
    }
}
