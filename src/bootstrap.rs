//! Bootstrap state handed from a supervising parent to a freshly launched
//! participant, as positional command-line integers.
//!
//! Layout: ring position, count, last tick millis, then one process handle
//! per ring position in descending position order (-1 for unknown slots).
//! Zero arguments means this process is the bootstrap root and owner. One or
//! two arguments is malformed and fatal.

use crate::config::Config;
use crate::error::{Result, RingError};
use crate::state::minute_millis;

/// Fewest arguments a supervised participant is launched with
const MIN_SUPERVISED_ARGS: usize = 3;

/// Initial state a participant resumes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapState {
    /// This participant's ring position
    pub pindex: u16,
    /// Counter value at launch time
    pub count: u32,
    /// Timestamp of the last observed tick, millisecond-of-minute
    pub last_tick_ms: u32,
    /// Believed handles, highest ring position first
    pub registry_snapshot: Vec<i64>,
}

impl BootstrapState {
    /// State for the bootstrap root: owner position, zero count, the clock
    /// started now, nothing known about the rest of the ring yet
    pub fn root(config: &Config) -> Self {
        Self {
            pindex: config.owner_index(),
            count: 0,
            last_tick_ms: minute_millis(),
            registry_snapshot: Vec::new(),
        }
    }

    /// Parse positional launch arguments
    pub fn from_args(args: &[i64], config: &Config) -> Result<Self> {
        match args.len() {
            0 => Ok(Self::root(config)),
            n if n < MIN_SUPERVISED_ARGS => Err(RingError::MalformedBootstrap(n)),
            _ => Ok(Self {
                pindex: args[0] as u16,
                count: args[1] as u32,
                last_tick_ms: args[2] as u32,
                registry_snapshot: args[MIN_SUPERVISED_ARGS..].to_vec(),
            }),
        }
    }

    /// Render launch arguments for a child at `pindex`, resuming from the
    /// given counter state and registry snapshot
    pub fn render_args(
        pindex: u16,
        count: u32,
        last_tick_ms: u32,
        registry_snapshot: &[i64],
    ) -> Vec<String> {
        let mut args = Vec::with_capacity(MIN_SUPERVISED_ARGS + registry_snapshot.len());
        args.push(pindex.to_string());
        args.push(count.to_string());
        args.push(last_tick_ms.to_string());
        args.extend(registry_snapshot.iter().map(|h| h.to_string()));
        args
    }
}
