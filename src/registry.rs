//! The believed identity of every ring position.
//!
//! Entries are advisory: gossip may arrive out of order and nothing verifies
//! that a handle still names a live process of the right role. Liveness is
//! checked directly against the OS by the supervisor, never inferred from
//! gossip silence, so entries are only changed by an explicit restart or a
//! received Identity message.

use tokio::sync::RwLock;

/// Sentinel for an unknown process handle in bootstrap arguments
pub const UNKNOWN_HANDLE: i64 = -1;

/// Ring position supervised by `position`: the next slot down, wrapping
pub fn child_of(position: u16, ring_size: u16) -> u16 {
    (position + ring_size - 1) % ring_size
}

/// Lock-protected table mapping ring position to believed process handle
#[derive(Debug)]
pub struct RingRegistry {
    handles: RwLock<Vec<Option<u32>>>,
}

impl RingRegistry {
    /// Initialize all entries from a bootstrap snapshot, highest ring
    /// position first. Missing trailing entries stay unknown.
    pub fn seed(ring_size: u16, snapshot: &[i64]) -> Self {
        let n = ring_size as usize;
        let mut handles = vec![None; n];
        for (i, &handle) in snapshot.iter().take(n).enumerate() {
            if handle >= 0 {
                handles[n - 1 - i] = Some(handle as u32);
            }
        }
        Self {
            handles: RwLock::new(handles),
        }
    }

    /// Record a believed handle for a ring position
    pub async fn set(&self, position: u16, handle: u32) {
        let mut handles = self.handles.write().await;
        if let Some(slot) = handles.get_mut(position as usize) {
            *slot = Some(handle);
        }
    }

    /// Believed handle for a ring position, if any
    pub async fn get(&self, position: u16) -> Option<u32> {
        self.handles
            .read()
            .await
            .get(position as usize)
            .copied()
            .flatten()
    }

    /// Snapshot in bootstrap-argument order: highest ring position first,
    /// unknown slots rendered as the -1 sentinel
    pub async fn snapshot(&self) -> Vec<i64> {
        let handles = self.handles.read().await;
        handles
            .iter()
            .rev()
            .map(|h| h.map_or(UNKNOWN_HANDLE, |pid| pid as i64))
            .collect()
    }
}
