//! The cooperative main loop of one ring participant.
//!
//! Single-threaded polling: check the stop flag, poll the supervisor, poll
//! the owner tick when we hold the highest position, sleep for the current
//! backoff, repeat. Only the gossip receive task runs concurrently with
//! this loop.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::gossip::GossipSender;
use crate::launcher::Launcher;
use crate::owner::Owner;
use crate::state::{RingState, StopReason};
use crate::supervisor::Supervisor;

/// One ring participant: supervisor plus, at the highest position, the
/// counter owner
pub struct RingNode<L: Launcher> {
    config: Arc<Config>,
    state: Arc<RingState>,
    supervisor: Supervisor<L>,
    owner: Option<Owner>,
}

impl<L: Launcher> RingNode<L> {
    pub fn new(
        config: Arc<Config>,
        state: Arc<RingState>,
        launcher: L,
        gossip: GossipSender,
    ) -> Self {
        let supervisor = Supervisor::new(&config, Arc::clone(&state), launcher);
        let owner = state.is_owner().then(|| {
            Owner::new(Arc::clone(&config), Arc::clone(&state), gossip)
        });
        Self {
            config,
            state,
            supervisor,
            owner,
        }
    }

    /// Run until a stop reason is observed
    pub async fn run(&mut self) -> Result<StopReason> {
        info!(
            "ring position {} running, supervising position {}",
            self.state.pindex,
            self.supervisor.child_index()
        );

        loop {
            if let Some(reason) = self.state.stop_reason().await {
                debug!("stopping: {:?}", reason);
                return Ok(reason);
            }

            self.supervisor.poll().await?;

            if let Some(owner) = &self.owner {
                owner.poll().await?;
            }

            let mut interval = self.supervisor.backoff();
            if self.owner.is_some() {
                // The owner never oversleeps a tick deadline by more than
                // the cap
                interval = interval.min(Duration::from_millis(self.config.owner_poll_cap_ms));
            }
            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::BootstrapState;
    use crate::error::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::timeout;

    /// Launcher whose children are always alive; counts launches
    #[derive(Default)]
    struct AlwaysAliveLauncher {
        launches: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Launcher for AlwaysAliveLauncher {
        async fn launch(&mut self, _args: &[String]) -> Result<u32> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            Ok(4000 + self.launches.load(Ordering::SeqCst))
        }

        fn is_alive(&mut self, _handle: u32) -> bool {
            true
        }
    }

    async fn node_at(pindex: u16) -> (RingNode<AlwaysAliveLauncher>, Arc<RingState>, Arc<AtomicU32>) {
        let config = Arc::new(Config::default());
        let boot = BootstrapState {
            pindex,
            count: 0,
            last_tick_ms: crate::state::minute_millis(),
            registry_snapshot: vec![],
        };
        let state = RingState::from_bootstrap(&boot, &config).await;
        let launcher = AlwaysAliveLauncher::default();
        let launches = Arc::clone(&launcher.launches);
        let gossip = GossipSender::new(&config.gossip);
        let node = RingNode::new(config, Arc::clone(&state), launcher, gossip);
        (node, state, launches)
    }

    #[tokio::test]
    async fn test_run_observes_a_preexisting_stop_reason() {
        let (mut node, state, _) = node_at(1).await;
        state.request_stop(StopReason::TerminateReceived).await;
        let reason = node.run().await.unwrap();
        assert_eq!(reason, StopReason::TerminateReceived);
    }

    #[tokio::test]
    async fn test_run_exits_within_one_interval_of_a_stop_request() {
        let (mut node, state, _) = node_at(1).await;
        let handle = tokio::spawn(async move { node.run().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        state.request_stop(StopReason::PositionConflict).await;

        let reason = timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop did not observe the stop flag")
            .unwrap()
            .unwrap();
        assert_eq!(reason, StopReason::PositionConflict);
    }

    #[tokio::test]
    async fn test_unknown_child_is_launched_on_the_first_iteration() {
        let (mut node, state, launches) = node_at(2).await;
        let handle = tokio::spawn(async move { node.run().await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        state.request_stop(StopReason::TerminateReceived).await;
        timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert_eq!(launches.load(Ordering::SeqCst), 1);
        assert_eq!(state.registry.get(1).await, Some(4001));
    }
}
