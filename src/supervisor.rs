//! Supervision of the single ring position below ours.
//!
//! Each participant guarantees its child slot is backed by a live process:
//! it adopts a handle the registry already names, relaunches on detected
//! death, and backs off its polling while the child stays healthy. A
//! relaunched child resumes from the freshest counter state, which may have
//! advanced via gossip since the previous launch.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::bootstrap::BootstrapState;
use crate::config::Config;
use crate::error::Result;
use crate::launcher::Launcher;
use crate::registry::child_of;
use crate::state::RingState;

/// Supervisor for this participant's single child position
pub struct Supervisor<L: Launcher> {
    state: Arc<RingState>,
    launcher: L,
    child_index: u16,
    /// Handle currently being monitored; None until adopted or launched
    current: Option<u32>,
    backoff_ms: u64,
    max_backoff_ms: u64,
}

impl<L: Launcher> Supervisor<L> {
    pub fn new(config: &Config, state: Arc<RingState>, launcher: L) -> Self {
        let child_index = child_of(state.pindex, state.ring_size);
        Self {
            state,
            launcher,
            child_index,
            current: None,
            backoff_ms: config.initial_backoff_ms,
            max_backoff_ms: config.max_backoff_ms,
        }
    }

    /// Ring position this supervisor keeps alive
    pub fn child_index(&self) -> u16 {
        self.child_index
    }

    /// Current poll interval. Doubles while the child stays alive, capped;
    /// not reset on relaunch so a flapping child cannot pin the loop at the
    /// floor.
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// One liveness check: adopt, monitor, or relaunch the child
    pub async fn poll(&mut self) -> Result<()> {
        let handle = match self.current {
            Some(handle) => handle,
            None => match self.state.registry.get(self.child_index).await {
                Some(handle) => {
                    debug!(
                        "adopting handle {} for ring position {}",
                        handle, self.child_index
                    );
                    self.current = Some(handle);
                    handle
                }
                None => return self.relaunch().await,
            },
        };

        if self.launcher.is_alive(handle) {
            self.backoff_ms = (self.backoff_ms * 2).min(self.max_backoff_ms);
            Ok(())
        } else {
            info!("bringing back ring position {}", self.child_index);
            self.relaunch().await
        }
    }

    /// Launch a new process for the child slot, resuming from the freshest
    /// counter state and registry snapshot we hold
    async fn relaunch(&mut self) -> Result<()> {
        let counter = self.state.counter_snapshot().await;
        let snapshot = self.state.registry.snapshot().await;
        let args = BootstrapState::render_args(
            self.child_index,
            counter.count,
            counter.last_tick_ms,
            &snapshot,
        );

        let handle = self.launcher.launch(&args).await?;
        self.state.registry.set(self.child_index, handle).await;
        self.current = Some(handle);
        info!(
            "ring position {} is now process {}",
            self.child_index, handle
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct MockInner {
        launched: Vec<Vec<String>>,
        alive: HashSet<u32>,
        next_handle: u32,
    }

    /// Scripted launcher that records launches and answers liveness from a
    /// set of live handles
    #[derive(Clone, Default)]
    struct MockLauncher {
        inner: Arc<StdMutex<MockInner>>,
    }

    impl MockLauncher {
        fn set_alive(&self, handle: u32, alive: bool) {
            let mut inner = self.inner.lock().unwrap();
            if alive {
                inner.alive.insert(handle);
            } else {
                inner.alive.remove(&handle);
            }
        }

        fn launches(&self) -> Vec<Vec<String>> {
            self.inner.lock().unwrap().launched.clone()
        }
    }

    #[async_trait]
    impl Launcher for MockLauncher {
        async fn launch(&mut self, args: &[String]) -> Result<u32> {
            let mut inner = self.inner.lock().unwrap();
            inner.next_handle += 1;
            let handle = 1000 + inner.next_handle;
            inner.launched.push(args.to_vec());
            inner.alive.insert(handle);
            Ok(handle)
        }

        fn is_alive(&mut self, handle: u32) -> bool {
            self.inner.lock().unwrap().alive.contains(&handle)
        }
    }

    async fn state_at(pindex: u16, snapshot: &[i64]) -> Arc<RingState> {
        let config = Config::default();
        let boot = BootstrapState {
            pindex,
            count: 37,
            last_tick_ms: 12345,
            registry_snapshot: snapshot.to_vec(),
        };
        RingState::from_bootstrap(&boot, &config).await
    }

    #[tokio::test]
    async fn test_unknown_child_is_launched_with_current_state() {
        let config = Config::default();
        let state = state_at(2, &[]).await;
        let mock = MockLauncher::default();
        let mut supervisor = Supervisor::new(&config, Arc::clone(&state), mock.clone());

        assert_eq!(supervisor.child_index(), 1);
        supervisor.poll().await.unwrap();

        let launches = mock.launches();
        assert_eq!(launches.len(), 1);
        // pindex, count, tick, then 5 registry entries
        assert_eq!(launches[0][0], "1");
        assert_eq!(launches[0][1], "37");
        assert_eq!(launches[0][2], "12345");
        assert_eq!(launches[0].len(), 3 + 5);
        // The new handle is recorded
        assert_eq!(state.registry.get(1).await, Some(1001));
    }

    #[tokio::test]
    async fn test_live_adopted_child_is_not_relaunched() {
        let config = Config::default();
        // Position 1 (our child) is already backed by handle 222
        let state = state_at(2, &[-1, -1, -1, 222, -1]).await;
        let mock = MockLauncher::default();
        mock.set_alive(222, true);
        let mut supervisor = Supervisor::new(&config, state, mock.clone());

        supervisor.poll().await.unwrap();
        assert!(mock.launches().is_empty());
    }

    #[tokio::test]
    async fn test_dead_child_is_relaunched_with_fresh_count() {
        let config = Config::default();
        let state = state_at(2, &[-1, -1, -1, 222, -1]).await;
        let mock = MockLauncher::default();
        mock.set_alive(222, true);
        let mut supervisor = Supervisor::new(&config, Arc::clone(&state), mock.clone());

        supervisor.poll().await.unwrap();
        assert!(mock.launches().is_empty());

        // The counter advances via gossip, then the child dies
        state.merge_count(64, 30000).await;
        mock.set_alive(222, false);
        supervisor.poll().await.unwrap();

        let launches = mock.launches();
        assert_eq!(launches.len(), 1);
        // Restart resumes from the merged state, not launch-time state
        assert_eq!(launches[0][1], "64");
        assert_eq!(launches[0][2], "30000");
        assert_eq!(state.registry.get(1).await, Some(1001));
    }

    #[tokio::test]
    async fn test_backoff_doubles_while_child_is_healthy_and_caps() {
        let config = Config::default();
        let state = state_at(2, &[-1, -1, -1, 222, -1]).await;
        let mock = MockLauncher::default();
        mock.set_alive(222, true);
        let mut supervisor = Supervisor::new(&config, state, mock);

        assert_eq!(supervisor.backoff(), Duration::from_millis(5));
        supervisor.poll().await.unwrap();
        assert_eq!(supervisor.backoff(), Duration::from_millis(10));
        supervisor.poll().await.unwrap();
        assert_eq!(supervisor.backoff(), Duration::from_millis(20));

        for _ in 0..20 {
            supervisor.poll().await.unwrap();
        }
        assert_eq!(supervisor.backoff(), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_registry_snapshot_is_forwarded_in_descending_order() {
        let config = Config::default();
        let state = state_at(3, &[900, -1, -1, 200, 100]).await;
        let mock = MockLauncher::default();
        let mut supervisor = Supervisor::new(&config, Arc::clone(&state), mock.clone());

        // Child slot 2 is unknown, so the first poll launches it
        supervisor.poll().await.unwrap();

        let own_pid = std::process::id().to_string();
        let launches = mock.launches();
        // Highest position first: 900, our own pid at 3, new handle later,
        // then 200, 100
        assert_eq!(launches[0][3], "900");
        assert_eq!(launches[0][4], own_pid);
        assert_eq!(launches[0][6], "200");
        assert_eq!(launches[0][7], "100");
    }
}
