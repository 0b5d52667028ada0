//! Spawning and liveness-probing of ring participant processes.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use rustix::process::{test_kill_process, Pid};
use tokio::process::{Child, Command};
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, RingError};

/// Whether a process we did not spawn is still alive, by signal-0 probe
pub fn probe_pid(pid: u32) -> bool {
    match Pid::from_raw(pid as i32) {
        Some(pid) => test_kill_process(pid).is_ok(),
        None => false,
    }
}

/// Seam for starting and checking ring participants, mockable in tests
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Start a participant with the given bootstrap arguments, returning its
    /// process handle
    async fn launch(&mut self, args: &[String]) -> Result<u32>;

    /// Whether the process behind a handle is still running
    fn is_alive(&mut self, handle: u32) -> bool;
}

/// Production launcher that re-executes this binary
pub struct ProcessLauncher {
    exe: PathBuf,
    /// Flags appended after the bootstrap args so children share our
    /// configuration (e.g. `--config`, `--verbose`)
    forward_args: Vec<String>,
    children: HashMap<u32, Child>,
}

impl ProcessLauncher {
    /// Resolve the executable to relaunch children with: the configured
    /// override, or the currently running binary
    pub fn new(config: &Config, forward_args: Vec<String>) -> Result<Self> {
        let exe = match &config.child_exe {
            Some(path) => path.clone(),
            None => std::env::current_exe().map_err(RingError::ExecutableError)?,
        };
        Ok(Self {
            exe,
            forward_args,
            children: HashMap::new(),
        })
    }
}

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn launch(&mut self, args: &[String]) -> Result<u32> {
        debug!("spawning {} {:?}", self.exe.display(), args);
        let child = Command::new(&self.exe)
            .args(args)
            .args(&self.forward_args)
            .spawn()
            .map_err(RingError::SpawnError)?;

        let pid = child.id().ok_or_else(|| {
            RingError::SpawnError(io::Error::new(
                io::ErrorKind::Other,
                "child exited before its pid could be read",
            ))
        })?;
        self.children.insert(pid, child);
        Ok(pid)
    }

    fn is_alive(&mut self, handle: u32) -> bool {
        if let Some(child) = self.children.get_mut(&handle) {
            // try_wait also reaps; a signal-0 probe would see the zombie as
            // still alive
            match child.try_wait() {
                Ok(None) => true,
                Ok(Some(_)) | Err(_) => {
                    self.children.remove(&handle);
                    false
                }
            }
        } else {
            // A handle adopted from the registry, not spawned by us
            probe_pid(handle)
        }
    }
}
