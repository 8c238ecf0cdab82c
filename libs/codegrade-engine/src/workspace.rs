//! Per-submission working directories under the execution root, plus the
//! periodic sweep that reclaims anything the per-task path left behind.

use crate::engine::ProcessTracker;
use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use codegrade_common::config::EngineConfig;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// An exclusively owned directory. Dropping an unreleased workspace removes it.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    path: PathBuf,
    created_at: DateTime<Utc>,
    released: bool,
}

impl Workspace {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub async fn write_file(&self, name: &str, contents: &str) -> EngineResult<()> {
        let path = self.path.join(name);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| EngineError::workspace(path, e))
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let path = std::mem::take(&mut self.path);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = remove_tree(&path).await {
                        warn!(path = %path.display(), error = %e, "Failed to remove dropped workspace");
                    }
                });
            }
            Err(_) => {
                if let Err(e) = std::fs::remove_dir_all(&path) {
                    if e.kind() != io::ErrorKind::NotFound {
                        warn!(path = %path.display(), error = %e, "Failed to remove dropped workspace");
                    }
                }
            }
        }
    }
}

async fn remove_tree(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Outcome of one sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub failed: usize,
    pub killed: usize,
}

#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
    retention: Duration,
    cleanup_delay: Duration,
    stray_age: Duration,
    tracker: Arc<ProcessTracker>,
}

impl WorkspaceManager {
    pub fn new(config: &EngineConfig, tracker: Arc<ProcessTracker>) -> Self {
        Self {
            root: config.execution_root_dir.clone(),
            retention: config.cleanup_retention(),
            cleanup_delay: config.cleanup_delay(),
            stray_age: config.stray_process_age(),
            tracker,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a fresh, uniquely named directory under the root
    pub async fn create(&self) -> EngineResult<Workspace> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| EngineError::workspace(&self.root, e))?;

        let id = Uuid::new_v4();
        let path = self.root.join(id.to_string());
        tokio::fs::create_dir(&path)
            .await
            .map_err(|e| EngineError::workspace(&path, e))?;

        debug!(workspace = %id, path = %path.display(), "Workspace created");
        Ok(Workspace {
            id,
            path,
            created_at: Utc::now(),
            released: false,
        })
    }

    /// Kill leftover processes and delete the directory now
    pub async fn destroy(&self, mut workspace: Workspace) -> EngineResult<()> {
        workspace.released = true;
        self.tracker.kill_workspace(workspace.id);
        remove_tree(&workspace.path)
            .await
            .map_err(|e| EngineError::workspace(&workspace.path, e))
    }

    /// Hand the workspace back after its response is produced. Deletion runs
    /// after the configured delay; failures are left to the sweep.
    pub fn release(&self, mut workspace: Workspace) {
        workspace.released = true;
        let id = workspace.id;
        let path = std::mem::take(&mut workspace.path);
        let delay = self.cleanup_delay;
        let tracker = Arc::clone(&self.tracker);

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let killed = tracker.kill_workspace(id);
            if killed > 0 {
                debug!(workspace = %id, killed, "Killed leftover process groups");
            }
            match remove_tree(&path).await {
                Ok(()) => debug!(workspace = %id, "Workspace removed"),
                Err(e) => warn!(
                    workspace = %id,
                    path = %path.display(),
                    error = %e,
                    "Workspace cleanup failed, leaving it to the sweep"
                ),
            }
        });
    }

    /// One pass: remove root entries older than the retention window and kill
    /// tracked process groups older than the stray age. Never fails.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport {
            killed: self.tracker.kill_older_than(self.stray_age),
            ..Default::default()
        };

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return report,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "Sweep could not list execution root");
                return report;
            }
        };

        let now = SystemTime::now();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Sweep failed while listing execution root");
                    break;
                }
            };
            let path = entry.path();

            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping entry without metadata");
                    continue;
                }
            };
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age <= self.retention {
                continue;
            }

            let result = if metadata.is_dir() {
                remove_tree(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };
            match result {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Sweep failed to remove stale entry");
                    report.failed += 1;
                }
            }
        }

        if report != SweepReport::default() {
            info!(
                removed = report.removed,
                failed = report.failed,
                killed = report.killed,
                "Sweep finished"
            );
        }
        report
    }

    /// Run `sweep` every `interval` for as long as the handle is not aborted
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.sweep().await;
            }
        })
    }
}
