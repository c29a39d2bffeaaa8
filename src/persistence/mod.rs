//! Snapshot persistence
//!
//! Saves the whole engine to a sectioned text file and loads it back.
//! At most one save runs at a time: a save requested while another is in
//! flight fails fast with [`Error::SaveInProgress`].

mod format;

pub use format::{parse, render, Parsed};

use crate::error::{Error, Result};
use crate::store::{Snapshot, StorageEngine};
use crate::task::BackgroundTask;
use parking_lot::Mutex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Outcome of the most recent save
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveStatus {
    pub success: bool,
    pub path: PathBuf,
    pub keys: usize,
    /// Seconds since the Unix epoch
    pub finished_at: u64,
    pub error: Option<String>,
}

/// Outcome of a load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    pub keys: usize,
    pub skipped: usize,
}

struct Shared {
    engine: Arc<StorageEngine>,
    saving: AtomicBool,
    last_save: Mutex<Option<SaveStatus>>,
}

/// Holds the single-flight flag for the duration of one save
struct SaveGuard {
    shared: Arc<Shared>,
}

impl SaveGuard {
    fn acquire(shared: &Arc<Shared>) -> Result<Self> {
        shared
            .saving
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| Error::SaveInProgress)?;
        Ok(SaveGuard {
            shared: shared.clone(),
        })
    }
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        self.shared.saving.store(false, Ordering::SeqCst);
    }
}

/// Persistence manager
pub struct PersistenceManager {
    shared: Arc<Shared>,
    path: PathBuf,
    auto: BackgroundTask,
}

impl PersistenceManager {
    /// Create a manager saving to `path` by default
    pub fn new(engine: Arc<StorageEngine>, path: impl Into<PathBuf>) -> Self {
        PersistenceManager {
            shared: Arc::new(Shared {
                engine,
                saving: AtomicBool::new(false),
                last_save: Mutex::new(None),
            }),
            path: path.into(),
            auto: BackgroundTask::new("auto persistence"),
        }
    }

    /// Default snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy every partition
    pub fn create_snapshot(&self) -> Snapshot {
        self.shared.engine.snapshot()
    }

    /// Save the engine to `path`, blocking the caller
    ///
    /// Returns the number of keys written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let guard = SaveGuard::acquire(&self.shared)?;
        write_and_record(&guard.shared, path.as_ref())
    }

    /// Save to the default path
    pub fn save(&self) -> Result<usize> {
        self.save_to_file(&self.path)
    }

    /// Save the engine to `path` on the blocking pool
    ///
    /// Fails immediately if a save is already running; otherwise the handle
    /// resolves with the outcome.
    pub fn save_to_file_async(&self, path: impl Into<PathBuf>) -> Result<JoinHandle<Result<usize>>> {
        let guard = SaveGuard::acquire(&self.shared)?;
        let path = path.into();

        Ok(tokio::task::spawn_blocking(move || {
            write_and_record(&guard.shared, &path)
        }))
    }

    /// Save to the default path without blocking the runtime, and wait for it
    pub async fn save_async(&self) -> Result<usize> {
        self.save_to_file_async(self.path.clone())?
            .await
            .map_err(|e| Error::SaveTask(e.to_string()))?
    }

    /// Load `path` into the engine through ordinary engine calls
    pub fn load_from_file(&self, path: impl AsRef<Path>) -> Result<LoadReport> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::persistence(path, e))?;

        let Parsed { snapshot, skipped } = parse(&text);
        let engine = &self.shared.engine;

        for (key, value) in &snapshot.strings {
            engine.set(key, value.as_str());
        }
        for (key, fields) in &snapshot.hashes {
            for (field, value) in fields {
                engine.hset(key, field, value.as_str());
            }
        }
        for (key, values) in &snapshot.lists {
            engine.lpush(key, values.as_slice());
        }
        for (key, members) in &snapshot.sets {
            let members: Vec<&str> = members.iter().map(String::as_str).collect();
            engine.sadd(key, &members);
        }

        let report = LoadReport {
            keys: snapshot.key_count(),
            skipped,
        };

        if skipped > 0 {
            warn!(
                "Loaded {} keys from {:?}, skipped {} malformed lines",
                report.keys, path, skipped
            );
        } else {
            info!("Loaded {} keys from {:?}", report.keys, path);
        }

        Ok(report)
    }

    /// Save to the default path every `interval` until stopped
    ///
    /// A tick that finds a save still running is skipped.
    pub fn start_auto_persistence(&self, interval: Duration) -> Result<()> {
        if !self.auto.begin() {
            return Err(Error::AlreadyRunning(self.auto.name()));
        }

        let shared = self.shared.clone();
        let path = self.path.clone();
        let token = self.auto.token();
        let tracker = self.auto.tracker();

        self.auto.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let guard = match SaveGuard::acquire(&shared) {
                    Ok(guard) => guard,
                    Err(_) => {
                        warn!("Previous save still running, skipping this interval");
                        continue;
                    }
                };

                let path = path.clone();
                let save = tokio::task::spawn_blocking(move || write_and_record(&guard.shared, &path));

                // Tracked so that stopping waits for the save in flight
                tracker.spawn(async move {
                    match save.await {
                        Ok(Ok(keys)) => debug!("Auto-save wrote {} keys", keys),
                        Ok(Err(e)) => error!("Auto-save failed: {}", e),
                        Err(e) => error!("Auto-save task failed: {}", e),
                    }
                });
            }
        });

        info!("Auto persistence started, interval {:?}", interval);
        Ok(())
    }

    /// Stop the periodic save and wait for a save in flight
    pub async fn stop_auto_persistence(&self) {
        if self.auto.is_running() {
            self.auto.stop().await;
            info!("Auto persistence stopped");
        }
    }

    pub fn is_auto_persistence_running(&self) -> bool {
        self.auto.is_running()
    }

    pub fn is_saving(&self) -> bool {
        self.shared.saving.load(Ordering::SeqCst)
    }

    /// Outcome of the most recent save, if any
    pub fn last_save(&self) -> Option<SaveStatus> {
        self.shared.last_save.lock().clone()
    }
}

/// Snapshot, write `<path>.tmp`, rename over `path`, and record the outcome
fn write_and_record(shared: &Shared, path: &Path) -> Result<usize> {
    let snapshot = shared.engine.snapshot();
    let keys = snapshot.key_count();
    let result = write_atomically(path, &render(&snapshot)).map(|_| keys);

    let status = SaveStatus {
        success: result.is_ok(),
        path: path.to_path_buf(),
        keys,
        finished_at: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default(),
        error: result.as_ref().err().map(|e| e.to_string()),
    };
    *shared.last_save.lock() = Some(status);

    match &result {
        Ok(keys) => info!("Saved {} keys to {:?}", keys, path),
        Err(e) => error!("Failed to save snapshot: {}", e),
    }

    result
}

fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents).map_err(|e| Error::persistence(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| Error::persistence(path, e))
}
