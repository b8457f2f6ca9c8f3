use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use futures::future::BoxFuture;
use tracing::debug;

use weft_core::error::{Result, WeftError};
use weft_core::traits::HistoryStore;
use weft_core::types::{HistoryEntry, Session, SessionId};

const DEFAULT_CAPACITY: usize = 100;

/// In-memory history store with a process-wide retained-run cap.
///
/// Each session gets its own lock, so concurrent appends under different
/// session ids never serialize on the data path. The cap is a resource
/// policy: once more than `capacity` runs are retained across all
/// sessions, the globally oldest run is evicted. Lock order is always
/// map → slot and log → slot, never the reverse.
pub struct MemoryStore {
    capacity: usize,
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    /// Session id per retained run, in global append order. Drives eviction.
    append_log: Mutex<VecDeque<String>>,
}

impl MemoryStore {
    /// A store retaining at most `capacity` runs across all sessions.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            sessions: RwLock::new(HashMap::new()),
            append_log: Mutex::new(VecDeque::new()),
        }
    }

    /// Total runs currently retained across all sessions.
    pub fn retained_runs(&self) -> usize {
        self.append_log
            .lock()
            .map(|log| log.len())
            .unwrap_or_default()
    }

    fn slot(&self, id: &SessionId) -> Result<Arc<Mutex<Session>>> {
        {
            let sessions = self
                .sessions
                .read()
                .map_err(|e| WeftError::Storage(e.to_string()))?;
            if let Some(slot) = sessions.get(&id.0) {
                return Ok(slot.clone());
            }
        }

        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| WeftError::Storage(e.to_string()))?;
        let slot = sessions
            .entry(id.0.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Session::empty(id.clone()))));
        Ok(slot.clone())
    }

    fn push(&self, id: &SessionId, entry: HistoryEntry) -> Result<()> {
        let slot = self.slot(id)?;
        {
            let mut session = slot.lock().map_err(|e| WeftError::Storage(e.to_string()))?;
            session.runs.push(entry);
        }

        let mut log = self
            .append_log
            .lock()
            .map_err(|e| WeftError::Storage(e.to_string()))?;
        log.push_back(id.0.clone());

        while log.len() > self.capacity {
            let oldest = match log.pop_front() {
                Some(id) => id,
                None => break,
            };
            debug!(session = %oldest, "Evicting oldest retained run");
            let evicted = self.slot(&SessionId(oldest))?;
            let mut session = evicted
                .lock()
                .map_err(|e| WeftError::Storage(e.to_string()))?;
            if !session.runs.is_empty() {
                session.runs.remove(0);
            }
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HistoryStore for MemoryStore {
    fn get_session<'a>(&'a self, id: &'a SessionId) -> BoxFuture<'a, Result<Session>> {
        Box::pin(async move {
            let slot = {
                let sessions = self
                    .sessions
                    .read()
                    .map_err(|e| WeftError::Storage(e.to_string()))?;
                sessions.get(&id.0).cloned()
            };

            match slot {
                Some(slot) => {
                    let session = slot.lock().map_err(|e| WeftError::Storage(e.to_string()))?;
                    Ok(session.clone())
                }
                // Sessions are created lazily on first append.
                None => Ok(Session::empty(id.clone())),
            }
        })
    }

    fn append_run<'a>(
        &'a self,
        id: &'a SessionId,
        entry: HistoryEntry,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.push(id, entry) })
    }
}
