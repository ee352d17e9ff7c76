use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::info;

use crate::brain::Brain;
use crate::config::LilyConfig;
use crate::memory::backend::FileStore;

/// One live session: an exclusively-owned brain behind an async mutex so
/// concurrent chat calls against the same session serialize.
pub struct SessionHandle {
    pub id: String,
    pub brain: Mutex<Brain>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    last_seen: Mutex<Instant>,
}

impl SessionHandle {
    pub async fn touch(&self) {
        *self.last_seen.lock().await = Instant::now();
    }

    pub async fn idle(&self) -> Duration {
        self.last_seen.lock().await.elapsed()
    }
}

/// Session registry keyed by the client-supplied session id.
/// First-touch-creates semantics; idle sessions are swept after a TTL so
/// the registry cannot grow without bound across the process lifetime.
pub struct SessionRegistry {
    sessions: HashMap<String, Arc<SessionHandle>>,
    ttl: Duration,
    config: LilyConfig,
    file: FileStore,
}

impl SessionRegistry {
    pub fn new(config: LilyConfig) -> Self {
        // One file backend for the whole process; every session's memory
        // shares its write lock.
        let file = FileStore::new(&config.memory.data_path);
        Self {
            sessions: HashMap::new(),
            ttl: Duration::from_secs(config.sessions.ttl_secs),
            config,
            file,
        }
    }

    /// Look up a live session without touching it.
    pub fn get(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.get(session_id).map(Arc::clone)
    }

    /// Get an existing session or create a fresh one. No identity
    /// validation beyond map membership; the transport owns id issuance.
    pub async fn get_or_create(&mut self, session_id: &str) -> anyhow::Result<Arc<SessionHandle>> {
        if let Some(session) = self.sessions.get(session_id) {
            session.touch().await;
            return Ok(Arc::clone(session));
        }

        let brain = Brain::open(&self.config, self.file.clone()).await?;
        let session = Arc::new(SessionHandle {
            id: session_id.to_string(),
            brain: Mutex::new(brain),
            created_at: chrono::Utc::now(),
            last_seen: Mutex::new(Instant::now()),
        });
        self.sessions
            .insert(session_id.to_string(), Arc::clone(&session));
        info!(session = %session_id, "created session");
        Ok(session)
    }

    /// Drop sessions idle longer than the TTL. Returns how many were
    /// evicted. A session mid-turn stays: its last_seen was touched when
    /// the turn started and the Arc keeps the brain alive regardless.
    pub async fn sweep_expired(&mut self) -> usize {
        let mut expired = Vec::new();
        for (id, session) in &self.sessions {
            if session.idle().await > self.ttl {
                expired.push(id.clone());
            }
        }
        for id in &expired {
            self.sessions.remove(id);
            info!(session = %id, "evicted idle session");
        }
        expired.len()
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }
}
