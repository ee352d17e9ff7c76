use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::MAX_PERSISTED_TURNS;
use crate::types::ConversationTurn;

/// Errors from memory persistence. The store degrades on every variant:
/// remote failures fall back to the local file, local failures to an
/// empty in-memory store.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("remote store returned {0}")]
    Remote(reqwest::StatusCode),

    #[error("remote request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("local io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed memory file: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Everything a backend can hand back at load time.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub conversations: Vec<ConversationTurn>,
    pub facts: HashMap<String, String>,
}

/// On-disk layout: `{ "conversations": [...], "facts": {...} }`.
#[derive(Serialize, Deserialize)]
struct MemoryFile {
    #[serde(default)]
    conversations: Vec<ConversationTurn>,
    #[serde(default)]
    facts: HashMap<String, String>,
}

/// Local JSON file backend. The file holds a union across all sessions in
/// the process, so writers share one async lock and each save overwrites
/// the whole file with the full fact table and the last 200 turns.
#[derive(Clone)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn load(&self) -> Result<Snapshot, MemoryError> {
        let content = std::fs::read_to_string(&self.path)?;
        let file: MemoryFile = serde_json::from_str(&content)?;
        Ok(Snapshot {
            conversations: file.conversations,
            facts: file.facts,
        })
    }

    /// Overwrite the file with the given state, truncated to the most
    /// recent 200 turns. Pretty-printed so the file stays hand-inspectable.
    pub async fn save(
        &self,
        conversations: &[ConversationTurn],
        facts: &HashMap<String, String>,
    ) -> Result<(), MemoryError> {
        let start = conversations.len().saturating_sub(MAX_PERSISTED_TURNS);
        let file = MemoryFile {
            conversations: conversations[start..].to_vec(),
            facts: facts.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), turns = conversations.len().min(MAX_PERSISTED_TURNS), "memory file saved");
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct FactRow {
    key: String,
    value: String,
}

/// Managed table store over a PostgREST-style API: two logical tables,
/// `conversations` and `user_facts`. Loads select everything; writes insert
/// the new turn row and upsert the fact table.
#[derive(Clone)]
pub struct RemoteStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RemoteStore {
    /// The timeout is enforced at the transport so a hung remote cannot
    /// stall a turn (or session creation) past its bound.
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self, MemoryError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    pub async fn load(&self) -> Result<Snapshot, MemoryError> {
        let conversations: Vec<ConversationTurn> = self.select_all("conversations").await?;
        let rows: Vec<FactRow> = self.select_all("user_facts").await?;
        let facts = rows.into_iter().map(|r| (r.key, r.value)).collect();
        Ok(Snapshot {
            conversations,
            facts,
        })
    }

    /// Append one turn and write through the current fact table.
    pub async fn append(
        &self,
        turn: &ConversationTurn,
        facts: &HashMap<String, String>,
    ) -> Result<(), MemoryError> {
        self.insert("conversations", &serde_json::json!([turn]), false)
            .await?;

        if !facts.is_empty() {
            let rows: Vec<FactRow> = facts
                .iter()
                .map(|(k, v)| FactRow {
                    key: k.clone(),
                    value: v.clone(),
                })
                .collect();
            self.insert("user_facts", &serde_json::json!(rows), true)
                .await?;
        }
        Ok(())
    }

    async fn select_all<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
    ) -> Result<Vec<T>, MemoryError> {
        let response = self
            .client
            .get(self.table_url(table))
            .query(&[("select", "*")])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MemoryError::Remote(response.status()));
        }
        Ok(response.json().await?)
    }

    async fn insert(
        &self,
        table: &str,
        body: &serde_json::Value,
        upsert: bool,
    ) -> Result<(), MemoryError> {
        let mut request = self
            .client
            .post(self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", if upsert {
                "resolution=merge-duplicates,return=minimal"
            } else {
                "return=minimal"
            })
            .json(body);
        // PostgREST upserts key on the table's primary key (facts.key).
        if upsert {
            request = request.query(&[("on_conflict", "key")]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(MemoryError::Remote(response.status()));
        }
        Ok(())
    }
}
