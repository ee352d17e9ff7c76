pub mod backend;

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::types::ConversationTurn;
use backend::{FileStore, RemoteStore};

/// The local file never holds more than this many turns; older ones are
/// silently dropped at save time.
pub const MAX_PERSISTED_TURNS: usize = 200;

const NAME_TRIGGER: &str = "my name is";

/// Mood keyword tables, checked in declaration order. When keywords from
/// both categories appear, the later-iterated category wins.
const MOOD_KEYWORDS: &[(&str, &[&str])] = &[
    ("happy", &["joy", "love", "laugh", "happy", "excited"]),
    ("sad", &["lonely", "hurt", "cry", "sad", "depressed"]),
];

/// Append-only conversation log plus a small key-value fact table
/// (learned user name, last mood). One instance per session; the local
/// file backend is shared across sessions and serializes its own writes.
pub struct MemoryStore {
    conversations: Vec<ConversationTurn>,
    facts: HashMap<String, String>,
    file: FileStore,
    remote: Option<RemoteStore>,
}

impl MemoryStore {
    /// Open a store, loading existing state. Remote wins when configured
    /// and reachable; otherwise the local file; a missing or corrupt file
    /// starts empty and immediately re-establishes a fresh file.
    pub async fn open(file: FileStore, remote: Option<RemoteStore>) -> Self {
        let mut store = Self {
            conversations: Vec::new(),
            facts: HashMap::new(),
            file,
            remote,
        };
        store.load().await;
        store
    }

    async fn load(&mut self) {
        if let Some(remote) = &self.remote {
            match remote.load().await {
                Ok(snapshot) => {
                    debug!(
                        turns = snapshot.conversations.len(),
                        facts = snapshot.facts.len(),
                        "loaded memory from remote store"
                    );
                    self.conversations = snapshot.conversations;
                    self.facts = snapshot.facts;
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "remote load failed, falling back to local file");
                }
            }
        }

        match self.file.load() {
            Ok(snapshot) => {
                self.conversations = snapshot.conversations;
                self.facts = snapshot.facts;
            }
            Err(e) => {
                warn!(
                    error = %e,
                    path = %self.file.path().display(),
                    "memory file missing or unreadable, starting empty"
                );
                if let Err(e) = self.file.save(&self.conversations, &self.facts).await {
                    warn!(error = %e, "could not initialize memory file");
                }
            }
        }
    }

    /// Record one exchange: update facts from the user text, append the
    /// turn with the current mood snapshot, then persist.
    ///
    /// `ai_text` must be the raw completion; the finisher's cosmetic edits
    /// never reach persisted history.
    pub async fn store(&mut self, user_text: &str, ai_text: &str) {
        self.extract_name(user_text);
        self.extract_mood(user_text);

        let turn =
            ConversationTurn::now(user_text, ai_text, self.facts.get("last_mood").cloned());
        self.conversations.push(turn.clone());
        self.persist(&turn).await;
    }

    /// Remote first when configured; any remote failure degrades to the
    /// local file so a turn is never dropped silently.
    async fn persist(&self, turn: &ConversationTurn) {
        if let Some(remote) = &self.remote {
            match remote.append(turn, &self.facts).await {
                Ok(()) => return,
                Err(e) => {
                    warn!(error = %e, "remote persist failed, falling back to local file");
                }
            }
        }

        if let Err(e) = self.file.save(&self.conversations, &self.facts).await {
            warn!(error = %e, path = %self.file.path().display(), "local memory save failed");
        }
    }

    fn extract_name(&mut self, user_text: &str) {
        let lower = user_text.to_lowercase();
        let Some(pos) = lower.find(NAME_TRIGGER) else {
            return;
        };
        // The offset indexes the lowercased copy, so slice that copy;
        // lowercasing can change byte lengths. title_case restores the
        // leading capital. No validation of token contents.
        let rest = &lower[pos + NAME_TRIGGER.len()..];
        if let Some(token) = rest.split_whitespace().next() {
            self.facts.insert("user_name".into(), title_case(token));
        }
    }

    fn extract_mood(&mut self, user_text: &str) {
        let lower = user_text.to_lowercase();
        for (mood, keywords) in MOOD_KEYWORDS {
            if keywords.iter().any(|kw| lower.contains(kw)) {
                self.facts.insert("last_mood".into(), (*mood).to_string());
            }
        }
    }

    pub fn get_name(&self) -> Option<String> {
        self.facts.get("user_name").cloned()
    }

    pub fn get_conversation_history(&self) -> &[ConversationTurn] {
        &self.conversations
    }

    /// The most recent `n` turns, oldest first.
    pub fn last_exchanges(&self, n: usize) -> &[ConversationTurn] {
        let start = self.conversations.len().saturating_sub(n);
        &self.conversations[start..]
    }

    pub fn fact(&self, key: &str) -> Option<&str> {
        self.facts.get(key).map(String::as_str)
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
