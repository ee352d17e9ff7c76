use tracing::debug;

use crate::completion::CompletionClient;
use crate::config::LilyConfig;
use crate::memory::MemoryStore;
use crate::memory::backend::{FileStore, RemoteStore};
use crate::persona::{PromptComposer, ResponseFinisher};
use crate::signals::SignalExtractor;

/// How many past turns the prompt carries.
pub const PROMPT_HISTORY_TURNS: usize = 3;

/// One session's conversation pipeline: signal extraction, prompt
/// composition, completion, storage, finishing. Owned exclusively by its
/// session; the host serializes `chat` calls.
pub struct Brain {
    signals: SignalExtractor,
    composer: PromptComposer,
    completion: CompletionClient,
    finisher: ResponseFinisher,
    pub memory: MemoryStore,
}

impl Brain {
    /// Build a brain for one session, sharing the process-wide local file
    /// backend so all sessions persist into the same union file.
    pub async fn open(config: &LilyConfig, file: FileStore) -> anyhow::Result<Self> {
        let remote = match (&config.memory.remote_url, &config.memory.remote_key) {
            (Some(url), Some(key)) => {
                Some(RemoteStore::new(url, key, config.memory.remote_timeout_secs)?)
            }
            _ => None,
        };

        Ok(Self {
            signals: SignalExtractor::new(&config.classifier)?,
            composer: PromptComposer::new(&config.persona),
            completion: CompletionClient::new(&config.completion)?,
            finisher: ResponseFinisher::new(),
            memory: MemoryStore::open(file, remote).await,
        })
    }

    /// Swap the finisher, e.g. for a seeded random source in tests.
    pub fn set_finisher(&mut self, finisher: ResponseFinisher) {
        self.finisher = finisher;
    }

    /// Run one conversation turn.
    ///
    /// The RAW completion is stored before finishing: persisted history
    /// reproduces what the model actually said, never the decorated text.
    pub async fn chat(&mut self, user_input: &str) -> String {
        let analysis = self.signals.analyze(user_input).await;
        debug!(emotion = %analysis.emotion, intent = %analysis.intent, "extracted signals");

        let name = self.memory.get_name();
        let prompt = self.composer.build(
            user_input,
            &analysis,
            name.as_deref(),
            self.memory.last_exchanges(PROMPT_HISTORY_TURNS),
        );

        let raw = self.completion.complete(&prompt).await;
        self.memory.store(user_input, &raw).await;
        self.finisher.finish(&raw)
    }
}
