use serde::{Deserialize, Serialize};

/// One user/assistant exchange, as persisted and replayed.
///
/// Immutable once created; the `ai` field always holds the raw model
/// completion, never the finished text with stylistic cues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub time: chrono::DateTime<chrono::Utc>,
    pub user: String,
    pub ai: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
}

impl ConversationTurn {
    /// Create a turn stamped with the current time.
    pub fn now(user: impl Into<String>, ai: impl Into<String>, mood: Option<String>) -> Self {
        Self {
            time: chrono::Utc::now(),
            user: user.into(),
            ai: ai.into(),
            mood,
        }
    }
}

/// Coarse intent label derived from the user's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    AskAboutAi,
    Question,
    ExpressEmotion,
    Command,
    Chat,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::AskAboutAi => "ask_about_ai",
            Intent::Question => "question",
            Intent::ExpressEmotion => "express_emotion",
            Intent::Command => "command",
            Intent::Chat => "chat",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Combined signal-extraction result for one input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub emotion: String,
    pub intent: Intent,
}
