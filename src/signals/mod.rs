pub mod sentiment;

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ClassifierConfig;
use crate::types::{Analysis, Intent};

/// Errors from the hosted emotion classifier. Every variant degrades to the
/// local polarity fallback; none propagates past `analyze`.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("classifier returned {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed classifier body: {0}")]
    Malformed(String),

    #[error("classifier returned no labels")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct ScoredLabel {
    label: String,
    score: f32,
}

/// Derives a coarse emotion label and an intent label from raw input text.
///
/// Emotion comes from a HuggingFace-style inference endpoint with a short
/// enforced timeout; intent is rule-based and never fails.
pub struct SignalExtractor {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
}

impl SignalExtractor {
    pub fn new(config: &ClassifierConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
        })
    }

    pub async fn analyze(&self, text: &str) -> Analysis {
        Analysis {
            emotion: self.detect_emotion(text).await,
            intent: detect_intent(text),
        }
    }

    /// Ask the hosted classifier for the top-scoring emotion label.
    /// Any failure falls back to the local polarity lexicon.
    pub async fn detect_emotion(&self, text: &str) -> String {
        match self.classify(text).await {
            Ok(label) => label,
            Err(e) => {
                let fallback = sentiment::polarity_label(text);
                warn!(error = %e, fallback, "emotion classifier unavailable, using local polarity");
                fallback.to_string()
            }
        }
    }

    async fn classify(&self, text: &str) -> Result<String, ClassifierError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "inputs": text }));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ClassifierError::Status(response.status()));
        }

        // Expected shape: [[{"label": "joy", "score": 0.92}, ...]]
        let body: serde_json::Value = response.json().await?;
        let scored: Vec<Vec<ScoredLabel>> = serde_json::from_value(body)
            .map_err(|e| ClassifierError::Malformed(e.to_string()))?;

        let top = scored
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .ok_or(ClassifierError::Empty)?;

        debug!(label = %top.label, score = top.score, "classifier emotion");
        Ok(top.label)
    }
}

/// Rule-based intent detection over lowercased text. First match wins,
/// in this fixed priority order:
/// greeting > ask_about_ai > question > express_emotion > command > chat.
pub fn detect_intent(text: &str) -> Intent {
    let lower = text.to_lowercase();

    if ["hi", "hello", "hey", "greetings"]
        .iter()
        .any(|w| lower.contains(w))
    {
        Intent::Greeting
    } else if ["how are you", "how do you feel"]
        .iter()
        .any(|w| lower.contains(w))
    {
        Intent::AskAboutAi
    } else if text.contains('?') {
        Intent::Question
    } else if ["sad", "happy", "angry", "excited", "feel"]
        .iter()
        .any(|w| lower.contains(w))
    {
        Intent::ExpressEmotion
    } else if ["set", "remind", "timer", "alarm"]
        .iter()
        .any(|w| lower.contains(w))
    {
        Intent::Command
    } else {
        Intent::Chat
    }
}
