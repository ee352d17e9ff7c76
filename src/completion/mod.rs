use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::CompletionConfig;

/// Returned when every configured provider has failed. The user never sees
/// an error code, only this sentence.
pub const APOLOGY: &str = "Sorry, I'm having trouble responding right now.";

/// Errors from a single completion request. `complete` never surfaces
/// these; each one moves the client to the next model in the list.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed completion body: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

struct SecondaryProvider {
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

/// Sequential-fallback client over an ordered list of models on one hosted
/// inference endpoint, with an optional secondary provider tried once after
/// the list is exhausted. One shot per model, no retry or backoff.
pub struct CompletionClient {
    client: reqwest::Client,
    endpoint: String,
    models: Vec<String>,
    api_key: Option<String>,
    secondary: Option<SecondaryProvider>,
}

impl CompletionClient {
    pub fn new(config: &CompletionConfig) -> anyhow::Result<Self> {
        // The timeout is enforced here, at the transport, for every request
        // this client issues.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            models: config.models.clone(),
            api_key: config.api_key.clone(),
            secondary: config.secondary.as_ref().map(|s| SecondaryProvider {
                endpoint: s.endpoint.clone(),
                model: s.model.clone(),
                api_key: s.api_key.clone(),
            }),
        })
    }

    /// Send the prompt down the model list and return the first successful
    /// completion. Falls through to the secondary provider, then to the
    /// fixed apology string. Infallible by design: total backend failure is
    /// a degraded answer, not an error.
    pub async fn complete(&self, prompt: &str) -> String {
        for model in &self.models {
            match self.request(&self.endpoint, model, self.api_key.as_deref(), prompt, true).await {
                Ok(text) => {
                    debug!(model = %model, "completion succeeded");
                    return text;
                }
                Err(e) => {
                    warn!(model = %model, error = %e, "completion model failed, trying next");
                }
            }
        }

        if let Some(secondary) = &self.secondary {
            match self
                .request(
                    &secondary.endpoint,
                    &secondary.model,
                    secondary.api_key.as_deref(),
                    prompt,
                    false,
                )
                .await
            {
                Ok(text) => {
                    debug!(model = %secondary.model, "secondary provider succeeded");
                    return text;
                }
                Err(e) => {
                    warn!(model = %secondary.model, error = %e, "secondary provider failed");
                }
            }
        }

        warn!("all completion providers exhausted, returning apology");
        APOLOGY.to_string()
    }

    async fn request(
        &self,
        endpoint: &str,
        model: &str,
        api_key: Option<&str>,
        prompt: &str,
        with_sampling: bool,
    ) -> Result<String, CompletionError> {
        let mut body = serde_json::json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }],
        });
        if with_sampling {
            body["temperature"] = serde_json::json!(0.8);
            body["top_p"] = serde_json::json!(0.85);
            body["frequency_penalty"] = serde_json::json!(0.3);
            body["presence_penalty"] = serde_json::json!(0.1);
            body["stop"] = serde_json::json!(["\nUser:", "\n\n"]);
        }

        let mut request = self.client.post(endpoint).json(&body);
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(CompletionError::Status(response.status()));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CompletionError::Malformed("response had no choices".into()))
    }
}
