use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

/// Top-level configuration loaded from TOML.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LilyConfig {
    pub gateway: GatewayConfig,
    pub completion: CompletionConfig,
    pub classifier: ClassifierConfig,
    pub memory: MemoryConfig,
    pub persona: PersonaConfig,
    pub sessions: SessionsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

fn default_port() -> u16 {
    8080
}
fn default_bind() -> String {
    "127.0.0.1".into()
}

/// Primary completion endpoint plus the ordered model fallback list.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
    pub secondary: Option<SecondaryConfig>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_completion_endpoint(),
            models: default_models(),
            api_key: None,
            timeout_secs: default_completion_timeout(),
            secondary: None,
        }
    }
}

fn default_completion_endpoint() -> String {
    "https://openrouter.ai/api/v1/chat/completions".into()
}
fn default_models() -> Vec<String> {
    vec![
        "meta-llama/llama-3.3-70b-instruct:free".into(),
        "google/gemma-2-27b-instruct:free".into(),
        "microsoft/phi-3-medium-128k-instruct:free".into(),
    ]
}
fn default_completion_timeout() -> u64 {
    10
}

/// Last-resort provider tried after the primary model list is exhausted.
#[derive(Debug, Clone, Deserialize)]
pub struct SecondaryConfig {
    #[serde(default = "default_secondary_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_secondary_model")]
    pub model: String,
    pub api_key: Option<String>,
}

fn default_secondary_endpoint() -> String {
    "https://api.together.xyz/v1/chat/completions".into()
}
fn default_secondary_model() -> String {
    "lgai/exaone-3-5-32b-instruct".into()
}

/// Hosted emotion classifier. The short timeout is deliberate: a slow
/// classifier degrades to the local lexicon rather than stalling the turn.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_classifier_endpoint")]
    pub endpoint: String,
    pub api_token: Option<String>,
    #[serde(default = "default_classifier_timeout")]
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: default_classifier_endpoint(),
            api_token: None,
            timeout_secs: default_classifier_timeout(),
        }
    }
}

fn default_classifier_endpoint() -> String {
    "https://api-inference.huggingface.co/models/j-hartmann/emotion-english-distilroberta-base"
        .into()
}
fn default_classifier_timeout() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_data_path")]
    pub data_path: String,
    pub remote_url: Option<String>,
    pub remote_key: Option<String>,
    #[serde(default = "default_remote_timeout")]
    pub remote_timeout_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            remote_url: None,
            remote_key: None,
            remote_timeout_secs: default_remote_timeout(),
        }
    }
}

fn default_data_path() -> String {
    "data/memory.json".into()
}
fn default_remote_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,
    #[serde(default = "default_user_name")]
    pub default_user_name: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            assistant_name: default_assistant_name(),
            default_user_name: default_user_name(),
        }
    }
}

fn default_assistant_name() -> String {
    "Lily Rose".into()
}
fn default_user_name() -> String {
    "friend".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionsConfig {
    /// Idle time before a session is swept, in seconds.
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_session_ttl() -> u64 {
    3600
}
fn default_sweep_interval() -> u64 {
    300
}

/// Load configuration from file or use defaults.
///
/// Search order:
/// 1. `LILYROSE_CONFIG` env var
/// 2. `~/.lilyrose/config.toml`
/// 3. Zero-config defaults (no file needed)
pub fn load() -> anyhow::Result<LilyConfig> {
    let path = config_path();

    if path.exists() {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
        let mut config: LilyConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid config at {}: {e}", path.display()))?;

        resolve_secrets(&mut config);
        validate(&config)?;

        info!("loaded config from {}", path.display());
        Ok(config)
    } else {
        info!("no config file found, using zero-config defaults");
        let mut config = LilyConfig::default();
        resolve_secrets(&mut config);
        validate(&config)?;
        Ok(config)
    }
}

fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("LILYROSE_CONFIG") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".lilyrose").join("config.toml")
}

/// Fill in secrets from environment variables when the config file
/// does not provide them. Keys never live in source or version control.
pub fn resolve_secrets(config: &mut LilyConfig) {
    if config.completion.api_key.is_none() {
        config.completion.api_key = std::env::var("OPENROUTER_API_KEY").ok();
    }
    if let Some(secondary) = config.completion.secondary.as_mut() {
        if secondary.api_key.is_none() {
            secondary.api_key = std::env::var("TOGETHER_API_KEY").ok();
        }
    }
    if config.classifier.api_token.is_none() {
        config.classifier.api_token = std::env::var("HF_API_TOKEN").ok();
    }
    if config.memory.remote_url.is_none() {
        config.memory.remote_url = std::env::var("SUPABASE_URL").ok();
    }
    if config.memory.remote_key.is_none() {
        config.memory.remote_key = std::env::var("SUPABASE_KEY").ok();
    }
}

/// Validate the config and return clear error messages.
pub fn validate(config: &LilyConfig) -> anyhow::Result<()> {
    if config.completion.models.is_empty() {
        anyhow::bail!("completion.models must list at least one model");
    }
    if config.completion.timeout_secs == 0 {
        anyhow::bail!("completion.timeout_secs must be > 0");
    }
    if config.classifier.timeout_secs == 0 {
        anyhow::bail!("classifier.timeout_secs must be > 0");
    }
    if config.memory.remote_timeout_secs == 0 {
        anyhow::bail!("memory.remote_timeout_secs must be > 0");
    }
    if config.sessions.ttl_secs == 0 {
        anyhow::bail!("sessions.ttl_secs must be > 0");
    }

    url::Url::parse(&config.completion.endpoint)
        .map_err(|e| anyhow::anyhow!("invalid completion.endpoint: {e}"))?;
    url::Url::parse(&config.classifier.endpoint)
        .map_err(|e| anyhow::anyhow!("invalid classifier.endpoint: {e}"))?;
    if let Some(secondary) = &config.completion.secondary {
        url::Url::parse(&secondary.endpoint)
            .map_err(|e| anyhow::anyhow!("invalid completion.secondary.endpoint: {e}"))?;
    }
    if let Some(remote) = &config.memory.remote_url {
        url::Url::parse(remote).map_err(|e| anyhow::anyhow!("invalid memory.remote_url: {e}"))?;
    }

    Ok(())
}
