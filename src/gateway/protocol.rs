use serde::{Deserialize, Serialize};

/// Frames the voice WebSocket client sends.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    StartListening,
    /// Real speech-to-text is out of scope; the payload is accepted but a
    /// fixed simulated transcript drives the turn.
    AudioData {
        #[serde(default)]
        audio: String,
    },
}

/// Frames the gateway sends back.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Status { status: String },
    AiResponse { text: String, status: String },
    Error { message: String },
}

impl ServerFrame {
    pub fn listening() -> Self {
        ServerFrame::Status {
            status: "listening".into(),
        }
    }

    pub fn completed(text: String) -> Self {
        ServerFrame::AiResponse {
            text,
            status: "completed".into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// REST chat request body.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub text: String,
}

/// REST chat response body.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub user_input: String,
    pub ai_response: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
