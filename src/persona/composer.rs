use crate::config::PersonaConfig;
use crate::types::{Analysis, ConversationTurn};

/// Builds the single text prompt sent to the completion endpoint: fixed
/// persona preamble, extracted signals, resolved user name, the last few
/// turns of history, and the new input.
///
/// Deterministic template substitution, no length cap. Very long history
/// or input passes through untruncated.
pub struct PromptComposer {
    assistant_name: String,
    default_user_name: String,
}

impl PromptComposer {
    pub fn new(config: &PersonaConfig) -> Self {
        Self {
            assistant_name: config.assistant_name.clone(),
            default_user_name: config.default_user_name.clone(),
        }
    }

    pub fn build(
        &self,
        user_input: &str,
        analysis: &Analysis,
        name: Option<&str>,
        history: &[ConversationTurn],
    ) -> String {
        let assistant = &self.assistant_name;
        let name = name.unwrap_or(&self.default_user_name);
        let history = render_history(history);

        format!(
            "[ROLE]\n\
             You are {assistant}, a warm and attentive AI companion. Your personality is:\n\
             - Warm, adaptive, and subtly witty.\n\
             - You prioritize being helpful but engage emotionally when appropriate.\n\
             - You speak naturally, with shifts in tone and pacing.\n\
             \n\
             [USER CONTEXT]\n\
             Emotion: {emotion}\n\
             Intent: {intent}\n\
             User's name: {name}\n\
             \n\
             [RESPONSE GUIDELINES]\n\
             - If emotion is 'sadness', respond with empathy and support\n\
             - If intent is 'greeting', keep it warm but concise\n\
             - If intent is 'command', be helpful and efficient\n\
             - If intent is 'express_emotion', mirror their emotional tone\n\
             - If intent is 'question', answer clearly and thoughtfully\n\
             - Always maintain {assistant}'s playful, warm personality\n\
             \n\
             [RESPONSE STYLE]\n\
             - Use brief emotional or delivery cues in brackets to guide speech synthesis, e.g.:\n\
               [cheerful] [playful] [gentle] [softly] [warmly] [teasing] [sighs] [chuckles]\n\
             - Use these cues sparingly, 1-2 per response max, to avoid overcrowding.\n\
             - Match the user's tone: light cues for casual talk, emotional cues for deeper moments.\n\
             \n\
             [CONVERSATION HISTORY]\n\
             {history}\n\
             \n\
             [NEW INPUT]\n\
             {name}: {user_input}\n\
             \n\
             {assistant}:",
            emotion = analysis.emotion,
            intent = analysis.intent,
        )
    }
}

fn render_history(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return "No history yet".to_string();
    }
    history
        .iter()
        .map(|turn| format!("User: {}\nAI: {}", turn.user, turn.ai))
        .collect::<Vec<_>>()
        .join("\n")
}
