use lilyrose::config::PersonaConfig;
use lilyrose::persona::{PromptComposer, ResponseFinisher, strip_filler_prefix};
use lilyrose::types::{Analysis, ConversationTurn, Intent};
use rand::rngs::mock::StepRng;

fn composer() -> PromptComposer {
    PromptComposer::new(&PersonaConfig::default())
}

fn analysis(emotion: &str, intent: Intent) -> Analysis {
    Analysis {
        emotion: emotion.to_string(),
        intent,
    }
}

// =============================================================
// Prompt composition
// =============================================================

#[test]
fn prompt_carries_signals_and_input() {
    let prompt = composer().build(
        "tell me a story",
        &analysis("joy", Intent::Chat),
        Some("Maria"),
        &[],
    );

    assert!(prompt.contains("Emotion: joy"));
    assert!(prompt.contains("Intent: chat"));
    assert!(prompt.contains("User's name: Maria"));
    assert!(prompt.contains("Maria: tell me a story"));
}

#[test]
fn prompt_uses_default_name_when_no_fact() {
    let prompt = composer().build("hello", &analysis("neutral", Intent::Greeting), None, &[]);
    assert!(prompt.contains("User's name: friend"));
    assert!(prompt.contains("friend: hello"));
}

#[test]
fn prompt_renders_placeholder_for_empty_history() {
    let prompt = composer().build("hello", &analysis("neutral", Intent::Greeting), None, &[]);
    assert!(prompt.contains("No history yet"));
}

#[test]
fn prompt_renders_history_turns_as_lines() {
    let history = vec![
        ConversationTurn::now("first question", "first answer", None),
        ConversationTurn::now("second question", "second answer", None),
    ];
    let prompt = composer().build(
        "third question",
        &analysis("neutral", Intent::Question),
        None,
        &history,
    );

    assert!(prompt.contains("User: first question\nAI: first answer"));
    assert!(prompt.contains("User: second question\nAI: second answer"));
    assert!(!prompt.contains("No history yet"));
}

#[test]
fn prompt_is_deterministic() {
    let history = vec![ConversationTurn::now("a", "b", None)];
    let a = composer().build("input", &analysis("joy", Intent::Chat), Some("Sam"), &history);
    let b = composer().build("input", &analysis("joy", Intent::Chat), Some("Sam"), &history);
    assert_eq!(a, b);
}

// =============================================================
// Response finishing
// =============================================================

#[test]
fn finisher_strips_one_prefix_and_keeps_punctuation() {
    let mut finisher = ResponseFinisher::from_rng(StepRng::new(u64::MAX, 0));
    assert_eq!(finisher.finish("Sure, I can help!"), "I can help!");
}

#[test]
fn finisher_appends_period_when_missing() {
    let mut finisher = ResponseFinisher::from_rng(StepRng::new(u64::MAX, 0));
    assert_eq!(finisher.finish("Okay, here it goes"), "here it goes.");
}

#[test]
fn finisher_cue_branch_prepends_exactly_one_cue() {
    let mut finisher = ResponseFinisher::from_rng(StepRng::new(0, 0));
    let out = finisher.finish("Happy to help!");
    assert!(out.starts_with("*chuckles* "));
    assert!(out.ends_with("Happy to help!"));
}

#[test]
fn prefix_strip_is_case_sensitive_and_start_anchored() {
    assert_eq!(strip_filler_prefix("sure, no match"), "sure, no match");
    assert_eq!(
        strip_filler_prefix("I said Sure, earlier"),
        "I said Sure, earlier"
    );
    assert_eq!(strip_filler_prefix("As an AI model"), "model");
}
