//! Local polarity estimate used when the hosted classifier is unreachable.

const POSITIVE_WORDS: &[&str] = &[
    "good",
    "great",
    "love",
    "happy",
    "joy",
    "wonderful",
    "excited",
    "amazing",
    "fun",
    "laugh",
    "nice",
    "awesome",
    "glad",
    "beautiful",
    "delighted",
];

const NEGATIVE_WORDS: &[&str] = &[
    "sad",
    "bad",
    "hate",
    "lonely",
    "hurt",
    "cry",
    "terrible",
    "awful",
    "angry",
    "depressed",
    "miserable",
    "annoyed",
    "worried",
    "upset",
    "horrible",
];

/// Tokenize on whitespace, strip non-alphanumeric characters, and score
/// each token against the fixed lexicons. The result is in [-1.0, 1.0]:
/// (positive hits - negative hits) / total lexicon hits, or 0.0 when no
/// token matches either list.
pub fn polarity(text: &str) -> f32 {
    let mut positive = 0usize;
    let mut negative = 0usize;

    for token in text.split_whitespace() {
        let word: String = token
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if word.is_empty() {
            continue;
        }
        if POSITIVE_WORDS.contains(&word.as_str()) {
            positive += 1;
        } else if NEGATIVE_WORDS.contains(&word.as_str()) {
            negative += 1;
        }
    }

    let hits = positive + negative;
    if hits == 0 {
        return 0.0;
    }
    (positive as f32 - negative as f32) / hits as f32
}

/// Map a polarity score to the three fallback emotion labels.
pub fn polarity_label(text: &str) -> &'static str {
    let score = polarity(text);
    if score > 0.3 {
        "joy"
    } else if score < -0.3 {
        "sadness"
    } else {
        "neutral"
    }
}
