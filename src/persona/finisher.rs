use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Filler prefixes stripped from the start of a raw completion.
/// First match wins; at most one is removed; matching is case-sensitive.
pub const FILLER_PREFIXES: &[&str] = &[
    "Sure, ",
    "Okay, ",
    "Well, ",
    "Actually, ",
    "I think ",
    "In my opinion ",
    "As an AI ",
];

const CUES: &[&str] = &["*chuckles* ", "*thoughtful* ", "*warmly* ", "*playfully* "];

const CUE_PROBABILITY: f64 = 0.2;

/// Cosmetic post-processing of raw completions: strip a filler prefix,
/// occasionally prepend a stylistic cue, enforce terminal punctuation.
///
/// Non-deterministic by design; the cue variety is intentional. The random
/// source is injectable so tests can force either branch.
pub struct ResponseFinisher {
    rng: Box<dyn RngCore + Send>,
}

impl ResponseFinisher {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn from_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self { rng: Box::new(rng) }
    }

    pub fn finish(&mut self, raw: &str) -> String {
        let mut text = strip_filler_prefix(raw).to_string();

        if self.rng.r#gen::<f64>() < CUE_PROBABILITY {
            let cue = CUES[self.rng.gen_range(0..CUES.len())];
            text.insert_str(0, cue);
        }

        if !text.ends_with(['.', '!', '?']) {
            text.push('.');
        }
        text
    }
}

impl Default for ResponseFinisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip at most one filler prefix, then any leading whitespace it left.
pub fn strip_filler_prefix(raw: &str) -> &str {
    for prefix in FILLER_PREFIXES {
        if let Some(rest) = raw.strip_prefix(prefix) {
            return rest.trim_start();
        }
    }
    raw
}
