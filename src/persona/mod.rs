mod composer;
mod finisher;

pub use composer::PromptComposer;
pub use finisher::{FILLER_PREFIXES, ResponseFinisher, strip_filler_prefix};
