use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

use crate::models::question::Question;

pub const NEUTRAL_LABEL: &str = "Don't know/Neutral";
pub const FALLBACK_LABEL: &str = "Other Category";

/// Picks the distractor for one render: uniform over the alternatives, or the
/// fallback label when there are none.
pub fn pick_distractor<R: Rng + ?Sized>(question: &Question, rng: &mut R) -> String {
    question
        .alternatives
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| FALLBACK_LABEL.to_string())
}

/// Builds the three choices for a question in a fresh random order.
///
/// Every call draws a new distractor and a new permutation. A distractor equal
/// to the true label is shown twice.
pub fn derive_options<R: Rng + ?Sized>(question: &Question, rng: &mut R) -> [String; 3] {
    let mut options = [
        question.true_label.clone(),
        pick_distractor(question, rng),
        NEUTRAL_LABEL.to_string(),
    ];
    options.shuffle(rng);
    options
}

/// Whether `label` is something a render of `question` could have offered.
pub fn is_offerable(question: &Question, label: &str) -> bool {
    label == question.true_label
        || label == NEUTRAL_LABEL
        || question.alternatives.iter().any(|alt| alt == label)
        || (question.alternatives.is_empty() && label == FALLBACK_LABEL)
}
