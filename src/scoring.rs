/*!
# Scoring
Contracts for the empirical variant scoring (EVS) collaborators.
Models are loaded elsewhere; the classifier only sees a shared, read-only handle that maps a feature vector to a probability-like score.
*/

use serde::Serialize;

use crate::data_types::features::FeatureVector;

/// Scores are capped at this value after conversion to the phred scale
pub const MAX_EMPIRICAL_VARIANT_SCORE: i32 = 60;

/// The calling context a model was trained for
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, strum_macros::Display)]
pub enum ScoringContext {
    #[default]
    #[strum(serialize = "germline")]
    Germline,
    #[strum(serialize = "rna")]
    Rna
}

impl ScoringContext {
    pub fn from_is_rna(is_rna: bool) -> Self {
        if is_rna {
            ScoringContext::Rna
        } else {
            ScoringContext::Germline
        }
    }
}

/// The variant kind a model scores
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, strum_macros::Display)]
pub enum VariantKind {
    #[strum(serialize = "SNV")]
    Snv,
    #[strum(serialize = "indel")]
    Indel
}

/// A pre-loaded scoring model.
/// Implementations must be pure functions of the feature vector so a single handle can be shared across threads.
pub trait VariantScorer: Send + Sync {
    /// The calling context this model was trained for
    fn context(&self) -> ScoringContext;

    /// Returns the probability that the variant is real, in the range [0, 1)
    /// # Arguments
    /// * `features` - the core feature vector for one sample at one locus
    fn score_variant(&self, features: &FeatureVector) -> f64;
}

/// Converts an error probability into a rounded phred-scaled quality
/// # Arguments
/// * `error_prob` - probability of error; values <= 0 are clamped to the smallest positive value
pub fn error_prob_to_qphred(error_prob: f64) -> i32 {
    let error_prob = error_prob.max(f64::MIN_POSITIVE);
    (-10.0 * error_prob.log10()).round() as i32
}

/// Converts a model score into the empirical variant score stored on a sample
/// # Arguments
/// * `score` - model output, the probability that the variant is real
pub fn score_to_evs(score: f64) -> i32 {
    debug_assert!((0.0..=1.0).contains(&score), "variant score must be in [0, 1], found {score}");
    error_prob_to_qphred(1.0 - score).min(MAX_EMPIRICAL_VARIANT_SCORE)
}
