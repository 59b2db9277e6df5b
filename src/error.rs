//! Error taxonomy for estimation and item selection.

use thiserror::Error;

/// Errors raised by the estimation engine.
#[derive(Debug, Error)]
pub enum CatError {
    /// Theta is too extreme for the model to distinguish categories, a
    /// normalizer collapsed to zero or infinity, or a root bracket has no
    /// sign change. The caller must re-bracket or abort the current call.
    #[error("numeric domain error: {0}")]
    NumericDomain(String),

    #[error("item {item} is out of range for a question set of {n_items} items")]
    ItemOutOfRange { item: usize, n_items: usize },

    #[error("answer {answer} for item {item} is outside {min}..={max}")]
    AnswerOutOfRange {
        item: usize,
        answer: usize,
        min: usize,
        max: usize,
    },

    #[error("item {item} has no recorded answer")]
    Unanswered { item: usize },

    #[error("invalid question set: {0}")]
    InvalidQuestionSet(String),

    #[error("invalid prior: {0}")]
    InvalidPrior(String),

    #[error("no unanswered items left to select from")]
    NoCandidates,

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl CatError {
    pub(crate) fn extreme_theta() -> Self {
        CatError::NumericDomain("Theta value too extreme for numerical routines.".to_string())
    }
}

pub type Result<T> = std::result::Result<T, CatError>;
