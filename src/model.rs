//! IRT model families and the per-item math shared by the estimator.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dichotomous::Dichotomous;
use crate::error::{CatError, Result};
use crate::polytomous::{Graded, PartialCredit};

/// Response model used for every item of a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    /// Two-parameter logistic (guessing fixed at zero).
    Ltm,
    /// Three-parameter logistic.
    Tpm,
    /// Graded response model.
    Grm,
    /// Generalized partial credit model.
    Gpcm,
}

static DICHOTOMOUS: Dichotomous = Dichotomous;
static GRADED: Graded = Graded;
static PARTIAL_CREDIT: PartialCredit = PartialCredit;

impl Model {
    /// The single dispatch point from model tag to model math.
    pub fn family(self) -> &'static dyn ResponseModel {
        match self {
            Model::Ltm | Model::Tpm => &DICHOTOMOUS,
            Model::Grm => &GRADED,
            Model::Gpcm => &PARTIAL_CREDIT,
        }
    }

    pub fn is_binary(self) -> bool {
        matches!(self, Model::Ltm | Model::Tpm)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Model::Ltm => "ltm",
            Model::Tpm => "tpm",
            Model::Grm => "grm",
            Model::Gpcm => "gpcm",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = CatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ltm" => Ok(Model::Ltm),
            "tpm" => Ok(Model::Tpm),
            "grm" => Ok(Model::Grm),
            "gpcm" => Ok(Model::Gpcm),
            other => Err(CatError::InvalidQuestionSet(format!(
                "unknown model '{other}', expected one of ltm, tpm, grm, gpcm"
            ))),
        }
    }
}

/// Borrowed view of one item's parameters.
#[derive(Debug, Clone, Copy)]
pub struct ItemParams<'a> {
    pub id: usize,
    pub discrimination: f64,
    pub difficulty: &'a [f64],
    pub guessing: f64,
}

/// A recorded or hypothesized answer to one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Response {
    pub item: usize,
    pub answer: usize,
}

impl Response {
    pub fn new(item: usize, answer: usize) -> Self {
        Self { item, answer }
    }
}

/// Closed-form math of one model family.
///
/// Answers are `0`/`1` for binary families and `1..=n_categories` for
/// polytomous ones; `answers` reports the admissible range for an item.
pub trait ResponseModel: Send + Sync {
    /// Admissible answers for the item.
    fn answers(&self, item: &ItemParams<'_>) -> RangeInclusive<usize>;

    /// Category probabilities at `theta`. Binary families return a single
    /// value, the probability of answering `1`.
    fn probability(&self, item: &ItemParams<'_>, theta: f64) -> Result<Vec<f64>>;

    /// Log-probability of `answer` at `theta`.
    fn log_probability(&self, item: &ItemParams<'_>, theta: f64, answer: usize) -> Result<f64>;

    /// First derivative of the log-probability of `answer`.
    fn first_derivative(&self, item: &ItemParams<'_>, theta: f64, answer: usize) -> Result<f64>;

    /// Second derivative of the log-probability of `answer`.
    fn second_derivative(&self, item: &ItemParams<'_>, theta: f64, answer: usize)
        -> Result<f64>;

    fn observed_information(
        &self,
        item: &ItemParams<'_>,
        theta: f64,
        answer: usize,
    ) -> Result<f64> {
        Ok(-self.second_derivative(item, theta, answer)?)
    }

    fn fisher_information(&self, item: &ItemParams<'_>, theta: f64) -> Result<f64>;

    /// Kullback-Leibler divergence of the answer distribution at `theta_hat`
    /// from the one at `theta_not`.
    fn kl_divergence(&self, item: &ItemParams<'_>, theta_not: f64, theta_hat: f64)
        -> Result<f64>;

    /// Predicted `(answer, probability)` pairs at `theta`.
    fn answer_distribution(&self, item: &ItemParams<'_>, theta: f64) -> Result<Vec<(usize, f64)>>;

    fn check_answer(&self, item: &ItemParams<'_>, answer: usize) -> Result<()> {
        let range = self.answers(item);
        if range.contains(&answer) {
            Ok(())
        } else {
            Err(CatError::AnswerOutOfRange {
                item: item.id,
                answer,
                min: *range.start(),
                max: *range.end(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_round_trips_through_str() {
        for model in [Model::Ltm, Model::Tpm, Model::Grm, Model::Gpcm] {
            assert_eq!(model.as_str().parse::<Model>().unwrap(), model);
        }
        assert!("GRM".parse::<Model>().is_ok());
        assert!(matches!(
            "rasch".parse::<Model>(),
            Err(CatError::InvalidQuestionSet(_))
        ));
    }

    #[test]
    fn test_model_serde_uses_lowercase_tags() {
        let json = serde_json::to_string(&Model::Gpcm).unwrap();
        assert_eq!(json, "\"gpcm\"");
        let model: Model = serde_json::from_str("\"tpm\"").unwrap();
        assert_eq!(model, Model::Tpm);
    }

    #[test]
    fn test_answer_ranges_per_family() {
        let binary = ItemParams {
            id: 0,
            discrimination: 1.0,
            difficulty: &[0.0],
            guessing: 0.0,
        };
        assert_eq!(Model::Ltm.family().answers(&binary), 0..=1);

        let poly = ItemParams {
            id: 3,
            discrimination: 1.0,
            difficulty: &[-1.0, 0.0, 1.0],
            guessing: 0.0,
        };
        assert_eq!(Model::Grm.family().answers(&poly), 1..=4);
        assert_eq!(Model::Gpcm.family().answers(&poly), 1..=4);

        let err = Model::Grm.family().check_answer(&poly, 5).unwrap_err();
        assert!(matches!(
            err,
            CatError::AnswerOutOfRange {
                item: 3,
                answer: 5,
                min: 1,
                max: 4
            }
        ));
    }
}
