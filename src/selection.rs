//! Item selection strategies.
//!
//! Each selector scores every not-yet-administered item through the
//! estimator and picks the best one. Scores are computed on the rayon pool;
//! the estimator is read-only so candidates are independent.

use rand::Rng;
use rand_pcg::Pcg64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{CatError, Result};
use crate::estimator::Estimator;

/// Outcome of one selection round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Criterion name, e.g. `"MFI"`.
    pub name: String,
    /// Chosen item id.
    pub item: usize,
    /// Candidate item ids, ascending.
    pub questions: Vec<usize>,
    /// Score of each candidate, parallel to `questions`.
    pub values: Vec<f64>,
    pub question_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Maximize,
    Minimize,
}

impl Direction {
    /// Index of the best score. Comparison is strict, so
    /// ties go to the earliest candidate. NaN scores never win.
    pub fn best(self, values: &[f64]) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, &v) in values.iter().enumerate() {
            if v.is_nan() {
                continue;
            }
            let better = match best {
                None => true,
                Some(b) => match self {
                    Direction::Maximize => v > values[b],
                    Direction::Minimize => v < values[b],
                },
            };
            if better {
                best = Some(i);
            }
        }
        best
    }
}

/// Quantities shared by every candidate of one selection round, computed
/// once before scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Round {
    /// Current theta estimate. Zero for criteria that never read it.
    pub theta_hat: f64,
    /// Confidence window around `theta_hat`; zero width unless the
    /// criterion integrates over it.
    pub window: (f64, f64),
}

impl Round {
    pub fn at_estimate(estimator: &Estimator<'_>) -> Result<Self> {
        let theta_hat = estimator.estimate_theta(None)?;
        Ok(Self {
            theta_hat,
            window: (theta_hat, theta_hat),
        })
    }

    pub fn with_window(name: &str, estimator: &Estimator<'_>) -> Result<Self> {
        let theta_hat = estimator.estimate_theta(None)?;
        let window = estimator.confidence_window_at(theta_hat)?;
        if window.0 == window.1 {
            tracing::warn!(
                criterion = name,
                theta = theta_hat,
                "confidence window has zero width; every candidate scores 0"
            );
        }
        Ok(Self { theta_hat, window })
    }
}

pub trait Selector: Send + Sync {
    fn name(&self) -> &'static str;

    fn direction(&self) -> Direction {
        Direction::Maximize
    }

    /// Runs once per selection before any candidate is scored.
    fn prepare(&self, _estimator: &Estimator<'_>) -> Result<Round> {
        Ok(Round::default())
    }

    /// Score of a single candidate.
    fn score(&self, estimator: &Estimator<'_>, round: &Round, item: usize) -> Result<f64>;

    fn select(&self, estimator: &Estimator<'_>) -> Result<Selection> {
        let questions = estimator.questions();
        let candidates = questions.nonapplicable_rows();
        if candidates.is_empty() {
            return Err(CatError::NoCandidates);
        }
        let round = self.prepare(estimator)?;

        let values = candidates
            .par_iter()
            .map(|&item| self.score(estimator, &round, item))
            .collect::<Result<Vec<f64>>>()?;

        for (&item, &value) in candidates.iter().zip(&values) {
            tracing::trace!(criterion = self.name(), item, value, "candidate score");
        }

        let best = self.direction().best(&values).ok_or_else(|| {
            CatError::NumericDomain(format!("{} produced no comparable score", self.name()))
        })?;
        let item = candidates[best];
        tracing::debug!(
            criterion = self.name(),
            item,
            value = values[best],
            theta_hat = round.theta_hat,
            candidates = candidates.len(),
            "selected item"
        );

        Ok(Selection {
            name: self.name().to_string(),
            item,
            questions: candidates.to_vec(),
            values,
            question_names: candidates
                .iter()
                .map(|&q| questions.question_names()[q].clone())
                .collect(),
        })
    }
}

/// Maximum Fisher information at the current estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxFisherInformation;

impl Selector for MaxFisherInformation {
    fn name(&self) -> &'static str {
        "MFI"
    }

    fn prepare(&self, estimator: &Estimator<'_>) -> Result<Round> {
        Round::at_estimate(estimator)
    }

    fn score(&self, estimator: &Estimator<'_>, round: &Round, item: usize) -> Result<f64> {
        estimator.fisher_information(round.theta_hat, item)
    }
}

/// Maximum Fisher information integrated over the confidence window.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxFisherInterval;

impl Selector for MaxFisherInterval {
    fn name(&self) -> &'static str {
        "MFII"
    }

    fn prepare(&self, estimator: &Estimator<'_>) -> Result<Round> {
        Round::with_window(self.name(), estimator)
    }

    fn score(&self, estimator: &Estimator<'_>, round: &Round, item: usize) -> Result<f64> {
        let (lower, upper) = round.window;
        estimator.fii_over(item, lower, upper)
    }
}

/// Maximum expected observed information.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxExpectedInformation;

impl Selector for MaxExpectedInformation {
    fn name(&self) -> &'static str {
        "MEI"
    }

    fn prepare(&self, estimator: &Estimator<'_>) -> Result<Round> {
        Round::at_estimate(estimator)
    }

    fn score(&self, estimator: &Estimator<'_>, round: &Round, item: usize) -> Result<f64> {
        estimator.expected_observed_information_at(item, round.theta_hat)
    }
}

/// Minimum expected posterior variance.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinExpectedPosteriorVariance;

impl Selector for MinExpectedPosteriorVariance {
    fn name(&self) -> &'static str {
        "EPV"
    }

    fn direction(&self) -> Direction {
        Direction::Minimize
    }

    fn prepare(&self, estimator: &Estimator<'_>) -> Result<Round> {
        Round::at_estimate(estimator)
    }

    fn score(&self, estimator: &Estimator<'_>, round: &Round, item: usize) -> Result<f64> {
        estimator.expected_pv_at(item, round.theta_hat)
    }
}

/// Maximum likelihood-weighted information.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxLikelihoodWeightedInformation;

impl Selector for MaxLikelihoodWeightedInformation {
    fn name(&self) -> &'static str {
        "MLWI"
    }

    fn score(&self, estimator: &Estimator<'_>, _round: &Round, item: usize) -> Result<f64> {
        estimator.lwi(item)
    }
}

/// Maximum posterior-weighted information.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxPosteriorWeightedInformation;

impl Selector for MaxPosteriorWeightedInformation {
    fn name(&self) -> &'static str {
        "MPWI"
    }

    fn score(&self, estimator: &Estimator<'_>, _round: &Round, item: usize) -> Result<f64> {
        estimator.pwi(item)
    }
}

/// KL divergence integrated over the confidence window.
#[derive(Debug, Clone, Copy, Default)]
pub struct KullbackLeibler;

impl Selector for KullbackLeibler {
    fn name(&self) -> &'static str {
        "KL"
    }

    fn prepare(&self, estimator: &Estimator<'_>) -> Result<Round> {
        Round::with_window(self.name(), estimator)
    }

    fn score(&self, estimator: &Estimator<'_>, round: &Round, item: usize) -> Result<f64> {
        let (lower, upper) = round.window;
        estimator.expected_kl_over(item, round.theta_hat, lower, upper)
    }
}

/// Likelihood-weighted KL divergence.
#[derive(Debug, Clone, Copy, Default)]
pub struct LikelihoodKullbackLeibler;

impl Selector for LikelihoodKullbackLeibler {
    fn name(&self) -> &'static str {
        "LKL"
    }

    fn prepare(&self, estimator: &Estimator<'_>) -> Result<Round> {
        Round::at_estimate(estimator)
    }

    fn score(&self, estimator: &Estimator<'_>, round: &Round, item: usize) -> Result<f64> {
        estimator.likelihood_kl_at(item, round.theta_hat)
    }
}

/// Posterior-weighted KL divergence.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosteriorKullbackLeibler;

impl Selector for PosteriorKullbackLeibler {
    fn name(&self) -> &'static str {
        "PKL"
    }

    fn prepare(&self, estimator: &Estimator<'_>) -> Result<Round> {
        Round::at_estimate(estimator)
    }

    fn score(&self, estimator: &Estimator<'_>, round: &Round, item: usize) -> Result<f64> {
        estimator.posterior_kl_at(item, round.theta_hat)
    }
}

/// Uniform random choice. Each candidate draws from its own PCG stream, so
/// the outcome depends only on the seed and the candidate set.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSelector {
    pub seed: u64,
}

impl RandomSelector {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl Selector for RandomSelector {
    fn name(&self) -> &'static str {
        "RANDOM"
    }

    fn score(&self, estimator: &Estimator<'_>, _round: &Round, item: usize) -> Result<f64> {
        estimator.questions().check_item(item)?;
        let mut rng = Pcg64::new(u128::from(self.seed), item as u128);
        Ok(rng.random::<f64>())
    }
}

/// Selection criterion tag, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Criterion {
    #[default]
    Mfi,
    Mfii,
    Mei,
    Epv,
    Mlwi,
    Mpwi,
    Kl,
    Lkl,
    Pkl,
    Random,
}

impl Criterion {
    /// Strategy for this criterion. `seed` is only used by `Random`.
    pub fn selector(self, seed: u64) -> Box<dyn Selector> {
        match self {
            Criterion::Mfi => Box::new(MaxFisherInformation),
            Criterion::Mfii => Box::new(MaxFisherInterval),
            Criterion::Mei => Box::new(MaxExpectedInformation),
            Criterion::Epv => Box::new(MinExpectedPosteriorVariance),
            Criterion::Mlwi => Box::new(MaxLikelihoodWeightedInformation),
            Criterion::Mpwi => Box::new(MaxPosteriorWeightedInformation),
            Criterion::Kl => Box::new(KullbackLeibler),
            Criterion::Lkl => Box::new(LikelihoodKullbackLeibler),
            Criterion::Pkl => Box::new(PosteriorKullbackLeibler),
            Criterion::Random => Box::new(RandomSelector::new(seed)),
        }
    }
}
