//! Binary response models (ltm, tpm).
//!
//! `P(theta) = c + (1 - c) * logistic(d + a * theta)`, where `d` is the
//! item's single difficulty (intercept) parameter.

use std::ops::RangeInclusive;

use crate::error::{CatError, Result};
use crate::model::{ItemParams, ResponseModel};
use crate::utils::{clamp_probability, PROB_EPS};

#[derive(Debug, Clone, Copy, Default)]
pub struct Dichotomous;

impl Dichotomous {
    /// Probability of a correct (`1`) answer, clamped into
    /// `[PROB_EPS, 1 - PROB_EPS]`.
    #[inline]
    pub fn prob(item: &ItemParams<'_>, theta: f64) -> Result<f64> {
        let exp_prob = (Self::intercept(item)? + item.discrimination * theta).exp();
        if exp_prob.is_infinite() {
            return Ok(1.0 - PROB_EPS);
        }
        let guess = item.guessing;
        Ok(clamp_probability(
            guess + (1.0 - guess) * (exp_prob / (1.0 + exp_prob)),
        ))
    }

    fn intercept(item: &ItemParams<'_>) -> Result<f64> {
        item.difficulty.first().copied().ok_or_else(|| {
            CatError::InvalidQuestionSet(format!(
                "item {}: binary items take exactly one difficulty, got none",
                item.id
            ))
        })
    }

    /// `a^2 * ((P - c) / (1 - c))^2 * Q / P`
    #[inline]
    fn information(item: &ItemParams<'_>, theta: f64) -> Result<f64> {
        let p = Self::prob(item, theta)?;
        let q = 1.0 - p;
        let guess = item.guessing;
        let lambda = (p - guess) / (1.0 - guess);
        Ok((item.discrimination * lambda).powi(2) * (q / p))
    }
}

impl ResponseModel for Dichotomous {
    fn answers(&self, _item: &ItemParams<'_>) -> RangeInclusive<usize> {
        0..=1
    }

    fn probability(&self, item: &ItemParams<'_>, theta: f64) -> Result<Vec<f64>> {
        Ok(vec![Self::prob(item, theta)?])
    }

    fn log_probability(&self, item: &ItemParams<'_>, theta: f64, answer: usize) -> Result<f64> {
        self.check_answer(item, answer)?;
        let p = Self::prob(item, theta)?;
        Ok(if answer == 1 { p.ln() } else { (1.0 - p).ln() })
    }

    fn first_derivative(&self, item: &ItemParams<'_>, theta: f64, answer: usize) -> Result<f64> {
        self.check_answer(item, answer)?;
        let p = Self::prob(item, theta)?;
        let guess = item.guessing;
        Ok(item.discrimination * ((p - guess) / (p * (1.0 - guess))) * (answer as f64 - p))
    }

    fn second_derivative(
        &self,
        item: &ItemParams<'_>,
        theta: f64,
        answer: usize,
    ) -> Result<f64> {
        self.check_answer(item, answer)?;
        Ok(-Self::information(item, theta)?)
    }

    fn fisher_information(&self, item: &ItemParams<'_>, theta: f64) -> Result<f64> {
        Self::information(item, theta)
    }

    fn kl_divergence(
        &self,
        item: &ItemParams<'_>,
        theta_not: f64,
        theta_hat: f64,
    ) -> Result<f64> {
        let p_not = Self::prob(item, theta_not)?;
        let p_hat = Self::prob(item, theta_hat)?;
        let first_term = p_not * (p_not.ln() - p_hat.ln());
        let second_term = (1.0 - p_not) * ((1.0 - p_not).ln() - (1.0 - p_hat).ln());
        Ok(first_term + second_term)
    }

    fn answer_distribution(&self, item: &ItemParams<'_>, theta: f64) -> Result<Vec<(usize, f64)>> {
        let p = Self::prob(item, theta)?;
        Ok(vec![(1, p), (0, 1.0 - p)])
    }
}
