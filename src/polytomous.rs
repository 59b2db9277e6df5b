//! Polytomous IRT models (GRM, GPCM).

use std::ops::RangeInclusive;

use crate::error::{CatError, Result};
use crate::model::{ItemParams, ResponseModel};
use crate::utils::clamped_logistic;

/// Graded response model.
///
/// Boundary `k` has cumulative probability `logistic(d_k - a * theta)`. The
/// sign is the opposite of the binary models' `d + a * theta` and must stay
/// that way: flipping it reverses the category ordering.
#[derive(Debug, Clone, Copy, Default)]
pub struct Graded;

impl Graded {
    /// Padded cumulative sequence `[0, F_1, ..., F_k, 1]`.
    ///
    /// Fails when two adjacent values coincide, which happens once theta is
    /// far enough out that the clamped boundaries can no longer be told apart.
    pub fn cumulative(item: &ItemParams<'_>, theta: f64) -> Result<Vec<f64>> {
        let mut cdf = Vec::with_capacity(item.difficulty.len() + 2);
        cdf.push(0.0);
        cdf.extend(
            item.difficulty
                .iter()
                .map(|&d| clamped_logistic(d - item.discrimination * theta)),
        );
        cdf.push(1.0);

        if cdf.windows(2).any(|w| w[0] == w[1]) {
            return Err(CatError::extreme_theta());
        }
        Ok(cdf)
    }

    /// `(P*_answer, P*_{answer-1})`
    fn bracket(item: &ItemParams<'_>, theta: f64, answer: usize) -> Result<(f64, f64)> {
        let cdf = Self::cumulative(item, theta)?;
        Ok((cdf[answer], cdf[answer - 1]))
    }
}

impl ResponseModel for Graded {
    fn answers(&self, item: &ItemParams<'_>) -> RangeInclusive<usize> {
        1..=item.difficulty.len() + 1
    }

    fn probability(&self, item: &ItemParams<'_>, theta: f64) -> Result<Vec<f64>> {
        let cdf = Self::cumulative(item, theta)?;
        Ok(cdf.windows(2).map(|w| w[1] - w[0]).collect())
    }

    fn log_probability(&self, item: &ItemParams<'_>, theta: f64, answer: usize) -> Result<f64> {
        self.check_answer(item, answer)?;
        let (p_star1, p_star2) = Self::bracket(item, theta, answer)?;
        Ok((p_star1 - p_star2).ln())
    }

    fn first_derivative(&self, item: &ItemParams<'_>, theta: f64, answer: usize) -> Result<f64> {
        self.check_answer(item, answer)?;
        let (p_star1, p_star2) = Self::bracket(item, theta, answer)?;
        let p = p_star1 - p_star2;
        let w1 = p_star1 * (1.0 - p_star1);
        let w2 = p_star2 * (1.0 - p_star2);
        Ok(-item.discrimination * ((w1 - w2) / p))
    }

    fn second_derivative(
        &self,
        item: &ItemParams<'_>,
        theta: f64,
        answer: usize,
    ) -> Result<f64> {
        self.check_answer(item, answer)?;
        let (p_star1, p_star2) = Self::bracket(item, theta, answer)?;
        let p = p_star1 - p_star2;
        let q_star1 = 1.0 - p_star1;
        let q_star2 = 1.0 - p_star2;
        let w1 = p_star1 * q_star1;
        let w2 = p_star2 * q_star2;
        let w = w1 - w2;

        let first_term = (-w2 * (q_star2 - p_star2) + w1 * (q_star1 - p_star1)) / p;
        let second_term = w.powi(2) / p.powi(2);
        Ok(item.discrimination.powi(2) * (first_term - second_term))
    }

    fn fisher_information(&self, item: &ItemParams<'_>, theta: f64) -> Result<f64> {
        let cdf = Self::cumulative(item, theta)?;
        let disc_sq = item.discrimination.powi(2);
        Ok(cdf
            .windows(2)
            .map(|w| {
                let w1 = w[1] * (1.0 - w[1]);
                let w2 = w[0] * (1.0 - w[0]);
                disc_sq * ((w1 - w2).powi(2) / (w[1] - w[0]))
            })
            .sum())
    }

    fn kl_divergence(
        &self,
        item: &ItemParams<'_>,
        theta_not: f64,
        theta_hat: f64,
    ) -> Result<f64> {
        let p_not = self.probability(item, theta_not)?;
        let p_hat = self.probability(item, theta_hat)?;
        Ok(categorical_kl(&p_not, &p_hat))
    }

    fn answer_distribution(&self, item: &ItemParams<'_>, theta: f64) -> Result<Vec<(usize, f64)>> {
        Ok(self
            .probability(item, theta)?
            .into_iter()
            .enumerate()
            .map(|(k, p)| (k + 1, p))
            .collect())
    }
}

/// Generalized partial credit model.
///
/// Unnormalized mass of category `i` is `exp(s_i)` with `s_0 = a * theta`
/// and `s_i = s_{i-1} + a * (theta - d_i)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartialCredit;

/// Category probabilities of a GPCM item together with their first and
/// second derivatives in theta.
#[derive(Debug, Clone)]
pub struct GpcmDerivatives {
    pub probabilities: Vec<f64>,
    pub first: Vec<f64>,
    pub second: Vec<f64>,
}

impl PartialCredit {
    /// Unnormalized masses `f_i` and the normalizer `g = sum f_i`.
    fn masses(item: &ItemParams<'_>, theta: f64) -> Result<(Vec<f64>, f64)> {
        let a = item.discrimination;
        let mut masses = Vec::with_capacity(item.difficulty.len() + 1);

        let mut sum = a * theta;
        let mut denominator = sum.exp();
        masses.push(denominator);
        for &step in item.difficulty {
            sum += a * (theta - step);
            let num = sum.exp();
            denominator += num;
            masses.push(num);
        }

        if denominator == 0.0 || denominator.is_infinite() {
            return Err(CatError::extreme_theta());
        }
        Ok((masses, denominator))
    }

    /// Quotient-rule derivatives of `f_i / g`, where `f_i' = x_i f_i` and
    /// `x_i = a (i + 1)`. First and second order share the running sums
    /// `g'/g` and `g''/g`, which keeps everything in normalized units.
    pub fn derivatives(item: &ItemParams<'_>, theta: f64) -> Result<GpcmDerivatives> {
        let (masses, g) = Self::masses(item, theta)?;
        let a = item.discrimination;

        let probabilities: Vec<f64> = masses.iter().map(|f| f / g).collect();

        let mut g_prime = 0.0;
        let mut g_primeprime = 0.0;
        for (i, &p) in probabilities.iter().enumerate() {
            let x = a * (i + 1) as f64;
            g_prime += p * x;
            g_primeprime += p * x * x;
        }

        let mut first = Vec::with_capacity(probabilities.len());
        let mut second = Vec::with_capacity(probabilities.len());
        for (i, &p) in probabilities.iter().enumerate() {
            let x = a * (i + 1) as f64;
            // (g f' - f g') / g^2
            let d1 = p * (x - g_prime);
            // (f'' g - g'' f) / g^2 - (g f' - f g') 2 g g' / g^4
            let d2 = p * (x * x - g_primeprime) - 2.0 * g_prime * d1;
            first.push(d1);
            second.push(d2);
        }

        Ok(GpcmDerivatives {
            probabilities,
            first,
            second,
        })
    }
}

impl ResponseModel for PartialCredit {
    fn answers(&self, item: &ItemParams<'_>) -> RangeInclusive<usize> {
        1..=item.difficulty.len() + 1
    }

    fn probability(&self, item: &ItemParams<'_>, theta: f64) -> Result<Vec<f64>> {
        let (mut masses, denominator) = Self::masses(item, theta)?;
        for prob in masses.iter_mut() {
            *prob /= denominator;
        }
        Ok(masses)
    }

    fn log_probability(&self, item: &ItemParams<'_>, theta: f64, answer: usize) -> Result<f64> {
        self.check_answer(item, answer)?;
        let probs = self.probability(item, theta)?;
        Ok(probs[answer - 1].ln())
    }

    fn first_derivative(&self, item: &ItemParams<'_>, theta: f64, answer: usize) -> Result<f64> {
        self.check_answer(item, answer)?;
        let derivs = Self::derivatives(item, theta)?;
        let index = answer - 1;
        Ok(derivs.first[index] / derivs.probabilities[index])
    }

    fn second_derivative(
        &self,
        item: &ItemParams<'_>,
        theta: f64,
        answer: usize,
    ) -> Result<f64> {
        self.check_answer(item, answer)?;
        let derivs = Self::derivatives(item, theta)?;
        let index = answer - 1;
        let p = derivs.probabilities[index];
        let p_prime = derivs.first[index];
        let p_primeprime = derivs.second[index];
        Ok(-((p_prime.powi(2) / p.powi(2)) - (p_primeprime / p)))
    }

    fn fisher_information(&self, item: &ItemParams<'_>, theta: f64) -> Result<f64> {
        let derivs = Self::derivatives(item, theta)?;
        Ok(derivs
            .probabilities
            .iter()
            .zip(derivs.first.iter().zip(&derivs.second))
            .map(|(&p, (&p_prime, &p_primeprime))| p_prime.powi(2) / p - p_primeprime)
            .sum())
    }

    fn kl_divergence(
        &self,
        item: &ItemParams<'_>,
        theta_not: f64,
        theta_hat: f64,
    ) -> Result<f64> {
        let p_not = self.probability(item, theta_not)?;
        let p_hat = self.probability(item, theta_hat)?;
        Ok(categorical_kl(&p_not, &p_hat))
    }

    fn answer_distribution(&self, item: &ItemParams<'_>, theta: f64) -> Result<Vec<(usize, f64)>> {
        Ok(self
            .probability(item, theta)?
            .into_iter()
            .enumerate()
            .map(|(k, p)| (k + 1, p))
            .collect())
    }
}

#[inline]
fn categorical_kl(p_not: &[f64], p_hat: &[f64]) -> f64 {
    p_not
        .iter()
        .zip(p_hat)
        .map(|(&p0, &p1)| p0 * (p0.ln() - p1.ln()))
        .sum()
}
