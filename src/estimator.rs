//! Likelihood, score and theta estimation.
//!
//! Every whole-test quantity takes an `overlay: Option<Response>`. `None`
//! evaluates the recorded answers over the applicable rows; `Some(r)` adds
//! the hypothetical answer `r` on top (replacing the recorded answer if the
//! item is already applicable). The question set is never mutated, so an
//! estimator can be shared freely across threads.

use serde::{Deserialize, Serialize};

use crate::error::{CatError, Result};
use crate::model::{Response, ResponseModel};
use crate::prior::Prior;
use crate::quadrature::{Integrator, DEFAULT_SUBINTERVALS};
use crate::question_set::QuestionSet;
use crate::roots::{Brent, RootEstimate, THETA_BRACKET};

/// Point-estimation strategy for theta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EstimationMethod {
    /// Posterior mean by quadrature.
    #[default]
    Eap,
    /// Root of the prior-regularized score.
    Map,
    /// Root of the plain score.
    Mle,
}

pub struct Estimator<'a> {
    questions: &'a QuestionSet,
    prior: &'a dyn Prior,
    integrator: &'a dyn Integrator,
    method: EstimationMethod,
    subintervals: usize,
    solver: Brent,
}

impl<'a> Estimator<'a> {
    pub fn new(
        questions: &'a QuestionSet,
        prior: &'a dyn Prior,
        integrator: &'a dyn Integrator,
        method: EstimationMethod,
    ) -> Self {
        Self {
            questions,
            prior,
            integrator,
            method,
            subintervals: DEFAULT_SUBINTERVALS,
            solver: Brent::default(),
        }
    }

    pub fn with_subintervals(mut self, subintervals: usize) -> Self {
        self.subintervals = subintervals.max(1);
        self
    }

    pub fn with_solver(mut self, solver: Brent) -> Self {
        self.solver = solver;
        self
    }

    pub fn questions(&self) -> &'a QuestionSet {
        self.questions
    }

    pub fn prior(&self) -> &'a dyn Prior {
        self.prior
    }

    pub fn method(&self) -> EstimationMethod {
        self.method
    }

    pub(crate) fn family(&self) -> &'static dyn ResponseModel {
        self.questions.model().family()
    }

    /// Category probabilities of `item` at `theta`.
    pub fn probability(&self, theta: f64, item: usize) -> Result<Vec<f64>> {
        let params = self.questions.item(item)?;
        self.family().probability(&params, theta)
    }

    /// Sum of per-item log-probabilities of the (overlaid) answers.
    pub fn log_likelihood(&self, theta: f64, overlay: Option<Response>) -> Result<f64> {
        let family = self.family();
        let mut ll = 0.0;
        for response in self.questions.responses(overlay)? {
            let params = self.questions.item(response.item)?;
            ll += family.log_probability(&params, theta, response.answer)?;
        }
        Ok(ll)
    }

    /// Joint likelihood, accumulated in log space and exponentiated once.
    /// Still underflows for very long tests.
    pub fn likelihood(&self, theta: f64, overlay: Option<Response>) -> Result<f64> {
        Ok(self.log_likelihood(theta, overlay)?.exp())
    }

    /// First derivative of the log-likelihood. With `use_prior`, the normal
    /// prior term `(theta - location) / scale^2` is subtracted. With no
    /// answers at all the prior term alone is returned.
    pub fn d1ll(&self, theta: f64, use_prior: bool, overlay: Option<Response>) -> Result<f64> {
        let prior_shift = (theta - self.prior.location()) / self.prior.scale().powi(2);
        if overlay.is_none() && self.questions.applicable_rows().is_empty() {
            return Ok(-prior_shift);
        }

        let family = self.family();
        let mut l_theta = 0.0;
        for response in self.questions.responses(overlay)? {
            let params = self.questions.item(response.item)?;
            l_theta += family.first_derivative(&params, theta, response.answer)?;
        }
        Ok(if use_prior { l_theta - prior_shift } else { l_theta })
    }

    /// Second derivative of the log-likelihood, optionally minus
    /// `1 / scale^2`.
    pub fn d2ll(&self, theta: f64, use_prior: bool, overlay: Option<Response>) -> Result<f64> {
        let prior_shift = 1.0 / self.prior.scale().powi(2);
        if overlay.is_none() && self.questions.applicable_rows().is_empty() {
            return Ok(-prior_shift);
        }

        let family = self.family();
        let mut lambda_theta = 0.0;
        for response in self.questions.responses(overlay)? {
            let params = self.questions.item(response.item)?;
            lambda_theta += family.second_derivative(&params, theta, response.answer)?;
        }
        Ok(if use_prior {
            lambda_theta - prior_shift
        } else {
            lambda_theta
        })
    }

    /// Root of the score on the fixed theta bracket. Non-convergence within
    /// the iteration cap is reported through [`RootEstimate::converged`],
    /// not as an error.
    pub fn find_root(&self, use_prior: bool, overlay: Option<Response>) -> Result<RootEstimate> {
        let (lo, hi) = THETA_BRACKET;
        self.solver
            .find_root(|theta| self.d1ll(theta, use_prior, overlay), lo, hi)
    }

    pub fn estimate_theta(&self, overlay: Option<Response>) -> Result<f64> {
        match self.method {
            EstimationMethod::Eap => self.expected_a_posteriori(overlay),
            EstimationMethod::Map => Ok(self.find_root(true, overlay)?.root),
            EstimationMethod::Mle => Ok(self.find_root(false, overlay)?.root),
        }
    }

    /// Standard error of the current estimate: posterior standard deviation
    /// for EAP, inverse root of the observed information (prior included)
    /// for MAP, inverse root of the test Fisher information for MLE.
    pub fn estimate_se(&self, overlay: Option<Response>) -> Result<f64> {
        match self.method {
            EstimationMethod::Eap => {
                let theta_hat = self.expected_a_posteriori(overlay)?;
                Ok(self.posterior_variance(theta_hat, overlay)?.sqrt())
            }
            EstimationMethod::Map => {
                let theta_hat = self.estimate_theta(overlay)?;
                inverse_sqrt_information(-self.d2ll(theta_hat, true, overlay)?)
            }
            EstimationMethod::Mle => {
                inverse_sqrt_information(self.fisher_test_information(overlay)?)
            }
        }
    }

    /// Sum of item Fisher information at the current estimate over the
    /// (overlaid) answered items.
    pub fn fisher_test_information(&self, overlay: Option<Response>) -> Result<f64> {
        let theta = self.estimate_theta(overlay)?;
        self.test_information_at(theta, overlay)
    }

    /// Test Fisher information at a given theta.
    pub fn test_information_at(&self, theta: f64, overlay: Option<Response>) -> Result<f64> {
        let family = self.family();
        let mut sum = 0.0;
        for response in self.questions.responses(overlay)? {
            let params = self.questions.item(response.item)?;
            sum += family.fisher_information(&params, theta)?;
        }
        Ok(sum)
    }

    fn expected_a_posteriori(&self, overlay: Option<Response>) -> Result<f64> {
        let (lower, upper) = self.domain();
        let numerator = self.integrate(
            &mut |theta| Ok(theta * self.posterior_kernel(theta, overlay)?),
            lower,
            upper,
        )?;
        let denominator = self.posterior_mass(overlay)?;
        let theta_hat = numerator / denominator;
        tracing::trace!(theta_hat, "EAP estimate");
        Ok(theta_hat)
    }

    fn posterior_variance(&self, theta_hat: f64, overlay: Option<Response>) -> Result<f64> {
        let (lower, upper) = self.domain();
        let numerator = self.integrate(
            &mut |theta| Ok((theta - theta_hat).powi(2) * self.posterior_kernel(theta, overlay)?),
            lower,
            upper,
        )?;
        Ok(numerator / self.posterior_mass(overlay)?)
    }

    fn posterior_mass(&self, overlay: Option<Response>) -> Result<f64> {
        let (lower, upper) = self.domain();
        let mass = self.integrate(
            &mut |theta| self.posterior_kernel(theta, overlay),
            lower,
            upper,
        )?;
        if mass > 0.0 && mass.is_finite() {
            Ok(mass)
        } else {
            Err(CatError::NumericDomain(format!(
                "posterior mass {mass} over [{lower}, {upper}] cannot be normalized"
            )))
        }
    }

    /// Unnormalized posterior `prior(theta) * likelihood(theta)`.
    #[inline]
    pub(crate) fn posterior_kernel(&self, theta: f64, overlay: Option<Response>) -> Result<f64> {
        Ok(self.prior.density(theta) * self.likelihood(theta, overlay)?)
    }

    pub(crate) fn domain(&self) -> (f64, f64) {
        (self.questions.lower_bound(), self.questions.upper_bound())
    }

    pub(crate) fn integrate(
        &self,
        f: &mut dyn FnMut(f64) -> Result<f64>,
        lower: f64,
        upper: f64,
    ) -> Result<f64> {
        self.integrator.integrate(f, self.subintervals, lower, upper)
    }
}

fn inverse_sqrt_information(information: f64) -> Result<f64> {
    if information > 0.0 {
        Ok(1.0 / information.sqrt())
    } else if information == 0.0 {
        Ok(f64::INFINITY)
    } else {
        Err(CatError::NumericDomain(format!(
            "test information {information} is not positive"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::prior::PriorDistribution;
    use crate::quadrature::GaussLegendre;
    use crate::question_set::ItemParameters;
    use approx::assert_relative_eq;

    fn ltm_set() -> QuestionSet {
        QuestionSet::new(
            Model::Ltm,
            vec![
                ItemParameters::new("q1", 1.0, vec![0.0]),
                ItemParameters::new("q2", 1.5, vec![-0.5]),
                ItemParameters::new("q3", 0.8, vec![0.7]),
                ItemParameters::new("q4", 2.0, vec![0.2]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_empty_likelihood_is_one() {
        let qs = ltm_set();
        let prior = PriorDistribution::default();
        let quad = GaussLegendre::default();
        let est = Estimator::new(&qs, &prior, &quad, EstimationMethod::Eap);
        assert_eq!(est.likelihood(0.3, None).unwrap(), 1.0);
    }

    #[test]
    fn test_empty_derivatives_reduce_to_prior() {
        let qs = ltm_set();
        let prior = PriorDistribution::normal(0.5, 2.0).unwrap();
        let quad = GaussLegendre::default();
        let est = Estimator::new(&qs, &prior, &quad, EstimationMethod::Map);
        assert_relative_eq!(est.d1ll(1.5, true, None).unwrap(), -0.25);
        assert_relative_eq!(est.d1ll(1.5, false, None).unwrap(), -0.25);
        assert_relative_eq!(est.d2ll(1.5, true, None).unwrap(), -0.25);
        // MAP with no answers sits on the prior location
        assert_relative_eq!(est.estimate_theta(None).unwrap(), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_likelihood_matches_product_of_probabilities() {
        let qs = ltm_set()
            .with_answers(&[Some(1), Some(0), None, Some(1)])
            .unwrap();
        let prior = PriorDistribution::default();
        let quad = GaussLegendre::default();
        let est = Estimator::new(&qs, &prior, &quad, EstimationMethod::Eap);

        let theta = 0.4;
        let p = |item| est.probability(theta, item).unwrap()[0];
        let expected = p(0) * (1.0 - p(1)) * p(3);
        assert_relative_eq!(est.likelihood(theta, None).unwrap(), expected, epsilon = 1e-14);
    }

    #[test]
    fn test_d1ll_is_derivative_of_log_likelihood() {
        let qs = ltm_set()
            .with_answers(&[Some(1), Some(0), Some(0), Some(1)])
            .unwrap();
        let prior = PriorDistribution::default();
        let quad = GaussLegendre::default();
        let est = Estimator::new(&qs, &prior, &quad, EstimationMethod::Mle);

        let h = 1e-6;
        let numeric = (est.log_likelihood(0.2 + h, None).unwrap()
            - est.log_likelihood(0.2 - h, None).unwrap())
            / (2.0 * h);
        assert_relative_eq!(est.d1ll(0.2, false, None).unwrap(), numeric, epsilon = 1e-6);
    }

    #[test]
    fn test_mle_and_map_roots_zero_the_score() {
        let qs = ltm_set()
            .with_answers(&[Some(1), Some(0), Some(1), Some(0)])
            .unwrap();
        let prior = PriorDistribution::default();
        let quad = GaussLegendre::default();

        let mle = Estimator::new(&qs, &prior, &quad, EstimationMethod::Mle);
        let root = mle.find_root(false, None).unwrap();
        assert!(root.converged);
        assert!(mle.d1ll(root.root, false, None).unwrap().abs() < 1e-6);

        let map = Estimator::new(&qs, &prior, &quad, EstimationMethod::Map);
        let theta_map = map.estimate_theta(None).unwrap();
        assert!(map.d1ll(theta_map, true, None).unwrap().abs() < 1e-6);
        // the prior shrinks towards its location
        assert!(theta_map.abs() <= root.root.abs() + 1e-9);
    }

    #[test]
    fn test_mle_without_sign_change_is_domain_error() {
        let qs = ltm_set()
            .with_answers(&[Some(1), Some(1), Some(1), Some(1)])
            .unwrap();
        let prior = PriorDistribution::default();
        let quad = GaussLegendre::default();
        let mle = Estimator::new(&qs, &prior, &quad, EstimationMethod::Mle);
        assert!(matches!(
            mle.estimate_theta(None),
            Err(CatError::NumericDomain(_))
        ));
    }

    #[test]
    fn test_eap_without_answers_is_prior_mean() {
        let qs = ltm_set();
        let prior = PriorDistribution::normal(0.3, 1.0).unwrap();
        let quad = GaussLegendre::default();
        let est = Estimator::new(&qs, &prior, &quad, EstimationMethod::Eap);
        assert_relative_eq!(est.estimate_theta(None).unwrap(), 0.3, epsilon = 1e-4);
        // standard normal truncated to [-5, 5] keeps essentially all mass
        assert_relative_eq!(est.estimate_se(None).unwrap(), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_eap_moves_with_answers() {
        let prior = PriorDistribution::default();
        let quad = GaussLegendre::default();

        let right = ltm_set()
            .with_answers(&[Some(1), Some(1), Some(1), None])
            .unwrap();
        let wrong = ltm_set()
            .with_answers(&[Some(0), Some(0), Some(0), None])
            .unwrap();
        let up = Estimator::new(&right, &prior, &quad, EstimationMethod::Eap)
            .estimate_theta(None)
            .unwrap();
        let down = Estimator::new(&wrong, &prior, &quad, EstimationMethod::Eap)
            .estimate_theta(None)
            .unwrap();
        assert!(up > 0.0);
        assert!(down < 0.0);

        let se = Estimator::new(&right, &prior, &quad, EstimationMethod::Eap)
            .estimate_se(None)
            .unwrap();
        assert!(se < 1.0);
    }

    #[test]
    fn test_overlay_matches_recorded_answer() {
        let prior = PriorDistribution::default();
        let quad = GaussLegendre::default();

        let partial = ltm_set()
            .with_answers(&[Some(1), None, Some(0), None])
            .unwrap();
        let full = ltm_set()
            .with_answers(&[Some(1), Some(0), Some(0), None])
            .unwrap();
        let overlay = Some(Response::new(1, 0));

        for method in [
            EstimationMethod::Eap,
            EstimationMethod::Map,
            EstimationMethod::Mle,
        ] {
            let a = Estimator::new(&partial, &prior, &quad, method);
            let b = Estimator::new(&full, &prior, &quad, method);
            assert_relative_eq!(
                a.likelihood(0.1, overlay).unwrap(),
                b.likelihood(0.1, None).unwrap(),
                epsilon = 1e-14
            );
            assert_relative_eq!(
                a.d1ll(0.1, true, overlay).unwrap(),
                b.d1ll(0.1, true, None).unwrap(),
                epsilon = 1e-12
            );
            assert_relative_eq!(
                a.d2ll(0.1, true, overlay).unwrap(),
                b.d2ll(0.1, true, None).unwrap(),
                epsilon = 1e-12
            );
            assert_relative_eq!(
                a.estimate_theta(overlay).unwrap(),
                b.estimate_theta(None).unwrap(),
                epsilon = 1e-6
            );
            assert_relative_eq!(
                a.estimate_se(overlay).unwrap(),
                b.estimate_se(None).unwrap(),
                epsilon = 1e-6
            );
        }
    }

    #[test]
    fn test_overlay_on_answered_item_is_identity() {
        let qs = ltm_set()
            .with_answers(&[Some(1), Some(0), None, None])
            .unwrap();
        let prior = PriorDistribution::default();
        let quad = GaussLegendre::default();
        let est = Estimator::new(&qs, &prior, &quad, EstimationMethod::Eap);
        let same = Some(Response::new(1, 0));
        assert_eq!(
            est.likelihood(0.7, same).unwrap(),
            est.likelihood(0.7, None).unwrap()
        );
        assert_eq!(
            est.estimate_theta(same).unwrap(),
            est.estimate_theta(None).unwrap()
        );
    }

    #[test]
    fn test_map_se_uses_observed_information() {
        let qs = ltm_set()
            .with_answers(&[Some(1), Some(0), Some(1), Some(0)])
            .unwrap();
        let prior = PriorDistribution::default();
        let quad = GaussLegendre::default();
        let est = Estimator::new(&qs, &prior, &quad, EstimationMethod::Map);
        let theta = est.estimate_theta(None).unwrap();
        let expected = 1.0 / (-est.d2ll(theta, true, None).unwrap()).sqrt();
        assert_relative_eq!(est.estimate_se(None).unwrap(), expected);
    }

    #[test]
    fn test_mle_se_without_answers_is_infinite() {
        let qs = ltm_set();
        let prior = PriorDistribution::default();
        let quad = GaussLegendre::default();
        let est = Estimator::new(&qs, &prior, &quad, EstimationMethod::Mle);
        assert_eq!(est.fisher_test_information(None).unwrap(), 0.0);
        assert!(est.estimate_se(None).unwrap().is_infinite());
    }
}
