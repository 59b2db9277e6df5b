//! Item information, divergence and expectation criteria.
//!
//! These are the per-candidate scores consumed by the selectors. Expectation
//! criteria evaluate hypothetical answers through the overlay, so none of
//! them touch the question set.

use ndarray::Array2;

use crate::error::{CatError, Result};
use crate::estimator::Estimator;
use crate::model::Response;

impl Estimator<'_> {
    /// Fisher information of `item` at `theta`.
    pub fn fisher_information(&self, theta: f64, item: usize) -> Result<f64> {
        let params = self.questions().item(item)?;
        self.family().fisher_information(&params, theta)
    }

    /// Observed information of `item` at `theta` for its recorded answer.
    pub fn observed_information(&self, theta: f64, item: usize) -> Result<f64> {
        let answer = self
            .questions()
            .answer(item)?
            .ok_or(CatError::Unanswered { item })?;
        self.observed_information_for(theta, Response::new(item, answer))
    }

    /// Observed information of a (possibly hypothetical) response.
    pub fn observed_information_for(&self, theta: f64, response: Response) -> Result<f64> {
        let params = self.questions().item(response.item)?;
        let family = self.family();
        family.check_answer(&params, response.answer)?;
        family.observed_information(&params, theta, response.answer)
    }

    /// KL divergence of `item`'s answer distribution at `theta_hat` from the
    /// one at `theta_not`.
    pub fn kl(&self, theta_not: f64, item: usize, theta_hat: f64) -> Result<f64> {
        let params = self.questions().item(item)?;
        self.family().kl_divergence(&params, theta_not, theta_hat)
    }

    /// `theta_hat ± z[0] * sqrt(test information)` around the current
    /// estimate. Collapses to a point before any item is answered.
    pub fn confidence_window(&self) -> Result<(f64, f64)> {
        let theta_hat = self.estimate_theta(None)?;
        self.confidence_window_at(theta_hat)
    }

    /// Confidence window around an already computed estimate.
    pub fn confidence_window_at(&self, theta_hat: f64) -> Result<(f64, f64)> {
        let z = self.questions().z().first().copied().unwrap_or_default();
        let delta = z * self.test_information_at(theta_hat, None)?.sqrt();
        Ok((theta_hat - delta, theta_hat + delta))
    }

    /// Fisher information of `item` integrated over the confidence window.
    pub fn fii(&self, item: usize) -> Result<f64> {
        self.questions().check_item(item)?;
        let (lower, upper) = self.confidence_window()?;
        self.fii_over(item, lower, upper)
    }

    pub fn fii_over(&self, item: usize, lower: f64, upper: f64) -> Result<f64> {
        self.questions().check_item(item)?;
        self.integrate(&mut |theta| self.fisher_information(theta, item), lower, upper)
    }

    /// KL divergence from the current estimate integrated over the
    /// confidence window.
    pub fn expected_kl(&self, item: usize) -> Result<f64> {
        self.questions().check_item(item)?;
        let theta_hat = self.estimate_theta(None)?;
        let (lower, upper) = self.confidence_window_at(theta_hat)?;
        self.expected_kl_over(item, theta_hat, lower, upper)
    }

    pub fn expected_kl_over(
        &self,
        item: usize,
        theta_hat: f64,
        lower: f64,
        upper: f64,
    ) -> Result<f64> {
        self.questions().check_item(item)?;
        self.integrate(
            &mut |theta_not| self.kl(theta_not, item, theta_hat),
            lower,
            upper,
        )
    }

    /// Likelihood-weighted KL divergence over the whole domain.
    pub fn likelihood_kl(&self, item: usize) -> Result<f64> {
        self.questions().check_item(item)?;
        self.likelihood_kl_at(item, self.estimate_theta(None)?)
    }

    pub fn likelihood_kl_at(&self, item: usize, theta_hat: f64) -> Result<f64> {
        self.questions().check_item(item)?;
        let (lower, upper) = self.domain();
        self.integrate(
            &mut |theta_not| {
                Ok(self.likelihood(theta_not, None)? * self.kl(theta_not, item, theta_hat)?)
            },
            lower,
            upper,
        )
    }

    /// Posterior-weighted KL divergence over the whole domain.
    pub fn posterior_kl(&self, item: usize) -> Result<f64> {
        self.questions().check_item(item)?;
        self.posterior_kl_at(item, self.estimate_theta(None)?)
    }

    pub fn posterior_kl_at(&self, item: usize, theta_hat: f64) -> Result<f64> {
        self.questions().check_item(item)?;
        let (lower, upper) = self.domain();
        self.integrate(
            &mut |theta_not| {
                Ok(self.posterior_kernel(theta_not, None)? * self.kl(theta_not, item, theta_hat)?)
            },
            lower,
            upper,
        )
    }

    /// Likelihood-weighted Fisher information.
    pub fn lwi(&self, item: usize) -> Result<f64> {
        self.questions().check_item(item)?;
        let (lower, upper) = self.domain();
        self.integrate(
            &mut |theta| Ok(self.likelihood(theta, None)? * self.fisher_information(theta, item)?),
            lower,
            upper,
        )
    }

    /// Posterior-weighted Fisher information.
    pub fn pwi(&self, item: usize) -> Result<f64> {
        self.questions().check_item(item)?;
        let (lower, upper) = self.domain();
        self.integrate(
            &mut |theta| {
                Ok(self.posterior_kernel(theta, None)? * self.fisher_information(theta, item)?)
            },
            lower,
            upper,
        )
    }

    /// Expected posterior variance after answering `item`: the squared
    /// standard error under each possible answer, weighted by the predicted
    /// answer distribution at the current estimate.
    pub fn expected_pv(&self, item: usize) -> Result<f64> {
        self.questions().check_item(item)?;
        self.expected_pv_at(item, self.estimate_theta(None)?)
    }

    /// As [`Estimator::expected_pv`], with answers predicted at `theta_hat`.
    pub fn expected_pv_at(&self, item: usize, theta_hat: f64) -> Result<f64> {
        let mut sum = 0.0;
        for (answer, weight) in self.predicted_answers(item, theta_hat)? {
            let se = self.estimate_se(Some(Response::new(item, answer)))?;
            sum += weight * se * se;
        }
        Ok(sum)
    }

    /// Expected observed information of `item`: for each possible answer,
    /// the observed information at the estimate that answer would produce.
    pub fn expected_observed_information(&self, item: usize) -> Result<f64> {
        self.questions().check_item(item)?;
        self.expected_observed_information_at(item, self.estimate_theta(None)?)
    }

    pub fn expected_observed_information_at(&self, item: usize, theta_hat: f64) -> Result<f64> {
        let mut sum = 0.0;
        for (answer, weight) in self.predicted_answers(item, theta_hat)? {
            let response = Response::new(item, answer);
            let theta = self.estimate_theta(Some(response))?;
            sum += weight * self.observed_information_for(theta, response)?;
        }
        Ok(sum)
    }

    /// Fisher information of every item on a theta grid (items x points).
    pub fn item_information_curve(&self, grid: &[f64]) -> Result<Array2<f64>> {
        let n_items = self.questions().n_items();
        let mut curve = Array2::zeros((n_items, grid.len()));
        for item in 0..n_items {
            for (k, &theta) in grid.iter().enumerate() {
                curve[[item, k]] = self.fisher_information(theta, item)?;
            }
        }
        Ok(curve)
    }

    fn predicted_answers(&self, item: usize, theta_hat: f64) -> Result<Vec<(usize, f64)>> {
        let params = self.questions().item(item)?;
        self.family().answer_distribution(&params, theta_hat)
    }
}

#[cfg(test)]
mod tests {
    use crate::estimator::{EstimationMethod, Estimator};
    use crate::model::{Model, Response};
    use crate::prior::PriorDistribution;
    use crate::quadrature::GaussLegendre;
    use crate::question_set::{ItemParameters, QuestionSet};
    use approx::assert_relative_eq;

    fn grm_set() -> QuestionSet {
        QuestionSet::new(
            Model::Grm,
            vec![
                ItemParameters::new("q1", 1.2, vec![-1.0, 1.0]),
                ItemParameters::new("q2", 0.7, vec![-0.5, 0.5, 1.5]),
                ItemParameters::new("q3", 2.0, vec![-1.5, 0.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_observed_information_requires_an_answer() {
        let qs = grm_set().with_answers(&[Some(2), None, None]).unwrap();
        let prior = PriorDistribution::default();
        let quad = GaussLegendre::default();
        let est = Estimator::new(&qs, &prior, &quad, EstimationMethod::Eap);
        assert!(est.observed_information(0.0, 0).is_ok());
        assert!(matches!(
            est.observed_information(0.0, 1),
            Err(crate::error::CatError::Unanswered { item: 1 })
        ));
        assert!(est
            .observed_information_for(0.0, Response::new(1, 9))
            .is_err());
    }

    #[test]
    fn test_window_collapses_without_answers() {
        let qs = grm_set();
        let prior = PriorDistribution::default();
        let quad = GaussLegendre::default();
        let est = Estimator::new(&qs, &prior, &quad, EstimationMethod::Eap);
        let (lo, hi) = est.confidence_window().unwrap();
        assert_eq!(lo, hi);
        assert_eq!(est.fii(1).unwrap(), 0.0);
        assert_eq!(est.expected_kl(1).unwrap(), 0.0);
    }

    #[test]
    fn test_window_criteria_are_positive_after_answers() {
        let qs = grm_set().with_answers(&[Some(2), None, None]).unwrap();
        let prior = PriorDistribution::default();
        let quad = GaussLegendre::default();
        let est = Estimator::new(&qs, &prior, &quad, EstimationMethod::Eap);
        let (lo, hi) = est.confidence_window().unwrap();
        assert!(lo < hi);
        assert!(est.fii(1).unwrap() > 0.0);
        assert!(est.expected_kl(1).unwrap() > 0.0);
    }

    #[test]
    fn test_weighted_information_relations() {
        let qs = grm_set().with_answers(&[Some(3), None, None]).unwrap();
        let prior = PriorDistribution::default();
        let quad = GaussLegendre::default();
        let est = Estimator::new(&qs, &prior, &quad, EstimationMethod::Eap);

        // the standard normal density never exceeds 1/sqrt(2 pi)
        let ratio = est.pwi(2).unwrap() / est.lwi(2).unwrap();
        assert!(ratio > 0.0 && ratio < 0.4);
        let kl_ratio = est.posterior_kl(2).unwrap() / est.likelihood_kl(2).unwrap();
        assert!(kl_ratio > 0.0 && kl_ratio < 0.4);
    }

    #[test]
    fn test_expected_pv_is_below_prior_variance() {
        let qs = grm_set().with_answers(&[Some(2), None, None]).unwrap();
        let prior = PriorDistribution::default();
        let quad = GaussLegendre::default();
        let est = Estimator::new(&qs, &prior, &quad, EstimationMethod::Eap);
        for item in [1, 2] {
            let epv = est.expected_pv(item).unwrap();
            assert!(epv > 0.0);
            assert!(epv < 1.0);
        }
    }

    #[test]
    fn test_expected_observed_information_for_binary_items() {
        let qs = QuestionSet::new(
            Model::Ltm,
            vec![
                ItemParameters::new("q1", 1.0, vec![0.0]),
                ItemParameters::new("q2", 1.5, vec![0.3]),
            ],
        )
        .unwrap()
        .with_answers(&[Some(1), None])
        .unwrap();
        let prior = PriorDistribution::default();
        let quad = GaussLegendre::default();
        let est = Estimator::new(&qs, &prior, &quad, EstimationMethod::Map);

        let theta = est.estimate_theta(None).unwrap();
        let p = est.probability(theta, 1).unwrap()[0];
        let theta_1 = est.estimate_theta(Some(Response::new(1, 1))).unwrap();
        let theta_0 = est.estimate_theta(Some(Response::new(1, 0))).unwrap();
        let expected = p * est.fisher_information(theta_1, 1).unwrap()
            + (1.0 - p) * est.fisher_information(theta_0, 1).unwrap();
        assert_relative_eq!(
            est.expected_observed_information(1).unwrap(),
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_item_information_curve_shape() {
        let qs = grm_set();
        let prior = PriorDistribution::default();
        let quad = GaussLegendre::default();
        let est = Estimator::new(&qs, &prior, &quad, EstimationMethod::Eap);
        let grid = [-2.0, 0.0, 2.0];
        let curve = est.item_information_curve(&grid).unwrap();
        assert_eq!(curve.dim(), (3, 3));
        assert_relative_eq!(curve[[1, 2]], est.fisher_information(2.0, 1).unwrap());
        assert!(curve.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn test_criteria_reject_unknown_items() {
        let qs = grm_set();
        let prior = PriorDistribution::default();
        let quad = GaussLegendre::default();
        let est = Estimator::new(&qs, &prior, &quad, EstimationMethod::Eap);
        assert!(est.fii(7).is_err());
        assert!(est.pwi(7).is_err());
        assert!(est.expected_pv(7).is_err());
    }
}
