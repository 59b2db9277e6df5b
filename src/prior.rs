//! Prior distributions over theta.

use serde::{Deserialize, Serialize};

use crate::error::{CatError, Result};
use crate::utils::{ln_gamma, LOG_2_PI};

/// Prior density used both as a Bayesian regularizer (`location`/`scale`
/// enter the MAP score) and as an integration weight.
pub trait Prior: Send + Sync {
    fn density(&self, theta: f64) -> f64;

    /// Location parameter (`param0`).
    fn location(&self) -> f64;

    /// Scale parameter (`param1`), strictly positive.
    fn scale(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorDistribution {
    Normal { mean: f64, sd: f64 },
    StudentT { df: f64, location: f64, scale: f64 },
}

impl PriorDistribution {
    pub fn normal(mean: f64, sd: f64) -> Result<Self> {
        Self::Normal { mean, sd }.validated()
    }

    pub fn student_t(df: f64, location: f64, scale: f64) -> Result<Self> {
        Self::StudentT {
            df,
            location,
            scale,
        }
        .validated()
    }

    /// Rejects non-positive or non-finite scale and degrees of freedom.
    pub fn validated(self) -> Result<Self> {
        let (location, scale) = (self.location(), self.scale());
        if !location.is_finite() {
            return Err(CatError::InvalidPrior(format!(
                "location must be finite, got {location}"
            )));
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(CatError::InvalidPrior(format!(
                "scale must be strictly positive, got {scale}"
            )));
        }
        if let Self::StudentT { df, .. } = self {
            if !(df.is_finite() && df > 0.0) {
                return Err(CatError::InvalidPrior(format!(
                    "degrees of freedom must be strictly positive, got {df}"
                )));
            }
        }
        Ok(self)
    }
}

impl Default for PriorDistribution {
    fn default() -> Self {
        Self::Normal { mean: 0.0, sd: 1.0 }
    }
}

impl Prior for PriorDistribution {
    fn density(&self, theta: f64) -> f64 {
        match *self {
            Self::Normal { mean, sd } => {
                let z = (theta - mean) / sd;
                (-0.5 * z * z - 0.5 * LOG_2_PI).exp() / sd
            }
            Self::StudentT {
                df,
                location,
                scale,
            } => {
                let z = (theta - location) / scale;
                let log_norm = ln_gamma((df + 1.0) / 2.0)
                    - ln_gamma(df / 2.0)
                    - 0.5 * (df * std::f64::consts::PI).ln();
                (log_norm - (df + 1.0) / 2.0 * (z * z / df).ln_1p()).exp() / scale
            }
        }
    }

    fn location(&self) -> f64 {
        match *self {
            Self::Normal { mean, .. } => mean,
            Self::StudentT { location, .. } => location,
        }
    }

    fn scale(&self) -> f64 {
        match *self {
            Self::Normal { sd, .. } => sd,
            Self::StudentT { scale, .. } => scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_standard_normal_density() {
        let prior = PriorDistribution::default();
        assert_relative_eq!(prior.density(0.0), 0.3989422804014327, epsilon = 1e-12);
        assert_relative_eq!(prior.density(1.0), 0.24197072451914337, epsilon = 1e-12);
    }

    #[test]
    fn test_scaled_normal_density() {
        let prior = PriorDistribution::normal(1.0, 2.0).unwrap();
        assert_relative_eq!(prior.density(1.0), 0.3989422804014327 / 2.0, epsilon = 1e-12);
        assert_eq!(prior.location(), 1.0);
        assert_eq!(prior.scale(), 2.0);
    }

    #[test]
    fn test_student_t_with_one_df_is_cauchy() {
        let prior = PriorDistribution::student_t(1.0, 0.0, 1.0).unwrap();
        assert_relative_eq!(prior.density(0.0), 1.0 / std::f64::consts::PI, epsilon = 1e-9);
        assert_relative_eq!(
            prior.density(1.0),
            1.0 / (2.0 * std::f64::consts::PI),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_invalid_scale_is_rejected() {
        assert!(matches!(
            PriorDistribution::normal(0.0, 0.0),
            Err(CatError::InvalidPrior(_))
        ));
        assert!(PriorDistribution::normal(0.0, -1.0).is_err());
        assert!(PriorDistribution::student_t(0.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_serde_tagging() {
        let prior: PriorDistribution =
            serde_json::from_str(r#"{"student_t": {"df": 3.0, "location": 0.0, "scale": 1.5}}"#)
                .unwrap();
        assert_eq!(prior.scale(), 1.5);
    }
}
