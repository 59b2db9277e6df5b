//! Latent trait estimation and item selection for computerized adaptive
//! testing (CAT).
//!
//! This crate provides:
//! - Probability models for binary (ltm, tpm) and polytomous (grm, gpcm) IRT items
//! - Likelihood, score and observed information of an answer pattern
//! - Theta estimation by EAP, MAP or MLE, with standard errors
//! - Item criteria: Fisher/observed information, KL divergence variants,
//!   expected posterior variance, likelihood/posterior weighted information
//! - Selectors that rank every not-yet-administered item
//! - Response simulation at a known theta
//!
//! ```
//! use cat_rs::{CatConfig, Criterion, Model, ItemParameters};
//!
//! let mut config = CatConfig::new(
//!     Model::Ltm,
//!     vec![
//!         ItemParameters::new("q1", 1.0, vec![0.0]),
//!         ItemParameters::new("q2", 2.0, vec![0.0]),
//!     ],
//! );
//! config.criterion = Criterion::Mfi;
//! let mut session = config.build()?;
//! let next = session.next_item()?;
//! assert_eq!(next.item, 1);
//! session.record_answer(next.item, 1)?;
//! assert!(session.estimator().estimate_theta(None)? > 0.0);
//! # Ok::<(), cat_rs::CatError>(())
//! ```

pub mod utils;

pub mod config;
pub mod dichotomous;
pub mod error;
pub mod estimator;
pub mod information;
pub mod model;
pub mod polytomous;
pub mod prior;
pub mod quadrature;
pub mod question_set;
pub mod roots;
pub mod selection;
pub mod simulation;

pub use config::{CatConfig, Session};
pub use error::{CatError, Result};
pub use estimator::{EstimationMethod, Estimator};
pub use model::{Model, Response, ResponseModel};
pub use prior::{Prior, PriorDistribution};
pub use quadrature::{GaussLegendre, Integrator};
pub use question_set::{ItemParameters, QuestionSet};
pub use roots::{Brent, RootEstimate};
pub use selection::{Criterion, Direction, Round, Selection, Selector};
pub use simulation::{simulate_response, simulate_responses};
