//! Session configuration loaded from JSON.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::estimator::{EstimationMethod, Estimator};
use crate::model::Model;
use crate::prior::PriorDistribution;
use crate::quadrature::{GaussLegendre, DEFAULT_POINTS, DEFAULT_SUBINTERVALS};
use crate::question_set::{
    ItemParameters, QuestionSet, DEFAULT_LOWER_BOUND, DEFAULT_UPPER_BOUND, DEFAULT_Z,
};
use crate::selection::{Criterion, Selection, Selector};

/// Everything needed to run one adaptive test.
///
/// ```json
/// {
///   "model": "grm",
///   "items": [{"name": "q1", "discrimination": 1.2, "difficulty": [-1.0, 1.0]}],
///   "answers": [null],
///   "prior": {"normal": {"mean": 0.0, "sd": 1.0}},
///   "estimation": "EAP",
///   "criterion": "MFI"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatConfig {
    pub model: Model,
    pub items: Vec<ItemParameters>,
    /// Either empty or one entry per item; `null` marks an unanswered item.
    #[serde(default)]
    pub answers: Vec<Option<usize>>,
    #[serde(default = "default_lower_bound")]
    pub lower_bound: f64,
    #[serde(default = "default_upper_bound")]
    pub upper_bound: f64,
    #[serde(default = "default_z")]
    pub z: Vec<f64>,
    #[serde(default)]
    pub prior: PriorDistribution,
    #[serde(default)]
    pub estimation: EstimationMethod,
    #[serde(default)]
    pub criterion: Criterion,
    #[serde(default = "default_subintervals")]
    pub subintervals: usize,
    #[serde(default = "default_quadrature_points")]
    pub quadrature_points: usize,
    /// Seed for the `RANDOM` criterion.
    #[serde(default)]
    pub seed: u64,
}

fn default_lower_bound() -> f64 {
    DEFAULT_LOWER_BOUND
}

fn default_upper_bound() -> f64 {
    DEFAULT_UPPER_BOUND
}

fn default_z() -> Vec<f64> {
    vec![DEFAULT_Z]
}

fn default_subintervals() -> usize {
    DEFAULT_SUBINTERVALS
}

fn default_quadrature_points() -> usize {
    DEFAULT_POINTS
}

impl CatConfig {
    pub fn new(model: Model, items: Vec<ItemParameters>) -> Self {
        Self {
            model,
            items,
            answers: Vec::new(),
            lower_bound: DEFAULT_LOWER_BOUND,
            upper_bound: DEFAULT_UPPER_BOUND,
            z: default_z(),
            prior: PriorDistribution::default(),
            estimation: EstimationMethod::default(),
            criterion: Criterion::default(),
            subintervals: DEFAULT_SUBINTERVALS,
            quadrature_points: DEFAULT_POINTS,
            seed: 0,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validates every part of the configuration and assembles a session.
    pub fn build(self) -> Result<Session> {
        let mut questions = QuestionSet::new(self.model, self.items)?
            .with_bounds(self.lower_bound, self.upper_bound)?
            .with_z(self.z)?;
        if !self.answers.is_empty() {
            questions = questions.with_answers(&self.answers)?;
        }
        let prior = self.prior.validated()?;

        tracing::debug!(
            model = %self.model,
            n_items = questions.n_items(),
            answered = questions.applicable_rows().len(),
            estimation = ?self.estimation,
            criterion = ?self.criterion,
            "built session"
        );

        Ok(Session {
            questions,
            prior,
            integrator: GaussLegendre::new(self.quadrature_points),
            estimation: self.estimation,
            criterion: self.criterion,
            subintervals: self.subintervals.max(1),
            seed: self.seed,
        })
    }
}

/// Owned state of one adaptive test: the question set plus the estimation
/// and selection settings that read it.
#[derive(Debug, Clone)]
pub struct Session {
    questions: QuestionSet,
    prior: PriorDistribution,
    integrator: GaussLegendre,
    estimation: EstimationMethod,
    criterion: Criterion,
    subintervals: usize,
    seed: u64,
}

impl Session {
    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    pub fn prior(&self) -> &PriorDistribution {
        &self.prior
    }

    pub fn criterion(&self) -> Criterion {
        self.criterion
    }

    pub fn record_answer(&mut self, item: usize, answer: usize) -> Result<()> {
        self.questions.record_answer(item, answer)
    }

    pub fn clear_answer(&mut self, item: usize) -> Result<Option<usize>> {
        self.questions.clear_answer(item)
    }

    pub fn estimator(&self) -> Estimator<'_> {
        Estimator::new(&self.questions, &self.prior, &self.integrator, self.estimation)
            .with_subintervals(self.subintervals)
    }

    pub fn selector(&self) -> Box<dyn Selector> {
        self.criterion.selector(self.seed)
    }

    /// Runs the configured criterion over the remaining items.
    pub fn next_item(&self) -> Result<Selection> {
        self.selector().select(&self.estimator())
    }
}
