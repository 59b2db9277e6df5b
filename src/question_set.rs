//! Item bank and respondent answer state.

use serde::{Deserialize, Serialize};

use crate::error::{CatError, Result};
use crate::model::{ItemParams, Model, Response};

pub const DEFAULT_LOWER_BOUND: f64 = -5.0;
pub const DEFAULT_UPPER_BOUND: f64 = 5.0;
pub const DEFAULT_Z: f64 = 0.9;

/// Parameters of a single item as supplied by a loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemParameters {
    #[serde(default)]
    pub name: String,
    pub discrimination: f64,
    pub difficulty: Vec<f64>,
    #[serde(default)]
    pub guessing: f64,
}

impl ItemParameters {
    pub fn new(name: impl Into<String>, discrimination: f64, difficulty: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            discrimination,
            difficulty,
            guessing: 0.0,
        }
    }

    pub fn with_guessing(mut self, guessing: f64) -> Self {
        self.guessing = guessing;
        self
    }
}

/// Item parameters plus the respondent's answers.
///
/// `applicable_rows` (answered items, in answer order) and
/// `nonapplicable_rows` (candidates, ascending id) always partition the item
/// ids; both are only changed through [`QuestionSet::record_answer`] and
/// [`QuestionSet::clear_answer`].
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionSet {
    model: Model,
    discrimination: Vec<f64>,
    difficulty: Vec<Vec<f64>>,
    guessing: Vec<f64>,
    answers: Vec<Option<usize>>,
    applicable_rows: Vec<usize>,
    nonapplicable_rows: Vec<usize>,
    question_names: Vec<String>,
    lower_bound: f64,
    upper_bound: f64,
    z: Vec<f64>,
}

impl QuestionSet {
    pub fn new(model: Model, items: Vec<ItemParameters>) -> Result<Self> {
        if items.is_empty() {
            return Err(CatError::InvalidQuestionSet(
                "a question set needs at least one item".to_string(),
            ));
        }

        let n_items = items.len();
        let mut discrimination = Vec::with_capacity(n_items);
        let mut difficulty = Vec::with_capacity(n_items);
        let mut guessing = Vec::with_capacity(n_items);
        let mut question_names = Vec::with_capacity(n_items);

        for (j, item) in items.into_iter().enumerate() {
            validate_item(model, j, &item)?;
            discrimination.push(item.discrimination);
            difficulty.push(item.difficulty);
            guessing.push(if model == Model::Ltm { 0.0 } else { item.guessing });
            question_names.push(if item.name.is_empty() {
                format!("q{}", j + 1)
            } else {
                item.name
            });
        }

        Ok(Self {
            model,
            discrimination,
            difficulty,
            guessing,
            answers: vec![None; n_items],
            applicable_rows: Vec::new(),
            nonapplicable_rows: (0..n_items).collect(),
            question_names,
            lower_bound: DEFAULT_LOWER_BOUND,
            upper_bound: DEFAULT_UPPER_BOUND,
            z: vec![DEFAULT_Z],
        })
    }

    /// Theta integration domain.
    pub fn with_bounds(mut self, lower_bound: f64, upper_bound: f64) -> Result<Self> {
        if !(lower_bound.is_finite() && upper_bound.is_finite() && lower_bound < upper_bound) {
            return Err(CatError::InvalidQuestionSet(format!(
                "integration bounds must be finite with lower < upper, got [{lower_bound}, {upper_bound}]"
            )));
        }
        self.lower_bound = lower_bound;
        self.upper_bound = upper_bound;
        Ok(self)
    }

    /// z-score constants for confidence windows; only the first one is used
    /// by the window-based criteria.
    pub fn with_z(mut self, z: Vec<f64>) -> Result<Self> {
        if z.is_empty() || z.iter().any(|v| !v.is_finite()) {
            return Err(CatError::InvalidQuestionSet(
                "z must hold at least one finite value".to_string(),
            ));
        }
        self.z = z;
        Ok(self)
    }

    /// Records answers in order, skipping `None` entries.
    pub fn with_answers(mut self, answers: &[Option<usize>]) -> Result<Self> {
        if answers.len() != self.n_items() {
            return Err(CatError::InvalidQuestionSet(format!(
                "expected {} answers, got {}",
                self.n_items(),
                answers.len()
            )));
        }
        for (item, answer) in answers.iter().enumerate() {
            if let Some(answer) = answer {
                self.record_answer(item, *answer)?;
            }
        }
        Ok(self)
    }

    /// Stores a real answer and moves the item to the applicable rows.
    /// Re-answering an item replaces the previous answer in place.
    pub fn record_answer(&mut self, item: usize, answer: usize) -> Result<()> {
        let params = self.item(item)?;
        self.model.family().check_answer(&params, answer)?;

        if self.answers[item].is_none() {
            self.nonapplicable_rows.retain(|&q| q != item);
            self.applicable_rows.push(item);
        }
        self.answers[item] = Some(answer);
        Ok(())
    }

    /// Forgets an answer and returns the item to the candidate pool.
    pub fn clear_answer(&mut self, item: usize) -> Result<Option<usize>> {
        self.check_item(item)?;
        let previous = self.answers[item].take();
        if previous.is_some() {
            self.applicable_rows.retain(|&q| q != item);
            let pos = self
                .nonapplicable_rows
                .partition_point(|&q| q < item);
            self.nonapplicable_rows.insert(pos, item);
        }
        Ok(previous)
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn n_items(&self) -> usize {
        self.discrimination.len()
    }

    pub fn check_item(&self, item: usize) -> Result<()> {
        if item < self.n_items() {
            Ok(())
        } else {
            Err(CatError::ItemOutOfRange {
                item,
                n_items: self.n_items(),
            })
        }
    }

    pub fn item(&self, item: usize) -> Result<ItemParams<'_>> {
        self.check_item(item)?;
        Ok(ItemParams {
            id: item,
            discrimination: self.discrimination[item],
            difficulty: &self.difficulty[item],
            guessing: self.guessing[item],
        })
    }

    pub fn answer(&self, item: usize) -> Result<Option<usize>> {
        self.check_item(item)?;
        Ok(self.answers[item])
    }

    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    /// Recorded answers over the applicable rows, with `overlay` applied on
    /// top: its item is counted once, with its answer taking precedence.
    pub fn responses(&self, overlay: Option<Response>) -> Result<Vec<Response>> {
        let mut responses = Vec::with_capacity(self.applicable_rows.len() + 1);
        let mut overlaid = false;
        for &item in &self.applicable_rows {
            match overlay {
                Some(extra) if extra.item == item => {
                    responses.push(extra);
                    overlaid = true;
                }
                _ => {
                    let answer = self.answers[item].ok_or(CatError::Unanswered { item })?;
                    responses.push(Response::new(item, answer));
                }
            }
        }
        if let Some(extra) = overlay {
            if !overlaid {
                self.check_item(extra.item)?;
                responses.push(extra);
            }
        }
        Ok(responses)
    }

    pub fn applicable_rows(&self) -> &[usize] {
        &self.applicable_rows
    }

    pub fn nonapplicable_rows(&self) -> &[usize] {
        &self.nonapplicable_rows
    }

    pub fn question_names(&self) -> &[String] {
        &self.question_names
    }

    pub fn question_name(&self, item: usize) -> Result<&str> {
        self.check_item(item)?;
        Ok(&self.question_names[item])
    }

    pub fn discrimination(&self) -> &[f64] {
        &self.discrimination
    }

    pub fn difficulty(&self) -> &[Vec<f64>] {
        &self.difficulty
    }

    pub fn guessing(&self) -> &[f64] {
        &self.guessing
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }
}

fn validate_item(model: Model, j: usize, item: &ItemParameters) -> Result<()> {
    let invalid = |msg: String| Err(CatError::InvalidQuestionSet(format!("item {j}: {msg}")));

    if !item.discrimination.is_finite() {
        return invalid(format!("non-finite discrimination {}", item.discrimination));
    }
    if item.difficulty.iter().any(|d| !d.is_finite()) {
        return invalid("non-finite difficulty".to_string());
    }

    if model.is_binary() {
        if item.difficulty.len() != 1 {
            return invalid(format!(
                "{model} items take exactly one difficulty, got {}",
                item.difficulty.len()
            ));
        }
        if !(0.0..1.0).contains(&item.guessing) {
            return invalid(format!("guessing {} outside [0, 1)", item.guessing));
        }
    } else {
        if item.difficulty.is_empty() {
            return invalid(format!("{model} items need at least one category boundary"));
        }
        if model == Model::Grm && item.difficulty.windows(2).any(|w| w[0] >= w[1]) {
            return invalid("grm boundaries must be strictly increasing".to_string());
        }
    }
    Ok(())
}
