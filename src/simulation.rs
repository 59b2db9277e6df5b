//! Draw answers from the response model at a known theta.

use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::error::Result;
use crate::question_set::QuestionSet;

/// Samples one answer to `item` at `theta`: `0`/`1` for binary models,
/// `1..=K` for polytomous ones.
pub fn simulate_response<R: Rng>(
    questions: &QuestionSet,
    item: usize,
    theta: f64,
    rng: &mut R,
) -> Result<usize> {
    let params = questions.item(item)?;
    let distribution = questions
        .model()
        .family()
        .answer_distribution(&params, theta)?;

    let u: f64 = rng.random();
    let mut cumsum = 0.0;
    let mut last = 0;
    for (answer, p) in distribution {
        cumsum += p;
        last = answer;
        if u < cumsum {
            return Ok(answer);
        }
    }
    Ok(last)
}

/// One simulated answer per item, reproducible from `seed`.
pub fn simulate_responses(questions: &QuestionSet, theta: f64, seed: u64) -> Result<Vec<usize>> {
    let mut rng = Pcg64::seed_from_u64(seed);
    (0..questions.n_items())
        .map(|item| simulate_response(questions, item, theta, &mut rng))
        .collect()
}
