use rand::distr::Alphanumeric;
use rand::Rng;

use super::models::Decision;

/// Result category for a pair of decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeCategory {
    /// Both shared; both sides receive a prize code.
    MutualShare,
    /// One side shared, the other stole; only the stealer is rewarded,
    /// with a double-value code.
    Exploited,
    /// Both stole; nobody is rewarded.
    MutualSteal,
}

/// Outcome of a finalized match. Prize codes follow the participants'
/// side labels: `prize_a` for side A, `prize_b` for side B.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub category: OutcomeCategory,
    pub prize_a: Option<String>,
    pub prize_b: Option<String>,
}

const PRIZE_CODE_LEN: usize = 8;

/// Maps a pair of decisions to the round result.
///
/// Category and prize presence are pure functions of the decisions; prize
/// values are freshly generated random codes.
pub fn resolve(decision_a: Decision, decision_b: Decision) -> Outcome {
    match (decision_a, decision_b) {
        (Decision::Share, Decision::Share) => Outcome {
            category: OutcomeCategory::MutualShare,
            prize_a: Some(prize_code()),
            prize_b: Some(prize_code()),
        },
        (Decision::Share, Decision::Steal) => Outcome {
            category: OutcomeCategory::Exploited,
            prize_a: None,
            prize_b: Some(double_prize_code()),
        },
        (Decision::Steal, Decision::Share) => Outcome {
            category: OutcomeCategory::Exploited,
            prize_a: Some(double_prize_code()),
            prize_b: None,
        },
        (Decision::Steal, Decision::Steal) => Outcome {
            category: OutcomeCategory::MutualSteal,
            prize_a: None,
            prize_b: None,
        },
    }
}

/// Short random alphanumeric code. Uniqueness is best-effort; the code is
/// a display artifact, not a security credential.
fn prize_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(PRIZE_CODE_LEN)
        .map(char::from)
        .collect()
}

/// The stealer's reward when the opponent shared pays out double; the code
/// form itself carries the marker so redemption can tell the two apart.
fn double_prize_code() -> String {
    format!("DBL-{}", prize_code())
}
