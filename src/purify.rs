//! Strategy purification: collapse a mixed strategy into one action.
//!
//! The decision runs in three stages:
//!   1. A direct fold override when fold's probability clears `fold_threshold`.
//!   2. A meta-vote between passive, fold (when legal) and the summed
//!      aggressive actions, resolving the aggressive slot to its single most
//!      likely sizing.
//!   3. For nodes visited fewer than `visit_count_threshold` times, a switch
//!      to fold when fold's cumulative regret beats the chosen action's.
//!
//! Ties always resolve toward the lowest index.

use serde::{Deserialize, Serialize};

use crate::action::{Action, FOLD_INDEX, PASSIVE_INDEX};
use crate::error::{InfosetError, InfosetResult};
use crate::key::InfosetKey;

pub const DEFAULT_FOLD_THRESHOLD: f64 = 0.5;
pub const DEFAULT_VISIT_COUNT_THRESHOLD: u64 = 100;

/// Purification thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Purifier {
    /// Fold outright when fold's probability exceeds this. At 0.5 the
    /// override never changes the meta-vote's result; lower values play
    /// tighter.
    pub fold_threshold: f64,

    /// Below this many visits the average strategy is treated as noisy and
    /// regrets get a say.
    pub visit_count_threshold: u64,
}

impl Default for Purifier {
    fn default() -> Self {
        Purifier {
            fold_threshold: DEFAULT_FOLD_THRESHOLD,
            visit_count_threshold: DEFAULT_VISIT_COUNT_THRESHOLD,
        }
    }
}

impl Purifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fold_threshold(mut self, fold_threshold: f64) -> Self {
        self.fold_threshold = fold_threshold;
        self
    }

    pub fn with_visit_count_threshold(mut self, visit_count_threshold: u64) -> Self {
        self.visit_count_threshold = visit_count_threshold;
        self
    }

    pub fn validate(&self) -> InfosetResult<()> {
        if !(0.0..=1.0).contains(&self.fold_threshold) {
            return Err(InfosetError::InvalidThreshold {
                name: "fold_threshold",
                value: self.fold_threshold,
            });
        }
        Ok(())
    }

    /// Pick a single action index for the strategy at `key`.
    ///
    /// `t` is the node's visit count; `regrets` and `probabilities` are
    /// indexed by action (0 = check/call, 1 = fold when facing a bet, then
    /// bet/raise sizes smallest first).
    pub fn purify(
        &self,
        t: u64,
        regrets: &[f64],
        probabilities: &[f64],
        key: InfosetKey,
    ) -> InfosetResult<usize> {
        let facing_bet = key.is_facing_bet();
        check_strategy(regrets, probabilities, key, facing_bet)?;

        if facing_bet && probabilities[FOLD_INDEX] > self.fold_threshold {
            return Ok(FOLD_INDEX);
        }

        let start = Action::first_raise_index(facing_bet);
        let mut bet_probability = 0.0;
        let mut max_bet_probability = 0.0;
        let mut max_bet_index = 0;
        for (i, &p) in probabilities.iter().enumerate().skip(start) {
            bet_probability += p;
            if p > max_bet_probability {
                max_bet_probability = p;
                max_bet_index = i;
            }
        }

        let mut meta_probabilities = vec![probabilities[PASSIVE_INDEX]];
        if facing_bet {
            meta_probabilities.push(probabilities[FOLD_INDEX]);
        }
        meta_probabilities.push(bet_probability);

        let pure_action = argmax(&meta_probabilities);
        let action = if pure_action == meta_probabilities.len() - 1 {
            max_bet_index
        } else {
            pure_action
        };

        if t < self.visit_count_threshold && facing_bet && regrets[FOLD_INDEX] > regrets[action] {
            return Ok(FOLD_INDEX);
        }

        Ok(action)
    }

    /// [`Purifier::purify`], returning the typed action.
    pub fn purify_action(
        &self,
        t: u64,
        regrets: &[f64],
        probabilities: &[f64],
        key: InfosetKey,
    ) -> InfosetResult<Action> {
        let index = self.purify(t, regrets, probabilities, key)?;
        Ok(Action::from_index(index, key.is_facing_bet()))
    }
}

/// Purify with the default thresholds (fold 0.5, 100 visits).
pub fn purify(t: u64, regrets: &[f64], probabilities: &[f64], key: InfosetKey) -> InfosetResult<usize> {
    Purifier::default().purify(t, regrets, probabilities, key)
}

fn check_strategy(
    regrets: &[f64],
    probabilities: &[f64],
    key: InfosetKey,
    facing_bet: bool,
) -> InfosetResult<()> {
    if regrets.len() != probabilities.len() {
        return Err(InfosetError::LengthMismatch {
            regrets: regrets.len(),
            probabilities: probabilities.len(),
        });
    }
    if probabilities.is_empty() {
        return Err(InfosetError::EmptyStrategy);
    }
    if facing_bet && probabilities.len() <= FOLD_INDEX {
        return Err(InfosetError::MissingFoldAction {
            key: key.as_u64(),
            actions: probabilities.len(),
        });
    }
    Ok(())
}

/// Index of the first maximum.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_first_on_tie() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.1, 0.45, 0.45]), 1);
        assert_eq!(argmax(&[0.0, 0.0, 0.0]), 0);
    }

    #[test]
    fn test_validate_thresholds() {
        assert!(Purifier::default().validate().is_ok());
        assert!(Purifier::new().with_fold_threshold(1.5).validate().is_err());
        assert!(Purifier::new().with_fold_threshold(f64::NAN).validate().is_err());
    }
}
