//! Action taxonomy shared by the key codec and the purifier.
//!
//! Two numbering schemes meet here. Keys carry 3-bit *action codes* in their
//! history groups (what was played), while strategy vectors are indexed by
//! *action index* (what may be played next). [`ActionCode`] models the first,
//! [`Action`] the second.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{InfosetError, InfosetResult};
use crate::key::InfosetKey;

// ---------------------------------------------------------------------------
// Key action codes
// ---------------------------------------------------------------------------

/// Width of one action group in a key's history.
pub const ACTION_BITS: u32 = 3;
pub const ACTION_MASK: u64 = (1 << ACTION_BITS) - 1;

/// Unused history slot. Never written by the solver.
pub const CODE_EMPTY: u8 = 0;
pub const CODE_FOLD: u8 = 1;
pub const CODE_CHECK_CALL: u8 = 2;
/// First sized bet/raise. Raises share codes with bets of the same tier.
pub const CODE_FIRST_SIZE: u8 = 3;
pub const MAX_CODE: u8 = ACTION_MASK as u8;

/// Codes at or below this value put no new money in the pot.
pub const PASSIVE_MAX: u64 = CODE_CHECK_CALL as u64;

/// A single action as recorded in an infoset key's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionCode(u8);

impl ActionCode {
    pub const FOLD: ActionCode = ActionCode(CODE_FOLD);
    pub const CHECK_CALL: ActionCode = ActionCode(CODE_CHECK_CALL);

    /// Validate a code that is about to be written into a key.
    ///
    /// Code 0 is refused: appended last, it leaves the key unchanged and
    /// could never be read back.
    pub fn new(code: u8) -> InfosetResult<Self> {
        if code == CODE_EMPTY || code > MAX_CODE {
            return Err(InfosetError::InvalidActionCode(code));
        }
        Ok(ActionCode(code))
    }

    /// Sized bet/raise for a 0-based tier.
    pub fn sized(tier: u8) -> InfosetResult<Self> {
        let code = tier
            .checked_add(CODE_FIRST_SIZE)
            .ok_or(InfosetError::InvalidActionCode(u8::MAX))?;
        Self::new(code)
    }

    /// Read the low group of `bits` as-is (decoding never fails).
    pub(crate) const fn from_bits(bits: u64) -> Self {
        ActionCode((bits & ACTION_MASK) as u8)
    }

    pub const fn as_u8(self) -> u8 {
        self.0
    }

    pub const fn as_bits(self) -> u64 {
        self.0 as u64
    }

    /// Bets and raises of any size.
    pub const fn is_aggressive(self) -> bool {
        self.0 as u64 > PASSIVE_MAX
    }

    /// 0-based sizing tier of an aggressive code.
    pub const fn tier(self) -> Option<u8> {
        if self.is_aggressive() {
            Some(self.0 - CODE_FIRST_SIZE)
        } else {
            None
        }
    }
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            CODE_EMPTY => write!(f, "-"),
            CODE_FOLD => write!(f, "fold"),
            CODE_CHECK_CALL => write!(f, "check/call"),
            code => write!(f, "size #{}", code - CODE_FIRST_SIZE + 1),
        }
    }
}

impl FromStr for ActionCode {
    type Err = InfosetError;

    /// Accepts a raw code (`"3"`), a passive name (`"fold"`, `"f"`, `"call"`,
    /// `"check"`, `"c"`, `"x"`) or a 1-based size (`"b1"`, `"r2"`).
    fn from_str(s: &str) -> InfosetResult<Self> {
        let token = s.trim().to_lowercase();
        match token.as_str() {
            "f" | "fold" => return Ok(ActionCode::FOLD),
            "c" | "x" | "call" | "check" => return Ok(ActionCode::CHECK_CALL),
            _ => {}
        }

        let invalid = || InfosetError::InvalidKey(format!("unknown action '{}'", s.trim()));

        if let Some(size) = token.strip_prefix('b').or_else(|| token.strip_prefix('r')) {
            let size: u8 = size.parse().map_err(|_| invalid())?;
            if size == 0 {
                return Err(invalid());
            }
            return ActionCode::sized(size - 1);
        }

        let code: u8 = token.parse().map_err(|_| invalid())?;
        ActionCode::new(code)
    }
}

/// Parse a comma- or space-separated list of action codes.
pub fn parse_codes(s: &str) -> InfosetResult<Vec<ActionCode>> {
    s.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(str::parse)
        .collect()
}

// ---------------------------------------------------------------------------
// Strategy action indices
// ---------------------------------------------------------------------------

/// Index of check (not facing a bet) or call (facing one).
pub const PASSIVE_INDEX: usize = 0;
/// Index of fold; only present when facing a bet.
pub const FOLD_INDEX: usize = 1;

/// An action available at a decision point, as indexed in a strategy vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Check,
    Call,
    Fold,
    /// Bet or raise; 0-based sizing tier, smallest first.
    Raise(usize),
}

impl Action {
    /// First strategy index holding an aggressive action.
    pub const fn first_raise_index(facing_bet: bool) -> usize {
        if facing_bet {
            FOLD_INDEX + 1
        } else {
            PASSIVE_INDEX + 1
        }
    }

    pub fn from_index(index: usize, facing_bet: bool) -> Action {
        match (index, facing_bet) {
            (PASSIVE_INDEX, false) => Action::Check,
            (PASSIVE_INDEX, true) => Action::Call,
            (FOLD_INDEX, true) => Action::Fold,
            (i, _) => Action::Raise(i - Self::first_raise_index(facing_bet)),
        }
    }

    pub fn to_index(self, facing_bet: bool) -> InfosetResult<usize> {
        match (self, facing_bet) {
            (Action::Check, false) | (Action::Call, true) => Ok(PASSIVE_INDEX),
            (Action::Fold, true) => Ok(FOLD_INDEX),
            (Action::Raise(tier), _) => Ok(Self::first_raise_index(facing_bet) + tier),
            (Action::Check, true) => Err(InfosetError::InvalidActionIndex {
                index: PASSIVE_INDEX,
                context: "for check when facing a bet",
            }),
            (Action::Call, false) => Err(InfosetError::InvalidActionIndex {
                index: PASSIVE_INDEX,
                context: "for call when not facing a bet",
            }),
            (Action::Fold, false) => Err(InfosetError::InvalidActionIndex {
                index: FOLD_INDEX,
                context: "for fold when not facing a bet",
            }),
        }
    }

    pub fn is_aggressive(self) -> bool {
        matches!(self, Action::Raise(_))
    }

    /// Human label; aggressive actions read as bets unless facing a bet.
    pub fn label(self, facing_bet: bool) -> String {
        match self {
            Action::Raise(tier) if facing_bet => format!("Raise size #{}", tier + 1),
            Action::Raise(tier) => format!("Bet size #{}", tier + 1),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Check => write!(f, "Check"),
            Action::Call => write!(f, "Call"),
            Action::Fold => write!(f, "Fold"),
            Action::Raise(tier) => write!(f, "Raise size #{}", tier + 1),
        }
    }
}

/// Labels for every index of a strategy vector of length `num_actions`.
pub fn action_labels(num_actions: usize, facing_bet: bool) -> Vec<String> {
    (0..num_actions)
        .map(|i| Action::from_index(i, facing_bet).label(facing_bet))
        .collect()
}

/// Pure action for a key with no trained strategy: fold when a fold is
/// available, otherwise check.
pub fn default_action(key: InfosetKey) -> usize {
    if key.is_facing_bet() {
        FOLD_INDEX
    } else {
        PASSIVE_INDEX
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_zero_rejected() {
        assert!(ActionCode::new(0).is_err());
        assert!(ActionCode::new(8).is_err());
        assert!(ActionCode::new(7).is_ok());
    }

    #[test]
    fn test_from_bits_masks_low_group() {
        assert_eq!(ActionCode::from_bits(0b1011).as_u8(), 0b011);
    }

    #[test]
    fn test_code_display() {
        assert_eq!(ActionCode::FOLD.to_string(), "fold");
        assert_eq!(ActionCode::CHECK_CALL.to_string(), "check/call");
        assert_eq!(ActionCode::new(4).unwrap().to_string(), "size #2");
    }

    #[test]
    fn test_parse_code_names() {
        assert_eq!("x".parse::<ActionCode>().unwrap(), ActionCode::CHECK_CALL);
        assert_eq!("FOLD".parse::<ActionCode>().unwrap(), ActionCode::FOLD);
        assert_eq!("b1".parse::<ActionCode>().unwrap().as_u8(), 3);
        assert_eq!("r2".parse::<ActionCode>().unwrap().as_u8(), 4);
        assert!("b0".parse::<ActionCode>().is_err());
        assert!("zz".parse::<ActionCode>().is_err());
    }

    #[test]
    fn test_sized_overflow() {
        assert!(ActionCode::sized(u8::MAX).is_err());
        assert!(ActionCode::sized(5).is_err());
        assert_eq!(ActionCode::sized(4).unwrap().as_u8(), 7);
    }
}
