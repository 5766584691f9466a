//! Preflop card ids.
//!
//! On the preflop street the 13-bit card field holds one of 169 canonical
//! starting hands laid out as `row * 13 + col`, rank index 0 = deuce:
//!   - Diagonal (row == col): pairs
//!   - row > col: suited, row is the higher rank
//!   - row < col: offsuit, col is the higher rank
//!
//! Later streets carry equity bucket ids instead, which are opaque here.

use once_cell::sync::Lazy;

use crate::error::{InfosetError, InfosetResult};

pub const NUM_RANKS: usize = 13;
pub const NUM_HANDS: usize = NUM_RANKS * NUM_RANKS;

/// Ranks in ascending order; a rank's index is its position here.
pub const RANKS: [char; NUM_RANKS] = ['2', '3', '4', '5', '6', '7', '8', '9', 'T', 'J', 'Q', 'K', 'A'];

static HAND_NAMES: Lazy<Vec<String>> = Lazy::new(|| (0..NUM_HANDS).map(name_for).collect());

fn name_for(card_id: usize) -> String {
    let row = card_id / NUM_RANKS;
    let col = card_id % NUM_RANKS;
    if row == col {
        format!("{}{}", RANKS[row], RANKS[col])
    } else if row > col {
        format!("{}{}s", RANKS[row], RANKS[col])
    } else {
        format!("{}{}o", RANKS[col], RANKS[row])
    }
}

/// Canonical notation ("AKs", "72o", "TT") for a preflop card id.
pub fn card_id_to_hand(card_id: u16) -> Option<&'static str> {
    HAND_NAMES.get(card_id as usize).map(String::as_str)
}

/// Card id for a canonical hand notation; rank order in the input is free.
pub fn hand_to_card_id(notation: &str) -> InfosetResult<u16> {
    let invalid = || InfosetError::InvalidHandNotation(notation.to_string());

    let chars: Vec<char> = notation.trim().chars().collect();
    if chars.len() < 2 || chars.len() > 3 {
        return Err(invalid());
    }

    let r1 = rank_index(chars[0]).ok_or_else(invalid)?;
    let r2 = rank_index(chars[1]).ok_or_else(invalid)?;
    let (high, low) = (r1.max(r2), r1.min(r2));

    let (row, col) = match (chars.get(2).map(|c| c.to_ascii_lowercase()), high == low) {
        (None, true) => (high, high),
        (Some('s'), false) => (high, low),
        (Some('o'), false) => (low, high),
        _ => return Err(invalid()),
    };

    Ok((row * NUM_RANKS + col) as u16)
}

/// Card id for the cell at (`row`, `col`) of a rank grid drawn with aces
/// first, suited hands above the diagonal.
pub fn grid_card_id(row: usize, col: usize) -> u16 {
    let row_rank = NUM_RANKS - 1 - row;
    let col_rank = NUM_RANKS - 1 - col;
    (row_rank * NUM_RANKS + col_rank) as u16
}

fn rank_index(c: char) -> Option<usize> {
    let c = c.to_ascii_uppercase();
    RANKS.iter().position(|&r| r == c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_index_case_insensitive() {
        assert_eq!(rank_index('a'), Some(12));
        assert_eq!(rank_index('t'), Some(8));
        assert_eq!(rank_index('1'), None);
    }

    #[test]
    fn test_all_names_unique() {
        let mut names: Vec<&String> = HAND_NAMES.iter().collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), NUM_HANDS);
    }
}
