//! Numeric u64 infoset keys, as written by the CFR bot into its snapshots.
//!
//! ## Bit Layout
//!
//! ```text
//! Bit  0:      player     (1 bit)
//! Bits 2-1:    street     (2 bits)
//! Bits 15-3:   card id    (13 bits), preflop hand id or equity bucket
//! Bits 16+:    history    (3 bits per action, oldest action lowest)
//! ```
//!
//! The history has no length field. It ends at its highest non-zero group,
//! which is why action code 0 is never written.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::action::{ActionCode, ACTION_BITS, ACTION_MASK, PASSIVE_MAX};
use crate::error::{InfosetError, InfosetResult};

pub const PLAYER_BITS: u32 = 1;
pub const STREET_BITS: u32 = 2;
pub const CARD_BITS: u32 = 13;

pub const STREET_SHIFT: u32 = PLAYER_BITS;
pub const CARD_SHIFT: u32 = PLAYER_BITS + STREET_BITS;
pub const HEADER_BITS: u32 = PLAYER_BITS + STREET_BITS + CARD_BITS;

const PLAYER_MASK: u64 = (1 << PLAYER_BITS) - 1;
const STREET_MASK: u64 = (1 << STREET_BITS) - 1;
const CARD_MASK: u64 = (1 << CARD_BITS) - 1;

pub const MAX_PLAYER: u8 = PLAYER_MASK as u8;
pub const MAX_CARD_ID: u16 = CARD_MASK as u16;
/// Deepest history that fits in a u64 key.
pub const MAX_HISTORY_DEPTH: usize = ((u64::BITS - HEADER_BITS) / ACTION_BITS) as usize;

// ---------------------------------------------------------------------------
// Street
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Street {
    Preflop = 0,
    Flop = 1,
    Turn = 2,
    River = 3,
}

impl Street {
    pub const ALL: [Street; 4] = [Street::Preflop, Street::Flop, Street::Turn, Street::River];

    pub fn from_index(index: u8) -> Option<Street> {
        Self::ALL.get(index as usize).copied()
    }

    pub const fn index(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Street::Preflop => "preflop",
            Street::Flop => "flop",
            Street::Turn => "turn",
            Street::River => "river",
        }
    }
}

impl fmt::Display for Street {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Street {
    type Err = InfosetError;

    fn from_str(s: &str) -> InfosetResult<Street> {
        let token = s.trim().to_lowercase();
        if let Ok(index) = token.parse::<u8>() {
            return Street::from_index(index).ok_or(InfosetError::InvalidStreet(token));
        }
        Street::ALL
            .iter()
            .copied()
            .find(|street| street.as_str() == token)
            .ok_or(InfosetError::InvalidStreet(token))
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// The fixed-width low 16 bits of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Header {
    pub player: u8,
    pub street: Street,
    pub card_id: u16,
}

impl Header {
    pub fn new(player: u8, street: Street, card_id: u16) -> Self {
        Header {
            player,
            street,
            card_id,
        }
    }

    fn validate(&self) -> InfosetResult<()> {
        if self.player > MAX_PLAYER {
            return Err(InfosetError::FieldOutOfRange {
                field: "player",
                value: u64::from(self.player),
                max: u64::from(MAX_PLAYER),
            });
        }
        if self.card_id > MAX_CARD_ID {
            return Err(InfosetError::FieldOutOfRange {
                field: "card_id",
                value: u64::from(self.card_id),
                max: u64::from(MAX_CARD_ID),
            });
        }
        Ok(())
    }

    fn to_bits(self) -> u64 {
        u64::from(self.player)
            | (u64::from(self.street.index()) << STREET_SHIFT)
            | (u64::from(self.card_id) << CARD_SHIFT)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{} {} card {}", self.player, self.street, self.card_id)
    }
}

/// Split the low 16 bits of `key` into their fields.
pub fn decode_header(key: u64) -> Header {
    InfosetKey::from_raw(key).header()
}

/// Pack a header into a key with an empty history.
pub fn encode_header(player: u8, street: Street, card_id: u16) -> InfosetResult<u64> {
    InfosetKey::from_header(Header::new(player, street, card_id)).map(InfosetKey::as_u64)
}

/// Whether the decision at `key` answers a bet (see [`InfosetKey::is_facing_bet`]).
pub fn is_facing_bet(key: u64) -> bool {
    InfosetKey::from_raw(key).is_facing_bet()
}

// ---------------------------------------------------------------------------
// InfosetKey
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InfosetKey(u64);

impl InfosetKey {
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        InfosetKey(raw)
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub fn from_header(header: Header) -> InfosetResult<Self> {
        header.validate()?;
        Ok(InfosetKey(header.to_bits()))
    }

    /// Build a key from a header and a chronological action sequence.
    pub fn encode(header: Header, actions: &[ActionCode]) -> InfosetResult<Self> {
        let mut builder = KeyBuilder::new(header)?;
        for &code in actions {
            builder.push(code)?;
        }
        Ok(builder.build())
    }

    pub fn header(self) -> Header {
        Header {
            player: self.player(),
            street: self.street(),
            card_id: self.card_id(),
        }
    }

    pub const fn player(self) -> u8 {
        (self.0 & PLAYER_MASK) as u8
    }

    pub fn street(self) -> Street {
        // Two bits always land on a valid street.
        match (self.0 >> STREET_SHIFT) & STREET_MASK {
            0 => Street::Preflop,
            1 => Street::Flop,
            2 => Street::Turn,
            _ => Street::River,
        }
    }

    pub const fn card_id(self) -> u16 {
        ((self.0 >> CARD_SHIFT) & CARD_MASK) as u16
    }

    /// Replace the card id of a key built from player, street and history.
    pub fn with_card_id(self, card_id: u16) -> InfosetResult<Self> {
        let header = Header::new(self.player(), self.street(), card_id);
        header.validate()?;
        Ok(InfosetKey((self.0 & !(CARD_MASK << CARD_SHIFT)) | header.to_bits()))
    }

    /// Append one action above the existing history.
    pub fn push_action(self, code: ActionCode) -> InfosetResult<Self> {
        let mut builder = KeyBuilder {
            key: self.0,
            shift: HEADER_BITS + self.depth() as u32 * ACTION_BITS,
        };
        builder.push(code)?;
        Ok(builder.build())
    }

    /// History bits with the header stripped.
    #[inline]
    pub const fn history_bits(self) -> u64 {
        self.0 >> HEADER_BITS
    }

    /// No action has been taken yet in this betting round.
    pub const fn is_round_start(self) -> bool {
        self.history_bits() == 0
    }

    /// Whether fold is a legal candidate here.
    ///
    /// Round start counts as facing a bet (the small blind may fold to the big
    /// blind). Otherwise only the most recent action matters: codes above 2
    /// are sized bets or raises.
    pub fn is_facing_bet(self) -> bool {
        let mut rest = self.history_bits();
        if rest == 0 {
            return true;
        }

        let mut last_action = 0;
        while rest != 0 {
            last_action = rest & ACTION_MASK;
            rest >>= ACTION_BITS;
        }

        last_action > PASSIVE_MAX
    }

    /// Most recent action, or `None` at round start.
    pub fn last_action(self) -> Option<ActionCode> {
        self.history().last()
    }

    /// Actions in the order they were taken.
    pub fn history(self) -> History {
        History {
            rest: self.history_bits(),
        }
    }

    /// Number of 3-bit groups up to and including the highest non-zero one.
    pub fn depth(self) -> usize {
        let used = u64::BITS - self.history_bits().leading_zeros();
        used.div_ceil(ACTION_BITS) as usize
    }
}

impl fmt::Display for InfosetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InfosetKey {
    type Err = InfosetError;

    fn from_str(s: &str) -> InfosetResult<InfosetKey> {
        s.trim()
            .parse::<u64>()
            .map(InfosetKey)
            .map_err(|e| InfosetError::InvalidKey(format!("'{}': {}", s.trim(), e)))
    }
}

impl From<u64> for InfosetKey {
    fn from(raw: u64) -> Self {
        InfosetKey(raw)
    }
}

/// Chronological iterator over the history groups of a key.
#[derive(Debug, Clone)]
pub struct History {
    rest: u64,
}

impl Iterator for History {
    type Item = ActionCode;

    fn next(&mut self) -> Option<ActionCode> {
        if self.rest == 0 {
            return None;
        }
        let code = ActionCode::from_bits(self.rest);
        self.rest >>= ACTION_BITS;
        Some(code)
    }
}

// ---------------------------------------------------------------------------
// KeyBuilder
// ---------------------------------------------------------------------------

/// Incremental key construction, tracking the next free history group.
#[derive(Debug, Clone, Copy)]
pub struct KeyBuilder {
    key: u64,
    shift: u32,
}

impl KeyBuilder {
    pub fn new(header: Header) -> InfosetResult<Self> {
        let key = InfosetKey::from_header(header)?;
        Ok(KeyBuilder {
            key: key.as_u64(),
            shift: HEADER_BITS,
        })
    }

    pub fn push(&mut self, code: ActionCode) -> InfosetResult<&mut Self> {
        if self.shift + ACTION_BITS > u64::BITS {
            return Err(InfosetError::HistoryOverflow {
                depth: self.depth() + 1,
            });
        }
        self.key |= code.as_bits() << self.shift;
        self.shift += ACTION_BITS;
        Ok(self)
    }

    pub fn depth(&self) -> usize {
        ((self.shift - HEADER_BITS) / ACTION_BITS) as usize
    }

    pub fn build(&self) -> InfosetKey {
        InfosetKey(self.key)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_width() {
        assert_eq!(HEADER_BITS, 16);
        assert_eq!(MAX_CARD_ID, 8191);
        assert_eq!(MAX_HISTORY_DEPTH, 16);
    }

    #[test]
    fn test_street_bits_cover_all() {
        for street in Street::ALL {
            let key = InfosetKey::from_raw(u64::from(street.index()) << STREET_SHIFT);
            assert_eq!(key.street(), street);
        }
    }

    #[test]
    fn test_depth_counts_partial_group() {
        // A single group holding code 1 uses one bit of it.
        let key = InfosetKey::from_raw(1 << HEADER_BITS);
        assert_eq!(key.depth(), 1);
        let key = InfosetKey::from_raw((1 << HEADER_BITS) | (3 << (HEADER_BITS + 3)));
        assert_eq!(key.depth(), 2);
        assert_eq!(InfosetKey::from_raw(5).depth(), 0);
    }

    #[test]
    fn test_builder_overflow() {
        let mut builder = KeyBuilder::new(Header::new(0, Street::River, 1)).unwrap();
        for _ in 0..MAX_HISTORY_DEPTH {
            builder.push(ActionCode::CHECK_CALL).unwrap();
        }
        assert!(matches!(
            builder.push(ActionCode::CHECK_CALL),
            Err(InfosetError::HistoryOverflow { depth: 17 })
        ));
    }
}
