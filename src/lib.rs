//! Infoset key codec and strategy purification for a heads-up CFR poker bot.
//!
//! Keys pack player, street, card id and betting history into a `u64`.
//! [`purify::Purifier`] turns a trained mixed strategy into one action, and
//! [`analysis`] applies it across whole snapshot files.

pub mod action;
pub mod analysis;
pub mod cli;
pub mod display;
pub mod error;
pub mod hands;
pub mod key;
pub mod purify;
pub mod snapshot;

pub use action::{Action, ActionCode};
pub use error::{InfosetError, InfosetResult};
pub use key::{decode_header, encode_header, is_facing_bet, Header, InfosetKey, KeyBuilder, Street};
pub use purify::{purify, Purifier};
pub use snapshot::{Snapshot, StrategyEntry};
