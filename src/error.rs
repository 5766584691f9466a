use thiserror::Error;

#[derive(Error, Debug)]
pub enum InfosetError {
    #[error("Invalid infoset key: {0}")]
    InvalidKey(String),

    #[error("{field} value {value} does not fit in the key (max {max})")]
    FieldOutOfRange {
        field: &'static str,
        value: u64,
        max: u64,
    },

    #[error("Invalid action code {0} (expected 1-7)")]
    InvalidActionCode(u8),

    #[error("Action history too deep: {depth} actions overflow a 64-bit key")]
    HistoryOverflow { depth: usize },

    #[error("Invalid street: {0}")]
    InvalidStreet(String),

    #[error("Invalid hand notation: {0}")]
    InvalidHandNotation(String),

    #[error("Action index {index} is not valid {context}")]
    InvalidActionIndex { index: usize, context: &'static str },

    #[error("Strategy has no actions")]
    EmptyStrategy,

    #[error("Got {regrets} regrets but {probabilities} probabilities")]
    LengthMismatch { regrets: usize, probabilities: usize },

    #[error("Key {key} is facing a bet but its strategy has only {actions} action(s); fold needs index 1")]
    MissingFoldAction { key: u64, actions: usize },

    #[error("Threshold {name} = {value} is invalid")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("Malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("Need at least {need} snapshots, got {got}")]
    NotEnoughSnapshots { need: usize, got: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type InfosetResult<T> = Result<T, InfosetError>;
