// Error types shared by the whole crate.

use crate::data::PartyId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Needs 2 <= threshold <= shares.
    #[error("Invalid threshold: {threshold} shares needed out of {shares} generated")]
    InvalidThreshold { threshold: u32, shares: u32 },

    #[error("Too many shares: {0} exceeds the maximum of {1}")]
    TooManyShares(u32, u32),

    // Peer sampling without replacement needs at least `shares` parties.
    #[error("Not enough parties: {parties} parties cannot hold {shares} shares each")]
    InsufficientParties { parties: u32, shares: u32 },

    #[error("Too few shares provided: {provided} is below limit {required}")]
    InsufficientShares { provided: usize, required: usize },

    #[error("Duplicate x coordinate {0} in reconstruction set")]
    DuplicatePoint(u32),

    // Inverse of zero (or of a value sharing a factor with the modulus).
    #[error("Division by zero in the prime field")]
    DivisionByZero,

    #[error("Invalid modulus: {0}")]
    InvalidModulus(String),

    #[error("Value is not a reduced field element")]
    ValueOutOfRange,

    // Only `covered` reconstruction points carry contributions from every party.
    #[error("Only {covered} points are fully aggregated, {required} needed")]
    IncompleteCoverage { covered: usize, required: usize },

    #[error("Aggregator unavailable: {0}")]
    AggregatorUnavailable(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Encoding error: {0}")]
    Encoding(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

// Rejections produced by a ledger when an upload or setup call breaks its rules.
// All of them are checked before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Ledger description data is not complete")]
    DescriptionIncomplete,

    #[error("Ledger description has already been set")]
    DescriptionLocked,

    #[error("Party {0} is not registered with the ledger")]
    NotRegistered(PartyId),

    #[error("Party {0} has already uploaded shares")]
    AlreadyUploaded(PartyId),

    #[error("Share x point {x} is outside 1..={shares}")]
    PointOutOfRange { x: u32, shares: u32 },

    #[error("Contribution count at x point {x} would overflow")]
    CountOverflow { x: u32 },
}
