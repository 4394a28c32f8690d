// Reveal the sum of many private balances, and nothing else.
//
// Each party Shamir-shares its balance at x = 1..S, keeps one share and
// scatters the rest to randomly chosen peers.  Every party sums what it
// holds by x and uploads those sums to a shared ledger, which merges them.
// Because sharing is additively homomorphic, the ledger ends up holding
// shares of the total, and any M of them reconstruct it.

mod error;
mod math;
pub use error::{Error, LedgerError, Result};
pub use math::Field;

pub mod data;
pub mod shamir;

pub mod client;
pub mod server;

pub mod encode;
pub mod ledger;
pub mod protocol;

pub mod config;
pub mod export;
pub mod simulate;
