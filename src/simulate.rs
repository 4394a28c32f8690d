// Balances for a demonstration round.

use std::ops::Range;

use rand::seq::index;
use rand::RngCore;

use crate::error::{Error, Result};

// `parties` distinct balances drawn uniformly from `range`.
pub fn random_balances<R: RngCore + ?Sized>(
    parties: u32,
    range: Range<u64>,
    rng: &mut R,
) -> Result<Vec<u64>> {
    let span = range.end.saturating_sub(range.start);
    if span < parties as u64 {
        return Err(Error::Config(format!(
            "cannot draw {} distinct balances from {:?}",
            parties, range
        )));
    }
    let span = usize::try_from(span).map_err(|_| Error::Config("balance range too wide".into()))?;
    Ok(index::sample(rng, span, parties as usize)
        .into_iter()
        .map(|i| range.start + i as u64)
        .collect())
}
