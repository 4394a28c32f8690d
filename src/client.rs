// The sending side of a round.  Each party splits its balance into S shares,
// keeps one at random for itself, and hands each of the other S-1 shares to
// a distinct peer chosen at random from everyone else.

use num::bigint::BigUint;
use rand::seq::index;
use rand::{CryptoRng, Rng, RngCore};
use tracing::debug;

use crate::data::{Delivery, PartyId, Share};
use crate::error::{Error, Result};
use crate::shamir::Params;

#[derive(Clone, Debug)]
pub struct Party {
    id: PartyId,
    secret: BigUint,
}

// What one party produced in a round.
#[derive(Clone, Debug)]
pub struct Outbox {
    pub origin: PartyId,
    // All S shares in x order, kept for export and debugging only.
    pub shares: Vec<Share>,
    pub retained: Share,
    pub sent: Vec<(PartyId, Share)>,
}

impl Outbox {
    // Every share this party placed, its own retained share included.
    pub fn deliveries(&self) -> impl Iterator<Item = Delivery> + '_ {
        std::iter::once((self.origin, &self.retained))
            .chain(self.sent.iter().map(|(peer, share)| (*peer, share)))
            .map(move |(recipient, share)| Delivery {
                origin: self.origin,
                recipient,
                share: share.clone(),
            })
    }
}

// Uniform sample, without replacement, of `count` parties out of 0..parties,
// never including `me`.
fn sample_peers<R: RngCore + ?Sized>(
    me: PartyId,
    parties: u32,
    count: u32,
    rng: &mut R,
) -> Vec<PartyId> {
    index::sample(rng, (parties - 1) as usize, count as usize)
        .into_iter()
        .map(|i| {
            let i = i as u32;
            if i >= me.0 {
                PartyId(i + 1)
            } else {
                PartyId(i)
            }
        })
        .collect()
}

impl Party {
    pub fn new(id: PartyId, secret: BigUint) -> Self {
        Party { id, secret }
    }

    pub fn id(&self) -> PartyId {
        self.id
    }

    // Run steps 1-4 of a round for this party.  `parties` is the total
    // number of parties, whose ids are 0..parties.
    pub fn distribute<R: RngCore + CryptoRng + ?Sized>(
        &self,
        params: &Params,
        parties: u32,
        rng: &mut R,
    ) -> Result<Outbox> {
        let s = params.shares();
        if parties < s {
            return Err(Error::InsufficientParties { parties, shares: s });
        }
        if self.id.0 >= parties {
            return Err(Error::Config(format!(
                "party {} is outside 0..{}",
                self.id, parties
            )));
        }

        let shares = params.share_secret(&self.secret, rng)?;

        let mut remaining = shares.clone();
        let retained = remaining.remove(rng.gen_range(0..remaining.len()));

        let peers = sample_peers(self.id, parties, s - 1, rng);
        debug!(party = %self.id, ?peers, "distributing shares");
        debug_assert_eq!(peers.len(), remaining.len());

        Ok(Outbox {
            origin: self.id,
            shares,
            retained,
            sent: peers.into_iter().zip(remaining).collect(),
        })
    }
}
