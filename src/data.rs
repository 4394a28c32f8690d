use num::bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartyId(pub u32);

impl Display for PartyId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

// One point (x, poly(x) mod p) of a shared polynomial.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Share {
    pub x: u32,
    pub y: BigUint,
}

impl Share {
    pub fn new(x: u32, y: BigUint) -> Self {
        Share { x, y }
    }
}

// A share addressed from one party to another.  A party's retained share is a
// delivery to itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub origin: PartyId,
    pub recipient: PartyId,
    pub share: Share,
}

// The summed y values of `count` shares which all sit at the same x.
//
// This is both the entry type of a local aggregate and what the ledger keeps
// per x once uploads have been merged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregatePoint {
    pub x: u32,
    pub y: BigUint,
    pub count: u32,
}

impl AggregatePoint {
    pub fn new(x: u32, y: BigUint, count: u32) -> Self {
        AggregatePoint { x, y, count }
    }

    pub fn empty(x: u32) -> Self {
        AggregatePoint { x, y: BigUint::default(), count: 0 }
    }

    pub fn as_share(&self) -> Share {
        Share::new(self.x, self.y.clone())
    }
}

// Everything one receiving party uploads: its per-x sums, ordered by x.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalAggregate {
    pub party: PartyId,
    pub points: Vec<AggregatePoint>,
}

impl LocalAggregate {
    // Number of shares folded into this aggregate.
    pub fn contributions(&self) -> u32 {
        self.points.iter().map(|p| p.count).sum()
    }
}
