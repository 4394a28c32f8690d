// The receiving side of a round: fold every share a party holds into one
// (y sum, count) per x.

use std::collections::BTreeMap;

use num::bigint::BigUint;
use num::traits::Zero;

use crate::data::{AggregatePoint, LocalAggregate, PartyId, Share};
use crate::math::Field;

// Sum the shares held by `party` (its retained share plus everything it
// received) by x coordinate.  Points come back ordered by x.
pub fn sum_shares(party: PartyId, shares: &[Share], field: &Field) -> LocalAggregate {
    let mut result: BTreeMap<u32, (BigUint, u32)> = BTreeMap::new();

    for sh in shares.iter() {
        let entry = result.entry(sh.x).or_insert((BigUint::zero(), 0));
        entry.0 = field.add(&entry.0, &sh.y);
        entry.1 += 1;
    }

    LocalAggregate {
        party,
        points: result
            .into_iter()
            .map(|(x, (y, count))| AggregatePoint::new(x, y, count))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(x: u32, y: u64) -> Share {
        Share::new(x, BigUint::from(y))
    }

    #[test]
    fn groups_by_x() {
        let field = Field::from_u64(101).unwrap();
        let held = vec![sh(3, 50), sh(1, 7), sh(3, 60), sh(2, 4), sh(3, 1)];
        let agg = sum_shares(PartyId(4), &held, &field);

        assert_eq!(agg.party, PartyId(4));
        assert_eq!(
            agg.points,
            vec![
                AggregatePoint::new(1, BigUint::from(7u32), 1),
                AggregatePoint::new(2, BigUint::from(4u32), 1),
                AggregatePoint::new(3, BigUint::from(10u32), 3),
            ]
        );
        assert_eq!(agg.contributions(), 5);
    }

    #[test]
    fn nothing_held() {
        let agg = sum_shares(PartyId(0), &[], &Field::mersenne127());
        assert!(agg.points.is_empty());
        assert_eq!(agg.contributions(), 0);
    }
}
