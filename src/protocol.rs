// One aggregation round, end to end.
//
// A round runs in four phases:
//
// 1. every party splits its secret and picks peers (`distribute`),
// 2. all deliveries are routed into per-recipient inboxes (`gather`);
//    nothing downstream starts until every party has finished phase 1,
// 3. every party sums what it holds by x (`aggregate_locally`),
// 4. every party uploads its local aggregate exactly once (`upload_all`).
//
// Phases 1 and 3 run on the rayon pool.  Because each party sends exactly
// one share at every x, a completed round leaves a contribution count of
// `n` at every x, and any `m` of those points reconstruct the total.

use num::bigint::BigUint;
use num::traits::Zero;
use rand::seq::index;
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::client::{Outbox, Party};
use crate::data::{AggregatePoint, LocalAggregate, PartyId, Share};
use crate::error::{Error, Result};
use crate::ledger::Aggregator;
use crate::math::Field;
use crate::server::sum_shares;
use crate::shamir::{recover_secret, Params};

// What a round produced on the party side, kept for export.
#[derive(Clone, Debug)]
pub struct RoundOutput {
    pub outboxes: Vec<Outbox>,
    pub local: Vec<LocalAggregate>,
}

// Outcome of checking a finished round against the true total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundReport {
    pub expected_total: BigUint,
    // Recovered from every fully aggregated point.
    pub recovered_total: BigUint,
    // Recovered from a random threshold-sized subset of those points.
    pub recovered_from_threshold: BigUint,
}

impl RoundReport {
    pub fn matches(&self) -> bool {
        self.recovered_total == self.expected_total
            && self.recovered_from_threshold == self.expected_total
    }
}

fn party_count(secrets: &[BigUint]) -> Result<u32> {
    u32::try_from(secrets.len()).map_err(|_| Error::Config("too many parties".into()))
}

// Phase 1.  Party `i` owns `secrets[i]`.
//
// One ChaCha20 stream is seeded per party from `rng` before fanning out, so
// a seeded caller gets the same round whatever the thread scheduling.
pub fn distribute<R: RngCore + CryptoRng + ?Sized>(
    secrets: &[BigUint],
    params: &Params,
    rng: &mut R,
) -> Result<Vec<Outbox>> {
    let parties = party_count(secrets)?;
    if parties < params.shares() {
        return Err(Error::InsufficientParties {
            parties,
            shares: params.shares(),
        });
    }

    let seeds: Vec<<ChaCha20Rng as SeedableRng>::Seed> = secrets
        .iter()
        .map(|_| {
            let mut seed = <ChaCha20Rng as SeedableRng>::Seed::default();
            rng.fill_bytes(&mut seed);
            seed
        })
        .collect();

    info!(parties, shares = params.shares(), threshold = params.threshold(), "distributing shares");
    secrets
        .par_iter()
        .zip(seeds.into_par_iter())
        .enumerate()
        .map(|(i, (secret, seed))| {
            let mut party_rng = ChaCha20Rng::from_seed(seed);
            Party::new(PartyId(i as u32), secret.clone()).distribute(params, parties, &mut party_rng)
        })
        .collect()
}

// Phase 2.  Route every delivery into its recipient's inbox; `inboxes[j]`
// is everything party `j` physically holds.
pub fn gather(outboxes: &[Outbox]) -> Vec<Vec<Share>> {
    let mut inboxes = vec![Vec::new(); outboxes.len()];
    for delivery in outboxes.iter().flat_map(|o| o.deliveries()) {
        inboxes[delivery.recipient.0 as usize].push(delivery.share);
    }
    inboxes
}

// Phase 3.
pub fn aggregate_locally(inboxes: &[Vec<Share>], field: &Field) -> Vec<LocalAggregate> {
    inboxes
        .par_iter()
        .enumerate()
        .map(|(j, held)| sum_shares(PartyId(j as u32), held, field))
        .collect()
}

// Phase 4.  Uploads run concurrently; an aggregator that can't be reached
// fails the whole call and nothing is retried here.
pub fn upload_all<A: Aggregator + Sync + ?Sized>(
    aggregator: &A,
    local: &[LocalAggregate],
) -> Result<()> {
    info!(uploads = local.len(), "uploading local aggregates");
    local
        .par_iter()
        .try_for_each(|agg| aggregator.upload(agg.party, &agg.points).map(|_| ()))
}

// Run all four phases.
pub fn run_round<A, R>(
    secrets: &[BigUint],
    params: &Params,
    aggregator: &A,
    rng: &mut R,
) -> Result<RoundOutput>
where
    A: Aggregator + Sync + ?Sized,
    R: RngCore + CryptoRng + ?Sized,
{
    let outboxes = distribute(secrets, params, rng)?;
    let inboxes = gather(&outboxes);
    info!(receivers = inboxes.len(), "aggregating held shares");
    let local = aggregate_locally(&inboxes, params.field());
    upload_all(aggregator, &local)?;
    Ok(RoundOutput { outboxes, local })
}

// Read the global aggregate back at every x in 1..=S.
pub fn read_global<A: Aggregator + ?Sized>(
    aggregator: &A,
    params: &Params,
) -> Result<Vec<AggregatePoint>> {
    (1..=params.shares()).map(|x| aggregator.read(x)).collect()
}

// Points carrying a contribution from every one of `parties`.
fn complete_points(points: &[AggregatePoint], parties: u32, params: &Params) -> Result<Vec<Share>> {
    let complete: Vec<Share> = points
        .iter()
        .filter(|p| p.count == parties)
        .map(AggregatePoint::as_share)
        .collect();
    if complete.len() < points.len() {
        warn!(
            complete = complete.len(),
            read = points.len(),
            "some points are only partially aggregated"
        );
    }
    if complete.len() < params.threshold() as usize {
        return Err(Error::IncompleteCoverage {
            covered: complete.len(),
            required: params.threshold() as usize,
        });
    }
    Ok(complete)
}

// Recover the sum of all `parties` secrets from global aggregate points.
//
// Only points whose count equals `parties` are used; partially aggregated
// points encode a partial sum and are skipped.
pub fn recover_total(points: &[AggregatePoint], parties: u32, params: &Params) -> Result<BigUint> {
    let complete = complete_points(points, parties, params)?;
    recover_secret(&complete, params.field())
}

// Check a finished round: recover the total from every complete point and
// again from a random threshold-sized subset, and compare both with the
// true sum of `secrets`.
pub fn verify_round<A, R>(
    aggregator: &A,
    secrets: &[BigUint],
    params: &Params,
    rng: &mut R,
) -> Result<RoundReport>
where
    A: Aggregator + ?Sized,
    R: RngCore + ?Sized,
{
    let parties = party_count(secrets)?;
    let field = params.field();
    let expected_total = secrets
        .iter()
        .fold(BigUint::zero(), |acc, s| field.add(&acc, s));

    let global = read_global(aggregator, params)?;
    let complete = complete_points(&global, parties, params)?;
    let recovered_total = recover_secret(&complete, field)?;

    let subset: Vec<Share> = index::sample(rng, complete.len(), params.threshold() as usize)
        .into_iter()
        .map(|i| complete[i].clone())
        .collect();
    let recovered_from_threshold = recover_secret(&subset, field)?;

    let report = RoundReport {
        expected_total,
        recovered_total,
        recovered_from_threshold,
    };
    info!(matches = report.matches(), "round verified");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Description, InMemoryLedger};
    use rand::SeedableRng;

    fn secrets(vals: &[u64]) -> Vec<BigUint> {
        vals.iter().map(|&v| BigUint::from(v)).collect()
    }

    fn ledger_for(params: &Params, parties: u32) -> InMemoryLedger {
        let l = InMemoryLedger::new();
        l.set_description(Description {
            name: "test".into(),
            date: "today".into(),
            asserted_total: BigUint::zero(),
            prime: params.field().prime().clone(),
            shares: params.shares(),
            threshold: params.threshold(),
        })
        .unwrap();
        l.register_parties((0..parties).map(PartyId));
        l
    }

    #[test]
    fn gather_routes_every_share() {
        let mut rng = ChaCha20Rng::seed_from_u64(21);
        let params = Params::new(2, 3, Field::mersenne127()).unwrap();
        let outboxes = distribute(&secrets(&[1, 2, 3, 4]), &params, &mut rng).unwrap();
        let inboxes = gather(&outboxes);
        assert_eq!(inboxes.len(), 4);
        assert_eq!(inboxes.iter().map(Vec::len).sum::<usize>(), 12);
    }

    #[test]
    fn seeded_rounds_repeat() {
        let params = Params::new(3, 5, Field::mersenne127()).unwrap();
        let vals = secrets(&[10, 20, 30, 40, 50, 60]);
        let a = distribute(&vals, &params, &mut ChaCha20Rng::seed_from_u64(5)).unwrap();
        let b = distribute(&vals, &params, &mut ChaCha20Rng::seed_from_u64(5)).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.shares, y.shares);
            assert_eq!(x.sent, y.sent);
        }
    }

    #[test]
    fn every_x_fully_covered() {
        let mut rng = ChaCha20Rng::seed_from_u64(22);
        let params = Params::new(3, 5, Field::mersenne127()).unwrap();
        let vals = secrets(&[100, 200, 300, 400, 500, 600, 700]);
        let ledger = ledger_for(&params, 7);
        let out = run_round(&vals, &params, &ledger, &mut rng).unwrap();

        let total: u32 = out.local.iter().map(LocalAggregate::contributions).sum();
        assert_eq!(total, 7 * 5);
        for p in read_global(&ledger, &params).unwrap() {
            assert_eq!(p.count, 7);
        }
        let report = verify_round(&ledger, &vals, &params, &mut rng).unwrap();
        assert_eq!(report.expected_total, BigUint::from(2800u32));
        assert!(report.matches());
    }

    #[test]
    fn three_parties_two_of_three() {
        let mut rng = ChaCha20Rng::seed_from_u64(23);
        let params = Params::new(2, 3, Field::mersenne127()).unwrap();
        let vals = secrets(&[100, 200, 300]);
        let ledger = ledger_for(&params, 3);
        run_round(&vals, &params, &ledger, &mut rng).unwrap();

        let global = read_global(&ledger, &params).unwrap();
        for pair in [[0usize, 1], [0, 2], [1, 2]] {
            let pts: Vec<AggregatePoint> = pair.iter().map(|&i| global[i].clone()).collect();
            assert_eq!(recover_total(&pts, 3, &params).unwrap(), BigUint::from(600u32));
        }
    }

    #[test]
    fn partial_points_are_skipped() {
        let params = Params::new(2, 3, Field::mersenne127()).unwrap();
        let field = params.field().clone();
        let mut rng = ChaCha20Rng::seed_from_u64(24);
        let shares = params.share_secret(&BigUint::from(42u32), &mut rng).unwrap();

        let mut points: Vec<AggregatePoint> = shares
            .iter()
            .map(|s| AggregatePoint::new(s.x, s.y.clone(), 1))
            .collect();
        points[1].count = 0;
        points[1].y = field.random(&mut rng);
        assert_eq!(recover_total(&points, 1, &params).unwrap(), BigUint::from(42u32));

        points[2].count = 0;
        assert!(matches!(
            recover_total(&points, 1, &params),
            Err(Error::IncompleteCoverage { covered: 1, required: 2 })
        ));
    }

    #[test]
    fn too_few_parties_for_shares() {
        let mut rng = ChaCha20Rng::seed_from_u64(25);
        let params = Params::new(2, 4, Field::mersenne127()).unwrap();
        assert!(matches!(
            distribute(&secrets(&[1, 2, 3]), &params, &mut rng),
            Err(Error::InsufficientParties { parties: 3, shares: 4 })
        ));
    }
}
