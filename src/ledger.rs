// The aggregator a round uploads into, and an in-memory ledger implementing it.
//
// The protocol only ever calls `upload` and `read`.  Uploads merge into the
// running (y, count) at each x, they never overwrite.  Calling `upload` more
// than once per party per round double-counts; keeping to one upload per
// party is the caller's job, not the trait's.

use std::collections::{BTreeMap, HashMap};

use num::bigint::BigUint;
use parking_lot::Mutex;
use tracing::debug;

use crate::data::{AggregatePoint, PartyId};
use crate::encode::decode_points;
use crate::error::{LedgerError, Result};
use crate::math::Field;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ack {
    pub party: PartyId,
    pub points: usize,
}

pub trait Aggregator {
    // Merge one party's local aggregate into the global table.
    fn upload(&self, party: PartyId, points: &[AggregatePoint]) -> Result<Ack>;

    // Cumulative (y, count) at x.  An x nobody uploaded reads as (0, 0).
    fn read(&self, x: u32) -> Result<AggregatePoint>;
}

// Round metadata, written once before any upload and read-only afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Description {
    pub name: String,
    pub date: String,
    pub asserted_total: BigUint,
    pub prime: BigUint,
    pub shares: u32,
    pub threshold: u32,
}

#[derive(Default)]
struct LedgerState {
    description: Option<Description>,
    field: Option<Field>,
    // party -> has uploaded
    members: HashMap<PartyId, bool>,
    cumulative: BTreeMap<u32, AggregatePoint>,
}

// Enforces the rules of an on-chain accumulator: only registered
// parties may upload, each at most once, only at x in 1..=S, and only after
// the description is in place.
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        InMemoryLedger::default()
    }

    pub fn set_description(&self, description: Description) -> Result<()> {
        let field = Field::new(description.prime.clone())?;
        let mut state = self.state.lock();
        if state.description.is_some() {
            return Err(LedgerError::DescriptionLocked.into());
        }
        state.description = Some(description);
        state.field = Some(field);
        Ok(())
    }

    pub fn description(&self) -> Option<Description> {
        self.state.lock().description.clone()
    }

    pub fn register_parties<I: IntoIterator<Item = PartyId>>(&self, parties: I) {
        let mut state = self.state.lock();
        for p in parties {
            state.members.entry(p).or_insert(false);
        }
    }

    pub fn has_uploaded(&self, party: PartyId) -> bool {
        self.state.lock().members.get(&party).copied().unwrap_or(false)
    }

    pub fn upload_count(&self) -> usize {
        self.state.lock().members.values().filter(|&&done| done).count()
    }

    // Accept an upload in its flat wire form.
    pub fn upload_payload(&self, party: PartyId, payload: &[u8]) -> Result<Ack> {
        let field = self
            .state
            .lock()
            .field
            .clone()
            .ok_or(LedgerError::DescriptionIncomplete)?;
        let points = decode_points(payload, &field)?;
        self.upload(party, &points)
    }
}

impl Aggregator for InMemoryLedger {
    fn upload(&self, party: PartyId, points: &[AggregatePoint]) -> Result<Ack> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let (shares, field) = match (&state.description, &state.field) {
            (Some(d), Some(f)) => (d.shares, f.clone()),
            _ => return Err(LedgerError::DescriptionIncomplete.into()),
        };
        match state.members.get(&party).copied() {
            None => return Err(LedgerError::NotRegistered(party).into()),
            Some(true) => return Err(LedgerError::AlreadyUploaded(party).into()),
            Some(false) => {}
        }
        if let Some(p) = points.iter().find(|p| p.x == 0 || p.x > shares) {
            return Err(LedgerError::PointOutOfRange { x: p.x, shares }.into());
        }

        // Work out every merged point first, so a bad count rejects the
        // whole upload with nothing written.
        let mut merged: BTreeMap<u32, AggregatePoint> = BTreeMap::new();
        for p in points {
            let current = match merged.get(&p.x) {
                Some(m) => m.clone(),
                None => state
                    .cumulative
                    .get(&p.x)
                    .cloned()
                    .unwrap_or_else(|| AggregatePoint::empty(p.x)),
            };
            let count = current
                .count
                .checked_add(p.count)
                .ok_or(LedgerError::CountOverflow { x: p.x })?;
            let y = field.add(&current.y, &p.y);
            merged.insert(p.x, AggregatePoint::new(p.x, y, count));
        }
        state.cumulative.extend(merged);
        state.members.insert(party, true);
        debug!(%party, points = points.len(), "merged upload");

        Ok(Ack {
            party,
            points: points.len(),
        })
    }

    fn read(&self, x: u32) -> Result<AggregatePoint> {
        Ok(self
            .state
            .lock()
            .cumulative
            .get(&x)
            .cloned()
            .unwrap_or_else(|| AggregatePoint::empty(x)))
    }
}
