// Record sets written out after a round, for checking and debugging:
// every share each party generated, every party's local aggregate, and the
// global aggregate as read back from the ledger.
//
// y values are written as decimal strings; they don't fit JSON numbers.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::client::Outbox;
use crate::data::{AggregatePoint, LocalAggregate, PartyId};
use crate::error::Result;

pub const SHARES_FILE: &str = "all_shares.json";
pub const LOCAL_FILE: &str = "agg_shares.json";
pub const GLOBAL_FILE: &str = "full_agg_shares.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ShareRecord {
    pub origin: PartyId,
    pub x: u32,
    pub y: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LocalAggregateRecord {
    pub receiver: PartyId,
    pub x: u32,
    pub y_sum: String,
    pub count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GlobalAggregateRecord {
    pub x: u32,
    pub cumulative_y: String,
    pub cumulative_count: u32,
}

pub fn share_records(outboxes: &[Outbox]) -> Vec<ShareRecord> {
    outboxes
        .iter()
        .flat_map(|o| {
            o.shares.iter().map(move |s| ShareRecord {
                origin: o.origin,
                x: s.x,
                y: s.y.to_string(),
            })
        })
        .collect()
}

pub fn local_records(local: &[LocalAggregate]) -> Vec<LocalAggregateRecord> {
    local
        .iter()
        .flat_map(|agg| {
            agg.points.iter().map(move |p| LocalAggregateRecord {
                receiver: agg.party,
                x: p.x,
                y_sum: p.y.to_string(),
                count: p.count,
            })
        })
        .collect()
}

pub fn global_records(points: &[AggregatePoint]) -> Vec<GlobalAggregateRecord> {
    points
        .iter()
        .map(|p| GlobalAggregateRecord {
            x: p.x,
            cumulative_y: p.y.to_string(),
            cumulative_count: p.count,
        })
        .collect()
}

pub fn write_records<W: Write, T: Serialize>(writer: W, records: &[T]) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

// Write all three record sets into `dir`, which must exist.
pub fn write_round(
    dir: &Path,
    outboxes: &[Outbox],
    local: &[LocalAggregate],
    global: &[AggregatePoint],
) -> Result<()> {
    write_records(File::create(dir.join(SHARES_FILE))?, &share_records(outboxes))?;
    write_records(File::create(dir.join(LOCAL_FILE))?, &local_records(local))?;
    write_records(File::create(dir.join(GLOBAL_FILE))?, &global_records(global))?;
    Ok(())
}
