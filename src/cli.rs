use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use num::bigint::BigUint;
use rand::rngs::OsRng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::info;

use receivables_sum::config::RoundConfig;
use receivables_sum::data::PartyId;
use receivables_sum::ledger::InMemoryLedger;
use receivables_sum::{export, protocol, simulate};

/// Simulate one round of summing private receivable balances.
#[derive(Parser, Debug)]
#[command(name = "receivables-sum", version)]
pub struct Cli {
    /// JSON round configuration; unset fields take their defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub parties: Option<u32>,

    #[arg(long)]
    pub shares: Option<u32>,

    #[arg(long)]
    pub threshold: Option<u32>,

    /// Seed for a reproducible run.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory to write the share, local and global record sets into.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl Cli {
    fn round_config(&self) -> Result<RoundConfig> {
        let mut cfg = match &self.config {
            Some(path) => RoundConfig::from_path(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => RoundConfig::default(),
        };
        cfg.parties = self.parties.unwrap_or(cfg.parties);
        cfg.shares = self.shares.unwrap_or(cfg.shares);
        cfg.threshold = self.threshold.unwrap_or(cfg.threshold);
        cfg.seed = self.seed.or(cfg.seed);
        Ok(cfg)
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let cfg = cli.round_config()?;
    let params = cfg.validate().context("invalid round configuration")?;

    let mut rng = match cfg.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_rng(OsRng)?,
    };

    let balances = simulate::random_balances(cfg.parties, cfg.min_balance..cfg.max_balance, &mut rng)?;
    let secrets: Vec<BigUint> = balances.into_iter().map(BigUint::from).collect();
    let total: BigUint = secrets.iter().sum();
    info!(%total, parties = cfg.parties, "generated balances");

    let ledger = InMemoryLedger::new();
    ledger.set_description(cfg.description(&params, total))?;
    ledger.register_parties((0..cfg.parties).map(PartyId));
    info!(name = %cfg.name, date = %cfg.date, field = %params.field(), "ledger described");

    let round = protocol::run_round(&secrets, &params, &ledger, &mut rng)?;
    let report = protocol::verify_round(&ledger, &secrets, &params, &mut rng)?;
    info!(
        expected = %report.expected_total,
        recovered = %report.recovered_total,
        from_threshold = %report.recovered_from_threshold,
        "round complete"
    );

    if let Some(dir) = &cli.out {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let global = protocol::read_global(&ledger, &params)?;
        export::write_round(dir, &round.outboxes, &round.local, &global)?;
        info!(dir = %dir.display(), "records written");
    }

    if !report.matches() {
        bail!(
            "recovered total {} does not match sum of balances {}",
            report.recovered_total,
            report.expected_total
        );
    }
    Ok(())
}
