// Round configuration: the description metadata plus the simulation knobs.
//
// Loaded from JSON; every field is optional and falls back to the values of
// the reference run (50 parties, 20 shares, threshold 10, p = 2^127 - 1).

use std::fs;
use std::path::Path;

use num::bigint::BigUint;
use num::Num;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ledger::Description;
use crate::math::Field;
use crate::shamir::Params;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoundConfig {
    pub name: String,
    pub date: String,
    pub parties: u32,
    pub shares: u32,
    pub threshold: u32,
    // Decimal.  None means the Mersenne prime 2^127 - 1.
    pub prime: Option<String>,
    pub min_balance: u64,
    pub max_balance: u64,
    // None means OS randomness.
    pub seed: Option<u64>,
}

impl Default for RoundConfig {
    fn default() -> Self {
        RoundConfig {
            name: "Acme Corp".into(),
            date: "31.12.19".into(),
            parties: 50,
            shares: 20,
            threshold: 10,
            prime: None,
            min_balance: 1000,
            max_balance: 1_000_000,
            seed: None,
        }
    }
}

impl RoundConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn field(&self) -> Result<Field> {
        match &self.prime {
            None => Ok(Field::mersenne127()),
            Some(p) => {
                let p = BigUint::from_str_radix(p.trim(), 10)
                    .map_err(|e| Error::Config(format!("bad prime {:?}: {}", p, e)))?;
                Field::new(p)
            }
        }
    }

    // Check everything a round needs before any sharing happens.
    pub fn validate(&self) -> Result<Params> {
        let params = Params::new(self.threshold, self.shares, self.field()?)?;
        if self.parties < self.shares {
            return Err(Error::InsufficientParties {
                parties: self.parties,
                shares: self.shares,
            });
        }
        let span = self.max_balance.saturating_sub(self.min_balance);
        if span < self.parties as u64 {
            return Err(Error::Config(format!(
                "balance range {}..{} holds fewer than {} distinct values",
                self.min_balance, self.max_balance, self.parties
            )));
        }
        // The largest possible total must stay below the prime, and fit the
        // u64 the simulated balances are summed in.
        let max_total = BigUint::from(self.max_balance) * self.parties;
        if max_total > BigUint::from(u64::MAX) {
            return Err(Error::Config(format!(
                "totals up to {} do not fit in 64 bits",
                max_total
            )));
        }
        if &max_total >= params.field().prime() {
            return Err(Error::Config(format!(
                "{} is too small for totals up to {}",
                params.field(),
                max_total
            )));
        }
        Ok(params)
    }

    pub fn description(&self, params: &Params, asserted_total: BigUint) -> Description {
        Description {
            name: self.name.clone(),
            date: self.date.clone(),
            asserted_total,
            prime: params.field().prime().clone(),
            shares: params.shares(),
            threshold: params.threshold(),
        }
    }
}
