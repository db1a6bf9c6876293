//! Pair universe selection
//!
//! Candidates come from an explicit list or from the files present in the
//! data directory. A whitelist then narrows them and a blacklist removes
//! unwanted ones. Patterns must match the whole pair id.

use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};

use crate::config::Config;
use crate::{data, PairId};

/// Compiled whitelist / blacklist
#[derive(Debug, Clone)]
pub struct PairUniverse {
    whitelist: Vec<Regex>,
    blacklist: Vec<Regex>,
}

fn compile_anchored(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(&format!("^(?:{})$", p)).context(format!("Invalid pair pattern: {}", p))
        })
        .collect()
}

impl PairUniverse {
    pub fn new(whitelist: &[String], blacklist: &[String]) -> Result<Self> {
        Ok(PairUniverse {
            whitelist: compile_anchored(whitelist)?,
            blacklist: compile_anchored(blacklist)?,
        })
    }

    /// Universe from the config's whitelist / blacklist
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.pair_whitelist(), &config.pair_blacklist)
    }

    /// Whether a pair passes the whitelist and is not blacklisted.
    /// An empty whitelist admits everything.
    pub fn accepts(&self, pair: &PairId) -> bool {
        let s = pair.as_str();
        let whitelisted =
            self.whitelist.is_empty() || self.whitelist.iter().any(|re| re.is_match(s));
        whitelisted && !self.blacklist.iter().any(|re| re.is_match(s))
    }

    /// Filter candidates, preserving their order and dropping repeats
    pub fn select(&self, candidates: &[PairId]) -> Vec<PairId> {
        let mut selected: Vec<PairId> = Vec::with_capacity(candidates.len());
        for pair in candidates {
            if !self.accepts(pair) {
                debug!("Excluding {}", pair);
                continue;
            }
            if !selected.contains(pair) {
                selected.push(pair.clone());
            }
        }
        selected
    }

    /// Resolve the pairs to rank.
    ///
    /// Explicit `config.pairs` keep their configured order; otherwise every
    /// pair with data for the configured timeframe is used, sorted by id.
    /// Ranking ties follow this order.
    pub fn resolve(&self, config: &Config, data_dir: impl AsRef<Path>) -> Result<Vec<PairId>> {
        let candidates = if config.pairs.is_empty() {
            data::discover_pairs(data_dir, &config.timeframe)?
        } else {
            config.pairs.iter().map(PairId::new).collect()
        };

        let selected = self.select(&candidates);
        info!(
            "Pair universe: {} of {} candidates selected for {}",
            selected.len(),
            candidates.len(),
            config.stake_currency
        );
        Ok(selected)
    }
}
