use std::fmt;

use thiserror::Error;

use crate::trace::AccessKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("no accesses were recorded")]
    NoData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub accesses: u64,
    pub misses: u64,
    pub loads: u64,
    pub stores: u64,
    pub cold_misses: u64,
    pub writebacks: u64,
}

impl RunStats {
    pub fn hits(&self) -> u64 {
        self.accesses - self.misses
    }
}

/// Counters for one simulation run. A fresh run needs a fresh collector.
#[derive(Debug, Default)]
pub struct StatsCollector {
    stats: RunStats,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, hit: bool) {
        self.stats.accesses += 1;
        if !hit {
            self.stats.misses += 1;
        }
    }

    pub fn record_kind(&mut self, kind: AccessKind) {
        match kind {
            AccessKind::Load => self.stats.loads += 1,
            AccessKind::Store => self.stats.stores += 1,
        }
    }

    pub fn record_cold_miss(&mut self) {
        self.stats.cold_misses += 1;
    }

    pub fn record_writeback(&mut self) {
        self.stats.writebacks += 1;
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn report(&self) -> Result<StatsReport, StatsError> {
        StatsReport::from_stats(&self.stats)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsReport {
    pub accesses: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate_percent: f64,
    pub miss_rate_percent: f64,
    pub loads: u64,
    pub stores: u64,
    pub cold_misses: u64,
    pub writebacks: u64,
}

impl StatsReport {
    pub fn from_stats(stats: &RunStats) -> Result<Self, StatsError> {
        if stats.accesses == 0 {
            return Err(StatsError::NoData);
        }
        let hits = stats.hits();
        let hit_rate_percent = hits as f64 / stats.accesses as f64 * 100.0;
        Ok(Self {
            accesses: stats.accesses,
            hits,
            misses: stats.misses,
            hit_rate_percent,
            miss_rate_percent: 100.0 - hit_rate_percent,
            loads: stats.loads,
            stores: stats.stores,
            cold_misses: stats.cold_misses,
            writebacks: stats.writebacks,
        })
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Hit Rate: {:.2}%", self.hit_rate_percent)?;
        writeln!(f, "Miss Rate: {:.2}%", self.miss_rate_percent)?;
        writeln!(f, "Hits: {}", self.hits)?;
        writeln!(f, "Misses: {}", self.misses)?;
        writeln!(f, "Cold misses: {}", self.cold_misses)?;
        writeln!(f, "Loads: {}", self.loads)?;
        writeln!(f, "Stores: {}", self.stores)?;
        write!(f, "Write-backs: {}", self.writebacks)
    }
}
