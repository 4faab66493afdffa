use std::fmt;

use crate::{
    config::{CacheConfig, ConfigError, ReplacementPolicy},
    simulator::Simulator,
    stats::RunStats,
    trace::TraceFile,
};

#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub label: String,
    pub config: CacheConfig,
}

#[derive(Debug)]
pub struct ScenarioResult {
    pub label: String,
    pub config: CacheConfig,
    pub trace_results: Vec<TraceResult>,
}

#[derive(Debug)]
pub struct TraceResult {
    pub trace_name: String,
    pub stats: RunStats,
}

impl TraceResult {
    pub fn hit_rate(&self) -> Option<f64> {
        (self.stats.accesses > 0)
            .then(|| self.stats.hits() as f64 / self.stats.accesses as f64 * 100.0)
    }
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.label)?;
        for result in &self.trace_results {
            match result.hit_rate() {
                Some(rate) => writeln!(
                    f,
                    "  {:<16} hit {:>6.2}% miss {:>6.2}% wb {:>8}",
                    result.trace_name,
                    rate,
                    100.0 - rate,
                    result.stats.writebacks
                )?,
                None => writeln!(f, "  {:<16} no accesses", result.trace_name)?,
            }
        }
        Ok(())
    }
}

/// Runs every trace through a fresh cache for each scenario.
pub fn run_scenarios(traces: &[TraceFile], scenarios: &[ScenarioConfig]) -> Vec<ScenarioResult> {
    let mut results = Vec::new();
    for scenario in scenarios {
        let mut per_trace = Vec::new();
        for trace in traces {
            let mut sim = Simulator::new(scenario.config.clone());
            let stats = sim.run_trace(&trace.entries).clone();
            per_trace.push(TraceResult {
                trace_name: trace.name.clone(),
                stats,
            });
        }
        results.push(ScenarioResult {
            label: scenario.label.clone(),
            config: scenario.config.clone(),
            trace_results: per_trace,
        });
    }
    results
}

pub fn block_sizes(
    base: &CacheConfig,
    sizes: &[u64],
) -> Result<Vec<ScenarioConfig>, ConfigError> {
    sizes
        .iter()
        .map(|&block| {
            Ok(ScenarioConfig {
                label: format!("Block {block}B"),
                config: base.with_block_size(block)?,
            })
        })
        .collect()
}

pub fn associativities(
    base: &CacheConfig,
    ways: &[usize],
) -> Result<Vec<ScenarioConfig>, ConfigError> {
    ways.iter()
        .map(|&assoc| {
            Ok(ScenarioConfig {
                label: format!("{assoc}-way"),
                config: base.with_associativity(assoc)?,
            })
        })
        .collect()
}

pub fn capacities(
    base: &CacheConfig,
    capacities: &[u64],
) -> Result<Vec<ScenarioConfig>, ConfigError> {
    capacities
        .iter()
        .map(|&capacity| {
            Ok(ScenarioConfig {
                label: format!("Capacity {capacity}B"),
                config: base.with_capacity(capacity)?,
            })
        })
        .collect()
}

pub fn policies(base: &CacheConfig) -> Vec<ScenarioConfig> {
    [ReplacementPolicy::AgeRankLru, ReplacementPolicy::Fifo]
        .into_iter()
        .map(|policy| ScenarioConfig {
            label: format!("{policy}"),
            config: base.with_policy(policy),
        })
        .collect()
}
