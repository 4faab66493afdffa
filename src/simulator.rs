use tracing::debug;

use crate::{
    cache::{AccessOutcome, ReplacementEngine, SetStore},
    config::CacheConfig,
    decoder::AddressDecoder,
    stats::{RunStats, StatsCollector, StatsError, StatsReport},
    trace::TraceAccess,
};

/// One cache instance driven access by access from a trace.
#[derive(Debug)]
pub struct Simulator {
    config: CacheConfig,
    decoder: AddressDecoder,
    store: SetStore,
    engine: ReplacementEngine,
    stats: StatsCollector,
}

impl Simulator {
    pub fn new(config: CacheConfig) -> Self {
        debug!(
            sets = config.num_sets(),
            ways = config.associativity(),
            block_size = config.block_size(),
            capacity = config.capacity(),
            policy = %config.policy(),
            "cache constructed"
        );
        Self {
            decoder: AddressDecoder::new(&config),
            store: SetStore::new(&config),
            engine: ReplacementEngine::new(&config),
            stats: StatsCollector::new(),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &SetStore {
        &self.store
    }

    pub fn access(&mut self, access: TraceAccess) -> AccessOutcome {
        let decoded = self.decoder.decode(access.address);
        let outcome = self.engine.access(
            &mut self.store,
            decoded.set_index,
            decoded.tag,
            access.kind.is_store(),
        );
        self.stats.record(outcome.hit);
        self.stats.record_kind(access.kind);
        if outcome.cold {
            self.stats.record_cold_miss();
        }
        if outcome.writeback() {
            self.stats.record_writeback();
        }
        outcome
    }

    pub fn run_trace(&mut self, trace: &[TraceAccess]) -> &RunStats {
        for access in trace {
            self.access(*access);
        }
        let stats = self.stats.stats();
        debug!(
            accesses = stats.accesses,
            misses = stats.misses,
            writebacks = stats.writebacks,
            "trace finished"
        );
        stats
    }

    pub fn stats(&self) -> &RunStats {
        self.stats.stats()
    }

    pub fn report(&self) -> Result<StatsReport, StatsError> {
        self.stats.report()
    }
}
