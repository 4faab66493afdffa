use tracing::trace;

use crate::config::{CacheConfig, ReplacementPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Line {
    pub tag: u64,
    pub valid: bool,
    pub dirty: bool,  // touched by a store since it was filled
    pub rank: usize, // 0 = most recently used
}

/// Every line of the cache in one arena, `associativity` lanes per set.
#[derive(Debug, Clone)]
pub struct SetStore {
    lines: Vec<Line>,
    associativity: usize,
}

impl SetStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            lines: vec![Line::default(); config.num_lines()],
            associativity: config.associativity(),
        }
    }

    pub fn associativity(&self) -> usize {
        self.associativity
    }

    pub fn num_sets(&self) -> usize {
        self.lines.len() / self.associativity
    }

    pub fn set(&self, set_index: usize) -> &[Line] {
        let base = set_index * self.associativity;
        &self.lines[base..base + self.associativity]
    }

    pub fn set_mut(&mut self, set_index: usize) -> &mut [Line] {
        let base = set_index * self.associativity;
        &mut self.lines[base..base + self.associativity]
    }

    pub fn line(&self, set_index: usize, lane: usize) -> Option<&Line> {
        if lane >= self.associativity {
            return None;
        }
        self.lines.get(set_index * self.associativity + lane)
    }
}

/// A line pushed out of the cache to make room for a new block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    pub tag: u64,
    pub dirty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessOutcome {
    pub hit: bool,
    pub lane: usize,
    /// Set when a miss filled a never-used lane.
    pub cold: bool,
    pub evicted: Option<Eviction>,
}

impl AccessOutcome {
    pub fn writeback(&self) -> bool {
        self.evicted.is_some_and(|line| line.dirty)
    }
}

/// Hit detection, victim selection and recency bookkeeping for one cache.
///
/// The engine owns no lines itself; it works on whatever [`SetStore`] the
/// caller hands it. FIFO state lives here since it is per set, not per line.
#[derive(Debug, Clone)]
pub struct ReplacementEngine {
    policy: ReplacementPolicy,
    next_fifo_lane: Vec<usize>,
}

impl ReplacementEngine {
    pub fn new(config: &CacheConfig) -> Self {
        let next_fifo_lane = match config.policy() {
            ReplacementPolicy::Fifo => vec![0; config.num_sets()],
            ReplacementPolicy::AgeRankLru => Vec::new(),
        };
        Self {
            policy: config.policy(),
            next_fifo_lane,
        }
    }

    pub fn policy(&self) -> ReplacementPolicy {
        self.policy
    }

    pub fn access(
        &mut self,
        store: &mut SetStore,
        set_index: usize,
        tag: u64,
        is_store: bool,
    ) -> AccessOutcome {
        let lines = store.set_mut(set_index);

        let mut empty_lane = None;
        let mut matched = None;
        for (lane, line) in lines.iter().enumerate() {
            if !line.valid {
                if empty_lane.is_none() {
                    empty_lane = Some(lane);
                }
                continue;
            }
            if line.tag == tag {
                matched = Some(lane);
                break;
            }
        }

        let outcome = match matched {
            Some(lane) => {
                lines[lane].dirty |= is_store;
                AccessOutcome {
                    hit: true,
                    lane,
                    cold: false,
                    evicted: None,
                }
            }
            None => {
                let (lane, evicted) = match empty_lane {
                    Some(lane) => (lane, None),
                    None => {
                        let lane = self.victim_lane(set_index, lines);
                        let old = lines[lane];
                        (
                            lane,
                            Some(Eviction {
                                tag: old.tag,
                                dirty: old.dirty,
                            }),
                        )
                    }
                };
                let line = &mut lines[lane];
                line.tag = tag;
                line.dirty = is_store;
                line.valid = true;
                AccessOutcome {
                    hit: false,
                    lane,
                    cold: evicted.is_none(),
                    evicted,
                }
            }
        };

        promote(lines, outcome.lane);
        trace!(
            set = set_index,
            tag,
            hit = outcome.hit,
            lane = outcome.lane,
            writeback = outcome.writeback(),
            "cache access"
        );
        outcome
    }

    fn victim_lane(&mut self, set_index: usize, lines: &[Line]) -> usize {
        match self.policy {
            ReplacementPolicy::AgeRankLru => oldest_lane(lines),
            ReplacementPolicy::Fifo => {
                // Cold fills take lanes in ascending order, so a rotating
                // pointer starting at lane 0 always names the oldest fill.
                let next = &mut self.next_fifo_lane[set_index];
                let lane = *next;
                *next = (lane + 1) % lines.len();
                lane
            }
        }
    }
}

// Leftmost lane holding the largest rank.
fn oldest_lane(lines: &[Line]) -> usize {
    let mut victim = 0;
    for (lane, line) in lines.iter().enumerate().skip(1) {
        if line.rank > lines[victim].rank {
            victim = lane;
        }
    }
    victim
}

/// Moves `touched` to the top of the set's recency stack.
///
/// Only lines at or above the touched line's old rank age by one, so the
/// relative order of older lines is left alone. Ranks never grow past the
/// associativity.
fn promote(lines: &mut [Line], touched: usize) {
    let threshold = lines[touched].rank;
    let ceiling = lines.len();
    for line in lines.iter_mut() {
        if line.rank <= threshold && line.rank < ceiling {
            line.rank += 1;
        }
    }
    lines[touched].rank = 0;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(ways: usize, policy: ReplacementPolicy) -> (SetStore, ReplacementEngine) {
        let cfg = CacheConfig::new(64, ways, 64 * ways as u64 * 2, policy).unwrap();
        (SetStore::new(&cfg), ReplacementEngine::new(&cfg))
    }

    fn ranks(store: &SetStore, set: usize) -> Vec<usize> {
        store.set(set).iter().map(|line| line.rank).collect()
    }

    #[test]
    fn fills_empty_lanes_in_order() {
        let (mut store, mut engine) = setup(4, ReplacementPolicy::AgeRankLru);
        for (i, tag) in [10, 11, 12, 13].into_iter().enumerate() {
            let out = engine.access(&mut store, 0, tag, false);
            assert!(!out.hit);
            assert!(out.cold);
            assert_eq!(out.lane, i);
            assert_eq!(out.evicted, None);
        }
        assert!(store.set(0).iter().all(|line| line.valid));
        assert!(store.set(1).iter().all(|line| !line.valid));
    }

    #[test]
    fn ranks_form_recency_stack() {
        let (mut store, mut engine) = setup(4, ReplacementPolicy::AgeRankLru);
        for tag in [1, 2, 3, 4] {
            engine.access(&mut store, 0, tag, false);
        }
        assert_eq!(ranks(&store, 0), vec![3, 2, 1, 0]);

        // Re-touching tag 2 only ages lines younger than it.
        let out = engine.access(&mut store, 0, 2, false);
        assert!(out.hit);
        assert_eq!(out.lane, 1);
        assert_eq!(ranks(&store, 0), vec![3, 0, 2, 1]);
    }

    #[test]
    fn promotion_compares_against_rank_before_update() {
        let (mut store, mut engine) = setup(4, ReplacementPolicy::AgeRankLru);
        engine.access(&mut store, 0, 1, false);
        assert_eq!(ranks(&store, 0), vec![0, 1, 1, 1]);

        // The touched line ages itself first; lines equal to its new rank
        // must not be dragged along.
        assert!(engine.access(&mut store, 0, 1, false).hit);
        assert_eq!(ranks(&store, 0), vec![0, 1, 1, 1]);
        assert!(engine.access(&mut store, 0, 1, true).hit);
        assert_eq!(ranks(&store, 0), vec![0, 1, 1, 1]);
    }

    #[test]
    fn ranks_stay_within_associativity() {
        let (mut store, mut engine) = setup(2, ReplacementPolicy::AgeRankLru);
        for tag in [1, 2, 3, 1, 2, 3, 3, 3, 1] {
            engine.access(&mut store, 0, tag, false);
            assert!(store.set(0).iter().all(|line| line.rank <= 2));
        }
        assert!(store.set(1).iter().all(|line| line.rank == 0));
    }

    #[test]
    fn lru_evicts_largest_rank() {
        let (mut store, mut engine) = setup(4, ReplacementPolicy::AgeRankLru);
        for tag in [1, 2, 3, 4] {
            engine.access(&mut store, 0, tag, false);
        }
        engine.access(&mut store, 0, 1, false);
        let out = engine.access(&mut store, 0, 5, false);
        assert!(!out.hit);
        assert_eq!(out.lane, 1);
        assert_eq!(
            out.evicted,
            Some(Eviction {
                tag: 2,
                dirty: false
            })
        );
    }

    #[test]
    fn oldest_lane_breaks_ties_leftmost() {
        let lines = [
            Line {
                rank: 1,
                ..Line::default()
            },
            Line {
                rank: 3,
                ..Line::default()
            },
            Line {
                rank: 3,
                ..Line::default()
            },
        ];
        assert_eq!(oldest_lane(&lines), 1);
    }

    #[test]
    fn store_mark_sticks_until_replaced() {
        let (mut store, mut engine) = setup(1, ReplacementPolicy::AgeRankLru);
        engine.access(&mut store, 0, 7, false);
        engine.access(&mut store, 0, 7, true);
        engine.access(&mut store, 0, 7, false);
        assert!(store.line(0, 0).unwrap().dirty);

        let out = engine.access(&mut store, 0, 8, false);
        assert!(out.writeback());
        assert!(!store.line(0, 0).unwrap().dirty);

        let out = engine.access(&mut store, 0, 9, true);
        assert!(!out.writeback());
        assert!(store.line(0, 0).unwrap().dirty);
    }

    #[test]
    fn fifo_ignores_recency() {
        let (mut store, mut engine) = setup(2, ReplacementPolicy::Fifo);
        engine.access(&mut store, 0, 1, false);
        engine.access(&mut store, 0, 2, false);
        // Hit on the first fill does not save it under FIFO.
        assert!(engine.access(&mut store, 0, 1, false).hit);

        let out = engine.access(&mut store, 0, 3, false);
        assert_eq!(out.lane, 0);
        assert_eq!(out.evicted.map(|e| e.tag), Some(1));

        let out = engine.access(&mut store, 0, 4, false);
        assert_eq!(out.lane, 1);
        assert_eq!(out.evicted.map(|e| e.tag), Some(2));

        let out = engine.access(&mut store, 0, 5, false);
        assert_eq!(out.lane, 0);
        assert_eq!(out.evicted.map(|e| e.tag), Some(3));
    }

    #[test]
    fn fifo_pointers_are_per_set() {
        let (mut store, mut engine) = setup(2, ReplacementPolicy::Fifo);
        for tag in [1, 2, 3] {
            engine.access(&mut store, 0, tag, false);
        }
        for tag in [1, 2] {
            engine.access(&mut store, 1, tag, false);
        }
        let out = engine.access(&mut store, 1, 9, false);
        assert_eq!(out.lane, 0);
    }

    #[test]
    fn line_lookup_is_bounds_checked() {
        let (store, engine) = setup(2, ReplacementPolicy::AgeRankLru);
        assert_eq!(store.num_sets(), 2);
        assert_eq!(store.associativity(), 2);
        assert_eq!(engine.policy(), ReplacementPolicy::AgeRankLru);
        assert!(store.line(0, 2).is_none());
        assert!(store.line(2, 0).is_none());
        assert!(store.line(1, 1).is_some());
    }
}
