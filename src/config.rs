use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplacementPolicy {
    /// Evict the line with the largest recency rank.
    #[default]
    AgeRankLru,
    /// Evict lines in the order they were filled, per set.
    Fifo,
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplacementPolicy::AgeRankLru => write!(f, "LRU"),
            ReplacementPolicy::Fifo => write!(f, "FIFO"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must be non-zero")]
    Zero { field: &'static str },
    #[error("{field} must be a power of two, got {value}")]
    NotPowerOfTwo { field: &'static str, value: u64 },
    #[error("capacity {capacity}B is smaller than one set ({block_size}B x {associativity} ways)")]
    CapacityTooSmall {
        capacity: u64,
        block_size: u64,
        associativity: u64,
    },
    #[error("capacity {capacity}B is not a multiple of the set size {set_bytes}B")]
    CapacityNotDivisible { capacity: u64, set_bytes: u64 },
}

/// Cache geometry and policy. Only obtainable already validated, through
/// [`CacheConfig::new`], [`Default`] or the `with_*` builders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    capacity: u64,        // in Bytes
    block_size: u64,      // in Bytes
    associativity: usize, // set to 1 for Direct-Mapped
    policy: ReplacementPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 256 * 1024,
            block_size: 32,
            associativity: 4,
            policy: ReplacementPolicy::AgeRankLru,
        }
    }
}

impl CacheConfig {
    /// Builds a configuration and rejects any geometry the cache cannot model.
    pub fn new(
        block_size: u64,
        associativity: usize,
        capacity: u64,
        policy: ReplacementPolicy,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            capacity,
            block_size,
            associativity,
            policy,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_block_size(&self, block_size: u64) -> Result<Self, ConfigError> {
        Self::new(block_size, self.associativity, self.capacity, self.policy)
    }

    pub fn with_associativity(&self, associativity: usize) -> Result<Self, ConfigError> {
        Self::new(self.block_size, associativity, self.capacity, self.policy)
    }

    pub fn with_capacity(&self, capacity: u64) -> Result<Self, ConfigError> {
        Self::new(self.block_size, self.associativity, capacity, self.policy)
    }

    pub fn with_policy(&self, policy: ReplacementPolicy) -> Self {
        Self {
            policy,
            ..self.clone()
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    pub fn associativity(&self) -> usize {
        self.associativity
    }

    pub fn policy(&self) -> ReplacementPolicy {
        self.policy
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_power_of_two("block size", self.block_size)?;
        check_power_of_two("associativity", self.associativity as u64)?;
        check_power_of_two("capacity", self.capacity)?;

        let set_bytes = self.set_bytes();
        if self.capacity < set_bytes {
            return Err(ConfigError::CapacityTooSmall {
                capacity: self.capacity,
                block_size: self.block_size,
                associativity: self.associativity as u64,
            });
        }
        if self.capacity % set_bytes != 0 {
            return Err(ConfigError::CapacityNotDivisible {
                capacity: self.capacity,
                set_bytes,
            });
        }
        Ok(())
    }

    fn set_bytes(&self) -> u64 {
        self.block_size.saturating_mul(self.associativity as u64)
    }

    pub fn num_sets(&self) -> usize {
        (self.capacity / self.set_bytes()) as usize
    }

    pub fn num_lines(&self) -> usize {
        self.num_sets() * self.associativity
    }

    pub fn offset_bits(&self) -> u32 {
        self.block_size.trailing_zeros()
    }

    pub fn set_bits(&self) -> u32 {
        self.num_sets().trailing_zeros()
    }

    pub fn tag_bits(&self) -> u32 {
        u64::BITS.saturating_sub(self.offset_bits() + self.set_bits())
    }

    pub fn associativity_label(&self) -> String {
        if self.associativity == 1 {
            "Direct-Mapped".to_string()
        } else if self.num_sets() == 1 {
            "Fully Associative".to_string()
        } else {
            format!("{}-Way Set Associative", self.associativity)
        }
    }
}

fn check_power_of_two(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Zero { field });
    }
    if !value.is_power_of_two() {
        return Err(ConfigError::NotPowerOfTwo { field, value });
    }
    Ok(())
}
