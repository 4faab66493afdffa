use crate::config::CacheConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedAddress {
    pub set_index: usize,
    pub tag: u64,
}

/// Splits addresses into offset, set index and tag fields.
///
/// Field widths come from a validated [`CacheConfig`], so every call is a
/// couple of shifts and a mask.
#[derive(Debug, Clone, Copy)]
pub struct AddressDecoder {
    offset_bits: u32,
    set_bits: u32,
    set_mask: u64,
}

impl AddressDecoder {
    pub fn new(config: &CacheConfig) -> Self {
        let offset_bits = config.offset_bits();
        let set_bits = config.set_bits();
        Self {
            offset_bits,
            set_bits,
            set_mask: (1u64 << set_bits) - 1,
        }
    }

    pub fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    pub fn set_bits(&self) -> u32 {
        self.set_bits
    }

    pub fn decode(&self, address: u64) -> DecodedAddress {
        let set_index = (shr(address, self.offset_bits) & self.set_mask) as usize;
        let tag = shr(address, self.offset_bits + self.set_bits);
        DecodedAddress { set_index, tag }
    }

    /// Rebuilds the block-aligned address for a (set, tag) pair.
    pub fn compose(&self, decoded: DecodedAddress) -> u64 {
        shl(decoded.tag, self.offset_bits + self.set_bits)
            | shl(decoded.set_index as u64, self.offset_bits)
    }
}

// Shifts by the full word width yield zero instead of overflowing.
fn shr(value: u64, bits: u32) -> u64 {
    value.checked_shr(bits).unwrap_or(0)
}

fn shl(value: u64, bits: u32) -> u64 {
    value.checked_shl(bits).unwrap_or(0)
}
