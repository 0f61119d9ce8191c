/// Computes floor(log2(n)); only ever called with powers of two in this
/// crate, where it agrees with the exact log2.
fn floor_log2(n: u32) -> u32 {
    debug_assert!(n > 0);
    31 - n.leading_zeros()
}

/// Splits fetch addresses into (tag, set index, line offset) for a cache of
/// given line size and set count. Both must be powers of two; construction
/// fails otherwise.
#[derive(Debug, Clone, Copy)]
pub struct AddressLayout {
    line_shift: u32,
    set_index_mask: u32,
}

pub struct SplitAddr {
    pub tag: u64,
    pub set_index: u32,
    pub line_offset: u32,
}

impl AddressLayout {
    pub fn new(line_size: u32, num_sets: u32) -> Self {
        assert!(line_size.is_power_of_two(), "line_size must be a power of two");
        assert!(num_sets.is_power_of_two(), "num_sets must be a power of two");
        AddressLayout {
            line_shift: floor_log2(line_size),
            set_index_mask: num_sets - 1,
        }
    }

    pub fn line_size(&self) -> u32 {
        1 << self.line_shift
    }

    /// Plain decomposition: `setIndex = tag & setIndexMask`.
    pub fn split(&self, addr: u64) -> SplitAddr {
        let tag = addr >> self.line_shift;
        let set_index = (tag as u32) & self.set_index_mask;
        let line_offset = (addr as u32) & (self.line_size() - 1);
        SplitAddr { tag, set_index, line_offset }
    }

    /// Skewed decomposition, kept for completeness but never selected by the
    /// default configuration: `setIndex = (tag & mask) XOR ((tag >>
    /// log2(lineSize)) & mask)`.
    pub fn split_skewed(&self, addr: u64) -> SplitAddr {
        let tag = addr >> self.line_shift;
        let base_index = (tag as u32) & self.set_index_mask;
        let extra = ((tag >> self.line_shift) as u32) & self.set_index_mask;
        let set_index = base_index ^ extra;
        let line_offset = (addr as u32) & (self.line_size() - 1);
        SplitAddr { tag, set_index, line_offset }
    }

    /// The block address a fetch address belongs to (`addr >> log2(lineSize)`),
    /// used by the victim buffer and medium-use block tracking.
    pub fn block_addr(&self, addr: u64) -> u64 {
        addr >> self.line_shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_recovers_tag_and_offset() {
        let layout = AddressLayout::new(64, 64); // 64B lines, 64 sets
        for offset in 0..64u64 {
            let tag = 0x1234u64;
            let addr = (tag << 6) | offset;
            let split = layout.split(addr);
            assert_eq!(split.tag, tag);
            assert_eq!(split.line_offset as u64, offset);
        }
    }

    #[test]
    fn set_index_is_low_bits_of_tag() {
        let layout = AddressLayout::new(64, 64);
        let split = layout.split(0xABCD_00C0);
        let tag = 0xABCD_00C0u64 >> 6;
        assert_eq!(split.set_index, (tag as u32) & 63);
    }

    #[test]
    fn skewed_split_differs_from_plain_when_extra_bits_nonzero() {
        let layout = AddressLayout::new(64, 64);
        let addr = (0xFFFF_u64 << 6) | 0x3;
        let plain = layout.split(addr);
        let skewed = layout.split_skewed(addr);
        assert_ne!(plain.set_index, skewed.set_index);
    }

    #[test]
    fn block_addr_matches_tag_for_contiguous_layout() {
        let layout = AddressLayout::new(64, 64);
        assert_eq!(layout.block_addr(0x1000), 0x1000 >> 6);
    }
}
