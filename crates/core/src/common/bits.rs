//! Power-of-two validation and address-field decoding.
//!
//! Every level of the hierarchy (TLB, page table, L1, L2) decodes a 32-bit
//! address into `(tag, index, offset)` fields whose widths are derived from
//! configured sizes via `log2`. This module centralizes that arithmetic so
//! the decode is identical at every level, as required by the inclusion
//! invariant.

/// Returns `log2(n)` for a power-of-two `n`, or `None` if `n` is zero or not
/// a power of two.
#[must_use]
pub fn log2(n: usize) -> Option<u32> {
    if n == 0 || !n.is_power_of_two() {
        return None;
    }
    Some(n.trailing_zeros())
}

/// The `(tag, index, offset)` bit widths for one level of a set-associative
/// structure, plus the pre-computed masks used to decode an address.
#[derive(Clone, Copy, Debug)]
pub struct Decode {
    offset_bits: u32,
    index_bits: u32,
    offset_mask: u32,
    index_mask: u32,
}

impl Decode {
    /// Builds the decode constants for a structure with `num_sets` sets of
    /// `unit_bytes`-byte units (a cache line, or a page).
    ///
    /// Both must be powers of two; `num_sets == 1` degenerates to fully
    /// associative (no index bits), which is the page-table/TLB-by-vpage
    /// case when modeled as a single set.
    #[must_use]
    pub fn new(num_sets: usize, unit_bytes: usize) -> Option<Self> {
        let offset_bits = log2(unit_bytes)?;
        let index_bits = log2(num_sets)?;
        let offset_mask = if offset_bits >= 32 {
            u32::MAX
        } else {
            (1u32 << offset_bits) - 1
        };
        let index_mask = if index_bits >= 32 {
            u32::MAX
        } else {
            (1u32 << index_bits) - 1
        };
        Some(Self {
            offset_bits,
            index_bits,
            offset_mask,
            index_mask,
        })
    }

    /// Splits `addr` into `(tag, index, offset)`.
    #[must_use]
    pub fn split(&self, addr: u32) -> (u32, usize, u32) {
        let offset = addr & self.offset_mask;
        let index = (addr >> self.offset_bits) & self.index_mask;
        let tag = addr >> (self.offset_bits + self.index_bits);
        (tag, index as usize, offset)
    }

    /// Reconstructs the base address (offset `0`) of the line/page
    /// identified by `(tag, index)`.
    #[must_use]
    pub fn reconstruct(&self, tag: u32, index: usize) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let index = index as u32;
        (tag << (self.offset_bits + self.index_bits)) | (index << self.offset_bits)
    }

    /// Number of bytes covered by one unit (line or page) at this level.
    #[must_use]
    pub fn unit_bytes(&self) -> u32 {
        1u32 << self.offset_bits
    }

    /// Number of offset bits (`log2(unit_bytes)`).
    #[must_use]
    pub fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    /// Reconstructs the unit index (page number, or line number within the
    /// address space) identified by `(tag, index)` — `reconstruct` shifted
    /// left by `offset_bits`.
    #[must_use]
    pub fn unit_index(&self, tag: u32, index: usize) -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let index = index as u32;
        (tag << self.index_bits) | index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log2_rejects_non_power_of_two() {
        assert_eq!(log2(0), None);
        assert_eq!(log2(3), None);
        assert_eq!(log2(1), Some(0));
        assert_eq!(log2(64), Some(6));
    }

    #[test]
    fn decode_round_trips_tag_and_index() {
        let d = Decode::new(4, 8).unwrap();
        let (tag, index, offset) = d.split(0x1A7);
        assert_eq!((tag, index, offset), (13, 0, 7));
        assert_eq!(d.reconstruct(tag, index), 0x1A0);
    }

    #[test]
    fn direct_mapped_has_no_way_bits_but_full_index() {
        let d = Decode::new(1, 4).unwrap();
        let (tag, index, _) = d.split(0x20);
        assert_eq!(index, 0);
        assert_eq!(tag, 0x8);
    }
}
