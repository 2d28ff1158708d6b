//! The demand-paged page table: a forward `vpage -> ppage` map plus an
//! inverse `ppage -> vpage` map kept as the payload of the frame
//! allocator's LRU set.
//!
//! This is the component the rest of the hierarchy hangs off of: every
//! page fault here is what drives TLB invalidation and cache-line
//! invalidation fan-out, via the [`Fault`] it reports back to the
//! orchestrator (the page table holds no reference to the TLB or caches
//! itself).

use crate::common::LruSet;
use crate::config::PageTableConfig;
use crate::hierarchy::allocator::FrameAllocator;

#[derive(Debug, Clone, Copy, Default)]
struct ForwardEntry {
    ppage: u32,
    valid: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct InverseEntry {
    vpage: u32,
    valid: bool,
    dirty: bool,
}

/// Page-table access counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageTableStats {
    /// Every translation presented to the page table (TLB misses only, if
    /// a TLB is configured; every reference otherwise).
    pub total_accesses: u64,
    /// Translations resolved without a page fault.
    pub hits: u64,
    /// Page faults that required a disk reference: one for the fault
    /// itself, plus one more if the evicted frame was dirty.
    pub disk_accesses: u64,
}

impl PageTableStats {
    /// `total_accesses - hits`.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.total_accesses - self.hits
    }

    /// `hits / total_accesses`, or `0.0` if there were no accesses.
    #[must_use]
    pub fn hit_ratio(&self) -> f64 {
        if self.total_accesses == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let (hits, total) = (self.hits as f64, self.total_accesses as f64);
            hits / total
        }
    }
}

/// Reports that resolving a page fault reused a physical frame previously
/// bound to another page, which the orchestrator must now unmap elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct Fault {
    /// The frame that was reused.
    pub ppage: u32,
    /// Whether the frame's previous occupant had unwritten data — if so,
    /// every cache line mapping it must be flushed, not merely dropped.
    pub evicted_dirty: bool,
}

/// The result of a translation: the physical address, and a page fault
/// report if one occurred.
#[derive(Debug, Clone, Copy)]
pub struct Translation {
    /// The resolved physical address.
    pub paddr: u32,
    /// Present if resolving this translation evicted another page.
    pub fault: Option<Fault>,
}

/// Demand-paged virtual memory: forward map, inverse map, and the frame
/// allocator that arbitrates which physical frame a fault gets.
#[derive(Debug)]
pub struct PageTable {
    offset_bits: u32,
    forward: Vec<ForwardEntry>,
    inverse: LruSet<InverseEntry>,
    allocator: FrameAllocator,
    /// Access counters.
    pub stats: PageTableStats,
}

impl PageTable {
    /// Builds a page table from validated geometry.
    ///
    /// # Panics
    ///
    /// Panics if `config.page_size` is not a power of two.
    #[must_use]
    pub fn new(config: PageTableConfig) -> Self {
        let offset_bits = crate::common::bits::log2(config.page_size)
            .expect("page size must be power-of-two validated before construction");
        Self {
            offset_bits,
            forward: vec![ForwardEntry::default(); config.num_vpages],
            inverse: LruSet::new(config.num_ppages),
            allocator: FrameAllocator::new(config.num_ppages),
            stats: PageTableStats::default(),
        }
    }

    /// Splits a virtual address into `(vpage, offset)`.
    #[must_use]
    pub fn decompose(&self, vaddr: u32) -> (usize, u32) {
        let offset_mask = (1u32 << self.offset_bits) - 1;
        #[allow(clippy::cast_possible_truncation)]
        let vpage = (vaddr >> self.offset_bits) as usize;
        (vpage, vaddr & offset_mask)
    }

    /// Bytes per page.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        1u32 << self.offset_bits
    }

    /// Resolves `vaddr` to a physical address, handling page faults.
    ///
    /// Matches the algorithm in order: forward-map hit short-circuits;
    /// otherwise the allocator is consulted, the fault is recorded (and
    /// reported to the caller if it reused a frame), the forward/inverse
    /// entries are bound, the dirty bit is set for writes, and the frame is
    /// touched MRU regardless of which path was taken.
    pub fn translate(&mut self, vaddr: u32, is_write: bool) -> Translation {
        let (vpage, offset) = self.decompose(vaddr);
        self.stats.total_accesses += 1;

        let mut fault = None;
        let ppage = if self.forward[vpage].valid {
            self.stats.hits += 1;
            self.forward[vpage].ppage
        } else {
            self.stats.disk_accesses += 1;
            let (ppage, evicted) = self.allocator.acquire();
            if let Some(evicted_ppage) = evicted {
                let evicted_entry = *self.inverse.get(evicted_ppage as usize);
                self.forward[evicted_entry.vpage as usize].valid = false;
                if evicted_entry.dirty {
                    self.stats.disk_accesses += 1;
                }
                fault = Some(Fault {
                    ppage: evicted_ppage,
                    evicted_dirty: evicted_entry.dirty,
                });
            }
            self.forward[vpage] = ForwardEntry { ppage, valid: true };
            *self.inverse.get_mut(ppage as usize) = InverseEntry {
                vpage: vpage_to_u32(vpage),
                valid: true,
                dirty: is_write,
            };
            ppage
        };

        if is_write {
            self.inverse.get_mut(ppage as usize).dirty = true;
        }
        self.allocator.touch(ppage);

        Translation {
            paddr: (ppage << self.offset_bits) | offset,
            fault,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn vpage_to_u32(vpage: usize) -> u32 {
    vpage as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_table() -> PageTable {
        PageTable::new(PageTableConfig { num_vpages: 4, num_ppages: 2, page_size: 16 })
    }

    #[test]
    fn first_access_to_each_vpage_faults_until_frames_run_out() {
        let mut pt = page_table();
        let t0 = pt.translate(0x00, false);
        assert!(t0.fault.is_none());
        let t1 = pt.translate(0x10, false);
        assert!(t1.fault.is_none());
        assert_eq!(pt.stats.disk_accesses, 2);
    }

    #[test]
    fn s3_page_fault_fan_out_evicts_lru_frame() {
        let mut pt = page_table();
        pt.translate(0x00, false); // vp0 -> ppage0
        pt.translate(0x10, false); // vp1 -> ppage1
        // vp0 touched again would keep it MRU; skip, so vp0 is LRU.
        let t2 = pt.translate(0x20, false); // vp2: fault, evicts ppage0 (vp0)
        let fault = t2.fault.expect("third distinct page must evict");
        assert_eq!(fault.ppage, 0);
        assert!(!fault.evicted_dirty);
        assert_eq!(pt.stats.disk_accesses, 3);

        let t0_again = pt.translate(0x00, false);
        assert!(t0_again.fault.is_some(), "vp0 must fault again; its frame was reused");
    }

    #[test]
    fn dirty_eviction_counts_an_extra_disk_access() {
        let mut pt = page_table();
        pt.translate(0x00, true); // dirties ppage0
        pt.translate(0x10, false);
        let t2 = pt.translate(0x20, false);
        let fault = t2.fault.expect("must evict");
        assert!(fault.evicted_dirty);
        // fault itself (+1) and the dirty writeback (+1) on top of the
        // first two cold faults.
        assert_eq!(pt.stats.disk_accesses, 4);
    }
}
