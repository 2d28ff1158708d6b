//! The coupled TLB / page-table / cache-hierarchy simulator.
//!
//! [`Hierarchy`] is the orchestrator: it owns the TLB, page table, L1 data
//! cache, and optional L2 cache outright and is the only thing that knows
//! how they are wired together. None of the four structures holds a
//! reference to any other — every cross-level effect (translation fan-out
//! on a page fault, fill-on-miss, writeback propagation, inclusion
//! back-invalidation) is sequenced here.

pub mod allocator;
pub mod cache;
pub mod page_table;
pub mod tlb;
pub mod trace;

use crate::config::{HierarchyConfig, WritePolicy};
use cache::{Cache, Eviction};
use page_table::PageTable;
use tlb::Tlb;
use trace::{Access, AccessType};

/// Owns every structure in the memory hierarchy and sequences accesses
/// through them.
#[derive(Debug)]
pub struct Hierarchy {
    config: HierarchyConfig,
    tlb: Option<Tlb>,
    page_table: PageTable,
    l1: Cache,
    l2: Option<Cache>,
}

impl Hierarchy {
    /// Builds every structure named by `config`.
    #[must_use]
    pub fn new(config: HierarchyConfig) -> Self {
        let tlb = config.use_tlb.then(|| Tlb::new(config.tlb, config.page_table.page_size));
        let page_table = PageTable::new(config.page_table);
        let l1 = Cache::new(config.dc, config.dc_write);
        let l2 = config.use_l2.then(|| Cache::new(config.l2, config.l2_write));
        Self { config, tlb, page_table, l1, l2 }
    }

    /// Read-only access to the L1 data cache's counters.
    #[must_use]
    pub fn l1_stats(&self) -> &cache::CacheStats {
        &self.l1.stats
    }

    /// Read-only access to the L2 cache's counters, if one is configured.
    #[must_use]
    pub fn l2_stats(&self) -> Option<&cache::CacheStats> {
        self.l2.as_ref().map(|l2| &l2.stats)
    }

    /// Read-only access to the TLB's counters, if one is configured.
    #[must_use]
    pub fn tlb_stats(&self) -> Option<&tlb::TlbStats> {
        self.tlb.as_ref().map(|t| &t.stats)
    }

    /// Read-only access to the page table's counters.
    #[must_use]
    pub fn page_table_stats(&self) -> &page_table::PageTableStats {
        &self.page_table.stats
    }

    /// The address-space limit this trace's addresses are checked against:
    /// physical addresses are bounded by the physical frame count, virtual
    /// addresses by the virtual page count.
    #[must_use]
    pub fn address_limit(&self) -> u64 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_lossless)]
        let page_size = self.config.page_table.page_size as u64;
        let pages = if self.config.virtual_addresses {
            self.config.page_table.num_vpages
        } else {
            self.config.page_table.num_ppages
        };
        page_size * pages as u64
    }

    /// Resolves `addr` from the trace to a physical address, translating
    /// through the TLB and/or page table if the trace carries virtual
    /// addresses, and fanning out invalidation if doing so faults.
    ///
    /// Returns `(paddr, tlb_hit, page_table_hit)`: either flag is `None` if
    /// that structure was not configured or not consulted (a TLB hit never
    /// reaches the page table).
    fn resolve(&mut self, addr: u32, is_write: bool) -> (u32, Option<bool>, Option<bool>) {
        if !self.config.virtual_addresses {
            return (addr, None, None);
        }

        if let Some(tlb) = &mut self.tlb {
            if let Some(ppage) = tlb.lookup(addr) {
                let offset_mask = self.page_table.page_size() - 1;
                let paddr = (ppage << self.page_table.page_size().trailing_zeros()) | (addr & offset_mask);
                return (paddr, Some(true), None);
            }
        }

        let hits_before = self.page_table.stats.hits;
        let translation = self.page_table.translate(addr, is_write);
        let page_table_hit = self.page_table.stats.hits > hits_before;
        if let Some(fault) = translation.fault {
            self.fan_out_fault(fault.ppage);
        }
        let tlb_hit = if let Some(tlb) = &mut self.tlb {
            let ppage = translation.paddr >> self.page_table.page_size().trailing_zeros();
            tlb.install(addr, ppage);
            Some(false)
        } else {
            None
        };
        (translation.paddr, tlb_hit, Some(page_table_hit))
    }

    /// Invalidates every structure that could still reference `evicted_ppage`
    /// now that the page table has reused it for a different mapping —
    /// regardless of whether the evicted page was dirty, since what changed
    /// is the frame's *mapping*, not merely its content.
    fn fan_out_fault(&mut self, evicted_ppage: u32) {
        if let Some(tlb) = &mut self.tlb {
            tlb.invalidate_ppage(evicted_ppage);
        }
        let page_size = self.page_table.page_size();
        let low = evicted_ppage * page_size;
        let high = low + page_size - 1;
        self.invalidate_page_range(low, high);
    }

    /// Invalidates `[low, high]` across the cache hierarchy, inward (L1)
    /// before outward (L2), propagating dirty data up as it goes.
    fn invalidate_page_range(&mut self, low: u32, high: u32) {
        let l1_evictions = self.l1.invalidate_range(low, high);
        for eviction in l1_evictions {
            if eviction.dirty {
                self.writeback_to_l2_or_memory(eviction);
            }
        }
        if let Some(l2) = &mut self.l2 {
            for eviction in l2.invalidate_range(low, high) {
                if eviction.dirty {
                    l2.stats.mem_accesses += 1;
                }
            }
        }
    }

    /// Propagates one dirty line evicted from L1 to L2 (if present) or
    /// counts a direct memory write (if L1 is the outermost level).
    fn writeback_to_l2_or_memory(&mut self, eviction: Eviction) {
        if let Some(l2) = &mut self.l2 {
            let hit = l2.write_hit(eviction.address, false);
            debug_assert!(hit, "inclusion violated: L1 held a line absent from L2");
            if l2.write_policy() == WritePolicy::WriteThrough {
                l2.stats.mem_accesses += 1;
            }
        } else {
            self.l1.stats.mem_accesses += 1;
        }
    }

    /// Fills L2 for `addr` on an L1 miss (or a write-through forward that
    /// must reach L2), ensuring the line is resident and enforcing
    /// inclusion if doing so evicts another L2 line. Returns whether L2
    /// already held the line.
    fn l2_read_with_fill(&mut self, addr: u32) -> bool {
        let Some(l2) = &mut self.l2 else { return false };
        if l2.read(addr) {
            return true;
        }
        l2.stats.mem_accesses += 1;
        self.l2_install_with_inclusion(addr, false);
        false
    }

    /// Installs `addr` into L2, invalidating any L1 lines covering an
    /// evicted L2 line's range *before* L2 discards it (inclusion
    /// back-invalidation, §4.5's "prev-first" rule).
    fn l2_install_with_inclusion(&mut self, addr: u32, dirty: bool) {
        let Some((way, evicted, line_size)) = self.l2.as_ref().map(|l2| {
            let (way, evicted) = l2.plan_install(addr);
            (way, evicted, l2.line_size())
        }) else {
            return;
        };

        let mut any_dirty = false;
        if let Some(ev) = evicted {
            any_dirty = ev.dirty;
            let high = ev.address + line_size - 1;
            for eviction in self.l1.invalidate_range(ev.address, high) {
                any_dirty |= eviction.dirty;
            }
        }

        let l2 = self.l2.as_mut().expect("presence checked above");
        if any_dirty {
            l2.stats.mem_accesses += 1;
        }
        l2.commit_install(addr, way, dirty);
    }

    /// Reads `paddr` through L1, then L2, then memory, installing as it
    /// goes so inclusion holds afterward. Returns `(l1_hit, l2_hit)`.
    fn cache_read(&mut self, paddr: u32) -> (bool, Option<bool>) {
        if self.l1.read(paddr) {
            return (true, None);
        }
        let l2_hit = if self.l2.is_some() {
            Some(self.l2_read_with_fill(paddr))
        } else {
            self.l1.stats.mem_accesses += 1;
            None
        };
        if let Some(eviction) = self.l1.install(paddr, false) {
            if eviction.dirty {
                self.writeback_to_l2_or_memory(eviction);
            }
        }
        (false, l2_hit)
    }

    /// Writes `paddr` through L1, propagating to L2/memory per the
    /// configured write and write-miss policy. Returns `(l1_hit, l2_hit)`.
    fn cache_write(&mut self, paddr: u32) -> (bool, Option<bool>) {
        let hit = self.l1.write_hit(paddr, true);
        match self.l1.write_policy() {
            WritePolicy::WriteBack => {
                let l2_hit = if hit {
                    None
                } else {
                    let l2_hit = if self.l2.is_some() {
                        Some(self.l2_read_with_fill(paddr))
                    } else {
                        self.l1.stats.mem_accesses += 1;
                        None
                    };
                    if let Some(eviction) = self.l1.install(paddr, true) {
                        if eviction.dirty {
                            self.writeback_to_l2_or_memory(eviction);
                        }
                    }
                    l2_hit
                };
                (hit, l2_hit)
            }
            WritePolicy::WriteThrough => {
                let l2_hit = self.propagate_write_to_l2_or_memory(paddr);
                (hit, l2_hit)
            }
        }
    }

    /// Forwards a write-through write to L2 (or straight to memory if
    /// there is no L2). Returns L2's hit/miss, or `None` if L2 is absent.
    fn propagate_write_to_l2_or_memory(&mut self, addr: u32) -> Option<bool> {
        let Some(l2) = self.l2.as_mut() else {
            self.l1.stats.mem_accesses += 1;
            return None;
        };
        let hit = l2.write_hit(addr, true);
        match l2.write_policy() {
            WritePolicy::WriteThrough => {
                l2.stats.mem_accesses += 1;
            }
            WritePolicy::WriteBack => {
                if !hit {
                    l2.stats.mem_accesses += 1;
                    self.l2_install_with_inclusion(addr, true);
                }
            }
        }
        Some(hit)
    }

    /// Processes one trace reference end to end: translation (if
    /// configured), then the cache hierarchy, reporting what happened at
    /// every level consulted.
    pub fn access(&mut self, access: Access) -> AccessOutcome {
        let is_write = access.kind == AccessType::Write;
        let (paddr, tlb_hit, page_table_hit) = self.resolve(access.address, is_write);
        let (l1_hit, l2_hit) = match access.kind {
            AccessType::Read => self.cache_read(paddr),
            AccessType::Write => self.cache_write(paddr),
        };
        AccessOutcome { paddr, tlb_hit, page_table_hit, l1_hit, l2_hit }
    }
}

/// What happened at each level consulted while resolving one trace
/// reference, for callers (the CLI's per-reference table) that need more
/// than the cumulative counters in [`cache::CacheStats`] /
/// [`tlb::TlbStats`] / [`page_table::PageTableStats`].
#[derive(Debug, Clone, Copy)]
pub struct AccessOutcome {
    /// The resolved physical address.
    pub paddr: u32,
    /// `Some(hit)` if a TLB is configured and addresses are virtual.
    pub tlb_hit: Option<bool>,
    /// `Some(hit)` if the page table was consulted this access (virtual
    /// addressing on, and either no TLB or the TLB missed).
    pub page_table_hit: Option<bool>,
    /// Whether L1 resolved the reference without consulting L2/memory.
    pub l1_hit: bool,
    /// `Some(hit)` if L2 is configured and was consulted this access.
    pub l2_hit: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PageTableConfig, SetAssocConfig, WriteConfig, WriteMissPolicy};

    fn write_through() -> WriteConfig {
        WriteConfig { policy: WritePolicy::WriteThrough, miss_policy: WriteMissPolicy::NoWriteAllocate }
    }

    fn write_back() -> WriteConfig {
        WriteConfig { policy: WritePolicy::WriteBack, miss_policy: WriteMissPolicy::WriteAllocate }
    }

    fn config(use_tlb: bool, use_l2: bool, dc_write: WriteConfig, l2_write: WriteConfig) -> HierarchyConfig {
        HierarchyConfig {
            tlb: SetAssocConfig { num_sets: 1, set_size: 2, line_size: 1 },
            page_table: PageTableConfig { num_vpages: 4, num_ppages: 2, page_size: 16 },
            dc: SetAssocConfig { num_sets: 1, set_size: 2, line_size: 8 },
            dc_write,
            l2: SetAssocConfig { num_sets: 1, set_size: 2, line_size: 16 },
            l2_write,
            virtual_addresses: use_tlb,
            use_tlb,
            use_l2,
        }
    }

    #[test]
    fn s4_write_through_no_allocate_does_not_install() {
        let mut h = Hierarchy::new(config(false, true, write_through(), write_back()));
        let _ = h.access(Access { kind: AccessType::Write, address: 0x00 });
        assert_eq!(h.l1_stats().hits, 0);
        assert_eq!(h.l1_stats().misses(), 1);
        // Write-through forwards to L2, which is cold too and forwards to memory.
        assert_eq!(h.l2_stats().unwrap().mem_accesses, 1);
    }

    #[test]
    fn s2_inclusion_back_invalidate() {
        // L1 = 1 set x 2 ways x 8B; L2 = 1 set x 2 ways x 16B; write-back everywhere.
        let mut h = Hierarchy::new(config(false, true, write_back(), write_back()));
        let _ = h.access(Access { kind: AccessType::Write, address: 0x00 });
        let _ = h.access(Access { kind: AccessType::Write, address: 0x40 });
        let _ = h.access(Access { kind: AccessType::Write, address: 0x80 });

        // 0x00 (line 0x00-0x07) should be gone from L1 now, since its
        // covering L2 line (0x00-0x0F) was the LRU L2 resident evicted to
        // make room for 0x80's line.
        assert!(!h.l1.read(0x00));
        assert!(h.l1.read(0x40) || h.l1.read(0x80));
    }

    #[test]
    fn use_tlb_but_no_l2_routes_straight_to_memory_on_miss() {
        let mut h = Hierarchy::new(config(true, false, write_back(), write_back()));
        let _ = h.access(Access { kind: AccessType::Read, address: 0x00 });
        assert_eq!(h.tlb_stats().unwrap().total_accesses, 1);
        assert_eq!(h.page_table_stats().total_accesses, 1);
        assert_eq!(h.l1_stats().mem_accesses, 1);
    }

    #[test]
    fn write_through_with_no_l2_counts_a_memory_ref_per_write() {
        let mut h = Hierarchy::new(config(false, false, write_through(), write_through()));
        let _ = h.access(Access { kind: AccessType::Write, address: 0x00 });
        let _ = h.access(Access { kind: AccessType::Write, address: 0x00 });
        assert_eq!(h.l1_stats().mem_accesses, 2, "every write-through write must reach memory when there is no L2");
    }
}
