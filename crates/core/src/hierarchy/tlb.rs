//! Set-associative, per-set LRU translation lookaside buffer.
//!
//! Diverges from a direct-mapped TLB on purpose: this simulator's TLB has
//! the same associativity and LRU-replacement structure as a data cache,
//! just with a one-field payload (a cached `vpage -> ppage` mapping)
//! instead of cache-line metadata.

use crate::common::bits::Decode;
use crate::common::LruSet;
use crate::config::SetAssocConfig;

#[derive(Debug, Clone, Copy, Default)]
struct TlbEntry {
    tag: u32,
    ppage: u32,
    valid: bool,
}

/// TLB access counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TlbStats {
    /// Every translation attempted through the TLB.
    pub total_accesses: u64,
    /// Translations resolved without consulting the page table.
    pub hits: u64,
}

impl TlbStats {
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

/// A set-associative cache of `(vpage -> ppage)` mappings.
#[derive(Debug)]
pub struct Tlb {
    decode: Decode,
    sets: Vec<LruSet<TlbEntry>>,
    /// Access counters.
    pub stats: TlbStats,
}

impl Tlb {
    /// Builds a TLB with `config`'s geometry, decoding vpages against
    /// `page_size`.
    ///
    /// # Panics
    ///
    /// Panics if `config.num_sets`/`config.set_size`/`page_size` are not
    /// powers of two — callers must validate configuration first.
    #[must_use]
    pub fn new(config: SetAssocConfig, page_size: usize) -> Self {
        let decode = Decode::new(config.num_sets, page_size)
            .expect("TLB geometry must be power-of-two validated before construction");
        let sets = (0..config.num_sets)
            .map(|_| LruSet::new(config.set_size))
            .collect();
        Self {
            decode,
            sets,
            stats: TlbStats::default(),
        }
    }

    /// Looks up the physical page for `vaddr`. On hit, touches the way and
    /// returns its `ppage`.
    pub fn lookup(&mut self, vaddr: u32) -> Option<u32> {
        let (tag, index, _) = self.decode.split(vaddr);
        self.stats.total_accesses += 1;
        let way = self.sets[index].find(|e| e.valid && e.tag == tag)?;
        self.stats.hits += 1;
        self.sets[index].touch(way);
        Some(self.sets[index].get(way).ppage)
    }

    /// Installs `vaddr -> ppage` after a miss, evicting an LRU entry (or
    /// filling an invalid one) as needed.
    pub fn install(&mut self, vaddr: u32, ppage: u32) {
        let (tag, index, _) = self.decode.split(vaddr);
        let set = &self.sets[index];
        let way = set
            .find_from_lru(|e| !e.valid)
            .unwrap_or_else(|| set.peek_lru_id());
        *self.sets[index].get_mut(way) = TlbEntry { tag, ppage, valid: true };
        self.sets[index].touch(way);
    }

    /// Invalidates every entry mapping `ppage`, without disturbing recency
    /// order — these frames are gone, not merely unused.
    pub fn invalidate_ppage(&mut self, ppage: u32) {
        for set in &mut self.sets {
            for id in 0..set.capacity() {
                let entry = set.get_mut(id);
                if entry.valid && entry.ppage == ppage {
                    entry.valid = false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tlb() -> Tlb {
        Tlb::new(SetAssocConfig { num_sets: 2, set_size: 2, line_size: 1 }, 16)
    }

    #[test]
    fn miss_then_install_then_hit() {
        let mut t = tlb();
        assert_eq!(t.lookup(0x00), None);
        t.install(0x00, 5);
        assert_eq!(t.lookup(0x00), Some(5));
        assert_eq!(t.stats.hits, 1);
    }

    #[test]
    fn invalidate_ppage_clears_matching_entries_only() {
        let mut t = tlb();
        t.install(0x00, 5);
        t.install(0x10, 6);
        t.invalidate_ppage(5);
        assert_eq!(t.lookup(0x00), None);
        assert_eq!(t.lookup(0x10), Some(6));
    }
}
