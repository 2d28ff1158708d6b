//! A single set-associative cache level (L1 or L2).
//!
//! A `Cache` knows nothing about its neighbors in the hierarchy — no `next`
//! or `prev` pointers. It exposes `read`/`write_hit`/`install`/
//! `invalidate_range`, each operating purely on its own sets, and leaves
//! all cross-level sequencing (fill-on-miss, writeback propagation,
//! inclusion back-invalidation) to the orchestrator in
//! [`super::Hierarchy`], which is the only thing that knows the topology.
//! This is the "one unified access path regardless of associativity" design:
//! direct-mapped (`set_size == 1`) and fully-associative (`num_sets == 1`)
//! are just the extremes of the same set-associative code path.

use crate::common::bits::Decode;
use crate::common::LruSet;
use crate::config::{SetAssocConfig, WriteConfig, WriteMissPolicy, WritePolicy};

#[derive(Debug, Clone, Copy, Default)]
struct Line {
    tag: u32,
    valid: bool,
    dirty: bool,
}

/// Per-cache access counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Every `read` or `write_hit` call.
    pub total_accesses: u64,
    /// `read` calls.
    pub reads: u64,
    /// `write_hit` calls.
    pub writes: u64,
    /// Accesses that found a valid matching line.
    pub hits: u64,
    /// Times this cache had to go to the next level down (or main memory,
    /// if this is the outermost configured level).
    pub mem_accesses: u64,
}

impl CacheStats {
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

/// A line displaced from a set, carrying whatever the caller needs to
/// propagate a writeback: its full address and whether it held unwritten
/// data.
#[derive(Debug, Clone, Copy)]
pub struct Eviction {
    /// The evicted line's base address (offset `0`).
    pub address: u32,
    /// Whether the line's data differed from the next level's copy.
    pub dirty: bool,
}

/// A set-associative cache of line metadata — no line contents, only
/// tag/valid/dirty per the data model's non-goal of not storing real data.
#[derive(Debug)]
pub struct Cache {
    decode: Decode,
    sets: Vec<LruSet<Line>>,
    write: WriteConfig,
    /// Access counters; public so the orchestrator can drive stats that
    /// only it has the topology knowledge to attribute correctly (e.g. a
    /// writeback that terminates at this level because there is no next).
    pub stats: CacheStats,
}

impl Cache {
    /// Builds a cache from validated geometry and write policy.
    ///
    /// # Panics
    ///
    /// Panics if `config`'s sizes are not powers of two — callers must
    /// validate configuration before construction.
    #[must_use]
    pub fn new(config: SetAssocConfig, write: WriteConfig) -> Self {
        let decode = Decode::new(config.num_sets, config.line_size)
            .expect("cache geometry must be power-of-two validated before construction");
        let sets = (0..config.num_sets)
            .map(|_| LruSet::new(config.set_size))
            .collect();
        Self {
            decode,
            sets,
            write,
            stats: CacheStats::default(),
        }
    }

    /// Bytes covered by one line.
    #[must_use]
    pub fn line_size(&self) -> u32 {
        self.decode.unit_bytes()
    }

    /// This cache's configured write-propagation policy.
    #[must_use]
    pub fn write_policy(&self) -> WritePolicy {
        self.write.policy
    }

    /// This cache's configured write-miss policy.
    #[must_use]
    pub fn write_miss_policy(&self) -> WriteMissPolicy {
        self.write.miss_policy
    }

    fn find_way(&self, index: usize, tag: u32) -> Option<usize> {
        self.sets[index].find(|line| line.valid && line.tag == tag)
    }

    /// Looks up `addr` as a read. On hit, touches the way and returns
    /// `true`; on miss, returns `false` with no further effect.
    pub fn read(&mut self, addr: u32) -> bool {
        let (tag, index, _) = self.decode.split(addr);
        self.stats.total_accesses += 1;
        self.stats.reads += 1;
        match self.find_way(index, tag) {
            Some(way) => {
                self.stats.hits += 1;
                self.sets[index].touch(way);
                true
            }
            None => false,
        }
    }

    /// Looks up `addr` as a write. On hit, marks the line dirty if this
    /// cache is write-back (write-through caches forward every write
    /// regardless of hit/miss, so the forwarding is the orchestrator's job,
    /// not this method's).
    ///
    /// `update_lru` is `false` for writeback propagation calls, which must
    /// not disturb recency order — an automatic writeback is not a real
    /// access from the CPU's perspective.
    pub fn write_hit(&mut self, addr: u32, update_lru: bool) -> bool {
        let (tag, index, _) = self.decode.split(addr);
        self.stats.total_accesses += 1;
        self.stats.writes += 1;
        match self.find_way(index, tag) {
            Some(way) => {
                self.stats.hits += 1;
                if update_lru {
                    self.sets[index].touch(way);
                }
                if self.write.policy == WritePolicy::WriteBack {
                    self.sets[index].get_mut(way).dirty = true;
                }
                true
            }
            None => false,
        }
    }

    /// Chooses a way for `addr` without mutating anything: an invalid way
    /// nearest the LRU end if one exists, else the LRU way (which will be
    /// evicted).
    pub(crate) fn plan_install(&self, addr: u32) -> (usize, Option<Eviction>) {
        let (_, index, _) = self.decode.split(addr);
        let set = &self.sets[index];
        if let Some(way) = set.find_from_lru(|line| !line.valid) {
            return (way, None);
        }
        let way = set.peek_lru_id();
        let line = set.get(way);
        let evicted = if line.valid {
            Some(Eviction {
                address: self.decode.reconstruct(line.tag, index),
                dirty: line.dirty,
            })
        } else {
            None
        };
        (way, evicted)
    }

    /// Writes `{tag, valid:true, dirty}` into `way` for `addr` and touches
    /// it. Must be called with the `way` from a matching [`Self::plan_install`]
    /// on the same `addr`, with no mutation of that set in between.
    pub(crate) fn commit_install(&mut self, addr: u32, way: usize, dirty: bool) {
        let (tag, index, _) = self.decode.split(addr);
        *self.sets[index].get_mut(way) = Line { tag, valid: true, dirty };
        self.sets[index].touch(way);
    }

    /// Installs a line for `addr`, evicting if necessary. Returns the
    /// evicted line, if any, for the caller to writeback.
    pub fn install(&mut self, addr: u32, dirty: bool) -> Option<Eviction> {
        let (way, evicted) = self.plan_install(addr);
        self.commit_install(addr, way, dirty);
        evicted
    }

    /// Invalidates every valid line whose address falls in
    /// `[low, high]` (inclusive), rounding both bounds down to a line
    /// boundary. Returns the evicted lines so the caller can propagate
    /// writebacks for the dirty ones.
    pub fn invalidate_range(&mut self, low: u32, high: u32) -> Vec<Eviction> {
        let line_bytes = u64::from(self.line_size());
        let mut addr = u64::from(low) - u64::from(low) % line_bytes;
        let high = u64::from(high);
        let mut evictions = Vec::new();

        while addr <= high {
            #[allow(clippy::cast_possible_truncation)]
            let (tag, index, _) = self.decode.split(addr as u32);
            if let Some(way) = self.find_way(index, tag) {
                let line = *self.sets[index].get(way);
                *self.sets[index].get_mut(way) = Line::default();
                if line.dirty {
                    #[allow(clippy::cast_possible_truncation)]
                    evictions.push(Eviction {
                        address: addr as u32,
                        dirty: true,
                    });
                }
            }
            addr += line_bytes;
        }
        evictions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{WriteMissPolicy, WritePolicy};

    fn write_through() -> WriteConfig {
        WriteConfig {
            policy: WritePolicy::WriteThrough,
            miss_policy: WriteMissPolicy::NoWriteAllocate,
        }
    }

    fn write_back() -> WriteConfig {
        WriteConfig {
            policy: WritePolicy::WriteBack,
            miss_policy: WriteMissPolicy::WriteAllocate,
        }
    }

    fn geometry(num_sets: usize, set_size: usize, line_size: usize) -> SetAssocConfig {
        SetAssocConfig { num_sets, set_size, line_size }
    }

    #[test]
    fn cold_access_is_a_miss() {
        let mut cache = Cache::new(geometry(1, 2, 4), write_through());
        assert!(!cache.read(0x00));
        assert_eq!(cache.stats.misses(), 1);
    }

    #[test]
    fn installed_line_is_a_subsequent_hit() {
        let mut cache = Cache::new(geometry(1, 2, 4), write_through());
        assert!(!cache.read(0x00));
        cache.install(0x00, false);
        assert!(cache.read(0x00));
        assert_eq!(cache.stats.hits, 1);
    }

    #[test]
    fn s1_lru_eviction_order() {
        // 1 set, 2 ways, line_size 4: addresses 0x00, 0x10, 0x20 all map
        // to the same set with distinct tags.
        let mut cache = Cache::new(geometry(1, 2, 4), write_through());
        for addr in [0x00, 0x10] {
            cache.read(addr);
            cache.install(addr, false);
        }
        // Third miss evicts 0x00 (LRU): 0x00 was touched first, 0x10 second.
        assert!(!cache.read(0x20));
        let evicted = cache.install(0x20, false);
        assert_eq!(evicted.map(|e| e.address), Some(0x00));

        assert!(!cache.read(0x00), "0x00 was evicted");
        assert!(cache.read(0x10), "0x10 is still resident");
    }

    #[test]
    fn write_back_hit_marks_dirty_without_forwarding() {
        let mut cache = Cache::new(geometry(1, 1, 4), write_back());
        cache.install(0x00, false);
        assert!(cache.write_hit(0x00, true));
        assert_eq!(cache.stats.mem_accesses, 0);
    }

    #[test]
    fn invalidate_range_collects_dirty_evictions() {
        let mut cache = Cache::new(geometry(1, 1, 4), write_back());
        cache.install(0x00, true);
        let evictions = cache.invalidate_range(0x00, 0x03);
        assert_eq!(evictions.len(), 1);
        assert!(evictions[0].dirty);
        assert!(!cache.read(0x00));
    }

    #[test]
    fn invalidate_range_spans_multiple_lines() {
        let mut cache = Cache::new(geometry(1, 4, 4), write_back());
        cache.install(0x00, true);
        cache.install(0x04, false);
        cache.install(0x08, true);
        let evictions = cache.invalidate_range(0x00, 0x0F);
        assert_eq!(evictions.iter().filter(|e| e.dirty).count(), 2);
        assert!(!cache.read(0x00) && !cache.read(0x04) && !cache.read(0x08));
    }
}
