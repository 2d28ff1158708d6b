//! Table-driven coverage of the memory-hierarchy's concrete scenarios
//! (spec §8, S1–S4), parameterized over geometries the in-module unit
//! tests only exercise one instance of.

use memhier_core::config::{
    HierarchyConfig, PageTableConfig, SetAssocConfig, WriteConfig, WriteMissPolicy, WritePolicy,
};
use memhier_core::hierarchy::trace::{Access, AccessType};
use memhier_core::Hierarchy;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn write_through() -> WriteConfig {
    WriteConfig { policy: WritePolicy::WriteThrough, miss_policy: WriteMissPolicy::NoWriteAllocate }
}

fn write_back() -> WriteConfig {
    WriteConfig { policy: WritePolicy::WriteBack, miss_policy: WriteMissPolicy::WriteAllocate }
}

fn physical_only(dc: SetAssocConfig, dc_write: WriteConfig, l2: SetAssocConfig, l2_write: WriteConfig, use_l2: bool) -> HierarchyConfig {
    HierarchyConfig {
        tlb: SetAssocConfig { num_sets: 1, set_size: 1, line_size: 1 },
        page_table: PageTableConfig { num_vpages: 4, num_ppages: 4, page_size: 16 },
        dc,
        dc_write,
        l2,
        l2_write,
        virtual_addresses: false,
        use_tlb: false,
        use_l2,
    }
}

fn read(addr: u32) -> Access {
    Access { kind: AccessType::Read, address: addr }
}

fn write(addr: u32) -> Access {
    Access { kind: AccessType::Write, address: addr }
}

/// S1 — LRU eviction order, generalized across associativities: a set that
/// takes `ways` distinct cold misses, one more distinct address evicts the
/// first one ever touched, and that same address is then re-missable.
#[rstest]
#[case(2, 4)]
#[case(4, 8)]
#[case(8, 4)]
fn s1_lru_eviction_order(#[case] ways: usize, #[case] line_size: usize) {
    let dc = SetAssocConfig { num_sets: 1, set_size: ways, line_size };
    let l2 = SetAssocConfig { num_sets: 1, set_size: 1, line_size };
    let mut h = Hierarchy::new(physical_only(dc, write_through(), l2, write_through(), false));

    let line_bytes = line_size as u32;
    let addrs: Vec<u32> = (0..ways as u32).map(|i| i * line_bytes * 4).collect();
    for &addr in &addrs {
        let _ = h.access(read(addr));
    }
    assert_eq!(h.l1_stats().misses(), ways as u64);

    // One more distinct address forces an eviction; the very first address
    // touched (the LRU one) must be gone afterward.
    let intruder = ways as u32 * line_bytes * 4;
    let _ = h.access(read(intruder));
    let misses_before = h.l1_stats().misses();
    let _ = h.access(read(addrs[0]));
    assert_eq!(h.l1_stats().misses(), misses_before + 1, "the LRU line must have been evicted");
}

/// S2 — inclusion back-invalidation: an L2 eviction must invalidate the
/// covering L1 line first, and count its dirty writeback, across a range
/// of L1/L2 line-size ratios.
#[rstest]
#[case(8, 16)]
#[case(4, 16)]
#[case(8, 32)]
fn s2_inclusion_back_invalidate(#[case] l1_line: usize, #[case] l2_line: usize) {
    let dc = SetAssocConfig { num_sets: 1, set_size: 2, line_size: l1_line };
    let l2 = SetAssocConfig { num_sets: 1, set_size: 2, line_size: l2_line };
    let mut h = Hierarchy::new(physical_only(dc, write_back(), l2, write_back(), true));

    let _ = h.access(write(0x00));
    let _ = h.access(write(l2_line as u32 * 4));
    let _ = h.access(write(l2_line as u32 * 8));

    // The line covering address 0 must have been evicted from L1 by now,
    // since L2 evicted it and the inclusion protocol invalidates L1 first.
    let misses_before = h.l1_stats().misses();
    let _ = h.access(read(0x00));
    assert_eq!(h.l1_stats().misses(), misses_before + 1, "address 0 must have been pushed out of L1");
}

/// S3 — page fault fan-out: once every physical frame is in use, the next
/// distinct virtual page faults and evicts the globally LRU frame,
/// counting one disk access for the fault.
#[rstest]
#[case(2)]
#[case(4)]
#[case(8)]
fn s3_page_fault_fan_out(#[case] num_ppages: usize) {
    let config = HierarchyConfig {
        tlb: SetAssocConfig { num_sets: 1, set_size: 1, line_size: 1 },
        page_table: PageTableConfig { num_vpages: num_ppages * 2, num_ppages, page_size: 16 },
        dc: SetAssocConfig { num_sets: 1, set_size: 2, line_size: 8 },
        dc_write: write_through(),
        l2: SetAssocConfig { num_sets: 1, set_size: 2, line_size: 16 },
        l2_write: write_back(),
        virtual_addresses: true,
        use_tlb: false,
        use_l2: true,
    };
    let mut h = Hierarchy::new(config);

    // Touch every frame once (cold faults), then one more distinct page.
    for vp in 0..num_ppages as u32 {
        let _ = h.access(read(vp * 16));
    }
    assert_eq!(h.page_table_stats().disk_accesses as usize, num_ppages);

    let _ = h.access(read(num_ppages as u32 * 16));
    assert_eq!(
        h.page_table_stats().disk_accesses as usize,
        num_ppages + 1,
        "the extra page must fault exactly once more"
    );
}

/// S4 — write-through/no-allocate: a write miss never installs a line in
/// the writing cache; it always forwards, across both an L2-present and an
/// L2-absent topology.
#[rstest]
#[case(true)]
#[case(false)]
fn s4_write_through_no_allocate(#[case] use_l2: bool) {
    let dc = SetAssocConfig { num_sets: 1, set_size: 2, line_size: 8 };
    let l2 = SetAssocConfig { num_sets: 1, set_size: 2, line_size: 16 };
    let mut h = Hierarchy::new(physical_only(dc, write_through(), l2, write_back(), use_l2));

    let _ = h.access(write(0x00));
    assert_eq!(h.l1_stats().hits, 0);
    assert_eq!(h.l1_stats().misses(), 1);

    // A second write to the same address must still miss: nothing was
    // ever installed.
    let _ = h.access(write(0x00));
    assert_eq!(h.l1_stats().misses(), 2, "no-write-allocate must never install a line");
}
