//! Config parsing exercised through a real filesystem path, rather than the
//! in-module unit tests' in-memory `&[u8]` reader.

use std::io::Write as _;

use memhier_core::config::{HierarchyConfig, PipelineConfig, WriteMissPolicy, WritePolicy};
use tempfile::NamedTempFile;

const HIERARCHY_TEXT: &str = "\
Data TLB configuration
Number of sets: 2
Set size: 2

Page Table configuration
Number of virtual pages: 16
Number of physical pages: 8
Page size: 16

Data Cache configuration
Number of sets: 4
Set size: 2
Line size: 8
Write through/no write allocate: y

L2 Cache configuration
Number of sets: 4
Set size: 4
Line size: 16
Write through/no write allocate: n

Toggles
Virtual addresses: y
TLB: y
L2: y
";

const PIPELINE_TEXT: &str = "\
Configuration
-------------
buffers:
   eff addr: 3
    fp adds: 3
    fp muls: 2
       ints: 5
    reorder: 6

latencies:
   fp_add: 2
   fp_sub: 2
   fp_mul: 10
   fp_div: 40
";

#[test]
fn hierarchy_config_round_trips_through_a_real_file() {
    let mut file = NamedTempFile::new().expect("create temp config file");
    file.write_all(HIERARCHY_TEXT.as_bytes()).expect("write config text");
    file.flush().expect("flush config text");

    let reopened = std::fs::File::open(file.path()).expect("reopen config file");
    let config = HierarchyConfig::parse(reopened).expect("parse config file");

    assert_eq!(config.tlb.num_sets, 2);
    assert_eq!(config.page_table.num_ppages, 8);
    assert_eq!(config.dc.line_size, 8);
    assert_eq!(config.dc_write.policy, WritePolicy::WriteThrough);
    assert_eq!(config.l2_write.miss_policy, WriteMissPolicy::WriteAllocate);
    assert!(config.virtual_addresses && config.use_tlb && config.use_l2);
}

#[test]
fn pipeline_config_round_trips_through_a_real_file() {
    let mut file = NamedTempFile::new().expect("create temp config file");
    file.write_all(PIPELINE_TEXT.as_bytes()).expect("write config text");
    file.flush().expect("flush config text");

    let reopened = std::fs::File::open(file.path()).expect("reopen config file");
    let config = PipelineConfig::parse(reopened).expect("parse config file");

    assert_eq!(config.eff_addr_buf, 3);
    assert_eq!(config.reorder_buf, 6);
    assert_eq!(config.fp_mul_lat, 10);
    assert_eq!(config.fp_div_lat, 40);
}

#[test]
fn a_file_missing_its_expected_labels_is_rejected() {
    let mut file = NamedTempFile::new().expect("create temp config file");
    file.write_all(b"not a config file at all\n").expect("write garbage");
    file.flush().expect("flush garbage");

    let reopened = std::fs::File::open(file.path()).expect("reopen config file");
    assert!(HierarchyConfig::parse(reopened).is_err());
}
