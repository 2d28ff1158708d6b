//! The `hierarchy` subcommand: config echo, per-reference table, and final
//! summary block, modeled on `memhier`'s `print_config`/`main` output.

use std::fmt::Write as _;
use std::io::BufRead;

use memhier_core::common::bits::{log2, Decode};
use memhier_core::config::{HierarchyConfig, WritePolicy};
use memhier_core::hierarchy::trace::{check_in_range, parse_line};
use memhier_core::Hierarchy;

use crate::error::CliError;

/// Echoes the parsed configuration, matching the field order and labels of
/// the text format it was read from.
pub fn print_config(config: &HierarchyConfig) {
    println!("Data TLB configuration");
    println!("\tNumber of sets: {}", config.tlb.num_sets);
    println!("\tSet size: {}\n", config.tlb.set_size);

    println!("Page Table configuration");
    println!("\tNumber of virtual pages: {}", config.page_table.num_vpages);
    println!("\tNumber of physical pages: {}", config.page_table.num_ppages);
    println!("\tPage size: {}\n", config.page_table.page_size);

    println!("Data Cache configuration");
    println!("\tNumber of sets: {}", config.dc.num_sets);
    println!("\tSet size: {}", config.dc.set_size);
    println!("\tLine size: {}", config.dc.line_size);
    println!("\tWrite through/no write allocate: {}\n", yn(config.dc_write.policy == WritePolicy::WriteThrough));

    println!("L2 Cache configuration");
    println!("\tNumber of sets: {}", config.l2.num_sets);
    println!("\tSet size: {}", config.l2.set_size);
    println!("\tLine size: {}", config.l2.line_size);
    println!("\tWrite through/no write allocate: {}\n", yn(config.l2_write.policy == WritePolicy::WriteThrough));

    println!("Toggles");
    println!("\tVirtual addresses: {}", yn(config.virtual_addresses));
    println!("\tTLB: {}", yn(config.use_tlb));
    println!("\tL2: {}\n", yn(config.use_l2));
}

fn yn(b: bool) -> char {
    if b { 'y' } else { 'n' }
}

fn hit_label(hit: Option<bool>) -> &'static str {
    match hit {
        Some(true) => "hit",
        Some(false) => "miss",
        None => "-",
    }
}

/// Runs the hierarchy simulator against `config`, reading a `R:<hex>`/
/// `W:<hex>` trace from `reader` and printing the per-reference table
/// followed by the summary block.
///
/// # Errors
///
/// Returns [`CliError::Trace`] if stdin cannot be read.
pub fn run(config: HierarchyConfig, reader: impl std::io::Read) -> Result<(), CliError> {
    print_config(&config);

    let tlb_decode = config.use_tlb.then(|| Decode::new(config.tlb.num_sets, config.page_table.page_size)).flatten();
    let dc_decode =
        Decode::new(config.dc.num_sets, config.dc.line_size).expect("dc geometry validated by HierarchyConfig::validate");
    let l2_decode = config.use_l2.then(|| Decode::new(config.l2.num_sets, config.l2.line_size)).flatten();
    let page_offset_bits = log2(config.page_table.page_size);

    let mut hierarchy = Hierarchy::new(config);
    let limit = hierarchy.address_limit();
    print_header(&config);

    let mut seen_lines = 0u64;
    let mut accepted_lines = 0u64;

    for (line_no, line) in std::io::BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        seen_lines += 1;
        let access = match parse_line(line_no + 1, &line) {
            Ok(access) => access,
            Err(err) => {
                tracing::warn!("{err}");
                continue;
            }
        };
        if let Err(err) = check_in_range(line_no + 1, access.address, limit) {
            tracing::warn!("{err}");
            continue;
        }
        accepted_lines += 1;

        let outcome = hierarchy.access(access);
        let mut row = String::new();
        let _ = write!(row, "{:08x}", access.address);

        if config.virtual_addresses {
            if let Some(offset_bits) = page_offset_bits {
                let vpage = access.address >> offset_bits;
                let offset = access.address & ((1u32 << offset_bits) - 1);
                let _ = write!(row, " {vpage:6x} {offset:4x}");
            }
        }

        if let Some(decode) = &tlb_decode {
            let (tag, index, _) = decode.split(access.address);
            let _ = write!(row, " {tag:6x} {index:3x} {:4}", hit_label(outcome.tlb_hit));
        }
        if config.virtual_addresses {
            let _ = write!(row, " {:4}", hit_label(outcome.page_table_hit));
            if let Some(offset_bits) = page_offset_bits {
                let ppage = outcome.paddr >> offset_bits;
                let _ = write!(row, " {ppage:4x}");
            }
        }

        let (dc_tag, dc_index, _) = dc_decode.split(outcome.paddr);
        let _ = write!(row, " {dc_tag:6x} {dc_index:3x} {:4}", hit_label(Some(outcome.l1_hit)));

        if let (Some(decode), Some(l2_hit)) = (&l2_decode, outcome.l2_hit) {
            let (l2_tag, l2_index, _) = decode.split(outcome.paddr);
            let _ = write!(row, " {l2_tag:6x} {l2_index:3x} {:4}", hit_label(Some(l2_hit)));
        }

        println!("{row}");
    }

    print_summary(&hierarchy);

    if seen_lines > 0 && accepted_lines == 0 {
        return Err(CliError::Sim(memhier_core::SimError::TraceEmpty));
    }
    Ok(())
}

fn print_header(config: &HierarchyConfig) {
    let mut header = String::from("Address");
    if config.virtual_addresses {
        header.push_str("  VPage Offset");
    }
    if config.use_tlb {
        header.push_str(" TLBTag Idx Res.");
    }
    if config.virtual_addresses {
        header.push_str(" PTRes PPage");
    }
    header.push_str(" DCTag Idx Res.");
    if config.use_l2 {
        header.push_str(" L2Tag Idx Res.");
    }
    println!("{header}");
    println!("{}", "-".repeat(header.len()));
}

fn print_summary(hierarchy: &Hierarchy) {
    println!("\nSimulation statistics\n");

    if let Some(tlb) = hierarchy.tlb_stats() {
        println!("dtlb hits        : {}", tlb.hits);
        println!("dtlb misses      : {}", tlb.misses());
        println!("dtlb hit ratio   : {}", tlb.hit_ratio());
    } else {
        println!("dtlb hits        : 0");
        println!("dtlb misses      : 0");
        println!("dtlb hit ratio   : N/A");
    }
    println!();

    let pt = hierarchy.page_table_stats();
    if pt.total_accesses > 0 {
        println!("pt hits          : {}", pt.hits);
        println!("pt faults        : {}", pt.misses());
        println!("pt hit ratio     : {}", pt.hit_ratio());
    } else {
        println!("pt hits          : 0");
        println!("pt faults        : 0");
        println!("pt hit ratio     : N/A");
    }
    println!();

    let dc = hierarchy.l1_stats();
    println!("dc hits          : {}", dc.hits);
    println!("dc misses        : {}", dc.misses());
    println!("dc hit ratio     : {}", dc.hit_ratio());
    println!();

    if let Some(l2) = hierarchy.l2_stats() {
        println!("L2 hits          : {}", l2.hits);
        println!("L2 misses        : {}", l2.misses());
        println!("L2 hit ratio     : {}", l2.hit_ratio());
    } else {
        println!("L2 hits          : 0");
        println!("L2 misses        : 0");
        println!("L2 hit ratio     : N/A");
    }
    println!();

    let writes = dc.writes;
    let reads = dc.reads;
    println!("Total reads      : {reads}");
    println!("Total writes     : {writes}");
    #[allow(clippy::cast_precision_loss)]
    let ratio = if reads + writes == 0 { 0.0 } else { reads as f64 / (reads + writes) as f64 };
    println!("Ratio of reads   : {ratio}");
    println!();

    let memory_refs = hierarchy.l2_stats().map_or(dc.mem_accesses, |l2| l2.mem_accesses);
    println!("main memory refs : {memory_refs}");
    println!("page table refs  : {}", pt.total_accesses);
    println!("disk refs        : {}", pt.disk_accesses);
}
