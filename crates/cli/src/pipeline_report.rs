//! The `pipeline` subcommand: config echo, per-instruction timing table,
//! and the final delay-totals block, modeled on `tomasulo/mine`'s
//! `config_print`/`main` output.

use std::io::BufRead;

use memhier_core::config::PipelineConfig;
use memhier_core::pipeline::trace::parse_line;
use memhier_core::Scheduler;

use crate::error::CliError;

/// Echoes the parsed configuration, matching the field order and labels of
/// the text format it was read from.
pub fn print_config(config: &PipelineConfig) {
    println!("Configuration");
    println!("-------------");
    println!("buffers:");
    println!("   eff addr: {}", config.eff_addr_buf);
    println!("    fp adds: {}", config.fp_adds_buf);
    println!("    fp muls: {}", config.fp_muls_buf);
    println!("       ints: {}", config.ints_buf);
    println!("    reorder: {}", config.reorder_buf);
    println!();
    println!("latencies:");
    println!("   fp add: {}", config.fp_add_lat);
    println!("   fp sub: {}", config.fp_sub_lat);
    println!("   fp mul: {}", config.fp_mul_lat);
    println!("   fp div: {}", config.fp_div_lat);
    println!();
}

/// Runs the pipeline scheduler against `config`, reading trace lines from
/// `reader`, and printing the instruction timing table followed by the
/// delay-totals block.
///
/// # Errors
///
/// Returns [`CliError::Trace`] if the trace cannot be read.
pub fn run(config: PipelineConfig, reader: impl std::io::Read) -> Result<(), CliError> {
    print_config(&config);

    let mut scheduler = Scheduler::new(config);

    let mut seen_lines = 0u64;
    let mut accepted_lines = 0u64;

    for (line_no, line) in std::io::BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        seen_lines += 1;
        let instr = match parse_line(line_no + 1, &line) {
            Ok(instr) => instr,
            Err(err) => {
                tracing::warn!("{err}");
                continue;
            }
        };
        accepted_lines += 1;
        let _ = scheduler.schedule(instr);
    }

    print_table(&scheduler);
    print_delays(&scheduler);

    if seen_lines > 0 && accepted_lines == 0 {
        return Err(CliError::Sim(memhier_core::SimError::TraceEmpty));
    }
    Ok(())
}

fn print_table(scheduler: &Scheduler) {
    println!("                    Pipeline Simulation");
    println!("-----------------------------------------------------------");
    println!("                                    Memory Writes");
    println!("     Instruction      Issues Executes  Read  Result Commits");
    println!("--------------------- ------ -------- ------ ------ -------");

    for instr in scheduler.history() {
        let stats = &instr.stats;
        println!(
            "{:<21} {:>6} {:>3} -{:<3} {:>6} {:>6} {:>7}",
            instr.text,
            stats.issue,
            stats.execute_start,
            stats.execute_end,
            stats.mem_read,
            stats.cdb_write,
            stats.commit,
        );
    }
}

fn print_delays(scheduler: &Scheduler) {
    println!("\n\nDelays\n------");
    println!("reorder buffer delays: {}", scheduler.stats.reorder_buffer_delays);
    println!(
        "reservation station delays: {}",
        scheduler.stats.reservation_station_delays
    );
    println!(
        "data memory conflict delays: {}",
        scheduler.stats.data_memory_conflict_delays
    );
    println!("true dependence delays: {}", scheduler.stats.true_dependence_delays);
}
