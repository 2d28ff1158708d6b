//! The Tomasulo/reorder-buffer pipeline timing scheduler.
//!
//! [`Scheduler::schedule`] is the whole contract: given the next
//! instruction in program order, it fills in all six timing fields using
//! only the state accumulated from previously-scheduled instructions —
//! reservation-station occupancy, reorder-buffer depth, and the CDB/memory
//! port's reserved cycles.

pub mod bitset;
pub mod instruction;
pub mod reservation;
pub mod rob;
pub mod trace;

use crate::config::PipelineConfig;
use bitset::CycleBitSet;
use instruction::{Instruction, OpType, Operand, RsPool};
use reservation::ReservationStations;
use rob::ReorderBuffer;

/// The four delay categories the scheduler attributes stalls to.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerStats {
    /// Issue delayed because the reorder buffer was full.
    pub reorder_buffer_delays: u64,
    /// Issue delayed because no reservation station was free.
    pub reservation_station_delays: u64,
    /// A `LOAD`'s memory access delayed by a port already in use.
    pub data_memory_conflict_delays: u64,
    /// Execution (or a `LOAD`'s memory access) delayed by a true RAW
    /// dependence on an in-flight producer.
    pub true_dependence_delays: u64,
}

/// Owns every reservation-station pool, the reorder buffer, and the
/// CDB/memory-port cycle bitsets, and sequences one instruction's
/// scheduling at a time.
#[derive(Debug)]
pub struct Scheduler {
    config: PipelineConfig,
    eff_addr: ReservationStations,
    ints: ReservationStations,
    fp_muls: ReservationStations,
    fp_adds: ReservationStations,
    rob: ReorderBuffer,
    cdb: CycleBitSet,
    mem_port: CycleBitSet,
    history: Vec<Instruction>,
    prev_issue: u64,
    prev_commit: u64,
    /// Accumulated delay totals.
    pub stats: SchedulerStats,
}

impl Scheduler {
    /// Builds a scheduler from validated buffer capacities and latencies.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            eff_addr: ReservationStations::new(config.eff_addr_buf),
            ints: ReservationStations::new(config.ints_buf),
            fp_muls: ReservationStations::new(config.fp_muls_buf),
            fp_adds: ReservationStations::new(config.fp_adds_buf),
            rob: ReorderBuffer::new(config.reorder_buf),
            cdb: CycleBitSet::new(),
            mem_port: CycleBitSet::new(),
            history: Vec::new(),
            prev_issue: 0,
            prev_commit: 0,
            config,
            stats: SchedulerStats::default(),
        }
    }

    /// Every instruction scheduled so far, in program order, with its final
    /// timing.
    #[must_use]
    pub fn history(&self) -> &[Instruction] {
        &self.history
    }

    fn station_for(&mut self, op_type: OpType) -> &mut ReservationStations {
        match op_type.rs_pool() {
            RsPool::EffAddr => &mut self.eff_addr,
            RsPool::Ints => &mut self.ints,
            RsPool::FpMuls => &mut self.fp_muls,
            RsPool::FpAdds => &mut self.fp_adds,
        }
    }

    fn latency(&self, op_type: OpType) -> u64 {
        match op_type {
            OpType::Store | OpType::Load | OpType::Add | OpType::Sub | OpType::Branch => 1,
            #[allow(clippy::cast_possible_truncation)]
            OpType::Fadd => self.config.fp_add_lat as u64,
            #[allow(clippy::cast_possible_truncation)]
            OpType::Fsub => self.config.fp_sub_lat as u64,
            #[allow(clippy::cast_possible_truncation)]
            OpType::Fmul => self.config.fp_mul_lat as u64,
            #[allow(clippy::cast_possible_truncation)]
            OpType::Fdiv => self.config.fp_div_lat as u64,
        }
    }

    /// Schedules `instr` against everything scheduled before it, filling in
    /// its timing fields and returning it.
    #[allow(clippy::too_many_lines)]
    pub fn schedule(&mut self, mut instr: Instruction) -> Instruction {
        let window_start = self.history.len().saturating_sub(self.config.reorder_buf);
        let window = &self.history[window_start..];

        // Step 1: issue.
        let candidate_issue = self.prev_issue + 1;

        let mut rob_delay = 0u64;
        if self.rob.is_full() {
            if let Some(freed_at) = self.rob.pop() {
                let freed_issue = freed_at + 1;
                if freed_issue > candidate_issue {
                    rob_delay = freed_issue - candidate_issue;
                }
            }
        }

        let (rs_slot, rs_avail) = self.station_for(instr.op_type).peek();
        let mut rs_delay = 0u64;
        if rs_avail >= candidate_issue {
            let avail_issue = rs_avail + 1;
            if avail_issue > candidate_issue {
                rs_delay = avail_issue - candidate_issue;
            }
        }

        let issue = if rs_delay > rob_delay {
            self.stats.reservation_station_delays += rs_delay;
            candidate_issue + rs_delay
        } else {
            self.stats.reorder_buffer_delays += rob_delay;
            candidate_issue + rob_delay
        };
        instr.stats.issue = issue;

        // Step 2: execute_start, driven by true RAW dependence on op2 (and,
        // for non-load/store, op3).
        let candidate_exec = issue + 1;
        let exec_sources: Vec<Operand> = match instr.op_type {
            OpType::Store | OpType::Load => instr.addr_base.into_iter().collect(),
            _ => [instr.src1, instr.src2].into_iter().flatten().collect(),
        };
        let dep_cycle = exec_sources
            .iter()
            .filter(|operand| !is_integer_zero(**operand))
            .filter_map(|operand| find_producer(window, *operand))
            .map(|producer| producer.stats.cdb_write)
            .max()
            .unwrap_or(0);
        let exec_start = if dep_cycle > 0 {
            let demanded = dep_cycle + 1;
            if demanded > candidate_exec {
                self.stats.true_dependence_delays += demanded - candidate_exec;
                demanded
            } else {
                candidate_exec
            }
        } else {
            candidate_exec
        };
        instr.stats.execute_start = exec_start;

        // Step 3: execute_end.
        let execute_end = exec_start - 1 + self.latency(instr.op_type);
        instr.stats.execute_end = execute_end;

        // Step 4: mem_read (LOAD only), ordered behind any prior STORE to
        // the same register-and-fp-ness still in flight.
        let mem_read = if instr.op_type == OpType::Load {
            let mut candidate = execute_end + 1;
            if let Some(dest) = instr.dest {
                if let Some(store) = find_store_producer(window, dest) {
                    if store.stats.commit > candidate {
                        self.stats.true_dependence_delays += store.stats.commit - candidate;
                        candidate = store.stats.commit;
                    }
                }
            }
            let reserved = self.mem_port.insert(candidate);
            if reserved > candidate {
                self.stats.data_memory_conflict_delays += reserved - candidate;
            }
            reserved
        } else {
            0
        };
        instr.stats.mem_read = mem_read;

        // Step 5: release the functional unit.
        let release_cycle = if instr.op_type == OpType::Load { mem_read } else { execute_end };
        self.station_for(instr.op_type).occupy_until(rs_slot, release_cycle);

        // Step 6: cdb_write.
        let cdb_write = match instr.op_type {
            OpType::Store | OpType::Branch => 0,
            _ => {
                let from = if mem_read > 0 { mem_read } else { execute_end } + 1;
                self.cdb.insert(from)
            }
        };
        instr.stats.cdb_write = cdb_write;

        // Step 7: commit.
        let projected_commit = cdb_write + 1;
        let next_avail_commit = self.prev_commit + 1;
        let commit = next_avail_commit.max(projected_commit);
        instr.stats.commit = commit;
        if instr.op_type == OpType::Store {
            self.mem_port.reserve(commit);
        }

        // Step 8.
        self.rob.push(commit);

        self.prev_issue = issue;
        self.prev_commit = commit;
        self.history.push(instr.clone());
        instr
    }
}

/// `x0`, the integer file's hardwired zero register, is a constant: a
/// dependence search must never wait on it even if some earlier instruction
/// (wrongly) targeted it as a destination.
fn is_integer_zero(operand: Operand) -> bool {
    !operand.fp && operand.reg == 0
}

/// The most recent instruction in `window` whose destination is `operand`.
/// `STORE`s never match: they don't produce a register value.
fn find_producer(window: &[Instruction], operand: Operand) -> Option<&Instruction> {
    window
        .iter()
        .rev()
        .find(|candidate| candidate.op_type != OpType::Store && candidate.dest == Some(operand))
}

/// The most recent `STORE` in `window` whose value register is `operand` —
/// the memory-ordering check `mem_read` uses to keep a `LOAD` behind a
/// same-register `STORE` still in flight.
fn find_store_producer(window: &[Instruction], operand: Operand) -> Option<&Instruction> {
    window
        .iter()
        .rev()
        .find(|candidate| candidate.op_type == OpType::Store && candidate.store_value == Some(operand))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::trace::parse_line;

    fn config(fp_adds_buf: usize, reorder_buf: usize) -> PipelineConfig {
        PipelineConfig {
            eff_addr_buf: 2,
            fp_adds_buf,
            fp_muls_buf: 2,
            ints_buf: 2,
            reorder_buf,
            fp_add_lat: 2,
            fp_sub_lat: 2,
            fp_mul_lat: 10,
            fp_div_lat: 40,
        }
    }

    #[test]
    fn s5_scheduler_raw_dependence() {
        let mut scheduler = Scheduler::new(config(2, 8));
        let i1 = scheduler.schedule(parse_line(1, "fadd f1,f2,f3").unwrap());
        assert_eq!(i1.stats.issue, 1);
        assert_eq!(i1.stats.execute_start, 2);
        assert_eq!(i1.stats.execute_end, 3);
        assert_eq!(i1.stats.cdb_write, 4);
        assert_eq!(i1.stats.commit, 5);

        let i2 = scheduler.schedule(parse_line(2, "fadd f4,f1,f5").unwrap());
        assert_eq!(i2.stats.issue, 2);
        assert_eq!(i2.stats.execute_start, 5);
        assert_eq!(i2.stats.execute_end, 6);
        assert_eq!(i2.stats.cdb_write, 7);
        assert_eq!(i2.stats.commit, 8);
        assert_eq!(scheduler.stats.true_dependence_delays, 2);
    }

    #[test]
    fn s6_rob_saturation_delays_the_third_issue() {
        let mut scheduler = Scheduler::new(config(2, 2));
        let ops = ["add x1,x2,x3", "add x4,x2,x3", "add x5,x2,x3", "add x6,x2,x3"];
        let mut issues = Vec::new();
        let mut commits = Vec::new();
        for (i, op) in ops.iter().enumerate() {
            let instr = scheduler.schedule(parse_line(i, op).unwrap());
            issues.push(instr.stats.issue);
            commits.push(instr.stats.commit);
        }
        assert_eq!(issues[0], 1);
        assert_eq!(issues[2], commits[0] + 1);
        assert!(scheduler.stats.reorder_buffer_delays > 0);
    }

    #[test]
    fn invariant_7_commit_is_monotonic_and_after_cdb() {
        let mut scheduler = Scheduler::new(config(2, 8));
        let mut prev_commit = 0;
        for (i, op) in ["add x1,x2,x3", "sub x4,x1,x2", "add x5,x4,x1"].iter().enumerate() {
            let instr = scheduler.schedule(parse_line(i, op).unwrap());
            assert!(instr.stats.issue < instr.stats.execute_start);
            assert!(instr.stats.execute_start <= instr.stats.execute_end);
            if instr.stats.cdb_write > 0 {
                assert!(instr.stats.cdb_write >= instr.stats.execute_end + 1);
                assert!(instr.stats.commit >= instr.stats.cdb_write + 1);
            }
            assert!(instr.stats.commit >= prev_commit + 1);
            prev_commit = instr.stats.commit;
        }
    }

    #[test]
    fn x0_is_a_constant_with_no_producer() {
        let mut scheduler = Scheduler::new(config(2, 8));
        let i1 = scheduler.schedule(parse_line(1, "add x0,x2,x3").unwrap());
        assert_eq!(i1.stats.execute_start, i1.stats.issue + 1);
        // A later instruction reading x0 must not wait on i1's cdb_write,
        // even though i1 (incorrectly, in source terms) targeted x0.
        let i2 = scheduler.schedule(parse_line(2, "add x4,x0,x5").unwrap());
        assert_eq!(i2.stats.execute_start, i2.stats.issue + 1);
        assert_eq!(scheduler.stats.true_dependence_delays, 0);
    }
}
