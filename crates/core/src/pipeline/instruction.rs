//! Instruction records: the parsed shape of one trace line plus the six
//! timing fields the scheduler fills in.

/// The nine instruction classes the scheduler distinguishes. Several share
/// a reservation-station pool and/or a functional-unit latency; see
/// [`OpType::rs_pool`] and [`super::latency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpType {
    /// `sw`/`fsw`.
    Store,
    /// `lw`/`flw`.
    Load,
    /// `add`.
    Add,
    /// `sub`.
    Sub,
    /// `fmul`.
    Fmul,
    /// `fdiv`.
    Fdiv,
    /// `fadd`.
    Fadd,
    /// `fsub`.
    Fsub,
    /// Any conditional branch (`beq`, `bne`, ...).
    Branch,
}

/// The reservation-station pool a given [`OpType`] draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsPool {
    /// Shared by `STORE` and `LOAD`.
    EffAddr,
    /// Shared by `ADD`, `SUB`, and `BRANCH`.
    Ints,
    /// Shared by `FMUL` and `FDIV`.
    FpMuls,
    /// Shared by `FADD` and `FSUB`.
    FpAdds,
}

impl OpType {
    /// The pool this op type draws a reservation-station slot from.
    #[must_use]
    pub fn rs_pool(self) -> RsPool {
        match self {
            Self::Store | Self::Load => RsPool::EffAddr,
            Self::Add | Self::Sub | Self::Branch => RsPool::Ints,
            Self::Fmul | Self::Fdiv => RsPool::FpMuls,
            Self::Fadd | Self::Fsub => RsPool::FpAdds,
        }
    }
}

/// A register reference: a bare number plus which register file it names.
/// Two operands are the "same register" for dependence purposes only if
/// both the number and the file match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    /// The register number.
    pub reg: u32,
    /// `true` for the floating-point file, `false` for the integer file.
    pub fp: bool,
}

/// The six cycle numbers the scheduler assigns to an instruction, in the
/// order they are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstrStats {
    /// Cycle the instruction enters its reservation station.
    pub issue: u64,
    /// Cycle execution begins.
    pub execute_start: u64,
    /// Cycle execution finishes.
    pub execute_end: u64,
    /// Cycle the memory port is used (`LOAD` only; `0` otherwise).
    pub mem_read: u64,
    /// Cycle the result is broadcast on the CDB (`0` for `STORE`/`BRANCH`).
    pub cdb_write: u64,
    /// Cycle the instruction retires.
    pub commit: u64,
}

/// One parsed trace instruction together with its scheduled timing.
///
/// Operand roles are named by what they do rather than by trace position,
/// since the same textual slot means different things per [`OpType`]: a
/// `STORE`'s first register is the value being written, not a destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The trace line, verbatim, for display.
    pub text: String,
    /// The instruction's class.
    pub op_type: OpType,
    /// Whether this instruction operates on the floating-point file
    /// (decided by the opcode's `f` prefix).
    pub fp: bool,
    /// The register this instruction writes, if any (`None` for `STORE`
    /// and `BRANCH`).
    pub dest: Option<Operand>,
    /// The base register used to form a `LOAD`/`STORE`'s effective
    /// address — always the integer file, regardless of `fp`.
    pub addr_base: Option<Operand>,
    /// A `STORE`'s value register (the thing being written to memory),
    /// consulted only for the memory-ordering check in step 4.
    pub store_value: Option<Operand>,
    /// First source operand (`rs1`), for arithmetic ops and branches.
    pub src1: Option<Operand>,
    /// Second source operand (`rs2`), for arithmetic ops and branches.
    pub src2: Option<Operand>,
    /// The effective address a `LOAD`/`STORE` trace line carried. Not
    /// consulted by the scheduler (which tracks dependence through
    /// registers, not addresses), kept for display.
    pub address: Option<u32>,
    /// Scheduled timing, filled in by [`super::Scheduler::schedule`].
    pub stats: InstrStats,
}
