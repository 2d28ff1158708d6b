//! Parses pipeline trace lines into [`Instruction`]s.
//!
//! Three shapes, tried in order: load/store (has `(` and `:`), then
//! arithmetic vs. branch disambiguated by whether the third comma-separated
//! field parses as a register (arithmetic) or is a label (branch).

use super::instruction::{Instruction, InstrStats, OpType, Operand};
use crate::common::error::{TraceLineError, TraceLineErrorKind};

/// Parses one pipeline trace line.
///
/// # Errors
///
/// Returns [`TraceLineError`] if the line matches none of the three
/// recognized shapes, or a register/address field fails to parse.
pub fn parse_line(line_no: usize, line: &str) -> Result<Instruction, TraceLineError> {
    let line = line.trim();
    let malformed = || TraceLineError {
        line_no,
        reason: TraceLineErrorKind::Malformed(line.to_owned()),
    };

    let (opcode, rest) = line.split_once(' ').ok_or_else(malformed)?;
    let fp = opcode.starts_with('f');

    if let Some((before_colon, addr_str)) = rest.split_once(':') {
        return parse_load_store(line, line_no, opcode, before_colon, addr_str, fp);
    }

    let parts: Vec<&str> = rest.split(',').map(str::trim).collect();
    let [p0, p1, p2] = parts.as_slice() else {
        return Err(malformed());
    };

    if let Some(rs2) = parse_register(p2) {
        parse_arithmetic(line, line_no, opcode, p0, p1, rs2, fp)
    } else {
        parse_branch(line, line_no, p0, p1)
    }
}

fn parse_load_store(
    text: &str,
    line_no: usize,
    opcode: &str,
    before_colon: &str,
    addr_str: &str,
    fp: bool,
) -> Result<Instruction, TraceLineError> {
    let malformed = || TraceLineError {
        line_no,
        reason: TraceLineErrorKind::Malformed(text.to_owned()),
    };

    let op_type = load_store_kind(opcode).ok_or_else(|| TraceLineError {
        line_no,
        reason: TraceLineErrorKind::UnknownOpcode(opcode.to_owned()),
    })?;
    let (rd_str, rest) = before_colon.split_once(',').ok_or_else(malformed)?;
    let (_imm, rs1_paren) = rest.split_once('(').ok_or_else(malformed)?;
    let rs1_str = rs1_paren.strip_suffix(')').ok_or_else(malformed)?;

    let rd = parse_register(rd_str).ok_or_else(malformed)?;
    let rs1 = parse_register(rs1_str).ok_or_else(malformed)?;
    let address = addr_str.trim().parse::<u32>().map_err(|_| malformed())?;

    let rd_operand = Operand { reg: rd, fp };
    let base_operand = Operand { reg: rs1, fp: false };
    let (dest, store_value) = match op_type {
        OpType::Load => (Some(rd_operand), None),
        OpType::Store => (None, Some(rd_operand)),
        _ => unreachable!("load_store_kind only returns Load or Store"),
    };

    Ok(Instruction {
        text: text.to_owned(),
        op_type,
        fp,
        dest,
        addr_base: Some(base_operand),
        store_value,
        src1: None,
        src2: None,
        address: Some(address),
        stats: InstrStats::default(),
    })
}

fn parse_arithmetic(
    text: &str,
    line_no: usize,
    opcode: &str,
    rd_str: &str,
    rs1_str: &str,
    rs2: u32,
    fp: bool,
) -> Result<Instruction, TraceLineError> {
    let malformed = || TraceLineError {
        line_no,
        reason: TraceLineErrorKind::Malformed(text.to_owned()),
    };
    let op_type = arithmetic_kind(opcode).ok_or_else(|| TraceLineError {
        line_no,
        reason: TraceLineErrorKind::UnknownOpcode(opcode.to_owned()),
    })?;
    let rd = parse_register(rd_str).ok_or_else(malformed)?;
    let rs1 = parse_register(rs1_str).ok_or_else(malformed)?;

    Ok(Instruction {
        text: text.to_owned(),
        op_type,
        fp,
        dest: Some(Operand { reg: rd, fp }),
        addr_base: None,
        store_value: None,
        src1: Some(Operand { reg: rs1, fp }),
        src2: Some(Operand { reg: rs2, fp }),
        address: None,
        stats: InstrStats::default(),
    })
}

fn parse_branch(
    text: &str,
    line_no: usize,
    rs1_str: &str,
    rs2_str: &str,
) -> Result<Instruction, TraceLineError> {
    let malformed = || TraceLineError {
        line_no,
        reason: TraceLineErrorKind::Malformed(text.to_owned()),
    };
    let rs1 = parse_register(rs1_str).ok_or_else(malformed)?;
    let rs2 = parse_register(rs2_str).ok_or_else(malformed)?;

    Ok(Instruction {
        text: text.to_owned(),
        op_type: OpType::Branch,
        fp: false,
        dest: None,
        addr_base: None,
        store_value: None,
        src1: Some(Operand { reg: rs1, fp: false }),
        src2: Some(Operand { reg: rs2, fp: false }),
        address: None,
        stats: InstrStats::default(),
    })
}

/// Strips a one-character register-file prefix (`x`/`f`) and parses the rest.
fn parse_register(token: &str) -> Option<u32> {
    if token.len() < 2 {
        return None;
    }
    token[1..].parse().ok()
}

/// `lw`/`flw` → `Load`; `sw`/`fsw` → `Store`; anything else isn't a
/// recognized load/store opcode.
fn load_store_kind(opcode: &str) -> Option<OpType> {
    let bytes = opcode.as_bytes();
    if bytes.len() < 2 || bytes[bytes.len() - 1] != b'w' {
        return None;
    }
    match bytes[bytes.len() - 2] {
        b's' => Some(OpType::Store),
        b'l' => Some(OpType::Load),
        _ => None,
    }
}

fn arithmetic_kind(opcode: &str) -> Option<OpType> {
    match opcode {
        "add" => Some(OpType::Add),
        "sub" => Some(OpType::Sub),
        "fadd" => Some(OpType::Fadd),
        "fsub" => Some(OpType::Fsub),
        "fmul" => Some(OpType::Fmul),
        "fdiv" => Some(OpType::Fdiv),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_load() {
        let instr = parse_line(1, "lw x5,100(x2):1040").unwrap();
        assert_eq!(instr.op_type, OpType::Load);
        assert!(!instr.fp);
        assert_eq!(instr.dest, Some(Operand { reg: 5, fp: false }));
        assert_eq!(instr.addr_base, Some(Operand { reg: 2, fp: false }));
        assert_eq!(instr.address, Some(1040));
    }

    #[test]
    fn parses_a_floating_store() {
        let instr = parse_line(1, "fsw f3,0(x4):2000").unwrap();
        assert_eq!(instr.op_type, OpType::Store);
        assert!(instr.fp);
        assert_eq!(instr.store_value, Some(Operand { reg: 3, fp: true }));
        assert_eq!(instr.addr_base, Some(Operand { reg: 4, fp: false }));
        assert_eq!(instr.dest, None);
    }

    #[test]
    fn parses_arithmetic() {
        let instr = parse_line(1, "fadd f1,f2,f3").unwrap();
        assert_eq!(instr.op_type, OpType::Fadd);
        assert_eq!(instr.dest, Some(Operand { reg: 1, fp: true }));
        assert_eq!(instr.src1, Some(Operand { reg: 2, fp: true }));
        assert_eq!(instr.src2, Some(Operand { reg: 3, fp: true }));
    }

    #[test]
    fn parses_a_branch() {
        let instr = parse_line(1, "beq x5,x6,loop1").unwrap();
        assert_eq!(instr.op_type, OpType::Branch);
        assert_eq!(instr.dest, None);
        assert_eq!(instr.src1, Some(Operand { reg: 5, fp: false }));
        assert_eq!(instr.src2, Some(Operand { reg: 6, fp: false }));
    }

    #[test]
    fn rejects_unrecognized_shape() {
        assert!(parse_line(1, "nop").is_err());
    }
}
