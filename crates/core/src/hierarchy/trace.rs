//! Parses memory-hierarchy trace lines of the form `R:<hex>` / `W:<hex>`.
//!
//! Malformed lines and out-of-range addresses are reported as
//! [`TraceLineError`], not propagated as fatal errors — the orchestrator's
//! run loop warns and skips them, per the non-fatal trace-line error
//! category.

use crate::common::error::{TraceLineError, TraceLineErrorKind};

/// Whether a trace line reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    /// `R:<hex>`
    Read,
    /// `W:<hex>`
    Write,
}

/// One parsed trace reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    /// Read or write.
    pub kind: AccessType,
    /// The referenced address, at most 32 bits wide.
    pub address: u32,
}

/// Parses one trace line, rejecting anything that is not `R:<hex>` or
/// `W:<hex>`, or whose address does not fit in 32 bits.
///
/// `line_no` is carried through into the error purely for diagnostics.
///
/// # Errors
///
/// Returns [`TraceLineError`] describing why the line was rejected.
pub fn parse_line(line_no: usize, line: &str) -> Result<Access, TraceLineError> {
    let line = line.trim();
    let malformed = || TraceLineError {
        line_no,
        reason: TraceLineErrorKind::Malformed(line.to_owned()),
    };

    let (prefix, hex) = line.split_once(':').ok_or_else(malformed)?;
    let kind = match prefix {
        "R" => AccessType::Read,
        "W" => AccessType::Write,
        _ => return Err(malformed()),
    };
    let address = u32::from_str_radix(hex.trim(), 16).map_err(|_| malformed())?;

    Ok(Access { kind, address })
}

/// Checks `address` against the bound implied by the configured address
/// space (`page_size * num_pages`, where `num_pages` is vpages or ppages
/// depending on whether the trace carries virtual or physical addresses).
///
/// # Errors
///
/// Returns [`TraceLineError::AddressOutOfRange`] if `address >= limit`.
pub fn check_in_range(line_no: usize, address: u32, limit: u64) -> Result<(), TraceLineError> {
    if u64::from(address) >= limit {
        return Err(TraceLineError {
            line_no,
            reason: TraceLineErrorKind::AddressOutOfRange { address: u64::from(address), limit },
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_read_and_write_lines() {
        assert_eq!(
            parse_line(1, "R:1A").unwrap(),
            Access { kind: AccessType::Read, address: 0x1A }
        );
        assert_eq!(
            parse_line(2, "W:ff00").unwrap(),
            Access { kind: AccessType::Write, address: 0xff00 }
        );
    }

    #[test]
    fn rejects_unknown_prefix() {
        assert!(parse_line(1, "X:10").is_err());
    }

    #[test]
    fn rejects_non_hex_address() {
        assert!(parse_line(1, "R:zz").is_err());
    }

    #[test]
    fn range_check_rejects_addresses_at_or_past_the_limit() {
        assert!(check_in_range(1, 0x100, 0x100).is_err());
        assert!(check_in_range(1, 0xff, 0x100).is_ok());
    }
}
