//! Configuration records and the line-oriented config-file reader.
//!
//! Both simulators are configured from small, fixed-format text files —
//! there is no JSON or key=value parser here, just a sequence of labeled
//! lines read in a known order, matching the coursework tools this crate's
//! formats are drawn from. [`HierarchyConfig::parse`] reads the memory
//! hierarchy's six sections (TLB, page table, DC, L2, write policies,
//! toggles); [`PipelineConfig::parse`] reads the scheduler's buffer sizes
//! and latencies.

use crate::common::bits::log2;
use crate::common::error::ConfigError;
use std::io::BufRead;

/// Compile-time limits enforced by [`HierarchyConfig::validate`].
///
/// These bound the simulator's own internal structures (particularly the
/// eager-allocated [`crate::common::LruSet`] backing every set and the
/// physical-frame pool), not anything the trace format itself restricts.
mod limits {
    /// Largest number of TLB sets.
    pub const TLB_MAX_SETS: usize = 256;
    /// Largest number of data-cache (or L2) sets.
    pub const CACHE_MAX_SETS: usize = 8192;
    /// Largest associativity (set size) at any level.
    pub const MAX_ASSOCIATIVITY: usize = 8;
    /// Largest number of virtual pages.
    pub const MAX_VPAGES: usize = 8192;
    /// Largest number of physical pages.
    pub const MAX_PPAGES: usize = 2048;
    /// Smallest allowed data-cache line size, in bytes.
    pub const MIN_LINE_SIZE: usize = 8;
}

/// Whether a cache level writes through to the next level immediately, or
/// defers the write until the line is evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Every write is propagated to the next level as it happens.
    WriteThrough,
    /// Writes are held in the line (marking it dirty) until eviction.
    WriteBack,
}

/// Whether a write miss allocates a line in this cache.
///
/// Hard-coupled to [`WritePolicy`] in this simulator: write-through caches
/// are always no-write-allocate, and write-back caches are always
/// write-allocate. The config file records only one bit per cache
/// (`y` = write-through/no-allocate, `n` = write-back/allocate) because the
/// pairing is fixed, not because the two axes happen to coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMissPolicy {
    /// A write miss does not install a line; the write goes straight through.
    NoWriteAllocate,
    /// A write miss installs the line (fetching it first), then writes into it.
    WriteAllocate,
}

/// The write-through/write-back and allocate/no-allocate pairing read from
/// one `y`/`n` toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteConfig {
    /// The propagation policy.
    pub policy: WritePolicy,
    /// The write-miss policy, always the policy paired with `policy`.
    pub miss_policy: WriteMissPolicy,
}

impl WriteConfig {
    fn from_toggle(write_through: bool) -> Self {
        if write_through {
            Self {
                policy: WritePolicy::WriteThrough,
                miss_policy: WriteMissPolicy::NoWriteAllocate,
            }
        } else {
            Self {
                policy: WritePolicy::WriteBack,
                miss_policy: WriteMissPolicy::WriteAllocate,
            }
        }
    }
}

/// Geometry shared by the TLB, the data cache, and the L2 cache: how many
/// sets, how many ways per set, and (for caches) how many bytes per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetAssocConfig {
    /// Number of sets (must be a power of two).
    pub num_sets: usize,
    /// Ways per set, i.e. associativity (must be a power of two).
    pub set_size: usize,
    /// Bytes covered by one line (must be a power of two). `1` for the TLB,
    /// where the unit is a single translation rather than a cache line.
    pub line_size: usize,
}

/// The demand-paged page table's geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTableConfig {
    /// Number of virtual pages (must be a power of two).
    pub num_vpages: usize,
    /// Number of physical page frames (must be a power of two).
    pub num_ppages: usize,
    /// Bytes per page (must be a power of two).
    pub page_size: usize,
}

/// Full configuration for the coupled TLB/page-table/cache-hierarchy
/// simulator, as read from a trace-config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyConfig {
    /// TLB geometry (`line_size` is always `1`).
    pub tlb: SetAssocConfig,
    /// Page-table geometry.
    pub page_table: PageTableConfig,
    /// L1 data-cache geometry.
    pub dc: SetAssocConfig,
    /// L1 write policy.
    pub dc_write: WriteConfig,
    /// L2 cache geometry.
    pub l2: SetAssocConfig,
    /// L2 write policy.
    pub l2_write: WriteConfig,
    /// Whether addresses in the trace are virtual (and must be translated)
    /// or already physical.
    pub virtual_addresses: bool,
    /// Whether a TLB sits in front of the page table.
    pub use_tlb: bool,
    /// Whether an L2 cache sits behind the L1 data cache.
    pub use_l2: bool,
}

/// Reads one `label:` prefixed field and parses the remainder as `usize`.
///
/// `label` need not match the whole line, only its leading text up to the
/// value, matching the fixed-format `sscanf("Label: %lu", ...)` style this
/// format was drawn from.
fn read_usize_field(
    lines: &mut impl Iterator<Item = std::io::Result<String>>,
    label: &'static str,
) -> Result<usize, ConfigError> {
    let line = next_nonempty(lines).ok_or(ConfigError::MissingLabel(label))?;
    let value = line
        .trim_start()
        .strip_prefix(label)
        .ok_or(ConfigError::MissingLabel(label))?
        .trim();
    value
        .parse::<usize>()
        .map_err(|_| ConfigError::NotANumber {
            field: label,
            value: value.to_owned(),
        })
}

/// Reads one `label:` prefixed field and parses a `y`/`n` toggle.
fn read_bool_field(
    lines: &mut impl Iterator<Item = std::io::Result<String>>,
    label: &'static str,
) -> Result<bool, ConfigError> {
    let line = next_nonempty(lines).ok_or(ConfigError::MissingLabel(label))?;
    let value = line
        .trim_start()
        .strip_prefix(label)
        .ok_or(ConfigError::MissingLabel(label))?
        .trim();
    match value {
        "y" => Ok(true),
        "n" => Ok(false),
        _ => Err(ConfigError::NotANumber {
            field: label,
            value: value.to_owned(),
        }),
    }
}

fn next_nonempty(lines: &mut impl Iterator<Item = std::io::Result<String>>) -> Option<String> {
    for line in lines.by_ref() {
        let line = line.ok()?;
        if !line.trim().is_empty() {
            return Some(line);
        }
    }
    None
}

fn skip_header(lines: &mut impl Iterator<Item = std::io::Result<String>>) {
    let _ = next_nonempty(lines);
}

impl HierarchyConfig {
    /// Parses a hierarchy config file from any `Read` source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a label is missing, a field fails to
    /// parse, or [`Self::validate`] rejects the result.
    pub fn parse(reader: impl std::io::Read) -> Result<Self, ConfigError> {
        let mut lines = std::io::BufReader::new(reader).lines();

        skip_header(&mut lines); // "Data TLB configuration"
        let tlb_sets = read_usize_field(&mut lines, "Number of sets:")?;
        let tlb_ways = read_usize_field(&mut lines, "Set size:")?;

        skip_header(&mut lines); // "Page Table configuration"
        let num_vpages = read_usize_field(&mut lines, "Number of virtual pages:")?;
        let num_ppages = read_usize_field(&mut lines, "Number of physical pages:")?;
        let page_size = read_usize_field(&mut lines, "Page size:")?;

        skip_header(&mut lines); // "Data Cache configuration"
        let dc_sets = read_usize_field(&mut lines, "Number of sets:")?;
        let dc_ways = read_usize_field(&mut lines, "Set size:")?;
        let dc_line = read_usize_field(&mut lines, "Line size:")?;
        let dc_write_through =
            read_bool_field(&mut lines, "Write through/no write allocate:")?;

        skip_header(&mut lines); // "L2 Cache configuration"
        let l2_sets = read_usize_field(&mut lines, "Number of sets:")?;
        let l2_ways = read_usize_field(&mut lines, "Set size:")?;
        let l2_line = read_usize_field(&mut lines, "Line size:")?;
        let l2_write_through =
            read_bool_field(&mut lines, "Write through/no write allocate:")?;

        skip_header(&mut lines); // "Toggles"
        let virtual_addresses = read_bool_field(&mut lines, "Virtual addresses:")?;
        let use_tlb = read_bool_field(&mut lines, "TLB:")?;
        let use_l2 = read_bool_field(&mut lines, "L2:")?;

        let config = Self {
            tlb: SetAssocConfig {
                num_sets: tlb_sets,
                set_size: tlb_ways,
                line_size: 1,
            },
            page_table: PageTableConfig {
                num_vpages,
                num_ppages,
                page_size,
            },
            dc: SetAssocConfig {
                num_sets: dc_sets,
                set_size: dc_ways,
                line_size: dc_line,
            },
            dc_write: WriteConfig::from_toggle(dc_write_through),
            l2: SetAssocConfig {
                num_sets: l2_sets,
                set_size: l2_ways,
                line_size: l2_line,
            },
            l2_write: WriteConfig::from_toggle(l2_write_through),
            virtual_addresses,
            use_tlb,
            use_l2,
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks every field against the limits every structure in this crate
    /// relies on: power-of-two sizes (required by the shift-and-mask
    /// address decode) and fixed upper bounds (so the eagerly-allocated
    /// `LruSet`s stay reasonably sized).
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        power_of_two("TLB set size", self.tlb.set_size)?;
        power_of_two("DC set size", self.dc.set_size)?;
        power_of_two("DC line size", self.dc.line_size)?;
        power_of_two("L2 set size", self.l2.set_size)?;
        power_of_two("L2 line size", self.l2.line_size)?;
        power_of_two("number of virtual pages", self.page_table.num_vpages)?;
        power_of_two("number of physical pages", self.page_table.num_ppages)?;
        power_of_two("page size", self.page_table.page_size)?;
        power_of_two("TLB number of sets", self.tlb.num_sets)?;
        power_of_two("DC number of sets", self.dc.num_sets)?;
        power_of_two("L2 number of sets", self.l2.num_sets)?;

        in_range("TLB number of sets", self.tlb.num_sets, limits::TLB_MAX_SETS)?;
        in_range("DC number of sets", self.dc.num_sets, limits::CACHE_MAX_SETS)?;
        in_range("L2 number of sets", self.l2.num_sets, limits::CACHE_MAX_SETS)?;
        in_range("TLB set size", self.tlb.set_size, limits::MAX_ASSOCIATIVITY)?;
        in_range("DC set size", self.dc.set_size, limits::MAX_ASSOCIATIVITY)?;
        in_range("L2 set size", self.l2.set_size, limits::MAX_ASSOCIATIVITY)?;
        in_range(
            "number of virtual pages",
            self.page_table.num_vpages,
            limits::MAX_VPAGES,
        )?;
        in_range(
            "number of physical pages",
            self.page_table.num_ppages,
            limits::MAX_PPAGES,
        )?;

        if self.dc.line_size < limits::MIN_LINE_SIZE {
            return Err(ConfigError::OutOfRange {
                field: "DC line size",
                value: self.dc.line_size,
                max: usize::MAX,
            });
        }
        if self.l2.line_size < self.dc.line_size {
            return Err(ConfigError::L2LineSmallerThanL1 {
                l2: self.l2.line_size,
                dc: self.dc.line_size,
            });
        }

        Ok(())
    }
}

fn power_of_two(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if log2(value).is_none() {
        return Err(ConfigError::NotPowerOfTwo { field, value });
    }
    Ok(())
}

fn in_range(field: &'static str, value: usize, max: usize) -> Result<(), ConfigError> {
    if value == 0 || value > max {
        return Err(ConfigError::OutOfRange { field, value, max });
    }
    Ok(())
}

/// Full configuration for the Tomasulo/reorder-buffer pipeline scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Effective-address (load/store) reservation-station capacity.
    pub eff_addr_buf: usize,
    /// Floating-point add/sub reservation-station capacity.
    pub fp_adds_buf: usize,
    /// Floating-point mul/div reservation-station capacity.
    pub fp_muls_buf: usize,
    /// Integer add/sub/branch reservation-station capacity.
    pub ints_buf: usize,
    /// Reorder-buffer capacity.
    pub reorder_buf: usize,
    /// Floating-point add latency, in cycles.
    pub fp_add_lat: usize,
    /// Floating-point sub latency, in cycles.
    pub fp_sub_lat: usize,
    /// Floating-point mul latency, in cycles.
    pub fp_mul_lat: usize,
    /// Floating-point div latency, in cycles.
    pub fp_div_lat: usize,
}

impl PipelineConfig {
    /// Parses a pipeline config file from any `Read` source.
    ///
    /// The format is two header lines, five `label:value` buffer-size
    /// lines, three header/blank lines, then four `label:value` latency
    /// lines — label text before the colon is ignored beyond confirming a
    /// colon is present, since whitespace padding varies by field.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value is missing or fails to parse, or
    /// if any reservation-station/reorder-buffer capacity is zero.
    pub fn parse(reader: impl std::io::Read) -> Result<Self, ConfigError> {
        let mut lines = std::io::BufReader::new(reader).lines();

        skip_header(&mut lines); // "Configuration"
        skip_header(&mut lines); // "-------------"
        skip_header(&mut lines); // "buffers:"

        let eff_addr_buf = read_colon_field(&mut lines, "eff addr")?;
        let fp_adds_buf = read_colon_field(&mut lines, "fp adds")?;
        let fp_muls_buf = read_colon_field(&mut lines, "fp muls")?;
        let ints_buf = read_colon_field(&mut lines, "ints")?;
        let reorder_buf = read_colon_field(&mut lines, "reorder")?;

        skip_header(&mut lines); // blank
        skip_header(&mut lines); // "latencies:"

        let fp_add_lat = read_colon_field(&mut lines, "fp add")?;
        let fp_sub_lat = read_colon_field(&mut lines, "fp sub")?;
        let fp_mul_lat = read_colon_field(&mut lines, "fp mul")?;
        let fp_div_lat = read_colon_field(&mut lines, "fp div")?;

        let config = Self {
            eff_addr_buf,
            fp_adds_buf,
            fp_muls_buf,
            ints_buf,
            reorder_buf,
            fp_add_lat,
            fp_sub_lat,
            fp_mul_lat,
            fp_div_lat,
        };
        config.validate()?;
        Ok(config)
    }

    /// Every reservation-station pool and the reorder buffer must have
    /// nonzero capacity, or no instruction could ever issue.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] naming the empty buffer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("eff addr buffer", self.eff_addr_buf),
            ("fp adds buffer", self.fp_adds_buf),
            ("fp muls buffer", self.fp_muls_buf),
            ("ints buffer", self.ints_buf),
            ("reorder buffer", self.reorder_buf),
        ] {
            if value == 0 {
                return Err(ConfigError::OutOfRange {
                    field,
                    value,
                    max: usize::MAX,
                });
            }
        }
        Ok(())
    }
}

/// Reads a line containing `label` somewhere before a `:`, and parses the
/// text after the colon as `usize`. The label's surrounding whitespace is
/// not checked, matching the loosely-padded field names in this format.
fn read_colon_field(
    lines: &mut impl Iterator<Item = std::io::Result<String>>,
    label: &'static str,
) -> Result<usize, ConfigError> {
    let line = next_nonempty(lines).ok_or(ConfigError::MissingLabel(label))?;
    let (_, value) = line.split_once(':').ok_or(ConfigError::MissingLabel(label))?;
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::NotANumber {
            field: label,
            value: value.trim().to_owned(),
        })
}
