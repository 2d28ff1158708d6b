//! Memory-hierarchy and Tomasulo pipeline timing simulators.
//!
//! This crate implements two independent, trace-driven simulators that share
//! no state but are co-resident because both were distilled from the same
//! coursework corpus:
//!
//! 1. **Hierarchy** ([`hierarchy`]): a TLB, a demand-paged page table with an
//!    inverse-map physical-frame allocator, and an L1/L2 set-associative data
//!    cache, wired together by an orchestrator that enforces strict inclusion
//!    between cache levels and fans out invalidation on page eviction.
//! 2. **Pipeline** ([`pipeline`]): a Tomasulo/reorder-buffer scheduler that
//!    computes per-instruction issue/execute/commit cycle numbers under
//!    reservation-station, ROB, CDB, and memory-port constraints.
//!
//! Both simulators are strictly single-threaded and synchronous: every trace
//! line runs to completion before the next one is consumed.

/// Shared primitives: bit-field decoding, the intrusive LRU set, and error types.
pub mod common;
/// Configuration records and the line-oriented config-file reader.
pub mod config;
/// The coupled TLB / page-table / cache-hierarchy simulator.
pub mod hierarchy;
/// The Tomasulo/reorder-buffer pipeline timing simulator.
pub mod pipeline;

pub use common::error::SimError;
pub use hierarchy::Hierarchy;
pub use pipeline::Scheduler;
