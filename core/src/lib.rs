//! Core domain logic for clipwise.
//!
//! This crate holds the collaborators that sit on top of the codec and the
//! lazy handle: Roman conversion summaries and the CPU diagnostics probe.

pub mod conversion;
pub mod diagnostics;

pub use conversion::RomanConversion;
pub use diagnostics::{CpuProbe, CpuSample, Diagnostics, ProbeError};
