//! Shared infrastructure utilities for clipwise.
//!
//! This crate provides cross-cutting utilities that don't belong in the
//! domain-pure `clipwise-types` crate:
//!
//! - **`expiring`**: Lazily built resources that retire themselves when idle

pub mod expiring;

pub use expiring::{
    DEFAULT_IDLE_TIMEOUT, Eviction, ExpiringLazy, ExpiringLazyBuilder, MAX_REAPER_PERIOD,
    MIN_REAPER_PERIOD, Retire,
};
