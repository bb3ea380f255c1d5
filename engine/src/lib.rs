//! Deterministic multi-stage simulator of solution-mining cavern evolution.
//!
//! Given an initial cavern shape (radius per depth cell) and an ordered list
//! of operating stages, the engine advances the coupled physical state
//! (per-cell radius and brine specific gravity, insoluble deposit, oil-brine
//! interface, plume and diffusion profiles) one implicit timestep at a time,
//! and aggregates per-step and per-cell time series into a results object.
//! Identical scenarios produce bit-identical results.
#![deny(missing_docs)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::dbg_macro, clippy::large_enum_variant)]

pub mod blanket;
pub mod config;
pub mod dissolution;
pub mod error;
pub mod grid;
pub mod insolubles;
pub mod limiter;
pub mod plume;
pub mod results;
pub mod sequencer;
pub mod solver;
pub mod state;
pub mod transport;
pub mod units;

/// Returns the engine version string from Cargo metadata.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_semver_like() {
        assert!(version().split('.').count() >= 3);
    }
}
