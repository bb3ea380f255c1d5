//! Scenario and stage configuration types shared by the sequencer and the
//! integrator core.
//!
//! A [`Scenario`] arrives fully merged from the (out-of-core) config loader:
//! defaults have already been applied, so the engine treats every field as
//! authoritative. Per-stage validation still happens at stage entry so a
//! bad stage can never mutate state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::Grid;
use crate::units::SG_SATURATED;

/// Operating regime of a stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeachMode {
    /// Raw water (or undersaturated brine) injected, brine produced.
    Ordinary,
    /// Product injected under the blanket displaces brine out; no leach
    /// circulation.
    Withdrawal,
    /// Simultaneous leaching and product fill.
    LeachFill,
}

/// How the stage's incoming (injection) specific gravity is initialized.
///
/// `ClampToWater` is the documented contract and the default: the stage's
/// first step uses `min(injection_sg, 1.0)`. `Inherit` reproduces the legacy
/// carry-over of the prior stage's final produced-brine gravity so the two
/// interpretations can be tested against each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SgInit {
    /// Clamp the stage's injection specific gravity to at most 1.0.
    ClampToWater,
    /// Carry the prior stage's final produced-brine specific gravity.
    Inherit,
}

/// Stage stopping condition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum StageTarget {
    /// Run for a fixed simulated duration in days.
    Days(f64),
    /// Run until the stage has injected this many barrels.
    InjectedVolume(f64),
}

/// Configuration record for one operating phase.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageDescriptor {
    /// Operating regime for the stage.
    pub mode: LeachMode,
    /// Depth of the injection point in feet.
    pub injection_depth_ft: f64,
    /// Depth of the production point in feet.
    pub production_depth_ft: f64,
    /// Injection rate in barrels per day (leach circulation).
    pub injection_rate_bbl_d: f64,
    /// Specific gravity of the injected fluid, before [`SgInit`] applies.
    pub injection_sg: f64,
    /// Product fill rate in barrels per day (grows the blanket; used by
    /// `Withdrawal` and `LeachFill`).
    pub fill_rate_bbl_d: f64,
    /// Bulk volume fraction of non-dissolving material in the formation,
    /// in `[0, 1)`.
    pub insoluble_fraction: f64,
    /// Stopping condition.
    pub target: StageTarget,
    /// Solver timestep in days.
    pub dt_days: f64,
    /// Save cadence in simulated days.
    pub save_interval_days: f64,
    /// Incoming specific-gravity initialization rule.
    pub sg_init: SgInit,
    /// Reposition the oil-brine interface at stage entry, in feet.
    pub obi_override_ft: Option<f64>,
    /// Suspend insoluble release and settling for this stage.
    pub freeze_insolubles: bool,
}

impl Default for StageDescriptor {
    fn default() -> Self {
        Self {
            mode: LeachMode::Ordinary,
            injection_depth_ft: 0.0,
            production_depth_ft: 0.0,
            injection_rate_bbl_d: 0.0,
            injection_sg: 1.0,
            fill_rate_bbl_d: 0.0,
            insoluble_fraction: 0.05,
            target: StageTarget::Days(0.0),
            dt_days: 0.01,
            save_interval_days: 1.0,
            sg_init: SgInit::ClampToWater,
            obi_override_ft: None,
            freeze_insolubles: false,
        }
    }
}

/// What the sequencer does when a step diverges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DivergencePolicy {
    /// Stop the run, keeping results accumulated so far.
    Abort,
    /// Keep the best-effort state, flag the step as degraded, continue.
    Continue,
}

/// Global solver defaults, merged by the config loader.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverDefaults {
    /// Convergence tolerance on the per-iteration max sg change.
    pub tolerance: f64,
    /// Iteration cap per timestep; hitting it is recorded, not fatal.
    pub max_iterations: u32,
    /// Consecutive non-reducing iterations before a step is declared
    /// diverged.
    pub max_attempts: u32,
    /// Cavern brine specific gravity at simulation start.
    pub initial_sg: f64,
    /// Oil blanket volume at simulation start, in barrels.
    pub blanket_volume_bbl: f64,
    /// Divergence handling policy.
    pub on_divergence: DivergencePolicy,
}

impl Default for SolverDefaults {
    fn default() -> Self {
        Self {
            tolerance: 1.0e-6,
            max_iterations: 50,
            max_attempts: 5,
            initial_sg: SG_SATURATED,
            blanket_volume_bbl: 0.0,
            on_divergence: DivergencePolicy::Abort,
        }
    }
}

/// A fully validated simulation scenario: geometry, ordered stages, and
/// global defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Depth-cell geometry.
    pub grid: Grid,
    /// Ordered operating stages, consumed in order by the sequencer.
    pub stages: Vec<StageDescriptor>,
    /// Global solver defaults.
    pub defaults: SolverDefaults,
}

/// Cooperative cancellation handle, checked at timestep boundaries only.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The run stops after the current step commits.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-run invocation options.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Output prefix/identifier echoed into the results.
    pub prefix: String,
    /// Retain full per-cell grids; when false only scalar series are kept.
    pub retain_grids: bool,
    /// Optional cooperative cancellation handle.
    pub cancel: Option<CancelToken>,
}

/// Statically validate one stage against the grid it will run on.
///
/// Fails fast with [`Error::Configuration`] before any state mutation for
/// the stage begins.
pub fn validate_stage(stage_idx: usize, stage: &StageDescriptor, grid: &Grid) -> Result<()> {
    let fail = |reason: String| Err(Error::Configuration { stage: stage_idx, reason });
    if !(stage.dt_days > 0.0) || !stage.dt_days.is_finite() {
        return fail(format!("timestep must be positive, got {} d", stage.dt_days));
    }
    if !(stage.save_interval_days > 0.0) || !stage.save_interval_days.is_finite() {
        return fail(format!("save interval must be positive, got {} d", stage.save_interval_days));
    }
    match stage.target {
        StageTarget::Days(d) => {
            if !d.is_finite() || d < 0.0 {
                return fail(format!("duration must be non-negative, got {d} d"));
            }
        }
        StageTarget::InjectedVolume(v) => {
            if !v.is_finite() || v <= 0.0 {
                return fail(format!("volume target must be positive, got {v} bbl"));
            }
            if stage.injection_rate_bbl_d <= 0.0 || stage.mode == LeachMode::Withdrawal {
                return fail(format!(
                    "volume target {v} bbl unreachable: no leach circulation (mode {:?}, rate {} bbl/d)",
                    stage.mode, stage.injection_rate_bbl_d
                ));
            }
        }
    }
    if stage.injection_rate_bbl_d < 0.0 || !stage.injection_rate_bbl_d.is_finite() {
        return fail(format!(
            "injection rate must be finite and non-negative, got {} bbl/d",
            stage.injection_rate_bbl_d
        ));
    }
    if stage.fill_rate_bbl_d < 0.0 || !stage.fill_rate_bbl_d.is_finite() {
        return fail(format!(
            "fill rate must be finite and non-negative, got {} bbl/d",
            stage.fill_rate_bbl_d
        ));
    }
    if !(0.5..=SG_ROCK_LIMIT).contains(&stage.injection_sg) {
        return fail(format!("injection specific gravity {} out of range", stage.injection_sg));
    }
    if !(0.0..1.0).contains(&stage.insoluble_fraction) {
        return fail(format!(
            "insoluble fraction must be in [0, 1), got {}",
            stage.insoluble_fraction
        ));
    }
    if !grid.contains_depth(stage.injection_depth_ft) {
        return fail(format!(
            "injection depth {} ft outside grid range {}..{} ft",
            stage.injection_depth_ft,
            grid.top_ft(),
            grid.bottom_ft()
        ));
    }
    if !grid.contains_depth(stage.production_depth_ft) {
        return fail(format!(
            "production depth {} ft outside grid range {}..{} ft",
            stage.production_depth_ft,
            grid.top_ft(),
            grid.bottom_ft()
        ));
    }
    if let Some(obi) = stage.obi_override_ft {
        if !grid.contains_depth(obi) {
            return fail(format!("OBI override {obi} ft outside grid range"));
        }
    }
    Ok(())
}

// Upper sanity bound on injection sg: saturated brine with margin. Values
// at or above saturation are legal and simply produce no dissolution.
const SG_ROCK_LIMIT: f64 = SG_SATURATED + 0.1;

#[cfg(test)]
mod tests {
    use super::*;

    fn small_grid() -> Grid {
        Grid::uniform(1000.0, 1100.0, 11, |_| 40.0).unwrap()
    }

    #[test]
    fn default_stage_validates_on_matching_grid() {
        let g = small_grid();
        let stage =
            StageDescriptor { injection_depth_ft: 1090.0, production_depth_ft: 1010.0, ..Default::default() };
        assert!(validate_stage(0, &stage, &g).is_ok());
    }

    #[test]
    fn zero_timestep_rejected() {
        let g = small_grid();
        let stage = StageDescriptor {
            injection_depth_ft: 1090.0,
            production_depth_ft: 1010.0,
            dt_days: 0.0,
            ..Default::default()
        };
        let err = validate_stage(3, &stage, &g).unwrap_err();
        assert!(matches!(err, Error::Configuration { stage: 3, .. }));
    }

    #[test]
    fn volume_target_without_rate_is_unreachable() {
        let g = small_grid();
        let stage = StageDescriptor {
            injection_depth_ft: 1090.0,
            production_depth_ft: 1010.0,
            injection_rate_bbl_d: 0.0,
            target: StageTarget::InjectedVolume(1000.0),
            ..Default::default()
        };
        assert!(validate_stage(0, &stage, &g).is_err());
    }

    #[test]
    fn cancel_token_round_trip() {
        let t = CancelToken::new();
        assert!(!t.is_cancelled());
        let t2 = t.clone();
        t2.cancel();
        assert!(t.is_cancelled());
    }
}
