//! Append-only results aggregator: scalar time series plus per-cell grids,
//! one entry per saved snapshot, owned by the caller once the run ends.
//!
//! Two levels mirror the legacy output layout: scalar series hold one value
//! per saved step, grids hold one row (all cells) per saved step. Snapshots
//! are time-ordered; past snapshots are never mutated.

use serde::Serialize;

use crate::error::Error;
use crate::solver::StepStats;
use crate::state::SimulationState;
use crate::units::cuft_to_bbl;

/// Terminal condition of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RunStatus {
    /// Every stage ran to its target.
    Completed,
    /// Cancellation was observed at a timestep boundary; the last committed
    /// step's state is intact.
    Cancelled {
        /// Stage active when cancellation was observed.
        stage: usize,
        /// Elapsed simulation time at cancellation, days.
        t_days: f64,
    },
    /// The run stopped early; results from prior completed stages are kept.
    Aborted {
        /// Stage that failed.
        stage: usize,
        /// The failure.
        error: Error,
    },
}

/// Full results of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Results {
    /// Output prefix/identifier echoed from the run invocation.
    pub prefix: String,
    /// Elapsed time per saved snapshot, days.
    pub times_d: Vec<f64>,
    /// Committed step index per saved snapshot.
    pub step_indices: Vec<u64>,
    /// Cavern volume per snapshot, barrels.
    pub cavern_volume_bbl: Vec<f64>,
    /// Cumulative injected volume per snapshot, barrels.
    pub injected_bbl: Vec<f64>,
    /// Cumulative produced volume per snapshot, barrels.
    pub produced_bbl: Vec<f64>,
    /// Cumulative vented blanket volume per snapshot, barrels.
    pub vented_bbl: Vec<f64>,
    /// Cumulative settled insoluble solids per snapshot, barrels.
    pub insoluble_volume_bbl: Vec<f64>,
    /// Oil-brine interface depth per snapshot, feet.
    pub obi_ft: Vec<f64>,
    /// Insoluble deposit top per snapshot, feet.
    pub insoluble_top_ft: Vec<f64>,
    /// Convergence-error metric per snapshot (diagnostic).
    pub convergence_error: Vec<f64>,
    /// Solver iterations per snapshot (diagnostic).
    pub iterations: Vec<u32>,
    /// Whether the step preceding the snapshot was degraded.
    pub degraded: Vec<bool>,
    /// Radius grid, saved-step-major: `radius_ft[snapshot][cell]`.
    pub radius_ft: Vec<Vec<f64>>,
    /// Specific-gravity grid, saved-step-major.
    pub sg: Vec<Vec<f64>>,
    /// Plume radius grid, saved-step-major.
    pub plume_radius_ft: Vec<Vec<f64>>,
    /// Effective diffusion grid, saved-step-major.
    pub eff_diffusion_ft2_d: Vec<Vec<f64>>,
    /// Snapshot counts at each stage completion, in stage order.
    pub stage_bounds: Vec<usize>,
    /// Count of degraded (non-converged but continued) steps.
    pub degraded_steps: u32,
    /// Total committed steps across the run.
    pub total_steps: u64,
    /// Largest absolute volume-balance residual seen, ft³ (diagnostic).
    pub max_balance_residual_cuft: f64,
    /// Terminal condition.
    pub status: RunStatus,
    /// Whether per-cell grids were retained.
    pub retain_grids: bool,
}

impl Results {
    /// Empty aggregator for a new run.
    pub(crate) fn new(prefix: String, retain_grids: bool) -> Self {
        Self {
            prefix,
            times_d: Vec::new(),
            step_indices: Vec::new(),
            cavern_volume_bbl: Vec::new(),
            injected_bbl: Vec::new(),
            produced_bbl: Vec::new(),
            vented_bbl: Vec::new(),
            insoluble_volume_bbl: Vec::new(),
            obi_ft: Vec::new(),
            insoluble_top_ft: Vec::new(),
            convergence_error: Vec::new(),
            iterations: Vec::new(),
            degraded: Vec::new(),
            radius_ft: Vec::new(),
            sg: Vec::new(),
            plume_radius_ft: Vec::new(),
            eff_diffusion_ft2_d: Vec::new(),
            stage_bounds: Vec::new(),
            degraded_steps: 0,
            total_steps: 0,
            max_balance_residual_cuft: 0.0,
            status: RunStatus::Completed,
            retain_grids,
        }
    }

    /// Copy the save-relevant subset of `state` into a new snapshot.
    ///
    /// A snapshot for an already-saved step index is skipped, so stage
    /// completion never duplicates the save-cadence snapshot of the same
    /// step (and a zero-duration stage adds nothing after the initial one).
    pub(crate) fn push_snapshot(&mut self, state: &SimulationState, degraded: bool) {
        if self.step_indices.last() == Some(&state.clock.step_idx) {
            return;
        }
        self.times_d.push(state.clock.t_days);
        self.step_indices.push(state.clock.step_idx);
        self.cavern_volume_bbl.push(state.cavern_volume_bbl);
        self.injected_bbl.push(state.injected_bbl);
        self.produced_bbl.push(state.produced_bbl);
        self.vented_bbl.push(state.vented_bbl);
        self.insoluble_volume_bbl.push(cuft_to_bbl(state.insol_volume_cuft));
        self.obi_ft.push(state.obi_ft);
        self.insoluble_top_ft.push(state.insol_top_ft);
        self.convergence_error.push(state.convergence_error);
        self.iterations.push(state.last_iterations);
        self.degraded.push(degraded);
        if self.retain_grids {
            self.radius_ft.push(state.radius_ft.clone());
            self.sg.push(state.sg.clone());
            self.plume_radius_ft.push(state.plume_radius_ft.clone());
            self.eff_diffusion_ft2_d.push(state.eff_diffusion_ft2_d.clone());
        }
    }

    /// Record per-step diagnostics (every step, saved or not).
    pub(crate) fn record_step(&mut self, stats: &StepStats, degraded: bool) {
        self.total_steps += 1;
        if degraded {
            self.degraded_steps += 1;
        }
        self.max_balance_residual_cuft =
            self.max_balance_residual_cuft.max(stats.balance_residual_cuft.abs());
    }

    /// Mark the current snapshot count as a stage boundary.
    pub(crate) fn mark_stage_boundary(&mut self) {
        self.stage_bounds.push(self.times_d.len());
    }

    /// Number of saved snapshots.
    pub fn snapshots(&self) -> usize {
        self.times_d.len()
    }

    /// Whether nothing was saved (never true after a run: the initial
    /// snapshot is unconditional).
    pub fn is_empty(&self) -> bool {
        self.times_d.is_empty()
    }

    /// Scalar series by name.
    ///
    /// Names: `time`, `cavern_volume`, `injected`, `produced`, `vented`,
    /// `insoluble_volume`, `obi`, `insoluble_top`, `convergence_error`.
    pub fn series(&self, name: &str) -> Option<&[f64]> {
        match name {
            "time" => Some(&self.times_d),
            "cavern_volume" => Some(&self.cavern_volume_bbl),
            "injected" => Some(&self.injected_bbl),
            "produced" => Some(&self.produced_bbl),
            "vented" => Some(&self.vented_bbl),
            "insoluble_volume" => Some(&self.insoluble_volume_bbl),
            "obi" => Some(&self.obi_ft),
            "insoluble_top" => Some(&self.insoluble_top_ft),
            "convergence_error" => Some(&self.convergence_error),
            _ => None,
        }
    }

    /// Per-cell grid by name (empty when grids were not retained).
    ///
    /// Names: `radius`, `sg`, `plume_radius`, `eff_diffusion`.
    pub fn grid(&self, name: &str) -> Option<&[Vec<f64>]> {
        match name {
            "radius" => Some(&self.radius_ft),
            "sg" => Some(&self.sg),
            "plume_radius" => Some(&self.plume_radius_ft),
            "eff_diffusion" => Some(&self.eff_diffusion_ft2_d),
            _ => None,
        }
    }

    /// One grid value by `(cell, saved step)` indexing.
    pub fn grid_value(&self, name: &str, cell: usize, saved_step: usize) -> Option<f64> {
        self.grid(name)?.get(saved_step)?.get(cell).copied()
    }

    /// Index of the last snapshot at or before `t_days` (time-keyed read
    /// access). `None` before the first snapshot.
    pub fn index_at_time(&self, t_days: f64) -> Option<usize> {
        match self.times_d.partition_point(|&t| t <= t_days) {
            0 => None,
            n => Some(n - 1),
        }
    }
}
