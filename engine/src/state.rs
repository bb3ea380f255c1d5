//! Simulation state container: every per-cell and scalar physical variable
//! the integrator evolves across time.

use crate::blanket;
use crate::config::SolverDefaults;
use crate::grid::Grid;
use crate::units::{bbl_to_cuft, cuft_to_bbl, SG_WATER};

/// Simulation clock information.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    /// Elapsed simulation time in days.
    pub t_days: f64,
    /// Step index (starts at 0, increments per committed step).
    pub step_idx: u64,
}

/// The complete mutable state required for stepping.
///
/// Owned exclusively by one simulation run; mutated in place, one timestep
/// at a time, by the integrator core only.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    /// Cavern radius in feet per cell. Non-decreasing per cell over time.
    pub radius_ft: Vec<f64>,
    /// Brine specific gravity per cell.
    pub sg: Vec<f64>,
    /// Plume radius in feet per cell (zero outside the plume).
    pub plume_radius_ft: Vec<f64>,
    /// Effective diffusion coefficient per cell, ft²/day.
    pub eff_diffusion_ft2_d: Vec<f64>,
    /// Whether the cell is buried under the insoluble deposit.
    pub buried: Vec<bool>,
    /// Oil-brine interface depth in feet.
    pub obi_ft: f64,
    /// Top of the insoluble deposit in feet (grid bottom when empty).
    pub insol_top_ft: f64,
    /// Cumulative settled insoluble solids, cubic feet.
    pub insol_volume_cuft: f64,
    /// Oil blanket volume, cubic feet.
    pub blanket_volume_cuft: f64,
    /// Cumulative injected volume, barrels.
    pub injected_bbl: f64,
    /// Cumulative produced (withdrawn) volume, barrels.
    pub produced_bbl: f64,
    /// Cumulative vented blanket volume, barrels.
    pub vented_bbl: f64,
    /// Total cavern volume, barrels (excludes buried cells).
    pub cavern_volume_bbl: f64,
    /// Convergence-error metric of the last committed step (diagnostic).
    pub convergence_error: f64,
    /// Iteration count of the last committed step (diagnostic).
    pub last_iterations: u32,
    /// Effective injection specific gravity for the active stage.
    pub inj_sg_effective: f64,
    /// Produced-brine specific gravity at the last committed step.
    pub last_production_sg: f64,
    /// Simulation clock.
    pub clock: Clock,
}

impl SimulationState {
    /// Initialize state from the geometry and global defaults.
    ///
    /// The brine column starts at `defaults.initial_sg`, the insoluble
    /// deposit is empty, and the OBI is placed so the cavern volume above
    /// it equals `defaults.blanket_volume_bbl`.
    pub fn new(grid: &Grid, defaults: &SolverDefaults) -> Self {
        let n = grid.cells;
        let radius_ft = grid.radius_ft.clone();
        let blanket_volume_cuft = bbl_to_cuft(defaults.blanket_volume_bbl.max(0.0));
        let obi_ft = blanket::solve_interface_for_volume(
            grid,
            &radius_ft,
            blanket_volume_cuft,
            1e-3,
            200,
        );
        let mut s = Self {
            radius_ft,
            sg: vec![defaults.initial_sg; n],
            plume_radius_ft: vec![0.0; n],
            eff_diffusion_ft2_d: vec![0.0; n],
            buried: vec![false; n],
            obi_ft,
            insol_top_ft: grid.floor_ft(),
            insol_volume_cuft: 0.0,
            blanket_volume_cuft,
            injected_bbl: 0.0,
            produced_bbl: 0.0,
            vented_bbl: 0.0,
            cavern_volume_bbl: 0.0,
            convergence_error: 0.0,
            last_iterations: 0,
            inj_sg_effective: SG_WATER,
            last_production_sg: defaults.initial_sg,
            clock: Clock { t_days: 0.0, step_idx: 0 },
        };
        s.cavern_volume_bbl = cuft_to_bbl(s.open_volume_cuft(grid));
        s
    }

    /// Cavern volume in cubic feet over cells not buried by the deposit.
    pub fn open_volume_cuft(&self, grid: &Grid) -> f64 {
        let mut v = 0.0f64;
        for i in 0..grid.cells {
            if self.buried[i] {
                continue;
            }
            v += std::f64::consts::PI * self.radius_ft[i] * self.radius_ft[i] * grid.height_ft[i];
        }
        v
    }

    /// Brine volume in cubic feet: open volume below the OBI.
    pub fn brine_volume_cuft(&self, grid: &Grid) -> f64 {
        let above = blanket::volume_above_interface(grid, &self.radius_ft, self.obi_ft);
        (self.open_volume_cuft(grid) - above).max(0.0)
    }

    /// Whether the cell takes part in dissolution: wetted by brine (below
    /// the OBI) and not buried under the deposit.
    pub fn is_active(&self, grid: &Grid, i: usize) -> bool {
        !self.buried[i] && grid.depth_ft[i] > self.obi_ft && grid.depth_ft[i] < self.insol_top_ft
    }
}
