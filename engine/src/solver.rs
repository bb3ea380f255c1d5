//! Integrator core: advance the simulation state by one timestep with an
//! iterative solve of the coupled dissolution / density-transport system.
//!
//! Order per step:
//! A) plume march + effective diffusion; B) coupled fixed-point iteration
//! (recession rates against implicit sg transport) until the residual is
//! below tolerance; C) commit: limited radius growth, insoluble settling,
//! OBI re-solve from the conserved blanket volume, cumulative volumes,
//! volume balance check; clock += dt.
//!
//! Divergence is data, not control flow: the outcome is an explicit
//! `Converged`/`Diverged` value and the best-effort state is always left in
//! place for the sequencer to keep or discard per policy.

use tracing::{debug, warn};

use crate::blanket;
use crate::config::{LeachMode, SolverDefaults, StageDescriptor};
use crate::dissolution::{self, DissolutionParams};
use crate::grid::Grid;
use crate::insolubles::{self, InsolubleParams, InsolubleStats};
use crate::limiter::{self, LimitStats, LimiterConfig};
use crate::plume::{self, PlumeParams};
use crate::state::SimulationState;
use crate::transport::{self, FlowField};
use crate::units::{bbl_to_cuft, cuft_to_bbl};

/// Smallest per-iteration residual reduction that counts as progress.
const MIN_REDUCTION: f64 = 0.999;

/// Everything one timestep needs besides the mutable state.
#[derive(Clone, Copy, Debug)]
pub struct StepContext<'a> {
    /// Zero-based stage index (for diagnostics).
    pub stage_idx: usize,
    /// The active stage descriptor.
    pub stage: &'a StageDescriptor,
    /// Global solver defaults.
    pub defaults: &'a SolverDefaults,
    /// Dissolution rate-law parameters.
    pub dissolution: DissolutionParams,
    /// Plume and effective-diffusion parameters.
    pub plume: PlumeParams,
    /// Insoluble settling parameters.
    pub insolubles: InsolubleParams,
    /// Per-step recession limiter.
    pub limiter: LimiterConfig,
}

impl<'a> StepContext<'a> {
    /// Context with default physics parameters for the given stage.
    pub fn new(stage_idx: usize, stage: &'a StageDescriptor, defaults: &'a SolverDefaults) -> Self {
        Self {
            stage_idx,
            stage,
            defaults,
            dissolution: DissolutionParams::default(),
            plume: PlumeParams::default(),
            insolubles: InsolubleParams::default(),
            limiter: LimiterConfig::default(),
        }
    }
}

/// Outcome of the per-step iterative solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// Residual fell below tolerance, or the iteration cap was reached with
    /// a still-shrinking residual (recorded, not fatal).
    Converged {
        /// Iterations used.
        iterations: u32,
        /// Final residual.
        residual: f64,
    },
    /// Residual failed to shrink across the bounded attempt count. The
    /// best-effort state was committed anyway; the sequencer decides.
    Diverged {
        /// Iterations used.
        iterations: u32,
        /// Final residual.
        residual: f64,
    },
}

impl StepOutcome {
    /// Whether the step converged.
    pub fn is_converged(&self) -> bool {
        matches!(self, StepOutcome::Converged { .. })
    }
    /// Final residual of the solve.
    pub fn residual(&self) -> f64 {
        match *self {
            StepOutcome::Converged { residual, .. } | StepOutcome::Diverged { residual, .. } => {
                residual
            }
        }
    }
    /// Iterations used by the solve.
    pub fn iterations(&self) -> u32 {
        match *self {
            StepOutcome::Converged { iterations, .. }
            | StepOutcome::Diverged { iterations, .. } => iterations,
        }
    }
}

/// Result summary for one committed step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepStats {
    /// Simulation time after the step, days.
    pub t_days: f64,
    /// Timestep size used, days.
    pub dt_days: f64,
    /// Iterations used by the coupled solve.
    pub iterations: u32,
    /// Final convergence residual.
    pub residual: f64,
    /// Whether the iteration cap was hit without meeting tolerance.
    pub hit_iteration_cap: bool,
    /// Bulk rock volume removed this step, ft³.
    pub dissolved_cuft: f64,
    /// Insoluble solids released this step, ft³.
    pub insol_released_cuft: f64,
    /// Global volume-balance residual, ft³ (diagnostic; ~0 when healthy).
    pub balance_residual_cuft: f64,
    /// Cavern volume after the step, barrels.
    pub cavern_volume_bbl: f64,
}

/// Advance `state` by one timestep of `ctx.stage`.
///
/// Mutates the simulation state in place only; never touches the stage
/// descriptor or the grid.
pub fn step(grid: &Grid, ctx: &StepContext<'_>, state: &mut SimulationState) -> (StepOutcome, StepStats) {
    let n = grid.cells;
    let stage = ctx.stage;
    let dt = stage.dt_days;
    let pi = std::f64::consts::PI;

    // Mode-dependent flows: circulation drives the leach path, fill grows
    // the blanket. Withdrawal runs without circulation.
    let (circ_rate_cuft_d, fill_rate_cuft_d) = match stage.mode {
        LeachMode::Ordinary => (bbl_to_cuft(stage.injection_rate_bbl_d), 0.0),
        LeachMode::Withdrawal => (0.0, bbl_to_cuft(stage.fill_rate_bbl_d)),
        LeachMode::LeachFill => {
            (bbl_to_cuft(stage.injection_rate_bbl_d), bbl_to_cuft(stage.fill_rate_bbl_d))
        }
    };
    let inj_cell = active_cell_at(grid, state, stage.injection_depth_ft);
    let prod_cell = active_cell_at(grid, state, stage.production_depth_ft);

    // A) plume and effective diffusion from the last committed profile.
    let (profile, _plume_stats) = plume::solve_plume(
        grid,
        &state.radius_ft,
        &state.sg,
        state.obi_ft,
        inj_cell,
        circ_rate_cuft_d,
        state.inj_sg_effective,
        &ctx.plume,
    );
    state.plume_radius_ft.copy_from_slice(&profile.radius_ft);
    plume::fill_effective_diffusion(&state.sg, &profile, &ctx.plume, &mut state.eff_diffusion_ft2_d);

    let flow =
        FlowField::circulation(n, inj_cell, prod_cell, circ_rate_cuft_d, state.inj_sg_effective);

    // B) coupled fixed-point iteration. Each pass recomputes recession from
    // the current sg iterate and re-solves the implicit transport from the
    // committed profile; the residual is the max per-cell sg change between
    // successive iterates.
    let tol = ctx.defaults.tolerance;
    let f_insol = stage.insoluble_fraction;
    let mut sg_work = state.sg.clone();
    let mut rates = vec![0.0f64; n];
    let mut source = vec![0.0f64; n];
    let mut iterations = 0u32;
    let mut residual = f64::INFINITY;
    let mut prev_residual = f64::INFINITY;
    let mut stalls = 0u32;
    let mut diverged = false;
    loop {
        iterations += 1;
        dissolution::recession_rates(
            grid,
            &state.radius_ft,
            &sg_work,
            state.obi_ft,
            state.insol_top_ft,
            &ctx.dissolution,
            &mut rates,
        );
        for i in 0..n {
            source[i] =
                (1.0 - f_insol) * 2.0 * pi * state.radius_ft[i] * rates[i] * grid.height_ft[i];
        }
        let sg_next = transport::advance_sg(
            grid,
            &state.radius_ft,
            &state.buried,
            &state.eff_diffusion_ft2_d,
            &flow,
            &source,
            &state.sg,
            dt,
        );
        residual = sg_next
            .iter()
            .zip(sg_work.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f64, f64::max);
        sg_work = sg_next;
        if residual <= tol {
            break;
        }
        // An iteration must buy a meaningful reduction; hovering at the
        // same residual is a stall, not progress.
        if residual >= prev_residual * MIN_REDUCTION {
            stalls += 1;
            if stalls >= ctx.defaults.max_attempts {
                diverged = true;
                break;
            }
        } else {
            stalls = 0;
        }
        prev_residual = residual;
        if iterations >= ctx.defaults.max_iterations {
            break;
        }
    }
    let hit_cap = !diverged && residual > tol;

    // C) commit. Volume bookkeeping uses the exact shell volumes so the
    // balance residual below is a true invariant check.
    let vol_before = state.open_volume_cuft(grid);
    let buried_before = state.buried.clone();
    let mut dissolved_bulk = 0.0f64;
    let mut lstats = LimitStats::default();
    for i in 0..n {
        if rates[i] <= 0.0 {
            continue;
        }
        let lr = limiter::limit(rates[i] * dt, grid.height_ft[i], ctx.limiter);
        lstats.update(&lr);
        let r0 = state.radius_ft[i];
        let r1 = r0 + lr.applied_ft;
        state.radius_ft[i] = r1;
        dissolved_bulk += pi * (r1 * r1 - r0 * r0) * grid.height_ft[i];
    }
    state.sg = sg_work;

    let released = f_insol * dissolved_bulk;
    let istats: InsolubleStats = if stage.freeze_insolubles {
        InsolubleStats {
            released_cuft: 0.0,
            deposited_cuft: state.insol_volume_cuft * ctx.insolubles.bulking_factor,
            top_ft: state.insol_top_ft,
            buried_cells: state.buried.iter().filter(|&&b| b).count() as u32,
        }
    } else {
        insolubles::settle(
            grid,
            &state.radius_ft,
            released,
            &mut state.insol_volume_cuft,
            &mut state.insol_top_ft,
            &mut state.buried,
            &ctx.insolubles,
        )
    };

    // Blanket growth, vent cap at the production depth, OBI re-solve.
    state.blanket_volume_cuft += fill_rate_cuft_d * dt;
    let vent_cap_cuft =
        blanket::volume_above_interface(grid, &state.radius_ft, stage.production_depth_ft);
    if state.blanket_volume_cuft > vent_cap_cuft {
        let excess = state.blanket_volume_cuft - vent_cap_cuft;
        state.vented_bbl += cuft_to_bbl(excess);
        state.blanket_volume_cuft = vent_cap_cuft;
        warn!(
            stage = ctx.stage_idx,
            step = state.clock.step_idx,
            vented_bbl = cuft_to_bbl(excess),
            "blanket reached the production depth; excess vented"
        );
    }
    state.obi_ft = blanket::solve_interface_for_volume(
        grid,
        &state.radius_ft,
        state.blanket_volume_cuft,
        1e-3,
        200,
    );

    // Cumulative volumes and the produced-brine gravity.
    state.injected_bbl += cuft_to_bbl(circ_rate_cuft_d * dt);
    state.produced_bbl += cuft_to_bbl((circ_rate_cuft_d + fill_rate_cuft_d) * dt);
    state.last_production_sg = state.sg[prod_cell];

    // Global volume balance: the open-volume delta must equal dissolved
    // bulk minus the volume newly claimed by the deposit.
    let vol_after = state.open_volume_cuft(grid);
    let mut newly_buried = 0.0f64;
    for i in 0..n {
        if state.buried[i] && !buried_before[i] {
            newly_buried += pi * state.radius_ft[i] * state.radius_ft[i] * grid.height_ft[i];
        }
    }
    let balance_residual = (vol_after - vol_before) - (dissolved_bulk - newly_buried);
    state.cavern_volume_bbl = cuft_to_bbl(vol_after);

    state.convergence_error = residual;
    state.last_iterations = iterations;
    state.clock.t_days += dt;
    state.clock.step_idx += 1;

    let stats = StepStats {
        t_days: state.clock.t_days,
        dt_days: dt,
        iterations,
        residual,
        hit_iteration_cap: hit_cap,
        dissolved_cuft: dissolved_bulk,
        insol_released_cuft: istats.released_cuft,
        balance_residual_cuft: balance_residual,
        cavern_volume_bbl: state.cavern_volume_bbl,
    };

    if diverged {
        warn!(
            stage = ctx.stage_idx,
            step = state.clock.step_idx,
            residual,
            iterations,
            "step failed to converge; best-effort state committed"
        );
        (StepOutcome::Diverged { iterations, residual }, stats)
    } else {
        debug!(
            stage = ctx.stage_idx,
            step = state.clock.step_idx,
            t_days = state.clock.t_days,
            iterations,
            residual,
            dissolved_cuft = dissolved_bulk,
            limited_cells = lstats.cells_limited,
            "step committed"
        );
        (StepOutcome::Converged { iterations, residual }, stats)
    }
}

/// Nearest grid cell to `depth` that is not buried, searching upward.
fn active_cell_at(grid: &Grid, state: &SimulationState, depth: f64) -> usize {
    let mut i = grid.cell_at_depth(depth);
    while i > 0 && state.buried[i] {
        i -= 1;
    }
    i
}
