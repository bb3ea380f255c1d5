//! Stage sequencer: drives the integrator core across the ordered stage
//! list, handling stage transitions, save cadence, cancellation, and the
//! run state machine
//! `Idle → StageActive → (StepConverged | StepDiverged) → StageComplete →
//! (next stage | RunComplete)`.
//!
//! State is threaded explicitly: each stage starts from the previous
//! stage's final committed state, never from shared globals.

use tracing::{debug, info, warn};

use crate::blanket;
use crate::config::{
    validate_stage, DivergencePolicy, RunOptions, Scenario, SgInit, StageTarget,
};
use crate::error::{Error, Result};
use crate::results::{Results, RunStatus};
use crate::solver::{self, StepContext, StepOutcome};
use crate::state::SimulationState;
use crate::units::SG_WATER;

/// A ready-to-run simulation: validated scenario plus its exclusive state.
pub struct Simulation {
    scenario: Scenario,
    state: SimulationState,
}

impl Simulation {
    /// Validate the scenario's geometry and structure and initialize state.
    ///
    /// Fails with [`Error::Validation`] (malformed grid, empty stage list)
    /// without producing any simulation state.
    pub fn new(scenario: Scenario) -> Result<Self> {
        scenario.grid.validate()?;
        if scenario.stages.is_empty() {
            return Err(Error::Validation { reason: "scenario has no stages".to_string() });
        }
        let state = SimulationState::new(&scenario.grid, &scenario.defaults);
        Ok(Self { scenario, state })
    }

    /// Read access to the current state (pre-run: the initial state).
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Run every stage in order and return the aggregated results.
    ///
    /// Failures after the run has started (a rejected stage, divergence
    /// under the `Abort` policy) terminate the run but keep everything
    /// accumulated so far, surfaced through [`RunStatus`]; they are never
    /// silently swallowed.
    pub fn run(self, opts: &RunOptions) -> Results {
        let Simulation { scenario, mut state } = self;
        let grid = &scenario.grid;
        let mut results = Results::new(opts.prefix.clone(), opts.retain_grids);

        // Unconditional pre-stage-one snapshot at time zero.
        results.push_snapshot(&state, false);
        info!(
            prefix = %opts.prefix,
            stages = scenario.stages.len(),
            cells = grid.cells,
            "run start"
        );

        let mut status = RunStatus::Completed;
        'stages: for (stage_idx, stage) in scenario.stages.iter().enumerate() {
            // Fail fast before any state mutation for this stage.
            if let Err(error) = validate_stage(stage_idx, stage, grid) {
                warn!(stage = stage_idx, %error, "stage rejected; aborting run");
                status = RunStatus::Aborted { stage: stage_idx, error };
                break 'stages;
            }

            // Stage-entry adjustments, documented semantics.
            state.inj_sg_effective = match stage.sg_init {
                SgInit::ClampToWater => stage.injection_sg.min(SG_WATER),
                SgInit::Inherit => state.last_production_sg,
            };
            if let Some(obi) = stage.obi_override_ft {
                state.obi_ft = obi;
                state.blanket_volume_cuft =
                    blanket::volume_above_interface(grid, &state.radius_ft, obi);
            }

            let ctx = StepContext::new(stage_idx, stage, &scenario.defaults);
            let stage_t0 = state.clock.t_days;
            let stage_injected0 = state.injected_bbl;
            let mut since_save = 0.0f64;
            let mut last_degraded = false;
            debug!(
                stage = stage_idx,
                mode = ?stage.mode,
                inj_sg = state.inj_sg_effective,
                "stage start"
            );

            loop {
                let target_met = match stage.target {
                    StageTarget::Days(d) => state.clock.t_days - stage_t0 >= d - 1e-12,
                    StageTarget::InjectedVolume(v) => {
                        state.injected_bbl - stage_injected0 >= v - 1e-9
                    }
                };
                if target_met {
                    break;
                }
                // Cancellation is observed at timestep boundaries only; the
                // last committed step stays intact.
                if let Some(cancel) = &opts.cancel {
                    if cancel.is_cancelled() {
                        info!(stage = stage_idx, t_days = state.clock.t_days, "run cancelled");
                        status =
                            RunStatus::Cancelled { stage: stage_idx, t_days: state.clock.t_days };
                        results.push_snapshot(&state, false);
                        break 'stages;
                    }
                }

                let (outcome, stats) = solver::step(grid, &ctx, &mut state);
                let mut degraded = false;
                if let StepOutcome::Diverged { residual, .. } = outcome {
                    match scenario.defaults.on_divergence {
                        DivergencePolicy::Abort => {
                            let error = Error::Divergence {
                                stage: stage_idx,
                                step: state.clock.step_idx,
                                t_days: state.clock.t_days,
                                residual,
                            };
                            warn!(%error, "aborting run on divergence");
                            results.record_step(&stats, true);
                            results.push_snapshot(&state, true);
                            status = RunStatus::Aborted { stage: stage_idx, error };
                            break 'stages;
                        }
                        DivergencePolicy::Continue => degraded = true,
                    }
                }
                results.record_step(&stats, degraded);
                last_degraded = degraded;

                since_save += stage.dt_days;
                if since_save >= stage.save_interval_days - 1e-12 {
                    results.push_snapshot(&state, degraded);
                    since_save = 0.0;
                }
            }

            if matches!(status, RunStatus::Completed) {
                // Stage completion: snapshot (deduplicated) + boundary
                // marker so per-stage discontinuities stay visible.
                results.push_snapshot(&state, last_degraded);
                results.mark_stage_boundary();
                info!(
                    stage = stage_idx,
                    t_days = state.clock.t_days,
                    cavern_bbl = state.cavern_volume_bbl,
                    obi_ft = state.obi_ft,
                    "stage complete"
                );
            }
        }

        info!(
            snapshots = results.snapshots(),
            steps = results.total_steps,
            degraded = results.degraded_steps,
            status = ?status,
            "run finished"
        );
        results.status = status;
        results
    }
}
