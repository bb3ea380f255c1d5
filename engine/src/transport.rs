//! Implicit 1-D brine density transport: vertical advection along the
//! injection-production flow path, effective diffusion, and the salt source
//! from wall recession, advanced by one backward-Euler step per call.
//!
//! The discretization is finite-volume over the depth cells with upwind
//! advection; the resulting tridiagonal system is strictly diagonally
//! dominant and solved with the Thomas algorithm. All math is f64 and the
//! assembly order is fixed, so results are bit-for-bit reproducible.
//!
//! Units: lengths ft, volumes ft³, flows ft³/day, time days.

use crate::grid::Grid;
use crate::units::{SG_ROCK_SALT, SG_SATURATED, SG_WATER};

/// Vertical flow description for one timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowField {
    /// Flux through the face between cell `i` and `i + 1`, positive upward,
    /// ft³/day. Length `cells - 1`.
    pub face_flux_cuft_d: Vec<f64>,
    /// Cell receiving injected fluid.
    pub inj_cell: usize,
    /// Cell producing brine to surface.
    pub prod_cell: usize,
    /// Circulation rate, ft³/day.
    pub rate_cuft_d: f64,
    /// Specific gravity of the injected fluid.
    pub inj_sg: f64,
}

impl FlowField {
    /// A circulation field carrying `rate_cuft_d` between the injection and
    /// production cells (in either vertical order). Zero rate is an explicit
    /// quiescent branch.
    pub fn circulation(
        cells: usize,
        inj_cell: usize,
        prod_cell: usize,
        rate_cuft_d: f64,
        inj_sg: f64,
    ) -> Self {
        let mut face_flux = vec![0.0f64; cells.saturating_sub(1)];
        if rate_cuft_d > 0.0 && inj_cell != prod_cell {
            let (lo, hi) = (inj_cell.min(prod_cell), inj_cell.max(prod_cell));
            // Upward when injecting below the production point.
            let signed = if inj_cell > prod_cell { rate_cuft_d } else { -rate_cuft_d };
            for f in face_flux.iter_mut().take(hi).skip(lo) {
                *f = signed;
            }
        }
        Self { face_flux_cuft_d: face_flux, inj_cell, prod_cell, rate_cuft_d, inj_sg }
    }

    /// No circulation at all (withdrawal stages, shut-in).
    pub fn quiescent(cells: usize) -> Self {
        Self {
            face_flux_cuft_d: vec![0.0; cells.saturating_sub(1)],
            inj_cell: 0,
            prod_cell: 0,
            rate_cuft_d: 0.0,
            inj_sg: SG_WATER,
        }
    }
}

/// Solve a tridiagonal system with the Thomas algorithm.
///
/// `lower[0]` and `upper[n - 1]` are ignored. The caller guarantees a
/// non-singular, diagonally dominant system (true for every matrix this
/// module assembles).
pub fn solve_tridiagonal(lower: &[f64], diag: &[f64], upper: &[f64], rhs: &[f64]) -> Vec<f64> {
    let n = diag.len();
    debug_assert!(lower.len() == n && upper.len() == n && rhs.len() == n);
    let mut c_star = vec![0.0f64; n];
    let mut d_star = vec![0.0f64; n];
    c_star[0] = upper[0] / diag[0];
    d_star[0] = rhs[0] / diag[0];
    for i in 1..n {
        let m = diag[i] - lower[i] * c_star[i - 1];
        c_star[i] = if i + 1 < n { upper[i] / m } else { 0.0 };
        d_star[i] = (rhs[i] - lower[i] * d_star[i - 1]) / m;
    }
    let mut x = vec![0.0f64; n];
    x[n - 1] = d_star[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = d_star[i] - c_star[i] * x[i + 1];
    }
    x
}

/// Advance the specific-gravity profile by one implicit step.
///
/// `salt_source_cuft_d[i]` is the solid-salt volume rate entering cell `i`
/// from wall recession; it appears implicitly (`+ s·sg_rock` on the right,
/// `+ s` on the diagonal) so the update is unconditionally stable and
/// bounded by the rock gravity. Buried cells hold their value and are
/// decoupled from their neighbors. The result is clamped to physical
/// bounds.
#[allow(clippy::too_many_arguments)]
pub fn advance_sg(
    grid: &Grid,
    radius_ft: &[f64],
    buried: &[bool],
    eff_diffusion_ft2_d: &[f64],
    flow: &FlowField,
    salt_source_cuft_d: &[f64],
    sg_prev: &[f64],
    dt_days: f64,
) -> Vec<f64> {
    let n = grid.cells;
    debug_assert!(n >= 2);
    let pi = std::f64::consts::PI;
    let area: Vec<f64> = (0..n).map(|i| pi * radius_ft[i] * radius_ft[i]).collect();

    // Face conductances (ft³/day per unit sg difference); zero across a
    // buried face so the deposit decouples the pore brine beneath it.
    let mut g_face = vec![0.0f64; n - 1];
    for i in 0..n - 1 {
        if buried[i] || buried[i + 1] {
            continue;
        }
        let dz = grid.depth_ft[i + 1] - grid.depth_ft[i];
        let d_face = 0.5 * (eff_diffusion_ft2_d[i] + eff_diffusion_ft2_d[i + 1]);
        let a_face = 0.5 * (area[i] + area[i + 1]);
        g_face[i] = d_face * a_face / dz;
    }

    let mut lower = vec![0.0f64; n];
    let mut diag = vec![0.0f64; n];
    let mut upper = vec![0.0f64; n];
    let mut rhs = vec![0.0f64; n];

    for i in 0..n {
        if buried[i] {
            diag[i] = 1.0;
            rhs[i] = sg_prev[i];
            continue;
        }
        let vol = area[i] * grid.height_ft[i];
        let vdt = vol / dt_days;
        let g_top = if i > 0 { g_face[i - 1] } else { 0.0 };
        let g_bot = if i + 1 < n { g_face[i] } else { 0.0 };
        let f_top = if i > 0 && !buried[i - 1] { flow.face_flux_cuft_d[i - 1] } else { 0.0 };
        let f_bot = if i + 1 < n && !buried[i + 1] { flow.face_flux_cuft_d[i] } else { 0.0 };
        let s = salt_source_cuft_d[i].max(0.0);

        lower[i] = -g_top + f_top.min(0.0);
        upper[i] = -g_bot - f_bot.max(0.0);
        diag[i] = vdt + g_top + g_bot + f_top.max(0.0) - f_bot.min(0.0) + s;
        rhs[i] = vdt * sg_prev[i] + s * SG_ROCK_SALT;

        if i == flow.inj_cell && flow.rate_cuft_d > 0.0 {
            rhs[i] += flow.rate_cuft_d * flow.inj_sg;
        }
        if i == flow.prod_cell && flow.rate_cuft_d > 0.0 {
            diag[i] += flow.rate_cuft_d;
        }
    }

    let mut sg_new = solve_tridiagonal(&lower, &diag, &upper, &rhs);
    let floor = SG_WATER.min(flow.inj_sg);
    for c in sg_new.iter_mut() {
        *c = c.clamp(floor, SG_SATURATED);
    }
    sg_new
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::units::SG_SATURATED;

    #[test]
    fn thomas_matches_hand_solution() {
        // [2 1 0; 1 3 1; 0 1 2] x = [4; 10; 8] has x = [1, 2, 3].
        let lower = [0.0, 1.0, 1.0];
        let diag = [2.0, 3.0, 2.0];
        let upper = [1.0, 1.0, 0.0];
        let rhs = [4.0, 10.0, 8.0];
        let x = solve_tridiagonal(&lower, &diag, &upper, &rhs);
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 2.0).abs() < 1e-12);
        assert!((x[2] - 3.0).abs() < 1e-12);
    }

    fn grid() -> Grid {
        Grid::uniform(1000.0, 1100.0, 21, |_| 40.0).unwrap()
    }

    #[test]
    fn quiescent_diffusion_conserves_mass() {
        let g = grid();
        let n = g.cells;
        let buried = vec![false; n];
        let diff = vec![500.0; n];
        let flow = FlowField::quiescent(n);
        let source = vec![0.0; n];
        let mut sg: Vec<f64> = (0..n).map(|i| 1.0 + 0.2 * (i as f64 / (n - 1) as f64)).collect();
        let vol: Vec<f64> = (0..n)
            .map(|i| std::f64::consts::PI * g.radius_ft[i] * g.radius_ft[i] * g.height_ft[i])
            .collect();
        let mass0: f64 = (0..n).map(|i| vol[i] * sg[i]).sum();
        for _ in 0..50 {
            sg = advance_sg(&g, &g.radius_ft, &buried, &diff, &flow, &source, &sg, 0.1);
        }
        let mass1: f64 = (0..n).map(|i| vol[i] * sg[i]).sum();
        assert!((mass1 - mass0).abs() < 1e-6 * mass0);
        // Stable stratification flattens toward the mean, monotonically.
        for i in 0..n - 1 {
            assert!(sg[i] <= sg[i + 1] + 1e-12);
        }
    }

    #[test]
    fn circulation_freshens_the_production_cell() {
        let g = grid();
        let n = g.cells;
        let buried = vec![false; n];
        let diff = vec![1.0; n];
        // Inject fresh at the bottom, produce at the top.
        let flow = FlowField::circulation(n, n - 1, 0, 20_000.0, 1.0);
        let source = vec![0.0; n];
        let mut sg = vec![SG_SATURATED; n];
        for _ in 0..200 {
            sg = advance_sg(&g, &g.radius_ft, &buried, &diff, &flow, &source, &sg, 0.05);
        }
        assert!(sg[n - 1] < 1.05, "injection cell should approach injected water");
        assert!(sg[0] < SG_SATURATED, "freshening should reach the production cell");
        for i in 0..n {
            assert!((1.0..=SG_SATURATED).contains(&sg[i]));
        }
    }

    #[test]
    fn salt_source_raises_gravity_toward_saturation() {
        let g = grid();
        let n = g.cells;
        let buried = vec![false; n];
        let diff = vec![1.0; n];
        let flow = FlowField::quiescent(n);
        let mut source = vec![0.0; n];
        source[10] = 5_000.0;
        let mut sg = vec![1.0; n];
        for _ in 0..100 {
            sg = advance_sg(&g, &g.radius_ft, &buried, &diff, &flow, &source, &sg, 0.1);
        }
        assert!(sg[10] > 1.05);
        assert!(sg[10] <= SG_SATURATED);
    }

    #[test]
    fn buried_cells_hold_their_value() {
        let g = grid();
        let n = g.cells;
        let mut buried = vec![false; n];
        buried[n - 1] = true;
        buried[n - 2] = true;
        let diff = vec![1000.0; n];
        let flow = FlowField::quiescent(n);
        let source = vec![0.0; n];
        let mut sg = vec![1.1; n];
        sg[n - 1] = SG_SATURATED;
        sg[n - 2] = SG_SATURATED;
        let before = sg.clone();
        for _ in 0..20 {
            sg = advance_sg(&g, &g.radius_ft, &buried, &diff, &flow, &source, &sg, 0.1);
        }
        assert_eq!(sg[n - 1], before[n - 1]);
        assert_eq!(sg[n - 2], before[n - 2]);
    }
}
