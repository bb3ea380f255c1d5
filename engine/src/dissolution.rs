//! Salt dissolution at the cavern wall: per-cell recession rates from local
//! brine undersaturation.
//!
//! Conventions:
//! - Recession is the horizontal wall-retreat speed in ft/day; it only ever
//!   enlarges the radius at a cell.
//! - Cells above the OBI (oil-protected), cells buried under the insoluble
//!   deposit, and cells at saturation take the explicit zero branch.

use crate::grid::Grid;
use crate::units::{SG_SATURATED, SG_WATER};

/// Parameters controlling wall recession.
///
/// Units: recession in ft/day, specific gravities dimensionless.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DissolutionParams {
    /// Recession speed of a vertical wall in contact with fresh water.
    pub max_recession_ft_d: f64,
    /// Undersaturation exponent of the rate law.
    pub exponent: f64,
    /// Saturated brine specific gravity terminating dissolution.
    pub sg_saturated: f64,
    /// Cap on the wall-inclination enhancement factor.
    pub max_incline_factor: f64,
}

impl Default for DissolutionParams {
    fn default() -> Self {
        Self {
            max_recession_ft_d: 0.35,
            exponent: 1.27,
            sg_saturated: SG_SATURATED,
            max_incline_factor: 1.5,
        }
    }
}

/// Undersaturation below this is numerical dust, not leaching.
const MIN_UNDERSATURATION: f64 = 1.0e-9;

/// Diagnostic summary for one dissolution pass.
#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct DissolutionStats {
    /// Cells with a non-zero recession rate.
    pub active_cells: u32,
    /// Largest recession rate, ft/day.
    pub max_rate_ft_d: f64,
    /// Mean recession rate over active cells, ft/day.
    pub mean_rate_ft_d: f64,
}

/// Compute per-cell recession rates (ft/day) into `rates`.
///
/// `obi_ft` and `insol_top_ft` bound the wetted wall; outside that band the
/// rate is exactly zero. The rate law is
/// `max_recession · x^exponent · incline(i)` with
/// `x = (sg_sat − sg) / (sg_sat − 1)` clamped to `[0, 1]`.
pub fn recession_rates(
    grid: &Grid,
    radius_ft: &[f64],
    sg: &[f64],
    obi_ft: f64,
    insol_top_ft: f64,
    p: &DissolutionParams,
    rates: &mut [f64],
) -> DissolutionStats {
    debug_assert_eq!(rates.len(), grid.cells);
    let n = grid.cells;
    let span = (p.sg_saturated - SG_WATER).max(1e-9);
    let mut stats = DissolutionStats::default();
    let mut sum = 0.0f64;
    for i in 0..n {
        let depth = grid.depth_ft[i];
        if depth <= obi_ft || depth >= insol_top_ft {
            rates[i] = 0.0;
            continue;
        }
        let x = ((p.sg_saturated - sg[i]) / span).clamp(0.0, 1.0);
        if x <= MIN_UNDERSATURATION {
            // Saturated cell: no growth, by the explicit branch.
            rates[i] = 0.0;
            continue;
        }
        let rate = p.max_recession_ft_d * x.powf(p.exponent) * incline_factor(grid, radius_ft, i, p);
        rates[i] = rate;
        stats.active_cells += 1;
        stats.max_rate_ft_d = stats.max_rate_ft_d.max(rate);
        sum += rate;
    }
    if stats.active_cells > 0 {
        stats.mean_rate_ft_d = sum / stats.active_cells as f64;
    }
    stats
}

/// Wall-inclination enhancement: sloped walls (roof overhangs, chimney
/// shoulders) dissolve faster than vertical wall. Central difference of the
/// radius profile, capped.
fn incline_factor(grid: &Grid, radius_ft: &[f64], i: usize, p: &DissolutionParams) -> f64 {
    let n = grid.cells;
    let (lo, hi) = (i.saturating_sub(1), (i + 1).min(n - 1));
    let dz = grid.depth_ft[hi] - grid.depth_ft[lo];
    if dz <= 0.0 {
        return 1.0;
    }
    let slope = (radius_ft[hi] - radius_ft[lo]).abs() / dz;
    (1.0 + slope * slope).sqrt().min(p.max_incline_factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    fn grid() -> Grid {
        Grid::uniform(1000.0, 1100.0, 11, |_| 50.0).unwrap()
    }

    #[test]
    fn saturated_column_does_not_dissolve() {
        let g = grid();
        let sg = vec![SG_SATURATED; g.cells];
        let mut rates = vec![0.0; g.cells];
        let stats =
            recession_rates(&g, &g.radius_ft, &sg, 1000.0, 1100.0, &DissolutionParams::default(), &mut rates);
        assert_eq!(stats.active_cells, 0);
        assert!(rates.iter().all(|&r| r == 0.0));
    }

    #[test]
    fn fresh_water_dissolves_at_the_full_rate() {
        let g = grid();
        let sg = vec![SG_WATER; g.cells];
        let p = DissolutionParams::default();
        let mut rates = vec![0.0; g.cells];
        let stats = recession_rates(&g, &g.radius_ft, &sg, 1000.0, 1100.0, &p, &mut rates);
        assert!(stats.active_cells > 0);
        // Interior cells of a cylinder have no inclination enhancement.
        assert!((rates[5] - p.max_recession_ft_d).abs() < 1e-12);
    }

    #[test]
    fn oil_and_deposit_bands_are_inert() {
        let g = grid();
        let sg = vec![SG_WATER; g.cells];
        let mut rates = vec![0.0; g.cells];
        // OBI at 1035 ft, deposit top at 1075 ft: only 1040..1070 ft wetted.
        recession_rates(&g, &g.radius_ft, &sg, 1035.0, 1075.0, &DissolutionParams::default(), &mut rates);
        for i in 0..g.cells {
            let d = g.depth_ft[i];
            if d <= 1035.0 || d >= 1075.0 {
                assert_eq!(rates[i], 0.0, "cell at {d} ft should be inert");
            } else {
                assert!(rates[i] > 0.0, "cell at {d} ft should dissolve");
            }
        }
    }

    #[test]
    fn undersaturation_rate_is_monotone() {
        let g = grid();
        let p = DissolutionParams::default();
        let mut prev = f64::INFINITY;
        for &sgv in &[1.0, 1.05, 1.10, 1.15, 1.19, SG_SATURATED] {
            let sg = vec![sgv; g.cells];
            let mut rates = vec![0.0; g.cells];
            recession_rates(&g, &g.radius_ft, &sg, 1000.0, 1100.0, &p, &mut rates);
            assert!(rates[5] <= prev + 1e-15, "rate not monotone at sg {sgv}");
            prev = rates[5];
        }
        assert_eq!(prev, 0.0);
    }
}
