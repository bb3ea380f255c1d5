//! Oil-blanket / brine-interface utilities (volume above a depth, and the
//! inverse solve for the interface depth enclosing a target volume).
//!
//! The blanket occupies the cavern from the roof down to the oil-brine
//! interface (OBI). Depths are positive down, so "above the interface"
//! means smaller depth values.

use crate::grid::Grid;

/// Cavern volume in cubic feet between the roof and `interface_ft`.
///
/// Cells entirely above the interface contribute their full shell volume;
/// the cell containing the interface contributes the fraction of its height
/// above it. Depths outside the grid clamp to the ends.
pub fn volume_above_interface(grid: &Grid, radius_ft: &[f64], interface_ft: f64) -> f64 {
    debug_assert_eq!(radius_ft.len(), grid.cells);
    let mut vol = 0.0f64;
    for i in 0..grid.cells {
        let half = grid.height_ft[i] * 0.5;
        let cell_top = grid.depth_ft[i] - half;
        let cell_bot = grid.depth_ft[i] + half;
        if interface_ft <= cell_top {
            break;
        }
        let covered = (interface_ft.min(cell_bot) - cell_top).max(0.0);
        let a = std::f64::consts::PI * radius_ft[i] * radius_ft[i];
        vol += a * covered;
    }
    vol
}

/// Solve for the interface depth (ft) such that the cavern volume above it
/// equals `target_cuft`, via bisection over the grid's depth range.
///
/// A non-positive target puts the interface at the roof. A target exceeding
/// the whole cavern volume clamps to the floor.
pub fn solve_interface_for_volume(
    grid: &Grid,
    radius_ft: &[f64],
    target_cuft: f64,
    tol_cuft: f64,
    max_iter: u32,
) -> f64 {
    if target_cuft <= 0.0 {
        return grid.top_ft();
    }
    let mut lo = grid.top_ft();
    let mut hi = grid.bottom_ft();
    if volume_above_interface(grid, radius_ft, hi) <= target_cuft {
        return hi;
    }
    // volume_above_interface is monotone non-decreasing in depth, so plain
    // bisection is enough.
    let mut mid = 0.5 * (lo + hi);
    for _ in 0..max_iter {
        mid = 0.5 * (lo + hi);
        let v = volume_above_interface(grid, radius_ft, mid);
        if (v - target_cuft).abs() <= tol_cuft || (hi - lo) < 1e-9 {
            return mid;
        }
        if v < target_cuft {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    mid
}
