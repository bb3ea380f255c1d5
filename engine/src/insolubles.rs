//! Insoluble-material release and settling: the non-dissolving fraction of
//! leached rock settles to the cavern floor, raising the effective floor
//! (deposit top) and burying the deepest cells.

use crate::grid::Grid;

/// Parameters for insoluble settling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InsolubleParams {
    /// Bulk deposit volume per unit solid volume (loose packing).
    pub bulking_factor: f64,
}

impl Default for InsolubleParams {
    fn default() -> Self {
        Self { bulking_factor: 1.4 }
    }
}

/// Diagnostic summary for one settling pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsolubleStats {
    /// Solid volume released this step, ft³.
    pub released_cuft: f64,
    /// Bulk deposit volume after this step, ft³.
    pub deposited_cuft: f64,
    /// Deposit top depth after this step, ft.
    pub top_ft: f64,
    /// Number of cells buried under the deposit.
    pub buried_cells: u32,
}

/// Settle `released_solid_cuft` of fresh insolubles and recompute the
/// deposit top from the accumulated total.
///
/// The deposit fills the radius profile from the floor upward with the
/// configured bulking factor; the top is interpolated inside the partially
/// filled cell. A cell is buried once the deposit top passes its center
/// depth. Deposit never shrinks.
pub fn settle(
    grid: &Grid,
    radius_ft: &[f64],
    released_solid_cuft: f64,
    insol_volume_cuft: &mut f64,
    insol_top_ft: &mut f64,
    buried: &mut [bool],
    p: &InsolubleParams,
) -> InsolubleStats {
    *insol_volume_cuft += released_solid_cuft.max(0.0);
    let mut remaining = *insol_volume_cuft * p.bulking_factor;
    let deposited = remaining;

    let mut top = grid.floor_ft();
    if remaining > 0.0 {
        for i in (0..grid.cells).rev() {
            let h = grid.height_ft[i];
            let cell_vol = std::f64::consts::PI * radius_ft[i] * radius_ft[i] * h;
            let cell_bot = grid.depth_ft[i] + h * 0.5;
            if cell_vol <= 0.0 {
                top = cell_bot - h;
                continue;
            }
            if remaining >= cell_vol {
                remaining -= cell_vol;
                top = cell_bot - h;
                if remaining <= 0.0 {
                    break;
                }
            } else {
                top = cell_bot - h * (remaining / cell_vol);
                remaining = 0.0;
                break;
            }
        }
        top = top.max(grid.top_ft());
    }
    *insol_top_ft = top.min(*insol_top_ft);

    let mut buried_cells = 0u32;
    for i in 0..grid.cells {
        buried[i] = grid.depth_ft[i] >= *insol_top_ft;
        if buried[i] {
            buried_cells += 1;
        }
    }

    InsolubleStats {
        released_cuft: released_solid_cuft.max(0.0),
        deposited_cuft: deposited,
        top_ft: *insol_top_ft,
        buried_cells,
    }
}
