//! Depth-cell geometry grid: the spatial backbone all physics is computed
//! over.
//!
//! Conventions:
//! - `depth_ft` is positive downward and strictly increasing, so index 0 is
//!   the shallowest (roof) cell and index `cells - 1` the deepest (floor).
//! - Radii are horizontal cavern radii at the cell's depth.
//! - The grid is immutable once built; geometry and cell heights are
//!   computed in f64 at construction and never change during a run.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ordered set of depth cells with associated initial radii.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    /// Number of depth cells.
    pub cells: usize,
    /// Cell depths in feet, positive down, strictly increasing.
    pub depth_ft: Vec<f64>,
    /// Initial cavern radius in feet at each cell depth.
    pub radius_ft: Vec<f64>,
    /// Cell heights in feet (half-cells at the two ends).
    pub height_ft: Vec<f64>,
}

impl Grid {
    /// Build a grid from an ordered list of `(depth_ft, radius_ft)` pairs.
    ///
    /// Fails with [`Error::Validation`] when fewer than two cells are given,
    /// depths are not strictly increasing, or any radius is negative or
    /// non-finite. No partially constructed grid ever escapes.
    pub fn from_profile(profile: &[(f64, f64)]) -> Result<Self> {
        if profile.len() < 2 {
            return Err(Error::Validation {
                reason: format!("need at least 2 depth cells, got {}", profile.len()),
            });
        }
        let mut depth_ft = Vec::with_capacity(profile.len());
        let mut radius_ft = Vec::with_capacity(profile.len());
        for (i, &(d, r)) in profile.iter().enumerate() {
            if !d.is_finite() {
                return Err(Error::Validation { reason: format!("non-finite depth at cell {i}") });
            }
            if i > 0 && d <= depth_ft[i - 1] {
                return Err(Error::Validation {
                    reason: format!(
                        "depths must be strictly increasing: cell {i} at {d} ft after {} ft",
                        depth_ft[i - 1]
                    ),
                });
            }
            if !r.is_finite() || r < 0.0 {
                return Err(Error::Validation {
                    reason: format!("radius at cell {i} must be finite and non-negative, got {r}"),
                });
            }
            depth_ft.push(d);
            radius_ft.push(r);
        }
        let height_ft = cell_heights(&depth_ft);
        Ok(Self { cells: profile.len(), depth_ft, radius_ft, height_ft })
    }

    /// Build a uniformly spaced grid from `top_ft` down to `bottom_ft` with
    /// `cells` cells, radius given per cell by `radius`.
    pub fn uniform<F>(top_ft: f64, bottom_ft: f64, cells: usize, radius: F) -> Result<Self>
    where
        F: Fn(usize) -> f64,
    {
        if cells < 2 {
            return Err(Error::Validation {
                reason: format!("need at least 2 depth cells, got {cells}"),
            });
        }
        if !(bottom_ft > top_ft) {
            return Err(Error::Validation {
                reason: format!("bottom depth {bottom_ft} ft must exceed top depth {top_ft} ft"),
            });
        }
        let dz = (bottom_ft - top_ft) / (cells as f64 - 1.0);
        let profile: Vec<(f64, f64)> =
            (0..cells).map(|i| (top_ft + dz * i as f64, radius(i))).collect();
        Self::from_profile(&profile)
    }

    /// Re-check the structural invariants. Used when a grid arrives through
    /// a deserialized [`crate::config::Scenario`] instead of
    /// [`Grid::from_profile`].
    pub fn validate(&self) -> Result<()> {
        if self.depth_ft.len() != self.cells
            || self.radius_ft.len() != self.cells
            || self.height_ft.len() != self.cells
        {
            return Err(Error::Validation {
                reason: "grid field lengths disagree with cell count".to_string(),
            });
        }
        let profile: Vec<(f64, f64)> =
            self.depth_ft.iter().copied().zip(self.radius_ft.iter().copied()).collect();
        Self::from_profile(&profile).map(|_| ())
    }

    /// Depth of the shallowest cell (cavern roof) in feet.
    pub fn top_ft(&self) -> f64 {
        self.depth_ft[0]
    }

    /// Depth of the deepest cell in feet.
    pub fn bottom_ft(&self) -> f64 {
        self.depth_ft[self.cells - 1]
    }

    /// Depth of the physical cavern floor: the bottom face of the deepest
    /// cell.
    pub fn floor_ft(&self) -> f64 {
        self.depth_ft[self.cells - 1] + self.height_ft[self.cells - 1] * 0.5
    }

    /// Index of the cell whose depth is nearest to `depth`.
    pub fn cell_at_depth(&self, depth: f64) -> usize {
        let mut best = 0usize;
        let mut best_d = f64::INFINITY;
        for (i, &d) in self.depth_ft.iter().enumerate() {
            let e = (d - depth).abs();
            if e < best_d {
                best_d = e;
                best = i;
            }
        }
        best
    }

    /// Whether `depth` lies within the grid's depth range.
    pub fn contains_depth(&self, depth: f64) -> bool {
        depth >= self.top_ft() && depth <= self.bottom_ft()
    }
}

/// Per-cell heights from cell depths: interior cells span half the distance
/// to each neighbor; the end cells carry a single half-interval.
fn cell_heights(depth_ft: &[f64]) -> Vec<f64> {
    let n = depth_ft.len();
    let mut h = vec![0.0f64; n];
    for i in 0..n {
        let up = if i > 0 { (depth_ft[i] - depth_ft[i - 1]) * 0.5 } else { 0.0 };
        let down = if i + 1 < n { (depth_ft[i + 1] - depth_ft[i]) * 0.5 } else { 0.0 };
        h[i] = up + down;
    }
    h
}
