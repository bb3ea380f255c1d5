//! Per-step recession limiter for numerical stability.
//!
//! For a wall retreating Δ = rate · dt at a cell of height h, compute
//! C = Δ / h and scale the retreat by min(1, C_MAX / C). Large per-step
//! retreats relative to the cell size destabilize the coupled solve near
//! stage boundaries; the cap keeps each commit inside the discretization.

use tracing::debug;

/// Limiter configuration.
#[derive(Clone, Copy, Debug)]
pub struct LimiterConfig {
    /// Maximum allowed retreat as a fraction of the cell height.
    pub max_fraction: f64,
    /// Whether to log limited cells.
    pub debug_log: bool,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self { max_fraction: 0.25, debug_log: false }
    }
}

/// Limiter result with diagnostic information.
#[derive(Clone, Copy, Debug)]
pub struct LimitResult {
    /// Retreat actually applied, ft.
    pub applied_ft: f64,
    /// Raw retreat-to-height fraction before scaling.
    pub raw_fraction: f64,
    /// Fraction after scaling.
    pub capped_fraction: f64,
    /// Applied scaling factor (≤ 1.0).
    pub scale_factor: f64,
    /// Whether the retreat was scaled.
    pub was_limited: bool,
}

/// Limit one cell's per-step retreat against its cell height.
pub fn limit(raw_retreat_ft: f64, cell_height_ft: f64, config: LimiterConfig) -> LimitResult {
    let raw_fraction =
        if cell_height_ft > 0.0 { raw_retreat_ft.abs() / cell_height_ft } else { f64::INFINITY };
    let scale_factor =
        if raw_fraction > config.max_fraction { config.max_fraction / raw_fraction } else { 1.0 };
    let applied_ft = raw_retreat_ft * scale_factor;
    let was_limited = scale_factor < 1.0;
    if config.debug_log && was_limited {
        debug!(
            raw_ft = raw_retreat_ft,
            height_ft = cell_height_ft,
            scale = scale_factor,
            "limiting wall retreat"
        );
    }
    LimitResult {
        applied_ft,
        raw_fraction,
        capped_fraction: raw_fraction * scale_factor,
        scale_factor,
        was_limited,
    }
}

/// Limiter statistics over a whole profile.
#[derive(Debug)]
pub struct LimitStats {
    /// Number of cells processed.
    pub cells_processed: u32,
    /// Number of cells that required limiting.
    pub cells_limited: u32,
    /// Maximum capped fraction encountered.
    pub max_fraction: f64,
    /// Minimum scale factor applied.
    pub min_scale_factor: f64,
}

impl LimitStats {
    /// Update statistics with a new limiter result.
    pub fn update(&mut self, result: &LimitResult) {
        self.cells_processed += 1;
        if result.was_limited {
            self.cells_limited += 1;
        }
        self.max_fraction = self.max_fraction.max(result.capped_fraction);
        self.min_scale_factor = self.min_scale_factor.min(result.scale_factor);
    }
}

impl Default for LimitStats {
    fn default() -> Self {
        Self { cells_processed: 0, cells_limited: 0, max_fraction: 0.0, min_scale_factor: 1.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_threshold_passes_through() {
        let r = limit(1.0, 10.0, LimiterConfig::default());
        assert!(!r.was_limited);
        assert_eq!(r.scale_factor, 1.0);
        assert_eq!(r.applied_ft, 1.0);
        assert_eq!(r.raw_fraction, 0.1);
    }

    #[test]
    fn above_threshold_is_capped() {
        let r = limit(5.0, 10.0, LimiterConfig::default());
        assert!(r.was_limited);
        assert_eq!(r.scale_factor, 0.25 / 0.5);
        assert_eq!(r.applied_ft, 2.5);
    }

    #[test]
    fn zero_height_zeroes_the_retreat() {
        let r = limit(1.0, 0.0, LimiterConfig::default());
        assert!(r.was_limited);
        assert_eq!(r.applied_ft, 0.0);
        assert!(r.raw_fraction.is_infinite());
    }

    #[test]
    fn capped_fraction_bounded_for_various_inputs() {
        let cfg = LimiterConfig::default();
        let heights = [0.0, 0.5, 5.0, 10.5, 100.0];
        let raws = [0.0, 1e-6, 0.01, 0.1, 1.0, 10.0, 1e4];
        for &h in &heights {
            for &raw in &raws {
                let r = limit(raw, h, cfg);
                if h > 0.0 {
                    assert!(
                        r.applied_ft.abs() / h <= cfg.max_fraction + 1e-12,
                        "bound violated (raw={raw}, h={h})"
                    );
                } else {
                    assert_eq!(r.applied_ft, 0.0);
                }
            }
        }
    }

    #[test]
    fn applied_is_monotone_in_raw() {
        let cfg = LimiterConfig::default();
        let h = 10.5;
        let mut prev = 0.0;
        for &raw in &[0.0, 0.1, 0.5, 1.0, 2.0, 5.0, 50.0, 5000.0] {
            let r = limit(raw, h, cfg);
            assert!(r.applied_ft + 1e-12 >= prev, "monotonicity violated at raw={raw}");
            prev = r.applied_ft;
            assert!(r.applied_ft <= cfg.max_fraction * h + 1e-9);
        }
    }
}
