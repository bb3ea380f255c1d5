//! Units-of-measure newtypes and the authoritative conversion constants.
//! Conversions are explicit; mixing units requires an intentional conversion.
//!
//! The numeric values below are fixed by the legacy reference implementation
//! and must be used through these helpers at every site, never re-derived.

/// Cubic feet per oilfield barrel (42 US gallons). The single authoritative
/// volume conversion used everywhere in the engine.
pub const CUFT_PER_BBL: f64 = 5.614_583_333_333_333;

/// Specific gravity of fresh water (the reference density).
pub const SG_WATER: f64 = 1.0;

/// Specific gravity of fully saturated NaCl brine at cavern temperature.
pub const SG_SATURATED: f64 = 1.2019;

/// Specific gravity of intact rock salt.
pub const SG_ROCK_SALT: f64 = 2.16;

/// Hours per day, for decks that express timesteps in hours.
pub const HOURS_PER_DAY: f64 = 24.0;

/// Depth or length in feet (ft), positive downward for depths.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Feet(pub f64);

/// Elapsed time in days.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Days(pub f64);

/// Volume in oilfield barrels (bbl).
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Barrels(pub f64);

/// Volume in cubic feet (ft³).
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct CubicFeet(pub f64);

impl Feet {
    /// Construct from a raw f64 in feet.
    pub fn new(v: f64) -> Self {
        Self(v)
    }
    /// Extract the raw numeric value in feet.
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Days {
    /// Construct from a raw f64 in days.
    pub fn new(v: f64) -> Self {
        Self(v)
    }
    /// Construct from a raw f64 in hours.
    pub fn from_hours(v: f64) -> Self {
        Self(v / HOURS_PER_DAY)
    }
    /// Extract the raw numeric value in days.
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Barrels {
    /// Construct from a raw f64 in barrels.
    pub fn new(v: f64) -> Self {
        Self(v)
    }
    /// Extract the raw numeric value in barrels.
    pub fn value(self) -> f64 {
        self.0
    }
}

impl CubicFeet {
    /// Construct from a raw f64 in cubic feet.
    pub fn new(v: f64) -> Self {
        Self(v)
    }
    /// Extract the raw numeric value in cubic feet.
    pub fn value(self) -> f64 {
        self.0
    }
}

// Explicit conversions
impl From<Barrels> for CubicFeet {
    fn from(v: Barrels) -> Self {
        CubicFeet(v.0 * CUFT_PER_BBL)
    }
}

impl From<CubicFeet> for Barrels {
    fn from(v: CubicFeet) -> Self {
        Barrels(v.0 / CUFT_PER_BBL)
    }
}

/// Convert a raw barrel count to cubic feet.
#[inline]
pub fn bbl_to_cuft(v: f64) -> f64 {
    v * CUFT_PER_BBL
}

/// Convert a raw cubic-foot count to barrels.
#[inline]
pub fn cuft_to_bbl(v: f64) -> f64 {
    v / CUFT_PER_BBL
}

/// Shorthand constructor for feet.
pub fn ft(v: f64) -> Feet {
    Feet::new(v)
}
/// Shorthand constructor for days.
pub fn days(v: f64) -> Days {
    Days::new(v)
}
/// Shorthand constructor for barrels.
pub fn bbl(v: f64) -> Barrels {
    Barrels::new(v)
}
