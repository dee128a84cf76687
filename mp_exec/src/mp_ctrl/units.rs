//! Unit conversions between physical units and controller native units
//!
//! The controllers work in encoder counts and counts per 100 ms. Profiles
//! are generated in feet and feet per second. The conversion is a fixed
//! linear chain through the wheel geometry: feet to inches, inches to wheel
//! revolutions, revolutions to encoder counts.

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Converter from physical units into encoder units for one wheel geometry.
#[derive(Debug, Clone, Copy)]
pub struct EncoderConverter {
    wheel_diameter_in: f64,
    counts_per_rev: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl EncoderConverter {
    /// Create a converter for the given wheel geometry.
    ///
    /// Both constants must be positive and non zero, the wheel diameter is a
    /// divisor in the conversion chain.
    pub fn new(wheel_diameter_in: f64, counts_per_rev: f64) -> Self {
        Self {
            wheel_diameter_in,
            counts_per_rev,
        }
    }

    /// Convert a position in feet into encoder counts.
    pub fn position_to_counts(&self, position_ft: f64) -> f64 {
        let inches = position_ft * 12.0;
        let revolutions = inches / (self.wheel_diameter_in * std::f64::consts::PI);

        revolutions * self.counts_per_rev
    }

    /// Convert a velocity in feet per second into encoder counts per 100 ms,
    /// the velocity window the controller's executer works in.
    pub fn velocity_to_counts_per_100ms(&self, velocity_fps: f64) -> f64 {
        let ft_per_100ms = velocity_fps / 10.0;
        let inches = ft_per_100ms * 12.0;
        let revolutions = inches / (self.wheel_diameter_in * std::f64::consts::PI);

        revolutions * self.counts_per_rev
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
