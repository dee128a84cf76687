//! Parameters structure for MpCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for motion profile control.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct Params {

    // ---- GEOMETRY ----

    /// The diameter of the drive wheels.
    ///
    /// Units: inches
    pub wheel_diameter_in: f64,

    /// Encoder counts produced by one full wheel revolution.
    pub encoder_counts_per_rev: f64,

    // ---- STREAMING ----

    /// Number of points that must be staged in a controller's executer
    /// buffer, on both sides, before playback is enabled.
    pub min_buffered_points: usize,

    /// Base trajectory period added by the controller to every point's own
    /// duration. Zero leaves timing entirely to the per point durations.
    ///
    /// Units: milliseconds
    pub base_traj_period_ms: u32,

    /// Bound on the controller configuration transaction when setting the
    /// base trajectory period.
    ///
    /// Units: milliseconds
    pub config_timeout_ms: u32,

    /// Period of the buffer pump thread. Should be at most half the
    /// smallest point duration in use so the executers never starve.
    ///
    /// Units: seconds
    pub pump_period_s: f64,

    // ---- MONITORING ----

    /// Wall clock budget for the controllers to show progress while the
    /// state machine is waiting on them. Expiry is reported, not fatal.
    ///
    /// Units: seconds
    pub liveness_budget_s: f64,
}
