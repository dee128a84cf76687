//! # Motion Profile Controller Interface
//!
//! Definitions for the trajectory points streamed into a controller, the
//! status it reports back, and the [`MotorController`] trait which abstracts
//! over real and simulated devices.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Point durations supported by the controller firmware, in milliseconds.
pub const SUPPORTED_DURATIONS_MS: [u32; 9] = [0, 5, 10, 20, 25, 30, 40, 50, 100];

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Duration of a single trajectory point.
///
/// The controller only supports the enumerated set of durations, any other
/// value must be mapped onto this set before a point can be pushed.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrajectoryDuration {
    Ms0,
    Ms5,
    Ms10,
    Ms20,
    Ms25,
    Ms30,
    Ms40,
    Ms50,
    Ms100
}

/// The command value applied to a controller while it is in profile mode.
///
/// Exactly one value is current at any time. The caller shall apply the same
/// value to both controllers of a drive pair within the same control cycle so
/// that the two sides stay synchronised.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProfileCommand {
    /// No output, the executer is stopped.
    Disable,

    /// Begin (or continue) playing back the buffered profile.
    Enable,

    /// Servo on the last executed trajectory point's target.
    Hold
}

/// The command mode a controller is operating in.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ControlMode {
    /// Direct open loop drive, for example from operator sticks.
    OpenLoop,

    /// Buffered trajectory playback.
    Profile
}

/// Errors reported by a controller.
#[derive(Debug, Error)]
pub enum CtrlError {
    #[error("The controller's top trajectory buffer is full")]
    TopBufferFull
}

/// Error raised when a requested point duration is not in the supported set.
#[derive(Debug, Error)]
#[error("A trajectory point duration of {0} ms is not supported by the controller")]
pub struct UnsupportedDurationError(pub u32);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One sample of a motion profile in controller native units.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct TrajectoryPoint {
    /// Target position in encoder counts.
    pub position: f64,

    /// Target velocity in encoder counts per 100 ms.
    pub velocity: f64,

    /// Time the executer spends on this point.
    pub duration: TrajectoryDuration,

    /// If true the controller resets its position reference before executing
    /// this point. Set only on the first point of a profile.
    pub zero_pos: bool,

    /// If true this point completes the profile. Set only on the final point.
    pub is_last: bool
}

/// Snapshot of the controller's profile executer and buffer state.
///
/// The underrun flag is sticky. It is not cleared by reading the status, the
/// caller must call [`MotorController::clear_underrun`] once the underrun has
/// been recorded, which guarantees every underrun is observed.
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone)]
pub struct ProfileStatus {
    /// Number of points waiting in the top (API side) buffer.
    pub top_buffer_cnt: usize,

    /// Number of points in the bottom (executer side) buffer.
    pub btm_buffer_cnt: usize,

    /// Sticky flag raised when the executer ran out of points mid-profile.
    pub has_underrun: bool,

    /// True if the executer currently holds a valid active point.
    pub active_point_valid: bool,

    /// True if the active point is flagged as the last point of the profile.
    pub active_point_is_last: bool
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Trait providing a unified API for motor controllers with a buffered
/// trajectory executer.
///
/// All operations are immediate, either fire-and-forget writes or status
/// reads, so that callers in a fixed-rate control loop never block on the
/// device.
pub trait MotorController: Send {
    /// Get the command mode the controller is currently in.
    fn control_mode(&self) -> ControlMode;

    /// Apply a profile command value to the controller.
    fn set_command(&mut self, command: ProfileCommand);

    /// Configure the base trajectory period added to every point's own
    /// duration. `timeout_ms` bounds the device configuration transaction.
    fn config_base_traj_period(&mut self, period_ms: u32, timeout_ms: u32);

    /// Remove all buffered trajectory points from both buffer stages. Safe to
    /// call when the buffers are already empty.
    fn clear_profile_buffer(&mut self);

    /// Push a point into the top buffer.
    fn push_profile_point(&mut self, point: TrajectoryPoint) -> Result<(), CtrlError>;

    /// Advance points from the top buffer into the bottom buffer. Called from
    /// the buffer pump at a higher rate than the control cycle.
    fn advance_profile_buffer(&mut self);

    /// Read the current executer and buffer status.
    fn profile_status(&self) -> ProfileStatus;

    /// Acknowledge a previously reported underrun by clearing the sticky flag.
    fn clear_underrun(&mut self);

    /// Position target of the active trajectory point in encoder counts.
    fn active_position(&self) -> f64;

    /// Velocity target of the active trajectory point in counts per 100 ms.
    fn active_velocity(&self) -> f64;

    /// Heading of the active trajectory point in radians.
    fn active_heading(&self) -> f64;
}

/// A controller shared between the control cycle and the buffer pump thread.
pub type SharedController = Arc<Mutex<dyn MotorController>>;

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl TrajectoryDuration {
    /// The duration in milliseconds.
    pub fn as_ms(&self) -> u32 {
        match self {
            TrajectoryDuration::Ms0 => 0,
            TrajectoryDuration::Ms5 => 5,
            TrajectoryDuration::Ms10 => 10,
            TrajectoryDuration::Ms20 => 20,
            TrajectoryDuration::Ms25 => 25,
            TrajectoryDuration::Ms30 => 30,
            TrajectoryDuration::Ms40 => 40,
            TrajectoryDuration::Ms50 => 50,
            TrajectoryDuration::Ms100 => 100
        }
    }

    /// Get the duration matching the given number of milliseconds, or an
    /// error if the value is not in the supported set.
    pub fn from_ms(ms: u32) -> Result<Self, UnsupportedDurationError> {
        match ms {
            0 => Ok(TrajectoryDuration::Ms0),
            5 => Ok(TrajectoryDuration::Ms5),
            10 => Ok(TrajectoryDuration::Ms10),
            20 => Ok(TrajectoryDuration::Ms20),
            25 => Ok(TrajectoryDuration::Ms25),
            30 => Ok(TrajectoryDuration::Ms30),
            40 => Ok(TrajectoryDuration::Ms40),
            50 => Ok(TrajectoryDuration::Ms50),
            100 => Ok(TrajectoryDuration::Ms100),
            _ => Err(UnsupportedDurationError(ms))
        }
    }

    /// Get the supported duration closest to the given number of
    /// milliseconds. Ties resolve to the shorter duration.
    pub fn nearest(ms: u32) -> Self {
        let mut best_ms = SUPPORTED_DURATIONS_MS[0];

        for &supported in SUPPORTED_DURATIONS_MS.iter() {
            let best_diff = (best_ms as i64 - ms as i64).abs();
            let diff = (supported as i64 - ms as i64).abs();

            if diff < best_diff {
                best_ms = supported;
            }
        }

        // best_ms is always in the supported set so this cannot fail
        match Self::from_ms(best_ms) {
            Ok(d) => d,
            Err(_) => TrajectoryDuration::Ms0
        }
    }
}

impl Default for TrajectoryDuration {
    fn default() -> Self {
        TrajectoryDuration::Ms0
    }
}

impl ProfileCommand {
    /// The value accepted by the controller's command-set operation.
    pub fn as_value(&self) -> i32 {
        match self {
            ProfileCommand::Disable => 0,
            ProfileCommand::Enable => 1,
            ProfileCommand::Hold => 2
        }
    }
}

impl Default for ProfileCommand {
    fn default() -> Self {
        ProfileCommand::Disable
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duration_round_trip() {
        for &ms in SUPPORTED_DURATIONS_MS.iter() {
            let duration = TrajectoryDuration::from_ms(ms).unwrap();
            assert_eq!(duration.as_ms(), ms);
        }
    }

    #[test]
    fn test_duration_unsupported() {
        assert!(TrajectoryDuration::from_ms(7).is_err());
        assert!(TrajectoryDuration::from_ms(150).is_err());
    }

    #[test]
    fn test_duration_nearest() {
        assert_eq!(TrajectoryDuration::nearest(0), TrajectoryDuration::Ms0);
        assert_eq!(TrajectoryDuration::nearest(4), TrajectoryDuration::Ms5);
        assert_eq!(TrajectoryDuration::nearest(11), TrajectoryDuration::Ms10);
        assert_eq!(TrajectoryDuration::nearest(60), TrajectoryDuration::Ms50);
        assert_eq!(TrajectoryDuration::nearest(1000), TrajectoryDuration::Ms100);
    }

    #[test]
    fn test_command_values() {
        assert_eq!(ProfileCommand::Disable.as_value(), 0);
        assert_eq!(ProfileCommand::Enable.as_value(), 1);
        assert_eq!(ProfileCommand::Hold.as_value(), 2);
    }
}
