//! # Simulated motor controller
//!
//! A deterministic software model of a buffered-trajectory motor controller,
//! used by the executable when no hardware is attached and by the test
//! suites. The model covers the parts of the device the streaming logic
//! depends on: the two-stage point buffer, the sticky underrun flag, the
//! active point report and the mode-specific command input.
//!
//! Playback is driven externally by calling [`SimMotorController::step`],
//! one call per executed point, so tests can hold the device at any instant
//! of a profile.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;

use crate::mp::{
    ControlMode, CtrlError, MotorController, ProfileCommand, ProfileStatus, TrajectoryPoint,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Capacity of the top (API side) trajectory buffer.
pub const TOP_BUFFER_CAPACITY: usize = 2048;

/// Capacity of the bottom (executer side) trajectory buffer.
pub const BTM_BUFFER_CAPACITY: usize = 128;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Simulated controller state.
pub struct SimMotorController {
    mode: ControlMode,
    command: ProfileCommand,

    base_period_ms: u32,

    top: VecDeque<TrajectoryPoint>,
    btm: VecDeque<TrajectoryPoint>,
    active: Option<TrajectoryPoint>,

    has_underrun: bool,

    sensor_position: f64,

    num_clears: usize,
    num_pushes: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimMotorController {
    /// Create a new controller in open loop mode with empty buffers.
    pub fn new() -> Self {
        Self {
            mode: ControlMode::OpenLoop,
            command: ProfileCommand::Disable,
            base_period_ms: 0,
            top: VecDeque::new(),
            btm: VecDeque::new(),
            active: None,
            has_underrun: false,
            sensor_position: 0.0,
            num_clears: 0,
            num_pushes: 0,
        }
    }

    /// Switch the controller's command mode, as an operator would.
    ///
    /// Buffered points are kept across a mode change, matching hardware
    /// behaviour. They must be cleared or retired by the caller.
    pub fn set_control_mode(&mut self, mode: ControlMode) {
        self.mode = mode;
    }

    /// Execute one playback step of the onboard executer.
    ///
    /// While the controller is in profile mode and commanded to Enable, each
    /// step consumes one point from the bottom buffer into the active slot.
    /// A zero flagged point resets the sensor position reference before it
    /// executes. If the bottom buffer is empty before the last point has
    /// been reached the sticky underrun flag is raised. Hold and Disable
    /// commands leave the buffers untouched.
    pub fn step(&mut self) {
        if self.mode != ControlMode::Profile || self.command != ProfileCommand::Enable {
            return;
        }

        match self.btm.pop_front() {
            Some(point) => {
                self.sensor_position = if point.zero_pos { 0.0 } else { point.position };
                self.active = Some(point);
            }
            None => {
                // The executer is starved. This is only an underrun if the
                // profile hasn't completed yet.
                if let Some(active) = self.active {
                    if !active.is_last {
                        self.has_underrun = true;
                    }
                }
            }
        }
    }

    /// The simulated sensor position in encoder counts.
    pub fn sensor_position(&self) -> f64 {
        self.sensor_position
    }

    /// The command value most recently applied to the controller.
    pub fn command(&self) -> ProfileCommand {
        self.command
    }

    /// The base trajectory period most recently configured.
    pub fn base_period_ms(&self) -> u32 {
        self.base_period_ms
    }

    /// Number of buffer clear operations performed on this controller.
    pub fn num_clears(&self) -> usize {
        self.num_clears
    }

    /// Number of points pushed into this controller since construction.
    pub fn num_pushes(&self) -> usize {
        self.num_pushes
    }

    /// Snapshot of the points currently waiting in the top buffer.
    pub fn top_buffer(&self) -> Vec<TrajectoryPoint> {
        self.top.iter().copied().collect()
    }

    /// Raise the sticky underrun flag directly, simulating an executer
    /// starvation that occurred inside the device between status reads.
    pub fn inject_underrun(&mut self) {
        self.has_underrun = true;
    }
}

impl Default for SimMotorController {
    fn default() -> Self {
        Self::new()
    }
}

impl MotorController for SimMotorController {
    fn control_mode(&self) -> ControlMode {
        self.mode
    }

    fn set_command(&mut self, command: ProfileCommand) {
        self.command = command;

        // Disabling the executer drops the active point
        if command == ProfileCommand::Disable {
            self.active = None;
        }
    }

    fn config_base_traj_period(&mut self, period_ms: u32, _timeout_ms: u32) {
        self.base_period_ms = period_ms;
    }

    fn clear_profile_buffer(&mut self) {
        self.top.clear();
        self.btm.clear();
        self.active = None;
        self.num_clears += 1;
    }

    fn push_profile_point(&mut self, point: TrajectoryPoint) -> Result<(), CtrlError> {
        if self.top.len() >= TOP_BUFFER_CAPACITY {
            return Err(CtrlError::TopBufferFull);
        }

        self.top.push_back(point);
        self.num_pushes += 1;

        Ok(())
    }

    fn advance_profile_buffer(&mut self) {
        while self.btm.len() < BTM_BUFFER_CAPACITY {
            match self.top.pop_front() {
                Some(point) => self.btm.push_back(point),
                None => break,
            }
        }
    }

    fn profile_status(&self) -> ProfileStatus {
        ProfileStatus {
            top_buffer_cnt: self.top.len(),
            btm_buffer_cnt: self.btm.len(),
            has_underrun: self.has_underrun,
            active_point_valid: self.active.is_some(),
            active_point_is_last: match self.active {
                Some(p) => p.is_last,
                None => false,
            },
        }
    }

    fn clear_underrun(&mut self) {
        self.has_underrun = false;
    }

    fn active_position(&self) -> f64 {
        match self.active {
            Some(p) => p.position,
            None => 0.0,
        }
    }

    fn active_velocity(&self) -> f64 {
        match self.active {
            Some(p) => p.velocity,
            None => 0.0,
        }
    }

    fn active_heading(&self) -> f64 {
        // The simulation does not model heading
        0.0
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::mp::TrajectoryDuration;

    fn point(position: f64, is_last: bool, zero_pos: bool) -> TrajectoryPoint {
        TrajectoryPoint {
            position,
            velocity: 100.0,
            duration: TrajectoryDuration::Ms10,
            zero_pos,
            is_last,
        }
    }

    fn push_profile(sim: &mut SimMotorController, positions: &[f64]) {
        for (i, &p) in positions.iter().enumerate() {
            sim.push_profile_point(point(p, i + 1 == positions.len(), i == 0))
                .unwrap();
        }
    }

    #[test]
    fn test_advance_moves_points_to_btm() {
        let mut sim = SimMotorController::new();
        push_profile(&mut sim, &[0.0, 10.0, 20.0]);

        assert_eq!(sim.profile_status().top_buffer_cnt, 3);
        assert_eq!(sim.profile_status().btm_buffer_cnt, 0);

        sim.advance_profile_buffer();

        assert_eq!(sim.profile_status().top_buffer_cnt, 0);
        assert_eq!(sim.profile_status().btm_buffer_cnt, 3);
    }

    #[test]
    fn test_playback_and_completion() {
        let mut sim = SimMotorController::new();
        sim.set_control_mode(ControlMode::Profile);
        push_profile(&mut sim, &[0.0, 10.0, 20.0]);
        sim.advance_profile_buffer();

        // Nothing plays while disabled
        sim.step();
        assert!(!sim.profile_status().active_point_valid);

        sim.set_command(ProfileCommand::Enable);
        sim.step();
        sim.step();
        sim.step();

        let status = sim.profile_status();
        assert!(status.active_point_valid);
        assert!(status.active_point_is_last);
        assert!(!status.has_underrun);
        assert_eq!(sim.active_position(), 20.0);
    }

    #[test]
    fn test_underrun_is_sticky() {
        let mut sim = SimMotorController::new();
        sim.set_control_mode(ControlMode::Profile);

        // Two points, neither of which is last, so starving the executer is
        // an underrun
        sim.push_profile_point(point(0.0, false, true)).unwrap();
        sim.push_profile_point(point(10.0, false, false)).unwrap();
        sim.advance_profile_buffer();

        sim.set_command(ProfileCommand::Enable);
        sim.step();
        sim.step();
        sim.step();

        assert!(sim.profile_status().has_underrun);

        // Sticky until explicitly acknowledged
        assert!(sim.profile_status().has_underrun);
        sim.clear_underrun();
        assert!(!sim.profile_status().has_underrun);
    }

    #[test]
    fn test_zero_pos_resets_sensor() {
        let mut sim = SimMotorController::new();
        sim.set_control_mode(ControlMode::Profile);

        // Leave a stale sensor position from a previous run
        push_profile(&mut sim, &[0.0, 500.0]);
        sim.advance_profile_buffer();
        sim.set_command(ProfileCommand::Enable);
        sim.step();
        sim.step();
        assert_eq!(sim.sensor_position(), 500.0);

        // A fresh profile's zero flagged first point resets the sensor
        sim.set_command(ProfileCommand::Disable);
        sim.clear_profile_buffer();
        push_profile(&mut sim, &[0.0, 10.0]);
        sim.advance_profile_buffer();
        sim.set_command(ProfileCommand::Enable);
        sim.step();
        assert_eq!(sim.sensor_position(), 0.0);
    }

    #[test]
    fn test_hold_freezes_active_point() {
        let mut sim = SimMotorController::new();
        sim.set_control_mode(ControlMode::Profile);
        push_profile(&mut sim, &[0.0, 10.0, 20.0]);
        sim.advance_profile_buffer();
        sim.set_command(ProfileCommand::Enable);
        sim.step();
        sim.step();

        sim.set_command(ProfileCommand::Hold);
        sim.step();
        sim.step();

        // The active point and remaining buffer are unchanged under Hold
        assert_eq!(sim.active_position(), 10.0);
        assert_eq!(sim.profile_status().btm_buffer_cnt, 1);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut sim = SimMotorController::new();
        sim.clear_profile_buffer();
        sim.clear_profile_buffer();

        let status = sim.profile_status();
        assert_eq!(status.top_buffer_cnt, 0);
        assert_eq!(status.btm_buffer_cnt, 0);
        assert_eq!(sim.num_clears(), 2);
    }
}
