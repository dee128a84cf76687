//! Implementations for the MpCtrl state structure
//!
//! The streaming sequence is a small state machine. From `Idle` a start
//! request clears and fills both controllers' buffers and moves to
//! `Filling`. Once both executers hold enough points the command output
//! becomes `Enable` and the machine waits in `AwaitingBufferFill` for
//! playback to be confirmed, then monitors it in `Running`. When both sides
//! report the last point active the output becomes `Hold` and the machine
//! returns to `Idle`. Leaving profile mode at any instant parks the machine
//! back in `Idle`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info};
use serde::Serialize;
use std::time::{Duration, Instant};

// Internal
use super::{
    EncoderConverter, InitError, MpCtrlError, Params, Side, SideStreamer,
};
use crate::profile::Profile;
use ctrl_if::mp::{ControlMode, ProfileCommand, SharedController};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    params,
    session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Motion profile control module state
pub struct MpCtrl {
    pub(crate) params: Params,

    state: State,

    /// Set by a start request, serviced on the next cycle in `Idle`.
    start_pending: bool,

    timeout: LivenessTimeout,

    left: SideStreamer,
    right: SideStreamer,

    left_profile: Profile,
    right_profile: Profile,

    /// Number of points streamed per side, the shorter of the two profile
    /// lengths.
    common_len: usize,

    /// True if the loaded profile pair differs in length between sides.
    len_mismatch: bool,

    /// The command value the caller shall apply to both controllers.
    command: ProfileCommand,

    report: StatusReport,

    arch_tm: Archiver,

    /// Called once per arming when the liveness budget expires.
    on_no_progress: Option<Box<dyn FnMut() + Send>>,
}

/// Input data to motion profile control.
#[derive(Default, Copy, Clone, Debug)]
pub struct InputData {
    /// True to request the loaded profile pair be started on this cycle.
    pub start: bool,
}

/// Output command from MpCtrl that the caller must apply to both controllers
/// within the same cycle.
#[derive(Default, Copy, Clone, Serialize, Debug)]
pub struct OutputData {
    pub command: ProfileCommand,
}

/// The status report containing error flags and monitoring quantities.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// The state the machine is in after this cycle.
    pub state: State,

    /// True if the loaded profile pair differs in length between sides.
    pub profile_len_mismatch: bool,

    /// True while the liveness watchdog is armed.
    pub liveness_armed: bool,

    /// Raised on the cycle the liveness budget expires.
    pub liveness_expired: bool,

    pub left: SideReport,
    pub right: SideReport,
}

/// Per side monitoring quantities.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct SideReport {
    /// Points currently staged in the executer buffer.
    pub btm_buffer_cnt: usize,

    /// True if the controller reported an underrun on this cycle.
    pub has_underrun: bool,

    /// True if a sticky underrun was acknowledged during a fill this cycle.
    pub underrun_acked: bool,

    /// Number of samples whose duration was substituted during a fill this
    /// cycle.
    pub unsupported_durations: u32,

    /// Number of points the controller rejected during a fill this cycle.
    pub rejected_points: u32,

    /// Active point position target in encoder counts.
    pub active_position: f64,

    /// Active point velocity target in counts per 100 ms.
    pub active_velocity: f64,

    /// Active point heading in radians.
    pub active_heading_rad: f64,
}

/// Wall clock watchdog for external hardware progress.
///
/// Disarmed the deadline is `None`. Armed it counts down from the given
/// budget and reports expiry exactly once per arming. Re-arming is how the
/// machine feeds the watchdog while the controllers are making progress.
#[derive(Default)]
struct LivenessTimeout {
    deadline: Option<Instant>,
    reported: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The states of the streaming sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum State {
    /// Waiting for a start request.
    Idle,

    /// Profile pushed, waiting for enough points to stage in the executers.
    Filling,

    /// Playback enabled, waiting for both executers to confirm an active
    /// point.
    AwaitingBufferFill,

    /// Playback confirmed, monitoring for completion and underruns.
    Running,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl util::module::State for MpCtrl {
    type InitData = &'static str;
    type InitError = InitError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = MpCtrlError;

    /// Initialise the MpCtrl module.
    ///
    /// Expected init data is the path to the parameter file.
    fn init(
        &mut self,
        init_data: Self::InitData,
        session: &session::Session,
    ) -> Result<(), Self::InitError> {
        self.params = params::load(init_data)?;

        self.arch_tm = Archiver::from_path(session, "mp_ctrl/telemetry.csv")?;

        Ok(())
    }

    /// Perform cyclic processing of motion profile control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Clear the status report, the mismatch flag is a property of the
        // loaded pair and carries over
        self.report = StatusReport {
            profile_len_mismatch: self.len_mismatch,
            ..StatusReport::default()
        };

        if input_data.start {
            self.request_start();
        }

        // Status snapshot for this cycle
        self.left.poll();
        self.right.poll();

        // Service the watchdog before anything else so a stalled controller
        // is reported even if the state action does nothing this cycle
        if self.timeout.service() {
            error!("No progress from the controllers within the liveness budget");
            self.report.liveness_expired = true;

            if let Some(ref mut callback) = self.on_no_progress {
                callback();
            }
        }

        let in_profile_mode = self.left.control_mode() == ControlMode::Profile
            && self.right.control_mode() == ControlMode::Profile;

        if in_profile_mode {
            self.step_state()?;

            // Track the executers for telemetry while they are ours to watch
            self.left.cache_active();
            self.right.cache_active();
        } else {
            // The operator is driving some other way, park the machine so a
            // later return to profile mode starts from a clean slate
            self.state = State::Idle;
            self.timeout.disarm();
            self.start_pending = false;
        }

        self.report.state = self.state;
        self.report.liveness_armed = self.timeout.is_armed();
        self.update_side_reports();

        Ok((
            OutputData {
                command: self.command,
            },
            self.report,
        ))
    }
}

impl MpCtrl {
    /// Create a new module instance driving the given controller pair.
    pub fn new(left_ctrl: SharedController, right_ctrl: SharedController) -> Self {
        Self {
            params: Params::default(),
            state: State::Idle,
            start_pending: false,
            timeout: LivenessTimeout::default(),
            left: SideStreamer::new(Side::Left, left_ctrl),
            right: SideStreamer::new(Side::Right, right_ctrl),
            left_profile: Profile::default(),
            right_profile: Profile::default(),
            common_len: 0,
            len_mismatch: false,
            command: ProfileCommand::Disable,
            report: StatusReport::default(),
            arch_tm: Archiver::default(),
            on_no_progress: None,
        }
    }

    /// Load the profile pair to be streamed on the next start request.
    ///
    /// The sides are expected to be equal length. A mismatch is reported
    /// here and again at fill time, and the common prefix of both profiles
    /// is streamed.
    pub fn set_profiles(&mut self, left: Profile, right: Profile) {
        self.len_mismatch = left.num_points() != right.num_points();
        self.common_len = left.num_points().min(right.num_points());

        if self.len_mismatch {
            error!(
                "Left and right profiles differ in length ({} vs {} points), \
                 the common {} points will be streamed",
                left.num_points(),
                right.num_points(),
                self.common_len
            );
        }

        self.left_profile = left;
        self.right_profile = right;
    }

    /// Request that the loaded profile pair be started.
    ///
    /// The request is serviced on the next cycle. Requests made while a
    /// profile is already streaming are ignored.
    pub fn request_start(&mut self) {
        if self.state == State::Idle {
            self.start_pending = true;
        } else {
            debug!("Start requested while already streaming, ignored");
        }
    }

    /// Reset the module to a clean slate.
    ///
    /// Clears both controllers' buffers, in case a disable arrived in the
    /// middle of a profile and left half of it buffered, disables the
    /// output, and discards any pending start request.
    pub fn reset(&mut self) {
        self.left.clear_buffer();
        self.right.clear_buffer();

        self.command = ProfileCommand::Disable;
        self.state = State::Idle;
        self.timeout.disarm();
        self.start_pending = false;
    }

    /// The command value the caller shall apply to both controllers.
    pub fn command(&self) -> ProfileCommand {
        self.command
    }

    /// The state the machine is currently in.
    pub fn state(&self) -> State {
        self.state
    }

    /// The period the buffer pump should run at for the loaded parameters.
    pub fn pump_period(&self) -> Duration {
        Duration::from_secs_f64(self.params.pump_period_s.max(0.0))
    }

    /// Register a callback fired once per arming when the liveness budget
    /// expires.
    pub fn set_no_progress_callback(&mut self, callback: Box<dyn FnMut() + Send>) {
        self.on_no_progress = Some(callback);
    }

    /// Run the state action for this cycle.
    fn step_state(&mut self) -> Result<(), MpCtrlError> {
        match self.state {
            State::Idle => {
                if self.start_pending {
                    self.start_pending = false;

                    // Stay disabled until enough points reach the executers
                    self.command = ProfileCommand::Disable;
                    self.start_filling()?;

                    self.timeout.arm(self.liveness_budget());
                    self.state = State::Filling;

                    info!(
                        "Profile fill started, streaming {} points per side",
                        self.common_len
                    );
                }
            }

            State::Filling => {
                let min_points = self.params.min_buffered_points;

                if self.left.buffer_ready(min_points) && self.right.buffer_ready(min_points) {
                    // Enough points staged on both sides, fire the profile
                    self.command = ProfileCommand::Enable;
                    self.timeout.arm(self.liveness_budget());
                    self.state = State::AwaitingBufferFill;

                    info!(
                        "Both executers hold more than {} points, playback enabled",
                        min_points
                    );
                }
            }

            State::AwaitingBufferFill | State::Running => {
                // Healthy progress feeds the watchdog, so a controller
                // dropping off the bus mid profile still gets caught
                if !self.left.underrun() && !self.right.underrun() {
                    self.timeout.arm(self.liveness_budget());
                }

                if self.left.profile_complete() && self.right.profile_complete() {
                    // The last point is active on both sides, servo there
                    self.command = ProfileCommand::Hold;
                    self.timeout.disarm();
                    self.state = State::Idle;

                    info!("Profile complete on both sides, holding the final point");
                } else if self.state == State::AwaitingBufferFill
                    && self.left.active_point_valid()
                    && self.right.active_point_valid()
                {
                    // Playback confirmed on both sides
                    self.state = State::Running;
                }
            }
        }

        Ok(())
    }

    /// Clear and fill both controllers' buffers with the loaded pair.
    fn start_filling(&mut self) -> Result<(), MpCtrlError> {
        if self.common_len == 0 {
            return Err(MpCtrlError::NoProfileLoaded);
        }

        if self.len_mismatch {
            error!(
                "Streaming a mismatched profile pair, using the common {} points",
                self.common_len
            );
        }

        let conv = EncoderConverter::new(
            self.params.wheel_diameter_in,
            self.params.encoder_counts_per_rev,
        );

        self.left.fill(
            &self.left_profile,
            self.common_len,
            &conv,
            &self.params,
            &mut self.report.left,
        );
        self.right.fill(
            &self.right_profile,
            self.common_len,
            &conv,
            &self.params,
            &mut self.report.right,
        );

        Ok(())
    }

    /// Copy the per side monitoring quantities into the status report.
    fn update_side_reports(&mut self) {
        self.report.left.btm_buffer_cnt = self.left.status.btm_buffer_cnt;
        self.report.left.has_underrun = self.left.status.has_underrun;
        self.report.left.active_position = self.left.active_position();
        self.report.left.active_velocity = self.left.active_velocity();
        self.report.left.active_heading_rad = self.left.active_heading_rad();

        self.report.right.btm_buffer_cnt = self.right.status.btm_buffer_cnt;
        self.report.right.has_underrun = self.right.status.has_underrun;
        self.report.right.active_position = self.right.active_position();
        self.report.right.active_velocity = self.right.active_velocity();
        self.report.right.active_heading_rad = self.right.active_heading_rad();
    }

    fn liveness_budget(&self) -> Duration {
        Duration::from_secs_f64(self.params.liveness_budget_s.max(0.0))
    }
}

impl LivenessTimeout {
    /// Arm (or re-arm) the watchdog with the given budget.
    fn arm(&mut self, budget: Duration) {
        self.deadline = Some(Instant::now() + budget);
        self.reported = false;
    }

    /// Disarm the watchdog.
    fn disarm(&mut self) {
        self.deadline = None;
    }

    fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Check for expiry. Returns true exactly once per arming, on the first
    /// call past the deadline.
    fn service(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline && !self.reported => {
                self.reported = true;
                true
            }
            _ => false,
        }
    }
}

impl Default for State {
    fn default() -> Self {
        State::Idle
    }
}

impl Archived for MpCtrl {
    fn write(&mut self) -> Result<(), ArchiveError> {
        let record = TmRecord::from_report(&self.report, self.command);
        self.arch_tm.serialise(record)
    }
}

// ---------------------------------------------------------------------------
// TELEMETRY RECORD
// ---------------------------------------------------------------------------

/// Flat per cycle telemetry record, the CSV writer cannot produce headers
/// for nested structures.
#[derive(Serialize)]
struct TmRecord {
    time_s: f64,
    state: String,
    command: i32,
    left_btm_buffer_cnt: usize,
    right_btm_buffer_cnt: usize,
    left_underrun: bool,
    right_underrun: bool,
    left_active_position: f64,
    left_active_velocity: f64,
    right_active_position: f64,
    right_active_velocity: f64,
    liveness_armed: bool,
}

impl TmRecord {
    fn from_report(report: &StatusReport, command: ProfileCommand) -> Self {
        Self {
            time_s: session::get_elapsed_seconds(),
            state: format!("{:?}", report.state),
            command: command.as_value(),
            left_btm_buffer_cnt: report.left.btm_buffer_cnt,
            right_btm_buffer_cnt: report.right.btm_buffer_cnt,
            left_underrun: report.left.has_underrun,
            right_underrun: report.right.has_underrun,
            left_active_position: report.left.active_position,
            left_active_velocity: report.left.active_velocity,
            right_active_position: report.right.active_position,
            right_active_velocity: report.right.active_velocity,
            liveness_armed: report.liveness_armed,
        }
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::profile::ProfileSample;
    use ctrl_if::mp::MotorController;
    use ctrl_if::sim::SimMotorController;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use util::module::State as ModuleState;

    type SharedSim = Arc<Mutex<SimMotorController>>;

    fn profile(num_points: usize) -> Profile {
        Profile {
            samples: (0..num_points)
                .map(|i| ProfileSample {
                    position_ft: i as f64 * 0.1,
                    velocity_fps: 1.0,
                    duration_s: 0.01,
                })
                .collect(),
        }
    }

    fn params(min_buffered_points: usize, liveness_budget_s: f64) -> Params {
        Params {
            wheel_diameter_in: 3.5,
            encoder_counts_per_rev: 4096.0,
            min_buffered_points,
            base_traj_period_ms: 0,
            config_timeout_ms: 30,
            pump_period_s: 0.005,
            liveness_budget_s,
        }
    }

    /// Build a module driving two simulated controllers in profile mode,
    /// loaded with equal length profiles.
    fn make_ctrl(
        min_buffered_points: usize,
        liveness_budget_s: f64,
        num_points: usize,
    ) -> (MpCtrl, SharedSim, SharedSim) {
        let left = Arc::new(Mutex::new(SimMotorController::new()));
        let right = Arc::new(Mutex::new(SimMotorController::new()));

        left.lock().unwrap().set_control_mode(ControlMode::Profile);
        right.lock().unwrap().set_control_mode(ControlMode::Profile);

        let mut ctrl = MpCtrl::new(left.clone(), right.clone());
        ctrl.params = params(min_buffered_points, liveness_budget_s);
        ctrl.set_profiles(profile(num_points), profile(num_points));

        (ctrl, left, right)
    }

    fn tick(ctrl: &mut MpCtrl) -> (OutputData, StatusReport) {
        ctrl.proc(&InputData::default()).unwrap()
    }

    fn advance(sim: &SharedSim) {
        sim.lock().unwrap().advance_profile_buffer();
    }

    fn apply(sim: &SharedSim, command: ProfileCommand) {
        sim.lock().unwrap().set_command(command);
    }

    fn step(sim: &SharedSim) {
        sim.lock().unwrap().step();
    }

    #[test]
    fn test_start_fills_once_and_enters_filling() {
        let (mut ctrl, left, right) = make_ctrl(2, 1.0, 3);

        // Nothing happens without a start request
        let (out, rpt) = tick(&mut ctrl);
        assert_eq!(rpt.state, State::Idle);
        assert_eq!(out.command, ProfileCommand::Disable);
        assert_eq!(left.lock().unwrap().num_clears(), 0);

        ctrl.request_start();
        let (out, rpt) = tick(&mut ctrl);

        assert_eq!(rpt.state, State::Filling);
        assert_eq!(out.command, ProfileCommand::Disable);
        assert!(rpt.liveness_armed);

        // Exactly one clear and one full fill per side
        assert_eq!(left.lock().unwrap().num_clears(), 1);
        assert_eq!(left.lock().unwrap().num_pushes(), 3);
        assert_eq!(right.lock().unwrap().num_clears(), 1);
        assert_eq!(right.lock().unwrap().num_pushes(), 3);

        // Another cycle without buffer progress stays in Filling without
        // refilling
        let (_, rpt) = tick(&mut ctrl);
        assert_eq!(rpt.state, State::Filling);
        assert_eq!(left.lock().unwrap().num_clears(), 1);
    }

    #[test]
    fn test_request_start_outside_idle_is_noop() {
        let (mut ctrl, left, _right) = make_ctrl(2, 1.0, 3);

        ctrl.request_start();
        tick(&mut ctrl);
        assert_eq!(ctrl.state(), State::Filling);

        ctrl.request_start();
        assert!(!ctrl.start_pending);

        tick(&mut ctrl);
        assert_eq!(left.lock().unwrap().num_clears(), 1);
    }

    #[test]
    fn test_enable_waits_for_both_sides() {
        let (mut ctrl, left, right) = make_ctrl(2, 1.0, 3);

        ctrl.request_start();
        tick(&mut ctrl);

        // Only the left executer has points staged, keep waiting
        advance(&left);
        let (out, rpt) = tick(&mut ctrl);
        assert_eq!(rpt.state, State::Filling);
        assert_eq!(out.command, ProfileCommand::Disable);

        // Both sides above the threshold (3 > 2), fire
        advance(&right);
        let (out, rpt) = tick(&mut ctrl);
        assert_eq!(rpt.state, State::AwaitingBufferFill);
        assert_eq!(out.command, ProfileCommand::Enable);
        assert_eq!(rpt.left.btm_buffer_cnt, 3);
        assert_eq!(rpt.right.btm_buffer_cnt, 3);
    }

    #[test]
    fn test_running_confirmed_once_active() {
        let (mut ctrl, left, right) = make_ctrl(2, 1.0, 3);

        ctrl.request_start();
        tick(&mut ctrl);
        advance(&left);
        advance(&right);
        let (out, _) = tick(&mut ctrl);

        apply(&left, out.command);
        apply(&right, out.command);
        step(&left);
        step(&right);

        let (_, rpt) = tick(&mut ctrl);
        assert_eq!(rpt.state, State::Running);
        assert!(rpt.left.active_position.abs() < 1e-9);
    }

    #[test]
    fn test_three_point_profile_end_to_end() {
        let (mut ctrl, left, right) = make_ctrl(2, 1.0, 3);

        ctrl.request_start();
        let (out, rpt) = tick(&mut ctrl);
        assert_eq!(rpt.state, State::Filling);
        assert_eq!(out.command, ProfileCommand::Disable);

        advance(&left);
        advance(&right);
        let (out, rpt) = tick(&mut ctrl);
        assert_eq!(rpt.state, State::AwaitingBufferFill);
        assert_eq!(out.command, ProfileCommand::Enable);

        // The caller applies the command and the executers play the profile
        apply(&left, out.command);
        apply(&right, out.command);
        for _ in 0..3 {
            step(&left);
            step(&right);
        }

        let (out, rpt) = tick(&mut ctrl);
        assert_eq!(out.command, ProfileCommand::Hold);
        assert_eq!(rpt.state, State::Idle);
        assert!(!rpt.liveness_armed);
    }

    #[test]
    fn test_underrun_reported_and_acknowledged_once() {
        let (mut ctrl, left, _right) = make_ctrl(2, 1.0, 3);

        left.lock().unwrap().inject_underrun();

        ctrl.request_start();
        let (_, rpt) = tick(&mut ctrl);

        // The fill observed the sticky flag, reported it and cleared it
        assert!(rpt.left.has_underrun);
        assert!(rpt.left.underrun_acked);
        assert!(!rpt.right.underrun_acked);
        assert!(!left.lock().unwrap().profile_status().has_underrun);

        // With the flag cleared on the device nothing is reported again
        let (_, rpt) = tick(&mut ctrl);
        assert!(!rpt.left.has_underrun);
        assert!(!rpt.left.underrun_acked);
    }

    #[test]
    fn test_mode_exit_parks_the_machine() {
        let (mut ctrl, left, _right) = make_ctrl(2, 1.0, 3);

        ctrl.request_start();
        tick(&mut ctrl);
        assert_eq!(ctrl.state(), State::Filling);

        // The operator takes over, for example on the sticks
        left.lock().unwrap().set_control_mode(ControlMode::OpenLoop);

        let (_, rpt) = tick(&mut ctrl);
        assert_eq!(rpt.state, State::Idle);
        assert!(!rpt.liveness_armed);

        // Repeated application is idempotent
        let (_, rpt) = tick(&mut ctrl);
        assert_eq!(rpt.state, State::Idle);
        assert!(!rpt.liveness_armed);
    }

    #[test]
    fn test_mode_exit_discards_pending_start() {
        let (mut ctrl, left, _right) = make_ctrl(2, 1.0, 3);

        ctrl.request_start();
        left.lock().unwrap().set_control_mode(ControlMode::OpenLoop);
        tick(&mut ctrl);
        assert!(!ctrl.start_pending);

        // Back in profile mode the discarded request must not fire
        left.lock().unwrap().set_control_mode(ControlMode::Profile);
        let (_, rpt) = tick(&mut ctrl);
        assert_eq!(rpt.state, State::Idle);
        assert_eq!(left.lock().unwrap().num_clears(), 0);
    }

    #[test]
    fn test_liveness_expiry_reported_once() {
        let (mut ctrl, _left, _right) = make_ctrl(2, 0.0, 3);

        let count = Arc::new(AtomicUsize::new(0));
        let cb_count = count.clone();
        ctrl.set_no_progress_callback(Box::new(move || {
            cb_count.fetch_add(1, Ordering::Relaxed);
        }));

        ctrl.request_start();
        tick(&mut ctrl);

        // The zero budget expired immediately, reported on the next cycle
        let (_, rpt) = tick(&mut ctrl);
        assert!(rpt.liveness_expired);
        assert_eq!(count.load(Ordering::Relaxed), 1);

        // Latched until the next arming
        let (_, rpt) = tick(&mut ctrl);
        assert!(!rpt.liveness_expired);
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_mismatched_pair_streams_common_prefix() {
        let left_sim = Arc::new(Mutex::new(SimMotorController::new()));
        let right_sim = Arc::new(Mutex::new(SimMotorController::new()));
        left_sim
            .lock()
            .unwrap()
            .set_control_mode(ControlMode::Profile);
        right_sim
            .lock()
            .unwrap()
            .set_control_mode(ControlMode::Profile);

        let mut ctrl = MpCtrl::new(left_sim.clone(), right_sim.clone());
        ctrl.params = params(2, 1.0);
        ctrl.set_profiles(profile(3), profile(2));

        ctrl.request_start();
        let (_, rpt) = tick(&mut ctrl);

        assert!(rpt.profile_len_mismatch);
        assert_eq!(left_sim.lock().unwrap().num_pushes(), 2);
        assert_eq!(right_sim.lock().unwrap().num_pushes(), 2);

        // The last streamed point terminates the shortened profile
        let points = left_sim.lock().unwrap().top_buffer();
        assert!(points[1].is_last);
    }

    #[test]
    fn test_start_without_profile_is_an_error() {
        let (mut ctrl, _left, _right) = make_ctrl(2, 1.0, 3);
        ctrl.set_profiles(Profile::default(), Profile::default());

        ctrl.request_start();
        assert!(ctrl.proc(&InputData::default()).is_err());
        assert_eq!(ctrl.state(), State::Idle);
    }

    #[test]
    fn test_input_start_flag_requests_start() {
        let (mut ctrl, _left, _right) = make_ctrl(2, 1.0, 3);

        let (_, rpt) = ctrl.proc(&InputData { start: true }).unwrap();
        assert_eq!(rpt.state, State::Filling);
    }

    #[test]
    fn test_reset_returns_to_clean_slate() {
        let (mut ctrl, left, right) = make_ctrl(2, 1.0, 3);

        ctrl.request_start();
        tick(&mut ctrl);
        assert_eq!(ctrl.state(), State::Filling);

        ctrl.reset();

        assert_eq!(ctrl.state(), State::Idle);
        assert_eq!(ctrl.command(), ProfileCommand::Disable);
        assert!(!ctrl.start_pending);
        assert_eq!(left.lock().unwrap().profile_status().top_buffer_cnt, 0);
        assert_eq!(right.lock().unwrap().profile_status().top_buffer_cnt, 0);
    }
}
