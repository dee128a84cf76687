//! Single side streamer
//!
//! Each driven side gets one [`SideStreamer`] owning that side's controller
//! handle, cached status and active point telemetry. The streamer performs
//! the per side operations (status polling, buffer clearing and filling)
//! while the coordinator in `state.rs` decides when both sides move
//! together.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::warn;
use std::sync::{MutexGuard, PoisonError};

// Internal
use super::{EncoderConverter, Params, Side, SideReport};
use crate::profile::Profile;
use ctrl_if::mp::{
    ControlMode, MotorController, ProfileStatus, SharedController, TrajectoryDuration,
    TrajectoryPoint,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Streaming state for one driven side.
pub struct SideStreamer {
    side: Side,

    ctrl: SharedController,

    /// Status snapshot read from the controller at the start of each cycle.
    pub(crate) status: ProfileStatus,

    // Active trajectory point telemetry, cached each cycle
    active_position: f64,
    active_velocity: f64,
    active_heading_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SideStreamer {
    /// Create a new streamer driving the given controller.
    pub fn new(side: Side, ctrl: SharedController) -> Self {
        Self {
            side,
            ctrl,
            status: ProfileStatus::default(),
            active_position: 0.0,
            active_velocity: 0.0,
            active_heading_rad: 0.0,
        }
    }

    /// Read the controller's status into the cycle cache.
    pub(crate) fn poll(&mut self) {
        let status = self.lock().profile_status();
        self.status = status;
    }

    /// The command mode the controller is currently in.
    pub(crate) fn control_mode(&self) -> ControlMode {
        self.lock().control_mode()
    }

    /// Remove all buffered points from the controller.
    pub(crate) fn clear_buffer(&self) {
        self.lock().clear_profile_buffer();
    }

    /// True if the executer buffer holds more than the given number of
    /// points, from the cached status.
    pub(crate) fn buffer_ready(&self, min_points: usize) -> bool {
        self.status.btm_buffer_cnt > min_points
    }

    /// True if the executer holds a valid active point, from the cached
    /// status.
    pub(crate) fn active_point_valid(&self) -> bool {
        self.status.active_point_valid
    }

    /// True if the active point is the profile's last, from the cached
    /// status.
    pub(crate) fn profile_complete(&self) -> bool {
        self.status.active_point_valid && self.status.active_point_is_last
    }

    /// True if the controller is reporting a buffer underrun, from the
    /// cached status.
    pub(crate) fn underrun(&self) -> bool {
        self.status.has_underrun
    }

    /// Cache the active trajectory point for telemetry.
    pub(crate) fn cache_active(&mut self) {
        let (position, velocity, heading_rad) = {
            let ctrl = self.lock();
            (
                ctrl.active_position(),
                ctrl.active_velocity(),
                ctrl.active_heading(),
            )
        };

        self.active_position = position;
        self.active_velocity = velocity;
        self.active_heading_rad = heading_rad;
    }

    /// Position target of the active point in encoder counts.
    pub fn active_position(&self) -> f64 {
        self.active_position
    }

    /// Velocity target of the active point in counts per 100 ms.
    pub fn active_velocity(&self) -> f64 {
        self.active_velocity
    }

    /// Heading of the active point in radians.
    pub fn active_heading_rad(&self) -> f64 {
        self.active_heading_rad
    }

    /// Fill the controller's buffer with the first `num_points` samples of
    /// the given profile.
    ///
    /// Any sticky underrun left over from a previous run is reported and
    /// acknowledged first, then stale buffered points are cleared, the base
    /// trajectory period configured, and the converted points pushed in
    /// order. The first point carries the zero position flag and the final
    /// pushed point the last point flag, so re-filling restarts the profile
    /// from a fresh position reference.
    pub(crate) fn fill(
        &mut self,
        profile: &Profile,
        num_points: usize,
        conv: &EncoderConverter,
        params: &Params,
        report: &mut SideReport,
    ) {
        // The underrun flag does not clear itself. Acknowledging it here,
        // before the next profile is staged, guarantees every underrun gets
        // recorded exactly once even when fills are cycles apart.
        if self.status.has_underrun {
            warn!(
                "{:?} controller reported a trajectory buffer underrun",
                self.side
            );
            report.underrun_acked = true;
            self.lock().clear_underrun();
        }

        let mut ctrl = self.lock();

        // Interrupting a previous profile can leave half of it buffered
        ctrl.clear_profile_buffer();

        ctrl.config_base_traj_period(params.base_traj_period_ms, params.config_timeout_ms);

        for i in 0..num_points {
            let sample = &profile.samples[i];

            let duration_ms = (sample.duration_s * 1000.0).round() as u32;
            let duration = match TrajectoryDuration::from_ms(duration_ms) {
                Ok(d) => d,
                Err(e) => {
                    warn!(
                        "{:?} profile point {}: {}, using the nearest supported duration",
                        self.side, i, e
                    );
                    report.unsupported_durations += 1;
                    TrajectoryDuration::nearest(duration_ms)
                }
            };

            let point = TrajectoryPoint {
                position: conv.position_to_counts(sample.position_ft),
                velocity: conv.velocity_to_counts_per_100ms(sample.velocity_fps),
                duration,
                zero_pos: i == 0,
                is_last: i + 1 == num_points,
            };

            if let Err(e) = ctrl.push_profile_point(point) {
                warn!("{:?} profile point {} rejected: {}", self.side, i, e);
                report.rejected_points += 1;
            }
        }
    }

    /// Lock the controller, riding through a poisoned mutex since controller
    /// state is plain data that cannot be left half written.
    fn lock(&self) -> MutexGuard<'_, dyn MotorController + 'static> {
        self.ctrl.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::profile::ProfileSample;
    use ctrl_if::sim::SimMotorController;
    use std::sync::{Arc, Mutex};

    fn params() -> Params {
        Params {
            wheel_diameter_in: 3.5,
            encoder_counts_per_rev: 4096.0,
            min_buffered_points: 50,
            base_traj_period_ms: 0,
            config_timeout_ms: 30,
            pump_period_s: 0.005,
            liveness_budget_s: 0.2,
        }
    }

    fn profile(durations_s: &[f64]) -> Profile {
        Profile {
            samples: durations_s
                .iter()
                .enumerate()
                .map(|(i, &duration_s)| ProfileSample {
                    position_ft: i as f64 * 0.1,
                    velocity_fps: 1.0,
                    duration_s,
                })
                .collect(),
        }
    }

    fn streamer() -> (SideStreamer, Arc<Mutex<SimMotorController>>) {
        let sim = Arc::new(Mutex::new(SimMotorController::new()));
        let streamer = SideStreamer::new(Side::Left, sim.clone());
        (streamer, sim)
    }

    #[test]
    fn test_fill_pushes_all_points_with_flags() {
        let (mut streamer, sim) = streamer();
        let profile = profile(&[0.01, 0.01, 0.01]);
        let params = params();
        let conv = EncoderConverter::new(params.wheel_diameter_in, params.encoder_counts_per_rev);
        let mut report = SideReport::default();

        streamer.fill(&profile, 3, &conv, &params, &mut report);

        let sim = sim.lock().unwrap();
        assert_eq!(sim.num_pushes(), 3);
        assert_eq!(sim.base_period_ms(), 0);

        let points = sim.top_buffer();
        assert!(points[0].zero_pos && !points[0].is_last);
        assert!(!points[1].zero_pos && !points[1].is_last);
        assert!(!points[2].zero_pos && points[2].is_last);

        assert_eq!(report.unsupported_durations, 0);
        assert_eq!(report.rejected_points, 0);
    }

    #[test]
    fn test_fill_acknowledges_sticky_underrun() {
        let (mut streamer, sim) = streamer();
        sim.lock().unwrap().inject_underrun();
        streamer.poll();

        let params = params();
        let conv = EncoderConverter::new(params.wheel_diameter_in, params.encoder_counts_per_rev);
        let mut report = SideReport::default();

        streamer.fill(&profile(&[0.01, 0.01]), 2, &conv, &params, &mut report);

        assert!(report.underrun_acked);
        assert!(!sim.lock().unwrap().profile_status().has_underrun);

        // A second fill with the flag clear does not re-report it
        streamer.poll();
        let mut report = SideReport::default();
        streamer.fill(&profile(&[0.01, 0.01]), 2, &conv, &params, &mut report);
        assert!(!report.underrun_acked);
    }

    #[test]
    fn test_fill_substitutes_unsupported_duration() {
        let (mut streamer, sim) = streamer();
        let params = params();
        let conv = EncoderConverter::new(params.wheel_diameter_in, params.encoder_counts_per_rev);
        let mut report = SideReport::default();

        // 7 ms is not in the supported set, 5 ms is the nearest
        streamer.fill(&profile(&[0.007, 0.01]), 2, &conv, &params, &mut report);

        assert_eq!(report.unsupported_durations, 1);
        let points = sim.lock().unwrap().top_buffer();
        assert_eq!(points[0].duration, TrajectoryDuration::Ms5);
        assert_eq!(points[1].duration, TrajectoryDuration::Ms10);
    }

    #[test]
    fn test_refill_clears_stale_points() {
        let (mut streamer, sim) = streamer();
        let params = params();
        let conv = EncoderConverter::new(params.wheel_diameter_in, params.encoder_counts_per_rev);
        let mut report = SideReport::default();

        streamer.fill(&profile(&[0.01, 0.01, 0.01]), 3, &conv, &params, &mut report);
        streamer.fill(&profile(&[0.01, 0.01]), 2, &conv, &params, &mut report);

        // The second fill replaced the first rather than appending to it
        let sim = sim.lock().unwrap();
        assert_eq!(sim.profile_status().top_buffer_cnt, 2);
        assert_eq!(sim.num_clears(), 2);
    }
}
