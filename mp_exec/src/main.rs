//! Main motion profile executive entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and modules
//!     - Start the buffer pump
//!     - Main loop:
//!         - Simulated executer stepping
//!         - Start request handling
//!         - Motion profile control processing
//!         - Command application to both controllers
//!         - Telemetry archiving
//!
//! The executive drives a pair of simulated controllers. On hardware the
//! same control flow applies with the simulated pair swapped for the real
//! device handles.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{info, warn};
use std::env;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

// Internal
use ctrl_if::{
    mp::{ControlMode, MotorController, ProfileCommand, SharedController},
    sim::SimMotorController,
};
use mp_lib::{
    data_store::DataStore,
    mp_ctrl::{BufferPump, MpCtrl, OutputData},
    profile::DriveProfile,
};
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.02;

/// Number of cycles per second
const CYCLE_FREQUENCY_HZ: f64 = 1.0 / CYCLE_PERIOD_S;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("mp_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Motion Profile Executive\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PROFILE ----

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        return Err(eyre!(
            "Expected the profile file as the single argument, found {} arguments",
            args.len() - 1
        ));
    }

    let drive_profile =
        DriveProfile::from_file(&args[1]).wrap_err("Failed to load the profile pair")?;

    info!(
        "Loaded profile pair from \"{}\": {} left points, {} right points, {:.02} s\n",
        &args[1],
        drive_profile.left.num_points(),
        drive_profile.right.num_points(),
        drive_profile.left.duration_s()
    );

    // ---- CONTROLLERS ----

    // No hardware is attached to this build so the simulated pair is driven
    let left_sim = Arc::new(Mutex::new(SimMotorController::new()));
    let right_sim = Arc::new(Mutex::new(SimMotorController::new()));

    let left_ctrl: SharedController = left_sim.clone();
    let right_ctrl: SharedController = right_sim.clone();

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let mut mp_ctrl = MpCtrl::new(left_ctrl.clone(), right_ctrl.clone());
    mp_ctrl
        .init("mp_ctrl.toml", &session)
        .wrap_err("Failed to initialise MpCtrl")?;
    mp_ctrl.set_profiles(drive_profile.left, drive_profile.right);
    info!("MpCtrl init complete\n");

    let pump_period = mp_ctrl.pump_period();

    let mut ds = DataStore::new(mp_ctrl);

    // ---- BUFFER PUMP ----

    let pump = BufferPump::start(left_ctrl.clone(), right_ctrl.clone(), pump_period);
    info!("Buffer pump running with a {:?} period", pump_period);

    // Hand both controllers over to profile playback, as the operator would
    lock_sim(&left_sim).set_control_mode(ControlMode::Profile);
    lock_sim(&right_sim).set_control_mode(ControlMode::Profile);

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(CYCLE_FREQUENCY_HZ);

        // ---- SIMULATED EXECUTERS ----

        lock_sim(&left_sim).step();
        lock_sim(&right_sim).step();

        // ---- START REQUEST ----

        // Fire the loaded profile on the first cycle
        if ds.num_cycles == 0 {
            ds.mp_ctrl_input.start = true;
        }

        // ---- CONTROL ALGORITHM PROCESSING ----

        match ds.mp_ctrl.proc(&ds.mp_ctrl_input) {
            Ok((o, r)) => {
                ds.mp_ctrl_output = o;
                ds.mp_ctrl_report = r;
            }
            Err(e) => {
                // Keep commanding the last decided value rather than letting
                // the default disable interrupt a running profile
                ds.mp_ctrl_output = OutputData {
                    command: ds.mp_ctrl.command(),
                };
                warn!("Error during MpCtrl processing: {}", e);
            }
        };

        // Apply the command to both controllers in the same cycle so the
        // sides stay synchronised
        left_ctrl
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_command(ds.mp_ctrl_output.command);
        right_ctrl
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_command(ds.mp_ctrl_output.command);

        // ---- WRITE ARCHIVES ----

        if let Err(e) = ds.mp_ctrl.write() {
            warn!("Could not archive MpCtrl telemetry: {}", e);
        }

        // ---- MONITORING ----

        if ds.is_1_hz_cycle {
            info!(
                "State: {:?}, command: {:?}, executer buffers L/R: {}/{}",
                ds.mp_ctrl_report.state,
                ds.mp_ctrl_output.command,
                ds.mp_ctrl_report.left.btm_buffer_cnt,
                ds.mp_ctrl_report.right.btm_buffer_cnt
            );
        }

        if ds.mp_ctrl_report.liveness_expired {
            return Err(eyre!(
                "Controllers made no progress within the liveness budget"
            ));
        }

        // Hold is only commanded once the profile has completed on both
        // sides, the executive's job is done
        if ds.mp_ctrl_output.command == ProfileCommand::Hold {
            info!(
                "Profile finished, holding at L/R position {:.01}/{:.01} counts",
                ds.mp_ctrl_report.left.active_position,
                ds.mp_ctrl_report.right.active_position
            );
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - CYCLE_PERIOD_S
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    pump.stop();

    info!("End of execution");

    Ok(())
}

/// Lock a simulated controller, riding through mutex poisoning.
fn lock_sim(sim: &Arc<Mutex<SimMotorController>>) -> std::sync::MutexGuard<'_, SimMotorController> {
    sim.lock().unwrap_or_else(PoisonError::into_inner)
}
