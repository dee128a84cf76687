//! Buffer pump task
//!
//! The controllers' executers pull points from a small onboard buffer which
//! must be topped up from the larger top buffer faster than points are
//! consumed. The pump is a background thread doing exactly one thing,
//! advancing both controllers' buffers at a fixed period, roughly twice the
//! rate of the smallest point duration in use.
//!
//! The pump runs regardless of what the state machine is doing, so stale
//! points left by a mode change still get retired. It never clears or fills,
//! those operations belong to the control cycle alone, which keeps the two
//! cadences from racing on the buffer contents.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

// Internal
use ctrl_if::mp::SharedController;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Handle to the running buffer pump thread.
///
/// Dropping the handle signals the thread to stop and joins it.
pub struct BufferPump {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BufferPump {
    /// Start pumping the given controller pair at the given period.
    pub fn start(left: SharedController, right: SharedController, period: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();

        let handle = thread::Builder::new()
            .name("buffer_pump".into())
            .spawn(move || {
                debug!("Buffer pump started");

                while !thread_stop.load(Ordering::Relaxed) {
                    for ctrl in &[&left, &right] {
                        ctrl.lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .advance_profile_buffer();
                    }

                    thread::sleep(period);
                }

                debug!("Buffer pump stopped");
            });

        let handle = match handle {
            Ok(h) => Some(h),
            Err(e) => {
                error!("Failed to spawn the buffer pump thread: {}", e);
                None
            }
        };

        Self { stop, handle }
    }

    /// Stop the pump and wait for the thread to exit.
    pub fn stop(self) {
        // Drop performs the stop and join
    }
}

impl Drop for BufferPump {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);

        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------
