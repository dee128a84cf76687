//! # Motion profile control module
//!
//! MpCtrl streams precomputed trajectory profiles into the drive base's two
//! motor controllers and sequences playback. It owns the only persistent
//! state in the control chain: a small state machine which waits for a start
//! request, fills both controllers' buffers, arms playback once enough points
//! have been staged, and drops into a position hold when the profile
//! completes. A companion buffer pump thread keeps points flowing from the
//! controllers' top buffers into their executers between control cycles.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod pump;
mod side;
mod state;
mod units;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use pump::*;
pub use side::*;
pub use state::*;
pub use units::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Identifies one driven side of the drive base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Possible errors that can occur during MpCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum MpCtrlError {
    #[error("No profile pair has been loaded, cannot start streaming")]
    NoProfileLoaded,
}

/// Possible errors that can occur during MpCtrl initialisation.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Failed to load the parameter file: {0}")]
    ParamLoadError(#[from] util::params::LoadError),

    #[error("Failed to initialise the telemetry archive: {0}")]
    ArchiveInitError(#[from] util::archive::ArchiveError),
}
