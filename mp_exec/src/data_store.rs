//! # Data Store

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::mp_ctrl;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    // MpCtrl
    pub mp_ctrl: mp_ctrl::MpCtrl,
    pub mp_ctrl_input: mp_ctrl::InputData,
    pub mp_ctrl_output: mp_ctrl::OutputData,
    pub mp_ctrl_report: mp_ctrl::StatusReport,

    // Monitoring counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Create the data store around an initialised MpCtrl module.
    pub fn new(mp_ctrl: mp_ctrl::MpCtrl) -> Self {
        Self {
            num_cycles: 0,
            is_1_hz_cycle: false,
            mp_ctrl,
            mp_ctrl_input: mp_ctrl::InputData::default(),
            mp_ctrl_output: mp_ctrl::OutputData::default(),
            mp_ctrl_report: mp_ctrl::StatusReport::default(),
            num_consec_cycle_overruns: 0,
        }
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and
    /// sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        self.is_1_hz_cycle = self.num_cycles % (cycle_frequency_hz as u128) == 0;

        self.mp_ctrl_input = mp_ctrl::InputData::default();
        self.mp_ctrl_output = mp_ctrl::OutputData::default();
        self.mp_ctrl_report = mp_ctrl::StatusReport::default();
    }
}
