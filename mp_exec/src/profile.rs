//! # Profile
//!
//! This module defines the trajectory profile pairs consumed by the motion
//! profile control module. Profiles are produced offline by the trajectory
//! generator and loaded from JSON files, one file per manoeuvre holding the
//! left and right side profiles together.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One raw sample of a motion profile in physical units.
#[derive(Clone, Copy, Serialize, Deserialize, Debug)]
pub struct ProfileSample {
    /// Target position along the path.
    ///
    /// Units: feet
    pub position_ft: f64,

    /// Target velocity at this sample.
    ///
    /// Units: feet/second
    pub velocity_fps: f64,

    /// Time the controller shall spend on this sample.
    ///
    /// Units: seconds
    pub duration_s: f64,
}

/// An ordered sequence of profile samples for one driven side.
#[derive(Clone, Default, Serialize, Deserialize, Debug)]
pub struct Profile {
    pub samples: Vec<ProfileSample>,
}

/// The left and right side profiles of one manoeuvre.
///
/// The two sides are generated together and must be the same length. The
/// motion profile control module verifies this when the pair is loaded.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct DriveProfile {
    pub left: Profile,
    pub right: Profile,
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

/// Errors raised while loading a profile file.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Cannot load the profile file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot read the profile file: {0}")]
    DeserialiseError(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Profile {
    /// Number of samples in the profile.
    pub fn num_points(&self) -> usize {
        self.samples.len()
    }

    /// True if the profile holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Total duration of the profile in seconds.
    pub fn duration_s(&self) -> f64 {
        self.samples.iter().map(|s| s.duration_s).sum()
    }
}

impl DriveProfile {
    /// Load a profile pair from the given JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ProfileError> {
        let json = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => return Err(ProfileError::FileLoadError(e)),
        };

        Self::from_json_str(&json)
    }

    /// Parse a profile pair from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ProfileError> {
        match serde_json::from_str(json) {
            Ok(p) => Ok(p),
            Err(e) => Err(ProfileError::DeserialiseError(e)),
        }
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_profile_pair() {
        let json = r#"{
            "left": {"samples": [
                {"position_ft": 0.0, "velocity_fps": 0.0, "duration_s": 0.01},
                {"position_ft": 0.1, "velocity_fps": 1.0, "duration_s": 0.01}
            ]},
            "right": {"samples": [
                {"position_ft": 0.0, "velocity_fps": 0.0, "duration_s": 0.01},
                {"position_ft": 0.1, "velocity_fps": 1.0, "duration_s": 0.01}
            ]}
        }"#;

        let pair = DriveProfile::from_json_str(json).unwrap();

        assert_eq!(pair.left.num_points(), 2);
        assert_eq!(pair.right.num_points(), 2);
        assert!((pair.left.duration_s() - 0.02).abs() < 1e-9);
        assert_eq!(pair.left.samples[1].position_ft, 0.1);
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(DriveProfile::from_json_str("not a profile").is_err());
    }
}
