//! Struct archiving functionality
//!
//! Telemetry produced during a session is archived as CSV files under the
//! session's `arch` directory. To add archiving to a module implement the
//! [`Archived`] trait and serialise a flat record struct each cycle. Records
//! must be flat (scalar fields only) as the CSV writer cannot produce headers
//! for nested structures.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::Path;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
#[derive(Default)]
pub struct Archiver {
    writer: Option<csv::Writer<File>>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot create the archive file: {0}")]
    FileCreateError(std::io::Error),

    #[error("Cannot write the record into the archive: {0}")]
    WriteError(#[from] csv::Error),

    #[error("Cannot flush the archive to disk: {0}")]
    FlushError(std::io::Error),

    #[error("The archiver has not been initialised")]
    NotInitialised,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trait which enables a struct to be archived as CSV.
///
/// To implement this trait, the struct shall have an `Archiver` member which
/// shall be setup in the struct's `init` or `new` functions.
pub trait Archived {
    /// Write the archives for this struct
    fn write(&mut self) -> Result<(), ArchiveError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver writing to the given path relative to the
    /// session's archive root.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session, path: P
    ) -> Result<Self, ArchiveError> {
        let mut arch_path = session.arch_root.clone();
        arch_path.push(path);

        // Create any missing parent directories
        if let Some(parent) = arch_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return Err(ArchiveError::FileCreateError(e))
            }
        }

        // Create the file, truncating any previous content, then reopen it in
        // append mode for the writer.
        if let Err(e) = File::create(arch_path.clone()) {
            return Err(ArchiveError::FileCreateError(e))
        }

        let file = match OpenOptions::new().append(true).open(arch_path) {
            Ok(f) => f,
            Err(e) => return Err(ArchiveError::FileCreateError(e))
        };

        let writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(file);

        Ok(Self {
            writer: Some(writer)
        })
    }

    /// True if the archiver has an open writer.
    pub fn is_initialised(&self) -> bool {
        self.writer.is_some()
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(
        &mut self, record: T
    ) -> Result<(), ArchiveError> {
        match self.writer {
            Some(ref mut w) => {
                w.serialize(record)?;
                match w.flush() {
                    Ok(_) => Ok(()),
                    Err(e) => Err(ArchiveError::FlushError(e))
                }
            },
            None => Err(ArchiveError::NotInitialised)
        }
    }
}
