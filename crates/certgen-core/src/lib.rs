//! Core types: participants, spreadsheet loading, certificate renaming

pub mod participant;
pub mod rename;
pub mod tracing;

pub use participant::{Field, ParseError, Participant, load_participants};
pub use rename::{
    RenameError, RenameReport, certificate_file_name, numbered_file_name, rename_certificates,
    rename_participant_certificates, sanitize,
};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
