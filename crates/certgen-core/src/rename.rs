//! Certificate renaming.
//!
//! Certificate images are exported by hand from the design tool and land in
//! the certificates directory as `1.png`, `2.png`, ... in participant row
//! order. Renaming gives each file a readable `Name_Event.png` name in place.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::participant::{ParseError, Participant, load_participants};

/// Extension of exported certificate images.
const CERTIFICATE_EXTENSION: &str = "png";

/// Errors raised while renaming certificates.
#[derive(Debug, Error)]
pub enum RenameError {
    /// The participant spreadsheet could not be read.
    #[error(transparent)]
    Participants(#[from] ParseError),

    /// A filesystem rename failed. Earlier renames are not rolled back.
    #[error("failed to rename {} to {}: {source}", from.display(), to.display())]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What a rename pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameReport {
    /// Files that were renamed, as `(from, to)` pairs in participant order.
    pub renamed: Vec<(PathBuf, PathBuf)>,
    /// 1-based participant positions whose numbered file did not exist.
    pub skipped: Vec<usize>,
}

/// Replaces spaces with underscores.
pub fn sanitize(value: &str) -> String {
    value.replace(' ', "_")
}

/// Returns the readable file name for a participant's certificate.
pub fn certificate_file_name(participant: &Participant) -> String {
    format!(
        "{}_{}.{}",
        sanitize(&participant.name),
        sanitize(&participant.event),
        CERTIFICATE_EXTENSION
    )
}

/// Returns the numbered file name exported for the participant at `index`
/// (1-based).
pub fn numbered_file_name(index: usize) -> String {
    format!("{}.{}", index, CERTIFICATE_EXTENSION)
}

/// Loads participants from `spreadsheet` and renames their certificates in
/// `certificates_dir`.
///
/// # Errors
///
/// Fails if the spreadsheet cannot be parsed or a rename fails.
pub fn rename_certificates(
    spreadsheet: impl AsRef<Path>,
    certificates_dir: impl AsRef<Path>,
) -> Result<RenameReport, RenameError> {
    let participants = load_participants(spreadsheet)?;
    rename_participant_certificates(&participants, certificates_dir)
}

/// Renames `{i}.png` to `Name_Event.png` for each participant at 1-based
/// position `i`.
///
/// Missing numbered files are skipped silently. Targets are not checked for
/// collisions: a later participant with the same sanitized name overwrites
/// the earlier file.
///
/// # Errors
///
/// Stops at the first failed rename; files renamed before it stay renamed.
pub fn rename_participant_certificates(
    participants: &[Participant],
    certificates_dir: impl AsRef<Path>,
) -> Result<RenameReport, RenameError> {
    let dir = certificates_dir.as_ref();
    let mut report = RenameReport::default();

    for (index, participant) in participants.iter().enumerate().map(|(i, p)| (i + 1, p)) {
        let from = dir.join(numbered_file_name(index));
        if !from.exists() {
            report.skipped.push(index);
            continue;
        }

        let to = dir.join(certificate_file_name(participant));
        std::fs::rename(&from, &to).map_err(|source| RenameError::Io {
            from: from.clone(),
            to: to.clone(),
            source,
        })?;

        info!("renamed: {} -> {}", from.display(), to.display());
        report.renamed.push((from, to));
    }

    Ok(report)
}
