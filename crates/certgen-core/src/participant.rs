//! Participant records and the spreadsheet loader.
//!
//! A participant spreadsheet has a single header row followed by one row per
//! participant: column A holds the participant's name and column B the event
//! they took part in. Row order matters: the 1-based position of a
//! participant in the returned sequence is the number of the certificate
//! image that belongs to them.

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// A single participant parsed from one spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    /// The participant's display name.
    pub name: String,
    /// The event the participant took part in.
    pub event: String,
}

impl Participant {
    /// Creates a new participant record.
    pub fn new(name: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            event: event.into(),
        }
    }
}

/// The columns a participant row is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Column A.
    Name,
    /// Column B.
    Event,
}

impl Field {
    fn column(self) -> u32 {
        match self {
            Self::Name => 0,
            Self::Event => 1,
        }
    }

    /// Returns the lowercase field name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while reading a participant spreadsheet.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The workbook could not be opened or is not a supported format.
    #[error("failed to open spreadsheet {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    /// The workbook contains no worksheet.
    #[error("spreadsheet has no sheets")]
    NoSheet,

    /// The first worksheet could not be read.
    #[error("failed to read first sheet: {source}")]
    Sheet {
        #[source]
        source: calamine::Error,
    },

    /// A required cell is absent or blank.
    #[error("row {row}: missing {field}")]
    MissingField { row: u32, field: Field },

    /// A required cell holds a value that is not text or a number.
    #[error("row {row}: {field} must be text, found {found}")]
    InvalidCell {
        row: u32,
        field: Field,
        found: &'static str,
    },
}

/// Loads participants from the first sheet of the workbook at `path`.
///
/// The first physical row is treated as a header and skipped. Every row after
/// it, up to the last used row, must provide a name and an event; surrounding
/// whitespace is trimmed. The workbook is read fully into memory and closed
/// before returning.
///
/// The format (xlsx, xlsb, xls or ods) is detected from the file contents,
/// not its extension, since uploads are always stored under the same name.
///
/// # Errors
///
/// Returns a [`ParseError`] if the workbook cannot be read or a row is
/// incomplete.
pub fn load_participants(path: impl AsRef<Path>) -> Result<Vec<Participant>, ParseError> {
    let path = path.as_ref();

    let range = {
        let open_error = |source| ParseError::Open {
            path: path.to_path_buf(),
            source,
        };
        let bytes = std::fs::read(path).map_err(|e| open_error(calamine::Error::Io(e)))?;
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(open_error)?;
        workbook
            .worksheet_range_at(0)
            .ok_or(ParseError::NoSheet)?
            .map_err(|source| ParseError::Sheet { source })?
    };

    let Some((last_row, _)) = range.end() else {
        debug!(path = %path.display(), "spreadsheet is empty");
        return Ok(Vec::new());
    };

    let mut participants = Vec::with_capacity(last_row as usize);
    for row in 1..=last_row {
        let name = cell_text(range.get_value((row, Field::Name.column())), row, Field::Name)?;
        let event = cell_text(range.get_value((row, Field::Event.column())), row, Field::Event)?;
        participants.push(Participant { name, event });
    }

    debug!(
        path = %path.display(),
        count = participants.len(),
        "loaded participants"
    );
    Ok(participants)
}

/// Converts a cell to trimmed text, rejecting blanks and non-textual values.
///
/// `row` is zero-based as reported by calamine; errors report it 1-based.
fn cell_text(cell: Option<&Data>, row: u32, field: Field) -> Result<String, ParseError> {
    let display_row = row + 1;
    let missing = || ParseError::MissingField {
        row: display_row,
        field,
    };
    let invalid = |found| ParseError::InvalidCell {
        row: display_row,
        field,
        found,
    };

    let text = match cell {
        None | Some(Data::Empty) => return Err(missing()),
        Some(Data::String(s)) => s.trim().to_string(),
        Some(Data::Int(i)) => i.to_string(),
        Some(Data::Float(f)) => format_float(*f),
        Some(Data::Bool(_)) => return Err(invalid("a boolean")),
        Some(Data::Error(_)) => return Err(invalid("an error value")),
        Some(_) => return Err(invalid("a date or time")),
    };

    if text.is_empty() {
        return Err(missing());
    }
    Ok(text)
}

/// Spreadsheets store most numbers as floats; integral ones print without a
/// fractional part so `10` does not become `10.0`.
fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
