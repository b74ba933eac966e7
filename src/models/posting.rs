use serde::Serialize;

use crate::models::CellValue;

/// Number of digits in a position code
pub const POSITION_CODE_LEN: usize = 12;

/// A job posting: (hiring authority, position code).
///
/// Ordering is by authority, then code, which is the row order of every
/// report.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PostingKey {
    pub authority: String,
    /// Always textual; never parsed as a number
    pub code: String,
}

impl PostingKey {
    pub fn new(authority: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            code: code.into(),
        }
    }

    /// Key of a roster row, or `None` when the authority or code cell is blank.
    ///
    /// Rows without a full key belong to no posting and are left out of every
    /// grouping.
    pub fn from_cells(authority: &CellValue, code: &CellValue) -> Option<Self> {
        if authority.is_empty() || code.is_empty() {
            return None;
        }
        Some(Self::new(authority.display(), code.display()))
    }
}

/// Extract the position code from a proposed-position description.
///
/// The code is the last [`POSITION_CODE_LEN`] ASCII digits at the end of the
/// text, after trailing whitespace is trimmed. Digits must be consecutive and
/// anchored at the end; a code followed by any other character, or a trailing
/// run shorter than the code length, yields `None`.
pub fn extract_position_code(text: &str) -> Option<String> {
    let trimmed = text.trim_end();
    let run = trimmed
        .bytes()
        .rev()
        .take_while(|b| b.is_ascii_digit())
        .count();

    if run < POSITION_CODE_LEN {
        return None;
    }

    // Trailing run is ASCII, so this is a char boundary
    Some(trimmed[trimmed.len() - POSITION_CODE_LEN..].to_string())
}
