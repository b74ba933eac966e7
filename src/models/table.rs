use crate::error::{ReportError, Result};

/// A single spreadsheet cell as seen by the pipeline
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Render the cell the way it should appear as text.
    ///
    /// Integral numbers are rendered without a fractional part so that digit
    /// strings stored as numbers (position codes, counts) survive unchanged.
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
        }
    }

    /// Numeric view of the cell; numeric text counts as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Take `other` if this cell is still empty.
    ///
    /// Folding a column with this keeps the first non-empty value, so a blank
    /// first row does not hide a value further down.
    pub fn fill_from(&mut self, other: &CellValue) {
        if self.is_empty() && !other.is_empty() {
            *self = other.clone();
        }
    }

    /// Non-negative integer view of the cell, used for count columns
    pub fn as_count(&self) -> Option<usize> {
        self.as_number()
            .filter(|n| *n >= 0.0 && n.fract() == 0.0)
            .map(|n| n as usize)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<usize> for CellValue {
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

/// A header row plus data rows, as loaded from (or written to) one sheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Label used in error messages ("original roster", ...)
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn with_headers(name: impl Into<String>, headers: &[&str]) -> Self {
        Self::new(name, headers.iter().map(|h| h.to_string()).collect())
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a required column
    pub fn column(&self, name: &str) -> Result<usize> {
        self.find_column(name)
            .ok_or_else(|| ReportError::MissingColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    /// Index of an optional column
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell at `column` in `row`; short rows read as empty
    pub fn cell<'a>(&'a self, row: &'a [CellValue], column: usize) -> &'a CellValue {
        row.get(column).unwrap_or(&EMPTY_CELL)
    }
}
