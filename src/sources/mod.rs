//! Task sources
//!
//! Delimited text (CSV) and spreadsheets both normalize into `Task` before
//! anything else sees them. Row numbers in errors are 1-based and count the
//! header row.

use crate::error::VerifierError;
use crate::models::Task;
use crate::Result;
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::info;

pub const DESCRIPTION_HEADERS: &[&str] = &["Test step", "Krok testowy"];
pub const CRITERIA_HEADERS: &[&str] = &["Acceptance criteria", "Kryteria akceptacji"];

/// Load tasks from a `.csv` or spreadsheet file, chosen by extension
pub fn load_tasks(path: impl AsRef<Path>) -> Result<Vec<Task>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let tasks = match extension.as_str() {
        "csv" => load_delimited(path)?,
        "xlsx" | "xlsm" | "xls" | "ods" => load_spreadsheet(path)?,
        _ => {
            return Err(VerifierError::Config(format!(
                "unsupported task source '{}', expected .csv or a spreadsheet",
                path.display()
            )))
        }
    };

    info!(path = %path.display(), tasks = tasks.len(), "Task source loaded");
    Ok(tasks)
}

//
// ================= Delimited text =================
//

/// Column positions of the two task fields in a CSV header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskColumns {
    pub description: usize,
    pub criteria: usize,
}

impl TaskColumns {
    pub fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |names: &[&str]| {
            headers.iter().position(|h| {
                let h = h.trim_start_matches('\u{feff}').trim();
                names.iter().any(|n| n.eq_ignore_ascii_case(h))
            })
        };

        let missing = |names: &[&str]| VerifierError::InvalidTask {
            row: 1,
            message: format!("missing '{}' column", names[0]),
        };

        Ok(Self {
            description: find(DESCRIPTION_HEADERS).ok_or_else(|| missing(DESCRIPTION_HEADERS))?,
            criteria: find(CRITERIA_HEADERS).ok_or_else(|| missing(CRITERIA_HEADERS))?,
        })
    }
}

pub fn from_delimited_row(
    record: &csv::StringRecord,
    columns: &TaskColumns,
    row: usize,
) -> Result<Option<Task>> {
    Task::from_fields(
        row,
        record.get(columns.description).unwrap_or_default(),
        record.get(columns.criteria).unwrap_or_default(),
    )
}

fn load_delimited(path: &Path) -> Result<Vec<Task>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let columns = TaskColumns::from_headers(reader.headers()?)?;

    let mut tasks = Vec::new();
    for (index, record) in reader.records().enumerate() {
        if let Some(task) = from_delimited_row(&record?, &columns, index + 2)? {
            tasks.push(task);
        }
    }
    Ok(tasks)
}

//
// ================= Spreadsheet =================
//

/// Columns A and B hold the step and its criteria.
///
/// `first_column` is the sheet column of `cells[0]` (0 for A), since a used
/// range may start to the right of column A.
pub fn from_spreadsheet_row(cells: &[Data], first_column: usize, row: usize) -> Result<Option<Task>> {
    let column = |col: usize| col.checked_sub(first_column).and_then(|i| cells.get(i));
    Task::from_fields(row, &cell_text(column(0)), &cell_text(column(1)))
}

fn cell_text(cell: Option<&Data>) -> String {
    match cell {
        None | Some(Data::Empty) => String::new(),
        Some(Data::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn load_spreadsheet(path: &Path) -> Result<Vec<Task>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| VerifierError::Config(format!("'{}' has no worksheets", path.display())))??;

    // the used range starts at its first non-empty cell, not at A1
    let (first_row, first_column) = range.start().unwrap_or((0, 0));

    let mut tasks = Vec::new();
    for (offset, cells) in range.rows().enumerate() {
        let sheet_row = first_row as usize + offset + 1;
        if sheet_row == 1 {
            continue;
        }
        if let Some(task) = from_spreadsheet_row(cells, first_column as usize, sheet_row)? {
            tasks.push(task);
        }
    }
    Ok(tasks)
}
