//! Result sinks
//!
//! Four columns per row: step, criteria, status label, details. The xlsx
//! writer adds presentation only (header style, status row colors).

use crate::error::VerifierError;
use crate::models::{TaskResult, TaskStatus};
use crate::Result;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};
use std::path::Path;
use tracing::info;

pub const RESULT_HEADERS: [&str; 4] = ["Test step", "Acceptance criteria", "Status", "Details"];

const COLUMN_WIDTHS: [f64; 4] = [50.0, 70.0, 15.0, 150.0];
const SHEET_NAME: &str = "Results";

/// Write results to `.xlsx` or `.csv`, chosen by extension
pub fn write_results(path: impl AsRef<Path>, results: &[TaskResult]) -> Result<()> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" => write_xlsx(path, results)?,
        "csv" => write_csv(path, results)?,
        _ => {
            return Err(VerifierError::Sink(format!(
                "unsupported result file '{}', expected .xlsx or .csv",
                path.display()
            )))
        }
    }

    info!(path = %path.display(), rows = results.len(), "Results written");
    Ok(())
}

fn row(result: &TaskResult) -> [&str; 4] {
    [
        &result.task,
        &result.criteria,
        result.status.label(),
        &result.details,
    ]
}

fn write_csv(path: &Path, results: &[TaskResult]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(RESULT_HEADERS)?;
    for result in results {
        writer.write_record(row(result))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_xlsx(path: &Path, results: &[TaskResult]) -> Result<()> {
    let header = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x4F81BD))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin)
        .set_border_color(Color::Black);

    let passed = Format::new()
        .set_align(FormatAlign::VerticalCenter)
        .set_background_color(Color::RGB(0xC6EFCE))
        .set_font_color(Color::RGB(0x006100));

    let failed = Format::new()
        .set_align(FormatAlign::VerticalCenter)
        .set_background_color(Color::RGB(0xFFC7CE))
        .set_font_color(Color::RGB(0x9C0006));

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, (title, width)) in RESULT_HEADERS.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        sheet.set_column_width(col, width)?;
        sheet.write_string_with_format(0, col, *title, &header)?;
    }

    for (index, result) in results.iter().enumerate() {
        let format = match result.status {
            TaskStatus::Passed => &passed,
            TaskStatus::Failed => &failed,
        };
        let row_num = index as u32 + 1;
        for (col, value) in row(result).into_iter().enumerate() {
            sheet.write_string_with_format(row_num, col as u16, value, format)?;
        }
    }

    workbook.save(path)?;
    Ok(())
}
