//! First-sheet reader for `.xlsx` (calamine) and `.csv` (csv) uploads.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use chrono::{Duration, NaiveDate};

use super::SpreadsheetError;

/// Header row plus data rows, every cell rendered as trimmed text.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Header key used for matching: lowercase with spaces, underscores and
/// hyphens removed, so `Amount Paid`, `amount_paid` and `AmountPaid` agree.
pub fn normalize_header(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

impl Sheet {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = headers.iter().map(|h| normalize_header(h)).collect();
        // Drop fully blank rows (trailing formatting in xlsx exports)
        let rows = rows
            .into_iter()
            .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
            .collect();
        Self { headers, rows }
    }

    /// Index of the first header matching any alias (already normalised).
    pub fn column(&self, aliases: &[&str]) -> Option<usize> {
        aliases
            .iter()
            .find_map(|alias| self.headers.iter().position(|h| h == alias))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Non-blank cell text at `column` of `row`.
pub fn cell(row: &[String], column: Option<usize>) -> Option<&str> {
    column
        .and_then(|idx| row.get(idx))
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Parse an uploaded file by extension.
pub fn read_sheet(filename: &str, bytes: &[u8]) -> Result<Sheet, SpreadsheetError> {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".csv") {
        read_csv(bytes)
    } else if lower.ends_with(".xlsx") {
        read_xlsx(bytes)
    } else {
        Err(SpreadsheetError::UnsupportedFormat(filename.to_string()))
    }
}

fn read_csv(bytes: &[u8]) -> Result<Sheet, SpreadsheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(String::from).collect());
    }
    Ok(Sheet::new(headers, rows))
}

fn read_xlsx(bytes: &[u8]) -> Result<Sheet, SpreadsheetError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| SpreadsheetError::Workbook(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SpreadsheetError::EmptySheet)?
        .map_err(|e| SpreadsheetError::Workbook(e.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(cell_text).collect(),
        None => return Err(SpreadsheetError::EmptySheet),
    };
    let rows: Vec<Vec<String>> = rows.map(|r| r.iter().map(cell_text).collect()).collect();
    Ok(Sheet::new(headers, rows))
}

fn cell_text(data: &Data) -> String {
    match data {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_float(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_text(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        _ => String::new(),
    }
}

/// Whole numbers without a trailing `.0` so phone numbers and ids survive.
fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Excel stores dates as days since 1899-12-30. A serial outside chrono's
/// range comes back as the raw number so the row fails date parsing.
fn excel_serial_to_text(serial: f64) -> String {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .zip(Duration::try_days(serial.trunc() as i64))
        .and_then(|(epoch, offset)| epoch.checked_add_signed(offset))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| serial.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_normalisation_ignores_case_spaces_underscores() {
        assert_eq!(normalize_header("Amount Paid"), "amountpaid");
        assert_eq!(normalize_header("amount_paid"), "amountpaid");
        assert_eq!(normalize_header("PaymentMethod"), "paymentmethod");
    }

    #[test]
    fn csv_rows_addressable_by_alias() {
        let data = b"Patient,Tel,Paid\nAsha, 063111 ,50\n,,\nOmar,063222,\n";
        let sheet = read_sheet("batch.CSV", data).unwrap();
        assert_eq!(sheet.rows.len(), 2);

        let name = sheet.column(&["name", "patient"]);
        let phone = sheet.column(&["phone", "tel"]);
        assert_eq!(cell(&sheet.rows[0], name), Some("Asha"));
        assert_eq!(cell(&sheet.rows[0], phone), Some("063111"));
        assert_eq!(cell(&sheet.rows[1], sheet.column(&["paid"])), None);
        assert_eq!(sheet.column(&["email"]), None);
    }

    #[test]
    fn short_csv_rows_tolerated() {
        let sheet = read_sheet("x.csv", b"Name,Phone,Notes\nAsha,063111\n").unwrap();
        assert_eq!(cell(&sheet.rows[0], sheet.column(&["notes"])), None);
    }

    #[test]
    fn unsupported_extension_rejected() {
        assert!(matches!(
            read_sheet("data.pdf", b"%PDF"),
            Err(SpreadsheetError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn corrupt_xlsx_is_workbook_error() {
        assert!(matches!(
            read_sheet("data.xlsx", b"not a zip"),
            Err(SpreadsheetError::Workbook(_))
        ));
    }

    #[test]
    fn cell_rendering() {
        assert_eq!(format_float(63111.0), "63111");
        assert_eq!(format_float(12.5), "12.5");
        assert_eq!(excel_serial_to_text(45292.0), "2024-01-01");
        assert_eq!(excel_serial_to_text(1e12), "1000000000000");
        assert_eq!(excel_serial_to_text(f64::MAX), f64::MAX.to_string());
    }
}
