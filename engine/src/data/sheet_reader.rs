// Reads spreadsheets and delimited files into a RawSheet with no header
// interpretation. Header detection happens later, in the assembler.
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{NaiveDateTime, Timelike};
use csv::ReaderBuilder;
use shared::models::{CellValue, RawSheet};
use tracing::{debug, info};

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Leading rows dropped before anything else looks at the sheet.
    pub skip_rows: usize,
    /// Worksheet name; the first sheet when absent.
    pub sheet: Option<String>,
    /// Field delimiter for delimited files.
    pub delimiter: u8,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            skip_rows: 0,
            sheet: None,
            delimiter: b';',
        }
    }
}

enum FileFormat {
    Workbook,
    Delimited,
}

fn detect_format(path: &Path) -> Result<FileFormat, EngineError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(FileFormat::Workbook),
        "csv" | "txt" => Ok(FileFormat::Delimited),
        _ => Err(EngineError::UnsupportedFormat(path.display().to_string())),
    }
}

#[tracing::instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub fn read_sheet<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<RawSheet, EngineError> {
    let path = path.as_ref();
    let sheet = match detect_format(path)? {
        FileFormat::Workbook => read_workbook(path, options.sheet.as_deref())?,
        FileFormat::Delimited => read_delimited(path, options.delimiter)?,
    };
    info!(rows = sheet.len(), sheet = %sheet.name, "sheet loaded");
    Ok(sheet.skip_rows(options.skip_rows))
}

fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<RawSheet, EngineError> {
    let mut workbook = open_workbook_auto(path)?;
    let name = pick_sheet(&workbook.sheet_names(), sheet, path)?;

    let range = workbook.worksheet_range(&name)?;
    debug!(sheet = %name, size = ?range.get_size(), start = ?range.start(), "worksheet range");
    Ok(RawSheet::new(name, range_to_rows(&range)))
}

/// The named sheet, or the first one when no name is given.
fn pick_sheet(names: &[String], wanted: Option<&str>, path: &Path) -> Result<String, EngineError> {
    match wanted {
        Some(wanted) => names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| {
                EngineError::ConfigError(format!(
                    "Sheet '{}' not found in {} (available: {})",
                    wanted,
                    path.display(),
                    names.join(", ")
                ))
            }),
        None => names.first().cloned().ok_or_else(|| {
            EngineError::ConfigError(format!("Workbook {} has no sheets", path.display()))
        }),
    }
}

/// calamine ranges start at the first used cell; pad back to absolute
/// positions so row and column indices match what a user sees in the sheet.
fn range_to_rows(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    let (first_row, first_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); first_row];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; first_col];
        cells.extend(row.iter().map(data_to_cell));
        rows.push(cells);
    }
    rows
}

fn data_to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => CellValue::Text(format_sheet_date(value)),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Dates are rendered the way a Brazilian sheet displays them; a time part is
/// kept only when present.
fn format_sheet_date(value: NaiveDateTime) -> String {
    if value.num_seconds_from_midnight() == 0 {
        value.format("%d/%m/%Y").to_string()
    } else {
        value.format("%d/%m/%Y %H:%M:%S").to_string()
    }
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<RawSheet, EngineError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true) // ragged rows are expected above the header
        .from_path(path)?;

    let mut rows = Vec::new();
    for result in rdr.byte_records() {
        let record = result?;
        // Government exports are often Latin-1; keep going with replacement chars.
        let row = record
            .iter()
            .map(|field| CellValue::from(String::from_utf8_lossy(field).into_owned()))
            .collect();
        rows.push(row);
    }

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(RawSheet::new(name, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_delimited_ragged_rows() {
        let file = create_test_csv("Tabela SINAPI\n\nCLASSE;CODIGO;DESCRICAO;UNIDADE\nMO;88316;SERVENTE;H\n");
        let sheet = read_sheet(file.path(), &ReadOptions::default()).unwrap();
        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet.rows[0], vec![CellValue::from("Tabela SINAPI")]);
        assert_eq!(sheet.rows[1].len(), 4);
        assert_eq!(sheet.rows[2][1], CellValue::from("88316"));
    }

    #[test]
    fn test_read_delimited_skip_rows_and_empty_fields() {
        let file = create_test_csv("lixo\nEAN;PRODUTO;PF\n789;;10,5\n");
        let options = ReadOptions { skip_rows: 1, ..ReadOptions::default() };
        let sheet = read_sheet(file.path(), &options).unwrap();
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.rows[1][1], CellValue::Empty);
        assert_eq!(sheet.rows[1][2], CellValue::from("10,5"));
    }

    #[test]
    fn test_read_delimited_latin1_is_lossy_not_fatal() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"C\xd3DIGO;DESCRI\xc7\xc3O\n1;A\n").unwrap();
        file.flush().unwrap();
        let sheet = read_sheet(file.path(), &ReadOptions::default()).unwrap();
        assert_eq!(sheet.len(), 2);
        assert!(sheet.rows[0][1].to_text().starts_with("DESCRI"));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        let err = read_sheet(file.path(), &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_sheet("does_not_exist.csv", &ReadOptions::default()).unwrap_err();
        assert!(err.to_string().contains("CSV system error"));
    }

    #[test]
    fn test_data_to_cell_conversions() {
        assert_eq!(data_to_cell(&Data::Int(7)), CellValue::Number(7.0));
        assert_eq!(data_to_cell(&Data::Float(1.5)), CellValue::Number(1.5));
        assert_eq!(data_to_cell(&Data::String(String::new())), CellValue::Empty);
        assert_eq!(data_to_cell(&Data::String("x".into())), CellValue::from("x"));
        assert_eq!(data_to_cell(&Data::Bool(true)), CellValue::Bool(true));
    }

    #[test]
    fn test_data_to_cell_errors_and_dates() {
        use calamine::{CellErrorType, ExcelDateTime, ExcelDateTimeType};

        assert_eq!(data_to_cell(&Data::Error(CellErrorType::NA)), CellValue::Empty);
        assert_eq!(data_to_cell(&Data::Empty), CellValue::Empty);
        // 45992 is 2025-12-01 in the 1900 date system
        let date = ExcelDateTime::new(45992.0, ExcelDateTimeType::DateTime, false);
        assert_eq!(data_to_cell(&Data::DateTime(date)), CellValue::from("01/12/2025"));
    }

    #[test]
    fn test_range_rows_keep_absolute_positions() {
        let mut range: Range<Data> = Range::new((2, 1), (3, 2));
        range.set_value((2, 1), Data::String("EAN".into()));
        range.set_value((3, 2), Data::Float(1.5));

        let rows = range_to_rows(&range);
        assert_eq!(rows.len(), 4);
        assert!(rows[0].is_empty() && rows[1].is_empty());
        assert_eq!(
            rows[2],
            vec![CellValue::Empty, CellValue::from("EAN"), CellValue::Empty]
        );
        assert_eq!(
            rows[3],
            vec![CellValue::Empty, CellValue::Empty, CellValue::Number(1.5)]
        );
    }

    #[test]
    fn test_range_rows_empty_range() {
        let range: Range<Data> = Range::empty();
        assert!(range_to_rows(&range).is_empty());
    }

    #[test]
    fn test_pick_sheet() {
        let names = vec!["Capa".to_string(), "Preços".to_string()];
        let path = Path::new("cmed.xlsx");
        assert_eq!(pick_sheet(&names, None, path).unwrap(), "Capa");
        assert_eq!(pick_sheet(&names, Some("Preços"), path).unwrap(), "Preços");

        let err = pick_sheet(&names, Some("Lista"), path).unwrap_err();
        assert!(matches!(err, EngineError::ConfigError(_)));
        assert!(err.to_string().contains("Capa, Preços"));

        assert!(matches!(pick_sheet(&[], None, path), Err(EngineError::ConfigError(_))));
    }

    #[test]
    fn test_format_sheet_date() {
        let day = chrono::NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        assert_eq!(format_sheet_date(day.and_hms_opt(0, 0, 0).unwrap()), "01/12/2025");
        assert_eq!(
            format_sheet_date(day.and_hms_opt(18, 20, 0).unwrap()),
            "01/12/2025 18:20:00"
        );
    }
}
