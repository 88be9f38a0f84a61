//! Integration Tests for sheet2csv
//!
//! Workbooks are generated with rust_xlsxwriter into temporary directories and
//! pushed through the public pipeline: inspect, load, clean, export, retention.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use rust_xlsxwriter::*;
use sheet2csv::{
    clean, csv_to_bytes, enforce_limit, CellValue, ConverterBuilder, ErrorCategory, ReadError,
    SheetSelection, SheetToCsvError, UploadOutcome, WorkbookParser, Workspace, UTF8_BOM,
};
use tempfile::TempDir;

// Helper module for generating test fixtures
mod fixtures {
    use super::*;

    /// Write one report sheet: 8 title rows, a header row, then 20 data rows
    ///
    /// Column B has no header but holds notes, column D has neither header nor data.
    pub fn write_report_sheet(worksheet: &mut Worksheet, title: &str) -> Result<(), XlsxError> {
        worksheet.write_string(0, 0, title)?;
        worksheet.write_string(0, 3, "Confidential")?;
        worksheet.write_string(1, 0, "Generated by accounting")?;

        worksheet.write_string(8, 0, "Item")?;
        worksheet.write_string(8, 2, "Amount")?;

        for i in 1..=20u32 {
            let row = 8 + i;
            worksheet.write_string(row, 0, format!("item{}", i))?;
            if i % 5 == 0 {
                worksheet.write_string(row, 1, format!("note{}", i))?;
            }
            worksheet.write_number(row, 2, i as f64 * 1.5)?;
        }
        Ok(())
    }

    /// Generate a workbook with the sheets "Jan" and "Feb"
    pub fn generate_monthly_report(path: &Path) -> Result<(), XlsxError> {
        let mut workbook = Workbook::new();

        let jan = workbook.add_worksheet();
        jan.set_name("Jan")?;
        write_report_sheet(jan, "January")?;

        let feb = workbook.add_worksheet();
        feb.set_name("Feb")?;
        write_report_sheet(feb, "February")?;

        workbook.save(path)
    }

    /// Generate a single-sheet workbook with a plain 2-column table
    pub fn generate_single_sheet(path: &Path) -> Result<(), XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Data")?;

        worksheet.write_string(0, 0, "名前")?;
        worksheet.write_string(0, 1, "点数")?;
        worksheet.write_string(1, 0, "山田")?;
        worksheet.write_number(1, 1, 80.0)?;
        worksheet.write_string(2, 0, "Smith, John")?;
        worksheet.write_number(2, 1, 92.5)?;

        workbook.save(path)
    }
}

fn create_workspace() -> (TempDir, Workspace) {
    let root = TempDir::new().unwrap();
    let workspace = Workspace::create_in(root.path()).unwrap();
    (root, workspace)
}

fn monthly_report(dir: &Path) -> PathBuf {
    let path = dir.join("monthly.xlsx");
    fixtures::generate_monthly_report(&path).unwrap();
    path
}

/// BOMを取り除いてCSVを読み込む
fn read_csv(bytes: &[u8]) -> (Vec<String>, Vec<Vec<String>>) {
    assert!(bytes.starts_with(UTF8_BOM), "CSV must start with a UTF-8 BOM");
    let mut reader = csv::Reader::from_reader(&bytes[UTF8_BOM.len()..]);
    let headers = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (headers, rows)
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_list_sheets_in_workbook_order() {
    let dir = TempDir::new().unwrap();
    let path = monthly_report(dir.path());

    let sheets = WorkbookParser::list_sheets(&path).unwrap();
    assert_eq!(sheets, vec!["Jan", "Feb"]);
}

#[test]
fn test_load_with_skip_rows() {
    let dir = TempDir::new().unwrap();
    let path = monthly_report(dir.path());

    let table = WorkbookParser::load_sheet(&path, "Jan", 8).unwrap();

    assert_eq!(table.columns(), &["Item", "Unnamed: 1", "Amount", "Unnamed: 3"]);
    assert_eq!(table.row_count(), 20);
    assert_eq!(table.rows()[0][0], CellValue::Text("item1".to_string()));
    assert_eq!(table.rows()[0][2], CellValue::Number(1.5));
}

#[test]
fn test_load_without_skip_rows_uses_title_row() {
    let dir = TempDir::new().unwrap();
    let path = monthly_report(dir.path());

    let table = WorkbookParser::load_sheet(&path, "Feb", 0).unwrap();
    assert_eq!(table.columns()[0], "February");
    assert_eq!(table.row_count(), 28);
}

#[test]
fn test_load_missing_sheet() {
    let dir = TempDir::new().unwrap();
    let path = monthly_report(dir.path());

    match WorkbookParser::load_sheet(&path, "Mar", 0) {
        Err(ReadError::SheetNotFound { sheet }) => assert_eq!(sheet, "Mar"),
        other => panic!("Expected SheetNotFound, got {:?}", other),
    }
}

#[test]
fn test_undecodable_file_reports_every_decoder() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fake.xlsx");
    fs::write(&path, b"this is not a spreadsheet").unwrap();

    match WorkbookParser::list_sheets(&path) {
        Err(ReadError::Undecodable { attempts, .. }) => {
            assert_eq!(attempts.len(), 3);
            let err = SheetToCsvError::from(ReadError::Undecodable {
                path: path.clone(),
                attempts,
            });
            assert_eq!(err.category(), ErrorCategory::Read);
            assert!(err.to_string().contains("xlsx"));
            assert!(err.to_string().contains("xls"));
        }
        other => panic!("Expected Undecodable, got {:?}", other),
    }
}

#[test]
fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        WorkbookParser::list_sheets(dir.path().join("nope.xlsx")),
        Err(ReadError::NotFound { .. })
    ));
}

#[test]
fn test_clean_loaded_sheet() {
    let dir = TempDir::new().unwrap();
    let path = monthly_report(dir.path());

    let table = WorkbookParser::load_sheet(&path, "Jan", 8).unwrap();
    let (cleaned, report) = clean(table);

    assert_eq!(cleaned.columns(), &["Item", "Extra_Info_1", "Amount"]);
    assert_eq!(report.original_rows, 20);
    assert_eq!(report.original_columns, 4);
    assert_eq!(report.final_columns, 3);
    assert_eq!(report.empty_columns_removed, 1);
    assert_eq!(report.unnamed_columns_renamed, 1);
    assert_eq!(cleaned.rows()[4][1], CellValue::Text("note5".to_string()));
}

#[test]
fn test_convert_sheet_and_preview() {
    let dir = TempDir::new().unwrap();
    let path = monthly_report(dir.path());
    let converter = ConverterBuilder::new().with_preview_rows(5).build().unwrap();

    assert_eq!(converter.inspect(&path).unwrap(), vec!["Jan", "Feb"]);

    let (table, stats) = converter.convert_sheet(&path, "Feb", 8).unwrap();
    assert_eq!(stats.final_columns, 3);

    let preview = converter.preview(&table);
    assert_eq!(preview["columns"][1], "Extra_Info_1");
    assert_eq!(preview["rows"].as_array().unwrap().len(), 5);
    assert_eq!(preview["total_rows"], 20);
}

#[test]
fn test_convert_sheet_errors() {
    let dir = TempDir::new().unwrap();
    let path = monthly_report(dir.path());
    let converter = ConverterBuilder::new().build().unwrap();

    match converter.convert_sheet(&path, "Mar", 0) {
        Err(e @ SheetToCsvError::Read(ReadError::SheetNotFound { .. })) => {
            assert_eq!(e.category(), ErrorCategory::Read)
        }
        other => panic!("Expected SheetNotFound, got {:?}", other),
    }

    match converter.convert_sheet(&path, "Jan", 101) {
        Err(e @ SheetToCsvError::Validation(_)) => {
            assert_eq!(e.category(), ErrorCategory::Validation)
        }
        other => panic!("Expected Validation error, got {:?}", other),
    }
}

#[test]
fn test_csv_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = monthly_report(dir.path());

    let (table, _) = clean(WorkbookParser::load_sheet(&path, "Jan", 8).unwrap());
    let (headers, rows) = read_csv(&csv_to_bytes(&table).unwrap());

    assert_eq!(headers, vec!["Item", "Extra_Info_1", "Amount"]);
    assert_eq!(rows.len(), 20);
    assert_eq!(rows[0], vec!["item1", "", "1.5"]);
    assert_eq!(rows[1], vec!["item2", "", "3"]);
    assert_eq!(rows[4], vec!["item5", "note5", "7.5"]);
}

#[test]
fn test_upload_single_sheet_converts_immediately() {
    let (_root, workspace) = create_workspace();
    let source = TempDir::new().unwrap();
    let path = source.path().join("scores.xlsx");
    fixtures::generate_single_sheet(&path).unwrap();

    let converter = ConverterBuilder::new().build().unwrap();
    let outcome = converter
        .upload(File::open(&path).unwrap(), "scores.xlsx", 0, &workspace)
        .unwrap();

    match outcome {
        UploadOutcome::Converted {
            sheet_name,
            file,
            stats,
        } => {
            assert_eq!(sheet_name, "Data");
            assert!(file.filename.starts_with("extract_scores_"));
            assert!(file.filename.ends_with(".csv"));
            assert_eq!(stats.original_rows, 2);

            let (headers, rows) = read_csv(&fs::read(&file.path).unwrap());
            assert_eq!(headers, vec!["名前", "点数"]);
            assert_eq!(rows[0], vec!["山田", "80"]);
            assert_eq!(rows[1], vec!["Smith, John", "92.5"]);

            let located = workspace.locate_output(&file.filename).unwrap();
            assert_eq!(located.path, file.path);
        }
        other => panic!("Expected Converted, got {:?}", other),
    }

    // 一時ファイルは削除済み
    assert!(dir_entries(workspace.upload_dir()).is_empty());
}

#[test]
fn test_upload_multi_sheet_then_process() {
    let (_root, workspace) = create_workspace();
    let source = TempDir::new().unwrap();
    let path = monthly_report(source.path());
    let converter = ConverterBuilder::new().build().unwrap();

    let outcome = converter
        .upload(File::open(&path).unwrap(), "monthly.xlsx", 8, &workspace)
        .unwrap();
    let (sheets, temp_file) = match outcome {
        UploadOutcome::SheetsDetected {
            sheets,
            temp_file,
            skip_rows,
            original_filename,
        } => {
            assert_eq!(skip_rows, 8);
            assert_eq!(original_filename, "monthly.xlsx");
            (sheets, temp_file)
        }
        other => panic!("Expected SheetsDetected, got {:?}", other),
    };
    assert_eq!(sheets, vec!["Jan", "Feb"]);
    assert!(workspace.upload_dir().join(&temp_file).is_file());

    let report = converter
        .process_sheets(&temp_file, "monthly.xlsx", &["Jan", "Missing"], 8, &workspace)
        .unwrap();

    assert!(report.success);
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.converted_count(), 1);
    assert_eq!(report.failed_count(), 1);

    let jan = &report.results[0];
    assert_eq!(jan.sheet_name, "Jan");
    let file = jan.file.as_ref().unwrap();
    assert!(file.filename.starts_with("extract_monthly_Jan_"));
    assert_eq!(jan.stats.unwrap().final_columns, 3);
    let (headers, rows) = read_csv(&fs::read(&file.path).unwrap());
    assert_eq!(headers, vec!["Item", "Extra_Info_1", "Amount"]);
    assert_eq!(rows.len(), 20);

    let missing = &report.results[1];
    assert_eq!(missing.sheet_name, "Missing");
    assert!(missing.file.is_none());
    assert!(missing.error.as_ref().unwrap().contains("Missing"));

    assert!(!workspace.upload_dir().join(&temp_file).exists());
}

#[test]
fn test_process_sheets_requires_selection() {
    let (_root, workspace) = create_workspace();
    let converter = ConverterBuilder::new().build().unwrap();
    let none: [&str; 0] = [];

    assert!(matches!(
        converter.process_sheets("temp_x.xlsx", "x.xlsx", &none, 0, &workspace),
        Err(SheetToCsvError::Validation(_))
    ));
}

#[test]
fn test_process_sheets_with_unknown_temp_file() {
    let (_root, workspace) = create_workspace();
    let converter = ConverterBuilder::new().build().unwrap();

    assert!(matches!(
        converter.process_sheets("temp_gone.xlsx", "gone.xlsx", &["Jan"], 0, &workspace),
        Err(SheetToCsvError::Read(ReadError::NotFound { .. }))
    ));
}

#[test]
fn test_export_zip() {
    let (_root, workspace) = create_workspace();
    let source = TempDir::new().unwrap();
    let path = monthly_report(source.path());
    let converter = ConverterBuilder::new().build().unwrap();

    let temp_file = match converter
        .upload(File::open(&path).unwrap(), "monthly.xlsx", 8, &workspace)
        .unwrap()
    {
        UploadOutcome::SheetsDetected { temp_file, .. } => temp_file,
        other => panic!("Expected SheetsDetected, got {:?}", other),
    };

    let report = converter
        .export_zip(&temp_file, "monthly.xlsx", &SheetSelection::All, 8, &workspace)
        .unwrap();

    assert!(report.success);
    assert_eq!(report.sheets_processed, 2);
    assert_eq!(report.members, vec!["extract_Jan.csv", "extract_Feb.csv"]);
    assert!(report.failed_sheets.is_empty());
    assert!(report.file.filename.starts_with("extract_monthly_"));
    assert!(report.file.filename.ends_with(".zip"));

    let mut archive = zip::ZipArchive::new(File::open(&report.file.path).unwrap()).unwrap();
    assert_eq!(archive.len(), 2);
    let mut member = archive.by_name("extract_Feb.csv").unwrap();
    assert_eq!(member.compression(), zip::CompressionMethod::Deflated);
    let mut bytes = Vec::new();
    std::io::Read::read_to_end(&mut member, &mut bytes).unwrap();
    let (headers, rows) = read_csv(&bytes);
    assert_eq!(headers, vec!["Item", "Extra_Info_1", "Amount"]);
    assert_eq!(rows.len(), 20);

    assert!(!workspace.upload_dir().join(&temp_file).exists());
}

#[test]
fn test_export_zip_skips_failed_sheets() {
    let (_root, workspace) = create_workspace();
    let path = workspace.upload_dir().join("temp_20250101_000000_monthly.xlsx");
    fixtures::generate_monthly_report(&path).unwrap();
    let converter = ConverterBuilder::new().build().unwrap();

    let selection = SheetSelection::Names(vec!["Missing".to_string(), "Jan".to_string()]);
    let report = converter
        .export_zip(
            "temp_20250101_000000_monthly.xlsx",
            "monthly.xlsx",
            &selection,
            8,
            &workspace,
        )
        .unwrap();

    assert_eq!(report.sheets_processed, 1);
    assert_eq!(report.members, vec!["extract_Jan.csv"]);
    assert_eq!(report.failed_sheets.len(), 1);
    assert_eq!(report.failed_sheets[0].sheet_name, "Missing");
}

#[test]
fn test_retention_after_repeated_uploads() {
    let (_root, workspace) = create_workspace();
    let source = TempDir::new().unwrap();
    let path = source.path().join("scores.xlsx");
    fixtures::generate_single_sheet(&path).unwrap();

    let converter = ConverterBuilder::new().with_max_files(2).build().unwrap();
    for name in ["a.xlsx", "b.xlsx", "c.xlsx", "d.xlsx"] {
        converter
            .upload(File::open(&path).unwrap(), name, 0, &workspace)
            .unwrap();
    }

    assert_eq!(dir_entries(workspace.output_dir()).len(), 2);
    let report = enforce_limit(workspace.output_dir(), 2);
    assert!(report.removed.is_empty());
    assert!(report.is_clean());
}

#[test]
fn test_upload_too_large() {
    let (_root, workspace) = create_workspace();
    let converter = ConverterBuilder::new()
        .with_max_input_file_size(1024)
        .build()
        .unwrap();

    let payload = vec![0u8; 2048];
    match converter.upload(payload.as_slice(), "big.xlsx", 0, &workspace) {
        Err(e @ SheetToCsvError::SecurityViolation(_)) => {
            assert_eq!(e.category(), ErrorCategory::Validation)
        }
        other => panic!("Expected SecurityViolation, got {:?}", other),
    }
    assert!(dir_entries(workspace.upload_dir()).is_empty());
}

#[test]
fn test_upload_undecodable_removes_temp_file() {
    let (_root, workspace) = create_workspace();
    let converter = ConverterBuilder::new().build().unwrap();

    let result = converter.upload(&b"plain text"[..], "notes.xlsx", 0, &workspace);
    assert!(matches!(
        result,
        Err(SheetToCsvError::Read(ReadError::Undecodable { .. }))
    ));
    assert!(dir_entries(workspace.upload_dir()).is_empty());
}
