//! sheet2csv - Excel worksheet to CSV / ZIP extraction
//!
//! This crate reads Excel workbooks (XLSX, XLS, XLSB), loads individual worksheets
//! as tables, cleans them up (empty columns removed, placeholder headers renamed)
//! and exports them as UTF-8 CSV files with a BOM or as a single ZIP archive.
//! The number of files kept in the upload and output directories is bounded.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::fs::File;
//! use sheet2csv::{ConverterBuilder, UploadOutcome, Workspace};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create a converter with default settings
//!     let converter = ConverterBuilder::new().build()?;
//!     let workspace = Workspace::create_in("data")?;
//!
//!     // Store the upload and convert it right away if it has a single sheet
//!     let input = File::open("report.xlsx")?;
//!     match converter.upload(input, "report.xlsx", 0, &workspace)? {
//!         UploadOutcome::Converted { file, .. } => println!("wrote {}", file.filename),
//!         UploadOutcome::SheetsDetected { sheets, temp_file, .. } => {
//!             let report = converter.process_sheets(
//!                 &temp_file,
//!                 "report.xlsx",
//!                 &sheets,
//!                 0,
//!                 &workspace,
//!             )?;
//!             println!("{} sheets converted", report.converted_count());
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Lower-level Pipeline
//!
//! ```rust,no_run
//! use sheet2csv::{clean, csv_to_bytes, WorkbookParser};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Skip eight title rows above the header
//!     let table = WorkbookParser::load_sheet("report.xlsx", "Jan", 8)?;
//!     let (cleaned, report) = clean(table);
//!     println!("{} empty columns removed", report.empty_columns_removed);
//!
//!     let bytes = csv_to_bytes(&cleaned)?;
//!     std::fs::write("jan.csv", bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! ```rust,no_run
//! use sheet2csv::{ErrorCategory, WorkbookParser};
//!
//! match WorkbookParser::list_sheets("broken.xlsx") {
//!     Ok(sheets) => println!("{:?}", sheets),
//!     Err(e) => {
//!         let e = sheet2csv::SheetToCsvError::from(e);
//!         assert_eq!(e.category(), ErrorCategory::Read);
//!     }
//! }
//! ```

mod api;
mod builder;
mod cleaner;
mod error;
mod naming;
mod output;
mod parser;
mod report;
mod retention;
mod security;
mod storage;
mod types;

// 公開API
pub use api::{Decoder, SheetSelection};
pub use builder::{
    Converter, ConverterBuilder, DEFAULT_MAX_FILES, DEFAULT_MAX_SKIP_ROWS, DEFAULT_PREVIEW_ROWS,
};
pub use cleaner::{clean, remove_empty_rows, EXTRA_INFO_PREFIX, PLACEHOLDER_MARKER};
pub use error::{DecodeAttempt, ErrorCategory, ReadError, SheetToCsvError, WriteError};
pub use naming::{
    make_filename, make_filename_at, make_zip_member_name, sanitize_sheet_name, TIMESTAMP_FORMAT,
};
pub use output::{
    csv_to_bytes, render_preview, write_csv, write_csv_to, write_zip, ExportedFile, UTF8_BOM,
};
pub use parser::WorkbookParser;
pub use report::{ArchiveReport, BatchReport, SheetFailure, SheetResult, UploadOutcome};
pub use retention::{enforce_limit, enforce_limit_with, RetentionReport};
pub use storage::Workspace;
pub use types::{CellValue, CleanupReport, Table};
