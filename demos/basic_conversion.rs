//! Basic Conversion Example
//!
//! This example demonstrates the basic flow of sheet2csv:
//! uploading a workbook into a workspace, then converting every sheet to CSV.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example basic_conversion -- input.xlsx [workspace_dir] [skip_rows]
//! ```
//!
//! The workspace defaults to `sheet2csv-data` in the current directory.
//! Converted files are written to `<workspace_dir>/outputs`.

use std::fs::File;
use std::path::Path;

use sheet2csv::{ConverterBuilder, UploadOutcome, Workspace};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);

    let input_path = args.next().ok_or(
        "Usage: cargo run --example basic_conversion -- input.xlsx [workspace_dir] [skip_rows]",
    )?;
    let workspace_dir = args.next().unwrap_or_else(|| "sheet2csv-data".to_string());
    let skip_rows: usize = match args.next() {
        Some(value) => value.parse()?,
        None => 0,
    };

    let workspace = Workspace::create_in(&workspace_dir)?;
    let converter = ConverterBuilder::new().build()?;

    let input = File::open(&input_path).map_err(|e| {
        eprintln!("Error: Could not open input file '{}'", input_path);
        eprintln!("  {}", e);
        e
    })?;
    let original_filename = Path::new(&input_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| input_path.clone());

    println!("Uploading {}...", input_path);

    match converter.upload(input, &original_filename, skip_rows, &workspace)? {
        // Single-sheet workbooks are converted right away
        UploadOutcome::Converted {
            sheet_name,
            file,
            stats,
        } => {
            println!(
                "{} -> {} ({} rows, {} columns)",
                sheet_name,
                file.path.display(),
                stats.original_rows,
                stats.final_columns
            );
        }

        // Multi-sheet workbooks wait for a selection; this example converts them all
        UploadOutcome::SheetsDetected {
            sheets,
            temp_file,
            skip_rows,
            original_filename,
        } => {
            println!("Found {} sheets: {}", sheets.len(), sheets.join(", "));

            let report = converter.process_sheets(
                &temp_file,
                &original_filename,
                &sheets,
                skip_rows,
                &workspace,
            )?;

            for result in &report.results {
                match (&result.file, &result.error) {
                    (Some(file), _) => println!("{} -> {}", result.sheet_name, file.path.display()),
                    (None, Some(error)) => eprintln!("{} failed: {}", result.sheet_name, error),
                    (None, None) => {}
                }
            }
            println!(
                "Converted {} of {} sheets",
                report.converted_count(),
                report.results.len()
            );
        }
    }

    Ok(())
}
