//! CSV Writer
//!
//! 表をBOM付きUTF-8のCSVとして書き出す。
//! 表計算ソフトで開いたときに日本語などの非ASCII文字が文字化けしないよう、
//! 先頭にバイトオーダーマークを付けます。行番号の列は出力しません。

use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;

use super::atomic_write;
use crate::error::{SheetToCsvError, WriteError};
use crate::types::{CellValue, Table};

/// UTF-8のバイトオーダーマーク
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 表をCSVとして任意のライターに書き出す
///
/// ヘッダー行、データ行の順に出力します。空セルは空フィールドになります。
pub fn write_csv_to<W: Write>(table: &Table, mut writer: W) -> Result<(), WriteError> {
    writer.write_all(UTF8_BOM)?;

    if table.column_count() == 0 {
        writer.flush()?;
        return Ok(());
    }

    let mut csv_writer = ::csv::WriterBuilder::new()
        .terminator(::csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv_writer.write_record(table.columns())?;
    for row in table.rows() {
        csv_writer.write_record(row.iter().map(CellValue::to_field))?;
    }
    csv_writer.flush()?;

    Ok(())
}

/// 表をCSVのバイト列に変換する
pub fn csv_to_bytes(table: &Table) -> Result<Vec<u8>, WriteError> {
    let mut buffer = Vec::new();
    write_csv_to(table, &mut buffer)?;
    Ok(buffer)
}

/// 表をCSVファイルとして書き出す
///
/// # 引数
///
/// * `table` - 書き出す表
/// * `path` - 出力先のパス（親ディレクトリがなければ作成）
///
/// # 戻り値
///
/// * `Ok(())` - 書き込みに成功した場合
/// * `Err(SheetToCsvError::Write)` - I/Oエラーが発生した場合（出力先には何も作成されない）
pub fn write_csv<P: AsRef<Path>>(table: &Table, path: P) -> Result<(), SheetToCsvError> {
    let path = path.as_ref();
    atomic_write(path, |file| -> Result<(), SheetToCsvError> {
        let mut writer = BufWriter::new(file);
        write_csv_to(table, &mut writer)?;
        writer.flush().map_err(WriteError::Io)?;
        Ok(())
    })?;

    info!(
        "wrote {} ({} rows x {} columns)",
        path.display(),
        table.row_count(),
        table.column_count()
    );
    Ok(())
}
