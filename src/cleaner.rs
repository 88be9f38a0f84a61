//! Table Cleaner Module
//!
//! 読み込んだ表の構造的なクリーンアップを行うモジュール。
//!
//! 1. すべてのセルが空の列を削除する
//! 2. 残った列のうち、ヘッダーを決定できなかった列（プレースホルダー列）に
//!    `Extra_Info_<k>` という連番の名前を付ける

use crate::types::{CellValue, CleanupReport, Table};

/// ヘッダーを決定できなかった列の名前に含まれる目印
pub const PLACEHOLDER_MARKER: &str = "Unnamed";

/// プレースホルダー列の新しい名前の接頭辞
pub const EXTRA_INFO_PREFIX: &str = "Extra_Info_";

/// 表をクリーンアップする
///
/// 空列の削除 → プレースホルダー列の改名の順で処理します。
/// 改名の連番は左から順に1から振り、元の名前に含まれる番号には依存しません。
/// 改名しない列名はそのまま残し、重複していても変更しません。
///
/// # 戻り値
///
/// クリーンアップ後の表と統計情報のペア
///
/// # 使用例
///
/// ```rust
/// use sheet2csv::{clean, CellValue, Table};
///
/// # fn main() -> Result<(), sheet2csv::SheetToCsvError> {
/// let table = Table::new(
///     vec!["Name".to_string(), "Unnamed: 1".to_string(), "Unnamed: 2".to_string()],
///     vec![vec![
///         CellValue::Text("Alice".to_string()),
///         CellValue::Null,
///         CellValue::Number(3.0),
///     ]],
/// )?;
///
/// let (cleaned, report) = clean(table);
/// assert_eq!(cleaned.columns(), &["Name".to_string(), "Extra_Info_1".to_string()]);
/// assert_eq!(report.empty_columns_removed, 1);
/// assert_eq!(report.unnamed_columns_renamed, 1);
/// # Ok(())
/// # }
/// ```
pub fn clean(table: Table) -> (Table, CleanupReport) {
    let original_rows = table.row_count();
    let original_columns = table.column_count();

    // 1. 空列の削除
    let keep: Vec<bool> = (0..original_columns)
        .map(|col| !table.column_is_null(col))
        .collect();

    let (columns, rows) = table.into_parts();
    let mut columns: Vec<String> = columns
        .into_iter()
        .zip(&keep)
        .filter_map(|(name, &k)| k.then_some(name))
        .collect();
    let rows: Vec<Vec<CellValue>> = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&keep)
                .filter_map(|(cell, &k)| k.then_some(cell))
                .collect()
        })
        .collect();

    // 2. プレースホルダー列の改名
    let mut renamed = 0;
    for name in columns.iter_mut() {
        if name.contains(PLACEHOLDER_MARKER) {
            renamed += 1;
            *name = format!("{}{}", EXTRA_INFO_PREFIX, renamed);
        }
    }

    let final_columns = columns.len();
    let report = CleanupReport {
        original_rows,
        original_columns,
        final_columns,
        empty_columns_removed: original_columns - final_columns,
        unnamed_columns_renamed: renamed,
    };

    (Table::from_parts_unchecked(columns, rows), report)
}

/// すべてのセルが空の行を削除する
///
/// `clean`の後に任意で適用する後処理です。
pub fn remove_empty_rows(table: Table) -> Table {
    let (columns, rows) = table.into_parts();
    let rows = rows
        .into_iter()
        .filter(|row| !row.iter().all(CellValue::is_null))
        .collect();
    Table::from_parts_unchecked(columns, rows)
}
