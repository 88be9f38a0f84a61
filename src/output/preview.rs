//! Preview Renderer
//!
//! 表の先頭部分をJSONに変換する。

use serde_json::{json, Value};

use crate::types::{CellValue, Table};

/// 表の先頭`limit`行をJSONとして返す
///
/// 列の順番と重複した列名を保持するため、行はオブジェクトではなく配列で出力します。
///
/// ```json
/// {"columns": ["Name", "Age"], "rows": [["Alice", 30]], "total_rows": 1}
/// ```
pub fn render_preview(table: &Table, limit: usize) -> Value {
    let rows: Vec<Value> = table
        .rows()
        .iter()
        .take(limit)
        .map(|row| Value::Array(row.iter().map(CellValue::to_json).collect()))
        .collect();

    json!({
        "columns": table.columns(),
        "rows": rows,
        "total_rows": table.row_count(),
    })
}
