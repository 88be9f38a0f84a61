//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use chrono::{NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::SheetToCsvError;

/// 整数として出力できる数値の上限（f64で正確に表現できる範囲）
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// セルの値を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// 文字列
    Text(String),

    /// 数値（f64）
    Number(f64),

    /// 論理値
    Bool(bool),

    /// 日付・日時
    DateTime(NaiveDateTime),

    /// 時刻のみ（シリアル値が1未満の日時セル）
    Time(NaiveTime),

    /// 空セル（値なし）
    Null,
}

impl CellValue {
    /// 値が空かどうかを判定
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// CSVのフィールド文字列に変換
    ///
    /// 空セルは空文字列になります。
    pub fn to_field(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Bool(true) => "TRUE".to_string(),
            CellValue::Bool(false) => "FALSE".to_string(),
            CellValue::DateTime(dt) => format_datetime(dt),
            CellValue::Time(t) => t.format("%H:%M:%S").to_string(),
            CellValue::Null => String::new(),
        }
    }

    /// JSON値に変換（プレビュー用）
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Text(s) => serde_json::Value::String(s.clone()),
            CellValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            CellValue::Bool(b) => serde_json::Value::Bool(*b),
            CellValue::DateTime(dt) => serde_json::Value::String(format_datetime(dt)),
            CellValue::Time(t) => serde_json::Value::String(t.format("%H:%M:%S").to_string()),
            CellValue::Null => serde_json::Value::Null,
        }
    }
}

/// 数値を出力用文字列に変換
///
/// 整数値は小数点なし（`3`）、それ以外は最短の往復可能表現で出力します。
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < MAX_EXACT_INTEGER {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// 日時を出力用文字列に変換（時刻が0時ちょうどなら日付のみ）
fn format_datetime(dt: &NaiveDateTime) -> String {
    if dt.time() == NaiveTime::MIN {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// ヘッダー行と行データからなる表
///
/// すべての行はヘッダーと同じ列数を持ちます（`Table::new`で検証）。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// 新しい表を生成
    ///
    /// # 戻り値
    ///
    /// * `Ok(Table)` - すべての行の列数がヘッダーと一致する場合
    /// * `Err(SheetToCsvError::Validation)` - 列数が一致しない行がある場合
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, SheetToCsvError> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(SheetToCsvError::Validation(format!(
                "Row {} has {} cells but the header has {} columns",
                idx,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// 列名の一覧
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 行データの一覧
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// 指定列のすべてのセルが空かどうかを判定
    ///
    /// 行が1つもない場合は空とみなします。
    pub fn column_is_null(&self, col: usize) -> bool {
        self.rows
            .iter()
            .all(|row| row.get(col).map_or(true, CellValue::is_null))
    }

    /// 指定した列だけを残した表を返す
    ///
    /// 列は`names`の順番で並びます。重複した列名がある場合は最初の列を採用します。
    ///
    /// # 戻り値
    ///
    /// * `Err(SheetToCsvError::Validation)` - 存在しない列名が含まれている場合
    pub fn select_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<Table, SheetToCsvError> {
        let mut indices = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            let name = name.as_ref();
            match self.columns.iter().position(|c| c == name) {
                Some(idx) => indices.push(idx),
                None => missing.push(name.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(SheetToCsvError::Validation(format!(
                "Columns not found: {}",
                missing.join(", ")
            )));
        }

        let columns = indices.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Table { columns, rows })
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<Vec<CellValue>>) {
        (self.columns, self.rows)
    }

    pub(crate) fn from_parts_unchecked(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }
}

/// クリーンアップ処理の統計情報
///
/// 不変条件: `final_columns == original_columns - empty_columns_removed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CleanupReport {
    /// 元の行数
    pub original_rows: usize,
    /// 元の列数
    pub original_columns: usize,
    /// クリーンアップ後の列数
    pub final_columns: usize,
    /// 削除した空列の数
    pub empty_columns_removed: usize,
    /// 名前を付け直したプレースホルダー列の数
    pub unnamed_columns_renamed: usize,
}
