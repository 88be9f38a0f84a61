//! Parser Module
//!
//! calamineを使用したExcelファイル解析。
//! シート一覧の取得（Inspector）とシートの読み込み（Loader）を提供します。

mod workbook;

pub use workbook::WorkbookParser;
