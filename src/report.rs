//! Report Module
//!
//! パイプライン呼び出しの結果を表す型。
//! いずれも`serde::Serialize`を実装し、上位のHTTP層などでそのままJSONにできます。

use serde::Serialize;

use crate::output::ExportedFile;
use crate::types::CleanupReport;

/// 複数シート処理における1シート分の結果
///
/// 成功時は`file`と`report`、失敗時は`error`が設定されます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetResult {
    pub sheet_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<ExportedFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<CleanupReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SheetResult {
    pub(crate) fn converted(sheet_name: &str, file: ExportedFile, stats: CleanupReport) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            file: Some(file),
            stats: Some(stats),
            error: None,
        }
    }

    pub(crate) fn failed(sheet_name: &str, error: impl ToString) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            file: None,
            stats: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// 選択したシートをまとめて処理した結果
///
/// 個々のシートの失敗はバッチ全体の失敗にはならず、`success`は`true`のままです。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub success: bool,
    /// 選択した順番の結果
    pub results: Vec<SheetResult>,
}

impl BatchReport {
    /// 成功したシートの数
    pub fn converted_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    /// 失敗したシートの数
    pub fn failed_count(&self) -> usize {
        self.results.len() - self.converted_count()
    }
}

/// ZIPに含められなかったシート
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetFailure {
    pub sheet_name: String,
    pub error: String,
}

/// ZIPエクスポートの結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveReport {
    pub success: bool,
    /// 作成したアーカイブ
    pub file: ExportedFile,
    /// アーカイブに含めたシートの数
    pub sheets_processed: usize,
    /// アーカイブ内のメンバー名（シートの順番）
    pub members: Vec<String>,
    pub failed_sheets: Vec<SheetFailure>,
}

/// アップロード処理の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// シートが1つだけだったため、そのままCSVに変換した
    Converted {
        sheet_name: String,
        file: ExportedFile,
        stats: CleanupReport,
    },

    /// シートが複数あったため、選択を待つ
    ///
    /// `temp_file`はアップロード用ディレクトリ内の一時ファイル名で、
    /// 続く`process_sheets` / `export_zip`に渡します。
    SheetsDetected {
        sheets: Vec<String>,
        temp_file: String,
        skip_rows: usize,
        original_filename: String,
    },
}
