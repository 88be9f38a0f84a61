//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。
//!
//! エラーは3つの分類（読み込み・書き込み・入力検証）に分かれます。

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::api::Decoder;

/// sheet2csvクレート全体で使用するエラー型
///
/// # エラーの種類
///
/// - `Read`: ワークブックの読み込みに失敗した（ファイルなし、形式不明、シートなし）
/// - `Write`: CSV/ZIP/出力ディレクトリへの書き込みに失敗した
/// - `Validation`: 呼び出し側の指定が不正（skip_rowsの範囲外、空のシート選択など）
/// - `SecurityViolation`: 入力サイズ制限などに違反した
///
/// # 使用例
///
/// ```rust,no_run
/// use sheet2csv::{ErrorCategory, SheetToCsvError, WorkbookParser};
///
/// match WorkbookParser::list_sheets("missing.xlsx").map_err(SheetToCsvError::from) {
///     Err(e) if e.category() == ErrorCategory::Read => eprintln!("読み込み失敗: {}", e),
///     _ => {}
/// }
/// ```
#[derive(Error, Debug)]
pub enum SheetToCsvError {
    /// ワークブックの読み込み中に発生したエラー
    #[error(transparent)]
    Read(#[from] ReadError),

    /// 出力ファイルの書き込み中に発生したエラー
    #[error(transparent)]
    Write(#[from] WriteError),

    /// 入力検証に失敗したエラー
    ///
    /// `ConverterBuilder::build()`時の設定検証、および各パイプライン呼び出し時の
    /// 引数検証（skip_rowsの上限超過、空のシート選択、存在しないシート名）で発生します。
    #[error("Validation error: {0}")]
    Validation(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// 入力ファイルサイズの上限超過などで発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

/// エラーの大分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Read,
    Write,
    Validation,
}

impl SheetToCsvError {
    /// エラーの大分類を返す
    ///
    /// セキュリティ違反は呼び出し側の入力に起因するため`Validation`に分類します。
    pub fn category(&self) -> ErrorCategory {
        match self {
            SheetToCsvError::Read(_) => ErrorCategory::Read,
            SheetToCsvError::Write(_) => ErrorCategory::Write,
            SheetToCsvError::Validation(_) | SheetToCsvError::SecurityViolation(_) => {
                ErrorCategory::Validation
            }
        }
    }
}

/// デコーダー1回分の試行結果
#[derive(Debug)]
pub struct DecodeAttempt {
    /// 試行したデコーダー
    pub decoder: Decoder,
    /// デコーダーが返したエラー
    pub error: calamine::Error,
}

impl fmt::Display for DecodeAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.decoder, self.error)
    }
}

fn join_attempts(attempts: &[DecodeAttempt]) -> String {
    attempts
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// 読み込みエラー
#[derive(Error, Debug)]
pub enum ReadError {
    /// 入力ファイルが存在しない
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// 入力ファイルのI/Oエラー
    #[error("IO error while reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// すべてのデコーダーがファイルを開けなかった
    ///
    /// 試行したデコーダーごとのエラーを順番に保持します。
    #[error("Cannot read Excel file {}: {}", path.display(), join_attempts(attempts))]
    Undecodable {
        path: PathBuf,
        attempts: Vec<DecodeAttempt>,
    },

    /// 指定されたシートがワークブックに存在しない
    #[error("Worksheet named '{sheet}' not found")]
    SheetNotFound { sheet: String },

    /// シートのセルデータ解析に失敗した
    #[error("Failed to parse sheet '{sheet}': {source}")]
    Sheet {
        sheet: String,
        #[source]
        source: calamine::Error,
    },
}

/// 書き込みエラー
#[derive(Error, Debug)]
pub enum WriteError {
    /// I/O操作中に発生したエラー（ディスクフル、権限不足など）
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSVのシリアライズに失敗した
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// ZIPアーカイブの作成に失敗した
    #[error("ZIP archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// 一時ファイルを最終的なファイル名に確定できなかった
    #[error("Failed to persist {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
