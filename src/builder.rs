//! Builder Module
//!
//! Fluent Builder APIを提供し、`Converter`インスタンスを段階的に構築する。
//! `Converter`はシートの検出・読み込み・クリーンアップ・書き出し・保持数の制御を
//! 1回の呼び出しとしてまとめます。

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use chrono::Local;
use log::{info, warn};
use rayon::prelude::*;

use crate::api::{Decoder, SheetSelection};
use crate::cleaner::{clean, remove_empty_rows};
use crate::error::{ReadError, SheetToCsvError, WriteError};
use crate::naming::{disambiguate, make_filename_at, make_upload_name, make_zip_member_name};
use crate::output::{atomic_write, csv_to_bytes, render_preview, write_csv, write_zip, ExportedFile};
use crate::parser::WorkbookParser;
use crate::report::{ArchiveReport, BatchReport, SheetFailure, SheetResult, UploadOutcome};
use crate::retention::enforce_limit;
use crate::security::{client_file_name, SecurityConfig};
use crate::storage::Workspace;
use crate::types::{CleanupReport, Table};

/// skip_rowsの上限のデフォルト値
pub const DEFAULT_MAX_SKIP_ROWS: usize = 100;

/// 出力ディレクトリに残すファイル数のデフォルト値
pub const DEFAULT_MAX_FILES: usize = 20;

/// プレビューに含める行数のデフォルト値
pub const DEFAULT_PREVIEW_ROWS: usize = 100;

/// 変換処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ConversionConfig {
    /// skip_rowsとして受け付ける最大値
    pub max_skip_rows: usize,

    /// 各ディレクトリに残すファイルの最大数
    pub max_files: usize,

    /// すべてのセルが空の行を削除するか
    pub remove_empty_rows: bool,

    /// 試行するデコーダー（先頭から順に試行）
    pub decoders: Vec<Decoder>,

    /// プレビューに含める行数
    pub preview_rows: usize,

    /// セキュリティ設定
    pub security: SecurityConfig,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            max_skip_rows: DEFAULT_MAX_SKIP_ROWS,
            max_files: DEFAULT_MAX_FILES,
            remove_empty_rows: false,
            decoders: Decoder::DEFAULT_ORDER.to_vec(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            security: SecurityConfig::default(),
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use sheet2csv::ConverterBuilder;
///
/// # fn main() -> Result<(), sheet2csv::SheetToCsvError> {
/// let converter = ConverterBuilder::new()
///     .with_max_files(10)
///     .remove_empty_rows(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConverterBuilder {
    /// 内部設定（構築中）
    config: ConversionConfig,
}

impl ConverterBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - skip_rowsの上限: 100
    /// - 保持するファイル数: 20
    /// - 入力ファイルの最大サイズ: 50MB
    /// - 空行の削除: しない
    /// - デコーダー: xlsx → xls → xlsb
    /// - プレビュー行数: 100
    pub fn new() -> Self {
        Self::default()
    }

    /// skip_rowsとして受け付ける最大値を指定する
    pub fn with_max_skip_rows(mut self, max: usize) -> Self {
        self.config.max_skip_rows = max;
        self
    }

    /// 各ディレクトリに残すファイルの最大数を指定する
    ///
    /// # 制約
    ///
    /// * 1以上でなければならない（`build()`時に検証）
    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.config.max_files = max_files;
        self
    }

    /// 入力ファイルの最大サイズ（バイト）を指定する
    pub fn with_max_input_file_size(mut self, bytes: u64) -> Self {
        self.config.security.max_input_file_size = bytes;
        self
    }

    /// クリーンアップ後に、すべてのセルが空の行を削除するかを指定する
    pub fn remove_empty_rows(mut self, remove: bool) -> Self {
        self.config.remove_empty_rows = remove;
        self
    }

    /// 試行するデコーダーとその順番を指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use sheet2csv::{ConverterBuilder, Decoder};
    ///
    /// // 旧形式を優先する
    /// let builder = ConverterBuilder::new()
    ///     .with_decoders(vec![Decoder::Xls, Decoder::Xlsx]);
    /// ```
    pub fn with_decoders(mut self, decoders: Vec<Decoder>) -> Self {
        self.config.decoders = decoders;
        self
    }

    /// プレビューに含める行数を指定する
    pub fn with_preview_rows(mut self, rows: usize) -> Self {
        self.config.preview_rows = rows;
        self
    }

    /// 設定を検証し、`Converter`インスタンスを生成する
    ///
    /// # 発生し得るエラー
    ///
    /// * `SheetToCsvError::Validation(String)`: 設定の検証に失敗した場合
    ///   * 保持するファイル数が0
    ///   * デコーダーが1つも指定されていない
    ///   * 入力ファイルの最大サイズが0
    pub fn build(self) -> Result<Converter, SheetToCsvError> {
        if self.config.max_files == 0 {
            return Err(SheetToCsvError::Validation(
                "max_files must be at least 1".to_string(),
            ));
        }

        if self.config.decoders.is_empty() {
            return Err(SheetToCsvError::Validation(
                "At least one decoder is required".to_string(),
            ));
        }

        if self.config.security.max_input_file_size == 0 {
            return Err(SheetToCsvError::Validation(
                "max_input_file_size must be greater than 0".to_string(),
            ));
        }

        Ok(Converter {
            config: self.config,
        })
    }
}

/// 変換処理のファサード
///
/// 各メソッドは独立した1回の呼び出しで、呼び出し間で状態を共有しません。
/// 共有されるのは`Workspace`が指すディレクトリだけです。
///
/// # 使用例
///
/// ```rust,no_run
/// use std::fs::File;
/// use sheet2csv::{ConverterBuilder, UploadOutcome, Workspace};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let converter = ConverterBuilder::new().build()?;
/// let workspace = Workspace::create_in("data")?;
///
/// let input = File::open("report.xlsx")?;
/// match converter.upload(input, "report.xlsx", 8, &workspace)? {
///     UploadOutcome::Converted { file, .. } => println!("{}", file.path.display()),
///     UploadOutcome::SheetsDetected { sheets, temp_file, .. } => {
///         let batch = converter.process_sheets(&temp_file, "report.xlsx", &sheets, 8, &workspace)?;
///         println!("{} sheets converted", batch.converted_count());
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Converter {
    /// 変換設定
    config: ConversionConfig,
}

impl Converter {
    /// skip_rowsの範囲を検証
    fn validate_skip_rows(&self, skip_rows: usize) -> Result<(), SheetToCsvError> {
        if skip_rows > self.config.max_skip_rows {
            return Err(SheetToCsvError::Validation(format!(
                "skip_rows {} exceeds maximum {}",
                skip_rows, self.config.max_skip_rows
            )));
        }
        Ok(())
    }

    fn open(&self, path: &Path) -> Result<WorkbookParser, ReadError> {
        WorkbookParser::open_with_decoders(path, &self.config.decoders)
    }

    /// ワークブックのシート名を取得する
    pub fn inspect<P: AsRef<Path>>(&self, path: P) -> Result<Vec<String>, SheetToCsvError> {
        Ok(self.open(path.as_ref())?.sheet_names())
    }

    /// シートを1つ読み込み、クリーンアップした表と統計情報を返す
    ///
    /// # 引数
    ///
    /// * `path` - Excelファイルのパス
    /// * `sheet_name` - シート名
    /// * `skip_rows` - ヘッダー行の前に読み飛ばす行数
    pub fn convert_sheet<P: AsRef<Path>>(
        &self,
        path: P,
        sheet_name: &str,
        skip_rows: usize,
    ) -> Result<(Table, CleanupReport), SheetToCsvError> {
        self.validate_skip_rows(skip_rows)?;
        let mut parser = self.open(path.as_ref())?;
        Ok(self.load_and_clean(&mut parser, sheet_name, skip_rows)?)
    }

    fn load_and_clean(
        &self,
        parser: &mut WorkbookParser,
        sheet_name: &str,
        skip_rows: usize,
    ) -> Result<(Table, CleanupReport), ReadError> {
        let table = parser.load(sheet_name, skip_rows)?;
        let (table, report) = clean(table);
        let table = if self.config.remove_empty_rows {
            remove_empty_rows(table)
        } else {
            table
        };
        Ok((table, report))
    }

    /// 表の先頭部分をJSONで返す（`with_preview_rows`の行数まで）
    pub fn preview(&self, table: &Table) -> serde_json::Value {
        render_preview(table, self.config.preview_rows)
    }

    /// アップロードされたファイルを受け取る
    ///
    /// 一時ファイルとしてアップロード用ディレクトリに保存し、シートを検出します。
    /// シートが1つだけならその場でCSVに変換し、一時ファイルを削除します。
    /// 複数ある場合はシート一覧と一時ファイル名を返します。
    ///
    /// # 戻り値
    ///
    /// * `Err(SheetToCsvError::SecurityViolation)` - 入力サイズが上限を超えた場合
    /// * `Err(SheetToCsvError::Read)` - ファイルを読み込めない場合（一時ファイルは削除される）
    pub fn upload<R: Read>(
        &self,
        input: R,
        original_filename: &str,
        skip_rows: usize,
        workspace: &Workspace,
    ) -> Result<UploadOutcome, SheetToCsvError> {
        self.validate_skip_rows(skip_rows)?;

        let filename = client_file_name(original_filename).ok_or_else(|| {
            SheetToCsvError::Validation(format!(
                "Invalid upload filename: '{}'",
                original_filename
            ))
        })?;

        // 上限 + 1バイトまで読み込んで超過を判定する
        let limit = self.config.security.max_input_file_size;
        let mut buffer = Vec::new();
        input
            .take(limit.saturating_add(1))
            .read_to_end(&mut buffer)
            .map_err(|source| ReadError::Io {
                path: original_filename.into(),
                source,
            })?;
        self.config
            .security
            .check_input_size(buffer.len() as u64)
            .map_err(SheetToCsvError::SecurityViolation)?;

        let now = Local::now().naive_local();
        let temp_file = make_upload_name(filename, &now);
        let temp_path = workspace.upload_dir().join(&temp_file);
        atomic_write(&temp_path, |file| file.write_all(&buffer).map_err(WriteError::Io))?;
        enforce_limit(workspace.upload_dir(), self.config.max_files);

        let mut parser = match self.open(&temp_path) {
            Ok(parser) => parser,
            Err(e) => {
                remove_temp_file(&temp_path);
                return Err(e.into());
            }
        };
        let sheets = parser.sheet_names();

        if sheets.len() == 1 {
            let sheet_name = sheets.into_iter().next().unwrap_or_default();
            let file = workspace.output_file(make_filename_at(
                &base_name(filename),
                None,
                "csv",
                &now,
            ));
            let result = self.convert_to_file(&mut parser, &sheet_name, skip_rows, &file);
            // 一時ファイルを削除する前に閉じる
            drop(parser);
            remove_temp_file(&temp_path);
            let stats = result?;
            enforce_limit(workspace.output_dir(), self.config.max_files);

            return Ok(UploadOutcome::Converted {
                sheet_name,
                file,
                stats,
            });
        }

        info!(
            "{} has {} sheets, waiting for selection",
            original_filename,
            sheets.len()
        );
        Ok(UploadOutcome::SheetsDetected {
            sheets,
            temp_file,
            skip_rows,
            original_filename: filename.to_string(),
        })
    }

    /// 選択したシートをそれぞれCSVに変換する
    ///
    /// 各シートは独立して処理され、失敗したシートはエラー付きの結果になります。
    /// 1つのシートの失敗でバッチ全体が失敗することはありません。
    ///
    /// # 引数
    ///
    /// * `temp_file` - `upload`が返した一時ファイル名
    /// * `original_filename` - 元のファイル名（出力ファイル名の基になる）
    /// * `selected_sheets` - 処理するシート名（この順番で結果を返す）
    /// * `skip_rows` - ヘッダー行の前に読み飛ばす行数
    /// * `workspace` - 入出力ディレクトリ
    ///
    /// # 戻り値
    ///
    /// * `Err(SheetToCsvError::Validation)` - シートが選択されていない場合
    /// * `Err(SheetToCsvError::Read)` - 一時ファイルがない、またはワークブックとして読めない場合
    pub fn process_sheets<S: AsRef<str> + Sync>(
        &self,
        temp_file: &str,
        original_filename: &str,
        selected_sheets: &[S],
        skip_rows: usize,
        workspace: &Workspace,
    ) -> Result<BatchReport, SheetToCsvError> {
        self.validate_skip_rows(skip_rows)?;
        if selected_sheets.is_empty() {
            return Err(SheetToCsvError::Validation(
                "No sheets selected".to_string(),
            ));
        }

        let temp_path = workspace.resolve_upload(temp_file)?;
        // ワークブック全体が読めない場合はリクエスト全体を失敗にする
        self.inspect(&temp_path)?;

        let base = base_name(original_filename);
        let now = Local::now().naive_local();
        let filenames = disambiguate(
            selected_sheets
                .iter()
                .map(|sheet| make_filename_at(&base, Some(sheet.as_ref()), "csv", &now))
                .collect(),
        );

        // ワークブックはワーカーごとに1回だけ開き、そのワーカーが処理するシートで使い回す
        let results: Vec<SheetResult> = selected_sheets
            .par_iter()
            .zip(filenames.into_par_iter())
            .map_init(
                || None::<WorkbookParser>,
                |slot, (sheet, filename)| {
                    let sheet = sheet.as_ref();
                    let file = workspace.output_file(filename);
                    let result = self
                        .worker_parser(slot, &temp_path)
                        .map_err(SheetToCsvError::from)
                        .and_then(|parser| self.convert_to_file(parser, sheet, skip_rows, &file));
                    match result {
                        Ok(stats) => SheetResult::converted(sheet, file, stats),
                        Err(e) => {
                            warn!("failed to process sheet '{}': {}", sheet, e);
                            SheetResult::failed(sheet, e)
                        }
                    }
                },
            )
            .collect();

        remove_temp_file(&temp_path);
        enforce_limit(workspace.output_dir(), self.config.max_files);

        let report = BatchReport {
            success: true,
            results,
        };
        info!(
            "processed {} sheets from {} ({} failed)",
            report.results.len(),
            original_filename,
            report.failed_count()
        );
        Ok(report)
    }

    fn convert_to_file(
        &self,
        parser: &mut WorkbookParser,
        sheet_name: &str,
        skip_rows: usize,
        file: &ExportedFile,
    ) -> Result<CleanupReport, SheetToCsvError> {
        let (table, stats) = self.load_and_clean(parser, sheet_name, skip_rows)?;
        write_csv(&table, &file.path)?;
        Ok(stats)
    }

    /// ワーカーが保持するワークブックを返す（まだ開いていなければ開く）
    ///
    /// 開けなかった場合は`slot`を空のままにし、次のシートで再度試行します。
    fn worker_parser<'a>(
        &self,
        slot: &'a mut Option<WorkbookParser>,
        path: &Path,
    ) -> Result<&'a mut WorkbookParser, ReadError> {
        let parser = match slot.take() {
            Some(parser) => parser,
            None => self.open(path)?,
        };
        Ok(slot.insert(parser))
    }

    /// シートをCSVに変換し、1つのZIPアーカイブにまとめる
    ///
    /// アーカイブ内のメンバー名は`extract_<シート名>.csv`です。
    /// 変換に失敗したシートはログに記録して`failed_sheets`に含め、アーカイブからは除外します。
    ///
    /// # 戻り値
    ///
    /// * `Err(SheetToCsvError::Validation)` - `SheetSelection::Names`が空の場合
    /// * `Err(SheetToCsvError::Read)` - 一時ファイルがない、またはワークブックとして読めない場合
    /// * `Err(SheetToCsvError::Write)` - アーカイブを書き込めない場合
    pub fn export_zip(
        &self,
        temp_file: &str,
        original_filename: &str,
        selection: &SheetSelection,
        skip_rows: usize,
        workspace: &Workspace,
    ) -> Result<ArchiveReport, SheetToCsvError> {
        self.validate_skip_rows(skip_rows)?;
        if matches!(selection, SheetSelection::Names(names) if names.is_empty()) {
            return Err(SheetToCsvError::Validation(
                "No sheets selected".to_string(),
            ));
        }

        let temp_path = workspace.resolve_upload(temp_file)?;
        let available = self.inspect(&temp_path)?;
        let sheets = match selection {
            SheetSelection::All => available,
            SheetSelection::Names(names) => names.clone(),
        };

        let member_names = disambiguate(sheets.iter().map(|s| make_zip_member_name(s)).collect());

        let rendered: Vec<Result<Vec<u8>, SheetToCsvError>> = sheets
            .par_iter()
            .map_init(
                || None::<WorkbookParser>,
                |slot, sheet| -> Result<Vec<u8>, SheetToCsvError> {
                    let parser = self.worker_parser(slot, &temp_path)?;
                    let (table, _) = self.load_and_clean(parser, sheet, skip_rows)?;
                    Ok(csv_to_bytes(&table)?)
                },
            )
            .collect();

        let mut entries = Vec::with_capacity(sheets.len());
        let mut failed_sheets = Vec::new();
        for ((sheet, member), result) in sheets.iter().zip(member_names).zip(rendered) {
            match result {
                Ok(bytes) => entries.push((member, bytes)),
                Err(e) => {
                    warn!("error processing sheet {}: {}", sheet, e);
                    failed_sheets.push(SheetFailure {
                        sheet_name: sheet.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let now = Local::now().naive_local();
        let file = workspace.output_file(make_filename_at(
            &base_name(original_filename),
            None,
            "zip",
            &now,
        ));
        write_zip(&entries, &file.path)?;

        remove_temp_file(&temp_path);
        enforce_limit(workspace.output_dir(), self.config.max_files);

        Ok(ArchiveReport {
            success: true,
            file,
            sheets_processed: entries.len(),
            members: entries.into_iter().map(|(name, _)| name).collect(),
            failed_sheets,
        })
    }
}

/// ファイル名から拡張子を除いた部分
fn base_name(filename: &str) -> String {
    Path::new(client_file_name(filename).unwrap_or(filename))
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// 一時ファイルを削除する（失敗はログに記録するだけ）
fn remove_temp_file(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("failed to remove temp file {}: {}", path.display(), e);
    }
}
