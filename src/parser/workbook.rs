//! Workbook Module
//!
//! calamineを使用したシート一覧の取得とシートの読み込み。
//! デコーダーを順番に試行し、最初に開けたものを採用します。

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Range, Reader, Sheets, Xls, Xlsb, Xlsx};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::debug;

use crate::api::Decoder;
use crate::cleaner::PLACEHOLDER_MARKER;
use crate::error::{DecodeAttempt, ReadError};
use crate::types::{CellValue, Table};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// 指定したデコーダーでワークブックを開く
fn open_with_decoder(
    decoder: Decoder,
    path: &Path,
) -> Result<Sheets<BufReader<File>>, calamine::Error> {
    let sheets = match decoder {
        Decoder::Xlsx => Sheets::Xlsx(open_workbook::<Xlsx<_>, _>(path)?),
        Decoder::Xls => Sheets::Xls(open_workbook::<Xls<_>, _>(path)?),
        Decoder::Xlsb => Sheets::Xlsb(open_workbook::<Xlsb<_>, _>(path)?),
    };
    Ok(sheets)
}

/// ワークブックパーサー
///
/// calamineのラッパーとして、ワークブックレベルの操作を提供します。
/// 1回の呼び出し（シート一覧取得・シート読み込み）でのみ使用し、共有しません。
pub struct WorkbookParser {
    /// 入力ファイルのパス
    path: PathBuf,
    /// ファイルを開けたデコーダー
    decoder: Decoder,
    /// calamineのワークブック
    workbook: Sheets<BufReader<File>>,
}

impl std::fmt::Debug for WorkbookParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkbookParser")
            .field("path", &self.path)
            .field("decoder", &self.decoder)
            .finish_non_exhaustive()
    }
}

impl WorkbookParser {
    /// デフォルトのデコーダー順序でワークブックを開く
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReadError> {
        Self::open_with_decoders(path, &Decoder::DEFAULT_ORDER)
    }

    /// 指定したデコーダーを順番に試行してワークブックを開く
    ///
    /// # 引数
    ///
    /// * `path` - Excelファイルのパス
    /// * `decoders` - 試行するデコーダー（先頭から順に試行）
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookParser)` - いずれかのデコーダーで開けた場合
    /// * `Err(ReadError::NotFound)` - ファイルが存在しない場合
    /// * `Err(ReadError::Undecodable)` - すべてのデコーダーが失敗した場合（各試行のエラーを保持）
    pub fn open_with_decoders<P: AsRef<Path>>(
        path: P,
        decoders: &[Decoder],
    ) -> Result<Self, ReadError> {
        let path = path.as_ref();

        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(ReadError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReadError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => {
                return Err(ReadError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }

        let mut attempts = Vec::with_capacity(decoders.len());
        for &decoder in decoders {
            match open_with_decoder(decoder, path) {
                Ok(workbook) => {
                    debug!("opened {} with {} decoder", path.display(), decoder);
                    return Ok(Self {
                        path: path.to_path_buf(),
                        decoder,
                        workbook,
                    });
                }
                Err(error) => {
                    debug!("{} decoder rejected {}: {}", decoder, path.display(), error);
                    attempts.push(DecodeAttempt { decoder, error });
                }
            }
        }

        Err(ReadError::Undecodable {
            path: path.to_path_buf(),
            attempts,
        })
    }

    /// シート名の一覧を取得する（ワークブック内の順番）
    ///
    /// セルデータは読み込みません。
    pub fn list_sheets<P: AsRef<Path>>(path: P) -> Result<Vec<String>, ReadError> {
        Ok(Self::open(path)?.sheet_names())
    }

    /// シートを1つ読み込む
    ///
    /// 先頭の`skip_rows`行を捨て、次の行をヘッダーとして解釈します。
    pub fn load_sheet<P: AsRef<Path>>(
        path: P,
        sheet_name: &str,
        skip_rows: usize,
    ) -> Result<Table, ReadError> {
        Self::open(path)?.load(sheet_name, skip_rows)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// ファイルを開けたデコーダー
    pub fn decoder(&self) -> Decoder {
        self.decoder
    }

    /// すべてのシート名を取得
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// シートを読み込んで表に変換する
    ///
    /// # 引数
    ///
    /// * `sheet_name` - 読み込むシート名
    /// * `skip_rows` - ヘッダー行の前に読み飛ばす行数
    ///
    /// # 戻り値
    ///
    /// * `Ok(Table)` - 読み込みに成功した場合
    /// * `Err(ReadError::SheetNotFound)` - シートが存在しない場合
    /// * `Err(ReadError::Sheet)` - セルデータの解析に失敗した場合
    pub fn load(&mut self, sheet_name: &str, skip_rows: usize) -> Result<Table, ReadError> {
        if !self.sheet_names().iter().any(|name| name == sheet_name) {
            return Err(ReadError::SheetNotFound {
                sheet: sheet_name.to_string(),
            });
        }

        let range = self
            .workbook
            .worksheet_range(sheet_name)
            .map_err(|source| ReadError::Sheet {
                sheet: sheet_name.to_string(),
                source,
            })?;

        let table = table_from_range(&range, skip_rows);
        debug!(
            "loaded sheet '{}' from {}: {} rows x {} columns (skip_rows={})",
            sheet_name,
            self.path.display(),
            table.row_count(),
            table.column_count(),
            skip_rows
        );
        Ok(table)
    }
}

/// セル範囲から表を構築する
///
/// 座標はシートの絶対座標（行0 = シートの1行目）として扱います。
/// ヘッダーが空の列には `Unnamed: <列番号>` という仮の名前を付けます。
pub(crate) fn table_from_range(range: &Range<Data>, skip_rows: usize) -> Table {
    let (end_row, end_col) = match range.end() {
        Some(end) => end,
        None => return Table::default(),
    };

    if skip_rows > end_row as usize {
        return Table::default();
    }

    let header_row = skip_rows as u32;
    let width = end_col + 1;

    let columns = (0..width)
        .map(|col| match range.get_value((header_row, col)).map(to_cell_value) {
            Some(CellValue::Null) | None => format!("{}: {}", PLACEHOLDER_MARKER, col),
            Some(value) => value.to_field(),
        })
        .collect();

    let rows = (header_row + 1..=end_row)
        .map(|row| {
            (0..width)
                .map(|col| {
                    range
                        .get_value((row, col))
                        .map(to_cell_value)
                        .unwrap_or(CellValue::Null)
                })
                .collect()
        })
        .collect();

    Table::from_parts_unchecked(columns, rows)
}

/// calamineのセル値を変換
fn to_cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) if s.is_empty() => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => CellValue::Text(format_duration(dt.as_f64())),
        // 1未満のシリアル値は時刻のみ（hh:mmなど）
        Data::DateTime(dt) if (0.0..1.0).contains(&dt.as_f64()) => time_of_day(dt.as_f64())
            .map(CellValue::Time)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => CellValue::DateTime(value),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
        Data::Empty => CellValue::Null,
    }
}

/// 日数の小数部を時刻に変換（秒単位で丸める）
fn time_of_day(fraction: f64) -> Option<NaiveTime> {
    let seconds = (fraction * SECONDS_PER_DAY).round() as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
}

/// 経過時間を`H:MM:SS`形式にする（24時間を超えても日に繰り上げない）
fn format_duration(days: f64) -> String {
    let total = (days.abs() * SECONDS_PER_DAY).round() as u64;
    let sign = if days < 0.0 && total > 0 { "-" } else { "" };
    format!(
        "{}{}:{:02}:{:02}",
        sign,
        total / 3600,
        total % 3600 / 60,
        total % 60
    )
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    s.parse::<NaiveDateTime>().ok().or_else(|| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}
