//! Name Generator Module
//!
//! 出力ファイル名・アーカイブ名の生成。
//!
//! 形式: `extract_<base>[_<sheet>]_<YYYYMMDD_HHMMSS>.<ext>`
//!
//! タイムスタンプは秒単位のため、同じ秒に同じ入力で2回呼び出すと同じ名前になります。
//! 秒内での一意性が必要な呼び出し側は、独自に識別子を付加してください。

use std::collections::HashSet;

use chrono::{Local, NaiveDateTime};

/// ファイル名に使用するタイムスタンプ形式
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// シート名をファイル名に使える形に整える
///
/// 英数字・空白・ハイフン・アンダースコア以外の文字を取り除き、前後の空白を削除します。
/// 結果が空文字列になってもエラーにはしません。
pub fn sanitize_sheet_name(sheet_name: &str) -> String {
    sheet_name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// 現在時刻で出力ファイル名を生成する
///
/// # 使用例
///
/// ```rust
/// use sheet2csv::make_filename;
///
/// let name = make_filename("Report", Some("Q1 Sales!"), "csv");
/// assert!(name.starts_with("extract_Report_Q1 Sales_"));
/// assert!(name.ends_with(".csv"));
/// ```
pub fn make_filename(base_name: &str, sheet_name: Option<&str>, extension: &str) -> String {
    make_filename_at(base_name, sheet_name, extension, &Local::now().naive_local())
}

/// 指定時刻で出力ファイル名を生成する
pub fn make_filename_at(
    base_name: &str,
    sheet_name: Option<&str>,
    extension: &str,
    at: &NaiveDateTime,
) -> String {
    let timestamp = at.format(TIMESTAMP_FORMAT);
    match sheet_name {
        Some(sheet) => format!(
            "extract_{}_{}_{}.{}",
            base_name,
            sanitize_sheet_name(sheet),
            timestamp,
            extension
        ),
        None => format!("extract_{}_{}.{}", base_name, timestamp, extension),
    }
}

/// ZIPアーカイブ内のCSVメンバー名を生成する（`extract_<sheet>.csv`）
pub fn make_zip_member_name(sheet_name: &str) -> String {
    format!("extract_{}.csv", sanitize_sheet_name(sheet_name))
}

/// アップロードされたファイルの一時保存名を生成する（`temp_<timestamp>_<filename>`）
pub(crate) fn make_upload_name(original_filename: &str, at: &NaiveDateTime) -> String {
    format!("temp_{}_{}", at.format(TIMESTAMP_FORMAT), original_filename)
}

/// 同じ名前が重複しないよう、2つ目以降に `_<n>` を付ける
///
/// 番号は拡張子の前に挿入します（`extract_Q1.csv` → `extract_Q1_2.csv`）。
pub(crate) fn disambiguate(names: Vec<String>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(names.len());
    names
        .into_iter()
        .map(|name| {
            let mut candidate = name.clone();
            let mut n = 2;
            while used.contains(&candidate) {
                candidate = match name.rsplit_once('.') {
                    Some((stem, ext)) => format!("{}_{}.{}", stem, n, ext),
                    None => format!("{}_{}", name, n),
                };
                n += 1;
            }
            used.insert(candidate.clone());
            candidate
        })
        .collect()
}
