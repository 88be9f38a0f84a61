//! ZIP Archive Writer
//!
//! 複数のCSVをDeflate圧縮のZIPアーカイブにまとめる。

use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use super::atomic_write;
use crate::error::{SheetToCsvError, WriteError};
use crate::security::validate_member_name;

/// 同名のエントリーを後勝ちでまとめる（位置は最初の出現のまま）
fn merge_duplicates(entries: &[(String, Vec<u8>)]) -> Vec<(&str, &[u8])> {
    let mut merged: Vec<(&str, &[u8])> = Vec::with_capacity(entries.len());
    for (name, content) in entries {
        match merged.iter_mut().find(|(n, _)| *n == name.as_str()) {
            Some(existing) => existing.1 = content.as_slice(),
            None => merged.push((name.as_str(), content.as_slice())),
        }
    }
    merged
}

/// エントリーをZIPアーカイブとして書き出す
///
/// # 引数
///
/// * `entries` - `(メンバー名, 内容)`のリスト。名前はそのまま使用します
/// * `path` - 出力先のパス
///
/// 同じ名前のエントリーが複数ある場合は、後のエントリーの内容で上書きされます。
/// 名前の一意性は呼び出し側で保証してください。
///
/// # 戻り値
///
/// * `Err(SheetToCsvError::Validation)` - メンバー名がフラットなファイル名でない場合
/// * `Err(SheetToCsvError::Write)` - I/Oエラーが発生した場合（出力先には何も作成されない）
pub fn write_zip<P: AsRef<Path>>(
    entries: &[(String, Vec<u8>)],
    path: P,
) -> Result<(), SheetToCsvError> {
    let path = path.as_ref();

    for (name, _) in entries {
        validate_member_name(name).map_err(SheetToCsvError::Validation)?;
    }
    let members = merge_duplicates(entries);

    atomic_write(path, |file| -> Result<(), WriteError> {
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        for (name, content) in &members {
            zip.start_file(*name, options)?;
            zip.write_all(content)?;
        }

        let mut writer = zip.finish()?;
        writer.flush()?;
        Ok(())
    })?;

    info!("wrote {} ({} entries)", path.display(), members.len());
    Ok(())
}
