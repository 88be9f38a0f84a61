//! Output Module
//!
//! CSV・ZIPの書き出しと、プレビュー用JSONの生成を提供するモジュール。
//!
//! ファイルは同じディレクトリ内の一時ファイルに書き込み、flush + `sync_all`の後に
//! 最終的な名前へリネームします。書き込みに失敗した場合、最終的な名前のファイルは
//! 作成されません。

mod archive;
mod csv_file;
mod preview;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::WriteError;

pub use self::archive::write_zip;
pub use self::csv_file::{csv_to_bytes, write_csv, write_csv_to, UTF8_BOM};
pub use self::preview::render_preview;

/// 書き込み中の一時ファイルの接頭辞
///
/// 保持数の制御ではこの接頭辞のファイルを数えません。
pub(crate) const IN_PROGRESS_PREFIX: &str = ".sheet2csv-";

/// 出力ディレクトリに書き出したファイル
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedFile {
    /// ファイル名
    pub filename: String,
    /// `{出力ディレクトリ}/{ファイル名}`
    pub path: PathBuf,
}

fn parent_dir_or_dot(path: &Path) -> &Path {
    // `Path::parent` returns `Some("")` for bare relative file names.
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// 一時ファイル経由でファイルを書き込む
///
/// `write_fn`がエラーを返した場合、`dest`は変更されません。
pub(crate) fn atomic_write<T, E>(
    dest: &Path,
    write_fn: impl FnOnce(&mut File) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<WriteError>,
{
    let dir = parent_dir_or_dot(dest);
    fs::create_dir_all(dir).map_err(WriteError::Io)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(IN_PROGRESS_PREFIX)
        .tempfile_in(dir)
        .map_err(WriteError::Io)?;
    let out = write_fn(tmp.as_file_mut())?;

    tmp.as_file_mut().flush().map_err(WriteError::Io)?;
    tmp.as_file().sync_all().map_err(WriteError::Io)?;

    tmp.persist(dest).map_err(|e| WriteError::Persist {
        path: dest.to_path_buf(),
        source: e.error,
    })?;

    Ok(out)
}
