//! Retention Module
//!
//! 出力ディレクトリ内のファイル数を上限以下に保つ。
//! 更新日時の新しい順に`max_files`個を残し、それより古いファイルを削除します。
//!
//! 削除の失敗は記録してログに出力し、残りのファイルの削除を続けます。
//! 呼び出し側にエラーとして返すことはありません。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::{info, warn};

use crate::output::IN_PROGRESS_PREFIX;

/// 1回の削除処理の結果
#[derive(Debug, Default)]
pub struct RetentionReport {
    /// 残したファイル（新しい順）
    pub kept: Vec<PathBuf>,
    /// 削除したファイル
    pub removed: Vec<PathBuf>,
    /// 削除（またはディレクトリの列挙）に失敗したパスとエラー
    pub failures: Vec<(PathBuf, io::Error)>,
}

impl RetentionReport {
    /// 失敗がなかったかどうか
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// ディレクトリ直下の通常ファイルを新しい順に列挙する
///
/// 書き込み中の一時ファイルは対象外です。
fn list_files_newest_first(directory: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();

    for entry in fs::read_dir(directory)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => continue,
        };
        if entry
            .file_name()
            .to_string_lossy()
            .starts_with(IN_PROGRESS_PREFIX)
        {
            continue;
        }
        // 列挙中に削除されたファイルは無視する
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(_) => continue,
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((modified, entry.path()));
    }

    // 新しい順。更新日時が同じ場合はファイル名の降順
    files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

/// ファイル数の上限を適用する
///
/// # 引数
///
/// * `directory` - 対象ディレクトリ（サブディレクトリは対象外）
/// * `max_files` - 残すファイルの最大数
///
/// # 戻り値
///
/// 残したファイル・削除したファイル・失敗の一覧。
/// ディレクトリが存在しない場合は何もしません。
///
/// # 使用例
///
/// ```rust,no_run
/// use sheet2csv::enforce_limit;
///
/// let report = enforce_limit("outputs", 20);
/// for (path, err) in &report.failures {
///     eprintln!("failed to delete {}: {}", path.display(), err);
/// }
/// ```
pub fn enforce_limit<P: AsRef<Path>>(directory: P, max_files: usize) -> RetentionReport {
    enforce_limit_with(directory, max_files, |path| fs::remove_file(path))
}

/// 削除処理を指定してファイル数の上限を適用する
///
/// `remove`は削除対象のファイルごとに1回呼ばれます。
/// `NotFound`は削除済みとして扱い、それ以外のエラーは`failures`に記録して次のファイルに進みます。
pub fn enforce_limit_with<P, F>(directory: P, max_files: usize, mut remove: F) -> RetentionReport
where
    P: AsRef<Path>,
    F: FnMut(&Path) -> io::Result<()>,
{
    let directory = directory.as_ref();
    let mut report = RetentionReport::default();

    let files = match list_files_newest_first(directory) {
        Ok(files) => files,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return report,
        Err(e) => {
            warn!("cannot list {}: {}", directory.display(), e);
            report.failures.push((directory.to_path_buf(), e));
            return report;
        }
    };

    let mut files = files.into_iter();
    report.kept.extend(files.by_ref().take(max_files));

    for path in files {
        match remove(&path) {
            Ok(()) => {
                info!("evicted {}", path.display());
                report.removed.push(path);
            }
            // 他の処理が先に削除した
            Err(e) if e.kind() == io::ErrorKind::NotFound => report.removed.push(path),
            Err(e) => {
                warn!("error deleting {}: {}", path.display(), e);
                report.failures.push((path, e));
            }
        }
    }

    report
}
