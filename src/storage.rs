//! Storage Module
//!
//! アップロード用ディレクトリと出力用ディレクトリへのハンドル。
//! プロセス全体で共有するグローバル状態は持たず、各パイプライン呼び出しに明示的に渡します。

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ReadError, SheetToCsvError, WriteError};
use crate::output::ExportedFile;
use crate::security::validate_member_name;

/// 入出力ディレクトリの組
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl Workspace {
    /// ディレクトリの組を指定してハンドルを作る（ディレクトリは作成しない）
    pub fn new<U: Into<PathBuf>, O: Into<PathBuf>>(upload_dir: U, output_dir: O) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// `root/uploads`と`root/outputs`を使うハンドルを作り、ディレクトリを作成する
    pub fn create_in<P: AsRef<Path>>(root: P) -> Result<Self, WriteError> {
        let root = root.as_ref();
        let workspace = Self::new(root.join("uploads"), root.join("outputs"));
        workspace.ensure_dirs()?;
        Ok(workspace)
    }

    /// 両方のディレクトリを作成する（既に存在する場合は何もしない）
    pub fn ensure_dirs(&self) -> Result<(), WriteError> {
        fs::create_dir_all(&self.upload_dir)?;
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 出力ディレクトリ内のファイルを表す`ExportedFile`を作る
    pub(crate) fn output_file(&self, filename: String) -> ExportedFile {
        let path = self.output_dir.join(&filename);
        ExportedFile { filename, path }
    }

    /// アップロード済みの一時ファイルのパスを解決する
    ///
    /// # 戻り値
    ///
    /// * `Err(SheetToCsvError::Validation)` - ファイル名にパス区切りなどが含まれる場合
    /// * `Err(SheetToCsvError::Read)` - ファイルが存在しない場合
    pub fn resolve_upload(&self, temp_file: &str) -> Result<PathBuf, SheetToCsvError> {
        validate_member_name(temp_file).map_err(SheetToCsvError::Validation)?;
        let path = self.upload_dir.join(temp_file);
        if !path.is_file() {
            return Err(ReadError::NotFound { path }.into());
        }
        Ok(path)
    }

    /// 出力済みファイルを探す（ダウンロード用）
    ///
    /// 保持数の制御で既に削除されている可能性があるため、呼び出し側は
    /// `ReadError::NotFound`を通常の結果として扱ってください。
    pub fn locate_output(&self, filename: &str) -> Result<ExportedFile, SheetToCsvError> {
        validate_member_name(filename).map_err(SheetToCsvError::Validation)?;
        let file = self.output_file(filename.to_string());
        if !file.path.is_file() {
            return Err(ReadError::NotFound { path: file.path }.into());
        }
        Ok(file)
    }
}
