//! Security Module
//!
//! 入力サイズの制限と、ZIPアーカイブのメンバー名の検証を提供します。

/// 入力ファイルの最大サイズのデフォルト値（50MB）
pub(crate) const DEFAULT_MAX_INPUT_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// セキュリティ設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SecurityConfig {
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 50MB (52_428_800 bytes)
    pub max_input_file_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_input_file_size: DEFAULT_MAX_INPUT_FILE_SIZE,
        }
    }
}

impl SecurityConfig {
    /// 入力サイズが上限以内かを検証
    pub fn check_input_size(&self, size: u64) -> Result<(), String> {
        if size > self.max_input_file_size {
            return Err(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                size, self.max_input_file_size
            ));
        }
        Ok(())
    }
}

/// ZIPメンバー名の検証
///
/// 出力するアーカイブはディレクトリを含まないフラットな構造のため、
/// パス区切りや親ディレクトリ参照を含む名前を拒否します。
///
/// # 戻り値
///
/// * `Ok(())` - 名前が安全な場合
/// * `Err(String)` - 名前が空、絶対パス、親ディレクトリ参照、区切り文字を含む場合
pub(crate) fn validate_member_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Empty member name is not allowed".to_string());
    }

    if name.starts_with('/') || name.starts_with("C:\\") || name.starts_with("c:\\") {
        return Err(format!("Absolute path is not allowed: {}", name));
    }

    if name == ".." || name.contains("../") || name.contains("..\\") {
        return Err(format!("Path traversal detected: {}", name));
    }

    if name == "." {
        return Err(format!("Invalid member name: {}", name));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(format!("Directory entries are not allowed: {}", name));
    }

    Ok(())
}

/// クライアントが送ってきたファイル名から最後の要素だけを取り出す
///
/// クライアントのOSに関係なく`/`・`\`・ドライブ区切りの`:`で分割します。
/// 取り出した名前が空、`.`、`..`の場合は`None`を返します。
pub(crate) fn client_file_name(name: &str) -> Option<&str> {
    let last = name.rsplit(['/', '\\', ':']).next()?.trim();
    if last.is_empty() || last == "." || last == ".." {
        return None;
    }
    Some(last)
}
