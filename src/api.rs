//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use std::fmt;

/// ワークブックのデコード戦略
///
/// シート一覧の取得とシートの読み込みでは、ここに列挙した戦略を
/// 指定された順番に試行し、最初に成功したものを採用します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Decoder {
    /// Office Open XML形式（.xlsx / .xlsm）
    Xlsx,

    /// 旧バイナリ形式（.xls、BIFF8）
    Xls,

    /// バイナリブック形式（.xlsb）
    Xlsb,
}

impl Decoder {
    /// デフォルトの試行順序（新形式 → 旧形式 → バイナリブック）
    pub const DEFAULT_ORDER: [Decoder; 3] = [Decoder::Xlsx, Decoder::Xls, Decoder::Xlsb];
}

impl fmt::Display for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Decoder::Xlsx => "xlsx",
            Decoder::Xls => "xls",
            Decoder::Xlsb => "xlsb",
        };
        f.write_str(name)
    }
}

/// ZIPエクスポート時のシート選択方式
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SheetSelection {
    /// ワークブック内のすべてのシート（デフォルト）
    #[default]
    All,

    /// 名前で指定したシート（指定順に処理）
    ///
    /// 例: `SheetSelection::Names(vec!["Jan".to_string(), "Feb".to_string()])`
    Names(Vec<String>),
}
