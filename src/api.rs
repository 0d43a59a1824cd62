//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

/// テキスト形式（CSV/XML/JSON）で使用する日付の表記
///
/// XLSXの日付はネイティブの日付セルとして扱われるため、この設定の影響を受けません。
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DateFormat {
    /// ISO 8601形式（YYYY-MM-DD）
    ///
    /// 例: `2025-11-20`
    Iso8601,

    /// カスタム形式（chrono互換フォーマット文字列）
    ///
    /// 出力はこの形式で行い、読み込みではこの形式を最初に試したうえで
    /// ISO 8601系の表記にフォールバックします。
    ///
    /// # フォーマット指定子（主要なもの）
    ///
    /// - `%Y`: 4桁の年（例: 2025）
    /// - `%m`: 2桁の月（01-12）
    /// - `%d`: 2桁の日（01-31）
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use docconv::{ConverterBuilder, DateFormat};
    ///
    /// # fn main() -> Result<(), docconv::ConvertError> {
    /// let converter = ConverterBuilder::new()
    ///     .with_date_format(DateFormat::Custom("%d.%m.%Y".to_string()))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    Custom(String),
}

/// 組み込みの交換形式
///
/// 形式の選択は拡張子の一致のみで行います（大文字小文字は区別しません）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Format {
    /// JSON配列（`.json`）
    Json,

    /// カンマ区切り（`.csv`）
    Csv,

    /// XML（`.xml`）
    Xml,

    /// スプレッドシート（`.xlsx`）
    Xlsx,
}

impl Format {
    /// すべての組み込み形式
    pub const ALL: [Format; 4] = [Format::Json, Format::Csv, Format::Xml, Format::Xlsx];

    /// ドットなしの拡張子
    pub fn extension(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Csv => "csv",
            Format::Xml => "xml",
            Format::Xlsx => "xlsx",
        }
    }

    /// 拡張子から形式を判定（先頭のドットと大文字小文字は無視）
    pub fn from_extension(extension: &str) -> Option<Format> {
        let normalized = normalize_extension(extension);
        Format::ALL
            .into_iter()
            .find(|format| format.extension() == normalized)
    }
}

/// 拡張子を正規化する（先頭のドットを除去し、小文字化）
pub(crate) fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_lowercase()
}
