//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use std::fmt;
use thiserror::Error;

/// docconvクレート全体で使用するエラー型
///
/// 読み込み・解析・書き出しの各段階で発生するすべてのエラーを統一的に扱います。
/// エラーは発生箇所（各Reader/Writer、ファイル境界）で検出され、
/// `Converter`はそれを変更せずに呼び出し元へ返します。
///
/// # エラーの種類
///
/// - `UnsupportedFormat`: 登録されていない拡張子
/// - `MalformedInput`: 入力バイト列が形式として解析できない、またはスキーマ違反
/// - `EmptyDocument`: ワークシートが存在しない、またはディメンションがない
/// - `NoData`: 読み込み済みレコードが0件の状態で変換を要求した
/// - `Io`: ファイルのオープン・読み込み・書き込み・権限エラー
///
/// # 使用例
///
/// ```rust,no_run
/// use docconv::{read_documents, ConvertError};
///
/// match read_documents("input.txt") {
///     Err(ConvertError::UnsupportedFormat { extension }) => {
///         println!("未対応の拡張子: {}", extension);
///     }
///     Err(e) => println!("{}", e),
///     Ok(documents) => println!("{} records", documents.len()),
/// }
/// ```
#[derive(Error, Debug)]
pub enum ConvertError {
    /// 拡張子に対応するコーデックが登録されていない
    ///
    /// 拡張子がないパスの場合、`extension`は空文字列になります。
    #[error("Unsupported file format: '{extension}'")]
    UnsupportedFormat {
        /// 正規化（小文字化）済みの拡張子（ドットなし）
        extension: String,
    },

    /// 入力が指定形式として解析できない、または期待するスキーマに一致しない
    #[error("Malformed {format} input: {message}")]
    MalformedInput {
        /// 形式名（例: "json"）
        format: &'static str,
        /// 詳細メッセージ
        message: String,
    },

    /// 構造的に空のソース（ワークシートなし、ディメンションなし）
    #[error("Empty document: {0}")]
    EmptyDocument(String),

    /// 変換対象のレコードが存在しない
    #[error("No data to convert")]
    NoData,

    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Writerが値を出力形式で表現できない
    ///
    /// 例: XLSXの日付範囲（1900年〜9999年）外の日付
    #[error("Failed to encode {format} output: {message}")]
    Encode {
        /// 形式名
        format: &'static str,
        /// 詳細メッセージ
        message: String,
    },

    /// 設定の検証に失敗したエラー
    ///
    /// `ConverterBuilder::build()`時に設定を検証し、無効な設定が検出された
    /// 場合に発生します。
    #[error("Configuration error: {0}")]
    Config(String),

    /// 入力ファイルが設定された上限サイズを超えている
    #[error("Input size {size} bytes exceeds the limit of {limit} bytes")]
    InputTooLarge {
        /// 実際のサイズ（バイト）
        size: u64,
        /// 上限（バイト）
        limit: u64,
    },
}

impl ConvertError {
    pub(crate) fn malformed(format: &'static str, message: impl Into<String>) -> Self {
        ConvertError::MalformedInput {
            format,
            message: message.into(),
        }
    }

    pub(crate) fn encode(format: &'static str, message: impl Into<String>) -> Self {
        ConvertError::Encode {
            format,
            message: message.into(),
        }
    }

    /// シェル（GUI/CLI）に表示するためのエラー分類を返す
    pub fn category(&self) -> ErrorCategory {
        match self {
            ConvertError::UnsupportedFormat { .. } => ErrorCategory::UnsupportedFormat,
            ConvertError::MalformedInput { .. } | ConvertError::InputTooLarge { .. } => {
                ErrorCategory::MalformedInput
            }
            ConvertError::EmptyDocument(_) => ErrorCategory::EmptyDocument,
            ConvertError::NoData => ErrorCategory::NoData,
            ConvertError::Io(_) => ErrorCategory::IoFailure,
            ConvertError::Encode { .. } => ErrorCategory::Encode,
            ConvertError::Config(_) => ErrorCategory::Config,
        }
    }
}

/// ユーザー向けのエラー分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCategory {
    UnsupportedFormat,
    MalformedInput,
    EmptyDocument,
    NoData,
    IoFailure,
    Encode,
    Config,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorCategory::UnsupportedFormat => "UnsupportedFormat",
            ErrorCategory::MalformedInput => "MalformedInput",
            ErrorCategory::EmptyDocument => "EmptyDocument",
            ErrorCategory::NoData => "NoData",
            ErrorCategory::IoFailure => "IOFailure",
            ErrorCategory::Encode => "Encode",
            ErrorCategory::Config => "Config",
        };
        f.write_str(label)
    }
}
