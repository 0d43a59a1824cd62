//! Codec Module
//!
//! 各交換形式のReader/Writerを`Codec`トレイトで抽象化し、
//! 拡張子からコーデックを引くレジストリを提供するモジュール。

mod csv;
mod json;
mod xlsx;
mod xml;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::api::{normalize_extension, Format};
use crate::builder::ConversionConfig;
use crate::error::ConvertError;
use crate::types::Document;

use self::csv::CsvCodec;
use self::json::JsonCodec;
use self::xlsx::XlsxCodec;
use self::xml::XmlCodec;

/// 1つの交換形式に対するReader/Writerの組
///
/// Readerはバイト列全体を受け取り、Writerは完成した出力バイト列を返します。
/// ファイルへの書き込み（コミット）は呼び出し側が行うため、
/// Writerの失敗で宛先ファイルが中途半端に書き換わることはありません。
///
/// # 実装例
///
/// ```rust
/// use docconv::{Codec, ConvertError, Document};
///
/// struct LinesCodec;
///
/// impl Codec for LinesCodec {
///     fn name(&self) -> &'static str {
///         "lines"
///     }
///
///     fn read(&self, _input: &[u8]) -> Result<Vec<Document>, ConvertError> {
///         Ok(Vec::new())
///     }
///
///     fn write(&self, documents: &[Document]) -> Result<Vec<u8>, ConvertError> {
///         let names: Vec<&str> = documents.iter().map(|d| d.name.as_str()).collect();
///         Ok(names.join("\n").into_bytes())
///     }
/// }
/// ```
pub trait Codec: Send + Sync {
    /// 形式名（エラーメッセージやログで使用）
    fn name(&self) -> &'static str;

    /// バイト列をレコード列に変換
    fn read(&self, input: &[u8]) -> Result<Vec<Document>, ConvertError>;

    /// レコード列をバイト列に変換
    fn write(&self, documents: &[Document]) -> Result<Vec<u8>, ConvertError>;
}

/// 拡張子 → コーデックのレジストリ
///
/// キーは正規化済み（小文字、先頭のドットなし）の拡張子です。
/// 形式の追加は`register()`の呼び出しだけで完結します。
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut extensions: Vec<&String> = self.codecs.keys().collect();
        extensions.sort();
        f.debug_struct("CodecRegistry")
            .field("extensions", &extensions)
            .finish()
    }
}

impl CodecRegistry {
    /// 空のレジストリを生成
    pub fn new() -> Self {
        Self::default()
    }

    /// 組み込みの4形式（json, csv, xml, xlsx）を登録したレジストリを生成
    pub(crate) fn with_builtin(config: &ConversionConfig) -> Result<Self, ConvertError> {
        let mut registry = Self::new();
        for format in Format::ALL {
            registry.register(format.extension(), builtin_codec(format, config)?);
        }
        Ok(registry)
    }

    /// コーデックを登録する（同じ拡張子の既存エントリは置き換えられる）
    pub fn register(&mut self, extension: &str, codec: Arc<dyn Codec>) {
        self.codecs.insert(normalize_extension(extension), codec);
    }

    /// 拡張子からコーデックを取得
    pub fn get(&self, extension: &str) -> Option<Arc<dyn Codec>> {
        self.codecs.get(&normalize_extension(extension)).cloned()
    }

    /// パスの拡張子からコーデックを解決する
    ///
    /// ファイルシステムには一切アクセスしません。
    ///
    /// # 戻り値
    ///
    /// * `Ok(Arc<dyn Codec>)` - 登録済みの拡張子の場合
    /// * `Err(ConvertError::UnsupportedFormat)` - 未登録、または拡張子がない場合
    pub fn resolve(&self, path: &Path) -> Result<Arc<dyn Codec>, ConvertError> {
        let extension = path
            .extension()
            .map(|ext| normalize_extension(&ext.to_string_lossy()))
            .unwrap_or_default();

        self.codecs
            .get(&extension)
            .cloned()
            .ok_or(ConvertError::UnsupportedFormat { extension })
    }

    /// 登録済みの拡張子（ソート済み）
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.codecs.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }
}

/// 組み込み形式のコーデックを設定から生成
pub(crate) fn builtin_codec(
    format: Format,
    config: &ConversionConfig,
) -> Result<Arc<dyn Codec>, ConvertError> {
    let dates = crate::date::DateCodec::new(&config.date_format)?;
    let codec: Arc<dyn Codec> = match format {
        Format::Json => Arc::new(JsonCodec::new(dates, config.pretty_json)),
        Format::Csv => Arc::new(CsvCodec::new(dates)),
        Format::Xml => Arc::new(XmlCodec::new(
            dates,
            config.xml_root.clone(),
            config.xml_record.clone(),
        )),
        Format::Xlsx => Arc::new(XlsxCodec::new(config.sheet_name.clone())),
    };
    Ok(codec)
}

/// テキスト形式の入力が空（長さ0、または空白のみ）かどうか
pub(crate) fn is_blank(input: &[u8]) -> bool {
    input.iter().all(u8::is_ascii_whitespace)
}

/// 先頭のUTF-8 BOMを取り除く
pub(crate) fn strip_bom(input: &[u8]) -> &[u8] {
    input.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(input)
}
