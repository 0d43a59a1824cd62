//! Builder Module
//!
//! Fluent Builder APIを提供し、`Converter`インスタンスを段階的に構築する。

use std::fmt;
use std::sync::Arc;

use crate::api::{normalize_extension, DateFormat};
use crate::codec::{Codec, CodecRegistry};
use crate::driver::Converter;
use crate::error::ConvertError;
use crate::fsio::DEFAULT_MAX_INPUT_SIZE;

/// 既定のワークシート名
pub(crate) const DEFAULT_SHEET_NAME: &str = "Documents";

/// 既定のXMLルート要素名
pub(crate) const DEFAULT_XML_ROOT: &str = "ArrayOfDocument";

/// 既定のXMLレコード要素名
pub(crate) const DEFAULT_XML_RECORD: &str = "Document";

/// シート名に使用できない文字
const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// シート名の最大長（文字数）
const MAX_SHEET_NAME_LEN: usize = 31;

/// 変換処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ConversionConfig {
    /// テキスト形式の日付表記
    pub date_format: DateFormat,

    /// XLSX出力のワークシート名
    pub sheet_name: String,

    /// XML出力のルート要素名
    pub xml_root: String,

    /// XML出力のレコード要素名
    pub xml_record: String,

    /// JSON出力を整形するか
    pub pretty_json: bool,

    /// 入力ファイルの最大サイズ（バイト）
    pub max_input_size: u64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            date_format: DateFormat::Iso8601,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            xml_root: DEFAULT_XML_ROOT.to_string(),
            xml_record: DEFAULT_XML_RECORD.to_string(),
            pretty_json: true,
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `Converter`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use docconv::{ConverterBuilder, DateFormat};
///
/// # fn main() -> Result<(), docconv::ConvertError> {
/// let mut converter = ConverterBuilder::new()
///     .with_date_format(DateFormat::Custom("%d/%m/%Y".to_string()))
///     .with_sheet_name("Tasks")
///     .build()?;
/// converter.load("tasks.csv")?;
/// converter.convert("tasks.xlsx")?;
/// # Ok(())
/// # }
/// ```
pub struct ConverterBuilder {
    /// 内部設定（構築中）
    config: ConversionConfig,

    /// 追加・置換するコーデック（登録順）
    codecs: Vec<(String, Arc<dyn Codec>)>,
}

impl fmt::Debug for ConverterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extensions: Vec<&str> = self.codecs.iter().map(|(ext, _)| ext.as_str()).collect();
        f.debug_struct("ConverterBuilder")
            .field("config", &self.config)
            .field("codecs", &extensions)
            .finish()
    }
}

impl Default for ConverterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConverterBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 日付形式: ISO 8601 (YYYY-MM-DD)
    /// - ワークシート名: `Documents`
    /// - XML要素名: `ArrayOfDocument` / `Document`
    /// - JSON出力: 整形あり
    /// - 入力サイズ上限: 2GB
    pub fn new() -> Self {
        Self {
            config: ConversionConfig::default(),
            codecs: Vec::new(),
        }
    }

    /// テキスト形式（CSV/XML/JSON）の日付表記を指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use docconv::{ConverterBuilder, DateFormat};
    ///
    /// let builder = ConverterBuilder::new()
    ///     .with_date_format(DateFormat::Custom("%Y年%m月%d日".to_string()));
    /// ```
    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.config.date_format = format;
        self
    }

    /// XLSX出力のワークシート名を指定する
    ///
    /// # 制約
    ///
    /// * 1〜31文字
    /// * `[ ] : * ? / \` を含まない
    /// * 先頭・末尾がアポストロフィでない
    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.config.sheet_name = name.into();
        self
    }

    /// XML出力のルート要素名とレコード要素名を指定する
    ///
    /// 読み込み時は要素名を検査しないため、この設定は出力にのみ影響します。
    pub fn with_xml_names(mut self, root: impl Into<String>, record: impl Into<String>) -> Self {
        self.config.xml_root = root.into();
        self.config.xml_record = record.into();
        self
    }

    /// JSON出力を整形するかを指定する
    pub fn with_pretty_json(mut self, pretty: bool) -> Self {
        self.config.pretty_json = pretty;
        self
    }

    /// 入力ファイルの最大サイズ（バイト）を指定する
    pub fn with_max_input_size(mut self, bytes: u64) -> Self {
        self.config.max_input_size = bytes;
        self
    }

    /// 拡張子に対するコーデックを追加または置換する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use docconv::{Codec, ConverterBuilder, ConvertError, Document};
    ///
    /// struct Names;
    ///
    /// impl Codec for Names {
    ///     fn name(&self) -> &'static str {
    ///         "names"
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
    ///
    /// let builder = ConverterBuilder::new().with_codec("txt", Arc::new(Names));
    /// ```
    pub fn with_codec(mut self, extension: impl Into<String>, codec: Arc<dyn Codec>) -> Self {
        self.codecs.push((extension.into(), codec));
        self
    }

    /// 設定を検証し、`Converter`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Converter)`: 設定が有効な場合、Converterインスタンス
    /// * `Err(ConvertError::Config)`: 設定が無効な場合
    ///
    /// # 発生し得るエラー
    ///
    /// * カスタム日付形式が不正、または出力を解析し直せない
    /// * ワークシート名が制約に違反している
    /// * XML要素名が不正、またはルートとレコードが同名
    /// * 入力サイズ上限が0
    /// * 追加コーデックの拡張子が空
    pub fn build(self) -> Result<Converter, ConvertError> {
        // 1. ワークシート名の検証
        validate_sheet_name(&self.config.sheet_name)?;

        // 2. XML要素名の検証
        validate_xml_name(&self.config.xml_root)?;
        validate_xml_name(&self.config.xml_record)?;
        if self.config.xml_root == self.config.xml_record {
            return Err(ConvertError::Config(format!(
                "XML root and record element names must differ: '{}'",
                self.config.xml_root
            )));
        }

        // 3. 入力サイズ上限の検証
        if self.config.max_input_size == 0 {
            return Err(ConvertError::Config(
                "Maximum input size must be greater than zero".to_string(),
            ));
        }

        // 4. レジストリの構築（日付形式の検証を含む）
        let mut registry = CodecRegistry::with_builtin(&self.config)?;
        for (extension, codec) in self.codecs {
            if normalize_extension(&extension).is_empty() {
                return Err(ConvertError::Config(
                    "Codec extension must not be empty".to_string(),
                ));
            }
            registry.register(&extension, codec);
        }

        // 5. Converterインスタンス生成
        Ok(Converter::new(self.config, registry))
    }
}

fn validate_sheet_name(name: &str) -> Result<(), ConvertError> {
    let len = name.chars().count();
    if len == 0 || len > MAX_SHEET_NAME_LEN {
        return Err(ConvertError::Config(format!(
            "Sheet name must be 1 to {} characters long: '{}'",
            MAX_SHEET_NAME_LEN, name
        )));
    }
    if let Some(c) = name.chars().find(|c| INVALID_SHEET_CHARS.contains(c)) {
        return Err(ConvertError::Config(format!(
            "Sheet name contains invalid character '{}': '{}'",
            c, name
        )));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(ConvertError::Config(format!(
            "Sheet name must not start or end with an apostrophe: '{}'",
            name
        )));
    }
    Ok(())
}

/// XML要素名の検証（名前空間接頭辞なし）
fn validate_xml_name(name: &str) -> Result<(), ConvertError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ConvertError::Config(format!(
            "Invalid XML element name: '{}'",
            name
        )))
    }
}
