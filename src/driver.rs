//! Conversion Driver Module
//!
//! 読み込み → （任意の変換） → 書き出しを状態機械として管理する。

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::Format;
use crate::builder::ConversionConfig;
use crate::codec::{Codec, CodecRegistry};
use crate::error::ConvertError;
use crate::fsio;
use crate::types::Document;

/// 変換処理の状態
///
/// ```text
/// Idle ──load──▶ Loaded ──convert──▶ ConversionRequested ──▶ Done
///                                            │
///                                            └──▶ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionState {
    /// 初期状態（レコード未読み込み）
    Idle,
    /// レコードを読み込み済み
    Loaded,
    /// 変換を要求され、書き出し中
    ConversionRequested,
    /// 書き出しに成功した
    Done,
    /// 変換に失敗した（`load`または`reset`でのみ抜けられる）
    Failed,
}

impl fmt::Display for ConversionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConversionState::Idle => "Idle",
            ConversionState::Loaded => "Loaded",
            ConversionState::ConversionRequested => "ConversionRequested",
            ConversionState::Done => "Done",
            ConversionState::Failed => "Failed",
        };
        f.write_str(label)
    }
}

/// 変換処理のファサード
///
/// `ConverterBuilder`を使用して構築された設定に基づき、ファイル間の変換を実行します。
/// 読み込んだレコード列は変換時に一度だけ消費されます。
///
/// # 使用例
///
/// ```rust,no_run
/// use docconv::{ConversionState, ConverterBuilder};
///
/// # fn main() -> Result<(), docconv::ConvertError> {
/// let mut converter = ConverterBuilder::new().build()?;
/// converter.load("documents.csv")?;
/// assert_eq!(converter.state(), ConversionState::Loaded);
///
/// let written = converter.convert("documents.json")?;
/// println!("{} records written", written);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Converter {
    /// 変換設定
    config: ConversionConfig,

    /// 拡張子 → コーデック
    registry: CodecRegistry,

    /// 現在の状態
    state: ConversionState,

    /// 読み込み済みのレコード列
    documents: Option<Vec<Document>>,

    /// 読み込み元の形式名
    source_format: Option<&'static str>,
}

impl Converter {
    pub(crate) fn new(config: ConversionConfig, registry: CodecRegistry) -> Self {
        Self {
            config,
            registry,
            state: ConversionState::Idle,
            documents: None,
            source_format: None,
        }
    }

    /// 現在の状態
    pub fn state(&self) -> ConversionState {
        self.state
    }

    /// 読み込み済みのレコード列（未読み込み・消費済みの場合は空）
    pub fn documents(&self) -> &[Document] {
        self.documents.as_deref().unwrap_or_default()
    }

    /// 読み込み元の形式名（例: `"csv"`）
    pub fn source_format(&self) -> Option<&'static str> {
        self.source_format
    }

    /// 使用中のコーデックレジストリ
    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    /// `Idle`に戻し、保持しているレコードを破棄する
    pub fn reset(&mut self) {
        self.state = ConversionState::Idle;
        self.documents = None;
        self.source_format = None;
    }

    /// ソースファイルを読み込み、`Loaded`状態に遷移する
    ///
    /// どの状態から呼び出しても、まず`Idle`に戻ります。
    /// 失敗した場合は`Idle`のまま、Readerのエラーをそのまま返します。
    ///
    /// # 戻り値
    ///
    /// * `Ok(usize)` - 読み込んだレコード数
    /// * `Err(ConvertError::UnsupportedFormat)` - 拡張子が未登録の場合
    /// * `Err(ConvertError)` - 読み込み・解析に失敗した場合
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<usize, ConvertError> {
        let path = path.as_ref();
        self.reset();

        let codec = self.registry.resolve(path)?;
        debug!("Resolved {} codec for {}", codec.name(), path.display());

        let bytes = fsio::read_source(path, self.config.max_input_size)?;
        let documents = codec.read(&bytes)?;
        let count = documents.len();

        info!(
            "Loaded {} documents from {} ({})",
            count,
            path.display(),
            codec.name()
        );

        self.documents = Some(documents);
        self.source_format = Some(codec.name());
        self.state = ConversionState::Loaded;
        Ok(count)
    }

    /// 読み込み済みのレコード列を宛先ファイルに書き出す
    ///
    /// # 戻り値
    ///
    /// * `Ok(usize)` - 書き出したレコード数
    /// * `Err(ConvertError::NoData)` - `Loaded`状態でない場合（状態は変化しない）、
    ///   または読み込み済み・変換後のレコードが0件の場合（`Failed`に遷移）
    /// * `Err(ConvertError)` - 宛先の形式が未登録、または書き出しに失敗した場合（`Failed`に遷移）
    pub fn convert(&mut self, destination: impl AsRef<Path>) -> Result<usize, ConvertError> {
        self.convert_with(destination, |documents| documents)
    }

    /// レコード列に変換関数を適用してから書き出す
    ///
    /// 変換関数はレコード列の所有権を受け取り、新しいレコード列を返します。
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use docconv::ConverterBuilder;
    ///
    /// # fn main() -> Result<(), docconv::ConvertError> {
    /// let mut converter = ConverterBuilder::new().build()?;
    /// converter.load("documents.xml")?;
    /// converter.convert_with("sorted.csv", |mut documents| {
    ///     documents.sort_by_key(|d| d.deadline);
    ///     documents
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn convert_with<F>(
        &mut self,
        destination: impl AsRef<Path>,
        transform: F,
    ) -> Result<usize, ConvertError>
    where
        F: FnOnce(Vec<Document>) -> Vec<Document>,
    {
        let destination = destination.as_ref();
        if self.state != ConversionState::Loaded {
            debug!("Conversion requested in state {}", self.state);
            return Err(ConvertError::NoData);
        }
        self.state = ConversionState::ConversionRequested;

        let result = self.run_conversion(destination, transform);
        match &result {
            Ok(count) => {
                info!("Wrote {} documents to {}", count, destination.display());
                self.state = ConversionState::Done;
            }
            Err(e) => {
                warn!("Conversion to {} failed: {}", destination.display(), e);
                self.documents = None;
                self.state = ConversionState::Failed;
            }
        }
        result
    }

    fn run_conversion<F>(&mut self, destination: &Path, transform: F) -> Result<usize, ConvertError>
    where
        F: FnOnce(Vec<Document>) -> Vec<Document>,
    {
        let codec = self.registry.resolve(destination)?;
        debug!(
            "Resolved {} codec for {}",
            codec.name(),
            destination.display()
        );

        let documents = self.documents.take().unwrap_or_default();
        if documents.is_empty() {
            return Err(ConvertError::NoData);
        }

        let documents = transform(documents);
        if documents.is_empty() {
            debug!("Transform left no documents for {}", destination.display());
            return Err(ConvertError::NoData);
        }
        let bytes = codec.write(&documents)?;
        fsio::commit(destination, &bytes)?;
        Ok(documents.len())
    }

    /// ファイルを読み込む（状態は変化しない）
    pub fn read(&self, path: impl AsRef<Path>) -> Result<Vec<Document>, ConvertError> {
        let path = path.as_ref();
        let codec = self.registry.resolve(path)?;
        let bytes = fsio::read_source(path, self.config.max_input_size)?;
        codec.read(&bytes)
    }

    /// レコード列をファイルに書き出す（状態は変化しない）
    ///
    /// 空のレコード列も書き出せます（各形式の空表現になります）。
    pub fn write(&self, documents: &[Document], path: impl AsRef<Path>) -> Result<(), ConvertError> {
        let path = path.as_ref();
        let codec = self.registry.resolve(path)?;
        let bytes = codec.write(documents)?;
        fsio::commit(path, &bytes)
    }

    /// バイト列を指定形式として解析する
    pub fn read_bytes(&self, format: Format, bytes: &[u8]) -> Result<Vec<Document>, ConvertError> {
        let codec = self.codec_for(format)?;
        if bytes.len() as u64 > self.config.max_input_size {
            return Err(ConvertError::InputTooLarge {
                size: bytes.len() as u64,
                limit: self.config.max_input_size,
            });
        }
        codec.read(bytes)
    }

    /// レコード列を指定形式のバイト列に変換する
    pub fn write_bytes(&self, format: Format, documents: &[Document]) -> Result<Vec<u8>, ConvertError> {
        self.codec_for(format)?.write(documents)
    }

    fn codec_for(&self, format: Format) -> Result<Arc<dyn Codec>, ConvertError> {
        self.registry
            .get(format.extension())
            .ok_or_else(|| ConvertError::UnsupportedFormat {
                extension: format.extension().to_string(),
            })
    }
}
