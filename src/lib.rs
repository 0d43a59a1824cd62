//! docconv - Convert document records between JSON, CSV, XML and XLSX
//!
//! This crate reads a list of `Document` records (name, start date, deadline)
//! from one interchange format and writes it to another. The format is chosen
//! by file extension, and dates are kept as calendar dates so that native
//! spreadsheet date cells and textual dates convert losslessly.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Format is inferred from the extensions
//!     let written = docconv::convert_file("documents.csv", "documents.xlsx")?;
//!     println!("{} records written", written);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Step-by-step Conversion
//!
//! ```rust,no_run
//! use docconv::{ConversionState, ConverterBuilder, DateFormat};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut converter = ConverterBuilder::new()
//!         .with_date_format(DateFormat::Custom("%d/%m/%Y".to_string()))
//!         .with_sheet_name("Tasks")
//!         .build()?;
//!
//!     converter.load("tasks.xml")?;
//!     println!("loaded {} records", converter.documents().len());
//!
//!     converter.convert("tasks.xlsx")?;
//!     assert_eq!(converter.state(), ConversionState::Done);
//!
//!     Ok(())
//! }
//! ```
//!
//! # In-memory Conversion
//!
//! ```rust
//! use docconv::{ConverterBuilder, Format};
//!
//! # fn main() -> Result<(), docconv::ConvertError> {
//! let converter = ConverterBuilder::new().build()?;
//! let csv = b"Name,StartDate,DeadLine\nAlpha,2024-01-01,2024-02-01\n";
//!
//! let documents = converter.read_bytes(Format::Csv, csv)?;
//! let json = converter.write_bytes(Format::Json, &documents)?;
//! assert!(String::from_utf8_lossy(&json).contains("\"startDate\": \"2024-01-01\""));
//! # Ok(())
//! # }
//! ```

mod api;
mod builder;
mod codec;
mod date;
mod driver;
mod error;
mod fsio;
mod types;

use std::path::Path;

// 公開API
pub use api::{DateFormat, Format};
pub use builder::ConverterBuilder;
pub use codec::{Codec, CodecRegistry};
pub use driver::{ConversionState, Converter};
pub use error::{ConvertError, ErrorCategory};
pub use types::{Document, Field};

/// ファイルを読み込み、レコード列を返す（形式は拡張子から判定）
///
/// # 使用例
///
/// ```rust,no_run
/// let documents = docconv::read_documents("documents.json")?;
/// # Ok::<(), docconv::ConvertError>(())
/// ```
pub fn read_documents(path: impl AsRef<Path>) -> Result<Vec<Document>, ConvertError> {
    ConverterBuilder::new().build()?.read(path)
}

/// レコード列をファイルに書き出す（形式は拡張子から判定）
pub fn write_documents(documents: &[Document], path: impl AsRef<Path>) -> Result<(), ConvertError> {
    ConverterBuilder::new().build()?.write(documents, path)
}

/// ソースファイルを読み込み、宛先ファイルに変換して書き出す
///
/// # 戻り値
///
/// * `Ok(usize)` - 書き出したレコード数
/// * `Err(ConvertError::NoData)` - ソースにレコードが含まれない場合
/// * `Err(ConvertError)` - その他の読み込み・書き出しエラー
pub fn convert_file(
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
) -> Result<usize, ConvertError> {
    let mut converter = ConverterBuilder::new().build()?;
    converter.load(source)?;
    converter.convert(destination)
}
