//! CSV Codec
//!
//! ヘッダー行 + データ行のカンマ区切り形式を扱う。
//! 列の対応はヘッダー名で決定し、位置には依存しない。

use ::csv::{ByteRecord, ReaderBuilder, Trim, WriterBuilder};

use super::{is_blank, strip_bom, Codec};
use crate::date::DateCodec;
use crate::error::ConvertError;
use crate::types::{Document, Field};

const FORMAT: &str = "csv";

/// CSV形式のコーデック
#[derive(Debug)]
pub(crate) struct CsvCodec {
    dates: DateCodec,
}

impl CsvCodec {
    pub fn new(dates: DateCodec) -> Self {
        Self { dates }
    }

    /// ヘッダー行から各フィールドの列位置を決定
    fn column_positions(&self, headers: &ByteRecord) -> Result<[usize; 3], ConvertError> {
        let mut positions: [Option<usize>; 3] = [None; 3];

        for (column, raw) in headers.iter().enumerate() {
            let label = std::str::from_utf8(raw).map_err(|_| {
                ConvertError::malformed(
                    FORMAT,
                    format!("header column {} is not valid UTF-8", column + 1),
                )
            })?;
            let Some(field) = Field::from_label(label) else {
                continue;
            };

            let slot = &mut positions[field.index()];
            if slot.is_some() {
                return Err(ConvertError::malformed(
                    FORMAT,
                    format!("duplicate column '{}' in header", field.label()),
                ));
            }
            *slot = Some(column);
        }

        let mut resolved = [0usize; 3];
        for field in Field::ALL {
            resolved[field.index()] = positions[field.index()].ok_or_else(|| {
                ConvertError::malformed(
                    FORMAT,
                    format!("header is missing required column '{}'", field.label()),
                )
            })?;
        }
        Ok(resolved)
    }
}

impl Codec for CsvCodec {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn read(&self, input: &[u8]) -> Result<Vec<Document>, ConvertError> {
        let input = strip_bom(input);
        if is_blank(input) {
            return Ok(Vec::new());
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(Trim::None)
            .from_reader(input);

        let headers = reader
            .byte_headers()
            .map_err(|e| ConvertError::malformed(FORMAT, format!("failed to read header: {}", e)))?
            .clone();
        let positions = self.column_positions(&headers)?;

        let mut documents = Vec::new();
        let mut record = ByteRecord::new();
        loop {
            // 列数の不一致はcsvクレートがUnequalLengthsとして報告する
            let has_record = reader
                .read_byte_record(&mut record)
                .map_err(|e| ConvertError::malformed(FORMAT, e.to_string()))?;
            if !has_record {
                break;
            }

            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let cell = |field: Field| cell_text(&record, positions[field.index()], field, line);

            let name = cell(Field::Name)?.to_string();
            let start_date = self.dates.parse_field(
                cell(Field::StartDate)?,
                FORMAT,
                &format!("line {}, column 'StartDate'", line),
            )?;
            let deadline = self.dates.parse_field(
                cell(Field::DeadLine)?,
                FORMAT,
                &format!("line {}, column 'DeadLine'", line),
            )?;

            documents.push(Document {
                name,
                start_date,
                deadline,
            });
        }

        Ok(documents)
    }

    fn write(&self, documents: &[Document]) -> Result<Vec<u8>, ConvertError> {
        let mut writer = WriterBuilder::new().from_writer(Vec::new());

        writer
            .write_record(Field::ALL.map(Field::label))
            .map_err(|e| ConvertError::encode(FORMAT, format!("failed to write header: {}", e)))?;

        for doc in documents {
            let start = self.dates.format(doc.start_date);
            let deadline = self.dates.format(doc.deadline);
            writer
                .write_record([doc.name.as_str(), start.as_str(), deadline.as_str()])
                .map_err(|e| ConvertError::encode(FORMAT, format!("failed to write record: {}", e)))?;
        }

        writer
            .into_inner()
            .map_err(|e| ConvertError::encode(FORMAT, format!("failed to flush CSV writer: {}", e)))
    }
}

/// 指定列のセルをUTF-8文字列として取り出す
fn cell_text(
    record: &ByteRecord,
    position: usize,
    field: Field,
    line: u64,
) -> Result<&str, ConvertError> {
    let raw = record.get(position).unwrap_or_default();
    std::str::from_utf8(raw).map_err(|_| {
        ConvertError::malformed(
            FORMAT,
            format!("line {}, column '{}' is not valid UTF-8", line, field.label()),
        )
    })
}
