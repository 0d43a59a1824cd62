//! XML Codec
//!
//! ルート要素の下にレコード要素を並べる形式を扱う。
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <ArrayOfDocument>
//!   <Document>
//!     <Name>Alpha</Name>
//!     <StartDate>2024-01-01</StartDate>
//!     <DeadLine>2024-02-01</DeadLine>
//!   </Document>
//! </ArrayOfDocument>
//! ```
//!
//! 読み込み時はルート名・レコード名を検査せず、各フィールドは子要素・属性のどちらでも受け付ける。

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::{is_blank, strip_bom, Codec};
use crate::date::DateCodec;
use crate::error::ConvertError;
use crate::types::{Document, Field, PendingRecord};

const FORMAT: &str = "xml";

/// 要素の深さ（ルート = 1）
const ROOT_DEPTH: usize = 1;
const RECORD_DEPTH: usize = 2;
const FIELD_DEPTH: usize = 3;

/// XML形式のコーデック
#[derive(Debug)]
pub(crate) struct XmlCodec {
    dates: DateCodec,
    root: String,
    record: String,
}

/// 解析中のレコード
struct RecordState {
    pending: PendingRecord,
    /// 現在開いているフィールド要素とそのテキスト
    field: Option<(Option<Field>, String)>,
}

impl XmlCodec {
    pub fn new(dates: DateCodec, root: String, record: String) -> Self {
        Self {
            dates,
            root,
            record,
        }
    }

    /// レコード要素の属性からフィールド値を取得
    fn read_attributes<R>(
        &self,
        reader: &Reader<R>,
        element: &BytesStart<'_>,
        pending: &mut PendingRecord,
        index: usize,
    ) -> Result<(), ConvertError> {
        for attr in element.attributes() {
            let attr = attr.map_err(|e| xml_error(format!("invalid attribute: {}", e)))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let Some(field) = Field::from_label(&key) else {
                continue;
            };
            let value = attr
                .decode_and_unescape_value(reader)
                .map_err(|e| xml_error(format!("invalid attribute value: {}", e)))?
                .into_owned();
            if !pending.set(field, value) {
                return Err(duplicate_field(index, field));
            }
        }
        Ok(())
    }

    /// 完成したレコードを検証してDocumentに変換
    fn finish_record(
        &self,
        mut pending: PendingRecord,
        index: usize,
    ) -> Result<Document, ConvertError> {
        if let Some(field) = pending.missing() {
            return Err(ConvertError::malformed(
                FORMAT,
                format!("record {}: missing field '{}'", index, field.label()),
            ));
        }

        let name = pending.take(Field::Name).unwrap_or_default();
        let start = pending.take(Field::StartDate).unwrap_or_default();
        let deadline = pending.take(Field::DeadLine).unwrap_or_default();

        Ok(Document {
            name,
            start_date: self.dates.parse_field(
                &start,
                FORMAT,
                &format!("record {}, field 'StartDate'", index),
            )?,
            deadline: self.dates.parse_field(
                &deadline,
                FORMAT,
                &format!("record {}, field 'DeadLine'", index),
            )?,
        })
    }

    fn write_field<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        field: Field,
        value: &str,
    ) -> Result<(), quick_xml::Error> {
        writer.write_event(Event::Start(BytesStart::new(field.label())))?;
        writer.write_event(Event::Text(BytesText::new(value)))?;
        writer.write_event(Event::End(BytesEnd::new(field.label())))?;
        Ok(())
    }

    fn write_document<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        documents: &[Document],
    ) -> Result<(), quick_xml::Error> {
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        if documents.is_empty() {
            writer.write_event(Event::Empty(BytesStart::new(self.root.as_str())))?;
            return Ok(());
        }

        writer.write_event(Event::Start(BytesStart::new(self.root.as_str())))?;
        for doc in documents {
            writer.write_event(Event::Start(BytesStart::new(self.record.as_str())))?;
            self.write_field(writer, Field::Name, &doc.name)?;
            self.write_field(writer, Field::StartDate, &self.dates.format(doc.start_date))?;
            self.write_field(writer, Field::DeadLine, &self.dates.format(doc.deadline))?;
            writer.write_event(Event::End(BytesEnd::new(self.record.as_str())))?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.root.as_str())))?;
        Ok(())
    }
}

impl Codec for XmlCodec {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn read(&self, input: &[u8]) -> Result<Vec<Document>, ConvertError> {
        let input = strip_bom(input);
        if is_blank(input) {
            return Ok(Vec::new());
        }

        // 名前の値が前後の空白を含み得るため、trim_textは使用しない
        let mut reader = Reader::from_reader(input);
        reader.check_end_names(true);

        let mut buf = Vec::new();
        let mut documents = Vec::new();
        let mut depth = 0usize;
        let mut seen_root = false;
        let mut current: Option<RecordState> = None;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| xml_error(format!("XML parse error: {}", e)))?;

            match event {
                Event::Start(e) => {
                    depth += 1;
                    self.open_element(
                        &reader,
                        &e,
                        depth,
                        &mut seen_root,
                        &mut current,
                        documents.len(),
                    )?;
                }
                Event::Empty(e) => {
                    // 自己終了タグは開始と終了を同時に処理
                    depth += 1;
                    self.open_element(
                        &reader,
                        &e,
                        depth,
                        &mut seen_root,
                        &mut current,
                        documents.len(),
                    )?;
                    self.close_element(depth, &mut current, &mut documents)?;
                    depth -= 1;
                }
                Event::End(_) => {
                    self.close_element(depth, &mut current, &mut documents)?;
                    depth = depth.saturating_sub(1);
                }
                Event::Text(e) => {
                    let text = e
                        .unescape()
                        .map_err(|e| xml_error(format!("XML text error: {}", e)))?;
                    self.append_text(&text, depth, &mut current)?;
                }
                Event::CData(e) => {
                    let raw = e.into_inner();
                    let text = std::str::from_utf8(&raw)
                        .map_err(|e| xml_error(format!("CDATA is not valid UTF-8: {}", e)))?;
                    self.append_text(text, depth, &mut current)?;
                }
                Event::Eof => break,
                // 宣言・コメント・処理命令・DOCTYPEは無視
                _ => {}
            }
            buf.clear();
        }

        if depth != 0 {
            return Err(xml_error("unexpected end of document: unclosed element"));
        }

        Ok(documents)
    }

    fn write(&self, documents: &[Document]) -> Result<Vec<u8>, ConvertError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        self.write_document(&mut writer, documents)
            .map_err(|e| ConvertError::encode(FORMAT, format!("XML write error: {}", e)))?;

        let mut output = writer.into_inner();
        output.push(b'\n');
        Ok(output)
    }
}

impl XmlCodec {
    fn open_element<R>(
        &self,
        reader: &Reader<R>,
        element: &BytesStart<'_>,
        depth: usize,
        seen_root: &mut bool,
        current: &mut Option<RecordState>,
        index: usize,
    ) -> Result<(), ConvertError> {
        match depth {
            ROOT_DEPTH => {
                if *seen_root {
                    return Err(xml_error("document has more than one root element"));
                }
                *seen_root = true;
            }
            RECORD_DEPTH => {
                let mut pending = PendingRecord::new();
                self.read_attributes(reader, element, &mut pending, index)?;
                *current = Some(RecordState {
                    pending,
                    field: None,
                });
            }
            FIELD_DEPTH => {
                let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
                if let Some(state) = current.as_mut() {
                    // 未知の要素も閉じるまでテキストを読み捨てるため、Noneで保持する
                    state.field = Some((Field::from_label(&name), String::new()));
                }
            }
            _ => {
                let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                return Err(xml_error(format!(
                    "record {}: element <{}> is nested too deeply",
                    index, name
                )));
            }
        }
        Ok(())
    }

    fn close_element(
        &self,
        depth: usize,
        current: &mut Option<RecordState>,
        documents: &mut Vec<Document>,
    ) -> Result<(), ConvertError> {
        let index = documents.len();
        match depth {
            RECORD_DEPTH => {
                if let Some(state) = current.take() {
                    documents.push(self.finish_record(state.pending, index)?);
                }
            }
            FIELD_DEPTH => {
                if let Some(state) = current.as_mut() {
                    if let Some((Some(field), text)) = state.field.take() {
                        if !state.pending.set(field, text) {
                            return Err(duplicate_field(index, field));
                        }
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn append_text(
        &self,
        text: &str,
        depth: usize,
        current: &mut Option<RecordState>,
    ) -> Result<(), ConvertError> {
        match depth {
            FIELD_DEPTH => {
                if let Some((_, buffer)) = current.as_mut().and_then(|s| s.field.as_mut()) {
                    buffer.push_str(text);
                }
                Ok(())
            }
            // 要素間の空白（インデント）は許容
            _ if text.trim().is_empty() => Ok(()),
            0 => Err(xml_error("text found outside the root element")),
            _ => Err(xml_error(format!(
                "unexpected text '{}' outside a field element",
                text.trim()
            ))),
        }
    }
}

fn xml_error(message: impl Into<String>) -> ConvertError {
    ConvertError::malformed(FORMAT, message)
}

fn duplicate_field(index: usize, field: Field) -> ConvertError {
    ConvertError::malformed(
        FORMAT,
        format!("record {}: duplicate field '{}'", index, field.label()),
    )
}
