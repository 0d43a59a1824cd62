//! JSON Codec
//!
//! `[{"name": ..., "startDate": ..., "deadLine": ...}]`形式のJSON配列を扱う。

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use super::{is_blank, strip_bom, Codec};
use crate::date::DateCodec;
use crate::error::ConvertError;
use crate::types::{Document, Field, PendingRecord};

const FORMAT: &str = "json";

/// JSON形式のコーデック
#[derive(Debug)]
pub(crate) struct JsonCodec {
    dates: DateCodec,
    pretty: bool,
}

/// 読み込み用のJSON値
///
/// `serde_json::Value`のオブジェクトは同じキーを後勝ちでまとめてしまうため、
/// オブジェクトはキーと値の組を出現順にすべて保持する。
enum RawJson {
    Array(Vec<RawJson>),
    Object(Vec<(String, Value)>),
    Scalar(Value),
}

impl RawJson {
    fn type_name(&self) -> &'static str {
        match self {
            RawJson::Array(_) => "an array",
            RawJson::Object(_) => "an object",
            RawJson::Scalar(value) => type_name(value),
        }
    }
}

impl<'de> Deserialize<'de> for RawJson {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RawJsonVisitor)
    }
}

struct RawJsonVisitor;

impl<'de> Visitor<'de> for RawJsonVisitor {
    type Value = RawJson;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<RawJson, E> {
        Ok(RawJson::Scalar(Value::Bool(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<RawJson, E> {
        Ok(RawJson::Scalar(Value::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<RawJson, E> {
        Ok(RawJson::Scalar(Value::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<RawJson, E> {
        Ok(RawJson::Scalar(Value::from(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<RawJson, E> {
        Ok(RawJson::Scalar(Value::String(v.to_owned())))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<RawJson, E> {
        Ok(RawJson::Scalar(Value::String(v)))
    }

    fn visit_unit<E: de::Error>(self) -> Result<RawJson, E> {
        Ok(RawJson::Scalar(Value::Null))
    }

    fn visit_none<E: de::Error>(self) -> Result<RawJson, E> {
        Ok(RawJson::Scalar(Value::Null))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<RawJson, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(RawJson::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawJson, A::Error> {
        let mut entries = Vec::new();
        while let Some(entry) = map.next_entry::<String, Value>()? {
            entries.push(entry);
        }
        Ok(RawJson::Object(entries))
    }
}

/// 出力用の行表現（日付は設定された書式の文字列）
#[derive(Serialize)]
struct JsonRow<'a> {
    name: &'a str,
    #[serde(rename = "startDate")]
    start_date: String,
    #[serde(rename = "deadLine")]
    deadline: String,
}

impl JsonCodec {
    pub fn new(dates: DateCodec, pretty: bool) -> Self {
        Self { dates, pretty }
    }

    /// 1要素（オブジェクト）をレコードに変換
    fn read_record(
        &self,
        index: usize,
        entries: &[(String, Value)],
    ) -> Result<Document, ConvertError> {
        let mut pending = PendingRecord::new();

        for (key, value) in entries {
            // 未知のキーは無視
            let Some(field) = Field::from_label(key) else {
                continue;
            };

            let text = match value {
                Value::String(s) => s.clone(),
                other => {
                    return Err(ConvertError::malformed(
                        FORMAT,
                        format!(
                            "element {}: field '{}' must be a string, found {}",
                            index,
                            key,
                            type_name(other)
                        ),
                    ))
                }
            };

            if !pending.set(field, text) {
                return Err(ConvertError::malformed(
                    FORMAT,
                    format!("element {}: duplicate field '{}'", index, field.label()),
                ));
            }
        }

        if let Some(field) = pending.missing() {
            return Err(ConvertError::malformed(
                FORMAT,
                format!("element {}: missing field '{}'", index, field.label()),
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
                &format!("element {}, field 'StartDate'", index),
            )?,
            deadline: self.dates.parse_field(
                &deadline,
                FORMAT,
                &format!("element {}, field 'DeadLine'", index),
            )?,
        })
    }
}

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn read(&self, input: &[u8]) -> Result<Vec<Document>, ConvertError> {
        let input = strip_bom(input);
        if is_blank(input) {
            return Ok(Vec::new());
        }

        let value: RawJson = serde_json::from_slice(input)
            .map_err(|e| ConvertError::malformed(FORMAT, format!("invalid JSON: {}", e)))?;

        let elements = match value {
            RawJson::Array(elements) => elements,
            other => {
                return Err(ConvertError::malformed(
                    FORMAT,
                    format!("top-level value must be an array, found {}", other.type_name()),
                ))
            }
        };

        elements
            .iter()
            .enumerate()
            .map(|(index, element)| match element {
                RawJson::Object(entries) => self.read_record(index, entries),
                other => Err(ConvertError::malformed(
                    FORMAT,
                    format!(
                        "element {} must be an object, found {}",
                        index,
                        other.type_name()
                    ),
                )),
            })
            .collect()
    }

    fn write(&self, documents: &[Document]) -> Result<Vec<u8>, ConvertError> {
        let rows: Vec<JsonRow<'_>> = documents
            .iter()
            .map(|doc| JsonRow {
                name: &doc.name,
                start_date: self.dates.format(doc.start_date),
                deadline: self.dates.format(doc.deadline),
            })
            .collect();

        let mut output = if self.pretty {
            serde_json::to_vec_pretty(&rows)
        } else {
            serde_json::to_vec(&rows)
        }
        .map_err(|e| ConvertError::encode(FORMAT, format!("JSON serialization error: {}", e)))?;
        output.push(b'\n');

        Ok(output)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::DateFormat;
    use chrono::NaiveDate;

    fn codec() -> JsonCodec {
        JsonCodec::new(DateCodec::new(&DateFormat::Iso8601).unwrap(), true)
    }

    fn doc(name: &str, start: (i32, u32, u32), end: (i32, u32, u32)) -> Document {
        Document::new(
            name,
            NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        )
    }

    fn expect_malformed(result: Result<Vec<Document>, ConvertError>, needle: &str) {
        match result {
            Err(ConvertError::MalformedInput { format, message }) => {
                assert_eq!(format, "json");
                assert!(message.contains(needle), "message was: {}", message);
            }
            other => panic!("Expected MalformedInput error, got {:?}", other),
        }
    }

    #[test]
    fn test_read_array() {
        let input = br#"[
            {"name": "Alpha", "startDate": "2024-01-01", "deadLine": "2024-02-01"},
            {"name": "Beta", "startDate": "2024-03-01", "deadLine": "2024-04-15"}
        ]"#;
        let docs = codec().read(input).unwrap();
        assert_eq!(
            docs,
            vec![
                doc("Alpha", (2024, 1, 1), (2024, 2, 1)),
                doc("Beta", (2024, 3, 1), (2024, 4, 15)),
            ]
        );
    }

    #[test]
    fn test_read_case_insensitive_keys_and_extra_fields() {
        let input = br#"[{"NAME": "Alpha", "StartDate": "2024-01-01", "Deadline": "2024-02-01", "owner": 7}]"#;
        let docs = codec().read(input).unwrap();
        assert_eq!(docs, vec![doc("Alpha", (2024, 1, 1), (2024, 2, 1))]);
    }

    #[test]
    fn test_read_empty_inputs() {
        assert!(codec().read(b"").unwrap().is_empty());
        assert!(codec().read(b"  \n").unwrap().is_empty());
        assert!(codec().read(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_read_top_level_object_is_malformed() {
        let input = br#"{"name": "Alpha", "startDate": "2024-01-01", "deadLine": "2024-02-01"}"#;
        expect_malformed(codec().read(input), "must be an array");
    }

    #[test]
    fn test_read_invalid_syntax() {
        expect_malformed(codec().read(b"[{\"name\": "), "invalid JSON");
    }

    #[test]
    fn test_read_schema_violations() {
        expect_malformed(codec().read(b"[42]"), "must be an object");
        expect_malformed(
            codec().read(br#"[{"name": "A", "startDate": "2024-01-01"}]"#),
            "missing field 'DeadLine'",
        );
        expect_malformed(
            codec().read(br#"[{"name": 1, "startDate": "2024-01-01", "deadLine": "2024-01-02"}]"#),
            "must be a string",
        );
        expect_malformed(
            codec().read(
                br#"[{"name": "A", "Name": "B", "startDate": "2024-01-01", "deadLine": "2024-01-02"}]"#,
            ),
            "duplicate field 'Name'",
        );
        expect_malformed(
            codec().read(br#"[{"name": "A", "startDate": "01/02/2024", "deadLine": "2024-01-02"}]"#),
            "invalid date '01/02/2024'",
        );
    }

    #[test]
    fn test_read_repeated_identical_key_is_malformed() {
        expect_malformed(
            codec().read(
                br#"[{"name": "A", "name": "B", "startDate": "2024-01-01", "deadLine": "2024-01-02"}]"#,
            ),
            "duplicate field 'Name'",
        );
        expect_malformed(
            codec().read(
                br#"[{"name": "A", "startDate": "2024-01-01", "deadLine": "2024-01-02", "deadLine": "2024-01-03"}]"#,
            ),
            "duplicate field 'DeadLine'",
        );
        // 未知のキーの重複は無視
        let docs = codec()
            .read(br#"[{"x": 1, "x": 2, "name": "A", "startDate": "2024-01-01", "deadLine": "2024-01-02"}]"#)
            .unwrap();
        assert_eq!(docs, vec![doc("A", (2024, 1, 1), (2024, 1, 2))]);
    }

    #[test]
    fn test_read_nested_array_element_is_malformed() {
        expect_malformed(codec().read(b"[[]]"), "element 0 must be an object, found an array");
        expect_malformed(codec().read(b"null"), "found null");
    }

    #[test]
    fn test_write_pretty_camel_case() {
        let output = codec()
            .write(&[doc("Alpha", (2024, 1, 1), (2024, 2, 1))])
            .unwrap();
        let text = String::from_utf8(output).unwrap();
        let expected = "[\n  {\n    \"name\": \"Alpha\",\n    \"startDate\": \"2024-01-01\",\n    \"deadLine\": \"2024-02-01\"\n  }\n]\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_write_compact() {
        let codec = JsonCodec::new(DateCodec::new(&DateFormat::Iso8601).unwrap(), false);
        let output = codec
            .write(&[doc("Alpha", (2024, 1, 1), (2024, 2, 1))])
            .unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "[{\"name\":\"Alpha\",\"startDate\":\"2024-01-01\",\"deadLine\":\"2024-02-01\"}]\n"
        );
    }

    #[test]
    fn test_write_empty() {
        let output = codec().write(&[]).unwrap();
        assert_eq!(output, b"[]\n");
    }
}
