//! Date Codec Module
//!
//! テキスト形式（CSV/XML/JSON）における日付の表記と解析を一箇所にまとめるモジュール。

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fmt::Write;

use crate::api::DateFormat;
use crate::error::ConvertError;

/// ISO 8601の日付書式
const ISO_DATE: &str = "%Y-%m-%d";

/// カスタム書式の検証に使う日付
const CHECK_DATES: [(i32, u32, u32); 5] = [
    (1900, 3, 1),
    (1925, 1, 1),
    (1999, 12, 31),
    (2025, 11, 20),
    (9999, 12, 31),
];

/// 読み込み時にフォールバックとして試す日時書式
const FALLBACK_DATETIMES: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// 日付コーデック
///
/// 出力は常に設定された書式で行い、解析は設定書式 → ISO 8601 → ISO日時 → RFC 3339
/// の順に試します。日時が与えられた場合は日付部分のみを保持します。
#[derive(Debug, Clone)]
pub(crate) struct DateCodec {
    pattern: String,
}

impl DateCodec {
    /// 検証済みの日付書式からコーデックを生成
    ///
    /// # 戻り値
    ///
    /// * `Ok(DateCodec)` - 書式が有効な場合
    /// * `Err(ConvertError::Config)` - 書式が不正、空の出力になる、または出力を解析し直せない場合
    pub fn new(format: &DateFormat) -> Result<Self, ConvertError> {
        let pattern = match format {
            DateFormat::Iso8601 => ISO_DATE.to_string(),
            DateFormat::Custom(pattern) => {
                validate_pattern(pattern)?;
                pattern.clone()
            }
        };
        Ok(Self { pattern })
    }

    /// 日付を文字列に変換
    pub fn format(&self, date: NaiveDate) -> String {
        render(date, &self.pattern).unwrap_or_else(|| date.format(ISO_DATE).to_string())
    }

    /// 文字列を日付に変換（解析できない場合は`None`）
    pub fn parse(&self, text: &str) -> Option<NaiveDate> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if let Some(date) = parse_with(text, &self.pattern) {
            return Some(date);
        }
        if self.pattern != ISO_DATE {
            if let Some(date) = parse_with(text, ISO_DATE) {
                return Some(date);
            }
        }

        FALLBACK_DATETIMES
            .iter()
            .find_map(|pattern| NaiveDateTime::parse_from_str(text, pattern).ok())
            .map(|datetime| datetime.date())
            .or_else(|| {
                DateTime::parse_from_rfc3339(text)
                    .ok()
                    .map(|datetime| datetime.date_naive())
            })
    }

    /// 解析し、失敗した場合は`MalformedInput`を返す
    ///
    /// `context`にはエラーメッセージ用の位置情報（例: "row 3, column 'StartDate'"）を渡します。
    pub fn parse_field(
        &self,
        text: &str,
        format: &'static str,
        context: &str,
    ) -> Result<NaiveDate, ConvertError> {
        self.parse(text).ok_or_else(|| {
            ConvertError::malformed(format, format!("invalid date '{}' at {}", text, context))
        })
    }
}

/// 日付を0時0分の日時として書式化する（時刻指定子を含む書式に対応するため）
///
/// 書式化に失敗した場合（例: タイムゾーン指定子）は`None`を返します。
fn render(date: NaiveDate, pattern: &str) -> Option<String> {
    let datetime = date.and_hms_opt(0, 0, 0)?;
    let mut out = String::new();
    write!(out, "{}", datetime.format(pattern)).ok()?;
    Some(out)
}

fn parse_with(text: &str, pattern: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, pattern)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, pattern)
                .ok()
                .map(|datetime| datetime.date())
        })
}

/// カスタム書式の検証
///
/// `format().to_string()`は不正な指定子でパニックするため、先にトークンを検査します。
/// 書式化できない指定子（例: `%z`）も`render`の段階で拒否されます。
fn validate_pattern(pattern: &str) -> Result<(), ConvertError> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(ConvertError::Config(format!(
            "Invalid date format string: '{}'",
            pattern
        )));
    }

    // 世紀をまたぐ複数の日付で往復変換を確認する
    // 二桁年（%y）や年を含まない書式は、いずれかの日付で元に戻らず拒否される
    for (year, month, day) in CHECK_DATES {
        let test_date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| ConvertError::Config("Failed to create test date".to_string()))?;
        let formatted = render(test_date, pattern).unwrap_or_default();
        if formatted.trim().is_empty() {
            return Err(ConvertError::Config(format!(
                "Invalid date format string: '{}'",
                pattern
            )));
        }

        if parse_with(&formatted, pattern) != Some(test_date) {
            return Err(ConvertError::Config(format!(
                "Date format '{}' cannot be parsed back into {} (rendered as '{}')",
                pattern, test_date, formatted
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn iso() -> DateCodec {
        DateCodec::new(&DateFormat::Iso8601).unwrap()
    }

    #[test]
    fn test_iso_format() {
        assert_eq!(iso().format(date(2024, 1, 1)), "2024-01-01");
        assert_eq!(iso().format(date(999, 12, 31)), "0999-12-31");
    }

    #[test]
    fn test_iso_parse() {
        let codec = iso();
        assert_eq!(codec.parse("2024-02-01"), Some(date(2024, 2, 1)));
        assert_eq!(codec.parse("  2024-02-01 "), Some(date(2024, 2, 1)));
        assert_eq!(codec.parse("2024-02-01T13:45:00"), Some(date(2024, 2, 1)));
        assert_eq!(codec.parse("2024-02-01 08:00:00"), Some(date(2024, 2, 1)));
        assert_eq!(
            codec.parse("2024-02-01T23:30:00+09:00"),
            Some(date(2024, 2, 1))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let codec = iso();
        assert_eq!(codec.parse(""), None);
        assert_eq!(codec.parse("tomorrow"), None);
        assert_eq!(codec.parse("2024-13-01"), None);
        assert_eq!(codec.parse("2023-02-29"), None);
    }

    #[test]
    fn test_custom_format() {
        let codec = DateCodec::new(&DateFormat::Custom("%d.%m.%Y".to_string())).unwrap();
        assert_eq!(codec.format(date(2024, 3, 9)), "09.03.2024");
        assert_eq!(codec.parse("09.03.2024"), Some(date(2024, 3, 9)));
        // ISO表記へのフォールバック
        assert_eq!(codec.parse("2024-03-09"), Some(date(2024, 3, 9)));
    }

    #[test]
    fn test_custom_format_with_time_keeps_date() {
        let codec = DateCodec::new(&DateFormat::Custom("%Y/%m/%d %H:%M".to_string())).unwrap();
        assert_eq!(codec.format(date(2024, 3, 9)), "2024/03/09 00:00");
        assert_eq!(codec.parse("2024/03/09 17:45"), Some(date(2024, 3, 9)));
    }

    #[test]
    fn test_invalid_custom_formats() {
        for pattern in ["", "%Q", "%m-%d", "static text", "%Y-%m-%d %z"] {
            let result = DateCodec::new(&DateFormat::Custom(pattern.to_string()));
            match result {
                Err(ConvertError::Config(_)) => {}
                other => panic!("Expected Config error for {:?}, got {:?}", pattern, other),
            }
        }
    }

    #[test]
    fn test_two_digit_year_is_rejected() {
        for pattern in ["%d.%m.%y", "%y-%m-%d", "%m/%d/%y %H:%M"] {
            match DateCodec::new(&DateFormat::Custom(pattern.to_string())) {
                Err(ConvertError::Config(message)) => {
                    assert!(message.contains("cannot be parsed back"), "message was: {}", message);
                }
                other => panic!("Expected Config error for {:?}, got {:?}", pattern, other),
            }
        }
    }

    #[test]
    fn test_custom_format_keeps_century() {
        let codec = DateCodec::new(&DateFormat::Custom("%d.%m.%Y".to_string())).unwrap();
        for d in [date(1925, 1, 1), date(1950, 6, 1), date(2025, 1, 1)] {
            assert_eq!(codec.parse(&codec.format(d)), Some(d));
        }
    }

    #[test]
    fn test_parse_field_error_message() {
        let err = iso()
            .parse_field("soon", "csv", "row 2, column 'StartDate'")
            .unwrap_err();
        match err {
            ConvertError::MalformedInput { format, message } => {
                assert_eq!(format, "csv");
                assert!(message.contains("'soon'"));
                assert!(message.contains("row 2"));
            }
            other => panic!("Expected MalformedInput, got {:?}", other),
        }
    }
}
