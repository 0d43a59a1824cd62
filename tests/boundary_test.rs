//! Boundary Tests for docconv
//!
//! Empty sources, structurally empty workbooks, malformed input,
//! and the limits of each representation.

use chrono::NaiveDate;
use rust_xlsxwriter::*;

use docconv::{ConvertError, ConverterBuilder, Document, ErrorCategory, Format as DocFormat};

// Helper module for generating test fixtures
mod fixtures {
    use super::*;

    /// Workbook whose only sheet has no cells
    pub fn generate_empty_sheet() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("EmptySheet")?;
        Ok(workbook.save_to_buffer()?)
    }

    /// Workbook containing only the header row
    pub fn generate_header_only() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "Name")?;
        worksheet.write_string(0, 1, "StartDate")?;
        worksheet.write_string(0, 2, "DeadLine")?;
        Ok(workbook.save_to_buffer()?)
    }

    /// Workbook with only two columns
    pub fn generate_two_columns() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "Name")?;
        worksheet.write_string(0, 1, "StartDate")?;
        worksheet.write_string(1, 0, "Alpha")?;
        worksheet.write_number(1, 1, 45292.0)?;
        Ok(workbook.save_to_buffer()?)
    }

    /// Workbook whose date column holds plain numbers
    pub fn generate_numeric_dates() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "Name")?;
        worksheet.write_string(0, 1, "StartDate")?;
        worksheet.write_string(0, 2, "DeadLine")?;
        worksheet.write_string(1, 0, "Alpha")?;
        worksheet.write_number(1, 1, 45292.0)?;
        worksheet.write_number(1, 2, 45323.0)?;
        Ok(workbook.save_to_buffer()?)
    }

    /// Workbook whose used range starts below and to the right of A1
    pub fn generate_offset_range() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        worksheet.write_string(2, 1, "StartDate")?;
        worksheet.write_string(2, 2, "DeadLine")?;
        worksheet.write_datetime_with_format(3, 1, &ExcelDateTime::from_ymd(2024, 1, 1)?, &date_format)?;
        worksheet.write_datetime_with_format(3, 2, &ExcelDateTime::from_ymd(2024, 2, 1)?, &date_format)?;
        Ok(workbook.save_to_buffer()?)
    }

    /// Corrupted ZIP data
    pub fn generate_corrupted_file() -> Vec<u8> {
        let mut data = b"PK\x03\x04".to_vec();
        data.extend_from_slice(&[0xFF; 64]);
        data
    }
}

fn converter() -> docconv::Converter {
    ConverterBuilder::new().build().unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// Zero-byte and whitespace-only text sources read as empty sequences
#[test]
fn test_blank_text_sources() {
    let converter = converter();
    for format in [DocFormat::Json, DocFormat::Csv, DocFormat::Xml] {
        assert!(converter.read_bytes(format, b"").unwrap().is_empty());
        assert!(converter.read_bytes(format, b" \n\t").unwrap().is_empty());
    }
}

// Valid sources without records read as empty sequences
#[test]
fn test_record_free_sources() {
    let converter = converter();
    assert!(converter.read_bytes(DocFormat::Json, b"[ ]").unwrap().is_empty());
    assert!(converter
        .read_bytes(DocFormat::Csv, b"Name,StartDate,DeadLine\r\n")
        .unwrap()
        .is_empty());
    assert!(converter
        .read_bytes(DocFormat::Xml, b"<ArrayOfDocument></ArrayOfDocument>")
        .unwrap()
        .is_empty());

    let xlsx = fixtures::generate_header_only().unwrap();
    assert!(converter.read_bytes(DocFormat::Xlsx, &xlsx).unwrap().is_empty());
}

#[test]
fn test_empty_sheet() {
    let xlsx = fixtures::generate_empty_sheet().unwrap();
    let err = converter().read_bytes(DocFormat::Xlsx, &xlsx).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::EmptyDocument);
}

#[test]
fn test_missing_date_column() {
    let xlsx = fixtures::generate_two_columns().unwrap();
    match converter().read_bytes(DocFormat::Xlsx, &xlsx) {
        Err(ConvertError::MalformedInput { format, .. }) => assert_eq!(format, "xlsx"),
        other => panic!("Expected MalformedInput error, got {:?}", other),
    }
}

#[test]
fn test_plain_number_is_not_a_date() {
    let xlsx = fixtures::generate_numeric_dates().unwrap();
    match converter().read_bytes(DocFormat::Xlsx, &xlsx) {
        Err(ConvertError::MalformedInput { message, .. }) => {
            assert!(message.contains("B2"), "message was: {}", message);
        }
        other => panic!("Expected MalformedInput error, got {:?}", other),
    }
}

// Columns are absolute: an empty column A gives empty names
#[test]
fn test_offset_used_range() {
    let xlsx = fixtures::generate_offset_range().unwrap();
    let documents = converter().read_bytes(DocFormat::Xlsx, &xlsx).unwrap();
    assert_eq!(
        documents,
        vec![Document::new("", date(2024, 1, 1), date(2024, 2, 1))]
    );
}

#[test]
fn test_corrupted_file() {
    let data = fixtures::generate_corrupted_file();
    let err = converter().read_bytes(DocFormat::Xlsx, &data).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::MalformedInput);
}

#[test]
fn test_malformed_text_sources() {
    let converter = converter();

    // Top-level object instead of array
    let err = converter
        .read_bytes(
            DocFormat::Json,
            br#"{"name": "Alpha", "startDate": "2024-01-01", "deadLine": "2024-02-01"}"#,
        )
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::MalformedInput);

    // CSV without a Name column
    let err = converter
        .read_bytes(DocFormat::Csv, b"StartDate,DeadLine\n2024-01-01,2024-02-01\n")
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::MalformedInput);

    // CSV row longer than the header
    let err = converter
        .read_bytes(
            DocFormat::Csv,
            b"Name,StartDate,DeadLine\nAlpha,2024-01-01,2024-02-01,extra\n",
        )
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::MalformedInput);

    // Mismatched XML tags
    let err = converter
        .read_bytes(DocFormat::Xml, b"<ArrayOfDocument><Document></Item></ArrayOfDocument>")
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::MalformedInput);
}

#[test]
fn test_date_limits() {
    let converter = converter();
    let documents = vec![
        Document::new("first", date(1900, 3, 1), date(1900, 3, 2)),
        Document::new("last", date(9999, 12, 31), date(9999, 12, 31)),
    ];

    for format in [DocFormat::Json, DocFormat::Csv, DocFormat::Xml, DocFormat::Xlsx] {
        let bytes = converter.write_bytes(format, &documents).unwrap();
        assert_eq!(
            converter.read_bytes(format, &bytes).unwrap(),
            documents,
            "{:?}",
            format
        );
    }

    // Outside the spreadsheet range only XLSX refuses
    let ancient = vec![Document::new("ancient", date(1899, 12, 31), date(1900, 1, 1))];
    assert!(converter.write_bytes(DocFormat::Json, &ancient).is_ok());
    let err = converter.write_bytes(DocFormat::Xlsx, &ancient).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Encode);
}

#[test]
fn test_long_and_unicode_names() {
    let converter = converter();
    let long_name = "長".repeat(10_000);
    let documents = vec![
        Document::new(long_name, date(2024, 1, 1), date(2024, 2, 1)),
        Document::new("line\nbreak, \"quoted\"", date(2024, 1, 1), date(2024, 2, 1)),
        Document::new("crlf\r\nline", date(2024, 1, 1), date(2024, 2, 1)),
        Document::new("cr\ronly\ttab", date(2024, 1, 1), date(2024, 2, 1)),
        Document::new("_x0041_ and _x005F_", date(2024, 1, 1), date(2024, 2, 1)),
        Document::new("", date(2024, 1, 1), date(2024, 2, 1)),
    ];

    for format in DocFormat::ALL {
        let bytes = converter.write_bytes(format, &documents).unwrap();
        assert_eq!(
            converter.read_bytes(format, &bytes).unwrap(),
            documents,
            "{:?}",
            format
        );
    }
}

#[test]
fn test_crlf_name_survives_csv_to_xlsx_and_back() {
    let converter = converter();
    let csv = b"Name,StartDate,DeadLine\r\n\"two\r\nlines\",2024-01-01,2024-02-01\r\n";

    let documents = converter.read_bytes(DocFormat::Csv, csv).unwrap();
    assert_eq!(documents[0].name, "two\r\nlines");

    let xlsx = converter.write_bytes(DocFormat::Xlsx, &documents).unwrap();
    assert_eq!(converter.read_bytes(DocFormat::Xlsx, &xlsx).unwrap(), documents);
}

#[test]
fn test_name_over_cell_limit_only_fails_for_xlsx() {
    let converter = converter();
    let documents = vec![Document::new(
        "a".repeat(32_768),
        date(2024, 1, 1),
        date(2024, 2, 1),
    )];

    for format in [DocFormat::Json, DocFormat::Csv, DocFormat::Xml] {
        let bytes = converter.write_bytes(format, &documents).unwrap();
        assert_eq!(converter.read_bytes(format, &bytes).unwrap(), documents);
    }

    let err = converter.write_bytes(DocFormat::Xlsx, &documents).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Encode);
}

#[test]
fn test_many_records() {
    let converter = converter();
    let documents: Vec<Document> = (0..5_000)
        .map(|i| {
            let start = date(2020, 1, 1) + chrono::Days::new(i);
            Document::new(format!("Document {}", i), start, start + chrono::Days::new(30))
        })
        .collect();

    let bytes = converter.write_bytes(DocFormat::Xlsx, &documents).unwrap();
    let read = converter.read_bytes(DocFormat::Xlsx, &bytes).unwrap();
    assert_eq!(read.len(), 5_000);
    assert_eq!(read[4_999], documents[4_999]);
}
