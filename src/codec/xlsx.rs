//! XLSX Codec
//!
//! 読み込みはcalamine、書き出しはrust_xlsxwriterを使用する。
//! 列は絶対位置で固定（A = Name, B = StartDate, C = DeadLine）。

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet, XlsxError};
use std::io::Cursor;

use super::Codec;
use crate::error::ConvertError;
use crate::types::{Document, Field};

const FORMAT: &str = "xlsx";

/// 日付セルの表示形式
const DATE_NUM_FORMAT: &str = "yyyy-mm-dd";

/// Excelで表現可能な年の範囲
const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 9999;

/// セルに格納できる最大文字数
const MAX_CELL_CHARS: usize = 32_767;

/// XLSX形式のコーデック
#[derive(Debug)]
pub(crate) struct XlsxCodec {
    sheet_name: String,
}

impl XlsxCodec {
    pub fn new(sheet_name: String) -> Self {
        Self { sheet_name }
    }

    fn read_range(&self, range: &Range<Data>) -> Result<Vec<Document>, ConvertError> {
        let (Some(start), Some(end)) = (range.start(), range.end()) else {
            return Err(ConvertError::EmptyDocument(
                "worksheet has no cells".to_string(),
            ));
        };

        if end.1 < 2 {
            return Err(ConvertError::malformed(
                FORMAT,
                format!(
                    "used range ends at column {}; columns A to C are required",
                    column_letter(end.1)
                ),
            ));
        }

        // 使用範囲の先頭行はヘッダー
        let mut documents = Vec::new();
        for row in (start.0 + 1)..=end.0 {
            let cells = [0u32, 1, 2].map(|col| range.get_value((row, col)).unwrap_or(&Data::Empty));
            if cells.iter().all(|cell| matches!(cell, Data::Empty)) {
                continue;
            }

            documents.push(Document {
                name: name_text(cells[0], row)?,
                start_date: date_value(cells[1], row, Field::StartDate)?,
                deadline: date_value(cells[2], row, Field::DeadLine)?,
            });
        }

        Ok(documents)
    }

    fn build_workbook(&self, documents: &[Document]) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();
        let date_format = Format::new().set_num_format(DATE_NUM_FORMAT);

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&self.sheet_name)?;

        for (col, field) in (0u16..).zip(Field::ALL) {
            worksheet.write_string_with_format(0, col, field.label(), &header_format)?;
        }

        for (row, doc) in (1u32..).zip(documents) {
            worksheet.write_string(row, 0, &doc.name)?;
            write_date(worksheet, row, 1, doc.start_date, &date_format)?;
            write_date(worksheet, row, 2, doc.deadline, &date_format)?;
        }

        worksheet.set_column_width(0, 30)?;
        worksheet.set_column_width(1, 12)?;
        worksheet.set_column_width(2, 12)?;

        workbook.save_to_buffer()
    }
}

impl Codec for XlsxCodec {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn read(&self, input: &[u8]) -> Result<Vec<Document>, ConvertError> {
        let sheets = open_workbook_auto_from_rs(Cursor::new(input)).map_err(|e| {
            ConvertError::malformed(FORMAT, format!("failed to open workbook: {}", e))
        })?;
        let mut workbook = match sheets {
            Sheets::Xlsx(workbook) => workbook,
            _ => {
                return Err(ConvertError::malformed(
                    FORMAT,
                    "input is a spreadsheet but not an XLSX workbook",
                ))
            }
        };

        let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
            return Err(ConvertError::EmptyDocument(
                "workbook contains no worksheets".to_string(),
            ));
        };

        let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
            ConvertError::malformed(
                FORMAT,
                format!("failed to read worksheet '{}': {}", sheet_name, e),
            )
        })?;

        if range.is_empty() {
            return Err(ConvertError::EmptyDocument(format!(
                "worksheet '{}' has no cells",
                sheet_name
            )));
        }

        self.read_range(&range)
    }

    fn write(&self, documents: &[Document]) -> Result<Vec<u8>, ConvertError> {
        // 範囲外の日付・長すぎる名前はrust_xlsxwriterより先に検出し、レコード位置を含めて報告する
        for (index, doc) in documents.iter().enumerate() {
            let length = doc.name.chars().count();
            if length > MAX_CELL_CHARS {
                return Err(ConvertError::encode(
                    FORMAT,
                    format!(
                        "name in record {} has {} characters; a cell holds at most {}",
                        index, length, MAX_CELL_CHARS
                    ),
                ));
            }
            for (field, date) in [(Field::StartDate, doc.start_date), (Field::DeadLine, doc.deadline)] {
                if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
                    return Err(ConvertError::encode(
                        FORMAT,
                        format!(
                            "date {} in record {} field '{}' is outside the range {}-{}",
                            date,
                            index,
                            field.label(),
                            MIN_YEAR,
                            MAX_YEAR
                        ),
                    ));
                }
            }
        }

        self.build_workbook(documents)
            .map_err(|e| ConvertError::encode(FORMAT, format!("XLSX write error: {}", e)))
    }
}

fn write_date(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    date: NaiveDate,
    format: &Format,
) -> Result<(), XlsxError> {
    // 年の範囲は呼び出し前に検査済み（範囲外は0となりfrom_ymdが拒否する）
    let year = u16::try_from(date.year()).unwrap_or_default();
    let datetime = ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8)?;
    worksheet.write_datetime_with_format(row, col, &datetime, format)?;
    Ok(())
}

fn name_text(cell: &Data, row: u32) -> Result<String, ConvertError> {
    match cell {
        Data::Empty => Ok(String::new()),
        Data::String(s) => Ok(decode_escapes(s)),
        Data::Int(i) => Ok(i.to_string()),
        Data::Float(f) => Ok(f.to_string()),
        Data::Bool(b) => Ok(b.to_string()),
        other => Err(cell_error(row, 0, Field::Name, other)),
    }
}

/// OOXMLの`_xHHHH_`エスケープを元の文字に戻す
///
/// 書き出し時に制御文字（例: `\r`）と`_xHHHH_`形式のリテラルがエスケープされるため、
/// 読み込み時に復元しないと往復で名前が変わる。`_x005F_`は`_`になる。
fn decode_escapes(text: &str) -> String {
    if !text.contains("_x") {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("_x") {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        match escaped_char(candidate) {
            Some(c) => {
                out.push(c);
                rest = &candidate[7..];
            }
            None => {
                out.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// `_xHHHH_`で始まる場合、その文字を返す
fn escaped_char(text: &str) -> Option<char> {
    let bytes = text.as_bytes();
    if bytes.len() < 7 || bytes[6] != b'_' || !bytes[2..6].iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let code = u32::from_str_radix(&text[2..6], 16).ok()?;
    char::from_u32(code)
}

fn date_value(cell: &Data, row: u32, field: Field) -> Result<NaiveDate, ConvertError> {
    let col = field.index() as u32;
    let date = match cell {
        Data::DateTime(dt) => dt.as_datetime().map(|datetime| datetime.date()),
        Data::DateTimeIso(text) => parse_iso(text),
        _ => None,
    };
    date.ok_or_else(|| cell_error(row, col, field, cell))
}

fn parse_iso(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().or_else(|| {
        NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|datetime| datetime.date())
    })
}

fn cell_error(row: u32, col: u32, field: Field, cell: &Data) -> ConvertError {
    ConvertError::malformed(
        FORMAT,
        format!(
            "cell {}{} ({}) has unsupported value {:?}",
            column_letter(col),
            row + 1,
            field.label(),
            cell
        ),
    )
}

/// 0始まりの列番号を列記号に変換（A〜Z以降はAA, AB, ...）
fn column_letter(col: u32) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}
