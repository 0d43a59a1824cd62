//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 変換対象のレコード（名前・開始日・締切日）
///
/// 等価性は構造的（3フィールドすべてが等しい場合に等しい）です。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Document {
    /// 名前（空文字列も許容）
    pub name: String,

    /// 開始日
    #[serde(rename = "startDate")]
    pub start_date: NaiveDate,

    /// 締切日
    #[serde(rename = "deadLine")]
    pub deadline: NaiveDate,
}

impl Document {
    /// 新しいレコードを生成
    pub fn new(name: impl Into<String>, start_date: NaiveDate, deadline: NaiveDate) -> Self {
        Self {
            name: name.into(),
            start_date,
            deadline,
        }
    }
}

/// レコードのフィールド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    StartDate,
    DeadLine,
}

impl Field {
    /// 出力順のフィールド一覧
    pub const ALL: [Field; 3] = [Field::Name, Field::StartDate, Field::DeadLine];

    /// 正規のラベル（CSVヘッダー、XML要素名、XLSXヘッダー）
    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::StartDate => "StartDate",
            Field::DeadLine => "DeadLine",
        }
    }

    /// 外部のラベルをフィールドに対応付ける
    ///
    /// 大文字小文字を区別せず、`_`・`-`・空白の区切りを無視します。
    /// 例: `"start_date"`, `"Start Date"`, `"startDate"` はすべて`StartDate`。
    pub fn from_label(label: &str) -> Option<Field> {
        let normalized: String = label
            .chars()
            .filter(|c| !matches!(c, '_' | '-') && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "name" => Some(Field::Name),
            "startdate" => Some(Field::StartDate),
            "deadline" => Some(Field::DeadLine),
            _ => None,
        }
    }

    /// `ALL`内での位置
    pub(crate) fn index(self) -> usize {
        match self {
            Field::Name => 0,
            Field::StartDate => 1,
            Field::DeadLine => 2,
        }
    }
}

/// フィールド値を集めてレコードを組み立てるための作業領域
///
/// 各Readerはラベル付きの値を順不同で受け取るため、ここで重複・欠落を検出します。
#[derive(Debug, Default)]
pub(crate) struct PendingRecord {
    values: [Option<String>; 3],
}

impl PendingRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// 値を設定する。既に設定済みの場合は`false`を返す
    pub fn set(&mut self, field: Field, value: String) -> bool {
        let slot = &mut self.values[field.index()];
        if slot.is_some() {
            return false;
        }
        *slot = Some(value);
        true
    }

    /// 値を取り出す（欠落している場合は`None`）
    pub fn take(&mut self, field: Field) -> Option<String> {
        self.values[field.index()].take()
    }

    /// 最初に見つかった欠落フィールド
    pub fn missing(&self) -> Option<Field> {
        Field::ALL
            .into_iter()
            .find(|field| self.values[field.index()].is_none())
    }
}
