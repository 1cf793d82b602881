//! The table being exported.

use crate::config::ExportConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One cell of a row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => f.write_str(&format_number(*n)),
            CellValue::Text(t) => f.write_str(t),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

/// Shortest text that reads back as `n`: `30`, not `30.0`.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        // Also covers negative zero.
        return "0".to_string();
    }
    format!("{}", n)
}

fn visible_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub title: String,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    /// Whether subtotals are computed for this column.
    #[serde(default)]
    pub totaled: bool,
}

impl Column {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), visible: true, totaled: false }
    }

    pub fn totaled(mut self) -> Self {
        self.totaled = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Columns, pre-sorted rows and grouping levels.
///
/// `grouping` lists column indexes, outermost level first. Rows must already
/// be sorted by those columns; consecutive rows with equal values form a group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableModel {
    pub columns: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<Vec<CellValue>>,
    #[serde(default)]
    pub grouping: Vec<usize>,
    #[serde(default)]
    pub config: ExportConfig,
}

impl TableModel {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns, ..Self::default() }
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_row(mut self, row: Vec<CellValue>) -> Self {
        self.rows.push(row);
        self
    }

    /// Adds a grouping level nested inside the existing ones.
    pub fn group_by(mut self, column: usize) -> Self {
        self.grouping.push(column);
        self
    }

    pub fn with_config(mut self, config: ExportConfig) -> Self {
        self.config = config;
        self
    }

    /// Indexes of the visible columns, in order.
    pub fn visible_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.columns.iter().enumerate().filter(|(_, c)| c.visible).map(|(i, _)| i)
    }

    /// The cell at `column`, or `Empty` when the row is short.
    pub fn cell<'m>(&self, row: &'m [CellValue], column: usize) -> &'m CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        row.get(column).unwrap_or(EMPTY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_use_their_shortest_form() {
        assert_eq!(format_number(30.0), "30");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1e21), "1000000000000000000000");
        assert_eq!(CellValue::from(12i64).to_string(), "12");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn deserializes_from_json() {
        let model = TableModel::from_json_str(
            r#"{
                "columns": [{"title": "Name"}, {"title": "Amount", "totaled": true}, {"title": "Id", "visible": false}],
                "rows": [["A", 10, null], ["B", 2.5, 7]],
                "grouping": [0],
                "config": {"document-title": "Sales"}
            }"#,
        )
        .unwrap();
        assert_eq!(model.rows[0][0], CellValue::Text("A".into()));
        assert_eq!(model.rows[0][1], CellValue::Number(10.0));
        assert_eq!(model.rows[0][2], CellValue::Empty);
        assert!(model.columns[1].totaled);
        assert_eq!(model.visible_columns().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(model.grouping, vec![0]);
        assert_eq!(model.config.get(ExportConfig::DOCUMENT_TITLE), Some("Sales"));
    }

    #[test]
    fn short_rows_read_as_empty() {
        let model = TableModel::new(vec![Column::new("A"), Column::new("B")]);
        let row = vec![CellValue::from("x")];
        assert_eq!(model.cell(&row, 1), &CellValue::Empty);
    }
}
