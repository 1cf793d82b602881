use super::{MarkupError, MarkupProducer};
use crate::config::ExportConfig;
use crate::model::{CellValue, TableModel, format_number};
use itertools::Itertools;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;

/// The default intermediate markup producer.
///
/// Rows are written in input order. A subgroup opens whenever the value of its
/// grouping column changes and closes with a `subtotal` of the rows it holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlTotalsWriter {
    grand_total: bool,
    indent: bool,
}

impl XmlTotalsWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a `subtotal` over all rows directly under `data`.
    pub fn with_grand_total(mut self, enabled: bool) -> Self {
        self.grand_total = enabled;
        self
    }

    pub fn with_indent(mut self, enabled: bool) -> Self {
        self.indent = enabled;
        self
    }
}

/// The XML 1.0 `Char` production.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | ' '..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..)
}

fn check_text(text: &str, location: impl FnOnce() -> String) -> Result<(), MarkupError> {
    match text.chars().find(|&c| !is_xml_char(c)) {
        Some(c) => Err(MarkupError::InvalidCharacter { location: location(), code: c as u32 }),
        None => Ok(()),
    }
}

/// Rejects text the markup cannot carry before anything is written.
fn check_model(model: &TableModel, visible: &[usize]) -> Result<(), MarkupError> {
    if let Some(title) = model.config.get_non_empty(ExportConfig::DOCUMENT_TITLE) {
        check_text(title, || "document title".to_string())?;
    }
    for &c in visible {
        check_text(&model.columns[c].title, || format!("title of column {}", c))?;
    }
    for (r, row) in model.rows.iter().enumerate() {
        for &c in visible {
            if let CellValue::Text(text) = model.cell(row, c) {
                check_text(text, || format!("cell at row {}, column {}", r, c))?;
            }
        }
    }
    Ok(())
}

struct OpenGroup<'m> {
    key: &'m CellValue,
    sums: Vec<f64>,
}

struct MarkupWriter<'w> {
    writer: Writer<&'w mut dyn Write>,
}

impl MarkupWriter<'_> {
    fn event(&mut self, event: Event<'_>) -> Result<(), MarkupError> {
        self.writer.write_event(event).map_err(|e| MarkupError::Write(e.to_string()))
    }

    fn start(&mut self, start: BytesStart<'_>) -> Result<(), MarkupError> {
        self.event(Event::Start(start))
    }

    fn end(&mut self, name: &str) -> Result<(), MarkupError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, start: BytesStart<'_>, text: &str) -> Result<(), MarkupError> {
        if text.is_empty() {
            return self.event(Event::Empty(start));
        }
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        self.start(start)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(&name)
    }

    fn subtotal(&mut self, sums: &[f64]) -> Result<(), MarkupError> {
        self.start(BytesStart::new("subtotal"))?;
        for sum in sums {
            self.text_element(BytesStart::new("subtotal-cell"), &format_number(*sum))?;
        }
        self.end("subtotal")
    }
}

impl MarkupProducer for XmlTotalsWriter {
    fn produce(&self, model: &TableModel, output: &mut dyn Write) -> Result<(), MarkupError> {
        if let Some(&column) = model.grouping.iter().find(|&&c| c >= model.columns.len()) {
            return Err(MarkupError::InvalidGrouping { column, columns: model.columns.len() });
        }

        let visible: Vec<usize> = model.visible_columns().collect();
        let totaled: Vec<usize> = visible.iter().copied().filter(|&c| model.columns[c].totaled).collect();
        check_model(model, &visible)?;
        let indent = self.indent || model.config.flag(ExportConfig::MARKUP_INDENT);

        let writer = if indent { Writer::new_with_indent(output, b' ', 2) } else { Writer::new(output) };
        let mut out = MarkupWriter { writer };

        out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        let mut table = BytesStart::new("table");
        if let Some(title) = model.config.get_non_empty(ExportConfig::DOCUMENT_TITLE) {
            table.push_attribute(("title", title));
        }
        out.start(table)?;

        out.start(BytesStart::new("header"))?;
        for &c in &visible {
            let column = &model.columns[c];
            let mut cell = BytesStart::new("header-cell");
            if column.totaled {
                cell.push_attribute(("total", "true"));
            }
            out.text_element(cell, &column.title)?;
        }
        out.end("header")?;

        out.start(BytesStart::new("data"))?;
        let mut open: Vec<OpenGroup<'_>> = Vec::with_capacity(model.grouping.len());
        let mut grand = vec![0.0; totaled.len()];

        for row in &model.rows {
            let keys: Vec<&CellValue> = model.grouping.iter().map(|&c| model.cell(row, c)).collect();
            let kept = open.iter().zip(&keys).take_while(|(group, key)| group.key == **key).count();
            while open.len() > kept {
                if let Some(group) = open.pop() {
                    out.subtotal(&group.sums)?;
                    out.end("subgroup")?;
                }
            }
            for (level, key) in keys.iter().enumerate().skip(open.len()) {
                let mut subgroup = BytesStart::new("subgroup");
                subgroup.push_attribute(("grouped-by", level.to_string().as_str()));
                out.start(subgroup)?;
                open.push(OpenGroup { key: *key, sums: vec![0.0; totaled.len()] });
            }

            out.start(BytesStart::new("row"))?;
            for &c in &visible {
                let mut cell = BytesStart::new("cell");
                if model.grouping.contains(&c) {
                    cell.push_attribute(("grouped", "true"));
                }
                out.text_element(cell, &model.cell(row, c).to_string())?;
            }
            out.end("row")?;

            let values = totaled.iter().map(|&c| model.cell(row, c).as_number().unwrap_or(0.0)).collect_vec();
            for sums in open.iter_mut().map(|g| &mut g.sums).chain(std::iter::once(&mut grand)) {
                for (sum, value) in sums.iter_mut().zip_eq(&values) {
                    *sum += value;
                }
            }
        }
        while let Some(group) = open.pop() {
            out.subtotal(&group.sums)?;
            out.end("subgroup")?;
        }
        if self.grand_total {
            out.subtotal(&grand)?;
        }
        out.end("data")?;
        out.end("table")?;
        log::debug!("Wrote intermediate markup for {} rows", model.rows.len());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "xml-totals"
    }
}
