//! The XSL-FO to PDF document formatter.
//!
//! [`FoSink`] consumes formatting-object events, validates them against the
//! supported vocabulary, and feeds block content through the [`Composer`] to
//! the [`Paginator`]. Table rows are laid out and placed as each row ends, so
//! long tables never accumulate in memory.

use crate::layout::{Composer, InlineContent, InlineRun, LayoutCommand, VItem};
use crate::page::{DocumentInfo, PageMaster, Paginator, StaticContent};
use crate::properties::{BlockStyle, BoxStyle, Props, TextStyle};
use crate::table::{CellContent, ColumnWidth, PlacedRow, RowContent, layout_row, resolve_widths};
use crate::vocabulary::{FoKind, check_placement, classify};
use crate::writer::StreamingPdfWriter;
use folio_traits::{
    Attribute, DocumentFormatter, DocumentSink, FormatError, MIME_PDF, MarkupHandler, QName, SinkError,
    ValidationError,
};
use std::collections::HashMap;
use std::io::Write;
use thiserror::Error;

/// Failure of [`format_markup`].
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Cannot parse page-description markup: {0}")]
    Parse(#[from] roxmltree::Error),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Formats XSL-FO into PDF using the standard Type 1 fonts.
#[derive(Debug, Clone)]
pub struct FoFormatter {
    pdf_version: String,
    creation_date: bool,
}

impl Default for FoFormatter {
    fn default() -> Self {
        Self { pdf_version: "1.7".to_string(), creation_date: true }
    }
}

impl FoFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether to stamp `/CreationDate`. Disable for byte-reproducible output.
    pub fn with_creation_date(mut self, enabled: bool) -> Self {
        self.creation_date = enabled;
        self
    }

    pub fn format_markup(&self, fo: &str, output: &mut dyn Write) -> Result<(), RenderError> {
        format_markup(self, fo, output)
    }
}

impl DocumentFormatter for FoFormatter {
    fn supports(&self, mime_type: &str) -> bool {
        mime_type.eq_ignore_ascii_case(MIME_PDF)
    }

    fn begin_document<'w>(
        &self,
        mime_type: &str,
        output: &'w mut dyn Write,
    ) -> Result<Box<dyn DocumentSink + 'w>, FormatError> {
        if !self.supports(mime_type) {
            return Err(FormatError::UnsupportedMimeType(mime_type.to_string()));
        }
        let writer = StreamingPdfWriter::new(output, &self.pdf_version)?;
        Ok(Box::new(FoSink::new(Paginator::new(writer), self.creation_date)))
    }

    fn name(&self) -> &'static str {
        "fo-pdf"
    }
}

/// Formats a complete XSL-FO document held in memory.
pub fn format_markup(formatter: &FoFormatter, fo: &str, output: &mut dyn Write) -> Result<(), RenderError> {
    let doc = roxmltree::Document::parse(fo)?;
    let mut sink = formatter.begin_document(MIME_PDF, output)?;
    sink.start_document()?;
    replay(doc.root_element(), &mut *sink)?;
    sink.end_document()?;
    sink.finish()?;
    Ok(())
}

fn replay<H: MarkupHandler + ?Sized>(node: roxmltree::Node<'_, '_>, sink: &mut H) -> Result<(), SinkError> {
    let tag = node.tag_name();
    let name = match tag.namespace() {
        Some(ns) => QName::with_namespace(node.lookup_prefix(ns), tag.name(), ns),
        None => QName::local(tag.name()),
    };
    let attributes: Vec<Attribute> = node.attributes().map(|a| Attribute::new(a.name(), a.value())).collect();
    sink.start_element(&name, &attributes)?;
    for child in node.children() {
        if child.is_element() {
            replay(child, sink)?;
        } else if let Some(text) = child.text().filter(|_| child.is_text()) {
            sink.text(text)?;
        }
    }
    sink.end_element(&name)
}

struct Frame {
    kind: FoKind,
    name: QName,
    text: TextStyle,
    /// Set for block-level objects, which close with a `BlockEnd`.
    block: Option<BlockStyle>,
}

enum Capture {
    Static { flow_name: String, commands: Vec<LayoutCommand> },
    Cell(CellContent),
}

impl Capture {
    fn commands(&mut self) -> &mut Vec<LayoutCommand> {
        match self {
            Capture::Static { commands, .. } => commands,
            Capture::Cell(cell) => &mut cell.commands,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Footer,
    Body,
}

struct TableState {
    columns: Vec<ColumnWidth>,
    widths: Option<Vec<f32>>,
    x_offset: f32,
    width: f32,
    section: Section,
    row: Option<(QName, RowContent)>,
    header: Vec<PlacedRow>,
    footer: Vec<RowContent>,
    repeat_header: bool,
    rows_placed: usize,
}

struct Sequence {
    master: PageMaster,
    statics: Vec<StaticContent>,
    flow_started: bool,
}

/// An open PDF document receiving XSL-FO events.
pub struct FoSink<'w> {
    paginator: Paginator<'w>,
    creation_date: bool,
    stack: Vec<Frame>,
    masters: HashMap<String, PageMaster>,
    pending_master: Option<PageMaster>,
    sequence: Option<Sequence>,
    sequences: usize,
    capture: Option<Capture>,
    composer: Composer,
    in_flow: bool,
    table: Option<TableState>,
    paragraph: Vec<InlineRun>,
    title: Option<String>,
    title_text: Option<String>,
    root_closed: bool,
}

impl<'w> FoSink<'w> {
    pub fn new(paginator: Paginator<'w>, creation_date: bool) -> Self {
        let width = paginator.body().width;
        Self {
            paginator,
            creation_date,
            stack: Vec::new(),
            masters: HashMap::new(),
            pending_master: None,
            sequence: None,
            sequences: 0,
            capture: None,
            composer: Composer::new(width),
            in_flow: false,
            table: None,
            paragraph: Vec::new(),
            title: None,
            title_text: None,
            root_closed: false,
        }
    }

    fn parent_style(&self) -> TextStyle {
        self.stack.last().map(|f| f.text).unwrap_or_default()
    }

    /// Sends a command to the active capture, or composes and places it in the flow.
    fn emit(&mut self, command: LayoutCommand) -> Result<(), SinkError> {
        if let Some(capture) = self.capture.as_mut() {
            capture.commands().push(command);
            return Ok(());
        }
        if !self.in_flow {
            return Ok(());
        }
        let mut items: Vec<VItem> = Vec::new();
        self.composer.compose(&command, self.paginator.current_page_number(), &mut items);
        for item in &items {
            self.paginator.place(item, 0.0)?;
        }
        Ok(())
    }

    /// Emits buffered inline content as a paragraph of the innermost block.
    fn flush_paragraph(&mut self) -> Result<(), SinkError> {
        if self.paragraph.is_empty() {
            return Ok(());
        }
        let runs = std::mem::take(&mut self.paragraph);
        let visible = runs.iter().any(|r| match &r.content {
            InlineContent::Text(t) => !t.trim().is_empty(),
            InlineContent::PageNumber => true,
        });
        if !visible {
            return Ok(());
        }
        let style = self
            .stack
            .iter()
            .rev()
            .find(|f| f.kind == FoKind::Block)
            .map(|f| f.text)
            .unwrap_or_default();
        self.emit(LayoutCommand::Paragraph { runs, style })
    }

    fn start_page_sequence(&mut self, props: &Props<'_>, name: &QName) -> Result<(), SinkError> {
        let reference = props
            .get("master-reference")
            .ok_or_else(|| ValidationError::new(name.qualified(), "missing required property 'master-reference'"))?;
        let master = self.masters.get(reference).cloned().ok_or_else(|| {
            ValidationError::new(name.qualified(), format!("references undefined page master '{}'", reference))
        })?;
        log::debug!("Starting page sequence with master '{}'", master.name);
        self.sequence = Some(Sequence { master, statics: Vec::new(), flow_started: false });
        Ok(())
    }

    fn start_flow(&mut self) {
        if let Some(sequence) = self.sequence.as_mut() {
            sequence.flow_started = true;
            let statics = std::mem::take(&mut sequence.statics);
            self.paginator.begin_sequence(sequence.master.clone(), statics);
        }
        self.composer = Composer::new(self.paginator.body().width);
        self.in_flow = true;
    }

    fn end_page_sequence(&mut self) -> Result<(), SinkError> {
        if let Some(sequence) = self.sequence.take() {
            if !sequence.flow_started {
                self.paginator.begin_sequence(sequence.master, sequence.statics);
            }
        }
        self.paginator.end_sequence()?;
        self.sequences += 1;
        Ok(())
    }

    fn start_table(&mut self, props: &Props<'_>, name: &QName, style: &TextStyle) -> Result<BlockStyle, SinkError> {
        if self.capture.is_some() || self.table.is_some() {
            return Err(SinkError::Render(format!(
                "{} inside a table cell or static content is not supported",
                name.qualified()
            )));
        }
        let block = BlockStyle::from_props(props, style.size)?;
        self.emit(LayoutCommand::BlockStart(block))?;
        let (x_offset, available) = self.composer.content_box();
        let width = props.length_or_percent("width", style.size, available)?.unwrap_or(available);
        let repeat_header = match props.get("table-omit-header-at-break") {
            None | Some("false") => true,
            Some("true") => false,
            Some(other) => return Err(props.malformed("table-omit-header-at-break", other).into()),
        };
        self.table = Some(TableState {
            columns: Vec::new(),
            widths: None,
            x_offset,
            width,
            section: Section::Body,
            row: None,
            header: Vec::new(),
            footer: Vec::new(),
            repeat_header,
            rows_placed: 0,
        });
        Ok(block)
    }

    fn add_column(&mut self, props: &Props<'_>, style: &TextStyle) -> Result<(), SinkError> {
        let width = match props.get("column-width") {
            Some(v) => ColumnWidth::parse(v, style.size).ok_or_else(|| props.malformed("column-width", v))?,
            None => ColumnWidth::Proportional(1.0),
        };
        let repeat = match props.get("number-columns-repeated") {
            Some(v) => v.trim().parse::<usize>().ok().filter(|n| *n > 0).ok_or_else(|| props.malformed("number-columns-repeated", v))?,
            None => 1,
        };
        if let Some(table) = self.table.as_mut() {
            table.columns.extend(std::iter::repeat_n(width, repeat));
        }
        Ok(())
    }

    fn start_cell(&mut self, props: &Props<'_>, style: &TextStyle) -> Result<(), SinkError> {
        let span = match props.get("number-columns-spanned") {
            Some(v) => v.trim().parse::<usize>().ok().filter(|n| *n > 0).ok_or_else(|| props.malformed("number-columns-spanned", v))?,
            None => 1,
        };
        let style = BoxStyle::from_props(props, style.size)?;
        self.capture = Some(Capture::Cell(CellContent { span, style, commands: Vec::new() }));
        Ok(())
    }

    fn end_cell(&mut self) {
        if let Some(Capture::Cell(cell)) = self.capture.take() {
            if let Some((_, row)) = self.table.as_mut().and_then(|t| t.row.as_mut()) {
                row.cells.push(cell);
            }
        }
    }

    fn end_row(&mut self) -> Result<(), SinkError> {
        let page_number = self.paginator.current_page_number();
        let Some(table) = self.table.as_mut() else {
            return Ok(());
        };
        let Some((name, row)) = table.row.take() else {
            return Ok(());
        };

        let count = row.column_count();
        if table.widths.is_none() {
            let columns = if table.columns.is_empty() {
                vec![ColumnWidth::Proportional(1.0); count.max(1)]
            } else {
                table.columns.clone()
            };
            table.widths = Some(resolve_widths(&columns, table.width));
        }
        let widths = table.widths.as_deref().unwrap_or_default();
        if count > widths.len() {
            return Err(ValidationError::new(
                name.qualified(),
                format!("row spans {} columns but the table has {}", count, widths.len()),
            )
            .into());
        }

        match table.section {
            Section::Footer => table.footer.push(row),
            Section::Header => {
                let placed = layout_row(&row, widths, page_number);
                self.paginator.place_row(&placed, table.x_offset, &[])?;
                table.header.push(placed);
            }
            Section::Body => {
                let placed = layout_row(&row, widths, page_number);
                let repeat: &[PlacedRow] = if table.repeat_header { &table.header } else { &[] };
                self.paginator.place_row(&placed, table.x_offset, repeat)?;
                table.rows_placed += 1;
            }
        }
        Ok(())
    }

    fn end_table(&mut self, block: BlockStyle) -> Result<(), SinkError> {
        if let Some(table) = self.table.take() {
            if let Some(widths) = &table.widths {
                let repeat: &[PlacedRow] = if table.repeat_header { &table.header } else { &[] };
                for row in &table.footer {
                    let placed = layout_row(row, widths, self.paginator.current_page_number());
                    self.paginator.place_row(&placed, table.x_offset, repeat)?;
                }
            }
            log::debug!("Placed table with {} body rows", table.rows_placed);
        }
        // Following flow content continues below the table.
        self.emit(LayoutCommand::BlockEnd(block))
    }
}

impl MarkupHandler for FoSink<'_> {
    fn start_element(&mut self, name: &QName, attributes: &[Attribute]) -> Result<(), SinkError> {
        if self.root_closed {
            return Err(ValidationError::new(name.qualified(), "content after the end of fo:root").into());
        }
        let kind = classify(name)?;
        check_placement(self.stack.last().map(|f| (f.kind, &f.name)), kind, name)?;

        let props = Props::new(name, attributes);
        let text = self.parent_style().inherit(&props)?;
        let mut block = None;

        match kind {
            FoKind::SimplePageMaster => {
                let master_name = props
                    .get("master-name")
                    .ok_or_else(|| ValidationError::new(name.qualified(), "missing required property 'master-name'"))?;
                self.pending_master = Some(PageMaster::from_props(master_name, &props)?);
            }
            FoKind::RegionBody | FoKind::RegionBefore | FoKind::RegionAfter | FoKind::RegionStart | FoKind::RegionEnd => {
                if let Some(master) = self.pending_master.as_mut() {
                    master.apply_region(kind, &props)?;
                }
            }
            FoKind::PageSequence => self.start_page_sequence(&props, name)?,
            FoKind::Title => self.title_text = Some(String::new()),
            FoKind::StaticContent => {
                let flow_name = props
                    .get("flow-name")
                    .ok_or_else(|| ValidationError::new(name.qualified(), "missing required property 'flow-name'"))?;
                self.capture = Some(Capture::Static { flow_name: flow_name.to_string(), commands: Vec::new() });
            }
            FoKind::Flow => self.start_flow(),
            FoKind::Block | FoKind::BlockContainer => {
                self.flush_paragraph()?;
                let style = BlockStyle::from_props(&props, text.size)?;
                self.emit(LayoutCommand::BlockStart(style))?;
                block = Some(style);
            }
            FoKind::PageNumber => {
                if self.title_text.is_none() {
                    self.paragraph.push(InlineRun { content: InlineContent::PageNumber, style: text });
                }
            }
            FoKind::Table => {
                self.flush_paragraph()?;
                block = Some(self.start_table(&props, name, &text)?);
            }
            FoKind::TableColumn => self.add_column(&props, &text)?,
            FoKind::TableHeader | FoKind::TableFooter | FoKind::TableBody => {
                if let Some(table) = self.table.as_mut() {
                    table.section = match kind {
                        FoKind::TableHeader => Section::Header,
                        FoKind::TableFooter => Section::Footer,
                        _ => Section::Body,
                    };
                }
            }
            FoKind::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.row = Some((name.clone(), RowContent::default()));
                }
            }
            FoKind::TableCell => self.start_cell(&props, &text)?,
            FoKind::Root | FoKind::LayoutMasterSet | FoKind::Inline => {}
        }

        self.stack.push(Frame { kind, name: name.clone(), text, block });
        Ok(())
    }

    fn end_element(&mut self, name: &QName) -> Result<(), SinkError> {
        if matches!(self.stack.last().map(|f| f.kind), Some(FoKind::Block | FoKind::BlockContainer | FoKind::TableCell | FoKind::Flow | FoKind::StaticContent)) {
            self.flush_paragraph()?;
        }
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| SinkError::Render(format!("unbalanced end tag {}", name.qualified())))?;

        match frame.kind {
            FoKind::Root => self.root_closed = true,
            FoKind::SimplePageMaster => {
                if let Some(master) = self.pending_master.take() {
                    if self.masters.insert(master.name.clone(), master).is_some() {
                        log::warn!("Page master redefined; the last definition wins");
                    }
                }
            }
            FoKind::PageSequence => self.end_page_sequence()?,
            FoKind::Title => {
                let text = self.title_text.take().unwrap_or_default();
                let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if self.title.is_none() && !collapsed.is_empty() {
                    self.title = Some(collapsed);
                }
            }
            FoKind::StaticContent => {
                if let Some(Capture::Static { flow_name, commands }) = self.capture.take() {
                    if let Some(sequence) = self.sequence.as_mut() {
                        sequence.statics.push(StaticContent { flow_name, commands });
                    }
                }
            }
            FoKind::Flow => self.in_flow = false,
            FoKind::Block | FoKind::BlockContainer => {
                if let Some(style) = frame.block {
                    self.emit(LayoutCommand::BlockEnd(style))?;
                }
            }
            FoKind::Table => self.end_table(frame.block.unwrap_or_default())?,
            FoKind::TableRow => self.end_row()?,
            FoKind::TableCell => self.end_cell(),
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), SinkError> {
        if let Some(title) = self.title_text.as_mut() {
            title.push_str(text);
            return Ok(());
        }
        let Some(frame) = self.stack.last() else {
            if text.trim().is_empty() {
                return Ok(());
            }
            return Err(ValidationError::new("#document", "text outside of fo:root").into());
        };
        if !frame.kind.allows_text() {
            if text.trim().is_empty() {
                return Ok(());
            }
            return Err(ValidationError::new(frame.name.qualified(), "character data is not allowed here").into());
        }
        self.paragraph.push(InlineRun { content: InlineContent::Text(text.to_string()), style: frame.text });
        Ok(())
    }
}

impl DocumentSink for FoSink<'_> {
    fn finish(self: Box<Self>) -> Result<(), SinkError> {
        if !self.root_closed {
            return Err(ValidationError::new("fo:root", "document ended before fo:root was closed").into());
        }
        if self.sequences == 0 {
            return Err(ValidationError::new("fo:root", "document contains no fo:page-sequence").into());
        }
        let info = DocumentInfo { title: self.title, creation_date: self.creation_date };
        self.paginator.finish(info)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTERS: &str = r#"<fo:layout-master-set>
        <fo:simple-page-master master-name="A4" page-width="210mm" page-height="297mm" margin="20mm">
          <fo:region-body margin-bottom="15mm"/>
          <fo:region-after extent="10mm"/>
        </fo:simple-page-master>
      </fo:layout-master-set>"#;

    fn document(body: &str) -> String {
        format!(
            r#"<fo:root xmlns:fo="http://www.w3.org/1999/XSL/Format">{}<fo:page-sequence master-reference="A4">{}</fo:page-sequence></fo:root>"#,
            MASTERS, body
        )
    }

    fn render(fo: &str) -> Result<Vec<u8>, RenderError> {
        let mut out = Vec::new();
        format_markup(&FoFormatter::new().with_creation_date(false), fo, &mut out)?;
        Ok(out)
    }

    fn validation(err: RenderError) -> ValidationError {
        match err {
            RenderError::Sink(SinkError::Validation(v)) => v,
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    fn page_texts(pdf: &[u8]) -> Vec<String> {
        let doc = lopdf::Document::load_mem(pdf).unwrap();
        doc.get_pages()
            .into_values()
            .map(|id| String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).to_string())
            .collect()
    }

    #[test]
    fn renders_a_simple_document() {
        let pdf = render(&document(
            r#"<fo:title>Quarterly <fo:inline>report</fo:inline></fo:title>
               <fo:flow flow-name="xsl-region-body"><fo:block font-weight="bold">Hello, world</fo:block></fo:flow>"#,
        ))
        .unwrap();
        assert!(pdf.starts_with(b"%PDF-1.7"));
        let doc = lopdf::Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        let info = doc.trailer.get(b"Info").and_then(|o| o.as_reference()).unwrap();
        let title = doc.get_dictionary(info).unwrap().get(b"Title").unwrap().as_str().unwrap();
        assert_eq!(title, b"Quarterly report");
        assert!(page_texts(&pdf)[0].contains("(Hello, world)"));
    }

    #[test]
    fn rejects_unsupported_mime_types() {
        let mut out = Vec::new();
        {
            let result = FoFormatter::new().begin_document("text/plain", &mut out);
            assert!(matches!(result, Err(FormatError::UnsupportedMimeType(m)) if m == "text/plain"));
        }
        assert!(out.is_empty());
    }

    #[test]
    fn unknown_elements_are_validation_errors() {
        let err = render(&document(r#"<fo:flow flow-name="xsl-region-body"><fo:blok>x</fo:blok></fo:flow>"#)).unwrap_err();
        let v = validation(err);
        assert_eq!(v.element, "fo:blok");
        assert!(v.message.contains("unknown formatting object"));
    }

    #[test]
    fn misplaced_elements_and_text_are_rejected() {
        let err = render(&document(r#"<fo:flow flow-name="xsl-region-body"><fo:table-row/></fo:flow>"#)).unwrap_err();
        assert!(validation(err).message.contains("fo:flow"));

        let err = render(&document(r#"<fo:flow flow-name="xsl-region-body">loose text</fo:flow>"#)).unwrap_err();
        assert_eq!(validation(err).element, "fo:flow");
    }

    #[test]
    fn undefined_master_references_fail() {
        let fo = r#"<fo:root xmlns:fo="http://www.w3.org/1999/XSL/Format">
            <fo:layout-master-set><fo:simple-page-master master-name="A4"><fo:region-body/></fo:simple-page-master></fo:layout-master-set>
            <fo:page-sequence master-reference="Letter"><fo:flow flow-name="xsl-region-body"/></fo:page-sequence></fo:root>"#;
        let v = validation(render(fo).unwrap_err());
        assert_eq!(v.element, "fo:page-sequence");
        assert!(v.message.contains("Letter"));
    }

    #[test]
    fn documents_without_page_sequences_fail() {
        let fo = format!(r#"<fo:root xmlns:fo="http://www.w3.org/1999/XSL/Format">{}</fo:root>"#, MASTERS);
        assert!(validation(render(&fo).unwrap_err()).message.contains("page-sequence"));
    }

    #[test]
    fn malformed_properties_name_the_element() {
        let err = render(&document(r#"<fo:flow flow-name="xsl-region-body"><fo:block space-before="much">x</fo:block></fo:flow>"#)).unwrap_err();
        let v = validation(err);
        assert_eq!(v.element, "fo:block");
        assert!(v.message.contains("space-before"));
    }

    fn table(rows: usize) -> String {
        let mut body = String::new();
        for i in 0..rows {
            body.push_str(&format!(
                "<fo:table-row><fo:table-cell border=\"0.5pt solid black\"><fo:block>r{}</fo:block></fo:table-cell><fo:table-cell><fo:block>{}</fo:block></fo:table-cell></fo:table-row>",
                i,
                i * 10
            ));
        }
        document(&format!(
            r#"<fo:static-content flow-name="xsl-region-after"><fo:block>Page <fo:page-number/></fo:block></fo:static-content>
               <fo:flow flow-name="xsl-region-body"><fo:table>
                 <fo:table-column column-width="proportional-column-width(2)"/><fo:table-column/>
                 <fo:table-header><fo:table-row><fo:table-cell><fo:block>NAME</fo:block></fo:table-cell><fo:table-cell><fo:block>VALUE</fo:block></fo:table-cell></fo:table-row></fo:table-header>
                 <fo:table-body>{}</fo:table-body>
               </fo:table></fo:flow>"#,
            body
        ))
    }

    #[test]
    fn long_tables_repeat_their_header() {
        let pdf = render(&table(200)).unwrap();
        let pages = page_texts(&pdf);
        assert!(pages.len() > 1);
        for (i, page) in pages.iter().enumerate() {
            assert!(page.contains("(NAME)"));
            assert!(page.contains(&format!("(Page {})", i + 1)));
        }
        assert!(pages.last().unwrap().contains("(r199)"));
    }

    #[test]
    fn oversized_cells_flow_across_pages() {
        let words = (0..3000).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let fo = document(&format!(
            r#"<fo:flow flow-name="xsl-region-body"><fo:table><fo:table-column/><fo:table-column/>
                 <fo:table-header><fo:table-row><fo:table-cell><fo:block>NAME</fo:block></fo:table-cell><fo:table-cell><fo:block>VALUE</fo:block></fo:table-cell></fo:table-row></fo:table-header>
                 <fo:table-body><fo:table-row><fo:table-cell><fo:block>{}</fo:block></fo:table-cell><fo:table-cell><fo:block>1</fo:block></fo:table-cell></fo:table-row></fo:table-body>
               </fo:table></fo:flow>"#,
            words
        ));
        let pdf = render(&fo).unwrap();
        let doc = lopdf::Document::load_mem(&pdf).unwrap();
        let pages = doc.get_pages();
        assert!(pages.len() > 1);
        // A4 with 20mm margins.
        let (bottom, top) = (56.0, 841.89 - 56.0);
        for (_, id) in pages {
            let bytes = doc.get_page_content(id).unwrap();
            assert!(String::from_utf8_lossy(&bytes).contains("(NAME)"));
            let content = lopdf::content::Content::decode(&bytes).unwrap();
            for op in content.operations.iter().filter(|op| op.operator == "Td") {
                let y = op.operands[1].as_f32().unwrap();
                assert!(y >= bottom && y <= top, "line drawn outside the page at y={}", y);
            }
        }
        assert!(page_texts(&pdf).last().unwrap().contains("w2999"));
    }

    #[test]
    fn rows_wider_than_the_table_are_rejected() {
        let fo = document(
            r#"<fo:flow flow-name="xsl-region-body"><fo:table><fo:table-column/><fo:table-body>
                 <fo:table-row><fo:table-cell><fo:block>a</fo:block></fo:table-cell><fo:table-cell><fo:block>b</fo:block></fo:table-cell></fo:table-row>
               </fo:table-body></fo:table></fo:flow>"#,
        );
        let v = validation(render(&fo).unwrap_err());
        assert_eq!(v.element, "fo:table-row");
    }

    #[test]
    fn nested_tables_are_unsupported() {
        let fo = document(
            r#"<fo:flow flow-name="xsl-region-body"><fo:table><fo:table-body><fo:table-row><fo:table-cell>
                 <fo:table><fo:table-body/></fo:table>
               </fo:table-cell></fo:table-row></fo:table-body></fo:table></fo:flow>"#,
        );
        assert!(matches!(render(&fo), Err(RenderError::Sink(SinkError::Render(_)))));
    }

    #[test]
    fn output_is_deterministic_without_a_creation_date() {
        let fo = table(30);
        assert_eq!(render(&fo).unwrap(), render(&fo).unwrap());
    }

    #[test]
    fn unparsable_markup_is_a_parse_error() {
        assert!(matches!(render("<fo:root"), Err(RenderError::Parse(_))));
    }
}
