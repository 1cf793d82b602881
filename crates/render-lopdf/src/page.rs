//! Page geometry and the paginator that places composed items on pages.
//!
//! A page is written to the output as soon as it is full, so memory use is
//! bounded by one page of drawing operations regardless of document length.

use crate::layout::{Composer, LayoutCommand, Line, VItem};
use crate::metrics::{BaseFont, to_win_ansi};
use crate::properties::{BoxStyle, Color, Props, Sides};
use crate::table::{PlacedRow, RowSplit};
use crate::vocabulary::FoKind;
use crate::writer::{StreamingPdfWriter, text_string};
use folio_traits::ValidationError;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, StringFormat, dictionary};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io;

pub const A4_WIDTH: f32 = 595.28;
pub const A4_HEIGHT: f32 = 841.89;

/// A rectangle measured from the top-left corner of the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionSide {
    Before,
    After,
    Start,
    End,
}

/// A resolved `fo:simple-page-master`.
#[derive(Debug, Clone, PartialEq)]
pub struct PageMaster {
    pub name: String,
    pub width: f32,
    pub height: f32,
    pub margin: Sides,
    /// Margins of `fo:region-body` within the content rectangle.
    pub body_margin: Sides,
    pub extents: Sides,
    /// Region names for static content, indexed like `extents`.
    pub before_name: String,
    pub after_name: String,
    pub start_name: String,
    pub end_name: String,
}

impl PageMaster {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            width: A4_WIDTH,
            height: A4_HEIGHT,
            margin: Sides::default(),
            body_margin: Sides::default(),
            extents: Sides::default(),
            before_name: "xsl-region-before".into(),
            after_name: "xsl-region-after".into(),
            start_name: "xsl-region-start".into(),
            end_name: "xsl-region-end".into(),
        }
    }

    /// Reads page size and margins from a `fo:simple-page-master`.
    pub fn from_props(name: impl Into<String>, props: &Props<'_>) -> Result<Self, ValidationError> {
        let mut master = PageMaster::new(name);
        if let Some(w) = props.length("page-width", 12.0)? {
            master.width = w;
        }
        if let Some(h) = props.length("page-height", 12.0)? {
            master.height = h;
        }
        if master.width <= 0.0 || master.height <= 0.0 {
            return Err(props.malformed("page-width", &master.width.to_string()));
        }
        master.margin = props.sides("margin", 12.0)?;
        Ok(master)
    }

    /// Applies one of the region children of the page master.
    pub fn apply_region(&mut self, kind: FoKind, props: &Props<'_>) -> Result<(), ValidationError> {
        let side = match kind {
            FoKind::RegionBody => {
                self.body_margin = props.sides("margin", 12.0)?;
                return Ok(());
            }
            FoKind::RegionBefore => RegionSide::Before,
            FoKind::RegionAfter => RegionSide::After,
            FoKind::RegionStart => RegionSide::Start,
            FoKind::RegionEnd => RegionSide::End,
            _ => return Ok(()),
        };
        let extent = props.length("extent", 12.0)?.unwrap_or(0.0);
        let name = props.get("region-name").map(str::to_string);
        let (slot, region_name) = match side {
            RegionSide::Before => (&mut self.extents.top, &mut self.before_name),
            RegionSide::After => (&mut self.extents.bottom, &mut self.after_name),
            RegionSide::Start => (&mut self.extents.left, &mut self.start_name),
            RegionSide::End => (&mut self.extents.right, &mut self.end_name),
        };
        *slot = extent;
        if let Some(name) = name {
            *region_name = name;
        }
        Ok(())
    }

    fn content_rect(&self) -> Rect {
        let m = &self.margin;
        Rect {
            x: m.left,
            y: m.top,
            width: (self.width - m.left - m.right).max(0.0),
            height: (self.height - m.top - m.bottom).max(0.0),
        }
    }

    pub fn body(&self) -> Rect {
        let c = self.content_rect();
        let b = &self.body_margin;
        Rect {
            x: c.x + b.left,
            y: c.y + b.top,
            width: (c.width - b.left - b.right).max(0.0),
            height: (c.height - b.top - b.bottom).max(0.0),
        }
    }

    /// The rectangle of the region that `flow_name` targets, if any.
    pub fn region(&self, flow_name: &str) -> Option<Rect> {
        let c = self.content_rect();
        let e = &self.extents;
        if flow_name == self.before_name {
            Some(Rect { height: e.top, ..c })
        } else if flow_name == self.after_name {
            Some(Rect { y: c.y + c.height - e.bottom, height: e.bottom, ..c })
        } else if flow_name == self.start_name {
            Some(Rect { width: e.left, ..c })
        } else if flow_name == self.end_name {
            Some(Rect { x: c.x + c.width - e.right, width: e.right, ..c })
        } else {
            None
        }
    }
}

/// Assigns resource names to the fonts used, in order of first use.
#[derive(Debug, Default)]
pub struct FontRegistry {
    names: BTreeMap<BaseFont, String>,
}

impl FontRegistry {
    pub fn resource_name(&mut self, font: BaseFont) -> String {
        let next = self.names.len() + 1;
        self.names.entry(font).or_insert_with(|| format!("F{}", next)).clone()
    }

    pub fn to_dictionary(&self) -> Dictionary {
        let mut fonts = Dictionary::new();
        for (font, name) in &self.names {
            fonts.set(
                name.as_bytes().to_vec(),
                dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => font.postscript_name(),
                    "Encoding" => "WinAnsiEncoding",
                },
            );
        }
        fonts
    }
}

/// Content of a static region, recomposed for every page.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticContent {
    pub flow_name: String,
    pub commands: Vec<LayoutCommand>,
}

struct OpenPage {
    operations: Vec<Operation>,
    /// Distance from the top of the body region to the next free line.
    cursor: f32,
    has_content: bool,
}

/// Document-level metadata written to the `/Info` dictionary.
#[derive(Debug, Clone, Default)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub creation_date: bool,
}

pub struct Paginator<'w> {
    writer: StreamingPdfWriter<'w>,
    fonts: FontRegistry,
    master: PageMaster,
    statics: Vec<StaticContent>,
    page: Option<OpenPage>,
    /// Number of the last page opened, counted across sequences.
    page_number: usize,
    sequence_pages: usize,
}

impl<'w> Paginator<'w> {
    pub fn new(writer: StreamingPdfWriter<'w>) -> Self {
        Self {
            writer,
            fonts: FontRegistry::default(),
            master: PageMaster::new("default"),
            statics: Vec::new(),
            page: None,
            page_number: 0,
            sequence_pages: 0,
        }
    }

    pub fn begin_sequence(&mut self, master: PageMaster, statics: Vec<StaticContent>) {
        self.master = master;
        self.statics = statics;
        self.sequence_pages = 0;
    }

    pub fn body(&self) -> Rect {
        self.master.body()
    }

    /// The number of the page the next item would be placed on.
    pub fn current_page_number(&self) -> usize {
        if self.page.is_some() { self.page_number } else { self.page_number + 1 }
    }

    pub fn pages_written(&self) -> usize {
        self.writer.page_count()
    }

    fn at_top(&self) -> bool {
        self.page.as_ref().is_none_or(|p| !p.has_content)
    }

    fn cursor(&self) -> f32 {
        self.page.as_ref().map_or(0.0, |p| p.cursor)
    }

    /// Opens a page if none is open and draws its static content.
    fn ensure_page(&mut self) {
        if self.page.is_some() {
            return;
        }
        self.page_number += 1;
        self.sequence_pages += 1;
        let mut operations = Vec::new();
        for content in &self.statics {
            let Some(rect) = self.master.region(&content.flow_name) else {
                log::debug!("No region named '{}' on master '{}'", content.flow_name, self.master.name);
                continue;
            };
            let items = Composer::new(rect.width).compose_all(&content.commands, self.page_number);
            let mut y = rect.y;
            for item in &items {
                if let VItem::Line(line) = item {
                    draw_line(&mut operations, &mut self.fonts, self.master.height, line, rect.x, y);
                }
                y += item.height();
            }
        }
        self.page = Some(OpenPage { operations, cursor: 0.0, has_content: false });
    }

    /// Encodes the open page and writes it out.
    pub fn finish_page(&mut self) -> io::Result<()> {
        let Some(page) = self.page.take() else {
            return Ok(());
        };
        let content_id = self.writer.write_content_stream(Content { operations: page.operations })?;
        self.writer.write_page(content_id, self.master.width, self.master.height)?;
        log::debug!("Wrote page {} ({} bytes so far)", self.page_number, self.writer.bytes_written());
        Ok(())
    }

    /// Places one item from the flow, breaking to a new page when it does not fit.
    /// An item taller than an empty page is placed anyway and overflows.
    pub fn place(&mut self, item: &VItem, x_offset: f32) -> io::Result<()> {
        let body = self.body();
        match item {
            VItem::Space(h) => {
                if self.at_top() {
                    return Ok(());
                }
                if self.cursor() + h > body.height {
                    return self.finish_page();
                }
                if let Some(page) = self.page.as_mut() {
                    page.cursor += h;
                }
            }
            VItem::Line(line) => {
                if !self.at_top() && self.cursor() + line.height > body.height {
                    self.finish_page()?;
                }
                self.ensure_page();
                let page_height = self.master.height;
                if let Some(page) = self.page.as_mut() {
                    draw_line(&mut page.operations, &mut self.fonts, page_height, line, body.x + x_offset, body.y + page.cursor);
                    page.cursor += line.height;
                    page.has_content = true;
                }
            }
            VItem::PageBreak => {
                if !self.at_top() {
                    self.finish_page()?;
                }
            }
        }
        Ok(())
    }

    /// Places a table row. When the row starts a new page, `repeat` (the
    /// table header) is drawn above it first. A row that does not fit on a
    /// page of its own is split between lines and continues on the next page.
    pub fn place_row(&mut self, row: &PlacedRow, x_offset: f32, repeat: &[PlacedRow]) -> io::Result<()> {
        let body = self.body();
        let fresh_room = body.height - repeat.iter().map(|r| r.height).sum::<f32>();
        if !self.at_top() && self.cursor() + row.height > body.height && row.height <= fresh_room {
            self.break_table_page(x_offset, repeat)?;
        }

        let mut row = Cow::Borrowed(row);
        loop {
            self.ensure_page();
            let room = body.height - self.cursor();
            match row.split(room) {
                RowSplit::Fits => {
                    self.draw_row(&row, body.x + x_offset);
                    return Ok(());
                }
                RowSplit::Parts(head, tail) => {
                    self.draw_row(&head, body.x + x_offset);
                    self.break_table_page(x_offset, repeat)?;
                    row = Cow::Owned(tail);
                }
                // Nothing fits even below the repeated header: draw it and let it overflow.
                RowSplit::NoRoom if room >= fresh_room => {
                    self.draw_row(&row, body.x + x_offset);
                    return Ok(());
                }
                RowSplit::NoRoom => self.break_table_page(x_offset, repeat)?,
            }
        }
    }

    fn break_table_page(&mut self, x_offset: f32, repeat: &[PlacedRow]) -> io::Result<()> {
        self.finish_page()?;
        self.ensure_page();
        let x = self.body().x + x_offset;
        for header in repeat {
            self.draw_row(header, x);
        }
        Ok(())
    }

    fn draw_row(&mut self, row: &PlacedRow, x: f32) {
        let page_height = self.master.height;
        let body = self.master.body();
        let fonts = &mut self.fonts;
        let Some(page) = self.page.as_mut() else {
            return;
        };
        let top = body.y + page.cursor;
        for cell in &row.cells {
            let cell_x = x + cell.x;
            draw_box(&mut page.operations, page_height, &cell.style, cell_x, top, cell.width, row.height);
            let s = &cell.style;
            let mut y = top + s.border.top + s.padding.top;
            for item in &cell.items {
                if let VItem::Line(line) = item {
                    draw_line(&mut page.operations, fonts, page_height, line, cell_x + s.border.left + s.padding.left, y);
                }
                y += item.height();
            }
        }
        page.cursor += row.height;
        page.has_content = true;
    }

    /// Closes a page sequence. Every sequence produces at least one page.
    pub fn end_sequence(&mut self) -> io::Result<()> {
        if self.sequence_pages == 0 {
            self.ensure_page();
        }
        self.finish_page()
    }

    /// Writes the document trailer. Consumes the paginator.
    pub fn finish(mut self, info: DocumentInfo) -> io::Result<()> {
        self.finish_page()?;
        let mut dict = dictionary! { "Producer" => text_string(concat!("folio ", env!("CARGO_PKG_VERSION"))) };
        if let Some(title) = &info.title {
            dict.set("Title", text_string(title));
        }
        if info.creation_date {
            let stamp = chrono::Local::now().format("D:%Y%m%d%H%M%S").to_string();
            dict.set("CreationDate", Object::String(stamp.into_bytes(), StringFormat::Literal));
        }
        let pages = self.writer.page_count();
        self.writer.finish(self.fonts.to_dictionary(), Some(dict))?;
        log::debug!("Finished PDF with {} pages", pages);
        Ok(())
    }
}

fn color_operands(c: Color) -> Vec<Object> {
    vec![c.r.into(), c.g.into(), c.b.into()]
}

/// Draws one line whose top edge is at `top` (measured from the page top).
fn draw_line(ops: &mut Vec<Operation>, fonts: &mut FontRegistry, page_height: f32, line: &Line, x: f32, top: f32) {
    let baseline = page_height - (top + line.baseline);
    for glyphs in &line.glyphs {
        let name = fonts.resource_name(glyphs.font);
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec![Object::Name(name.into_bytes()), glyphs.size.into()]));
        ops.push(Operation::new("rg", color_operands(glyphs.color)));
        ops.push(Operation::new("Td", vec![(x + glyphs.x).into(), baseline.into()]));
        ops.push(Operation::new("Tj", vec![Object::String(to_win_ansi(&glyphs.text), StringFormat::Literal)]));
        ops.push(Operation::new("ET", vec![]));
    }
}

/// Background and borders of a box whose top-left corner is at (`x`, `top`).
fn draw_box(ops: &mut Vec<Operation>, page_height: f32, style: &BoxStyle, x: f32, top: f32, width: f32, height: f32) {
    let bottom = page_height - top - height;
    if let Some(bg) = style.background {
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("rg", color_operands(bg)));
        ops.push(Operation::new("re", vec![x.into(), bottom.into(), width.into(), height.into()]));
        ops.push(Operation::new("f", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }
    let Some(color) = style.border_color else {
        return;
    };
    let b = &style.border;
    let y_top = page_height - top;
    let right = x + width;
    let edges = [
        (b.top, (x, y_top), (right, y_top)),
        (b.bottom, (x, bottom), (right, bottom)),
        (b.left, (x, bottom), (x, y_top)),
        (b.right, (right, bottom), (right, y_top)),
    ];
    for (w, from, to) in edges {
        if w <= 0.0 {
            continue;
        }
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("w", vec![w.into()]));
        ops.push(Operation::new("RG", color_operands(color)));
        ops.push(Operation::new("m", vec![from.0.into(), from.1.into()]));
        ops.push(Operation::new("l", vec![to.0.into(), to.1.into()]));
        ops.push(Operation::new("S", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Glyphs;
    use crate::metrics::FontFamily;
    use crate::table::PlacedCell;
    use folio_traits::{Attribute, QName};

    fn line(text: &str, height: f32) -> VItem {
        VItem::Line(Line {
            height,
            baseline: height * 0.8,
            glyphs: vec![Glyphs {
                x: 0.0,
                text: text.into(),
                font: BaseFont::new(FontFamily::Helvetica, false, false),
                size: 10.0,
                color: Color::BLACK,
            }],
        })
    }

    fn small_master() -> PageMaster {
        PageMaster { width: 200.0, height: 100.0, margin: Sides::all(10.0), ..PageMaster::new("small") }
    }

    fn page_count(out: &[u8]) -> usize {
        lopdf::Document::load_mem(out).unwrap().get_pages().len()
    }

    #[test]
    fn master_geometry() {
        let name = QName::local("simple-page-master");
        let attrs = [Attribute::new("page-width", "8.5in"), Attribute::new("page-height", "11in"), Attribute::new("margin", "36pt")];
        let mut master = PageMaster::from_props("letter", &Props::new(&name, &attrs)).unwrap();
        let region = QName::local("region-after");
        let attrs = [Attribute::new("extent", "20pt")];
        master.apply_region(FoKind::RegionAfter, &Props::new(&region, &attrs)).unwrap();

        assert_eq!(master.width, 612.0);
        assert_eq!(master.body(), Rect { x: 36.0, y: 36.0, width: 540.0, height: 720.0 });
        let after = master.region("xsl-region-after").unwrap();
        assert_eq!(after.y, 736.0);
        assert_eq!(after.height, 20.0);
        assert!(master.region("elsewhere").is_none());
    }

    #[test]
    fn font_names_follow_first_use() {
        let mut fonts = FontRegistry::default();
        let bold = BaseFont::new(FontFamily::Helvetica, true, false);
        let regular = BaseFont::new(FontFamily::Helvetica, false, false);
        assert_eq!(fonts.resource_name(bold), "F1");
        assert_eq!(fonts.resource_name(regular), "F2");
        assert_eq!(fonts.resource_name(bold), "F1");
        assert_eq!(fonts.to_dictionary().len(), 2);
    }

    #[test]
    fn lines_overflow_onto_new_pages() {
        let mut out = Vec::new();
        {
            let mut paginator = Paginator::new(StreamingPdfWriter::new(&mut out, "1.7").unwrap());
            paginator.begin_sequence(small_master(), Vec::new());
            // The body is 80pt tall: four 20pt lines fit on a page.
            for i in 0..10 {
                paginator.place(&line(&format!("line {}", i), 20.0), 0.0).unwrap();
            }
            assert_eq!(paginator.pages_written(), 2);
            paginator.end_sequence().unwrap();
            paginator.finish(DocumentInfo::default()).unwrap();
        }
        assert_eq!(page_count(&out), 3);
    }

    #[test]
    fn space_at_page_top_is_dropped_and_breaks_are_honoured() {
        let mut out = Vec::new();
        let mut paginator = Paginator::new(StreamingPdfWriter::new(&mut out, "1.7").unwrap());
        paginator.begin_sequence(small_master(), Vec::new());
        paginator.place(&VItem::Space(50.0), 0.0).unwrap();
        paginator.place(&VItem::PageBreak, 0.0).unwrap();
        assert_eq!(paginator.current_page_number(), 1);
        paginator.place(&line("a", 20.0), 0.0).unwrap();
        assert_eq!(paginator.cursor(), 20.0);
        paginator.place(&VItem::PageBreak, 0.0).unwrap();
        assert_eq!(paginator.pages_written(), 1);
        assert_eq!(paginator.current_page_number(), 2);
    }

    #[test]
    fn empty_sequences_still_produce_a_page() {
        let mut out = Vec::new();
        {
            let mut paginator = Paginator::new(StreamingPdfWriter::new(&mut out, "1.7").unwrap());
            paginator.begin_sequence(small_master(), Vec::new());
            paginator.end_sequence().unwrap();
            paginator.finish(DocumentInfo { title: Some("Empty".into()), creation_date: false }).unwrap();
        }
        assert_eq!(page_count(&out), 1);
    }

    #[test]
    fn header_rows_repeat_after_a_break() {
        let row = |text: &str| PlacedRow {
            height: 30.0,
            cells: vec![PlacedCell { x: 0.0, width: 100.0, style: BoxStyle::default(), items: vec![line(text, 30.0)] }],
        };
        let header = vec![row("HEADER")];
        let mut out = Vec::new();
        {
            let mut paginator = Paginator::new(StreamingPdfWriter::new(&mut out, "1.7").unwrap());
            paginator.begin_sequence(small_master(), Vec::new());
            paginator.place_row(&header[0], 0.0, &[]).unwrap();
            for i in 0..2 {
                paginator.place_row(&row(&format!("row {}", i)), 0.0, &header).unwrap();
            }
            paginator.end_sequence().unwrap();
            paginator.finish(DocumentInfo::default()).unwrap();
        }
        let doc = lopdf::Document::load_mem(&out).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);
        for (_, id) in pages {
            let content = doc.get_page_content(id).unwrap();
            assert!(String::from_utf8_lossy(&content).contains("HEADER"));
        }
    }

    #[test]
    fn rows_taller_than_a_page_continue_below_the_header() {
        let header = PlacedRow {
            height: 20.0,
            cells: vec![PlacedCell { x: 0.0, width: 100.0, style: BoxStyle::default(), items: vec![line("HEADER", 20.0)] }],
        };
        let items: Vec<VItem> = (0..12).map(|i| line(&format!("part {}", i), 20.0)).collect();
        let tall = PlacedRow {
            height: 240.0,
            cells: vec![PlacedCell { x: 0.0, width: 100.0, style: BoxStyle::default(), items }],
        };
        let mut out = Vec::new();
        {
            let mut paginator = Paginator::new(StreamingPdfWriter::new(&mut out, "1.7").unwrap());
            paginator.begin_sequence(small_master(), Vec::new());
            paginator.place_row(&header, 0.0, &[]).unwrap();
            paginator.place_row(&tall, 0.0, std::slice::from_ref(&header)).unwrap();
            paginator.end_sequence().unwrap();
            paginator.finish(DocumentInfo::default()).unwrap();
        }

        let doc = lopdf::Document::load_mem(&out).unwrap();
        let pages = doc.get_pages();
        // 60pt below the header holds three of the twelve lines per page.
        assert_eq!(pages.len(), 4);
        let mut parts = 0;
        for (_, id) in pages {
            let bytes = doc.get_page_content(id).unwrap();
            assert!(String::from_utf8_lossy(&bytes).contains("HEADER"));
            let content = Content::decode(&bytes).unwrap();
            for op in content.operations.iter().filter(|op| op.operator == "Td") {
                let y = op.operands[1].as_float().unwrap();
                assert!(y >= 10.0 && y <= 90.0, "line drawn outside the page body at y={}", y);
            }
            parts += content.operations.iter().filter(|op| op.operator == "Tj").count() - 1;
        }
        assert_eq!(parts, 12);
    }

    #[test]
    fn static_content_is_drawn_with_the_page_number() {
        use crate::layout::{InlineContent, InlineRun};
        use crate::properties::TextStyle;

        let mut master = small_master();
        master.extents.bottom = 15.0;
        let style = TextStyle::default();
        let statics = vec![StaticContent {
            flow_name: "xsl-region-after".into(),
            commands: vec![LayoutCommand::Paragraph {
                runs: vec![
                    InlineRun { content: InlineContent::Text("Page ".into()), style },
                    InlineRun { content: InlineContent::PageNumber, style },
                ],
                style,
            }],
        }];
        let mut out = Vec::new();
        {
            let mut paginator = Paginator::new(StreamingPdfWriter::new(&mut out, "1.7").unwrap());
            paginator.begin_sequence(master, statics);
            for _ in 0..5 {
                paginator.place(&line("x", 20.0), 0.0).unwrap();
            }
            paginator.end_sequence().unwrap();
            paginator.finish(DocumentInfo::default()).unwrap();
        }
        let doc = lopdf::Document::load_mem(&out).unwrap();
        let pages: Vec<_> = doc.get_pages().into_values().collect();
        let second = String::from_utf8_lossy(&doc.get_page_content(pages[1]).unwrap()).to_string();
        assert!(second.contains("(Page 2)"));
    }
}
