//! Column width resolution and row layout for `fo:table`.

use crate::layout::{Composer, LayoutCommand, VItem, stacked_height};
use crate::properties::{BoxStyle, parse_length};

/// A declared `column-width`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnWidth {
    Fixed(f32),
    Percent(f32),
    /// `proportional-column-width(n)`, or an unspecified width (a share of 1).
    Proportional(f32),
}

impl ColumnWidth {
    pub fn parse(value: &str, font_size: f32) -> Option<ColumnWidth> {
        let v = value.trim();
        if let Some(args) = v.strip_prefix("proportional-column-width(").and_then(|s| s.strip_suffix(')')) {
            return args.trim().parse::<f32>().ok().filter(|n| *n > 0.0).map(ColumnWidth::Proportional);
        }
        if v == "auto" {
            return Some(ColumnWidth::Proportional(1.0));
        }
        if let Some(pct) = v.strip_suffix('%') {
            return pct.trim().parse::<f32>().ok().map(ColumnWidth::Percent);
        }
        parse_length(v, font_size).map(ColumnWidth::Fixed)
    }
}

/// Distributes `total` over the columns: fixed and percentage widths first,
/// then the remainder by proportional share.
pub fn resolve_widths(columns: &[ColumnWidth], total: f32) -> Vec<f32> {
    let mut used = 0.0;
    let mut shares = 0.0;
    for column in columns {
        match column {
            ColumnWidth::Fixed(w) => used += w,
            ColumnWidth::Percent(p) => used += total * p / 100.0,
            ColumnWidth::Proportional(n) => shares += n,
        }
    }
    let remaining = (total - used).max(0.0);
    columns
        .iter()
        .map(|column| match column {
            ColumnWidth::Fixed(w) => *w,
            ColumnWidth::Percent(p) => total * p / 100.0,
            ColumnWidth::Proportional(n) if shares > 0.0 => remaining * n / shares,
            ColumnWidth::Proportional(_) => 0.0,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellContent {
    pub span: usize,
    pub style: BoxStyle,
    pub commands: Vec<LayoutCommand>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowContent {
    pub cells: Vec<CellContent>,
}

impl RowContent {
    pub fn column_count(&self) -> usize {
        self.cells.iter().map(|c| c.span).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedCell {
    /// Offset from the table's left edge.
    pub x: f32,
    pub width: f32,
    pub style: BoxStyle,
    pub items: Vec<VItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedRow {
    pub height: f32,
    pub cells: Vec<PlacedCell>,
}

/// How much of a row fits in the room left on a page.
#[derive(Debug, Clone, PartialEq)]
pub enum RowSplit {
    Fits,
    /// The part that fits, stretched to the room given, and the rest.
    Parts(PlacedRow, PlacedRow),
    /// Not even one line of any cell fits.
    NoRoom,
}

fn vertical_insets(style: &BoxStyle) -> f32 {
    style.padding.top + style.padding.bottom + style.border.top + style.border.bottom
}

fn measured_height(cells: &[PlacedCell]) -> f32 {
    cells.iter().map(|c| stacked_height(&c.items) + vertical_insets(&c.style)).fold(0.0, f32::max)
}

impl PlacedRow {
    /// Breaks cell content between lines so the first part is at most `room`
    /// tall. Every cell keeps its box in both parts.
    pub fn split(&self, room: f32) -> RowSplit {
        if self.height <= room {
            return RowSplit::Fits;
        }
        let mut head = Vec::with_capacity(self.cells.len());
        let mut tail = Vec::with_capacity(self.cells.len());
        let mut progressed = false;
        for cell in &self.cells {
            let available = room - vertical_insets(&cell.style);
            let mut used = 0.0;
            let taken = cell
                .items
                .iter()
                .take_while(|item| {
                    used += item.height();
                    used <= available
                })
                .count();
            progressed |= cell.items[..taken].iter().any(|item| matches!(item, VItem::Line(_)));
            // Space at the top of the continuation is dropped, as at a page top.
            let rest: Vec<VItem> =
                cell.items[taken..].iter().skip_while(|item| !matches!(item, VItem::Line(_))).cloned().collect();
            head.push(PlacedCell { items: cell.items[..taken].to_vec(), ..cell.clone() });
            tail.push(PlacedCell { items: rest, ..cell.clone() });
        }
        if !progressed {
            return RowSplit::NoRoom;
        }
        let tail_height = measured_height(&tail);
        RowSplit::Parts(PlacedRow { height: room, cells: head }, PlacedRow { height: tail_height, cells: tail })
    }
}

/// Lays out one row. Cells beyond the last column are dropped; callers
/// validate column counts before this point.
pub fn layout_row(row: &RowContent, widths: &[f32], page_number: usize) -> PlacedRow {
    let mut cells = Vec::with_capacity(row.cells.len());
    let mut column = 0;
    let mut x = 0.0;
    let mut height: f32 = 0.0;

    for cell in &row.cells {
        if column >= widths.len() {
            break;
        }
        let end = (column + cell.span.max(1)).min(widths.len());
        let width: f32 = widths[column..end].iter().sum();
        column = end;

        let s = &cell.style;
        let inner = width - s.padding.left - s.padding.right - s.border.left - s.border.right;
        let items = Composer::new(inner.max(0.0)).compose_all(&cell.commands, page_number);
        height = height.max(stacked_height(&items) + vertical_insets(s));

        cells.push(PlacedCell { x, width, style: cell.style, items });
        x += width;
    }
    PlacedRow { height, cells }
}
