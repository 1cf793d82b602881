//! Turns block-level commands into vertically stacked lines.
//!
//! The formatter reports block boundaries and finished paragraphs as
//! [`LayoutCommand`]s. A [`Composer`] tracks indentation and converts each
//! command into [`VItem`]s, which the paginator places on pages. Cells and
//! static regions are composed the same way into a standalone list.

use crate::metrics::BaseFont;
use crate::properties::{BlockStyle, Color, TextAlign, TextStyle};

#[derive(Debug, Clone, PartialEq)]
pub enum InlineContent {
    Text(String),
    /// Resolved to the number of the page the paragraph is composed for.
    PageNumber,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineRun {
    pub content: InlineContent,
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutCommand {
    BlockStart(BlockStyle),
    BlockEnd(BlockStyle),
    /// Inline content of one block, with the block's own style for alignment
    /// and line height.
    Paragraph { runs: Vec<InlineRun>, style: TextStyle },
}

/// A run of text drawn with one font, positioned relative to its line.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyphs {
    pub x: f32,
    pub text: String,
    pub font: BaseFont,
    pub size: f32,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub height: f32,
    /// Distance from the top of the line to the baseline.
    pub baseline: f32,
    pub glyphs: Vec<Glyphs>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VItem {
    Space(f32),
    Line(Line),
    PageBreak,
}

impl VItem {
    pub fn height(&self) -> f32 {
        match self {
            VItem::Space(h) => *h,
            VItem::Line(line) => line.height,
            VItem::PageBreak => 0.0,
        }
    }
}

/// Converts commands into vertical items for a column of fixed width.
#[derive(Debug, Clone)]
pub struct Composer {
    width: f32,
    /// (start, end) indents of the open blocks, outermost first.
    indents: Vec<(f32, f32)>,
}

impl Composer {
    pub fn new(width: f32) -> Self {
        Self { width, indents: vec![(0.0, 0.0)] }
    }

    fn current(&self) -> (f32, f32) {
        self.indents.last().copied().unwrap_or((0.0, 0.0))
    }

    /// Offset and width of the content box at the current nesting.
    pub fn content_box(&self) -> (f32, f32) {
        let (start, end) = self.current();
        (start, (self.width - start - end).max(0.0))
    }

    pub fn compose(&mut self, command: &LayoutCommand, page_number: usize, out: &mut Vec<VItem>) {
        match command {
            LayoutCommand::BlockStart(style) => {
                if style.breaks.before {
                    out.push(VItem::PageBreak);
                }
                if style.space_before > 0.0 {
                    out.push(VItem::Space(style.space_before));
                }
                let (start, end) = self.current();
                self.indents.push((
                    style.start_indent.unwrap_or(start + style.margin_left),
                    style.end_indent.unwrap_or(end + style.margin_right),
                ));
            }
            LayoutCommand::BlockEnd(style) => {
                if self.indents.len() > 1 {
                    self.indents.pop();
                }
                if style.space_after > 0.0 {
                    out.push(VItem::Space(style.space_after));
                }
                if style.breaks.after {
                    out.push(VItem::PageBreak);
                }
            }
            LayoutCommand::Paragraph { runs, style } => {
                let (offset, width) = self.content_box();
                for mut line in wrap(runs, style, width, page_number) {
                    for g in &mut line.glyphs {
                        g.x += offset;
                    }
                    out.push(VItem::Line(line));
                }
            }
        }
    }

    /// Composes a complete command list, e.g. the content of a table cell.
    pub fn compose_all(&mut self, commands: &[LayoutCommand], page_number: usize) -> Vec<VItem> {
        let mut out = Vec::new();
        for command in commands {
            self.compose(command, page_number, &mut out);
        }
        out
    }
}

/// Total height of items composed outside the page flow. Page breaks are
/// meaningless there and take no space.
pub fn stacked_height(items: &[VItem]) -> f32 {
    items.iter().map(VItem::height).sum()
}

struct Piece {
    text: String,
    style: TextStyle,
    width: f32,
    /// Whitespace preceded this piece, so a line may break before it.
    space_before: bool,
}

struct Word {
    pieces: Vec<Piece>,
    width: f32,
    space_width: f32,
}

fn split_words(runs: &[InlineRun], page_number: usize) -> Vec<Word> {
    let mut words: Vec<Word> = Vec::new();
    let mut pending_space = false;

    for run in runs {
        let text = match &run.content {
            InlineContent::Text(t) => t.clone(),
            InlineContent::PageNumber => page_number.to_string(),
        };
        let mut token = String::new();
        let flush = |token: &mut String, pending_space: &mut bool, words: &mut Vec<Word>| {
            if token.is_empty() {
                return;
            }
            let width = run.style.font.text_width(token, run.style.size);
            let piece = Piece {
                text: std::mem::take(token),
                style: run.style,
                width,
                space_before: *pending_space,
            };
            match words.last_mut() {
                Some(word) if !piece.space_before => {
                    word.width += piece.width;
                    word.pieces.push(piece);
                }
                _ => words.push(Word {
                    space_width: piece.style.font.text_width(" ", piece.style.size),
                    width: piece.width,
                    pieces: vec![piece],
                }),
            }
            *pending_space = false;
        };
        for c in text.chars() {
            if c.is_whitespace() {
                flush(&mut token, &mut pending_space, &mut words);
                pending_space = true;
            } else {
                token.push(c);
            }
        }
        flush(&mut token, &mut pending_space, &mut words);
    }
    words
}

/// Greedy line breaking. A word wider than the line is placed on its own line
/// and overflows.
pub fn wrap(runs: &[InlineRun], style: &TextStyle, width: f32, page_number: usize) -> Vec<Line> {
    let words = split_words(runs, page_number);
    let mut lines: Vec<Vec<Word>> = Vec::new();
    let mut current: Vec<Word> = Vec::new();
    let mut current_width = 0.0;

    for word in words {
        let added = if current.is_empty() { word.width } else { word.space_width + word.width };
        if !current.is_empty() && current_width + added > width + 0.01 {
            lines.push(std::mem::take(&mut current));
            current_width = word.width;
        } else {
            current_width += added;
        }
        current.push(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    let count = lines.len();
    lines
        .into_iter()
        .enumerate()
        .map(|(i, words)| build_line(words, style, width, i + 1 == count))
        .collect()
}

fn build_line(words: Vec<Word>, style: &TextStyle, width: f32, last: bool) -> Line {
    let natural: f32 = words.iter().map(|w| w.width).sum::<f32>()
        + words.iter().skip(1).map(|w| w.space_width).sum::<f32>();
    let slack = (width - natural).max(0.0);
    let gaps = words.len().saturating_sub(1);

    let (mut x, extra_per_gap) = match style.align {
        TextAlign::Start => (0.0, 0.0),
        TextAlign::Center => (slack / 2.0, 0.0),
        TextAlign::End => (slack, 0.0),
        TextAlign::Justify if !last && gaps > 0 => (0.0, slack / gaps as f32),
        TextAlign::Justify => (0.0, 0.0),
    };

    // The block's own line height is the minimum; larger inline text grows the line.
    let mut height = style.line_height.resolve(style.size);
    let mut baseline: f32 = (height - style.size) / 2.0 + style.font.ascent(style.size);
    for piece in words.iter().flat_map(|w| &w.pieces) {
        let lh = style.line_height.resolve(piece.style.size);
        height = height.max(lh);
        baseline = baseline.max((lh - piece.style.size) / 2.0 + piece.style.font.ascent(piece.style.size));
    }

    let mut glyphs: Vec<Glyphs> = Vec::new();
    for (i, word) in words.into_iter().enumerate() {
        let gap = if i == 0 { 0.0 } else { word.space_width + extra_per_gap };
        let mut first_piece = true;
        for piece in word.pieces {
            let joined = match glyphs.last_mut() {
                Some(prev)
                    if prev.font == piece.style.font
                        && prev.size == piece.style.size
                        && prev.color == piece.style.color
                        && (!first_piece || i == 0 || extra_per_gap == 0.0) =>
                {
                    if first_piece && i > 0 {
                        prev.text.push(' ');
                    }
                    prev.text.push_str(&piece.text);
                    true
                }
                _ => false,
            };
            if first_piece {
                x += gap;
            }
            if !joined {
                glyphs.push(Glyphs {
                    x,
                    text: piece.text,
                    font: piece.style.font,
                    size: piece.style.size,
                    color: piece.style.color,
                });
            }
            x += piece.width;
            first_piece = false;
        }
    }
    Line { height, baseline, glyphs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::FontFamily;
    use crate::properties::LineHeight;

    fn style() -> TextStyle {
        TextStyle { size: 10.0, line_height: LineHeight::Factor(1.2), ..TextStyle::default() }
    }

    fn text(s: &str) -> InlineRun {
        InlineRun { content: InlineContent::Text(s.into()), style: style() }
    }

    fn line_text(line: &Line) -> String {
        line.glyphs.iter().map(|g| g.text.as_str()).collect::<Vec<_>>().join("|")
    }

    #[test]
    fn wraps_greedily() {
        // "aaaa" is 22.24pt wide at 10pt, a space 2.78pt.
        let lines = wrap(&[text("aaaa aaaa aaaa")], &style(), 50.0, 1);
        assert_eq!(lines.len(), 2);
        assert_eq!(line_text(&lines[0]), "aaaa aaaa");
        assert_eq!(line_text(&lines[1]), "aaaa");
        assert!((lines[0].height - 12.0).abs() < 0.001);
    }

    #[test]
    fn collapses_whitespace_and_keeps_styled_words_together() {
        let bold = TextStyle { font: BaseFont::new(FontFamily::Helvetica, true, false), ..style() };
        let runs = [
            text("  Total:\n  "),
            InlineRun { content: InlineContent::Text("30".into()), style: bold },
            text("pts"),
        ];
        let lines = wrap(&runs, &style(), 500.0, 1);
        assert_eq!(lines.len(), 1);
        assert_eq!(line_text(&lines[0]), "Total:|30|pts");
        assert_eq!(lines[0].glyphs[0].x, 0.0);
        // "30" follows a space; "pts" is attached to it.
        let after_bold = lines[0].glyphs[1].x + bold.font.text_width("30", 10.0);
        assert!((lines[0].glyphs[2].x - after_bold).abs() < 0.001);
    }

    #[test]
    fn alignment_offsets() {
        let right = TextStyle { align: TextAlign::End, ..style() };
        let lines = wrap(&[text("aaaa")], &right, 100.0, 1);
        assert!((lines[0].glyphs[0].x - (100.0 - 22.24)).abs() < 0.01);

        let justified = TextStyle { align: TextAlign::Justify, ..style() };
        let lines = wrap(&[text("aaaa aaaa aaaa")], &justified, 50.0, 1);
        // The first line is stretched to the full width, the last is not.
        let first = &lines[0].glyphs;
        assert_eq!(first.len(), 2);
        assert!((first[1].x + 22.24 - 50.0).abs() < 0.01);
        assert_eq!(lines[1].glyphs[0].x, 0.0);
    }

    #[test]
    fn page_numbers_resolve_when_composed() {
        let runs = [text("Page "), InlineRun { content: InlineContent::PageNumber, style: style() }];
        let lines = wrap(&runs, &style(), 200.0, 7);
        assert_eq!(line_text(&lines[0]), "Page 7");
    }

    #[test]
    fn blank_paragraphs_produce_no_lines() {
        assert!(wrap(&[text("   \n ")], &style(), 100.0, 1).is_empty());
    }

    #[test]
    fn composer_applies_indents_and_spacing() {
        let mut composer = Composer::new(200.0);
        let block = BlockStyle { space_before: 6.0, space_after: 4.0, margin_left: 20.0, ..BlockStyle::default() };
        let items = composer.compose_all(
            &[
                LayoutCommand::BlockStart(block),
                LayoutCommand::Paragraph { runs: vec![text("indented")], style: style() },
                LayoutCommand::BlockEnd(block),
            ],
            1,
        );
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], VItem::Space(6.0));
        let VItem::Line(line) = &items[1] else { panic!("expected a line") };
        assert_eq!(line.glyphs[0].x, 20.0);
        assert_eq!(items[2], VItem::Space(4.0));
        assert!((stacked_height(&items) - 22.0).abs() < 0.001);
        assert_eq!(composer.content_box(), (0.0, 200.0));
    }
}
