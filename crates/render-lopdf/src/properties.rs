//! Parsing of FO property values and the computed styles derived from them.

use crate::metrics::{BaseFont, FontFamily};
use folio_traits::{Attribute, QName, ValidationError, attribute_value};

pub const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Parses a length such as `10pt`, `2.5cm`, `1.2em` or `0`.
pub fn parse_length(value: &str, font_size: f32) -> Option<f32> {
    let v = value.trim();
    let split = v
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(v.len());
    let (number, unit) = v.split_at(split);
    let n: f32 = number.parse().ok()?;
    let factor = match unit.trim() {
        "pt" => 1.0,
        "px" => 0.75,
        "in" => 72.0,
        "cm" => 72.0 / 2.54,
        "mm" => 72.0 / 25.4,
        "pc" => 12.0,
        "em" => font_size,
        "" if n == 0.0 => 0.0,
        _ => return None,
    };
    Some(n * factor)
}

/// A length, or a percentage of `reference`.
pub fn parse_length_or_percent(value: &str, font_size: f32, reference: f32) -> Option<f32> {
    match value.trim().strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f32>().ok().map(|p| p * reference / 100.0),
        None => parse_length(value, font_size),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0 };

    fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color { r: r as f32 / 255.0, g: g as f32 / 255.0, b: b as f32 / 255.0 }
    }
}

/// `#rgb`, `#rrggbb`, `rgb(r, g, b)` or a basic color keyword.
/// `transparent` parses to `None`.
pub fn parse_color(value: &str) -> Option<Option<Color>> {
    let v = value.trim().to_ascii_lowercase();
    if v == "transparent" {
        return Some(None);
    }
    if let Some(hex) = v.strip_prefix('#') {
        let digits: Vec<u8> = hex.chars().map(|c| c.to_digit(16).map(|d| d as u8)).collect::<Option<_>>()?;
        return match digits.as_slice() {
            [r, g, b] => Some(Some(Color::rgb(r * 17, g * 17, b * 17))),
            [r1, r2, g1, g2, b1, b2] => Some(Some(Color::rgb(r1 * 16 + r2, g1 * 16 + g2, b1 * 16 + b2))),
            _ => None,
        };
    }
    if let Some(args) = v.strip_prefix("rgb(").and_then(|s| s.strip_suffix(')')) {
        let parts: Vec<u8> = args.split(',').map(|p| p.trim().parse::<u8>().ok()).collect::<Option<_>>()?;
        return match parts.as_slice() {
            [r, g, b] => Some(Some(Color::rgb(*r, *g, *b))),
            _ => None,
        };
    }
    let (r, g, b) = match v.as_str() {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "lime" => (0, 255, 0),
        "blue" => (0, 0, 255),
        "navy" => (0, 0, 128),
        "gray" | "grey" => (128, 128, 128),
        "silver" => (192, 192, 192),
        "lightgray" | "lightgrey" => (211, 211, 211),
        "maroon" => (128, 0, 0),
        "yellow" => (255, 255, 0),
        "olive" => (128, 128, 0),
        "orange" => (255, 165, 0),
        "purple" => (128, 0, 128),
        "fuchsia" => (255, 0, 255),
        "teal" => (0, 128, 128),
        "aqua" => (0, 255, 255),
        _ => return None,
    };
    Some(Some(Color::rgb(r, g, b)))
}

/// Attribute access for one element, producing validation errors that name it.
pub struct Props<'e> {
    element: &'e QName,
    attributes: &'e [Attribute],
}

impl<'e> Props<'e> {
    pub fn new(element: &'e QName, attributes: &'e [Attribute]) -> Self {
        Self { element, attributes }
    }

    pub fn get(&self, name: &str) -> Option<&'e str> {
        attribute_value(self.attributes, name)
    }

    pub fn malformed(&self, name: &str, value: &str) -> ValidationError {
        ValidationError::new(self.element.qualified(), format!("malformed value '{}' for property '{}'", value, name))
    }

    pub fn length(&self, name: &str, font_size: f32) -> Result<Option<f32>, ValidationError> {
        self.get(name)
            .map(|v| parse_length(v, font_size).ok_or_else(|| self.malformed(name, v)))
            .transpose()
    }

    pub fn length_or_percent(&self, name: &str, font_size: f32, reference: f32) -> Result<Option<f32>, ValidationError> {
        self.get(name)
            .map(|v| parse_length_or_percent(v, font_size, reference).ok_or_else(|| self.malformed(name, v)))
            .transpose()
    }

    /// The first of `names` that is present, as a length.
    pub fn first_length(&self, names: &[&str], font_size: f32) -> Result<Option<f32>, ValidationError> {
        for name in names {
            if let Some(v) = self.length(name, font_size)? {
                return Ok(Some(v));
            }
        }
        Ok(None)
    }

    pub fn color(&self, name: &str) -> Result<Option<Option<Color>>, ValidationError> {
        self.get(name)
            .map(|v| parse_color(v).ok_or_else(|| self.malformed(name, v)))
            .transpose()
    }

    /// Four sides from a `prefix` shorthand (one to four values, CSS order)
    /// overridden by `prefix-top` and friends.
    pub fn sides(&self, prefix: &str, font_size: f32) -> Result<Sides, ValidationError> {
        let mut sides = Sides::default();
        if let Some(v) = self.get(prefix) {
            let values: Vec<f32> = v
                .split_whitespace()
                .map(|part| parse_length(part, font_size))
                .collect::<Option<_>>()
                .ok_or_else(|| self.malformed(prefix, v))?;
            sides = match values.as_slice() {
                [all] => Sides::all(*all),
                [vertical, horizontal] => Sides { top: *vertical, right: *horizontal, bottom: *vertical, left: *horizontal },
                [top, horizontal, bottom] => Sides { top: *top, right: *horizontal, bottom: *bottom, left: *horizontal },
                [top, right, bottom, left] => Sides { top: *top, right: *right, bottom: *bottom, left: *left },
                _ => return Err(self.malformed(prefix, v)),
            };
        }
        for (side, slot) in [
            ("top", &mut sides.top),
            ("right", &mut sides.right),
            ("bottom", &mut sides.bottom),
            ("left", &mut sides.left),
        ] {
            if let Some(v) = self.length(&format!("{}-{}", prefix, side), font_size)? {
                *slot = v;
            }
        }
        Ok(sides)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sides {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Sides {
    pub fn all(v: f32) -> Self {
        Self { top: v, right: v, bottom: v, left: v }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Start,
    Center,
    End,
    Justify,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineHeight {
    /// A multiple of the font size; `normal` is 1.2.
    Factor(f32),
    Fixed(f32),
}

impl LineHeight {
    pub fn resolve(&self, font_size: f32) -> f32 {
        match self {
            LineHeight::Factor(f) => f * font_size,
            LineHeight::Fixed(v) => *v,
        }
    }
}

/// Inherited character and paragraph properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: BaseFont,
    pub size: f32,
    pub color: Color,
    pub align: TextAlign,
    pub line_height: LineHeight,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font: BaseFont::new(FontFamily::Helvetica, false, false),
            size: DEFAULT_FONT_SIZE,
            color: Color::BLACK,
            align: TextAlign::Start,
            line_height: LineHeight::Factor(1.2),
        }
    }
}

impl TextStyle {
    /// The style of an element whose parent has style `self`.
    pub fn inherit(&self, props: &Props<'_>) -> Result<TextStyle, ValidationError> {
        let mut style = *self;

        if let Some(family) = props.get("font-family") {
            style.font.family = FontFamily::from_property(family);
        }
        if let Some(weight) = props.get("font-weight") {
            style.font.bold = match weight.trim() {
                "bold" | "bolder" | "600" | "700" | "800" | "900" => true,
                "normal" | "lighter" | "100" | "200" | "300" | "400" | "500" => false,
                _ => return Err(props.malformed("font-weight", weight)),
            };
        }
        if let Some(font_style) = props.get("font-style") {
            style.font.italic = match font_style.trim() {
                "italic" | "oblique" => true,
                "normal" => false,
                _ => return Err(props.malformed("font-style", font_style)),
            };
        }
        if let Some(size) = props.get("font-size") {
            style.size = match size.trim() {
                "xx-small" => 7.0,
                "x-small" => 8.0,
                "small" => 10.0,
                "medium" => 12.0,
                "large" => 14.0,
                "x-large" => 18.0,
                "xx-large" => 24.0,
                "smaller" => self.size / 1.2,
                "larger" => self.size * 1.2,
                other => parse_length_or_percent(other, self.size, self.size)
                    .filter(|s| *s > 0.0)
                    .ok_or_else(|| props.malformed("font-size", size))?,
            };
        }
        if let Some(color) = props.color("color")? {
            style.color = color.unwrap_or(Color::BLACK);
        }
        if let Some(align) = props.get("text-align") {
            style.align = match align.trim() {
                "start" | "left" | "inside" => TextAlign::Start,
                "center" => TextAlign::Center,
                "end" | "right" | "outside" => TextAlign::End,
                "justify" => TextAlign::Justify,
                _ => return Err(props.malformed("text-align", align)),
            };
        }
        if let Some(lh) = props.get("line-height") {
            let v = lh.trim();
            style.line_height = if v == "normal" {
                LineHeight::Factor(1.2)
            } else if let Ok(factor) = v.parse::<f32>() {
                LineHeight::Factor(factor)
            } else if let Some(pct) = v.strip_suffix('%') {
                LineHeight::Factor(pct.trim().parse::<f32>().map_err(|_| props.malformed("line-height", lh))? / 100.0)
            } else {
                LineHeight::Fixed(parse_length(v, style.size).ok_or_else(|| props.malformed("line-height", lh))?)
            };
        }
        Ok(style)
    }
}

/// Whether a page break is forced before or after a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Breaks {
    pub before: bool,
    pub after: bool,
}

/// Non-inherited properties of a block-level object.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BlockStyle {
    pub space_before: f32,
    pub space_after: f32,
    /// Absolute `start-indent`, if specified.
    pub start_indent: Option<f32>,
    pub end_indent: Option<f32>,
    /// Relative `margin-left`/`margin-right`.
    pub margin_left: f32,
    pub margin_right: f32,
    pub breaks: Breaks,
}

impl BlockStyle {
    pub fn from_props(props: &Props<'_>, font_size: f32) -> Result<BlockStyle, ValidationError> {
        let margins = props.sides("margin", font_size)?;
        let space_before = props.first_length(&["space-before", "space-before.optimum"], font_size)?;
        let space_after = props.first_length(&["space-after", "space-after.optimum"], font_size)?;
        let mut breaks = Breaks::default();
        for (name, slot) in [("break-before", &mut breaks.before), ("break-after", &mut breaks.after)] {
            if let Some(v) = props.get(name) {
                *slot = match v.trim() {
                    "page" | "even-page" | "odd-page" => true,
                    "auto" | "column" => false,
                    _ => return Err(props.malformed(name, v)),
                };
            }
        }
        Ok(BlockStyle {
            space_before: space_before.unwrap_or(margins.top),
            space_after: space_after.unwrap_or(margins.bottom),
            start_indent: props.length("start-indent", font_size)?,
            end_indent: props.length("end-indent", font_size)?,
            margin_left: margins.left,
            margin_right: margins.right,
            breaks,
        })
    }
}

/// Padding, borders and background of a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxStyle {
    pub padding: Sides,
    pub border: Sides,
    pub border_color: Option<Color>,
    pub background: Option<Color>,
}

impl BoxStyle {
    pub fn from_props(props: &Props<'_>, font_size: f32) -> Result<BoxStyle, ValidationError> {
        let padding = props.sides("padding", font_size)?;
        let mut border = Sides::default();
        let mut border_color = Some(Color::BLACK);

        // `border` and `border-<side>` shorthands: "<width> <style> <color>" in any order.
        let mut apply_shorthand = |name: &str, targets: &mut [&mut f32]| -> Result<(), ValidationError> {
            let Some(value) = props.get(name) else {
                return Ok(());
            };
            let mut width = 1.0;
            for token in value.split_whitespace() {
                if let Some(w) = parse_length(token, font_size) {
                    width = w;
                } else if matches!(token, "none" | "hidden") {
                    width = 0.0;
                } else if matches!(token, "solid" | "dashed" | "dotted" | "double" | "groove" | "ridge" | "inset" | "outset") {
                    // Every style is drawn as a solid line.
                } else if let Some(color) = parse_color(token) {
                    border_color = color;
                } else {
                    return Err(props.malformed(name, value));
                }
            }
            for t in targets.iter_mut() {
                **t = width;
            }
            Ok(())
        };
        {
            let Sides { top, right, bottom, left } = &mut border;
            apply_shorthand("border", &mut [top, right, bottom, left])?;
        }
        apply_shorthand("border-top", &mut [&mut border.top])?;
        apply_shorthand("border-right", &mut [&mut border.right])?;
        apply_shorthand("border-bottom", &mut [&mut border.bottom])?;
        apply_shorthand("border-left", &mut [&mut border.left])?;

        if let Some(w) = props.length("border-width", font_size)? {
            border = Sides::all(w);
        }
        if let Some(style) = props.get("border-style") {
            if matches!(style.trim(), "none" | "hidden") {
                border = Sides::default();
            }
        }
        if let Some(color) = props.color("border-color")? {
            border_color = color;
        }

        Ok(BoxStyle {
            padding,
            border,
            border_color,
            background: props.color("background-color")?.flatten(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props_of<'a>(name: &'a QName, attrs: &'a [Attribute]) -> Props<'a> {
        Props::new(name, attrs)
    }

    #[test]
    fn lengths() {
        assert_eq!(parse_length("10pt", 12.0), Some(10.0));
        assert_eq!(parse_length("1in", 12.0), Some(72.0));
        assert!((parse_length("2.54cm", 12.0).unwrap() - 72.0).abs() < 0.001);
        assert_eq!(parse_length("1.5em", 10.0), Some(15.0));
        assert_eq!(parse_length("0", 10.0), Some(0.0));
        assert_eq!(parse_length("-5pt", 10.0), Some(-5.0));
        assert_eq!(parse_length("12", 10.0), None);
        assert_eq!(parse_length("abc", 10.0), None);
        assert_eq!(parse_length_or_percent("25%", 10.0, 200.0), Some(50.0));
    }

    #[test]
    fn colors() {
        assert_eq!(parse_color("#fff"), Some(Some(Color { r: 1.0, g: 1.0, b: 1.0 })));
        assert_eq!(parse_color("#000000"), Some(Some(Color::BLACK)));
        assert_eq!(parse_color("rgb(255, 0, 0)"), parse_color("red"));
        assert_eq!(parse_color("transparent"), Some(None));
        assert_eq!(parse_color("#12"), None);
        assert_eq!(parse_color("blurple"), None);
    }

    #[test]
    fn text_style_inherits_and_overrides() {
        let name = QName::local("block");
        let attrs = [
            Attribute::new("font-size", "150%"),
            Attribute::new("font-weight", "bold"),
            Attribute::new("text-align", "center"),
        ];
        let parent = TextStyle { size: 10.0, ..TextStyle::default() };
        let style = parent.inherit(&props_of(&name, &attrs)).unwrap();
        assert_eq!(style.size, 15.0);
        assert!(style.font.bold);
        assert_eq!(style.align, TextAlign::Center);
        assert!((style.line_height.resolve(style.size) - 18.0).abs() < 0.001);
    }

    #[test]
    fn malformed_values_are_validation_errors() {
        let name = QName::local("block");
        let attrs = [Attribute::new("font-size", "huge-ish")];
        let err = TextStyle::default().inherit(&props_of(&name, &attrs)).unwrap_err();
        assert!(err.message.contains("font-size"));

        let attrs = [Attribute::new("space-before", "lots")];
        assert!(BlockStyle::from_props(&props_of(&name, &attrs), 12.0).is_err());
    }

    #[test]
    fn margin_and_padding_shorthands() {
        let name = QName::local("cell");
        let attrs = [
            Attribute::new("padding", "2pt 4pt"),
            Attribute::new("padding-left", "1pt"),
            Attribute::new("border", "0.5pt solid #808080"),
            Attribute::new("background-color", "silver"),
        ];
        let boxed = BoxStyle::from_props(&props_of(&name, &attrs), 12.0).unwrap();
        assert_eq!(boxed.padding, Sides { top: 2.0, right: 4.0, bottom: 2.0, left: 1.0 });
        assert_eq!(boxed.border, Sides::all(0.5));
        assert!(boxed.background.is_some());

        let attrs = [Attribute::new("margin", "1pt 2pt 3pt 4pt"), Attribute::new("break-before", "page")];
        let block = BlockStyle::from_props(&props_of(&name, &attrs), 12.0).unwrap();
        assert_eq!(block.space_before, 1.0);
        assert_eq!(block.space_after, 3.0);
        assert_eq!(block.margin_left, 4.0);
        assert!(block.breaks.before);
    }
}
