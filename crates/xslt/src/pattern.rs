//! A dedicated engine for parsing and evaluating XSLT `match` patterns.

use folio_xpath1::ast::{Axis, NodeTest, NodeTypeTest, Step};
use folio_xpath1::engine::{EvaluationContext, XPathValue, evaluate};
use folio_xpath1::parser as xpath_parser;
use folio_xpath1::{NodeKind, XNode, XPathError};
use nom::IResult;
use nom::Parser;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, multispace0};
use nom::multi::{many0, separated_list1};
use nom::sequence::{delimited, pair};
use std::fmt;

/// How a pattern step relates to the step before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Separator {
    /// `/`
    Parent,
    /// `//`
    Ancestor,
}

#[derive(Debug, Clone, PartialEq)]
struct PatternStep {
    /// Separator before this step. For the first step of a relative path it is
    /// unused.
    separator: Separator,
    step: Step,
}

/// A single location path within a pattern, e.g. `/table/data//row`.
#[derive(Debug, Clone, PartialEq)]
struct LocationPathPattern {
    is_absolute: bool,
    steps: Vec<PatternStep>,
}

/// A compiled representation of an XSLT match pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    /// A pattern can be a union of several paths, e.g. `row|subtotal`.
    paths: Vec<LocationPathPattern>,
    original_text: String,
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original_text)
    }
}

impl Pattern {
    /// If `node` matches, the default priority of the best matching alternative.
    pub fn match_priority<'a>(
        &self,
        node: XNode<'a>,
        e_ctx: &EvaluationContext<'a, '_>,
    ) -> Result<Option<f64>, XPathError> {
        let mut best: Option<f64> = None;
        for path in &self.paths {
            if path.matches(node, e_ctx)? {
                let p = path.default_priority();
                best = Some(best.map_or(p, |b: f64| b.max(p)));
            }
        }
        Ok(best)
    }

    pub fn matches<'a>(&self, node: XNode<'a>, e_ctx: &EvaluationContext<'a, '_>) -> Result<bool, XPathError> {
        Ok(self.match_priority(node, e_ctx)?.is_some())
    }
}

impl LocationPathPattern {
    fn matches<'a>(&self, node: XNode<'a>, e_ctx: &EvaluationContext<'a, '_>) -> Result<bool, XPathError> {
        if self.steps.is_empty() {
            // "/"
            return Ok(node.kind() == NodeKind::Root);
        }
        self.matches_from(self.steps.len() - 1, node, e_ctx)
    }

    /// Matches `steps[..=idx]` with `steps[idx]` against `node`, walking up
    /// the tree for the earlier steps.
    fn matches_from<'a>(
        &self,
        idx: usize,
        node: XNode<'a>,
        e_ctx: &EvaluationContext<'a, '_>,
    ) -> Result<bool, XPathError> {
        let current = &self.steps[idx];
        if !step_matches(&current.step, node, e_ctx)? {
            return Ok(false);
        }
        let parent = node.parent();

        if idx == 0 {
            if !self.is_absolute {
                return Ok(true);
            }
            return Ok(match current.separator {
                Separator::Parent => parent.is_some_and(|p| p.kind() == NodeKind::Root),
                Separator::Ancestor => true,
            });
        }

        match current.separator {
            Separator::Parent => match parent {
                Some(p) => self.matches_from(idx - 1, p, e_ctx),
                None => Ok(false),
            },
            Separator::Ancestor => {
                let mut cursor = parent;
                while let Some(ancestor) = cursor {
                    if self.matches_from(idx - 1, ancestor, e_ctx)? {
                        return Ok(true);
                    }
                    cursor = ancestor.parent();
                }
                Ok(false)
            }
        }
    }

    fn default_priority(&self) -> f64 {
        match self.steps.as_slice() {
            [only] if !self.is_absolute && only.step.predicates.is_empty() => match &only.step.node_test {
                NodeTest::Name(_) => 0.0,
                NodeTest::Wildcard | NodeTest::NodeType(_) => -0.5,
            },
            _ => 0.5,
        }
    }
}

fn node_test_matches(step: &Step, node: &XNode<'_>) -> bool {
    let principal = if step.axis == Axis::Attribute { NodeKind::Attribute } else { NodeKind::Element };
    match &step.node_test {
        NodeTest::Wildcard => node.kind() == principal,
        NodeTest::Name(name) => {
            let local = name.rsplit(':').next().unwrap_or(name);
            node.kind() == principal && node.local_name() == local
        }
        NodeTest::NodeType(NodeTypeTest::Node) => match step.axis {
            Axis::Attribute => node.kind() == NodeKind::Attribute,
            _ => !matches!(node.kind(), NodeKind::Attribute | NodeKind::Root),
        },
        NodeTest::NodeType(NodeTypeTest::Text) => node.kind() == NodeKind::Text,
        NodeTest::NodeType(NodeTypeTest::Comment) => node.kind() == NodeKind::Comment,
        NodeTest::NodeType(NodeTypeTest::ProcessingInstruction) => {
            node.kind() == NodeKind::ProcessingInstruction
        }
    }
}

fn step_matches<'a>(step: &Step, node: XNode<'a>, e_ctx: &EvaluationContext<'a, '_>) -> Result<bool, XPathError> {
    if !node_test_matches(step, &node) {
        return Ok(false);
    }
    if step.predicates.is_empty() {
        return Ok(true);
    }

    // Predicates see the node's position among its siblings on the same axis
    // that pass the node test.
    let siblings: Vec<XNode<'a>> = match (step.axis, node.parent()) {
        (Axis::Attribute, Some(owner)) => owner.attributes(),
        (_, Some(parent)) => parent.children(),
        (_, None) => vec![node],
    };
    let mut current: Vec<XNode<'a>> = siblings.into_iter().filter(|n| node_test_matches(step, n)).collect();

    for predicate in &step.predicates {
        let size = current.len();
        let mut kept = Vec::with_capacity(size);
        for (i, candidate) in current.iter().enumerate() {
            let inner = e_ctx.with_focus(*candidate, i + 1, size);
            let keep = match evaluate(predicate, &inner)? {
                XPathValue::Number(n) => n == (i + 1) as f64,
                other => other.to_bool(),
            };
            if keep {
                kept.push(*candidate);
            }
        }
        current = kept;
    }
    Ok(current.contains(&node))
}

// --- Parser ---

pub fn parse(text: &str) -> Result<Pattern, XPathError> {
    match pattern_parser(text.trim()) {
        Ok(("", paths)) => Ok(Pattern { paths, original_text: text.to_string() }),
        Ok((rem, _)) => Err(XPathError::XPathParse(
            text.to_string(),
            format!("Unconsumed input in pattern: {}", rem),
        )),
        Err(e) => Err(XPathError::XPathParse(text.to_string(), e.to_string())),
    }
}

fn separator(input: &str) -> IResult<&str, Separator> {
    alt((
        nom::combinator::map(tag("//"), |_| Separator::Ancestor),
        nom::combinator::map(tag("/"), |_| Separator::Parent),
    ))
    .parse(input)
}

fn pattern_step(input: &str) -> IResult<&str, Step> {
    let (rest, step) = xpath_parser::step(input)?;
    // Only the child and attribute axes are allowed in patterns.
    if !matches!(step.axis, Axis::Child | Axis::Attribute) {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Verify)));
    }
    Ok((rest, step))
}

fn path_parser(input: &str) -> IResult<&str, LocationPathPattern> {
    let (rest, leading) = nom::combinator::opt(separator).parse(input)?;

    let (rest, first) = match leading {
        // `/` alone is the root pattern.
        Some(Separator::Parent) => nom::combinator::opt(pattern_step).parse(rest)?,
        _ => nom::combinator::map(pattern_step, Some).parse(rest)?,
    };

    let Some(first) = first else {
        return Ok((rest, LocationPathPattern { is_absolute: true, steps: vec![] }));
    };

    let (rest, more) = many0(pair(separator, pattern_step)).parse(rest)?;
    let mut steps = vec![PatternStep { separator: leading.unwrap_or(Separator::Parent), step: first }];
    steps.extend(more.into_iter().map(|(separator, step)| PatternStep { separator, step }));

    Ok((rest, LocationPathPattern { is_absolute: leading.is_some(), steps }))
}

fn pattern_parser(input: &str) -> IResult<&str, Vec<LocationPathPattern>> {
    separated_list1(delimited(multispace0, char('|'), multispace0), path_parser).parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_xpath1::NoVariables;

    const XML: &str = r#"<table>
        <header><header-cell>Name</header-cell></header>
        <data>
            <subgroup grouped-by="0">
                <row><cell grouped="true">A</cell><cell>10</cell></row>
                <row><cell>A</cell><cell>20</cell></row>
                <subtotal><subtotal-cell>30</subtotal-cell></subtotal>
            </subgroup>
        </data>
    </table>"#;

    fn find<'a>(doc: &'a roxmltree::Document<'a>, name: &str, nth: usize) -> XNode<'a> {
        doc.descendants()
            .filter(|n| n.has_tag_name(name))
            .nth(nth)
            .map(XNode::Node)
            .unwrap()
    }

    fn check(pattern: &str, node: XNode<'_>, root: XNode<'_>) -> Option<f64> {
        let vars = NoVariables;
        let ctx = EvaluationContext::new(root, root, 1, 1, &vars);
        parse(pattern).unwrap().match_priority(node, &ctx).unwrap()
    }

    #[test]
    fn test_pattern_parsing() {
        for ok in ["row", "data/row", "/", "/*", "/table/data", "row|subtotal", "text()", "@grouped", "*", "data//cell", "cell[@grouped='true']", "//row"] {
            assert!(parse(ok).is_ok(), "{}", ok);
        }
        assert!(parse("ancestor::row").is_err());
        assert!(parse("row/").is_err());
    }

    #[test]
    fn test_name_and_path_match() {
        let doc = roxmltree::Document::parse(XML).unwrap();
        let root = XNode::root_of(&doc);
        let row = find(&doc, "row", 0);
        assert_eq!(check("row", row, root), Some(0.0));
        assert_eq!(check("subgroup/row", row, root), Some(0.5));
        assert_eq!(check("data/row", row, root), None);
        assert_eq!(check("data//row", row, root), Some(0.5));
        assert_eq!(check("/table//row", row, root), Some(0.5));
        assert_eq!(check("/row", row, root), None);
        assert_eq!(check("*", row, root), Some(-0.5));
    }

    #[test]
    fn test_root_and_absolute_patterns() {
        let doc = roxmltree::Document::parse(XML).unwrap();
        let root = XNode::root_of(&doc);
        let table = find(&doc, "table", 0);
        assert!(check("/", root, root).is_some());
        assert!(check("/", table, root).is_none());
        assert!(check("/*", table, root).is_some());
        assert!(check("/table", table, root).is_some());
    }

    #[test]
    fn test_predicates_in_patterns() {
        let doc = roxmltree::Document::parse(XML).unwrap();
        let root = XNode::root_of(&doc);
        let grouped = find(&doc, "cell", 0);
        let plain = find(&doc, "cell", 1);
        assert!(check("cell[@grouped='true']", grouped, root).is_some());
        assert!(check("cell[@grouped='true']", plain, root).is_none());
        assert!(check("cell[2]", plain, root).is_some());
        assert!(check("row[1]/cell", grouped, root).is_some());
        assert!(check("row[2]/cell", grouped, root).is_none());
    }

    #[test]
    fn test_union_takes_best_priority() {
        let doc = roxmltree::Document::parse(XML).unwrap();
        let root = XNode::root_of(&doc);
        let row = find(&doc, "row", 0);
        assert_eq!(check("*|row", row, root), Some(0.0));
        assert_eq!(check("subtotal|header", row, root), None);
    }

    #[test]
    fn test_text_and_attribute_patterns() {
        let doc = roxmltree::Document::parse(XML).unwrap();
        let root = XNode::root_of(&doc);
        let cell = find(&doc, "cell", 0);
        let text = cell.children()[0];
        let attr = cell.attributes()[0];
        assert!(check("text()", text, root).is_some());
        assert!(check("cell/text()", text, root).is_some());
        assert!(check("@grouped", attr, root).is_some());
        assert!(check("@*", attr, root).is_some());
        assert!(check("*", attr, root).is_none());
    }
}
