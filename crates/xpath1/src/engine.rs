//! The evaluation engine for executing a parsed XPath AST against a `roxmltree` document.

use super::ast::{Axis, BinaryOperator, Expression, LocationPath, NodeTest, NodeTypeTest, Step};
use super::functions;
use super::node::{NodeKind, XNode, sort_document_order};
use super::operators;
use crate::error::XPathError;
use std::collections::HashMap;
use std::fmt;

/// Represents the possible result types of an XPath expression evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum XPathValue<'a> {
    NodeSet(Vec<XNode<'a>>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl<'a> XPathValue<'a> {
    /// Coerces the XPath value to a boolean as per XPath 1.0 rules.
    pub fn to_bool(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::String(s) => !s.is_empty(),
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::Boolean(b) => *b,
        }
    }

    /// Coerces the XPath value to a number as per XPath 1.0 rules.
    pub fn to_number(&self) -> f64 {
        match self {
            XPathValue::Number(n) => *n,
            XPathValue::String(s) => string_to_number(s),
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            XPathValue::NodeSet(nodes) => {
                string_to_number(&nodes.first().map(|n| n.string_value()).unwrap_or_default())
            }
        }
    }

    pub fn into_nodes(self) -> Option<Vec<XNode<'a>>> {
        match self {
            XPathValue::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }
}

impl fmt::Display for XPathValue<'_> {
    /// Coerces the XPath value to a string as per XPath 1.0 rules.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XPathValue::NodeSet(nodes) => {
                write!(f, "{}", nodes.first().map(|n| n.string_value()).unwrap_or_default())
            }
            XPathValue::String(s) => write!(f, "{}", s),
            XPathValue::Number(n) => write!(f, "{}", number_to_string(*n)),
            XPathValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// XPath `number()` on a string: optional whitespace, optional minus, digits
/// with an optional fraction. Anything else is NaN.
pub fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    let body = t.strip_prefix('-').unwrap_or(t);
    let valid = !body.is_empty()
        && body.chars().all(|c| c.is_ascii_digit() || c == '.')
        && body.chars().filter(|&c| c == '.').count() <= 1
        && body.chars().any(|c| c.is_ascii_digit());
    if valid { t.parse().unwrap_or(f64::NAN) } else { f64::NAN }
}

/// XPath `string()` on a number: integral values have no fractional part.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e17 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Supplies values for `$name` references.
pub trait VariableResolver<'a> {
    fn resolve(&self, name: &str) -> Option<XPathValue<'a>>;
}

impl<'a> VariableResolver<'a> for HashMap<String, XPathValue<'a>> {
    fn resolve(&self, name: &str) -> Option<XPathValue<'a>> {
        self.get(name).cloned()
    }
}

/// A resolver with no bindings.
pub struct NoVariables;

impl<'a> VariableResolver<'a> for NoVariables {
    fn resolve(&self, _name: &str) -> Option<XPathValue<'a>> {
        None
    }
}

/// A container for all state needed during expression evaluation.
/// `'a` is the lifetime of the source document, `'d` that of the context itself.
pub struct EvaluationContext<'a, 'd> {
    pub context_node: XNode<'a>,
    pub root_node: XNode<'a>,
    pub context_position: usize, // 1-based index
    pub context_size: usize,
    pub variables: &'d dyn VariableResolver<'a>,
}

impl<'a, 'd> EvaluationContext<'a, 'd> {
    pub fn new(
        context_node: XNode<'a>,
        root_node: XNode<'a>,
        context_position: usize,
        context_size: usize,
        variables: &'d dyn VariableResolver<'a>,
    ) -> Self {
        Self { context_node, root_node, context_position, context_size, variables }
    }

    /// A context with the same root and variables but a different focus.
    pub fn with_focus(&self, node: XNode<'a>, position: usize, size: usize) -> Self {
        Self::new(node, self.root_node, position, size, self.variables)
    }
}

/// Evaluates a compiled expression and returns a concrete `XPathValue`.
pub fn evaluate<'a>(
    expr: &Expression,
    e_ctx: &EvaluationContext<'a, '_>,
) -> Result<XPathValue<'a>, XPathError> {
    match expr {
        Expression::Literal(s) => Ok(XPathValue::String(s.clone())),
        Expression::Number(n) => Ok(XPathValue::Number(*n)),
        Expression::LocationPath(path) => Ok(XPathValue::NodeSet(evaluate_location_path(path, e_ctx)?)),
        Expression::Variable(name) => {
            e_ctx.variables.resolve(name).ok_or_else(|| XPathError::UnknownVariable(name.clone()))
        }
        Expression::FunctionCall { name, args } => {
            let mut evaluated_args = Vec::with_capacity(args.len());
            for arg in args {
                evaluated_args.push(evaluate(arg, e_ctx)?);
            }
            functions::evaluate_function(name, evaluated_args, e_ctx)
        }
        Expression::Filter { primary, predicates } => {
            let nodes = match evaluate(primary, e_ctx)? {
                XPathValue::NodeSet(nodes) => nodes,
                other => {
                    return Err(XPathError::TypeError(format!(
                        "predicate applied to a non-node-set value '{}'",
                        other
                    )));
                }
            };
            apply_predicates(nodes, predicates, e_ctx)
                .map(XPathValue::NodeSet)
        }
        Expression::BinaryOp { left, op: BinaryOperator::Or, right } => {
            Ok(XPathValue::Boolean(evaluate(left, e_ctx)?.to_bool() || evaluate(right, e_ctx)?.to_bool()))
        }
        Expression::BinaryOp { left, op: BinaryOperator::And, right } => {
            Ok(XPathValue::Boolean(evaluate(left, e_ctx)?.to_bool() && evaluate(right, e_ctx)?.to_bool()))
        }
        Expression::BinaryOp { left, op, right } => {
            let left_val = evaluate(left, e_ctx)?;
            let right_val = evaluate(right, e_ctx)?;
            operators::evaluate(*op, left_val, right_val)
        }
        Expression::Negate(expr) => Ok(XPathValue::Number(-evaluate(expr, e_ctx)?.to_number())),
    }
}

fn evaluate_location_path<'a>(
    path: &LocationPath,
    e_ctx: &EvaluationContext<'a, '_>,
) -> Result<Vec<XNode<'a>>, XPathError> {
    let mut current_nodes = if let Some(start_expr) = &path.start_point {
        match evaluate(start_expr, e_ctx)? {
            XPathValue::NodeSet(nodes) => nodes,
            other => {
                return Err(XPathError::TypeError(format!(
                    "cannot select a path from non-node-set value '{}'",
                    other
                )));
            }
        }
    } else if path.is_absolute {
        vec![e_ctx.root_node]
    } else {
        vec![e_ctx.context_node]
    };

    for step in &path.steps {
        current_nodes = evaluate_step(step, &current_nodes, e_ctx)?;
    }
    Ok(current_nodes)
}

/// Evaluates one step for every context node. Predicates see positions in
/// axis order; the combined result is returned in document order.
fn evaluate_step<'a>(
    step: &Step,
    context_nodes: &[XNode<'a>],
    e_ctx: &EvaluationContext<'a, '_>,
) -> Result<Vec<XNode<'a>>, XPathError> {
    let mut result = Vec::new();
    for &node in context_nodes {
        let candidates: Vec<XNode<'a>> = collect_axis_nodes(step.axis, node)
            .into_iter()
            .filter(|n| matches_node_test(n, &step.node_test, step.axis))
            .collect();
        result.extend(apply_predicates(candidates, &step.predicates, e_ctx)?);
    }
    sort_document_order(&mut result);
    Ok(result)
}

/// Nodes along `axis` from `node`, nearest first for reverse axes.
fn collect_axis_nodes<'a>(axis: Axis, node: XNode<'a>) -> Vec<XNode<'a>> {
    match axis {
        Axis::Child => node.children(),
        Axis::Attribute => node.attributes(),
        Axis::SelfAxis => vec![node],
        Axis::Parent => node.parent().into_iter().collect(),
        Axis::Ancestor | Axis::AncestorOrSelf => {
            let mut out = Vec::new();
            if axis == Axis::AncestorOrSelf {
                out.push(node);
            }
            let mut cur = node.parent();
            while let Some(p) = cur {
                out.push(p);
                cur = p.parent();
            }
            out
        }
        Axis::Descendant | Axis::DescendantOrSelf => {
            let mut out = Vec::new();
            if axis == Axis::DescendantOrSelf {
                out.push(node);
            }
            collect_descendants(node, &mut out);
            out
        }
        Axis::FollowingSibling => {
            let mut out = Vec::new();
            let mut cur = node.next_sibling();
            while let Some(s) = cur {
                out.push(s);
                cur = s.next_sibling();
            }
            out
        }
        Axis::PrecedingSibling => {
            let mut out = Vec::new();
            let mut cur = node.prev_sibling();
            while let Some(s) = cur {
                out.push(s);
                cur = s.prev_sibling();
            }
            out
        }
    }
}

fn collect_descendants<'a>(node: XNode<'a>, out: &mut Vec<XNode<'a>>) {
    for child in node.children() {
        out.push(child);
        collect_descendants(child, out);
    }
}

fn matches_node_test(node: &XNode<'_>, test: &NodeTest, axis: Axis) -> bool {
    let principal = if axis == Axis::Attribute { NodeKind::Attribute } else { NodeKind::Element };
    match test {
        NodeTest::Wildcard => node.kind() == principal,
        NodeTest::Name(name) => {
            let local = name.rsplit(':').next().unwrap_or(name);
            node.kind() == principal && node.local_name() == local
        }
        NodeTest::NodeType(ntt) => match ntt {
            NodeTypeTest::Node => true,
            NodeTypeTest::Text => node.kind() == NodeKind::Text,
            NodeTypeTest::Comment => node.kind() == NodeKind::Comment,
            NodeTypeTest::ProcessingInstruction => node.kind() == NodeKind::ProcessingInstruction,
        },
    }
}

/// Filters `nodes` by each predicate in turn. A numeric predicate result
/// selects by position.
fn apply_predicates<'a>(
    nodes: Vec<XNode<'a>>,
    predicates: &[Expression],
    e_ctx: &EvaluationContext<'a, '_>,
) -> Result<Vec<XNode<'a>>, XPathError> {
    let mut current = nodes;
    for predicate in predicates {
        let size = current.len();
        let mut kept = Vec::with_capacity(size);
        for (i, node) in current.iter().enumerate() {
            let inner = e_ctx.with_focus(*node, i + 1, size);
            let keep = match evaluate(predicate, &inner)? {
                XPathValue::Number(n) => n == (i + 1) as f64,
                other => other.to_bool(),
            };
            if keep {
                kept.push(*node);
            }
        }
        current = kept;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    const XML: &str = r#"<table>
        <data>
            <subgroup grouped-by="0">
                <row><cell grouped="true">East</cell><cell>10</cell></row>
                <row><cell>East</cell><cell>20</cell></row>
                <subtotal><subtotal-cell/><subtotal-cell>30</subtotal-cell></subtotal>
            </subgroup>
            <subgroup grouped-by="0">
                <row><cell grouped="true">West</cell><cell>5</cell></row>
                <subtotal><subtotal-cell/><subtotal-cell>5</subtotal-cell></subtotal>
            </subgroup>
        </data>
    </table>"#;

    fn eval<'a>(doc: &'a roxmltree::Document<'a>, expr: &str) -> XPathValue<'a> {
        let root = XNode::root_of(doc);
        let vars = NoVariables;
        let ctx = EvaluationContext::new(root, root, 1, 1, &vars);
        evaluate(&parse_expression(expr).unwrap(), &ctx).unwrap()
    }

    #[test]
    fn descendant_path_in_document_order() {
        let doc = roxmltree::Document::parse(XML).unwrap();
        let rows = eval(&doc, "//row").into_nodes().unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn positional_and_attribute_predicates() {
        let doc = roxmltree::Document::parse(XML).unwrap();
        assert_eq!(eval(&doc, "string(//row[2]/cell[2])").to_string(), "20");
        assert_eq!(eval(&doc, "count(//cell[@grouped='true'])").to_number(), 2.0);
        assert_eq!(eval(&doc, "string((//row)[last()]/cell[1])").to_string(), "West");
    }

    #[test]
    fn reverse_axis_positions_count_outwards() {
        let doc = roxmltree::Document::parse(XML).unwrap();
        let v = eval(&doc, "local-name(//subtotal-cell[1]/ancestor::*[2])");
        assert_eq!(v.to_string(), "subgroup");
        let v = eval(&doc, "string(//subtotal[1]/preceding-sibling::row[1]/cell[2])");
        assert_eq!(v.to_string(), "20");
    }

    #[test]
    fn parent_and_self_abbreviations() {
        let doc = roxmltree::Document::parse(XML).unwrap();
        let v = eval(&doc, "count(//cell/../self::row)");
        assert_eq!(v.to_number(), 3.0);
        let v = eval(&doc, "count(//row/.)");
        assert_eq!(v.to_number(), 3.0);
    }

    #[test]
    fn variables_resolve_and_unknown_ones_fail() {
        let doc = roxmltree::Document::parse(XML).unwrap();
        let root = XNode::root_of(&doc);
        let mut vars = HashMap::new();
        vars.insert("label".to_string(), XPathValue::String("Total".into()));
        let ctx = EvaluationContext::new(root, root, 1, 1, &vars);

        let v = evaluate(&parse_expression("concat($label, ':')").unwrap(), &ctx).unwrap();
        assert_eq!(v.to_string(), "Total:");
        let err = evaluate(&parse_expression("$missing").unwrap(), &ctx).unwrap_err();
        assert!(matches!(err, XPathError::UnknownVariable(name) if name == "missing"));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(number_to_string(30.0), "30");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(2.5), "2.5");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::INFINITY), "Infinity");
        assert!(string_to_number("1e3").is_nan());
        assert_eq!(string_to_number(" -4.5 "), -4.5);
    }
}
