//! A `nom`-based parser for the supported XPath 1.0 expression language.

use super::ast::*;
use crate::error::XPathError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit0, digit1, multispace0, satisfy},
    combinator::{map, map_res, not, opt, peek, recognize},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
};

// --- Main Public Parser ---

pub fn parse_expression(input: &str) -> Result<Expression, XPathError> {
    match expression(input.trim()) {
        Ok(("", expr)) => Ok(expr),
        Ok((rem, _)) => Err(XPathError::XPathParse(
            input.to_string(),
            format!("Parser did not consume all input. Remainder: '{}'", rem),
        )),
        Err(e) => Err(XPathError::XPathParse(input.to_string(), e.to_string())),
    }
}

// --- Combinators & Helpers ---

fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: nom::error::ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

fn build_binary_expr_parser<'a, F, G>(
    sub_expr_parser: F,
    op_parser: G,
) -> impl FnMut(&'a str) -> IResult<&'a str, Expression>
where
    F: Parser<&'a str, Output = Expression, Error = nom::error::Error<&'a str>> + Clone,
    G: Parser<&'a str, Output = BinaryOperator, Error = nom::error::Error<&'a str>> + Clone,
{
    move |input: &str| {
        let (input, mut left) = sub_expr_parser.clone().parse(input)?;
        let (input, remainder) = many0(pair(ws(op_parser.clone()), sub_expr_parser.clone())).parse(input)?;

        for (op, right) in remainder {
            left = Expression::BinaryOp { left: Box::new(left), op, right: Box::new(right) };
        }
        Ok((input, left))
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

/// An operator name such as `and` that must not run into a following name.
fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    terminated(tag(word), not(peek(satisfy(is_name_char))))
}

// --- Expression Parsers (in order of precedence) ---

fn expression(input: &str) -> IResult<&str, Expression> {
    or_expr(input)
}

fn or_op(input: &str) -> IResult<&str, BinaryOperator> {
    map(keyword("or"), |_| BinaryOperator::Or).parse(input)
}

fn and_op(input: &str) -> IResult<&str, BinaryOperator> {
    map(keyword("and"), |_| BinaryOperator::And).parse(input)
}

fn or_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(and_expr, or_op)(input)
}

fn and_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(equality_expr, and_op)(input)
}

fn equality_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(tag("="), |_| BinaryOperator::Equals),
        map(tag("!="), |_| BinaryOperator::NotEquals),
    ))
    .parse(input)
}

fn relational_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(tag("<="), |_| BinaryOperator::LessThanOrEqual),
        map(tag("&lt;="), |_| BinaryOperator::LessThanOrEqual),
        map(tag(">="), |_| BinaryOperator::GreaterThanOrEqual),
        map(tag("&gt;="), |_| BinaryOperator::GreaterThanOrEqual),
        map(tag("<"), |_| BinaryOperator::LessThan),
        map(tag("&lt;"), |_| BinaryOperator::LessThan),
        map(tag(">"), |_| BinaryOperator::GreaterThan),
        map(tag("&gt;"), |_| BinaryOperator::GreaterThan),
    ))
    .parse(input)
}

fn additive_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((map(char('+'), |_| BinaryOperator::Plus), map(char('-'), |_| BinaryOperator::Minus))).parse(input)
}

fn multiplicative_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(char('*'), |_| BinaryOperator::Multiply),
        map(keyword("div"), |_| BinaryOperator::Divide),
        map(keyword("mod"), |_| BinaryOperator::Modulo),
    ))
    .parse(input)
}

fn union_op(input: &str) -> IResult<&str, BinaryOperator> {
    map(char('|'), |_| BinaryOperator::Union).parse(input)
}

fn equality_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(relational_expr, equality_op)(input)
}

fn relational_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(additive_expr, relational_op)(input)
}

fn additive_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(multiplicative_expr, additive_op)(input)
}

fn multiplicative_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(unary_expr, multiplicative_op)(input)
}

fn unary_expr(input: &str) -> IResult<&str, Expression> {
    let (i, neg_op) = opt(ws(char('-'))).parse(input)?;
    if neg_op.is_some() {
        let (i, expr) = unary_expr(i)?;
        return Ok((i, Expression::Negate(Box::new(expr))));
    }
    union_expr(i)
}

fn union_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(path_expr, union_op)(input)
}

/// Handles the ambiguity between location paths and primary expressions
/// (possibly filtered by predicates) that are followed by further steps.
fn path_expr(input: &str) -> IResult<&str, Expression> {
    // Primary expressions go first so that `position()` is not taken as a
    // step named `position`.
    let (i, start_expr) = alt((filter_expr, map(location_path, Expression::LocationPath))).parse(input)?;

    let (i, remainder_steps) = many0(pair(alt((tag("//"), tag("/"))), step)).parse(i)?;
    let (i, _) = multispace0(i)?;

    if remainder_steps.is_empty() {
        return Ok((i, start_expr));
    }

    let (start_point, is_absolute, mut steps) = match start_expr {
        Expression::LocationPath(lp) => (lp.start_point, lp.is_absolute, lp.steps),
        other => (Some(Box::new(other)), false, vec![]),
    };
    push_steps(&mut steps, remainder_steps);

    Ok((i, Expression::LocationPath(LocationPath { start_point, is_absolute, steps })))
}

fn push_steps(steps: &mut Vec<Step>, remainder: Vec<(&str, Step)>) {
    for (sep, next_step) in remainder {
        if sep == "//" {
            steps.push(descendant_or_self_step());
        }
        steps.push(next_step);
    }
}

fn descendant_or_self_step() -> Step {
    Step::new(Axis::DescendantOrSelf, NodeTest::NodeType(NodeTypeTest::Node))
}

fn filter_expr(input: &str) -> IResult<&str, Expression> {
    let (i, primary) = primary_expr(input)?;
    let (i, predicates) = many0(predicate).parse(i)?;
    if predicates.is_empty() {
        Ok((i, primary))
    } else {
        Ok((i, Expression::Filter { primary: Box::new(primary), predicates }))
    }
}

fn primary_expr(input: &str) -> IResult<&str, Expression> {
    ws(alt((
        variable_reference,
        map(number_literal, Expression::Number),
        map(string_literal, Expression::Literal),
        function_call,
        delimited(ws(char('(')), expression, ws(char(')'))),
    )))
    .parse(input)
}

// --- Literal Parsers ---

/// `Digits ('.' Digits?)? | '.' Digits`. Exponents and `inf`/`nan` are not XPath numbers.
fn number_literal(input: &str) -> IResult<&str, f64> {
    map_res(
        alt((recognize(pair(digit1, opt(pair(char('.'), digit0)))), recognize(pair(char('.'), digit1)))),
        |s: &str| s.parse::<f64>(),
    )
    .parse(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
        )),
        |s: &str| s.to_string(),
    )
    .parse(input)
}

// --- Variable Reference Parser ---
fn variable_reference(input: &str) -> IResult<&str, Expression> {
    map(preceded(char('$'), q_name), Expression::Variable).parse(input)
}

// --- Name and NodeTest Parsers ---
fn nc_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(take_while1(|c: char| c.is_alphabetic() || c == '_'), take_while(is_name_char)))
        .parse(input)
}

fn q_name(input: &str) -> IResult<&str, String> {
    map(recognize(pair(nc_name, opt(pair(tag(":"), nc_name)))), |s: &str| s.to_string()).parse(input)
}

fn node_type_test(input: &str) -> IResult<&str, NodeTest> {
    map(
        terminated(
            alt((tag("text"), tag("node"), tag("comment"), tag("processing-instruction"))),
            pair(ws(char('(')), char(')')),
        ),
        |node_type: &str| match node_type {
            "text" => NodeTest::NodeType(NodeTypeTest::Text),
            "comment" => NodeTest::NodeType(NodeTypeTest::Comment),
            "processing-instruction" => NodeTest::NodeType(NodeTypeTest::ProcessingInstruction),
            _ => NodeTest::NodeType(NodeTypeTest::Node),
        },
    )
    .parse(input)
}

pub fn node_test(input: &str) -> IResult<&str, NodeTest> {
    alt((
        map(tag("*"), |_| NodeTest::Wildcard),
        node_type_test,
        // `prefix:*`
        map(terminated(nc_name, tag(":*")), |_| NodeTest::Wildcard),
        map(q_name, NodeTest::Name),
    ))
    .parse(input)
}

// --- Path Parsers ---
fn axis(input: &str) -> IResult<&str, Axis> {
    map(
        terminated(
            alt((
                tag("child"),
                tag("descendant-or-self"),
                tag("descendant"),
                tag("attribute"),
                tag("parent"),
                tag("ancestor-or-self"),
                tag("ancestor"),
                tag("self"),
                tag("following-sibling"),
                tag("preceding-sibling"),
            )),
            tag("::"),
        ),
        |axis_str: &str| match axis_str {
            "descendant-or-self" => Axis::DescendantOrSelf,
            "descendant" => Axis::Descendant,
            "attribute" => Axis::Attribute,
            "parent" => Axis::Parent,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "ancestor" => Axis::Ancestor,
            "self" => Axis::SelfAxis,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            _ => Axis::Child,
        },
    )
    .parse(input)
}

fn predicate(input: &str) -> IResult<&str, Expression> {
    delimited(ws(char('[')), expression, ws(char(']'))).parse(input)
}

pub fn step(input: &str) -> IResult<&str, Step> {
    let (i, (axis, node_test)) = alt((
        map(tag(".."), |_| (Axis::Parent, NodeTest::NodeType(NodeTypeTest::Node))),
        map(tag("."), |_| (Axis::SelfAxis, NodeTest::NodeType(NodeTypeTest::Node))),
        map(preceded(char('@'), node_test), |nt| (Axis::Attribute, nt)),
        map(pair(opt(axis), node_test), |(ax, nt)| (ax.unwrap_or(Axis::Child), nt)),
    ))
    .parse(input)?;
    let (i, predicates) = many0(predicate).parse(i)?;
    Ok((i, Step { axis, node_test, predicates }))
}

fn location_path(input: &str) -> IResult<&str, LocationPath> {
    // A path that does not start with a variable or function call.
    let (i, (is_absolute, mut steps)) = if let Some(rem) = input.strip_prefix("//") {
        let (rem, first) = step(rem)?;
        (rem, (true, vec![descendant_or_self_step(), first]))
    } else if let Some(rem) = input.strip_prefix('/') {
        match step(rem) {
            Ok((rem, first)) => (rem, (true, vec![first])),
            // Just "/"
            Err(_) => (rem, (true, vec![])),
        }
    } else {
        let (rem, first) = step(input)?;
        (rem, (false, vec![first]))
    };

    let (i, remainder) = many0(pair(alt((tag("//"), tag("/"))), step)).parse(i)?;
    push_steps(&mut steps, remainder);

    Ok((i, LocationPath { start_point: None, is_absolute, steps }))
}

// --- Function Call Parser ---
fn function_call(input: &str) -> IResult<&str, Expression> {
    // A QName followed by '('; the lookahead keeps `foo` in `foo/bar` a step.
    let (i, name) = q_name(input)?;
    let (i, _) = peek(ws(char('('))).parse(i)?;

    // Node-type tests like text() are handled by the step parser.
    if matches!(name.as_str(), "text" | "node" | "comment" | "processing-instruction") {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Verify)));
    }

    let (i, _) = multispace0(i)?;
    let (i, args) = delimited(ws(char('(')), separated_list0(ws(char(',')), expression), char(')')).parse(i)?;

    Ok((i, Expression::FunctionCall { name, args }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(name: &str) -> Step {
        Step::new(Axis::Child, NodeTest::Name(name.into()))
    }

    fn path(steps: Vec<Step>) -> Expression {
        Expression::LocationPath(LocationPath { start_point: None, is_absolute: false, steps })
    }

    #[test]
    fn test_parse_simple_path() {
        assert_eq!(parse_expression("data/row").unwrap(), path(vec![child("data"), child("row")]));
    }

    #[test]
    fn test_parse_unary_minus() {
        assert_eq!(parse_expression("-5").unwrap(), Expression::Negate(Box::new(Expression::Number(5.0))));

        let result = parse_expression("10 - -5").unwrap();
        assert_eq!(
            result,
            Expression::BinaryOp {
                left: Box::new(Expression::Number(10.0)),
                op: BinaryOperator::Minus,
                right: Box::new(Expression::Negate(Box::new(Expression::Number(5.0)))),
            }
        );
    }

    #[test]
    fn test_parse_axes_and_abbreviations() {
        let Expression::LocationPath(lp) = parse_expression("following-sibling::row").unwrap() else {
            panic!("Expected a location path");
        };
        assert_eq!(lp.steps[0].axis, Axis::FollowingSibling);

        let Expression::LocationPath(lp) = parse_expression("../@grouped-by").unwrap() else {
            panic!("Expected a location path");
        };
        assert_eq!(lp.steps[0], Step::new(Axis::Parent, NodeTest::NodeType(NodeTypeTest::Node)));
        assert_eq!(lp.steps[1], Step::new(Axis::Attribute, NodeTest::Name("grouped-by".into())));

        let Expression::LocationPath(lp) = parse_expression(".").unwrap() else {
            panic!("Expected a location path");
        };
        assert_eq!(lp.steps, vec![Step::new(Axis::SelfAxis, NodeTest::NodeType(NodeTypeTest::Node))]);
    }

    #[test]
    fn test_parse_path_starting_with_variable() {
        assert_eq!(
            parse_expression("$rows/cell").unwrap(),
            Expression::LocationPath(LocationPath {
                start_point: Some(Box::new(Expression::Variable("rows".to_string()))),
                is_absolute: false,
                steps: vec![child("cell")],
            })
        );
    }

    #[test]
    fn test_parse_predicate() {
        let result = parse_expression("cell[@grouped = 'true']").unwrap();
        let attr = Expression::LocationPath(LocationPath {
            start_point: None,
            is_absolute: false,
            steps: vec![Step::new(Axis::Attribute, NodeTest::Name("grouped".into()))],
        });
        let mut step = child("cell");
        step.predicates.push(Expression::BinaryOp {
            left: Box::new(attr),
            op: BinaryOperator::Equals,
            right: Box::new(Expression::Literal("true".into())),
        });
        assert_eq!(result, path(vec![step]));
    }

    #[test]
    fn test_parse_filter_expression() {
        let result = parse_expression("(//row)[1]").unwrap();
        assert!(matches!(result, Expression::Filter { ref predicates, .. } if predicates.len() == 1));
    }

    #[test]
    fn test_parse_function_in_predicate() {
        let Expression::LocationPath(lp) = parse_expression("row[position() = last()]").unwrap() else {
            panic!("Expected a location path");
        };
        assert!(matches!(lp.steps[0].predicates[0], Expression::BinaryOp { .. }));
    }

    #[test]
    fn test_parse_operator_precedence() {
        assert_eq!(
            parse_expression("1 + 2 * 3").unwrap(),
            Expression::BinaryOp {
                left: Box::new(Expression::Number(1.0)),
                op: BinaryOperator::Plus,
                right: Box::new(Expression::BinaryOp {
                    left: Box::new(Expression::Number(2.0)),
                    op: BinaryOperator::Multiply,
                    right: Box::new(Expression::Number(3.0)),
                }),
            }
        );
    }

    #[test]
    fn test_keywords_need_a_boundary() {
        // `order` and `divider` are element names, not operators.
        assert_eq!(parse_expression("order").unwrap(), path(vec![child("order")]));
        let result = parse_expression("a div divider").unwrap();
        assert!(matches!(result, Expression::BinaryOp { op: BinaryOperator::Divide, .. }));
        let result = parse_expression("a or b and c").unwrap();
        assert!(matches!(result, Expression::BinaryOp { op: BinaryOperator::Or, .. }));
    }

    #[test]
    fn test_parse_descendant_or_self() {
        assert_eq!(
            parse_expression("//row").unwrap(),
            Expression::LocationPath(LocationPath {
                start_point: None,
                is_absolute: true,
                steps: vec![descendant_or_self_step(), child("row")],
            })
        );
        assert_eq!(
            parse_expression("/").unwrap(),
            Expression::LocationPath(LocationPath { start_point: None, is_absolute: true, steps: vec![] })
        );
    }

    #[test]
    fn test_numbers_reject_exponents_and_words() {
        assert_eq!(parse_expression(".5").unwrap(), Expression::Number(0.5));
        assert_eq!(parse_expression("3.").unwrap(), Expression::Number(3.0));
        assert!(parse_expression("1e3").is_err());
        // `inf` is a step name here, not a number.
        assert_eq!(parse_expression("inf").unwrap(), path(vec![child("inf")]));
    }

    #[test]
    fn test_parse_xml_entities_in_relational_expr() {
        let result = parse_expression("a &lt; b").unwrap();
        assert!(matches!(result, Expression::BinaryOp { op: BinaryOperator::LessThan, .. }));
        let result = parse_expression("a &gt;= b").unwrap();
        assert!(matches!(result, Expression::BinaryOp { op: BinaryOperator::GreaterThanOrEqual, .. }));
    }

    #[test]
    fn test_unbalanced_input_is_an_error() {
        assert!(matches!(parse_expression("count(row"), Err(XPathError::XPathParse(..))));
        assert!(parse_expression("row]").is_err());
    }
}
