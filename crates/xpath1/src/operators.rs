//! Comparison, arithmetic and union operators with XPath 1.0 conversion rules.

use super::ast::BinaryOperator;
use super::engine::{XPathValue, string_to_number};
use super::node::sort_document_order;
use crate::error::XPathError;

pub fn evaluate<'a>(
    op: BinaryOperator,
    left: XPathValue<'a>,
    right: XPathValue<'a>,
) -> Result<XPathValue<'a>, XPathError> {
    match op {
        BinaryOperator::Or => Ok(XPathValue::Boolean(left.to_bool() || right.to_bool())),
        BinaryOperator::And => Ok(XPathValue::Boolean(left.to_bool() && right.to_bool())),
        BinaryOperator::Equals
        | BinaryOperator::NotEquals
        | BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqual => Ok(XPathValue::Boolean(compare(op, &left, &right))),
        BinaryOperator::Plus => Ok(XPathValue::Number(left.to_number() + right.to_number())),
        BinaryOperator::Minus => Ok(XPathValue::Number(left.to_number() - right.to_number())),
        BinaryOperator::Multiply => Ok(XPathValue::Number(left.to_number() * right.to_number())),
        BinaryOperator::Divide => Ok(XPathValue::Number(left.to_number() / right.to_number())),
        BinaryOperator::Modulo => Ok(XPathValue::Number(left.to_number() % right.to_number())),
        BinaryOperator::Union => match (left, right) {
            (XPathValue::NodeSet(mut a), XPathValue::NodeSet(b)) => {
                a.extend(b);
                sort_document_order(&mut a);
                Ok(XPathValue::NodeSet(a))
            }
            _ => Err(XPathError::TypeError("operands of '|' must be node-sets".to_string())),
        },
    }
}

/// An atomic operand of a comparison after node-set expansion.
enum Atom {
    Str(String),
    Num(f64),
    Bool(bool),
}

fn compare(op: BinaryOperator, left: &XPathValue<'_>, right: &XPathValue<'_>) -> bool {
    match (left, right) {
        // A node-set compared with a boolean compares its truth value.
        (XPathValue::NodeSet(_), XPathValue::Boolean(b)) => {
            compare_atoms(op, &Atom::Bool(left.to_bool()), &Atom::Bool(*b))
        }
        (XPathValue::Boolean(b), XPathValue::NodeSet(_)) => {
            compare_atoms(op, &Atom::Bool(*b), &Atom::Bool(right.to_bool()))
        }
        _ => {
            let la = atoms(left);
            let ra = atoms(right);
            la.iter().any(|l| ra.iter().any(|r| compare_atoms(op, l, r)))
        }
    }
}

fn atoms(value: &XPathValue<'_>) -> Vec<Atom> {
    match value {
        XPathValue::NodeSet(nodes) => nodes.iter().map(|n| Atom::Str(n.string_value())).collect(),
        XPathValue::String(s) => vec![Atom::Str(s.clone())],
        XPathValue::Number(n) => vec![Atom::Num(*n)],
        XPathValue::Boolean(b) => vec![Atom::Bool(*b)],
    }
}

fn atom_number(a: &Atom) -> f64 {
    match a {
        Atom::Str(s) => string_to_number(s),
        Atom::Num(n) => *n,
        Atom::Bool(b) => f64::from(u8::from(*b)),
    }
}

fn atom_bool(a: &Atom) -> bool {
    match a {
        Atom::Str(s) => !s.is_empty(),
        Atom::Num(n) => *n != 0.0 && !n.is_nan(),
        Atom::Bool(b) => *b,
    }
}

fn compare_atoms(op: BinaryOperator, l: &Atom, r: &Atom) -> bool {
    match op {
        BinaryOperator::Equals | BinaryOperator::NotEquals => {
            let equal = match (l, r) {
                (Atom::Bool(_), _) | (_, Atom::Bool(_)) => atom_bool(l) == atom_bool(r),
                (Atom::Num(_), _) | (_, Atom::Num(_)) => atom_number(l) == atom_number(r),
                (Atom::Str(a), Atom::Str(b)) => a == b,
            };
            if op == BinaryOperator::Equals { equal } else { !equal }
        }
        _ => {
            let (a, b) = (atom_number(l), atom_number(r));
            match op {
                BinaryOperator::LessThan => a < b,
                BinaryOperator::LessThanOrEqual => a <= b,
                BinaryOperator::GreaterThan => a > b,
                _ => a >= b,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> XPathValue<'static> {
        XPathValue::String(v.to_string())
    }

    #[test]
    fn equality_converts_by_operand_type() {
        let eq = |a, b| evaluate(BinaryOperator::Equals, a, b).unwrap().to_bool();
        assert!(eq(s("1.0"), XPathValue::Number(1.0)));
        assert!(!eq(s("1.0"), s("1")));
        assert!(eq(s("x"), XPathValue::Boolean(true)));
        assert!(eq(XPathValue::NodeSet(vec![]), XPathValue::Boolean(false)));
    }

    #[test]
    fn empty_node_set_compares_false_both_ways() {
        let empty = || XPathValue::NodeSet(vec![]);
        assert!(!evaluate(BinaryOperator::Equals, empty(), s("")).unwrap().to_bool());
        assert!(!evaluate(BinaryOperator::NotEquals, empty(), s("")).unwrap().to_bool());
    }

    #[test]
    fn arithmetic_and_relational() {
        let v = evaluate(BinaryOperator::Modulo, XPathValue::Number(7.0), s("3")).unwrap();
        assert_eq!(v.to_number(), 1.0);
        let v = evaluate(BinaryOperator::Divide, XPathValue::Number(1.0), XPathValue::Number(0.0)).unwrap();
        assert!(v.to_number().is_infinite());
        assert!(evaluate(BinaryOperator::LessThan, s("2"), s("10")).unwrap().to_bool());
    }

    #[test]
    fn union_requires_node_sets() {
        assert!(evaluate(BinaryOperator::Union, s("a"), XPathValue::NodeSet(vec![])).is_err());
    }
}
