//! Built-in implementations for the supported XPath 1.0 functions.

use super::engine::{EvaluationContext, XPathValue, number_to_string, string_to_number};
use crate::error::XPathError;

/// Dispatches a function call to the correct implementation.
pub fn evaluate_function<'a>(
    name: &str,
    args: Vec<XPathValue<'a>>,
    e_ctx: &EvaluationContext<'a, '_>,
) -> Result<XPathValue<'a>, XPathError> {
    match name {
        // Node-set
        "position" => {
            arity(name, &args, 0, 0)?;
            Ok(XPathValue::Number(e_ctx.context_position as f64))
        }
        "last" => {
            arity(name, &args, 0, 0)?;
            Ok(XPathValue::Number(e_ctx.context_size as f64))
        }
        "count" => {
            arity(name, &args, 1, 1)?;
            Ok(XPathValue::Number(node_set(name, &args[0])?.len() as f64))
        }
        "name" | "local-name" => {
            arity(name, &args, 0, 1)?;
            let node = match args.first() {
                Some(arg) => node_set(name, arg)?.first().copied(),
                None => Some(e_ctx.context_node),
            };
            let value = node.map(|n| if name == "name" { n.name() } else { n.local_name().to_string() });
            Ok(XPathValue::String(value.unwrap_or_default()))
        }

        // String
        "string" => {
            arity(name, &args, 0, 1)?;
            Ok(XPathValue::String(string_arg_or_context(&args, e_ctx)))
        }
        "concat" => {
            if args.len() < 2 {
                return Err(arity_error(name, "at least 2 arguments"));
            }
            Ok(XPathValue::String(args.iter().map(|a| a.to_string()).collect()))
        }
        "contains" => {
            arity(name, &args, 2, 2)?;
            Ok(XPathValue::Boolean(args[0].to_string().contains(&args[1].to_string())))
        }
        "starts-with" => {
            arity(name, &args, 2, 2)?;
            Ok(XPathValue::Boolean(args[0].to_string().starts_with(&args[1].to_string())))
        }
        "substring-before" => {
            arity(name, &args, 2, 2)?;
            let (s, pat) = (args[0].to_string(), args[1].to_string());
            Ok(XPathValue::String(s.find(&pat).map(|i| s[..i].to_string()).unwrap_or_default()))
        }
        "substring-after" => {
            arity(name, &args, 2, 2)?;
            let (s, pat) = (args[0].to_string(), args[1].to_string());
            Ok(XPathValue::String(s.find(&pat).map(|i| s[i + pat.len()..].to_string()).unwrap_or_default()))
        }
        "substring" => {
            arity(name, &args, 2, 3)?;
            let s = args[0].to_string();
            let start = args[1].to_number();
            let len = args.get(2).map(|a| a.to_number());
            Ok(XPathValue::String(substring(&s, start, len)))
        }
        "string-length" => {
            arity(name, &args, 0, 1)?;
            Ok(XPathValue::Number(string_arg_or_context(&args, e_ctx).chars().count() as f64))
        }
        "normalize-space" => {
            arity(name, &args, 0, 1)?;
            let s = string_arg_or_context(&args, e_ctx);
            Ok(XPathValue::String(s.split_whitespace().collect::<Vec<_>>().join(" ")))
        }
        "translate" => {
            arity(name, &args, 3, 3)?;
            let from: Vec<char> = args[1].to_string().chars().collect();
            let to: Vec<char> = args[2].to_string().chars().collect();
            let out = args[0]
                .to_string()
                .chars()
                .filter_map(|c| match from.iter().position(|&f| f == c) {
                    Some(i) => to.get(i).copied(),
                    None => Some(c),
                })
                .collect();
            Ok(XPathValue::String(out))
        }

        // Boolean
        "not" => {
            arity(name, &args, 1, 1)?;
            Ok(XPathValue::Boolean(!args[0].to_bool()))
        }
        "true" | "false" => {
            arity(name, &args, 0, 0)?;
            Ok(XPathValue::Boolean(name == "true"))
        }
        "boolean" => {
            arity(name, &args, 1, 1)?;
            Ok(XPathValue::Boolean(args[0].to_bool()))
        }

        // Number
        "number" => {
            arity(name, &args, 0, 1)?;
            let n = match args.first() {
                Some(arg) => arg.to_number(),
                None => string_to_number(&e_ctx.context_node.string_value()),
            };
            Ok(XPathValue::Number(n))
        }
        "sum" => {
            arity(name, &args, 1, 1)?;
            let total = node_set(name, &args[0])?
                .iter()
                .map(|n| string_to_number(&n.string_value()))
                .sum();
            Ok(XPathValue::Number(total))
        }
        "floor" => {
            arity(name, &args, 1, 1)?;
            Ok(XPathValue::Number(args[0].to_number().floor()))
        }
        "ceiling" => {
            arity(name, &args, 1, 1)?;
            Ok(XPathValue::Number(args[0].to_number().ceil()))
        }
        "round" => {
            arity(name, &args, 1, 1)?;
            let n = args[0].to_number();
            let rounded = if n.is_finite() { (n + 0.5).floor() } else { n };
            Ok(XPathValue::Number(rounded))
        }
        "format-number" => {
            arity(name, &args, 2, 2)?;
            Ok(XPathValue::String(format_number(args[0].to_number(), &args[1].to_string())))
        }
        _ => Err(XPathError::FunctionError {
            function: name.to_string(),
            message: "Unknown XPath function".to_string(),
        }),
    }
}

fn arity_error(function: &str, expected: &str) -> XPathError {
    XPathError::FunctionError { function: function.to_string(), message: format!("Expected {}", expected) }
}

fn arity(function: &str, args: &[XPathValue<'_>], min: usize, max: usize) -> Result<(), XPathError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("{} argument(s), got {}", min, args.len())
        } else {
            format!("{} to {} arguments, got {}", min, max, args.len())
        };
        return Err(arity_error(function, &expected));
    }
    Ok(())
}

fn node_set<'v, 'a>(
    function: &str,
    value: &'v XPathValue<'a>,
) -> Result<&'v [super::node::XNode<'a>], XPathError> {
    match value {
        XPathValue::NodeSet(nodes) => Ok(nodes.as_slice()),
        _ => Err(XPathError::FunctionError {
            function: function.to_string(),
            message: "Argument must be a node-set".to_string(),
        }),
    }
}

fn string_arg_or_context(args: &[XPathValue<'_>], e_ctx: &EvaluationContext<'_, '_>) -> String {
    match args.first() {
        Some(arg) => arg.to_string(),
        None => e_ctx.context_node.string_value(),
    }
}

/// XPath `substring()` with its 1-based, rounding position arithmetic.
fn substring(s: &str, start: f64, len: Option<f64>) -> String {
    let start = (start + 0.5).floor();
    let end = match len {
        Some(l) => start + (l + 0.5).floor(),
        None => f64::INFINITY,
    };
    if start.is_nan() || end.is_nan() {
        return String::new();
    }
    s.chars()
        .enumerate()
        .filter(|(i, _)| {
            let pos = (*i + 1) as f64;
            pos >= start && pos < end
        })
        .map(|(_, c)| c)
        .collect()
}

/// Formats a number with a decimal-format style pattern such as `#,##0.00`.
/// Supports a prefix and suffix, grouping, minimum integer digits, min/max
/// fraction digits and a trailing `%`. A `;` negative sub-pattern is ignored.
pub fn format_number(n: f64, pattern: &str) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    let pattern = pattern.split(';').next().unwrap_or("");
    let is_pattern_char = |c: char| matches!(c, '#' | '0' | ',' | '.');
    let body_start = pattern.find(is_pattern_char).unwrap_or(pattern.len());
    let body_end = pattern.rfind(is_pattern_char).map(|i| i + 1).unwrap_or(body_start);
    let prefix = &pattern[..body_start];
    let body = &pattern[body_start..body_end];
    let suffix = &pattern[body_end..];

    let value = if suffix.contains('%') || prefix.contains('%') { n * 100.0 } else { n };
    if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{}{}Infinity{}", sign, prefix, suffix);
    }

    let (int_pat, frac_pat) = body.split_once('.').unwrap_or((body, ""));
    let min_int = int_pat.chars().filter(|&c| c == '0').count();
    let grouping = int_pat.rfind(',').map(|i| int_pat[i + 1..].chars().count());
    let min_frac = frac_pat.chars().filter(|&c| c == '0').count();
    let max_frac = min_frac + frac_pat.chars().filter(|&c| c == '#').count();

    let formatted = format!("{:.*}", max_frac, value.abs());
    let (int_digits, frac_digits) = formatted.split_once('.').unwrap_or((&formatted, ""));

    let mut frac = frac_digits.to_string();
    while frac.len() > min_frac && frac.ends_with('0') {
        frac.pop();
    }

    let mut int_part = int_digits.trim_start_matches('0').to_string();
    while int_part.len() < min_int {
        int_part.insert(0, '0');
    }
    if let Some(size) = grouping.filter(|&g| g > 0) {
        int_part = group_digits(&int_part, size);
    }

    let negative = value < 0.0 && (int_part.chars().any(|c| c != '0' && c != ',') || frac.chars().any(|c| c != '0'));
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(prefix);
    out.push_str(&int_part);
    if !frac.is_empty() {
        out.push('.');
        out.push_str(&frac);
    }
    out.push_str(suffix);
    if out.is_empty() { number_to_string(n) } else { out }
}

fn group_digits(digits: &str, size: usize) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut out = String::with_capacity(chars.len() + chars.len() / size);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % size == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out
}
