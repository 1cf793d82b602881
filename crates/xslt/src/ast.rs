//! Compiled form of a stylesheet.

use crate::pattern::Pattern;
use folio_traits::QName;
use folio_xpath1::Expression;
use std::collections::HashMap;

/// A value with literal parts and `{expr}` parts, e.g. `col-{position()}`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeValueTemplate(pub Vec<AvtPart>);

#[derive(Debug, Clone, PartialEq)]
pub enum AvtPart {
    Static(String),
    Dynamic(Expression),
}

impl AttributeValueTemplate {
    /// The fixed value, if the template has no expression parts.
    pub fn as_static(&self) -> Option<String> {
        let mut out = String::new();
        for part in &self.0 {
            match part {
                AvtPart::Static(s) => out.push_str(s),
                AvtPart::Dynamic(_) => return None,
            }
        }
        Some(out)
    }
}

/// A sequence of instructions, the body of a template or of a container instruction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PreparsedTemplate(pub Vec<XsltInstruction>);

#[derive(Debug, Clone, PartialEq)]
pub enum XsltInstruction {
    /// Literal text from the stylesheet or an `xsl:text`.
    Text(String),
    ValueOf {
        select: Expression,
    },
    /// A literal result element such as `<fo:block font-size="{$size}">`.
    LiteralElement {
        name: QName,
        attrs: Vec<(String, AttributeValueTemplate)>,
        body: PreparsedTemplate,
    },
    /// `xsl:element`. Prefixes in the computed name resolve against `namespaces`,
    /// the bindings in scope at the instruction.
    Element {
        name: AttributeValueTemplate,
        namespace: Option<AttributeValueTemplate>,
        namespaces: Vec<(String, String)>,
        body: PreparsedTemplate,
    },
    Attribute {
        name: AttributeValueTemplate,
        body: PreparsedTemplate,
    },
    ApplyTemplates {
        select: Option<Expression>,
        mode: Option<String>,
        sort_keys: Vec<SortKey>,
        params: Vec<Param>,
    },
    CallTemplate {
        name: String,
        params: Vec<Param>,
    },
    ForEach {
        select: Expression,
        sort_keys: Vec<SortKey>,
        body: PreparsedTemplate,
    },
    If {
        test: Expression,
        body: PreparsedTemplate,
    },
    Choose {
        whens: Vec<When>,
        otherwise: Option<PreparsedTemplate>,
    },
    Variable {
        name: String,
        value: VariableValue,
    },
    CopyOf {
        select: Expression,
    },
}

/// How a variable or parameter obtains its value.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableValue {
    Select(Expression),
    /// Content instantiated into a result tree fragment, used by its string value.
    Body(PreparsedTemplate),
    /// Neither `select` nor content: the empty string.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub value: VariableValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct When {
    pub test: Expression,
    pub body: PreparsedTemplate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDataType {
    Text,
    Number,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub select: Expression,
    pub order: SortOrder,
    pub data_type: SortDataType,
}

/// A template that can be invoked by `xsl:apply-templates`.
#[derive(Debug, Clone)]
pub struct TemplateRule {
    pub pattern: Pattern,
    /// Explicit `priority`; otherwise the pattern's default priority applies.
    pub priority: Option<f64>,
    pub mode: Option<String>,
    pub params: Vec<Param>,
    pub body: PreparsedTemplate,
}

#[derive(Debug, Clone)]
pub struct NamedTemplate {
    pub params: Vec<Param>,
    pub body: PreparsedTemplate,
}

/// Output settings from `xsl:output`. Recorded but only `indent` is honored,
/// and only by the text serializer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputSettings {
    pub method: Option<String>,
    pub indent: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CompiledStylesheet {
    /// In stylesheet order; later rules win ties.
    pub rules: Vec<TemplateRule>,
    pub named_templates: HashMap<String, NamedTemplate>,
    /// Top-level `xsl:variable` and `xsl:param` bindings, in stylesheet order.
    pub globals: Vec<Param>,
    pub output: OutputSettings,
}
