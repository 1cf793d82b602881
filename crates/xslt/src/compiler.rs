//! Compiles stylesheet source text into a [`CompiledStylesheet`].
//!
//! The stylesheet is parsed with `roxmltree`, which resolves namespaces for
//! us, and then walked once. Whitespace-only text is stripped everywhere
//! except inside `xsl:text`.

use crate::ast::*;
use crate::error::{Location, XsltError};
use crate::pattern;
use folio_traits::QName;
use folio_xpath1::{Expression, parse_expression};
use log::debug;
use roxmltree::{Document, Node};

pub const XSLT_NS: &str = "http://www.w3.org/1999/XSL/Transform";

pub fn compile(source: &str) -> Result<CompiledStylesheet, XsltError> {
    let doc = Document::parse(source).map_err(XsltError::StylesheetXml)?;
    let compiler = Compiler { doc: &doc };
    let stylesheet = compiler.stylesheet(doc.root_element())?;
    debug!(
        "Compiled stylesheet: {} template rules, {} named templates, {} globals",
        stylesheet.rules.len(),
        stylesheet.named_templates.len(),
        stylesheet.globals.len()
    );
    Ok(stylesheet)
}

struct Compiler<'d, 'input> {
    doc: &'d Document<'input>,
}

fn is_xsl(node: &Node<'_, '_>, local: &str) -> bool {
    node.is_element() && node.tag_name().namespace() == Some(XSLT_NS) && node.tag_name().name() == local
}

fn is_whitespace_text(node: &Node<'_, '_>) -> bool {
    node.is_text() && node.text().is_some_and(|t| t.trim().is_empty())
}

impl<'d, 'input> Compiler<'d, 'input> {
    fn location(&self, node: Node<'_, '_>) -> Location {
        self.doc.text_pos_at(node.range().start).into()
    }

    fn error(&self, node: Node<'_, '_>, message: impl Into<String>) -> XsltError {
        XsltError::compilation(message, self.location(node))
    }

    fn required_attr<'n>(&self, node: Node<'n, 'input>, name: &str) -> Result<&'n str, XsltError> {
        node.attribute(name).ok_or_else(|| {
            self.error(node, format!("<xsl:{}> is missing required attribute '{}'", node.tag_name().name(), name))
        })
    }

    fn expression(&self, node: Node<'_, '_>, text: &str) -> Result<Expression, XsltError> {
        parse_expression(text).map_err(|e| self.error(node, e.to_string()))
    }

    fn stylesheet(&self, root: Node<'_, 'input>) -> Result<CompiledStylesheet, XsltError> {
        let mut stylesheet = CompiledStylesheet::default();

        if !(is_xsl(&root, "stylesheet") || is_xsl(&root, "transform")) {
            // A literal result element as the whole stylesheet acts as the
            // template for the root node.
            if root.attribute((XSLT_NS, "version")).is_none() {
                return Err(self.error(root, "document element is not <xsl:stylesheet> or <xsl:transform>"));
            }
            let body = PreparsedTemplate(vec![self.literal_element(root)?]);
            stylesheet.rules.push(TemplateRule {
                pattern: pattern::parse("/").map_err(|e| self.error(root, e.to_string()))?,
                priority: None,
                mode: None,
                params: Vec::new(),
                body,
            });
            return Ok(stylesheet);
        }

        for child in root.children() {
            if child.is_comment() || child.is_pi() || is_whitespace_text(&child) {
                continue;
            }
            if child.is_text() {
                return Err(self.error(child, "text is not allowed at the top level of a stylesheet"));
            }
            if child.tag_name().namespace() != Some(XSLT_NS) {
                // Top-level elements in other namespaces are ignored.
                continue;
            }
            match child.tag_name().name() {
                "template" => self.template(child, &mut stylesheet)?,
                "variable" | "param" => stylesheet.globals.push(self.param(child)?),
                "output" => {
                    stylesheet.output = OutputSettings {
                        method: child.attribute("method").map(str::to_string),
                        indent: child.attribute("indent") == Some("yes"),
                    };
                }
                // Source whitespace is always stripped; these are accepted as no-ops.
                "strip-space" | "preserve-space" | "decimal-format" => {}
                other => return Err(self.error(child, format!("unsupported top-level element <xsl:{}>", other))),
            }
        }
        Ok(stylesheet)
    }

    fn template(&self, node: Node<'_, 'input>, stylesheet: &mut CompiledStylesheet) -> Result<(), XsltError> {
        let match_attr = node.attribute("match");
        let name_attr = node.attribute("name");
        if match_attr.is_none() && name_attr.is_none() {
            return Err(self.error(node, "<xsl:template> needs a 'match' or 'name' attribute"));
        }

        let (params, body) = self.params_and_body(node)?;

        if let Some(name) = name_attr {
            stylesheet
                .named_templates
                .insert(name.to_string(), NamedTemplate { params: params.clone(), body: body.clone() });
        }
        if let Some(m) = match_attr {
            let priority = match node.attribute("priority") {
                Some(p) => Some(
                    p.trim()
                        .parse::<f64>()
                        .map_err(|_| self.error(node, format!("invalid priority '{}'", p)))?,
                ),
                None => None,
            };
            stylesheet.rules.push(TemplateRule {
                pattern: pattern::parse(m).map_err(|e| self.error(node, e.to_string()))?,
                priority,
                mode: node.attribute("mode").map(str::to_string),
                params,
                body,
            });
        }
        Ok(())
    }

    /// Splits leading `xsl:param` children from the rest of a template body.
    fn params_and_body(&self, node: Node<'_, 'input>) -> Result<(Vec<Param>, PreparsedTemplate), XsltError> {
        let mut params = Vec::new();
        let mut rest = Vec::new();
        for child in node.children() {
            if is_xsl(&child, "param") && rest.iter().all(|n: &Node<'_, '_>| is_whitespace_text(n)) {
                params.push(self.param(child)?);
                rest.clear();
            } else {
                rest.push(child);
            }
        }
        Ok((params, self.instructions(rest.into_iter())?))
    }

    /// `xsl:variable`, `xsl:param` or `xsl:with-param`.
    fn param(&self, node: Node<'_, 'input>) -> Result<Param, XsltError> {
        let name = self.required_attr(node, "name")?.to_string();
        Ok(Param { name, value: self.variable_value(node)? })
    }

    fn variable_value(&self, node: Node<'_, 'input>) -> Result<VariableValue, XsltError> {
        if let Some(select) = node.attribute("select") {
            return Ok(VariableValue::Select(self.expression(node, select)?));
        }
        let body = self.instructions(node.children())?;
        if body.0.is_empty() { Ok(VariableValue::Empty) } else { Ok(VariableValue::Body(body)) }
    }

    fn instructions<'n>(
        &self,
        nodes: impl Iterator<Item = Node<'n, 'input>>,
    ) -> Result<PreparsedTemplate, XsltError>
    where
        'input: 'n,
    {
        let mut out = Vec::new();
        for node in nodes {
            if node.is_comment() || node.is_pi() || is_whitespace_text(&node) {
                continue;
            }
            if node.is_text() {
                out.push(XsltInstruction::Text(node.text().unwrap_or("").to_string()));
                continue;
            }
            if node.tag_name().namespace() == Some(XSLT_NS) {
                out.push(self.xsl_instruction(node)?);
            } else {
                out.push(self.literal_element(node)?);
            }
        }
        Ok(PreparsedTemplate(out))
    }

    fn xsl_instruction(&self, node: Node<'_, 'input>) -> Result<XsltInstruction, XsltError> {
        let instr = match node.tag_name().name() {
            "value-of" => XsltInstruction::ValueOf { select: self.expression(node, self.required_attr(node, "select")?)? },
            "text" => {
                let text: String = node.children().filter(|c| c.is_text()).filter_map(|c| c.text()).collect();
                XsltInstruction::Text(text)
            }
            "apply-templates" => {
                let select = match node.attribute("select") {
                    Some(s) => Some(self.expression(node, s)?),
                    None => None,
                };
                let (sort_keys, params) = self.sorts_and_with_params(node)?;
                XsltInstruction::ApplyTemplates {
                    select,
                    mode: node.attribute("mode").map(str::to_string),
                    sort_keys,
                    params,
                }
            }
            "call-template" => {
                let (sort_keys, params) = self.sorts_and_with_params(node)?;
                if !sort_keys.is_empty() {
                    return Err(self.error(node, "<xsl:sort> is not allowed in <xsl:call-template>"));
                }
                XsltInstruction::CallTemplate { name: self.required_attr(node, "name")?.to_string(), params }
            }
            "for-each" => {
                let select = self.expression(node, self.required_attr(node, "select")?)?;
                let sort_keys = node
                    .children()
                    .filter(|c| is_xsl(c, "sort"))
                    .map(|c| self.sort_key(c))
                    .collect::<Result<Vec<_>, _>>()?;
                let body = self.instructions(node.children().filter(|c| !is_xsl(c, "sort")))?;
                XsltInstruction::ForEach { select, sort_keys, body }
            }
            "if" => XsltInstruction::If {
                test: self.expression(node, self.required_attr(node, "test")?)?,
                body: self.instructions(node.children())?,
            },
            "choose" => self.choose(node)?,
            "variable" => {
                let p = self.param(node)?;
                XsltInstruction::Variable { name: p.name, value: p.value }
            }
            "attribute" => XsltInstruction::Attribute {
                name: self.avt(node, self.required_attr(node, "name")?)?,
                body: self.instructions(node.children())?,
            },
            "element" => {
                let namespace = match node.attribute("namespace") {
                    Some(ns) => Some(self.avt(node, ns)?),
                    None => None,
                };
                let namespaces = node
                    .namespaces()
                    .filter_map(|ns| ns.name().map(|p| (p.to_string(), ns.uri().to_string())))
                    .collect();
                XsltInstruction::Element {
                    name: self.avt(node, self.required_attr(node, "name")?)?,
                    namespace,
                    namespaces,
                    body: self.instructions(node.children())?,
                }
            }
            "copy-of" => XsltInstruction::CopyOf { select: self.expression(node, self.required_attr(node, "select")?)? },
            "param" => return Err(self.error(node, "<xsl:param> must come first in a template")),
            "sort" | "with-param" | "when" | "otherwise" => {
                return Err(self.error(node, format!("<xsl:{}> is not allowed here", node.tag_name().name())));
            }
            other => return Err(self.error(node, format!("unsupported instruction <xsl:{}>", other))),
        };
        Ok(instr)
    }

    fn choose(&self, node: Node<'_, 'input>) -> Result<XsltInstruction, XsltError> {
        let mut whens = Vec::new();
        let mut otherwise = None;
        for child in node.children().filter(|c| c.is_element()) {
            if is_xsl(&child, "when") && otherwise.is_none() {
                whens.push(When {
                    test: self.expression(child, self.required_attr(child, "test")?)?,
                    body: self.instructions(child.children())?,
                });
            } else if is_xsl(&child, "otherwise") && otherwise.is_none() {
                otherwise = Some(self.instructions(child.children())?);
            } else {
                return Err(self.error(child, "<xsl:choose> may only contain <xsl:when> followed by an optional <xsl:otherwise>"));
            }
        }
        if whens.is_empty() {
            return Err(self.error(node, "<xsl:choose> needs at least one <xsl:when>"));
        }
        Ok(XsltInstruction::Choose { whens, otherwise })
    }

    fn sorts_and_with_params(&self, node: Node<'_, 'input>) -> Result<(Vec<SortKey>, Vec<Param>), XsltError> {
        let mut sort_keys = Vec::new();
        let mut params = Vec::new();
        for child in node.children() {
            if child.is_comment() || is_whitespace_text(&child) {
                continue;
            }
            if is_xsl(&child, "sort") {
                sort_keys.push(self.sort_key(child)?);
            } else if is_xsl(&child, "with-param") {
                params.push(self.param(child)?);
            } else {
                return Err(self.error(child, format!("unexpected content in <xsl:{}>", node.tag_name().name())));
            }
        }
        Ok((sort_keys, params))
    }

    fn sort_key(&self, node: Node<'_, 'input>) -> Result<SortKey, XsltError> {
        let select = self.expression(node, node.attribute("select").unwrap_or("."))?;
        let order = match node.attribute("order").unwrap_or("ascending") {
            "ascending" => SortOrder::Ascending,
            "descending" => SortOrder::Descending,
            other => return Err(self.error(node, format!("invalid sort order '{}'", other))),
        };
        let data_type = match node.attribute("data-type").unwrap_or("text") {
            "text" => SortDataType::Text,
            "number" => SortDataType::Number,
            other => return Err(self.error(node, format!("unsupported sort data-type '{}'", other))),
        };
        Ok(SortKey { select, order, data_type })
    }

    fn literal_element(&self, node: Node<'_, 'input>) -> Result<XsltInstruction, XsltError> {
        let tag = node.tag_name();
        let name = match tag.namespace() {
            Some(ns) => QName::with_namespace(node.lookup_prefix(ns), tag.name(), ns),
            None => QName::local(tag.name()),
        };

        let mut attrs = Vec::new();
        for attr in node.attributes() {
            let attr_name = match attr.namespace() {
                Some(XSLT_NS) => continue,
                Some(ns) => match node.lookup_prefix(ns) {
                    Some(p) if !p.is_empty() => format!("{}:{}", p, attr.name()),
                    _ => attr.name().to_string(),
                },
                None => attr.name().to_string(),
            };
            attrs.push((attr_name, self.avt(node, attr.value())?));
        }

        Ok(XsltInstruction::LiteralElement { name, attrs, body: self.instructions(node.children())? })
    }

    /// Parses an attribute value template. `{{` and `}}` are literal braces.
    fn avt(&self, node: Node<'_, '_>, text: &str) -> Result<AttributeValueTemplate, XsltError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut expr = String::new();
                    let mut quote: Option<char> = None;
                    let mut closed = false;
                    for c in chars.by_ref() {
                        match (c, quote) {
                            ('}', None) => {
                                closed = true;
                                break;
                            }
                            ('"' | '\'', None) => quote = Some(c),
                            (q, Some(open)) if q == open => quote = None,
                            _ => {}
                        }
                        expr.push(c);
                    }
                    if !closed {
                        return Err(self.error(node, format!("unterminated '{{' in attribute value '{}'", text)));
                    }
                    if !literal.is_empty() {
                        parts.push(AvtPart::Static(std::mem::take(&mut literal)));
                    }
                    parts.push(AvtPart::Dynamic(self.expression(node, &expr)?));
                }
                '}' => return Err(self.error(node, format!("unmatched '}}' in attribute value '{}'", text))),
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            parts.push(AvtPart::Static(literal));
        }
        Ok(AttributeValueTemplate(parts))
    }
}
