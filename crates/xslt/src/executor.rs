//! Instantiates compiled templates against a source tree, streaming the
//! result into a [`ResultBuilder`].

use crate::ast::*;
use crate::error::XsltError;
use crate::executor_handlers::{apply_templates, call_template, control_flow, copy, for_each, literals, variables};
use crate::output::ResultBuilder;
use folio_traits::TextCollector;
use folio_xpath1::{EvaluationContext, Expression, NodeKind, VariableResolver, XNode, XPathValue};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Nesting limit for template invocation, guarding against runaway recursion.
pub(crate) const MAX_DEPTH: usize = 512;

/// Stack the executor may use below the frame that created it. Half of the
/// 2 MiB a spawned thread gets by default, leaving the rest for the
/// expression evaluation between two template frames.
pub(crate) const STACK_BUDGET: usize = 1 << 20;

/// Approximate address of the caller's stack frame.
#[inline(never)]
fn stack_address() -> usize {
    let marker = 0u8;
    std::hint::black_box(&marker) as *const u8 as usize
}

pub struct TemplateExecutor<'s, 'a> {
    pub(crate) stylesheet: &'s CompiledStylesheet,
    root: XNode<'a>,
    globals: HashMap<String, XPathValue<'a>>,
    /// Local variable scopes, innermost last.
    scopes: Vec<HashMap<String, XPathValue<'a>>>,
    depth: usize,
    stack_base: usize,
}

impl<'a> VariableResolver<'a> for TemplateExecutor<'_, 'a> {
    fn resolve(&self, name: &str) -> Option<XPathValue<'a>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.globals.get(name))
            .cloned()
    }
}

impl<'s, 'a> TemplateExecutor<'s, 'a> {
    pub fn new(stylesheet: &'s CompiledStylesheet, root: XNode<'a>) -> Self {
        Self { stylesheet, root, globals: HashMap::new(), scopes: Vec::new(), depth: 0, stack_base: stack_address() }
    }

    /// Binds globals, then processes the root node in the default mode.
    pub fn run(&mut self, builder: &mut ResultBuilder<'_>) -> Result<(), XsltError> {
        let stylesheet = self.stylesheet;
        let root = self.root;
        for global in &stylesheet.globals {
            let value = self.variable_value(&global.value, root, 1, 1)?;
            self.globals.insert(global.name.clone(), value);
        }
        self.apply_templates_to_nodes(&[root], None, Vec::new(), builder)
    }

    pub(crate) fn get_eval_context(
        &self,
        context_node: XNode<'a>,
        context_position: usize,
        context_size: usize,
    ) -> EvaluationContext<'a, '_> {
        EvaluationContext::new(context_node, self.root, context_position, context_size, self)
    }

    pub(crate) fn evaluate(
        &self,
        expr: &Expression,
        context_node: XNode<'a>,
        context_position: usize,
        context_size: usize,
    ) -> Result<XPathValue<'a>, XsltError> {
        let e_ctx = self.get_eval_context(context_node, context_position, context_size);
        Ok(folio_xpath1::evaluate(expr, &e_ctx)?)
    }

    pub(crate) fn evaluate_avt(
        &self,
        avt: &AttributeValueTemplate,
        context_node: XNode<'a>,
        context_position: usize,
        context_size: usize,
    ) -> Result<String, XsltError> {
        let mut out = String::new();
        for part in &avt.0 {
            match part {
                AvtPart::Static(s) => out.push_str(s),
                AvtPart::Dynamic(expr) => {
                    out.push_str(&self.evaluate(expr, context_node, context_position, context_size)?.to_string())
                }
            }
        }
        Ok(out)
    }

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub(crate) fn bind(&mut self, name: &str, value: XPathValue<'a>) {
        match self.scopes.last_mut() {
            Some(scope) => {
                scope.insert(name.to_string(), value);
            }
            None => {
                self.globals.insert(name.to_string(), value);
            }
        }
    }

    pub(crate) fn enter(&mut self) -> Result<(), XsltError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(XsltError::Execution(format!(
                "template nesting exceeded {} levels; the stylesheet probably recurses without end",
                MAX_DEPTH
            )));
        }
        let used = stack_address().abs_diff(self.stack_base);
        if used > STACK_BUDGET {
            return Err(XsltError::Execution(format!(
                "template nesting reached {} levels using {} KiB of stack; the stylesheet recurses too deeply",
                self.depth,
                used / 1024
            )));
        }
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn variable_value(
        &mut self,
        value: &VariableValue,
        context_node: XNode<'a>,
        context_position: usize,
        context_size: usize,
    ) -> Result<XPathValue<'a>, XsltError> {
        match value {
            VariableValue::Select(expr) => self.evaluate(expr, context_node, context_position, context_size),
            VariableValue::Body(body) => {
                let text = self.fragment_text(body, context_node, context_position, context_size)?;
                Ok(XPathValue::String(text))
            }
            VariableValue::Empty => Ok(XPathValue::String(String::new())),
        }
    }

    /// Instantiates `body` and returns the string value of the result fragment.
    pub(crate) fn fragment_text(
        &mut self,
        body: &PreparsedTemplate,
        context_node: XNode<'a>,
        context_position: usize,
        context_size: usize,
    ) -> Result<String, XsltError> {
        let mut collector = TextCollector::default();
        {
            let mut sub = ResultBuilder::new(&mut collector);
            self.execute_template(body, context_node, context_position, context_size, &mut sub)?;
            sub.end_document()?;
        }
        Ok(collector.text)
    }

    /// Runs a sequence of instructions in its own variable scope.
    pub(crate) fn execute_template(
        &mut self,
        body: &PreparsedTemplate,
        context_node: XNode<'a>,
        context_position: usize,
        context_size: usize,
        builder: &mut ResultBuilder<'_>,
    ) -> Result<(), XsltError> {
        self.push_scope();
        let mut result = Ok(());
        for instr in &body.0 {
            result = self.execute_instruction(instr, context_node, context_position, context_size, builder);
            if result.is_err() {
                break;
            }
        }
        self.pop_scope();
        result
    }

    fn execute_instruction(
        &mut self,
        instr: &XsltInstruction,
        context_node: XNode<'a>,
        context_position: usize,
        context_size: usize,
        builder: &mut ResultBuilder<'_>,
    ) -> Result<(), XsltError> {
        match instr {
            XsltInstruction::Text(text) => builder.text(text),
            XsltInstruction::ValueOf { select } => {
                let value = self.evaluate(select, context_node, context_position, context_size)?;
                builder.text(&value.to_string())
            }
            XsltInstruction::LiteralElement { name, attrs, body } => literals::handle_literal_element(
                self, name, attrs, body, context_node, context_position, context_size, builder,
            ),
            XsltInstruction::Element { name, namespace, namespaces, body } => literals::handle_element(
                self, name, namespace.as_ref(), namespaces, body, context_node, context_position, context_size,
                builder,
            ),
            XsltInstruction::Attribute { name, body } => {
                literals::handle_attribute(self, name, body, context_node, context_position, context_size, builder)
            }
            XsltInstruction::ApplyTemplates { select, mode, sort_keys, params } => {
                apply_templates::handle_apply_templates(
                    self,
                    select.as_ref(),
                    mode.as_deref(),
                    sort_keys,
                    params,
                    context_node,
                    context_position,
                    context_size,
                    builder,
                )
            }
            XsltInstruction::CallTemplate { name, params } => call_template::handle_call_template(
                self, name, params, context_node, context_position, context_size, builder,
            ),
            XsltInstruction::ForEach { select, sort_keys, body } => for_each::handle_for_each(
                self, select, sort_keys, body, context_node, context_position, context_size, builder,
            ),
            XsltInstruction::If { test, body } => {
                control_flow::handle_if(self, test, body, context_node, context_position, context_size, builder)
            }
            XsltInstruction::Choose { whens, otherwise } => control_flow::handle_choose(
                self,
                whens,
                otherwise.as_ref(),
                context_node,
                context_position,
                context_size,
                builder,
            ),
            XsltInstruction::Variable { name, value } => {
                variables::handle_variable(self, name, value, context_node, context_position, context_size)
            }
            XsltInstruction::CopyOf { select } => {
                copy::handle_copy_of(self, select, context_node, context_position, context_size, builder)
            }
        }
    }

    /// Finds the rule for `node` in `mode`: highest priority wins, and among
    /// equals the one declared last.
    fn find_rule(
        &self,
        node: XNode<'a>,
        mode: Option<&str>,
        context_position: usize,
        context_size: usize,
    ) -> Result<Option<&'s TemplateRule>, XsltError> {
        let stylesheet: &'s CompiledStylesheet = self.stylesheet;
        let e_ctx = self.get_eval_context(node, context_position, context_size);
        let mut best: Option<(f64, &'s TemplateRule)> = None;
        for rule in stylesheet.rules.iter().filter(|r| r.mode.as_deref() == mode) {
            let Some(default_priority) = rule.pattern.match_priority(node, &e_ctx)? else {
                continue;
            };
            let priority = rule.priority.unwrap_or(default_priority);
            if best.is_none_or(|(p, _)| priority >= p) {
                best = Some((priority, rule));
            }
        }
        Ok(best.map(|(_, rule)| rule))
    }

    /// Processes each node with its best rule, or the built-in rule if none matches.
    pub(crate) fn apply_templates_to_nodes(
        &mut self,
        nodes: &[XNode<'a>],
        mode: Option<&str>,
        with_params: Vec<(String, XPathValue<'a>)>,
        builder: &mut ResultBuilder<'_>,
    ) -> Result<(), XsltError> {
        let size = nodes.len();
        for (i, &node) in nodes.iter().enumerate() {
            let position = i + 1;
            match self.find_rule(node, mode, position, size)? {
                Some(rule) => {
                    self.enter()?;
                    let result = self.invoke(&rule.params, &rule.body, &with_params, node, position, size, builder);
                    self.leave();
                    result?;
                }
                None => self.builtin_rule(node, mode, builder)?,
            }
        }
        Ok(())
    }

    /// Binds declared parameters (passed values override defaults) and runs `body`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn invoke(
        &mut self,
        params: &[Param],
        body: &PreparsedTemplate,
        with_params: &[(String, XPathValue<'a>)],
        context_node: XNode<'a>,
        context_position: usize,
        context_size: usize,
        builder: &mut ResultBuilder<'_>,
    ) -> Result<(), XsltError> {
        // A template sees only globals and its own bindings, not the caller's locals.
        let caller_scopes = std::mem::replace(&mut self.scopes, vec![HashMap::new()]);
        let result = self
            .bind_params(params, with_params, context_node, context_position, context_size)
            .and_then(|()| self.execute_template(body, context_node, context_position, context_size, builder));
        self.scopes = caller_scopes;
        result
    }

    fn bind_params(
        &mut self,
        params: &[Param],
        with_params: &[(String, XPathValue<'a>)],
        context_node: XNode<'a>,
        context_position: usize,
        context_size: usize,
    ) -> Result<(), XsltError> {
        for param in params {
            let value = match with_params.iter().find(|(name, _)| *name == param.name) {
                Some((_, v)) => v.clone(),
                None => self.variable_value(&param.value, context_node, context_position, context_size)?,
            };
            self.bind(&param.name, value);
        }
        Ok(())
    }

    fn builtin_rule(
        &mut self,
        node: XNode<'a>,
        mode: Option<&str>,
        builder: &mut ResultBuilder<'_>,
    ) -> Result<(), XsltError> {
        match node.kind() {
            NodeKind::Root | NodeKind::Element => {
                let children = node.children();
                self.apply_templates_to_nodes(&children, mode, Vec::new(), builder)
            }
            NodeKind::Text | NodeKind::Attribute => builder.text(&node.string_value()),
            NodeKind::Comment | NodeKind::ProcessingInstruction => Ok(()),
        }
    }

    /// Sorts `nodes` by `sort_keys`. The sort is stable, so nodes with equal
    /// keys stay in their original order.
    pub(crate) fn sort_node_set(&self, nodes: &mut Vec<XNode<'a>>, sort_keys: &[SortKey]) -> Result<(), XsltError> {
        if sort_keys.is_empty() {
            return Ok(());
        }
        let size = nodes.len();
        let mut keyed = Vec::with_capacity(size);
        for (i, &node) in nodes.iter().enumerate() {
            let mut values = Vec::with_capacity(sort_keys.len());
            for key in sort_keys {
                let value = self.evaluate(&key.select, node, i + 1, size)?;
                values.push(match key.data_type {
                    SortDataType::Text => SortValue::Text(value.to_string()),
                    SortDataType::Number => SortValue::Number(value.to_number()),
                });
            }
            keyed.push((values, node));
        }

        keyed.sort_by(|(a, _), (b, _)| {
            for ((x, y), key) in a.iter().zip(b).zip(sort_keys) {
                let ord = x.compare(y);
                let ord = if key.order == SortOrder::Descending { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        *nodes = keyed.into_iter().map(|(_, node)| node).collect();
        Ok(())
    }
}

enum SortValue {
    Text(String),
    Number(f64),
}

impl SortValue {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            // NaN sorts before every number.
            (SortValue::Number(a), SortValue::Number(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            },
            _ => Ordering::Equal,
        }
    }
}
