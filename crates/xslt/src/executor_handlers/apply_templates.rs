use crate::ast::{Param, SortKey};
use crate::error::XsltError;
use crate::executor::TemplateExecutor;
use crate::output::ResultBuilder;
use folio_xpath1::{Expression, XNode, XPathValue};

#[allow(clippy::too_many_arguments)]
pub(crate) fn handle_apply_templates<'s, 'a>(
    executor: &mut TemplateExecutor<'s, 'a>,
    select: Option<&Expression>,
    mode: Option<&str>,
    sort_keys: &[SortKey],
    params: &[Param],
    context_node: XNode<'a>,
    context_position: usize,
    context_size: usize,
    builder: &mut ResultBuilder<'_>,
) -> Result<(), XsltError> {
    let mut nodes = match select {
        Some(expr) => match executor.evaluate(expr, context_node, context_position, context_size)? {
            XPathValue::NodeSet(nodes) => nodes,
            other => {
                return Err(XsltError::Execution(format!(
                    "xsl:apply-templates select must produce a node-set, got '{}'",
                    other
                )));
            }
        },
        None => context_node.children(),
    };
    executor.sort_node_set(&mut nodes, sort_keys)?;

    let with_params = evaluate_with_params(executor, params, context_node, context_position, context_size)?;
    executor.apply_templates_to_nodes(&nodes, mode, with_params, builder)
}

/// Evaluates `xsl:with-param` values in the caller's context.
pub(crate) fn evaluate_with_params<'a>(
    executor: &mut TemplateExecutor<'_, 'a>,
    params: &[Param],
    context_node: XNode<'a>,
    context_position: usize,
    context_size: usize,
) -> Result<Vec<(String, XPathValue<'a>)>, XsltError> {
    params
        .iter()
        .map(|p| {
            let value = executor.variable_value(&p.value, context_node, context_position, context_size)?;
            Ok((p.name.clone(), value))
        })
        .collect()
}
