use super::apply_templates::evaluate_with_params;
use crate::ast::Param;
use crate::error::XsltError;
use crate::executor::TemplateExecutor;
use crate::output::ResultBuilder;
use folio_xpath1::XNode;

/// Invokes a named template. The context node, position and size are unchanged.
pub(crate) fn handle_call_template<'s, 'a>(
    executor: &mut TemplateExecutor<'s, 'a>,
    name: &str,
    params: &[Param],
    context_node: XNode<'a>,
    context_position: usize,
    context_size: usize,
    builder: &mut ResultBuilder<'_>,
) -> Result<(), XsltError> {
    let stylesheet = executor.stylesheet;
    let template = stylesheet
        .named_templates
        .get(name)
        .ok_or_else(|| XsltError::Execution(format!("no template named '{}'", name)))?;

    let with_params = evaluate_with_params(executor, params, context_node, context_position, context_size)?;
    executor.enter()?;
    let result = executor.invoke(
        &template.params,
        &template.body,
        &with_params,
        context_node,
        context_position,
        context_size,
        builder,
    );
    executor.leave();
    result
}
