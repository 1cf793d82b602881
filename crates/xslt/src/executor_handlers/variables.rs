use crate::ast::VariableValue;
use crate::error::XsltError;
use crate::executor::TemplateExecutor;
use folio_xpath1::XNode;

/// Binds a local variable, visible to following siblings and their descendants.
pub(crate) fn handle_variable<'s, 'a>(
    executor: &mut TemplateExecutor<'s, 'a>,
    name: &str,
    value: &VariableValue,
    context_node: XNode<'a>,
    context_position: usize,
    context_size: usize,
) -> Result<(), XsltError> {
    let value = executor.variable_value(value, context_node, context_position, context_size)?;
    executor.bind(name, value);
    Ok(())
}
