use crate::ast::{PreparsedTemplate, When};
use crate::error::XsltError;
use crate::executor::TemplateExecutor;
use crate::output::ResultBuilder;
use folio_xpath1::{Expression, XNode};

pub(crate) fn handle_if<'s, 'a>(
    executor: &mut TemplateExecutor<'s, 'a>,
    test: &Expression,
    body: &PreparsedTemplate,
    context_node: XNode<'a>,
    context_position: usize,
    context_size: usize,
    builder: &mut ResultBuilder<'_>,
) -> Result<(), XsltError> {
    if executor.evaluate(test, context_node, context_position, context_size)?.to_bool() {
        executor.execute_template(body, context_node, context_position, context_size, builder)?;
    }
    Ok(())
}

pub(crate) fn handle_choose<'s, 'a>(
    executor: &mut TemplateExecutor<'s, 'a>,
    whens: &[When],
    otherwise: Option<&PreparsedTemplate>,
    context_node: XNode<'a>,
    context_position: usize,
    context_size: usize,
    builder: &mut ResultBuilder<'_>,
) -> Result<(), XsltError> {
    for when in whens {
        if executor.evaluate(&when.test, context_node, context_position, context_size)?.to_bool() {
            return executor.execute_template(&when.body, context_node, context_position, context_size, builder);
        }
    }
    if let Some(body) = otherwise {
        executor.execute_template(body, context_node, context_position, context_size, builder)?;
    }
    Ok(())
}
