use crate::ast::{PreparsedTemplate, SortKey};
use crate::error::XsltError;
use crate::executor::TemplateExecutor;
use crate::output::ResultBuilder;
use folio_xpath1::{Expression, XNode, XPathValue};

#[allow(clippy::too_many_arguments)]
pub(crate) fn handle_for_each<'s, 'a>(
    executor: &mut TemplateExecutor<'s, 'a>,
    select: &Expression,
    sort_keys: &[SortKey],
    body: &PreparsedTemplate,
    context_node: XNode<'a>,
    context_position: usize,
    context_size: usize,
    builder: &mut ResultBuilder<'_>,
) -> Result<(), XsltError> {
    let mut nodes = match executor.evaluate(select, context_node, context_position, context_size)? {
        XPathValue::NodeSet(nodes) => nodes,
        other => {
            return Err(XsltError::Execution(format!(
                "xsl:for-each select must produce a node-set, got '{}'",
                other
            )));
        }
    };
    executor.sort_node_set(&mut nodes, sort_keys)?;

    let size = nodes.len();
    for (i, node) in nodes.into_iter().enumerate() {
        executor.execute_template(body, node, i + 1, size, builder)?;
    }
    Ok(())
}
