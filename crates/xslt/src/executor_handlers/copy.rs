use crate::error::XsltError;
use crate::executor::TemplateExecutor;
use crate::output::ResultBuilder;
use folio_traits::QName;
use folio_xpath1::{Expression, NodeKind, XNode, XPathValue};

/// `xsl:copy-of`: node-sets are copied deeply, other values become text.
pub(crate) fn handle_copy_of<'s, 'a>(
    executor: &mut TemplateExecutor<'s, 'a>,
    select: &Expression,
    context_node: XNode<'a>,
    context_position: usize,
    context_size: usize,
    builder: &mut ResultBuilder<'_>,
) -> Result<(), XsltError> {
    match executor.evaluate(select, context_node, context_position, context_size)? {
        XPathValue::NodeSet(nodes) => {
            for node in nodes {
                copy_node(node, builder)?;
            }
            Ok(())
        }
        other => builder.text(&other.to_string()),
    }
}

fn copy_node(node: XNode<'_>, builder: &mut ResultBuilder<'_>) -> Result<(), XsltError> {
    match node.kind() {
        NodeKind::Root => {
            for child in node.children() {
                copy_node(child, builder)?;
            }
            Ok(())
        }
        NodeKind::Element => {
            let qualified = node.name();
            let prefix = qualified.split_once(':').map(|(p, _)| p);
            let name = match node.namespace() {
                Some(ns) => QName::with_namespace(prefix, node.local_name(), ns),
                None => QName::local(node.local_name()),
            };
            builder.start_element(name.clone())?;
            for attr in node.attributes() {
                builder.attribute(&attr.name(), attr.string_value())?;
            }
            for child in node.children() {
                copy_node(child, builder)?;
            }
            builder.end_element(&name)
        }
        NodeKind::Attribute => builder.attribute(&node.name(), node.string_value()),
        NodeKind::Text => builder.text(&node.string_value()),
        // The event contract has no comments or processing instructions.
        NodeKind::Comment | NodeKind::ProcessingInstruction => Ok(()),
    }
}
