use crate::ast::{AttributeValueTemplate, PreparsedTemplate};
use crate::error::XsltError;
use crate::executor::TemplateExecutor;
use crate::output::ResultBuilder;
use folio_traits::QName;
use folio_xpath1::XNode;

#[allow(clippy::too_many_arguments)]
pub(crate) fn handle_literal_element<'s, 'a>(
    executor: &mut TemplateExecutor<'s, 'a>,
    name: &QName,
    attrs: &[(String, AttributeValueTemplate)],
    body: &PreparsedTemplate,
    context_node: XNode<'a>,
    context_position: usize,
    context_size: usize,
    builder: &mut ResultBuilder<'_>,
) -> Result<(), XsltError> {
    builder.start_element(name.clone())?;
    for (attr_name, avt) in attrs {
        let value = executor.evaluate_avt(avt, context_node, context_position, context_size)?;
        builder.attribute(attr_name, value)?;
    }
    executor.execute_template(body, context_node, context_position, context_size, builder)?;
    builder.end_element(name)
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn handle_element<'s, 'a>(
    executor: &mut TemplateExecutor<'s, 'a>,
    name: &AttributeValueTemplate,
    namespace: Option<&AttributeValueTemplate>,
    namespaces: &[(String, String)],
    body: &PreparsedTemplate,
    context_node: XNode<'a>,
    context_position: usize,
    context_size: usize,
    builder: &mut ResultBuilder<'_>,
) -> Result<(), XsltError> {
    let qualified = executor.evaluate_avt(name, context_node, context_position, context_size)?;
    let (prefix, local) = match qualified.split_once(':') {
        Some((p, l)) => (Some(p), l),
        None => (None, qualified.as_str()),
    };
    if local.is_empty() || prefix.is_some_and(str::is_empty) {
        return Err(XsltError::Execution(format!("'{}' is not a valid element name", qualified)));
    }

    let uri = match namespace {
        Some(avt) => Some(executor.evaluate_avt(avt, context_node, context_position, context_size)?),
        None => match prefix {
            Some(p) => Some(
                namespaces
                    .iter()
                    .find(|(bound, _)| bound == p)
                    .map(|(_, uri)| uri.clone())
                    .ok_or_else(|| XsltError::Execution(format!("undeclared namespace prefix '{}'", p)))?,
            ),
            None => None,
        },
    };

    let element = match uri.filter(|u| !u.is_empty()) {
        Some(uri) => QName::with_namespace(prefix, local, uri),
        None => QName::local(local),
    };
    builder.start_element(element.clone())?;
    executor.execute_template(body, context_node, context_position, context_size, builder)?;
    builder.end_element(&element)
}

/// `xsl:attribute`: the value is the string value of the instantiated body.
pub(crate) fn handle_attribute<'s, 'a>(
    executor: &mut TemplateExecutor<'s, 'a>,
    name: &AttributeValueTemplate,
    body: &PreparsedTemplate,
    context_node: XNode<'a>,
    context_position: usize,
    context_size: usize,
    builder: &mut ResultBuilder<'_>,
) -> Result<(), XsltError> {
    let attr_name = executor.evaluate_avt(name, context_node, context_position, context_size)?;
    if attr_name.is_empty() || attr_name == "xmlns" {
        return Err(XsltError::Execution(format!("'{}' is not a valid attribute name", attr_name)));
    }
    let value = executor.fragment_text(body, context_node, context_position, context_size)?;
    builder.attribute(&attr_name, value)
}
