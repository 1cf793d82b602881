//! The XPath data model over a parsed `roxmltree` document.

use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};

/// The type of a node, aligned with the XPath 1.0 data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// Any node reachable by an XPath expression.
///
/// `roxmltree` keeps attributes apart from the node tree, while the XPath data
/// model treats them as nodes whose parent is the owning element. This enum
/// unifies the two. The attribute `index` is its position on the owner and is
/// used for document ordering.
#[derive(Clone, Copy)]
pub enum XNode<'a> {
    Node(roxmltree::Node<'a, 'a>),
    Attribute {
        attr: roxmltree::Attribute<'a, 'a>,
        owner: roxmltree::Node<'a, 'a>,
        index: usize,
    },
}

impl<'a> XNode<'a> {
    /// The root node of a document (the parent of the document element).
    pub fn root_of(doc: &'a roxmltree::Document<'a>) -> Self {
        XNode::Node(doc.root())
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            XNode::Attribute { .. } => NodeKind::Attribute,
            XNode::Node(n) => match n.node_type() {
                roxmltree::NodeType::Root => NodeKind::Root,
                roxmltree::NodeType::Element => NodeKind::Element,
                roxmltree::NodeType::Text => NodeKind::Text,
                roxmltree::NodeType::Comment => NodeKind::Comment,
                roxmltree::NodeType::PI => NodeKind::ProcessingInstruction,
            },
        }
    }

    pub fn is_element(&self) -> bool {
        self.kind() == NodeKind::Element
    }

    /// Local part of the node's name; empty for unnamed nodes.
    pub fn local_name(&self) -> &'a str {
        match self {
            XNode::Node(n) if n.is_element() => n.tag_name().name(),
            XNode::Node(n) => n.pi().map(|pi| pi.target).unwrap_or(""),
            XNode::Attribute { attr, .. } => attr.name(),
        }
    }

    pub fn namespace(&self) -> Option<&'a str> {
        match self {
            XNode::Node(n) if n.is_element() => n.tag_name().namespace(),
            XNode::Node(_) => None,
            XNode::Attribute { attr, .. } => attr.namespace(),
        }
    }

    /// The qualified name as written in the source, e.g. `fo:block`.
    pub fn name(&self) -> String {
        let local = self.local_name();
        let prefix = match (self, self.namespace()) {
            (XNode::Node(n), Some(ns)) => n.lookup_prefix(ns),
            (XNode::Attribute { owner, .. }, Some(ns)) => owner.lookup_prefix(ns),
            _ => None,
        };
        match prefix {
            Some(p) if !p.is_empty() => format!("{}:{}", p, local),
            _ => local.to_string(),
        }
    }

    /// The string value as defined by the XPath 1.0 `string()` function.
    pub fn string_value(&self) -> String {
        match self {
            XNode::Attribute { attr, .. } => attr.value().to_string(),
            XNode::Node(n) => match n.node_type() {
                roxmltree::NodeType::Text | roxmltree::NodeType::Comment => {
                    n.text().unwrap_or("").to_string()
                }
                roxmltree::NodeType::PI => n.pi().and_then(|pi| pi.value).unwrap_or("").to_string(),
                _ => {
                    let mut s = String::new();
                    for d in n.descendants().filter(|d| d.is_text()) {
                        s.push_str(d.text().unwrap_or(""));
                    }
                    s
                }
            },
        }
    }

    /// Value of the named attribute (unqualified) on an element node.
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        match self {
            XNode::Node(n) => n.attribute(name),
            XNode::Attribute { .. } => None,
        }
    }

    /// Attribute nodes of an element, in source order.
    pub fn attributes(&self) -> Vec<XNode<'a>> {
        match self {
            XNode::Node(n) if n.is_element() => {
                let owner = *n;
                n.attributes()
                    .enumerate()
                    .map(|(index, attr)| XNode::Attribute { attr, owner, index })
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    /// Child nodes with whitespace-only text removed (an implicit
    /// `xsl:strip-space elements="*"` over the source tree).
    pub fn children(&self) -> Vec<XNode<'a>> {
        match self {
            XNode::Node(n) => n.children().filter(is_significant).map(XNode::Node).collect(),
            XNode::Attribute { .. } => Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<XNode<'a>> {
        match self {
            XNode::Node(n) => n.parent().map(XNode::Node),
            XNode::Attribute { owner, .. } => Some(XNode::Node(*owner)),
        }
    }

    pub fn next_sibling(&self) -> Option<XNode<'a>> {
        let XNode::Node(n) = self else { return None };
        let mut cur = n.next_sibling();
        while let Some(s) = cur {
            if is_significant(&s) {
                return Some(XNode::Node(s));
            }
            cur = s.next_sibling();
        }
        None
    }

    pub fn prev_sibling(&self) -> Option<XNode<'a>> {
        let XNode::Node(n) = self else { return None };
        let mut cur = n.prev_sibling();
        while let Some(s) = cur {
            if is_significant(&s) {
                return Some(XNode::Node(s));
            }
            cur = s.prev_sibling();
        }
        None
    }

    /// Document-order key. Node ids are assigned in parse order; an
    /// attribute sorts right after its owner and before the owner's children.
    pub fn sort_key(&self) -> (roxmltree::NodeId, usize) {
        match self {
            XNode::Node(n) => (n.id(), 0),
            XNode::Attribute { owner, index, .. } => (owner.id(), index + 1),
        }
    }
}

fn is_significant(n: &roxmltree::Node<'_, '_>) -> bool {
    if n.is_text() {
        n.text().is_some_and(|t| !t.trim().is_empty())
    } else {
        true
    }
}

impl Debug for XNode<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            XNode::Node(n) => n.fmt(f),
            XNode::Attribute { attr, .. } => attr.fmt(f),
        }
    }
}

impl PartialEq for XNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for XNode<'_> {}

impl Hash for XNode<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sort_key().hash(state);
    }
}

impl PartialOrd for XNode<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for XNode<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, i) = self.sort_key();
        let (b, j) = other.sort_key();
        (a.get(), i).cmp(&(b.get(), j))
    }
}

/// Sorts a node list into document order and removes duplicates.
pub fn sort_document_order(nodes: &mut Vec<XNode<'_>>) {
    nodes.sort();
    nodes.dedup();
}
