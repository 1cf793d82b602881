//! The XSL-FO elements this formatter understands and where each may appear.

use folio_traits::{QName, ValidationError};

pub const FO_NS: &str = "http://www.w3.org/1999/XSL/Format";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FoKind {
    Root,
    LayoutMasterSet,
    SimplePageMaster,
    RegionBody,
    RegionBefore,
    RegionAfter,
    RegionStart,
    RegionEnd,
    PageSequence,
    Title,
    StaticContent,
    Flow,
    Block,
    BlockContainer,
    Inline,
    PageNumber,
    Table,
    TableColumn,
    TableHeader,
    TableFooter,
    TableBody,
    TableRow,
    TableCell,
}

impl FoKind {
    pub fn from_local_name(name: &str) -> Option<Self> {
        let kind = match name {
            "root" => FoKind::Root,
            "layout-master-set" => FoKind::LayoutMasterSet,
            "simple-page-master" => FoKind::SimplePageMaster,
            "region-body" => FoKind::RegionBody,
            "region-before" => FoKind::RegionBefore,
            "region-after" => FoKind::RegionAfter,
            "region-start" => FoKind::RegionStart,
            "region-end" => FoKind::RegionEnd,
            "page-sequence" => FoKind::PageSequence,
            "title" => FoKind::Title,
            "static-content" => FoKind::StaticContent,
            "flow" => FoKind::Flow,
            "block" => FoKind::Block,
            "block-container" => FoKind::BlockContainer,
            "inline" => FoKind::Inline,
            "page-number" => FoKind::PageNumber,
            "table" => FoKind::Table,
            "table-column" => FoKind::TableColumn,
            "table-header" => FoKind::TableHeader,
            "table-footer" => FoKind::TableFooter,
            "table-body" => FoKind::TableBody,
            "table-row" => FoKind::TableRow,
            "table-cell" => FoKind::TableCell,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether `child` may appear directly inside `self`.
    pub fn allows_child(self, child: FoKind) -> bool {
        use FoKind::*;
        match self {
            Root => matches!(child, LayoutMasterSet | PageSequence),
            LayoutMasterSet => child == SimplePageMaster,
            SimplePageMaster => matches!(child, RegionBody | RegionBefore | RegionAfter | RegionStart | RegionEnd),
            PageSequence => matches!(child, Title | StaticContent | Flow),
            Title => matches!(child, Inline | PageNumber),
            StaticContent | Flow | BlockContainer | TableCell => matches!(child, Block | BlockContainer | Table),
            Block => matches!(child, Block | BlockContainer | Inline | PageNumber | Table),
            Inline => matches!(child, Inline | PageNumber),
            Table => matches!(child, TableColumn | TableHeader | TableFooter | TableBody),
            TableHeader | TableFooter | TableBody => child == TableRow,
            TableRow => child == TableCell,
            RegionBody | RegionBefore | RegionAfter | RegionStart | RegionEnd | PageNumber | TableColumn => false,
        }
    }

    /// Whether non-whitespace character data may appear directly inside `self`.
    pub fn allows_text(self) -> bool {
        matches!(self, FoKind::Block | FoKind::Inline | FoKind::Title)
    }
}

/// Resolves an element name to an FO kind, rejecting anything outside the
/// supported vocabulary.
pub fn classify(name: &QName) -> Result<FoKind, ValidationError> {
    if !name.is_in(FO_NS) {
        return Err(ValidationError::new(
            name.qualified(),
            "element is not in the XSL-FO namespace",
        ));
    }
    FoKind::from_local_name(&name.local)
        .ok_or_else(|| ValidationError::new(name.qualified(), "unknown formatting object"))
}

/// Checks that `child` may appear where it does. `parent` is `None` for the
/// document element.
pub fn check_placement(parent: Option<(FoKind, &QName)>, child: FoKind, child_name: &QName) -> Result<(), ValidationError> {
    match parent {
        None if child == FoKind::Root => Ok(()),
        None => Err(ValidationError::new(child_name.qualified(), "document element must be fo:root")),
        Some((parent_kind, _)) if parent_kind.allows_child(child) => Ok(()),
        Some((_, parent_name)) => Err(ValidationError::new(
            child_name.qualified(),
            format!("not allowed as a child of {}", parent_name.qualified()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fo(local: &str) -> QName {
        QName::with_namespace(Some("fo"), local, FO_NS)
    }

    #[test]
    fn known_and_unknown_elements() {
        assert_eq!(classify(&fo("table-cell")).unwrap(), FoKind::TableCell);
        let err = classify(&fo("tabel")).unwrap_err();
        assert_eq!(err.element, "fo:tabel");
        assert!(classify(&QName::local("block")).is_err());
    }

    #[test]
    fn placement_rules() {
        let flow = fo("flow");
        assert!(check_placement(Some((FoKind::Flow, &flow)), FoKind::Block, &fo("block")).is_ok());
        let err = check_placement(Some((FoKind::Flow, &flow)), FoKind::TableRow, &fo("table-row")).unwrap_err();
        assert!(err.message.contains("fo:flow"));
        assert!(check_placement(None, FoKind::Block, &fo("block")).is_err());
        assert!(check_placement(None, FoKind::Root, &fo("root")).is_ok());
    }

    #[test]
    fn text_only_in_inline_contexts() {
        assert!(FoKind::Block.allows_text());
        assert!(!FoKind::TableRow.allows_text());
        assert!(!FoKind::Flow.allows_text());
    }
}
