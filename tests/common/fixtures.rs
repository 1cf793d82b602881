use folio::{Column, ExportConfig, TableModel};

/// Name/Amount table grouped by name: `("A",10)`, `("A",20)`.
pub fn grouped_sales() -> TableModel {
    TableModel::new(vec![Column::new("Name"), Column::new("Amount").totaled()])
        .with_row(vec!["A".into(), 10i64.into()])
        .with_row(vec!["A".into(), 20i64.into()])
        .group_by(0)
}

/// `columns` text columns and `rows` rows of `r{row}c{col}` cells.
pub fn text_table(columns: usize, rows: usize) -> TableModel {
    let mut model = TableModel::new((0..columns).map(|c| Column::new(format!("Col {}", c))).collect());
    for r in 0..rows {
        model = model.with_row((0..columns).map(|c| format!("r{}c{}", r, c).into()).collect());
    }
    model
}

/// Region/City/Store/Sales rows sorted by the first three columns.
pub fn three_level_sales() -> TableModel {
    let mut model = TableModel::new(vec![
        Column::new("Region"),
        Column::new("City"),
        Column::new("Store"),
        Column::new("Sales").totaled(),
    ]);
    for (region, city, store, sales) in [
        ("North", "Oslo", "Main", 5i64),
        ("North", "Oslo", "Main", 7),
        ("North", "Oslo", "Pier", 1),
        ("North", "Bergen", "Wharf", 3),
        ("South", "Kristiansand", "Dock", 4),
    ] {
        model = model.with_row(vec![region.into(), city.into(), store.into(), sales.into()]);
    }
    model.group_by(0).group_by(1).group_by(2)
}

/// A stylesheet whose output uses an element the formatter does not know.
pub const MISSPELLED_FO_STYLESHEET: &str = r#"<xsl:stylesheet version="1.0"
    xmlns:xsl="http://www.w3.org/1999/XSL/Transform"
    xmlns:fo="http://www.w3.org/1999/XSL/Format">
  <xsl:template match="/">
    <fo:root>
      <fo:layout-master-set>
        <fo:simple-page-master master-name="p"><fo:region-body/></fo:simple-page-master>
      </fo:layout-master-set>
      <fo:page-sequence master-reference="p">
        <fo:flow flow-name="xsl-region-body">
          <fo:blok><xsl:value-of select="count(//row)"/> rows</fo:blok>
        </fo:flow>
      </fo:page-sequence>
    </fo:root>
  </xsl:template>
</xsl:stylesheet>"#;

pub fn with_stylesheet(model: TableModel, body: &str) -> TableModel {
    let config = model.config.clone().with(ExportConfig::STYLESHEET_BODY, body);
    model.with_config(config)
}
