//! Order table parser
//!
//! The inquiry page renders one outer table. An order is a header row with
//! one cell per field, followed by a row holding a single merged cell that
//! wraps an inner table of that order's items.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::config::SelectorConfig;
use super::{
    ContextualParser, ParseContext, ParsingError, ParsingResult, child_elements, compile_selector,
    element_text, table_rows,
};
use crate::domain::order::{ItemRecord, OrderHeader};

/// How a direct row of the outer table is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    OrderHeader,
    ItemTable,
    Other,
}

pub struct OrderTableParser {
    table_selector_str: String,
    table: Selector,
    anchor: Selector,
    image: Selector,
    inner_table: Selector,
    min_order_cells: usize,
}

impl OrderTableParser {
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&SelectorConfig::default())
    }

    pub fn with_config(config: &SelectorConfig) -> ParsingResult<Self> {
        Ok(Self {
            table_selector_str: config.order_table.clone(),
            table: compile_selector(&config.order_table)?,
            anchor: compile_selector("a")?,
            image: compile_selector("img")?,
            inner_table: compile_selector("table")?,
            min_order_cells: config.min_order_cells,
        })
    }

    fn classify(&self, cells: &[ElementRef<'_>]) -> RowKind {
        let merged = |cell: &ElementRef<'_>| cell.value().attr("colspan").is_some();
        match cells {
            [single] if merged(single) => RowKind::ItemTable,
            [first, ..] if cells.len() >= self.min_order_cells && !merged(first) => RowKind::OrderHeader,
            _ => RowKind::Other,
        }
    }

    fn extract_order(&self, cells: &[ElementRef<'_>], context: &ParseContext) -> OrderHeader {
        let text = |i: usize| cells.get(i).map(element_text).unwrap_or_default();
        let detail_link = cells
            .get(7)
            .and_then(|cell| cell.select(&self.anchor).next())
            .and_then(|a| a.value().attr("href"))
            .map(|href| context.resolve(href))
            .unwrap_or_default();

        OrderHeader {
            status: text(0),
            order_id: text(1),
            ordered_at: text(2),
            estimated_at: text(3),
            purchased_at: text(4),
            arrived_at: text(5),
            shippable_at: text(6),
            detail_link,
        }
    }

    fn extract_items(&self, cell: ElementRef<'_>, order: &OrderHeader) -> Vec<ItemRecord> {
        let Some(inner) = cell.select(&self.inner_table).next() else {
            return Vec::new();
        };

        table_rows(inner)
            .into_iter()
            .filter_map(|row| {
                let cells: Vec<ElementRef<'_>> = child_elements(row, &["td"]).collect();
                if cells.len() < 2 {
                    return None;
                }
                // A placeholder text instead of an <img> means no image
                let image_url = cells[0]
                    .select(&self.image)
                    .next()
                    .and_then(|img| img.value().attr("src"))
                    .unwrap_or_default()
                    .to_string();
                Some(ItemRecord::new(order, image_url, element_text(&cells[1])))
            })
            .collect()
    }
}

impl ContextualParser for OrderTableParser {
    type Output = Vec<ItemRecord>;

    fn parse_with_context(&self, html: &Html, context: &ParseContext) -> ParsingResult<Self::Output> {
        let table = html.select(&self.table).next().ok_or_else(|| {
            ParsingError::missing_structure(&self.table_selector_str, context.url.as_str())
        })?;

        let (_, items) = table_rows(table).into_iter().fold(
            (None::<OrderHeader>, Vec::new()),
            |(current, mut items), row| {
                let cells: Vec<ElementRef<'_>> = child_elements(row, &["td"]).collect();
                match self.classify(&cells) {
                    RowKind::OrderHeader => (Some(self.extract_order(&cells, context)), items),
                    RowKind::ItemTable => {
                        match &current {
                            Some(order) => items.extend(self.extract_items(cells[0], order)),
                            None => debug!("Skipping item table without an order header on page {}", context.page_number),
                        }
                        (current, items)
                    }
                    RowKind::Other => (current, items),
                }
            },
        );

        debug!("Extracted {} items from page {}", items.len(), context.page_number);
        Ok(items)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use url::Url;

    pub(crate) fn order_row(id: &str, arrived: &str, link: &str) -> String {
        format!(
            r#"<tr><td>発送待ち</td><td>{id}</td><td>2024-04-01</td><td>2024-04-02</td>
               <td>2024-04-03</td><td>{arrived}</td><td></td><td><a href="{link}">詳細</a></td></tr>"#
        )
    }

    pub(crate) fn item_rows(items: &[(&str, &str)]) -> String {
        let rows: String = items
            .iter()
            .map(|(img, name)| {
                let image = if img.is_empty() {
                    "画像無し".to_string()
                } else {
                    format!(r#"<img src="{img}">"#)
                };
                format!("<tr><td>{image}</td><td> {name} </td></tr>")
            })
            .collect();
        format!(r#"<tr><td colspan="8"><table><tbody>{rows}</tbody></table></td></tr>"#)
    }

    pub(crate) fn list_page(body_rows: &str, pagination: &str) -> String {
        format!(
            r#"<html><body>
               <table class="table table-bordered table-striped table-responsive">
                 <thead><tr><th>ステータス</th></tr></thead>
                 <tbody>{body_rows}</tbody>
               </table>
               {pagination}
               </body></html>"#
        )
    }

    fn context() -> ParseContext {
        ParseContext::new(1, Url::parse("https://portal.test/inquiry").unwrap())
    }

    #[test]
    fn items_inherit_preceding_order() {
        let body = format!(
            "{}{}{}{}",
            order_row("A-1", "", "/inquiry/1"),
            item_rows(&[("a.png", "Mug"), ("", "Cup")]),
            order_row("A-2", "2024-05-01", "/inquiry/2"),
            item_rows(&[("b.png", "Bag")]),
        );
        let html = Html::parse_document(&list_page(&body, ""));

        let items = OrderTableParser::new().unwrap().parse_with_context(&html, &context()).unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].order_id(), "A-1");
        assert_eq!(items[0].item_name, "Mug");
        assert_eq!(items[1].image_url, "");
        assert_eq!(items[1].item_name, "Cup");
        assert_eq!(items[2].order_id(), "A-2");
        assert_eq!(items[2].order.arrived_at, "2024-05-01");
        assert_eq!(items[2].detail_link(), "https://portal.test/inquiry/2");
    }

    #[test]
    fn orphan_item_rows_are_skipped() {
        let body = format!("{}{}", item_rows(&[("x.png", "Lost")]), order_row("A-3", "", "/inquiry/3"));
        let html = Html::parse_document(&list_page(&body, ""));

        let items = OrderTableParser::new().unwrap().parse_with_context(&html, &context()).unwrap();

        assert!(items.is_empty());
    }

    #[test]
    fn order_without_link_has_empty_detail_link() {
        let body = format!(
            "{}{}",
            "<tr><td>s</td><td>A-4</td><td></td><td></td><td></td><td></td><td></td><td>-</td></tr>",
            item_rows(&[("c.png", "Pen")])
        );
        let html = Html::parse_document(&list_page(&body, ""));

        let items = OrderTableParser::new().unwrap().parse_with_context(&html, &context()).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].detail_link(), "");
    }

    #[test]
    fn missing_table_is_structural_error() {
        let html = Html::parse_document("<html><body><p>maintenance</p></body></html>");

        let err = OrderTableParser::new().unwrap().parse_with_context(&html, &context()).unwrap_err();

        assert!(matches!(err, ParsingError::MissingStructure { .. }));
    }
}
