//! Selector configuration for HTML extraction
//!
//! Centralized CSS selectors and labels for the order portal markup.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Primary order table on list pages; required on every page
    pub order_table: String,

    /// Minimum number of direct cells that marks an order header row
    pub min_order_cells: usize,

    /// Anchor of the "next page" affordance
    pub next_page_link: String,

    /// Pagination list items; the one holding the next link may carry `disabled_class`
    pub pagination_item: String,

    pub disabled_class: String,

    /// Headings that open a product section on a detail page
    pub detail_section_heading: String,

    /// Regex a heading's text must match to count as a product section
    pub detail_section_pattern: String,

    /// Tables on the detail page, one per product section, in order
    pub detail_table: String,

    /// Header cell text labelling the color/size selection
    pub color_size_label: String,

    /// Header cell text labelling the product URL
    pub product_url_label: String,

    /// Hidden CSRF input on the login form
    pub login_token_input: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            order_table: "table.table.table-bordered.table-striped.table-responsive".to_string(),
            min_order_cells: 8,
            next_page_link: r#"ul.pagination a[rel="next"]"#.to_string(),
            pagination_item: "ul.pagination li".to_string(),
            disabled_class: "disabled".to_string(),
            detail_section_heading: "h3".to_string(),
            detail_section_pattern: r"商品\d+".to_string(),
            detail_table: "table.table.table-bordered.table-striped.table-responsive".to_string(),
            color_size_label: "色・サイズ等指定".to_string(),
            product_url_label: "URL".to_string(),
            login_token_input: r#"input[name="_token"]"#.to_string(),
        }
    }
}
