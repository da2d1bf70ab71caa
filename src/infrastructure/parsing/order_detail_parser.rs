//! Order detail page parser
//!
//! A detail page lists one section per purchased product ("商品1", "商品2", ...).
//! The i-th section heading pairs with the i-th detail table, whose rows hold
//! header/value cell pairs.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::config::SelectorConfig;
use super::{
    ContextualParser, ParseContext, ParsingError, ParsingResult, child_elements, compile_selector,
    element_text, table_rows,
};
use crate::domain::order::ProductLink;

pub struct OrderDetailParser {
    heading: Selector,
    section_pattern: Regex,
    table: Selector,
    anchor: Selector,
    color_size_label: String,
    product_url_label: String,
}

impl OrderDetailParser {
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&SelectorConfig::default())
    }

    pub fn with_config(config: &SelectorConfig) -> ParsingResult<Self> {
        let section_pattern =
            Regex::new(&config.detail_section_pattern).map_err(|e| ParsingError::InvalidPattern {
                pattern: config.detail_section_pattern.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            heading: compile_selector(&config.detail_section_heading)?,
            section_pattern,
            table: compile_selector(&config.detail_table)?,
            anchor: compile_selector("a")?,
            color_size_label: config.color_size_label.clone(),
            product_url_label: config.product_url_label.clone(),
        })
    }

    fn section_count(&self, html: &Html) -> usize {
        html.select(&self.heading)
            .filter(|h| self.section_pattern.is_match(&element_text(h)))
            .count()
    }

    fn extract_product(&self, table: ElementRef<'_>) -> ProductLink {
        let mut product = ProductLink::default();

        for row in table_rows(table) {
            let cells: Vec<ElementRef<'_>> = child_elements(row, &["th", "td"]).collect();
            for pair in cells.windows(2) {
                let (label, value) = (&pair[0], &pair[1]);
                if label.value().name() != "th" {
                    continue;
                }
                let label_text = element_text(label);
                if label_text == self.color_size_label {
                    product.color_size = collapse_whitespace(&element_text(value));
                } else if label_text == self.product_url_label {
                    product.product_link = value
                        .select(&self.anchor)
                        .next()
                        .and_then(|a| a.value().attr("href"))
                        .unwrap_or_default()
                        .to_string();
                }
            }
        }

        product
    }
}

/// Fold line breaks and runs of spaces into single spaces
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl ContextualParser for OrderDetailParser {
    type Output = Vec<ProductLink>;

    fn parse_with_context(&self, html: &Html, context: &ParseContext) -> ParsingResult<Self::Output> {
        let sections = self.section_count(html);
        let products: Vec<ProductLink> = html
            .select(&self.table)
            .take(sections)
            .map(|table| self.extract_product(table))
            .collect();

        debug!(
            "Found {} product sections ({} parsed) on {}",
            sections,
            products.len(),
            context.url
        );
        Ok(products)
    }
}
