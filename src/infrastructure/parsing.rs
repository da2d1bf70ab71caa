//! HTML parsing infrastructure for the order portal
//!
//! Trait-based parsers over `scraper` documents: the order list table, the
//! pagination affordance and the per-order detail page. Markup vocabulary is
//! supplied by [`SelectorConfig`] so the parsers only encode structure.

pub mod config;
pub mod error;
pub mod order_detail_parser;
pub mod order_table_parser;
pub mod pagination;

pub use config::SelectorConfig;
pub use error::{ParsingError, ParsingResult};
pub use order_detail_parser::OrderDetailParser;
pub use order_table_parser::OrderTableParser;
pub use pagination::{NextPage, PaginationParser, StopReason};

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Context information for parsing one fetched page
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// 1-based position of the page within the walk
    pub page_number: u32,
    /// URL the page was served from; relative links resolve against it
    pub url: Url,
}

impl ParseContext {
    pub const fn new(page_number: u32, url: Url) -> Self {
        Self { page_number, url }
    }

    /// Resolve `href` against the page URL, keeping the raw value if it cannot be joined
    pub fn resolve(&self, href: &str) -> String {
        self.url
            .join(href.trim())
            .map_or_else(|_| href.trim().to_string(), |u| u.to_string())
    }
}

/// Parser trait with context support
pub trait ContextualParser {
    type Output;

    fn parse_with_context(&self, html: &Html, context: &ParseContext) -> ParsingResult<Self::Output>;
}

pub(crate) fn compile_selector(selector: &str) -> ParsingResult<Selector> {
    Selector::parse(selector).map_err(|e| ParsingError::invalid_selector(selector, &e.to_string()))
}

/// Concatenated, trimmed text content of an element
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Direct element children with the given tag name, in document order
pub(crate) fn child_elements<'a>(
    element: ElementRef<'a>,
    tags: &'a [&'a str],
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| tags.contains(&child.value().name()))
}

/// Rows of a table body, without descending into nested tables
pub(crate) fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tbody" => rows.extend(child_elements(child, &["tr"])),
            "tr" => rows.push(child),
            _ => {}
        }
    }
    rows
}
