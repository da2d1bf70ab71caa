//! Next-page affordance detection

use scraper::{Html, Selector};
use url::Url;

use super::config::SelectorConfig;
use super::{ParseContext, ParsingResult, compile_selector};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    Follow(Url),
    Stop(StopReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    NoAffordance,
    Disabled,
    /// Target was empty, `#`, a script pseudo-link or unresolvable
    InvalidTarget(String),
}

pub struct PaginationParser {
    next_link: Selector,
    pagination_item: Selector,
    disabled_class: String,
}

/// `false` for targets that do not navigate anywhere
pub fn is_followable_target(href: &str) -> bool {
    let href = href.trim();
    !(href.is_empty() || href == "#" || href.to_ascii_lowercase().starts_with("javascript"))
}

impl PaginationParser {
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&SelectorConfig::default())
    }

    pub fn with_config(config: &SelectorConfig) -> ParsingResult<Self> {
        Ok(Self {
            next_link: compile_selector(&config.next_page_link)?,
            pagination_item: compile_selector(&config.pagination_item)?,
            disabled_class: config.disabled_class.clone(),
        })
    }

    fn next_item_disabled(&self, html: &Html) -> bool {
        html.select(&self.pagination_item)
            .find(|li| li.select(&self.next_link).next().is_some())
            .and_then(|li| li.value().attr("class"))
            .is_some_and(|class| class.contains(&self.disabled_class))
    }

    pub fn next_page(&self, html: &Html, context: &ParseContext) -> NextPage {
        let Some(link) = html.select(&self.next_link).next() else {
            return NextPage::Stop(StopReason::NoAffordance);
        };

        if self.next_item_disabled(html) {
            return NextPage::Stop(StopReason::Disabled);
        }

        let href = link.value().attr("href").unwrap_or_default();
        if !is_followable_target(href) {
            return NextPage::Stop(StopReason::InvalidTarget(href.to_string()));
        }

        context.url.join(href.trim()).map_or_else(
            |_| NextPage::Stop(StopReason::InvalidTarget(href.to_string())),
            NextPage::Follow,
        )
    }
}
