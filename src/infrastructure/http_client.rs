//! HTTP client for the order portal
//!
//! Cookie-carrying reqwest client: logs into the portal once and then serves
//! list and detail pages to the walker and the enricher. The cookie jar is
//! shared by concurrent detail fetches.

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use scraper::Html;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

use crate::domain::errors::FetchError;
use crate::domain::repositories::{FetchedPage, PageSource};
use crate::infrastructure::config::PortalConfig;
use crate::infrastructure::parsing::{ParsingResult, compile_selector};

/// Configuration for HTTP client behavior
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub follow_redirects: bool,
}

impl HttpClientConfig {
    pub fn from_portal_config(portal: &PortalConfig) -> Self {
        Self {
            timeout_seconds: portal.request_timeout_seconds,
            user_agent: portal.user_agent.clone(),
            follow_redirects: true,
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from_portal_config(&PortalConfig::default())
    }
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn with_config(config: HttpClientConfig) -> Result<Self, FetchError> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .cookie_store(true)
            .gzip(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub const fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Sign in through the portal's login form. The session cookie stays in
    /// this client's jar for every later request.
    pub async fn login(
        &self,
        login_url: &Url,
        username: &str,
        password: &str,
        token_selector: &str,
    ) -> Result<(), FetchError> {
        info!("Logging in at {}", login_url);
        let form_page = self.fetch_page(login_url).await?;
        let token = extract_csrf_token(&form_page.body, token_selector).map_err(|e| {
            FetchError::LoginRejected(format!("token selector unusable: {e}"))
        })?;

        let mut form = vec![("email", username), ("password", password)];
        if let Some(token) = token.as_deref() {
            form.push(("_token", token));
        } else {
            debug!("Login form carries no CSRF token");
        }

        let response = self
            .client
            .post(form_page.url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("Login request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            error!("❌ Login failed with HTTP {}", status);
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: login_url.to_string(),
            });
        }
        // A rejected login redirects back to the form
        if response.url().path() == login_url.path() {
            return Err(FetchError::LoginRejected(
                "portal returned to the login form".to_string(),
            ));
        }

        info!("Login completed");
        Ok(())
    }
}

#[async_trait]
impl PageSource for HttpClient {
    async fn fetch_page(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        debug!("🌐 HTTP GET: {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("HTTP request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            error!("❌ HTTP error {}: {}", status, url);
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(format!("Failed to read response body: {e}")))?;

        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody(url.to_string()));
        }

        Ok(FetchedPage { url: final_url, body })
    }
}

/// Value of the hidden CSRF input, if the form has one
fn extract_csrf_token(body: &str, token_selector: &str) -> ParsingResult<Option<String>> {
    let selector = compile_selector(token_selector)?;
    let document = Html::parse_document(body);
    Ok(document
        .select(&selector)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(ToString::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        assert!(HttpClient::with_config(HttpClientConfig::default()).is_ok());
    }

    #[test]
    fn csrf_token_is_lifted_from_form() {
        let body = r#"<form method="POST"><input type="hidden" name="_token" value="abc123">
                      <input name="email"></form>"#;
        let token = extract_csrf_token(body, r#"input[name="_token"]"#).unwrap();
        assert_eq!(token.as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_token_is_none() {
        let token = extract_csrf_token("<form></form>", r#"input[name="_token"]"#).unwrap();
        assert!(token.is_none());
    }
}
