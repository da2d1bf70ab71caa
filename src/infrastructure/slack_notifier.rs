//! Slack incoming-webhook notifier
//!
//! Announces an order's arrival at the forwarding office. Delivery is
//! best-effort: failures are logged and never abort a sync run.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::repositories::Notifier;
use crate::infrastructure::config::NotificationConfig;

const NOTIFY_TIMEOUT_SECONDS: u64 = 10;
const ARRIVAL_TITLE: &str = "🚚 中国事務所到着通知";

pub struct SlackNotifier {
    webhook_url: Option<String>,
    client: Client,
}

impl SlackNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(NOTIFY_TIMEOUT_SECONDS))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            webhook_url: webhook_url.filter(|url| !url.trim().is_empty()),
            client,
        }
    }

    pub fn from_config(config: &NotificationConfig) -> Self {
        Self::new(config.slack_webhook_url.clone())
    }

    pub const fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }
}

/// Block Kit payload for one arrival
pub fn arrival_message(order_id: &str, arrival_date: &str) -> Value {
    json!({
        "text": format!("{ARRIVAL_TITLE}: {order_id} ({arrival_date})"),
        "blocks": [
            {
                "type": "header",
                "text": { "type": "plain_text", "text": ARRIVAL_TITLE, "emoji": true }
            },
            {
                "type": "section",
                "fields": [
                    { "type": "mrkdwn", "text": format!("*注文番号:*\n{order_id}") },
                    { "type": "mrkdwn", "text": format!("*到着日:*\n{arrival_date}") }
                ]
            }
        ]
    })
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, order_id: &str, arrival_date: &str) {
        let Some(webhook_url) = &self.webhook_url else {
            debug!("No webhook configured, skipping arrival notice for {}", order_id);
            return;
        };

        let payload = arrival_message(order_id, arrival_date);
        match self.client.post(webhook_url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                info!("📣 Arrival notice sent for {} ({})", order_id, arrival_date);
            }
            Ok(response) => {
                warn!(
                    "Arrival notice for {} rejected with HTTP {}",
                    order_id,
                    response.status()
                );
            }
            Err(e) => {
                warn!("Arrival notice for {} failed: {}", order_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_carries_order_and_date() {
        let message = arrival_message("ORDER123", "2024-05-01");
        assert_eq!(message["blocks"][0]["type"], "header");
        assert_eq!(message["blocks"][0]["text"]["text"], ARRIVAL_TITLE);
        let fields = message["blocks"][1]["fields"].as_array().unwrap();
        assert_eq!(fields[0]["text"], "*注文番号:*\nORDER123");
        assert_eq!(fields[1]["text"], "*到着日:*\n2024-05-01");
    }

    #[test]
    fn blank_webhook_disables_notifier() {
        assert!(!SlackNotifier::new(Some("  ".to_string())).is_enabled());
        assert!(!SlackNotifier::from_config(&NotificationConfig::default()).is_enabled());
        assert!(SlackNotifier::new(Some("https://hooks.slack.test/x".to_string())).is_enabled());
    }

    #[tokio::test]
    async fn disabled_notifier_returns_quietly() {
        SlackNotifier::new(None).notify("ORDER123", "2024-05-01").await;
    }
}
