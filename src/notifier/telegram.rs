//! Telegram Bot API delivery
//!
//! Endpoint: `{base}/bot{token}/sendMessage`
//! Body: `{ "chat_id", "text", "parse_mode": "HTML" }`
//! Returns: `{ "ok": bool, "description"?: string }`

use super::{DeliveryError, Notifier};
use crate::config::TelegramConfig;
use crate::model::{format_price, NotifiableEvent};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Listing times are shown in Minsk local time
const DISPLAY_OFFSET_HOURS: i32 = 3;

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    http: reqwest::Client,
    endpoint: String,
    chat_id: i64,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.base_url.trim_end_matches('/'),
                config.bot_token
            ),
            chat_id: config.chat_id,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, event: &NotifiableEvent) -> Result<(), DeliveryError> {
        let text = render_message(event);
        let request = SendMessageRequest {
            chat_id: self.chat_id,
            text: &text,
            parse_mode: "HTML",
        };

        let response = self.http.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        // Telegram reports most failures in the body, sometimes with a 2xx status
        match serde_json::from_str::<ApiResponse>(&body) {
            Ok(api) if api.ok && status.is_success() => Ok(()),
            Ok(api) => Err(DeliveryError::Rejected(format!(
                "HTTP {}: {}",
                status.as_u16(),
                api.description.unwrap_or_else(|| "no description".to_string())
            ))),
            Err(_) => Err(DeliveryError::Rejected(format!(
                "HTTP {}: unexpected body",
                status.as_u16()
            ))),
        }
    }

    fn channel_name(&self) -> &'static str {
        "Telegram"
    }
}

/// Build the HTML message for an event
pub fn render_message(event: &NotifiableEvent) -> String {
    let listing = event.listing();
    let mut lines = Vec::new();

    match event {
        NotifiableEvent::NewListing(_) => {
            lines.push("🆕 <b>New listing</b>".to_string());
            lines.push(format!("<b>{}</b>", escape_html(&listing.title)));
            lines.push(format!("💰 {}", format_price(listing.price)));
        }
        NotifiableEvent::PriceDrop {
            old_price,
            new_price,
            ..
        } => {
            lines.push("📉 <b>Price drop</b>".to_string());
            lines.push(format!("<b>{}</b>", escape_html(&listing.title)));
            lines.push(format!(
                "💰 <s>{}</s> → {}",
                format_price(*old_price),
                format_price(*new_price)
            ));
        }
    }

    if let Some(tag) = &listing.tag {
        lines.push(format!("🏷 #{}", escape_html(&tag.replace(' ', "_"))));
    }
    if let Some(published) = listing.published_at {
        lines.push(format!("🕒 {}", display_time(published)));
    }
    lines.push(escape_html(&listing.link));

    lines.join("\n")
}

fn display_time(time: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(DISPLAY_OFFSET_HOURS * 3600) {
        Some(offset) => time.with_timezone(&offset).format("%d.%m.%Y %H:%M").to_string(),
        None => time.format("%d.%m.%Y %H:%M UTC").to_string(),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Listing, ListingId};
    use chrono::TimeZone;

    fn listing() -> Listing {
        Listing {
            id: ListingId(101),
            title: "Dell <U2412M> & stand".to_string(),
            price: 15_000,
            tag: Some("monitor dell".to_string()),
            link: "https://www.kufar.by/item/101".to_string(),
            published_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 21, 30, 0).unwrap()),
        }
    }

    #[test]
    fn test_new_listing_message() {
        let text = render_message(&NotifiableEvent::NewListing(listing()));

        assert!(text.starts_with("🆕 <b>New listing</b>"));
        assert!(text.contains("Dell &lt;U2412M&gt; &amp; stand"));
        assert!(text.contains("150.00"));
        assert!(text.contains("#monitor_dell"));
        // 21:30 UTC is 00:30 next day in Minsk
        assert!(text.contains("02.03.2024 00:30"));
        assert!(text.ends_with("https://www.kufar.by/item/101"));
    }

    #[test]
    fn test_price_drop_message() {
        let event = NotifiableEvent::PriceDrop {
            listing: Listing {
                tag: None,
                published_at: None,
                ..listing()
            },
            old_price: 20_000,
            new_price: 15_000,
        };
        let text = render_message(&event);

        assert!(text.starts_with("📉 <b>Price drop</b>"));
        assert!(text.contains("<s>200.00</s> → 150.00"));
        assert!(!text.contains('#'));
        assert!(!text.contains("🕒"));
    }
}
