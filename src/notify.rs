//! Best-effort chat notification over the Telegram Bot API.
//!
//! `notify` never fails the caller: missing credentials disable the channel
//! silently, transport and HTTP errors are logged and dropped. A lost
//! notification must never abort the task or roll back a state update.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[async_trait]
pub trait Notify: Send + Sync {
    async fn notify(&self, text: &str);
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

struct Credentials {
    token: String,
    chat_id: String,
}

pub struct TelegramNotifier {
    client: Client,
    credentials: Option<Credentials>,
}

impl TelegramNotifier {
    /// Build from `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID`. Either one
    /// missing leaves the notifier disabled.
    pub fn from_env(client: Client) -> Self {
        let credentials = match (config::telegram_bot_token(), config::telegram_chat_id()) {
            (Some(token), Some(chat_id)) => Some(Credentials { token, chat_id }),
            _ => {
                info!("Telegram credentials not set; notifications disabled");
                None
            }
        };
        Self {
            client,
            credentials,
        }
    }
}

#[async_trait]
impl Notify for TelegramNotifier {
    async fn notify(&self, text: &str) {
        let Some(creds) = &self.credentials else {
            debug!("No Telegram credentials; skipping send");
            return;
        };
        let url = format!("{}/bot{}/sendMessage", TELEGRAM_API_BASE, creds.token);
        let body = SendMessage {
            chat_id: &creds.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };
        match self.client.post(&url).json(&body).send().await {
            Ok(res) if res.status().is_success() => info!("📨 Telegram send: OK"),
            Ok(res) => warn!("Telegram send: HTTP {}", res.status()),
            // without_url: the request URL embeds the bot token.
            Err(e) => warn!("Telegram send error: {}", e.without_url()),
        }
    }
}
