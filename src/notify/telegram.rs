use std::future::Future;
use std::pin::Pin;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::config::TelegramConfig;
use crate::error::{AppError, Result};
use crate::notify::{MessageRef, Notifier};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Telegram Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Debug, Deserialize)]
struct ChatInfo {
    id: i64,
    #[serde(rename = "type")]
    kind: String,
    title: Option<String>,
    username: Option<String>,
}

/// Telegram Bot API client for signal alerts.
pub struct TelegramNotifier {
    client: Client,
    token: String,
    chat_id: i64,
    thread_id: Option<i64>,
}

impl TelegramNotifier {
    /// Create a notifier for the configured destination, routing
    /// through a proxy when one is set.
    pub fn new(config: &TelegramConfig) -> Self {
        let mut builder = Client::builder().user_agent("Vigil/1.0");

        if let Some(ref proxy_url) = config.proxy_url {
            match reqwest::Proxy::all(proxy_url) {
                Ok(proxy) => {
                    info!("Telegram client using proxy {}", proxy_url);
                    builder = builder.proxy(proxy);
                }
                Err(e) => warn!("Ignoring invalid TELEGRAM_PROXY_URL {}: {}", proxy_url, e),
            }
        }

        let client = builder.build().unwrap_or_else(|_| Client::new());

        Self {
            client,
            token: config.bot_token.clone(),
            chat_id: config.chat_id,
            thread_id: config.thread_id,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", TELEGRAM_API_URL, self.token, method)
    }

    fn message_payload(&self, text: &str, reply_to: Option<MessageRef>) -> serde_json::Value {
        let mut payload = json!({
            "chat_id": self.chat_id,
            "text": text,
        });
        if let Some(thread_id) = self.thread_id {
            payload["message_thread_id"] = json!(thread_id);
        }
        if let Some(MessageRef(message_id)) = reply_to {
            payload["reply_to_message_id"] = json!(message_id);
        }
        payload
    }

    async fn send_message(&self, text: &str, reply_to: Option<MessageRef>) -> Result<MessageRef> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&self.message_payload(text, reply_to))
            .send()
            .await?;

        let payload: ApiResponse<SentMessage> = response.json().await?;
        match payload.result {
            Some(message) if payload.ok => Ok(MessageRef(message.message_id)),
            _ => Err(AppError::Notify(
                payload
                    .description
                    .unwrap_or_else(|| "sendMessage failed".to_string()),
            )),
        }
    }

    async fn fetch_chat(&self) -> Result<ChatInfo> {
        let response = self
            .client
            .post(self.method_url("getChat"))
            .json(&json!({ "chat_id": self.chat_id }))
            .send()
            .await?;

        let payload: ApiResponse<ChatInfo> = response.json().await?;
        match payload.result {
            Some(chat) if payload.ok => Ok(chat),
            _ => Err(AppError::Notify(
                payload
                    .description
                    .unwrap_or_else(|| "getChat failed".to_string()),
            )),
        }
    }

    /// Fetch and log details of the configured destination chat.
    /// A failure here is informational only; alerts may still deliver.
    pub async fn log_chat_info(&self) {
        match self.fetch_chat().await {
            Ok(chat) => {
                info!("📋 Telegram destination: id {} ({})", chat.id, chat.kind);
                if let Some(title) = chat.title {
                    info!("   - Title: {}", title);
                }
                if let Some(username) = chat.username {
                    info!("   - Username: @{}", username);
                }
                if let Some(thread_id) = self.thread_id {
                    info!("   - Message thread id: {}", thread_id);
                }
            }
            Err(e) => warn!("Could not fetch chat info for {}: {}", self.chat_id, e),
        }
    }
}

impl Notifier for TelegramNotifier {
    fn send<'a>(
        &'a self,
        text: &'a str,
        reply_to: Option<MessageRef>,
    ) -> Pin<Box<dyn Future<Output = Result<MessageRef>> + Send + 'a>> {
        Box::pin(self.send_message(text, reply_to))
    }
}
