//! Telegram Bot channel — Bot API client, update parsing and long polling.

use async_trait::async_trait;
use futures::stream::Stream;
use rollcall_core::error::{Result, RollcallError};
use rollcall_core::traits::Transport;
use rollcall_core::types::{ChatMember, InboundEvent, PollHandle, VoteEvent};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// Seconds Telegram holds a `getUpdates` request open.
const LONG_POLL_TIMEOUT_SECS: u64 = 30;

/// Telegram channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

fn default_api_base() -> String {
    "https://api.telegram.org".into()
}
fn default_poll_interval() -> u64 {
    1
}

impl From<&rollcall_core::config::TelegramConfig> for TelegramConfig {
    fn from(cfg: &rollcall_core::config::TelegramConfig) -> Self {
        Self {
            bot_token: cfg.bot_token.clone(),
            api_base: cfg.api_base.clone(),
            poll_interval: cfg.poll_interval,
        }
    }
}

/// Telegram Bot API client.
#[derive(Clone)]
pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
    last_update_id: i64,
    bot_username: Option<String>,
}

impl TelegramChannel {
    /// Build the client. Fails when the HTTP client (TLS backend) cannot
    /// be initialised.
    pub fn new(config: TelegramConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(LONG_POLL_TIMEOUT_SECS + 10))
            .build()
            .map_err(|e| RollcallError::Transport(format!("HTTP client init failed: {e}")))?;
        Ok(Self {
            config,
            client,
            last_update_id: 0,
            bot_username: None,
        })
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token,
            method
        )
    }

    /// Call a Bot API method with a JSON body and unwrap the `result` field.
    async fn call<T: DeserializeOwned>(&self, method: &str, body: serde_json::Value) -> Result<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| RollcallError::Transport(format!("Telegram {method} failed: {e}")))?;

        let body: TelegramApiResponse<T> = response.json().await.map_err(|e| {
            RollcallError::Transport(format!("Invalid Telegram {method} response: {e}"))
        })?;

        if !body.ok {
            return Err(RollcallError::Transport(format!(
                "Telegram API error in {method}: {}",
                body.description.unwrap_or_default()
            )));
        }
        body.result
            .ok_or_else(|| RollcallError::Transport(format!("Telegram {method} returned no result")))
    }

    /// Username of the bot, once [`connect`](Self::connect) has run.
    pub fn bot_username(&self) -> Option<&str> {
        self.bot_username.as_deref()
    }

    /// Get bot info.
    pub async fn get_me(&self) -> Result<TelegramUser> {
        self.call("getMe", serde_json::json!({})).await
    }

    /// Verify the token and remember the bot username for command parsing.
    pub async fn connect(&mut self) -> Result<TelegramUser> {
        let me = self.get_me().await?;
        tracing::info!(
            "Telegram bot: @{} ({})",
            me.username.as_deref().unwrap_or("unknown"),
            me.first_name
        );
        self.bot_username = me.username.clone();
        Ok(me)
    }

    /// Register the webhook URL Telegram should push updates to.
    pub async fn set_webhook(&self, url: &str, secret_token: Option<&str>) -> Result<()> {
        let mut body = serde_json::json!({
            "url": url,
            "allowed_updates": ["message", "poll_answer"],
        });
        if let Some(secret) = secret_token.filter(|s| !s.is_empty()) {
            body["secret_token"] = serde_json::Value::String(secret.to_string());
        }
        let _: bool = self.call("setWebhook", body).await?;
        Ok(())
    }

    /// Remove the webhook so `getUpdates` can be used.
    pub async fn delete_webhook(&self) -> Result<()> {
        let _: bool = self.call("deleteWebhook", serde_json::json!({})).await?;
        Ok(())
    }

    /// Get updates using long polling.
    pub async fn get_updates(&mut self) -> Result<Vec<TelegramUpdate>> {
        let updates: Vec<TelegramUpdate> = self
            .call(
                "getUpdates",
                serde_json::json!({
                    "offset": self.last_update_id + 1,
                    "timeout": LONG_POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message", "poll_answer"],
                }),
            )
            .await?;

        if let Some(last) = updates.last() {
            self.last_update_id = last.update_id;
        }
        Ok(updates)
    }

    /// Send a plain text message (no parse mode: names may contain markup characters).
    pub async fn send_text(&self, chat_id: i64, text: &str) -> Result<TelegramMessage> {
        self.call(
            "sendMessage",
            serde_json::json!({
                "chat_id": chat_id,
                "text": text,
            }),
        )
        .await
    }

    /// Start polling loop — returns a stream of inbound events.
    pub fn start_polling(self) -> TelegramPollingStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut channel = self;
            tracing::info!("Telegram polling loop started");

            loop {
                match channel.get_updates().await {
                    Ok(updates) => {
                        for update in updates {
                            if let Some(event) = update.to_inbound(channel.bot_username())
                                && tx.send(event).is_err()
                            {
                                tracing::info!("Telegram polling stopped (receiver dropped)");
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("Telegram polling error: {e}");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }

                tokio::time::sleep(Duration::from_secs(channel.config.poll_interval)).await;
            }
        });

        TelegramPollingStream { rx }
    }
}

/// Stream of inbound events from polling.
pub struct TelegramPollingStream {
    rx: tokio::sync::mpsc::UnboundedReceiver<InboundEvent>,
}

impl Stream for TelegramPollingStream {
    type Item = InboundEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[async_trait]
impl Transport for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_poll(
        &self,
        chat_id: i64,
        question: &str,
        options: &[String],
        anonymous: bool,
    ) -> Result<PollHandle> {
        let message: TelegramMessage = self
            .call(
                "sendPoll",
                serde_json::json!({
                    "chat_id": chat_id,
                    "question": question,
                    "options": options,
                    "is_anonymous": anonymous,
                    "allows_multiple_answers": false,
                }),
            )
            .await?;

        let poll = message
            .poll
            .ok_or_else(|| RollcallError::Transport("sendPoll response has no poll".into()))?;
        Ok(PollHandle {
            poll_id: poll.id,
            message_id: message.message_id,
        })
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        self.send_text(chat_id, text).await.map(|_| ())
    }

    async fn list_privileged_members(&self, chat_id: i64) -> Result<Vec<ChatMember>> {
        let admins: Vec<TelegramChatMember> = self
            .call(
                "getChatAdministrators",
                serde_json::json!({ "chat_id": chat_id }),
            )
            .await?;
        Ok(admins.into_iter().map(|m| m.user.to_member()).collect())
    }
}

// --- Telegram API Types ---

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
    #[serde(default)]
    pub poll_answer: Option<TelegramPollAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub poll: Option<TelegramPoll>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl TelegramUser {
    /// First and last name joined.
    pub fn full_name(&self) -> String {
        match self.last_name.as_deref().filter(|l| !l.is_empty()) {
            Some(last) => format!("{} {last}", self.first_name),
            None => self.first_name.clone(),
        }
    }

    pub fn to_member(&self) -> ChatMember {
        ChatMember {
            id: self.id.to_string(),
            first_name: self.first_name.clone(),
            display_name: self.full_name(),
            handle: self.username.clone(),
            is_automated: self.is_bot,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramPoll {
    pub id: String,
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramPollAnswer {
    pub poll_id: String,
    pub user: Option<TelegramUser>,
    #[serde(default)]
    pub option_ids: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChatMember {
    pub status: String,
    pub user: TelegramUser,
}

impl TelegramUpdate {
    /// Convert to an inbound event; `None` for updates the bot ignores.
    /// Commands addressed to another bot (`/status@other_bot`) are dropped.
    pub fn to_inbound(&self, bot_username: Option<&str>) -> Option<InboundEvent> {
        if let Some(answer) = &self.poll_answer {
            // Anonymous votes (no user) cannot be attributed
            let user = answer.user.as_ref()?;
            return Some(InboundEvent::Vote(VoteEvent {
                poll_id: answer.poll_id.clone(),
                user_id: user.id.to_string(),
                display_name: user.full_name(),
                selected_option_indexes: answer.option_ids.iter().copied().collect(),
            }));
        }

        let msg = self.message.as_ref()?;
        let text = msg.text.as_deref()?;
        let from = msg.from.as_ref()?;
        if from.is_bot {
            return None;
        }

        let name = parse_command(text, bot_username)?;
        Some(InboundEvent::Command {
            chat_id: msg.chat.id,
            name,
            sender: from.full_name(),
        })
    }
}

/// Extract the command name from `/name@bot args`.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<String> {
    let head = text.trim_start().split_whitespace().next()?;
    let body = head.strip_prefix('/')?;
    let (name, target) = match body.split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (body, None),
    };
    if let (Some(target), Some(me)) = (target, bot_username)
        && !target.eq_ignore_ascii_case(me)
    {
        return None;
    }
    if name.is_empty() {
        return None;
    }
    Some(name.to_ascii_lowercase())
}
