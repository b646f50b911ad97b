//! Rollcall configuration system.
//!
//! Loaded from TOML (`~/.rollcall/config.toml` or `--config`), then
//! overridden from the environment so the bot can run on a PaaS with
//! only `BOT_TOKEN` / `CHAT_ID` set.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, RollcallError};
use crate::types::{AFFIRMATIVE_OPTION, NEGATIVE_OPTION};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollcallConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
}

impl RollcallConfig {
    /// Load config from the default path, falling back to defaults.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RollcallError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RollcallError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Rollcall home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".rollcall")
    }

    /// Apply environment overrides on top of file values.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Same as [`apply_env`](Self::apply_env) with an injectable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(chat) = lookup("CHAT_ID") {
            self.telegram.chat_id = chat
                .trim()
                .parse()
                .map_err(|_| RollcallError::Config(format!("CHAT_ID is not an integer: {chat}")))?;
        }
        if let Some(secret) = lookup("WEBHOOK_SECRET") {
            self.telegram.webhook_secret = secret;
        }
        if let Some(port) = lookup("PORT") {
            self.gateway.port = port
                .trim()
                .parse()
                .map_err(|_| RollcallError::Config(format!("PORT is not a port number: {port}")))?;
        }
        if let Some(url) = lookup("RENDER_EXTERNAL_URL") {
            self.gateway.public_url = normalize_public_url(&url);
        }
        if let Some(file) = lookup("ROLLCALL_DATA_FILE") {
            self.storage.data_file = file;
        }
        Ok(())
    }

    /// Reject configurations the bot cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(RollcallError::Config("telegram.bot_token is not set (BOT_TOKEN)".into()));
        }
        if self.telegram.chat_id == 0 {
            return Err(RollcallError::Config("telegram.chat_id is not set (CHAT_ID)".into()));
        }
        if self.telegram.mode == TransportMode::Webhook && self.gateway.public_url.is_empty() {
            return Err(RollcallError::Config(
                "gateway.public_url is required in webhook mode (RENDER_EXTERNAL_URL)".into(),
            ));
        }
        if !self.gateway.webhook_path.starts_with('/') {
            return Err(RollcallError::Config(format!(
                "gateway.webhook_path must start with '/': {}",
                self.gateway.webhook_path
            )));
        }
        self.schedule.timezone()?;
        Ok(())
    }

    /// Data file path with `~` expanded.
    pub fn data_file(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.storage.data_file).to_string())
    }

    /// Full URL Telegram should deliver updates to.
    pub fn webhook_url(&self) -> String {
        format!("{}{}", self.gateway.public_url, self.gateway.webhook_path)
    }
}

/// Accept both `host.example.com` (as Render exposes it) and full URLs.
fn normalize_public_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// How updates reach the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Telegram pushes updates to the gateway.
    #[default]
    Webhook,
    /// The bot long-polls `getUpdates`.
    Polling,
}

/// Telegram bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Group the poll is posted to.
    #[serde(default)]
    pub chat_id: i64,
    #[serde(default)]
    pub mode: TransportMode,
    /// Seconds between `getUpdates` calls in polling mode.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    /// Value of `X-Telegram-Bot-Api-Secret-Token`; empty disables the check.
    #[serde(default)]
    pub webhook_secret: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_poll_interval() -> u64 { 1 }
fn default_api_base() -> String { "https://api.telegram.org".into() }

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: 0,
            mode: TransportMode::default(),
            poll_interval: default_poll_interval(),
            webhook_secret: String::new(),
            api_base: default_api_base(),
        }
    }
}

/// Gateway (HTTP ingress) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
    /// Externally reachable base URL, e.g. `https://rollcall.onrender.com`.
    #[serde(default)]
    pub public_url: String,
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 8000 }
fn default_webhook_path() -> String { "/webhook".into() }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            webhook_path: default_webhook_path(),
            public_url: String::new(),
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_file")]
    pub data_file: String,
}

fn default_data_file() -> String { "database.json".into() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_file: default_data_file() }
    }
}

/// Trigger times, as five-field cron expressions in `timezone`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_send_poll")]
    pub send_poll: String,
    /// Second send attempt later the same day; a no-op if the first went out.
    #[serde(default = "default_send_poll_fallback")]
    pub send_poll_fallback: String,
    #[serde(default = "default_reminder")]
    pub reminder: String,
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
}

fn default_timezone() -> String { "Europe/Chisinau".into() }
fn default_send_poll() -> String { "0 18 * * 6".into() }
fn default_send_poll_fallback() -> String { "59 23 * * 6".into() }
fn default_reminder() -> String { "0 8 * * 0".into() }
fn default_check_interval() -> u64 { 20 }

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            send_poll: default_send_poll(),
            send_poll_fallback: default_send_poll_fallback(),
            reminder: default_reminder(),
            check_interval_secs: default_check_interval(),
        }
    }
}

impl ScheduleConfig {
    /// Parsed IANA timezone.
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| RollcallError::Config(format!("Unknown timezone '{}': {e}", self.timezone)))
    }
}

/// Poll behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Drop votes for a poll other than the stored one. Votes are always
    /// accepted while no poll id is stored (e.g. after `/clear`).
    #[serde(default)]
    pub validate_poll_id: bool,
    #[serde(default)]
    pub anonymous: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            validate_poll_id: false,
            anonymous: false,
        }
    }
}

/// Every user-visible text the bot sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "default_question")]
    pub question: String,
    #[serde(default = "default_affirmative")]
    pub affirmative: String,
    #[serde(default = "default_negative")]
    pub negative: String,
    #[serde(default = "default_follow_up")]
    pub follow_up: String,
    #[serde(default = "default_greeting")]
    pub reminder_greeting: String,
    #[serde(default = "default_reminder_yes")]
    pub reminder_yes: String,
    #[serde(default = "default_reminder_missing")]
    pub reminder_missing: String,
    #[serde(default = "default_reminder_error")]
    pub reminder_error: String,
    #[serde(default = "default_start")]
    pub start: String,
    #[serde(default = "default_no_answers")]
    pub no_answers: String,
    #[serde(default = "default_cleared")]
    pub cleared: String,
    #[serde(default = "default_poll_sent")]
    pub poll_sent: String,
    #[serde(default = "default_poll_failed")]
    pub poll_failed: String,
}

fn default_question() -> String { "Will you be at the service tomorrow?".into() }
fn default_affirmative() -> String { "Yes".into() }
fn default_negative() -> String { "No".into() }
fn default_follow_up() -> String { "@all Please answer the poll above 🙏".into() }
fn default_greeting() -> String { "⛪ Good morning!".into() }
fn default_reminder_yes() -> String { "✅ Planning to come".into() }
fn default_reminder_missing() -> String { "❗ Haven't answered".into() }
fn default_reminder_error() -> String { "Failed to collect members".into() }
fn default_start() -> String {
    "Hi! 👋 I run the attendance poll. The poll goes out on Saturday and the reminder on Sunday morning.".into()
}
fn default_no_answers() -> String { "Nobody answered yet.".into() }
fn default_cleared() -> String { "Data cleared. Ready for a new poll.".into() }
fn default_poll_sent() -> String { "✅ Poll sent!".into() }
fn default_poll_failed() -> String { "❌ Failed to send the poll".into() }

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            question: default_question(),
            affirmative: default_affirmative(),
            negative: default_negative(),
            follow_up: default_follow_up(),
            reminder_greeting: default_greeting(),
            reminder_yes: default_reminder_yes(),
            reminder_missing: default_reminder_missing(),
            reminder_error: default_reminder_error(),
            start: default_start(),
            no_answers: default_no_answers(),
            cleared: default_cleared(),
            poll_sent: default_poll_sent(),
            poll_failed: default_poll_failed(),
        }
    }
}

impl MessagesConfig {
    /// Poll options in contract order: affirmative first.
    pub fn options(&self) -> Vec<String> {
        let mut options = vec![String::new(); 2];
        options[AFFIRMATIVE_OPTION as usize] = self.affirmative.clone();
        options[NEGATIVE_OPTION as usize] = self.negative.clone();
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = RollcallConfig::default();
        assert_eq!(config.gateway.port, 8000);
        assert_eq!(config.gateway.webhook_path, "/webhook");
        assert_eq!(config.schedule.timezone, "Europe/Chisinau");
        assert_eq!(config.schedule.send_poll, "0 18 * * 6");
        assert!(!config.poll.validate_poll_id);
        assert_eq!(config.messages.options(), vec!["Yes", "No"]);
    }

    #[test]
    fn test_options_follow_index_contract() {
        let messages = MessagesConfig {
            affirmative: "Da".into(),
            negative: "Nu".into(),
            ..MessagesConfig::default()
        };
        let options = messages.options();
        assert_eq!(options[AFFIRMATIVE_OPTION as usize], "Da");
        assert_eq!(options[NEGATIVE_OPTION as usize], "Nu");
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [telegram]
            bot_token = "123:abc"
            chat_id = -100200
            mode = "polling"

            [schedule]
            timezone = "Europe/Berlin"
            reminder = "30 9 * * 0"

            [messages]
            question = "Coming to practice?"
        "#;

        let config: RollcallConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.telegram.chat_id, -100200);
        assert_eq!(config.telegram.mode, TransportMode::Polling);
        assert_eq!(config.schedule.reminder, "30 9 * * 0");
        assert_eq!(config.schedule.send_poll, "0 18 * * 6");
        assert_eq!(config.messages.question, "Coming to practice?");
        assert_eq!(config.messages.affirmative, "Yes");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: RollcallConfig = toml::from_str("").unwrap();
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert_eq!(config.storage.data_file, "database.json");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BOT_TOKEN", "999:zzz"),
            ("CHAT_ID", "-42"),
            ("PORT", "10000"),
            ("RENDER_EXTERNAL_URL", "bot.onrender.com/"),
        ]);
        let mut config = RollcallConfig::default();
        config
            .apply_env_from(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.telegram.bot_token, "999:zzz");
        assert_eq!(config.telegram.chat_id, -42);
        assert_eq!(config.gateway.port, 10000);
        assert_eq!(config.webhook_url(), "https://bot.onrender.com/webhook");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_chat_id_env() {
        let mut config = RollcallConfig::default();
        let err = config
            .apply_env_from(|k| (k == "CHAT_ID").then(|| "abc".to_string()))
            .unwrap_err();
        assert!(matches!(err, RollcallError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_missing_token_and_bad_timezone() {
        let mut config = RollcallConfig::default();
        assert!(config.validate().is_err());

        config.telegram.bot_token = "1:a".into();
        config.telegram.chat_id = 7;
        config.telegram.mode = TransportMode::Polling;
        assert!(config.validate().is_ok());

        config.schedule.timezone = "Mars/Olympus".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_webhook_mode_needs_public_url() {
        let mut config = RollcallConfig::default();
        config.telegram.bot_token = "1:a".into();
        config.telegram.chat_id = 7;
        assert!(config.validate().is_err());
        config.gateway.public_url = "https://example.com".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_home_dir() {
        let home = RollcallConfig::home_dir();
        assert!(home.to_string_lossy().contains("rollcall"));
    }
}
