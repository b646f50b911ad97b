//! # Rollcall Channels
//! Messaging platform transports.
//!
//! Only Telegram is implemented; anything that implements
//! [`rollcall_core::Transport`] can stand in for it.

pub mod telegram;

pub use telegram::{TelegramChannel, TelegramConfig, TelegramUpdate};
