//! # Rollcall Core
//! Shared types, traits, errors and configuration for the Rollcall poll bot.
//!
//! Every other crate in the workspace depends on this one. Nothing here
//! talks to Telegram or serves HTTP.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::RollcallConfig;
pub use error::{Result, RollcallError};
pub use traits::{PollStore, Transport};
pub use types::{AnswerRecord, ChatMember, InboundEvent, PollHandle, PollState, VoteEvent};
