//! # Rollcall Scheduler
//!
//! Wall-clock triggers and poll state persistence.
//!
//! ## Design Principles
//! - No external services: one JSON file, tokio timers
//! - Triggers are evaluated in one configured IANA timezone, never host-local time
//! - Missed instants (process down) are skipped, not replayed
//!
//! ## Architecture
//! ```text
//! SchedulerEngine (tokio interval)
//!   ├── send_poll           "0 18 * * 6"  → JobKind::SendPoll
//!   ├── send_poll_fallback  "59 23 * * 6" → JobKind::SendPoll (same-day guard makes it a no-op)
//!   └── reminder            "0 8 * * 0"   → JobKind::Reminder
//!
//! JsonFileStore
//!   └── database.json  (write temp file → rename)
//! ```

pub mod cron;
pub mod engine;
pub mod store;
pub mod tasks;

pub use cron::CronSchedule;
pub use engine::{SchedulerEngine, spawn_scheduler};
pub use store::{JsonFileStore, MemoryStore};
pub use tasks::{JobKind, ScheduledJob};
