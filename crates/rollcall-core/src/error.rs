//! Error types shared across the workspace.

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RollcallError>;

/// Everything that can go wrong inside Rollcall.
#[derive(Debug, thiserror::Error)]
pub enum RollcallError {
    #[error("Config error: {0}")]
    Config(String),

    /// Persisted state could not be written (reads degrade to defaults instead).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Messaging platform call failed (publish, send, membership fetch).
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Schedule error: {0}")]
    Schedule(String),
}

impl RollcallError {
    /// Short reason without the variant prefix, for user-facing replies.
    pub fn reason(&self) -> String {
        match self {
            Self::Config(m) | Self::Storage(m) | Self::Transport(m) | Self::Schedule(m) => {
                m.clone()
            }
        }
    }
}
