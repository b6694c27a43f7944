//! PullSource port - the reconciler's periodic refetch edge.

use async_trait::async_trait;
use thiserror::Error;

/// Failure on the pull path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PullError {
    #[error("pull timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl PullError {
    /// Transient failures are expected to clear on the next tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, PullError::Timeout | PullError::Transport(_))
            || matches!(self, PullError::Status(code) if *code >= 500)
    }
}

/// Fetches the full authoritative collection for one entity stream.
#[async_trait]
pub trait PullSource<T>: Send + Sync {
    async fn fetch(&self) -> Result<Vec<T>, PullError>;
}
