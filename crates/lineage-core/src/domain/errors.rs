//! Errors - エラー型と分類
//!
//! Transport / Parse / Storage / Queue / InvalidTask はタスクをその場で中断させる。
//! ローカルでの retry は行わず、ack されなかったメッセージを Queue が再配送する。
//! DepthCeilingExceeded だけは TraversalWorker が拒否ステータスに変換して完了させる。

use thiserror::Error;

/// ErrorKind は実行エラーの運用分類（ログ用）
///
/// - Transient: 一時的なエラー（再配送で回復しうる）
/// - Permanent: 恒久的なエラー（再配送しても同じ結果）
/// - Infrastructure: Store / Queue の障害
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum LineageError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("queue error: {0}")]
    Queue(String),

    #[error("malformed task message: {0}")]
    Decode(#[from] serde_json::Error),

    /// Decoded fine, but the task could never have been produced by a traversal.
    #[error("invalid task: {0}")]
    InvalidTask(String),

    #[error("maximum_level={requested} exceeds the depth ceiling of {ceiling}")]
    DepthCeilingExceeded { requested: u32, ceiling: u32 },

    #[error("config error: {0}")]
    Config(String),
}

impl LineageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LineageError::Transport(_) => ErrorKind::Transient,
            LineageError::Storage(_) | LineageError::Queue(_) => ErrorKind::Infrastructure,
            LineageError::Parse(_)
            | LineageError::Decode(_)
            | LineageError::InvalidTask(_)
            | LineageError::DepthCeilingExceeded { .. }
            | LineageError::Config(_) => ErrorKind::Permanent,
        }
    }
}

impl From<reqwest::Error> for LineageError {
    fn from(err: reqwest::Error) -> Self {
        LineageError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_and_queue_failures_are_infrastructure() {
        assert_eq!(
            LineageError::Storage("down".into()).kind(),
            ErrorKind::Infrastructure
        );
        assert_eq!(
            LineageError::Queue("down".into()).kind(),
            ErrorKind::Infrastructure
        );
        assert_eq!(
            LineageError::Transport("reset".into()).kind(),
            ErrorKind::Transient
        );
    }

    #[test]
    fn ceiling_message_names_both_limits() {
        let err = LineageError::DepthCeilingExceeded {
            requested: 17,
            ceiling: 16,
        };
        let msg = err.to_string();
        assert!(msg.contains("17"));
        assert!(msg.contains("16"));
    }
}
