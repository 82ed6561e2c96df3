//! Error type shared by every stage of the pipeline.
//!
//! Only the front half (parsing, extraction, configuration, file I/O) can
//! fail. Planning and scheduling are total over any `GameAnalysis`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    /// The record could not be tokenized into a balanced tree.
    #[error("SGF format error at byte {offset}: {message}")]
    Format { offset: usize, message: String },

    /// A coordinate code decoded outside the 19x19 board.
    #[error("Invalid position '{code}': {reason}")]
    InvalidPosition { code: String, reason: String },

    /// The record contains no moves and the caller asked to reject that.
    #[error("Game record contains no moves")]
    EmptyGame,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl GameError {
    pub(crate) fn format(offset: usize, message: impl Into<String>) -> Self {
        GameError::Format {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_position(code: &str, reason: impl Into<String>) -> Self {
        GameError::InvalidPosition {
            code: code.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by malformed input text. These reject the
    /// whole file and should be shown to the user as "invalid SGF".
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            GameError::Format { .. } | GameError::InvalidPosition { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, GameError>;
