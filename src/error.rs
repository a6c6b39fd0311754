use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("'{0}' is not waiting to vote in this session")]
    VoterNotPending(String),

    #[error("session for '{0}' is no longer accepting votes")]
    VotingClosed(String),

    #[error("{field} rating {value} is outside {min}..={max}")]
    RatingOutOfRange {
        field: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },

    #[error("'{0}' is not a participant")]
    UnknownParticipant(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("session '{0}' was modified by another request")]
    Conflict(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
