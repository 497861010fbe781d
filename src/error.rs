use thiserror::Error;

/// Failures reported to the caller. Broken internal invariants are not
/// represented here, they panic.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid FEN: {0}")]
    InvalidFen(String),

    #[error("invalid PGN: {0}")]
    InvalidPgn(String),

    #[error("invalid square: {0}")]
    InvalidSquare(String),

    #[error("invalid setup: {0}")]
    InvalidSetup(String),

    #[error("illegal move: {0}")]
    IllegalMove(String),

    #[error("the game is already decided ({0})")]
    GameOver(String),

    #[error("no node at path {0}")]
    UnknownPath(String),

    #[error("not available in {0} mode")]
    WrongMode(&'static str),

    #[error("bad arguments: {0}")]
    Usage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
