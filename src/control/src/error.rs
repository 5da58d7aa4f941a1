use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum DecodeError {
    /// The message is not JSON or has no `powerValues` array.
    #[error("malformed telemetry message")]
    MalformedMessage,

    /// A `powerValues` entry has a bad name, missing units or a non-numeric or non-finite value.
    #[error("invalid power value entry at index {0}")]
    InvalidEntry(usize),

    #[error("invalid throttle level")]
    InvalidLevel,

    #[error("invalid clock payload")]
    InvalidTime,
}
