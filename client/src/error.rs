use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid drag from {from} to {to} in a list of {len}")]
    InvalidDrag { from: usize, to: usize, len: usize },

    #[error("Unknown link {0}")]
    UnknownLink(String),
}
