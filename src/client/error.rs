use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("graph database error {code}: {message}")]
    Database { code: String, message: String },

    #[error("unexpected response shape: {0}")]
    Malformed(String),
}
