use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BgRemovalError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, BgRemovalError>;

// Errors travel inside JSON reports as their display string
impl serde::Serialize for BgRemovalError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
