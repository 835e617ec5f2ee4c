pub mod classify;
pub mod cleanup;
pub mod color;
pub mod error;
pub mod flood;
pub mod options;
pub mod remover;
pub mod resample;

use std::time::Duration;

pub use error::{BgRemovalError, Result};
pub use options::RemovalOptions;
pub use remover::{
    decode_image, encode_png, is_suitable, is_suitable_base64, is_suitable_bytes,
    remove_background, remove_background_base64, remove_background_bytes, Removal,
    RemovalReport,
};

/// Run `remove_background_bytes` on the blocking pool
///
/// The pipeline itself has no cancellation points. With a `timeout` the
/// caller stops waiting once it elapses, but the worker thread keeps running
/// until the call finishes.
pub async fn remove_background_task(
    input: Vec<u8>,
    options: RemovalOptions,
    timeout: Option<Duration>,
) -> Result<Vec<u8>> {
    let task = tokio::task::spawn_blocking(move || remove_background_bytes(&input, &options));

    let joined = match timeout {
        Some(limit) => tokio::time::timeout(limit, task)
            .await
            .map_err(|_| BgRemovalError::Timeout(limit))?,
        None => task.await,
    };

    joined.map_err(|e| BgRemovalError::Processing(format!("Task join error: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_png() -> Vec<u8> {
        encode_png(&RgbaImage::from_pixel(50, 50, Rgba([255, 0, 0, 255]))).unwrap()
    }

    #[tokio::test]
    async fn test_task_runs_pipeline() {
        let png = remove_background_task(red_png(), RemovalOptions::default(), None)
            .await
            .unwrap();
        let out = decode_image(&png).unwrap();
        assert_eq!(out.dimensions(), (50, 50));
        assert!(out.pixels().all(|p| p[3] == 0));
    }

    #[tokio::test]
    async fn test_task_with_generous_timeout() {
        let result = remove_background_task(
            red_png(),
            RemovalOptions::default(),
            Some(Duration::from_secs(60)),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_task_propagates_errors() {
        let options = RemovalOptions { max_dimension: 0, ..Default::default() };
        let err = remove_background_task(red_png(), options, None).await.unwrap_err();
        assert!(matches!(err, BgRemovalError::InvalidParameter(_)));
    }

    #[test]
    fn test_error_serializes_as_message() {
        let err = BgRemovalError::InvalidParameter("tolerance must be between 0 and 100, got 101".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Invalid parameter: tolerance must be between 0 and 100, got 101\"");
    }
}
