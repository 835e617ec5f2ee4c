use serde::{Deserialize, Serialize};
use crate::error::{Result, BgRemovalError};

// ============================================================================
// SETTINGS
// ============================================================================

/// Upper bound accepted for `tolerance`
pub const MAX_TOLERANCE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemovalOptions {
    /// Color-distance tolerance, 0-100, widened for dark/light borders (default: 25)
    pub tolerance: u32,
    /// Depth in pixels of the border band sampled for background colors (default: 15)
    pub sample_depth: u32,
    /// Soften the cutout edge with a blurred alpha channel (default: false)
    pub edge_smoothing: bool,
    /// Longest side processed at native resolution; larger inputs are resampled (default: 1500)
    pub max_dimension: u32,
}

impl Default for RemovalOptions {
    fn default() -> Self {
        Self {
            tolerance: 25,
            sample_depth: 15,
            edge_smoothing: false,
            max_dimension: 1500,
        }
    }
}

impl RemovalOptions {
    /// Parse options from JSON; missing fields take their defaults.
    /// The parsed options are validated before being returned.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: RemovalOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reject out-of-range values, naming the offending option
    pub fn validate(&self) -> Result<()> {
        if self.tolerance > MAX_TOLERANCE {
            return Err(BgRemovalError::InvalidParameter(format!(
                "tolerance must be between 0 and {}, got {}",
                MAX_TOLERANCE, self.tolerance
            )));
        }
        if self.sample_depth == 0 {
            return Err(BgRemovalError::InvalidParameter(
                "sampleDepth must be at least 1".to_string(),
            ));
        }
        if self.max_dimension == 0 {
            return Err(BgRemovalError::InvalidParameter(
                "maxDimension must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = RemovalOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.tolerance, 25);
        assert_eq!(options.sample_depth, 15);
        assert!(!options.edge_smoothing);
        assert_eq!(options.max_dimension, 1500);
    }

    #[test]
    fn test_json_partial_uses_defaults() {
        let options = RemovalOptions::from_json_str(r#"{"tolerance": 40, "edgeSmoothing": true}"#).unwrap();
        assert_eq!(options.tolerance, 40);
        assert!(options.edge_smoothing);
        assert_eq!(options.sample_depth, 15);
        assert_eq!(options.max_dimension, 1500);
    }

    #[test]
    fn test_invalid_tolerance_names_option() {
        let options = RemovalOptions { tolerance: 101, ..Default::default() };
        let err = options.validate().unwrap_err();
        assert!(matches!(err, BgRemovalError::InvalidParameter(_)));
        assert!(err.to_string().contains("tolerance"));
    }

    #[test]
    fn test_invalid_depth_and_dimension() {
        let depth = RemovalOptions { sample_depth: 0, ..Default::default() };
        assert!(depth.validate().unwrap_err().to_string().contains("sampleDepth"));

        let dim = RemovalOptions { max_dimension: 0, ..Default::default() };
        assert!(dim.validate().unwrap_err().to_string().contains("maxDimension"));
    }

    #[test]
    fn test_json_rejects_invalid_values() {
        assert!(RemovalOptions::from_json_str(r#"{"tolerance": 250}"#).is_err());
        assert!(matches!(
            RemovalOptions::from_json_str("not json"),
            Err(BgRemovalError::Json(_))
        ));
    }
}
