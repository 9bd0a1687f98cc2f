use serde::{Deserialize, Serialize};

use crate::{rotated_box::PaddingPolicy, OcrError};

/// Post-processing settings for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Probability a pixel must exceed to count as text.
    pub det_threshold: f32,
    /// Regions with fewer pixels are dropped.
    pub min_region_size: usize,
    pub padding: PaddingPolicy,
    /// Run the orientation classifier on each crop.
    pub classify: bool,
    pub cls_threshold: f32,
    /// Recognized lines below this confidence are dropped.
    pub rec_score_threshold: f32,
    /// Merge padded boxes overlapping an earlier box by more than this IoU. Off when `None`.
    pub merge_iou_threshold: Option<f32>,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), OcrError> {
        let invalid = |message: String| Err(OcrError::InvalidConfig(message));

        for (name, value) in [
            ("det_threshold", self.det_threshold),
            ("cls_threshold", self.cls_threshold),
            ("rec_score_threshold", self.rec_score_threshold),
            ("padding.ratio", self.padding.ratio),
            ("padding.min", self.padding.min),
            ("padding.max", self.padding.max),
        ] {
            if !value.is_finite() {
                return invalid(format!("{name} must be finite, got {value}"));
            }
        }
        if self.min_region_size == 0 {
            return invalid("min_region_size must be at least 1".into());
        }
        if self.padding.ratio < 0.0 || self.padding.min < 0.0 {
            return invalid(format!(
                "padding must not be negative, got {:?}",
                self.padding
            ));
        }
        if self.padding.min > self.padding.max {
            return invalid(format!(
                "padding.min ({}) exceeds padding.max ({})",
                self.padding.min, self.padding.max
            ));
        }
        if let Some(iou) = self.merge_iou_threshold {
            if !(iou > 0.0 && iou <= 1.0) {
                return invalid(format!("merge_iou_threshold must be in (0, 1], got {iou}"));
            }
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            det_threshold: 0.2,
            min_region_size: 3,
            padding: PaddingPolicy::default(),
            classify: false,
            cls_threshold: 0.9,
            rec_score_threshold: 0.5,
            merge_iou_threshold: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_padding_bounds() {
        let config = PipelineConfig {
            padding: PaddingPolicy {
                ratio: 0.1,
                min: 40.0,
                max: 30.0,
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(OcrError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_out_of_range_iou() {
        for iou in [0.0, -0.5, 1.5, f32::NAN] {
            let config = PipelineConfig {
                merge_iou_threshold: Some(iou),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{iou} accepted");
        }
    }

    #[test]
    fn rejects_nan_threshold() {
        let config = PipelineConfig {
            det_threshold: f32::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "classify": true, "rec_score_threshold": 0.8 }"#).unwrap();
        assert!(config.classify);
        assert_eq!(config.rec_score_threshold, 0.8);
        assert_eq!(config.det_threshold, 0.2);
        assert_eq!(config.padding, PaddingPolicy::default());
    }
}
