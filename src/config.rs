//! Animator configuration ("props") and validation.
//!
//! `AnimatorConfig` is what a host hands over: plain values, serde-friendly
//! so it can also come from a JSON file. `validate()` turns it into a
//! [`ValidConfig`], substituting defaults for recoverable mistakes (with a
//! warning) and rejecting the one fatal one: an empty image list.

use crate::core::player::{DEFAULT_FRAME_RATE, DEFAULT_PLAYBACK_SPEEDS, PlaybackParams};
use crate::core::preloader::ImageSet;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No image URLs provided.")]
    EmptyImageSet,

    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Presentation hooks. No effect on playback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationStyle {
    /// Upper bound for the frame width in points
    pub max_width: Option<f32>,
    /// Container background as RGBA
    pub background: Option<[u8; 4]>,
}

/// Everything a host can set on the animator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimatorConfig {
    /// Frames in display order. Required and non-empty.
    pub image_urls: ImageSet,
    /// Frames per second at 1x
    pub frame_rate: f32,
    #[serde(rename = "loop")]
    pub loop_enabled: bool,
    pub playback_speeds: Vec<f32>,
    /// Salt for the widget id, lets several animators share one UI
    pub class_name: Option<String>,
    pub style: PresentationStyle,
    /// Show the trailing path segment of the current frame
    pub show_filename: bool,
    /// Animate loaded frames while others are still loading
    pub start_while_loading: bool,
    /// Fail loads that have not settled after this many ms
    pub load_timeout_ms: Option<f64>,
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            image_urls: Arc::from(Vec::<String>::new()),
            frame_rate: DEFAULT_FRAME_RATE,
            loop_enabled: true,
            playback_speeds: DEFAULT_PLAYBACK_SPEEDS.to_vec(),
            class_name: None,
            style: PresentationStyle::default(),
            show_filename: false,
            start_while_loading: false,
            load_timeout_ms: None,
        }
    }
}

impl AnimatorConfig {
    /// Config with `image_urls` and defaults for everything else.
    pub fn new(image_urls: ImageSet) -> Self {
        Self {
            image_urls,
            ..Self::default()
        }
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path: display, source })
    }

    /// Check the config and fill in defaults for recoverable mistakes.
    pub fn validate(&self) -> Result<ValidConfig, ConfigError> {
        if self.image_urls.is_empty() {
            log::error!("image_urls is required and cannot be empty");
            return Err(ConfigError::EmptyImageSet);
        }

        let frame_rate = if self.frame_rate.is_finite() && self.frame_rate > 0.0 {
            self.frame_rate
        } else {
            warn!(
                "Invalid frame rate ({}). Using default {} FPS.",
                self.frame_rate, DEFAULT_FRAME_RATE
            );
            DEFAULT_FRAME_RATE
        };

        let mut speeds: Vec<f32> = Vec::with_capacity(self.playback_speeds.len());
        for &speed in &self.playback_speeds {
            if !(speed.is_finite() && speed > 0.0) {
                warn!("Ignoring invalid playback speed {}", speed);
            } else if !speeds.contains(&speed) {
                speeds.push(speed);
            }
        }
        if speeds.is_empty() {
            warn!("No usable playback speeds, using defaults {:?}", DEFAULT_PLAYBACK_SPEEDS);
            speeds = DEFAULT_PLAYBACK_SPEEDS.to_vec();
        }

        let load_timeout_ms = match self.load_timeout_ms {
            Some(t) if !(t.is_finite() && t >= 0.0) => {
                warn!("Ignoring invalid load timeout {}", t);
                None
            }
            other => other,
        };

        Ok(ValidConfig {
            images: Arc::clone(&self.image_urls),
            params: PlaybackParams {
                frame_rate,
                loop_enabled: self.loop_enabled,
                start_while_loading: self.start_while_loading,
            },
            speeds,
            class_name: self.class_name.clone(),
            style: self.style.clone(),
            show_filename: self.show_filename,
            load_timeout_ms,
        })
    }
}

/// Config after validation; everything in here is usable as-is.
#[derive(Debug, Clone)]
pub struct ValidConfig {
    pub images: ImageSet,
    pub params: PlaybackParams,
    pub speeds: Vec<f32>,
    pub class_name: Option<String>,
    pub style: PresentationStyle,
    pub show_filename: bool,
    pub load_timeout_ms: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::preloader::image_set;

    #[test]
    fn test_empty_urls_rejected() {
        let config = AnimatorConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyImageSet)));
    }

    #[test]
    fn test_invalid_frame_rate_uses_default() {
        for bad in [0.0, -5.0, f32::NAN] {
            let config = AnimatorConfig {
                frame_rate: bad,
                ..AnimatorConfig::new(image_set(["a.png"]))
            };
            let valid = config.validate().unwrap();
            assert_eq!(valid.params.frame_rate, DEFAULT_FRAME_RATE);
        }
    }

    #[test]
    fn test_speeds_filtered() {
        let config = AnimatorConfig {
            playback_speeds: vec![0.25, -1.0, 0.25, 4.0],
            ..AnimatorConfig::new(image_set(["a.png"]))
        };
        assert_eq!(config.validate().unwrap().speeds, vec![0.25, 4.0]);

        let config = AnimatorConfig {
            playback_speeds: vec![0.0],
            ..AnimatorConfig::new(image_set(["a.png"]))
        };
        assert_eq!(config.validate().unwrap().speeds, DEFAULT_PLAYBACK_SPEEDS.to_vec());
    }

    #[test]
    fn test_image_set_identity_kept() {
        let images = image_set(["a.png", "b.png"]);
        let valid = AnimatorConfig::new(images.clone()).validate().unwrap();
        assert!(Arc::ptr_eq(&valid.images, &images));
    }

    #[test]
    fn test_json_defaults() {
        let config: AnimatorConfig =
            serde_json::from_str(r#"{ "image_urls": ["a.png"], "loop": false }"#).unwrap();
        assert!(!config.loop_enabled);
        assert_eq!(config.frame_rate, DEFAULT_FRAME_RATE);
        assert_eq!(config.playback_speeds, DEFAULT_PLAYBACK_SPEEDS.to_vec());
        assert_eq!(config.image_urls.len(), 1);
    }
}
