//! Configuration for the watermark encoder.
//!
//! `HiddenConfig` is the shared hyperparameter set of the HiDDeN-style
//! pipeline. Only a subset is consumed by the encoder: `h`, `w`,
//! `encoder_channels`, `encoder_blocks`, `message_length`, `encoder_mode`,
//! `decoder_blocks` (and `vit_depth` where set). `encoder_loss` is carried
//! for the external loss component and ignored here.
//!
//! # TOML Structure
//!
//! ```toml
//! H = 128
//! W = 128
//! encoder_channels = 64
//! encoder_blocks = 4
//! message_length = 30
//! decoder_blocks = 7
//! encoder_mode = "dino-attention"
//! ```
//!
//! # Design Principles
//!
//! - **NO FALLBACKS**: a missing or unrecognized `encoder_mode` returns an
//!   error, never a silent default.
//! - **FAIL FAST**: validation runs before any weight allocation.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{WatermarkError, WatermarkResult};

/// Semantic-conditioning strategy selector.
///
/// Exactly three strategies are recognized; the set is closed. Construction
/// with any other value fails before weights are allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncoderMode {
    /// Trainable vision transformer reused as a dense feature regressor.
    #[serde(rename = "vit")]
    Vit,
    /// Frozen DINO backbone, pooled output projected to a feature map.
    #[serde(rename = "dino-output")]
    DinoOutput,
    /// Frozen DINO backbone, last-layer CLS attention used as a spatial map.
    #[serde(rename = "dino-attention")]
    DinoAttention,
}

impl EncoderMode {
    /// All recognized mode tags, for error messages.
    pub const TAGS: [&'static str; 3] = ["vit", "dino-output", "dino-attention"];

    /// The wire tag for this mode.
    pub fn tag(&self) -> &'static str {
        match self {
            EncoderMode::Vit => "vit",
            EncoderMode::DinoOutput => "dino-output",
            EncoderMode::DinoAttention => "dino-attention",
        }
    }
}

impl fmt::Display for EncoderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for EncoderMode {
    type Err = WatermarkError;

    fn from_str(s: &str) -> WatermarkResult<Self> {
        match s {
            "vit" => Ok(EncoderMode::Vit),
            "dino-output" => Ok(EncoderMode::DinoOutput),
            "dino-attention" => Ok(EncoderMode::DinoAttention),
            other => Err(WatermarkError::Config {
                reason: format!(
                    "encoder_mode '{}' is not valid. Choose one of {:?}.",
                    other,
                    EncoderMode::TAGS
                ),
            }),
        }
    }
}

/// Hyperparameters of the watermarking pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiddenConfig {
    /// Working image height in pixels.
    #[serde(rename = "H")]
    pub h: usize,
    /// Working image width in pixels.
    #[serde(rename = "W")]
    pub w: usize,
    /// Channel width of the encoder's convolutional blocks.
    pub encoder_channels: usize,
    /// Number of convolutional trunk blocks.
    pub encoder_blocks: usize,
    /// Number of scalar values in the message vector.
    pub message_length: usize,
    /// Weight of the encoder term in the external loss. Unused here.
    #[serde(default)]
    pub encoder_loss: f64,
    /// Semantic-conditioning strategy. Required; absence is an error.
    #[serde(default)]
    pub encoder_mode: Option<EncoderMode>,
    /// Block count of the external decoder network.
    pub decoder_blocks: usize,
    /// Transformer depth for the `vit` strategy. Defaults to
    /// `decoder_blocks / 2`, the coupling existing callers rely on.
    #[serde(default)]
    pub vit_depth: Option<usize>,
}

impl HiddenConfig {
    /// Load configuration from a TOML string.
    pub fn from_toml_str(raw: &str) -> WatermarkResult<Self> {
        let config: HiddenConfig = toml::from_str(raw).map_err(|e| WatermarkError::Config {
            reason: format!("TOML parse failed: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> WatermarkResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Validate the fields the encoder consumes.
    ///
    /// # Errors
    ///
    /// `WatermarkError::Config` on the first violated constraint.
    pub fn validate(&self) -> WatermarkResult<()> {
        if self.h == 0 || self.w == 0 {
            return Err(WatermarkError::Config {
                reason: format!("image dimensions must be nonzero, got {}x{}", self.h, self.w),
            });
        }
        if self.encoder_channels == 0 {
            return Err(WatermarkError::Config {
                reason: "encoder_channels must be at least 1".to_string(),
            });
        }
        if self.encoder_blocks == 0 {
            return Err(WatermarkError::Config {
                reason: "encoder_blocks must be at least 1".to_string(),
            });
        }
        if self.message_length == 0 {
            return Err(WatermarkError::Config {
                reason: "message_length must be at least 1".to_string(),
            });
        }
        let mode = self.encoder_mode()?;
        if mode == EncoderMode::Vit {
            if self.vit_depth() == 0 {
                return Err(WatermarkError::Config {
                    reason: "vit_depth resolved to 0; set vit_depth or raise decoder_blocks"
                        .to_string(),
                });
            }
            if self.h % crate::vit::VIT_PATCH_SIZE != 0 || self.w % crate::vit::VIT_PATCH_SIZE != 0
            {
                return Err(WatermarkError::Config {
                    reason: format!(
                        "encoder_mode 'vit' needs H and W divisible by the patch size {}, got {}x{}",
                        crate::vit::VIT_PATCH_SIZE,
                        self.h,
                        self.w
                    ),
                });
            }
        }
        Ok(())
    }

    /// The selected semantic-conditioning strategy.
    ///
    /// # Errors
    ///
    /// `WatermarkError::Config` when `encoder_mode` is absent.
    pub fn encoder_mode(&self) -> WatermarkResult<EncoderMode> {
        self.encoder_mode.ok_or_else(|| WatermarkError::Config {
            reason: format!(
                "encoder_mode is missing. Choose one of {:?}.",
                EncoderMode::TAGS
            ),
        })
    }

    /// Transformer depth for the `vit` strategy.
    pub fn vit_depth(&self) -> usize {
        self.vit_depth.unwrap_or(self.decoder_blocks / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> HiddenConfig {
        HiddenConfig {
            h: 128,
            w: 128,
            encoder_channels: 64,
            encoder_blocks: 4,
            message_length: 30,
            encoder_loss: 0.7,
            encoder_mode: Some(EncoderMode::Vit),
            decoder_blocks: 7,
            vit_depth: None,
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        base_config().validate().unwrap();
    }

    #[test]
    fn missing_encoder_mode_is_rejected() {
        let mut config = base_config();
        config.encoder_mode = None;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, WatermarkError::Config { .. }));
    }

    #[test]
    fn unrecognized_mode_tag_is_rejected_at_parse() {
        let err = "foo".parse::<EncoderMode>().unwrap_err();
        assert!(matches!(err, WatermarkError::Config { .. }));
    }

    #[test]
    fn mode_tags_round_trip() {
        for tag in EncoderMode::TAGS {
            let mode: EncoderMode = tag.parse().unwrap();
            assert_eq!(mode.tag(), tag);
        }
    }

    #[test]
    fn vit_depth_defaults_to_half_decoder_blocks() {
        let config = base_config();
        assert_eq!(config.vit_depth(), 3);

        let mut explicit = base_config();
        explicit.vit_depth = Some(6);
        assert_eq!(explicit.vit_depth(), 6);
    }

    #[test]
    fn vit_mode_rejects_non_patch_aligned_resolution() {
        let mut config = base_config();
        config.h = 100;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, WatermarkError::Config { .. }));
    }

    #[test]
    fn toml_with_unknown_mode_fails() {
        let raw = r#"
            H = 128
            W = 128
            encoder_channels = 64
            encoder_blocks = 4
            message_length = 30
            decoder_blocks = 7
            encoder_mode = "foo"
        "#;
        assert!(HiddenConfig::from_toml_str(raw).is_err());
    }

    #[test]
    fn toml_round_trip() {
        let raw = r#"
            H = 128
            W = 128
            encoder_channels = 64
            encoder_blocks = 4
            message_length = 30
            decoder_blocks = 7
            encoder_mode = "dino-attention"
        "#;
        let config = HiddenConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.encoder_mode().unwrap(), EncoderMode::DinoAttention);
        assert_eq!(config.encoder_loss, 0.0);
    }
}
