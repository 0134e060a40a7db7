//! Strategy A: trainable transformer classifier reused as a dense regressor.

use candle_core::Tensor;
use candle_nn::VarBuilder;
use tracing::debug;

use crate::config::HiddenConfig;
use crate::encoder::SEMANTIC_MAP_SIDE;
use crate::error::{WatermarkError, WatermarkResult};
use crate::vit::{VitConfig, VitRegressor};

/// Runs a trainable ViT over the whole image and reads its output vector as
/// a flattened `(conv_channels, 128, 128)` feature map.
#[derive(Debug)]
pub struct VitStrategy {
    pub(crate) regressor: VitRegressor,
    pub(crate) conv_channels: usize,
}

impl VitStrategy {
    /// Build the regressor sized to the configured image resolution.
    pub fn new(config: &HiddenConfig, vb: VarBuilder) -> WatermarkResult<Self> {
        let conv_channels = config.encoder_channels;
        let num_outputs = SEMANTIC_MAP_SIDE * SEMANTIC_MAP_SIDE * conv_channels;
        let vit_config = VitConfig::for_encoder(config.h, config.w, config.vit_depth(), num_outputs);
        debug!(
            depth = vit_config.depth,
            num_outputs, "building vit strategy regressor"
        );
        let regressor =
            VitRegressor::new(vit_config, vb.pp("regressor")).map_err(|e| {
                WatermarkError::Config {
                    reason: format!("vit regressor construction failed: {}", e),
                }
            })?;
        Ok(Self {
            regressor,
            conv_channels,
        })
    }

    pub fn semantic_channels(&self) -> usize {
        self.conv_channels
    }

    /// Regress and reshape the semantic map.
    ///
    /// # Errors
    ///
    /// `WatermarkError::ShapeMismatch` when the regressor's output width is
    /// not exactly `128 * 128 * conv_channels` — a fatal configuration
    /// error, never silently recovered.
    pub fn semantic_representation(&self, image: &Tensor, train: bool) -> WatermarkResult<Tensor> {
        let flat = self
            .regressor
            .forward_t(image, train)
            .map_err(|e| WatermarkError::Tensor {
                message: format!("vit regressor forward failed: {}", e),
            })?;
        let (b, width) = flat.dims2().map_err(|e| WatermarkError::Tensor {
            message: format!("vit regressor output dims failed: {}", e),
        })?;

        let expected = SEMANTIC_MAP_SIDE * SEMANTIC_MAP_SIDE * self.conv_channels;
        if width != expected {
            return Err(WatermarkError::ShapeMismatch {
                context: "vit semantic representation".to_string(),
                expected: format!("{} values per image", expected),
                actual: format!("{} values per image", width),
            });
        }

        flat.reshape((b, self.conv_channels, SEMANTIC_MAP_SIDE, SEMANTIC_MAP_SIDE))
            .map_err(|e| WatermarkError::Tensor {
                message: format!("vit semantic reshape failed: {}", e),
            })
    }
}
