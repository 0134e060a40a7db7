//! Watermark embedding encoder.
//!
//! Given a cover image `(B, 3, H, W)` and a message vector
//! `(B, message_length)`, produces a visually similar watermarked image of
//! the same shape. "Where to hide the message" is guided by a semantic
//! representation of the image, computed by one of three interchangeable
//! strategies fixed at construction (see [`strategy`]); all three converge
//! on the same fusion/output stage.
//!
//! The semantic map is always `128 x 128` spatially, so the fusion
//! concatenation requires a working resolution of `H = W = 128`; other
//! resolutions fail at forward time with a shape error.
//!
//! Construction takes a `VarBuilder`: trainable weights (trunk, fusion,
//! strategy-owned regressor/projection) are drawn from it and belong to the
//! caller's variable store; frozen backbone weights are fetched separately
//! and never updated. The compute device is resolved once from the
//! `VarBuilder`, not re-derived per forward call.

mod fusion;
mod message;
pub mod strategy;

#[cfg(test)]
mod tests;

pub use fusion::FusionStage;
pub use message::broadcast_message;
pub use strategy::SemanticStrategy;

use candle_core::{Device, ModuleT, Tensor};
use candle_nn::VarBuilder;
use tracing::info;

use crate::config::{EncoderMode, HiddenConfig};
use crate::error::{WatermarkError, WatermarkResult};
use crate::layers::ConvBnRelu;

/// Spatial side of the semantic representation produced by every strategy.
pub const SEMANTIC_MAP_SIDE: usize = 128;

/// Watermark embedding network.
#[derive(Debug)]
pub struct Encoder {
    h: usize,
    w: usize,
    message_length: usize,
    /// Image encoding trunk. Built for checkpoint parity and exposed via
    /// [`Encoder::image_features`]; not part of the fusion concatenation.
    trunk: Vec<ConvBnRelu>,
    fusion: FusionStage,
    strategy: SemanticStrategy,
    device: Device,
}

impl Encoder {
    /// Construct an encoder for `config`, drawing trainable weights from
    /// `vb`.
    ///
    /// Exactly one strategy's weights are allocated. For the pretrained
    /// strategies this synchronously fetches the frozen backbone; a fetch
    /// failure is a fatal construction error.
    ///
    /// # Errors
    ///
    /// `WatermarkError::Config` when `encoder_mode` is missing, not one of
    /// the three recognized tags, or the remaining fields fail validation —
    /// before any weight allocation.
    pub fn new(config: &HiddenConfig, vb: VarBuilder) -> WatermarkResult<Self> {
        config.validate()?;
        let mode = config.encoder_mode()?;
        let device = vb.device().clone();
        let conv_channels = config.encoder_channels;

        let mut trunk = Vec::with_capacity(config.encoder_blocks);
        trunk.push(
            ConvBnRelu::new(3, conv_channels, vb.pp("trunk.0")).map_err(|e| {
                WatermarkError::Tensor {
                    message: format!("trunk block 0 construction failed: {}", e),
                }
            })?,
        );
        for idx in 1..config.encoder_blocks {
            trunk.push(
                ConvBnRelu::new(conv_channels, conv_channels, vb.pp(format!("trunk.{}", idx)))
                    .map_err(|e| WatermarkError::Tensor {
                        message: format!("trunk block {} construction failed: {}", idx, e),
                    })?,
            );
        }

        let strategy = SemanticStrategy::build(mode, config, vb.pp("strategy"), &device)?;
        let fusion_channels = config.message_length + strategy.semantic_channels() + 3;
        let fusion = FusionStage::new(fusion_channels, conv_channels, vb.pp("fusion")).map_err(
            |e| WatermarkError::Tensor {
                message: format!("fusion stage construction failed: {}", e),
            },
        )?;

        info!(
            mode = %mode,
            fusion_channels,
            semantic_channels = strategy.semantic_channels(),
            "encoder constructed"
        );

        Ok(Self {
            h: config.h,
            w: config.w,
            message_length: config.message_length,
            trunk,
            fusion,
            strategy,
            device,
        })
    }

    /// Embed `message` into `image` (inference mode).
    ///
    /// Output is `(B, 3, H, W)` with the input's dtype and device.
    pub fn forward(&self, image: &Tensor, message: &Tensor) -> WatermarkResult<Tensor> {
        self.forward_t(image, message, false)
    }

    /// Embed `message` into `image`.
    ///
    /// `train` enables batch-statistics normalization and dropout; training
    /// loops pass `true`, everyone else [`Encoder::forward`].
    pub fn forward_t(
        &self,
        image: &Tensor,
        message: &Tensor,
        train: bool,
    ) -> WatermarkResult<Tensor> {
        let batch = self.validate_inputs(image, message)?;

        let expanded = broadcast_message(message, self.h, self.w)?;
        let semantic = self.strategy.semantic_representation(image, train)?;

        let (sb, sc, sh, sw) = semantic.dims4().map_err(|e| WatermarkError::Tensor {
            message: format!("semantic representation dims failed: {}", e),
        })?;
        if sb != batch || sc != self.strategy.semantic_channels() || (sh, sw) != (self.h, self.w) {
            return Err(WatermarkError::ShapeMismatch {
                context: "semantic representation".to_string(),
                expected: format!(
                    "({}, {}, {}, {})",
                    batch,
                    self.strategy.semantic_channels(),
                    self.h,
                    self.w
                ),
                actual: format!("({}, {}, {}, {})", sb, sc, sh, sw),
            });
        }

        let concat =
            Tensor::cat(&[&expanded, &semantic, image], 1).map_err(|e| WatermarkError::Tensor {
                message: format!("fusion concatenation failed: {}", e),
            })?;
        self.fusion
            .forward_t(&concat, train)
            .map_err(|e| WatermarkError::Tensor {
                message: format!("fusion stage forward failed: {}", e),
            })
    }

    /// Run the convolutional trunk over the image.
    ///
    /// This is the trunk's own `(B, conv_channels, H, W)` image encoding.
    /// The fusion stage does not consume it; it is kept for parity with
    /// checkpoints that carry trunk weights and for downstream
    /// experimentation.
    pub fn image_features(&self, image: &Tensor, train: bool) -> WatermarkResult<Tensor> {
        let mut features = image.clone();
        for (idx, block) in self.trunk.iter().enumerate() {
            features = block
                .forward_t(&features, train)
                .map_err(|e| WatermarkError::Tensor {
                    message: format!("trunk block {} forward failed: {}", idx, e),
                })?;
        }
        Ok(features)
    }

    /// Check image/message geometry; returns the batch size.
    fn validate_inputs(&self, image: &Tensor, message: &Tensor) -> WatermarkResult<usize> {
        let (b, c, h, w) = image.dims4().map_err(|_| WatermarkError::ShapeMismatch {
            context: "image".to_string(),
            expected: format!("(B, 3, {}, {})", self.h, self.w),
            actual: format!("{:?}", image.dims()),
        })?;
        if c != 3 || h != self.h || w != self.w {
            return Err(WatermarkError::ShapeMismatch {
                context: "image".to_string(),
                expected: format!("(B, 3, {}, {})", self.h, self.w),
                actual: format!("({}, {}, {}, {})", b, c, h, w),
            });
        }
        let (mb, ml) = message.dims2().map_err(|_| WatermarkError::ShapeMismatch {
            context: "message".to_string(),
            expected: format!("({}, {})", b, self.message_length),
            actual: format!("{:?}", message.dims()),
        })?;
        if mb != b || ml != self.message_length {
            return Err(WatermarkError::ShapeMismatch {
                context: "message".to_string(),
                expected: format!("({}, {})", b, self.message_length),
                actual: format!("({}, {})", mb, ml),
            });
        }
        Ok(b)
    }

    /// The strategy the encoder was constructed with.
    pub fn mode(&self) -> EncoderMode {
        self.strategy.mode()
    }

    /// Channels the semantic representation contributes to fusion.
    pub fn semantic_channels(&self) -> usize {
        self.strategy.semantic_channels()
    }

    /// Total channel count the fusion stage was built for.
    pub fn fusion_input_channels(&self) -> usize {
        self.fusion.input_channels()
    }

    /// Compute device resolved at construction.
    pub fn device(&self) -> &Device {
        &self.device
    }
}
