//! Semantic representation strategies.
//!
//! The encoder derives a spatial "what matters here" map from the cover
//! image through exactly one of three strategies, selected at construction:
//!
//! - [`VitStrategy`] — a trainable vision transformer regresses a dense
//!   feature map from the whole image;
//! - [`DinoOutputStrategy`] — a frozen DINO backbone's pooled embedding is
//!   projected into a feature map;
//! - [`DinoAttentionStrategy`] — the same backbone's CLS attention is used
//!   directly as a spatial saliency map.
//!
//! Each variant owns exactly the weights it needs; nothing is
//! cross-allocated. The variant declares its channel contribution so the
//! fusion stage can be sized at construction instead of relying on
//! per-mode channel literals.

mod dino_attention;
mod dino_output;
mod vit;

pub use dino_attention::DinoAttentionStrategy;
pub use dino_output::DinoOutputStrategy;
pub use vit::VitStrategy;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;

use crate::config::{EncoderMode, HiddenConfig};
use crate::error::WatermarkResult;

/// Closed set of semantic-conditioning strategies.
#[derive(Debug)]
pub enum SemanticStrategy {
    Vit(VitStrategy),
    DinoOutput(DinoOutputStrategy),
    DinoAttention(DinoAttentionStrategy),
}

impl SemanticStrategy {
    /// Build the strategy `mode` selects, allocating only its weights.
    ///
    /// For the pretrained strategies this fetches the frozen backbone,
    /// synchronously, onto `device`.
    pub fn build(
        mode: EncoderMode,
        config: &HiddenConfig,
        vb: VarBuilder,
        device: &Device,
    ) -> WatermarkResult<Self> {
        match mode {
            EncoderMode::Vit => Ok(Self::Vit(VitStrategy::new(config, vb.pp("vit"))?)),
            EncoderMode::DinoOutput => Ok(Self::DinoOutput(DinoOutputStrategy::new(
                config,
                vb.pp("dino_output"),
                device,
            )?)),
            EncoderMode::DinoAttention => Ok(Self::DinoAttention(DinoAttentionStrategy::new(
                device,
            )?)),
        }
    }

    /// The mode this strategy was built for.
    pub fn mode(&self) -> EncoderMode {
        match self {
            Self::Vit(_) => EncoderMode::Vit,
            Self::DinoOutput(_) => EncoderMode::DinoOutput,
            Self::DinoAttention(_) => EncoderMode::DinoAttention,
        }
    }

    /// Channels this strategy contributes to the fusion concatenation.
    pub fn semantic_channels(&self) -> usize {
        match self {
            Self::Vit(s) => s.semantic_channels(),
            Self::DinoOutput(s) => s.semantic_channels(),
            Self::DinoAttention(s) => s.semantic_channels(),
        }
    }

    /// Compute the `(B, semantic_channels, 128, 128)` semantic map.
    pub fn semantic_representation(
        &self,
        image: &Tensor,
        train: bool,
    ) -> WatermarkResult<Tensor> {
        match self {
            Self::Vit(s) => s.semantic_representation(image, train),
            Self::DinoOutput(s) => s.semantic_representation(image),
            Self::DinoAttention(s) => s.semantic_representation(image),
        }
    }
}
