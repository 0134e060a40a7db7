//! Strategy B: frozen backbone's pooled embedding projected to a feature map.

use candle_core::{Device, Module, Tensor};
use candle_nn::{linear, Linear, VarBuilder};
use tracing::debug;

use crate::backbone::{
    fetch_pretrained, DinoBackbone, DinoConfig, DinoPreprocessor, DINO_EMBED_DIM,
};
use crate::config::HiddenConfig;
use crate::encoder::SEMANTIC_MAP_SIDE;
use crate::error::{WatermarkError, WatermarkResult};

/// Projects the frozen backbone's pooled output (one 384-vector per image)
/// into a `(conv_channels, 128, 128)` feature map through a trainable
/// linear layer.
#[derive(Debug)]
pub struct DinoOutputStrategy {
    backbone: DinoBackbone,
    preprocessor: DinoPreprocessor,
    projection: Linear,
    conv_channels: usize,
    device: Device,
}

impl DinoOutputStrategy {
    /// Fetch the frozen backbone and build the trainable projection.
    pub fn new(config: &HiddenConfig, vb: VarBuilder, device: &Device) -> WatermarkResult<Self> {
        let backbone = fetch_pretrained(DinoConfig::default(), device)?;
        let conv_channels = config.encoder_channels;
        let out_features = SEMANTIC_MAP_SIDE * SEMANTIC_MAP_SIDE * conv_channels;
        let projection = linear(DINO_EMBED_DIM, out_features, vb.pp("projection")).map_err(|e| {
            WatermarkError::Tensor {
                message: format!("dino-output projection construction failed: {}", e),
            }
        })?;
        Ok(Self {
            backbone,
            preprocessor: DinoPreprocessor::new(),
            projection,
            conv_channels,
            device: device.clone(),
        })
    }

    pub fn semantic_channels(&self) -> usize {
        self.conv_channels
    }

    /// Preprocess, run the frozen backbone, project the pooled output.
    pub fn semantic_representation(&self, image: &Tensor) -> WatermarkResult<Tensor> {
        let pixels = self
            .preprocessor
            .preprocess(image)?
            .to_device(&self.device)
            .map_err(|e| WatermarkError::Tensor {
                message: format!("dino-output device transfer failed: {}", e),
            })?;

        let output = self
            .backbone
            .forward(&pixels)
            .map_err(|e| WatermarkError::Tensor {
                message: format!("dino-output backbone forward failed: {}", e),
            })?;
        debug!(pooled = ?output.pooled.dims(), "dino-output pooled embedding");

        let b = output.pooled.dim(0).map_err(|e| WatermarkError::Tensor {
            message: format!("dino-output batch dim failed: {}", e),
        })?;
        self.projection
            .forward(&output.pooled)
            .and_then(|t| {
                t.reshape((b, self.conv_channels, SEMANTIC_MAP_SIDE, SEMANTIC_MAP_SIDE))
            })
            .map_err(|e| WatermarkError::Tensor {
                message: format!("dino-output projection failed: {}", e),
            })
    }
}
