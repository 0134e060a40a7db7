//! Strategy C: frozen backbone's CLS attention used as a spatial map.

use candle_core::{Device, Tensor};
use tracing::debug;

use crate::backbone::{fetch_pretrained, DinoBackbone, DinoConfig, DinoPreprocessor};
use crate::encoder::SEMANTIC_MAP_SIDE;
use crate::error::{WatermarkError, WatermarkResult};

/// Reads the last layer's class-token-to-patch attention, one channel per
/// head, as a low-resolution saliency grid and upsamples it to the working
/// resolution. No trainable weights.
#[derive(Debug)]
pub struct DinoAttentionStrategy {
    backbone: DinoBackbone,
    preprocessor: DinoPreprocessor,
    device: Device,
}

impl DinoAttentionStrategy {
    /// Fetch the frozen backbone with attention output enabled.
    pub fn new(device: &Device) -> WatermarkResult<Self> {
        let config = DinoConfig {
            output_attentions: true,
            ..Default::default()
        };
        let backbone = fetch_pretrained(config, device)?;
        Ok(Self {
            backbone,
            preprocessor: DinoPreprocessor::new(),
            device: device.clone(),
        })
    }

    /// One channel per backbone attention head. Architecture-fixed, not
    /// user-configured.
    pub fn semantic_channels(&self) -> usize {
        self.backbone.config().num_attention_heads
    }

    /// Preprocess, run the frozen backbone, spatialize the CLS attention.
    pub fn semantic_representation(&self, image: &Tensor) -> WatermarkResult<Tensor> {
        let pixels = self
            .preprocessor
            .preprocess(image)?
            .to_device(&self.device)
            .map_err(|e| WatermarkError::Tensor {
                message: format!("dino-attention device transfer failed: {}", e),
            })?;

        let output = self
            .backbone
            .forward(&pixels)
            .map_err(|e| WatermarkError::Tensor {
                message: format!("dino-attention backbone forward failed: {}", e),
            })?;
        let attention = output
            .last_attention
            .ok_or_else(|| WatermarkError::Tensor {
                message: "backbone returned no attention output".to_string(),
            })?;
        debug!(attention = ?attention.dims(), "dino-attention last layer");

        attention_to_map(
            &attention,
            self.backbone.config().patch_grid(),
            SEMANTIC_MAP_SIDE,
        )
    }
}

/// Spatialize CLS attention probabilities.
///
/// From `(B, heads, seq, seq)` attention, takes the CLS row toward every
/// patch token (dropping the CLS self-attention entry), reshapes each head
/// to a `grid x grid` square and nearest-neighbor upsamples to
/// `side x side`. Returns `(B, heads, side, side)`.
pub(crate) fn attention_to_map(
    attention: &Tensor,
    grid: usize,
    side: usize,
) -> WatermarkResult<Tensor> {
    let (b, heads, _, cols) = attention
        .dims4()
        .map_err(|_| WatermarkError::ShapeMismatch {
            context: "attention map".to_string(),
            expected: "(B, heads, seq, seq)".to_string(),
            actual: format!("{:?}", attention.dims()),
        })?;
    if cols != grid * grid + 1 {
        return Err(WatermarkError::ShapeMismatch {
            context: "attention map".to_string(),
            expected: format!("{} tokens ({}x{} patches + CLS)", grid * grid + 1, grid, grid),
            actual: format!("{} tokens", cols),
        });
    }

    // CLS row, excluding the CLS self-attention entry.
    attention
        .narrow(2, 0, 1)
        .and_then(|t| t.squeeze(2))
        .and_then(|t| t.narrow(2, 1, cols - 1))
        .and_then(|t| t.reshape((b, heads, grid, grid)))
        .and_then(|t| t.upsample_nearest2d(side, side))
        .map_err(|e| WatermarkError::Tensor {
            message: format!("attention spatialization failed: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn channel_count_tracks_heads_not_batch() {
        for batch in [1usize, 3] {
            let attention =
                Tensor::rand(0f32, 1f32, (batch, 6, 785, 785), &Device::Cpu).unwrap();
            let map = attention_to_map(&attention, 28, 128).unwrap();
            assert_eq!(map.dims(), &[batch, 6, 128, 128]);
        }
    }

    #[test]
    fn cls_self_attention_is_excluded() {
        // CLS row: self-attention entry 9.0, all patch entries 2.0. The map
        // must only ever contain the patch value.
        let mut data = vec![0f32; 2 * 785 * 785];
        for head in 0..2 {
            let row = head * 785 * 785;
            data[row] = 9.0;
            for p in 1..785 {
                data[row + p] = 2.0;
            }
        }
        let attention = Tensor::from_vec(data, (1, 2, 785, 785), &Device::Cpu).unwrap();
        let map = attention_to_map(&attention, 28, 128).unwrap();
        let values = map.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        assert!(values.iter().all(|&v| (v - 2.0).abs() < 1e-6));
    }

    #[test]
    fn wrong_token_count_is_rejected() {
        let attention = Tensor::rand(0f32, 1f32, (1, 6, 785, 784), &Device::Cpu).unwrap();
        let err = attention_to_map(&attention, 28, 128).unwrap_err();
        assert!(matches!(err, WatermarkError::ShapeMismatch { .. }));
    }
}
