//! Preprocessing for the DINO backbone.
//!
//! Mirrors the checkpoint's feature extractor: each image is resized to
//! 224x224 with bilinear interpolation and normalized with the ImageNet
//! mean/std. Input images are `(B, 3, H, W)` f32 tensors in `[0, 1]` — the
//! external data pipeline owns that contract.
//!
//! The batch is split and resampled image by image on the host; the caller
//! moves the restacked batch to the device the backbone resides on.

use candle_core::{Device, Tensor};

use crate::error::{WatermarkError, WatermarkResult};

use super::constants::{DINO_IMAGE_SIZE, DINO_MEAN, DINO_STD};

/// Resize + normalize preprocessor matching `facebook/dino-vits8`.
#[derive(Debug, Clone)]
pub struct DinoPreprocessor {
    /// Target spatial size (224).
    target_size: usize,
    /// RGB mean values for normalization.
    mean: [f32; 3],
    /// RGB std values for normalization.
    std: [f32; 3],
}

impl Default for DinoPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DinoPreprocessor {
    /// Create a preprocessor with the backbone's parameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            target_size: DINO_IMAGE_SIZE,
            mean: DINO_MEAN,
            std: DINO_STD,
        }
    }

    /// Preprocess an image batch for the backbone.
    ///
    /// # Arguments
    /// * `images` - `(B, 3, H, W)` f32 batch in `[0, 1]`
    ///
    /// # Returns
    /// `(B, 3, 224, 224)` normalized batch on the host device.
    ///
    /// # Errors
    /// `WatermarkError::ShapeMismatch` if the batch is not `(B, 3, H, W)`;
    /// `WatermarkError::Tensor` if a tensor operation fails.
    pub fn preprocess(&self, images: &Tensor) -> WatermarkResult<Tensor> {
        let (batch, channels, height, width) =
            images.dims4().map_err(|_| WatermarkError::ShapeMismatch {
                context: "preprocessor input".to_string(),
                expected: "(B, 3, H, W)".to_string(),
                actual: format!("{:?}", images.dims()),
            })?;
        if channels != 3 {
            return Err(WatermarkError::ShapeMismatch {
                context: "preprocessor input".to_string(),
                expected: "3 channels".to_string(),
                actual: format!("{} channels", channels),
            });
        }

        let host = images
            .to_device(&Device::Cpu)
            .and_then(|t| t.to_dtype(candle_core::DType::F32))
            .map_err(|e| WatermarkError::Tensor {
                message: format!("preprocessor host transfer failed: {}", e),
            })?;

        let mut per_image = Vec::with_capacity(batch);
        for b in 0..batch {
            let image = host
                .get(b)
                .and_then(|t| t.to_vec3::<f32>())
                .map_err(|e| WatermarkError::Tensor {
                    message: format!("preprocessor image read failed: {}", e),
                })?;
            let resized = self.resize_normalize(&image, height, width);
            let tensor = Tensor::from_vec(
                resized,
                (3, self.target_size, self.target_size),
                &Device::Cpu,
            )
            .map_err(|e| WatermarkError::Tensor {
                message: format!("preprocessor tensor creation failed: {}", e),
            })?;
            per_image.push(tensor);
        }

        let views: Vec<&Tensor> = per_image.iter().collect();
        Tensor::stack(&views, 0).map_err(|e| WatermarkError::Tensor {
            message: format!("preprocessor batch stack failed: {}", e),
        })
    }

    /// Bilinear resize (half-pixel centers) plus mean/std normalization.
    fn resize_normalize(&self, image: &[Vec<Vec<f32>>], height: usize, width: usize) -> Vec<f32> {
        let size = self.target_size;
        let scale_y = height as f32 / size as f32;
        let scale_x = width as f32 / size as f32;

        let mut out = Vec::with_capacity(3 * size * size);
        for (c, plane) in image.iter().enumerate() {
            for y in 0..size {
                let src_y = ((y as f32 + 0.5) * scale_y - 0.5).clamp(0.0, (height - 1) as f32);
                let y0 = src_y.floor() as usize;
                let y1 = (y0 + 1).min(height - 1);
                let fy = src_y - y0 as f32;
                for x in 0..size {
                    let src_x = ((x as f32 + 0.5) * scale_x - 0.5).clamp(0.0, (width - 1) as f32);
                    let x0 = src_x.floor() as usize;
                    let x1 = (x0 + 1).min(width - 1);
                    let fx = src_x - x0 as f32;

                    let top = plane[y0][x0] * (1.0 - fx) + plane[y0][x1] * fx;
                    let bottom = plane[y1][x0] * (1.0 - fx) + plane[y1][x1] * fx;
                    let value = top * (1.0 - fy) + bottom * fy;

                    out.push((value - self.mean[c]) / self.std[c]);
                }
            }
        }
        out
    }

    /// Target spatial size.
    #[must_use]
    pub const fn target_size(&self) -> usize {
        self.target_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_shape_is_backbone_resolution() {
        let images = Tensor::rand(0f32, 1f32, (2, 3, 128, 128), &Device::Cpu).unwrap();
        let processed = DinoPreprocessor::new().preprocess(&images).unwrap();
        assert_eq!(processed.dims(), &[2, 3, 224, 224]);
    }

    #[test]
    fn constant_image_resolves_to_normalized_constant() {
        // A uniform image must stay uniform through bilinear resampling,
        // with each channel shifted by its mean/std.
        let images = Tensor::full(0.5f32, (1, 3, 64, 64), &Device::Cpu).unwrap();
        let processed = DinoPreprocessor::new().preprocess(&images).unwrap();
        let values = processed.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        let size = DINO_IMAGE_SIZE * DINO_IMAGE_SIZE;
        for c in 0..3 {
            let expected = (0.5 - DINO_MEAN[c]) / DINO_STD[c];
            for &v in &values[c * size..c * size + 16] {
                assert!((v - expected).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn non_rgb_batch_is_rejected() {
        let images = Tensor::zeros((1, 4, 32, 32), candle_core::DType::F32, &Device::Cpu).unwrap();
        let err = DinoPreprocessor::new().preprocess(&images).unwrap_err();
        assert!(matches!(err, WatermarkError::ShapeMismatch { .. }));
    }
}
