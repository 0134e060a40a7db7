//! Configuration for the trainable ViT regressor.

use super::VIT_PATCH_SIZE;

/// Vision transformer regressor configuration.
#[derive(Debug, Clone)]
pub struct VitConfig {
    /// Input image height in pixels.
    pub image_h: usize,
    /// Input image width in pixels.
    pub image_w: usize,
    /// Patch size (32).
    pub patch_size: usize,
    /// Token embedding dimension (1024).
    pub dim: usize,
    /// Number of transformer blocks.
    pub depth: usize,
    /// Number of attention heads (16).
    pub heads: usize,
    /// Hidden width of the MLP blocks (2048).
    pub mlp_dim: usize,
    /// Dropout probability, active only in training mode (0.1).
    pub dropout: f32,
    /// Width of the regression head output vector.
    pub num_outputs: usize,
}

impl VitConfig {
    /// The fixed regressor geometry of the encoder, sized to `(h, w)` with
    /// the given transformer depth and output width.
    pub fn for_encoder(image_h: usize, image_w: usize, depth: usize, num_outputs: usize) -> Self {
        Self {
            image_h,
            image_w,
            patch_size: VIT_PATCH_SIZE,
            dim: 1024,
            depth,
            heads: 16,
            mlp_dim: 2048,
            dropout: 0.1,
            num_outputs,
        }
    }

    /// Number of patch tokens (excluding CLS).
    pub fn num_patches(&self) -> usize {
        (self.image_h / self.patch_size) * (self.image_w / self.patch_size)
    }

    /// Per-head dimension.
    pub fn head_dim(&self) -> usize {
        self.dim / self.heads
    }
}
