//! Configuration for the DINO backbone.

use super::constants::{DINO_EMBED_DIM, DINO_IMAGE_SIZE, DINO_NUM_HEADS, DINO_PATCH_SIZE};

/// DINO ViT-S/8 configuration (Hugging Face `ViTModel` geometry).
#[derive(Debug, Clone)]
pub struct DinoConfig {
    /// Hidden size (384 for ViT-S).
    pub hidden_size: usize,
    /// Number of transformer layers (12).
    pub num_hidden_layers: usize,
    /// Number of attention heads (6).
    pub num_attention_heads: usize,
    /// Intermediate FFN size (1536).
    pub intermediate_size: usize,
    /// Input image size (224).
    pub image_size: usize,
    /// Patch size (8).
    pub patch_size: usize,
    /// Layer normalization epsilon.
    pub layer_norm_eps: f64,
    /// Whether the forward pass keeps the last layer's attention
    /// probabilities. Only the `dino-attention` strategy needs them.
    pub output_attentions: bool,
}

impl Default for DinoConfig {
    fn default() -> Self {
        Self {
            hidden_size: DINO_EMBED_DIM,
            num_hidden_layers: 12,
            num_attention_heads: DINO_NUM_HEADS,
            intermediate_size: 1536,
            image_size: DINO_IMAGE_SIZE,
            patch_size: DINO_PATCH_SIZE,
            layer_norm_eps: 1e-12,
            output_attentions: false,
        }
    }
}

impl DinoConfig {
    /// Number of patch tokens per spatial side (28 for 224/8).
    pub fn patch_grid(&self) -> usize {
        self.image_size / self.patch_size
    }

    /// Total patch tokens (784 for ViT-S/8 at 224).
    pub fn num_patches(&self) -> usize {
        self.patch_grid() * self.patch_grid()
    }

    /// Sequence length including the CLS token (785).
    pub fn seq_len(&self) -> usize {
        self.num_patches() + 1
    }

    /// Per-head dimension.
    pub fn head_dim(&self) -> usize {
        self.hidden_size / self.num_attention_heads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_geometry_matches_vits8() {
        let config = DinoConfig::default();
        assert_eq!(config.patch_grid(), 28);
        assert_eq!(config.num_patches(), 784);
        assert_eq!(config.seq_len(), 785);
        assert_eq!(config.head_dim(), 64);
    }
}
