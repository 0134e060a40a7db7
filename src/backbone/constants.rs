//! Architecture constants for the DINO ViT-S/8 backbone.

/// Hub identifier of the pretrained checkpoint.
pub const DINO_MODEL_NAME: &str = "facebook/dino-vits8";

/// Token embedding width of ViT-S (the pooled output dimension).
pub const DINO_EMBED_DIM: usize = 384;

/// Number of attention heads per layer.
pub const DINO_NUM_HEADS: usize = 6;

/// Input resolution the backbone expects.
pub const DINO_IMAGE_SIZE: usize = 224;

/// Patch size; 224 / 8 = 28 patch tokens per side.
pub const DINO_PATCH_SIZE: usize = 8;

/// Per-channel normalization mean (ImageNet).
pub const DINO_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel normalization std (ImageNet).
pub const DINO_STD: [f32; 3] = [0.229, 0.224, 0.225];
