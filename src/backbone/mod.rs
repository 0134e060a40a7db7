//! Frozen pretrained DINO backbone (`facebook/dino-vits8`).
//!
//! A self-supervised ViT-S/8 checkpoint in the Hugging Face `ViTModel`
//! layout, fetched by name at construction time and used inference-only.
//! Two readouts are exposed:
//!
//! - the pooled output (CLS token through a dense + tanh pooler), consumed
//!   by the `dino-output` strategy;
//! - the last layer's attention probabilities, consumed by the
//!   `dino-attention` strategy.
//!
//! Weights are never updated by this crate; there is no training path
//! through this module.

mod config;
mod constants;
mod forward;
mod loader;
mod preprocessor;
mod weights;

pub use config::DinoConfig;
pub use constants::{
    DINO_EMBED_DIM, DINO_IMAGE_SIZE, DINO_MEAN, DINO_MODEL_NAME, DINO_NUM_HEADS, DINO_PATCH_SIZE,
    DINO_STD,
};
pub use forward::DinoOutput;
pub use loader::fetch_pretrained;
pub use preprocessor::DinoPreprocessor;
pub use weights::DinoBackbone;
