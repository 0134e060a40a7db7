//! Trainable vision transformer used as a dense feature regressor.
//!
//! The `vit` strategy runs this transformer over the whole cover image and
//! reads its output vector as a flattened coarse feature map. Unlike the
//! frozen DINO backbone, these weights are owned by the encoder and trained
//! with it.

mod config;
mod model;

pub use config::VitConfig;
pub use model::VitRegressor;

/// Patch size of the regressor. Fixed by the architecture, not configurable.
pub const VIT_PATCH_SIZE: usize = 32;
