//! Checkpoint fetch for the pretrained backbone.
//!
//! The checkpoint is fetched by name from the Hugging Face hub at
//! construction time, once, synchronously. A fetch failure is a fatal
//! construction error; retry policy belongs to the caller.

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use tracing::info;

use crate::error::{WatermarkError, WatermarkResult};

use super::config::DinoConfig;
use super::constants::DINO_MODEL_NAME;
use super::weights::DinoBackbone;

/// Fetch and load the frozen `facebook/dino-vits8` backbone onto `device`.
pub fn fetch_pretrained(config: DinoConfig, device: &Device) -> WatermarkResult<DinoBackbone> {
    let api = hf_hub::api::sync::Api::new().map_err(|e| WatermarkError::ModelLoad {
        message: format!("hub client init failed: {}", e),
    })?;
    let repo = api.model(DINO_MODEL_NAME.to_string());

    info!(model = DINO_MODEL_NAME, "fetching pretrained backbone");

    // Prefer safetensors; older mirrors of this checkpoint only carry the
    // pickled weights.
    let vb = match repo.get("model.safetensors") {
        Ok(path) => unsafe {
            VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device).map_err(|e| {
                WatermarkError::ModelLoad {
                    message: format!("{} safetensors load failed: {}", DINO_MODEL_NAME, e),
                }
            })?
        },
        Err(_) => {
            let path = repo
                .get("pytorch_model.bin")
                .map_err(|e| WatermarkError::ModelLoad {
                    message: format!("{} checkpoint fetch failed: {}", DINO_MODEL_NAME, e),
                })?;
            VarBuilder::from_pth(path, DType::F32, device).map_err(|e| {
                WatermarkError::ModelLoad {
                    message: format!("{} pickle load failed: {}", DINO_MODEL_NAME, e),
                }
            })?
        }
    };

    let backbone =
        DinoBackbone::load(config, vb).map_err(|e| WatermarkError::ModelLoad {
            message: format!("{} weight load failed: {}", DINO_MODEL_NAME, e),
        })?;

    info!(model = DINO_MODEL_NAME, "backbone loaded");
    Ok(backbone)
}
