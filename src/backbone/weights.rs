//! Weight structures and loading for the DINO backbone.
//!
//! Weights are read by name from a Hugging Face `ViTModel` checkpoint via
//! `VarBuilder`. Every tensor is fetched with its expected shape so that a
//! truncated or mismatched checkpoint fails at load time, not mid-forward.

use candle_core::{Result, Tensor};
use candle_nn::{Conv2d, Conv2dConfig, LayerNorm, Linear, VarBuilder};

use super::config::DinoConfig;

/// Q/K/V and output projections of one self-attention block.
#[derive(Debug)]
pub(super) struct DinoAttentionWeights {
    pub query: Linear,
    pub key: Linear,
    pub value: Linear,
    pub output: Linear,
}

/// One transformer layer (pre-norm ViT layout).
#[derive(Debug)]
pub(super) struct DinoLayerWeights {
    pub layernorm_before: LayerNorm,
    pub attention: DinoAttentionWeights,
    pub layernorm_after: LayerNorm,
    pub intermediate: Linear,
    pub output: Linear,
}

/// Frozen DINO ViT-S/8 backbone.
#[derive(Debug)]
pub struct DinoBackbone {
    pub(super) config: DinoConfig,
    pub(super) patch_embed: Conv2d,
    pub(super) cls_token: Tensor,
    pub(super) position_embeddings: Tensor,
    pub(super) layers: Vec<DinoLayerWeights>,
    pub(super) final_layernorm: LayerNorm,
    pub(super) pooler: Linear,
}

fn load_linear(vb: &VarBuilder, prefix: &str, in_dim: usize, out_dim: usize) -> Result<Linear> {
    let weight = vb.get((out_dim, in_dim), &format!("{}.weight", prefix))?;
    let bias = vb.get((out_dim,), &format!("{}.bias", prefix))?;
    Ok(Linear::new(weight, Some(bias)))
}

fn load_layer_norm(vb: &VarBuilder, prefix: &str, dim: usize, eps: f64) -> Result<LayerNorm> {
    let weight = vb.get((dim,), &format!("{}.weight", prefix))?;
    let bias = vb.get((dim,), &format!("{}.bias", prefix))?;
    Ok(LayerNorm::new(weight, bias, eps))
}

impl DinoBackbone {
    /// Load all backbone weights from a checkpoint-backed `VarBuilder`.
    pub fn load(config: DinoConfig, vb: VarBuilder) -> Result<Self> {
        let h = config.hidden_size;

        let patch_weight = vb.get(
            (h, 3, config.patch_size, config.patch_size),
            "embeddings.patch_embeddings.projection.weight",
        )?;
        let patch_bias = vb.get((h,), "embeddings.patch_embeddings.projection.bias")?;
        let patch_embed = Conv2d::new(
            patch_weight,
            Some(patch_bias),
            Conv2dConfig {
                stride: config.patch_size,
                ..Default::default()
            },
        );

        let cls_token = vb.get((1, 1, h), "embeddings.cls_token")?;
        let position_embeddings =
            vb.get((1, config.seq_len(), h), "embeddings.position_embeddings")?;

        let mut layers = Vec::with_capacity(config.num_hidden_layers);
        for idx in 0..config.num_hidden_layers {
            layers.push(Self::load_layer(&config, &vb, idx)?);
        }

        let final_layernorm = load_layer_norm(&vb, "layernorm", h, config.layer_norm_eps)?;
        let pooler = load_linear(&vb, "pooler.dense", h, h)?;

        Ok(Self {
            config,
            patch_embed,
            cls_token,
            position_embeddings,
            layers,
            final_layernorm,
            pooler,
        })
    }

    fn load_layer(config: &DinoConfig, vb: &VarBuilder, idx: usize) -> Result<DinoLayerWeights> {
        let h = config.hidden_size;
        let i = config.intermediate_size;
        let prefix = format!("encoder.layer.{}", idx);

        let attention = DinoAttentionWeights {
            query: load_linear(vb, &format!("{}.attention.attention.query", prefix), h, h)?,
            key: load_linear(vb, &format!("{}.attention.attention.key", prefix), h, h)?,
            value: load_linear(vb, &format!("{}.attention.attention.value", prefix), h, h)?,
            output: load_linear(vb, &format!("{}.attention.output.dense", prefix), h, h)?,
        };

        Ok(DinoLayerWeights {
            layernorm_before: load_layer_norm(
                vb,
                &format!("{}.layernorm_before", prefix),
                h,
                config.layer_norm_eps,
            )?,
            attention,
            layernorm_after: load_layer_norm(
                vb,
                &format!("{}.layernorm_after", prefix),
                h,
                config.layer_norm_eps,
            )?,
            intermediate: load_linear(vb, &format!("{}.intermediate.dense", prefix), h, i)?,
            output: load_linear(vb, &format!("{}.output.dense", prefix), i, h)?,
        })
    }

    /// Backbone configuration.
    pub fn config(&self) -> &DinoConfig {
        &self.config
    }
}
