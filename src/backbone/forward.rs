//! Inference forward pass for the DINO backbone.
//!
//! Pipeline:
//! 1. Patch embedding (8x8 conv2d stride 8) -> 784 patch tokens
//! 2. Prepend CLS token, add position embeddings (785 total)
//! 3. 12 pre-norm transformer layers
//! 4. Final LayerNorm, then CLS through the dense + tanh pooler
//!
//! When `output_attentions` is set, the last layer's post-softmax attention
//! probabilities are returned alongside the pooled output.

use candle_core::{Module, Result, Tensor};
use candle_nn::ops::softmax_last_dim;

use super::config::DinoConfig;
use super::weights::{DinoBackbone, DinoLayerWeights};

/// Backbone readouts for one batch.
#[derive(Debug)]
pub struct DinoOutput {
    /// Pooled per-image embedding, `(B, hidden_size)`.
    pub pooled: Tensor,
    /// Last layer attention probabilities, `(B, heads, seq, seq)`.
    /// `None` unless the backbone was configured with `output_attentions`.
    pub last_attention: Option<Tensor>,
}

impl DinoBackbone {
    /// Run the frozen backbone on a preprocessed `(B, 3, 224, 224)` batch.
    pub fn forward(&self, pixel_values: &Tensor) -> Result<DinoOutput> {
        let b = pixel_values.dim(0)?;
        let h = self.config.hidden_size;

        // Patch embedding: [B, h, 28, 28] -> [B, 784, h]
        let tokens = self
            .patch_embed
            .forward(pixel_values)?
            .flatten(2, 3)?
            .transpose(1, 2)?;

        let cls = self.cls_token.broadcast_as((b, 1, h))?.contiguous()?;
        let tokens = Tensor::cat(&[&cls, &tokens], 1)?;
        let mut hidden = tokens.broadcast_add(&self.position_embeddings)?;

        let mut last_attention = None;
        let num_layers = self.layers.len();
        for (idx, layer) in self.layers.iter().enumerate() {
            let keep_probs = self.config.output_attentions && idx == num_layers - 1;
            let (next, probs) = transformer_layer(&hidden, layer, &self.config, keep_probs)?;
            hidden = next;
            if let Some(probs) = probs {
                last_attention = Some(probs);
            }
        }

        let sequence = self.final_layernorm.forward(&hidden)?;
        let cls_out = sequence.narrow(1, 0, 1)?.squeeze(1)?;
        let pooled = self.pooler.forward(&cls_out)?.tanh()?;

        Ok(DinoOutput {
            pooled,
            last_attention,
        })
    }
}

/// One pre-norm ViT layer; optionally returns the attention probabilities.
fn transformer_layer(
    hidden: &Tensor,
    layer: &DinoLayerWeights,
    config: &DinoConfig,
    keep_probs: bool,
) -> Result<(Tensor, Option<Tensor>)> {
    let (b, n, h) = hidden.dims3()?;
    let heads = config.num_attention_heads;
    let head_dim = config.head_dim();

    let normed = layer.layernorm_before.forward(hidden)?;

    let split = |t: Tensor| -> Result<Tensor> {
        t.reshape((b, n, heads, head_dim))?.transpose(1, 2)?.contiguous()
    };
    let q = split(layer.attention.query.forward(&normed)?)?;
    let k = split(layer.attention.key.forward(&normed)?)?;
    let v = split(layer.attention.value.forward(&normed)?)?;

    let scale = 1.0 / (head_dim as f64).sqrt();
    let scores = (q.matmul(&k.transpose(2, 3)?.contiguous()?)? * scale)?;
    let probs = softmax_last_dim(&scores)?;

    let context = probs
        .matmul(&v)?
        .transpose(1, 2)?
        .contiguous()?
        .reshape((b, n, h))?;
    let attn_out = layer.attention.output.forward(&context)?;
    let hidden = (hidden + attn_out)?;

    let normed = layer.layernorm_after.forward(&hidden)?;
    let mlp = layer.intermediate.forward(&normed)?.gelu_erf()?;
    let mlp = layer.output.forward(&mlp)?;
    let output = (&hidden + mlp)?;

    Ok((output, if keep_probs { Some(probs) } else { None }))
}
