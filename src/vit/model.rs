//! ViT regressor forward pass.
//!
//! Pipeline:
//! 1. Patch embedding (conv2d with stride = patch size)
//! 2. Prepend CLS token, add learned position embeddings
//! 3. Pre-norm transformer blocks (MHA + GELU MLP, residual)
//! 4. CLS token through LayerNorm + Linear regression head

use candle_core::{bail, Module, Result, Tensor, D};
use candle_nn::ops::softmax_last_dim;
use candle_nn::{
    conv2d, layer_norm, linear, linear_no_bias, Conv2d, Conv2dConfig, Dropout, Init, LayerNorm,
    Linear, VarBuilder,
};

use super::VitConfig;

/// Multi-head self-attention with a fused QKV projection.
#[derive(Debug)]
struct Attention {
    qkv: Linear,
    proj: Linear,
    heads: usize,
    head_dim: usize,
    dropout: Dropout,
}

impl Attention {
    fn new(config: &VitConfig, vb: VarBuilder) -> Result<Self> {
        let qkv = linear_no_bias(config.dim, 3 * config.dim, vb.pp("qkv"))?;
        let proj = linear(config.dim, config.dim, vb.pp("proj"))?;
        Ok(Self {
            qkv,
            proj,
            heads: config.heads,
            head_dim: config.head_dim(),
            dropout: Dropout::new(config.dropout),
        })
    }

    fn forward(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let (b, n, d) = xs.dims3()?;
        let qkv = self.qkv.forward(xs)?;
        let chunks = qkv.chunk(3, D::Minus1)?;
        let split = |t: &Tensor| -> Result<Tensor> {
            t.reshape((b, n, self.heads, self.head_dim))?
                .transpose(1, 2)?
                .contiguous()
        };
        let q = split(&chunks[0])?;
        let k = split(&chunks[1])?;
        let v = split(&chunks[2])?;

        let scale = 1.0 / (self.head_dim as f64).sqrt();
        let scores = (q.matmul(&k.transpose(2, 3)?.contiguous()?)? * scale)?;
        let probs = softmax_last_dim(&scores)?;
        let context = probs
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((b, n, d))?;
        let out = self.proj.forward(&context)?;
        self.dropout.forward(&out, train)
    }
}

/// GELU MLP block.
#[derive(Debug)]
struct FeedForward {
    fc1: Linear,
    fc2: Linear,
    dropout: Dropout,
}

impl FeedForward {
    fn new(config: &VitConfig, vb: VarBuilder) -> Result<Self> {
        let fc1 = linear(config.dim, config.mlp_dim, vb.pp("fc1"))?;
        let fc2 = linear(config.mlp_dim, config.dim, vb.pp("fc2"))?;
        Ok(Self {
            fc1,
            fc2,
            dropout: Dropout::new(config.dropout),
        })
    }

    fn forward(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let xs = self.fc1.forward(xs)?.gelu_erf()?;
        let xs = self.dropout.forward(&xs, train)?;
        let xs = self.fc2.forward(&xs)?;
        self.dropout.forward(&xs, train)
    }
}

/// One pre-norm transformer block.
#[derive(Debug)]
struct Block {
    norm1: LayerNorm,
    attn: Attention,
    norm2: LayerNorm,
    ff: FeedForward,
}

impl Block {
    fn new(config: &VitConfig, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            norm1: layer_norm(config.dim, 1e-5, vb.pp("norm1"))?,
            attn: Attention::new(config, vb.pp("attn"))?,
            norm2: layer_norm(config.dim, 1e-5, vb.pp("norm2"))?,
            ff: FeedForward::new(config, vb.pp("mlp"))?,
        })
    }

    fn forward(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let xs = (xs + self.attn.forward(&self.norm1.forward(xs)?, train)?)?;
        &xs + self.ff.forward(&self.norm2.forward(&xs)?, train)?
    }
}

/// Vision transformer regressing a flat feature vector from a whole image.
#[derive(Debug)]
pub struct VitRegressor {
    config: VitConfig,
    patch_embed: Conv2d,
    cls_token: Tensor,
    pos_embedding: Tensor,
    emb_dropout: Dropout,
    blocks: Vec<Block>,
    head_norm: LayerNorm,
    head: Linear,
}

impl VitRegressor {
    /// Build a regressor with fresh (trainable) weights from `vb`.
    pub fn new(config: VitConfig, vb: VarBuilder) -> Result<Self> {
        if config.image_h % config.patch_size != 0 || config.image_w % config.patch_size != 0 {
            bail!(
                "ViT image size {}x{} is not divisible by patch size {}",
                config.image_h,
                config.image_w,
                config.patch_size
            );
        }
        let conv_config = Conv2dConfig {
            stride: config.patch_size,
            ..Default::default()
        };
        let patch_embed = conv2d(
            3,
            config.dim,
            config.patch_size,
            conv_config,
            vb.pp("patch_embed"),
        )?;
        let token_init = Init::Randn {
            mean: 0.0,
            stdev: 0.02,
        };
        let cls_token = vb.get_with_hints((1, 1, config.dim), "cls_token", token_init)?;
        let pos_embedding = vb.get_with_hints(
            (1, config.num_patches() + 1, config.dim),
            "pos_embedding",
            token_init,
        )?;
        let mut blocks = Vec::with_capacity(config.depth);
        for idx in 0..config.depth {
            blocks.push(Block::new(&config, vb.pp(format!("blocks.{}", idx)))?);
        }
        let head_norm = layer_norm(config.dim, 1e-5, vb.pp("head_norm"))?;
        let head = linear(config.dim, config.num_outputs, vb.pp("head"))?;
        Ok(Self {
            emb_dropout: Dropout::new(config.dropout),
            config,
            patch_embed,
            cls_token,
            pos_embedding,
            blocks,
            head_norm,
            head,
        })
    }

    /// Regressor configuration.
    pub fn config(&self) -> &VitConfig {
        &self.config
    }

    /// Run the regressor on a `(B, 3, H, W)` image batch.
    ///
    /// Returns `(B, num_outputs)`. Dropout is active only when `train`.
    pub fn forward_t(&self, image: &Tensor, train: bool) -> Result<Tensor> {
        let b = image.dim(0)?;

        // Patch embedding: [B, dim, H/p, W/p] -> [B, num_patches, dim]
        let tokens = self
            .patch_embed
            .forward(image)?
            .flatten(2, 3)?
            .transpose(1, 2)?;

        // Prepend CLS, add position embeddings.
        let cls = self
            .cls_token
            .broadcast_as((b, 1, self.config.dim))?
            .contiguous()?;
        let tokens = Tensor::cat(&[&cls, &tokens], 1)?;
        let tokens = tokens.broadcast_add(&self.pos_embedding)?;
        let mut tokens = self.emb_dropout.forward(&tokens, train)?;

        for block in &self.blocks {
            tokens = block.forward(&tokens, train)?;
        }

        // CLS pooling, then the regression head.
        let cls_out = tokens.narrow(1, 0, 1)?.squeeze(1)?;
        let cls_out = self.head_norm.forward(&cls_out)?;
        self.head.forward(&cls_out)
    }
}
