//! Fusion and output stage shared by all strategies.
//!
//! Takes the channel concatenation `[message, semantic representation,
//! image]`, maps it to `conv_channels` with one ConvBnRelu block, then
//! projects to 3 output channels with a 1x1 convolution. No activation
//! clamps the output range; range assumptions belong to the loss side.

use candle_core::{Module, ModuleT, Result, Tensor};
use candle_nn::{conv2d, Conv2d, Conv2dConfig, VarBuilder};

use crate::layers::ConvBnRelu;

/// ConvBnRelu over the fused channels, then a 1x1 projection to RGB.
#[derive(Debug)]
pub struct FusionStage {
    after_concat: ConvBnRelu,
    output: Conv2d,
    input_channels: usize,
}

impl FusionStage {
    /// Build a fusion stage for `input_channels` concatenated channels.
    ///
    /// `input_channels` is fixed per strategy at construction time:
    /// `message_length + semantic_channels + 3`.
    pub fn new(input_channels: usize, conv_channels: usize, vb: VarBuilder) -> Result<Self> {
        let after_concat = ConvBnRelu::new(input_channels, conv_channels, vb.pp("after_concat"))?;
        let output = conv2d(
            conv_channels,
            3,
            1,
            Conv2dConfig::default(),
            vb.pp("output"),
        )?;
        Ok(Self {
            after_concat,
            output,
            input_channels,
        })
    }

    /// The channel count this stage was built for.
    pub fn input_channels(&self) -> usize {
        self.input_channels
    }

    /// Fuse `(B, input_channels, H, W)` down to a `(B, 3, H, W)` image.
    pub fn forward_t(&self, concat: &Tensor, train: bool) -> Result<Tensor> {
        let fused = self.after_concat.forward_t(concat, train)?;
        self.output.forward(&fused)
    }
}
