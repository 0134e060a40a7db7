//! Convolution + batch normalization + ReLU block.
//!
//! The basic unit of both the encoder trunk and the fusion stage: a 3x3
//! convolution with stride 1 and padding 1 (spatial size is preserved),
//! followed by 2D batch normalization and ReLU.

use candle_core::{Module, ModuleT, Result, Tensor};
use candle_nn::{batch_norm, conv2d, BatchNorm, Conv2d, Conv2dConfig, VarBuilder};

/// Spatial-size-preserving Conv2d(3x3) + BatchNorm2d + ReLU block.
#[derive(Debug)]
pub struct ConvBnRelu {
    conv: Conv2d,
    bn: BatchNorm,
}

impl ConvBnRelu {
    /// Build a block mapping `in_channels` to `out_channels`.
    pub fn new(in_channels: usize, out_channels: usize, vb: VarBuilder) -> Result<Self> {
        let conv_config = Conv2dConfig {
            padding: 1,
            ..Default::default()
        };
        let conv = conv2d(in_channels, out_channels, 3, conv_config, vb.pp("conv"))?;
        let bn = batch_norm(out_channels, 1e-5, vb.pp("bn"))?;
        Ok(Self { conv, bn })
    }
}

impl ModuleT for ConvBnRelu {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let xs = self.conv.forward(xs)?;
        let xs = self.bn.forward_t(&xs, train)?;
        xs.relu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn preserves_spatial_size_and_maps_channels() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let block = ConvBnRelu::new(3, 16, vb).unwrap();
        let input = Tensor::randn(0f32, 1f32, (2, 3, 32, 32), &device).unwrap();
        let output = block.forward_t(&input, false).unwrap();
        assert_eq!(output.dims(), &[2, 16, 32, 32]);
    }

    #[test]
    fn relu_output_is_non_negative() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let block = ConvBnRelu::new(3, 8, vb).unwrap();
        let input = Tensor::randn(0f32, 1f32, (1, 3, 16, 16), &device).unwrap();
        let output = block.forward_t(&input, false).unwrap();
        let min = output
            .flatten_all()
            .unwrap()
            .min(0)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!(min >= 0.0);
    }
}
