//! Encoder-level tests.
//!
//! The `vit` strategy is fully local and runs on CPU. Tests that exercise
//! the pretrained strategies fetch the frozen backbone from the Hugging
//! Face hub and are `#[ignore]`d; run them with `cargo test -- --ignored`
//! on a machine with network access.

mod forward;
mod pretrained;

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};

use crate::config::{EncoderMode, HiddenConfig};
use crate::encoder::Encoder;

/// Canonical 128x128 configuration with a small channel width so the `vit`
/// regression head stays CPU-test sized.
pub(crate) fn test_config(mode: Option<EncoderMode>, encoder_channels: usize) -> HiddenConfig {
    HiddenConfig {
        h: 128,
        w: 128,
        encoder_channels,
        encoder_blocks: 4,
        message_length: 30,
        encoder_loss: 0.7,
        encoder_mode: mode,
        decoder_blocks: 2,
        vit_depth: None,
    }
}

pub(crate) fn build_encoder(mode: EncoderMode, encoder_channels: usize) -> Encoder {
    let config = test_config(Some(mode), encoder_channels);
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    Encoder::new(&config, vb).unwrap()
}
