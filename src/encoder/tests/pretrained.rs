//! Interface-parity tests across all three strategies.
//!
//! These fetch the frozen DINO backbone from the Hugging Face hub, so they
//! are ignored by default. Run with `cargo test -- --ignored`.

use candle_core::{Device, Tensor};

use super::build_encoder;
use crate::backbone::DINO_NUM_HEADS;
use crate::config::EncoderMode;

#[test]
#[ignore = "fetches pretrained weights from the Hugging Face hub"]
fn dino_output_matches_the_shared_interface() {
    let encoder = build_encoder(EncoderMode::DinoOutput, 8);
    let device = Device::Cpu;
    let image = Tensor::rand(0f32, 1f32, (2, 3, 128, 128), &device).unwrap();
    let message = Tensor::rand(0f32, 1f32, (2, 30), &device).unwrap();

    let watermarked = encoder.forward(&image, &message).unwrap();
    assert_eq!(watermarked.dims(), &[2, 3, 128, 128]);
    assert_eq!(encoder.semantic_channels(), 8);
}

#[test]
#[ignore = "fetches pretrained weights from the Hugging Face hub"]
fn dino_attention_matches_the_shared_interface() {
    let encoder = build_encoder(EncoderMode::DinoAttention, 8);
    let device = Device::Cpu;
    let image = Tensor::rand(0f32, 1f32, (2, 3, 128, 128), &device).unwrap();
    let message = Tensor::rand(0f32, 1f32, (2, 30), &device).unwrap();

    let watermarked = encoder.forward(&image, &message).unwrap();
    assert_eq!(watermarked.dims(), &[2, 3, 128, 128]);
    // Channel contribution is the backbone's head count, independent of
    // the configured conv width.
    assert_eq!(encoder.semantic_channels(), DINO_NUM_HEADS);
    assert_eq!(encoder.fusion_input_channels(), 30 + DINO_NUM_HEADS + 3);
}

#[test]
#[ignore = "fetches pretrained weights from the Hugging Face hub"]
fn pretrained_forward_is_deterministic() {
    let encoder = build_encoder(EncoderMode::DinoAttention, 8);
    let device = Device::Cpu;
    let image = Tensor::rand(0f32, 1f32, (1, 3, 128, 128), &device).unwrap();
    let message = Tensor::rand(0f32, 1f32, (1, 30), &device).unwrap();

    let first = encoder
        .forward(&image, &message)
        .unwrap()
        .flatten_all()
        .unwrap()
        .to_vec1::<f32>()
        .unwrap();
    let second = encoder
        .forward(&image, &message)
        .unwrap()
        .flatten_all()
        .unwrap()
        .to_vec1::<f32>()
        .unwrap();
    assert_eq!(first, second);
}
