//! Forward-pass tests for the local `vit` strategy.

use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};

use super::build_encoder;
use crate::config::EncoderMode;
use crate::encoder::strategy::VitStrategy;
use crate::error::WatermarkError;
use crate::vit::{VitConfig, VitRegressor};

#[test]
fn watermarked_image_has_cover_geometry() {
    let encoder = build_encoder(EncoderMode::Vit, 2);
    let device = Device::Cpu;
    let image = Tensor::rand(0f32, 1f32, (2, 3, 128, 128), &device).unwrap();
    let message = Tensor::rand(0f32, 1f32, (2, 30), &device).unwrap();

    let watermarked = encoder.forward(&image, &message).unwrap();
    assert_eq!(watermarked.dims(), &[2, 3, 128, 128]);
    assert_eq!(watermarked.dtype(), image.dtype());
    assert!(watermarked.device().same_device(image.device()));
}

#[test]
fn inference_forward_is_deterministic() {
    let encoder = build_encoder(EncoderMode::Vit, 2);
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

#[test]
fn trunk_features_have_embedding_geometry() {
    let encoder = build_encoder(EncoderMode::Vit, 2);
    let image = Tensor::rand(0f32, 1f32, (2, 3, 128, 128), &Device::Cpu).unwrap();
    let features = encoder.image_features(&image, false).unwrap();
    assert_eq!(features.dims(), &[2, 2, 128, 128]);
}

#[test]
fn wrong_message_length_is_rejected() {
    let encoder = build_encoder(EncoderMode::Vit, 2);
    let device = Device::Cpu;
    let image = Tensor::rand(0f32, 1f32, (2, 3, 128, 128), &device).unwrap();
    let message = Tensor::rand(0f32, 1f32, (2, 31), &device).unwrap();

    let err = encoder.forward(&image, &message).unwrap_err();
    assert!(matches!(err, WatermarkError::ShapeMismatch { .. }));
}

#[test]
fn wrong_image_resolution_is_rejected() {
    let encoder = build_encoder(EncoderMode::Vit, 2);
    let device = Device::Cpu;
    let image = Tensor::rand(0f32, 1f32, (2, 3, 64, 64), &device).unwrap();
    let message = Tensor::rand(0f32, 1f32, (2, 30), &device).unwrap();

    let err = encoder.forward(&image, &message).unwrap_err();
    assert!(matches!(err, WatermarkError::ShapeMismatch { .. }));
}

#[test]
fn regressor_output_width_mismatch_is_a_shape_error() {
    // A regressor whose output width is not 128 * 128 * conv_channels must
    // fail the forward pass, never silently reshape.
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    let config = VitConfig {
        image_h: 128,
        image_w: 128,
        patch_size: 32,
        dim: 64,
        depth: 1,
        heads: 4,
        mlp_dim: 128,
        dropout: 0.0,
        num_outputs: 1000,
    };
    let regressor = VitRegressor::new(config, vb).unwrap();
    let strategy = VitStrategy {
        regressor,
        conv_channels: 2,
    };

    let image = Tensor::rand(0f32, 1f32, (1, 3, 128, 128), &Device::Cpu).unwrap();
    let err = strategy.semantic_representation(&image, false).unwrap_err();
    assert!(matches!(err, WatermarkError::ShapeMismatch { .. }));
}
