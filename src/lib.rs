//! Semantic watermark embedding network.
//!
//! This crate implements the encoder half of a HiDDeN-style watermarking
//! pipeline: it takes a cover image and a message vector and produces a
//! visually similar image that encodes the message imperceptibly. Learned
//! semantic features of the image guide where the message goes; three
//! interchangeable conditioning strategies are supported, selected once at
//! construction:
//!
//! - `vit` — a trainable vision transformer regresses a dense semantic map;
//! - `dino-output` — a frozen `facebook/dino-vits8` backbone's pooled
//!   embedding is projected into the map;
//! - `dino-attention` — that backbone's CLS attention is used directly as a
//!   spatial saliency map.
//!
//! The decoder, losses, training orchestration, and data pipeline are
//! external collaborators.
//!
//! # Example
//!
//! ```rust,no_run
//! use candle_core::{DType, Device, Tensor};
//! use candle_nn::{VarBuilder, VarMap};
//! use watermark_encoder::{Encoder, HiddenConfig};
//!
//! fn example() -> watermark_encoder::WatermarkResult<()> {
//!     let config = HiddenConfig::from_file("hidden.toml")?;
//!     let varmap = VarMap::new();
//!     let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
//!     let encoder = Encoder::new(&config, vb)?;
//!
//!     let image = Tensor::rand(0f32, 1f32, (2, 3, 128, 128), &Device::Cpu).unwrap();
//!     let message = Tensor::rand(0f32, 1f32, (2, 30), &Device::Cpu).unwrap();
//!     let watermarked = encoder.forward(&image, &message)?;
//!     assert_eq!(watermarked.dims(), image.dims());
//!     Ok(())
//! }
//! ```

pub mod backbone;
pub mod config;
pub mod encoder;
pub mod error;
pub mod layers;
pub mod vit;

pub use config::{EncoderMode, HiddenConfig};
pub use encoder::{Encoder, SEMANTIC_MAP_SIDE};
pub use error::{WatermarkError, WatermarkResult};
