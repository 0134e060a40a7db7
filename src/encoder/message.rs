//! Spatial broadcast of the message vector.

use candle_core::Tensor;

use crate::error::{WatermarkError, WatermarkResult};

/// Broadcast a `(B, L)` message to `(B, L, h, w)`.
///
/// Every spatial location carries the identical message vector; there is no
/// positional encoding.
pub fn broadcast_message(message: &Tensor, h: usize, w: usize) -> WatermarkResult<Tensor> {
    let (b, l) = message.dims2().map_err(|_| WatermarkError::ShapeMismatch {
        context: "message".to_string(),
        expected: "(B, message_length)".to_string(),
        actual: format!("{:?}", message.dims()),
    })?;

    message
        .unsqueeze(2)
        .and_then(|t| t.unsqueeze(3))
        .and_then(|t| t.broadcast_as((b, l, h, w)))
        .and_then(|t| t.contiguous())
        .map_err(|e| WatermarkError::Tensor {
            message: format!("message broadcast failed: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn broadcast_shape() {
        let message = Tensor::rand(0f32, 1f32, (2, 30), &Device::Cpu).unwrap();
        let expanded = broadcast_message(&message, 128, 128).unwrap();
        assert_eq!(expanded.dims(), &[2, 30, 128, 128]);
    }

    #[test]
    fn every_location_sees_the_same_vector() {
        let message = Tensor::rand(0f32, 1f32, (1, 8), &Device::Cpu).unwrap();
        let expanded = broadcast_message(&message, 16, 16).unwrap();

        // Spatial variance per channel must be zero.
        let mean = expanded.mean_keepdim(3).unwrap().mean_keepdim(2).unwrap();
        let centered = expanded.broadcast_sub(&mean).unwrap();
        let variance = centered
            .sqr()
            .unwrap()
            .mean_all()
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert_eq!(variance, 0.0);

        // And each channel equals the original scalar.
        let original = message.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        let corner = expanded
            .get(0)
            .unwrap()
            .narrow(1, 7, 1)
            .unwrap()
            .narrow(2, 3, 1)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap();
        assert_eq!(corner, original);
    }

    #[test]
    fn non_matrix_message_is_rejected() {
        let message = Tensor::rand(0f32, 1f32, (2, 30, 1), &Device::Cpu).unwrap();
        let err = broadcast_message(&message, 8, 8).unwrap_err();
        assert!(matches!(err, WatermarkError::ShapeMismatch { .. }));
    }
}
