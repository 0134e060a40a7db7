//! Shared convolutional building blocks.

mod conv_bn_relu;

pub use conv_bn_relu::ConvBnRelu;
