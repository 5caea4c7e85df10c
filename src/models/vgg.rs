use std::ops::Range;

use burn::nn::BatchNorm;
use burn::nn::BatchNormConfig;
use burn::nn::PaddingConfig2d;
use burn::nn::Relu;
use burn::nn::conv::Conv2d;
use burn::nn::conv::Conv2dConfig;
use burn::nn::pool::MaxPool2d;
use burn::nn::pool::MaxPool2dConfig;
use burn::{
    module::Module,
    tensor::{Tensor, backend::Backend},
};

/// One entry of a VGG layout: a 3x3 convolution producing the given number of
/// channels (followed by its activation) or a 2x2 max pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VggStage {
    Conv(usize),
    MaxPool,
}

/// VGG-16 Type D
///
/// “Very Deep Convolutional Networks for Large-Scale Image Recognition”
/// Authors: Karen Simonyan, Andrew Zisserman
/// Link (official): https://arxiv.org/abs/1409.1556
///
/// Pg. 3
///
/// Table 1: ConvNet configurations (shown in columns). The depth of the configurations increases
/// from the left (A) to the right (E), as more layers are added (the added layers are shown in
/// bold). The convolutional layer parameters are denoted as “conv(receptive field size)-(number
/// of channels)”. The ReLU activation function is not shown for brevity.
///
/// ```text
///     D
/// -----------
///  conv3-64  x2   maxpool
///  conv3-128 x2   maxpool
///  conv3-256 x3   maxpool   <- pool3
///  conv3-512 x3   maxpool   <- pool4
///  conv3-512 x3   maxpool   <- pool5
/// ```
///
/// The fully connected layers are dropped, an FCN only keeps the convolutional features.
///
pub const VGG16_LAYOUT: [VggStage; 18] = [
    VggStage::Conv(64),
    VggStage::Conv(64),
    VggStage::MaxPool,
    VggStage::Conv(128),
    VggStage::Conv(128),
    VggStage::MaxPool,
    VggStage::Conv(256),
    VggStage::Conv(256),
    VggStage::Conv(256),
    VggStage::MaxPool,
    VggStage::Conv(512),
    VggStage::Conv(512),
    VggStage::Conv(512),
    VggStage::MaxPool,
    VggStage::Conv(512),
    VggStage::Conv(512),
    VggStage::Conv(512),
    VggStage::MaxPool,
];

/// A single addressable layer of the feature extractor.
#[derive(Module, Debug)]
pub enum VggLayer<B: Backend> {
    Conv(Conv2d<B>),
    BatchNorm(BatchNorm<B, 2>),
    Relu(Relu),
    MaxPool(MaxPool2d),
}

impl<B: Backend> VggLayer<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        match self {
            VggLayer::Conv(conv) => conv.forward(input),
            VggLayer::BatchNorm(bn) => bn.forward(input),
            VggLayer::Relu(relu) => relu.forward(input),
            VggLayer::MaxPool(pool) => pool.forward(input),
        }
    }

    pub fn is_pool(&self) -> bool {
        matches!(self, VggLayer::MaxPool(_))
    }
}

/// The convolutional part of a VGG network kept as a flat layer sequence, so that any
/// contiguous range of layers can be run on its own.
///
/// Layer `i` here is layer `i` of the torchvision `features` sequential, which keeps the
/// depth indices used for slicing identical across implementations.
///
#[derive(Module, Debug)]
pub struct VggFeatures<B: Backend> {
    layers: Vec<VggLayer<B>>,
}

impl<B: Backend> VggFeatures<B> {
    pub fn new(layout: &[VggStage], batch_norm: bool, device: &B::Device) -> Self {
        let mut layers = Vec::new();
        let mut in_channels = 3;

        for stage in layout {
            match *stage {
                VggStage::Conv(out_channels) => {
                    let conv = Conv2dConfig::new([in_channels, out_channels], [3, 3])
                        .with_padding(PaddingConfig2d::Explicit(1, 1))
                        .init(device);
                    layers.push(VggLayer::Conv(conv));

                    if batch_norm {
                        layers.push(VggLayer::BatchNorm(
                            BatchNormConfig::new(out_channels).init(device),
                        ));
                    }

                    layers.push(VggLayer::Relu(Relu::new()));
                    in_channels = out_channels;
                }
                VggStage::MaxPool => {
                    layers.push(VggLayer::MaxPool(
                        MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
                    ));
                }
            }
        }

        Self { layers }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer(&self, depth: usize) -> Option<&VggLayer<B>> {
        self.layers.get(depth)
    }

    /// Runs the layers with depth indices in `range`, feeding `input` to the first of them.
    pub fn forward_range(&self, input: Tensor<B, 4>, range: Range<usize>) -> Tensor<B, 4> {
        self.layers[range]
            .iter()
            .fold(input, |x, layer| layer.forward(x))
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.forward_range(input, 0..self.len())
    }
}
