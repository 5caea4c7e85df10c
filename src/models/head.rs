use burn::{
    config::Config,
    module::Module,
    nn::{
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, PaddingConfig2d, Relu,
        conv::{Conv2d, Conv2dConfig},
    },
    tensor::{Tensor, backend::Backend},
};

/// Prediction head mapping the deepest feature map to per-pixel class scores.
///
/// conv3x3 (`C_in -> C_in / 4`, no bias) -> batch norm -> relu -> dropout -> conv1x1
/// (`C_in / 4 -> num_classes`). The spatial size is preserved.
///
/// The dropout is only active when running on an autodiff backend, so inference is
/// deterministic.
///
#[derive(Module, Debug)]
pub struct FcnHead<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
    relu: Relu,
    dropout: Dropout,
    classifier: Conv2d<B>,
}

impl<B: Backend> FcnHead<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = self.relu.forward(x);
        let x = self.dropout.forward(x);
        self.classifier.forward(x)
    }
}

#[derive(Config, Debug)]
pub struct FcnHeadConfig {
    pub in_channels: usize,
    pub num_classes: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl FcnHeadConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FcnHead<B> {
        let inter_channels = self.in_channels / 4;

        FcnHead {
            conv: Conv2dConfig::new([self.in_channels, inter_channels], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .with_bias(false)
                .init(device),
            bn: BatchNormConfig::new(inter_channels).init(device),
            relu: Relu::new(),
            dropout: DropoutConfig::new(self.dropout).init(),
            classifier: Conv2dConfig::new([inter_channels, self.num_classes], [1, 1]).init(device),
        }
    }
}

/// Linear class-score projection of a skip-connection feature map: a single 1x1
/// convolution with bias.
#[derive(Module, Debug)]
pub struct ScoreProjector<B: Backend> {
    conv: Conv2d<B>,
}

impl<B: Backend> ScoreProjector<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.conv.forward(x)
    }
}

#[derive(Config, Debug)]
pub struct ScoreProjectorConfig {
    pub in_channels: usize,
    pub num_classes: usize,
}

impl ScoreProjectorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ScoreProjector<B> {
        ScoreProjector {
            conv: Conv2dConfig::new([self.in_channels, self.num_classes], [1, 1]).init(device),
        }
    }
}
