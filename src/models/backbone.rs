use burn::{
    module::Module,
    tensor::{Tensor, backend::Backend},
};
use log::info;

use crate::error::{FcnError, Result};
use crate::layers::CutPoint;
use crate::model_store;
use crate::models::vgg::{VGG16_LAYOUT, VggFeatures, VggStage};

/// Static description of a backbone: how to build its layer sequence and where the FCN
/// cut points sit inside it.
///
/// Adding a backbone means adding an entry to [`BACKBONES`]; the fusion cascade only talks
/// to [`Backbone`] through [`CutPoint`]s.
///
#[derive(Debug)]
pub struct BackboneSpec {
    /// Identifier used by callers and as the model-store key of the backbone weights.
    pub name: &'static str,
    pub layout: &'static [VggStage],
    pub batch_norm: bool,
    /// Layer depth right after the third pooling layer.
    pub pool3_depth: usize,
    /// Layer depth right after the fourth pooling layer. pool5 is the end of the layer
    /// sequence.
    pub pool4_depth: usize,
    pub pool3_channels: usize,
    pub pool4_channels: usize,
    pub pool5_channels: usize,
}

/// Registry of supported backbones, keyed by [`BackboneSpec::name`].
pub static BACKBONES: [BackboneSpec; 2] = [
    BackboneSpec {
        name: "vgg16",
        layout: &VGG16_LAYOUT,
        batch_norm: false,
        pool3_depth: 17,
        pool4_depth: 24,
        pool3_channels: 256,
        pool4_channels: 512,
        pool5_channels: 512,
    },
    BackboneSpec {
        name: "vgg16_bn",
        layout: &VGG16_LAYOUT,
        batch_norm: true,
        pool3_depth: 24,
        pool4_depth: 34,
        pool3_channels: 256,
        pool4_channels: 512,
        pool5_channels: 512,
    },
];

impl BackboneSpec {
    /// Looks a backbone up by name, failing with [`FcnError::UnsupportedBackbone`].
    pub fn lookup(name: &str) -> Result<&'static BackboneSpec> {
        BACKBONES
            .iter()
            .find(|spec| spec.name == name)
            .ok_or_else(|| FcnError::UnsupportedBackbone(name.to_string()))
    }

    pub fn channels(&self, cut: CutPoint) -> usize {
        match cut {
            CutPoint::Input => 3,
            CutPoint::Pool3 => self.pool3_channels,
            CutPoint::Pool4 => self.pool4_channels,
            CutPoint::Pool5 => self.pool5_channels,
        }
    }

    /// Builds the backbone. With `pretrained` set, the feature weights are read from the
    /// model store entry named after the backbone under `root`.
    pub fn init<B: Backend>(
        &self,
        pretrained: bool,
        root: &str,
        device: &B::Device,
    ) -> Result<Backbone<B>> {
        let mut features = VggFeatures::new(self.layout, self.batch_norm, device);

        if pretrained {
            let path = model_store::get_model_file(self.name, root)?;
            info!("loading pre-trained {} weights from {}", self.name, path.display());
            features = model_store::load_weights(features, &path, device)?;
        }

        Ok(Backbone {
            features,
            pool3_depth: self.pool3_depth,
            pool4_depth: self.pool4_depth,
        })
    }
}

/// A backbone instance that can be run between any two cut points.
#[derive(Module, Debug)]
pub struct Backbone<B: Backend> {
    pub features: VggFeatures<B>,
    pool3_depth: usize,
    pool4_depth: usize,
}

impl<B: Backend> Backbone<B> {
    fn depth(&self, cut: CutPoint) -> usize {
        match cut {
            CutPoint::Input => 0,
            CutPoint::Pool3 => self.pool3_depth,
            CutPoint::Pool4 => self.pool4_depth,
            CutPoint::Pool5 => self.features.len(),
        }
    }

    /// Continues a forward pass from the feature map at `from` up to the one at `to`.
    ///
    /// # Panics
    /// When `to` is shallower than `from`.
    pub fn forward_between(
        &self,
        input: Tensor<B, 4>,
        from: CutPoint,
        to: CutPoint,
    ) -> Tensor<B, 4> {
        assert!(from <= to, "cannot run backbone from {} back to {}", from.name(), to.name());
        self.features
            .forward_range(input, self.depth(from)..self.depth(to))
    }

    /// Runs the whole backbone and returns pool5.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.features.forward(input)
    }
}
