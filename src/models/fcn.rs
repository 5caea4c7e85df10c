use std::path::Path;
use std::str::FromStr;

use burn::{
    config::Config,
    module::Module,
    tensor::{
        Tensor,
        backend::Backend,
        module::interpolate,
        ops::{InterpolateMode, InterpolateOptions},
    },
};
use log::info;

use crate::config::{BASE_SIZE, CROP_SIZE, DEFAULT_BACKBONE, DEFAULT_ROOT};
use crate::dataset::Dataset;
use crate::error::{self, FcnError};
use crate::layers::CutPoint;
use crate::model_store;
use crate::models::backbone::{Backbone, BackboneSpec};
use crate::models::head::{FcnHead, FcnHeadConfig, ScoreProjector, ScoreProjectorConfig};

/// The three FCN decoder topologies.
///
/// “Fully Convolutional Networks for Semantic Segmentation”
/// Authors: Jonathan Long, Evan Shelhamer, Trevor Darrell
/// Link (official): https://arxiv.org/abs/1411.4038
///
/// Section 4.2 - Combining what and where
///
/// We call this net FCN-16s. [...] We continue in this fashion by fusing predictions from
/// pool3 with a 2× upsampling of predictions fused from pool4 and conv7, building the net
/// FCN-8s.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FcnVariant {
    /// Single prediction from pool5, upsampled 32x.
    Fcn32s,
    /// pool5 prediction fused with a pool4 skip, upsampled 16x.
    Fcn16s,
    /// pool5 prediction fused with pool4 then pool3 skips, upsampled 8x.
    Fcn8s,
}

impl FcnVariant {
    pub fn as_list() -> Vec<FcnVariant> {
        vec![FcnVariant::Fcn32s, FcnVariant::Fcn16s, FcnVariant::Fcn8s]
    }

    pub fn name(&self) -> &'static str {
        match self {
            FcnVariant::Fcn32s => "fcn32s",
            FcnVariant::Fcn16s => "fcn16s",
            FcnVariant::Fcn8s => "fcn8s",
        }
    }

    /// Skip taps in the order they are fused, coarsest first.
    pub fn skip_taps(&self) -> Vec<CutPoint> {
        match self {
            FcnVariant::Fcn32s => vec![],
            FcnVariant::Fcn16s => vec![CutPoint::Pool4],
            FcnVariant::Fcn8s => vec![CutPoint::Pool4, CutPoint::Pool3],
        }
    }

    /// Model-store key of whole-model pretrained weights, `<variant>_<backbone>_<dataset>`.
    pub fn weight_key(&self, backbone: &str, dataset: Dataset) -> String {
        format!("{}_{}_{}", self.name(), backbone, dataset.acronym())
    }
}

impl FromStr for FcnVariant {
    type Err = FcnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FcnVariant::as_list()
            .into_iter()
            .find(|variant| variant.name() == s)
            .ok_or_else(|| FcnError::UnknownVariant(s.to_string()))
    }
}

#[derive(Config, Debug)]
pub struct FcnConfig {
    pub num_classes: usize,
    #[config(default = "String::from(DEFAULT_BACKBONE)")]
    pub backbone: String,
    /// Build a second head on pool5 whose output is only used as an extra training signal.
    #[config(default = false)]
    pub aux: bool,
    /// Start the backbone from its own pretrained weights, read from `root`.
    #[config(default = true)]
    pub pretrained_base: bool,
    #[config(default = "String::from(DEFAULT_ROOT)")]
    pub root: String,
    #[config(default = "BASE_SIZE")]
    pub base_size: usize,
    #[config(default = "CROP_SIZE")]
    pub crop_size: usize,
}

/// Pieces shared by every variant.
struct FcnParts<B: Backend> {
    spec: &'static BackboneSpec,
    backbone: Backbone<B>,
    head: FcnHead<B>,
    aux_head: Option<FcnHead<B>>,
}

impl FcnConfig {
    fn init_parts<B: Backend>(&self, device: &B::Device) -> error::Result<FcnParts<B>> {
        let spec = BackboneSpec::lookup(&self.backbone)?;
        let backbone = spec.init(self.pretrained_base, &self.root, device)?;
        let head_config = FcnHeadConfig::new(spec.channels(CutPoint::Pool5), self.num_classes);
        let aux_head = self.aux.then(|| head_config.init(device));

        Ok(FcnParts {
            spec,
            backbone,
            head: head_config.init(device),
            aux_head,
        })
    }

    fn projector<B: Backend>(
        &self,
        spec: &BackboneSpec,
        tap: CutPoint,
        device: &B::Device,
    ) -> ScoreProjector<B> {
        ScoreProjectorConfig::new(spec.channels(tap), self.num_classes).init(device)
    }

    pub fn init_fcn32s<B: Backend>(&self, device: &B::Device) -> error::Result<Fcn32s<B>> {
        let parts = self.init_parts(device)?;

        Ok(Fcn32s {
            backbone: parts.backbone,
            head: parts.head,
            aux_head: parts.aux_head,
            base_size: self.base_size,
            crop_size: self.crop_size,
        })
    }

    pub fn init_fcn16s<B: Backend>(&self, device: &B::Device) -> error::Result<Fcn16s<B>> {
        let parts = self.init_parts(device)?;

        Ok(Fcn16s {
            score_pool4: self.projector(parts.spec, CutPoint::Pool4, device),
            backbone: parts.backbone,
            head: parts.head,
            aux_head: parts.aux_head,
            base_size: self.base_size,
            crop_size: self.crop_size,
        })
    }

    pub fn init_fcn8s<B: Backend>(&self, device: &B::Device) -> error::Result<Fcn8s<B>> {
        let parts = self.init_parts(device)?;

        Ok(Fcn8s {
            score_pool3: self.projector(parts.spec, CutPoint::Pool3, device),
            score_pool4: self.projector(parts.spec, CutPoint::Pool4, device),
            backbone: parts.backbone,
            head: parts.head,
            aux_head: parts.aux_head,
            base_size: self.base_size,
            crop_size: self.crop_size,
        })
    }

    pub fn init<B: Backend>(
        &self,
        variant: FcnVariant,
        device: &B::Device,
    ) -> error::Result<FcnModel<B>> {
        let taps: Vec<&str> = variant.skip_taps().iter().map(|cut| cut.name()).collect();
        info!(
            "building {} on {} with {} classes, skips {:?}",
            variant.name(),
            self.backbone,
            self.num_classes,
            taps
        );

        Ok(match variant {
            FcnVariant::Fcn32s => FcnModel::Fcn32s(self.init_fcn32s(device)?),
            FcnVariant::Fcn16s => FcnModel::Fcn16s(self.init_fcn16s(device)?),
            FcnVariant::Fcn8s => FcnModel::Fcn8s(self.init_fcn8s(device)?),
        })
    }
}

/// Score maps produced by a forward pass, both at the input resolution.
#[derive(Debug, Clone)]
pub struct FcnOutput<B: Backend> {
    /// `[N, num_classes, H, W]` fused prediction.
    pub out: Tensor<B, 4>,
    /// Prediction of the auxiliary head, present only when the model was built with `aux`.
    pub aux: Option<Tensor<B, 4>>,
}

impl<B: Backend> FcnOutput<B> {
    /// Primary output first, followed by the auxiliary one when present.
    pub fn into_vec(self) -> Vec<Tensor<B, 4>> {
        std::iter::once(self.out).chain(self.aux).collect()
    }
}

/// Bilinear resize of a `[N, C, H, W]` score map to `size` (`[height, width]`).
///
/// Corner samples of the source and target grids coincide, target index `i` reads source
/// position `i * (in - 1) / (out - 1)`.
pub fn upsample<B: Backend>(x: Tensor<B, 4>, size: [usize; 2]) -> Tensor<B, 4> {
    interpolate(x, size, InterpolateOptions::new(InterpolateMode::Bilinear))
}

fn spatial_size<B: Backend>(x: &Tensor<B, 4>) -> [usize; 2] {
    let [_, _, height, width] = x.dims();
    [height, width]
}

/// Grows the coarse score map to the size of the finer skip score map and adds them.
pub fn fuse<B: Backend>(coarse: Tensor<B, 4>, skip: Tensor<B, 4>) -> Tensor<B, 4> {
    let size = spatial_size(&skip);
    upsample(coarse, size) + skip
}

/// Fuses `score_fr` with each skip score map in turn, `skips` ordered coarsest first.
///
/// The running sum is only ever combined with the next finer skip; skips are never added to
/// each other directly.
pub fn fuse_cascade<B: Backend>(score_fr: Tensor<B, 4>, skips: Vec<Tensor<B, 4>>) -> Tensor<B, 4> {
    skips.into_iter().fold(score_fr, fuse)
}

fn aux_output<B: Backend>(
    aux_head: &Option<FcnHead<B>>,
    pool5: Tensor<B, 4>,
    size: [usize; 2],
) -> Option<Tensor<B, 4>> {
    aux_head
        .as_ref()
        .map(|head| upsample(head.forward(pool5), size))
}

#[derive(Module, Debug)]
pub struct Fcn32s<B: Backend> {
    pub backbone: Backbone<B>,
    head: FcnHead<B>,
    aux_head: Option<FcnHead<B>>,
    base_size: usize,
    crop_size: usize,
}

impl<B: Backend> Fcn32s<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> FcnOutput<B> {
        let size = spatial_size(&input);
        let pool5 = self.backbone.forward(input);

        let score_fr = self.head.forward(pool5.clone());
        let out = upsample(score_fr, size);

        FcnOutput {
            out,
            aux: aux_output(&self.aux_head, pool5, size),
        }
    }
}

#[derive(Module, Debug)]
pub struct Fcn16s<B: Backend> {
    pub backbone: Backbone<B>,
    head: FcnHead<B>,
    score_pool4: ScoreProjector<B>,
    aux_head: Option<FcnHead<B>>,
    base_size: usize,
    crop_size: usize,
}

impl<B: Backend> Fcn16s<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> FcnOutput<B> {
        let size = spatial_size(&input);
        let pool4 = self
            .backbone
            .forward_between(input, CutPoint::Input, CutPoint::Pool4);
        let pool5 = self
            .backbone
            .forward_between(pool4.clone(), CutPoint::Pool4, CutPoint::Pool5);

        let score_fr = self.head.forward(pool5.clone());
        let score_pool4 = self.score_pool4.forward(pool4);

        let fuse_pool4 = fuse_cascade(score_fr, vec![score_pool4]);
        let out = upsample(fuse_pool4, size);

        FcnOutput {
            out,
            aux: aux_output(&self.aux_head, pool5, size),
        }
    }
}

#[derive(Module, Debug)]
pub struct Fcn8s<B: Backend> {
    pub backbone: Backbone<B>,
    head: FcnHead<B>,
    score_pool3: ScoreProjector<B>,
    score_pool4: ScoreProjector<B>,
    aux_head: Option<FcnHead<B>>,
    base_size: usize,
    crop_size: usize,
}

impl<B: Backend> Fcn8s<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> FcnOutput<B> {
        let size = spatial_size(&input);
        let pool3 = self
            .backbone
            .forward_between(input, CutPoint::Input, CutPoint::Pool3);
        let pool4 = self
            .backbone
            .forward_between(pool3.clone(), CutPoint::Pool3, CutPoint::Pool4);
        let pool5 = self
            .backbone
            .forward_between(pool4.clone(), CutPoint::Pool4, CutPoint::Pool5);

        let score_fr = self.head.forward(pool5.clone());
        let score_pool4 = self.score_pool4.forward(pool4);
        let score_pool3 = self.score_pool3.forward(pool3);

        let fuse_pool3 = fuse_cascade(score_fr, vec![score_pool4, score_pool3]);
        let out = upsample(fuse_pool3, size);

        FcnOutput {
            out,
            aux: aux_output(&self.aux_head, pool5, size),
        }
    }
}

/// Any of the three variants behind one type, as returned by the model factory.
#[derive(Module, Debug)]
pub enum FcnModel<B: Backend> {
    Fcn32s(Fcn32s<B>),
    Fcn16s(Fcn16s<B>),
    Fcn8s(Fcn8s<B>),
}

impl<B: Backend> FcnModel<B> {
    pub fn variant(&self) -> FcnVariant {
        match self {
            FcnModel::Fcn32s(_) => FcnVariant::Fcn32s,
            FcnModel::Fcn16s(_) => FcnVariant::Fcn16s,
            FcnModel::Fcn8s(_) => FcnVariant::Fcn8s,
        }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> FcnOutput<B> {
        match self {
            FcnModel::Fcn32s(model) => model.forward(input),
            FcnModel::Fcn16s(model) => model.forward(input),
            FcnModel::Fcn8s(model) => model.forward(input),
        }
    }

    /// `(base_size, crop_size)` the model was configured with.
    pub fn sizes(&self) -> (usize, usize) {
        match self {
            FcnModel::Fcn32s(model) => (model.base_size, model.crop_size),
            FcnModel::Fcn16s(model) => (model.base_size, model.crop_size),
            FcnModel::Fcn8s(model) => (model.base_size, model.crop_size),
        }
    }

    /// Replaces every parameter with the weights stored at `path`.
    pub fn load_weights(self, path: &Path, device: &B::Device) -> error::Result<Self> {
        Ok(match self {
            FcnModel::Fcn32s(model) => {
                FcnModel::Fcn32s(model_store::load_weights(model, path, device)?)
            }
            FcnModel::Fcn16s(model) => {
                FcnModel::Fcn16s(model_store::load_weights(model, path, device)?)
            }
            FcnModel::Fcn8s(model) => {
                FcnModel::Fcn8s(model_store::load_weights(model, path, device)?)
            }
        })
    }

    /// Stores every parameter at `path`, readable by [`FcnModel::load_weights`].
    pub fn save_weights(self, path: &Path) -> error::Result<()> {
        match self {
            FcnModel::Fcn32s(model) => model_store::save_weights(model, path),
            FcnModel::Fcn16s(model) => model_store::save_weights(model, path),
            FcnModel::Fcn8s(model) => model_store::save_weights(model, path),
        }
    }
}
