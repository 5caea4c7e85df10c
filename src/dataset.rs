use std::str::FromStr;

use crate::error::{FcnError, Result};

/// Segmentation datasets an FCN model can be built for.
///
/// The registry only answers two questions: how many classes the prediction
/// heads must emit, and which acronym names the dataset in pretrained weight
/// keys. Loading images is not handled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    /// `pascal_voc`: PASCAL VOC 2012, 20 classes plus background.
    PascalVoc,
    /// `pascal_aug`: PASCAL VOC with the SBD augmented annotations.
    PascalAug,
    /// `ade20k`: ADE20K scene parsing.
    Ade20k,
    /// `coco`: COCO restricted to the PASCAL VOC categories.
    Coco,
    /// `citys`: Cityscapes.
    Cityscapes,
}

impl Dataset {
    /// Returns every registered dataset.
    pub fn as_list() -> Vec<Dataset> {
        vec![
            Dataset::PascalVoc,
            Dataset::PascalAug,
            Dataset::Ade20k,
            Dataset::Coco,
            Dataset::Cityscapes,
        ]
    }

    /// Resolves a dataset identifier, failing with [`FcnError::UnknownDataset`].
    pub fn lookup(id: &str) -> Result<Dataset> {
        Self::as_list()
            .into_iter()
            .find(|dataset| dataset.id() == id)
            .ok_or_else(|| FcnError::UnknownDataset(id.to_string()))
    }

    /// The identifier callers use to select the dataset.
    pub fn id(&self) -> &'static str {
        match self {
            Dataset::PascalVoc => "pascal_voc",
            Dataset::PascalAug => "pascal_aug",
            Dataset::Ade20k => "ade20k",
            Dataset::Coco => "coco",
            Dataset::Cityscapes => "citys",
        }
    }

    /// Short name used in pretrained weight keys.
    pub fn acronym(&self) -> &'static str {
        match self {
            Dataset::PascalVoc => "pascal_voc",
            Dataset::PascalAug => "pascal_aug",
            Dataset::Ade20k => "ade",
            Dataset::Coco => "coco",
            Dataset::Cityscapes => "citys",
        }
    }

    /// Number of classes, background included where the dataset has one.
    pub fn num_classes(&self) -> usize {
        match self {
            Dataset::PascalVoc => 21,
            Dataset::PascalAug => 21,
            Dataset::Ade20k => 150,
            Dataset::Coco => 21,
            Dataset::Cityscapes => 19,
        }
    }
}

impl FromStr for Dataset {
    type Err = FcnError;

    fn from_str(s: &str) -> Result<Self> {
        Dataset::lookup(s)
    }
}
