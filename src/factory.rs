use burn::tensor::backend::Backend;
use log::info;

use crate::config::ModelOptions;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::model_store;
use crate::models::fcn::{FcnConfig, FcnModel, FcnVariant};

/// Builds an FCN model for a dataset.
///
/// The dataset is resolved first, so an unknown dataset fails before any backbone is
/// constructed. With `options.pretrained` set, every parameter is then overwritten with the
/// weights stored under [`FcnVariant::weight_key`] in `options.root`; a missing or
/// incompatible weight file is an error, never a silent fallback to random weights.
///
pub fn get_fcn<B: Backend>(
    variant: FcnVariant,
    options: &ModelOptions,
    device: &B::Device,
) -> Result<FcnModel<B>> {
    let dataset = Dataset::lookup(&options.dataset)?;

    let model = FcnConfig::new(dataset.num_classes())
        .with_backbone(options.backbone.clone())
        .with_aux(options.aux)
        .with_pretrained_base(options.pretrained_base)
        .with_root(options.root.clone())
        .with_base_size(options.base_size)
        .with_crop_size(options.crop_size)
        .init(variant, device)?;

    if !options.pretrained {
        return Ok(model);
    }

    let key = variant.weight_key(&options.backbone, dataset);
    let path = model_store::get_model_file(&key, &options.root)?;
    info!("loading pretrained {} weights from {}", key, path.display());

    model.load_weights(&path, device)
}

pub fn get_fcn32s<B: Backend>(options: &ModelOptions, device: &B::Device) -> Result<FcnModel<B>> {
    get_fcn(FcnVariant::Fcn32s, options, device)
}

pub fn get_fcn16s<B: Backend>(options: &ModelOptions, device: &B::Device) -> Result<FcnModel<B>> {
    get_fcn(FcnVariant::Fcn16s, options, device)
}

pub fn get_fcn8s<B: Backend>(options: &ModelOptions, device: &B::Device) -> Result<FcnModel<B>> {
    get_fcn(FcnVariant::Fcn8s, options, device)
}

fn voc_vgg16(options: &ModelOptions) -> ModelOptions {
    options
        .clone()
        .with_dataset("pascal_voc".to_string())
        .with_backbone("vgg16".to_string())
}

pub fn get_fcn32s_vgg16_voc<B: Backend>(
    options: &ModelOptions,
    device: &B::Device,
) -> Result<FcnModel<B>> {
    get_fcn32s(&voc_vgg16(options), device)
}

pub fn get_fcn16s_vgg16_voc<B: Backend>(
    options: &ModelOptions,
    device: &B::Device,
) -> Result<FcnModel<B>> {
    get_fcn16s(&voc_vgg16(options), device)
}

pub fn get_fcn8s_vgg16_voc<B: Backend>(
    options: &ModelOptions,
    device: &B::Device,
) -> Result<FcnModel<B>> {
    get_fcn8s(&voc_vgg16(options), device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FcnError;
    use burn::backend::{NdArray, ndarray::NdArrayDevice};
    use burn::tensor::{Distribution, Tensor};

    type B = NdArray<f32>;
    type FT = burn::tensor::ops::FloatElem<B>;

    fn options() -> ModelOptions {
        ModelOptions::new().with_pretrained_base(false)
    }

    #[test]
    fn factory_resolves_class_count() {
        let device = &NdArrayDevice::default();
        B::seed(11);
        let model: FcnModel<B> = get_fcn16s(&options().with_dataset("citys".into()), device).unwrap();

        let out = model.forward(Tensor::ones([1, 3, 64, 64], device)).out;

        assert_eq!(model.variant(), FcnVariant::Fcn16s);
        assert_eq!(out.dims(), [1, 19, 64, 64]);
    }

    #[test]
    fn every_factory_returns_full_resolution_scores() {
        let device = &NdArrayDevice::default();
        B::seed(12);
        let options = options();
        let builders: [fn(&ModelOptions, &NdArrayDevice) -> Result<FcnModel<B>>; 3] =
            [get_fcn32s::<B>, get_fcn16s::<B>, get_fcn8s::<B>];

        for build in builders {
            let model = build(&options, device).unwrap();
            let out = model.forward(Tensor::ones([1, 3, 64, 64], device)).out;
            assert_eq!(out.dims(), [1, 21, 64, 64]);
        }
    }

    #[test]
    fn unknown_dataset_fails_before_backbone() {
        let device = &NdArrayDevice::default();
        // an unsupported backbone would also fail, the dataset must be checked first
        let options = options()
            .with_dataset("not_a_dataset".into())
            .with_backbone("resnet999".into());

        for variant in FcnVariant::as_list() {
            let err = get_fcn::<B>(variant, &options, device).unwrap_err();
            assert!(matches!(err, FcnError::UnknownDataset(ref id) if id == "not_a_dataset"));
        }
    }

    #[test]
    fn unknown_backbone_fails() {
        let device = &NdArrayDevice::default();
        let err = get_fcn8s::<B>(&options().with_backbone("resnet999".into()), device).unwrap_err();

        assert!(matches!(err, FcnError::UnsupportedBackbone(ref name) if name == "resnet999"));
    }

    #[test]
    fn pretrained_without_weight_file_fails() {
        let device = &NdArrayDevice::default();
        let dir = tempfile::tempdir().unwrap();
        let options = options()
            .with_pretrained(true)
            .with_root(dir.path().to_str().unwrap().to_string());

        let err = get_fcn16s::<B>(&options, device).unwrap_err();

        match err {
            FcnError::WeightsNotFound { key, .. } => assert_eq!(key, "fcn16s_vgg16_pascal_voc"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn pretrained_weights_round_trip() {
        let device = &NdArrayDevice::default();
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap().to_string();
        B::seed(13);

        let trained: FcnModel<B> = get_fcn8s(&options(), device).unwrap();
        let x = Tensor::<B, 4>::random([1, 3, 64, 64], Distribution::Default, device);
        let expected = trained.forward(x.clone()).out;
        trained
            .save_weights(&dir.path().join("fcn8s_vgg16_pascal_voc.mpk"))
            .unwrap();

        B::seed(14);
        let options = options().with_pretrained(true).with_root(root);
        let loaded: FcnModel<B> = get_fcn8s_vgg16_voc(&options, device).unwrap();

        expected
            .into_data()
            .assert_approx_eq::<FT>(&loaded.forward(x).out.to_data(), burn::tensor::Tolerance::default());
    }

    #[test]
    fn pretrained_weights_for_other_class_count_are_rejected() {
        let device = &NdArrayDevice::default();
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap().to_string();

        // 21-class weights stored under the ade20k (150 classes) key
        let voc: FcnModel<B> = get_fcn32s(&options(), device).unwrap();
        voc.save_weights(&dir.path().join("fcn32s_vgg16_ade.mpk")).unwrap();

        let options = options()
            .with_dataset("ade20k".into())
            .with_pretrained(true)
            .with_root(root);
        let err = get_fcn32s::<B>(&options, device).unwrap_err();

        assert!(matches!(err, FcnError::WeightsShapeMismatch { .. }));
    }

    #[test]
    fn fcn32s_weights_do_not_load_into_skip_variants() {
        let device = &NdArrayDevice::default();
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap().to_string();
        B::seed(16);

        // a single shared key would hand FCN-32s weights to every variant
        let fcn32s: FcnModel<B> = get_fcn32s(&options(), device).unwrap();
        for key in ["fcn16s_vgg16_pascal_voc", "fcn8s_vgg16_pascal_voc"] {
            fcn32s
                .clone()
                .save_weights(&dir.path().join(format!("{key}.mpk")))
                .unwrap();
        }

        let options = options().with_pretrained(true).with_root(root);
        for variant in [FcnVariant::Fcn16s, FcnVariant::Fcn8s] {
            let err = get_fcn::<B>(variant, &options, device).unwrap_err();
            assert!(
                matches!(err, FcnError::WeightsShapeMismatch { .. }),
                "{} accepted fcn32s weights",
                variant.name()
            );
        }
    }

    #[test]
    fn voc_wrappers_override_dataset_and_backbone() {
        let device = &NdArrayDevice::default();
        B::seed(15);
        let options = options()
            .with_dataset("ade20k".into())
            .with_backbone("vgg16_bn".into());

        let model: FcnModel<B> = get_fcn32s_vgg16_voc(&options, device).unwrap();
        let out = model.forward(Tensor::ones([1, 3, 32, 32], device)).out;

        assert_eq!(out.dims(), [1, 21, 32, 32]);
    }
}
