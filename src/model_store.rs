use std::path::{Path, PathBuf};

use burn::{
    module::Module,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
    tensor::backend::Backend,
};
use log::{debug, info};

use crate::config::WEIGHTS_EXTENSION;
use crate::error::{FcnError, Result};

/// Expands a leading `~` in `root` to the user's home directory.
pub fn expand_root(root: &str) -> PathBuf {
    match root.strip_prefix('~') {
        Some(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest.trim_start_matches('/')),
            None => PathBuf::from(root),
        },
        None => PathBuf::from(root),
    }
}

/// Resolves the weight file stored under `key` in `root`.
///
/// Weight files are named `<key>.mpk` and hold a burn named message-pack record. The store
/// never downloads anything: a missing file is reported as [`FcnError::WeightsNotFound`].
///
pub fn get_model_file(key: &str, root: &str) -> Result<PathBuf> {
    let path = expand_root(root).join(format!("{key}.{WEIGHTS_EXTENSION}"));

    if path.is_file() {
        debug!("resolved weights `{}` to {}", key, path.display());
        Ok(path)
    } else {
        Err(FcnError::WeightsNotFound {
            key: key.to_string(),
            path,
        })
    }
}

/// Overwrites every parameter of `module` with the record stored at `path`.
///
/// The record has to describe the same module tree with the same parameter shapes. A record
/// that cannot be decoded into the module, or that changes its parameter count (a head built
/// for a different number of classes, for instance), fails with
/// [`FcnError::WeightsShapeMismatch`].
///
pub fn load_weights<B: Backend, M: Module<B>>(
    module: M,
    path: &Path,
    device: &B::Device,
) -> Result<M> {
    let expected = module.num_params();

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let module = module
        .load_file(path.to_path_buf(), &recorder, device)
        .map_err(|err| FcnError::WeightsShapeMismatch {
            path: path.to_path_buf(),
            reason: format!("{err:?}"),
        })?;

    let found = module.num_params();

    if found != expected {
        return Err(FcnError::WeightsShapeMismatch {
            path: path.to_path_buf(),
            reason: format!("expected {expected} parameters, record holds {found}"),
        });
    }

    info!("loaded {} parameters from {}", found, path.display());
    Ok(module)
}

/// Writes every parameter of `module` to `path` in the format read by [`load_weights`].
pub fn save_weights<B: Backend, M: Module<B>>(module: M, path: &Path) -> Result<()> {
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    module
        .save_file(path.to_path_buf(), &recorder)
        .map_err(|err| FcnError::WeightsShapeMismatch {
            path: path.to_path_buf(),
            reason: format!("{err:?}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{NdArray, ndarray::NdArrayDevice};
    use burn::nn::conv::{Conv2d, Conv2dConfig};
    use burn::tensor::Tensor;

    type B = NdArray<f32>;
    type FT = burn::tensor::ops::FloatElem<B>;

    #[test]
    fn test_expand_root_without_tilde() {
        assert_eq!(expand_root("/tmp/models"), PathBuf::from("/tmp/models"));
    }

    #[test]
    fn test_expand_root_with_tilde() {
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(
                expand_root("~/.torch/models"),
                PathBuf::from(home).join(".torch/models")
            );
        }
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = get_model_file("fcn8s_vgg16_pascal_voc", dir.path().to_str().unwrap())
            .unwrap_err();

        match err {
            FcnError::WeightsNotFound { key, path } => {
                assert_eq!(key, "fcn8s_vgg16_pascal_voc");
                assert!(path.ends_with("fcn8s_vgg16_pascal_voc.mpk"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_save_resolve_and_load_round_trip() {
        let device = &NdArrayDevice::default();
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();

        let saved: Conv2d<B> = Conv2dConfig::new([4, 2], [1, 1]).init(device);
        let input = Tensor::<B, 4>::ones([1, 4, 3, 3], device);
        let expected = saved.forward(input.clone());

        save_weights(saved, &dir.path().join("proj.mpk")).unwrap();
        let path = get_model_file("proj", root).unwrap();

        let fresh: Conv2d<B> = Conv2dConfig::new([4, 2], [1, 1]).init(device);
        let loaded = load_weights(fresh, &path, device).unwrap();

        expected
            .into_data()
            .assert_approx_eq::<FT>(&loaded.forward(input).to_data(), burn::tensor::Tolerance::default());
    }

    #[test]
    fn test_load_with_different_channels_fails() {
        let device = &NdArrayDevice::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proj.mpk");

        let saved: Conv2d<B> = Conv2dConfig::new([4, 2], [1, 1]).init(device);
        save_weights(saved, &path).unwrap();

        let other: Conv2d<B> = Conv2dConfig::new([4, 5], [1, 1]).init(device);
        let err = load_weights(other, &path, device).unwrap_err();

        assert!(matches!(err, FcnError::WeightsShapeMismatch { .. }));
    }
}
