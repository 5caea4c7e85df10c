use burn::tensor::{Int, Tensor, backend::Backend};
use image::GrayImage;
use log::info;

use crate::{
    config::ModelOptions,
    error::{FcnError, Result},
    layers::CutPoint,
    factory::get_fcn,
    models::fcn::{FcnModel, FcnVariant},
    transforms::normalize::image_to_input,
};

/// Reduces a `[N, num_classes, H, W]` score map to the `[N, H, W]` index of the best class.
pub fn class_map<B: Backend>(scores: Tensor<B, 4>) -> Tensor<B, 3, Int> {
    scores.argmax(1).squeeze(1)
}

/// Renders the first class map of a batch as a grayscale image, one gray level per class.
pub fn class_map_to_image<B: Backend>(classes: Tensor<B, 3, Int>) -> GrayImage {
    let [_, height, width] = classes.dims();
    let pixels: Vec<u8> = classes
        .slice([0..1, 0..height, 0..width])
        .into_data()
        .iter::<i64>()
        .map(|c| c.clamp(0, u8::MAX as i64) as u8)
        .collect();

    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        image::Luma([pixels[y as usize * width + x as usize]])
    })
}

/// Segments a single image with an already built model.
///
/// Both sides of the image have to span at least one pool5 cell, smaller images fail with
/// [`FcnError::InputTooSmall`].
pub fn segment<B: Backend>(
    model: &FcnModel<B>,
    image: &image::RgbImage,
    device: &B::Device,
) -> Result<GrayImage> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let min = CutPoint::Pool5.stride();
    if width < min || height < min {
        return Err(FcnError::InputTooSmall { height, width, min });
    }

    let input = image_to_input::<B>(image, device);
    let scores = model.forward(input).out;

    Ok(class_map_to_image(class_map(scores)))
}

/// Runs a segmentation model on the image at `image_path` and writes its class map to
/// `output_path`.
///
/// # Parameters
/// - `variant`: Which FCN decoder to build.
/// - `options`: Factory options; set `pretrained` to load trained weights from `root`.
/// - `device`: Computational device (CPU or GPU) where inference should run.
///
/// # Output
/// - A grayscale png where each pixel value is the predicted class index.
///
pub fn infer<B: Backend>(
    image_path: &str,
    output_path: &str,
    variant: FcnVariant,
    options: &ModelOptions,
    device: &B::Device,
) -> Result<()> {
    let image = image::open(image_path)?.to_rgb8();
    let model: FcnModel<B> = get_fcn(variant, options, device)?;

    info!(
        "segmenting {} ({}x{}) with {}",
        image_path,
        image.width(),
        image.height(),
        variant.name()
    );

    segment(&model, &image, device)?.save(output_path)?;
    info!("class map written to {}", output_path);

    Ok(())
}
