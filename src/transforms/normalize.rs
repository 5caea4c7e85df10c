use burn::{
    prelude::Backend,
    tensor::{Device, Tensor, TensorData},
};

/// Maximum pixel value for a RGB8 pixel
pub const MAX_PIXEL_VAL: f32 = 255.0;

// ImageNet mean and std values, the VGG backbones were trained with them

const MEAN: [f64; 3] = [0.485, 0.456, 0.406];
const STD: [f64; 3] = [0.229, 0.224, 0.225];

#[derive(Clone)]
pub struct ImageNormalizer<B: Backend> {
    pub mean: Tensor<B, 3>,
    pub std: Tensor<B, 3>,
}

impl<B: Backend> ImageNormalizer<B> {
    /// Creates a new normalizer.
    pub fn new(device: &Device<B>) -> Self {
        let mean = Tensor::<B, 1>::from_floats(MEAN, device).reshape([3, 1, 1]);
        let std = Tensor::<B, 1>::from_floats(STD, device).reshape([3, 1, 1]);
        Self { mean, std }
    }

    /// Normalizes a `[3, H, W]` image according to the ImageNet statistics.
    ///
    /// The input image should be in the range [0, 1].
    ///
    /// The normalization is done according to the following formula:
    /// `input = (input - mean) / std`
    pub fn normalize(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
        (input - self.mean.clone()) / self.std.clone()
    }
}

/// Converts an RGB image to a `[3, H, W]` tensor holding raw pixel values.
pub fn rgb_img_as_tensor<B: Backend>(image: &image::RgbImage, device: &B::Device) -> Tensor<B, 3> {
    let img_vec: Vec<f32> = image.as_raw().iter().map(|&p| p as f32).collect();
    Tensor::<B, 3>::from_data(
        TensorData::new(
            img_vec,
            [image.height() as usize, image.width() as usize, 3],
        )
        .convert::<B::FloatElem>(),
        device,
    )
    .permute([2, 0, 1])
}

/// Turns an RGB image into the `[1, 3, H, W]` network input: scaled to [0, 1] and
/// normalized with the ImageNet statistics.
pub fn image_to_input<B: Backend>(image: &image::RgbImage, device: &B::Device) -> Tensor<B, 4> {
    let pixels = rgb_img_as_tensor::<B>(image, device).div_scalar(MAX_PIXEL_VAL);
    ImageNormalizer::new(device).normalize(pixels).unsqueeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{NdArray, ndarray::NdArrayDevice};
    use image::{Rgb, RgbImage};

    type B = NdArray<f32>;
    type FT = burn::tensor::ops::FloatElem<B>;

    #[test]
    fn test_rgb_image_is_channel_first() {
        let device = &NdArrayDevice::default();
        let mut image = RgbImage::new(3, 2);
        image.put_pixel(2, 1, Rgb([10, 20, 30]));

        let t = rgb_img_as_tensor::<B>(&image, device);

        assert_eq!(t.dims(), [3, 2, 3]);
        Tensor::<B, 1>::from_data([10.0, 20.0, 30.0], device)
            .into_data()
            .assert_approx_eq::<FT>(
                &t.slice([0..3, 1..2, 2..3]).reshape([3]).to_data(),
                burn::tensor::Tolerance::default(),
            );
    }

    #[test]
    fn test_image_to_input_normalizes() {
        let device = &NdArrayDevice::default();
        let image = RgbImage::from_pixel(4, 4, Rgb([255, 0, 128]));

        let input = image_to_input::<B>(&image, device);

        assert_eq!(input.dims(), [1, 3, 4, 4]);
        let expected = [
            (1.0 - 0.485) / 0.229,
            (0.0 - 0.456) / 0.224,
            (128.0 / 255.0 - 0.406) / 0.225,
        ];
        Tensor::<B, 1>::from_data(expected, device)
            .into_data()
            .assert_approx_eq::<FT>(
                &input.slice([0..1, 0..3, 0..1, 0..1]).reshape([3]).to_data(),
                burn::tensor::Tolerance::default(),
            );
    }
}
