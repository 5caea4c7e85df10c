/// Points in the backbone layer sequence where an FCN taps a feature map.
///
/// The cut points are listed from the input towards the deepest layer. Each
/// backbone spec maps them to a concrete layer depth and channel count, so the
/// fusion cascade only ever refers to them by name.
///
/// “Fully Convolutional Networks for Semantic Segmentation”
/// Authors: Jonathan Long, Evan Shelhamer, Trevor Darrell
/// Link (official): https://arxiv.org/abs/1411.4038
///
/// Section 4.2 - Combining what and where
///
/// We first divide the output stride in half by predicting from a 16 pixel stride layer.
/// We add a 1 × 1 convolution layer on top of pool4 to produce additional class
/// predictions. We fuse this output with the predictions computed on top of conv7
/// (convolutionalized fc7) at stride 32 by adding a 2× upsampling layer and summing
/// both predictions.
///
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CutPoint {
    /// The raw input image, depth 0.
    Input,
    /// Output of the third pooling stage, stride 8.
    Pool3,
    /// Output of the fourth pooling stage, stride 16.
    Pool4,
    /// Output of the last layer of the backbone, stride 32.
    Pool5,
}

impl CutPoint {
    /// Downsampling factor between the input and the feature map at this cut point.
    pub fn stride(&self) -> usize {
        match self {
            CutPoint::Input => 1,
            CutPoint::Pool3 => 8,
            CutPoint::Pool4 => 16,
            CutPoint::Pool5 => 32,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CutPoint::Input => "input",
            CutPoint::Pool3 => "pool3",
            CutPoint::Pool4 => "pool4",
            CutPoint::Pool5 => "pool5",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cut_points_are_ordered_by_depth() {
        assert!(CutPoint::Input < CutPoint::Pool3);
        assert!(CutPoint::Pool3 < CutPoint::Pool4);
        assert!(CutPoint::Pool4 < CutPoint::Pool5);
    }

    #[test]
    fn test_stride_grows_with_depth() {
        let cuts = [CutPoint::Input, CutPoint::Pool3, CutPoint::Pool4, CutPoint::Pool5];
        let strides: Vec<usize> = cuts.iter().map(|c| c.stride()).collect();
        assert_eq!(strides, vec![1, 8, 16, 32]);
    }
}
