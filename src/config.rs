use burn::config::Config;
use argh::FromArgs;

/// Directory searched for cached weight files, `~` expands to `$HOME`.
pub const DEFAULT_ROOT: &str = "~/.torch/models";
pub const DEFAULT_DATASET: &str = "pascal_voc";
pub const DEFAULT_BACKBONE: &str = "vgg16";
pub const WEIGHTS_EXTENSION: &str = "mpk";
pub const BASE_SIZE: usize = 520;
pub const CROP_SIZE: usize = 480;

/// Options accepted by the model factory.
///
/// `aux`, `base_size` and `crop_size` are forwarded untouched to the variant
/// constructor, everything else is consumed by the factory itself.
#[derive(Config, Debug)]
pub struct ModelOptions {
    #[config(default = "String::from(DEFAULT_DATASET)")]
    pub dataset: String,
    #[config(default = "String::from(DEFAULT_BACKBONE)")]
    pub backbone: String,
    /// Overwrite the whole model with weights keyed by variant, backbone and dataset.
    #[config(default = false)]
    pub pretrained: bool,
    #[config(default = "String::from(DEFAULT_ROOT)")]
    pub root: String,
    /// Start the backbone from its own pretrained weights.
    #[config(default = true)]
    pub pretrained_base: bool,
    #[config(default = false)]
    pub aux: bool,
    #[config(default = "BASE_SIZE")]
    pub base_size: usize,
    #[config(default = "CROP_SIZE")]
    pub crop_size: usize,
}

#[derive(FromArgs, PartialEq, Debug)]
/// Top-level command.
pub struct FcnCmd {
    #[argh(subcommand)]
    pub commands: Commands,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
pub enum Commands {
    Infer(SubCommandInfer),
    Summary(SubCommandSummary),
}

#[derive(FromArgs, PartialEq, Debug)]
/// Segment an image and write the per-pixel class map as a grayscale png
#[argh(subcommand, name = "infer")]
pub struct SubCommandInfer {
    #[argh(option, default = "String::from(\"fcn8s\")")]
    /// model variant, one of fcn32s, fcn16s, fcn8s
    pub variant: String,
    #[argh(option)]
    /// image path to run inference on
    pub p: String,
    #[argh(option, default = "String::from(\"./fcn_output.png\")")]
    /// output path for the class map
    pub o: String,
    #[argh(option, default = "String::from(DEFAULT_DATASET)")]
    /// dataset the weights were trained on
    pub dataset: String,
    #[argh(option, default = "String::from(DEFAULT_BACKBONE)")]
    /// backbone name
    pub backbone: String,
    #[argh(option, default = "String::from(DEFAULT_ROOT)")]
    /// directory holding the weight files
    pub root: String,
    #[argh(switch)]
    /// load whole-model pretrained weights from the root directory
    pub pretrained: bool,
}

#[derive(FromArgs, PartialEq, Debug)]
/// Build a model and report its structure and parameter count
#[argh(subcommand, name = "summary")]
pub struct SubCommandSummary {
    #[argh(option, default = "String::from(\"fcn8s\")")]
    /// model variant, one of fcn32s, fcn16s, fcn8s
    pub variant: String,
    #[argh(option, default = "String::from(DEFAULT_DATASET)")]
    /// dataset used to pick the class count
    pub dataset: String,
    #[argh(option, default = "String::from(DEFAULT_BACKBONE)")]
    /// backbone name
    pub backbone: String,
    #[argh(switch)]
    /// also build the auxiliary head
    pub aux: bool,
}
