use burn::module::Module;
use log::{error, info};
use rust_fcn::{
    config::{Commands, FcnCmd, ModelOptions},
    factory::get_fcn,
    inference,
    models::fcn::FcnVariant,
};

#[cfg(feature = "tch")]
type InferBackend = burn::backend::LibTorch;
#[cfg(not(feature = "tch"))]
type InferBackend = burn::backend::NdArray<f32>;

fn device() -> <InferBackend as burn::tensor::backend::Backend>::Device {
    #[cfg(feature = "tch")]
    {
        burn::backend::libtorch::LibTorchDevice::Cuda(0)
    }
    #[cfg(not(feature = "tch"))]
    {
        burn::backend::ndarray::NdArrayDevice::default()
    }
}

fn run(cli_cmd: FcnCmd) -> rust_fcn::Result<()> {
    let device = device();

    match cli_cmd.commands {
        Commands::Infer(sub_command_infer) => {
            let variant: FcnVariant = sub_command_infer.variant.parse()?;
            let options = ModelOptions::new()
                .with_dataset(sub_command_infer.dataset)
                .with_backbone(sub_command_infer.backbone)
                .with_root(sub_command_infer.root)
                .with_pretrained(sub_command_infer.pretrained)
                .with_pretrained_base(!sub_command_infer.pretrained);

            inference::infer::<InferBackend>(
                &sub_command_infer.p,
                &sub_command_infer.o,
                variant,
                &options,
                &device,
            )
        }
        Commands::Summary(sub_command_summary) => {
            let variant: FcnVariant = sub_command_summary.variant.parse()?;
            let options = ModelOptions::new()
                .with_dataset(sub_command_summary.dataset)
                .with_backbone(sub_command_summary.backbone)
                .with_aux(sub_command_summary.aux)
                .with_pretrained_base(false);

            let model = get_fcn::<InferBackend>(variant, &options, &device)?;
            info!("{}", model);
            info!("{} parameters", model.num_params());
            Ok(())
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli_cmd: FcnCmd = argh::from_env();

    if let Err(err) = run(cli_cmd) {
        error!("{err}");
        std::process::exit(1);
    }
}
