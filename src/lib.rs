pub mod config;
pub mod dataset;
pub mod error;
pub mod factory;
pub mod inference;
pub mod layers;
pub mod model_store;
pub mod models;
pub mod transforms;

pub use error::{FcnError, Result};
pub use factory::{
    get_fcn, get_fcn8s, get_fcn8s_vgg16_voc, get_fcn16s, get_fcn16s_vgg16_voc, get_fcn32s,
    get_fcn32s_vgg16_voc,
};
pub use models::fcn::{FcnConfig, FcnModel, FcnOutput, FcnVariant};
