pub mod backbone;
pub mod fcn;
pub mod head;
pub mod vgg;
