//! Metal backend (macOS).

pub mod device;
pub mod encoder;

pub use device::{MetalCommandBuffer, MetalDevice};
pub use encoder::{MetalComputeEncoder, MetalFunctionConstants};
