//! GPU device and command primitives for compute dispatch.
//!
//! This crate defines the [`Backend`] trait, the narrow interface the
//! compute layer needs from a GPU API: library loading, function
//! specialization, pipeline creation, command buffers, compute encoders,
//! submission and blocking completion. On macOS it is implemented for Metal
//! by [`metal::MetalDevice`].

pub mod backend;
pub mod error;

pub use backend::{
    Backend, CompiledPipeline, ComputeEncoder, ConstantType, DeviceSelection, Extent3,
    FunctionConstants,
};
pub use error::ComputeError;

// Platform-specific implementations.

#[cfg(target_os = "macos")]
pub mod metal;
