//! Run GPU compute kernels with named arguments and compile-time constants.
//!
//! # Overview
//!
//! - [`Compute`] owns a device and its command queue.
//! - [`ShaderLibrary`] / [`ShaderFunction`] name a kernel in compiled shader
//!   code.
//! - [`Pipeline`] is a kernel specialized with function constants, plus the
//!   named [`Arguments`] bound on every dispatch.
//! - [`Task`] records one or more dispatches into a single command buffer;
//!   [`Compute::task`] commits it and waits for the GPU before returning.
//!
//! ```ignore
//! let compute = Compute::system_default()?;
//! let library = compute.library_with_source(SOURCE)?;
//! let mut pipeline = compute.make_pipeline(
//!     library.function("mandelbrot"),
//!     [("max_iterations", Argument::from(1024_u32))],
//!     [("output", Argument::texture(&texture))].into_iter().collect(),
//! )?;
//! pipeline.set_argument("x_min", Some((-2.0_f32).into()));
//! compute.run_default(&pipeline, (width, height))?;
//! ```

pub mod argument;
pub mod arguments;
pub mod bytes;
pub mod compute;
pub mod config;
pub mod function;
pub mod logging;
pub mod pipeline;
pub mod task;

#[cfg(test)]
mod testing;

pub use argument::{Argument, ArgumentKind, Integer};
pub use arguments::Arguments;
pub use bytes::{slice_as_bytes, AsBytes};
pub use compute::Compute;
pub use config::ComputeConfig;
pub use function::{ShaderFunction, ShaderLibrary};
pub use logging::{init_logging, tracing_sink, LogSink};
pub use pipeline::Pipeline;
pub use task::Task;

pub use gpu_backend::{Backend, ComputeError, DeviceSelection, Extent3};

#[cfg(target_os = "macos")]
pub use gpu_backend::metal;
