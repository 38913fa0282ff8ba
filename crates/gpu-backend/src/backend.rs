//! Common interface for GPU compute backends.

use std::collections::HashMap;

use crate::error::ComputeError;

/// A 3-D extent, used for thread grids and threadgroups.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Extent3 {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl Extent3 {
    pub const fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// A 1-D extent (`height` and `depth` are 1).
    pub const fn linear(width: usize) -> Self {
        Self::new(width, 1, 1)
    }

    /// A 2-D extent (`depth` is 1).
    pub const fn planar(width: usize, height: usize) -> Self {
        Self::new(width, height, 1)
    }

    /// Total number of elements covered by this extent.
    pub const fn volume(&self) -> usize {
        self.width * self.height * self.depth
    }
}

impl From<(usize, usize, usize)> for Extent3 {
    fn from((width, height, depth): (usize, usize, usize)) -> Self {
        Self::new(width, height, depth)
    }
}

impl From<(usize, usize)> for Extent3 {
    fn from((width, height): (usize, usize)) -> Self {
        Self::planar(width, height)
    }
}

impl From<usize> for Extent3 {
    fn from(width: usize) -> Self {
        Self::linear(width)
    }
}

/// Which physical device a backend should open.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DeviceSelection {
    /// The system default GPU.
    #[default]
    SystemDefault,
    /// The device at this position in the system's device list.
    Index(usize),
    /// The first device whose name matches exactly.
    Name(String),
}

impl std::fmt::Display for DeviceSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceSelection::SystemDefault => f.write_str("system default device"),
            DeviceSelection::Index(index) => write!(f, "device #{index}"),
            DeviceSelection::Name(name) => write!(f, "device '{name}'"),
        }
    }
}

/// Data type of a function constant value.
///
/// Mirrors the scalar subset of `MTLDataType` that can be baked into a
/// specialized function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConstantType {
    Char,
    Short,
    Int,
    UChar,
    UShort,
    UInt,
    Float,
    Bool,
}

impl ConstantType {
    /// Size in bytes of a value of this type.
    pub const fn size(self) -> usize {
        match self {
            ConstantType::Char | ConstantType::UChar | ConstantType::Bool => 1,
            ConstantType::Short | ConstantType::UShort => 2,
            ConstantType::Int | ConstantType::UInt | ConstantType::Float => 4,
        }
    }
}

/// Result of compiling a compute function into an executable pipeline state.
pub struct CompiledPipeline<S> {
    /// The device-resident pipeline state.
    pub state: S,
    /// Declared parameter name to binding slot, as reported by the compiler.
    pub bindings: HashMap<String, usize>,
    /// Hardware limit on threads in one threadgroup for this pipeline.
    pub max_total_threads_per_threadgroup: usize,
    /// SIMD width the pipeline executes with.
    pub thread_execution_width: usize,
}

/// A table of named function constants used to specialize a function at
/// pipeline compile time.
pub trait FunctionConstants {
    /// Store `bytes`, interpreted as `ty`, under `name`.
    ///
    /// `bytes.len()` must equal `ty.size()`.
    fn set_constant_value(&mut self, bytes: &[u8], ty: ConstantType, name: &str);
}

/// A recording context for one compute pass.
///
/// Created by [`Backend::new_compute_encoder`]. Encoding is finished with
/// [`end_encoding`](ComputeEncoder::end_encoding); the command buffer must
/// not be committed while an encoder is still open.
pub trait ComputeEncoder<B: Backend + ?Sized> {
    /// Bind the compiled pipeline for subsequent dispatches.
    fn set_compute_pipeline_state(&mut self, state: &B::PipelineState);

    /// Copy `bytes` inline into the argument table at `index`.
    fn set_bytes(&mut self, bytes: &[u8], index: usize);

    /// Bind `buffer` starting at `offset` bytes at `index`.
    fn set_buffer(&mut self, buffer: &B::Buffer, offset: usize, index: usize);

    /// Bind `texture` at `index`.
    fn set_texture(&mut self, texture: &B::Texture, index: usize);

    /// Dispatch `threads` total threads split into `threads_per_threadgroup`.
    fn dispatch_threads(&mut self, threads: Extent3, threads_per_threadgroup: Extent3);

    /// Close the encoder.
    fn end_encoding(&mut self);
}

/// A GPU device paired with one serial command queue.
///
/// This is the narrow contract the compute layer is built on: shader library
/// loading, function specialization, pipeline creation, command buffer
/// creation, submission and blocking completion.
pub trait Backend {
    /// Buffer resource, referenced (never owned) by dispatch arguments.
    type Buffer: ?Sized;
    /// Texture resource, referenced (never owned) by dispatch arguments.
    type Texture: ?Sized;
    /// A loaded shader library.
    type Library: Clone;
    /// Function constant table.
    type Constants: FunctionConstants;
    /// Compiled compute pipeline state.
    type PipelineState;
    /// A command buffer bound to this backend's queue.
    type CommandBuffer;
    /// A compute pass encoder.
    type Encoder: ComputeEncoder<Self>;

    /// Human-readable device name.
    fn name(&self) -> String;

    /// Compile a library from shader source.
    fn new_library_with_source(&self, source: &str) -> Result<Self::Library, ComputeError>;

    /// Load a precompiled library.
    fn new_library_with_data(&self, data: &[u8]) -> Result<Self::Library, ComputeError>;

    /// Create an empty function constant table.
    fn new_function_constants(&self) -> Self::Constants;

    /// Specialize `function` from `library` with `constants` and build a
    /// compute pipeline state from it.
    fn new_compute_pipeline(
        &self,
        library: &Self::Library,
        function: &str,
        constants: &Self::Constants,
    ) -> Result<CompiledPipeline<Self::PipelineState>, ComputeError>;

    /// Create a command buffer on the queue.
    fn new_command_buffer(&self, label: &str) -> Result<Self::CommandBuffer, ComputeError>;

    /// Open a compute pass on `command_buffer`.
    fn new_compute_encoder(
        &self,
        command_buffer: &Self::CommandBuffer,
    ) -> Result<Self::Encoder, ComputeError>;

    /// Submit `command_buffer` for execution.
    fn commit(&self, command_buffer: &Self::CommandBuffer);

    /// Block until `command_buffer` completes. Returns an error if execution
    /// failed on the device.
    fn wait_until_completed(&self, command_buffer: &Self::CommandBuffer)
        -> Result<(), ComputeError>;
}
