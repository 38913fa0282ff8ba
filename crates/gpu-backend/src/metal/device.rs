//! Metal device wrapper.
//!
//! Holds the Metal device and one command queue. Shader libraries and
//! pipeline states are created through the [`Backend`] implementation and
//! owned by the caller.

use std::ptr::NonNull;

use objc2::rc::Retained;
use objc2::runtime::ProtocolObject;
use objc2_foundation::NSString;
use objc2_metal::{
    MTLAutoreleasedComputePipelineReflection, MTLBuffer, MTLCommandBuffer,
    MTLCommandBufferStatus, MTLCommandQueue, MTLComputePipelineState, MTLCopyAllDevices,
    MTLCreateSystemDefaultDevice, MTLDevice, MTLLibrary, MTLPipelineOption, MTLResource,
    MTLResourceOptions, MTLStorageMode, MTLTexture,
};
use tracing::{debug, error, trace, warn};

use super::encoder::{MetalComputeEncoder, MetalFunctionConstants};
use crate::backend::{Backend, CompiledPipeline, DeviceSelection};
use crate::error::ComputeError;

/// A Metal device with a single serial command queue.
pub struct MetalDevice {
    device: Retained<ProtocolObject<dyn MTLDevice>>,
    command_queue: Retained<ProtocolObject<dyn MTLCommandQueue>>,
}

/// A labelled Metal command buffer.
pub struct MetalCommandBuffer {
    pub(crate) inner: Retained<ProtocolObject<dyn MTLCommandBuffer>>,
    label: String,
}

impl MetalCommandBuffer {
    /// Borrow the underlying `MTLCommandBuffer`.
    pub fn metal_command_buffer(&self) -> &ProtocolObject<dyn MTLCommandBuffer> {
        &self.inner
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl MetalDevice {
    /// Open the system default GPU.
    pub fn new() -> Result<Self, ComputeError> {
        Self::select(&DeviceSelection::SystemDefault, None)
    }

    /// Open the device described by `selection` and create its command queue.
    pub fn select(
        selection: &DeviceSelection,
        queue_label: Option<&str>,
    ) -> Result<Self, ComputeError> {
        let device = match selection {
            DeviceSelection::SystemDefault => MTLCreateSystemDefaultDevice(),
            DeviceSelection::Index(index) => MTLCopyAllDevices().iter().nth(*index),
            DeviceSelection::Name(name) => MTLCopyAllDevices()
                .iter()
                .find(|device| device.name().to_string() == *name),
        };

        let device = device.ok_or_else(|| {
            error!("No Metal device matches {selection}");
            ComputeError::resource(format!("Metal {selection}"))
        })?;

        Self::with_device(device, queue_label)
    }

    /// Wrap an existing device, creating a command queue on it.
    pub fn with_device(
        device: Retained<ProtocolObject<dyn MTLDevice>>,
        queue_label: Option<&str>,
    ) -> Result<Self, ComputeError> {
        debug!("Metal device: {}", device.name());

        let command_queue = match device.newCommandQueue() {
            Some(q) => q,
            None => {
                error!("Failed to create Metal command queue");
                return Err(ComputeError::resource("Metal command queue"));
            }
        };

        if let Some(label) = queue_label {
            command_queue.setLabel(Some(&NSString::from_str(label)));
        }

        Ok(Self {
            device,
            command_queue,
        })
    }

    /// Borrow the underlying `MTLDevice`.
    pub fn device(&self) -> &ProtocolObject<dyn MTLDevice> {
        &self.device
    }

    /// Borrow the command queue.
    pub fn command_queue(&self) -> &ProtocolObject<dyn MTLCommandQueue> {
        &self.command_queue
    }

    /// Allocate a zero-filled buffer in shared (CPU + GPU visible) memory.
    pub fn new_buffer(
        &self,
        length: usize,
    ) -> Result<Retained<ProtocolObject<dyn MTLBuffer>>, ComputeError> {
        self.device
            .newBufferWithLength_options(length, MTLResourceOptions::StorageModeShared)
            .ok_or_else(|| ComputeError::resource(format!("Metal buffer of {length} bytes")))
    }

    /// Allocate a shared buffer initialised with a copy of `bytes`.
    pub fn new_buffer_with_bytes(
        &self,
        bytes: &[u8],
    ) -> Result<Retained<ProtocolObject<dyn MTLBuffer>>, ComputeError> {
        let length = bytes.len();
        unsafe {
            self.device.newBufferWithBytes_length_options(
                NonNull::new_unchecked(bytes.as_ptr() as *mut _),
                length,
                MTLResourceOptions::StorageModeShared,
            )
        }
        .ok_or_else(|| ComputeError::resource(format!("Metal buffer of {length} bytes")))
    }

    /// Copy the contents of a shared buffer back to the CPU.
    ///
    /// Fails with [`ComputeError::ResourceCreation`] for buffers that are not
    /// in shared storage, since those have no CPU mapping.
    ///
    /// # Safety
    ///
    /// No GPU work writing `buffer` may be in flight. Call this only after
    /// the command buffers that use it have completed.
    pub unsafe fn read_buffer(
        buffer: &ProtocolObject<dyn MTLBuffer>,
    ) -> Result<Vec<u8>, ComputeError> {
        let storage_mode = buffer.storageMode();
        if storage_mode != MTLStorageMode::Shared {
            return Err(ComputeError::resource(format!(
                "CPU view of a buffer in {storage_mode:?} storage"
            )));
        }

        let length = buffer.length();
        let contents = buffer.contents().as_ptr() as *const u8;
        Ok(std::slice::from_raw_parts(contents, length).to_vec())
    }
}

impl Backend for MetalDevice {
    type Buffer = ProtocolObject<dyn MTLBuffer>;
    type Texture = ProtocolObject<dyn MTLTexture>;
    type Library = Retained<ProtocolObject<dyn MTLLibrary>>;
    type Constants = MetalFunctionConstants;
    type PipelineState = Retained<ProtocolObject<dyn MTLComputePipelineState>>;
    type CommandBuffer = MetalCommandBuffer;
    type Encoder = MetalComputeEncoder;

    fn name(&self) -> String {
        self.device.name().to_string()
    }

    fn new_library_with_source(&self, source: &str) -> Result<Self::Library, ComputeError> {
        let source = NSString::from_str(source);
        self.device
            .newLibraryWithSource_options_error(&source, None)
            .map_err(|e| ComputeError::compilation("<source>", e))
    }

    fn new_library_with_data(&self, data: &[u8]) -> Result<Self::Library, ComputeError> {
        use dispatch2::DispatchData;

        let data = DispatchData::from_bytes(data);
        self.device
            .newLibraryWithData_error(&data)
            .map_err(|e| ComputeError::resource(format!("Metal library: {e}")))
    }

    fn new_function_constants(&self) -> Self::Constants {
        MetalFunctionConstants::new()
    }

    fn new_compute_pipeline(
        &self,
        library: &Self::Library,
        function: &str,
        constants: &Self::Constants,
    ) -> Result<CompiledPipeline<Self::PipelineState>, ComputeError> {
        let name = NSString::from_str(function);
        let compiled = library
            .newFunctionWithName_constantValues_error(&name, constants.values())
            .map_err(|e| ComputeError::compilation(function, e))?;

        let mut reflection: MTLAutoreleasedComputePipelineReflection = std::ptr::null_mut();
        let state = unsafe {
            self.device
                .newComputePipelineStateWithFunction_options_reflection_error(
                    &compiled,
                    MTLPipelineOption::BindingInfo,
                    &mut reflection,
                )
        }
        .map_err(|e| ComputeError::compilation(function, e))?;

        let mut bindings = std::collections::HashMap::new();
        match unsafe { reflection.as_ref() } {
            Some(reflection) => {
                for binding in reflection.bindings().iter() {
                    trace!(
                        "'{function}' binding '{}' at index {}",
                        binding.name(),
                        binding.index()
                    );
                    bindings.insert(binding.name().to_string(), binding.index());
                }
            }
            None => warn!(
                "'{function}' compiled without binding reflection, arguments will not be bound"
            ),
        }

        let max_total_threads_per_threadgroup = state.maxTotalThreadsPerThreadgroup();
        let thread_execution_width = state.threadExecutionWidth();
        debug!(
            "Compiled '{function}': {} bindings, max {max_total_threads_per_threadgroup} threads per threadgroup",
            bindings.len()
        );

        Ok(CompiledPipeline {
            state,
            bindings,
            max_total_threads_per_threadgroup,
            thread_execution_width,
        })
    }

    fn new_command_buffer(&self, label: &str) -> Result<Self::CommandBuffer, ComputeError> {
        let inner = self
            .command_queue
            .commandBuffer()
            .ok_or_else(|| ComputeError::resource("Metal command buffer"))?;
        inner.setLabel(Some(&NSString::from_str(label)));

        Ok(MetalCommandBuffer {
            inner,
            label: label.to_owned(),
        })
    }

    fn new_compute_encoder(
        &self,
        command_buffer: &Self::CommandBuffer,
    ) -> Result<Self::Encoder, ComputeError> {
        let inner = command_buffer
            .inner
            .computeCommandEncoder()
            .ok_or_else(|| ComputeError::resource("Metal compute encoder"))?;
        Ok(MetalComputeEncoder::new(inner))
    }

    fn commit(&self, command_buffer: &Self::CommandBuffer) {
        command_buffer.inner.commit();
    }

    fn wait_until_completed(
        &self,
        command_buffer: &Self::CommandBuffer,
    ) -> Result<(), ComputeError> {
        command_buffer.inner.waitUntilCompleted();

        if command_buffer.inner.status() == MTLCommandBufferStatus::Error {
            let message = command_buffer
                .inner
                .error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_owned());
            error!("Command buffer '{}' failed: {message}", command_buffer.label);
            return Err(ComputeError::execution(&command_buffer.label, message));
        }
        Ok(())
    }
}
