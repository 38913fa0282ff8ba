//! Metal compute encoder and function constant table.

use std::ffi::c_void;
use std::ptr::NonNull;

use objc2::rc::Retained;
use objc2::runtime::ProtocolObject;
use objc2_foundation::NSString;
use objc2_metal::{
    MTLBuffer, MTLCommandEncoder, MTLComputeCommandEncoder, MTLComputePipelineState,
    MTLDataType, MTLFunctionConstantValues, MTLSize, MTLTexture,
};

use super::device::MetalDevice;
use crate::backend::{ComputeEncoder, ConstantType, Extent3, FunctionConstants};

fn mtl_size(extent: Extent3) -> MTLSize {
    MTLSize {
        width: extent.width,
        height: extent.height,
        depth: extent.depth,
    }
}

fn mtl_data_type(ty: ConstantType) -> MTLDataType {
    match ty {
        ConstantType::Char => MTLDataType::Char,
        ConstantType::Short => MTLDataType::Short,
        ConstantType::Int => MTLDataType::Int,
        ConstantType::UChar => MTLDataType::UChar,
        ConstantType::UShort => MTLDataType::UShort,
        ConstantType::UInt => MTLDataType::UInt,
        ConstantType::Float => MTLDataType::Float,
        ConstantType::Bool => MTLDataType::Bool,
    }
}

/// Wraps `MTLFunctionConstantValues`.
pub struct MetalFunctionConstants {
    values: Retained<MTLFunctionConstantValues>,
}

impl MetalFunctionConstants {
    pub fn new() -> Self {
        Self {
            values: MTLFunctionConstantValues::new(),
        }
    }

    pub fn values(&self) -> &MTLFunctionConstantValues {
        &self.values
    }
}

impl Default for MetalFunctionConstants {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionConstants for MetalFunctionConstants {
    fn set_constant_value(&mut self, bytes: &[u8], ty: ConstantType, name: &str) {
        debug_assert_eq!(bytes.len(), ty.size());
        // Metal copies the value, `bytes` only needs to outlive the call.
        unsafe {
            self.values.setConstantValue_type_withName(
                NonNull::new_unchecked(bytes.as_ptr() as *mut c_void),
                mtl_data_type(ty),
                &NSString::from_str(name),
            );
        }
    }
}

/// Wraps an open `MTLComputeCommandEncoder`.
pub struct MetalComputeEncoder {
    inner: Retained<ProtocolObject<dyn MTLComputeCommandEncoder>>,
}

impl MetalComputeEncoder {
    pub(crate) fn new(inner: Retained<ProtocolObject<dyn MTLComputeCommandEncoder>>) -> Self {
        Self { inner }
    }

    /// Borrow the underlying `MTLComputeCommandEncoder`.
    pub fn metal_encoder(&self) -> &ProtocolObject<dyn MTLComputeCommandEncoder> {
        &self.inner
    }
}

impl ComputeEncoder<MetalDevice> for MetalComputeEncoder {
    fn set_compute_pipeline_state(
        &mut self,
        state: &Retained<ProtocolObject<dyn MTLComputePipelineState>>,
    ) {
        self.inner.setComputePipelineState(state);
    }

    fn set_bytes(&mut self, bytes: &[u8], index: usize) {
        unsafe {
            self.inner.setBytes_length_atIndex(
                NonNull::new_unchecked(bytes.as_ptr() as *mut _),
                bytes.len(),
                index,
            );
        }
    }

    fn set_buffer(&mut self, buffer: &ProtocolObject<dyn MTLBuffer>, offset: usize, index: usize) {
        unsafe {
            self.inner
                .setBuffer_offset_atIndex(Some(buffer), offset, index);
        }
    }

    fn set_texture(&mut self, texture: &ProtocolObject<dyn MTLTexture>, index: usize) {
        unsafe {
            self.inner.setTexture_atIndex(Some(texture), index);
        }
    }

    fn dispatch_threads(&mut self, threads: Extent3, threads_per_threadgroup: Extent3) {
        self.inner.dispatchThreads_threadsPerThreadgroup(
            mtl_size(threads),
            mtl_size(threads_per_threadgroup),
        );
    }

    fn end_encoding(&mut self) {
        self.inner.endEncoding();
    }
}
