//! Safe byte-slice conversion for GPU argument data.

/// View a plain value as the bytes the GPU reads.
///
/// # Safety
///
/// Only implement on scalars and `#[repr(C)]` structs whose fields are all
/// plain numeric types (f32, i32, u32, etc.) with no pointers, references,
/// or padding-dependent invariants.
///
/// # Example
///
/// ```rust,ignore
/// #[repr(C)]
/// struct Viewport {
///     x_min: f32,
///     x_max: f32,
/// }
///
/// unsafe impl AsBytes for Viewport {}
///
/// let buffer = device.new_buffer_with_bytes(viewport.as_bytes())?;
/// ```
pub unsafe trait AsBytes: Sized {
    /// View `self` as a byte slice. The returned slice has length
    /// `std::mem::size_of::<Self>()`.
    fn as_bytes(&self) -> &[u8] {
        unsafe {
            std::slice::from_raw_parts(self as *const Self as *const u8, std::mem::size_of::<Self>())
        }
    }
}

unsafe impl AsBytes for i8 {}
unsafe impl AsBytes for i16 {}
unsafe impl AsBytes for i32 {}
unsafe impl AsBytes for u8 {}
unsafe impl AsBytes for u16 {}
unsafe impl AsBytes for u32 {}
unsafe impl AsBytes for f32 {}
unsafe impl AsBytes for bool {}
unsafe impl<T: AsBytes, const N: usize> AsBytes for [T; N] {}

/// View a slice of plain values as bytes.
pub fn slice_as_bytes<T: AsBytes>(values: &[T]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(values.as_ptr() as *const u8, std::mem::size_of_val(values)) }
}
