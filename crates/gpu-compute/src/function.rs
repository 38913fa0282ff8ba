//! Shader libraries and the functions they contain.

use gpu_backend::Backend;

/// A loaded shader library.
///
/// Created with [`Compute::library_with_source`](crate::Compute::library_with_source)
/// or [`Compute::library_with_data`](crate::Compute::library_with_data).
pub struct ShaderLibrary<B: Backend + ?Sized> {
    inner: B::Library,
}

impl<B: Backend + ?Sized> ShaderLibrary<B> {
    /// Wrap a library handle obtained from the backend directly.
    pub fn from_raw(inner: B::Library) -> Self {
        Self { inner }
    }

    /// Name a function in this library.
    ///
    /// The name is only checked when a pipeline is built from it.
    pub fn function(&self, name: impl Into<String>) -> ShaderFunction<B> {
        ShaderFunction {
            library: self.inner.clone(),
            name: name.into(),
        }
    }

    pub fn raw(&self) -> &B::Library {
        &self.inner
    }
}

impl<B: Backend + ?Sized> Clone for ShaderLibrary<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// A compute function that has not been specialized yet.
pub struct ShaderFunction<B: Backend + ?Sized> {
    library: B::Library,
    name: String,
}

impl<B: Backend + ?Sized> ShaderFunction<B> {
    pub fn new(library: B::Library, name: impl Into<String>) -> Self {
        Self {
            library,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn library(&self) -> &B::Library {
        &self.library
    }
}

impl<B: Backend + ?Sized> Clone for ShaderFunction<B> {
    fn clone(&self) -> Self {
        Self {
            library: self.library.clone(),
            name: self.name.clone(),
        }
    }
}

impl<B: Backend + ?Sized> std::fmt::Debug for ShaderFunction<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
