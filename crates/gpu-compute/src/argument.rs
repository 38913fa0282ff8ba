//! A single bindable value for a compute function.
//!
//! An [`Argument`] can be placed into either of the two binding contexts a
//! Metal-style API offers:
//!
//! - a numbered slot of a compute encoder, at dispatch time
//!   ([`Argument::encode`]), or
//! - a named function constant, at pipeline compile time
//!   ([`Argument::as_compile_constant`]).
//!
//! Scalars support both. Buffers and textures only exist at dispatch time.

use std::fmt;

use gpu_backend::{Backend, ComputeEncoder, ConstantType, FunctionConstants};

use crate::bytes::AsBytes;

/// An integer argument, tagged with its width and signedness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Integer {
    I8(i8),
    I16(i16),
    I32(i32),
    U8(u8),
    U16(u16),
    U32(u32),
}

impl Integer {
    /// Width in bits.
    pub const fn width(&self) -> u32 {
        match self {
            Integer::I8(_) | Integer::U8(_) => 8,
            Integer::I16(_) | Integer::U16(_) => 16,
            Integer::I32(_) | Integer::U32(_) => 32,
        }
    }

    pub const fn is_signed(&self) -> bool {
        matches!(self, Integer::I8(_) | Integer::I16(_) | Integer::I32(_))
    }

    /// The function constant type with the same width and signedness.
    pub const fn constant_type(&self) -> ConstantType {
        match self {
            Integer::I8(_) => ConstantType::Char,
            Integer::I16(_) => ConstantType::Short,
            Integer::I32(_) => ConstantType::Int,
            Integer::U8(_) => ConstantType::UChar,
            Integer::U16(_) => ConstantType::UShort,
            Integer::U32(_) => ConstantType::UInt,
        }
    }

    /// Native-endian bytes of the value, exactly `width() / 8` long.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Integer::I8(v) => v.as_bytes(),
            Integer::I16(v) => v.as_bytes(),
            Integer::I32(v) => v.as_bytes(),
            Integer::U8(v) => v.as_bytes(),
            Integer::U16(v) => v.as_bytes(),
            Integer::U32(v) => v.as_bytes(),
        }
    }
}

/// The variant of an [`Argument`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArgumentKind {
    Int,
    Float,
    Bool,
    Buffer,
    Texture,
}

impl fmt::Display for ArgumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgumentKind::Int => "integer",
            ArgumentKind::Float => "float",
            ArgumentKind::Bool => "bool",
            ArgumentKind::Buffer => "buffer",
            ArgumentKind::Texture => "texture",
        };
        f.write_str(name)
    }
}

/// A value bound to a compute function parameter or function constant.
///
/// Buffer and texture variants borrow caller-owned GPU resources; the
/// argument never extends their lifetime.
pub enum Argument<'a, B: Backend + ?Sized> {
    Int(Integer),
    Float(f32),
    Bool(bool),
    Buffer { buffer: &'a B::Buffer, offset: usize },
    Texture(&'a B::Texture),
}

impl<'a, B: Backend + ?Sized> Argument<'a, B> {
    /// Bind `buffer` from its first byte.
    pub fn buffer(buffer: &'a B::Buffer) -> Self {
        Argument::Buffer { buffer, offset: 0 }
    }

    /// Bind `buffer` starting `offset` bytes in.
    pub fn buffer_with_offset(buffer: &'a B::Buffer, offset: usize) -> Self {
        Argument::Buffer { buffer, offset }
    }

    pub fn texture(texture: &'a B::Texture) -> Self {
        Argument::Texture(texture)
    }

    pub fn kind(&self) -> ArgumentKind {
        match self {
            Argument::Int(_) => ArgumentKind::Int,
            Argument::Float(_) => ArgumentKind::Float,
            Argument::Bool(_) => ArgumentKind::Bool,
            Argument::Buffer { .. } => ArgumentKind::Buffer,
            Argument::Texture(_) => ArgumentKind::Texture,
        }
    }

    /// Whether this argument refers to a GPU resource rather than a scalar.
    pub fn is_resource(&self) -> bool {
        matches!(self, Argument::Buffer { .. } | Argument::Texture(_))
    }

    /// Write this argument into binding slot `index` of `encoder`.
    ///
    /// Scalars are copied inline and must be encoded again for every
    /// dispatch. Buffers and textures are bound by reference.
    pub fn encode<E>(&self, encoder: &mut E, index: usize)
    where
        E: ComputeEncoder<B> + ?Sized,
    {
        match self {
            Argument::Int(value) => encoder.set_bytes(value.as_bytes(), index),
            Argument::Float(value) => encoder.set_bytes(value.as_bytes(), index),
            Argument::Bool(value) => encoder.set_bytes(value.as_bytes(), index),
            Argument::Buffer { buffer, offset } => encoder.set_buffer(buffer, *offset, index),
            Argument::Texture(texture) => encoder.set_texture(texture, index),
        }
    }

    /// Write this argument into the function constant `name`.
    ///
    /// # Panics
    ///
    /// Buffers and textures cannot be baked into a compiled function. Passing
    /// one here is a programming error and panics.
    pub fn as_compile_constant<C>(&self, constants: &mut C, name: &str)
    where
        C: FunctionConstants + ?Sized,
    {
        match self {
            Argument::Int(value) => {
                constants.set_constant_value(value.as_bytes(), value.constant_type(), name)
            }
            Argument::Float(value) => {
                constants.set_constant_value(value.as_bytes(), ConstantType::Float, name)
            }
            Argument::Bool(value) => {
                constants.set_constant_value(value.as_bytes(), ConstantType::Bool, name)
            }
            Argument::Buffer { .. } | Argument::Texture(_) => panic!(
                "Function constant '{name}' cannot be a {}: only integers, floats and bools can be compile-time constants",
                self.kind()
            ),
        }
    }
}

impl<B: Backend + ?Sized> Clone for Argument<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: Backend + ?Sized> Copy for Argument<'_, B> {}

impl<B: Backend + ?Sized> fmt::Debug for Argument<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Int(value) => f.debug_tuple("Int").field(value).finish(),
            Argument::Float(value) => f.debug_tuple("Float").field(value).finish(),
            Argument::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            Argument::Buffer { offset, .. } => {
                f.debug_struct("Buffer").field("offset", offset).finish_non_exhaustive()
            }
            Argument::Texture(_) => f.write_str("Texture(..)"),
        }
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Integer {
                fn from(value: $ty) -> Self {
                    Integer::$variant(value)
                }
            }

            impl<B: Backend + ?Sized> From<$ty> for Argument<'_, B> {
                fn from(value: $ty) -> Self {
                    Argument::Int(Integer::$variant(value))
                }
            }
        )*
    };
}

impl_from_integer! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    u8 => U8,
    u16 => U16,
    u32 => U32,
}

impl<B: Backend + ?Sized> From<Integer> for Argument<'_, B> {
    fn from(value: Integer) -> Self {
        Argument::Int(value)
    }
}

impl<B: Backend + ?Sized> From<f32> for Argument<'_, B> {
    fn from(value: f32) -> Self {
        Argument::Float(value)
    }
}

impl<B: Backend + ?Sized> From<bool> for Argument<'_, B> {
    fn from(value: bool) -> Self {
        Argument::Bool(value)
    }
}
