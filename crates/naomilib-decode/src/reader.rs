//! Bounds-checked little-endian reads.
//!
//! Fixed-layout records are described as tables of [`Field`]s: a byte offset
//! plus a [`Primitive`] read operation. [`read`] interprets one field against
//! a buffer. Every read is checked; nothing in this crate indexes a buffer
//! without going through these helpers or an explicit length check.

use crate::error::{DecodeError, DecodeResult};

/// Primitive read operations used by record layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    U8,
    U16,
    U32,
    I32,
    F32,
    /// Two consecutive `F32`s.
    Vec2,
    /// Three consecutive `F32`s.
    Vec3,
}

impl Primitive {
    /// Width of the primitive in bytes.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::Vec2 => 8,
            Self::Vec3 => 12,
        }
    }
}

/// A value produced by [`read`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    I32(i32),
    F32(f32),
    Vec2(glam::Vec2),
    Vec3(glam::Vec3),
}

impl Value {
    /// The value widened to `u32`. Floats are reinterpreted bit-for-bit;
    /// vectors yield their first component.
    #[must_use]
    pub fn as_u32(self) -> u32 {
        match self {
            Self::U8(v) => u32::from(v),
            Self::U16(v) => u32::from(v),
            Self::U32(v) => v,
            Self::I32(v) => v as u32,
            Self::F32(v) => v.to_bits(),
            Self::Vec2(v) => v.x.to_bits(),
            Self::Vec3(v) => v.x.to_bits(),
        }
    }

    /// The value as `i32`. Unsigned integers are reinterpreted.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            Self::I32(v) => v,
            other => other.as_u32() as i32,
        }
    }

    /// The value as `f32`. Integers are converted numerically.
    #[must_use]
    pub fn as_f32(self) -> f32 {
        match self {
            Self::U8(v) => f32::from(v),
            Self::U16(v) => f32::from(v),
            Self::U32(v) => v as f32,
            Self::I32(v) => v as f32,
            Self::F32(v) => v,
            Self::Vec2(v) => v.x,
            Self::Vec3(v) => v.x,
        }
    }

    /// The value as a 2-vector. Scalars are splatted.
    #[must_use]
    pub fn as_vec2(self) -> glam::Vec2 {
        match self {
            Self::Vec2(v) => v,
            Self::Vec3(v) => v.truncate(),
            other => glam::Vec2::splat(other.as_f32()),
        }
    }

    /// The value as a 3-vector. Scalars are splatted.
    #[must_use]
    pub fn as_vec3(self) -> glam::Vec3 {
        match self {
            Self::Vec3(v) => v,
            Self::Vec2(v) => v.extend(0.0),
            other => glam::Vec3::splat(other.as_f32()),
        }
    }
}

/// One field of a fixed-layout record.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub offset: usize,
    pub op: Primitive,
}

impl Field {
    #[must_use]
    pub const fn new(offset: usize, op: Primitive) -> Self {
        Self { offset, op }
    }

    /// Read this field from the record starting at `base`.
    pub fn read(&self, buf: &[u8], base: usize) -> DecodeResult<Value> {
        read(buf, base + self.offset, self.op)
    }
}

/// Interpret a single primitive read at `offset`.
pub fn read(buf: &[u8], offset: usize, op: Primitive) -> DecodeResult<Value> {
    let bytes = slice(buf, offset, op.width())?;
    Ok(match op {
        Primitive::U8 => Value::U8(bytes[0]),
        Primitive::U16 => Value::U16(u16::from_le_bytes([bytes[0], bytes[1]])),
        Primitive::U32 => Value::U32(u32::from_le_bytes(word(bytes))),
        Primitive::I32 => Value::I32(i32::from_le_bytes(word(bytes))),
        Primitive::F32 => Value::F32(f32::from_le_bytes(word(bytes))),
        Primitive::Vec2 => Value::Vec2(glam::Vec2::new(float(bytes, 0), float(bytes, 1))),
        Primitive::Vec3 => Value::Vec3(glam::Vec3::new(
            float(bytes, 0),
            float(bytes, 1),
            float(bytes, 2),
        )),
    })
}

/// Borrow `len` bytes at `offset`, or report how far out of range they are.
pub fn slice(buf: &[u8], offset: usize, len: usize) -> DecodeResult<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| buf.get(offset..end))
        .ok_or(DecodeError::OutOfBounds {
            offset,
            len,
            buffer_len: buf.len(),
        })
}

/// Mutably borrow `len` bytes at `offset`.
pub fn slice_mut(buf: &mut [u8], offset: usize, len: usize) -> DecodeResult<&mut [u8]> {
    let buffer_len = buf.len();
    offset
        .checked_add(len)
        .and_then(|end| buf.get_mut(offset..end))
        .ok_or(DecodeError::OutOfBounds {
            offset,
            len,
            buffer_len,
        })
}

fn word(bytes: &[u8]) -> [u8; 4] {
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}

fn float(bytes: &[u8], index: usize) -> f32 {
    f32::from_le_bytes(word(&bytes[index * 4..]))
}

#[inline]
pub fn read_u16(buf: &[u8], offset: usize) -> DecodeResult<u16> {
    let b = slice(buf, offset, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

#[inline]
pub fn read_u32(buf: &[u8], offset: usize) -> DecodeResult<u32> {
    Ok(u32::from_le_bytes(word(slice(buf, offset, 4)?)))
}

#[inline]
pub fn write_u16(buf: &mut [u8], offset: usize, value: u16) -> DecodeResult<()> {
    slice_mut(buf, offset, 2)?.copy_from_slice(&value.to_le_bytes());
    Ok(())
}

#[inline]
pub fn write_u32(buf: &mut [u8], offset: usize, value: u32) -> DecodeResult<()> {
    slice_mut(buf, offset, 4)?.copy_from_slice(&value.to_le_bytes());
    Ok(())
}

/// Reinterpret a byte buffer as little-endian 16-bit words.
pub fn words(buf: &[u8]) -> DecodeResult<Vec<u16>> {
    if buf.len() % 2 != 0 {
        return Err(DecodeError::OddLength(buf.len()));
    }
    Ok(buf
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect())
}

/// Serialize words back to little-endian bytes.
#[must_use]
pub fn word_bytes(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}
