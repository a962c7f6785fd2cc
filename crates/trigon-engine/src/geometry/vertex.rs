use std::collections::HashSet;
use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};

use crate::error::{GfxError, Result};

/// Scalar type of a vertex attribute component.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ScalarKind {
    Float,
    Uint,
    Sint,
}

/// Attribute formats accepted in a [`VertexLayout`].
///
/// Each maps one-to-one onto a GPU wire format; there is no implicit
/// conversion between kinds or component counts.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Uint32,
    Uint32x2,
    Uint32x3,
    Uint32x4,
    Sint32,
    Sint32x2,
    Sint32x3,
    Sint32x4,
}

impl VertexFormat {
    pub const fn scalar(self) -> ScalarKind {
        match self {
            Self::Float32 | Self::Float32x2 | Self::Float32x3 | Self::Float32x4 => ScalarKind::Float,
            Self::Uint32 | Self::Uint32x2 | Self::Uint32x3 | Self::Uint32x4 => ScalarKind::Uint,
            Self::Sint32 | Self::Sint32x2 | Self::Sint32x3 | Self::Sint32x4 => ScalarKind::Sint,
        }
    }

    pub const fn components(self) -> u32 {
        match self {
            Self::Float32 | Self::Uint32 | Self::Sint32 => 1,
            Self::Float32x2 | Self::Uint32x2 | Self::Sint32x2 => 2,
            Self::Float32x3 | Self::Uint32x3 | Self::Sint32x3 => 3,
            Self::Float32x4 | Self::Uint32x4 | Self::Sint32x4 => 4,
        }
    }

    /// Size in bytes. Every component is 32 bits wide.
    pub const fn size(self) -> u64 {
        4 * self.components() as u64
    }

    pub fn to_wgpu(self) -> wgpu::VertexFormat {
        match self {
            Self::Float32 => wgpu::VertexFormat::Float32,
            Self::Float32x2 => wgpu::VertexFormat::Float32x2,
            Self::Float32x3 => wgpu::VertexFormat::Float32x3,
            Self::Float32x4 => wgpu::VertexFormat::Float32x4,
            Self::Uint32 => wgpu::VertexFormat::Uint32,
            Self::Uint32x2 => wgpu::VertexFormat::Uint32x2,
            Self::Uint32x3 => wgpu::VertexFormat::Uint32x3,
            Self::Uint32x4 => wgpu::VertexFormat::Uint32x4,
            Self::Sint32 => wgpu::VertexFormat::Sint32,
            Self::Sint32x2 => wgpu::VertexFormat::Sint32x2,
            Self::Sint32x3 => wgpu::VertexFormat::Sint32x3,
            Self::Sint32x4 => wgpu::VertexFormat::Sint32x4,
        }
    }
}

/// One attribute inside a vertex record.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexAttribute {
    pub shader_location: u32,
    pub byte_offset: u64,
    pub format: VertexFormat,
}

impl VertexAttribute {
    pub const fn new(shader_location: u32, byte_offset: u64, format: VertexFormat) -> Self {
        Self {
            shader_location,
            byte_offset,
            format,
        }
    }

    /// First byte past the attribute.
    pub const fn end(&self) -> u64 {
        self.byte_offset + self.format.size()
    }
}

/// Stride plus per-attribute offsets and formats of one vertex buffer.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VertexLayout {
    stride: u64,
    attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    pub fn new(stride: u64, attributes: Vec<VertexAttribute>) -> Self {
        Self { stride, attributes }
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    pub fn attribute_at(&self, shader_location: u32) -> Option<&VertexAttribute> {
        self.attributes
            .iter()
            .find(|a| a.shader_location == shader_location)
    }

    /// Checks the layout is self-consistent: a non-zero stride, every
    /// attribute inside the stride, and no location used twice.
    pub fn validate(&self) -> Result<()> {
        if self.stride == 0 {
            return Err(GfxError::LayoutMismatch(
                "vertex stride must be non-zero".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for attr in &self.attributes {
            if attr.end() > self.stride {
                return Err(GfxError::LayoutMismatch(format!(
                    "attribute @location({}) spans bytes {}..{} but the stride is {}",
                    attr.shader_location,
                    attr.byte_offset,
                    attr.end(),
                    self.stride
                )));
            }
            if attr.byte_offset % 4 != 0 {
                return Err(GfxError::LayoutMismatch(format!(
                    "attribute @location({}) offset {} is not 4-byte aligned",
                    attr.shader_location, attr.byte_offset
                )));
            }
            if !seen.insert(attr.shader_location) {
                return Err(GfxError::LayoutMismatch(format!(
                    "@location({}) is declared twice",
                    attr.shader_location
                )));
            }
        }

        Ok(())
    }

    /// Number of whole records in `byte_length` bytes. An empty buffer has
    /// nothing to draw and is rejected.
    pub fn vertex_count(&self, byte_length: u64) -> Result<u32> {
        if byte_length == 0 {
            return Err(GfxError::LayoutMismatch("empty vertex buffer".to_string()));
        }
        if self.stride == 0 || byte_length % self.stride != 0 {
            return Err(GfxError::LayoutMismatch(format!(
                "buffer of {byte_length} bytes is not a whole number of {}-byte vertices",
                self.stride
            )));
        }

        u32::try_from(byte_length / self.stride).map_err(|_| {
            GfxError::LayoutMismatch(format!("buffer of {byte_length} bytes holds too many vertices"))
        })
    }

    pub(crate) fn wgpu_attributes(&self) -> Vec<wgpu::VertexAttribute> {
        self.attributes
            .iter()
            .map(|a| wgpu::VertexAttribute {
                format: a.format.to_wgpu(),
                offset: a.byte_offset,
                shader_location: a.shader_location,
            })
            .collect()
    }
}

/// A CPU-side vertex record whose byte layout is its [`VertexLayout`].
pub trait VertexRecord: Pod {
    fn layout() -> VertexLayout;
}

/// Position-only record (`@location(0) vec3<f32>`).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PositionVertex {
    pub position: [f32; 3],
}

/// Interleaved position (`@location(0)`) and color (`@location(1)`).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

const _: () = assert!(size_of::<PositionVertex>() == 12);
const _: () = assert!(size_of::<ColorVertex>() == 24);

impl PositionVertex {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { position: [x, y, z] }
    }
}

impl ColorVertex {
    pub const fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self { position, color }
    }
}

impl VertexRecord for PositionVertex {
    fn layout() -> VertexLayout {
        VertexLayout::new(
            size_of::<Self>() as u64,
            vec![VertexAttribute::new(
                0,
                offset_of!(Self, position) as u64,
                VertexFormat::Float32x3,
            )],
        )
    }
}

impl VertexRecord for ColorVertex {
    fn layout() -> VertexLayout {
        VertexLayout::new(
            size_of::<Self>() as u64,
            vec![
                VertexAttribute::new(0, offset_of!(Self, position) as u64, VertexFormat::Float32x3),
                VertexAttribute::new(1, offset_of!(Self, color) as u64, VertexFormat::Float32x3),
            ],
        )
    }
}
