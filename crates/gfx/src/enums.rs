//! Small enumerations shared across the type system, generator and pipeline
//! builder. Mirrors the `gfx::enums` header of the system this crate's
//! design is based on, trimmed to what the compilation core actually needs.

use crate::error::{GfxError, GfxResult};
use crate::shader::types::{BaseType, NumType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    TriangleList,
    TriangleStrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindingOrder {
    Cw,
    Ccw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Vertex,
    Fragment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    UInt16,
    UInt32,
}

impl IndexFormat {
    pub fn to_wgpu(self) -> wgpu::IndexFormat {
        match self {
            IndexFormat::UInt16 => wgpu::IndexFormat::Uint16,
            IndexFormat::UInt32 => wgpu::IndexFormat::Uint32,
        }
    }
}

/// Host storage type for a vertex attribute or render target channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    UInt8,
    Int8,
    UNorm8,
    SNorm8,
    UInt16,
    Int16,
    UNorm16,
    SNorm16,
    UInt32,
    Int32,
    Float16,
    Float32,
}

impl StorageType {
    pub fn byte_size(self) -> usize {
        use StorageType::*;
        match self {
            UInt8 | Int8 | UNorm8 | SNorm8 => 1,
            UInt16 | Int16 | UNorm16 | SNorm16 | Float16 => 2,
            UInt32 | Int32 | Float32 => 4,
        }
    }

    pub fn is_integer(self) -> bool {
        use StorageType::*;
        matches!(self, UInt8 | Int8 | UInt16 | Int16 | UInt32 | Int32)
    }

    /// Base numeric type this storage type unpacks to inside the shader.
    pub fn base_type(self) -> BaseType {
        use StorageType::*;
        match self {
            UInt8 | UInt16 | UInt32 => BaseType::U32,
            Int8 | Int16 | Int32 => BaseType::I32,
            UNorm8 | SNorm8 | UNorm16 | SNorm16 | Float16 | Float32 => BaseType::F32,
        }
    }

    pub fn to_wgpu_vertex_format(self, components: usize) -> Option<wgpu::VertexFormat> {
        use wgpu::VertexFormat as V;
        use StorageType::*;
        Some(match (self, components) {
            (UInt8, 2) => V::Uint8x2,
            (UInt8, 4) => V::Uint8x4,
            (Int8, 2) => V::Sint8x2,
            (Int8, 4) => V::Sint8x4,
            (UNorm8, 2) => V::Unorm8x2,
            (UNorm8, 4) => V::Unorm8x4,
            (SNorm8, 2) => V::Snorm8x2,
            (SNorm8, 4) => V::Snorm8x4,
            (UInt16, 2) => V::Uint16x2,
            (UInt16, 4) => V::Uint16x4,
            (Int16, 2) => V::Sint16x2,
            (Int16, 4) => V::Sint16x4,
            (UNorm16, 2) => V::Unorm16x2,
            (UNorm16, 4) => V::Unorm16x4,
            (SNorm16, 2) => V::Snorm16x2,
            (SNorm16, 4) => V::Snorm16x4,
            (Float16, 2) => V::Float16x2,
            (Float16, 4) => V::Float16x4,
            (UInt32, 1) => V::Uint32,
            (UInt32, 2) => V::Uint32x2,
            (UInt32, 3) => V::Uint32x3,
            (UInt32, 4) => V::Uint32x4,
            (Int32, 1) => V::Sint32,
            (Int32, 2) => V::Sint32x2,
            (Int32, 3) => V::Sint32x3,
            (Int32, 4) => V::Sint32x4,
            (Float32, 1) => V::Float32,
            (Float32, 2) => V::Float32x2,
            (Float32, 3) => V::Float32x3,
            (Float32, 4) => V::Float32x4,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextureDimension {
    D1,
    D2,
    Cube,
}

impl TextureDimension {
    pub fn to_wgpu(self) -> wgpu::TextureViewDimension {
        match self {
            TextureDimension::D1 => wgpu::TextureViewDimension::D1,
            TextureDimension::D2 => wgpu::TextureViewDimension::D2,
            TextureDimension::Cube => wgpu::TextureViewDimension::Cube,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextureSampleType {
    Int,
    UInt,
    Float,
    UnfilterableFloat,
    Depth,
}

impl TextureSampleType {
    pub fn to_wgpu(self) -> wgpu::TextureSampleType {
        match self {
            TextureSampleType::Int => wgpu::TextureSampleType::Sint,
            TextureSampleType::UInt => wgpu::TextureSampleType::Uint,
            TextureSampleType::Float => wgpu::TextureSampleType::Float { filterable: true },
            TextureSampleType::UnfilterableFloat => wgpu::TextureSampleType::Float { filterable: false },
            TextureSampleType::Depth => wgpu::TextureSampleType::Depth,
        }
    }

    pub fn is_filterable(self) -> bool {
        matches!(self, TextureSampleType::Float)
    }
}

/// Derive a fragment output field's shader-facing `NumType` from the render
/// target's pixel format, per the build sequence's output-field derivation
/// step. Only color-storing formats are meaningful here; the depth target is
/// handled separately by the pipeline builder.
pub fn pixel_format_output_type(format: wgpu::TextureFormat) -> GfxResult<NumType> {
    use wgpu::TextureFormat as F;
    let (base, components) = match format {
        F::R8Unorm | F::R8Snorm | F::R16Float | F::R32Float => (BaseType::F32, 1),
        F::Rg8Unorm | F::Rg8Snorm | F::Rg16Float | F::Rg32Float => (BaseType::F32, 2),
        F::Rgba8Unorm | F::Rgba8UnormSrgb | F::Rgba8Snorm | F::Rgba16Float | F::Rgba32Float
        | F::Bgra8Unorm | F::Bgra8UnormSrgb => (BaseType::F32, 4),
        F::R8Uint | F::R16Uint | F::R32Uint => (BaseType::U32, 1),
        F::Rg8Uint | F::Rg16Uint | F::Rg32Uint => (BaseType::U32, 2),
        F::Rgba8Uint | F::Rgba16Uint | F::Rgba32Uint => (BaseType::U32, 4),
        F::R8Sint | F::R16Sint | F::R32Sint => (BaseType::I32, 1),
        F::Rg8Sint | F::Rg16Sint | F::Rg32Sint => (BaseType::I32, 2),
        F::Rgba8Sint | F::Rgba16Sint | F::Rgba32Sint => (BaseType::I32, 4),
        other => return Err(GfxError::UnrecognizedPixelFormat { format: other }),
    };
    Ok(NumType::new(base, components))
}
