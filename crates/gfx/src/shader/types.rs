//! WGSL-equivalent type representation: scalars/vectors/matrices, arrays,
//! structs, textures and samplers, plus the pure byte-size/alignment rules
//! used throughout the struct layout builder.

use std::sync::Arc;

use crate::enums::{TextureDimension, TextureSampleType};

pub(crate) fn align_to(value: usize, alignment: usize) -> usize {
    if alignment == 0 {
        return value;
    }
    (value + alignment - 1) / alignment * alignment
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BaseType {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F16,
    F32,
}

impl BaseType {
    pub fn is_float(self) -> bool {
        matches!(self, BaseType::F16 | BaseType::F32)
    }

    pub fn is_integer(self) -> bool {
        !self.is_float() && !matches!(self, BaseType::Bool)
    }

    /// Byte size of one scalar. `Bool` has no WGSL-host representation and
    /// yields 0, matching the upstream table this is ported from.
    pub fn byte_size(self) -> usize {
        match self {
            BaseType::Bool => 0,
            BaseType::U8 | BaseType::I8 => 1,
            BaseType::U16 | BaseType::I16 | BaseType::F16 => 2,
            BaseType::U32 | BaseType::I32 | BaseType::F32 => 4,
        }
    }
}

/// A WGSL numeric type: scalar, vector, or (square) matrix, optionally atomic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NumType {
    pub base_type: BaseType,
    /// Vector width (1..=4), or the row count for a matrix column.
    pub num_components: u8,
    /// 1 for scalars/vectors, >1 for a square matrix of that dimension.
    pub matrix_dimension: u8,
    pub atomic: bool,
}

impl NumType {
    pub fn new(base_type: BaseType, num_components: u8) -> Self {
        Self { base_type, num_components, matrix_dimension: 1, atomic: false }
    }

    pub fn matrix(base_type: BaseType, dimension: u8) -> Self {
        Self { base_type, num_components: dimension, matrix_dimension: dimension, atomic: false }
    }

    pub fn as_atomic(self) -> Self {
        Self { atomic: true, ..self }
    }

    fn vec_alignment(scalar_size: usize, components: u8) -> usize {
        match components {
            1 => scalar_size,
            2 => scalar_size * 2,
            _ => scalar_size * 4,
        }
    }

    pub fn byte_size(&self) -> usize {
        let scalar = self.base_type.byte_size();
        if self.matrix_dimension > 1 {
            let column_size = scalar * self.num_components as usize;
            let column_align = Self::vec_alignment(scalar, self.num_components);
            align_to(column_size, column_align) * self.matrix_dimension as usize
        } else {
            scalar * self.num_components as usize
        }
    }

    pub fn wgsl_alignment(&self) -> usize {
        Self::vec_alignment(self.base_type.byte_size(), self.num_components)
    }
}

pub struct Types;
impl Types {
    pub const FLOAT: NumType = NumType { base_type: BaseType::F32, num_components: 1, matrix_dimension: 1, atomic: false };
    pub const FLOAT2: NumType = NumType { base_type: BaseType::F32, num_components: 2, matrix_dimension: 1, atomic: false };
    pub const FLOAT3: NumType = NumType { base_type: BaseType::F32, num_components: 3, matrix_dimension: 1, atomic: false };
    pub const FLOAT4: NumType = NumType { base_type: BaseType::F32, num_components: 4, matrix_dimension: 1, atomic: false };
    pub const FLOAT4X4: NumType = NumType { base_type: BaseType::F32, num_components: 4, matrix_dimension: 4, atomic: false };
    pub const UINT32: NumType = NumType { base_type: BaseType::U32, num_components: 1, matrix_dimension: 1, atomic: false };
    pub const INT32: NumType = NumType { base_type: BaseType::I32, num_components: 1, matrix_dimension: 1, atomic: false };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureType {
    pub dimension: TextureDimension,
    pub sample_type: TextureSampleType,
}

impl TextureType {
    pub fn new(dimension: TextureDimension) -> Self {
        Self { dimension, sample_type: TextureSampleType::Float }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerType;

impl PartialOrd for SamplerType {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for SamplerType {
    fn cmp(&self, _other: &Self) -> std::cmp::Ordering {
        std::cmp::Ordering::Equal
    }
}

/// A field in a [`StructType`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StructField {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct StructTypeInner {
    entries: Vec<StructField>,
}

/// Structurally-equal, reference-counted struct type. Two `StructType`
/// values compare equal iff their field lists are pairwise equal, which is
/// what lets them be used as struct-layout cache keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StructType(Arc<StructTypeInner>);

impl StructType {
    pub fn entries(&self) -> &[StructField] {
        &self.0.entries
    }

    pub fn find_field(&self, name: &str) -> Option<&StructField> {
        self.0.entries.iter().find(|f| f.name == name)
    }
}

/// Incrementally builds a [`StructType`], rejecting a field redeclared with
/// a conflicting type (a field redeclared with the *same* type is a no-op).
#[derive(Default)]
pub struct StructTypeBuilder {
    entries: Vec<StructField>,
}

impl StructTypeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, ty: Type) -> crate::error::GfxResult<()> {
        let name = name.into();
        if let Some(existing) = self.entries.iter().find(|f| f.name == name) {
            if existing.ty == ty {
                return Ok(());
            }
            return Err(crate::error::GfxError::DuplicateField { name });
        }
        self.entries.push(StructField { name, ty });
        Ok(())
    }

    pub fn build(self) -> StructType {
        StructType(Arc::new(StructTypeInner { entries: self.entries }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct ArrayTypeInner {
    element_type: Type,
    fixed_length: Option<usize>,
}

/// An array type. At most one runtime-sized (unfixed length) array may
/// appear in a struct, and only as its last field — enforced by
/// [`crate::shader::struct_layout::StructLayoutBuilder`], not here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArrayType(Arc<ArrayTypeInner>);

impl ArrayType {
    pub fn new(element_type: Type, fixed_length: Option<usize>) -> Self {
        Self(Arc::new(ArrayTypeInner { element_type, fixed_length }))
    }

    pub fn element_type(&self) -> &Type {
        &self.0.element_type
    }

    pub fn fixed_length(&self) -> Option<usize> {
        self.0.fixed_length
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Type {
    Num(NumType),
    Array(ArrayType),
    Struct(StructType),
    Texture(TextureType),
    Sampler(SamplerType),
}

impl From<NumType> for Type {
    fn from(v: NumType) -> Self {
        Type::Num(v)
    }
}
impl From<ArrayType> for Type {
    fn from(v: ArrayType) -> Self {
        Type::Array(v)
    }
}
impl From<StructType> for Type {
    fn from(v: StructType) -> Self {
        Type::Struct(v)
    }
}
impl From<TextureType> for Type {
    fn from(v: TextureType) -> Self {
        Type::Texture(v)
    }
}

#[derive(Debug, Clone)]
pub struct NamedNumType {
    pub name: String,
    pub ty: NumType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_alignment_equals_size() {
        assert_eq!(Types::FLOAT.byte_size(), 4);
        assert_eq!(Types::FLOAT.wgsl_alignment(), 4);
    }

    #[test]
    fn vec3_aligns_to_16_but_sizes_to_12() {
        assert_eq!(Types::FLOAT3.byte_size(), 12);
        assert_eq!(Types::FLOAT3.wgsl_alignment(), 16);
    }

    #[test]
    fn mat4x4_is_64_bytes() {
        assert_eq!(Types::FLOAT4X4.byte_size(), 64);
        assert_eq!(Types::FLOAT4X4.wgsl_alignment(), 16);
    }

    #[test]
    fn struct_type_rejects_conflicting_redeclaration() {
        let mut b = StructTypeBuilder::new();
        b.push("a", Types::FLOAT.into()).unwrap();
        let err = b.push("a", Types::FLOAT2.into()).unwrap_err();
        assert!(matches!(err, crate::error::GfxError::DuplicateField { .. }));
    }

    #[test]
    fn struct_type_allows_same_type_redeclaration() {
        let mut b = StructTypeBuilder::new();
        b.push("a", Types::FLOAT.into()).unwrap();
        b.push("a", Types::FLOAT.into()).unwrap();
        assert_eq!(b.build().entries().len(), 1);
    }

    #[test]
    fn structurally_equal_struct_types_compare_equal() {
        let mut b1 = StructTypeBuilder::new();
        b1.push("x", Types::FLOAT.into()).unwrap();
        let mut b2 = StructTypeBuilder::new();
        b2.push("x", Types::FLOAT.into()).unwrap();
        assert_eq!(b1.build(), b2.build());
    }
}
