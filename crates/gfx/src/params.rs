//! Host-side numeric parameter values, the draw/view bind-group split they
//! upload into, and the storage map features and pipelines read/write
//! values through by name.

use std::collections::BTreeMap;

use glam::{IVec2, IVec3, IVec4, Mat4, Vec2, Vec3, Vec4};

use crate::error::GfxResult;
use crate::shader::buffer_serializer::BufferSerializer;
use crate::shader::struct_layout::StructLayout;
use crate::shader::types::{BaseType, NumType, Type, Types};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumParameter {
    Float(f32),
    Float2(Vec2),
    Float3(Vec3),
    Float4(Vec4),
    Mat4(Mat4),
    UInt32(u32),
    Int32(i32),
    Int2(IVec2),
    Int3(IVec3),
    Int4(IVec4),
}

impl NumParameter {
    pub fn shader_type(&self) -> NumType {
        match self {
            NumParameter::Float(_) => Types::FLOAT,
            NumParameter::Float2(_) => Types::FLOAT2,
            NumParameter::Float3(_) => Types::FLOAT3,
            NumParameter::Float4(_) => Types::FLOAT4,
            NumParameter::Mat4(_) => Types::FLOAT4X4,
            NumParameter::UInt32(_) => Types::UINT32,
            NumParameter::Int32(_) => Types::INT32,
            NumParameter::Int2(_) => NumType::new(BaseType::I32, 2),
            NumParameter::Int3(_) => NumType::new(BaseType::I32, 3),
            NumParameter::Int4(_) => NumType::new(BaseType::I32, 4),
        }
    }

    /// Writes this value at `offset` into `data`, which must be backed by
    /// `ty`'s WGSL layout (the caller looked `ty`/`offset` up from a
    /// [`StructLayout`]).
    pub fn write_into(&self, ty: &Type, offset: usize, data: &mut [u8]) -> GfxResult<()> {
        let mut s = BufferSerializer::new(data);
        match self {
            NumParameter::Float(v) => s.write_f32(ty, offset, *v),
            NumParameter::Float2(v) => s.write_vec2(ty, offset, *v),
            NumParameter::Float3(v) => s.write_vec3(ty, offset, *v),
            NumParameter::Float4(v) => s.write_vec4(ty, offset, *v),
            NumParameter::UInt32(v) => s.write_u32(ty, offset, *v),
            NumParameter::Int32(v) => s.write_i32(ty, offset, *v),
            NumParameter::Mat4(m) => {
                let cols = m.to_cols_array_2d();
                let col_ty = Type::Num(Types::FLOAT4);
                for (i, col) in cols.iter().enumerate() {
                    s.write_vec4(&col_ty, offset + i * 16, Vec4::from_array(*col))?;
                }
                Ok(())
            }
            NumParameter::Int2(v) => {
                let scalar = Type::Num(Types::INT32);
                s.write_i32(&scalar, offset, v.x)?;
                s.write_i32(&scalar, offset + 4, v.y)
            }
            NumParameter::Int3(v) => {
                let scalar = Type::Num(Types::INT32);
                s.write_i32(&scalar, offset, v.x)?;
                s.write_i32(&scalar, offset + 4, v.y)?;
                s.write_i32(&scalar, offset + 8, v.z)
            }
            NumParameter::Int4(v) => {
                let scalar = Type::Num(Types::INT32);
                s.write_i32(&scalar, offset, v.x)?;
                s.write_i32(&scalar, offset + 4, v.y)?;
                s.write_i32(&scalar, offset + 8, v.z)?;
                s.write_i32(&scalar, offset + 12, v.w)
            }
        }
    }
}

/// Which per-frame frequency a buffer binding belongs to. Draw-frequency
/// bindings are rebound per draw call and occupy bind group 0; view-frequency
/// bindings are rebound once per view and occupy bind group 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindGroupId {
    Draw,
    View,
}

impl BindGroupId {
    pub fn group_index(self) -> usize {
        match self {
            BindGroupId::Draw => 0,
            BindGroupId::View => 1,
        }
    }
}

/// A named map of host parameter values, written into a buffer's bytes by
/// matching names against a [`StructLayout`]'s field names. Parameters with
/// no matching field (the shader never referenced them, so the layout
/// optimizer dropped the field) are silently skipped.
#[derive(Debug, Clone, Default)]
pub struct ParameterStorage {
    values: BTreeMap<String, NumParameter>,
}

impl ParameterStorage {
    pub fn set(&mut self, name: impl Into<String>, value: NumParameter) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&NumParameter> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NumParameter)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn write_into_layout(&self, layout: &StructLayout, data: &mut [u8]) -> GfxResult<()> {
        for (name, value) in &self.values {
            if let Some(idx) = layout.field_index(name) {
                let item = &layout.items[idx];
                value.write_into(&item.ty, item.offset, data)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::struct_layout::{AddressSpace, StructLayoutBuilder};
    use pretty_assertions::assert_eq;

    #[test]
    fn bind_group_ids_split_draw_and_view() {
        assert_eq!(BindGroupId::Draw.group_index(), 0);
        assert_eq!(BindGroupId::View.group_index(), 1);
    }

    #[test]
    fn write_into_layout_skips_unmatched_names() {
        let mut b = StructLayoutBuilder::new(AddressSpace::Uniform);
        b.push("roughness", Types::FLOAT.into()).unwrap();
        let layout = b.finalize();

        let mut storage = ParameterStorage::default();
        storage.set("roughness", NumParameter::Float(0.5));
        storage.set("metallic", NumParameter::Float(0.2));

        let mut data = vec![0u8; layout.size];
        storage.write_into_layout(&layout, &mut data).unwrap();

        assert_eq!(f32::from_le_bytes(data[0..4].try_into().unwrap()), 0.5);
    }

    #[test]
    fn mat4_writes_four_columns() {
        let mut b = StructLayoutBuilder::new(AddressSpace::Uniform);
        b.push("transform", Types::FLOAT4X4.into()).unwrap();
        let layout = b.finalize();

        let mut storage = ParameterStorage::default();
        storage.set("transform", NumParameter::Mat4(Mat4::IDENTITY));
        let mut data = vec![0u8; layout.size];
        storage.write_into_layout(&layout, &mut data).unwrap();

        assert_eq!(f32::from_le_bytes(data[0..4].try_into().unwrap()), 1.0);
        assert_eq!(f32::from_le_bytes(data[20..24].try_into().unwrap()), 1.0);
    }
}
