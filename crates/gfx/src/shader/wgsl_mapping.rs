//! Translation of host types and identifiers into the WGSL text the
//! generator emits.

use crate::shader::struct_layout::AddressSpace;
use crate::shader::types::{BaseType, NumType};

/// Replaces any character outside `[A-Za-z0-9_]` with `_`, so field/feature
/// names supplied by callers are always valid WGSL identifiers.
pub fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Maps a vector component index to its WGSL swizzle letter.
pub fn component_name(index: usize) -> char {
    match index {
        0 => 'x',
        1 => 'y',
        2 => 'z',
        3 => 'w',
        _ => panic!("vector component index out of range: {index}"),
    }
}

fn scalar_type_name(base_type: BaseType) -> &'static str {
    match base_type {
        BaseType::Bool => "bool",
        BaseType::U8 | BaseType::U16 | BaseType::U32 => "u32",
        BaseType::I8 | BaseType::I16 | BaseType::I32 => "i32",
        BaseType::F16 => "f16",
        BaseType::F32 => "f32",
    }
}

/// WGSL type-name text for a `NumType`, e.g. `f32`, `vec3<f32>`, `mat4x4<f32>`.
pub fn num_type_name(ty: &NumType) -> String {
    let scalar = scalar_type_name(ty.base_type);
    let scalar = if ty.atomic { format!("atomic<{scalar}>") } else { scalar.to_string() };
    if ty.matrix_dimension > 1 {
        format!("mat{0}x{0}<{1}>", ty.matrix_dimension, scalar)
    } else if ty.num_components > 1 {
        format!("vec{}<{}>", ty.num_components, scalar)
    } else {
        scalar
    }
}

pub fn address_space_keyword(space: AddressSpace) -> &'static str {
    match space {
        AddressSpace::Uniform => "uniform",
        AddressSpace::Storage => "storage",
        AddressSpace::StorageRw => "storage, read_write",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::types::Types;

    #[test]
    fn sanitizes_non_identifier_characters() {
        assert_eq!(sanitize_identifier("foo-bar.baz"), "foo_bar_baz");
    }

    #[test]
    fn scalar_and_vector_names() {
        assert_eq!(num_type_name(&Types::FLOAT), "f32");
        assert_eq!(num_type_name(&Types::FLOAT3), "vec3<f32>");
        assert_eq!(num_type_name(&Types::FLOAT4X4), "mat4x4<f32>");
    }

    #[test]
    fn atomic_scalar_name() {
        assert_eq!(num_type_name(&Types::UINT32.as_atomic()), "atomic<u32>");
    }
}
