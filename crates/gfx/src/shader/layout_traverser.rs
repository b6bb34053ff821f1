//! Navigates a [`StructLayout`] by a sequence of field names, resolving
//! nested struct fields through the same structural-equality struct-layout
//! cache the builder populated.

use smallvec::SmallVec;

use crate::error::{GfxError, GfxResult};
use crate::shader::struct_layout::{StructLayout, StructLayoutLookup};
use crate::shader::types::Type;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutPath(pub SmallVec<[String; 8]>);

impl LayoutPath {
    pub fn new(components: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(components.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn head(&self) -> &str {
        &self.0[0]
    }

    pub fn skip_first(&self) -> LayoutPath {
        if self.0.is_empty() {
            LayoutPath::default()
        } else {
            LayoutPath(self.0[1..].iter().cloned().collect())
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutRef {
    pub path: LayoutPath,
    pub offset: usize,
    pub size: usize,
    pub ty: Type,
}

pub struct LayoutTraverser<'a> {
    base: &'a StructLayout,
    struct_lookup: &'a StructLayoutLookup,
}

impl<'a> LayoutTraverser<'a> {
    pub fn new(base: &'a StructLayout, struct_lookup: &'a StructLayoutLookup) -> Self {
        Self { base, struct_lookup }
    }

    pub fn find_runtime_sized_array(&self) -> GfxResult<LayoutRef> {
        self.find_runtime_sized_field(self.base, LayoutPath::default())
            .ok_or(GfxError::NoRuntimeSizedArray)
    }

    pub fn find(&self, path: &LayoutPath) -> Option<LayoutRef> {
        let mut node = self.base;
        let mut offset = 0usize;
        let mut remaining = path.clone();
        let mut found = None;

        while !remaining.is_empty() {
            let head = remaining.head().to_string();
            let idx = node.field_index(&head)?;
            let item = node.items[idx].clone();
            offset += item.offset;
            remaining = remaining.skip_first();

            if remaining.is_empty() {
                found = Some(item);
                break;
            }

            match &item.ty {
                Type::Struct(st) => node = self.struct_lookup.get(st)?,
                _ => return None,
            }
        }

        let item = found?;
        Some(LayoutRef { path: path.clone(), offset, size: item.size, ty: item.ty })
    }

    fn find_runtime_sized_field(&self, layout: &StructLayout, prefix: LayoutPath) -> Option<LayoutRef> {
        let last = layout.items.last()?;
        let name = layout.field_names.last()?.clone();
        match &last.ty {
            Type::Array(_) => {
                let mut path = prefix;
                path.0.push(name);
                Some(LayoutRef { path, offset: last.offset, size: last.size, ty: last.ty.clone() })
            }
            Type::Struct(st) => {
                let inner = self.struct_lookup.get(st)?;
                let mut path = prefix;
                path.0.push(name);
                let mut found = self.find_runtime_sized_field(inner, LayoutPath::default())?;
                found.offset += last.offset;
                path.0.extend(found.path.0);
                found.path = path;
                Some(found)
            }
            _ => None,
        }
    }
}

/// Byte length of a buffer whose tail runtime-sized array has `runtime_length` elements.
pub fn runtime_buffer_size(layout: &StructLayout, runtime_field: &LayoutRef, runtime_length: usize) -> usize {
    let raw = runtime_field.offset + runtime_field.size * runtime_length;
    crate::shader::types::align_to(raw, layout.max_alignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::struct_layout::{AddressSpace, StructLayoutBuilder};
    use crate::shader::types::Types;

    #[test]
    fn finds_top_level_field() {
        let mut b = StructLayoutBuilder::new(AddressSpace::Uniform);
        b.push("a", Types::FLOAT.into()).unwrap();
        b.push("b", Types::FLOAT3.into()).unwrap();
        let layout = b.finalize();
        let lookup = StructLayoutLookup::new();
        let traverser = LayoutTraverser::new(&layout, &lookup);
        let found = traverser.find(&LayoutPath::new(["b"])).unwrap();
        assert_eq!(found.offset, 16);
        assert_eq!(found.size, 12);
    }

    #[test]
    fn find_runtime_sized_array_reports_the_tail() {
        let mut b = StructLayoutBuilder::new(AddressSpace::Storage);
        b.push("count", Types::UINT32.into()).unwrap();
        b.push(
            "elements",
            crate::shader::types::ArrayType::new(Types::FLOAT4.into(), None).into(),
        )
        .unwrap();
        let layout = b.finalize();
        let lookup = StructLayoutLookup::new();
        let traverser = LayoutTraverser::new(&layout, &lookup);
        let found = traverser.find_runtime_sized_array().unwrap();
        assert_eq!(found.path.head(), "elements");
    }
}
