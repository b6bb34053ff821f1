//! Computes byte offsets, sizes and alignments for [`StructType`]s under the
//! WGSL address-space layout rules (see the WGSL spec, "Alignment and Size").

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{GfxError, GfxResult};
use crate::shader::types::{align_to, ArrayType, StructType, Type, Types};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressSpace {
    Uniform,
    Storage,
    StorageRw,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructLayoutItem {
    pub offset: usize,
    pub size: usize,
    pub ty: Type,
}

impl StructLayoutItem {
    pub fn equal_ignore_offset(&self, other: &StructLayoutItem) -> bool {
        self.size == other.size && self.ty == other.ty
    }
}

#[derive(Debug, Clone, Default)]
pub struct StructLayout {
    pub items: Vec<StructLayoutItem>,
    pub field_names: Vec<String>,
    pub size: usize,
    pub max_alignment: usize,
    pub is_runtime_sized: bool,
}

impl StructLayout {
    /// Size of this struct when used as an array element.
    pub fn array_stride(&self) -> usize {
        align_to(self.size, self.max_alignment)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.field_names.iter().position(|n| n == name)
    }
}

pub type StructLayoutLookup = HashMap<StructType, StructLayout>;
pub type SharedLayoutLookup = Rc<RefCell<StructLayoutLookup>>;

fn round_up_alignment(value: usize, minimum: usize) -> usize {
    value.max(minimum)
}

/// Incrementally builds a [`StructLayout`] for one address space. Inner
/// struct types are laid out once and memoized in a structural-equality
/// keyed cache shared across all builders that opt in via [`Self::with_lookup`].
pub struct StructLayoutBuilder {
    address_space: AddressSpace,
    mapping: HashMap<String, usize>,
    layout: StructLayout,
    offset: usize,
    finalized: bool,
    lookup: SharedLayoutLookup,
}

impl StructLayoutBuilder {
    pub fn new(address_space: AddressSpace) -> Self {
        Self::with_lookup(address_space, Rc::new(RefCell::new(HashMap::new())))
    }

    pub fn with_lookup(address_space: AddressSpace, lookup: SharedLayoutLookup) -> Self {
        Self {
            address_space,
            mapping: HashMap::new(),
            layout: StructLayout::default(),
            offset: 0,
            finalized: false,
            lookup,
        }
    }

    pub fn struct_map(&self) -> SharedLayoutLookup {
        self.lookup.clone()
    }

    pub fn push(&mut self, name: impl Into<String>, ty: Type) -> GfxResult<()> {
        if self.finalized {
            return Err(GfxError::LayoutFinalized);
        }
        let name = name.into();
        if self.layout.is_runtime_sized {
            return Err(GfxError::RuntimeSizedArrayNotLast { name });
        }
        let item = self.generate_next(&ty)?;
        self.push_internal(name, item)
    }

    pub fn push_from_struct(&mut self, st: &StructType) -> GfxResult<()> {
        for field in st.entries() {
            self.push(field.name.clone(), field.ty.clone())?;
        }
        Ok(())
    }

    /// Rebuilds the layout keeping only fields for which `filter(name, item)` holds.
    pub fn optimize(&mut self, mut filter: impl FnMut(&str, &StructLayoutItem) -> bool) -> GfxResult<()> {
        let mut keep = Vec::new();
        for (i, name) in self.layout.field_names.iter().enumerate() {
            if filter(name, &self.layout.items[i]) {
                keep.push((name.clone(), self.layout.items[i].ty.clone()));
            }
        }
        self.offset = 0;
        self.mapping.clear();
        self.layout = StructLayout::default();
        for (name, ty) in keep {
            self.push(name, ty)?;
        }
        Ok(())
    }

    /// If the current size isn't a multiple of `alignment`, appends an
    /// `_array_padding_` tail field and returns its descriptor.
    pub fn force_alignment_to(&mut self, alignment: usize) -> GfxResult<Option<StructLayoutItem>> {
        let stride = self.current_layout().array_stride();
        let aligned = align_to(stride, alignment);
        debug_assert_eq!(align_to(aligned, 4), aligned);
        let pad_floats = (aligned - stride) / 4;
        if pad_floats > 0 {
            self.push("_array_padding_", ArrayType::new(Types::FLOAT.into(), Some(pad_floats)).into())?;
            Ok(self.layout.items.last().cloned())
        } else {
            Ok(None)
        }
    }

    pub fn current_layout(&mut self) -> &StructLayout {
        self.update_output();
        &self.layout
    }

    pub fn finalize(mut self) -> StructLayout {
        self.update_output();
        self.finalized = true;
        self.layout
    }

    pub fn map_size(&mut self, ty: &Type) -> GfxResult<usize> {
        match ty {
            Type::Num(n) => Ok(n.byte_size()),
            Type::Array(a) => {
                let stride = self.map_array_stride(a)?;
                match a.fixed_length() {
                    Some(len) => Ok(len * stride),
                    None => {
                        self.layout.is_runtime_sized = true;
                        Ok(stride)
                    }
                }
            }
            Type::Struct(s) => {
                let inner = self.inner_struct_data(s)?;
                if inner.is_runtime_sized {
                    self.layout.is_runtime_sized = true;
                }
                Ok(inner.size)
            }
            Type::Texture(_) | Type::Sampler(_) => Err(GfxError::UnsupportedLayoutType { ty: ty.clone() }),
        }
    }

    pub fn map_alignment(&mut self, ty: &Type) -> GfxResult<usize> {
        match ty {
            Type::Num(n) => Ok(n.wgsl_alignment()),
            Type::Array(a) => {
                let mut align = self.map_alignment(a.element_type())?;
                if self.address_space == AddressSpace::Uniform {
                    align = round_up_alignment(align, 16);
                }
                Ok(align)
            }
            Type::Struct(s) => Ok(self.inner_struct_data(s)?.max_alignment),
            Type::Texture(_) | Type::Sampler(_) => Err(GfxError::UnsupportedLayoutType { ty: ty.clone() }),
        }
    }

    pub fn map_array_stride(&mut self, ty: &ArrayType) -> GfxResult<usize> {
        let mut element_align = self.map_alignment(ty.element_type())?;
        if self.address_space == AddressSpace::Uniform {
            element_align = round_up_alignment(element_align, 16);
        }
        let element_size = self.map_size(ty.element_type())?;
        Ok(align_to(element_size, element_align))
    }

    fn generate_next(&mut self, ty: &Type) -> GfxResult<StructLayoutItem> {
        let alignment = self.map_alignment(ty)?;
        let aligned_offset = align_to(self.offset, alignment);
        let size = self.map_size(ty)?;
        Ok(StructLayoutItem { offset: aligned_offset, size, ty: ty.clone() })
    }

    fn push_internal(&mut self, name: String, item: StructLayoutItem) -> GfxResult<()> {
        if let Some(&idx) = self.mapping.get(&name) {
            if self.layout.items[idx].equal_ignore_offset(&item) {
                return Ok(());
            }
            return Err(GfxError::DuplicateField { name });
        }
        let idx = self.mapping.len();
        self.layout.field_names.push(name.clone());
        self.layout.items.push(item.clone());
        self.mapping.insert(name, idx);
        self.update_offset_and_max_align(&item)?;
        Ok(())
    }

    fn update_offset_and_max_align(&mut self, item: &StructLayoutItem) -> GfxResult<()> {
        self.offset = self.offset.max(item.offset + item.size);
        let field_alignment = self.map_alignment(&item.ty)?;
        self.layout.max_alignment = self.layout.max_alignment.max(field_alignment);
        Ok(())
    }

    fn update_output(&mut self) {
        if self.address_space == AddressSpace::Uniform {
            self.layout.max_alignment = round_up_alignment(self.layout.max_alignment, 16);
        }
        self.layout.size = align_to(self.offset, self.layout.max_alignment);
    }

    fn inner_struct_data(&mut self, st: &StructType) -> GfxResult<StructLayout> {
        if let Some(layout) = self.lookup.borrow().get(st) {
            return Ok(layout.clone());
        }
        let mut sub = StructLayoutBuilder::with_lookup(self.address_space, self.lookup.clone());
        sub.push_from_struct(st)?;
        let layout = sub.finalize();
        self.lookup.borrow_mut().insert(st.clone(), layout.clone());
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::types::{StructTypeBuilder, Types};
    use pretty_assertions::assert_eq;

    #[test]
    fn uniform_struct_alignment_is_at_least_16() {
        let mut b = StructLayoutBuilder::new(AddressSpace::Uniform);
        b.push("a", Types::FLOAT.into()).unwrap();
        let layout = b.finalize();
        assert_eq!(layout.max_alignment, 16);
        assert_eq!(layout.size, 16);
    }

    #[test]
    fn mixed_fields_produce_expected_offsets() {
        let mut b = StructLayoutBuilder::new(AddressSpace::Uniform);
        b.push("a", Types::FLOAT.into()).unwrap();
        b.push("b", Types::FLOAT3.into()).unwrap();
        let layout = b.finalize();
        // `b` (vec3, align 16) can't start at offset 4; it's pushed to 16.
        assert_eq!(layout.items[0].offset, 0);
        assert_eq!(layout.items[1].offset, 16);
        assert_eq!(layout.size, 32);
    }

    #[test]
    fn runtime_sized_array_must_be_last() {
        let mut b = StructLayoutBuilder::new(AddressSpace::Storage);
        b.push("tail", ArrayType::new(Types::FLOAT.into(), None).into()).unwrap();
        let err = b.push("oops", Types::FLOAT.into()).unwrap_err();
        assert!(matches!(err, GfxError::RuntimeSizedArrayNotLast { .. }));
    }

    #[test]
    fn runtime_sized_array_only_field_sizes_to_its_stride() {
        let mut b = StructLayoutBuilder::new(AddressSpace::Storage);
        b.push("elements", ArrayType::new(Types::FLOAT.into(), None).into()).unwrap();
        let layout = b.finalize();
        assert!(layout.is_runtime_sized);
        assert_eq!(layout.size, layout.array_stride());
    }

    #[test]
    fn optimize_drops_filtered_fields_and_keeps_offsets_dense() {
        let mut b = StructLayoutBuilder::new(AddressSpace::Storage);
        b.push("a", Types::FLOAT.into()).unwrap();
        b.push("b", Types::FLOAT.into()).unwrap();
        b.push("c", Types::FLOAT.into()).unwrap();
        b.optimize(|name, _| name == "b").unwrap();
        let layout = b.finalize();
        assert_eq!(layout.field_names, vec!["b".to_string()]);
        assert_eq!(layout.items[0].offset, 0);
    }

    #[test]
    fn inner_struct_layout_is_memoized() {
        let lookup = Rc::new(RefCell::new(HashMap::new()));
        let mut inner_builder = StructTypeBuilder::new();
        inner_builder.push("x", Types::FLOAT.into()).unwrap();
        let inner = inner_builder.build();

        let mut b1 = StructLayoutBuilder::with_lookup(AddressSpace::Uniform, lookup.clone());
        b1.push("inner", inner.clone().into()).unwrap();
        b1.finalize();

        assert_eq!(lookup.borrow().len(), 1);

        let mut b2 = StructLayoutBuilder::with_lookup(AddressSpace::Uniform, lookup.clone());
        b2.push("inner", inner.into()).unwrap();
        b2.finalize();

        assert_eq!(lookup.borrow().len(), 1);
    }

    #[test]
    fn force_alignment_to_pads_with_floats() {
        let mut b = StructLayoutBuilder::new(AddressSpace::Storage);
        b.push("a", Types::FLOAT.into()).unwrap();
        let padding = b.force_alignment_to(64).unwrap().unwrap();
        assert_eq!(b.current_layout().array_stride(), 64);
        assert_eq!(padding.size, 60);
    }
}
