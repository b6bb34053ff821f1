//! Texture binding declarations. A texture always occupies two adjacent
//! bind-group slots: the texture itself, then its default sampler.

use std::collections::HashMap;

use crate::error::{GfxError, GfxResult};
use crate::shader::types::TextureType;

#[derive(Debug, Clone)]
pub struct TextureBinding {
    pub name: String,
    pub ty: TextureType,
    pub default_texcoord_name: String,
    pub binding: usize,
    pub default_sampler_binding: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TextureBindingLayout {
    pub bindings: Vec<TextureBinding>,
}

impl TextureBindingLayout {
    pub fn find(&self, name: &str) -> Option<&TextureBinding> {
        self.bindings.iter().find(|b| b.name == name)
    }
}

#[derive(Default)]
pub struct TextureBindingLayoutBuilder {
    mapping: HashMap<String, usize>,
    layout: TextureBindingLayout,
}

impl TextureBindingLayoutBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares (or updates the default texcoord of) a texture slot. Fails
    /// if the texture is redeclared with an incompatible `TextureType`.
    pub fn add_or_update_slot(&mut self, name: &str, ty: TextureType, default_texcoord_name: &str) -> GfxResult<()> {
        if let Some(&idx) = self.mapping.get(name) {
            let binding = &mut self.layout.bindings[idx];
            if binding.ty != ty {
                return Err(GfxError::DuplicateField { name: name.to_string() });
            }
            binding.default_texcoord_name = default_texcoord_name.to_string();
        } else {
            let idx = self.layout.bindings.len();
            self.mapping.insert(name.to_string(), idx);
            self.layout.bindings.push(TextureBinding {
                name: name.to_string(),
                ty,
                default_texcoord_name: default_texcoord_name.to_string(),
                binding: 0,
                default_sampler_binding: 0,
            });
        }
        Ok(())
    }

    /// Updates the default texcoord of an already-declared slot; a no-op if
    /// the texture hasn't been declared.
    pub fn try_update_slot(&mut self, name: &str, default_texcoord_name: &str) {
        if let Some(&idx) = self.mapping.get(name) {
            self.layout.bindings[idx].default_texcoord_name = default_texcoord_name.to_string();
        }
    }

    /// Assigns dense (texture, sampler) slot pairs starting at
    /// `start_binding_index`, returning the layout and the next free index.
    pub fn finalize(mut self, start_binding_index: usize) -> (TextureBindingLayout, usize) {
        let mut next = start_binding_index;
        for binding in &mut self.layout.bindings {
            binding.binding = next;
            next += 1;
            binding.default_sampler_binding = next;
            next += 1;
        }
        (self.layout, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::TextureDimension;

    #[test]
    fn assigns_interleaved_texture_and_sampler_slots() {
        let mut b = TextureBindingLayoutBuilder::new();
        b.add_or_update_slot("albedo", TextureType::new(TextureDimension::D2), "texCoord0").unwrap();
        b.add_or_update_slot("normal", TextureType::new(TextureDimension::D2), "texCoord0").unwrap();
        let (layout, next) = b.finalize(1);
        assert_eq!(layout.bindings[0].binding, 1);
        assert_eq!(layout.bindings[0].default_sampler_binding, 2);
        assert_eq!(layout.bindings[1].binding, 3);
        assert_eq!(layout.bindings[1].default_sampler_binding, 4);
        assert_eq!(next, 5);
    }

    #[test]
    fn redefinition_with_different_type_fails() {
        let mut b = TextureBindingLayoutBuilder::new();
        b.add_or_update_slot("albedo", TextureType::new(TextureDimension::D2), "texCoord0").unwrap();
        let err = b.add_or_update_slot("albedo", TextureType::new(TextureDimension::Cube), "texCoord0").unwrap_err();
        assert!(matches!(err, GfxError::DuplicateField { .. }));
    }
}
