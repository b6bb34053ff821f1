//! Walks the same entry-point AST the generator will later emit, recording
//! which buffer fields, textures and fragment outputs a pipeline variant
//! actually touches. Drives dead-field elimination before the real emission
//! pass: buffers/textures/fields nothing references are dropped or marked
//! unused rather than occupying a binding slot.
//!
//! Delegates to [`EmitContext`] for the actual WGSL-producing logic instead
//! of re-implementing it, so the two walks can't silently drift apart; the
//! emitted text is simply discarded once the walk completes.

use std::collections::{HashMap, HashSet};

use crate::enums::Stage;
use crate::error::GfxResult;
use crate::shader::block::BlockPtr;
use crate::shader::entry_point::EntryPoint;
use crate::shader::generator::{EmitContext, Generator, GeneratorContext, GeneratorDefinitions};
use crate::shader::types::NumType;

#[derive(Debug, Clone, Default)]
pub struct IndexedBindings {
    /// buffer name -> set of field names read by the shader
    pub used_buffer_fields: HashMap<String, HashSet<String>>,
    pub used_textures: HashSet<String>,
    pub written_fragment_outputs: HashSet<String>,
}

impl IndexedBindings {
    pub fn buffer_is_used(&self, buffer_name: &str) -> bool {
        self.used_buffer_fields.get(buffer_name).is_some_and(|f| !f.is_empty())
    }

    pub fn field_is_used(&self, buffer_name: &str, field_name: &str) -> bool {
        self.used_buffer_fields.get(buffer_name).is_some_and(|f| f.contains(field_name))
    }
}

pub struct IndexerContext {
    inner: EmitContext,
    stage: Stage,
    used_buffer_fields: HashMap<String, HashSet<String>>,
    used_textures: HashSet<String>,
    written_fragment_outputs: HashSet<String>,
}

impl IndexerContext {
    pub fn new(stage: Stage, definitions: GeneratorDefinitions, can_add_outputs: bool) -> Self {
        Self {
            inner: EmitContext::new(stage, definitions, can_add_outputs),
            stage,
            used_buffer_fields: HashMap::new(),
            used_textures: HashSet::new(),
            written_fragment_outputs: HashSet::new(),
        }
    }

    pub fn into_indexed(self) -> IndexedBindings {
        IndexedBindings {
            used_buffer_fields: self.used_buffer_fields,
            used_textures: self.used_textures,
            written_fragment_outputs: self.written_fragment_outputs,
        }
    }
}

impl GeneratorContext for IndexerContext {
    fn write(&mut self, s: &str) {
        self.inner.write(s);
    }

    fn push_header_scope(&mut self) {
        self.inner.push_header_scope();
    }
    fn pop_header_scope(&mut self) {
        self.inner.pop_header_scope();
    }

    fn has_input(&self, name: &str) -> bool {
        self.inner.has_input(name)
    }
    fn read_input(&mut self, name: &str) {
        self.inner.read_input(name);
    }

    fn has_output(&self, name: &str) -> bool {
        self.inner.has_output(name)
    }
    fn write_output(&mut self, name: &str, ty: NumType) {
        if self.stage == Stage::Fragment {
            self.written_fragment_outputs.insert(name.to_string());
        }
        self.inner.write_output(name, ty);
    }

    fn has_texture(&self, name: &str) -> bool {
        self.inner.has_texture(name)
    }
    fn texture(&mut self, name: &str) {
        self.used_textures.insert(name.to_string());
        self.inner.texture(name);
    }
    fn texture_default_texcoord(&mut self, name: &str) {
        self.inner.texture_default_texcoord(name);
    }
    fn texture_default_sampler(&mut self, name: &str) {
        self.used_textures.insert(name.to_string());
        self.inner.texture_default_sampler(name);
    }

    fn read_buffer(&mut self, field_name: &str, ty: NumType, buffer_name: &str, index: Option<&BlockPtr>) {
        self.used_buffer_fields.entry(buffer_name.to_string()).or_default().insert(field_name.to_string());
        self.inner.read_buffer(field_name, ty, buffer_name, index);
    }
    fn ref_buffer(&mut self, buffer_name: &str) {
        self.used_buffer_fields.entry(buffer_name.to_string()).or_default();
        self.inner.ref_buffer(buffer_name);
    }

    fn begin_write_global(&mut self, name: &str, ty: NumType) {
        self.inner.begin_write_global(name, ty);
    }
    fn end_write_global(&mut self) {
        self.inner.end_write_global();
    }
    fn read_global(&mut self, name: &str) {
        self.inner.read_global(name);
    }

    fn push_error(&mut self, err: crate::shader::generator::GeneratorError) {
        self.inner.push_error(err);
    }
    fn generate_temp_variable(&mut self) -> String {
        self.inner.generate_temp_variable()
    }

    fn definitions(&self) -> &GeneratorDefinitions {
        self.inner.definitions()
    }
}

/// Runs the indexing walk over both stages of `generator` and merges the
/// result into one [`IndexedBindings`].
pub fn index_bindings(generator: &Generator, entry_points: &[EntryPoint]) -> GfxResult<IndexedBindings> {
    let (vertex_defs, fragment_defs) = generator.seed_definitions();
    let mut merged = IndexedBindings::default();

    for (stage, can_add_outputs, definitions) in
        [(Stage::Vertex, true, vertex_defs), (Stage::Fragment, false, fragment_defs)]
    {
        let eps: Vec<&EntryPoint> = entry_points.iter().filter(|e| e.stage == stage).collect();
        let sorted = crate::shader::entry_point::sort_entry_points(&eps, false)?;

        let mut ctx = IndexerContext::new(stage, definitions, can_add_outputs);
        for ep in &sorted {
            ep.code.apply(&mut ctx);
        }
        let indexed = ctx.into_indexed();
        for (buffer, fields) in indexed.used_buffer_fields {
            merged.used_buffer_fields.entry(buffer).or_default().extend(fields);
        }
        merged.used_textures.extend(indexed.used_textures);
        merged.written_fragment_outputs.extend(indexed.written_fragment_outputs);
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::blocks::ReadBuffer;
    use crate::shader::generator::BufferDefinition;
    use crate::shader::generator::Dimension;
    use crate::shader::types::{StructTypeBuilder, Types};
    use pretty_assertions::assert_eq;

    #[test]
    fn records_which_buffer_field_is_read() {
        let mut builder = StructTypeBuilder::new();
        builder.push("albedo", Types::FLOAT3.into()).unwrap();
        builder.push("roughness", Types::FLOAT.into()).unwrap();
        let struct_type = builder.build();

        let mut defs = GeneratorDefinitions::default();
        defs.buffers.insert(
            "material".to_string(),
            BufferDefinition { variable_name: "material".to_string(), layout: struct_type, dimension: Dimension::One },
        );

        let mut ctx = IndexerContext::new(Stage::Fragment, defs, false);
        ReadBuffer::new("albedo", Types::FLOAT3, "material", None).apply(&mut ctx);
        let indexed = ctx.into_indexed();

        assert!(indexed.field_is_used("material", "albedo"));
        assert!(!indexed.field_is_used("material", "roughness"));
    }

    #[test]
    fn textures_referenced_via_default_sampler_are_recorded() {
        use crate::shader::blocks::SampleTexture;
        use crate::shader::textures::TextureBinding;
        use crate::shader::types::TextureType;

        let mut defs = GeneratorDefinitions::default();
        defs.textures.insert(
            "albedo".to_string(),
            TextureBinding {
                name: "albedo".to_string(),
                ty: TextureType::new(crate::enums::TextureDimension::D2),
                default_texcoord_name: "texCoord0".to_string(),
                binding: 0,
                default_sampler_binding: 1,
            },
        );
        defs.inputs.insert(
            "texCoord0".to_string(),
            crate::shader::generator::IoField { ty: Types::FLOAT2, attribute: crate::shader::generator::IoAttribute::Location(0) },
        );

        let mut ctx = IndexerContext::new(Stage::Fragment, defs, false);
        SampleTexture::new("albedo").apply(&mut ctx);
        let indexed = ctx.into_indexed();
        assert!(indexed.used_textures.contains("albedo"));
    }
}
