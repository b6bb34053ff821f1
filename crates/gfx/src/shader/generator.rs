//! Composes a list of [`EntryPoint`]s into one WGSL module: stage I/O
//! structs, buffer/texture globals, and the two `@vertex`/`@fragment`
//! entry functions.

use std::collections::BTreeMap;

use crate::enums::Stage;
use crate::mesh_format::MeshFormat;
use crate::shader::block::BlockPtr;
use crate::shader::entry_point::{sort_entry_points, EntryPoint};
use crate::shader::struct_layout::AddressSpace;
use crate::shader::textures::{TextureBinding, TextureBindingLayout};
use crate::shader::types::{NumType, StructType, Type, Types};
use crate::shader::wgsl_mapping::{self, num_type_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    One,
    PerInstance,
    Dynamic,
    Fixed(usize),
}

#[derive(Debug, Clone)]
pub struct BufferDefinition {
    pub variable_name: String,
    pub layout: StructType,
    pub dimension: Dimension,
}

impl BufferDefinition {
    pub fn find_field(&self, name: &str) -> Option<&crate::shader::types::StructField> {
        self.layout.find_field(name)
    }
}

/// The binding record the pipeline builder maintains for one declared
/// buffer, across both the coarse and optimized layout passes.
#[derive(Debug, Clone)]
pub struct BufferBinding {
    pub name: String,
    pub bind_group: usize,
    pub binding: usize,
    pub address_space: AddressSpace,
    pub struct_type: StructType,
    pub optimized_struct_layout: Option<crate::shader::struct_layout::StructLayout>,
    pub dimension: Dimension,
    pub has_dynamic_offset: bool,
    pub unused: bool,
}

#[derive(Debug, Clone)]
pub struct GeneratorError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoAttribute {
    Location(u32),
    Builtin(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct IoField {
    pub ty: NumType,
    pub attribute: IoAttribute,
}

#[derive(Debug, Clone, Default)]
pub struct GeneratorDefinitions {
    pub buffers: BTreeMap<String, BufferDefinition>,
    pub textures: BTreeMap<String, TextureBinding>,
    pub inputs: BTreeMap<String, IoField>,
    pub outputs: BTreeMap<String, IoField>,
    pub globals: BTreeMap<String, NumType>,
}

/// The surface blocks use to emit code. Implemented by [`EmitContext`] (the
/// real generator) and by [`super::indexer::IndexerContext`] (a
/// write-discarding walk that records usage instead).
pub trait GeneratorContext {
    fn write(&mut self, s: &str);
    fn push_header_scope(&mut self);
    fn pop_header_scope(&mut self);

    fn has_input(&self, name: &str) -> bool;
    fn read_input(&mut self, name: &str);

    fn has_output(&self, name: &str) -> bool;
    fn write_output(&mut self, name: &str, ty: NumType);

    fn has_texture(&self, name: &str) -> bool;
    fn texture(&mut self, name: &str);
    fn texture_default_texcoord(&mut self, name: &str);
    fn texture_default_sampler(&mut self, name: &str);

    fn read_buffer(&mut self, field_name: &str, ty: NumType, buffer_name: &str, index: Option<&BlockPtr>);
    fn ref_buffer(&mut self, buffer_name: &str);

    fn begin_write_global(&mut self, name: &str, ty: NumType);
    fn end_write_global(&mut self);
    fn read_global(&mut self, name: &str);

    fn push_error(&mut self, err: GeneratorError);
    fn generate_temp_variable(&mut self) -> String;

    fn definitions(&self) -> &GeneratorDefinitions;
}

fn builtin_dynamic_input(stage: Stage, name: &str) -> Option<IoField> {
    match (stage, name) {
        (Stage::Vertex, "vertex_index") => Some(IoField { ty: Types::UINT32, attribute: IoAttribute::Builtin("vertex_index") }),
        (Stage::Fragment, "position") => Some(IoField { ty: Types::FLOAT4, attribute: IoAttribute::Builtin("position") }),
        _ => None,
    }
}

fn builtin_dynamic_output(stage: Stage, name: &str, ty: NumType) -> Option<IoField> {
    match (stage, name) {
        (Stage::Vertex, "position") => Some(IoField { ty, attribute: IoAttribute::Builtin("position") }),
        (Stage::Fragment, "depth") => Some(IoField { ty, attribute: IoAttribute::Builtin("frag_depth") }),
        _ => None,
    }
}

/// Concrete, text-emitting [`GeneratorContext`] for one stage.
pub struct EmitContext {
    stage: Stage,
    prefix: &'static str,
    body: String,
    header: String,
    header_depth: u32,
    definitions: GeneratorDefinitions,
    can_add_outputs: bool,
    errors: Vec<GeneratorError>,
    temp_counter: u32,
}

impl EmitContext {
    pub fn new(stage: Stage, definitions: GeneratorDefinitions, can_add_outputs: bool) -> Self {
        let prefix = match stage {
            Stage::Vertex => "vertex",
            Stage::Fragment => "fragment",
        };
        Self {
            stage,
            prefix,
            body: String::new(),
            header: String::new(),
            header_depth: 0,
            definitions,
            can_add_outputs,
            errors: Vec::new(),
            temp_counter: 0,
        }
    }

    pub fn input_var(&self) -> String {
        format!("{}_in", self.prefix)
    }
    pub fn output_var(&self) -> String {
        format!("{}_out", self.prefix)
    }
    pub fn globals_var(&self) -> String {
        format!("{}_globals", self.prefix)
    }
    pub fn instance_index_var(&self) -> String {
        format!("{}_u_instance_index", self.prefix)
    }

    pub fn into_parts(self) -> (String, String, GeneratorDefinitions, Vec<GeneratorError>) {
        (self.body, self.header, self.definitions, self.errors)
    }

    fn next_free_location(attrs: impl Iterator<Item = IoAttribute>) -> u32 {
        attrs
            .filter_map(|a| match a {
                IoAttribute::Location(n) => Some(n + 1),
                IoAttribute::Builtin(_) => None,
            })
            .max()
            .unwrap_or(0)
    }
}

impl GeneratorContext for EmitContext {
    fn write(&mut self, s: &str) {
        if self.header_depth > 0 {
            self.header.push_str(s);
        } else {
            self.body.push_str(s);
        }
    }

    fn push_header_scope(&mut self) {
        self.header_depth += 1;
    }
    fn pop_header_scope(&mut self) {
        self.header_depth = self.header_depth.saturating_sub(1);
    }

    fn has_input(&self, name: &str) -> bool {
        self.definitions.inputs.contains_key(name)
    }

    fn read_input(&mut self, name: &str) {
        if !self.definitions.inputs.contains_key(name) {
            match builtin_dynamic_input(self.stage, name) {
                Some(field) => {
                    self.definitions.inputs.insert(name.to_string(), field);
                }
                None => {
                    self.errors.push(GeneratorError(format!("unknown input `{name}`")));
                    return;
                }
            }
        }
        let var = self.input_var();
        self.write(&format!("{}.{}", var, wgsl_mapping::sanitize_identifier(name)));
    }

    fn has_output(&self, name: &str) -> bool {
        self.definitions.outputs.contains_key(name)
    }

    fn write_output(&mut self, name: &str, ty: NumType) {
        match self.definitions.outputs.get(name).copied() {
            Some(existing) if existing.ty == ty => {}
            Some(_) => {
                self.errors.push(GeneratorError(format!("output `{name}` redeclared with a different type")));
                return;
            }
            None => {
                let field = builtin_dynamic_output(self.stage, name, ty).unwrap_or_else(|| {
                    let loc = Self::next_free_location(self.definitions.outputs.values().map(|f| f.attribute));
                    IoField { ty, attribute: IoAttribute::Location(loc) }
                });
                if !self.can_add_outputs && !matches!(field.attribute, IoAttribute::Builtin(_)) {
                    self.errors.push(GeneratorError(format!("unknown output `{name}`")));
                    return;
                }
                self.definitions.outputs.insert(name.to_string(), field);
            }
        }
        let var = self.output_var();
        self.write(&format!("{}.{}", var, wgsl_mapping::sanitize_identifier(name)));
    }

    fn has_texture(&self, name: &str) -> bool {
        self.definitions.textures.contains_key(name)
    }

    fn texture(&mut self, name: &str) {
        if !self.has_texture(name) {
            self.errors.push(GeneratorError(format!("unknown texture `{name}`")));
            return;
        }
        self.write(&format!("t_{}", wgsl_mapping::sanitize_identifier(name)));
    }

    fn texture_default_texcoord(&mut self, name: &str) {
        let Some(binding) = self.definitions.textures.get(name).cloned() else {
            self.errors.push(GeneratorError(format!("unknown texture `{name}`")));
            return;
        };
        self.read_input(&binding.default_texcoord_name.clone());
    }

    fn texture_default_sampler(&mut self, name: &str) {
        if !self.has_texture(name) {
            self.errors.push(GeneratorError(format!("unknown texture `{name}`")));
            return;
        }
        self.write(&format!("s_{}", wgsl_mapping::sanitize_identifier(name)));
    }

    fn read_buffer(&mut self, field_name: &str, ty: NumType, buffer_name: &str, index: Option<&BlockPtr>) {
        let Some(buf) = self.definitions.buffers.get(buffer_name).cloned() else {
            self.errors.push(GeneratorError(format!("unknown buffer `{buffer_name}`")));
            return;
        };
        let Some(field) = buf.find_field(field_name) else {
            self.errors.push(GeneratorError(format!("buffer `{buffer_name}` has no field `{field_name}`")));
            return;
        };
        if field.ty != Type::Num(ty) {
            self.errors.push(GeneratorError(format!(
                "field `{buffer_name}.{field_name}` type mismatch: expected {:?}",
                field.ty
            )));
            return;
        }
        let sanitized = wgsl_mapping::sanitize_identifier(field_name);
        match buf.dimension {
            Dimension::One => self.write(&format!("{}.{}", buf.variable_name, sanitized)),
            Dimension::PerInstance => {
                let idx = self.instance_index_var();
                self.write(&format!("{}.elements[{}].{}", buf.variable_name, idx, sanitized));
            }
            Dimension::Dynamic | Dimension::Fixed(_) => {
                self.write(&format!("{}.elements[", buf.variable_name));
                match index {
                    Some(idx_block) => idx_block.apply(self),
                    None => self.errors.push(GeneratorError(format!("buffer `{buffer_name}` access requires an index"))),
                }
                self.write(&format!("].{}", sanitized));
            }
        }
    }

    fn ref_buffer(&mut self, buffer_name: &str) {
        let Some(buf) = self.definitions.buffers.get(buffer_name) else {
            self.errors.push(GeneratorError(format!("unknown buffer `{buffer_name}`")));
            return;
        };
        self.write(&buf.variable_name.clone());
    }

    fn begin_write_global(&mut self, name: &str, ty: NumType) {
        self.definitions.globals.entry(name.to_string()).or_insert(ty);
        let var = self.globals_var();
        self.write(&format!("{}.{} = ", var, wgsl_mapping::sanitize_identifier(name)));
    }

    fn end_write_global(&mut self) {
        self.write(";\n");
    }

    fn read_global(&mut self, name: &str) {
        if !self.definitions.globals.contains_key(name) {
            self.errors.push(GeneratorError(format!("unknown global `{name}`")));
            return;
        }
        let var = self.globals_var();
        self.write(&format!("{}.{}", var, wgsl_mapping::sanitize_identifier(name)));
    }

    fn push_error(&mut self, err: GeneratorError) {
        self.errors.push(err);
    }

    fn generate_temp_variable(&mut self) -> String {
        self.temp_counter += 1;
        format!("temp_{}", self.temp_counter)
    }

    fn definitions(&self) -> &GeneratorDefinitions {
        &self.definitions
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeneratorOutput {
    pub wgsl: String,
    pub errors: Vec<GeneratorError>,
}

impl GeneratorOutput {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Everything the generator needs to know about the fixed (non-feature)
/// surface of a pipeline variant: vertex attributes and fragment outputs.
#[derive(Default)]
pub struct Generator {
    pub buffer_bindings: Vec<BufferBinding>,
    pub texture_binding_layout: TextureBindingLayout,
    pub mesh_format: MeshFormat,
    pub output_fields: Vec<(String, NumType)>,
    pub depth_output_name: Option<String>,
}

impl Generator {
    pub(crate) fn seed_definitions(&self) -> (GeneratorDefinitions, GeneratorDefinitions) {
        let mut vertex_defs = GeneratorDefinitions::default();
        let mut fragment_defs = GeneratorDefinitions::default();

        for (loc, attr) in self.mesh_format.attributes.iter().enumerate() {
            vertex_defs.inputs.insert(
                attr.name.clone(),
                IoField { ty: NumType::new(attr.storage_type.base_type(), attr.num_components), attribute: IoAttribute::Location(loc as u32) },
            );
        }
        vertex_defs
            .inputs
            .insert("instanceIndex".to_string(), IoField { ty: Types::UINT32, attribute: IoAttribute::Builtin("instance_index") });
        vertex_defs
            .outputs
            .insert("instanceIndex".to_string(), IoField { ty: Types::UINT32, attribute: IoAttribute::Location(0) });

        for binding in &self.buffer_bindings {
            if binding.unused {
                continue;
            }
            let def = BufferDefinition {
                variable_name: binding.name.clone(),
                layout: binding.struct_type.clone(),
                dimension: binding.dimension,
            };
            vertex_defs.buffers.insert(binding.name.clone(), def.clone());
            fragment_defs.buffers.insert(binding.name.clone(), def);
        }

        for tex in &self.texture_binding_layout.bindings {
            vertex_defs.textures.insert(tex.name.clone(), tex.clone());
            fragment_defs.textures.insert(tex.name.clone(), tex.clone());
        }

        for (i, (name, ty)) in self.output_fields.iter().enumerate() {
            fragment_defs.outputs.insert(name.clone(), IoField { ty: *ty, attribute: IoAttribute::Location(i as u32) });
        }

        (vertex_defs, fragment_defs)
    }

    fn run_stage(
        &self,
        stage: Stage,
        entry_points: &[&EntryPoint],
        definitions: GeneratorDefinitions,
        can_add_outputs: bool,
        strict_sort: bool,
    ) -> Result<(String, GeneratorDefinitions, Vec<GeneratorError>), crate::error::GfxError> {
        let sorted = sort_entry_points(entry_points, strict_sort)?;

        let mut ctx = EmitContext::new(stage, definitions, can_add_outputs);
        let mut function_bodies = String::new();
        let mut call_sites = String::new();

        for (i, ep) in sorted.iter().enumerate() {
            let fn_name = format!("entryPoint_{}_{}", ctx.prefix, i);
            ctx.write(&format!("fn {fn_name}() {{\n"));
            ep.code.apply(&mut ctx);
            ctx.write("}\n");
            call_sites.push_str(&format!("    {fn_name}();\n"));
        }
        function_bodies.push_str(&ctx.body);
        ctx.body.clear();
        ctx.body.push_str(&function_bodies);

        let instance_index_var = ctx.instance_index_var();
        let input_var = ctx.input_var();
        let output_var = ctx.output_var();
        let globals_var = ctx.globals_var();
        let prefix = ctx.prefix;

        let (mut body, header, definitions, errors) = ctx.into_parts();

        let mut preface = String::new();
        preface.push_str(&format!("var<private> {instance_index_var}: u32;\n"));
        if !definitions.globals.is_empty() {
            preface.push_str(&format!("struct {prefix}_globals_t {{\n"));
            for (name, ty) in &definitions.globals {
                preface.push_str(&format!("    {}: {},\n", wgsl_mapping::sanitize_identifier(name), num_type_name(ty)));
            }
            preface.push_str("}\n");
            preface.push_str(&format!("var<private> {globals_var}: {prefix}_globals_t;\n"));
        }

        let wrapper = stage_wrapper(stage, prefix, &input_var, &output_var, &instance_index_var, &call_sites);
        preface.push_str(&stage_io_structs(prefix, &input_var, &output_var, &definitions));
        preface.push_str(&header);
        body.push_str(&wrapper);

        Ok((format!("{preface}{body}"), definitions, errors))
    }

    /// Runs the full emission pipeline for both stages and returns the
    /// concatenated WGSL module plus any collected errors.
    pub fn build(&self, entry_points: &[EntryPoint]) -> Result<GeneratorOutput, crate::error::GfxError> {
        let (vertex_defs, mut fragment_defs) = self.seed_definitions();

        let vertex_eps: Vec<&EntryPoint> = entry_points.iter().filter(|e| e.stage == Stage::Vertex).collect();
        let fragment_eps: Vec<&EntryPoint> = entry_points.iter().filter(|e| e.stage == Stage::Fragment).collect();

        let (vertex_wgsl, vertex_out_defs, mut errors) = self.run_stage(Stage::Vertex, &vertex_eps, vertex_defs, true, false)?;

        // Interpolate vertex outputs into fragment inputs, forwarding instanceIndex.
        // `position` is the one builtin allowed to cross the stage boundary (as
        // `@builtin(position)`); any other builtin vertex output (there are none
        // today besides `instanceIndex`, which is a plain location) is not an
        // interpolant and is dropped rather than forwarded.
        for (name, field) in &vertex_out_defs.outputs {
            match field.attribute {
                IoAttribute::Builtin("position") => {
                    fragment_defs.inputs.insert(name.clone(), IoField { ty: field.ty, attribute: IoAttribute::Builtin("position") });
                }
                IoAttribute::Builtin(_) => {}
                IoAttribute::Location(_) => {
                    fragment_defs.inputs.insert(name.clone(), IoField { ty: field.ty, attribute: IoAttribute::Location(0) });
                }
            }
        }
        reassign_dense_locations(&mut fragment_defs.inputs);

        let (fragment_wgsl, _fragment_out_defs, fragment_errors) =
            self.run_stage(Stage::Fragment, &fragment_eps, fragment_defs, false, false)?;
        errors.extend(fragment_errors);

        let mut buffer_decls = String::new();
        let mut seen = std::collections::BTreeSet::new();
        for binding in &self.buffer_bindings {
            if binding.unused || !seen.insert(binding.name.clone()) {
                continue;
            }
            buffer_decls.push_str(&buffer_declaration(binding));
        }

        let mut texture_decls = String::new();
        for tex in &self.texture_binding_layout.bindings {
            texture_decls.push_str(&texture_declaration(tex));
        }

        let wgsl = format!("{buffer_decls}{texture_decls}{vertex_wgsl}{fragment_wgsl}");
        Ok(GeneratorOutput { wgsl, errors })
    }

    /// Walks the same AST as [`Self::build`] with a write-discarding
    /// context, recording which buffer fields, textures, and fragment
    /// outputs are actually referenced.
    pub fn index_bindings(
        &self,
        entry_points: &[EntryPoint],
    ) -> Result<crate::shader::indexer::IndexedBindings, crate::error::GfxError> {
        crate::shader::indexer::index_bindings(self, entry_points)
    }
}

fn reassign_dense_locations(fields: &mut BTreeMap<String, IoField>) {
    let mut next = 0u32;
    let mut names: Vec<String> = fields.keys().cloned().collect();
    names.sort();
    for name in names {
        if let Some(field) = fields.get_mut(&name) {
            if let IoAttribute::Location(_) = field.attribute {
                field.attribute = IoAttribute::Location(next);
                next += 1;
            }
        }
    }
}

fn field_type_name(ty: &Type) -> String {
    match ty {
        Type::Num(n) => num_type_name(n),
        Type::Array(a) => {
            let elem = field_type_name(a.element_type());
            match a.fixed_length() {
                Some(n) => format!("array<{elem}, {n}>"),
                None => format!("array<{elem}>"),
            }
        }
        other => format!("{other:?}"),
    }
}

fn buffer_struct_fields(struct_type: &StructType) -> String {
    let mut out = String::new();
    for field in struct_type.entries() {
        out.push_str(&format!("    {}: {},\n", wgsl_mapping::sanitize_identifier(&field.name), field_type_name(&field.ty)));
    }
    out
}

fn buffer_declaration(binding: &BufferBinding) -> String {
    let mut out = String::new();
    let elem_type_name = format!("{}_t", binding.name);
    out.push_str(&format!("struct {elem_type_name} {{\n{}}}\n", buffer_struct_fields(&binding.struct_type)));

    let var_type = match binding.dimension {
        Dimension::One => elem_type_name.clone(),
        Dimension::PerInstance | Dimension::Dynamic => {
            let container = format!("{}_container_t", binding.name);
            out.push_str(&format!("struct {container} {{\n    elements: array<{elem_type_name}>,\n}}\n"));
            container
        }
        Dimension::Fixed(n) => {
            let container = format!("{}_container_t", binding.name);
            out.push_str(&format!("struct {container} {{\n    elements: array<{elem_type_name}, {n}>,\n}}\n"));
            container
        }
    };

    let space = wgsl_mapping::address_space_keyword(binding.address_space);
    out.push_str(&format!(
        "@group({}) @binding({}) var<{}> {}: {};\n",
        binding.bind_group, binding.binding, space, binding.name, var_type
    ));
    out
}

fn texture_declaration(tex: &TextureBinding) -> String {
    let dim = match tex.ty.dimension {
        crate::enums::TextureDimension::D1 => "texture_1d",
        crate::enums::TextureDimension::D2 => "texture_2d",
        crate::enums::TextureDimension::Cube => "texture_cube",
    };
    let scalar = match tex.ty.sample_type {
        crate::enums::TextureSampleType::Depth => return texture_depth_declaration(tex),
        crate::enums::TextureSampleType::Int => "i32",
        crate::enums::TextureSampleType::UInt => "u32",
        _ => "f32",
    };
    format!(
        "@group(0) @binding({}) var t_{}: {}<{}>;\n@group(0) @binding({}) var s_{}: sampler;\n",
        tex.binding,
        wgsl_mapping::sanitize_identifier(&tex.name),
        dim,
        scalar,
        tex.default_sampler_binding,
        wgsl_mapping::sanitize_identifier(&tex.name),
    )
}

fn texture_depth_declaration(tex: &TextureBinding) -> String {
    format!(
        "@group(0) @binding({}) var t_{}: texture_depth_2d;\n@group(0) @binding({}) var s_{}: sampler_comparison;\n",
        tex.binding,
        wgsl_mapping::sanitize_identifier(&tex.name),
        tex.default_sampler_binding,
        wgsl_mapping::sanitize_identifier(&tex.name),
    )
}

fn stage_io_structs(prefix: &str, input_var: &str, output_var: &str, defs: &GeneratorDefinitions) -> String {
    let mut out = String::new();
    out.push_str(&format!("struct {prefix}_input_t {{\n"));
    for (name, field) in &defs.inputs {
        out.push_str(&format!("    {}: {}{},\n", wgsl_mapping::sanitize_identifier(name), io_attribute(field.attribute), num_type_name(&field.ty)));
    }
    out.push_str("}\n");
    out.push_str(&format!("var<private> {input_var}: {prefix}_input_t;\n"));

    out.push_str(&format!("struct {prefix}_output_t {{\n"));
    for (name, field) in &defs.outputs {
        let interp = if field.ty.base_type.is_integer() { "@interpolate(flat) " } else { "" };
        out.push_str(&format!(
            "    {}{}: {}{},\n",
            interp,
            wgsl_mapping::sanitize_identifier(name),
            io_attribute(field.attribute),
            num_type_name(&field.ty)
        ));
    }
    out.push_str("}\n");
    out.push_str(&format!("var<private> {output_var}: {prefix}_output_t;\n"));
    out
}

fn io_attribute(attr: IoAttribute) -> String {
    match attr {
        IoAttribute::Location(n) => format!("@location({n}) "),
        IoAttribute::Builtin(name) => format!("@builtin({name}) "),
    }
}

fn stage_wrapper(stage: Stage, prefix: &str, input_var: &str, output_var: &str, instance_index_var: &str, call_sites: &str) -> String {
    let stage_attr = match stage {
        Stage::Vertex => "@vertex",
        Stage::Fragment => "@fragment",
    };
    let fn_name = match stage {
        Stage::Vertex => "vertex_main",
        Stage::Fragment => "fragment_main",
    };

    let mut out = String::new();
    out.push_str(&format!("{stage_attr}\nfn {fn_name}(raw_in: {prefix}_input_t) -> {prefix}_output_t {{\n"));
    out.push_str(&format!("    {input_var} = raw_in;\n"));
    out.push_str(&format!("    {instance_index_var} = {input_var}.instanceIndex;\n"));
    if stage == Stage::Vertex {
        out.push_str(&format!("    {output_var}.instanceIndex = {input_var}.instanceIndex;\n"));
    }
    out.push_str(call_sites);
    out.push_str(&format!("    return {output_var};\n}}\n"));
    out
}
