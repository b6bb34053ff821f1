//! Concrete [`Block`] kinds. Features compose these into entry-point bodies;
//! see [`super::generator::GeneratorContext`] for what each one can do.

use std::sync::Arc;

use crate::shader::block::{Block, BlockPtr};
use crate::shader::generator::GeneratorContext;
use crate::shader::types::NumType;

/// Emits a fixed string of WGSL verbatim.
pub struct Direct(String);

impl Direct {
    pub fn new(text: impl Into<String>) -> BlockPtr {
        Arc::new(Self(text.into()))
    }
}

impl Block for Direct {
    fn apply(&self, ctx: &mut dyn GeneratorContext) {
        ctx.write(&self.0);
    }
}

/// Applies a sequence of blocks in order.
pub struct Compound(Vec<BlockPtr>);

impl Compound {
    pub fn new(children: Vec<BlockPtr>) -> BlockPtr {
        Arc::new(Self(children))
    }
}

impl Block for Compound {
    fn apply(&self, ctx: &mut dyn GeneratorContext) {
        for child in &self.0 {
            child.apply(ctx);
        }
    }
}

/// Relocates everything the wrapped block writes into the current header
/// scope (declarations, helper functions) instead of the entry-point body.
pub struct Header(BlockPtr);

impl Header {
    pub fn new(inner: BlockPtr) -> BlockPtr {
        Arc::new(Self(inner))
    }
}

impl Block for Header {
    fn apply(&self, ctx: &mut dyn GeneratorContext) {
        ctx.push_header_scope();
        self.0.apply(ctx);
        ctx.pop_header_scope();
    }
}

/// Applies the wrapped block only if `name` is an available stage input.
/// Lets a feature reference an optional input without erroring when it's
/// missing from a given pipeline variant.
pub struct WithInput {
    name: String,
    inner: BlockPtr,
}

impl WithInput {
    pub fn new(name: impl Into<String>, inner: BlockPtr) -> BlockPtr {
        Arc::new(Self { name: name.into(), inner })
    }
}

impl Block for WithInput {
    fn apply(&self, ctx: &mut dyn GeneratorContext) {
        if ctx.has_input(&self.name) {
            self.inner.apply(ctx);
        }
    }
}

/// Applies the wrapped block only if `name` is an already-declared output.
pub struct WithOutput {
    name: String,
    inner: BlockPtr,
}

impl WithOutput {
    pub fn new(name: impl Into<String>, inner: BlockPtr) -> BlockPtr {
        Arc::new(Self { name: name.into(), inner })
    }
}

impl Block for WithOutput {
    fn apply(&self, ctx: &mut dyn GeneratorContext) {
        if ctx.has_output(&self.name) {
            self.inner.apply(ctx);
        }
    }
}

/// Applies the wrapped block only if `name` is a bound texture.
pub struct WithTexture {
    name: String,
    inner: BlockPtr,
}

impl WithTexture {
    pub fn new(name: impl Into<String>, inner: BlockPtr) -> BlockPtr {
        Arc::new(Self { name: name.into(), inner })
    }
}

impl Block for WithTexture {
    fn apply(&self, ctx: &mut dyn GeneratorContext) {
        if ctx.has_texture(&self.name) {
            self.inner.apply(ctx);
        }
    }
}

/// Emits a reference to a stage input field, e.g. `in.texCoord0`.
pub struct ReadInput(String);

impl ReadInput {
    pub fn new(name: impl Into<String>) -> BlockPtr {
        Arc::new(Self(name.into()))
    }
}

impl Block for ReadInput {
    fn apply(&self, ctx: &mut dyn GeneratorContext) {
        ctx.read_input(&self.0);
    }
}

/// Emits `out.name = <value>;`, declaring the output field if the stage
/// allows new outputs to be added.
pub struct WriteOutput {
    name: String,
    ty: NumType,
    value: BlockPtr,
}

impl WriteOutput {
    pub fn new(name: impl Into<String>, ty: NumType, value: BlockPtr) -> BlockPtr {
        Arc::new(Self { name: name.into(), ty, value })
    }
}

impl Block for WriteOutput {
    fn apply(&self, ctx: &mut dyn GeneratorContext) {
        ctx.write_output(&self.name, self.ty);
        ctx.write(" = ");
        self.value.apply(ctx);
        ctx.write(";\n");
    }
}

/// Emits `globals.name = <value>;`, declaring the global on first write.
pub struct WriteGlobal {
    name: String,
    ty: NumType,
    value: BlockPtr,
}

impl WriteGlobal {
    pub fn new(name: impl Into<String>, ty: NumType, value: BlockPtr) -> BlockPtr {
        Arc::new(Self { name: name.into(), ty, value })
    }
}

impl Block for WriteGlobal {
    fn apply(&self, ctx: &mut dyn GeneratorContext) {
        ctx.begin_write_global(&self.name, self.ty);
        self.value.apply(ctx);
        ctx.end_write_global();
    }
}

/// Emits a reference to a previously-written global, e.g. `globals.litColor`.
pub struct ReadGlobal(String);

impl ReadGlobal {
    pub fn new(name: impl Into<String>) -> BlockPtr {
        Arc::new(Self(name.into()))
    }
}

impl Block for ReadGlobal {
    fn apply(&self, ctx: &mut dyn GeneratorContext) {
        ctx.read_global(&self.0);
    }
}

/// Emits a reference to one field of a declared buffer, indexed by `index`
/// when the buffer's dimension requires an explicit element index.
pub struct ReadBuffer {
    field_name: String,
    ty: NumType,
    buffer_name: String,
    index: Option<BlockPtr>,
}

impl ReadBuffer {
    pub fn new(field_name: impl Into<String>, ty: NumType, buffer_name: impl Into<String>, index: Option<BlockPtr>) -> BlockPtr {
        Arc::new(Self { field_name: field_name.into(), ty, buffer_name: buffer_name.into(), index })
    }
}

impl Block for ReadBuffer {
    fn apply(&self, ctx: &mut dyn GeneratorContext) {
        ctx.read_buffer(&self.field_name, self.ty, &self.buffer_name, self.index.as_ref());
    }
}

/// Emits a reference to the buffer variable itself, e.g. for passing a
/// whole row to a helper function.
pub struct RefBuffer(String);

impl RefBuffer {
    pub fn new(buffer_name: impl Into<String>) -> BlockPtr {
        Arc::new(Self(buffer_name.into()))
    }
}

impl Block for RefBuffer {
    fn apply(&self, ctx: &mut dyn GeneratorContext) {
        ctx.ref_buffer(&self.0);
    }
}

/// Emits `textureSample(t_name, s_name, in.<default texcoord>)`.
pub struct SampleTexture(String);

impl SampleTexture {
    pub fn new(name: impl Into<String>) -> BlockPtr {
        Arc::new(Self(name.into()))
    }
}

impl Block for SampleTexture {
    fn apply(&self, ctx: &mut dyn GeneratorContext) {
        ctx.write("textureSample(");
        ctx.texture(&self.0);
        ctx.write(", ");
        ctx.texture_default_sampler(&self.0);
        ctx.write(", ");
        ctx.texture_default_texcoord(&self.0);
        ctx.write(")");
    }
}

/// Converts a non-linear depth value (e.g. sampled from a depth texture)
/// into view-space linear depth given the camera's near/far planes.
pub struct LinearizeDepth {
    value: BlockPtr,
    near: f32,
    far: f32,
}

impl LinearizeDepth {
    pub fn new(value: BlockPtr, near: f32, far: f32) -> BlockPtr {
        Arc::new(Self { value, near, far })
    }
}

impl Block for LinearizeDepth {
    fn apply(&self, ctx: &mut dyn GeneratorContext) {
        ctx.write(&format!("(({0} * {1}) / ({1} - (", self.near, self.far));
        self.value.apply(ctx);
        ctx.write(&format!(") * ({} - {})))", self.far, self.near));
    }
}

/// Forwards a stage input straight through as a same-named, same-typed
/// output. The common "pass this vertex attribute to the fragment stage
/// unmodified" varying.
pub struct DefaultInterpolation {
    name: String,
    ty: NumType,
}

impl DefaultInterpolation {
    pub fn new(name: impl Into<String>, ty: NumType) -> BlockPtr {
        Arc::new(Self { name: name.into(), ty })
    }
}

impl Block for DefaultInterpolation {
    fn apply(&self, ctx: &mut dyn GeneratorContext) {
        ctx.write_output(&self.name, self.ty);
        ctx.write(" = ");
        ctx.read_input(&self.name);
        ctx.write(";\n");
    }
}

/// Escape hatch for one-off generation logic that doesn't warrant its own
/// block type.
pub struct Custom<F: Fn(&mut dyn GeneratorContext) + Send + Sync>(F);

impl<F: Fn(&mut dyn GeneratorContext) + Send + Sync + 'static> Custom<F> {
    pub fn new(f: F) -> BlockPtr {
        Arc::new(Self(f))
    }
}

impl<F: Fn(&mut dyn GeneratorContext) + Send + Sync> Block for Custom<F> {
    fn apply(&self, ctx: &mut dyn GeneratorContext) {
        (self.0)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::Stage;
    use crate::shader::generator::{EmitContext, GeneratorContext, GeneratorDefinitions};
    use crate::shader::types::Types;
    use pretty_assertions::assert_eq;

    fn ctx(definitions: GeneratorDefinitions) -> EmitContext {
        EmitContext::new(Stage::Fragment, definitions, false)
    }

    #[test]
    fn direct_writes_verbatim_text() {
        let mut c = ctx(GeneratorDefinitions::default());
        Direct::new("1.0").apply(&mut c);
        let (body, _, _, errors) = c.into_parts();
        assert_eq!(body, "1.0");
        assert!(errors.is_empty());
    }

    #[test]
    fn compound_runs_children_in_order() {
        let mut c = ctx(GeneratorDefinitions::default());
        Compound::new(vec![Direct::new("a"), Direct::new("b")]).apply(&mut c);
        let (body, _, _, _) = c.into_parts();
        assert_eq!(body, "ab");
    }

    #[test]
    fn header_relocates_writes() {
        let mut c = ctx(GeneratorDefinitions::default());
        Header::new(Direct::new("fn helper() {}\n")).apply(&mut c);
        Direct::new("body();\n").apply(&mut c);
        let (body, header, _, _) = c.into_parts();
        assert_eq!(header, "fn helper() {}\n");
        assert_eq!(body, "body();\n");
    }

    #[test]
    fn with_input_is_a_noop_when_missing() {
        let mut c = ctx(GeneratorDefinitions::default());
        WithInput::new("missing", Direct::new("x")).apply(&mut c);
        let (body, _, _, errors) = c.into_parts();
        assert_eq!(body, "");
        assert!(errors.is_empty());
    }

    #[test]
    fn linearize_depth_emits_the_standard_formula() {
        let mut c = ctx(GeneratorDefinitions::default());
        LinearizeDepth::new(Direct::new("d"), 0.1, 100.0).apply(&mut c);
        let (body, _, _, _) = c.into_parts();
        assert_eq!(body, "((0.1 * 100) / (100 - (d) * (100 - 0.1)))");
    }

    #[test]
    fn write_output_declares_a_new_output_when_allowed() {
        let mut c = EmitContext::new(Stage::Vertex, GeneratorDefinitions::default(), true);
        WriteOutput::new("color", Types::FLOAT4, Direct::new("vec4<f32>(1.0)")).apply(&mut c);
        assert!(c.definitions().outputs.contains_key("color"));
    }
}
