//! Builds one `wgpu::RenderPipeline` from an ordered list of [`Feature`]s, a
//! [`MeshFormat`] and a [`RenderTargetLayout`]: generates the WGSL module,
//! lays out its bind groups, and compiles the final pipeline object.
//!
//! Build sequence: seed the draw/view parameter buffers, collect feature
//! parameters and fixed-function state, fix the mesh/output-field surface,
//! flatten entry points, collect texture bindings, run a first (unoptimized)
//! shader generation to index which buffer fields and textures are actually
//! referenced, rebuild the draw/view layouts and texture set trimmed to that
//! usage, generate the final shader, and compile it.

use std::sync::{Arc, Weak};

use itertools::Itertools;

use crate::enums::pixel_format_output_type;
use crate::error::{GfxError, GfxResult};
use crate::feature::{Feature, FeatureGenerator, FeaturePipelineState, PipelineModifierContext, RequiredAttributes};
use crate::mesh_format::MeshFormat;
use crate::params::{BindGroupId, ParameterStorage};
use crate::render_target::RenderTargetLayout;
use crate::shader::entry_point::EntryPoint;
use crate::shader::generator::{BufferBinding, Generator};
use crate::shader::struct_layout::{AddressSpace, StructLayout, StructLayoutBuilder};
use crate::shader::textures::{TextureBindingLayout, TextureBindingLayoutBuilder};
use crate::shader::types::{NumType, StructType, StructTypeBuilder, Type};

#[derive(Debug, Clone)]
pub struct BuildPipelineOptions {
    pub label: Option<String>,
    pub strict_entry_point_ordering: bool,
}

impl Default for BuildPipelineOptions {
    fn default() -> Self {
        Self { label: None, strict_entry_point_ordering: false }
    }
}

pub struct PipelineBuilder {
    pub features: Vec<Arc<Feature>>,
    pub mesh_format: MeshFormat,
    pub render_target: RenderTargetLayout,
    pub options: BuildPipelineOptions,
}

/// A feature's per-view or per-object parameter generator, collected by the
/// pipeline builder together with weak references to the feature that
/// contributed it and every other feature in the same pipeline, so the
/// callback can read state from a sibling feature without keeping it alive.
#[derive(Clone)]
pub struct CachedFeatureGenerator {
    pub callback: Arc<dyn Fn(&mut ParameterStorage) + Send + Sync>,
    pub owning_feature: Weak<Feature>,
    pub other_features: Vec<Weak<Feature>>,
}

pub struct CachedPipeline {
    /// `None` when `compilation_error` is set: a recoverable shader-generation
    /// failure stops the build before any device pipeline object exists.
    pub pipeline: Option<wgpu::RenderPipeline>,
    pub bind_group_layouts: Vec<wgpu::BindGroupLayout>,
    pub draw_layout: StructLayout,
    pub view_layout: StructLayout,
    pub texture_binding_layout: TextureBindingLayout,
    pub base_draw_params: ParameterStorage,
    pub base_view_params: ParameterStorage,
    pub wgsl: String,
    /// Ordered list of buffer bindings that require a per-draw dynamic
    /// offset, for render-time code to supply offsets for in declaration order.
    pub dynamic_buffer_refs: Vec<String>,
    pub per_view_generators: Vec<CachedFeatureGenerator>,
    pub per_object_generators: Vec<CachedFeatureGenerator>,
    /// Populated instead of building a pipeline when shader generation fails.
    pub compilation_error: Option<String>,
}

impl CachedPipeline {
    fn from_compilation_error(message: String) -> Self {
        Self {
            pipeline: None,
            bind_group_layouts: Vec::new(),
            draw_layout: StructLayout::default(),
            view_layout: StructLayout::default(),
            texture_binding_layout: TextureBindingLayout::default(),
            base_draw_params: ParameterStorage::default(),
            base_view_params: ParameterStorage::default(),
            wgsl: String::new(),
            dynamic_buffer_refs: Vec::new(),
            per_view_generators: Vec::new(),
            per_object_generators: Vec::new(),
            compilation_error: Some(message),
        }
    }
}

const DRAW_GROUP: usize = 0;
const VIEW_GROUP: usize = 1;
const TEXTURE_GROUP: usize = 2;

/// `force_alignment`, when set, pads the struct's stride up to a dynamic
/// buffer offset's required alignment, appending an `_struct_padding_` tail
/// field to both the declared struct type and its byte layout.
fn build_struct(fields: &[(String, NumType)], space: AddressSpace, force_alignment: Option<usize>) -> GfxResult<(StructType, StructLayout)> {
    let mut type_builder = StructTypeBuilder::new();
    let mut layout_builder = StructLayoutBuilder::new(space);
    for (name, ty) in fields {
        type_builder.push(name.clone(), Type::Num(*ty))?;
        layout_builder.push(name.clone(), Type::Num(*ty))?;
    }
    if let Some(alignment) = force_alignment {
        if let Some(padding) = layout_builder.force_alignment_to(alignment)? {
            type_builder.push("_struct_padding_", padding.ty.clone())?;
        }
    }
    Ok((type_builder.build(), layout_builder.finalize()))
}

impl PipelineBuilder {
    pub fn new(mesh_format: MeshFormat, render_target: RenderTargetLayout) -> Self {
        Self { features: Vec::new(), mesh_format, render_target, options: BuildPipelineOptions::default() }
    }

    pub fn with_feature(mut self, feature: Arc<Feature>) -> Self {
        self.features.push(feature);
        self
    }

    fn combined_pipeline_state(&self) -> FeaturePipelineState {
        self.features.iter().fold(FeaturePipelineState::default(), |acc, f| acc.combine(&f.pipeline_state))
    }

    fn combined_required_attributes(&self) -> RequiredAttributes {
        self.features.iter().fold(RequiredAttributes::default(), |acc, f| acc.combine(&f.required_attributes))
    }

    fn param_fields(&self, group: BindGroupId) -> GfxResult<Vec<(String, NumType)>> {
        let mut fields: Vec<(String, NumType)> = Vec::new();
        for feature in &self.features {
            for decl in &feature.num_params {
                if decl.group != group {
                    continue;
                }
                if let Some((_, existing)) = fields.iter().find(|(n, _)| n == &decl.name) {
                    if *existing != decl.shader_type() {
                        return Err(GfxError::DuplicateField { name: decl.name.clone() });
                    }
                    continue;
                }
                fields.push((decl.name.clone(), decl.shader_type()));
            }
        }
        Ok(fields)
    }

    fn base_params(&self, group: BindGroupId) -> ParameterStorage {
        let mut storage = ParameterStorage::default();
        for feature in &self.features {
            for decl in &feature.num_params {
                if decl.group == group {
                    storage.set(decl.name.clone(), decl.default);
                }
            }
        }
        storage
    }

    fn output_fields(&self) -> GfxResult<Vec<(String, NumType)>> {
        let mut fields = Vec::new();
        for target in &self.render_target.color_targets {
            fields.push((target.name.clone(), pixel_format_output_type(target.format)?));
        }
        Ok(fields)
    }

    fn entry_points(&self) -> Vec<EntryPoint> {
        self.features.iter().flat_map(|f| f.entry_points.iter().cloned()).collect()
    }

    fn texture_layout(&self) -> GfxResult<TextureBindingLayout> {
        let mut builder = TextureBindingLayoutBuilder::new();
        for feature in &self.features {
            for decl in &feature.texture_params {
                builder.add_or_update_slot(&decl.name, decl.ty, &decl.default_texcoord_name)?;
            }
        }
        Ok(builder.finalize(0).0)
    }

    /// `optimized`, when set (the second, post-pruning pass), threads the
    /// already-computed draw/view layouts back onto the bindings the
    /// generator consumes, so `BufferBinding::optimized_struct_layout`
    /// reflects the real pruned layout rather than staying unset.
    fn make_generator(
        &self,
        draw_struct: &StructType,
        view_struct: &StructType,
        textures: &TextureBindingLayout,
        output_fields: &[(String, NumType)],
        modifier_ctx: &PipelineModifierContext,
        optimized: Option<(&StructLayout, &StructLayout)>,
    ) -> Generator {
        let mut buffer_bindings = Vec::new();
        if !draw_struct.entries().is_empty() {
            buffer_bindings.push(BufferBinding {
                name: "draw_params".to_string(),
                bind_group: DRAW_GROUP,
                binding: 0,
                address_space: AddressSpace::Uniform,
                struct_type: draw_struct.clone(),
                optimized_struct_layout: optimized.map(|(draw, _)| draw.clone()),
                dimension: modifier_ctx.draw_dimension,
                has_dynamic_offset: modifier_ctx.draw_has_dynamic_offset,
                unused: false,
            });
        }
        if !view_struct.entries().is_empty() {
            buffer_bindings.push(BufferBinding {
                name: "view_params".to_string(),
                bind_group: VIEW_GROUP,
                binding: 0,
                address_space: AddressSpace::Uniform,
                struct_type: view_struct.clone(),
                optimized_struct_layout: optimized.map(|(_, view)| view.clone()),
                dimension: modifier_ctx.view_dimension,
                has_dynamic_offset: modifier_ctx.view_has_dynamic_offset,
                unused: false,
            });
        }

        Generator {
            buffer_bindings,
            texture_binding_layout: textures.clone(),
            mesh_format: self.mesh_format.clone(),
            output_fields: output_fields.to_vec(),
            depth_output_name: self.render_target.depth_output_name().map(str::to_string),
        }
    }

    /// Runs every feature's pipeline modifier, in feature order, over a
    /// shared context; a later feature's modifier sees any state an earlier
    /// one already set.
    fn run_pipeline_modifiers(&self) -> PipelineModifierContext {
        let mut ctx = PipelineModifierContext::default();
        for feature in &self.features {
            if let Some(modifier) = &feature.pipeline_modifier {
                modifier(&mut ctx);
            }
        }
        ctx
    }

    /// Collects every feature's generators together with a weak reference to
    /// the owning feature and weak references to every other feature in this
    /// pipeline.
    fn collect_generators(&self) -> (Vec<CachedFeatureGenerator>, Vec<CachedFeatureGenerator>) {
        let mut per_view = Vec::new();
        let mut per_object = Vec::new();
        for feature in &self.features {
            let owning_feature = Arc::downgrade(feature);
            let other_features: Vec<Weak<Feature>> = self.features.iter().filter(|f| !Arc::ptr_eq(f, feature)).map(Arc::downgrade).collect();
            for generator in &feature.generators {
                match generator {
                    FeatureGenerator::PerObject(callback) => {
                        per_object.push(CachedFeatureGenerator { callback: callback.clone(), owning_feature: owning_feature.clone(), other_features: other_features.clone() });
                    }
                    FeatureGenerator::PerView(callback) => {
                        per_view.push(CachedFeatureGenerator { callback: callback.clone(), owning_feature: owning_feature.clone(), other_features: other_features.clone() });
                    }
                }
            }
        }
        (per_view, per_object)
    }

    pub fn build(&self, device: &wgpu::Device) -> GfxResult<CachedPipeline> {
        let _span = tracing::debug_span!("PipelineBuilder::build", label = self.options.label.as_deref().unwrap_or("unlabeled"), features = self.features.len())
            .entered();

        let required = self.combined_required_attributes();
        if !required.is_satisfied_by(&self.mesh_format) {
            return Err(GfxError::DeviceCreationFailed { what: "mesh format does not provide an attribute a feature requires".to_string() });
        }

        let modifier_ctx = self.run_pipeline_modifiers();
        let (per_view_generators, per_object_generators) = self.collect_generators();

        let draw_fields = self.param_fields(BindGroupId::Draw)?;
        let view_fields = self.param_fields(BindGroupId::View)?;
        let output_fields = self.output_fields()?;
        let entry_points = self.entry_points();
        let texture_layout = self.texture_layout()?;

        let (draw_struct, _) = build_struct(&draw_fields, AddressSpace::Uniform, None)?;
        let (view_struct, _) = build_struct(&view_fields, AddressSpace::Uniform, None)?;

        let first_pass = self.make_generator(&draw_struct, &view_struct, &texture_layout, &output_fields, &modifier_ctx, None);
        let indexed = first_pass.index_bindings(&entry_points)?;

        let used_draw_fields: Vec<_> = draw_fields.iter().filter(|(n, _)| indexed.field_is_used("draw_params", n)).cloned().collect();
        let used_view_fields: Vec<_> = view_fields.iter().filter(|(n, _)| indexed.field_is_used("view_params", n)).cloned().collect();
        tracing::debug!(
            dropped_draw_fields = draw_fields.len() - used_draw_fields.len(),
            dropped_view_fields = view_fields.len() - used_view_fields.len(),
            "pruned unused buffer fields after indexing"
        );
        let used_textures: TextureBindingLayout = {
            let mut builder = TextureBindingLayoutBuilder::new();
            for binding in &texture_layout.bindings {
                if indexed.used_textures.contains(&binding.name) {
                    builder.add_or_update_slot(&binding.name, binding.ty, &binding.default_texcoord_name)?;
                }
            }
            builder.finalize(0).0
        };

        // A dynamic-offset buffer's stride must itself be a multiple of the
        // device's minimum dynamic offset alignment for its address space.
        let draw_alignment = modifier_ctx.draw_has_dynamic_offset.then(|| device.limits().min_uniform_buffer_offset_alignment as usize);
        let view_alignment = modifier_ctx.view_has_dynamic_offset.then(|| device.limits().min_uniform_buffer_offset_alignment as usize);

        let (draw_struct, draw_layout) = build_struct(&used_draw_fields, AddressSpace::Uniform, draw_alignment)?;
        let (view_struct, view_layout) = build_struct(&used_view_fields, AddressSpace::Uniform, view_alignment)?;

        let second_pass = self.make_generator(&draw_struct, &view_struct, &used_textures, &output_fields, &modifier_ctx, Some((&draw_layout, &view_layout)));
        let output = second_pass.build(&entry_points)?;
        if !output.errors.is_empty() {
            let joined = output.errors.iter().map(|e| e.0.as_str()).join("; ");
            tracing::debug!(error = %joined, "shader generation failed; returning a pipeline with only a compilation error");
            return Ok(CachedPipeline::from_compilation_error(joined));
        }

        let dynamic_buffer_refs: Vec<String> = second_pass.buffer_bindings.iter().filter(|b| b.has_dynamic_offset).map(|b| b.name.clone()).collect();

        let bind_group_layouts = self.build_bind_group_layouts(device, &second_pass);
        let pipeline_layout_refs: Vec<&wgpu::BindGroupLayout> = bind_group_layouts.iter().collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: self.options.label.as_deref(),
            bind_group_layouts: &pipeline_layout_refs,
            push_constant_ranges: &[],
        });

        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: self.options.label.as_deref(),
            source: wgpu::ShaderSource::Wgsl(output.wgsl.clone().into()),
        });

        let pipeline = self.build_render_pipeline(device, &pipeline_layout, &shader_module)?;
        tracing::info!(draw_fields = used_draw_fields.len(), view_fields = used_view_fields.len(), textures = used_textures.bindings.len(), "render pipeline built");

        Ok(CachedPipeline {
            pipeline: Some(pipeline),
            bind_group_layouts,
            draw_layout,
            view_layout,
            texture_binding_layout: used_textures,
            base_draw_params: self.base_params(BindGroupId::Draw),
            base_view_params: self.base_params(BindGroupId::View),
            wgsl: output.wgsl,
            dynamic_buffer_refs,
            per_view_generators,
            per_object_generators,
            compilation_error: None,
        })
    }

    fn build_bind_group_layouts(&self, device: &wgpu::Device, generator: &Generator) -> Vec<wgpu::BindGroupLayout> {
        let mut groups: Vec<Vec<wgpu::BindGroupLayoutEntry>> = vec![Vec::new(), Vec::new(), Vec::new()];

        for binding in &generator.buffer_bindings {
            let ty = wgpu::BindingType::Buffer {
                ty: match binding.address_space {
                    AddressSpace::Uniform => wgpu::BufferBindingType::Uniform,
                    AddressSpace::Storage => wgpu::BufferBindingType::Storage { read_only: true },
                    AddressSpace::StorageRw => wgpu::BufferBindingType::Storage { read_only: false },
                },
                has_dynamic_offset: binding.has_dynamic_offset,
                min_binding_size: None,
            };
            groups[binding.bind_group].push(wgpu::BindGroupLayoutEntry {
                binding: binding.binding as u32,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty,
                count: None,
            });
        }

        for tex in &generator.texture_binding_layout.bindings {
            groups[TEXTURE_GROUP].push(wgpu::BindGroupLayoutEntry {
                binding: tex.binding as u32,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: tex.ty.sample_type.to_wgpu(),
                    view_dimension: tex.ty.dimension.to_wgpu(),
                    multisampled: false,
                },
                count: None,
            });
            let sampler_ty = if tex.ty.sample_type == crate::enums::TextureSampleType::Depth {
                wgpu::SamplerBindingType::Comparison
            } else if tex.ty.sample_type.is_filterable() {
                wgpu::SamplerBindingType::Filtering
            } else {
                wgpu::SamplerBindingType::NonFiltering
            };
            groups[TEXTURE_GROUP].push(wgpu::BindGroupLayoutEntry {
                binding: tex.default_sampler_binding as u32,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(sampler_ty),
                count: None,
            });
        }

        groups
            .into_iter()
            .enumerate()
            .map(|(i, entries)| {
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&format!("{}_group_{i}", self.options.label.as_deref().unwrap_or("gfx_pipeline"))),
                    entries: &entries,
                })
            })
            .collect()
    }

    fn build_render_pipeline(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        shader_module: &wgpu::ShaderModule,
    ) -> GfxResult<wgpu::RenderPipeline> {
        let state = self.combined_pipeline_state();
        let (stride, attributes) = self.mesh_format.vertex_buffer_layout()?;
        let vertex_buffers = [wgpu::VertexBufferLayout { array_stride: stride, step_mode: wgpu::VertexStepMode::Vertex, attributes: &attributes }];

        let color_targets: Vec<Option<wgpu::ColorTargetState>> = self
            .render_target
            .color_targets
            .iter()
            .map(|t| {
                Some(wgpu::ColorTargetState {
                    format: t.format,
                    blend: state.blend,
                    write_mask: state.color_write.unwrap_or(wgpu::ColorWrites::ALL),
                })
            })
            .collect();

        let depth_stencil = self.render_target.depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: state.depth_write.unwrap_or(true),
            depth_compare: state.depth_compare.unwrap_or(wgpu::CompareFunction::Less),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let mut front_face = self.mesh_format.to_wgpu_front_face();
        if state.flip_front_face.unwrap_or(false) {
            front_face = match front_face {
                wgpu::FrontFace::Ccw => wgpu::FrontFace::Cw,
                wgpu::FrontFace::Cw => wgpu::FrontFace::Ccw,
            };
        }

        Ok(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: self.options.label.as_deref(),
            layout: Some(layout),
            vertex: wgpu::VertexState { module: shader_module, entry_point: "vertex_main", buffers: &vertex_buffers },
            fragment: Some(wgpu::FragmentState { module: shader_module, entry_point: "fragment_main", targets: &color_targets }),
            primitive: wgpu::PrimitiveState {
                topology: self.mesh_format.to_wgpu_topology(),
                front_face,
                cull_mode: state.culling,
                ..Default::default()
            },
            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{IndexFormat, PrimitiveType, Stage, WindingOrder};
    use crate::feature::NumParamDecl;
    use crate::mesh_format::VertexAttribute;
    use crate::params::NumParameter;
    use crate::render_target::ColorTarget;
    use crate::shader::blocks::{Direct, ReadBuffer, WriteOutput};
    use crate::shader::types::Types;
    use pretty_assertions::assert_eq;

    fn simple_mesh() -> MeshFormat {
        MeshFormat {
            primitive_type: PrimitiveType::TriangleList,
            winding_order: WindingOrder::Ccw,
            index_format: IndexFormat::UInt32,
            attributes: vec![VertexAttribute {
                name: "position".into(),
                storage_type: crate::enums::StorageType::Float32,
                num_components: 3,
            }],
        }
    }

    fn simple_target() -> RenderTargetLayout {
        RenderTargetLayout { color_targets: vec![ColorTarget { name: "color".into(), format: wgpu::TextureFormat::Rgba8Unorm }], depth_format: None }
    }

    #[test]
    fn unused_declared_params_are_dropped_from_the_final_layout() {
        let feature = Arc::new(
            Feature::new("material")
                .with_num_param(NumParamDecl::new("used", NumParameter::Float(1.0), BindGroupId::Draw))
                .with_num_param(NumParamDecl::new("unused", NumParameter::Float(2.0), BindGroupId::Draw))
                .with_entry_point(EntryPoint::new(
                    Stage::Fragment,
                    "write_color",
                    WriteOutput::new("color", Types::FLOAT4, ReadBuffer::new("used", Types::FLOAT, "draw_params", None)),
                )),
        );
        let builder = PipelineBuilder::new(simple_mesh(), simple_target()).with_feature(feature);

        let draw_fields = builder.param_fields(BindGroupId::Draw).unwrap();
        let (draw_struct, _) = build_struct(&draw_fields, AddressSpace::Uniform, None).unwrap();
        let textures = builder.texture_layout().unwrap();
        let output_fields = builder.output_fields().unwrap();
        let (view_struct, _) = build_struct(&[], AddressSpace::Uniform, None).unwrap();
        let modifier_ctx = builder.run_pipeline_modifiers();
        let generator = builder.make_generator(&draw_struct, &view_struct, &textures, &output_fields, &modifier_ctx, None);
        let indexed = generator.index_bindings(&builder.entry_points()).unwrap();

        assert!(indexed.field_is_used("draw_params", "used"));
        assert!(!indexed.field_is_used("draw_params", "unused"));
    }

    #[test]
    fn combined_pipeline_state_is_right_biased_across_features() {
        let a = Arc::new(
            Feature::new("a").with_pipeline_state(FeaturePipelineState { depth_write: Some(true), ..Default::default() }),
        );
        let b = Arc::new(
            Feature::new("b").with_pipeline_state(FeaturePipelineState { depth_write: Some(false), ..Default::default() }),
        );
        let builder = PipelineBuilder::new(simple_mesh(), simple_target()).with_feature(a).with_feature(b);
        assert_eq!(builder.combined_pipeline_state().depth_write, Some(false));
    }

    #[test]
    fn conflicting_param_types_are_rejected() {
        let feature = Arc::new(
            Feature::new("a")
                .with_num_param(NumParamDecl::new("x", NumParameter::Float(1.0), BindGroupId::Draw))
                .with_num_param(NumParamDecl::new("x", NumParameter::Float2(glam::Vec2::ZERO), BindGroupId::Draw)),
        );
        let builder = PipelineBuilder::new(simple_mesh(), simple_target()).with_feature(feature);
        let err = builder.param_fields(BindGroupId::Draw).unwrap_err();
        assert!(matches!(err, GfxError::DuplicateField { .. }));
    }

    #[test]
    fn direct_block_is_unused_by_anything_structural() {
        // sanity: Direct entry points don't reference any buffer field, so
        // indexing them shouldn't panic or record spurious usage.
        let feature =
            Arc::new(Feature::new("noop").with_entry_point(EntryPoint::new(Stage::Fragment, "noop", Direct::new("// no-op\n"))));
        let builder = PipelineBuilder::new(simple_mesh(), simple_target()).with_feature(feature);
        let textures = builder.texture_layout().unwrap();
        let output_fields = builder.output_fields().unwrap();
        let (draw_struct, _) = build_struct(&[], AddressSpace::Uniform, None).unwrap();
        let (view_struct, _) = build_struct(&[], AddressSpace::Uniform, None).unwrap();
        let modifier_ctx = builder.run_pipeline_modifiers();
        let generator = builder.make_generator(&draw_struct, &view_struct, &textures, &output_fields, &modifier_ctx, None);
        let indexed = generator.index_bindings(&builder.entry_points()).unwrap();
        assert!(indexed.used_buffer_fields.is_empty());
    }

    #[test]
    fn pipeline_modifier_switches_draw_buffer_to_per_instance_dimension() {
        let feature = Arc::new(Feature::new("instanced").with_pipeline_modifier(|ctx| {
            ctx.draw_dimension = crate::shader::generator::Dimension::PerInstance;
        }));
        let builder = PipelineBuilder::new(simple_mesh(), simple_target()).with_feature(feature);
        let modifier_ctx = builder.run_pipeline_modifiers();
        assert_eq!(modifier_ctx.draw_dimension, crate::shader::generator::Dimension::PerInstance);
    }

    #[test]
    fn generators_collect_weak_refs_to_sibling_features() {
        let a = Arc::new(Feature::new("a").with_generator(crate::feature::FeatureGenerator::PerObject(Arc::new(|_| {}))));
        let b = Arc::new(Feature::new("b"));
        let builder = PipelineBuilder::new(simple_mesh(), simple_target()).with_feature(a.clone()).with_feature(b.clone());

        let (per_view, per_object) = builder.collect_generators();
        assert!(per_view.is_empty());
        assert_eq!(per_object.len(), 1);
        assert!(Arc::ptr_eq(&a, &per_object[0].owning_feature.upgrade().unwrap()));
        assert_eq!(per_object[0].other_features.len(), 1);
        assert!(Arc::ptr_eq(&b, &per_object[0].other_features[0].upgrade().unwrap()));
    }

    #[test]
    fn recoverable_shader_generation_failure_yields_a_compilation_error_not_an_err() {
        let feature = Arc::new(Feature::new("broken").with_entry_point(EntryPoint::new(
            Stage::Fragment,
            "write_color",
            ReadBuffer::new("missing", Types::FLOAT, "draw_params", None),
        )));
        let builder = PipelineBuilder::new(simple_mesh(), simple_target()).with_feature(feature);

        let draw_fields = builder.param_fields(BindGroupId::Draw).unwrap();
        let (draw_struct, _) = build_struct(&draw_fields, AddressSpace::Uniform, None).unwrap();
        let textures = builder.texture_layout().unwrap();
        let output_fields = builder.output_fields().unwrap();
        let (view_struct, _) = build_struct(&[], AddressSpace::Uniform, None).unwrap();
        let modifier_ctx = builder.run_pipeline_modifiers();
        let generator = builder.make_generator(&draw_struct, &view_struct, &textures, &output_fields, &modifier_ctx, None);
        let output = generator.build(&builder.entry_points()).unwrap();
        assert!(!output.errors.is_empty());

        let cached = CachedPipeline::from_compilation_error(output.errors[0].0.clone());
        assert!(cached.pipeline.is_none());
        assert!(cached.compilation_error.is_some());
    }
}

/// Exercises the full `build()` path, including shader compilation and
/// render-pipeline creation, against a real `wgpu::Device`. Gated behind the
/// `device_tests` feature and `#[ignore]`d by default since no GPU adapter
/// is guaranteed to be present in ordinary test runs.
#[cfg(all(test, feature = "device_tests"))]
mod device_tests {
    use super::*;
    use crate::enums::{IndexFormat, PrimitiveType, Stage, WindingOrder};
    use crate::feature::NumParamDecl;
    use crate::mesh_format::VertexAttribute;
    use crate::params::NumParameter;
    use crate::render_target::ColorTarget;
    use crate::shader::blocks::WriteOutput;
    use crate::shader::types::Types;

    async fn request_device() -> (wgpu::Device, wgpu::Queue) {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor { backends: wgpu::Backends::all(), dx12_shader_compiler: Default::default() });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions { power_preference: wgpu::PowerPreference::LowPower, compatible_surface: None, force_fallback_adapter: true })
            .await
            .expect("no wgpu adapter available for device_tests");
        adapter.request_device(&wgpu::DeviceDescriptor::default(), None).await.expect("failed to request a device")
    }

    #[test]
    #[ignore]
    fn builds_a_single_textured_quad_pipeline() {
        let (device, _queue) = pollster::block_on(request_device());

        let feature = Arc::new(
            Feature::new("material")
                .with_num_param(NumParamDecl::new("color", NumParameter::Float4(glam::Vec4::ONE), BindGroupId::Draw))
                .with_texture_param(crate::feature::TextureParamDecl {
                    name: "albedo".into(),
                    ty: crate::shader::types::TextureType::new(crate::enums::TextureDimension::D2),
                    default_texcoord_name: "texCoord0".into(),
                })
                .with_entry_point(EntryPoint::new(
                    Stage::Fragment,
                    "write_color",
                    WriteOutput::new("color", Types::FLOAT4, crate::shader::blocks::SampleTexture::new("albedo")),
                )),
        );

        let mesh = MeshFormat {
            primitive_type: PrimitiveType::TriangleList,
            winding_order: WindingOrder::Ccw,
            index_format: IndexFormat::UInt32,
            attributes: vec![
                VertexAttribute { name: "position".into(), storage_type: crate::enums::StorageType::Float32, num_components: 3 },
                VertexAttribute { name: "texCoord0".into(), storage_type: crate::enums::StorageType::Float32, num_components: 2 },
            ],
        };
        let target = RenderTargetLayout { color_targets: vec![ColorTarget { name: "color".into(), format: wgpu::TextureFormat::Rgba8UnormSrgb }], depth_format: None };

        let builder = PipelineBuilder::new(mesh, target).with_feature(feature);
        let cached = builder.build(&device).expect("pipeline build should succeed");

        assert_eq!(cached.bind_group_layouts.len(), 3);
        assert!(cached.wgsl.contains("vertex_main"));
        assert!(cached.wgsl.contains("fragment_main"));
    }

    #[test]
    #[ignore]
    fn rejects_a_mesh_that_cannot_satisfy_required_attributes() {
        let (device, _queue) = pollster::block_on(request_device());

        let mut needs_local_basis = Feature::new("anisotropic_shading");
        needs_local_basis.required_attributes = RequiredAttributes { require_per_vertex_local_basis: true };
        let builder = PipelineBuilder::new(MeshFormat::default(), RenderTargetLayout { color_targets: vec![], depth_format: None })
            .with_feature(Arc::new(needs_local_basis));

        let err = builder.build(&device).unwrap_err();
        assert!(matches!(err, GfxError::DeviceCreationFailed { .. }));
    }
}
