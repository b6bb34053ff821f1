//! Declarative shader contributions. A [`Feature`] bundles entry-point
//! blocks, declared parameters, and optional fixed-function pipeline state;
//! a pipeline is built by composing an ordered list of features.

use std::sync::{Arc, Weak};

use crate::enums::Stage;
use crate::mesh_format::MeshFormat;
use crate::params::{BindGroupId, NumParameter, ParameterStorage};
use crate::shader::block::BlockPtr;
use crate::shader::entry_point::EntryPoint;
use crate::shader::generator::Dimension;
use crate::shader::types::{NumType, TextureType};

#[derive(Debug, Clone)]
pub struct NumParamDecl {
    pub name: String,
    pub default: NumParameter,
    pub group: BindGroupId,
}

impl NumParamDecl {
    pub fn new(name: impl Into<String>, default: NumParameter, group: BindGroupId) -> Self {
        Self { name: name.into(), default, group }
    }

    pub fn shader_type(&self) -> NumType {
        self.default.shader_type()
    }
}

#[derive(Debug, Clone)]
pub struct TextureParamDecl {
    pub name: String,
    pub ty: TextureType,
    pub default_texcoord_name: String,
}

#[derive(Clone)]
pub struct BlockParamDecl {
    pub name: String,
    pub default: BlockPtr,
}

/// Right-biased fixed-function pipeline state a feature can contribute.
/// `combine` lets a later feature in a pipeline's feature list override an
/// earlier one field by field; a `None` field leaves whatever an earlier
/// feature (or the pipeline's base state) already set untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeaturePipelineState {
    pub blend: Option<wgpu::BlendState>,
    pub culling: Option<wgpu::Face>,
    pub flip_front_face: Option<bool>,
    pub color_write: Option<wgpu::ColorWrites>,
    pub depth_write: Option<bool>,
    pub depth_compare: Option<wgpu::CompareFunction>,
}

impl FeaturePipelineState {
    pub fn combine(&self, later: &FeaturePipelineState) -> FeaturePipelineState {
        FeaturePipelineState {
            blend: later.blend.or(self.blend),
            culling: later.culling.or(self.culling),
            flip_front_face: later.flip_front_face.or(self.flip_front_face),
            color_write: later.color_write.or(self.color_write),
            depth_write: later.depth_write.or(self.depth_write),
            depth_compare: later.depth_compare.or(self.depth_compare),
        }
    }
}

/// Mesh-level attributes a feature requires from the mesh it's drawn with.
/// A pipeline needs an attribute if any contributing feature needs it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredAttributes {
    /// When set, every vertex must carry a local basis (e.g. a quaternion
    /// encoding tangent/normal/bitangent) as a named mesh attribute.
    pub require_per_vertex_local_basis: bool,
}

impl RequiredAttributes {
    pub fn combine(&self, other: &RequiredAttributes) -> RequiredAttributes {
        RequiredAttributes { require_per_vertex_local_basis: self.require_per_vertex_local_basis || other.require_per_vertex_local_basis }
    }

    pub fn is_satisfied_by(&self, mesh_format: &MeshFormat) -> bool {
        !self.require_per_vertex_local_basis || mesh_format.attributes.iter().any(|a| a.name == "localBasis")
    }
}

/// Mutable pipeline-build state a feature's pipeline modifier callback may
/// adjust, e.g. switching the draw-frequency buffer to per-instance storage.
#[derive(Debug, Clone, Copy)]
pub struct PipelineModifierContext {
    pub draw_dimension: Dimension,
    pub view_dimension: Dimension,
    pub draw_has_dynamic_offset: bool,
    pub view_has_dynamic_offset: bool,
}

impl Default for PipelineModifierContext {
    fn default() -> Self {
        Self { draw_dimension: Dimension::One, view_dimension: Dimension::One, draw_has_dynamic_offset: false, view_has_dynamic_offset: false }
    }
}

pub type PipelineModifierFn = Arc<dyn Fn(&mut PipelineModifierContext) + Send + Sync>;

/// A per-view or per-object parameter-writing callback a feature contributes.
/// Collected by the pipeline builder alongside weak references to the
/// owning feature and its siblings in the same pipeline, so a generator can
/// read state from other features without holding them alive.
#[derive(Clone)]
pub enum FeatureGenerator {
    PerObject(Arc<dyn Fn(&mut ParameterStorage) + Send + Sync>),
    PerView(Arc<dyn Fn(&mut ParameterStorage) + Send + Sync>),
}

pub struct Feature {
    pub name: String,
    pub entry_points: Vec<EntryPoint>,
    pub num_params: Vec<NumParamDecl>,
    pub texture_params: Vec<TextureParamDecl>,
    pub block_params: Vec<BlockParamDecl>,
    pub pipeline_state: FeaturePipelineState,
    pub required_attributes: RequiredAttributes,
    /// Other features this one relies on (e.g. a lighting feature reading a
    /// shadow-map feature's texture param). Weak: features are held by a
    /// pipeline builder as `Arc<Feature>`, and a dependency edge shouldn't
    /// keep a feature alive on its own.
    pub dependencies: Vec<Weak<Feature>>,
    /// Invoked once per build, in feature order, with mutable access to
    /// pipeline-build state this feature wants to override (e.g. switching
    /// `object` to per-instance storage).
    pub pipeline_modifier: Option<PipelineModifierFn>,
    /// Per-view/per-object parameter generators this feature contributes.
    pub generators: Vec<FeatureGenerator>,
}

impl Feature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry_points: Vec::new(),
            num_params: Vec::new(),
            texture_params: Vec::new(),
            block_params: Vec::new(),
            pipeline_state: FeaturePipelineState::default(),
            required_attributes: RequiredAttributes::default(),
            dependencies: Vec::new(),
            pipeline_modifier: None,
            generators: Vec::new(),
        }
    }

    pub fn with_entry_point(mut self, ep: EntryPoint) -> Self {
        self.entry_points.push(ep);
        self
    }

    pub fn with_num_param(mut self, decl: NumParamDecl) -> Self {
        self.num_params.push(decl);
        self
    }

    pub fn with_texture_param(mut self, decl: TextureParamDecl) -> Self {
        self.texture_params.push(decl);
        self
    }

    pub fn with_pipeline_state(mut self, state: FeaturePipelineState) -> Self {
        self.pipeline_state = state;
        self
    }

    pub fn depends_on(mut self, other: &Arc<Feature>) -> Self {
        self.dependencies.push(Arc::downgrade(other));
        self
    }

    pub fn with_pipeline_modifier(mut self, modifier: impl Fn(&mut PipelineModifierContext) + Send + Sync + 'static) -> Self {
        self.pipeline_modifier = Some(Arc::new(modifier));
        self
    }

    pub fn with_generator(mut self, generator: FeatureGenerator) -> Self {
        self.generators.push(generator);
        self
    }

    pub fn vertex_entry_points(&self) -> impl Iterator<Item = &EntryPoint> {
        self.entry_points.iter().filter(|e| e.stage == Stage::Vertex)
    }

    pub fn fragment_entry_points(&self) -> impl Iterator<Item = &EntryPoint> {
        self.entry_points.iter().filter(|e| e.stage == Stage::Fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pipeline_state_combine_is_right_biased() {
        let base = FeaturePipelineState { depth_write: Some(true), culling: Some(wgpu::Face::Back), ..Default::default() };
        let later = FeaturePipelineState { depth_write: Some(false), ..Default::default() };
        let combined = base.combine(&later);
        assert_eq!(combined.depth_write, Some(false));
        assert_eq!(combined.culling, Some(wgpu::Face::Back));
    }

    #[test]
    fn required_attributes_combine_is_or() {
        let a = RequiredAttributes { require_per_vertex_local_basis: false };
        let b = RequiredAttributes { require_per_vertex_local_basis: true };
        assert!(a.combine(&b).require_per_vertex_local_basis);
        assert!(!RequiredAttributes::default().combine(&RequiredAttributes::default()).require_per_vertex_local_basis);
    }

    #[test]
    fn required_attributes_checks_mesh_format_for_local_basis() {
        use crate::enums::StorageType;
        use crate::mesh_format::VertexAttribute;

        let required = RequiredAttributes { require_per_vertex_local_basis: true };
        let mut mesh = MeshFormat::default();
        assert!(!required.is_satisfied_by(&mesh));

        mesh.attributes.push(VertexAttribute { name: "localBasis".into(), storage_type: StorageType::Float32, num_components: 4 });
        assert!(required.is_satisfied_by(&mesh));
    }

    #[test]
    fn pipeline_modifier_can_switch_draw_buffer_to_per_instance() {
        let feature = Feature::new("instanced").with_pipeline_modifier(|ctx| {
            ctx.draw_dimension = Dimension::PerInstance;
        });
        let mut ctx = PipelineModifierContext::default();
        (feature.pipeline_modifier.as_ref().unwrap())(&mut ctx);
        assert_eq!(ctx.draw_dimension, Dimension::PerInstance);
        assert_eq!(ctx.view_dimension, Dimension::One);
    }

    #[test]
    fn per_object_generator_writes_a_parameter() {
        let feature = Feature::new("jitter").with_generator(FeatureGenerator::PerObject(Arc::new(|storage| {
            storage.set("jitter_seed", NumParameter::Float(0.5));
        })));
        let mut storage = ParameterStorage::default();
        match &feature.generators[0] {
            FeatureGenerator::PerObject(cb) => cb(&mut storage),
            FeatureGenerator::PerView(_) => unreachable!(),
        }
        assert_eq!(storage.get("jitter_seed"), Some(&NumParameter::Float(0.5)));
    }

    #[test]
    fn weak_dependency_does_not_keep_a_feature_alive() {
        let dep = Arc::new(Feature::new("shadow_map"));
        let user = Feature::new("lighting").depends_on(&dep);
        drop(dep);
        assert!(user.dependencies[0].upgrade().is_none());
    }
}
