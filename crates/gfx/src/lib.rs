//! Render pipeline compilation and WGSL shader generation core.
//!
//! Consumes a `wgpu::Device` handle but never constructs or owns one: this
//! crate's job is to turn an ordered list of declarative [`feature::Feature`]s
//! into a compiled `wgpu::RenderPipeline`, generating the WGSL module and
//! laying out its bind groups along the way. See [`pipeline_builder`] for the
//! entry point.

pub mod enums;
pub mod error;
pub mod feature;
pub mod graph;
pub mod mesh_format;
pub mod params;
pub mod pipeline_builder;
pub mod render_target;
pub mod shader;

pub use error::{GfxError, GfxResult};
pub use feature::Feature;
pub use pipeline_builder::{BuildPipelineOptions, CachedPipeline, PipelineBuilder};
