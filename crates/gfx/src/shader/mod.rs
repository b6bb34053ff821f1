//! Shader-AST representation and WGSL composition: types and layout
//! ([`types`], [`struct_layout`], [`layout_traverser`]), host<->GPU byte
//! conversion ([`buffer_serializer`]), the AST itself ([`block`], [`blocks`]),
//! entry-point ordering ([`entry_point`]), and the two walks over that AST
//! ([`generator`], [`indexer`]).

pub mod block;
pub mod blocks;
pub mod buffer_serializer;
pub mod entry_point;
pub mod generator;
pub mod indexer;
pub mod layout_traverser;
pub mod struct_layout;
pub mod textures;
pub mod types;
pub mod wgsl_mapping;
