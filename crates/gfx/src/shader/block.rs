//! The shader-AST node. `Block`s are composed by features into entry-point
//! bodies and walked twice per pipeline build: once (write-discarding) by
//! the [`super::indexer`], once (emitting) by the [`super::generator`].

use std::sync::Arc;

use crate::shader::generator::GeneratorContext;

/// A node in the shader AST. Implementations are shared, not cloned, since
/// entry-point block trees are treated as immutable for the lifetime of a
/// feature (see the crate's concurrency notes) — `BlockPtr` is an `Arc`,
/// never copied field-by-field.
pub trait Block: Send + Sync {
    fn apply(&self, ctx: &mut dyn GeneratorContext);
}

pub type BlockPtr = Arc<dyn Block>;
