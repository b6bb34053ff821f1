use crate::shader::types::Type;

/// Fatal, programmer-error conditions raised by the type/layout system and the
/// pipeline builder. These are never masked: callers either fix the input or
/// propagate the error.
#[derive(Debug, thiserror::Error)]
pub enum GfxError {
    #[error("field `{name}` already exists with a different type")]
    DuplicateField { name: String },

    #[error("can not add a field after a runtime-sized array; `{name}` must be the last field")]
    RuntimeSizedArrayNotLast { name: String },

    #[error("unsupported type in struct layout: {ty:?}")]
    UnsupportedLayoutType { ty: Type },

    #[error("layout has already been finalized")]
    LayoutFinalized,

    #[error("dependency cycle detected while sorting entry points")]
    DependencyCycle,

    #[error("missing dependency `{name}` (strict ordering requested)")]
    MissingDependency { name: String },

    #[error("unrecognized pixel format: {format:?}")]
    UnrecognizedPixelFormat { format: wgpu::TextureFormat },

    #[error("serializer type mismatch: expected {expected:?}")]
    SerializeTypeMismatch { expected: Type },

    #[error("device API call failed: {what}")]
    DeviceCreationFailed { what: String },

    #[error("struct layout has no runtime-sized array")]
    NoRuntimeSizedArray,

    #[error("invalid layout path")]
    InvalidLayoutPath,
}

pub type GfxResult<T> = Result<T, GfxError>;
