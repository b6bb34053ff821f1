//! Vertex input layout: primitive topology, winding, index format, and the
//! dense ordered list of vertex attributes a mesh provides.

use crate::enums::{IndexFormat, PrimitiveType, StorageType, WindingOrder};

#[derive(Debug, Clone)]
pub struct VertexAttribute {
    pub name: String,
    pub storage_type: StorageType,
    pub num_components: u8,
}

impl VertexAttribute {
    pub fn to_wgpu_format(&self) -> Option<wgpu::VertexFormat> {
        self.storage_type.to_wgpu_vertex_format(self.num_components as usize)
    }
}

#[derive(Debug, Clone)]
pub struct MeshFormat {
    pub primitive_type: PrimitiveType,
    pub winding_order: WindingOrder,
    pub index_format: IndexFormat,
    pub attributes: Vec<VertexAttribute>,
}

impl Default for MeshFormat {
    fn default() -> Self {
        Self {
            primitive_type: PrimitiveType::TriangleList,
            winding_order: WindingOrder::Ccw,
            index_format: IndexFormat::UInt32,
            attributes: Vec::new(),
        }
    }
}

impl MeshFormat {
    /// Dense, tightly-packed vertex buffer layout: one `wgpu::VertexAttribute`
    /// per attribute, back to back in declaration order.
    pub fn vertex_buffer_layout(&self) -> crate::error::GfxResult<(u64, Vec<wgpu::VertexAttribute>)> {
        let mut stride = 0u64;
        let mut attrs = Vec::with_capacity(self.attributes.len());
        for (i, a) in self.attributes.iter().enumerate() {
            let format = a.to_wgpu_format().ok_or_else(|| crate::error::GfxError::DeviceCreationFailed {
                what: format!("unsupported vertex attribute format for `{}`", a.name),
            })?;
            attrs.push(wgpu::VertexAttribute { format, offset: stride, shader_location: i as u32 });
            stride += format.size();
        }
        Ok((stride, attrs))
    }

    pub fn to_wgpu_topology(&self) -> wgpu::PrimitiveTopology {
        match self.primitive_type {
            PrimitiveType::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            PrimitiveType::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }

    pub fn to_wgpu_front_face(&self) -> wgpu::FrontFace {
        match self.winding_order {
            WindingOrder::Cw => wgpu::FrontFace::Cw,
            WindingOrder::Ccw => wgpu::FrontFace::Ccw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::StorageType;
    use pretty_assertions::assert_eq;

    #[test]
    fn attributes_pack_back_to_back() {
        let format = MeshFormat {
            attributes: vec![
                VertexAttribute { name: "position".into(), storage_type: StorageType::Float32, num_components: 3 },
                VertexAttribute { name: "texCoord0".into(), storage_type: StorageType::Float32, num_components: 2 },
            ],
            ..Default::default()
        };
        let (stride, attrs) = format.vertex_buffer_layout().unwrap();
        assert_eq!(attrs[0].offset, 0);
        assert_eq!(attrs[1].offset, 12);
        assert_eq!(stride, 20);
    }
}
