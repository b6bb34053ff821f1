//! Writes/reads host numeric values into a raw buffer at the byte offsets
//! produced by the [`super::layout_traverser::LayoutTraverser`]. Enforces
//! base-type compatibility (integral host values only target integer WGSL
//! fields, float host values only target float fields) and vector
//! dimension; `F16` is unimplemented on both host types.

use crate::error::{GfxError, GfxResult};
use crate::shader::types::{BaseType, Type};

#[derive(Debug, Clone, Copy)]
enum HostScalar {
    F32(f32),
    I32(i32),
    U32(u32),
}

impl HostScalar {
    fn is_float(self) -> bool {
        matches!(self, HostScalar::F32(_))
    }

    fn write_as(self, base_type: BaseType, dst: &mut [u8]) {
        match (self, base_type) {
            (HostScalar::F32(v), BaseType::F32) => dst.copy_from_slice(&v.to_le_bytes()),
            (HostScalar::I32(v), BaseType::I32) => dst.copy_from_slice(&v.to_le_bytes()),
            (HostScalar::I32(v), BaseType::U32) => dst.copy_from_slice(&(v as u32).to_le_bytes()),
            (HostScalar::U32(v), BaseType::U32) => dst.copy_from_slice(&v.to_le_bytes()),
            (HostScalar::U32(v), BaseType::I32) => dst.copy_from_slice(&(v as i32).to_le_bytes()),
            _ => unreachable!("category compatibility already checked by caller"),
        }
    }

    fn read_as(base_type: BaseType, src: &[u8], want_float: bool) -> Self {
        if want_float {
            HostScalar::F32(f32::from_le_bytes(src.try_into().unwrap()))
        } else {
            match base_type {
                BaseType::I32 => HostScalar::I32(i32::from_le_bytes(src.try_into().unwrap())),
                BaseType::U32 => HostScalar::U32(u32::from_le_bytes(src.try_into().unwrap())),
                _ => unreachable!(),
            }
        }
    }
}

pub struct BufferSerializer<'a> {
    data: &'a mut [u8],
}

impl<'a> BufferSerializer<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data }
    }

    fn scalar_layout(ty: &Type, count: u8) -> GfxResult<BaseType> {
        let num = match ty {
            Type::Num(n) => n,
            _ => return Err(GfxError::SerializeTypeMismatch { expected: ty.clone() }),
        };
        if num.matrix_dimension > 1 || num.num_components != count {
            return Err(GfxError::SerializeTypeMismatch { expected: ty.clone() });
        }
        if num.base_type == BaseType::F16 {
            return Err(GfxError::SerializeTypeMismatch { expected: ty.clone() });
        }
        Ok(num.base_type)
    }

    fn write_components(&mut self, ty: &Type, offset: usize, values: &[HostScalar]) -> GfxResult<()> {
        let base_type = Self::scalar_layout(ty, values.len() as u8)?;
        if values[0].is_float() != base_type.is_float() {
            return Err(GfxError::SerializeTypeMismatch { expected: ty.clone() });
        }
        let scalar_size = base_type.byte_size();
        for (i, v) in values.iter().enumerate() {
            let start = offset + i * scalar_size;
            v.write_as(base_type, &mut self.data[start..start + scalar_size]);
        }
        Ok(())
    }

    fn read_components(&self, ty: &Type, offset: usize, count: u8, want_float: bool) -> GfxResult<Vec<HostScalar>> {
        let base_type = Self::scalar_layout(ty, count)?;
        if want_float != base_type.is_float() {
            return Err(GfxError::SerializeTypeMismatch { expected: ty.clone() });
        }
        let scalar_size = base_type.byte_size();
        let mut out = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            let start = offset + i * scalar_size;
            out.push(HostScalar::read_as(base_type, &self.data[start..start + scalar_size], want_float));
        }
        Ok(out)
    }

    pub fn write_f32(&mut self, ty: &Type, offset: usize, value: f32) -> GfxResult<()> {
        self.write_components(ty, offset, &[HostScalar::F32(value)])
    }
    pub fn write_i32(&mut self, ty: &Type, offset: usize, value: i32) -> GfxResult<()> {
        self.write_components(ty, offset, &[HostScalar::I32(value)])
    }
    pub fn write_u32(&mut self, ty: &Type, offset: usize, value: u32) -> GfxResult<()> {
        self.write_components(ty, offset, &[HostScalar::U32(value)])
    }
    pub fn write_vec2(&mut self, ty: &Type, offset: usize, value: glam::Vec2) -> GfxResult<()> {
        self.write_components(ty, offset, &[HostScalar::F32(value.x), HostScalar::F32(value.y)])
    }
    pub fn write_vec3(&mut self, ty: &Type, offset: usize, value: glam::Vec3) -> GfxResult<()> {
        self.write_components(ty, offset, &[HostScalar::F32(value.x), HostScalar::F32(value.y), HostScalar::F32(value.z)])
    }
    pub fn write_vec4(&mut self, ty: &Type, offset: usize, value: glam::Vec4) -> GfxResult<()> {
        self.write_components(
            ty,
            offset,
            &[HostScalar::F32(value.x), HostScalar::F32(value.y), HostScalar::F32(value.z), HostScalar::F32(value.w)],
        )
    }

    pub fn read_f32(&self, ty: &Type, offset: usize) -> GfxResult<f32> {
        let c = self.read_components(ty, offset, 1, true)?;
        Ok(match c[0] {
            HostScalar::F32(v) => v,
            _ => unreachable!(),
        })
    }
    pub fn read_i32(&self, ty: &Type, offset: usize) -> GfxResult<i32> {
        let c = self.read_components(ty, offset, 1, false)?;
        Ok(match c[0] {
            HostScalar::I32(v) => v,
            HostScalar::U32(v) => v as i32,
            _ => unreachable!(),
        })
    }
    pub fn read_u32(&self, ty: &Type, offset: usize) -> GfxResult<u32> {
        let c = self.read_components(ty, offset, 1, false)?;
        Ok(match c[0] {
            HostScalar::U32(v) => v,
            HostScalar::I32(v) => v as u32,
            _ => unreachable!(),
        })
    }
    pub fn read_vec3(&self, ty: &Type, offset: usize) -> GfxResult<glam::Vec3> {
        let c = self.read_components(ty, offset, 3, true)?;
        let f = |h: HostScalar| match h {
            HostScalar::F32(v) => v,
            _ => unreachable!(),
        };
        Ok(glam::Vec3::new(f(c[0]), f(c[1]), f(c[2])))
    }
}
