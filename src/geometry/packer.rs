/// 顶点记录打包器
///
/// 解析器对每个顶点属性值调用一次 [`VertexPacker::on_scalar`]，顺序由文件决定。
/// 打包器把值暂存在当前顶点中，当文件中所有可用属性都已收到时，
/// 按加载标志对位置和法线取反，把记录序列化到顶点缓冲，并更新包围盒。

use crate::core::error::MeshLoadError;
use super::layout::{VertexLayout, MAX_RECORD_SIZE};
use super::mesh::Extents;
use super::property::{PropertyGroup, PropertySet, ScalarStorage, VertexProperty};

/// 加载时对数据的修改
///
/// 每个轴的取反同时作用于位置和法线，不影响纹理坐标和颜色。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadFlags {
    pub negate_x: bool,
    pub negate_y: bool,
    pub negate_z: bool,
}

impl LoadFlags {
    /// 不做任何修改
    pub const NONE: LoadFlags = LoadFlags {
        negate_x: false,
        negate_y: false,
        negate_z: false,
    };

    /// 第 `axis` 个轴（0=x, 1=y, 2=z）是否取反
    #[inline]
    pub fn negates(&self, axis: usize) -> bool {
        match axis {
            0 => self.negate_x,
            1 => self.negate_y,
            2 => self.negate_z,
            _ => false,
        }
    }
}

/// 解析器单次回调的参数
///
/// 标量属性的 `length` 为 1、`index` 为 0；
/// 列表属性会以列表长度和元素位置多次回调。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarArgument {
    pub length: usize,
    pub index: usize,
    pub value: f64,
}

impl ScalarArgument {
    /// 标量值
    #[inline]
    pub fn scalar(value: f64) -> Self {
        Self { length: 1, index: 0, value }
    }
}

/// 正在组装的顶点
///
/// 浮点属性和颜色通道分开存放，按属性表序号寻址。
#[derive(Debug, Clone, Copy, Default)]
struct PendingVertex {
    floats: [f32; 8],
    colors: [u8; 3],
}

impl PendingVertex {
    fn set(&mut self, property: VertexProperty, value: f64) {
        match property.storage() {
            // 饱和转换：截断小数部分，并限制在 0..=255
            ScalarStorage::Unorm8 => self.colors[property.index() - 8] = value as u8,
            ScalarStorage::Float32 => self.floats[property.index()] = value as f32,
        }
    }

    fn negate(&mut self, property: VertexProperty) {
        self.floats[property.index()] = -self.floats[property.index()];
    }

    fn position(&self) -> [f32; 3] {
        [self.floats[0], self.floats[1], self.floats[2]]
    }

    /// 按布局序列化为一条记录，填充字节为 0
    fn serialize(&self, layout: &VertexLayout, record: &mut [u8; MAX_RECORD_SIZE]) {
        record.fill(0);
        for property in layout.available().iter() {
            let Some(offset) = layout.offset(property) else {
                continue;
            };
            let offset = offset as usize;
            match property.storage() {
                ScalarStorage::Unorm8 => {
                    record[offset] = self.colors[property.index() - 8];
                }
                ScalarStorage::Float32 => {
                    let bytes = self.floats[property.index()].to_ne_bytes();
                    record[offset..offset + 4].copy_from_slice(&bytes);
                }
            }
        }
    }
}

/// 顶点记录打包器
#[derive(Debug)]
pub struct VertexPacker {
    layout: VertexLayout,
    flags: LoadFlags,
    pending: PendingVertex,
    received: PropertySet,
    record: [u8; MAX_RECORD_SIZE],
    vertices: Vec<u8>,
    vertex_count: usize,
    extents: Extents,
}

impl VertexPacker {
    pub fn new(layout: VertexLayout, flags: LoadFlags) -> Self {
        Self {
            layout,
            flags,
            pending: PendingVertex::default(),
            received: PropertySet::empty(),
            record: [0; MAX_RECORD_SIZE],
            vertices: Vec::new(),
            vertex_count: 0,
            extents: Extents::empty(),
        }
    }

    /// 预分配顶点缓冲
    pub fn reserve(&mut self, vertex_count: usize) {
        self.vertices
            .reserve(vertex_count.saturating_mul(self.layout.stride() as usize));
    }

    #[inline]
    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    /// 已完成的顶点数
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// 当前包围盒
    #[inline]
    pub fn extents(&self) -> &Extents {
        &self.extents
    }

    /// 接收一个顶点属性值
    ///
    /// 属性以列表形式出现（长度不为 1 或位置不为 0）时返回 `InvalidStructure`。
    /// 没有登记的属性被忽略。
    pub fn on_scalar(
        &mut self,
        property: VertexProperty,
        argument: ScalarArgument,
    ) -> Result<(), MeshLoadError> {
        if argument.length != 1 || argument.index != 0 {
            return Err(MeshLoadError::InvalidStructure(format!(
                "List type property not supported for vertex element '{}'",
                property
            )));
        }

        let available = self.layout.available();
        if !available.contains(property) {
            return Ok(());
        }

        self.pending.set(property, argument.value);
        self.received.insert(property);

        if self.received == available {
            self.complete_vertex();
        }

        Ok(())
    }

    fn complete_vertex(&mut self) {
        let available = self.layout.available();

        for axis in 0..3 {
            if !self.flags.negates(axis) {
                continue;
            }
            // 只有整组属性都存在时才取反
            for group in [PropertyGroup::Position, PropertyGroup::Normal] {
                if available.has_group(group) {
                    self.pending.negate(group.members()[axis]);
                }
            }
        }

        let stride = self.layout.stride() as usize;
        self.pending.serialize(&self.layout, &mut self.record);
        self.vertices.extend_from_slice(&self.record[..stride]);
        self.vertex_count += 1;

        if available.has_position() {
            self.extents.include(self.pending.position());
        }

        self.received.clear();
    }

    /// 结束打包，返回顶点缓冲、顶点数和包围盒
    ///
    /// 未收齐属性的最后一个顶点被丢弃。
    pub fn finish(self) -> (Vec<u8>, usize, Extents) {
        (self.vertices, self.vertex_count, self.extents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_layout() -> VertexLayout {
        VertexLayout::from_properties(PropertyGroup::Position.set())
    }

    fn push_vertex(packer: &mut VertexPacker, props: &[(VertexProperty, f64)]) {
        for (p, v) in props {
            packer.on_scalar(*p, ScalarArgument::scalar(*v)).unwrap();
        }
    }

    #[test]
    fn test_vertex_completes_when_all_received() {
        let mut packer = VertexPacker::new(position_layout(), LoadFlags::NONE);

        packer.on_scalar(VertexProperty::X, ScalarArgument::scalar(1.0)).unwrap();
        packer.on_scalar(VertexProperty::Y, ScalarArgument::scalar(2.0)).unwrap();
        assert_eq!(packer.vertex_count(), 0);

        packer.on_scalar(VertexProperty::Z, ScalarArgument::scalar(3.0)).unwrap();
        assert_eq!(packer.vertex_count(), 1);

        let (bytes, count, extents) = packer.finish();
        assert_eq!(count, 1);
        assert_eq!(bytes.len(), 12);
        assert_eq!(bytemuck::pod_read_unaligned::<f32>(&bytes[4..8]), 2.0);
        assert_eq!(extents.min, extents.max);
    }

    #[test]
    fn test_out_of_order_properties() {
        let mut packer = VertexPacker::new(position_layout(), LoadFlags::NONE);
        push_vertex(
            &mut packer,
            &[(VertexProperty::Z, 3.0), (VertexProperty::X, 1.0), (VertexProperty::Y, 2.0)],
        );

        let (bytes, _, _) = packer.finish();
        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_list_property_rejected() {
        let mut packer = VertexPacker::new(position_layout(), LoadFlags::NONE);
        let err = packer
            .on_scalar(VertexProperty::Z, ScalarArgument { length: 2, index: 0, value: 1.0 })
            .unwrap_err();

        assert!(matches!(err, MeshLoadError::InvalidStructure(_)));
        assert!(err.message().contains("'z'"));

        let err = packer
            .on_scalar(VertexProperty::X, ScalarArgument { length: 1, index: 1, value: 1.0 })
            .unwrap_err();
        assert!(matches!(err, MeshLoadError::InvalidStructure(_)));
    }

    #[test]
    fn test_negation_applies_to_position_and_normal() {
        let mut set = PropertyGroup::Position.set();
        for p in PropertyGroup::Normal.members().iter().chain(PropertyGroup::TexCoord.members()) {
            set.insert(*p);
        }
        let layout = VertexLayout::from_properties(set);
        let flags = LoadFlags { negate_x: true, negate_y: false, negate_z: true };
        let mut packer = VertexPacker::new(layout, flags);

        push_vertex(
            &mut packer,
            &[
                (VertexProperty::X, 1.0),
                (VertexProperty::Y, 2.0),
                (VertexProperty::Z, 3.0),
                (VertexProperty::Nx, 0.5),
                (VertexProperty::Ny, 0.25),
                (VertexProperty::Nz, 0.125),
                (VertexProperty::S, 0.75),
                (VertexProperty::T, 0.5),
            ],
        );

        let (bytes, _, extents) = packer.finish();
        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect();
        assert_eq!(values, vec![-1.0, 2.0, -3.0, -0.5, 0.25, -0.125, 0.75, 0.5]);
        assert_eq!(extents.min.x, -1.0);
        assert_eq!(extents.max.z, -3.0);
    }

    #[test]
    fn test_partial_normal_group_not_negated() {
        let mut set = PropertyGroup::Position.set();
        set.insert(VertexProperty::Nx);
        let layout = VertexLayout::from_properties(set);
        let flags = LoadFlags { negate_x: true, negate_y: false, negate_z: false };
        let mut packer = VertexPacker::new(layout, flags);

        push_vertex(
            &mut packer,
            &[
                (VertexProperty::X, 1.0),
                (VertexProperty::Y, 2.0),
                (VertexProperty::Z, 3.0),
                (VertexProperty::Nx, 0.5),
            ],
        );

        let (bytes, _, _) = packer.finish();
        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect();
        assert_eq!(values, vec![-1.0, 2.0, 3.0, 0.5]);
    }

    #[test]
    fn test_color_values_are_bytes() {
        let mut set = PropertyGroup::Position.set();
        for p in PropertyGroup::Color.members() {
            set.insert(*p);
        }
        let mut packer = VertexPacker::new(VertexLayout::from_properties(set), LoadFlags::NONE);

        push_vertex(
            &mut packer,
            &[
                (VertexProperty::X, 0.0),
                (VertexProperty::Y, 0.0),
                (VertexProperty::Z, 0.0),
                (VertexProperty::Red, 255.0),
                (VertexProperty::Green, 12.9),
                (VertexProperty::Blue, 300.0),
            ],
        );

        let (bytes, _, _) = packer.finish();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[12..16], &[255, 12, 255, 0]);
    }

    #[test]
    fn test_extents_track_all_vertices() {
        let mut packer = VertexPacker::new(position_layout(), LoadFlags::NONE);
        push_vertex(&mut packer, &[(VertexProperty::X, -1.0), (VertexProperty::Y, 5.0), (VertexProperty::Z, 0.0)]);
        push_vertex(&mut packer, &[(VertexProperty::X, 4.0), (VertexProperty::Y, -2.0), (VertexProperty::Z, 1.0)]);

        let extents = *packer.extents();
        assert_eq!(extents.min.x, -1.0);
        assert_eq!(extents.max.x, 4.0);
        assert_eq!(extents.min.y, -2.0);
        assert_eq!(extents.max.y, 5.0);
        assert_eq!(packer.vertex_count(), 2);
    }

    #[test]
    fn test_unregistered_property_ignored() {
        let mut packer = VertexPacker::new(position_layout(), LoadFlags::NONE);
        packer.on_scalar(VertexProperty::Red, ScalarArgument::scalar(1.0)).unwrap();
        push_vertex(&mut packer, &[(VertexProperty::X, 0.0), (VertexProperty::Y, 0.0), (VertexProperty::Z, 0.0)]);
        assert_eq!(packer.vertex_count(), 1);
    }
}
