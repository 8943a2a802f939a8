/// 打包后的网格数据结构
///
/// 定义加载成功后提交给模型的 CPU 侧数据：交错顶点缓冲、
/// 按最窄宽度存储的三角形索引缓冲、索引范围和包围盒。

use crate::core::error::MeshLoadError;
use crate::core::math::Vector3;
use super::layout::VertexLayout;
use super::property::{ScalarStorage, VertexProperty};

/// 索引宽度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexWidth {
    /// 8 位索引，最多 256 个顶点
    U8,
    /// 16 位索引，最多 65536 个顶点
    U16,
    /// 32 位索引
    U32,
}

impl IndexWidth {
    /// 选择能寻址 `vertex_count` 个顶点的最窄索引宽度
    ///
    /// `vertex_count` 是文件头声明的顶点数。需要 32 位索引但后端不支持时返回
    /// `UnsupportedIndexWidth`。
    ///
    /// # 示例
    ///
    /// ```rust
    /// use ply_render::geometry::IndexWidth;
    ///
    /// assert_eq!(IndexWidth::select(256, false).unwrap(), IndexWidth::U8);
    /// assert_eq!(IndexWidth::select(257, false).unwrap(), IndexWidth::U16);
    /// assert!(IndexWidth::select(65537, false).is_err());
    /// ```
    pub fn select(vertex_count: usize, wide_supported: bool) -> Result<Self, MeshLoadError> {
        if vertex_count <= 0x100 {
            Ok(IndexWidth::U8)
        } else if vertex_count <= 0x10000 {
            Ok(IndexWidth::U16)
        } else if wide_supported {
            Ok(IndexWidth::U32)
        } else {
            Err(MeshLoadError::UnsupportedIndexWidth(format!(
                "The PLY file has {} vertices and requires 32-bit indices \
                 but this is not supported by the rendering backend",
                vertex_count
            )))
        }
    }

    /// 每个索引的字节数
    #[inline]
    pub fn byte_size(self) -> usize {
        match self {
            IndexWidth::U8 => 1,
            IndexWidth::U16 => 2,
            IndexWidth::U32 => 4,
        }
    }
}

/// 索引缓冲
///
/// 宽度在创建时确定，之后不再改变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    /// 创建指定宽度的空索引缓冲
    pub fn new(width: IndexWidth) -> Self {
        match width {
            IndexWidth::U8 => IndexBuffer::U8(Vec::new()),
            IndexWidth::U16 => IndexBuffer::U16(Vec::new()),
            IndexWidth::U32 => IndexBuffer::U32(Vec::new()),
        }
    }

    /// 索引宽度
    pub fn width(&self) -> IndexWidth {
        match self {
            IndexBuffer::U8(_) => IndexWidth::U8,
            IndexBuffer::U16(_) => IndexWidth::U16,
            IndexBuffer::U32(_) => IndexWidth::U32,
        }
    }

    /// 追加一个索引
    ///
    /// 超出当前宽度的值会被截断；这类值一定大于等于顶点数，
    /// 会在读取结束后的范围检查中被拒绝。
    pub fn push(&mut self, index: u32) {
        match self {
            IndexBuffer::U8(v) => v.push(index as u8),
            IndexBuffer::U16(v) => v.push(index as u16),
            IndexBuffer::U32(v) => v.push(index),
        }
    }

    /// 索引数量
    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U8(v) => v.len(),
            IndexBuffer::U16(v) => v.len(),
            IndexBuffer::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 读取第 `i` 个索引
    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            IndexBuffer::U8(v) => v.get(i).map(|&x| u32::from(x)),
            IndexBuffer::U16(v) => v.get(i).map(|&x| u32::from(x)),
            IndexBuffer::U32(v) => v.get(i).copied(),
        }
    }

    /// 原始字节视图（本机字节序），用于上传到 GPU
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexBuffer::U8(v) => v.as_slice(),
            IndexBuffer::U16(v) => bytemuck::cast_slice(v),
            IndexBuffer::U32(v) => bytemuck::cast_slice(v),
        }
    }

    /// 以 32 位值遍历所有索引
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

/// 轴对齐包围盒
///
/// 由所有顶点位置的逐分量最小值和最大值构成。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extents {
    pub min: Vector3,
    pub max: Vector3,
}

impl Extents {
    /// 空包围盒：最小值为 +∞，最大值为 -∞
    pub fn empty() -> Self {
        Self {
            min: Vector3::repeat(f32::INFINITY),
            max: Vector3::repeat(f32::NEG_INFINITY),
        }
    }

    /// 用一个位置扩展包围盒
    pub fn include(&mut self, position: [f32; 3]) {
        for axis in 0..3 {
            let value = position[axis];
            if value < self.min[axis] {
                self.min[axis] = value;
            }
            if value > self.max[axis] {
                self.max[axis] = value;
            }
        }
    }

    /// 是否至少包含过一个顶点
    pub fn is_valid(&self) -> bool {
        (0..3).all(|axis| self.min[axis] <= self.max[axis])
    }
}

impl Default for Extents {
    fn default() -> Self {
        Self::empty()
    }
}

/// 打包后的网格
///
/// 一次成功加载的全部产物。顶点缓冲是按 [`VertexLayout`] 交错排列的字节序列。
#[derive(Debug, Clone, PartialEq)]
pub struct PackedMesh {
    /// 交错顶点数据
    pub vertices: Vec<u8>,
    /// 顶点记录布局
    pub layout: VertexLayout,
    /// 三角形列表索引
    pub indices: IndexBuffer,
    /// 引用到的最小索引
    pub min_index: u32,
    /// 引用到的最大索引
    pub max_index: u32,
    /// 包围盒
    pub extents: Extents,
}

impl PackedMesh {
    /// 顶点数量
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / self.layout.stride().max(1) as usize
    }

    /// 索引数量
    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// 三角形数量
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// 索引宽度
    #[inline]
    pub fn index_width(&self) -> IndexWidth {
        self.indices.width()
    }

    /// 引用到的索引范围（闭区间）
    #[inline]
    pub fn index_range(&self) -> (u32, u32) {
        (self.min_index, self.max_index)
    }

    /// 顶点缓冲字节
    #[inline]
    pub fn vertex_bytes(&self) -> &[u8] {
        &self.vertices
    }

    /// 索引缓冲字节
    #[inline]
    pub fn index_bytes(&self) -> &[u8] {
        self.indices.as_bytes()
    }

    fn field(&self, vertex: usize, property: VertexProperty) -> Option<&[u8]> {
        let offset = self.layout.offset(property)? as usize;
        let start = vertex.checked_mul(self.layout.stride() as usize)? + offset;
        let size = property.byte_size() as usize;
        self.vertices.get(start..start + size)
    }

    /// 读回某个顶点的浮点属性
    pub fn read_vertex_f32(&self, vertex: usize, property: VertexProperty) -> Option<f32> {
        if property.storage() != ScalarStorage::Float32 {
            return None;
        }
        self.field(vertex, property)
            .map(bytemuck::pod_read_unaligned::<f32>)
    }

    /// 读回某个顶点的颜色通道
    pub fn read_vertex_u8(&self, vertex: usize, property: VertexProperty) -> Option<u8> {
        if property.storage() != ScalarStorage::Unorm8 {
            return None;
        }
        self.field(vertex, property).map(|bytes| bytes[0])
    }
}
