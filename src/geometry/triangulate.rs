/// 面的扇形三角化
///
/// 把每个多边形面的顶点索引列表分解为共享第一个顶点的三角形扇：
/// 第一个索引为锚点 A，第二个为 B；之后每个索引 C 生成三角形 (A, B, C)，
/// 然后令 B = C。K 边形生成 K-2 个三角形。
///
/// 对凹多边形会得到错误的三角形，这是已知限制。

use crate::core::error::MeshLoadError;
use super::mesh::{IndexBuffer, IndexWidth};

/// 扇形三角化器
///
/// 索引宽度在创建时确定。每个输出索引都会更新引用到的最小/最大索引。
#[derive(Debug)]
pub struct FanTriangulator {
    indices: IndexBuffer,
    min_index: u32,
    max_index: u32,
    first: u32,
    last: u32,
}

impl FanTriangulator {
    pub fn new(width: IndexWidth) -> Self {
        Self {
            indices: IndexBuffer::new(width),
            min_index: u32::MAX,
            max_index: 0,
            first: 0,
            last: 0,
        }
    }

    /// 接收一个面的顶点索引列表
    ///
    /// 少于 3 个索引的面不生成三角形，也不改变扇形锚点。
    /// 负数或超出 32 位的索引返回 `IndexOutOfRange`；
    /// 其余范围检查在读取结束后进行。
    pub fn on_face_indices(&mut self, face: &[i64]) -> Result<(), MeshLoadError> {
        if face.len() < 3 {
            return Ok(());
        }

        let mut vertices = face.iter().map(|&value| {
            u32::try_from(value).map_err(|_| {
                MeshLoadError::IndexOutOfRange(format!(
                    "Face references invalid vertex index {}",
                    value
                ))
            })
        });

        // 长度已检查，前两个一定存在
        if let (Some(a), Some(b)) = (vertices.next(), vertices.next()) {
            self.first = a?;
            self.last = b?;
        }

        for vertex in vertices {
            let vertex = vertex?;
            self.add_index(self.first);
            self.add_index(self.last);
            self.add_index(vertex);
            self.last = vertex;
        }

        Ok(())
    }

    fn add_index(&mut self, index: u32) {
        self.max_index = self.max_index.max(index);
        self.min_index = self.min_index.min(index);
        self.indices.push(index);
    }

    /// 已输出的索引数
    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// 引用到的最大索引
    #[inline]
    pub fn max_index(&self) -> u32 {
        self.max_index
    }

    /// 引用到的最小索引
    #[inline]
    pub fn min_index(&self) -> u32 {
        self.min_index
    }

    /// 当前扇形锚点 (A, B)
    #[inline]
    pub fn anchors(&self) -> (u32, u32) {
        (self.first, self.last)
    }

    /// 结束三角化，返回索引缓冲和索引范围
    pub fn finish(self) -> (IndexBuffer, u32, u32) {
        (self.indices, self.min_index, self.max_index)
    }
}
