//! 统一的网格后端接口
//!
//! 本模块定义了所有渲染后端都必须实现的接口。[`PlyModel`](super::PlyModel)
//! 只通过这个接口上传打包好的网格并发出绘制命令，不关心具体使用的是哪个后端。

use crate::core::error::{GraphicsError, Result};
use crate::geometry::mesh::{IndexWidth, PackedMesh};

/// 一次三角形列表绘制的参数
///
/// 覆盖已提交的整个索引缓冲。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRange {
    /// 引用到的最小顶点索引
    pub min_index: u32,
    /// 引用到的最大顶点索引
    pub max_index: u32,
    /// 第一个索引的位置
    pub first: u32,
    /// 索引数（三角形数 × 3）
    pub count: u32,
    pub index_width: IndexWidth,
}

impl DrawRange {
    /// 覆盖整个网格的绘制范围
    ///
    /// 索引数超出 32 位时返回 `GraphicsError::ResourceCreation`。
    pub fn for_mesh(mesh: &PackedMesh) -> Result<Self> {
        let (min_index, max_index) = mesh.index_range();
        Ok(Self {
            min_index,
            max_index,
            first: 0,
            count: draw_count(mesh.index_count())?,
            index_width: mesh.index_width(),
        })
    }

    /// 三角形数
    #[inline]
    pub fn triangle_count(&self) -> u32 {
        self.count / 3
    }
}

fn draw_count(index_count: usize) -> Result<u32> {
    u32::try_from(index_count).map_err(|_| {
        GraphicsError::ResourceCreation(format!(
            "Index count {} exceeds the 32-bit draw range",
            index_count
        ))
        .into()
    })
}

/// 统一的网格后端接口
///
/// # 方法说明
///
/// - `supports_wide_indices()`: 是否支持 32 位索引，每次加载查询一次
/// - `create_mesh()`: 把打包好的缓冲上传为后端资源
/// - `draw_mesh()`: 对已上传的网格发出一次三角形列表绘制
///
/// # 示例
///
/// ```ignore
/// let mut backend = RecordingBackend::new(true);
/// let gpu_mesh = backend.create_mesh(&packed)?;
/// backend.draw_mesh(&gpu_mesh, &DrawRange::for_mesh(&packed)?)?;
/// ```
pub trait MeshBackend {
    /// 上传后的网格资源，由后端持有其生命周期
    type Mesh;

    /// 后端名称，用于日志
    fn backend_name(&self) -> &str;

    /// 是否支持 32 位索引
    fn supports_wide_indices(&self) -> bool;

    /// 上传网格
    ///
    /// 失败时返回 `GraphicsError::ResourceCreation`，不影响已有资源。
    fn create_mesh(&mut self, mesh: &PackedMesh) -> Result<Self::Mesh>;

    /// 绘制一个已上传的网格
    fn draw_mesh(&mut self, mesh: &Self::Mesh, range: &DrawRange) -> Result<()>;
}
