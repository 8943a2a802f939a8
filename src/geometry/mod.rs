/// 几何体加载和打包模块
///
/// 把 PLY 文件解码为可直接上传到 GPU 的交错顶点缓冲和三角形索引缓冲。
///
/// # 模块结构
///
/// - `property`: 顶点属性表和属性集合
/// - `layout`: 根据文件中出现的属性计算记录布局
/// - `packer`: 逐值组装顶点记录
/// - `triangulate`: 多边形面的扇形三角化
/// - `mesh`: 索引宽度、包围盒和打包结果
/// - `loaders`: 解析器抽象和 PLY 加载流程
///
/// # 架构设计
///
/// ```text
/// 文件 (PLY)
///     ↓
/// PlySource → VertexPacker / FanTriangulator
///     ↓
/// PackedMesh (CPU侧数据)
///     ↓
/// PlyModel (上传到后端)
/// ```
///
/// # 使用示例
///
/// ```rust,no_run
/// use ply_render::geometry::loaders::{LoadFlags, PlyLoader};
/// use std::path::Path;
///
/// let mesh = PlyLoader::load_from_file(Path::new("model.ply"), LoadFlags::NONE, true)?;
///
/// println!("顶点数: {}", mesh.vertex_count());
/// println!("三角形数: {}", mesh.triangle_count());
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```

pub mod property;
pub mod layout;
pub mod packer;
pub mod triangulate;
pub mod mesh;
pub mod loaders;

// 重新导出常用类型
pub use property::{PropertyGroup, PropertySet, ScalarStorage, VertexProperty};
pub use layout::{VertexAttribute, VertexLayout};
pub use packer::{LoadFlags, ScalarArgument, VertexPacker};
pub use triangulate::FanTriangulator;
pub use mesh::{Extents, IndexBuffer, IndexWidth, PackedMesh};
