//! 渲染器模块
//!
//! 本模块提供 PLY 模型的加载、提交和绘制接口。
//! 应用程序通过 [`PlyModel`] 与底层后端交互，而不需要关心具体使用的是哪个后端。
//!
//! # 架构设计
//!
//! - `PlyModel`：持有已提交的网格，对外提供加载、绘制和包围盒查询
//! - `MeshBackend`：后端接口，负责上传缓冲和发出绘制
//! - 具体实现：`recording`（CPU 记录）和 `gfx::wgpu`（离屏 GPU）
//!
//! 加载要么完全成功并整体替换已提交的状态，要么失败并保持原状态不变。

use std::path::Path;

use tracing::{debug, info, warn};

use crate::core::error::Result;
use crate::geometry::loaders::{LoadFlags, LoadStage, PlyLoader};
use crate::geometry::mesh::{Extents, IndexWidth, PackedMesh};

pub mod backend_trait;
pub mod recording;

pub use backend_trait::{DrawRange, MeshBackend};
pub use recording::RecordingBackend;

/// 已提交的模型状态
struct Committed<M> {
    packed: PackedMesh,
    mesh: M,
    range: DrawRange,
}

/// PLY 模型
///
/// 同一个模型上的加载必须由调用者串行执行。
pub struct PlyModel<B: MeshBackend> {
    committed: Option<Committed<B::Mesh>>,
}

impl<B: MeshBackend> PlyModel<B> {
    /// 创建一个尚未加载的模型
    pub fn new() -> Self {
        Self { committed: None }
    }

    /// 从文件加载并提交
    ///
    /// 失败时之前提交的状态保持不变。
    pub fn load(&mut self, backend: &mut B, flags: LoadFlags, path: &Path) -> Result<()> {
        let wide = backend.supports_wide_indices();
        let packed = PlyLoader::load_from_file(path, flags, wide)?;
        self.commit(backend, packed)
    }

    /// 从内存中的 PLY 文档加载并提交
    pub fn load_from_memory(&mut self, backend: &mut B, flags: LoadFlags, data: &[u8]) -> Result<()> {
        let wide = backend.supports_wide_indices();
        let packed = PlyLoader::load_from_memory(data, flags, wide)?;
        self.commit(backend, packed)
    }

    fn commit(&mut self, backend: &mut B, packed: PackedMesh) -> Result<()> {
        let range = DrawRange::for_mesh(&packed)?;
        let mesh = backend.create_mesh(&packed).map_err(|e| {
            warn!("Failed to upload mesh to {} backend: {}", backend.backend_name(), e);
            e
        })?;

        info!(
            stage = ?LoadStage::Committed,
            backend = backend.backend_name(),
            triangles = range.triangle_count(),
            "Committed PLY model"
        );

        // 整体替换，旧资源在这里释放
        self.committed = Some(Committed { packed, mesh, range });
        Ok(())
    }

    /// 绘制已提交的网格
    ///
    /// 从未成功加载时什么也不做。
    pub fn render(&self, backend: &mut B) -> Result<()> {
        match &self.committed {
            Some(c) => backend.draw_mesh(&c.mesh, &c.range),
            None => {
                debug!("No committed model, skipping draw");
                Ok(())
            }
        }
    }

    /// 包围盒
    ///
    /// 从未成功加载时返回 `None`。
    pub fn extents(&self) -> Option<Extents> {
        self.committed
            .as_ref()
            .map(|c| c.packed.extents)
            .filter(Extents::is_valid)
    }

    pub fn is_loaded(&self) -> bool {
        self.committed.is_some()
    }

    /// 已提交的打包数据
    pub fn packed(&self) -> Option<&PackedMesh> {
        self.committed.as_ref().map(|c| &c.packed)
    }

    /// 后端持有的网格资源
    pub fn backend_mesh(&self) -> Option<&B::Mesh> {
        self.committed.as_ref().map(|c| &c.mesh)
    }

    pub fn triangle_count(&self) -> usize {
        self.packed().map(PackedMesh::triangle_count).unwrap_or(0)
    }

    pub fn index_width(&self) -> Option<IndexWidth> {
        self.packed().map(PackedMesh::index_width)
    }

    /// 引用到的最小/最大顶点索引
    pub fn index_range(&self) -> Option<(u32, u32)> {
        self.packed().map(PackedMesh::index_range)
    }
}

impl<B: MeshBackend> Default for PlyModel<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::LoadErrorKind;
    use crate::geometry::property::VertexProperty;

    const QUAD: &str = "ply
format ascii 1.0
element vertex 4
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
-1 -1 0
1 -1 0
1 1 2
-1 1 2
4 0 1 2 3
";

    const TRIANGLE: &str = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
5 0 0
0 5 0
3 0 1 2
";

    const BROKEN: &str = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
5 0 0
0 5 0
3 0 1 3
";

    #[test]
    fn test_render_before_load_is_noop() {
        let model: PlyModel<RecordingBackend> = PlyModel::new();
        let mut backend = RecordingBackend::default();

        model.render(&mut backend).unwrap();
        assert!(backend.draws().is_empty());
        assert!(model.extents().is_none());
        assert_eq!(model.triangle_count(), 0);
    }

    #[test]
    fn test_load_and_render() {
        let mut model = PlyModel::new();
        let mut backend = RecordingBackend::default();
        model
            .load_from_memory(&mut backend, LoadFlags::NONE, QUAD.as_bytes())
            .unwrap();

        assert_eq!(model.triangle_count(), 2);
        assert_eq!(model.index_range(), Some((0, 3)));
        let extents = model.extents().unwrap();
        assert_eq!(extents.min.x, -1.0);
        assert_eq!(extents.max.z, 2.0);

        model.render(&mut backend).unwrap();
        let draw = backend.draws()[0];
        assert_eq!(draw.range.count, 6);
        assert_eq!(draw.range.first, 0);
        assert_eq!(draw.range.max_index, 3);
    }

    #[test]
    fn test_failed_load_keeps_previous_state() {
        let mut model = PlyModel::new();
        let mut backend = RecordingBackend::default();
        model
            .load_from_memory(&mut backend, LoadFlags::NONE, QUAD.as_bytes())
            .unwrap();
        let before = model.packed().unwrap().clone();

        let err = model
            .load_from_memory(&mut backend, LoadFlags::NONE, BROKEN.as_bytes())
            .unwrap_err();
        assert_eq!(err.load_error_kind(), Some(LoadErrorKind::IndexOutOfRange));

        assert_eq!(model.packed(), Some(&before));
        assert_eq!(model.backend_mesh().map(|m| m.id), Some(0));
    }

    #[test]
    fn test_failed_upload_keeps_previous_state() {
        let mut model = PlyModel::new();
        let mut backend = RecordingBackend::default();
        model
            .load_from_memory(&mut backend, LoadFlags::NONE, QUAD.as_bytes())
            .unwrap();

        backend.set_fail_uploads(true);
        let err = model
            .load_from_memory(&mut backend, LoadFlags::NONE, TRIANGLE.as_bytes())
            .unwrap_err();
        assert!(err.load_error_kind().is_none());
        assert_eq!(model.triangle_count(), 2);
    }

    #[test]
    fn test_reload_replaces_state() {
        let mut model = PlyModel::new();
        let mut backend = RecordingBackend::default();
        model
            .load_from_memory(&mut backend, LoadFlags::NONE, QUAD.as_bytes())
            .unwrap();
        model
            .load_from_memory(&mut backend, LoadFlags::NONE, TRIANGLE.as_bytes())
            .unwrap();

        assert_eq!(model.triangle_count(), 1);
        assert_eq!(model.extents().unwrap().max.x, 5.0);
        assert_eq!(model.backend_mesh().map(|m| m.id), Some(1));
    }

    #[test]
    fn test_load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.ply");
        std::fs::write(&path, QUAD).unwrap();

        let mut backend = RecordingBackend::default();
        let mut first = PlyModel::new();
        let mut second = PlyModel::new();
        first.load(&mut backend, LoadFlags::NONE, &path).unwrap();
        second.load(&mut backend, LoadFlags::NONE, &path).unwrap();

        assert_eq!(first.packed(), second.packed());
        let a = first.backend_mesh().unwrap();
        let b = second.backend_mesh().unwrap();
        assert_eq!(a.vertex_bytes, b.vertex_bytes);
        assert_eq!(a.index_bytes, b.index_bytes);
    }

    #[test]
    fn test_narrow_backend_rejects_wide_mesh() {
        let mut doc = String::from(
            "ply\nformat ascii 1.0\nelement vertex 65537\nproperty float x\nproperty float y\nproperty float z\n\
             element face 1\nproperty list uchar int vertex_indices\nend_header\n",
        );
        for i in 0..65537 {
            doc.push_str(&format!("{} 0 0\n", i));
        }
        doc.push_str("3 0 1 65536\n");

        let mut model = PlyModel::new();
        let mut narrow = RecordingBackend::new(false);
        let err = model
            .load_from_memory(&mut narrow, LoadFlags::NONE, doc.as_bytes())
            .unwrap_err();
        assert_eq!(err.load_error_kind(), Some(LoadErrorKind::UnsupportedIndexWidth));
        assert!(!model.is_loaded());

        let mut wide = RecordingBackend::new(true);
        model
            .load_from_memory(&mut wide, LoadFlags::NONE, doc.as_bytes())
            .unwrap();
        assert_eq!(model.index_width(), Some(IndexWidth::U32));
        assert_eq!(
            model.packed().and_then(|p| p.read_vertex_f32(65536, VertexProperty::X)),
            Some(65536.0)
        );
    }

    #[test]
    fn test_missing_file_leaves_model_empty() {
        let mut model = PlyModel::new();
        let mut backend = RecordingBackend::default();
        let err = model
            .load(&mut backend, LoadFlags::NONE, Path::new("no/such/model.ply"))
            .unwrap_err();
        assert_eq!(err.load_error_kind(), Some(LoadErrorKind::Io));
        assert!(!model.is_loaded());
    }
}
