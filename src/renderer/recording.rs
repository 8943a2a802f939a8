//! CPU 记录后端
//!
//! 保存上传的缓冲副本，并记录每一次绘制。用于测试和没有 GPU 的环境。

use tracing::debug;

use super::backend_trait::{DrawRange, MeshBackend};
use crate::core::error::{GraphicsError, Result};
use crate::geometry::mesh::{IndexWidth, PackedMesh};

/// 上传到记录后端的网格
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMesh {
    /// 上传序号，从 0 开始
    pub id: usize,
    pub vertex_bytes: Vec<u8>,
    pub index_bytes: Vec<u8>,
    pub stride: u32,
    pub index_width: IndexWidth,
}

/// 一次绘制记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub mesh_id: usize,
    pub range: DrawRange,
}

/// CPU 记录后端
#[derive(Debug)]
pub struct RecordingBackend {
    wide_indices: bool,
    uploads: usize,
    fail_uploads: bool,
    draws: Vec<DrawCall>,
}

impl RecordingBackend {
    /// `wide_indices` 决定是否声明支持 32 位索引
    pub fn new(wide_indices: bool) -> Self {
        Self {
            wide_indices,
            uploads: 0,
            fail_uploads: false,
            draws: Vec::new(),
        }
    }

    /// 让之后的上传全部失败
    pub fn set_fail_uploads(&mut self, fail: bool) {
        self.fail_uploads = fail;
    }

    /// 成功上传的次数
    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    /// 所有绘制记录，按发出顺序排列
    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new(true)
    }
}

impl MeshBackend for RecordingBackend {
    type Mesh = RecordedMesh;

    fn backend_name(&self) -> &str {
        "recording"
    }

    fn supports_wide_indices(&self) -> bool {
        self.wide_indices
    }

    fn create_mesh(&mut self, mesh: &PackedMesh) -> Result<RecordedMesh> {
        if self.fail_uploads {
            return Err(GraphicsError::ResourceCreation(
                "Recording backend rejected the upload".to_string(),
            )
            .into());
        }

        let recorded = RecordedMesh {
            id: self.uploads,
            vertex_bytes: mesh.vertex_bytes().to_vec(),
            index_bytes: mesh.index_bytes().to_vec(),
            stride: mesh.layout.stride(),
            index_width: mesh.index_width(),
        };
        self.uploads += 1;

        debug!(
            id = recorded.id,
            vertex_bytes = recorded.vertex_bytes.len(),
            index_bytes = recorded.index_bytes.len(),
            "Recorded mesh upload"
        );

        Ok(recorded)
    }

    fn draw_mesh(&mut self, mesh: &RecordedMesh, range: &DrawRange) -> Result<()> {
        self.draws.push(DrawCall {
            mesh_id: mesh.id,
            range: *range,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::loaders::{LoadFlags, PlyLoader};

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
1 0 0
0 1 0
3 0 1 2
";

    #[test]
    fn test_upload_copies_buffers() {
        let mesh = PlyLoader::load_from_memory(TRIANGLE.as_bytes(), LoadFlags::NONE, true).unwrap();
        let mut backend = RecordingBackend::new(false);

        let recorded = backend.create_mesh(&mesh).unwrap();
        assert_eq!(recorded.id, 0);
        assert_eq!(recorded.vertex_bytes, mesh.vertices);
        assert_eq!(recorded.index_bytes, vec![0, 1, 2]);
        assert_eq!(recorded.index_width, IndexWidth::U8);
        assert_eq!(backend.upload_count(), 1);
    }

    #[test]
    fn test_draws_are_recorded() {
        let mesh = PlyLoader::load_from_memory(TRIANGLE.as_bytes(), LoadFlags::NONE, true).unwrap();
        let mut backend = RecordingBackend::default();
        let recorded = backend.create_mesh(&mesh).unwrap();

        let range = DrawRange::for_mesh(&mesh).unwrap();
        backend.draw_mesh(&recorded, &range).unwrap();

        assert_eq!(backend.draws().len(), 1);
        assert_eq!(backend.draws()[0].range.count, 3);
        assert_eq!(backend.draws()[0].range.triangle_count(), 1);
        assert_eq!(backend.draws()[0].range.max_index, 2);
    }

    #[test]
    fn test_failed_upload() {
        let mesh = PlyLoader::load_from_memory(TRIANGLE.as_bytes(), LoadFlags::NONE, true).unwrap();
        let mut backend = RecordingBackend::new(true);
        backend.set_fail_uploads(true);

        assert!(backend.create_mesh(&mesh).is_err());
        assert_eq!(backend.upload_count(), 0);
    }
}
