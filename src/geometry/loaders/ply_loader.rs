/// PLY 加载流程
///
/// 驱动解析器依次完成：读取文件头 → 登记属性 → 选择索引宽度 → 读取数据 → 校验，
/// 成功时得到一个 [`PackedMesh`]。任何一步失败都会丢弃本次加载的全部中间数据。
///
/// ```text
/// Opened → HeaderRead → PropertiesRegistered → IndexWidthSelected
///        → DataRead → Validated → Committed
/// ```

use std::path::Path;

use super::{
    ElementSink, LoadFlags, LoadResult, PlyRsSource, PlySource, Registration,
    FACE_ELEMENT, FACE_INDICES_PROPERTY, VERTEX_ELEMENT,
};
use crate::core::error::MeshLoadError;
use crate::geometry::layout::VertexLayout;
use crate::geometry::mesh::{IndexWidth, PackedMesh};
use crate::geometry::packer::{ScalarArgument, VertexPacker};
use crate::geometry::property::{PropertyGroup, VertexProperty};
use crate::geometry::triangulate::FanTriangulator;
use crate::{loader_debug, loader_info, loader_warn};

const MAX_RESERVED_VERTICES: usize = 1 << 20;

/// 加载流程所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadStage {
    Opened,
    HeaderRead,
    PropertiesRegistered,
    IndexWidthSelected,
    DataRead,
    Validated,
    Committed,
}

/// 一次加载的临时状态
///
/// 由单次加载独占，加载结束时销毁；只有成功时打包结果被转交出去。
#[derive(Debug)]
pub struct LoadSession {
    packer: VertexPacker,
    triangulator: FanTriangulator,
}

impl LoadSession {
    pub fn new(layout: VertexLayout, flags: LoadFlags, width: IndexWidth) -> Self {
        Self {
            packer: VertexPacker::new(layout, flags),
            triangulator: FanTriangulator::new(width),
        }
    }

    /// 已完成的顶点数
    pub fn vertex_count(&self) -> usize {
        self.packer.vertex_count()
    }

    /// 已输出的索引数
    pub fn index_count(&self) -> usize {
        self.triangulator.index_count()
    }

    /// 读取结束后的结构校验，通过后返回打包结果
    ///
    /// `name` 用于错误消息。
    pub fn validate(self, name: &str) -> LoadResult<PackedMesh> {
        if self.triangulator.index_count() < 3 {
            return Err(MeshLoadError::NoFaces(format!("No faces found in {}", name)));
        }

        if self.triangulator.max_index() as usize >= self.packer.vertex_count() {
            return Err(MeshLoadError::IndexOutOfRange(format!(
                "Index out of range in {}: face references vertex {} but only {} vertices were read",
                name,
                self.triangulator.max_index(),
                self.packer.vertex_count()
            )));
        }

        let layout = *self.packer.layout();
        let (vertices, _, extents) = self.packer.finish();
        let (indices, min_index, max_index) = self.triangulator.finish();

        Ok(PackedMesh {
            vertices,
            layout,
            indices,
            min_index,
            max_index,
            extents,
        })
    }
}

impl ElementSink for LoadSession {
    fn on_vertex_scalar(
        &mut self,
        property: VertexProperty,
        argument: ScalarArgument,
    ) -> LoadResult<()> {
        self.packer.on_scalar(property, argument)
    }

    fn on_face_indices(&mut self, indices: &[i64]) -> LoadResult<()> {
        self.triangulator.on_face_indices(indices)
    }
}

/// PLY 格式加载器
///
/// # 使用示例
///
/// ```rust,no_run
/// use ply_render::geometry::loaders::{LoadFlags, PlyLoader};
/// use std::path::Path;
///
/// let flags = LoadFlags { negate_y: true, ..LoadFlags::NONE };
/// let mesh = PlyLoader::load_from_file(Path::new("bunny.ply"), flags, true)?;
/// println!("{} 个顶点", mesh.vertex_count());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PlyLoader;

impl PlyLoader {
    /// 从文件路径加载
    ///
    /// `wide_indices` 是渲染后端是否支持 32 位索引。
    pub fn load_from_file(
        path: &Path,
        flags: LoadFlags,
        wide_indices: bool,
    ) -> LoadResult<PackedMesh> {
        let name = path.display().to_string();
        let mut source = PlyRsSource::open(path).map_err(|e| {
            loader_warn!(stage = ?LoadStage::Opened, "Failed to open PLY file: {}", e);
            e
        })?;
        Self::load_from_source(&mut source, flags, wide_indices, &name)
    }

    /// 从内存中的 PLY 文档加载
    pub fn load_from_memory(
        data: &[u8],
        flags: LoadFlags,
        wide_indices: bool,
    ) -> LoadResult<PackedMesh> {
        let mut source = PlyRsSource::from_bytes(data);
        Self::load_from_source(&mut source, flags, wide_indices, "<memory>")
    }

    /// 使用任意解析器加载
    ///
    /// `name` 只用于日志和错误消息。
    pub fn load_from_source<S: PlySource + ?Sized>(
        source: &mut S,
        flags: LoadFlags,
        wide_indices: bool,
        name: &str,
    ) -> LoadResult<PackedMesh> {
        let mut stage = LoadStage::Opened;

        match Self::run(source, flags, wide_indices, name, &mut stage) {
            Ok(mesh) => {
                loader_info!(
                    vertices = mesh.vertex_count(),
                    triangles = mesh.triangle_count(),
                    index_width = ?mesh.index_width(),
                    "Loaded PLY file: {}",
                    name
                );
                Ok(mesh)
            }
            Err(e) => {
                loader_warn!(stage = ?stage, kind = %e.kind(), "Failed to load {}: {}", name, e.message());
                Err(e)
            }
        }
    }

    fn run<S: PlySource + ?Sized>(
        source: &mut S,
        flags: LoadFlags,
        wide_indices: bool,
        name: &str,
        stage: &mut LoadStage,
    ) -> LoadResult<PackedMesh> {
        source.read_header()?;
        *stage = LoadStage::HeaderRead;
        loader_debug!(elements = source.elements().len(), "Header read");

        // 按属性表顺序登记；文件中没有的属性被跳过
        let layout = VertexLayout::register(|property| {
            source.has_property(VERTEX_ELEMENT, property.name())
        });
        let available = layout.available();

        if !available.has_position() {
            return Err(MeshLoadError::MissingProperty(format!(
                "PLY file {} is missing the vertex properties",
                name
            )));
        }

        for group in [PropertyGroup::Normal, PropertyGroup::TexCoord, PropertyGroup::Color] {
            if available.has_partial_group(group) {
                loader_warn!("PLY file {} has an incomplete {:?} group, it will be ignored for rendering", name, group);
            }
        }

        if !source.has_property(FACE_ELEMENT, FACE_INDICES_PROPERTY) {
            return Err(MeshLoadError::MissingProperty(format!(
                "PLY file {} is missing face property '{}'",
                name, FACE_INDICES_PROPERTY
            )));
        }

        *stage = LoadStage::PropertiesRegistered;
        loader_debug!(properties = ?available, stride = layout.stride(), "Vertex properties registered");

        let declared = source
            .element(VERTEX_ELEMENT)
            .map(|e| e.count)
            .ok_or_else(|| {
                MeshLoadError::MissingProperty(format!(
                    "PLY file {} is missing the vertex element",
                    name
                ))
            })?;
        let width = IndexWidth::select(declared, wide_indices)?;

        *stage = LoadStage::IndexWidthSelected;
        loader_debug!(declared_vertices = declared, index_width = ?width, "Index width selected");

        let registration = Registration {
            vertex: available,
            face_indices: true,
        };
        let mut session = LoadSession::new(layout, flags, width);
        // 文件头中的数量不可信，预分配设上限
        session.packer.reserve(declared.min(MAX_RESERVED_VERTICES));
        source.read(&registration, &mut session)?;

        *stage = LoadStage::DataRead;
        loader_debug!(
            vertices = session.vertex_count(),
            indices = session.index_count(),
            "Element data read"
        );

        let mesh = session.validate(name)?;
        *stage = LoadStage::Validated;

        Ok(mesh)
    }

    /// 支持的文件扩展名（小写，不含点号）
    pub fn supported_extensions() -> &'static [&'static str] {
        &["ply"]
    }
}
