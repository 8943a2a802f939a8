/// PLY 加载模块
///
/// 把底层 PLY 解析器建模为一个可注入的能力 [`PlySource`]：
/// 它负责读取文件头、列出元素，并在读取数据时按文件顺序把每个值交给
/// [`ElementSink`]。加载流程本身在 [`ply_loader`] 中实现，与具体解析器无关。
///
/// # 架构设计
///
/// ```text
/// 文件字节 (PLY)
///     ↓
/// PlySource (PlyRsSource)      逐值回调
///     ↓
/// LoadSession (VertexPacker / FanTriangulator)
///     ↓
/// PackedMesh (CPU侧打包数据)
///     ↓
/// PlyModel (提交并上传到渲染后端)
/// ```
///
/// # 使用示例
///
/// ```rust,no_run
/// use ply_render::geometry::loaders::{LoadFlags, PlyLoader};
/// use std::path::Path;
///
/// let mesh = PlyLoader::load_from_file(Path::new("model.ply"), LoadFlags::NONE, true)?;
/// println!("三角形数: {}", mesh.triangle_count());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
use crate::core::error::MeshLoadError;
use crate::geometry::packer::ScalarArgument;
use crate::geometry::property::{PropertySet, VertexProperty};

pub mod ply_source;
pub mod ply_loader;

// 重新导出
pub use crate::geometry::packer::LoadFlags;
pub use ply_loader::{LoadSession, LoadStage, PlyLoader};
pub use ply_source::PlyRsSource;

/// 加载结果
pub type LoadResult<T> = std::result::Result<T, MeshLoadError>;

/// 顶点元素名
pub const VERTEX_ELEMENT: &str = "vertex";
/// 面元素名
pub const FACE_ELEMENT: &str = "face";
/// 面的索引列表属性名
pub const FACE_INDICES_PROPERTY: &str = "vertex_indices";

/// 文件头中声明的属性
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderProperty {
    pub name: String,
    /// 是否声明为列表
    pub is_list: bool,
}

/// 文件头中声明的元素
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderElement {
    pub name: String,
    /// 声明的实例数
    pub count: usize,
    pub properties: Vec<HeaderProperty>,
}

impl HeaderElement {
    /// 按名称查找属性
    pub fn property(&self, name: &str) -> Option<&HeaderProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// 在读取数据前登记的回调
///
/// 解析器只把登记过的属性值交给 [`ElementSink`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// 登记的顶点属性
    pub vertex: PropertySet,
    /// 是否登记了面的 `vertex_indices`
    pub face_indices: bool,
}

/// 接收解析器输出的值
pub trait ElementSink {
    /// 一个顶点属性值
    fn on_vertex_scalar(
        &mut self,
        property: VertexProperty,
        argument: ScalarArgument,
    ) -> LoadResult<()>;

    /// 一个面的完整顶点索引列表（未做范围检查）
    fn on_face_indices(&mut self, indices: &[i64]) -> LoadResult<()>;
}

/// 底层 PLY 解析器能力
///
/// 调用顺序固定：`read_header` → `elements` / `has_property` → `read`。
pub trait PlySource {
    /// 读取并解析文件头
    ///
    /// 格式错误时返回 `Header`。
    fn read_header(&mut self) -> LoadResult<()>;

    /// 文件头中的元素，按文件顺序排列
    fn elements(&self) -> &[HeaderElement];

    /// 按文件顺序读取数据，把登记过的值交给 `sink`
    ///
    /// `sink` 返回的错误原样传回；没有更具体原因的底层错误返回 `Parse`。
    fn read(&mut self, registration: &Registration, sink: &mut dyn ElementSink) -> LoadResult<()>;

    /// 查找元素
    fn element(&self, name: &str) -> Option<&HeaderElement> {
        self.elements().iter().find(|e| e.name == name)
    }

    /// 元素是否声明了某个属性
    fn has_property(&self, element: &str, property: &str) -> bool {
        self.element(element)
            .map(|e| e.property(property).is_some())
            .unwrap_or(false)
    }
}
