//! 错误处理模块
//!
//! 定义了加载和渲染过程中使用的统一错误类型。
//!
//! # 设计原则
//!
//! - 为每种错误类型提供清晰的上下文信息
//! - 网格加载错误与加载失败分类一一对应，便于模式匹配
//! - 支持错误链（error source）

use std::fmt;

/// 统一的 Result 类型
///
/// 所有可能返回错误的函数都应该使用这个类型。
pub type Result<T> = std::result::Result<T, PlyRenderError>;

/// 顶层错误类型
#[derive(Debug)]
pub enum PlyRenderError {
    /// 配置错误
    Config(ConfigError),

    /// 图形 API 错误
    Graphics(GraphicsError),

    /// 网格加载错误
    MeshLoading(MeshLoadError),

    /// IO 错误
    Io(std::io::Error),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },
}

/// 图形 API 相关的错误
#[derive(Debug)]
pub enum GraphicsError {
    /// 设备创建失败
    DeviceCreation(String),

    /// 资源创建失败（顶点/索引缓冲上传等）
    ResourceCreation(String),
}

/// 网格加载失败的分类
///
/// 与 [`MeshLoadError`] 的变体一一对应，不携带消息。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadErrorKind {
    Io,
    Header,
    MissingProperty,
    InvalidStructure,
    UnsupportedIndexWidth,
    NoFaces,
    IndexOutOfRange,
    Parse,
}

/// 网格加载相关的错误
///
/// 每个变体携带一条可读的错误消息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshLoadError {
    /// 文件无法打开或读取
    Io(String),

    /// 文件头格式错误
    Header(String),

    /// 缺少必需的元素或属性（vertex 元素、x/y/z、vertex_indices）
    MissingProperty(String),

    /// 标量属性以列表形式出现
    InvalidStructure(String),

    /// 需要 32 位索引但后端不支持
    UnsupportedIndexWidth(String),

    /// 总索引数少于 3
    NoFaces(String),

    /// 面引用了不存在的顶点
    IndexOutOfRange(String),

    /// 没有更具体原因的底层解析错误
    Parse(String),
}

impl MeshLoadError {
    /// 获取错误分类
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            MeshLoadError::Io(_) => LoadErrorKind::Io,
            MeshLoadError::Header(_) => LoadErrorKind::Header,
            MeshLoadError::MissingProperty(_) => LoadErrorKind::MissingProperty,
            MeshLoadError::InvalidStructure(_) => LoadErrorKind::InvalidStructure,
            MeshLoadError::UnsupportedIndexWidth(_) => LoadErrorKind::UnsupportedIndexWidth,
            MeshLoadError::NoFaces(_) => LoadErrorKind::NoFaces,
            MeshLoadError::IndexOutOfRange(_) => LoadErrorKind::IndexOutOfRange,
            MeshLoadError::Parse(_) => LoadErrorKind::Parse,
        }
    }

    /// 获取错误消息
    pub fn message(&self) -> &str {
        match self {
            MeshLoadError::Io(msg)
            | MeshLoadError::Header(msg)
            | MeshLoadError::MissingProperty(msg)
            | MeshLoadError::InvalidStructure(msg)
            | MeshLoadError::UnsupportedIndexWidth(msg)
            | MeshLoadError::NoFaces(msg)
            | MeshLoadError::IndexOutOfRange(msg)
            | MeshLoadError::Parse(msg) => msg,
        }
    }
}

impl PlyRenderError {
    /// 如果是网格加载错误，返回其分类
    pub fn load_error_kind(&self) -> Option<LoadErrorKind> {
        match self {
            PlyRenderError::MeshLoading(e) => Some(e.kind()),
            _ => None,
        }
    }
}

impl fmt::Display for PlyRenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlyRenderError::Config(e) => write!(f, "Configuration error: {}", e),
            PlyRenderError::Graphics(e) => write!(f, "Graphics error: {}", e),
            PlyRenderError::MeshLoading(e) => write!(f, "Mesh loading error: {}", e),
            PlyRenderError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsError::DeviceCreation(msg) => write!(f, "Device creation failed: {}", msg),
            GraphicsError::ResourceCreation(msg) => write!(f, "Resource creation failed: {}", msg),
        }
    }
}

impl fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadErrorKind::Io => "io",
            LoadErrorKind::Header => "header",
            LoadErrorKind::MissingProperty => "missing property",
            LoadErrorKind::InvalidStructure => "invalid structure",
            LoadErrorKind::UnsupportedIndexWidth => "unsupported index width",
            LoadErrorKind::NoFaces => "no faces",
            LoadErrorKind::IndexOutOfRange => "index out of range",
            LoadErrorKind::Parse => "parse",
        };
        f.write_str(name)
    }
}

impl fmt::Display for MeshLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.kind())
    }
}

impl std::error::Error for PlyRenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlyRenderError::Io(e) => Some(e),
            PlyRenderError::MeshLoading(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for GraphicsError {}
impl std::error::Error for MeshLoadError {}

// 实现 From trait 以便于错误转换
impl From<std::io::Error> for PlyRenderError {
    fn from(err: std::io::Error) -> Self {
        PlyRenderError::Io(err)
    }
}

impl From<ConfigError> for PlyRenderError {
    fn from(err: ConfigError) -> Self {
        PlyRenderError::Config(err)
    }
}

impl From<GraphicsError> for PlyRenderError {
    fn from(err: GraphicsError) -> Self {
        PlyRenderError::Graphics(err)
    }
}

impl From<MeshLoadError> for PlyRenderError {
    fn from(err: MeshLoadError) -> Self {
        PlyRenderError::MeshLoading(err)
    }
}
