//! ply_render - PLY 网格解码与打包
//!
//! 把 PLY 文件流式解码为交错顶点缓冲和三角形索引缓冲，并交给渲染后端绘制。
//! 本库提供了加载流程、统一的后端接口和核心功能模块。
//!
//! # 模块结构
//!
//! - `core`: 核心功能模块（数学、日志、配置、错误处理）
//! - `geometry`: 几何体模块（属性表、记录打包、三角化、PLY 加载流程）
//! - `renderer`: 渲染器模块（模型提交与绘制、后端接口、CPU 记录后端）
//! - `gfx`: 图形后端实现（wgpu 离屏后端）
//!
//! # 使用示例
//!
//! ```no_run
//! use ply_render::geometry::LoadFlags;
//! use ply_render::renderer::{PlyModel, RecordingBackend};
//! use std::path::Path;
//!
//! let mut backend = RecordingBackend::new(true);
//! let mut model = PlyModel::new();
//!
//! let flags = LoadFlags { negate_z: true, ..LoadFlags::NONE };
//! model.load(&mut backend, flags, Path::new("bunny.ply"))?;
//! model.render(&mut backend)?;
//!
//! if let Some(extents) = model.extents() {
//!     println!("包围盒: {:?} - {:?}", extents.min, extents.max);
//! }
//! # Ok::<(), ply_render::core::PlyRenderError>(())
//! ```

pub mod core;
pub mod geometry;
pub mod renderer;
pub mod gfx;

pub use crate::core::{Config, LoadErrorKind, MeshLoadError, PlyRenderError, Result};
pub use crate::geometry::{LoadFlags, PackedMesh};
pub use crate::renderer::{MeshBackend, PlyModel};
