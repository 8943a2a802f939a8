//! wgpu 图形后端实现
//!
//! 基于 wgpu 的无窗口后端，wgpu 可以在 Vulkan、Metal、DirectX 12、OpenGL
//! 等多种后端上运行。网格被绘制到离屏 RGBA 目标，可以读回 CPU。
//!
//! # 模块结构
//!
//! - `context` - WgpuContext 结构（设备初始化和离屏目标）
//! - `backend` - WgpuBackend 结构（上传网格和绘制）

mod backend;
mod context;

pub use backend::{shader_source, WgpuBackend, WgpuMesh};
pub use context::WgpuContext;
