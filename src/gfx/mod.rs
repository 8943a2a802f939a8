//! 图形后端模块
//!
//! 本模块封装了具体图形 API 的底层实现。目前只有 wgpu：
//! 跨平台的高层图形抽象（支持 Vulkan、Metal、DX12、OpenGL）。
//!
//! 后端实现了 [`MeshBackend`](crate::renderer::MeshBackend) trait，
//! 可以直接交给 [`PlyModel`](crate::renderer::PlyModel) 使用。

pub mod wgpu;

pub use self::wgpu::WgpuBackend;
