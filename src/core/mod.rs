//! 核心功能模块
//!
//! 本模块提供与具体图形 API 无关的基础功能。
//!
//! # 模块组织
//!
//! - `math`：基于 nalgebra 的向量/矩阵类型
//! - `log`：日志系统，提供结构化的日志记录功能
//! - `config`：配置管理，支持从配置文件加载设置
//! - `error`：错误处理，定义统一的错误类型

pub mod math;
pub mod log;
pub mod config;
pub mod error;

// 重新导出常用类型，方便使用
pub use math::{Matrix4, Vector3};
pub use error::{LoadErrorKind, MeshLoadError, PlyRenderError, Result};
pub use config::Config;
