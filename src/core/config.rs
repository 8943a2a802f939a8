//! 配置管理模块
//!
//! 提供加载参数、渲染后端和日志的配置。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [loading]
//! negate_x = false
//! negate_y = true
//! negate_z = false
//!
//! [renderer]
//! backend = "recording"  # 或 "wgpu"
//! wide_indices = true
//! target_width = 256
//! target_height = 256
//!
//! [logging]
//! level = "info"      # trace, debug, info, warn, error
//! file_output = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result};
use crate::geometry::loaders::LoadFlags;

/// 配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 加载配置
    #[serde(default)]
    pub loading: LoadingConfig,

    /// 渲染后端配置
    #[serde(default)]
    pub renderer: RendererConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 加载配置
///
/// 每个轴的取反标志同时作用于位置和法线。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadingConfig {
    #[serde(default)]
    pub negate_x: bool,

    #[serde(default)]
    pub negate_y: bool,

    #[serde(default)]
    pub negate_z: bool,
}

/// 渲染后端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// 后端选择
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    /// 记录后端是否声明支持 32 位索引
    #[serde(default = "default_wide_indices")]
    pub wide_indices: bool,

    /// 离屏渲染目标宽度（wgpu）
    #[serde(default = "default_target_size")]
    pub target_width: u32,

    /// 离屏渲染目标高度（wgpu）
    #[serde(default = "default_target_size")]
    pub target_height: u32,
}

/// 渲染后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// CPU 侧记录后端，不需要 GPU
    Recording,
    /// wgpu 无窗口后端
    Wgpu,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_backend() -> BackendKind { BackendKind::Recording }
fn default_wide_indices() -> bool { true }
fn default_target_size() -> u32 { 256 }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "ply_render.log".to_string() }

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            wide_indices: default_wide_indices(),
            target_width: default_target_size(),
            target_height: default_target_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl LoadingConfig {
    /// 转换为加载标志
    pub fn flags(&self) -> LoadFlags {
        LoadFlags {
            negate_x: self.negate_x,
            negate_y: self.negate_y,
            negate_z: self.negate_z,
        }
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 示例
    ///
    /// ```no_run
    /// use ply_render::core::Config;
    ///
    /// let config = Config::from_file("config.toml")?;
    /// # Ok::<(), ply_render::core::PlyRenderError>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        Self::from_toml_str(&contents)
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--negate-x` / `--negate-y` / `--negate-z`: 对应轴取反
    /// - `--wgpu`: 使用 wgpu 后端
    /// - `--narrow-indices`: 记录后端不支持 32 位索引
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for arg in args {
            match arg.as_ref() {
                "--negate-x" => self.loading.negate_x = true,
                "--negate-y" => self.loading.negate_y = true,
                "--negate-z" => self.loading.negate_z = true,
                "--wgpu" => self.renderer.backend = BackendKind::Wgpu,
                "--narrow-indices" => self.renderer.wide_indices = false,
                _ => {}
            }
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.renderer.target_width == 0 || self.renderer.target_height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "renderer.target_width/target_height".to_string(),
                reason: "Render target dimensions must be greater than 0".to_string(),
            }.into());
        }

        Ok(())
    }
}

impl BackendKind {
    /// 获取后端名称
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Recording => "recording",
            BackendKind::Wgpu => "wgpu",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.renderer.backend, BackendKind::Recording);
        assert!(config.renderer.wide_indices);
        assert_eq!(config.loading.flags(), LoadFlags::default());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.renderer.target_height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = Config::from_toml_str("[loading]\nnegate_y = true\n").unwrap();
        assert!(config.loading.negate_y);
        assert!(!config.loading.negate_x);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config.apply_args(["--negate-z", "--wgpu", "--narrow-indices", "model.ply"]);

        assert!(config.loading.negate_z);
        assert_eq!(config.renderer.backend, BackendKind::Wgpu);
        assert!(!config.renderer.wide_indices);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.loading.negate_x = true;
        config.save_to_file(&path).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert!(reloaded.loading.negate_x);
    }
}
