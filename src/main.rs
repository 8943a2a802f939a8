//! ply_render - PLY 模型加载工具
//!
//! 加载一个 PLY 文件，提交到所选后端并绘制一次，然后输出网格信息。
//! 可以通过配置文件或命令行参数选择后端和加载选项。
//!
//! # 使用方法
//!
//! ```bash
//! # 使用配置文件
//! cargo run -- model.ply
//!
//! # 使用 wgpu 离屏后端，并对 z 轴取反
//! cargo run -- model.ply --wgpu --negate-z
//! ```
//!
//! # 命令行参数
//!
//! - `--negate-x` / `--negate-y` / `--negate-z`: 加载时对应轴取反
//! - `--wgpu`: 使用 wgpu 离屏后端
//! - `--narrow-indices`: 记录后端不支持 32 位索引

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use tracing::{error, info};

use ply_render::core::config::BackendKind;
use ply_render::core::{log, Config};
use ply_render::gfx::WgpuBackend;
use ply_render::renderer::{MeshBackend, PlyModel, RecordingBackend};

/// 加载、绘制并输出网格信息
fn run<B: MeshBackend>(backend: &mut B, config: &Config, path: &Path) -> anyhow::Result<()> {
    let mut model = PlyModel::new();
    model
        .load(backend, config.loading.flags(), path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    model.render(backend)?;

    let packed = model
        .packed()
        .ok_or_else(|| anyhow!("Model was not committed"))?;

    println!("file:        {}", path.display());
    println!("backend:     {}", backend.backend_name());
    println!("vertices:    {}", packed.vertex_count());
    println!("triangles:   {}", packed.triangle_count());
    println!("stride:      {} bytes", packed.layout.stride());
    println!("index width: {:?}", packed.index_width());
    println!("index range: {:?}", packed.index_range());
    if let Some(extents) = model.extents() {
        println!(
            "extents:     ({}, {}, {}) - ({}, {}, {})",
            extents.min.x, extents.min.y, extents.min.z,
            extents.max.x, extents.max.y, extents.max.z
        );
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    // 1. 加载配置（在初始化日志之前）
    let mut config = Config::from_file_or_default("config.toml");

    // 2. 应用命令行参数
    config.apply_args(std::env::args().skip(1));

    // 3. 验证配置
    config.validate()?;

    // 4. 初始化日志系统
    let log_file = if config.logging.file_output {
        Some(config.logging.log_file.as_str())
    } else {
        None
    };
    log::init_logger(config.logging.level, config.logging.file_output, log_file);
    info!(version = env!("CARGO_PKG_VERSION"), "ply_render starting");

    let path: PathBuf = std::env::args()
        .skip(1)
        .find(|arg| !arg.starts_with("--"))
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("Usage: ply_render <model.ply> [--wgpu] [--negate-x|y|z] [--narrow-indices]"))?;

    info!(
        backend = config.renderer.backend.name(),
        flags = ?config.loading.flags(),
        "Loading configuration"
    );

    let result = match config.renderer.backend {
        BackendKind::Recording => {
            let mut backend = RecordingBackend::new(config.renderer.wide_indices);
            run(&mut backend, &config, &path)
        }
        BackendKind::Wgpu => {
            let mut backend = WgpuBackend::new(config.renderer.target_width, config.renderer.target_height)?;
            run(&mut backend, &config, &path).and_then(|()| {
                // 背景清为黑色
                let pixels = backend.read_pixels()?;
                let covered = pixels.chunks_exact(4).filter(|p| p[..3] != [0, 0, 0]).count();
                println!("covered:     {} pixels", covered);
                Ok(())
            })
        }
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
