//! 数学类型
//!
//! 基于 `nalgebra` 的类型别名和少量变换辅助函数。

pub use nalgebra::{Matrix4 as Mat4, Vector3 as Vec3};

// 类型别名，使用更简洁的名称
pub type Vector3 = Vec3<f32>;
pub type Matrix4 = Mat4<f32>;

/// 矩阵辅助函数
pub mod matrix {
    use super::{Matrix4, Vector3};

    /// 缩放矩阵
    pub fn scaling(x: f32, y: f32, z: f32) -> Matrix4 {
        Matrix4::new_nonuniform_scaling(&Vector3::new(x, y, z))
    }

    /// 平移矩阵
    pub fn translation(x: f32, y: f32, z: f32) -> Matrix4 {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// 把包围盒 `[min, max]` 均匀缩放并平移到裁剪空间的 `[-1, 1]` 立方体内
    ///
    /// z 轴映射到 `[0, 1]`（wgpu 的深度范围）。退化（零尺寸）的轴按 1 处理。
    pub fn fit_extents(min: &Vector3, max: &Vector3) -> Matrix4 {
        let center = (min + max) * 0.5;
        let size = max - min;
        let largest = size.x.max(size.y).max(size.z);
        let scale = if largest > 0.0 { 2.0 / largest } else { 1.0 };

        let to_origin = translation(-center.x, -center.y, -center.z);
        let fit = scaling(scale, scale, scale * 0.5);
        let depth = translation(0.0, 0.0, 0.5);

        depth * fit * to_origin
    }
}
