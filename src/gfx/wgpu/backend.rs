//! wgpu 网格后端
//!
//! 本模块把打包好的 PLY 网格上传到 wgpu，并把三角形列表绘制到离屏目标：
//! - 按顶点布局生成着色器和渲染管线（同一布局只创建一次）
//! - 上传顶点缓冲、索引缓冲和变换矩阵
//! - 8 位索引在上传时扩展为 16 位（wgpu 没有 8 位索引格式）

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use tracing::{debug, info};
use wgpu::util::DeviceExt;

use super::context::{WgpuContext, DEPTH_FORMAT, TARGET_FORMAT};
use crate::core::error::{GraphicsError, Result};
use crate::core::math::matrix;
use crate::core::Matrix4;
use crate::geometry::layout::{VertexAttribute, VertexLayout};
use crate::geometry::mesh::{IndexBuffer, PackedMesh};
use crate::geometry::property::{PropertyGroup, ScalarStorage};
use crate::renderer::backend_trait::{DrawRange, MeshBackend};

/// 变换矩阵 uniform
///
/// 必须使用 #[repr(C)] 保证内存布局与着色器一致。
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct TransformUniform {
    transform: [[f32; 4]; 4],
}

impl TransformUniform {
    fn new(transform: &Matrix4) -> Self {
        Self {
            transform: *transform.as_ref(),
        }
    }
}

/// 上传到 GPU 的网格
pub struct WgpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_format: wgpu::IndexFormat,
    bind_group: wgpu::BindGroup,
    pipeline: Arc<wgpu::RenderPipeline>,
}

/// wgpu 网格后端
pub struct WgpuBackend {
    gfx: WgpuContext,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: Vec<(VertexLayout, Arc<wgpu::RenderPipeline>)>,
}

impl WgpuBackend {
    /// 创建 `width × height` 离屏目标的后端
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let gfx = WgpuContext::new(width, height)?;

        debug!("Creating bind group layout");
        let bind_group_layout = gfx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Transform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = gfx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        info!("wgpu mesh backend created");

        Ok(Self {
            gfx,
            bind_group_layout,
            pipeline_layout,
            pipelines: Vec::new(),
        })
    }

    /// 读回最近一次绘制的离屏图像（RGBA8）
    pub fn read_pixels(&self) -> Result<Vec<u8>> {
        self.gfx.read_target()
    }

    fn pipeline_for(&mut self, layout: &VertexLayout) -> Arc<wgpu::RenderPipeline> {
        if let Some((_, pipeline)) = self.pipelines.iter().find(|(l, _)| l == layout) {
            return Arc::clone(pipeline);
        }

        debug!(stride = layout.stride(), "Creating render pipeline for vertex layout");
        let attributes: Vec<wgpu::VertexAttribute> =
            layout.attributes().iter().map(vertex_attribute).collect();
        let source = shader_source(layout);
        let shader_module = self.gfx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let pipeline = self.gfx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: layout.stride() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // 取反单个轴会翻转环绕方向
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        let pipeline = Arc::new(pipeline);
        self.pipelines.push((*layout, Arc::clone(&pipeline)));
        pipeline
    }
}

impl MeshBackend for WgpuBackend {
    type Mesh = WgpuMesh;

    fn backend_name(&self) -> &str {
        "wgpu"
    }

    fn supports_wide_indices(&self) -> bool {
        true
    }

    fn create_mesh(&mut self, mesh: &PackedMesh) -> Result<WgpuMesh> {
        let pipeline = self.pipeline_for(&mesh.layout);
        let device = &self.gfx.device;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        debug!("Creating vertex buffer");
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: mesh.vertex_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });

        debug!("Creating index buffer");
        let (index_bytes, index_format) = upload_indices(&mesh.indices);
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: &index_bytes,
            usage: wgpu::BufferUsages::INDEX,
        });

        let transform = matrix::fit_extents(&mesh.extents.min, &mesh.extents.max);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Transform Buffer"),
            contents: bytemuck::cast_slice(&[TransformUniform::new(&transform)]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Transform Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        for _ in 0..2 {
            if let Some(e) = pollster::block_on(device.pop_error_scope()) {
                return Err(GraphicsError::ResourceCreation(format!(
                    "Failed to upload mesh buffers: {}",
                    e
                ))
                .into());
            }
        }

        Ok(WgpuMesh {
            vertex_buffer,
            index_buffer,
            index_format,
            bind_group,
            pipeline,
        })
    }

    fn draw_mesh(&mut self, mesh: &WgpuMesh, range: &DrawRange) -> Result<()> {
        let mut encoder = self.gfx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.gfx.target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.gfx.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&mesh.pipeline);
            render_pass.set_bind_group(0, &mesh.bind_group, &[]);
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), mesh.index_format);
            render_pass.draw_indexed(range.first..range.first + range.count, 0, 0..1);
        }

        self.gfx.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

/// 上传用的索引字节和格式
fn upload_indices(indices: &IndexBuffer) -> (Vec<u8>, wgpu::IndexFormat) {
    match indices {
        IndexBuffer::U8(v) => {
            let widened: Vec<u16> = v.iter().map(|&i| u16::from(i)).collect();
            (bytemuck::cast_slice(&widened).to_vec(), wgpu::IndexFormat::Uint16)
        }
        IndexBuffer::U16(v) => (bytemuck::cast_slice(v).to_vec(), wgpu::IndexFormat::Uint16),
        IndexBuffer::U32(v) => (bytemuck::cast_slice(v).to_vec(), wgpu::IndexFormat::Uint32),
    }
}

/// 分组对应的着色器输入位置
fn shader_location(group: PropertyGroup) -> u32 {
    match group {
        PropertyGroup::Position => 0,
        PropertyGroup::Normal => 1,
        PropertyGroup::TexCoord => 2,
        PropertyGroup::Color => 3,
    }
}

fn vertex_format(attribute: &VertexAttribute) -> wgpu::VertexFormat {
    match (attribute.storage, attribute.components) {
        (ScalarStorage::Float32, 2) => wgpu::VertexFormat::Float32x2,
        (ScalarStorage::Float32, _) => wgpu::VertexFormat::Float32x3,
        // 第 4 个字节是记录末尾的填充
        (ScalarStorage::Unorm8, _) => wgpu::VertexFormat::Unorm8x4,
    }
}

fn vertex_attribute(attribute: &VertexAttribute) -> wgpu::VertexAttribute {
    wgpu::VertexAttribute {
        offset: attribute.offset as wgpu::BufferAddress,
        shader_location: shader_location(attribute.group),
        format: vertex_format(attribute),
    }
}

/// 根据布局中的完整分组生成 WGSL
///
/// 有颜色时使用顶点颜色，否则有法线时用法线着色，否则用纹理坐标，最后退回灰色。
pub fn shader_source(layout: &VertexLayout) -> String {
    let available = layout.available();
    let mut inputs = String::from("    @location(0) position: vec3<f32>,\n");
    if available.has_normal() {
        inputs.push_str("    @location(1) normal: vec3<f32>,\n");
    }
    if available.has_tex_coord() {
        inputs.push_str("    @location(2) tex_coord: vec2<f32>,\n");
    }
    if available.has_color() {
        inputs.push_str("    @location(3) color: vec4<f32>,\n");
    }

    let color = if available.has_color() {
        "in.color.rgb"
    } else if available.has_normal() {
        "in.normal * 0.5 + vec3<f32>(0.5, 0.5, 0.5)"
    } else if available.has_tex_coord() {
        "vec3<f32>(in.tex_coord, 0.5)"
    } else {
        "vec3<f32>(0.8, 0.8, 0.8)"
    };

    format!(
        r#"struct Transform {{
    transform: mat4x4<f32>,
}};

@group(0) @binding(0)
var<uniform> uniforms: Transform;

struct VertexInput {{
{inputs}}};

struct VertexOutput {{
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
}};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {{
    var out: VertexOutput;
    out.clip_position = uniforms.transform * vec4<f32>(in.position, 1.0);
    out.color = {color};
    return out;
}}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
    return vec4<f32>(in.color, 1.0);
}}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::property::PropertySet;

    fn layout_with(groups: &[PropertyGroup]) -> VertexLayout {
        let set: PropertySet = groups
            .iter()
            .flat_map(|g| g.members().iter().copied())
            .collect();
        VertexLayout::from_properties(set)
    }

    #[test]
    fn test_position_only_shader() {
        let source = shader_source(&layout_with(&[PropertyGroup::Position]));
        assert!(source.contains("@location(0) position"));
        assert!(!source.contains("@location(1)"));
        assert!(source.contains("vec3<f32>(0.8, 0.8, 0.8)"));
    }

    #[test]
    fn test_color_shader_prefers_vertex_color() {
        let layout = layout_with(&[PropertyGroup::Position, PropertyGroup::Normal, PropertyGroup::Color]);
        let source = shader_source(&layout);
        assert!(source.contains("@location(1) normal"));
        assert!(source.contains("@location(3) color: vec4<f32>"));
        assert!(source.contains("out.color = in.color.rgb;"));
    }

    #[test]
    fn test_vertex_attributes_match_layout() {
        let layout = layout_with(&[PropertyGroup::Position, PropertyGroup::TexCoord, PropertyGroup::Color]);
        let attributes: Vec<wgpu::VertexAttribute> =
            layout.attributes().iter().map(vertex_attribute).collect();

        assert_eq!(attributes.len(), 3);
        assert_eq!(attributes[0].format, wgpu::VertexFormat::Float32x3);
        assert_eq!(attributes[1].shader_location, 2);
        assert_eq!(attributes[1].format, wgpu::VertexFormat::Float32x2);
        assert_eq!(attributes[1].offset, 12);
        assert_eq!(attributes[2].format, wgpu::VertexFormat::Unorm8x4);
        assert_eq!(attributes[2].offset, 20);
        assert_eq!(layout.stride(), 24);
    }

    #[test]
    fn test_narrow_indices_are_widened() {
        let (bytes, format) = upload_indices(&IndexBuffer::U8(vec![0, 1, 255]));
        assert_eq!(format, wgpu::IndexFormat::Uint16);
        let values: Vec<u16> = bytes
            .chunks_exact(2)
            .map(bytemuck::pod_read_unaligned::<u16>)
            .collect();
        assert_eq!(values, vec![0, 1, 255]);

        let (_, format) = upload_indices(&IndexBuffer::U32(vec![0, 1, 70000]));
        assert_eq!(format, wgpu::IndexFormat::Uint32);
    }
}
