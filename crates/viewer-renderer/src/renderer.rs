//! WGPU scene renderer implementing the core's scene-graph interface

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use tracing::debug;
use wgpu::util::DeviceExt;

use viewer_core::{CameraFrame, SceneGraph, SceneNode};

use crate::camera::OrbitCamera;
use crate::grid::GridRenderer;
use crate::mesh::{GpuMesh, Vertex};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Direction towards the light; shadows project along its opposite.
/// Matches LIGHT_DIR in shaders/mesh.wgsl.
const LIGHT_DIR: Vec3 = Vec3::new(0.35, 0.9, 0.25);

const SHADOW_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 0.35];

/// Per-node uniform: model matrix plus flat color.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct NodeUniform {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

struct Node {
    robot: String,
    name: String,
    mesh: GpuMesh,
    color: [f32; 4],
    cast_shadow: bool,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    shadow_uniform_buffer: wgpu::Buffer,
    shadow_bind_group: wgpu::BindGroup,
}

/// Scene renderer: robot nodes by name, orbit camera, grid, planar shadows.
pub struct Renderer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    format: wgpu::TextureFormat,
    depth_view: wgpu::TextureView,
    camera: OrbitCamera,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    node_bind_group_layout: wgpu::BindGroupLayout,
    mesh_pipeline: wgpu::RenderPipeline,
    grid: GridRenderer,
    nodes: Vec<Node>,
    clear_color: wgpu::Color,
}

impl Renderer {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let camera = OrbitCamera::new(width as f32 / height.max(1) as f32);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera.uniform()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Camera Bind Group Layout"),
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

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let node_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Node Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mesh.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout, &node_bind_group_layout],
            push_constant_ranges: &[],
        });

        let mesh_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let grid = GridRenderer::new(
            &device,
            format,
            DEPTH_FORMAT,
            &camera_bind_group_layout,
            &camera_buffer,
        );

        let depth_view = create_depth_view(&device, width, height);

        Self {
            device,
            queue,
            format,
            depth_view,
            camera,
            camera_buffer,
            camera_bind_group,
            node_bind_group_layout,
            mesh_pipeline,
            grid,
            nodes: Vec::new(),
            clear_color: wgpu::Color {
                r: 0.08,
                g: 0.08,
                b: 0.1,
                a: 1.0,
            },
        }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn set_clear_color(&mut self, color: [f32; 3]) {
        self.clear_color = wgpu::Color {
            r: color[0] as f64,
            g: color[1] as f64,
            b: color[2] as f64,
            a: 1.0,
        };
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        self.depth_view = create_depth_view(&self.device, width, height);
        self.camera.update_aspect(width as f32 / height as f32);
    }

    /// Render the scene into `view`.
    pub fn render(&mut self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[self.camera.uniform()]));

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        self.grid.render(&mut render_pass);

        render_pass.set_pipeline(&self.mesh_pipeline);
        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
        for node in &self.nodes {
            render_pass.set_bind_group(1, &node.bind_group, &[]);
            render_pass.set_vertex_buffer(0, node.mesh.vertex_buffer.slice(..));
            render_pass.draw(0..node.mesh.vertex_count, 0..1);
        }
        // Flattened copies onto the ground plane.
        for node in &self.nodes {
            if !node.cast_shadow {
                continue;
            }
            render_pass.set_bind_group(1, &node.shadow_bind_group, &[]);
            render_pass.set_vertex_buffer(0, node.mesh.vertex_buffer.slice(..));
            render_pass.draw(0..node.mesh.vertex_count, 0..1);
        }
    }

    fn write_node_uniforms(&self, node: &Node, transform: Mat4) {
        let uniform = NodeUniform {
            model: transform.to_cols_array_2d(),
            color: node.color,
        };
        self.queue
            .write_buffer(&node.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));

        let shadow = NodeUniform {
            model: (shadow_matrix(LIGHT_DIR) * transform).to_cols_array_2d(),
            color: SHADOW_COLOR,
        };
        self.queue.write_buffer(
            &node.shadow_uniform_buffer,
            0,
            bytemuck::cast_slice(&[shadow]),
        );
    }

    fn create_node(&self, robot_name: &str, scene_node: SceneNode) -> Node {
        let mesh = GpuMesh::new(&self.device, &scene_node.mesh);

        let make_buffer = |label: &str| {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: std::mem::size_of::<NodeUniform>() as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let uniform_buffer = make_buffer("Node Uniform Buffer");
        let shadow_uniform_buffer = make_buffer("Node Shadow Uniform Buffer");

        let make_bind_group = |buffer: &wgpu::Buffer| {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Node Bind Group"),
                layout: &self.node_bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            })
        };
        let bind_group = make_bind_group(&uniform_buffer);
        let shadow_bind_group = make_bind_group(&shadow_uniform_buffer);

        let node = Node {
            robot: robot_name.to_string(),
            name: scene_node.name,
            mesh,
            color: scene_node.color,
            cast_shadow: scene_node.cast_shadow,
            uniform_buffer,
            bind_group,
            shadow_uniform_buffer,
            shadow_bind_group,
        };
        self.write_node_uniforms(&node, scene_node.transform);
        node
    }
}

impl SceneGraph for Renderer {
    fn add(&mut self, robot_name: &str, nodes: Vec<SceneNode>) {
        debug!(robot = %robot_name, nodes = nodes.len(), "attaching robot nodes");
        for scene_node in nodes {
            let node = self.create_node(robot_name, scene_node);
            self.nodes.push(node);
        }
    }

    fn remove(&mut self, robot_name: &str) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|node| node.robot != robot_name);
        before != self.nodes.len()
    }

    fn contains(&self, robot_name: &str) -> bool {
        self.nodes.iter().any(|node| node.robot == robot_name)
    }

    fn set_node_transform(&mut self, robot_name: &str, node_name: &str, transform: Mat4) {
        if let Some(node) = self
            .nodes
            .iter()
            .find(|node| node.robot == robot_name && node.name == node_name)
        {
            self.write_node_uniforms(node, transform);
        }
    }

    fn frame_camera(&mut self, frame: CameraFrame) {
        self.camera.apply_frame(frame);
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Squash geometry onto the ground plane along the light direction.
fn shadow_matrix(light_dir: Vec3) -> Mat4 {
    let d = -light_dir.normalize();
    // y' is lifted slightly above the plane to avoid fighting the grid.
    Mat4::from_cols_array_2d(&[
        [1.0, 0.0, 0.0, 0.0],
        [-d.x / d.y, 0.0, -d.z / d.y, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.002, 0.0, 1.0],
    ])
}
