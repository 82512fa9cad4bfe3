//! Scene pass: skybox, lit objects, light markers and instanced turbines into
//! the dual-output scene target

use crate::bind;
use crate::mesh::{create_cube_mesh, GpuMesh, InstanceRaw, Vertex};
use crate::model::{import_model_or_empty, MaterialFactory, Model};
use crate::renderer::FrameParams;
use crate::shader::{ShaderProgram, SCENE_SLOTS, SCENE_WGSL};
use crate::skybox::SkyboxPass;
use crate::targets::{SceneTarget, DEPTH_STENCIL_FORMAT};
use crate::uniforms::{FrameUniforms, ObjectUniforms};
use crate::RenderError;
use glowtown_core::{InstanceScatter, Mat4, PolygonMode, Vec3, MAX_POINT_LIGHTS};
use std::path::Path;
use wgpu::util::DeviceExt;

/// Edge length of a point-light marker cube
pub const MARKER_SIZE: f32 = 0.2;

/// Uniform buffer and bind group for one drawn object
struct ObjectSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl ObjectSlot {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<ObjectUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = bind::uniform_bind_group(device, label, layout, &buffer);
        Self { buffer, bind_group }
    }

    fn write(&self, queue: &wgpu::Queue, uniforms: &ObjectUniforms) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(uniforms));
    }
}

/// Lit and instanced pipelines for one polygon mode
struct ScenePipelines {
    lit: wgpu::RenderPipeline,
    instanced: wgpu::RenderPipeline,
}

pub struct ScenePass {
    skybox: SkyboxPass,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    fill: Option<ScenePipelines>,
    line: Option<ScenePipelines>,
    line_warned: bool,

    city: Model,
    tree: Model,
    turbine: Model,
    marker: GpuMesh,
    marker_material: wgpu::BindGroup,

    city_slot: ObjectSlot,
    tree_one_slot: ObjectSlot,
    tree_two_slot: ObjectSlot,
    marker_slots: Vec<ObjectSlot>,
    marker_count: u32,

    scatter: InstanceScatter,
    instance_buffer: Option<wgpu::Buffer>,
    instance_count: u32,
}

impl ScenePass {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        assets: &Path,
        scatter: InstanceScatter,
    ) -> Result<Self, RenderError> {
        let skybox = SkyboxPass::new(device, queue, &assets.join("textures/skybox/space2"))?;

        let frame_layout = bind::uniform_layout(
            device,
            "Frame Layout",
            wgpu::ShaderStages::VERTEX_FRAGMENT,
        );
        let object_layout = bind::uniform_layout(
            device,
            "Object Layout",
            wgpu::ShaderStages::VERTEX_FRAGMENT,
        );
        let materials = MaterialFactory::new(device, queue);

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group =
            bind::uniform_bind_group(device, "Frame Bind Group", &frame_layout, &frame_buffer);

        let program = ShaderProgram::load(device, "scene", SCENE_WGSL, SCENE_SLOTS)?;
        let lit_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Lit Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, materials.layout(), &object_layout],
            push_constant_ranges: &[],
        });
        let instanced_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Instanced Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, materials.layout()],
            push_constant_ranges: &[],
        });

        let build = |mode: wgpu::PolygonMode| {
            program.build_pipeline("scene", |module| ScenePipelines {
                lit: create_scene_pipeline(
                    device,
                    module,
                    &lit_layout,
                    ("vs_main", "fs_main"),
                    &[Vertex::layout()],
                    mode,
                ),
                instanced: create_scene_pipeline(
                    device,
                    module,
                    &instanced_layout,
                    ("vs_instanced", "fs_unlit"),
                    &[Vertex::layout(), InstanceRaw::layout()],
                    mode,
                ),
            })
        };
        let fill = build(wgpu::PolygonMode::Fill);
        let line = if device.features().contains(wgpu::Features::POLYGON_MODE_LINE) {
            build(wgpu::PolygonMode::Line)
        } else {
            None
        };

        let objects = assets.join("objects");
        let load = |file: &str| {
            let data = import_model_or_empty(&objects.join(file));
            let model = Model::upload(device, queue, &materials, &data);
            if model.is_empty() {
                log::warn!("{} has no drawable meshes", file);
            }
            model
        };
        let city = load("city.glb");
        let tree = load("tree.glb");
        let turbine = load("wind_turbine.glb");

        let marker = GpuMesh::upload(device, "Light Marker", &create_cube_mesh(MARKER_SIZE));
        let marker_material = materials.default_material(device);

        let marker_slots = (0..MAX_POINT_LIGHTS)
            .map(|i| ObjectSlot::new(device, &object_layout, &format!("Light Marker {}", i)))
            .collect();

        let mut pass = Self {
            skybox,
            frame_buffer,
            frame_bind_group,
            fill,
            line,
            line_warned: false,
            city,
            tree,
            turbine,
            marker,
            marker_material,
            city_slot: ObjectSlot::new(device, &object_layout, "City Object"),
            tree_one_slot: ObjectSlot::new(device, &object_layout, "Tree One Object"),
            tree_two_slot: ObjectSlot::new(device, &object_layout, "Tree Two Object"),
            marker_slots,
            marker_count: 0,
            scatter,
            instance_buffer: None,
            instance_count: 0,
        };
        pass.rebuild_instances(device, scatter);
        Ok(pass)
    }

    fn rebuild_instances(&mut self, device: &wgpu::Device, scatter: InstanceScatter) {
        let instances: Vec<InstanceRaw> = scatter
            .model_matrices()
            .into_iter()
            .map(InstanceRaw::from)
            .collect();
        self.instance_buffer = (!instances.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Turbine Instances"),
                contents: bytemuck::cast_slice(&instances),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });
        self.instance_count = instances.len() as u32;
        self.scatter = scatter;
    }

    /// Upload this frame's camera, lights and object transforms.
    pub fn update(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, params: &FrameParams) {
        let threshold = params.post.bloom_threshold;
        let frame = FrameUniforms::new(
            params.view,
            params.projection,
            params.eye,
            &params.lights,
            threshold,
        );
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));
        self.skybox
            .update(queue, params.rotation_view, params.projection, threshold);

        let layout = &params.layout;
        self.city_slot.write(queue, &ObjectUniforms::lit(layout.city.matrix()));
        self.tree_one_slot
            .write(queue, &ObjectUniforms::lit(layout.tree_one.matrix()));
        self.tree_two_slot
            .write(queue, &ObjectUniforms::lit(layout.tree_two.matrix()));

        self.marker_count = 0;
        for (slot, light) in self.marker_slots.iter().zip(&params.lights.points) {
            let model = Mat4::from_translation(light.position);
            slot.write(queue, &ObjectUniforms::emissive(model, light.tag_color));
            self.marker_count += 1;
        }

        if layout.turbines != self.scatter {
            self.rebuild_instances(device, layout.turbines);
        }

        let wants_line = params.post.polygon_mode == PolygonMode::Line;
        if wants_line && self.line.is_none() && !self.line_warned {
            log::warn!(
                "Wireframe requested but the adapter lacks POLYGON_MODE_LINE, drawing filled"
            );
            self.line_warned = true;
        }
    }

    fn pipelines(&self, mode: PolygonMode) -> Option<&ScenePipelines> {
        match (mode, &self.line) {
            (PolygonMode::Line, Some(line)) => Some(line),
            _ => self.fill.as_ref(),
        }
    }

    /// Record the scene pass. Radiance is cleared to `clear_color`, the
    /// bright-pass attachment to black and depth to 1.0.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &SceneTarget,
        params: &FrameParams,
    ) {
        let clear = params.clear_color;
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: &target.radiance.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color(clear)),
                        store: wgpu::StoreOp::Store,
                    },
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: &target.bright.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                }),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &target.depth_stencil.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        self.skybox.draw(&mut pass);

        let Some(pipelines) = self.pipelines(params.post.polygon_mode) else {
            return;
        };

        pass.set_pipeline(&pipelines.lit);
        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        for (model, slot) in [
            (&self.city, &self.city_slot),
            (&self.tree, &self.tree_one_slot),
            (&self.tree, &self.tree_two_slot),
        ] {
            pass.set_bind_group(2, &slot.bind_group, &[]);
            model.draw(&mut pass, 0..1);
        }

        pass.set_bind_group(1, &self.marker_material, &[]);
        for slot in self.marker_slots.iter().take(self.marker_count as usize) {
            pass.set_bind_group(2, &slot.bind_group, &[]);
            self.marker.draw(&mut pass, 0..1);
        }

        if let Some(instances) = &self.instance_buffer {
            pass.set_pipeline(&pipelines.instanced);
            pass.set_bind_group(0, &self.frame_bind_group, &[]);
            pass.set_vertex_buffer(1, instances.slice(..));
            self.turbine.draw(&mut pass, 0..self.instance_count);
        }
    }
}

fn clear_color(c: Vec3) -> wgpu::Color {
    wgpu::Color {
        r: c.x as f64,
        g: c.y as f64,
        b: c.z as f64,
        a: 1.0,
    }
}

fn create_scene_pipeline(
    device: &wgpu::Device,
    module: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    (vs, fs): (&str, &str),
    buffers: &[wgpu::VertexBufferLayout],
    polygon_mode: wgpu::PolygonMode,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("Scene {} {:?} Pipeline", vs, polygon_mode)),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some(vs),
            buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(fs),
            targets: &[bind::hdr_target(), bind::hdr_target()],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_STENCIL_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
