//! Cubemap skybox, drawn first into the scene target

use crate::bind;
use crate::shader::{ShaderProgram, SKYBOX_SLOTS, SKYBOX_WGSL};
use crate::targets::DEPTH_STENCIL_FORMAT;
use crate::texture::{CubemapFaces, GpuTexture};
use crate::uniforms::SkyboxUniforms;
use crate::RenderError;
use glowtown_core::Mat4;
use std::path::Path;

pub struct SkyboxPass {
    pipeline: Option<wgpu::RenderPipeline>,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    cube_bind_group: wgpu::BindGroup,
}

impl SkyboxPass {
    /// Load the six faces from `dir`. Missing faces render black.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        dir: &Path,
    ) -> Result<Self, RenderError> {
        let faces = CubemapFaces::load(&CubemapFaces::face_paths(dir, "png"));
        let cubemap = GpuTexture::cubemap(device, queue, "Skybox Cubemap", &faces);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Skybox Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Skybox Uniforms"),
            size: std::mem::size_of::<SkyboxUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_layout =
            bind::uniform_layout(device, "Skybox Uniform Layout", wgpu::ShaderStages::FRAGMENT);
        let cube_layout = bind::texture_sampler_layout(
            device,
            "Skybox Cube Layout",
            wgpu::TextureViewDimension::Cube,
        );
        let uniform_bind_group = bind::uniform_bind_group(
            device,
            "Skybox Uniform Bind Group",
            &uniform_layout,
            &uniform_buffer,
        );
        let cube_bind_group = bind::texture_sampler_bind_group(
            device,
            "Skybox Cube Bind Group",
            &cube_layout,
            &cubemap.view,
            &sampler,
        );

        let program = ShaderProgram::load(device, "skybox", SKYBOX_WGSL, SKYBOX_SLOTS)?;
        let pipeline = program.build_pipeline("skybox", |module| {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Skybox Pipeline Layout"),
                bind_group_layouts: &[&uniform_layout, &cube_layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Skybox Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_skybox"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_skybox"),
                    targets: &[bind::hdr_target(), bind::hdr_target()],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                // The sky sits at depth 1.0 and must pass against a cleared buffer
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_STENCIL_FORMAT,
                    depth_write_enabled: false,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });

        Ok(Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            cube_bind_group,
        })
    }

    /// Upload the inverse of projection * rotation-only view
    pub fn update(
        &self,
        queue: &wgpu::Queue,
        rotation_view: Mat4,
        projection: Mat4,
        threshold: f32,
    ) {
        let uniforms = SkyboxUniforms {
            inv_view_proj: (projection * rotation_view).inverse().to_cols_array_2d(),
            bloom: [threshold, 0.0, 0.0, 0.0],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        let Some(pipeline) = &self.pipeline else {
            return;
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        pass.set_bind_group(1, &self.cube_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
