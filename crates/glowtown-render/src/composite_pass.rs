//! Composite: bloom add, tone mapping, gamma and the effect selector, drawn
//! into the output view

use crate::bind;
use crate::shader::{ShaderProgram, COMPOSITE_SLOTS, COMPOSITE_WGSL};
use crate::targets::{FullScreenQuad, RenderTargetSet};
use crate::uniforms::CompositeUniforms;
use crate::RenderError;
use glowtown_core::{PingPongSlot, PostProcessSettings};

pub struct CompositePass {
    pipeline: Option<wgpu::RenderPipeline>,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    scene_bind_group: wgpu::BindGroup,
    /// Indexed by `PingPongSlot::index`
    bloom_bind_groups: [wgpu::BindGroup; 2],
}

impl CompositePass {
    pub fn new(
        device: &wgpu::Device,
        output_format: wgpu::TextureFormat,
        targets: &RenderTargetSet,
    ) -> Result<Self, RenderError> {
        let uniform_layout =
            bind::uniform_layout(device, "Composite Params Layout", wgpu::ShaderStages::FRAGMENT);
        let texture_layout = bind::texture_sampler_layout(
            device,
            "Composite Texture Layout",
            wgpu::TextureViewDimension::D2,
        );

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Composite Params"),
            size: std::mem::size_of::<CompositeUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = bind::uniform_bind_group(
            device,
            "Composite Params",
            &uniform_layout,
            &uniform_buffer,
        );

        let texture = |label: &str, view: &wgpu::TextureView| {
            bind::texture_sampler_bind_group(device, label, &texture_layout, view, &targets.sampler)
        };
        let scene_bind_group = texture("Composite Scene", &targets.scene.radiance.view);
        let bloom_bind_groups = [
            texture("Composite Bloom A", &targets.ping_pong.get(PingPongSlot::A).view),
            texture("Composite Bloom B", &targets.ping_pong.get(PingPongSlot::B).view),
        ];

        let program = ShaderProgram::load(device, "composite", COMPOSITE_WGSL, COMPOSITE_SLOTS)?;
        let pipeline = program.build_pipeline("composite", |module| {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Composite Pipeline Layout"),
                bind_group_layouts: &[&uniform_layout, &texture_layout, &texture_layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Composite Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_quad"),
                    buffers: &[FullScreenQuad::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_composite"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: output_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: FullScreenQuad::primitive(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });

        Ok(Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            scene_bind_group,
            bloom_bind_groups,
        })
    }

    pub fn update(&self, queue: &wgpu::Queue, settings: &PostProcessSettings) {
        let uniforms = CompositeUniforms::from(settings);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    /// Draw the quad into `output`, reading the blurred image from `bloom`.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargetSet,
        bloom: PingPongSlot,
        output: &wgpu::TextureView,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Composite Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let Some(pipeline) = &self.pipeline else {
            return;
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        pass.set_bind_group(1, &self.scene_bind_group, &[]);
        pass.set_bind_group(2, &self.bloom_bind_groups[bloom.index()], &[]);
        targets.quad.draw(&mut pass);
    }
}
