//! Separable Gaussian blur over the bright-pass attachment, ping-ponging
//! between two targets

use crate::bind;
use crate::shader::{ShaderProgram, BLUR_SLOTS, BLUR_WGSL};
use crate::targets::{FullScreenQuad, RenderTargetSet};
use crate::uniforms::BlurUniforms;
use crate::RenderError;
use glowtown_core::{BlurAxis, BlurSchedule, BlurSource, PingPongSlot};
use wgpu::util::DeviceExt;

pub struct BlurPass {
    pipeline: Option<wgpu::RenderPipeline>,
    /// Indexed by `BlurAxis::Horizontal`, `BlurAxis::Vertical`
    axis_bind_groups: [wgpu::BindGroup; 2],
    bright_source: wgpu::BindGroup,
    /// Indexed by `PingPongSlot::index`
    ping_pong_sources: [wgpu::BindGroup; 2],
}

fn axis_index(axis: BlurAxis) -> usize {
    match axis {
        BlurAxis::Horizontal => 0,
        BlurAxis::Vertical => 1,
    }
}

impl BlurPass {
    pub fn new(device: &wgpu::Device, targets: &RenderTargetSet) -> Result<Self, RenderError> {
        let params_layout =
            bind::uniform_layout(device, "Blur Params Layout", wgpu::ShaderStages::FRAGMENT);
        let source_layout = bind::texture_sampler_layout(
            device,
            "Blur Source Layout",
            wgpu::TextureViewDimension::D2,
        );

        // Both axes are fixed for the target size, so each gets its own buffer
        let axis_bind_groups = [BlurAxis::Horizontal, BlurAxis::Vertical].map(|axis| {
            let uniforms = BlurUniforms::new(axis.direction(), targets.width, targets.height);
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Blur {:?} Params", axis)),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            bind::uniform_bind_group(
                device,
                &format!("Blur {:?} Params", axis),
                &params_layout,
                &buffer,
            )
        });

        let source = |label: &str, view: &wgpu::TextureView| {
            bind::texture_sampler_bind_group(device, label, &source_layout, view, &targets.sampler)
        };
        let bright_source = source("Blur Source Bright", &targets.scene.bright.view);
        let ping_pong_sources = [
            source("Blur Source A", &targets.ping_pong.get(PingPongSlot::A).view),
            source("Blur Source B", &targets.ping_pong.get(PingPongSlot::B).view),
        ];

        let program = ShaderProgram::load(device, "blur", BLUR_WGSL, BLUR_SLOTS)?;
        let pipeline = program.build_pipeline("blur", |module| {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Blur Pipeline Layout"),
                bind_group_layouts: &[&params_layout, &source_layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Blur Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_quad"),
                    buffers: &[FullScreenQuad::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_blur"),
                    targets: &[bind::hdr_target()],
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
            axis_bind_groups,
            bright_source,
            ping_pong_sources,
        })
    }

    fn source(&self, source: BlurSource) -> &wgpu::BindGroup {
        match source {
            BlurSource::Bright => &self.bright_source,
            BlurSource::PingPong(slot) => &self.ping_pong_sources[slot.index()],
        }
    }

    /// Record every step of `schedule`. The blurred result ends up in
    /// `schedule.final_slot()`.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargetSet,
        schedule: &BlurSchedule,
    ) {
        let Some(pipeline) = &self.pipeline else {
            return;
        };

        for step in schedule.steps() {
            // Reading and writing one texture in a pass is undefined
            if step.aliases() {
                log::error!(
                    "Blur step {} reads and writes the same target, skipping",
                    step.iteration
                );
                continue;
            }

            let destination = targets.ping_pong.get(step.destination);
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blur Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &destination.view,
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

            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.axis_bind_groups[axis_index(step.axis)], &[]);
            pass.set_bind_group(1, self.source(step.source), &[]);
            targets.quad.draw(&mut pass);
        }
    }
}
