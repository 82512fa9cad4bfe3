//! Player application implementing winit ApplicationHandler
//!
//! Owns the window, the GPU context, the frame renderer and the egui overlay,
//! and routes input into the program state that every pass reads.

use crate::clock::FrameClock;
use crate::input::{action_for_key, apply_action, Action, InputState};
use crate::ui::draw_ui;
use anyhow::Context;
use glowtown_core::{FirstPersonCamera, ProgramState};
use glowtown_render::{FrameParams, FrameRenderer, RenderContext, RendererConfig};
use std::path::PathBuf;
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::PhysicalKey;
use winit::window::{CursorGrabMode, Window, WindowId};

/// Pixels of trackpad scroll that count as one wheel line
const PIXELS_PER_LINE: f64 = 40.0;

pub struct GlowtownApp {
    // Parameter store
    pub state: ProgramState,
    state_path: PathBuf,
    config: RendererConfig,

    // Systems
    clock: FrameClock,
    input: InputState,
    camera: FirstPersonCamera,

    // Rendering
    window: Option<Arc<Window>>,
    render_context: Option<RenderContext>,
    renderer: Option<FrameRenderer>,

    // egui state
    egui_ctx: egui::Context,
    egui_winit: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,

    cursor_captured: bool,
    fatal: Option<anyhow::Error>,
}

impl GlowtownApp {
    pub fn new(state: ProgramState, state_path: PathBuf, config: RendererConfig) -> Self {
        let camera = FirstPersonCamera::from_pose(state.camera);
        Self {
            state,
            state_path,
            config,
            clock: FrameClock::new(),
            input: InputState::new(),
            camera,
            window: None,
            render_context: None,
            renderer: None,
            egui_ctx: egui::Context::default(),
            egui_winit: None,
            egui_renderer: None,
            cursor_captured: false,
            fatal: None,
        }
    }

    /// The error that stopped the event loop during initialization, if any
    pub fn take_fatal(&mut self) -> Option<anyhow::Error> {
        self.fatal.take()
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attrs = Window::default_attributes()
            .with_title("Glowtown")
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .context("Failed to create window")?,
        );
        self.window = Some(window.clone());

        let render_context = pollster::block_on(RenderContext::new(window.clone()))
            .context("Failed to initialize GPU")?;

        let renderer = FrameRenderer::new(
            &render_context.device,
            &render_context.queue,
            render_context.output_format,
            &self.config,
            &self.state,
        )
        .context("Failed to create frame renderer")?;

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            &render_context.device,
            render_context.output_format,
            None,
            1,
            false,
        );

        self.render_context = Some(render_context);
        self.renderer = Some(renderer);
        self.egui_winit = Some(egui_winit);
        self.egui_renderer = Some(egui_renderer);

        self.sync_cursor();
        Ok(())
    }

    /// Grab or release the cursor to match `state.mouse_look`.
    fn sync_cursor(&mut self) {
        if self.state.mouse_look == self.cursor_captured {
            return;
        }
        let Some(window) = &self.window else {
            return;
        };

        if self.state.mouse_look {
            let _ = window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked));
            window.set_cursor_visible(false);
        } else {
            let _ = window.set_cursor_grab(CursorGrabMode::None);
            window.set_cursor_visible(true);
        }
        self.cursor_captured = self.state.mouse_look;
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: winit::keyboard::KeyCode) {
        match action_for_key(key) {
            Some(Action::Quit) => event_loop.exit(),
            Some(action) => {
                apply_action(&mut self.state, action);
                log::debug!("{:?}", action);
            }
            None => {}
        }
    }

    fn tick(&mut self) {
        self.clock.tick();
        let dt = self.clock.delta_time as f32;

        for movement in self.input.movements() {
            self.camera.process_keyboard(movement, dt);
        }

        if self.state.mouse_look {
            let (dx, dy) = self.input.mouse_delta();
            // Window y grows downwards, pitch grows upwards
            self.camera
                .process_mouse_movement(dx as f32, -dy as f32, true);
        }

        let scroll = self.input.scroll_delta();
        if scroll != 0.0 {
            self.camera.process_mouse_scroll(scroll);
        }

        self.state.camera = self.camera.pose();
        self.input.end_frame();
    }

    fn render(&mut self) {
        let Some(context) = &self.render_context else {
            return;
        };
        let Some(renderer) = &mut self.renderer else {
            return;
        };

        let (output, view) = match context.acquire() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                context.reconfigure();
                return;
            }
            Err(e) => {
                log::error!("Surface error: {:?}", e);
                return;
            }
        };

        let params = FrameParams::from_state(
            &self.state,
            renderer.aspect_ratio(),
            self.clock.total_time as f32,
        );
        renderer.render(&context.device, &context.queue, &view, &params);

        if self.state.ui_enabled {
            self.render_egui(&view);
        }

        output.present();
    }

    fn render_egui(&mut self, target_view: &wgpu::TextureView) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let Some(context) = &self.render_context else {
            return;
        };
        let Some(egui_winit) = &mut self.egui_winit else {
            return;
        };
        let Some(egui_renderer) = &mut self.egui_renderer else {
            return;
        };

        let raw_input = egui_winit.take_egui_input(&window);
        let state = &mut self.state;
        let camera = &self.camera;
        let clock = &self.clock;
        let full_output = self
            .egui_ctx
            .run(raw_input, |ctx| draw_ui(ctx, state, camera, clock));

        egui_winit.handle_platform_output(&window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [context.config.width, context.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui Encoder"),
            });

        for (id, image_delta) in &full_output.textures_delta.set {
            egui_renderer.update_texture(&context.device, &context.queue, *id, image_delta);
        }

        egui_renderer.update_buffers(
            &context.device,
            &context.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut render_pass = render_pass.forget_lifetime();
            egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        context.queue.submit(std::iter::once(encoder.finish()));

        for id in &full_output.textures_delta.free {
            egui_renderer.free_texture(id);
        }
    }
}

impl ApplicationHandler for GlowtownApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.fatal.is_some() {
            return;
        }
        if let Err(e) = self.initialize(event_loop) {
            log::error!("{:#}", e);
            self.fatal = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // Let egui handle the event first while its windows are shown
        if self.state.ui_enabled {
            if let (Some(egui_winit), Some(window)) = (&mut self.egui_winit, &self.window) {
                let response = egui_winit.on_window_event(window, &event);
                if response.consumed {
                    return;
                }
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Focused(false) => {
                self.input.clear_keys();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(key_code) = event.physical_key else {
                    return;
                };
                match event.state {
                    ElementState::Pressed => {
                        if !event.repeat {
                            self.handle_key(event_loop, key_code);
                        }
                        self.input.process_key_down(key_code);
                    }
                    ElementState::Released => {
                        self.input.process_key_up(key_code);
                    }
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => {
                        (position.y / PIXELS_PER_LINE) as f32
                    }
                };
                self.input.process_scroll(lines);
            }

            WindowEvent::RedrawRequested => {
                self.sync_cursor();
                self.tick();
                self.render();
            }

            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if !self.state.mouse_look {
            return;
        }

        if let DeviceEvent::MouseMotion { delta } = event {
            self.input.process_mouse_raw_delta(delta.0, delta.1);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if self.fatal.is_some() {
            return;
        }
        match self.state.save_to_file(&self.state_path) {
            Ok(()) => log::info!("Saved state to {}", self.state_path.display()),
            Err(e) => log::error!("Failed to save state: {}", e),
        }
    }
}
