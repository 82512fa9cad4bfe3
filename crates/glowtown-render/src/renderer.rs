//! Frame renderer: scene, blur and composite recorded into one encoder

use crate::blur_pass::BlurPass;
use crate::composite_pass::CompositePass;
use crate::scene_pass::ScenePass;
use crate::targets::RenderTargetSet;
use crate::RenderError;
use glowtown_core::{
    BlurSchedule, FirstPersonCamera, LightSet, Mat4, PostProcessSettings, ProgramState,
    SceneLayout, Vec3, DEFAULT_BLUR_ITERATIONS,
};
use std::path::PathBuf;

/// Startup options for the renderer
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Size of every offscreen target, fixed for the process lifetime
    pub width: u32,
    pub height: u32,
    /// Root of `objects/` and `textures/`
    pub assets: PathBuf,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            assets: PathBuf::from("resources"),
        }
    }
}

/// Everything one frame reads, derived from the program state
#[derive(Debug, Clone)]
pub struct FrameParams {
    pub view: Mat4,
    pub rotation_view: Mat4,
    pub projection: Mat4,
    pub eye: Vec3,
    pub lights: LightSet,
    pub clear_color: Vec3,
    pub layout: SceneLayout,
    pub post: PostProcessSettings,
}

impl FrameParams {
    /// Evaluate the camera and light rig at `time` seconds.
    pub fn from_state(state: &ProgramState, aspect: f32, time: f32) -> Self {
        let camera = FirstPersonCamera::from_pose(state.camera);
        Self {
            view: camera.view_matrix(),
            rotation_view: camera.rotation_only_view(),
            projection: camera.projection_matrix(aspect),
            eye: camera.position,
            lights: state.lights.evaluate(time, camera.position, camera.front),
            clear_color: state.clear_color,
            layout: state.scene.clone(),
            post: state.post.clone(),
        }
    }

    /// Blur schedule for this frame's iteration count
    pub fn blur_schedule(&self) -> BlurSchedule {
        BlurSchedule::new(self.post.blur_iterations).unwrap_or_else(|e| {
            log::warn!("{}, using {} blur iterations", e, DEFAULT_BLUR_ITERATIONS);
            BlurSchedule::default()
        })
    }
}

/// Owns the render targets and all three passes
pub struct FrameRenderer {
    pub targets: RenderTargetSet,
    scene: ScenePass,
    blur: BlurPass,
    composite: CompositePass,
}

impl FrameRenderer {
    /// Create targets, load assets and build every pipeline. Target
    /// incompleteness and shader parse failures are fatal, asset failures
    /// only degrade the scene.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        output_format: wgpu::TextureFormat,
        config: &RendererConfig,
        state: &ProgramState,
    ) -> Result<Self, RenderError> {
        let targets = RenderTargetSet::new(device, config.width, config.height)?;
        let scene = ScenePass::new(device, queue, &config.assets, state.scene.turbines)?;
        let blur = BlurPass::new(device, &targets)?;
        let composite = CompositePass::new(device, output_format, &targets)?;

        Ok(Self {
            targets,
            scene,
            blur,
            composite,
        })
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.targets.width as f32 / self.targets.height.max(1) as f32
    }

    /// Render one frame into `output`: scene, blur, then composite, submitted
    /// together.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        output: &wgpu::TextureView,
        params: &FrameParams,
    ) {
        self.scene.update(device, queue, params);
        self.composite.update(queue, &params.post);
        let schedule = params.blur_schedule();

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });
        self.scene.record(&mut encoder, &self.targets.scene, params);
        self.blur.record(&mut encoder, &self.targets, &schedule);
        self.composite
            .record(&mut encoder, &self.targets, schedule.final_slot(), output);
        queue.submit(std::iter::once(encoder.finish()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glowtown_core::PingPongSlot;

    #[test]
    fn params_follow_state() {
        let mut state = ProgramState::default();
        state.clear_color = Vec3::new(0.1, 0.2, 0.3);
        state.post.blur_iterations = 3;

        let params = FrameParams::from_state(&state, 16.0 / 9.0, 0.0);
        assert_eq!(params.eye, state.camera.position);
        assert_eq!(params.clear_color, state.clear_color);
        assert_eq!(params.lights.points.len(), 1);
        assert!((params.lights.points[0].position - Vec3::new(4.0, 4.0, 0.0)).length() < 1e-5);

        let schedule = params.blur_schedule();
        assert_eq!(schedule.iterations(), 3);
        assert_eq!(schedule.final_slot(), PingPongSlot::A);
    }

    #[test]
    fn rotation_view_drops_translation() {
        let params = FrameParams::from_state(&ProgramState::default(), 1.0, 0.0);
        let origin = params.rotation_view.transform_point3(Vec3::ZERO);
        assert!(origin.length() < 1e-6);
        assert!(params.view.transform_point3(Vec3::ZERO).length() > 1.0);
    }

    #[test]
    fn zero_iterations_fall_back_to_default() {
        let mut state = ProgramState::default();
        state.post.blur_iterations = 0;
        let params = FrameParams::from_state(&state, 1.0, 0.0);
        assert_eq!(params.blur_schedule().iterations(), DEFAULT_BLUR_ITERATIONS);
    }
}
