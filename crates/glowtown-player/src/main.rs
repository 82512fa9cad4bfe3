//! Glowtown Player - HDR city scene with bloom
//!
//! Usage:
//!   glowtown-player [--state <toml>] [--assets <dir>] [--screenshot <png>]

use anyhow::{Context, Result};
use clap::Parser;
use glowtown_core::ProgramState;
use glowtown_player::GlowtownApp;
use glowtown_render::{FrameParams, FrameRenderer, HeadlessContext, RendererConfig};
use std::path::{Path, PathBuf};
use winit::event_loop::{ControlFlow, EventLoop};

#[derive(Parser)]
#[command(name = "glowtown-player")]
#[command(about = "Glowtown - multi-pass HDR rendering with bloom")]
struct Args {
    /// Persisted program state, loaded at startup and written on exit
    #[arg(long, default_value = "resources/program_state.toml")]
    state: PathBuf,

    /// Directory holding objects/ and textures/
    #[arg(long, default_value = "resources")]
    assets: PathBuf,

    /// Window and render target width
    #[arg(long, default_value_t = 1920)]
    width: u32,

    /// Window and render target height
    #[arg(long, default_value_t = 1080)]
    height: u32,

    /// Render a single frame offscreen to this PNG and exit
    #[arg(long)]
    screenshot: Option<PathBuf>,

    /// Override the persisted number of blur passes
    #[arg(long)]
    blur_iterations: Option<u32>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut state = ProgramState::load_or_default(&args.state);
    if let Some(iterations) = args.blur_iterations {
        state.post.blur_iterations = iterations;
    }
    state.post.sanitize();

    let config = RendererConfig {
        width: args.width.max(1),
        height: args.height.max(1),
        assets: args.assets,
    };

    if let Some(path) = &args.screenshot {
        return screenshot(path, &state, &config);
    }

    log::info!("Controls:");
    log::info!("  WASD      - Move");
    log::info!("  Mouse     - Look, wheel zooms");
    log::info!("  F1        - Toggle parameter windows");
    log::info!("  H / B     - Toggle HDR / bloom");
    log::info!("  Q / E     - Exposure down / up");
    log::info!("  1 / 2 / 3 - Effect: none, blur, tint");
    log::info!("  F2        - Toggle wireframe");
    log::info!("  Escape    - Save and exit");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GlowtownApp::new(state, args.state, config);
    event_loop.run_app(&mut app)?;

    match app.take_fatal() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Render one frame without a window and write it to `path`.
fn screenshot(path: &Path, state: &ProgramState, config: &RendererConfig) -> Result<()> {
    let headless = pollster::block_on(HeadlessContext::new(config.width, config.height))
        .context("Failed to create headless GPU context")?;

    let mut renderer = FrameRenderer::new(
        &headless.device,
        &headless.queue,
        headless.format,
        config,
        state,
    )
    .context("Failed to create frame renderer")?;

    let params = FrameParams::from_state(state, renderer.aspect_ratio(), 0.0);
    renderer.render(&headless.device, &headless.queue, &headless.color_view, &params);

    let pixels = headless.read_pixels().context("Failed to read back frame")?;
    let image = image::RgbaImage::from_raw(headless.width, headless.height, pixels)
        .context("Readback size does not match the render target")?;
    image
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    log::info!("Wrote {}", path.display());
    Ok(())
}
