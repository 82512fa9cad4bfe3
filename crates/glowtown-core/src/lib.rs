//! Glowtown Core - GPU-free parts of the HDR/bloom pipeline
//!
//! This crate holds everything the render passes consume that can be
//! reasoned about without a device:
//! - `ProgramState` - the parameter store, persisted as TOML
//! - `PostProcessSettings` - HDR, exposure, gamma, bloom and effect toggles
//! - `BlurSchedule` - the ping-pong order of the separable blur
//! - `tonemap` - CPU reference of the bright-pass test and composite maths
//! - Lights, the first-person camera, object transforms and instance scatter

pub mod blur;
mod camera;
mod error;
pub mod light;
mod scatter;
mod settings;
mod state;
pub mod tonemap;
mod transform;

pub use blur::{BlurAxis, BlurSchedule, BlurSource, BlurStep, PingPongSlot, GAUSSIAN_WEIGHTS};
pub use camera::{CameraMovement, CameraPose, FirstPersonCamera, FAR_PLANE, NEAR_PLANE};
pub use error::{GlowError, Result};
pub use light::{
    Attenuation, DirectionalLight, Light, LightRig, LightSet, Orbit, PointLight, SpotLight,
    MAX_POINT_LIGHTS,
};
pub use scatter::{InstanceScatter, ScatterRng, MAX_TURBINES};
pub use settings::{
    EffectSelector, PolygonMode, PostProcessSettings, DEFAULT_BLUR_ITERATIONS, MAX_BLUR_ITERATIONS,
};
pub use state::{ProgramState, SceneLayout, STATE_VERSION};
pub use transform::{normal_matrix, ObjectTransform};

pub use glam::{Mat4, Vec3};
