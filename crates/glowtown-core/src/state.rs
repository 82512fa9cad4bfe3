//! Program state: everything the passes read each frame, persisted as TOML
//!
//! The file is a versioned key-value table. Every section has serde defaults,
//! so files missing keys still load and unknown keys are ignored.

use crate::camera::CameraPose;
use crate::error::{GlowError, Result};
use crate::light::LightRig;
use crate::scatter::InstanceScatter;
use crate::settings::PostProcessSettings;
use crate::transform::ObjectTransform;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current state file layout version.
pub const STATE_VERSION: u32 = 1;

/// Transforms of the individually placed scene objects
///
/// Loading merges each partial transform table over that object's own
/// default placement, so `[scene.tree_one]` with only `scale` keeps the
/// tree at its default position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SceneLayoutFile")]
pub struct SceneLayout {
    pub city: ObjectTransform,
    pub tree_one: ObjectTransform,
    pub tree_two: ObjectTransform,
    pub turbines: InstanceScatter,
}

impl Default for SceneLayout {
    fn default() -> Self {
        Self {
            city: ObjectTransform::default(),
            tree_one: ObjectTransform::new(Vec3::ONE, 0.1),
            tree_two: ObjectTransform::new(Vec3::ONE, 0.1),
            turbines: InstanceScatter::default(),
        }
    }
}

impl SceneLayout {
    /// Clamp values the renderer cannot honour.
    pub fn sanitize(&mut self) {
        self.turbines.sanitize();
    }
}

/// A transform table with any subset of its keys present
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TransformPatch {
    position: Option<Vec3>,
    scale: Option<f32>,
}

impl TransformPatch {
    fn apply(self, base: ObjectTransform) -> ObjectTransform {
        ObjectTransform {
            position: self.position.unwrap_or(base.position),
            scale: self.scale.unwrap_or(base.scale),
        }
    }
}

/// On-disk shape of [`SceneLayout`]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SceneLayoutFile {
    city: TransformPatch,
    tree_one: TransformPatch,
    tree_two: TransformPatch,
    turbines: InstanceScatter,
}

impl From<SceneLayoutFile> for SceneLayout {
    fn from(file: SceneLayoutFile) -> Self {
        let defaults = SceneLayout::default();
        Self {
            city: file.city.apply(defaults.city),
            tree_one: file.tree_one.apply(defaults.tree_one),
            tree_two: file.tree_two.apply(defaults.tree_two),
            turbines: file.turbines,
        }
    }
}

/// Parameter store shared by the UI, the input handlers and the render passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramState {
    pub version: u32,
    pub clear_color: Vec3,
    pub ui_enabled: bool,
    /// Whether mouse motion steers the camera. Derived from `ui_enabled` at startup.
    #[serde(skip)]
    pub mouse_look: bool,
    pub camera: CameraPose,
    pub scene: SceneLayout,
    pub lights: LightRig,
    pub post: PostProcessSettings,
}

impl Default for ProgramState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            clear_color: Vec3::ZERO,
            ui_enabled: false,
            mouse_look: true,
            camera: CameraPose::default(),
            scene: SceneLayout::default(),
            lights: LightRig::default(),
            post: PostProcessSettings::default(),
        }
    }
}

impl ProgramState {
    /// Parse a state document. Rejects files written by another layout version.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut state: ProgramState = toml::from_str(content)?;
        if state.version != STATE_VERSION {
            return Err(GlowError::UnsupportedVersion {
                expected: STATE_VERSION,
                got: state.version,
            });
        }
        state.post.sanitize();
        state.scene.sanitize();
        state.mouse_look = !state.ui_enabled;
        Ok(state)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load from a TOML file, falling back to defaults if it is missing or
    /// cannot be used. Never fails.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from_file(path) {
            Ok(state) => {
                log::info!("Loaded program state from {}", path.display());
                state
            }
            Err(GlowError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No program state at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                log::warn!("Ignoring program state at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Write to a TOML file, creating parent directories as needed.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Flip the debug UI. Showing the UI releases mouse look.
    pub fn toggle_ui(&mut self) {
        self.ui_enabled = !self.ui_enabled;
        self.mouse_look = !self.ui_enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::EffectSelector;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("glowtown_{}_{}.toml", name, std::process::id()))
    }

    #[test]
    fn save_and_load_round_trip() {
        let path = temp_path("round_trip");

        let mut state = ProgramState::default();
        state.clear_color = Vec3::new(0.1, 0.2, 0.3);
        state.scene.city.scale = 2.5;
        state.lights.point.attenuation.linear = 0.35;
        state.post.exposure = 3.0;
        state.post.effect = EffectSelector::Tint;
        state.camera.position = Vec3::new(4.0, 5.0, 6.0);
        state.save_to_file(&path).unwrap();

        let loaded = ProgramState::load_from_file(&path).unwrap();
        assert_eq!(loaded, state);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn file_is_self_describing() {
        let text = ProgramState::default().to_toml_string().unwrap();
        assert!(text.contains("version = 1"));
        assert!(text.contains("exposure"));
        assert!(text.contains("[scene.city]"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let state = ProgramState::from_toml_str(
            "version = 1\n[post]\nexposure = 2.5\n[scene.tree_one]\nscale = 0.4\n",
        )
        .unwrap();
        assert_eq!(state.post.exposure, 2.5);
        assert_eq!(state.post.blur_iterations, 10);
        assert_eq!(state.scene.tree_one.scale, 0.4);
        assert_eq!(state.scene.tree_one.position, Vec3::ONE);
        assert_eq!(state.scene.tree_two, SceneLayout::default().tree_two);
    }

    #[test]
    fn partial_transform_keeps_object_default_scale() {
        let state = ProgramState::from_toml_str(
            "version = 1\n[scene.tree_two]\nposition = [2.0, 0.0, 3.0]\n",
        )
        .unwrap();
        assert_eq!(state.scene.tree_two.position, Vec3::new(2.0, 0.0, 3.0));
        assert_eq!(state.scene.tree_two.scale, 0.1);
        assert_eq!(state.scene.city, ObjectTransform::default());
    }

    #[test]
    fn oversized_turbine_count_is_clamped_on_load() {
        let state =
            ProgramState::from_toml_str("version = 1\n[scene.turbines]\ncount = 4294967295\n")
                .unwrap();
        assert_eq!(state.scene.turbines.count, crate::scatter::MAX_TURBINES);
        assert_eq!(state.scene.turbines.seed, InstanceScatter::default().seed);
    }

    #[test]
    fn wrong_version_is_rejected() {
        let err = ProgramState::from_toml_str("version = 99\n").unwrap_err();
        assert!(matches!(
            err,
            GlowError::UnsupportedVersion { expected: 1, got: 99 }
        ));
    }

    #[test]
    fn malformed_or_missing_file_falls_back_to_defaults() {
        let path = temp_path("malformed");
        std::fs::write(&path, "0\n0\n0\n1\nthis is not toml = = =").unwrap();
        assert_eq!(ProgramState::load_or_default(&path), ProgramState::default());
        let _ = std::fs::remove_file(&path);

        let missing = temp_path("does_not_exist");
        assert_eq!(ProgramState::load_or_default(&missing), ProgramState::default());
    }

    #[test]
    fn invalid_values_are_sanitized_on_load() {
        let state =
            ProgramState::from_toml_str("version = 1\n[post]\nblur_iterations = 0\ngamma = -1.0\n")
                .unwrap();
        assert_eq!(state.post.blur_iterations, 1);
        assert!(state.post.gamma > 0.0);
    }

    #[test]
    fn toggling_ui_releases_mouse_look() {
        let mut state = ProgramState::default();
        assert!(state.mouse_look);
        state.toggle_ui();
        assert!(state.ui_enabled);
        assert!(!state.mouse_look);
        state.toggle_ui();
        assert!(state.mouse_look);
    }
}
