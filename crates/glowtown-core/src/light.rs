//! Scene lights
//!
//! Lights are plain values rebuilt every frame by [`LightRig::evaluate`] from
//! the persisted parameters and the elapsed time. The renderer packs them
//! into its light uniform block before the scene pass.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Maximum number of point lights the scene shader accepts.
pub const MAX_POINT_LIGHTS: usize = 4;

/// Distance falloff `1 / (constant + linear * d + quadratic * d^2)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

impl Attenuation {
    pub fn factor(&self, distance: f32) -> f32 {
        let denom = self.constant + self.linear * distance + self.quadratic * distance * distance;
        if denom > 0.0 {
            1.0 / denom
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.2, -1.0, -0.3),
            ambient: Vec3::splat(0.05),
            diffuse: Vec3::splat(0.4),
            specular: Vec3::splat(0.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointLight {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub attenuation: Attenuation,
    /// Emissive colour of the light's marker cube. Values above 1 bloom.
    pub tag_color: Vec3,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(4.0, 4.0, 0.0),
            ambient: Vec3::splat(0.1),
            diffuse: Vec3::splat(0.6),
            specular: Vec3::ONE,
            attenuation: Attenuation::default(),
            tag_color: Vec3::new(6.0, 4.5, 2.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotLight {
    pub position: Vec3,
    pub direction: Vec3,
    /// Cosine of the inner cone half-angle
    pub inner_cutoff: f32,
    /// Cosine of the outer cone half-angle
    pub outer_cutoff: f32,
    pub attenuation: Attenuation,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            inner_cutoff: 12.5f32.to_radians().cos(),
            outer_cutoff: 17.5f32.to_radians().cos(),
            attenuation: Attenuation::default(),
            ambient: Vec3::ZERO,
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
        }
    }
}

/// A single light of any kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Directional(DirectionalLight),
    Point(PointLight),
    Spot(SpotLight),
}

/// The lights active for one frame, grouped the way the shader consumes them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightSet {
    pub directional: Option<DirectionalLight>,
    pub points: Vec<PointLight>,
    pub spot: Option<SpotLight>,
}

impl LightSet {
    /// Group lights by kind. The last directional/spot light wins and point
    /// lights beyond [`MAX_POINT_LIGHTS`] are dropped with a warning.
    pub fn from_lights(lights: impl IntoIterator<Item = Light>) -> Self {
        let mut set = Self::default();
        for light in lights {
            match light {
                Light::Directional(d) => set.directional = Some(d),
                Light::Spot(s) => set.spot = Some(s),
                Light::Point(p) => {
                    if set.points.len() < MAX_POINT_LIGHTS {
                        set.points.push(p);
                    } else {
                        log::warn!("dropping point light beyond limit of {}", MAX_POINT_LIGHTS);
                    }
                }
            }
        }
        set
    }
}

/// Circular path of the animated point light
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Orbit {
    pub enabled: bool,
    pub radius: f32,
    pub height: f32,
    /// Radians per second
    pub speed: f32,
}

impl Default for Orbit {
    fn default() -> Self {
        Self {
            enabled: true,
            radius: 4.0,
            height: 4.0,
            speed: 1.0,
        }
    }
}

impl Orbit {
    pub fn position_at(&self, time: f32) -> Vec3 {
        let angle = time * self.speed;
        Vec3::new(
            self.radius * angle.cos(),
            self.height,
            self.radius * angle.sin(),
        )
    }
}

/// Persisted light parameters from which the per-frame [`LightSet`] is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightRig {
    pub directional_enabled: bool,
    pub directional: DirectionalLight,
    pub point: PointLight,
    pub orbit: Orbit,
    /// Spot light attached to the camera
    pub flashlight_enabled: bool,
    pub flashlight: SpotLight,
}

impl Default for LightRig {
    fn default() -> Self {
        Self {
            directional_enabled: true,
            directional: DirectionalLight::default(),
            point: PointLight::default(),
            orbit: Orbit::default(),
            flashlight_enabled: false,
            flashlight: SpotLight::default(),
        }
    }
}

impl LightRig {
    /// Lights for the frame at `time` seconds, with the flashlight placed at
    /// the camera and aimed along its front vector.
    pub fn evaluate(&self, time: f32, eye: Vec3, front: Vec3) -> LightSet {
        let mut lights = Vec::with_capacity(3);
        if self.directional_enabled {
            lights.push(Light::Directional(self.directional));
        }

        let mut point = self.point;
        if self.orbit.enabled {
            point.position = self.orbit.position_at(time);
        }
        lights.push(Light::Point(point));

        if self.flashlight_enabled {
            lights.push(Light::Spot(SpotLight {
                position: eye,
                direction: front,
                ..self.flashlight
            }));
        }

        LightSet::from_lights(lights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attenuation_is_one_at_origin_and_falls_off() {
        let att = Attenuation::default();
        assert!((att.factor(0.0) - 1.0).abs() < 1e-6);
        assert!(att.factor(10.0) < att.factor(1.0));
    }

    #[test]
    fn orbit_matches_circle() {
        let orbit = Orbit::default();
        let p0 = orbit.position_at(0.0);
        assert!((p0 - Vec3::new(4.0, 4.0, 0.0)).length() < 1e-5);
        let quarter = orbit.position_at(std::f32::consts::FRAC_PI_2);
        assert!((quarter - Vec3::new(0.0, 4.0, 4.0)).length() < 1e-5);
    }

    /// Cone factor as `scene.wgsl` computes it
    fn spot_factor(spot: &SpotLight, frag_pos: Vec3) -> f32 {
        let to_frag = (frag_pos - spot.position).normalize_or_zero();
        let theta = to_frag.dot(spot.direction.normalize_or_zero());
        let epsilon = spot.inner_cutoff - spot.outer_cutoff;
        ((theta - spot.outer_cutoff) / epsilon).clamp(0.0, 1.0)
    }

    #[test]
    fn spot_intensity_inside_edge_outside() {
        let spot = SpotLight {
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            ..Default::default()
        };
        assert_eq!(spot_factor(&spot, Vec3::new(0.0, 0.0, -5.0)), 1.0);
        assert_eq!(spot_factor(&spot, Vec3::new(5.0, 0.0, 0.0)), 0.0);
        let angle = 15.0f32.to_radians();
        let edge = Vec3::new(angle.sin(), 0.0, -angle.cos());
        let i = spot_factor(&spot, edge);
        assert!(i > 0.0 && i < 1.0);
    }

    #[test]
    fn evaluate_orbits_point_light_and_places_flashlight() {
        let rig = LightRig {
            flashlight_enabled: true,
            ..Default::default()
        };
        let eye = Vec3::new(0.0, 0.0, 3.0);
        let set = rig.evaluate(0.0, eye, Vec3::NEG_Z);
        assert!(set.directional.is_some());
        assert_eq!(set.points.len(), 1);
        assert!((set.points[0].position - Vec3::new(4.0, 4.0, 0.0)).length() < 1e-5);
        let spot = set.spot.unwrap();
        assert_eq!(spot.position, eye);
        assert_eq!(spot.direction, Vec3::NEG_Z);
    }

    #[test]
    fn point_lights_are_capped() {
        let lights = (0..MAX_POINT_LIGHTS + 3).map(|_| Light::Point(PointLight::default()));
        let set = LightSet::from_lights(lights);
        assert_eq!(set.points.len(), MAX_POINT_LIGHTS);
    }
}
