//! GPU-side uniform blocks
//!
//! Every field is a `vec4` or `mat4x4` so the Rust layout matches WGSL's
//! uniform layout without hand-inserted padding. The shader binding tables
//! check these sizes against the reflected WGSL at load time.

use bytemuck::{Pod, Zeroable};
use glowtown_core::{
    normal_matrix, Attenuation, DirectionalLight, LightSet, Mat4, PointLight,
    PostProcessSettings, SpotLight, Vec3, MAX_POINT_LIGHTS,
};

fn vec4(v: Vec3, w: f32) -> [f32; 4] {
    [v.x, v.y, v.z, w]
}

fn attenuation(a: &Attenuation) -> [f32; 4] {
    [a.constant, a.linear, a.quadratic, 0.0]
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct GpuDirectionalLight {
    pub direction: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
}

impl From<&DirectionalLight> for GpuDirectionalLight {
    fn from(light: &DirectionalLight) -> Self {
        Self {
            direction: vec4(light.direction, 0.0),
            ambient: vec4(light.ambient, 0.0),
            diffuse: vec4(light.diffuse, 0.0),
            specular: vec4(light.specular, 0.0),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct GpuPointLight {
    pub position: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub attenuation: [f32; 4],
}

impl From<&PointLight> for GpuPointLight {
    fn from(light: &PointLight) -> Self {
        Self {
            position: vec4(light.position, 1.0),
            ambient: vec4(light.ambient, 0.0),
            diffuse: vec4(light.diffuse, 0.0),
            specular: vec4(light.specular, 0.0),
            attenuation: attenuation(&light.attenuation),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct GpuSpotLight {
    pub position: [f32; 4],
    pub direction: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub attenuation: [f32; 4],
    /// x: inner cutoff cosine, y: outer cutoff cosine
    pub cutoff: [f32; 4],
}

impl From<&SpotLight> for GpuSpotLight {
    fn from(light: &SpotLight) -> Self {
        Self {
            position: vec4(light.position, 1.0),
            direction: vec4(light.direction, 0.0),
            ambient: vec4(light.ambient, 0.0),
            diffuse: vec4(light.diffuse, 0.0),
            specular: vec4(light.specular, 0.0),
            attenuation: attenuation(&light.attenuation),
            cutoff: [light.inner_cutoff, light.outer_cutoff, 0.0, 0.0],
        }
    }
}

/// Group 0 of the scene shader: camera, lights and bright-pass threshold
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view_position: [f32; 4],
    pub directional: GpuDirectionalLight,
    pub points: [GpuPointLight; MAX_POINT_LIGHTS],
    pub spot: GpuSpotLight,
    /// x: point light count, y: directional enabled, z: spot enabled
    pub counts: [u32; 4],
    /// x: luminance threshold
    pub bloom: [f32; 4],
}

impl FrameUniforms {
    pub fn new(view: Mat4, projection: Mat4, eye: Vec3, lights: &LightSet, threshold: f32) -> Self {
        let mut points = [GpuPointLight::default(); MAX_POINT_LIGHTS];
        for (slot, light) in points.iter_mut().zip(&lights.points) {
            *slot = light.into();
        }

        Self {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            view_position: vec4(eye, 1.0),
            directional: lights
                .directional
                .as_ref()
                .map(GpuDirectionalLight::from)
                .unwrap_or_default(),
            points,
            spot: lights.spot.as_ref().map(GpuSpotLight::from).unwrap_or_default(),
            counts: [
                lights.points.len().min(MAX_POINT_LIGHTS) as u32,
                lights.directional.is_some() as u32,
                lights.spot.is_some() as u32,
                0,
            ],
            bloom: [threshold, 0.0, 0.0, 0.0],
        }
    }
}

/// Group 1 binding 3 of the scene shader
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct MaterialUniforms {
    /// x: shininess
    pub params: [f32; 4],
}

impl MaterialUniforms {
    pub fn new(shininess: f32) -> Self {
        Self {
            params: [shininess, 0.0, 0.0, 0.0],
        }
    }
}

/// Group 2 of the scene shader: per-object transform
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    /// rgb: emissive colour, a > 0 draws the object unlit in that colour
    pub emissive: [f32; 4],
}

impl ObjectUniforms {
    pub fn lit(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix(model).to_cols_array_2d(),
            emissive: [0.0; 4],
        }
    }

    pub fn emissive(model: Mat4, color: Vec3) -> Self {
        Self {
            emissive: vec4(color, 1.0),
            ..Self::lit(model)
        }
    }
}

/// Group 0 of the skybox shader
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SkyboxUniforms {
    /// Inverse of projection * rotation-only view
    pub inv_view_proj: [[f32; 4]; 4],
    /// x: luminance threshold
    pub bloom: [f32; 4],
}

/// Group 0 of the blur shader
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct BlurUniforms {
    /// xy: UV offset between neighbouring taps
    pub step: [f32; 4],
}

impl BlurUniforms {
    pub fn new(direction: [f32; 2], width: u32, height: u32) -> Self {
        Self {
            step: [
                direction[0] / width.max(1) as f32,
                direction[1] / height.max(1) as f32,
                0.0,
                0.0,
            ],
        }
    }
}

/// Group 0 of the composite shader
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct CompositeUniforms {
    /// x: exposure, y: gamma
    pub tone: [f32; 4],
    /// x: hdr enabled, y: bloom enabled, z: effect selector
    pub flags: [u32; 4],
}

impl From<&PostProcessSettings> for CompositeUniforms {
    fn from(settings: &PostProcessSettings) -> Self {
        Self {
            tone: [settings.exposure, settings.gamma, 0.0, 0.0],
            flags: [
                settings.hdr_enabled as u32,
                settings.bloom_enabled as u32,
                settings.effect.as_u32(),
                0,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glowtown_core::{EffectSelector, LightRig};

    #[test]
    fn uniform_sizes_are_vec4_multiples() {
        assert_eq!(std::mem::size_of::<GpuDirectionalLight>(), 64);
        assert_eq!(std::mem::size_of::<GpuPointLight>(), 80);
        assert_eq!(std::mem::size_of::<GpuSpotLight>(), 112);
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 672);
        assert_eq!(std::mem::size_of::<MaterialUniforms>(), 16);
        assert_eq!(std::mem::size_of::<ObjectUniforms>(), 144);
        assert_eq!(std::mem::size_of::<SkyboxUniforms>(), 80);
        assert_eq!(std::mem::size_of::<BlurUniforms>(), 16);
        assert_eq!(std::mem::size_of::<CompositeUniforms>(), 32);
    }

    #[test]
    fn frame_uniforms_pack_light_counts() {
        let rig = LightRig {
            flashlight_enabled: true,
            ..Default::default()
        };
        let lights = rig.evaluate(0.0, Vec3::ZERO, Vec3::NEG_Z);
        let frame = FrameUniforms::new(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO, &lights, 1.0);
        assert_eq!(frame.counts, [1, 1, 1, 0]);
        assert_eq!(frame.points[0].position, [4.0, 4.0, 0.0, 1.0]);
        assert_eq!(frame.points[0].attenuation, [1.0, 0.09, 0.032, 0.0]);
        assert_eq!(frame.bloom[0], 1.0);
    }

    #[test]
    fn composite_flags_follow_settings() {
        let settings = PostProcessSettings {
            hdr_enabled: false,
            bloom_enabled: true,
            effect: EffectSelector::Tint,
            exposure: 2.0,
            gamma: 2.2,
            ..Default::default()
        };
        let uniforms = CompositeUniforms::from(&settings);
        assert_eq!(uniforms.flags, [0, 1, 2, 0]);
        assert_eq!(uniforms.tone[0], 2.0);
    }

    #[test]
    fn blur_step_is_one_texel_along_axis() {
        let h = BlurUniforms::new([1.0, 0.0], 1920, 1080);
        assert_eq!(h.step, [1.0 / 1920.0, 0.0, 0.0, 0.0]);
        let v = BlurUniforms::new([0.0, 1.0], 1920, 1080);
        assert_eq!(v.step, [0.0, 1.0 / 1080.0, 0.0, 0.0]);
    }
}
