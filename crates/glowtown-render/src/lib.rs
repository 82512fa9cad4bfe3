//! Glowtown Render - wgpu HDR scene rendering with a ping-pong bloom
//!
//! Each frame renders the scene into two floating-point attachments
//! (radiance and its bright-pass), blurs the bright-pass back and forth
//! between two targets, then composites bloom, tone mapping and gamma into
//! the window surface or a headless texture.

mod bind;
pub mod blur_pass;
pub mod composite_pass;
mod context;
mod headless;
mod mesh;
pub mod model;
mod renderer;
pub mod scene_pass;
pub mod shader;
mod skybox;
pub mod targets;
mod texture;
mod uniforms;

pub use context::{optional_features, RenderContext, RenderError};
pub use headless::HeadlessContext;
pub use mesh::{create_cube_mesh, GpuMesh, InstanceRaw, MeshData, Vertex};
pub use model::{import_model, import_model_or_empty, Model, ModelData};
pub use renderer::{FrameParams, FrameRenderer, RendererConfig};
pub use shader::{BindingProblem, BindingSlot, BindingTable, ShaderProgram};
pub use skybox::SkyboxPass;
pub use targets::{RenderTargetSet, TargetDesc, TargetError, HDR_FORMAT};
pub use texture::{CubemapFaces, GpuTexture};
pub use uniforms::{
    BlurUniforms, CompositeUniforms, FrameUniforms, MaterialUniforms, ObjectUniforms,
    SkyboxUniforms,
};

#[cfg(test)]
mod tests {
    #[test]
    fn scene_shader_wgsl_parses() {
        let source = include_str!("shaders/scene.wgsl");
        naga::front::wgsl::parse_str(source).expect("scene.wgsl failed to parse");
    }

    #[test]
    fn skybox_shader_wgsl_parses() {
        let source = include_str!("shaders/skybox.wgsl");
        naga::front::wgsl::parse_str(source).expect("skybox.wgsl failed to parse");
    }

    #[test]
    fn blur_shader_wgsl_parses() {
        let source = include_str!("shaders/blur.wgsl");
        naga::front::wgsl::parse_str(source).expect("blur.wgsl failed to parse");
    }

    #[test]
    fn composite_shader_wgsl_parses() {
        let source = include_str!("shaders/composite.wgsl");
        naga::front::wgsl::parse_str(source).expect("composite.wgsl failed to parse");
    }

    /// Components of the float constant `name` declared in `source`.
    fn wgsl_constant(source: &str, name: &str) -> Vec<f32> {
        let module = naga::front::wgsl::parse_str(source).expect("shader failed to parse");
        let (_, constant) = module
            .constants
            .iter()
            .find(|(_, c)| c.name.as_deref() == Some(name))
            .unwrap_or_else(|| panic!("constant {name} not declared"));
        let literal = |handle: naga::Handle<naga::Expression>| {
            match &module.global_expressions[handle] {
                naga::Expression::Literal(naga::Literal::F32(v)) => *v,
                other => panic!("{name}: unexpected component {other:?}"),
            }
        };
        match &module.global_expressions[constant.init] {
            naga::Expression::Compose { components, .. } => {
                components.iter().map(|&c| literal(c)).collect()
            }
            _ => vec![literal(constant.init)],
        }
    }

    #[test]
    fn shader_constants_match_cpu_reference() {
        use super::shader;
        use glowtown_core::{tonemap, GAUSSIAN_WEIGHTS};

        let luma = tonemap::LUMINANCE_WEIGHTS.to_array().to_vec();
        assert_eq!(wgsl_constant(shader::SCENE_WGSL, "LUMINANCE_WEIGHTS"), luma);
        assert_eq!(wgsl_constant(shader::SKYBOX_WGSL, "LUMINANCE_WEIGHTS"), luma);
        assert_eq!(
            wgsl_constant(shader::COMPOSITE_WGSL, "VIOLET_TINT"),
            tonemap::VIOLET_TINT.to_array().to_vec()
        );
        assert_eq!(
            wgsl_constant(shader::BLUR_WGSL, "GAUSSIAN_WEIGHTS"),
            GAUSSIAN_WEIGHTS.to_vec()
        );
    }
}
