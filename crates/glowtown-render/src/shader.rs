//! Shader programs and their typed binding tables
//!
//! Each program lists the [`BindingSlot`]s the host binds for it. When the
//! program loads, its WGSL is parsed with naga and every slot is resolved
//! against the module's resource bindings. Problems are logged and recorded
//! on the table instead of surfacing later as a draw-time validation panic.

use crate::context::RenderError;
use crate::uniforms::{
    BlurUniforms, CompositeUniforms, FrameUniforms, MaterialUniforms, ObjectUniforms,
    SkyboxUniforms,
};
use std::collections::HashMap;
use thiserror::Error;

pub const SCENE_WGSL: &str = include_str!("shaders/scene.wgsl");
pub const SKYBOX_WGSL: &str = include_str!("shaders/skybox.wgsl");
pub const BLUR_WGSL: &str = include_str!("shaders/blur.wgsl");
pub const COMPOSITE_WGSL: &str = include_str!("shaders/composite.wgsl");

/// What kind of resource a slot expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Uniform buffer of the given size in bytes
    Uniform(u64),
    Texture,
    Sampler,
}

/// Every resource the host binds to any shader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingSlot {
    Frame,
    DiffuseTexture,
    SpecularTexture,
    MaterialSampler,
    Material,
    Object,
    Skybox,
    SkyCube,
    SkySampler,
    BlurParams,
    BlurSource,
    BlurSampler,
    CompositeParams,
    SceneTexture,
    SceneSampler,
    BloomTexture,
    BloomSampler,
}

fn uniform<T>() -> SlotKind {
    SlotKind::Uniform(std::mem::size_of::<T>() as u64)
}

impl BindingSlot {
    /// (group, binding) the host uses for this slot
    pub fn location(self) -> (u32, u32) {
        match self {
            Self::Frame => (0, 0),
            Self::DiffuseTexture => (1, 0),
            Self::SpecularTexture => (1, 1),
            Self::MaterialSampler => (1, 2),
            Self::Material => (1, 3),
            Self::Object => (2, 0),
            Self::Skybox => (0, 0),
            Self::SkyCube => (1, 0),
            Self::SkySampler => (1, 1),
            Self::BlurParams => (0, 0),
            Self::BlurSource => (1, 0),
            Self::BlurSampler => (1, 1),
            Self::CompositeParams => (0, 0),
            Self::SceneTexture => (1, 0),
            Self::SceneSampler => (1, 1),
            Self::BloomTexture => (2, 0),
            Self::BloomSampler => (2, 1),
        }
    }

    /// Global variable name in WGSL
    pub fn name(self) -> &'static str {
        match self {
            Self::Frame => "frame",
            Self::DiffuseTexture => "t_diffuse",
            Self::SpecularTexture => "t_specular",
            Self::MaterialSampler => "s_material",
            Self::Material => "material",
            Self::Object => "object_data",
            Self::Skybox => "skybox",
            Self::SkyCube => "t_sky",
            Self::SkySampler => "s_sky",
            Self::BlurParams | Self::CompositeParams => "params",
            Self::BlurSource => "t_source",
            Self::BlurSampler => "s_source",
            Self::SceneTexture => "t_scene",
            Self::SceneSampler => "s_scene",
            Self::BloomTexture => "t_bloom",
            Self::BloomSampler => "s_bloom",
        }
    }

    pub fn kind(self) -> SlotKind {
        match self {
            Self::Frame => uniform::<FrameUniforms>(),
            Self::Material => uniform::<MaterialUniforms>(),
            Self::Object => uniform::<ObjectUniforms>(),
            Self::Skybox => uniform::<SkyboxUniforms>(),
            Self::BlurParams => uniform::<BlurUniforms>(),
            Self::CompositeParams => uniform::<CompositeUniforms>(),
            Self::DiffuseTexture
            | Self::SpecularTexture
            | Self::SkyCube
            | Self::BlurSource
            | Self::SceneTexture
            | Self::BloomTexture => SlotKind::Texture,
            Self::MaterialSampler
            | Self::SkySampler
            | Self::BlurSampler
            | Self::SceneSampler
            | Self::BloomSampler => SlotKind::Sampler,
        }
    }
}

pub const SCENE_SLOTS: &[BindingSlot] = &[
    BindingSlot::Frame,
    BindingSlot::DiffuseTexture,
    BindingSlot::SpecularTexture,
    BindingSlot::MaterialSampler,
    BindingSlot::Material,
    BindingSlot::Object,
];

pub const SKYBOX_SLOTS: &[BindingSlot] = &[
    BindingSlot::Skybox,
    BindingSlot::SkyCube,
    BindingSlot::SkySampler,
];

pub const BLUR_SLOTS: &[BindingSlot] = &[
    BindingSlot::BlurParams,
    BindingSlot::BlurSource,
    BindingSlot::BlurSampler,
];

pub const COMPOSITE_SLOTS: &[BindingSlot] = &[
    BindingSlot::CompositeParams,
    BindingSlot::SceneTexture,
    BindingSlot::SceneSampler,
    BindingSlot::BloomTexture,
    BindingSlot::BloomSampler,
];

/// A disagreement between the host's slot table and the shader source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingProblem {
    #[error("{0:?} ('{name}') is not declared", name = .0.name())]
    Missing(BindingSlot),
    #[error("{slot:?} is declared at group {group} binding {binding}")]
    Moved {
        slot: BindingSlot,
        group: u32,
        binding: u32,
    },
    #[error("{slot:?} is declared as {found:?}, host binds {expected:?}")]
    WrongKind {
        slot: BindingSlot,
        expected: SlotKind,
        found: SlotKind,
    },
    #[error("'{name}' at group {group} binding {binding} has no host slot")]
    Unexpected {
        name: String,
        group: u32,
        binding: u32,
    },
}

impl BindingProblem {
    /// A missing slot only means the shader never reads it. Everything else
    /// would fail pipeline or bind group validation.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Missing(_))
    }
}

struct Reflected {
    group: u32,
    binding: u32,
    kind: Option<SlotKind>,
}

/// Slots resolved against one shader module
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    problems: Vec<BindingProblem>,
}

impl BindingTable {
    /// Resolve `required` against the resource bindings of `module`.
    pub fn reflect(module: &naga::Module, required: &[BindingSlot]) -> Self {
        let gctx = module.to_ctx();
        let mut globals: HashMap<&str, Reflected> = HashMap::new();

        for (_, var) in module.global_variables.iter() {
            let (Some(name), Some(rb)) = (var.name.as_deref(), var.binding.as_ref()) else {
                continue;
            };
            let inner = &module.types[var.ty].inner;
            let kind = match (var.space, inner) {
                (naga::AddressSpace::Uniform, _) => {
                    Some(SlotKind::Uniform(inner.size(gctx) as u64))
                }
                (_, naga::TypeInner::Image { .. }) => Some(SlotKind::Texture),
                (_, naga::TypeInner::Sampler { .. }) => Some(SlotKind::Sampler),
                _ => None,
            };
            globals.insert(
                name,
                Reflected {
                    group: rb.group,
                    binding: rb.binding,
                    kind,
                },
            );
        }

        let mut table = Self::default();
        for &slot in required {
            let Some(found) = globals.remove(slot.name()) else {
                table.problems.push(BindingProblem::Missing(slot));
                continue;
            };
            if (found.group, found.binding) != slot.location() {
                table.problems.push(BindingProblem::Moved {
                    slot,
                    group: found.group,
                    binding: found.binding,
                });
                continue;
            }
            if found.kind != Some(slot.kind()) {
                table.problems.push(BindingProblem::WrongKind {
                    slot,
                    expected: slot.kind(),
                    found: found.kind.unwrap_or(SlotKind::Uniform(0)),
                });
            }
        }

        let mut leftovers: Vec<_> = globals.into_iter().collect();
        leftovers.sort_by_key(|(_, r)| (r.group, r.binding));
        for (name, r) in leftovers {
            table.problems.push(BindingProblem::Unexpected {
                name: name.to_string(),
                group: r.group,
                binding: r.binding,
            });
        }

        table
    }

    pub fn problems(&self) -> &[BindingProblem] {
        &self.problems
    }

    pub fn is_complete(&self) -> bool {
        self.problems.is_empty()
    }

    /// True when pipelines built from this shader will pass validation.
    pub fn is_usable(&self) -> bool {
        !self.problems.iter().any(BindingProblem::is_fatal)
    }
}

/// Parse WGSL source, turning errors into a readable diagnostic.
pub fn parse_wgsl(label: &str, source: &str) -> Result<naga::Module, RenderError> {
    naga::front::wgsl::parse_str(source).map_err(|e| RenderError::ShaderParse {
        label: label.to_string(),
        message: e.emit_to_string(source),
    })
}

/// A compiled shader module plus its validated binding table
pub struct ShaderProgram {
    pub label: &'static str,
    pub module: wgpu::ShaderModule,
    pub bindings: BindingTable,
}

impl ShaderProgram {
    /// Parse, reflect and compile a WGSL program. A parse failure is an
    /// error. Binding problems are logged and kept on the table.
    pub fn load(
        device: &wgpu::Device,
        label: &'static str,
        source: &str,
        required: &[BindingSlot],
    ) -> Result<Self, RenderError> {
        let parsed = parse_wgsl(label, source)?;
        let bindings = BindingTable::reflect(&parsed, required);
        for problem in bindings.problems() {
            log::error!("shader '{}': {}", label, problem);
        }

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        Ok(Self {
            label,
            module,
            bindings,
        })
    }

    /// Build a pipeline only if the binding table allows it, logging otherwise.
    pub fn build_pipeline<T>(
        &self,
        what: &str,
        build: impl FnOnce(&wgpu::ShaderModule) -> T,
    ) -> Option<T> {
        if self.bindings.is_usable() {
            Some(build(&self.module))
        } else {
            log::error!(
                "skipping {} pipeline: shader '{}' does not match its binding table",
                what,
                self.label
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(source: &str, slots: &[BindingSlot]) -> BindingTable {
        let module = parse_wgsl("test", source).expect("test shader failed to parse");
        BindingTable::reflect(&module, slots)
    }

    #[test]
    fn shipped_shaders_resolve_every_slot() {
        for (label, source, slots) in [
            ("scene", SCENE_WGSL, SCENE_SLOTS),
            ("skybox", SKYBOX_WGSL, SKYBOX_SLOTS),
            ("blur", BLUR_WGSL, BLUR_SLOTS),
            ("composite", COMPOSITE_WGSL, COMPOSITE_SLOTS),
        ] {
            let table = table(source, slots);
            assert!(table.is_complete(), "{label}: {:?}", table.problems());
        }
    }

    const PARTIAL: &str = r#"
        struct BlurParams { step: vec4<f32> };
        @group(0) @binding(0) var<uniform> params: BlurParams;
        @group(1) @binding(0) var t_source: texture_2d<f32>;

        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return params.step;
        }
    "#;

    #[test]
    fn missing_slot_is_reported_not_fatal() {
        let table = table(PARTIAL, BLUR_SLOTS);
        assert_eq!(table.problems(), &[BindingProblem::Missing(BindingSlot::BlurSampler)]);
        assert!(!table.is_complete());
        assert!(table.is_usable());
    }

    #[test]
    fn size_mismatch_is_fatal() {
        let source = r#"
            struct CompositeParams { tone: vec4<f32> };
            @group(0) @binding(0) var<uniform> params: CompositeParams;
        "#;
        let table = table(source, &[BindingSlot::CompositeParams]);
        assert_eq!(
            table.problems(),
            &[BindingProblem::WrongKind {
                slot: BindingSlot::CompositeParams,
                expected: SlotKind::Uniform(32),
                found: SlotKind::Uniform(16),
            }]
        );
        assert!(!table.is_usable());
    }

    #[test]
    fn moved_and_unexpected_bindings_are_fatal() {
        let source = r#"
            @group(3) @binding(0) var t_source: texture_2d<f32>;
            @group(1) @binding(1) var s_source: sampler;
            @group(1) @binding(5) var s_extra: sampler;
        "#;
        let table = table(source, &[BindingSlot::BlurSource, BindingSlot::BlurSampler]);
        assert!(table.problems().contains(&BindingProblem::Moved {
            slot: BindingSlot::BlurSource,
            group: 3,
            binding: 0,
        }));
        assert!(table.problems().contains(&BindingProblem::Unexpected {
            name: "s_extra".into(),
            group: 1,
            binding: 5,
        }));
        assert!(!table.is_usable());
    }

    #[test]
    fn parse_errors_are_reported() {
        let err = parse_wgsl("broken", "fn oops( {").unwrap_err();
        assert!(matches!(err, RenderError::ShaderParse { .. }));
    }
}
