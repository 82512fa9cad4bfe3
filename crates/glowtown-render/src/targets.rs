//! Offscreen render targets: the dual-output scene target, the ping-pong
//! blur pair and the full-screen quad that every post pass draws.
//!
//! All targets are created once at startup at a fixed size. The size is
//! checked against the device limits first, creation runs inside an error
//! scope, and each target is checked for completeness afterwards.

use crate::context::RenderError;
use bytemuck::{Pod, Zeroable};
use glowtown_core::PingPongSlot;
use thiserror::Error;
use wgpu::util::DeviceExt;

/// Floating-point format of every colour attachment, so radiance above 1.0
/// survives until tone mapping.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Depth/stencil format of the scene target.
pub const DEPTH_STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Shape of a single attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentDesc {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

/// Declared shape of a render target and the attachments it actually has
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDesc {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    pub color: Vec<AttachmentDesc>,
    pub depth_stencil: Option<AttachmentDesc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("{target}: no color attachments")]
    NoColorAttachments { target: &'static str },
    #[error("{target}: zero-sized target")]
    ZeroSize { target: &'static str },
    #[error("{width}x{height} exceeds the device limit of {max} pixels per side")]
    ExceedsLimit { width: u32, height: u32, max: u32 },
    #[error("device rejected target creation: {0}")]
    Creation(String),
    #[error("{target}/{attachment}: size {got_width}x{got_height} does not match {width}x{height}")]
    SizeMismatch {
        target: &'static str,
        attachment: &'static str,
        width: u32,
        height: u32,
        got_width: u32,
        got_height: u32,
    },
    #[error("{target}/{attachment}: {format:?} is not a floating-point color format")]
    NotFloatColor {
        target: &'static str,
        attachment: &'static str,
        format: wgpu::TextureFormat,
    },
    #[error("{target}/{attachment}: {format:?} is not a combined depth/stencil format")]
    NotDepthStencil {
        target: &'static str,
        attachment: &'static str,
        format: wgpu::TextureFormat,
    },
}

/// Reject a target size the device cannot allocate.
pub fn check_size(width: u32, height: u32, max_dimension: u32) -> Result<(), TargetError> {
    if width == 0 || height == 0 {
        return Err(TargetError::ZeroSize {
            target: "render targets",
        });
    }
    if width > max_dimension || height > max_dimension {
        return Err(TargetError::ExceedsLimit {
            width,
            height,
            max: max_dimension,
        });
    }
    Ok(())
}

impl TargetDesc {
    /// Verify that every attachment matches the declared size and has a
    /// usable format.
    pub fn check_completeness(&self) -> Result<(), TargetError> {
        if self.width == 0 || self.height == 0 {
            return Err(TargetError::ZeroSize { target: self.label });
        }
        if self.color.is_empty() {
            return Err(TargetError::NoColorAttachments { target: self.label });
        }

        for attachment in self.color.iter().chain(self.depth_stencil.iter()) {
            if attachment.width != self.width || attachment.height != self.height {
                return Err(TargetError::SizeMismatch {
                    target: self.label,
                    attachment: attachment.label,
                    width: self.width,
                    height: self.height,
                    got_width: attachment.width,
                    got_height: attachment.height,
                });
            }
        }

        for attachment in &self.color {
            if !matches!(
                attachment.format,
                wgpu::TextureFormat::Rgba16Float | wgpu::TextureFormat::Rgba32Float
            ) {
                return Err(TargetError::NotFloatColor {
                    target: self.label,
                    attachment: attachment.label,
                    format: attachment.format,
                });
            }
        }

        if let Some(depth) = &self.depth_stencil {
            if !depth.format.is_combined_depth_stencil_format() {
                return Err(TargetError::NotDepthStencil {
                    target: self.label,
                    attachment: depth.label,
                    format: depth.format,
                });
            }
        }

        Ok(())
    }
}

/// A texture used as a render attachment
pub struct Attachment {
    pub label: &'static str,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl Attachment {
    fn new(
        device: &wgpu::Device,
        label: &'static str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            label,
            texture,
            view,
        }
    }

    fn color(device: &wgpu::Device, label: &'static str, width: u32, height: u32) -> Self {
        Self::new(
            device,
            label,
            width,
            height,
            HDR_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        )
    }

    /// Describe the attachment from the texture's real properties
    pub fn desc(&self) -> AttachmentDesc {
        AttachmentDesc {
            label: self.label,
            width: self.texture.width(),
            height: self.texture.height(),
            format: self.texture.format(),
        }
    }
}

/// Dual-output scene target: radiance at attachment 0, bright-pass at 1
pub struct SceneTarget {
    pub radiance: Attachment,
    pub bright: Attachment,
    pub depth_stencil: Attachment,
    pub width: u32,
    pub height: u32,
}

impl SceneTarget {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        Self {
            radiance: Attachment::color(device, "Scene Radiance", width, height),
            bright: Attachment::color(device, "Scene Bright", width, height),
            depth_stencil: Attachment::new(
                device,
                "Scene Depth Stencil",
                width,
                height,
                DEPTH_STENCIL_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            ),
            width,
            height,
        }
    }

    pub fn desc(&self) -> TargetDesc {
        TargetDesc {
            label: "scene",
            width: self.width,
            height: self.height,
            color: vec![self.radiance.desc(), self.bright.desc()],
            depth_stencil: Some(self.depth_stencil.desc()),
        }
    }
}

/// Two identically shaped targets the blur alternates between
pub struct PingPongPair {
    targets: [Attachment; 2],
    pub width: u32,
    pub height: u32,
}

impl PingPongPair {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        Self {
            targets: [
                Attachment::color(device, "Ping-Pong A", width, height),
                Attachment::color(device, "Ping-Pong B", width, height),
            ],
            width,
            height,
        }
    }

    pub fn get(&self, slot: PingPongSlot) -> &Attachment {
        &self.targets[slot.index()]
    }

    pub fn descs(&self) -> [TargetDesc; 2] {
        let describe = |slot: PingPongSlot, label| TargetDesc {
            label,
            width: self.width,
            height: self.height,
            color: vec![self.get(slot).desc()],
            depth_stencil: None,
        };
        [
            describe(PingPongSlot::A, "ping-pong A"),
            describe(PingPongSlot::B, "ping-pong B"),
        ]
    }
}

/// Vertex of the full-screen quad
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

/// Triangle-strip quad covering NDC, UV origin at the top-left texel
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex {
        position: [-1.0, 1.0],
        uv: [0.0, 0.0],
    },
    QuadVertex {
        position: [-1.0, -1.0],
        uv: [0.0, 1.0],
    },
    QuadVertex {
        position: [1.0, 1.0],
        uv: [1.0, 0.0],
    },
    QuadVertex {
        position: [1.0, -1.0],
        uv: [1.0, 1.0],
    },
];

/// Owned full-screen quad geometry
pub struct FullScreenQuad {
    pub vertex_buffer: wgpu::Buffer,
    pub vertex_count: u32,
}

impl FullScreenQuad {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    pub fn new(device: &wgpu::Device) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Full-Screen Quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self {
            vertex_buffer,
            vertex_count: QUAD_VERTICES.len() as u32,
        }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    /// Primitive state matching the quad's vertex order
    pub fn primitive() -> wgpu::PrimitiveState {
        wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            ..Default::default()
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..self.vertex_count, 0..1);
    }
}

/// Every offscreen target the frame uses, plus the shared quad and sampler
pub struct RenderTargetSet {
    pub scene: SceneTarget,
    pub ping_pong: PingPongPair,
    pub quad: FullScreenQuad,
    /// Linear clamp-to-edge sampler for reading targets in post passes
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl RenderTargetSet {
    /// Create all targets at a fixed size. Fails if the size is beyond the
    /// device limits, the device rejects a texture, or any target is
    /// incomplete.
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Result<Self, RenderError> {
        check_size(width, height, device.limits().max_texture_dimension_2d)?;

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Target Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let set = Self {
            scene: SceneTarget::new(device, width, height),
            ping_pong: PingPongPair::new(device, width, height),
            quad: FullScreenQuad::new(device),
            sampler,
            width,
            height,
        };
        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());
        if let Some(error) = validation.or(out_of_memory) {
            return Err(TargetError::Creation(error.to_string()).into());
        }

        for desc in set.descs() {
            desc.check_completeness()?;
        }
        log::info!("Render targets ready at {}x{}", width, height);

        Ok(set)
    }

    pub fn descs(&self) -> Vec<TargetDesc> {
        let mut descs = vec![self.scene.desc()];
        descs.extend(self.ping_pong.descs());
        descs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color(label: &'static str, width: u32, height: u32) -> AttachmentDesc {
        AttachmentDesc {
            label,
            width,
            height,
            format: HDR_FORMAT,
        }
    }

    fn scene_desc(width: u32, height: u32) -> TargetDesc {
        TargetDesc {
            label: "scene",
            width,
            height,
            color: vec![color("radiance", width, height), color("bright", width, height)],
            depth_stencil: Some(AttachmentDesc {
                label: "depth",
                width,
                height,
                format: DEPTH_STENCIL_FORMAT,
            }),
        }
    }

    #[test]
    fn matching_dual_attachment_target_is_complete() {
        assert_eq!(scene_desc(1920, 1080).check_completeness(), Ok(()));
    }

    #[test]
    fn mismatched_attachment_size_is_incomplete() {
        let mut desc = scene_desc(1920, 1080);
        desc.color[1].width = 960;
        assert_eq!(
            desc.check_completeness(),
            Err(TargetError::SizeMismatch {
                target: "scene",
                attachment: "bright",
                width: 1920,
                height: 1080,
                got_width: 960,
                got_height: 1080,
            })
        );

        let mut desc = scene_desc(1920, 1080);
        desc.depth_stencil.as_mut().unwrap().height = 1;
        assert!(desc.check_completeness().is_err());
    }

    #[test]
    fn clamping_color_format_is_incomplete() {
        let mut desc = scene_desc(64, 64);
        desc.color[0].format = wgpu::TextureFormat::Rgba8Unorm;
        assert!(matches!(
            desc.check_completeness(),
            Err(TargetError::NotFloatColor { .. })
        ));
    }

    #[test]
    fn depth_only_format_is_incomplete() {
        let mut desc = scene_desc(64, 64);
        desc.depth_stencil.as_mut().unwrap().format = wgpu::TextureFormat::Depth32Float;
        assert!(matches!(
            desc.check_completeness(),
            Err(TargetError::NotDepthStencil { .. })
        ));
    }

    #[test]
    fn empty_or_zero_sized_targets_are_incomplete() {
        let mut desc = scene_desc(64, 64);
        desc.color.clear();
        assert!(desc.check_completeness().is_err());
        assert!(scene_desc(0, 64).check_completeness().is_err());
    }

    #[test]
    fn size_beyond_device_limit_is_rejected() {
        assert_eq!(
            check_size(20000, 1080, 8192),
            Err(TargetError::ExceedsLimit {
                width: 20000,
                height: 1080,
                max: 8192,
            })
        );
        assert!(check_size(1920, 8193, 8192).is_err());
        assert!(matches!(
            check_size(0, 1080, 8192),
            Err(TargetError::ZeroSize { .. })
        ));
        assert_eq!(check_size(1920, 1080, 8192), Ok(()));
        assert_eq!(check_size(8192, 8192, 8192), Ok(()));
    }

    #[test]
    fn quad_covers_ndc_with_matching_uvs() {
        for v in QUAD_VERTICES {
            assert_eq!(v.position[0].abs(), 1.0);
            assert_eq!(v.position[1].abs(), 1.0);
            assert_eq!(v.uv[0], (v.position[0] + 1.0) / 2.0);
            assert_eq!(v.uv[1], (1.0 - v.position[1]) / 2.0);
        }
        assert_eq!(std::mem::size_of::<QuadVertex>(), 16);
    }
}
