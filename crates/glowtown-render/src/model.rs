//! glTF/GLB models: import to CPU meshes and materials, then upload
//!
//! A model that fails to import is logged and replaced by an empty model so
//! the rest of the scene still renders.

use crate::bind;
use crate::mesh::{GpuMesh, MeshData, Vertex};
use crate::texture::GpuTexture;
use crate::uniforms::MaterialUniforms;
use glowtown_core::{normal_matrix, GlowError, Mat4, Result, Vec3};
use std::ops::Range;
use std::path::Path;
use wgpu::util::DeviceExt;

/// Shininess exponent every material uses
pub const DEFAULT_SHININESS: f32 = 5.0;

/// Decoded RGBA8 image
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// CPU-side material
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialData {
    pub name: String,
    /// Linear RGBA used when there is no diffuse texture
    pub base_color: [f32; 4],
    pub diffuse: Option<ImageData>,
}

/// CPU-side model with transforms already applied to its vertices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelData {
    pub name: String,
    pub meshes: Vec<MeshData>,
    pub materials: Vec<MaterialData>,
}

impl ModelData {
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.vertices.len()).sum()
    }
}

/// Import a glTF or GLB file, flattening the node hierarchy of its default
/// scene into world-space meshes.
pub fn import_model(path: &Path) -> Result<ModelData> {
    let (document, buffers, images) = gltf::import(path).map_err(|e| {
        GlowError::ImportError(format!("Failed to import '{}': {}", path.display(), e))
    })?;

    let name = path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();

    let mut meshes = Vec::new();
    let scene = document.default_scene().or_else(|| document.scenes().next());
    match scene {
        Some(scene) => {
            for node in scene.nodes() {
                collect_node(&node, Mat4::IDENTITY, &buffers, &mut meshes);
            }
        }
        None => {
            for mesh in document.meshes() {
                collect_mesh(&mesh, Mat4::IDENTITY, &buffers, &mut meshes);
            }
        }
    }

    let decoded: Vec<Option<ImageData>> = images
        .iter()
        .enumerate()
        .map(|(i, image)| {
            let converted = to_rgba8(image.format, &image.pixels).map(|rgba| ImageData {
                width: image.width,
                height: image.height,
                rgba,
            });
            if converted.is_none() {
                log::warn!("{}: image {} has unsupported format {:?}", name, i, image.format);
            }
            converted
        })
        .collect();

    let image_for =
        |texture: gltf::Texture| decoded.get(texture.source().index()).cloned().flatten();

    let materials = document
        .materials()
        .map(|material| {
            let pbr = material.pbr_metallic_roughness();
            MaterialData {
                name: material
                    .name()
                    .map(String::from)
                    .unwrap_or_else(|| format!("material_{}", material.index().unwrap_or(0))),
                base_color: pbr.base_color_factor(),
                diffuse: pbr.base_color_texture().and_then(|info| image_for(info.texture())),
            }
        })
        .collect();

    let model = ModelData {
        name,
        meshes,
        materials,
    };
    log::info!(
        "Loaded model '{}': {} meshes, {} vertices, {} materials",
        model.name,
        model.meshes.len(),
        model.vertex_count(),
        model.materials.len()
    );
    Ok(model)
}

/// Import a model, logging failures and returning an empty model instead.
pub fn import_model_or_empty(path: &Path) -> ModelData {
    import_model(path).unwrap_or_else(|e| {
        log::error!("{}", e);
        ModelData {
            name: path.display().to_string(),
            ..Default::default()
        }
    })
}

fn collect_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<MeshData>,
) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        collect_mesh(&mesh, world, buffers, out);
    }
    for child in node.children() {
        collect_node(&child, world, buffers, out);
    }
}

fn collect_mesh(
    mesh: &gltf::Mesh,
    transform: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<MeshData>,
) {
    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!("Skipping non-triangle primitive in mesh {}", mesh.index());
            continue;
        }
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .map(|iter| iter.collect())
            .unwrap_or_default();
        let normals: Vec<[f32; 3]> = reader
            .read_normals()
            .map(|iter| iter.collect())
            .unwrap_or_default();
        let uvs: Vec<[f32; 2]> = reader
            .read_tex_coords(0)
            .map(|iter| iter.into_f32().collect())
            .unwrap_or_default();
        let indices: Option<Vec<u32>> = reader
            .read_indices()
            .map(|iter| iter.into_u32().collect());

        out.push(build_mesh(
            &positions,
            &normals,
            &uvs,
            indices,
            transform,
            primitive.material().index(),
        ));
    }
}

/// Assemble vertices from attribute streams and bake `transform` into them.
/// Missing normals point up, missing UVs are zero and missing indices draw
/// the vertices in order.
pub fn build_mesh(
    positions: &[[f32; 3]],
    normals: &[[f32; 3]],
    uvs: &[[f32; 2]],
    indices: Option<Vec<u32>>,
    transform: Mat4,
    material: Option<usize>,
) -> MeshData {
    let normal_transform = normal_matrix(transform);
    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let n = normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]);
            Vertex {
                position: transform.transform_point3(Vec3::from(p)).to_array(),
                normal: normal_transform
                    .transform_vector3(Vec3::from(n))
                    .normalize_or_zero()
                    .to_array(),
                uv: uvs.get(i).copied().unwrap_or([0.0, 0.0]),
            }
        })
        .collect::<Vec<_>>();

    // Whole triangles are dropped so the survivors keep their corners
    let vertex_count = vertices.len() as u32;
    let indices = indices
        .unwrap_or_else(|| (0..vertex_count).collect())
        .chunks_exact(3)
        .filter(|tri| tri.iter().all(|&i| i < vertex_count))
        .flatten()
        .copied()
        .collect::<Vec<_>>();

    MeshData {
        vertices,
        indices,
        material,
    }
}

/// Expand glTF pixel data to tightly packed RGBA8. 16-bit channels keep
/// their high byte. Float images are not supported.
pub fn to_rgba8(format: gltf::image::Format, pixels: &[u8]) -> Option<Vec<u8>> {
    use gltf::image::Format;

    let (channels, bytes_per_channel) = match format {
        Format::R8 => (1, 1),
        Format::R8G8 => (2, 1),
        Format::R8G8B8 => (3, 1),
        Format::R8G8B8A8 => (4, 1),
        Format::R16 => (1, 2),
        Format::R16G16 => (2, 2),
        Format::R16G16B16 => (3, 2),
        Format::R16G16B16A16 => (4, 2),
        Format::R32G32B32FLOAT | Format::R32G32B32A32FLOAT => return None,
    };

    let stride = channels * bytes_per_channel;
    let channel = |px: &[u8], c: usize| px[c * bytes_per_channel + bytes_per_channel - 1];
    let mut rgba = Vec::with_capacity(pixels.len() / stride * 4);
    for px in pixels.chunks_exact(stride) {
        let texel = match channels {
            1 => {
                let v = channel(px, 0);
                [v, v, v, 255]
            }
            2 => {
                let v = channel(px, 0);
                [v, v, v, channel(px, 1)]
            }
            3 => [channel(px, 0), channel(px, 1), channel(px, 2), 255],
            _ => [channel(px, 0), channel(px, 1), channel(px, 2), channel(px, 3)],
        };
        rgba.extend_from_slice(&texel);
    }
    Some(rgba)
}

fn linear_to_srgb_u8(c: f32) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let s = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (s * 255.0).round() as u8
}

/// Layout of group 1 of the scene shader
pub fn material_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Material Bind Group Layout"),
        entries: &[
            bind::texture_entry(0, wgpu::TextureViewDimension::D2),
            bind::texture_entry(1, wgpu::TextureViewDimension::D2),
            bind::sampler_entry(2),
            bind::uniform_entry(3, wgpu::ShaderStages::FRAGMENT),
        ],
    })
}

/// Creates material bind groups, substituting 1x1 textures for absent maps.
pub struct MaterialFactory {
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    params: wgpu::Buffer,
    white: GpuTexture,
    specular_default: GpuTexture,
}

impl MaterialFactory {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Material Params"),
            contents: bytemuck::bytes_of(&MaterialUniforms::new(DEFAULT_SHININESS)),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        Self {
            layout: material_bind_group_layout(device),
            sampler,
            params,
            white: GpuTexture::solid(
                device,
                queue,
                "Default Diffuse",
                [255; 4],
                wgpu::TextureFormat::Rgba8UnormSrgb,
            ),
            specular_default: GpuTexture::solid(
                device,
                queue,
                "Default Specular",
                [128, 128, 128, 255],
                wgpu::TextureFormat::Rgba8Unorm,
            ),
        }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    fn bind(
        &self,
        device: &wgpu::Device,
        label: &str,
        diffuse: &GpuTexture,
        specular: &GpuTexture,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&specular.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.params.as_entire_binding(),
                },
            ],
        })
    }

    /// White diffuse, mid-grey specular
    pub fn default_material(&self, device: &wgpu::Device) -> wgpu::BindGroup {
        self.bind(device, "Default Material", &self.white, &self.specular_default)
    }

    pub fn create(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        material: &MaterialData,
    ) -> wgpu::BindGroup {
        let diffuse = match &material.diffuse {
            Some(img) => GpuTexture::from_rgba(
                device,
                queue,
                &format!("{} Diffuse", material.name),
                img.width,
                img.height,
                &img.rgba,
                wgpu::TextureFormat::Rgba8UnormSrgb,
            ),
            None => {
                let [r, g, b, a] = material.base_color;
                GpuTexture::solid(
                    device,
                    queue,
                    &format!("{} Base Color", material.name),
                    [
                        linear_to_srgb_u8(r),
                        linear_to_srgb_u8(g),
                        linear_to_srgb_u8(b),
                        (a.clamp(0.0, 1.0) * 255.0).round() as u8,
                    ],
                    wgpu::TextureFormat::Rgba8UnormSrgb,
                )
            }
        };
        // glTF has no Phong specular map, every model uses the default mask
        self.bind(device, &material.name, &diffuse, &self.specular_default)
    }
}

/// A model on the GPU
pub struct Model {
    pub name: String,
    pub meshes: Vec<GpuMesh>,
    pub materials: Vec<wgpu::BindGroup>,
    default_material: wgpu::BindGroup,
}

impl Model {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        factory: &MaterialFactory,
        data: &ModelData,
    ) -> Self {
        let meshes = data
            .meshes
            .iter()
            .enumerate()
            .filter(|(_, mesh)| !mesh.indices.is_empty())
            .map(|(i, mesh)| GpuMesh::upload(device, &format!("{} Mesh {}", data.name, i), mesh))
            .collect();
        let materials = data
            .materials
            .iter()
            .map(|m| factory.create(device, queue, m))
            .collect();

        Self {
            name: data.name.clone(),
            meshes,
            materials,
            default_material: factory.default_material(device),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Draw every mesh with its material at group 1. The caller binds the
    /// frame and object groups.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, instances: Range<u32>) {
        for mesh in &self.meshes {
            let material = mesh
                .material
                .and_then(|i| self.materials.get(i))
                .unwrap_or(&self.default_material);
            pass.set_bind_group(1, material, &[]);
            mesh.draw(pass, instances.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gltf::image::Format;

    #[test]
    fn rgb_and_grey_expand_to_rgba() {
        assert_eq!(
            to_rgba8(Format::R8G8B8, &[1, 2, 3, 4, 5, 6]),
            Some(vec![1, 2, 3, 255, 4, 5, 6, 255])
        );
        assert_eq!(to_rgba8(Format::R8, &[7]), Some(vec![7, 7, 7, 255]));
        assert_eq!(to_rgba8(Format::R8G8, &[7, 9]), Some(vec![7, 7, 7, 9]));
    }

    #[test]
    fn sixteen_bit_keeps_high_byte() {
        // Little-endian 0x12ff
        assert_eq!(
            to_rgba8(Format::R16G16B16A16, &[0xff, 0x12, 0, 0x34, 0, 0x56, 0, 0x78]),
            Some(vec![0x12, 0x34, 0x56, 0x78])
        );
        assert_eq!(to_rgba8(Format::R32G32B32A32FLOAT, &[0; 16]), None);
    }

    #[test]
    fn build_mesh_applies_transform_and_defaults() {
        let transform = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0))
            * Mat4::from_scale(Vec3::splat(2.0));
        let mesh = build_mesh(
            &[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            &[[0.0, 0.0, 1.0]],
            &[],
            None,
            transform,
            Some(3),
        );

        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.material, Some(3));
        assert_eq!(mesh.vertices[0].position, [2.0, 2.0, 0.0]);
        assert_eq!(mesh.vertices[0].normal, [0.0, 0.0, 1.0]);
        assert_eq!(mesh.vertices[1].normal, [0.0, 1.0, 0.0]);
        assert_eq!(mesh.vertices[2].uv, [0.0, 0.0]);
    }

    #[test]
    fn out_of_range_indices_are_dropped() {
        let mesh = build_mesh(
            &[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            &[],
            &[],
            Some(vec![0, 1, 2, 0, 2, 9]),
            Mat4::IDENTITY,
            None,
        );
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn bad_triangle_does_not_shift_later_ones() {
        let positions = [[0.0; 3]; 5];
        let mesh = build_mesh(
            &positions,
            &[],
            &[],
            Some(vec![9, 0, 1, 2, 3, 4]),
            Mat4::IDENTITY,
            None,
        );
        assert_eq!(mesh.indices, vec![2, 3, 4]);
    }

    #[test]
    fn missing_model_file_gives_empty_model() {
        let model = import_model_or_empty(Path::new("/nonexistent/glowtown/city.glb"));
        assert!(model.meshes.is_empty());
        assert!(matches!(
            import_model(Path::new("/nonexistent/glowtown/city.glb")),
            Err(GlowError::ImportError(_))
        ));
    }

    #[test]
    fn srgb_encoding_endpoints() {
        assert_eq!(linear_to_srgb_u8(0.0), 0);
        assert_eq!(linear_to_srgb_u8(1.0), 255);
        assert_eq!(linear_to_srgb_u8(0.5), 188);
    }
}
