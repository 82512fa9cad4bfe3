//! Texture upload: material textures, 1x1 placeholders and the skybox cubemap

use glowtown_core::{GlowError, Result};
use image::RgbaImage;
use std::path::{Path, PathBuf};

/// Cubemap face file stems in layer order (+X, -X, +Y, -Y, +Z, -Z)
pub const CUBEMAP_FACES: [&str; 6] = ["px", "nx", "py", "ny", "pz", "nz"];

/// A GPU texture and its default view
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    /// Upload tightly packed RGBA8 pixels as a 2D texture
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
        format: wgpu::TextureFormat,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
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
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            rgba,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// 1x1 texture of a single colour, used where an asset is absent
    pub fn solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        rgba: [u8; 4],
        format: wgpu::TextureFormat,
    ) -> Self {
        Self::from_rgba(device, queue, label, 1, 1, &rgba, format)
    }

    /// Six-layer cube texture from equally sized RGBA8 faces
    pub fn cubemap(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        faces: &CubemapFaces,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: faces.size,
            height: faces.size,
            depth_or_array_layers: 6,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, face) in faces.faces.iter().enumerate() {
            queue.write_texture(
                wgpu::ImageCopyTexture {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                face.as_raw(),
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * faces.size),
                    rows_per_image: Some(faces.size),
                },
                wgpu::Extent3d {
                    width: faces.size,
                    height: faces.size,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        Self { texture, view }
    }
}

/// Decode an image file to RGBA8
pub fn load_image(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path).map_err(|e| {
        GlowError::AssetError(format!("Failed to open image '{}': {}", path.display(), e))
    })?;
    Ok(img.to_rgba8())
}

/// CPU-side cubemap faces, all `size` x `size`
pub struct CubemapFaces {
    pub size: u32,
    pub faces: Vec<RgbaImage>,
}

impl CubemapFaces {
    /// Paths of the six faces inside `dir`
    pub fn face_paths(dir: &Path, extension: &str) -> Vec<PathBuf> {
        CUBEMAP_FACES
            .iter()
            .map(|stem| dir.join(format!("{stem}.{extension}")))
            .collect()
    }

    /// Load six faces. A face that fails to load or does not match the size
    /// of the first good face is logged and left black.
    pub fn load(paths: &[PathBuf]) -> Self {
        let loaded: Vec<Option<RgbaImage>> = paths
            .iter()
            .map(|path| match load_image(path) {
                Ok(img) => Some(img),
                Err(e) => {
                    log::error!("Cubemap face failed to load: {}", e);
                    None
                }
            })
            .collect();
        Self::assemble(loaded)
    }

    /// Build square faces from possibly missing images.
    pub fn assemble(loaded: Vec<Option<RgbaImage>>) -> Self {
        let size = loaded
            .iter()
            .flatten()
            .find(|img| img.width() == img.height())
            .map(|img| img.width())
            .unwrap_or(1);

        let mut faces: Vec<RgbaImage> = loaded
            .into_iter()
            .enumerate()
            .map(|(i, face)| match face {
                Some(img) if img.width() == size && img.height() == size => img,
                Some(img) => {
                    log::error!(
                        "Cubemap face {} is {}x{}, expected {}x{}",
                        CUBEMAP_FACES.get(i).copied().unwrap_or("?"),
                        img.width(),
                        img.height(),
                        size,
                        size
                    );
                    black_face(size)
                }
                None => black_face(size),
            })
            .collect();
        faces.resize_with(6, || black_face(size));
        faces.truncate(6);

        Self { size, faces }
    }
}

fn black_face(size: u32) -> RgbaImage {
    RgbaImage::from_pixel(size, size, image::Rgba([0, 0, 0, 255]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_paths_follow_layer_order() {
        let paths = CubemapFaces::face_paths(Path::new("sky"), "png");
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["px.png", "nx.png", "py.png", "ny.png", "pz.png", "nz.png"]);
    }

    #[test]
    fn missing_faces_become_black() {
        let red = RgbaImage::from_pixel(4, 4, image::Rgba([255, 0, 0, 255]));
        let faces = CubemapFaces::assemble(vec![None, Some(red), None, None, None, None]);
        assert_eq!(faces.size, 4);
        assert_eq!(faces.faces.len(), 6);
        assert_eq!(faces.faces[0].get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(faces.faces[1].get_pixel(3, 3).0, [255, 0, 0, 255]);
    }

    #[test]
    fn mismatched_face_is_replaced() {
        let big = RgbaImage::from_pixel(8, 8, image::Rgba([9, 9, 9, 255]));
        let small = RgbaImage::from_pixel(2, 2, image::Rgba([1, 1, 1, 255]));
        let faces = CubemapFaces::assemble(vec![
            Some(big.clone()),
            Some(small),
            Some(big.clone()),
            Some(big.clone()),
            Some(big.clone()),
            Some(big),
        ]);
        assert_eq!(faces.faces[1].dimensions(), (8, 8));
        assert_eq!(faces.faces[1].get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn nothing_loaded_gives_unit_faces() {
        let faces = CubemapFaces::load(&CubemapFaces::face_paths(
            Path::new("/nonexistent/glowtown/sky"),
            "png",
        ));
        assert_eq!(faces.size, 1);
        assert_eq!(faces.faces.len(), 6);
    }
}
