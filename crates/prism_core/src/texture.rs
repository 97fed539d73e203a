//! Image textures and cubemaps.
//!
//! Textures are immutable float RGBA grids. Sampling applies addressing
//! (wrap or clamp) first, then filtering (point or bilinear). UV (0, 0) is
//! the first pixel of the first row.

use std::path::Path;
use std::sync::Arc;

use prism_math::{Vec2, Vec3, Vec4};
use thiserror::Error;

/// Errors that can occur during texture construction.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Failed to load texture {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Texture dimensions {width}x{height} do not match {pixels} pixels")]
    DimensionMismatch { width: u32, height: u32, pixels: usize },

    #[error("Texture must be at least 1x1, got {width}x{height}")]
    Empty { width: u32, height: u32 },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// How UVs outside [0, 1] are mapped back into the texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressMode {
    #[default]
    Wrap,
    Clamp,
}

/// How texels are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    Point,
    #[default]
    Bilinear,
}

/// Addressing and filtering used together when sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextureSampling {
    pub address: AddressMode,
    pub filter: Filter,
}

impl TextureSampling {
    pub const fn new(address: AddressMode, filter: Filter) -> Self {
        Self { address, filter }
    }
}

/// A loaded texture with pixel data.
///
/// Stores pixels in linear RGBA float format for rendering.
#[derive(Clone, Debug)]
pub struct Texture {
    width: u32,
    height: u32,
    /// Row-major, `width * height` entries
    pixels: Vec<Vec4>,
}

impl Texture {
    /// Create a new texture from pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<Vec4>) -> TextureResult<Self> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty { width, height });
        }
        if pixels.len() != width as usize * height as usize {
            return Err(TextureError::DimensionMismatch {
                width,
                height,
                pixels: pixels.len(),
            });
        }
        Ok(Self { width, height, pixels })
    }

    /// Create a solid color texture (1x1).
    pub fn solid(color: Vec3) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![color.extend(1.0)],
        }
    }

    /// Procedural checkerboard with `cells` squares along each axis.
    pub fn checkerboard(width: u32, height: u32, cells: u32, a: Vec3, b: Vec3) -> TextureResult<Self> {
        let cells = cells.max(1);
        let pixels = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| {
                let cx = x * cells / width.max(1);
                let cy = y * cells / height.max(1);
                if (cx + cy) % 2 == 0 { a.extend(1.0) } else { b.extend(1.0) }
            })
            .collect();
        Self::new(width, height, pixels)
    }

    /// Load an image file, converting sRGB color channels to linear.
    pub fn load(path: impl AsRef<Path>) -> TextureResult<Self> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| TextureError::Load {
            path: path.display().to_string(),
            source,
        })?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let pixels = rgba
            .pixels()
            .map(|p| {
                Vec4::new(
                    srgb_to_linear(p[0]),
                    srgb_to_linear(p[1]),
                    srgb_to_linear(p[2]),
                    p[3] as f32 / 255.0, // Alpha is linear
                )
            })
            .collect();

        let texture = Self::new(width, height, pixels)?;
        log::debug!(
            "Loaded texture: {} ({}x{}, {:.1} KB)",
            path.display(),
            width,
            height,
            texture.size_bytes() as f32 / 1024.0
        );
        Ok(texture)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get pixel at integer coordinates.
    pub fn pixel(&self, x: u32, y: u32) -> Vec4 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Sample the texture at `uv`.
    pub fn sample(&self, uv: Vec2, sampling: TextureSampling) -> Vec4 {
        let u = address(uv.x, sampling.address);
        let v = address(uv.y, sampling.address);

        match sampling.filter {
            Filter::Point => {
                let x = ((u * self.width as f32) as u32).min(self.width - 1);
                let y = ((v * self.height as f32) as u32).min(self.height - 1);
                self.pixel(x, y)
            }
            Filter::Bilinear => {
                let fx = u * self.width as f32;
                let fy = v * self.height as f32;
                let x0 = (fx as u32).min(self.width - 1);
                let y0 = (fy as u32).min(self.height - 1);
                let (x1, y1) = match sampling.address {
                    // The last row/column blends with the first
                    AddressMode::Wrap => ((x0 + 1) % self.width, (y0 + 1) % self.height),
                    AddressMode::Clamp => {
                        ((x0 + 1).min(self.width - 1), (y0 + 1).min(self.height - 1))
                    }
                };
                let tx = (fx - x0 as f32).clamp(0.0, 1.0);
                let ty = (fy - y0 as f32).clamp(0.0, 1.0);

                let top = self.pixel(x0, y0).lerp(self.pixel(x1, y0), tx);
                let bottom = self.pixel(x0, y1).lerp(self.pixel(x1, y1), tx);
                top.lerp(bottom, ty)
            }
        }
    }

    /// RGB part of [`Texture::sample`].
    pub fn sample_rgb(&self, uv: Vec2, sampling: TextureSampling) -> Vec3 {
        self.sample(uv, sampling).truncate()
    }

    /// Get total size in bytes (approximate).
    pub fn size_bytes(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<Vec4>()
    }
}

/// Six textures addressed by direction.
///
/// Face order is `+X, -X, +Y, -Y, +Z, -Z`. Faces are laid out for a
/// left-handed, Y-up world seen from the cube's center: on the side faces
/// `v` grows downward and `u` grows to the viewer's right.
#[derive(Clone, Debug)]
pub struct Cubemap {
    faces: [Arc<Texture>; 6],
    sampling: TextureSampling,
}

impl Cubemap {
    pub const POSITIVE_X: usize = 0;
    pub const NEGATIVE_X: usize = 1;
    pub const POSITIVE_Y: usize = 2;
    pub const NEGATIVE_Y: usize = 3;
    pub const POSITIVE_Z: usize = 4;
    pub const NEGATIVE_Z: usize = 5;

    pub fn new(faces: [Arc<Texture>; 6]) -> Self {
        Self {
            faces,
            sampling: TextureSampling::new(AddressMode::Clamp, Filter::Bilinear),
        }
    }

    /// Load six face images in `+X, -X, +Y, -Y, +Z, -Z` order.
    pub fn load<P: AsRef<Path>>(paths: [P; 6]) -> TextureResult<Self> {
        let [px, nx, py, ny, pz, nz] = paths;
        Ok(Self::new([
            Arc::new(Texture::load(px)?),
            Arc::new(Texture::load(nx)?),
            Arc::new(Texture::load(py)?),
            Arc::new(Texture::load(ny)?),
            Arc::new(Texture::load(pz)?),
            Arc::new(Texture::load(nz)?),
        ]))
    }

    pub fn with_sampling(mut self, sampling: TextureSampling) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn face(&self, index: usize) -> &Texture {
        &self.faces[index]
    }

    /// Face index and face-local UV for a direction.
    ///
    /// The dominant axis picks the face; the two remaining components are
    /// divided by its magnitude and remapped from [-1, 1] to [0, 1].
    pub fn face_uv(direction: Vec3) -> (usize, Vec2) {
        let a = direction.abs();
        let (face, s, t, major) = if a.x >= a.y && a.x >= a.z {
            if direction.x > 0.0 {
                (Self::POSITIVE_X, -direction.z, -direction.y, a.x)
            } else {
                (Self::NEGATIVE_X, direction.z, -direction.y, a.x)
            }
        } else if a.y >= a.z {
            if direction.y > 0.0 {
                (Self::POSITIVE_Y, direction.x, direction.z, a.y)
            } else {
                (Self::NEGATIVE_Y, direction.x, -direction.z, a.y)
            }
        } else if direction.z > 0.0 {
            (Self::POSITIVE_Z, direction.x, -direction.y, a.z)
        } else {
            (Self::NEGATIVE_Z, -direction.x, -direction.y, a.z)
        };

        if major <= 0.0 {
            return (Self::POSITIVE_Z, Vec2::splat(0.5));
        }
        let uv = Vec2::new(s / major, t / major) * 0.5 + Vec2::splat(0.5);
        (face, uv)
    }

    /// Color seen looking along `direction`.
    pub fn sample(&self, direction: Vec3) -> Vec3 {
        let (face, uv) = Self::face_uv(direction);
        self.faces[face].sample_rgb(uv, self.sampling)
    }
}

/// Map a texture coordinate into [0, 1].
fn address(x: f32, mode: AddressMode) -> f32 {
    match mode {
        // rem_euclid keeps negatives positive: -0.25 -> 0.75
        AddressMode::Wrap => {
            let wrapped = x.rem_euclid(1.0);
            if wrapped >= 1.0 { 0.0 } else { wrapped }
        }
        AddressMode::Clamp => x.clamp(0.0, 1.0),
    }
}

/// Convert sRGB byte value to linear float.
fn srgb_to_linear(value: u8) -> f32 {
    let v = value as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}
