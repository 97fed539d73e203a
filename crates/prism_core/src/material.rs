//! Surface scattering models.
//!
//! Every material takes the surface hit, the incoming ray and a random number
//! generator, and answers with a [`Scatter`]: a continued path, a terminal
//! radiance, or nothing.

use std::sync::Arc;

use prism_math::{Ray, Vec2, Vec3};
use rand::RngCore;

use crate::hit::{Side, SurfaceHit};
use crate::sampling::{cosine_hemisphere, gen_f32, random_unit_vector};
use crate::texture::{Texture, TextureSampling};

/// Color type alias (RGB values typically 0-1)
pub type Color = Vec3;

/// Outcome of a ray hitting a material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scatter {
    /// The path continues along `ray`, weighted by `attenuation`.
    Reflected { attenuation: Color, ray: Ray },
    /// The path ends at a light source.
    Emitted(Color),
    /// The path ends with no contribution.
    Absorbed,
}

/// A texture together with the sampling mode a material reads it with.
#[derive(Debug, Clone)]
pub struct TextureMap {
    pub texture: Arc<Texture>,
    pub sampling: TextureSampling,
}

impl TextureMap {
    pub fn new(texture: Arc<Texture>) -> Self {
        Self {
            texture,
            sampling: TextureSampling::default(),
        }
    }

    pub fn with_sampling(mut self, sampling: TextureSampling) -> Self {
        self.sampling = sampling;
        self
    }

    #[inline]
    pub fn rgb(&self, uv: Vec2) -> Color {
        self.texture.sample_rgb(uv, self.sampling)
    }
}

/// Lambertian (diffuse) material.
#[derive(Debug, Clone)]
pub struct Diffuse {
    pub albedo: Color,
    /// Multiplies `albedo` when present.
    pub texture: Option<TextureMap>,
}

impl Diffuse {
    pub fn new(albedo: Color) -> Self {
        Self {
            albedo,
            texture: None,
        }
    }

    pub fn textured(texture: TextureMap) -> Self {
        Self {
            albedo: Color::ONE,
            texture: Some(texture),
        }
    }

    fn scatter(&self, hit: &SurfaceHit, rng: &mut dyn RngCore) -> Scatter {
        let albedo = match &self.texture {
            Some(map) => self.albedo * map.rgb(hit.uv),
            None => self.albedo,
        };
        let direction = cosine_hemisphere(hit.facing_normal(), rng);
        Scatter::Reflected {
            attenuation: albedo,
            ray: Ray::new(hit.position, direction),
        }
    }
}

/// Metal (specular) material.
#[derive(Debug, Clone)]
pub struct Metal {
    pub albedo: Color,
    /// 0.0 = perfect mirror, 1.0 = very rough
    pub roughness: f32,
    /// Red channel replaces `roughness` when present.
    pub roughness_texture: Option<TextureMap>,
}

impl Metal {
    pub fn new(albedo: Color, roughness: f32) -> Self {
        Self {
            albedo,
            roughness: roughness.clamp(0.0, 1.0),
            roughness_texture: None,
        }
    }

    pub fn with_roughness_texture(mut self, texture: TextureMap) -> Self {
        self.roughness_texture = Some(texture);
        self
    }

    fn roughness_at(&self, uv: Vec2) -> f32 {
        match &self.roughness_texture {
            Some(map) => map.rgb(uv).x.clamp(0.0, 1.0),
            None => self.roughness,
        }
    }

    fn scatter(&self, ray_in: &Ray, hit: &SurfaceHit, rng: &mut dyn RngCore) -> Scatter {
        let normal = hit.facing_normal();
        let reflected = reflect(ray_in.direction, normal);
        let direction = reflected + self.roughness_at(hit.uv) * random_unit_vector(rng);

        // Fuzzed reflections that dip below the surface are absorbed
        if direction.dot(normal) > 0.0 {
            Scatter::Reflected {
                attenuation: self.albedo,
                ray: Ray::new(hit.position, direction),
            }
        } else {
            Scatter::Absorbed
        }
    }
}

/// Dielectric (glass) material.
#[derive(Debug, Clone)]
pub struct Transparent {
    /// Index of refraction (1.0 = air, 1.5 = glass, 2.4 = diamond)
    pub ior: f32,
    pub tint: Color,
}

impl Transparent {
    pub fn new(ior: f32) -> Self {
        Self {
            ior,
            tint: Color::ONE,
        }
    }

    pub fn with_tint(mut self, tint: Color) -> Self {
        self.tint = tint;
        self
    }

    /// Schlick's approximation for reflectance
    fn reflectance(cosine: f32, ior: f32) -> f32 {
        let r0 = ((1.0 - ior) / (1.0 + ior)).powi(2);
        r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
    }

    fn scatter(&self, ray_in: &Ray, hit: &SurfaceHit, rng: &mut dyn RngCore) -> Scatter {
        let refraction_ratio = match hit.side {
            Side::Outside => 1.0 / self.ior,
            Side::Inside => self.ior,
        };
        let normal = hit.facing_normal();

        let unit_direction = ray_in.direction;
        let cos_theta = (-unit_direction).dot(normal).min(1.0);
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

        // Total internal reflection
        let cannot_refract = refraction_ratio * sin_theta > 1.0;

        let direction = if cannot_refract
            || Self::reflectance(cos_theta, refraction_ratio) > gen_f32(rng)
        {
            reflect(unit_direction, normal)
        } else {
            refract(unit_direction, normal, refraction_ratio)
        };

        Scatter::Reflected {
            attenuation: self.tint,
            ray: Ray::new(hit.position, direction),
        }
    }
}

/// Diffuse light emitter.
#[derive(Debug, Clone)]
pub struct Emissive {
    pub radiance: Color,
    pub intensity: f32,
    /// Multiplies `radiance` when present.
    pub texture: Option<TextureMap>,
}

impl Emissive {
    pub fn new(radiance: Color, intensity: f32) -> Self {
        Self {
            radiance,
            intensity,
            texture: None,
        }
    }

    pub fn with_texture(mut self, texture: TextureMap) -> Self {
        self.texture = Some(texture);
        self
    }

    fn emitted(&self, uv: Vec2) -> Color {
        let radiance = match &self.texture {
            Some(map) => self.radiance * map.rgb(uv),
            None => self.radiance,
        };
        radiance * self.intensity
    }
}

/// Material variants an entity can be shaded with.
#[derive(Debug, Clone)]
pub enum Material {
    Diffuse(Diffuse),
    Metal(Metal),
    Transparent(Transparent),
    Emissive(Emissive),
}

impl Material {
    pub fn diffuse(albedo: Color) -> Self {
        Material::Diffuse(Diffuse::new(albedo))
    }

    pub fn metal(albedo: Color, roughness: f32) -> Self {
        Material::Metal(Metal::new(albedo, roughness))
    }

    pub fn transparent(ior: f32) -> Self {
        Material::Transparent(Transparent::new(ior))
    }

    pub fn emissive(radiance: Color, intensity: f32) -> Self {
        Material::Emissive(Emissive::new(radiance, intensity))
    }

    /// Scatter an incoming ray at `hit`.
    pub fn scatter(&self, ray_in: &Ray, hit: &SurfaceHit, rng: &mut dyn RngCore) -> Scatter {
        match self {
            Material::Diffuse(m) => m.scatter(hit, rng),
            Material::Metal(m) => m.scatter(ray_in, hit, rng),
            Material::Transparent(m) => m.scatter(ray_in, hit, rng),
            Material::Emissive(m) => Scatter::Emitted(m.emitted(hit.uv)),
        }
    }

    pub fn is_emissive(&self) -> bool {
        matches!(self, Material::Emissive(_))
    }
}

impl From<Diffuse> for Material {
    fn from(m: Diffuse) -> Self {
        Material::Diffuse(m)
    }
}

impl From<Metal> for Material {
    fn from(m: Metal) -> Self {
        Material::Metal(m)
    }
}

impl From<Transparent> for Material {
    fn from(m: Transparent) -> Self {
        Material::Transparent(m)
    }
}

impl From<Emissive> for Material {
    fn from(m: Emissive) -> Self {
        Material::Emissive(m)
    }
}

// =============================================================================
// Helper functions
// =============================================================================

/// Reflect a vector about a normal.
#[inline]
fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract a unit vector through a surface.
#[inline]
fn refract(uv: Vec3, n: Vec3, etai_over_etat: f32) -> Vec3 {
    let cos_theta = (-uv).dot(n).min(1.0);
    let r_out_perp = etai_over_etat * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    r_out_perp + r_out_parallel
}
