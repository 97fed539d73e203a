//! Random sampling helpers shared by materials and the camera.
//!
//! Every function takes the generator explicitly so callers control seeding.

use prism_math::Vec3;
use rand::RngCore;
use std::f32::consts::PI;

/// Uniform f32 in [0, 1) built from the top 24 bits of a `u32`.
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    (rng.next_u32() >> 8) as f32 * (1.0 / (1u32 << 24) as f32)
}

/// Uniform f32 in [min, max).
#[inline]
pub fn gen_range(rng: &mut dyn RngCore, min: f32, max: f32) -> f32 {
    min + (max - min) * gen_f32(rng)
}

/// Uniformly distributed direction on the unit sphere.
pub fn random_unit_vector(rng: &mut dyn RngCore) -> Vec3 {
    let z = gen_range(rng, -1.0, 1.0);
    let phi = 2.0 * PI * gen_f32(rng);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Cosine-weighted direction in the hemisphere around `normal`.
pub fn cosine_hemisphere(normal: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let direction = normal + random_unit_vector(rng);
    // Catch degenerate scatter direction
    if direction.length_squared() < 1e-8 {
        normal
    } else {
        direction.normalize()
    }
}

/// Uniform point in the unit disk on the XY plane.
pub fn random_in_unit_disk(rng: &mut dyn RngCore) -> Vec3 {
    let r = gen_f32(rng).sqrt();
    let theta = 2.0 * PI * gen_f32(rng);
    Vec3::new(r * theta.cos(), r * theta.sin(), 0.0)
}

/// Generator that returns the same word forever, for pinning stochastic branches in tests.
#[cfg(test)]
pub(crate) struct ConstRng(pub u32);

#[cfg(test)]
impl RngCore for ConstRng {
    fn next_u32(&mut self) -> u32 {
        self.0
    }

    fn next_u64(&mut self) -> u64 {
        (u64::from(self.0) << 32) | u64::from(self.0)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            chunk.copy_from_slice(&self.0.to_le_bytes()[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
