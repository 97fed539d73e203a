//! Recursive path tracing integrator.

use prism_core::{Color, Scatter, Scene};
use prism_math::{Ray, Vec3, Vec4};
use rand::RngCore;

use crate::stats::RaytracingStats;

/// Radiance arriving along `ray`, following at most `depth` bounces.
///
/// `depth == 0` returns black without touching the scene or the stats.
/// There is no Russian roulette: the depth bound alone limits path length.
pub fn trace_ray(
    ray: &Ray,
    scene: &Scene,
    depth: u32,
    stats: &RaytracingStats,
    rng: &mut dyn RngCore,
) -> Color {
    trace(ray, scene, depth, 1, stats, rng)
}

fn trace(
    ray: &Ray,
    scene: &Scene,
    depth: u32,
    level: u32,
    stats: &RaytracingStats,
    rng: &mut dyn RngCore,
) -> Color {
    // If we've exceeded max depth, return black (no light)
    if depth == 0 {
        return Color::ZERO;
    }
    stats.record_ray(level);

    let Some(hit) = scene.intersect(ray) else {
        return scene.environment().sample(ray.direction);
    };

    match hit.object.material().scatter(ray, &hit.surface, rng) {
        Scatter::Reflected { attenuation, ray } => {
            attenuation * trace(&ray, scene, depth - 1, level + 1, stats, rng)
        }
        Scatter::Emitted(radiance) => radiance,
        Scatter::Absorbed => Color::ZERO,
    }
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Gamma-correct a linear color into an opaque display pixel.
#[inline]
pub fn gamma_correct(color: Color) -> Vec4 {
    Vec4::new(
        linear_to_gamma(color.x),
        linear_to_gamma(color.y),
        linear_to_gamma(color.z),
        1.0,
    )
}

/// Convert a gamma-corrected pixel to 8-bit RGBA.
pub fn pixel_to_rgba(pixel: Vec4) -> [u8; 4] {
    let c = pixel.clamp(Vec4::ZERO, Vec4::ONE) * 255.0;
    [c.x as u8, c.y as u8, c.z as u8, c.w as u8]
}

/// Replace non-finite channels so one bad sample can't poison an accumulator.
#[inline]
pub(crate) fn sanitize(color: Color) -> Color {
    if color.is_finite() {
        color
    } else {
        Vec3::select(color.is_nan_mask(), Vec3::ZERO, color)
            .clamp(Vec3::splat(f32::MIN), Vec3::splat(f32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::{Entity, Environment, Geometry, Material, Sphere, Transform};
    use prism_math::Aabb;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn scene_with(material: Material, environment: Environment) -> Scene {
        let mut scene = Scene::new("test", Aabb::new(Vec3::splat(-10.0), Vec3::splat(10.0)))
            .with_environment(environment);
        let id = scene.transforms_mut().insert(Transform::default());
        scene
            .add(Entity::new(
                "ball",
                id,
                Arc::new(Geometry::from(Sphere::new(Vec3::ZERO, 1.0))),
                Arc::new(material),
            ))
            .unwrap();
        scene
    }

    fn toward_ball() -> Ray {
        Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z)
    }

    #[test]
    fn test_depth_zero_is_black() {
        let scene = scene_with(
            Material::emissive(Color::ONE, 10.0),
            Environment::Solid(Color::ONE),
        );
        let stats = RaytracingStats::new();
        let mut rng = StdRng::seed_from_u64(0);

        assert_eq!(trace_ray(&toward_ball(), &scene, 0, &stats, &mut rng), Vec3::ZERO);
        assert_eq!(stats.rays(), 0);
    }

    #[test]
    fn test_miss_returns_environment() {
        let scene = scene_with(Material::diffuse(Color::ONE), Environment::sky());
        let stats = RaytracingStats::new();
        let mut rng = StdRng::seed_from_u64(0);

        let up = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::Y);
        let color = trace_ray(&up, &scene, 5, &stats, &mut rng);
        assert!((color - Color::new(0.5, 0.7, 1.0)).length() < 1e-6);
        assert_eq!(stats.rays(), 1);
    }

    #[test]
    fn test_emissive_hit() {
        let scene = scene_with(
            Material::emissive(Color::new(1.0, 0.5, 0.0), 2.0),
            Environment::Solid(Color::ONE),
        );
        let stats = RaytracingStats::new();
        let mut rng = StdRng::seed_from_u64(0);

        let color = trace_ray(&toward_ball(), &scene, 3, &stats, &mut rng);
        assert_eq!(color, Color::new(2.0, 1.0, 0.0));
        assert_eq!(stats.max_depth(), 1);
    }

    #[test]
    fn test_diffuse_bounce_attenuates_environment() {
        // A convex object never sees itself, so one bounce always escapes
        let scene = scene_with(
            Material::diffuse(Color::new(0.5, 0.25, 1.0)),
            Environment::Solid(Color::splat(0.8)),
        );
        let stats = RaytracingStats::new();
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..20 {
            let color = trace_ray(&toward_ball(), &scene, 4, &stats, &mut rng);
            assert!((color - Color::new(0.4, 0.2, 0.8)).length() < 1e-6);
        }
        assert_eq!(stats.max_depth(), 2);
        assert_eq!(stats.rays(), 40);
    }

    #[test]
    fn test_depth_bound_cuts_path() {
        let scene = scene_with(Material::diffuse(Color::ONE), Environment::Solid(Color::ONE));
        let stats = RaytracingStats::new();
        let mut rng = StdRng::seed_from_u64(4);

        assert_eq!(trace_ray(&toward_ball(), &scene, 1, &stats, &mut rng), Color::ZERO);
        assert_eq!(stats.rays(), 1);
    }

    #[test]
    fn test_gamma() {
        assert_eq!(linear_to_gamma(0.25), 0.5);
        assert_eq!(linear_to_gamma(-1.0), 0.0);
        assert_eq!(gamma_correct(Color::new(0.0, 0.25, 1.0)), Vec4::new(0.0, 0.5, 1.0, 1.0));
        assert_eq!(pixel_to_rgba(Vec4::new(0.0, 0.5, 2.0, 1.0)), [0, 127, 255, 255]);
    }

    #[test]
    fn test_sanitize() {
        let color = sanitize(Color::new(f32::NAN, f32::INFINITY, 0.5));
        assert_eq!(color.x, 0.0);
        assert_eq!(color.y, f32::MAX);
        assert_eq!(color.z, 0.5);
    }
}
