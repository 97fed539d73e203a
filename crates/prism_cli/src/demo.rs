//! Built-in demo scene.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use prism_core::{
    Camera, Color, Diffuse, Entity, Environment, Geometry, Material, Mesh, Scene, Sphere,
    Texture, TextureMap, Transform, Transparent,
};
use prism_math::{Aabb, Vec3};

const SCENE_EXTENT: f32 = 100.0;

/// Checkerboard floor, a few spheres, a tilted cube and an optional OBJ mesh.
pub fn build_scene(mesh: Option<&Path>) -> Result<(Scene, Camera)> {
    let mut scene = Scene::new(
        "demo",
        Aabb::new(Vec3::splat(-SCENE_EXTENT), Vec3::splat(SCENE_EXTENT)),
    )
    .with_environment(Environment::sky());

    let checker = Texture::checkerboard(
        512,
        512,
        16,
        Color::new(0.85, 0.85, 0.8),
        Color::new(0.2, 0.25, 0.3),
    )
    .context("Failed to build floor texture")?;
    let floor = Material::from(Diffuse::textured(TextureMap::new(Arc::new(checker))));

    add(
        &mut scene,
        "floor",
        Transform::from_position(Vec3::new(0.0, -1.0, 0.0)),
        Mesh::quad(40.0).into(),
        floor,
    )?;

    let unit_sphere = Arc::new(Geometry::from(Sphere::new(Vec3::ZERO, 1.0)));
    let spheres = [
        ("diffuse_ball", Vec3::new(0.0, 0.0, 0.0), Material::diffuse(Color::new(0.7, 0.3, 0.2))),
        ("metal_ball", Vec3::new(-2.2, 0.0, 0.5), Material::metal(Color::new(0.8, 0.8, 0.9), 0.05)),
        (
            "glass_ball",
            Vec3::new(2.2, 0.0, -0.5),
            Transparent::new(1.5).with_tint(Color::new(0.95, 1.0, 0.95)).into(),
        ),
    ];
    for (name, position, material) in spheres {
        let id = scene.transforms_mut().insert(Transform::from_position(position));
        scene
            .add(Entity::new(name, id, Arc::clone(&unit_sphere), Arc::new(material)))
            .with_context(|| format!("Failed to add '{}'", name))?;
    }

    add(
        &mut scene,
        "lamp",
        Transform::new(Vec3::new(0.0, 4.0, 1.0), Vec3::ZERO, Vec3::splat(0.5)),
        Sphere::new(Vec3::ZERO, 1.0).into(),
        Material::emissive(Color::new(1.0, 0.9, 0.7), 4.0),
    )?;

    add(
        &mut scene,
        "cube",
        Transform::new(
            Vec3::new(-0.8, -0.6, -2.0),
            Vec3::new(0.0, 35f32.to_radians(), 0.0),
            Vec3::ONE,
        ),
        Mesh::cube(0.8).into(),
        Material::metal(Color::new(0.9, 0.6, 0.3), 0.3),
    )?;

    if let Some(path) = mesh {
        let mesh = Mesh::load_obj(path)
            .with_context(|| format!("Failed to load mesh {}", path.display()))?;
        add(
            &mut scene,
            "obj_mesh",
            Transform::from_position(Vec3::new(0.0, 0.0, 3.0)),
            mesh.into(),
            Material::diffuse(Color::splat(0.6)),
        )?;
    }

    scene.finalize_octree();

    let camera = Camera::looking_at(Vec3::new(0.0, 1.5, -8.0), Vec3::ZERO, 40.0, 16.0 / 9.0)
        .with_lens(0.05, 8.0);

    Ok((scene, camera))
}

fn add(
    scene: &mut Scene,
    name: &str,
    transform: Transform,
    geometry: Geometry,
    material: Material,
) -> Result<()> {
    let id = scene.transforms_mut().insert(transform);
    scene
        .add(Entity::new(name, id, Arc::new(geometry), Arc::new(material)))
        .with_context(|| format!("Failed to add '{}'", name))?;
    Ok(())
}
