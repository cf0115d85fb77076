use std::fmt;
use std::sync::Arc;

use crate::consts::SHADOW_EPSILON;
use crate::color::Color;
use crate::ray::Ray;
use crate::scene::Scene;
use crate::camera::Camera;
use crate::intersect::RaycastHit;
use crate::error::RenderError;

/// Turns a ray hit into a pixel color.
///
/// The camera calls `render` for every sample ray that hit something. The
/// camera itself is passed in so that strategies can cast secondary rays
/// (shadows, reflections) through the same `Camera::raycast` used for
/// primary rays.
pub trait ShadingStrategy: Send + Sync + fmt::Debug {
    /// A short, unique name for the strategy.
    fn name(&self) -> &str;

    fn render(&self, camera: &Camera, scene: &Scene, ray: &Ray,
        hit: &RaycastHit) -> Color;
}

/// Phong shading with hard shadows.
///
/// Every hit gets the ambient term. Each point light that is not blocked
/// adds a diffuse term and a specular highlight:
///
/// ```text
/// color = ambient * base
///       + sum over visible lights of
///           kd * base * max(0, L.N) + ks * light * max(0, R.V)^alpha
/// ```
///
/// where `L` points at the light, `N` is the surface normal, `R = 2(L.N)N - L`
/// and `V` points back at the ray origin. Channels are clamped to `[0, 255]`.
#[derive(Copy, Clone, Debug, Default)]
pub struct PhongStrategy;

impl PhongStrategy {
    /// Checks whether anything sits between `from` and the light.
    ///
    /// Hits closer than `SHADOW_EPSILON` are the surface itself; hits beyond
    /// the light do not cast a shadow.
    fn in_shadow(camera: &Camera, scene: &Scene, shadow_ray: &Ray,
        light_distance: f64) -> bool {
        let blocker = camera.raycast(shadow_ray, scene);
        blocker.is_hit
            && blocker.distance > SHADOW_EPSILON
            && blocker.distance < light_distance
    }
}

impl ShadingStrategy for PhongStrategy {
    fn name(&self) -> &str {
        "phong"
    }

    fn render(&self, camera: &Camera, scene: &Scene, ray: &Ray,
        hit: &RaycastHit) -> Color {
        let material = match hit.model {
            Some(ref model) => model.material,
            None => return Color::black(),
        };

        let base = material.color;
        let normal = hit.normal;
        let mut color = base * scene.ambient.intensity;

        // The hit sits exactly at the ray origin; there is no view direction.
        let view = match (ray.origin - hit.point).normalize() {
            Ok(view) => view,
            Err(_) => return color.clamp(),
        };

        // Shadow rays start slightly off the surface so they do not hit it.
        let lifted = hit.point + normal * SHADOW_EPSILON;

        for light in scene.lights.iter() {
            let shadow_ray = match Ray::from_points(lifted, light.position) {
                Ok(r) => r,
                Err(_) => continue,
            };

            let light_distance = lifted.distance(&light.position);
            if Self::in_shadow(camera, scene, &shadow_ray, light_distance) {
                continue;
            }

            let to_light = shadow_ray.direction();
            let l_dot_n = to_light.dot(&normal);
            color = color + base * (material.kd * l_dot_n.max(0.0));

            let reflected = to_light.reflect(&normal);
            let highlight = reflected.dot(&view).max(0.0).powf(material.alpha);
            color = color + light.color * (material.ks * highlight);
        }

        color.clamp()
    }
}

/// Looks up a built-in shading strategy by name (case-insensitive).
pub fn strategy_by_name(name: &str) -> Result<Arc<dyn ShadingStrategy>, RenderError> {
    match name.to_ascii_lowercase().as_str() {
        "phong" => Ok(Arc::new(PhongStrategy)),
        _ => Err(RenderError::UnknownStrategy(name.into())),
    }
}

#[cfg(test)]
fn shade(scene: &Scene, ray: &Ray) -> Color {
    let camera = Camera::default();
    let hit = camera.raycast(ray, scene);
    assert!(hit.is_hit);
    PhongStrategy.render(&camera, scene, ray, &hit)
}

#[test]
fn ambient_only_shading() {
    use crate::vector::Vector3;
    use crate::geometry::Sphere;
    use crate::model::Model;
    use crate::light::{ Material, AmbientLight };

    let mut scene = Scene::new();
    scene.ambient = AmbientLight::new(Color::white(), 0.1);
    scene.add_model(Model::new(
        Sphere::new(Vector3::new(0.0, 0.0, 5.0), 1.0),
        Material::new(Color::rgb(200.0, 100.0, 50.0), 100.0, 0.25, 1.0)
    ));

    let r = Ray::new(Vector3::ZERO, Vector3::K).unwrap();
    assert_eq!(shade(&scene, &r), Color::rgb(20.0, 10.0, 5.0));
}

#[test]
fn head_on_light_adds_diffuse_and_specular() {
    use crate::vector::Vector3;
    use crate::geometry::Plane;
    use crate::model::Model;
    use crate::light::{ Material, AmbientLight, PointLight };

    let mut scene = Scene::new();
    scene.ambient = AmbientLight::new(Color::white(), 0.1);
    scene.add_model(Model::new(
        Plane::new(Vector3::new(0.0, 0.0, 5.0), -Vector3::K).unwrap(),
        Material::new(Color::rgb(100.0, 100.0, 100.0), 10.0, 0.5, 0.5)
    ));
    scene.add_light(PointLight::new(Vector3::ZERO, Color::white(), 1.0));

    // Light, eye and normal all line up: L.N = 1 and R.V = 1.
    // 10 ambient + 50 diffuse + 127.5 specular.
    let r = Ray::new(Vector3::ZERO, Vector3::K).unwrap();
    assert_eq!(shade(&scene, &r), Color::rgb(187.5, 187.5, 187.5));
}

#[test]
fn light_behind_surface_adds_nothing_diffuse() {
    use crate::vector::Vector3;
    use crate::geometry::Plane;
    use crate::model::Model;
    use crate::light::{ Material, AmbientLight, PointLight };

    let mut scene = Scene::new();
    scene.ambient = AmbientLight::new(Color::white(), 0.1);
    scene.add_model(Model::new(
        Plane::new(Vector3::new(0.0, 0.0, 5.0), -Vector3::K).unwrap(),
        Material::new(Color::rgb(100.0, 100.0, 100.0), 10.0, 0.0, 0.5)
    ));
    scene.add_light(PointLight::new(Vector3::new(0.0, 0.0, 10.0), Color::white(), 1.0));

    let r = Ray::new(Vector3::ZERO, Vector3::K).unwrap();
    assert_eq!(shade(&scene, &r), Color::rgb(10.0, 10.0, 10.0));
}

#[test]
fn occluded_light_is_skipped() {
    use crate::vector::Vector3;
    use crate::geometry::{ Plane, Sphere };
    use crate::model::Model;
    use crate::light::{ Material, AmbientLight, PointLight };

    let material = Material::new(Color::rgb(100.0, 100.0, 100.0), 10.0, 0.5, 0.5);
    let mut scene = Scene::new();
    scene.ambient = AmbientLight::new(Color::white(), 0.1);
    scene.add_model(Model::new(
        Plane::new(Vector3::new(0.0, 0.0, 5.0), -Vector3::K).unwrap(),
        material
    ));
    // A small sphere between the plane and a light placed beside the eye.
    scene.add_model(Model::new(Sphere::new(Vector3::new(1.0, 0.0, 2.5), 0.5), material));
    scene.add_light(PointLight::new(Vector3::new(2.0, 0.0, 0.0), Color::white(), 1.0));

    let r = Ray::new(Vector3::ZERO, Vector3::K).unwrap();
    assert_eq!(shade(&scene, &r), Color::rgb(10.0, 10.0, 10.0));
}

#[test]
fn light_beyond_occluder_distance_is_not_shadowed() {
    use crate::vector::Vector3;
    use crate::geometry::{ Plane, Sphere };
    use crate::model::Model;
    use crate::light::{ Material, AmbientLight, PointLight };

    let material = Material::new(Color::rgb(100.0, 100.0, 100.0), 10.0, 0.0, 0.5);
    let mut scene = Scene::new();
    scene.ambient = AmbientLight::new(Color::white(), 0.0);
    scene.add_model(Model::new(
        Plane::new(Vector3::new(0.0, 0.0, 5.0), -Vector3::K).unwrap(),
        material
    ));
    // The sphere sits behind the light as seen from the plane.
    scene.add_model(Model::new(Sphere::new(Vector3::new(0.0, 0.0, -3.0), 0.5), material));
    scene.add_light(PointLight::new(Vector3::new(0.0, 0.0, 1.0), Color::white(), 1.0));

    let r = Ray::new(Vector3::new(0.0, 0.0, 2.0), Vector3::K).unwrap();
    assert_eq!(shade(&scene, &r), Color::rgb(50.0, 50.0, 50.0));
}

#[test]
fn strategy_lookup() {
    assert_eq!(strategy_by_name("Phong").unwrap().name(), "phong");
    match strategy_by_name("toon") {
        Err(RenderError::UnknownStrategy(name)) => assert_eq!(name, "toon"),
        other => panic!("unexpected result {:?}", other),
    }
}
