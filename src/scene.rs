use crate::model::Model;
use crate::light::{ Light, PointLight, AmbientLight };

/// Everything to be rendered: models, point lights and one ambient light.
///
/// A scene is assembled up front and then shared read-only by every render
/// worker.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub objects: Vec<Model>,
    pub lights: Vec<PointLight>,
    pub ambient: AmbientLight,
}

impl Scene {
    /// An empty scene with the default dim white ambient light.
    pub fn new() -> Scene {
        Default::default()
    }

    pub fn add_model(&mut self, model: Model) {
        self.objects.push(model);
    }

    /// Adds a point light, or replaces the ambient light.
    pub fn add_light<L: Into<Light>>(&mut self, light: L) {
        match light.into() {
            Light::Point(p) => self.lights.push(p),
            Light::Ambient(a) => self.ambient = a,
        }
    }
}

#[test]
fn default_scene_has_dim_ambient() {
    use crate::color::Color;

    let s = Scene::new();
    assert!(s.objects.is_empty());
    assert!(s.lights.is_empty());
    assert_eq!(s.ambient.color, Color::white());
    assert!(crate::feq(s.ambient.intensity, 0.08));
}

#[test]
fn add_light_routes_by_kind() {
    use crate::color::Color;
    use crate::vector::Vector3;

    let mut s = Scene::new();
    s.add_light(PointLight::new(Vector3::J, Color::white(), 1.0));
    s.add_light(AmbientLight::new(Color::blue(), 0.5));

    assert_eq!(s.lights.len(), 1);
    assert_eq!(s.ambient.color, Color::blue());
    assert!(crate::feq(s.ambient.intensity, 0.5));
}
