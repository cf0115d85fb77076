use crate::color::Color;
use crate::vector::Vector3;
use crate::consts::DEFAULT_AMBIENT_INTENSITY;

/// A point light.
///
/// Emits light of a given color from a single position. Intensity falls off
/// with the square of the distance.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vector3,
    pub color: Color,
    pub intensity: f64,
}

impl PointLight {
    pub fn new(position: Vector3, color: Color, intensity: f64) -> PointLight {
        PointLight { position, color, intensity }
    }

    /// The intensity arriving at `point`.
    pub fn intensity_at(&self, point: &Vector3) -> f64 {
        self.intensity / self.position.distance(point).powi(2)
    }
}

/// Light that reaches every surface equally, regardless of occlusion.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f64,
}

impl AmbientLight {
    pub fn new(color: Color, intensity: f64) -> AmbientLight {
        AmbientLight { color, intensity }
    }
}

impl Default for AmbientLight {
    fn default() -> AmbientLight {
        AmbientLight::new(Color::white(), DEFAULT_AMBIENT_INTENSITY)
    }
}

/// Any light a scene can hold.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Light {
    Ambient(AmbientLight),
    Point(PointLight),
}

impl Light {
    pub fn color(&self) -> Color {
        match self {
            Light::Ambient(a) => a.color,
            Light::Point(p) => p.color,
        }
    }

    /// Ambient lights have no position and report the world origin.
    pub fn position(&self) -> Vector3 {
        match self {
            Light::Ambient(_) => Vector3::ZERO,
            Light::Point(p) => p.position,
        }
    }

    pub fn intensity_at(&self, point: &Vector3) -> f64 {
        match self {
            Light::Ambient(a) => a.intensity,
            Light::Point(p) => p.intensity_at(point),
        }
    }
}

impl From<PointLight> for Light {
    fn from(p: PointLight) -> Light {
        Light::Point(p)
    }
}

impl From<AmbientLight> for Light {
    fn from(a: AmbientLight) -> Light {
        Light::Ambient(a)
    }
}

/// Surface properties used by Phong shading.
///
/// `color` is the base color on the 0-255 scale, `alpha` the specular
/// shininess exponent, `ks` and `kd` the specular and diffuse coefficients.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Material {
    pub color: Color,
    pub alpha: f64,
    pub ks: f64,
    pub kd: f64,
}

impl Material {
    pub fn new(color: Color, alpha: f64, ks: f64, kd: f64) -> Material {
        Material { color, alpha, ks, kd }
    }
}

impl Default for Material {
    fn default() -> Material {
        Material {
            color: Color::white(),
            alpha: 100.0,
            ks: 0.25,
            kd: 1.0,
        }
    }
}

#[test]
fn point_light_falloff() {
    let l = PointLight::new(Vector3::new(0.0, 2.0, 0.0), Color::white(), 8.0);

    assert!(crate::feq(l.intensity_at(&Vector3::ZERO), 2.0));
    assert!(crate::feq(l.intensity_at(&Vector3::new(0.0, -2.0, 0.0)), 0.5));
}

#[test]
fn ambient_light_is_uniform() {
    let l: Light = AmbientLight::new(Color::red(), 0.3).into();

    assert_eq!(l.position(), Vector3::ZERO);
    assert_eq!(l.intensity_at(&Vector3::new(100.0, 0.0, 0.0)), 0.3);
    assert_eq!(l.color(), Color::red());
}
