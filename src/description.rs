use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::{ debug, info };
use serde::{ Serialize, Deserialize };

use crate::consts::{ DEFAULT_WIDTH, DEFAULT_HEIGHT, DEFAULT_FOCAL_LENGTH,
    DEFAULT_AMBIENT_INTENSITY };
use crate::transform::Transform;
use crate::color::Color;
use crate::canvas::PixelFormat;
use crate::geometry::{ Sphere, Plane, Triangle };
use crate::shape::{ Shape, Transformable };
use crate::model::Model;
use crate::light::{ Material, AmbientLight, PointLight };
use crate::scene::Scene;
use crate::camera::{ Camera, ImageConfig };
use crate::obj;
use crate::error::DescriptionError;

/// Everything needed to render a picture, built from a scene description.
#[derive(Debug)]
pub struct LoadedScene {
    pub scene: Scene,
    pub camera: Camera,
    pub image: ImageConfig,
}

/// A JSON scene description.
///
/// Every section is optional; missing values fall back to the renderer's
/// defaults. A small description looks like this:
///
/// ```json
/// {
///     "camera": { "position": [0, 1, -5], "rotation": [0.1, 0, 0] },
///     "image": { "width": 320, "height": 240, "anti_aliasing": true },
///     "ambient": { "color": [255, 255, 255], "intensity": 0.1 },
///     "lights": [ { "position": [-3, 4, 0] } ],
///     "objects": [
///         { "type": "sphere", "center": [0, 0, 3], "radius": 1,
///           "material": { "color": [255, 0, 0] } },
///         { "type": "mesh", "path": "teapot.obj", "translate": [0, -1, 6] }
///     ]
/// }
/// ```
///
/// Rotations are in radians, about the X, Y and Z axes in that order. Mesh
/// paths are resolved relative to the directory of the description file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub camera: CameraDescription,
    pub image: ImageDescription,
    pub ambient: Option<AmbientDescription>,
    pub lights: Vec<LightDescription>,
    pub objects: Vec<ObjectDescription>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraDescription {
    pub position: [f64; 3],
    pub rotation: [f64; 3],
    pub focal_length: f64,
}

impl Default for CameraDescription {
    fn default() -> CameraDescription {
        CameraDescription {
            position: [0.0; 3],
            rotation: [0.0; 3],
            focal_length: DEFAULT_FOCAL_LENGTH,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageDescription {
    pub width: usize,
    pub height: usize,
    pub anti_aliasing: bool,
    pub grayscale: bool,
}

impl Default for ImageDescription {
    fn default() -> ImageDescription {
        ImageDescription {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            anti_aliasing: false,
            grayscale: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AmbientDescription {
    #[serde(default = "white")]
    pub color: [f64; 3],
    #[serde(default = "ambient_intensity")]
    pub intensity: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LightDescription {
    pub position: [f64; 3],
    #[serde(default = "white")]
    pub color: [f64; 3],
    #[serde(default = "unit")]
    pub intensity: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialDescription {
    pub color: [f64; 3],
    pub alpha: f64,
    pub ks: f64,
    pub kd: f64,
}

impl Default for MaterialDescription {
    fn default() -> MaterialDescription {
        let m = Material::default();
        MaterialDescription {
            color: [m.color.r, m.color.g, m.color.b],
            alpha: m.alpha,
            ks: m.ks,
            kd: m.kd,
        }
    }
}

impl From<&MaterialDescription> for Material {
    fn from(m: &MaterialDescription) -> Material {
        Material::new(Color::from(&m.color[..]), m.alpha, m.ks, m.kd)
    }
}

/// The geometry of an object, tagged by `"type"`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShapeDescription {
    Sphere { center: [f64; 3], radius: f64 },
    Plane { point: [f64; 3], normal: [f64; 3] },
    Triangle { p1: [f64; 3], p2: [f64; 3], p3: [f64; 3] },
    Mesh { path: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObjectDescription {
    #[serde(flatten)]
    pub shape: ShapeDescription,
    #[serde(default)]
    pub material: MaterialDescription,
    #[serde(default)]
    pub rotate: Option<[f64; 3]>,
    #[serde(default)]
    pub translate: Option<[f64; 3]>,
}

fn white() -> [f64; 3] {
    [255.0; 3]
}

fn ambient_intensity() -> f64 {
    DEFAULT_AMBIENT_INTENSITY
}

fn unit() -> f64 {
    1.0
}

fn rotate_xyz<T: Transformable>(target: &mut T, angles: &[f64; 3]) {
    target.rotate_x(angles[0], true);
    target.rotate_y(angles[1], true);
    target.rotate_z(angles[2], true);
}

impl FromStr for SceneDescription {
    type Err = DescriptionError;

    fn from_str(json: &str) -> Result<SceneDescription, DescriptionError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl ObjectDescription {
    /// Builds the model, loading mesh files relative to `base_dir`.
    pub fn to_model(&self, base_dir: &Path) -> Result<Model, DescriptionError> {
        let shape: Shape = match self.shape {
            ShapeDescription::Sphere { center, radius } =>
                Sphere::new(center.into(), radius).into(),
            ShapeDescription::Plane { point, normal } =>
                Plane::new(point.into(), normal.into())?.into(),
            ShapeDescription::Triangle { p1, p2, p3 } =>
                Triangle::new(p1.into(), p2.into(), p3.into())?.into(),
            ShapeDescription::Mesh { ref path } => {
                let full = base_dir.join(path);
                let mesh = obj::load(&full).map_err(|source| {
                    DescriptionError::Mesh { path: path.clone(), source }
                })?;
                debug!("mesh {:?} has {} faces", full, mesh.faces().len());
                mesh.into()
            },
        };

        let mut model = Model::new(shape, (&self.material).into());
        if let Some(ref angles) = self.rotate {
            rotate_xyz(&mut model, angles);
        }
        if let Some(offset) = self.translate {
            model.translate(&offset.into());
        }

        Ok(model)
    }
}

impl SceneDescription {
    /// Reads and parses a description file.
    pub fn from_file(path: &Path) -> Result<SceneDescription, DescriptionError> {
        let json = fs::read_to_string(path)?;
        json.parse()
    }

    /// Builds the scene, camera and image settings.
    ///
    /// Mesh paths are resolved against `base_dir`.
    pub fn build(&self, base_dir: &Path) -> Result<LoadedScene, DescriptionError> {
        let mut scene = Scene::new();
        if let Some(ref ambient) = self.ambient {
            scene.add_light(AmbientLight::new(
                Color::from(&ambient.color[..]), ambient.intensity
            ));
        }

        for light in self.lights.iter() {
            scene.add_light(PointLight::new(
                light.position.into(), Color::from(&light.color[..]), light.intensity
            ));
        }

        for object in self.objects.iter() {
            scene.add_model(object.to_model(base_dir)?);
        }

        let mut camera = Camera::new(
            self.camera.position.into(),
            Transform::identity(),
            self.camera.focal_length
        );
        rotate_xyz(&mut camera, &self.camera.rotation);

        let format = if self.image.grayscale {
            PixelFormat::Grayscale
        } else {
            PixelFormat::Rgb
        };
        let image = ImageConfig::new(
            self.image.width, self.image.height, format, self.image.anti_aliasing
        );

        info!(
            "scene has {} objects and {} point lights",
            scene.objects.len(), scene.lights.len()
        );
        Ok(LoadedScene { scene, camera, image })
    }
}

/// Loads a description file and builds everything it describes.
pub fn load(path: &Path) -> Result<LoadedScene, DescriptionError> {
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    SceneDescription::from_file(path)?.build(base_dir)
}

#[test]
fn empty_description_uses_defaults() {
    use crate::vector::Vector3;

    let loaded = "{}".parse::<SceneDescription>().unwrap()
        .build(Path::new(".")).unwrap();

    assert!(loaded.scene.objects.is_empty());
    assert!(loaded.scene.lights.is_empty());
    assert!(crate::feq(loaded.scene.ambient.intensity, DEFAULT_AMBIENT_INTENSITY));
    assert_eq!(loaded.image.width, DEFAULT_WIDTH);
    assert_eq!(loaded.image.height, DEFAULT_HEIGHT);
    assert_eq!(loaded.image.format, PixelFormat::Rgb);
    assert!(!loaded.image.anti_aliasing);
    assert_eq!(loaded.camera.position, Vector3::ZERO);
    assert_eq!(loaded.camera.camera_to_world, Transform::identity());
}

#[test]
fn full_description() {
    use crate::vector::Vector3;

    let json = r#"{
        "camera": { "position": [0, 1, -5], "focal_length": 2.0 },
        "image": { "width": 32, "height": 24, "anti_aliasing": true, "grayscale": true },
        "ambient": { "color": [255, 0, 0], "intensity": 0.5 },
        "lights": [
            { "position": [-3, 4, 0] },
            { "position": [3, 4, 0], "color": [0, 0, 255], "intensity": 2 }
        ],
        "objects": [
            { "type": "sphere", "center": [0, 0, 3], "radius": 1,
              "material": { "color": [255, 0, 0], "alpha": 10 } },
            { "type": "plane", "point": [0, -1, 0], "normal": [0, 2, 0] },
            { "type": "triangle", "p1": [0, 1, 0], "p2": [-1, 0, 0], "p3": [1, 0, 0],
              "translate": [0, 0, 5] }
        ]
    }"#;

    let loaded = json.parse::<SceneDescription>().unwrap()
        .build(Path::new(".")).unwrap();

    assert_eq!(loaded.camera.position, Vector3::new(0.0, 1.0, -5.0));
    assert!(crate::feq(loaded.camera.focal_length, 2.0));
    assert_eq!(loaded.image, ImageConfig::new(32, 24, PixelFormat::Grayscale, true));
    assert_eq!(loaded.scene.ambient.color, Color::red());
    assert_eq!(loaded.scene.lights.len(), 2);
    assert_eq!(loaded.scene.lights[0].color, Color::white());
    assert_eq!(loaded.scene.lights[1].color, Color::blue());
    assert_eq!(loaded.scene.objects.len(), 3);

    let sphere = &loaded.scene.objects[0];
    assert_eq!(sphere.material.color, Color::red());
    assert!(crate::feq(sphere.material.alpha, 10.0));
    assert!(crate::feq(sphere.material.kd, 1.0));

    match loaded.scene.objects[1].shape {
        Shape::Plane(ref p) => assert_eq!(p.normal(), Vector3::J),
        ref other => panic!("expected a plane, got {:?}", other),
    }

    match loaded.scene.objects[2].shape {
        Shape::Triangle(ref t) => assert_eq!(t.p1, Vector3::new(0.0, 1.0, 5.0)),
        ref other => panic!("expected a triangle, got {:?}", other),
    }
}

#[test]
fn camera_rotation_is_applied() {
    use std::f64::consts::FRAC_PI_2;

    let json = r#"{ "camera": { "rotation": [0, 1.5707963267948966, 0] } }"#;
    let loaded = json.parse::<SceneDescription>().unwrap()
        .build(Path::new(".")).unwrap();

    assert_eq!(loaded.camera.camera_to_world, Transform::rotation_y(FRAC_PI_2));
}

#[test]
fn degenerate_geometry_is_an_error() {
    let json = r#"{ "objects": [ { "type": "plane", "point": [0, 0, 0], "normal": [0, 0, 0] } ] }"#;
    match json.parse::<SceneDescription>().unwrap().build(Path::new(".")) {
        Err(DescriptionError::Degenerate(_)) => (),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn malformed_json_is_an_error() {
    match r#"{ "objects": [ { "type": "cube" } ] }"#.parse::<SceneDescription>() {
        Err(DescriptionError::Json(_)) => (),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn missing_mesh_file_names_the_path() {
    let json = r#"{ "objects": [ { "type": "mesh", "path": "nowhere.obj" } ] }"#;
    match json.parse::<SceneDescription>().unwrap().build(Path::new("./missing")) {
        Err(DescriptionError::Mesh { path, .. }) => assert_eq!(path, "nowhere.obj"),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn mesh_is_loaded_relative_to_the_description() {
    use crate::vector::Vector3;

    let dir = std::env::temp_dir().join(format!("raycaster-desc-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("tri.obj"), "v 0 1 0\nv -1 0 0\nv 1 0 0\nf 1 2 3\n").unwrap();
    fs::write(
        dir.join("scene.json"),
        r#"{ "objects": [ { "type": "mesh", "path": "tri.obj", "translate": [0, 0, 4] } ] }"#
    ).unwrap();

    let loaded = load(&dir.join("scene.json")).unwrap();
    fs::remove_dir_all(&dir).unwrap();

    match loaded.scene.objects[0].shape {
        Shape::Mesh(ref m) => {
            assert_eq!(m.faces().len(), 1);
            assert_eq!(m.bounding_sphere().center, Vector3::new(0.0, 0.0, 4.0));
        },
        ref other => panic!("expected a mesh, got {:?}", other),
    }
}
