use std::sync::Arc;
use std::sync::atomic::{ AtomicBool, AtomicUsize, Ordering };
use std::time::Instant;

use crossbeam_channel::unbounded;
use log::{ debug, info, warn };

use crate::consts::{ DEFAULT_FOCAL_LENGTH, DEFAULT_POOL_SIZE };
use crate::vector::Vector3;
use crate::transform::Transform;
use crate::ray::Ray;
use crate::color::Color;
use crate::canvas::{ Canvas, PixelFormat };
use crate::scene::Scene;
use crate::intersect::{ Intersection, RaycastHit };
use crate::shape::Transformable;
use crate::shading::{ ShadingStrategy, PhongStrategy };
use crate::parallel::WorkerPool;
use crate::error::{ DegenerateVectorError, RenderError };

/// Sub-pixel sample positions used with anti-aliasing.
const AA_OFFSETS: [(f64, f64); 4] = [
    (0.25, 0.25), (0.75, 0.25),
    (0.25, 0.75), (0.75, 0.75),
];

/// Sample position without anti-aliasing: the pixel center.
const CENTER_OFFSET: [(f64, f64); 1] = [(0.5, 0.5)];

/// Output image parameters for a render.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ImageConfig {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
    pub anti_aliasing: bool,
}

impl ImageConfig {
    pub fn new(width: usize, height: usize, format: PixelFormat,
        anti_aliasing: bool) -> ImageConfig {
        ImageConfig { width, height, format, anti_aliasing }
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Completed-pixel accounting shared between a camera and its render units.
#[derive(Debug, Default)]
struct RenderProgress {
    rendering: AtomicBool,
    completed: AtomicUsize,
    total: AtomicUsize,
}

/// Marks a render as finished when dropped, including on early return.
struct RenderGuard<'a>(&'a RenderProgress);

impl<'a> Drop for RenderGuard<'a> {
    fn drop(&mut self) {
        self.0.completed.store(0, Ordering::SeqCst);
        self.0.total.store(0, Ordering::SeqCst);
        self.0.rendering.store(false, Ordering::SeqCst);
    }
}

/// A pinhole camera.
///
/// The camera sits at `position` and looks down its local +Z axis;
/// `camera_to_world` orients that axis in the world. The image plane is at
/// distance `focal_length`, spans `[-aspect, aspect]` horizontally and
/// `[-1, 1]` vertically.
///
/// Rendering is parallel: `take_picture` hands one unit of work per pixel to
/// a `WorkerPool` and collects the results. A clone is an independent camera
/// with its own render state.
#[derive(Debug)]
pub struct Camera {
    pub position: Vector3,
    pub camera_to_world: Transform,
    pub focal_length: f64,
    pool_size: usize,
    strategy: Arc<dyn ShadingStrategy>,
    progress: Arc<RenderProgress>,
}

impl Clone for Camera {
    fn clone(&self) -> Camera {
        Camera {
            position: self.position,
            camera_to_world: self.camera_to_world,
            focal_length: self.focal_length,
            pool_size: self.pool_size,
            strategy: Arc::clone(&self.strategy),
            progress: Arc::new(RenderProgress::default()),
        }
    }
}

impl Default for Camera {
    fn default() -> Camera {
        Camera::new(Vector3::ZERO, Transform::identity(), DEFAULT_FOCAL_LENGTH)
    }
}

impl Camera {
    /// Creates a camera with Phong shading and the default pool size.
    pub fn new(position: Vector3, camera_to_world: Transform, focal_length: f64)
        -> Camera {
        Camera {
            position,
            camera_to_world,
            focal_length,
            pool_size: DEFAULT_POOL_SIZE,
            strategy: Arc::new(PhongStrategy),
            progress: Arc::new(RenderProgress::default()),
        }
    }

    /// Replaces the shading strategy.
    pub fn with_strategy(mut self, strategy: Arc<dyn ShadingStrategy>) -> Camera {
        self.strategy = strategy;
        self
    }

    /// Sets the number of worker threads used by `take_picture`.
    pub fn with_pool_size(mut self, pool_size: usize) -> Camera {
        self.pool_size = pool_size;
        self
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn strategy(&self) -> &dyn ShadingStrategy {
        self.strategy.as_ref()
    }

    /// The primary ray through image coordinates `(px, py)`.
    ///
    /// Coordinates are continuous: `(x + 0.5, y + 0.5)` is the center of
    /// pixel `(x, y)`. Row 0 is the top of the image.
    pub fn ray_for_sample(&self, px: f64, py: f64, config: &ImageConfig)
        -> Result<Ray, DegenerateVectorError> {
        let cam_x = (2.0 * (px / config.width as f64) - 1.0) * config.aspect_ratio();
        let cam_y = -(2.0 * (py / config.height as f64) - 1.0);

        let direction = self.camera_to_world
            .transform_direction(&Vector3::new(cam_x, cam_y, self.focal_length));
        Ray::new(self.position, direction)
    }

    /// Finds the nearest model hit by a ray.
    pub fn raycast(&self, ray: &Ray, scene: &Scene) -> RaycastHit {
        let mut nearest: Option<(usize, Intersection)> = None;

        for (index, model) in scene.objects.iter().enumerate() {
            let hit = model.intersects(ray);
            if !hit.is_hit || hit.t <= 0.0 {
                continue;
            }

            if nearest.map_or(true, |(_, n)| hit.t < n.t) {
                nearest = Some((index, hit));
            }
        }

        match nearest {
            Some((index, hit)) => RaycastHit::new(scene.objects[index].clone(), &hit),
            None => RaycastHit::miss(),
        }
    }

    /// Shades one sample. Misses and degenerate rays are black.
    fn sample(&self, px: f64, py: f64, scene: &Scene, config: &ImageConfig) -> Color {
        let ray = match self.ray_for_sample(px, py, config) {
            Ok(ray) => ray,
            Err(e) => {
                warn!("no ray for sample ({}, {}): {}", px, py, e);
                return Color::black();
            }
        };

        let hit = self.raycast(&ray, scene);
        if hit.is_hit {
            self.strategy.render(self, scene, &ray, &hit)
        } else {
            Color::black()
        }
    }

    /// Computes the color of pixel `(x, y)`.
    ///
    /// Without anti-aliasing a single ray goes through the pixel center.
    /// With it, four rays at a quarter pixel from the center are averaged.
    pub fn raytrace(&self, x: usize, y: usize, scene: &Scene,
        config: &ImageConfig) -> Color {
        let offsets: &[(f64, f64)] = if config.anti_aliasing {
            &AA_OFFSETS
        } else {
            &CENTER_OFFSET
        };

        let samples: Vec<Color> = offsets.iter()
            .map(|&(dx, dy)| self.sample(x as f64 + dx, y as f64 + dy, scene, config))
            .collect();

        Color::average(&samples)
    }

    /// Renders the scene into a new canvas.
    ///
    /// Every pixel becomes one task on a fresh `WorkerPool`; this call blocks
    /// until all of them are done. Finished pixels are sent back over a
    /// channel and written by this thread alone.
    pub fn take_picture(&self, scene: &Arc<Scene>, config: &ImageConfig)
        -> Result<Canvas, RenderError> {
        if config.width == 0 || config.height == 0 {
            return Err(RenderError::EmptyImage(config.width, config.height));
        }

        if self.progress.rendering
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err() {
            return Err(RenderError::RenderInProgress);
        }
        let _guard = RenderGuard(&self.progress);

        let total = config.width * config.height;
        self.progress.completed.store(0, Ordering::SeqCst);
        self.progress.total.store(total, Ordering::SeqCst);

        info!("rendering {}x{} image with {} workers using {} shading{}",
            config.width, config.height, self.pool_size, self.strategy.name(),
            if config.anti_aliasing { " and anti-aliasing" } else { "" });
        let started = Instant::now();

        let pool = WorkerPool::new(self.pool_size)?;
        let camera = Arc::new(self.clone());
        let (pixels, finished) = unbounded();

        for y in 0..config.height {
            for x in 0..config.width {
                let camera = Arc::clone(&camera);
                let progress = Arc::clone(&self.progress);
                let scene = Arc::clone(scene);
                let pixels = pixels.clone();
                let config = *config;

                pool.register(move || {
                    let color = camera.raytrace(x, y, &scene, &config);
                    progress.completed.fetch_add(1, Ordering::SeqCst);
                    let _ = pixels.send((x, y, color));
                })?;
            }
        }
        drop(pixels);

        pool.shutdown()?;
        debug!("all {} pixels traced in {:?}", total, started.elapsed());

        let mut canvas = Canvas::new(config.width, config.height);
        for (x, y, color) in finished.try_iter() {
            if let Err(e) = canvas.write_pixel(x, y, color) {
                warn!("dropping pixel: {}", e);
            }
        }

        info!("render finished in {:?}", started.elapsed());
        Ok(canvas)
    }

    /// Percentage (0 to 100) of pixels finished by the render in flight.
    ///
    /// Asking while no render is running is an error.
    pub fn request_progress(&self) -> Result<f64, RenderError> {
        if !self.progress.rendering.load(Ordering::SeqCst) {
            warn!("render progress requested while the camera is idle");
            return Err(RenderError::ProgressQueriedWhileIdle);
        }

        let total = self.progress.total.load(Ordering::SeqCst);
        if total == 0 {
            return Ok(0.0);
        }

        let completed = self.progress.completed.load(Ordering::SeqCst);
        Ok(100.0 * completed as f64 / total as f64)
    }
}

impl Transformable for Camera {
    fn translate(&mut self, offset: &Vector3) {
        self.position = self.position + *offset;
    }

    fn rotate_x(&mut self, theta: f64, around_origin: bool) {
        self.camera_to_world.rotate_x(theta, around_origin);
    }

    fn rotate_y(&mut self, theta: f64, around_origin: bool) {
        self.camera_to_world.rotate_y(theta, around_origin);
    }

    fn rotate_z(&mut self, theta: f64, around_origin: bool) {
        self.camera_to_world.rotate_z(theta, around_origin);
    }
}

#[cfg(test)]
fn single_sphere_scene(ambient: f64) -> Scene {
    use crate::geometry::Sphere;
    use crate::model::Model;
    use crate::light::{ Material, AmbientLight };

    let mut scene = Scene::new();
    scene.ambient = AmbientLight::new(Color::white(), ambient);
    scene.add_model(Model::new(
        Sphere::new(Vector3::new(0.0, 0.0, 5.0), 1.0),
        Material::new(Color::rgb(100.0, 200.0, 50.0), 100.0, 0.25, 1.0)
    ));

    scene
}

#[test]
fn ray_through_center() {
    let c = Camera::default();
    let config = ImageConfig::new(201, 101, PixelFormat::Rgb, false);
    let r = c.ray_for_sample(100.5, 50.5, &config).unwrap();

    assert_eq!(r.origin, Vector3::ZERO);
    assert_eq!(r.direction(), Vector3::K);
}

#[test]
fn ray_through_corner_uses_aspect_and_flips_y() {
    let c = Camera::default();
    let config = ImageConfig::new(200, 100, PixelFormat::Rgb, false);
    let r = c.ray_for_sample(0.0, 0.0, &config).unwrap();

    assert_eq!(r.direction(), Vector3::new(-2.0, 1.0, 1.0).normalize().unwrap());
}

#[test]
fn ray_when_camera_transformed() {
    use std::f64::consts::FRAC_PI_2;

    let mut c = Camera::default();
    c.translate(&Vector3::new(0.0, 2.0, -5.0));
    c.rotate_y(FRAC_PI_2, false);

    let config = ImageConfig::new(11, 11, PixelFormat::Rgb, false);
    let r = c.ray_for_sample(5.5, 5.5, &config).unwrap();

    assert_eq!(r.origin, Vector3::new(0.0, 2.0, -5.0));
    assert_eq!(r.direction(), Vector3::I);
}

#[test]
fn raycast_picks_nearest_hit() {
    use crate::geometry::Sphere;
    use crate::model::Model;
    use crate::light::Material;

    let mut scene = Scene::new();
    let far = Material::new(Color::red(), 1.0, 0.0, 1.0);
    let near = Material::new(Color::blue(), 1.0, 0.0, 1.0);
    scene.add_model(Model::new(Sphere::new(Vector3::new(0.0, 0.0, 10.0), 1.0), far));
    scene.add_model(Model::new(Sphere::new(Vector3::new(0.0, 0.0, 5.0), 1.0), near));
    scene.add_model(Model::new(Sphere::new(Vector3::new(0.0, 0.0, -5.0), 1.0), far));

    let c = Camera::default();
    let hit = c.raycast(&Ray::new(Vector3::ZERO, Vector3::K).unwrap(), &scene);

    assert!(hit.is_hit);
    assert!(crate::feq(hit.distance, 4.0));
    assert_eq!(hit.point, Vector3::new(0.0, 0.0, 4.0));
    assert_eq!(hit.model.unwrap().material.color, Color::blue());

    let miss = c.raycast(&Ray::new(Vector3::ZERO, Vector3::J).unwrap(), &scene);
    assert!(!miss.is_hit);
    assert!(miss.model.is_none());
}

#[test]
fn ambient_only_pixel() {
    let scene = single_sphere_scene(0.08);
    let c = Camera::default();
    let config = ImageConfig::new(11, 11, PixelFormat::Rgb, false);

    assert_eq!(c.raytrace(5, 5, &scene, &config), Color::rgb(8.0, 16.0, 4.0));
    assert_eq!(c.raytrace(0, 0, &scene, &config), Color::black());
}

#[test]
fn anti_aliased_pixel_averages_four_samples() {
    use crate::geometry::{ Plane, Triangle };
    use crate::model::Model;
    use crate::light::{ Material, AmbientLight };

    // The left half of pixel (0, 0) sees a red triangle, the right half a
    // blue wall behind it.
    let mut scene = Scene::new();
    scene.ambient = AmbientLight::new(Color::white(), 1.0);
    scene.add_model(Model::new(
        Plane::new(Vector3::new(0.0, 0.0, 10.0), -Vector3::K).unwrap(),
        Material::new(Color::blue(), 1.0, 0.0, 0.0)
    ));
    scene.add_model(Model::new(
        Triangle::new(
            Vector3::new(-2.0, -100.0, 5.0),
            Vector3::new(-2.0, 100.0, 5.0),
            Vector3::new(-100.0, 0.0, 5.0)
        ).unwrap(),
        Material::new(Color::red(), 1.0, 0.0, 0.0)
    ));

    let c = Camera::default();
    let aa = ImageConfig::new(2, 2, PixelFormat::Rgb, true);
    let samples: Vec<Color> = AA_OFFSETS.iter()
        .map(|&(dx, dy)| c.sample(dx, dy, &scene, &aa))
        .collect();

    assert_eq!(samples[0], Color::red());
    assert_eq!(samples[1], Color::blue());
    assert_eq!(c.raytrace(0, 0, &scene, &aa), Color::average(&samples));
    assert_eq!(c.raytrace(0, 0, &scene, &aa), Color::rgb(127.5, 0.0, 127.5));

    // Without anti-aliasing the single center ray still hits the triangle.
    let plain = ImageConfig { anti_aliasing: false, ..aa };
    assert_eq!(c.raytrace(0, 0, &scene, &plain), Color::red());
}

#[test]
fn progress_while_idle_is_an_error() {
    let c = Camera::default();
    match c.request_progress() {
        Err(RenderError::ProgressQueriedWhileIdle) => (),
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn take_picture_renders_every_pixel() {
    let scene = Arc::new(single_sphere_scene(0.5));
    let c = Camera::default().with_pool_size(3);
    let config = ImageConfig::new(9, 7, PixelFormat::Rgb, false);

    let canvas = c.take_picture(&scene, &config).unwrap();
    assert_eq!(canvas.width, 9);
    assert_eq!(canvas.height, 7);

    for y in 0..7 {
        for x in 0..9 {
            assert_eq!(canvas.read_pixel(x, y).unwrap(), c.raytrace(x, y, &scene, &config));
        }
    }
    assert_eq!(canvas.read_pixel(4, 3).unwrap(), Color::rgb(50.0, 100.0, 25.0));
    assert!(c.request_progress().is_err());
}

#[test]
fn take_picture_rejects_empty_image() {
    let scene = Arc::new(Scene::new());
    let c = Camera::default();
    let config = ImageConfig::new(0, 10, PixelFormat::Rgb, false);

    assert!(matches!(c.take_picture(&scene, &config), Err(RenderError::EmptyImage(0, 10))));
}

#[test]
fn progress_is_reported_during_render() {
    use std::thread;
    use std::time::Duration;
    use crossbeam_channel::{ bounded, Receiver };

    /// Shades each sample only after the test hands out a token.
    #[derive(Debug)]
    struct Gated(Receiver<()>);

    impl ShadingStrategy for Gated {
        fn name(&self) -> &str {
            "gated"
        }

        fn render(&self, _: &Camera, _: &Scene, _: &Ray, _: &RaycastHit) -> Color {
            let _ = self.0.recv();
            Color::white()
        }
    }

    use crate::geometry::Plane;
    use crate::model::Model;
    use crate::light::Material;

    let (tokens, gate) = bounded(0);
    let camera = Arc::new(Camera::default()
        .with_strategy(Arc::new(Gated(gate)))
        .with_pool_size(1));

    let mut scene = Scene::new();
    scene.add_model(Model::new(
        Plane::new(Vector3::new(0.0, 0.0, 5.0), -Vector3::K).unwrap(),
        Material::default()
    ));
    let scene = Arc::new(scene);

    let render = {
        let camera = Arc::clone(&camera);
        thread::spawn(move || {
            // Both pixels of this image see the wall.
            let config = ImageConfig::new(2, 1, PixelFormat::Rgb, false);
            camera.take_picture(&scene, &config)
        })
    };

    let wait_for = |expected: f64| loop {
        if let Ok(p) = camera.request_progress() {
            if crate::feq(p, expected) {
                break;
            }
        }
        thread::sleep(Duration::from_millis(1));
    };

    wait_for(0.0);
    assert!(matches!(
        camera.take_picture(&Arc::new(Scene::new()),
            &ImageConfig::new(1, 1, PixelFormat::Rgb, false)),
        Err(RenderError::RenderInProgress)
    ));

    // A clone is a camera of its own: idle, and free to render elsewhere.
    let mut other = (*camera).clone();
    other.translate(&-Vector3::K);
    assert!(other.request_progress().is_err());
    assert!(other.take_picture(&Arc::new(Scene::new()),
        &ImageConfig::new(1, 1, PixelFormat::Rgb, false)).is_ok());
    assert!(crate::feq(camera.request_progress().unwrap(), 0.0));

    tokens.send(()).unwrap();
    wait_for(50.0);
    tokens.send(()).unwrap();

    let canvas = render.join().unwrap().unwrap();
    assert_eq!(canvas.read_pixel(0, 0).unwrap(), Color::white());
    assert_eq!(canvas.read_pixel(1, 0).unwrap(), Color::white());
    assert!(camera.request_progress().is_err());
}
