use std::error::Error;
use std::path::{ Path, PathBuf };
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::{ Duration, Instant };

use clap::{ ArgEnum, Parser };
use crossbeam_channel::{ bounded, RecvTimeoutError };
use log::{ error, info, LevelFilter };

use raycaster::consts::{ OUT_FILE, DEFAULT_DESIRED_LOAD };
use raycaster::vector::Vector3;
use raycaster::transform::Transform;
use raycaster::color::Color;
use raycaster::canvas::PixelFormat;
use raycaster::geometry::Sphere;
use raycaster::shape::Transformable;
use raycaster::model::Model;
use raycaster::light::{ Material, AmbientLight, PointLight };
use raycaster::scene::Scene;
use raycaster::camera::{ Camera, ImageConfig };
use raycaster::description::{ self, LoadedScene };
use raycaster::shading::strategy_by_name;
use raycaster::parallel::default_pool_size;

/// How often render progress is logged.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Copy, Clone, Debug, ArgEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> LevelFilter {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Renders a scene to a plain PPM (or PGM) image.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// JSON scene description. Renders a built-in demo scene when omitted.
    scene: Option<PathBuf>,

    /// Output image path.
    #[clap(short, long, default_value = OUT_FILE)]
    output: PathBuf,

    /// Image width in pixels, overriding the scene description.
    #[clap(long)]
    width: Option<usize>,

    /// Image height in pixels, overriding the scene description.
    #[clap(long)]
    height: Option<usize>,

    /// Average four samples per pixel.
    #[clap(short, long)]
    anti_aliasing: bool,

    /// Write a grayscale PGM instead of a color PPM.
    #[clap(short, long)]
    grayscale: bool,

    /// Number of render threads. Defaults to a share of the available cores.
    #[clap(short = 'j', long)]
    threads: Option<usize>,

    /// Shading model.
    #[clap(short, long, default_value = "phong")]
    strategy: String,

    #[clap(long, arg_enum, default_value = "info")]
    log_level: LogLevel,
}

/// Five spheres under a single light, seen from slightly above.
fn demo_scene() -> LoadedScene {
    let material = |r, g, b| Material::new(Color::rgb(r, g, b), 100.0, 0.25, 1.0);

    let mut scene = Scene::new();
    scene.add_light(AmbientLight::new(Color::white(), 0.1));
    scene.add_light(PointLight::new(Vector3::new(-3.0, 4.0, 0.0), Color::white(), 1.0));

    scene.add_model(Model::new(
        Sphere::new(Vector3::new(0.0, 0.0, 3.5), 1.0),
        material(0.0, 255.0, 0.0)
    ));
    scene.add_model(Model::new(
        Sphere::new(Vector3::new(0.0, 1.0, 3.8), 1.5),
        material(255.0, 175.0, 175.0)
    ));
    scene.add_model(Model::new(
        Sphere::new(Vector3::new(1.0, -0.2, 3.0), 0.5),
        material(255.0, 255.0, 0.0)
    ));
    scene.add_model(Model::new(
        Sphere::new(Vector3::new(-1.0, 0.8, 3.2), 0.7),
        material(0.0, 255.0, 255.0)
    ));
    scene.add_model(Model::new(
        Sphere::new(Vector3::new(0.8, 0.6, 2.8), 0.56),
        material(255.0, 200.0, 0.0)
    ));

    let mut camera = Camera::new(Vector3::ZERO, Transform::identity(), 1.7);
    camera.translate(&Vector3::new(-0.3, 0.7, 0.0));

    let image = ImageConfig::new(300, 300, PixelFormat::Rgb, false);
    LoadedScene { scene, camera, image }
}

fn load_scene(path: Option<&Path>) -> Result<LoadedScene, Box<dyn Error>> {
    match path {
        Some(path) => {
            info!("loading scene description {:?}", path);
            Ok(description::load(path)?)
        },
        None => {
            info!("no scene description given, rendering the demo scene");
            Ok(demo_scene())
        },
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let LoadedScene { scene, camera, mut image } = load_scene(args.scene.as_deref())?;

    // Command line settings win over the scene description.
    image.width = args.width.unwrap_or(image.width);
    image.height = args.height.unwrap_or(image.height);
    image.anti_aliasing |= args.anti_aliasing;
    if args.grayscale {
        image.format = PixelFormat::Grayscale;
    }

    let threads = args.threads
        .unwrap_or_else(|| default_pool_size(num_cpus::get(), DEFAULT_DESIRED_LOAD));
    let camera = Arc::new(camera
        .with_strategy(strategy_by_name(&args.strategy)?)
        .with_pool_size(threads));

    info!(
        "rendering {}x{} with {} shading on {} threads",
        image.width, image.height, camera.strategy().name(), camera.pool_size()
    );

    // Report progress from a second thread until the render returns.
    let (done_tx, done_rx) = bounded::<()>(0);
    let watcher = Arc::clone(&camera);
    let reporter = thread::spawn(move || loop {
        match done_rx.recv_timeout(PROGRESS_INTERVAL) {
            Err(RecvTimeoutError::Timeout) => {
                if let Ok(progress) = watcher.request_progress() {
                    info!("{:.1}% done", progress);
                }
            },
            _ => break,
        }
    });

    let start = Instant::now();
    let picture = camera.take_picture(&Arc::new(scene), &image);
    drop(done_tx);
    let _ = reporter.join();
    let canvas = picture?;

    let elapsed = start.elapsed();
    info!(
        "finished in {}m {}s",
        elapsed.as_secs() / 60, elapsed.as_secs() % 60
    );

    canvas.save(&args.output, image.format)?;
    info!("saved image to {:?}", args.output);
    Ok(())
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(args.log_level.into())
        .init();

    if let Err(e) = run(args) {
        error!("{}", e);
        process::exit(1);
    }
}
