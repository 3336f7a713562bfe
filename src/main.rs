use anyhow::{Context, Result};
use argh::FromArgs;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use flocking::{AnyFlock, FlockConfig};

const DOMAIN: f64 = 1024.0;
const MIN_SPEED: f64 = 130.0;
const MAX_SPEED: f64 = 170.0;
const PREDATOR_MIN_SPEED: f64 = 260.0;
const PREDATOR_MAX_SPEED: f64 = 350.0;
const AVOID_RADIUS: f64 = 20.0;

#[derive(FromArgs)]
/// Run a boid simulation without drawing it and report the final state as JSON.
struct Args {
    /// number of boids to simulate
    #[argh(positional)]
    n_boids: usize,

    /// frames per second; picked from the number of boids when omitted
    #[argh(option)]
    framerate: Option<u32>,

    /// number of frames to simulate
    #[argh(option, default = "300")]
    frames: u64,

    /// number of predators present from the start
    #[argh(option, default = "0")]
    predators: usize,

    /// simulate in three dimensions
    #[argh(switch)]
    three_d: bool,

    /// seed for reproducible runs
    #[argh(option)]
    seed: Option<u64>,
}

/// Larger flocks get a lower framerate so each frame has time to finish.
fn default_framerate(n_boids: usize) -> u32 {
    match n_boids {
        0..=512 => 30,
        513..=1024 => 25,
        1025..=1500 => 20,
        _ => 15,
    }
}

fn default_view_radius(n_boids: usize) -> f64 {
    if n_boids <= 1500 { 150.0 } else { 50.0 }
}

fn config_from(args: &Args) -> FlockConfig {
    let ndim = if args.three_d { 3 } else { 2 };
    FlockConfig {
        n_boids: args.n_boids,
        n_predators: args.predators,
        min_speed: MIN_SPEED,
        max_speed: MAX_SPEED,
        predator_min_speed: PREDATOR_MIN_SPEED,
        predator_max_speed: PREDATOR_MAX_SPEED,
        view_radius: default_view_radius(args.n_boids),
        avoid_radius: AVOID_RADIUS,
        bounds: vec![DOMAIN; ndim],
        seed: args.seed,
        ..FlockConfig::default()
    }
}

fn main() -> Result<()> {
    init_tracing();
    let args: Args = argh::from_env();

    let framerate = args.framerate.unwrap_or_else(|| default_framerate(args.n_boids)).max(1);
    let step = 1.0 / f64::from(framerate);
    let config = config_from(&args);
    let mut flock = AnyFlock::new(&config).context("could not build the flock")?;
    info!(
        boids = flock.len(),
        predators = flock.predator_count(),
        ndim = flock.ndim(),
        framerate,
        "starting simulation"
    );

    let pbar = ProgressBar::new(args.frames);
    pbar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}/{eta_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
        )
        .context("invalid progress bar template")?,
    );
    for _ in 0..args.frames {
        flock.update(step);
        pbar.inc(1);
    }
    pbar.finish_and_clear();

    let summary = flock.summary();
    info!(
        mean_speed = summary.mean_speed,
        mean_predator_speed = summary.mean_predator_speed,
        "simulation finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
