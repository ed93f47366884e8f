use anyhow::{Context, Result, bail};
use clap::Parser;
use glam::Vec2;
use std::path::{Path, PathBuf};

use gearworks_core::config::SimConfig;
use gearworks_core::levels::{find_level, levels};
use gearworks_core::schema::{load_world_file, save_world_file};
use gearworks_core::{Camera, World, emit_scene};

mod config;
mod scenario;

use scenario::{ScenarioDefinition, ScenarioExecutor};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (RON); defaults to ./gearworks.ron when present
    #[arg(long)]
    config: Option<PathBuf>,

    /// World document to simulate
    #[arg(long, conflicts_with = "level")]
    world: Option<PathBuf>,

    /// Demo level to simulate (see --list-levels)
    #[arg(long)]
    level: Option<String>,

    /// Number of ticks to run
    #[arg(long, default_value = "60")]
    ticks: usize,

    /// Seconds per tick
    #[arg(long, default_value = "0.016666668")]
    dt: f32,

    /// Write the final world document here
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write the final scene description (RON) here
    #[arg(long)]
    scene_out: Option<PathBuf>,

    /// Viewport width in pixels for scene output
    #[arg(long, default_value = "1280")]
    width: f32,

    /// Viewport height in pixels for scene output
    #[arg(long, default_value = "720")]
    height: f32,

    /// Check a world document against the schema and exit
    #[arg(long)]
    validate: Option<PathBuf>,

    /// Write a demo level document to --out and exit
    #[arg(long)]
    demo: Option<String>,

    /// Run a scenario file and exit non-zero if any verification fails
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Write the scenario execution report (JSON) here
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log every scenario action
    #[arg(long)]
    verbose: bool,

    /// List available demo levels
    #[arg(long)]
    list_levels: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.list_levels {
        println!("Available demo levels:");
        for level in levels() {
            println!("  {:<16} {} - {}", level.key, level.name, level.description);
        }
        return Ok(());
    }

    let config = config::load(args.config.as_deref())?;

    if let Some(path) = &args.validate {
        return validate(path, &config);
    }

    if let Some(name) = &args.demo {
        let Some(out) = &args.out else {
            eprintln!("Error: --demo requires --out <file.ron>");
            std::process::exit(1);
        };
        return write_demo(name, out, &config);
    }

    if let Some(path) = &args.scenario {
        return run_scenario(path, &args, config);
    }

    run(&args, &config)
}

fn validate(path: &Path, config: &SimConfig) -> Result<()> {
    match load_world_file(path, config.physics.clone()) {
        Ok(origin) => {
            let world = World::new(origin);
            println!(
                "{}: valid ({} entities, {} components, {})",
                path.display(),
                world.origin().len(),
                world.derived().components().len(),
                if world.derived().is_consistent() {
                    "consistent"
                } else {
                    "has inconsistent components"
                }
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{}: invalid: {:#}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn write_demo(name: &str, out: &Path, config: &SimConfig) -> Result<()> {
    let Some(level) = find_level(name) else {
        bail!("Unknown level '{}' (see --list-levels)", name);
    };
    let world = level
        .build(config.physics.clone())
        .with_context(|| format!("Failed to generate level '{}'", name))?;
    save_world_file(out, world.origin())
}

fn run_scenario(path: &Path, args: &Args, config: SimConfig) -> Result<()> {
    let definition = ScenarioDefinition::from_file(path)?;
    let mut executor = ScenarioExecutor::new(config)
        .with_viewport(Vec2::new(args.width, args.height))
        .verbose(args.verbose);
    let (report, world) = executor.execute_scenario(&definition)?;

    println!("{}", report.summary());
    for failure in &report.verification_failures {
        println!("  ✗ {}", failure.message);
    }

    if let Some(out) = &args.report {
        report.save_json(out)?;
        log::info!("Wrote report to {}", out.display());
    }
    if let Some(out) = &args.out {
        save_world_file(out, world.origin())?;
    }

    if !report.passed {
        std::process::exit(1);
    }
    Ok(())
}

fn run(args: &Args, config: &SimConfig) -> Result<()> {
    let mut world = match (&args.world, &args.level) {
        (Some(path), _) => World::new(load_world_file(path, config.physics.clone())?),
        (None, Some(name)) => {
            let Some(level) = find_level(name) else {
                bail!("Unknown level '{}' (see --list-levels)", name);
            };
            level.build(config.physics.clone())?
        }
        (None, None) => World::empty(config.physics.clone()),
    };

    log::info!(
        "Running {} ticks of {:.4}s over {} entities (energy {:.3})",
        args.ticks,
        args.dt,
        world.origin().len(),
        world.derived().total_energy()
    );

    for tick in 1..=args.ticks {
        world.tick(args.dt);
        log::debug!(
            "Tick {}: energy {:.3}",
            tick,
            world.derived().total_energy()
        );
    }

    for (id, state) in world.derived().gears() {
        log::info!(
            "  {}: w = {:.3} rad/s, E = {:.3} ({:?}, {:?})",
            id,
            state.angular_velocity,
            state.energy,
            state.drive,
            state.validity
        );
    }
    log::info!(
        "Finished at revision {} with total energy {:.3}",
        world.origin().revision(),
        world.derived().total_energy()
    );

    if let Some(out) = &args.scene_out {
        let camera = Camera::new(Vec2::new(args.width, args.height), &config.camera);
        let scene = emit_scene(&world, &camera);
        let text = ron::ser::to_string_pretty(&scene, ron::ser::PrettyConfig::default())
            .context("Failed to serialize scene")?;
        std::fs::write(out, text)
            .with_context(|| format!("Failed to write scene to {}", out.display()))?;
        log::info!("Wrote {} primitives to {}", scene.primitives.len(), out.display());
    }

    if let Some(out) = &args.out {
        save_world_file(out, world.origin())?;
    }
    Ok(())
}
