//! Layered configuration loading for the host binary

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use gearworks_core::config::SimConfig;
use std::path::Path;

/// Base name of the optional config file in the working directory
const CONFIG_FILE: &str = "gearworks";

fn with_defaults(builder: ConfigBuilder<DefaultState>) -> Result<ConfigBuilder<DefaultState>> {
    let d = SimConfig::default();
    let keys = &d.interaction.keys;

    Ok(builder
        .set_default("physics.mesh_tolerance", d.physics.mesh_tolerance as f64)?
        .set_default("physics.cycle_tolerance", d.physics.cycle_tolerance as f64)?
        .set_default("physics.snap_distance", d.physics.snap_distance as f64)?
        .set_default("physics.speed_epsilon", d.physics.speed_epsilon as f64)?
        .set_default("camera.zoom_speed", d.camera.zoom_speed as f64)?
        .set_default("camera.min_zoom", d.camera.min_zoom as f64)?
        .set_default("camera.max_zoom", d.camera.max_zoom as f64)?
        .set_default("camera.initial_zoom", d.camera.initial_zoom as f64)?
        .set_default("interaction.gear_radius", d.interaction.gear_radius as f64)?
        .set_default("interaction.gear_mass", d.interaction.gear_mass as f64)?
        .set_default("interaction.force_velocity", d.interaction.force_velocity as f64)?
        .set_default("interaction.keys.add_gear", keys.add_gear.to_string())?
        .set_default("interaction.keys.sticky_add_gear", keys.sticky_add_gear.to_string())?
        .set_default("interaction.keys.connect", keys.connect.to_string())?
        .set_default("interaction.keys.apply_force", keys.apply_force.to_string())?
        .set_default("interaction.keys.cancel", keys.cancel.to_string())?
        .set_default(
            "persistence.camera_save_interval_ms",
            d.persistence.camera_save_interval_ms as i64,
        )?)
}

/// Load configuration with layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (GEARWORKS_PHYSICS__MESH_TOLERANCE, etc.)
/// 2. `path` if given, otherwise `gearworks.ron` when present
/// 3. Compiled defaults
pub fn load(path: Option<&Path>) -> Result<SimConfig> {
    let file = match path {
        Some(path) => File::from(path).format(FileFormat::Ron).required(true),
        None => File::with_name(CONFIG_FILE)
            .format(FileFormat::Ron)
            .required(false),
    };

    let builder = with_defaults(Config::builder())?
        .add_source(file)
        .add_source(
            Environment::with_prefix("GEARWORKS")
                .prefix_separator("_")
                .separator("__"),
        );

    let config = builder.build().context("Failed to build configuration")?;
    let sim: SimConfig = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    log::debug!("Loaded configuration: {:?}", sim);
    Ok(sim)
}
