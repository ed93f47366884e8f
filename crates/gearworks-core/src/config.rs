//! Simulation configuration
//!
//! Plain serde types with compiled defaults. Hosts layer file and environment
//! overrides on top (see the `gearworks` binary).

use serde::{Deserialize, Serialize};

/// Top-level configuration shared by the world, camera and interaction layers
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SimConfig {
    #[serde(default)]
    pub physics: PhysicsConfig,

    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub interaction: InteractionConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,
}

/// Geometric and propagation tolerances
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhysicsConfig {
    /// Allowed deviation between centre distance and radius sum for a mesh
    pub mesh_tolerance: f32,
    /// Relative tolerance before a cyclic component is flagged inconsistent
    pub cycle_tolerance: f32,
    /// Distance from tangency within which a placed gear snaps onto it
    pub snap_distance: f32,
    /// Absolute floor (rad/s) below which two driver speeds count as equal
    #[serde(default = "default_speed_epsilon")]
    pub speed_epsilon: f32,
}

fn default_speed_epsilon() -> f32 {
    1e-6
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            mesh_tolerance: 0.01,
            cycle_tolerance: 1e-4,
            snap_distance: 0.25,
            speed_epsilon: default_speed_epsilon(),
        }
    }
}

/// Camera/zoom settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CameraConfig {
    /// Multiplicative zoom factor per wheel step
    pub zoom_speed: f32,
    /// Minimum zoom level (max zoom out)
    pub min_zoom: f32,
    /// Maximum zoom level (max zoom in)
    pub max_zoom: f32,
    /// Zoom at session start
    pub initial_zoom: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            zoom_speed: 1.1,
            min_zoom: 0.1,
            max_zoom: 10.0,
            initial_zoom: 1.0,
        }
    }
}

/// Editing defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionConfig {
    /// Radius of gears placed in AddGear mode
    pub gear_radius: f32,
    /// Mass of gears placed in AddGear mode
    pub gear_mass: f32,
    /// Angular velocity imposed while ApplyForce is held (rad/s)
    pub force_velocity: f32,
    #[serde(default)]
    pub keys: KeyBindings,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            gear_radius: 1.0,
            gear_mass: 1.0,
            force_velocity: 2.0,
            keys: KeyBindings::default(),
        }
    }
}

/// Key-up bindings for mode selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyBindings {
    pub add_gear: char,
    pub sticky_add_gear: char,
    pub connect: char,
    pub apply_force: char,
    pub cancel: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            add_gear: 'g',
            sticky_add_gear: 'G',
            connect: 'c',
            apply_force: 'f',
            cancel: 'q',
        }
    }
}

/// Persistence throttling policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistenceConfig {
    /// Minimum interval between persisted camera writes
    pub camera_save_interval_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            camera_save_interval_ms: 500,
        }
    }
}

impl PersistenceConfig {
    pub fn camera_save_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.camera_save_interval_ms)
    }
}
