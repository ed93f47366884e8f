//! Simulation core for Gearworks
//!
//! This crate provides the gear and belt simulation:
//! - Authored origin state (Origin, Entity, Gear, Belt)
//! - Derived velocities, energy and validity (derive_world, Derived)
//! - Tick integration (World, tick_world)
//! - The editing state machine (Interaction, InputEvent, PointerMode)
//! - Camera, scene emission and RON documents
//! - Sessions with event subscriptions and throttled camera saves

pub mod camera;
pub mod config;
pub mod derive;
pub mod error;
pub mod interaction;
pub mod levels;
pub mod origin;
pub mod scene;
pub mod schema;
pub mod session;
pub mod world;

pub use camera::Camera;
pub use config::SimConfig;
pub use derive::{Derived, Validity, derive_world, gear_energy};
pub use error::{SimError, SimResult};
pub use interaction::{InputEvent, Interaction, PointerButton, PointerMode};
pub use origin::{Belt, BeltItem, Connection, Entity, EntityId, EntityKind, Gear, Origin};
pub use scene::{SceneDescription, emit_scene, emit_scene_with_overlay};
pub use session::{Session, SessionEvent, Subscription};
pub use world::{World, tick_world};
