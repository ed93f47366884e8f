//! Level definition and lookup

use super::demo_levels::*;
use crate::config::PhysicsConfig;
use crate::error::SimResult;
use crate::origin::Origin;
use crate::world::World;

/// A level definition with metadata and generator function
pub struct LevelDef {
    /// Lookup key used on the command line and in scenarios
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub generator: fn(&mut Origin) -> SimResult<()>,
}

impl LevelDef {
    /// Generate the level into a fresh world
    pub fn build(&self, physics: PhysicsConfig) -> SimResult<World> {
        let mut origin = Origin::new(physics);
        (self.generator)(&mut origin)?;
        log::info!(
            "Generated level '{}' with {} entities",
            self.key,
            origin.len()
        );
        Ok(World::new(origin))
    }
}

const LEVELS: &[LevelDef] = &[
    LevelDef {
        key: "empty",
        name: "Empty Canvas",
        description: "Nothing placed yet",
        generator: generate_empty,
    },
    LevelDef {
        key: "gear_train",
        name: "Gear Train",
        description: "A motor driving two meshed gears of different sizes",
        generator: generate_gear_train,
    },
    LevelDef {
        key: "belt_drive",
        name: "Belt Drive",
        description: "Two pulleys joined by a belt carrying items",
        generator: generate_belt_drive,
    },
    LevelDef {
        key: "jammed_triangle",
        name: "Jammed Triangle",
        description: "Three gears meshed in a ring, which cannot turn",
        generator: generate_jammed_triangle,
    },
];

/// All demo levels in menu order
pub fn levels() -> &'static [LevelDef] {
    LEVELS
}

pub fn find_level(key: &str) -> Option<&'static LevelDef> {
    LEVELS.iter().find(|level| level.key == key)
}
