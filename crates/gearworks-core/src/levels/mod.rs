//! Seeded demo worlds

mod demo_levels;
mod level_def;

pub use level_def::{LevelDef, find_level, levels};
