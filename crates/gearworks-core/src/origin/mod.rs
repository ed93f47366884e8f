//! Origin state - gears, belts and the entity store

mod entity;
mod store;

pub use entity::{Belt, BeltItem, Connection, Entity, EntityId, EntityKind, Gear};
pub use store::Origin;
