//! Pointer and keyboard driven editing
//!
//! [`Interaction`] turns host input into origin edits and camera moves. Each
//! pointer mode delegates to a [`Tool`]; the machine owns mode transitions,
//! panning and zoom.

mod input;
mod machine;
pub mod tools;

pub use input::{InputEvent, PointerButton};
pub use machine::{Interaction, Outcome};
pub use tools::{Preview, Tool, ToolResponse};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::origin::{Connection, EntityId};

/// Active editing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PointerMode {
    #[default]
    Free,
    AddGear,
    Connect,
    ApplyForce,
}

impl fmt::Display for PointerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PointerMode::Free => "free",
            PointerMode::AddGear => "add gear",
            PointerMode::Connect => "connect",
            PointerMode::ApplyForce => "apply force",
        };
        f.write_str(name)
    }
}

/// Origin edit committed by an input event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OriginDelta {
    GearAdded(EntityId),
    Connected(Connection),
    ForceApplied { gear: EntityId, velocity: f32 },
    ForceReleased(EntityId),
}
