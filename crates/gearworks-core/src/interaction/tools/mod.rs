//! Editing tools, one per pointer mode

mod connect;
mod force;
mod place;

pub use connect::Connector;
pub use force::ForceGrip;
pub use place::{GearPlacer, Preview};

use glam::Vec2;

use super::{OriginDelta, PointerButton};
use crate::config::InteractionConfig;
use crate::error::SimError;
use crate::world::World;

/// What a tool did with a pointer event
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResponse {
    /// Event had no effect
    Ignored,
    /// Tool state changed, nothing committed yet
    Pending,
    /// An edit was committed to origin
    Committed(OriginDelta),
    /// The attempted edit was discarded
    Rejected(SimError),
}

/// Trait for editing tools driven by pointer events in world coordinates
pub trait Tool {
    /// Tool display name
    fn name(&self) -> &str;

    fn pointer_down(
        &mut self,
        world: &mut World,
        point: Vec2,
        button: PointerButton,
        config: &InteractionConfig,
    ) -> ToolResponse;

    fn pointer_move(
        &mut self,
        _world: &World,
        _point: Vec2,
        _config: &InteractionConfig,
    ) -> ToolResponse {
        ToolResponse::Ignored
    }

    fn pointer_up(
        &mut self,
        _world: &mut World,
        _point: Vec2,
        _button: PointerButton,
        _config: &InteractionConfig,
    ) -> ToolResponse {
        ToolResponse::Ignored
    }

    /// Drop in-progress state, undoing any temporary origin effect
    fn cancel(&mut self, world: &mut World);
}
