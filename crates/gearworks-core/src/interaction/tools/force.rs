//! Force tool - spins a gear while the pointer is held

use glam::Vec2;

use super::{Tool, ToolResponse};
use crate::config::InteractionConfig;
use crate::error::SimError;
use crate::interaction::{OriginDelta, PointerButton};
use crate::origin::EntityId;
use crate::world::World;

/// Holds a gear at an imposed angular velocity until release
#[derive(Debug, Default)]
pub struct ForceGrip {
    held: Option<EntityId>,
}

impl ForceGrip {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gear currently held
    pub fn held(&self) -> Option<EntityId> {
        self.held
    }

    fn release(&mut self, world: &mut World) -> ToolResponse {
        let Some(gear) = self.held.take() else {
            return ToolResponse::Ignored;
        };
        match world.edit(|o| o.set_applied_force(gear, None)) {
            Ok(()) => ToolResponse::Committed(OriginDelta::ForceReleased(gear)),
            // Gear was removed while held; nothing left to release
            Err(SimError::NotFound(_)) => ToolResponse::Ignored,
            Err(e) => ToolResponse::Rejected(e),
        }
    }
}

impl Tool for ForceGrip {
    fn name(&self) -> &str {
        "Apply force"
    }

    fn pointer_down(
        &mut self,
        world: &mut World,
        point: Vec2,
        button: PointerButton,
        config: &InteractionConfig,
    ) -> ToolResponse {
        let velocity = match button {
            PointerButton::Primary => config.force_velocity,
            PointerButton::Secondary => -config.force_velocity,
            PointerButton::Middle => return ToolResponse::Ignored,
        };
        let Some(gear) = world.origin().hit_test(point) else {
            return ToolResponse::Ignored;
        };

        self.release(world);
        match world.edit(|o| o.set_applied_force(gear, Some(velocity))) {
            Ok(()) => {
                self.held = Some(gear);
                ToolResponse::Committed(OriginDelta::ForceApplied { gear, velocity })
            }
            Err(e) => ToolResponse::Rejected(e),
        }
    }

    fn pointer_up(
        &mut self,
        world: &mut World,
        _point: Vec2,
        _button: PointerButton,
        _config: &InteractionConfig,
    ) -> ToolResponse {
        self.release(world)
    }

    fn cancel(&mut self, world: &mut World) {
        self.release(world);
    }
}
