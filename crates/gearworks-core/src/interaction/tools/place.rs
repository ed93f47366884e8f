//! Gear placement tool

use glam::Vec2;

use super::{Tool, ToolResponse};
use crate::config::InteractionConfig;
use crate::error::SimError;
use crate::interaction::{OriginDelta, PointerButton};
use crate::origin::{EntityId, Origin};
use crate::world::World;

/// Candidate gear shown while the pointer is held in AddGear mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preview {
    pub position: Vec2,
    pub radius: f32,
    /// Gear the candidate would penetrate, if any
    pub conflict: Option<EntityId>,
}

impl Preview {
    fn at(origin: &Origin, point: Vec2, radius: f32) -> Self {
        let position = origin.snap_to_tangent(point, radius);
        Self {
            position,
            radius,
            conflict: origin.placement_conflict(position, radius),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.conflict.is_none()
    }
}

/// Places gears: preview on pointer-down, commit on pointer-up
#[derive(Debug, Default)]
pub struct GearPlacer {
    preview: Option<Preview>,
}

impl GearPlacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }
}

impl Tool for GearPlacer {
    fn name(&self) -> &str {
        "Add gear"
    }

    fn pointer_down(
        &mut self,
        world: &mut World,
        point: Vec2,
        button: PointerButton,
        config: &InteractionConfig,
    ) -> ToolResponse {
        if button != PointerButton::Primary {
            return ToolResponse::Ignored;
        }
        self.preview = Some(Preview::at(world.origin(), point, config.gear_radius));
        ToolResponse::Pending
    }

    fn pointer_move(
        &mut self,
        world: &World,
        point: Vec2,
        config: &InteractionConfig,
    ) -> ToolResponse {
        if self.preview.is_none() {
            return ToolResponse::Ignored;
        }
        self.preview = Some(Preview::at(world.origin(), point, config.gear_radius));
        ToolResponse::Pending
    }

    fn pointer_up(
        &mut self,
        world: &mut World,
        point: Vec2,
        button: PointerButton,
        config: &InteractionConfig,
    ) -> ToolResponse {
        if button != PointerButton::Primary || self.preview.take().is_none() {
            return ToolResponse::Ignored;
        }

        let candidate = Preview::at(world.origin(), point, config.gear_radius);
        if let Some(with) = candidate.conflict {
            return ToolResponse::Rejected(SimError::PlacementOverlap { with });
        }

        match world.edit(|o| o.insert_gear(candidate.position, candidate.radius, config.gear_mass)) {
            Ok(id) => ToolResponse::Committed(OriginDelta::GearAdded(id)),
            Err(e) => ToolResponse::Rejected(e),
        }
    }

    fn cancel(&mut self, _world: &mut World) {
        self.preview = None;
    }
}
