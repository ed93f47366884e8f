//! Scene description - backend-agnostic render data for a world snapshot
//!
//! Backends draw primitives in order: belts, connection indicators, gears,
//! then the editing overlay. All positions are in world space; `view` and
//! `projection` map them to screen and clip space.

use glam::{Mat3, Mat4, Vec2};
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::derive::{Drive, Validity};
use crate::interaction::Interaction;
use crate::origin::EntityId;
use crate::world::World;

/// Colour class of a gear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GearVisual {
    Idle,
    Driven,
    Forced,
    Anchored,
    Inconsistent,
}

impl GearVisual {
    fn classify(drive: Drive, validity: Validity) -> Self {
        if !validity.is_valid() {
            return GearVisual::Inconsistent;
        }
        match drive {
            Drive::Idle => GearVisual::Idle,
            Drive::Driven => GearVisual::Driven,
            Drive::Forced => GearVisual::Forced,
            Drive::Anchored => GearVisual::Anchored,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    GearCircle {
        entity: EntityId,
        center: Vec2,
        radius: f32,
        /// Rotational phase for drawing teeth or a marker
        angle: f32,
        energy: f32,
        visual: GearVisual,
    },
    BeltPath {
        entity: EntityId,
        /// Pulley centres in belt order
        points: Vec<Vec2>,
        /// World position of each item along the path
        items: Vec<Vec2>,
        validity: Validity,
    },
    ConnectionIndicator {
        a: EntityId,
        b: EntityId,
        from: Vec2,
        to: Vec2,
        validity: Validity,
    },
    /// Candidate gear while placing
    Preview {
        center: Vec2,
        radius: f32,
        valid: bool,
    },
    /// Highlighted gear (connect source or held gear)
    Selection {
        entity: EntityId,
        center: Vec2,
        radius: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    /// World -> screen
    pub view: Mat3,
    /// World -> clip
    pub projection: Mat4,
    pub primitives: Vec<Primitive>,
}

impl SceneDescription {
    pub fn gear_count(&self) -> usize {
        self.primitives
            .iter()
            .filter(|p| matches!(p, Primitive::GearCircle { .. }))
            .count()
    }
}

/// Build the scene for `world` as seen through `camera`
pub fn emit_scene(world: &World, camera: &Camera) -> SceneDescription {
    let origin = world.origin();
    let derived = world.derived();
    let mut primitives = Vec::new();

    for (id, belt) in origin.belts() {
        let points: Vec<Vec2> = belt
            .pulleys
            .iter()
            .filter_map(|p| origin.gear(*p).ok().map(|(center, _)| center))
            .collect();
        let items = belt
            .items
            .iter()
            .map(|item| point_along(&points, item.position))
            .collect();
        let validity = derived.belt(id).map_or(Validity::Valid, |s| s.validity);
        primitives.push(Primitive::BeltPath {
            entity: id,
            points,
            items,
            validity,
        });
    }

    for conn in origin.connections() {
        let (Ok((from, _)), Ok((to, _))) = (origin.gear(conn.a), origin.gear(conn.b)) else {
            continue;
        };
        primitives.push(Primitive::ConnectionIndicator {
            a: conn.a,
            b: conn.b,
            from,
            to,
            validity: derived.connection(conn).unwrap_or(Validity::Inconsistent),
        });
    }

    for (id, center, gear) in origin.gears() {
        let state = derived.gear(id).copied().unwrap_or_default();
        primitives.push(Primitive::GearCircle {
            entity: id,
            center,
            radius: gear.radius,
            angle: gear.angle,
            energy: state.energy,
            visual: GearVisual::classify(state.drive, state.validity),
        });
    }

    SceneDescription {
        view: camera.view_matrix(),
        projection: camera.projection_matrix(),
        primitives,
    }
}

/// [`emit_scene`] plus the interaction overlay: placement preview and selections
pub fn emit_scene_with_overlay(
    world: &World,
    camera: &Camera,
    interaction: &Interaction,
) -> SceneDescription {
    let mut scene = emit_scene(world, camera);

    if let Some(preview) = interaction.preview() {
        scene.primitives.push(Primitive::Preview {
            center: preview.position,
            radius: preview.radius,
            valid: preview.is_valid(),
        });
    }

    for entity in [interaction.connect_source(), interaction.held_gear()]
        .into_iter()
        .flatten()
    {
        if let Ok((center, gear)) = world.origin().gear(entity) {
            scene.primitives.push(Primitive::Selection {
                entity,
                center,
                radius: gear.radius,
            });
        }
    }

    scene
}

/// Point at `fraction` of the total arc length of an open polyline
fn point_along(points: &[Vec2], fraction: f32) -> Vec2 {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Vec2::ZERO;
    };
    let total: f32 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
    if total <= f32::EPSILON {
        return *first;
    }

    let mut remaining = fraction.clamp(0.0, 1.0) * total;
    for w in points.windows(2) {
        let length = w[0].distance(w[1]);
        if remaining <= length {
            return w[0].lerp(w[1], remaining / length.max(f32::EPSILON));
        }
        remaining -= length;
    }
    *last
}
