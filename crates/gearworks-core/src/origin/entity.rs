//! Entity types: gears, belts and the mesh relation between gears

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::KindName;

/// Unique identifier for entities in the origin store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Get the raw u64 value (useful for debugging/serialization)
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Create an EntityId from a raw u64
    pub fn from_raw(id: u64) -> Self {
        EntityId(id)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// A gear: a rigid disk that meshes with tangent neighbours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Gear {
    pub radius: f32,
    pub mass: f32,
    /// Authored motor speed (rad/s), only used when `anchored`
    #[serde(default)]
    pub angular_velocity: f32,
    /// Anchored gears drive their component at `angular_velocity` (0 = fixed)
    #[serde(default)]
    pub anchored: bool,
    /// Angular velocity imposed by the user while a force is held
    #[serde(default)]
    pub applied_force: Option<f32>,
    /// Rotational phase in radians, advanced by tick
    #[serde(default)]
    pub angle: f32,
    /// Meshed neighbours (kept symmetric by the store)
    #[serde(default)]
    pub connections: BTreeSet<EntityId>,
}

impl Gear {
    pub fn new(radius: f32, mass: f32) -> Self {
        Self {
            radius,
            mass,
            angular_velocity: 0.0,
            anchored: false,
            applied_force: None,
            angle: 0.0,
            connections: BTreeSet::new(),
        }
    }

    /// Builder: anchor this gear as a motor spinning at `angular_velocity`
    pub fn anchored(mut self, angular_velocity: f32) -> Self {
        self.anchored = true;
        self.angular_velocity = angular_velocity;
        self
    }

    /// Whether this gear imposes a velocity on its component
    pub fn is_driver(&self) -> bool {
        self.applied_force.is_some() || self.anchored
    }
}

/// An item riding on a belt at a normalised path fraction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BeltItem {
    /// Position along the belt path in [0, 1]
    pub position: f32,
}

/// A conveyor belt wrapped around two or more pulley gears
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Belt {
    /// Gear ids the belt wraps, in path order
    pub pulleys: Vec<EntityId>,
    /// Authored velocity, used when no pulley is driven
    #[serde(default)]
    pub velocity: f32,
    #[serde(default)]
    pub items: Vec<BeltItem>,
}

impl Belt {
    pub fn new(pulleys: Vec<EntityId>, velocity: f32) -> Self {
        Self {
            pulleys,
            velocity,
            items: Vec::new(),
        }
    }

    pub fn wraps(&self, gear: EntityId) -> bool {
        self.pulleys.contains(&gear)
    }
}

/// Kind-specific entity payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    Gear(Gear),
    Belt(Belt),
}

impl EntityKind {
    pub fn name(&self) -> KindName {
        match self {
            EntityKind::Gear(_) => KindName::Gear,
            EntityKind::Belt(_) => KindName::Belt,
        }
    }
}

/// An entity in the origin store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Entity {
    pub id: EntityId,
    pub position: Vec2,
    pub kind: EntityKind,
}

impl Entity {
    pub fn as_gear(&self) -> Option<&Gear> {
        match &self.kind {
            EntityKind::Gear(gear) => Some(gear),
            EntityKind::Belt(_) => None,
        }
    }

    pub fn as_belt(&self) -> Option<&Belt> {
        match &self.kind {
            EntityKind::Belt(belt) => Some(belt),
            EntityKind::Gear(_) => None,
        }
    }

    pub(crate) fn as_gear_mut(&mut self) -> Option<&mut Gear> {
        match &mut self.kind {
            EntityKind::Gear(gear) => Some(gear),
            EntityKind::Belt(_) => None,
        }
    }

    pub(crate) fn as_belt_mut(&mut self) -> Option<&mut Belt> {
        match &mut self.kind {
            EntityKind::Belt(belt) => Some(belt),
            EntityKind::Gear(_) => None,
        }
    }
}

/// Undirected mesh relation between two gears, normalised so `a < b`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub a: EntityId,
    pub b: EntityId,
}

impl Connection {
    pub fn new(a: EntityId, b: EntityId) -> Self {
        if a <= b { Self { a, b } } else { Self { a: b, b: a } }
    }

    pub fn involves(&self, id: EntityId) -> bool {
        self.a == id || self.b == id
    }
}
