//! Origin entity store - the authoritative, user-authored world graph
//!
//! Every mutating operation validates its inputs before touching the map, so a
//! failed call leaves the store (and its revision) unchanged.

use glam::Vec2;
use std::collections::BTreeMap;

use super::entity::{Belt, BeltItem, Connection, Entity, EntityId, EntityKind, Gear};
use crate::config::PhysicsConfig;
use crate::error::{ConnectionFault, KindName, SimError, SimResult};

/// Mapping from entity id to entity, plus id allocation and change tracking
#[derive(Debug, Clone, PartialEq)]
pub struct Origin {
    entities: BTreeMap<EntityId, Entity>,
    next_id: u64,
    /// Bumped on every successful mutation
    revision: u64,
    physics: PhysicsConfig,
}

impl Default for Origin {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

impl Origin {
    pub fn new(physics: PhysicsConfig) -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 1,
            revision: 0,
            physics,
        }
    }

    /// Rebuild a store from loaded parts, validating every invariant
    pub(crate) fn from_parts(
        entities: Vec<Entity>,
        next_id: u64,
        physics: PhysicsConfig,
    ) -> SimResult<Self> {
        let mut map = BTreeMap::new();
        for entity in entities {
            let id = entity.id;
            if map.insert(id, entity).is_some() {
                return Err(SimError::SchemaViolation(format!("duplicate id {}", id)));
            }
        }

        if let Some(max) = map.keys().next_back()
            && next_id <= max.raw()
        {
            return Err(SimError::SchemaViolation(format!(
                "next_id {} must exceed the largest id {}",
                next_id,
                max.raw()
            )));
        }

        let origin = Self {
            entities: map,
            next_id: next_id.max(1),
            revision: 0,
            physics,
        };
        origin
            .validate()
            .map_err(|e| SimError::SchemaViolation(e.to_string()))?;
        Ok(origin)
    }

    pub fn physics(&self) -> &PhysicsConfig {
        &self.physics
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities in id order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// All gears in id order, with their positions
    pub fn gears(&self) -> impl Iterator<Item = (EntityId, Vec2, &Gear)> {
        self.entities
            .values()
            .filter_map(|e| e.as_gear().map(|g| (e.id, e.position, g)))
    }

    /// All belts in id order
    pub fn belts(&self) -> impl Iterator<Item = (EntityId, &Belt)> {
        self.entities
            .values()
            .filter_map(|e| e.as_belt().map(|b| (e.id, b)))
    }

    /// Every mesh connection exactly once, normalised and sorted
    pub fn connections(&self) -> impl Iterator<Item = Connection> + '_ {
        self.gears().flat_map(|(id, _, gear)| {
            gear.connections
                .iter()
                .filter(move |other| **other > id)
                .map(move |other| Connection::new(id, *other))
        })
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Look up a gear and its position
    pub fn gear(&self, id: EntityId) -> SimResult<(Vec2, &Gear)> {
        let entity = self.entities.get(&id).ok_or(SimError::NotFound(id))?;
        entity
            .as_gear()
            .map(|g| (entity.position, g))
            .ok_or(SimError::KindMismatch {
                id,
                expected: KindName::Gear,
            })
    }

    pub fn belt(&self, id: EntityId) -> SimResult<&Belt> {
        let entity = self.entities.get(&id).ok_or(SimError::NotFound(id))?;
        entity.as_belt().ok_or(SimError::KindMismatch {
            id,
            expected: KindName::Belt,
        })
    }

    /// Insert a new entity, assigning it a fresh id
    pub fn insert(&mut self, position: Vec2, kind: EntityKind) -> SimResult<EntityId> {
        if !position.is_finite() {
            return Err(SimError::InvalidEntity("position must be finite".into()));
        }
        match &kind {
            EntityKind::Gear(gear) => {
                validate_gear(gear)?;
                if !gear.connections.is_empty() {
                    return Err(SimError::InvalidEntity(
                        "new gears must be meshed through connect".into(),
                    ));
                }
            }
            EntityKind::Belt(belt) => self.validate_belt(belt)?,
        }

        let id = EntityId::from_raw(self.next_id);
        self.next_id += 1;
        self.entities.insert(id, Entity { id, position, kind });
        self.revision += 1;
        log::debug!("Inserted {}", id);
        Ok(id)
    }

    pub fn insert_gear(&mut self, position: Vec2, radius: f32, mass: f32) -> SimResult<EntityId> {
        self.insert(position, EntityKind::Gear(Gear::new(radius, mass)))
    }

    /// Insert a belt positioned at the centroid of its pulleys
    pub fn insert_belt(&mut self, pulleys: Vec<EntityId>, velocity: f32) -> SimResult<EntityId> {
        let belt = Belt::new(pulleys, velocity);
        self.validate_belt(&belt)?;
        let sum: Vec2 = belt
            .pulleys
            .iter()
            .filter_map(|p| self.get(*p).map(|e| e.position))
            .sum();
        let centroid = sum / belt.pulleys.len() as f32;
        self.insert(centroid, EntityKind::Belt(belt))
    }

    /// Remove an entity.
    ///
    /// Removing a gear also unmeshes it from its neighbours and removes every
    /// belt wrapping it, so no reference is left dangling.
    pub fn remove(&mut self, id: EntityId) -> SimResult<Entity> {
        let entity = self.entities.get(&id).ok_or(SimError::NotFound(id))?;

        if let Some(gear) = entity.as_gear() {
            let neighbours: Vec<EntityId> = gear.connections.iter().copied().collect();
            let belts: Vec<EntityId> = self
                .belts()
                .filter(|(_, belt)| belt.wraps(id))
                .map(|(belt_id, _)| belt_id)
                .collect();

            for neighbour in neighbours {
                if let Some(g) = self.entities.get_mut(&neighbour).and_then(Entity::as_gear_mut) {
                    g.connections.remove(&id);
                }
            }
            for belt_id in belts {
                self.entities.remove(&belt_id);
                log::info!("Removed {} along with its pulley {}", belt_id, id);
            }
        }

        let removed = self.entities.remove(&id).ok_or(SimError::NotFound(id))?;
        self.revision += 1;
        log::debug!("Removed {}", id);
        Ok(removed)
    }

    /// Mesh two tangent gears
    pub fn connect(&mut self, a: EntityId, b: EntityId) -> SimResult<()> {
        let fault = |reason| SimError::InvalidConnection { a, b, reason };

        if a == b {
            return Err(fault(ConnectionFault::SelfConnection));
        }
        let (pa, ga) = self.mesh_endpoint(a).map_err(|e| remap_kind(e, fault))?;
        let (pb, gb) = self.mesh_endpoint(b).map_err(|e| remap_kind(e, fault))?;

        if ga.connections.contains(&b) {
            return Err(fault(ConnectionFault::AlreadyConnected));
        }

        let distance = pa.distance(pb);
        let expected = ga.radius + gb.radius;
        if (distance - expected).abs() > self.physics.mesh_tolerance {
            return Err(fault(ConnectionFault::NotTangent { distance, expected }));
        }

        self.link(a, b);
        self.revision += 1;
        log::debug!("Meshed {} <-> {}", a, b);
        Ok(())
    }

    /// Unmesh two gears
    pub fn disconnect(&mut self, a: EntityId, b: EntityId) -> SimResult<()> {
        let (_, ga) = self.gear(a)?;
        self.gear(b)?;
        if !ga.connections.contains(&b) {
            return Err(SimError::NotFound(b));
        }

        for (from, to) in [(a, b), (b, a)] {
            if let Some(g) = self.entities.get_mut(&from).and_then(Entity::as_gear_mut) {
                g.connections.remove(&to);
            }
        }
        self.revision += 1;
        log::debug!("Unmeshed {} <-> {}", a, b);
        Ok(())
    }

    /// Add an item to a belt at `position` (clamped into [0, 1])
    pub fn add_belt_item(&mut self, belt_id: EntityId, position: f32) -> SimResult<()> {
        self.belt(belt_id)?;
        if !position.is_finite() {
            return Err(SimError::InvalidEntity("item position must be finite".into()));
        }
        let position = position.clamp(0.0, 1.0);

        let belt = self.belt_mut(belt_id)?;
        let index = belt.items.partition_point(|item| item.position <= position);
        belt.items.insert(index, BeltItem { position });
        self.revision += 1;
        Ok(())
    }

    /// Set or clear the user-imposed angular velocity on a gear
    pub fn set_applied_force(&mut self, gear_id: EntityId, force: Option<f32>) -> SimResult<()> {
        if let Some(f) = force
            && !f.is_finite()
        {
            return Err(SimError::InvalidEntity("force must be finite".into()));
        }
        let gear = self.gear_mut(gear_id)?;
        gear.applied_force = force;
        self.revision += 1;
        Ok(())
    }

    /// Anchor a gear as a motor, or release it
    pub fn set_anchored(
        &mut self,
        gear_id: EntityId,
        anchored: bool,
        angular_velocity: f32,
    ) -> SimResult<()> {
        if !angular_velocity.is_finite() {
            return Err(SimError::InvalidEntity("angular velocity must be finite".into()));
        }
        let gear = self.gear_mut(gear_id)?;
        gear.anchored = anchored;
        gear.angular_velocity = angular_velocity;
        self.revision += 1;
        Ok(())
    }

    /// First gear a candidate of `radius` at `position` would penetrate.
    ///
    /// Tangent (within mesh tolerance) and separate placements are allowed.
    pub fn placement_conflict(&self, position: Vec2, radius: f32) -> Option<EntityId> {
        self.gears()
            .find(|(_, center, gear)| {
                center.distance(position) < gear.radius + radius - self.physics.mesh_tolerance
            })
            .map(|(id, _, _)| id)
    }

    /// Move a candidate onto exact tangency with the gear it nearly touches.
    pub fn snap_to_tangent(&self, position: Vec2, radius: f32) -> Vec2 {
        let mut best: Option<(f32, Vec2)> = None;

        for (_, center, gear) in self.gears() {
            let offset = position - center;
            let distance = offset.length();
            if distance <= f32::EPSILON {
                continue;
            }
            let target = gear.radius + radius;
            let error = (distance - target).abs();
            if error > self.physics.snap_distance {
                continue;
            }
            if best.is_none_or(|(e, _)| error < e) {
                best = Some((error, center + offset / distance * target));
            }
        }

        best.map(|(_, snapped)| snapped).unwrap_or(position)
    }

    /// Gear whose disk contains `point`, nearest centre first
    pub fn hit_test(&self, point: Vec2) -> Option<EntityId> {
        self.gears()
            .filter(|(_, center, gear)| center.distance(point) <= gear.radius)
            .min_by(|(_, a, _), (_, b, _)| a.distance(point).total_cmp(&b.distance(point)))
            .map(|(id, _, _)| id)
    }

    /// Check every structural invariant of the store
    pub fn validate(&self) -> SimResult<()> {
        for entity in self.entities.values() {
            if !entity.position.is_finite() {
                return Err(SimError::InvalidEntity(format!(
                    "{} has a non-finite position",
                    entity.id
                )));
            }
            match &entity.kind {
                EntityKind::Gear(gear) => {
                    validate_gear(gear)?;
                    for other in &gear.connections {
                        self.validate_link(entity.id, entity.position, gear, *other)?;
                    }
                }
                EntityKind::Belt(belt) => self.validate_belt(belt)?,
            }
        }
        Ok(())
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// Record a change made through `iter_mut`
    pub(crate) fn touch(&mut self) {
        self.revision += 1;
    }

    fn gear_mut(&mut self, id: EntityId) -> SimResult<&mut Gear> {
        let entity = self.entities.get_mut(&id).ok_or(SimError::NotFound(id))?;
        entity.as_gear_mut().ok_or(SimError::KindMismatch {
            id,
            expected: KindName::Gear,
        })
    }

    fn belt_mut(&mut self, id: EntityId) -> SimResult<&mut Belt> {
        let entity = self.entities.get_mut(&id).ok_or(SimError::NotFound(id))?;
        entity.as_belt_mut().ok_or(SimError::KindMismatch {
            id,
            expected: KindName::Belt,
        })
    }

    fn mesh_endpoint(&self, id: EntityId) -> SimResult<(Vec2, &Gear)> {
        self.gear(id)
    }

    fn link(&mut self, a: EntityId, b: EntityId) {
        for (from, to) in [(a, b), (b, a)] {
            if let Some(g) = self.entities.get_mut(&from).and_then(Entity::as_gear_mut) {
                g.connections.insert(to);
            }
        }
    }

    fn validate_link(
        &self,
        id: EntityId,
        position: Vec2,
        gear: &Gear,
        other: EntityId,
    ) -> SimResult<()> {
        let fault = |reason| SimError::InvalidConnection {
            a: id,
            b: other,
            reason,
        };
        if other == id {
            return Err(fault(ConnectionFault::SelfConnection));
        }
        let (other_pos, other_gear) = self.gear(other).map_err(|e| remap_kind(e, fault))?;
        if !other_gear.connections.contains(&id) {
            return Err(SimError::InvalidEntity(format!(
                "connection {} -> {} is not symmetric",
                id, other
            )));
        }
        let distance = position.distance(other_pos);
        let expected = gear.radius + other_gear.radius;
        if (distance - expected).abs() > self.physics.mesh_tolerance {
            return Err(fault(ConnectionFault::NotTangent { distance, expected }));
        }
        Ok(())
    }

    fn validate_belt(&self, belt: &Belt) -> SimResult<()> {
        if belt.pulleys.len() < 2 {
            return Err(SimError::InvalidEntity(
                "a belt needs at least two pulleys".into(),
            ));
        }
        for (i, pulley) in belt.pulleys.iter().enumerate() {
            if belt.pulleys[..i].contains(pulley) {
                return Err(SimError::InvalidEntity(format!(
                    "pulley {} listed twice",
                    pulley
                )));
            }
            self.gear(*pulley)?;
        }
        if !belt.velocity.is_finite() {
            return Err(SimError::InvalidEntity("belt velocity must be finite".into()));
        }
        if belt
            .items
            .iter()
            .any(|item| !(0.0..=1.0).contains(&item.position))
        {
            return Err(SimError::InvalidEntity(
                "belt item positions must lie in [0, 1]".into(),
            ));
        }
        if belt
            .items
            .windows(2)
            .any(|pair| pair[0].position > pair[1].position)
        {
            return Err(SimError::InvalidEntity(
                "belt items must be sorted by position".into(),
            ));
        }
        Ok(())
    }
}

fn validate_gear(gear: &Gear) -> SimResult<()> {
    if !(gear.radius.is_finite() && gear.radius > 0.0) {
        return Err(SimError::InvalidEntity(format!(
            "gear radius must be positive, got {}",
            gear.radius
        )));
    }
    if !(gear.mass.is_finite() && gear.mass > 0.0) {
        return Err(SimError::InvalidEntity(format!(
            "gear mass must be positive, got {}",
            gear.mass
        )));
    }
    let finite = gear.angular_velocity.is_finite()
        && gear.angle.is_finite()
        && gear.applied_force.is_none_or(f32::is_finite);
    if !finite {
        return Err(SimError::InvalidEntity("gear state must be finite".into()));
    }
    Ok(())
}

/// A non-gear mesh endpoint is a connection fault, not a kind error
fn remap_kind(err: SimError, fault: impl Fn(ConnectionFault) -> SimError) -> SimError {
    match err {
        SimError::KindMismatch { .. } => fault(ConnectionFault::NotAGear),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tangent_gears() -> (Origin, EntityId, EntityId) {
        let mut origin = Origin::default();
        let a = origin.insert_gear(Vec2::ZERO, 1.0, 1.0).unwrap();
        let b = origin.insert_gear(Vec2::new(3.0, 0.0), 2.0, 1.0).unwrap();
        (origin, a, b)
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let (origin, a, b) = two_tangent_gears();
        assert_eq!(a.raw(), 1);
        assert_eq!(b.raw(), 2);
        assert_eq!(origin.len(), 2);
        assert_eq!(origin.revision(), 2);
    }

    #[test]
    fn test_insert_rejects_bad_gear() {
        let mut origin = Origin::default();
        assert!(matches!(
            origin.insert_gear(Vec2::ZERO, 0.0, 1.0),
            Err(SimError::InvalidEntity(_))
        ));
        assert!(matches!(
            origin.insert_gear(Vec2::ZERO, 1.0, -1.0),
            Err(SimError::InvalidEntity(_))
        ));
        assert!(origin.is_empty());
        assert_eq!(origin.revision(), 0);
    }

    #[test]
    fn test_connect_tangent_gears() {
        let (mut origin, a, b) = two_tangent_gears();
        origin.connect(a, b).unwrap();

        let conns: Vec<Connection> = origin.connections().collect();
        assert_eq!(conns, vec![Connection::new(a, b)]);
        assert!(origin.gear(b).unwrap().1.connections.contains(&a));
    }

    #[test]
    fn test_connect_rejects_non_tangent() {
        let mut origin = Origin::default();
        let a = origin.insert_gear(Vec2::ZERO, 1.0, 1.0).unwrap();
        let b = origin.insert_gear(Vec2::new(5.0, 0.0), 1.0, 1.0).unwrap();
        let before = origin.clone();

        let err = origin.connect(a, b).unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidConnection {
                reason: ConnectionFault::NotTangent { .. },
                ..
            }
        ));
        assert_eq!(origin, before);
        assert_eq!(origin.connections().count(), 0);
    }

    #[test]
    fn test_connect_faults() {
        let (mut origin, a, b) = two_tangent_gears();
        let belt = origin.insert_belt(vec![a, b], 0.0).unwrap();
        let missing = EntityId::from_raw(99);

        assert!(matches!(
            origin.connect(a, a),
            Err(SimError::InvalidConnection {
                reason: ConnectionFault::SelfConnection,
                ..
            })
        ));
        assert!(matches!(
            origin.connect(a, belt),
            Err(SimError::InvalidConnection {
                reason: ConnectionFault::NotAGear,
                ..
            })
        ));
        assert_eq!(origin.connect(a, missing), Err(SimError::NotFound(missing)));

        origin.connect(a, b).unwrap();
        assert!(matches!(
            origin.connect(b, a),
            Err(SimError::InvalidConnection {
                reason: ConnectionFault::AlreadyConnected,
                ..
            })
        ));
    }

    #[test]
    fn test_remove_gear_cascades() {
        let (mut origin, a, b) = two_tangent_gears();
        let c = origin.insert_gear(Vec2::new(-2.0, 0.0), 1.0, 1.0).unwrap();
        origin.connect(a, b).unwrap();
        origin.connect(a, c).unwrap();
        let belt = origin.insert_belt(vec![b, c], 0.5).unwrap();

        origin.remove(a).unwrap();

        assert!(!origin.contains(a));
        assert!(origin.contains(belt));
        assert!(origin.gear(b).unwrap().1.connections.is_empty());
        assert!(origin.validate().is_ok());

        origin.remove(b).unwrap();
        assert!(!origin.contains(belt));
        assert!(origin.validate().is_ok());
    }

    #[test]
    fn test_remove_missing() {
        let mut origin = Origin::default();
        let id = EntityId::from_raw(4);
        assert_eq!(origin.remove(id), Err(SimError::NotFound(id)));
    }

    #[test]
    fn test_insert_belt_validation() {
        let (mut origin, a, b) = two_tangent_gears();
        assert!(matches!(
            origin.insert_belt(vec![a], 1.0),
            Err(SimError::InvalidEntity(_))
        ));
        assert!(matches!(
            origin.insert_belt(vec![a, a], 1.0),
            Err(SimError::InvalidEntity(_))
        ));
        let missing = EntityId::from_raw(42);
        assert_eq!(
            origin.insert_belt(vec![a, missing], 1.0),
            Err(SimError::NotFound(missing))
        );

        let belt = origin.insert_belt(vec![a, b], 1.0).unwrap();
        assert_eq!(origin.get(belt).unwrap().position, Vec2::new(1.5, 0.0));
    }

    #[test]
    fn test_insert_rejects_unsorted_belt_items() {
        let (mut origin, a, b) = two_tangent_gears();
        let revision = origin.revision();
        let mut belt = Belt::new(vec![a, b], 1.0);
        belt.items = vec![BeltItem { position: 0.8 }, BeltItem { position: 0.3 }];

        assert!(matches!(
            origin.insert(Vec2::ZERO, EntityKind::Belt(belt)),
            Err(SimError::InvalidEntity(_))
        ));
        assert_eq!(origin.belts().count(), 0);
        assert_eq!(origin.revision(), revision);
    }

    #[test]
    fn test_add_belt_item_sorted_and_clamped() {
        let (mut origin, a, b) = two_tangent_gears();
        let belt = origin.insert_belt(vec![a, b], 1.0).unwrap();

        origin.add_belt_item(belt, 0.7).unwrap();
        origin.add_belt_item(belt, 0.2).unwrap();
        origin.add_belt_item(belt, 3.0).unwrap();

        let positions: Vec<f32> = origin
            .belt(belt)
            .unwrap()
            .items
            .iter()
            .map(|i| i.position)
            .collect();
        assert_eq!(positions, vec![0.2, 0.7, 1.0]);
    }

    #[test]
    fn test_add_belt_item_not_found() {
        let (mut origin, a, _) = two_tangent_gears();
        let missing = EntityId::from_raw(77);
        assert_eq!(
            origin.add_belt_item(missing, 0.5),
            Err(SimError::NotFound(missing))
        );
        assert!(matches!(
            origin.add_belt_item(a, 0.5),
            Err(SimError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_placement_conflict_allows_tangency() {
        let (origin, a, _) = two_tangent_gears();
        assert_eq!(origin.placement_conflict(Vec2::new(0.5, 0.0), 1.0), Some(a));
        assert_eq!(origin.placement_conflict(Vec2::new(0.0, 2.0), 1.0), None);
        assert_eq!(origin.placement_conflict(Vec2::new(0.0, 10.0), 1.0), None);
    }

    #[test]
    fn test_snap_to_tangent() {
        let (origin, _, _) = two_tangent_gears();
        let snapped = origin.snap_to_tangent(Vec2::new(0.0, 2.1), 1.0);
        assert!((snapped - Vec2::new(0.0, 2.0)).length() < 1e-5);

        let far = Vec2::new(0.0, 8.0);
        assert_eq!(origin.snap_to_tangent(far, 1.0), far);
    }

    #[test]
    fn test_hit_test() {
        let (origin, a, b) = two_tangent_gears();
        assert_eq!(origin.hit_test(Vec2::new(0.2, 0.1)), Some(a));
        assert_eq!(origin.hit_test(Vec2::new(3.5, 0.0)), Some(b));
        assert_eq!(origin.hit_test(Vec2::new(0.0, 9.0)), None);
    }

    #[test]
    fn test_disconnect() {
        let (mut origin, a, b) = two_tangent_gears();
        origin.connect(a, b).unwrap();
        origin.disconnect(b, a).unwrap();
        assert_eq!(origin.connections().count(), 0);
        assert_eq!(origin.disconnect(a, b), Err(SimError::NotFound(b)));
    }

    #[test]
    fn test_applied_force_and_anchor() {
        let (mut origin, a, _) = two_tangent_gears();
        origin.set_applied_force(a, Some(1.5)).unwrap();
        assert_eq!(origin.gear(a).unwrap().1.applied_force, Some(1.5));
        origin.set_applied_force(a, None).unwrap();
        assert_eq!(origin.gear(a).unwrap().1.applied_force, None);

        origin.set_anchored(a, true, -2.0).unwrap();
        let (_, gear) = origin.gear(a).unwrap();
        assert!(gear.anchored);
        assert_eq!(gear.angular_velocity, -2.0);
    }
}
