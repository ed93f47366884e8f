//! Derived state - velocities, energy and validity computed from origin
//!
//! Derivation is a pure function of the origin store. Gears are nodes of an
//! undirected graph whose edges are meshes (direction inverts) and belt spans
//! between consecutive pulleys (direction preserved). Each connected component
//! is traversed breadth-first from its lowest id with a unit reference speed;
//! the component's drivers then fix the actual scale.

use ahash::AHashMap;
use petgraph::graphmap::UnGraphMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::origin::{Connection, EntityId, Gear, Origin};

/// Whether a derived entry can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Validity {
    #[default]
    Valid,
    /// The component's constraints contradict each other (e.g. odd mesh cycle)
    Inconsistent,
}

impl Validity {
    pub fn is_valid(self) -> bool {
        self == Validity::Valid
    }
}

/// How a gear's angular velocity came about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Drive {
    /// Component has no driver
    #[default]
    Idle,
    /// Turned by a neighbour
    Driven,
    /// Held by the user
    Forced,
    /// Motor or fixed gear
    Anchored,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GearState {
    pub angular_velocity: f32,
    pub energy: f32,
    pub drive: Drive,
    /// Index into [`Derived::components`]
    pub component: usize,
    pub validity: Validity,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BeltState {
    pub velocity: f32,
    /// Pulley whose rim speed sets the belt, if any
    pub driven_by: Option<EntityId>,
    pub validity: Validity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentState {
    /// Member gears in id order
    pub members: Vec<EntityId>,
    /// Driver that fixed the component's speed
    pub reference: Option<EntityId>,
    pub validity: Validity,
}

/// Projection of an [`Origin`] snapshot
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Derived {
    revision: u64,
    gears: BTreeMap<EntityId, GearState>,
    belts: BTreeMap<EntityId, BeltState>,
    connections: BTreeMap<Connection, Validity>,
    components: Vec<ComponentState>,
    total_energy: f32,
}

impl Derived {
    /// Origin revision this projection was computed from
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_current(&self, origin: &Origin) -> bool {
        self.revision == origin.revision()
    }

    pub fn gear(&self, id: EntityId) -> Option<&GearState> {
        self.gears.get(&id)
    }

    pub fn belt(&self, id: EntityId) -> Option<&BeltState> {
        self.belts.get(&id)
    }

    pub fn connection(&self, connection: Connection) -> Option<Validity> {
        self.connections.get(&connection).copied()
    }

    pub fn gears(&self) -> impl Iterator<Item = (EntityId, &GearState)> {
        self.gears.iter().map(|(id, state)| (*id, state))
    }

    pub fn belts(&self) -> impl Iterator<Item = (EntityId, &BeltState)> {
        self.belts.iter().map(|(id, state)| (*id, state))
    }

    pub fn components(&self) -> &[ComponentState] {
        &self.components
    }

    pub fn total_energy(&self) -> f32 {
        self.total_energy
    }

    /// True when no component is flagged inconsistent
    pub fn is_consistent(&self) -> bool {
        self.components.iter().all(|c| c.validity.is_valid())
    }
}

/// Rotational kinetic energy of a gear: `E = 1/4 * r^2 * w^2 * m`
pub fn gear_energy(radius: f32, angular_velocity: f32, mass: f32) -> f32 {
    0.25 * radius * radius * angular_velocity * angular_velocity * mass
}

/// Edge kinds of the propagation graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Mesh,
    Belt,
    /// Pair is both meshed and belted, which cannot turn consistently
    Conflict,
}

impl Link {
    fn sign(self) -> f32 {
        match self {
            Link::Mesh => -1.0,
            Link::Belt | Link::Conflict => 1.0,
        }
    }
}

/// Purely relative comparison; speed ratios are never zero since radii are positive
fn ratios_agree(a: f32, b: f32, tolerance: f32) -> bool {
    (a - b).abs() <= tolerance * a.abs().max(b.abs())
}

/// Relative comparison of driver speeds with an absolute floor near zero
fn speeds_agree(a: f32, b: f32, tolerance: f32, epsilon: f32) -> bool {
    (a - b).abs() <= (tolerance * a.abs().max(b.abs())).max(epsilon)
}

fn build_graph(origin: &Origin) -> UnGraphMap<EntityId, Link> {
    let mut graph = UnGraphMap::new();
    for (id, _, _) in origin.gears() {
        graph.add_node(id);
    }
    for conn in origin.connections() {
        graph.add_edge(conn.a, conn.b, Link::Mesh);
    }
    for (_, belt) in origin.belts() {
        for span in belt.pulleys.windows(2) {
            let link = match graph.edge_weight(span[0], span[1]) {
                Some(Link::Mesh) | Some(Link::Conflict) => Link::Conflict,
                _ => Link::Belt,
            };
            graph.add_edge(span[0], span[1], link);
        }
    }
    graph
}

/// Speed ratios of one component relative to its first member
struct Traversal {
    members: Vec<EntityId>,
    ratios: AHashMap<EntityId, f32>,
    consistent: bool,
}

fn traverse(
    graph: &UnGraphMap<EntityId, Link>,
    gears: &AHashMap<EntityId, &Gear>,
    start: EntityId,
    tolerance: f32,
) -> Traversal {
    let mut ratios = AHashMap::new();
    let mut members = vec![start];
    let mut queue = VecDeque::new();
    let mut consistent = true;

    ratios.insert(start, 1.0_f32);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        let k = ratios[&current];
        let r = gears[&current].radius;

        for (a, b, link) in graph.edges(current) {
            let next = if a == current { b } else { a };
            let implied = link.sign() * k * r / gears[&next].radius;

            match ratios.get(&next) {
                Some(existing) => {
                    // Revisit: never re-enqueued, only checked while still consistent
                    if consistent
                        && (*link == Link::Conflict || !ratios_agree(*existing, implied, tolerance))
                    {
                        consistent = false;
                    }
                }
                None => {
                    if *link == Link::Conflict {
                        consistent = false;
                    }
                    ratios.insert(next, implied);
                    members.push(next);
                    queue.push_back(next);
                }
            }
        }
    }

    members.sort();
    Traversal {
        members,
        ratios,
        consistent,
    }
}

/// Compute the derived projection of `origin`
pub fn derive_world(origin: &Origin) -> Derived {
    let tolerance = origin.physics().cycle_tolerance;
    let epsilon = origin.physics().speed_epsilon;
    let graph = build_graph(origin);
    let gears: AHashMap<EntityId, &Gear> = origin.gears().map(|(id, _, g)| (id, g)).collect();

    let mut derived = Derived {
        revision: origin.revision(),
        ..Default::default()
    };

    for (start, _, _) in origin.gears() {
        if derived.gears.contains_key(&start) {
            continue;
        }

        let traversal = traverse(&graph, &gears, start, tolerance);
        let index = derived.components.len();

        // Forced gears take priority as the reference, then anchored ones
        let drivers: Vec<(EntityId, f32)> = traversal
            .members
            .iter()
            .filter_map(|id| gears[id].applied_force.map(|w| (*id, w)))
            .chain(traversal.members.iter().filter_map(|id| {
                let g = gears[id];
                (g.anchored && g.applied_force.is_none()).then_some((*id, g.angular_velocity))
            }))
            .collect();

        let mut consistent = traversal.consistent;
        let mut reference_speed = 0.0;
        let reference = drivers.first().map(|(id, _)| *id);

        if let Some((ref_id, ref_w)) = drivers.first() {
            reference_speed = ref_w / traversal.ratios[ref_id];
            for (id, w) in &drivers[1..] {
                let required = w / traversal.ratios[id];
                if !speeds_agree(reference_speed, required, tolerance, epsilon) {
                    consistent = false;
                }
            }
        }

        let validity = if consistent {
            Validity::Valid
        } else {
            log::warn!(
                "Component of {} gears starting at {} is inconsistent",
                traversal.members.len(),
                start
            );
            Validity::Inconsistent
        };

        for id in &traversal.members {
            let gear = gears[id];
            let angular_velocity = if consistent {
                reference_speed * traversal.ratios[id]
            } else {
                0.0
            };
            let drive = if gear.applied_force.is_some() {
                Drive::Forced
            } else if gear.anchored {
                Drive::Anchored
            } else if consistent && reference.is_some() {
                Drive::Driven
            } else {
                Drive::Idle
            };
            let energy = gear_energy(gear.radius, angular_velocity, gear.mass);
            derived.total_energy += energy;
            derived.gears.insert(
                *id,
                GearState {
                    angular_velocity,
                    energy,
                    drive,
                    component: index,
                    validity,
                },
            );
        }

        derived.components.push(ComponentState {
            members: traversal.members,
            reference: if consistent { reference } else { None },
            validity,
        });
    }

    let mesh_tolerance = origin.physics().mesh_tolerance;
    for conn in origin.connections() {
        let tangent = match (origin.gear(conn.a), origin.gear(conn.b)) {
            (Ok((pa, ga)), Ok((pb, gb))) => {
                (pa.distance(pb) - (ga.radius + gb.radius)).abs() <= mesh_tolerance
            }
            _ => false,
        };
        let component_ok = derived
            .gears
            .get(&conn.a)
            .is_some_and(|s| s.validity.is_valid());
        let validity = if tangent && component_ok {
            Validity::Valid
        } else {
            Validity::Inconsistent
        };
        derived.connections.insert(conn, validity);
    }

    for (id, belt) in origin.belts() {
        let state = belt_state(origin, &derived, &belt.pulleys, belt.velocity);
        derived.belts.insert(id, state);
    }

    log::debug!(
        "Derived revision {}: {} gears in {} components, energy {:.3}",
        derived.revision,
        derived.gears.len(),
        derived.components.len(),
        derived.total_energy
    );
    derived
}

fn belt_state(
    origin: &Origin,
    derived: &Derived,
    pulleys: &[EntityId],
    authored: f32,
) -> BeltState {
    let inconsistent = pulleys
        .iter()
        .any(|p| derived.gears.get(p).is_none_or(|s| !s.validity.is_valid()));
    if inconsistent {
        return BeltState {
            velocity: 0.0,
            driven_by: None,
            validity: Validity::Inconsistent,
        };
    }

    let driver = pulleys.iter().find_map(|p| {
        let state = derived.gears.get(p)?;
        let driven = derived.components[state.component].reference.is_some();
        let (_, gear) = origin.gear(*p).ok()?;
        driven.then_some((*p, state.angular_velocity * gear.radius))
    });

    match driver {
        Some((pulley, velocity)) => BeltState {
            velocity,
            driven_by: Some(pulley),
            validity: Validity::Valid,
        },
        None => BeltState {
            velocity: authored,
            driven_by: None,
            validity: Validity::Valid,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_energy_formula() {
        assert_eq!(gear_energy(2.0, 3.0, 4.0), 36.0);
        assert_eq!(gear_energy(1.0, 0.0, 5.0), 0.0);
        assert_eq!(gear_energy(1.0, -2.0, 1.0), 1.0);
    }

    #[test]
    fn test_empty_origin() {
        let derived = derive_world(&Origin::default());
        assert!(derived.components().is_empty());
        assert_eq!(derived.total_energy(), 0.0);
        assert!(derived.is_consistent());
    }

    #[test]
    fn test_idle_component() {
        let mut origin = Origin::default();
        let a = origin.insert_gear(Vec2::ZERO, 1.0, 1.0).unwrap();
        let b = origin.insert_gear(Vec2::new(2.0, 0.0), 1.0, 1.0).unwrap();
        origin.connect(a, b).unwrap();

        let derived = derive_world(&origin);
        assert_eq!(derived.gear(a).unwrap().angular_velocity, 0.0);
        assert_eq!(derived.gear(b).unwrap().drive, Drive::Idle);
        assert_eq!(derived.components().len(), 1);
        assert_eq!(derived.components()[0].reference, None);
    }

    #[test]
    fn test_mesh_inverts_and_scales() {
        let mut origin = Origin::default();
        let a = origin.insert_gear(Vec2::ZERO, 1.0, 1.0).unwrap();
        let b = origin.insert_gear(Vec2::new(3.0, 0.0), 2.0, 1.0).unwrap();
        origin.connect(a, b).unwrap();
        origin.set_anchored(a, true, 4.0).unwrap();

        let derived = derive_world(&origin);
        let wa = derived.gear(a).unwrap().angular_velocity;
        let wb = derived.gear(b).unwrap().angular_velocity;
        assert_eq!(wa, 4.0);
        assert!((wb - -2.0).abs() < 1e-6);
        assert!((wa * 1.0 + wb * 2.0).abs() < 1e-5);
        assert_eq!(derived.gear(a).unwrap().drive, Drive::Anchored);
        assert_eq!(derived.gear(b).unwrap().drive, Drive::Driven);
    }

    #[test]
    fn test_forced_gear_is_reference() {
        let mut origin = Origin::default();
        let a = origin.insert_gear(Vec2::ZERO, 1.0, 1.0).unwrap();
        let b = origin.insert_gear(Vec2::new(2.0, 0.0), 1.0, 1.0).unwrap();
        origin.connect(a, b).unwrap();
        origin.set_applied_force(b, Some(3.0)).unwrap();

        let derived = derive_world(&origin);
        assert_eq!(derived.components()[0].reference, Some(b));
        assert_eq!(derived.gear(b).unwrap().angular_velocity, 3.0);
        assert_eq!(derived.gear(a).unwrap().angular_velocity, -3.0);
        assert_eq!(derived.gear(b).unwrap().drive, Drive::Forced);
    }

    #[test]
    fn test_odd_cycle_is_inconsistent() {
        let mut origin = Origin::default();
        let h = 3.0_f32.sqrt();
        let a = origin.insert_gear(Vec2::ZERO, 1.0, 1.0).unwrap();
        let b = origin.insert_gear(Vec2::new(2.0, 0.0), 1.0, 1.0).unwrap();
        let c = origin.insert_gear(Vec2::new(1.0, h), 1.0, 1.0).unwrap();
        origin.connect(a, b).unwrap();
        origin.connect(b, c).unwrap();
        origin.connect(c, a).unwrap();
        origin.set_applied_force(a, Some(1.0)).unwrap();

        let derived = derive_world(&origin);
        assert!(!derived.is_consistent());
        for id in [a, b, c] {
            let state = derived.gear(id).unwrap();
            assert_eq!(state.validity, Validity::Inconsistent);
            assert_eq!(state.angular_velocity, 0.0);
        }
        assert_eq!(
            derived.connection(Connection::new(a, b)),
            Some(Validity::Inconsistent)
        );
        assert_eq!(derived.total_energy(), 0.0);
    }

    #[test]
    fn test_odd_cycle_with_tiny_ratios_is_inconsistent() {
        // A tiny gear tangent to two large meshed gears: every ratio from the
        // tiny gear is far below 1, the odd cycle must still be caught
        let mut origin = Origin::default();
        let small: f32 = 0.0004;
        let y = ((10.0 + small).powi(2) - 100.0).sqrt();
        let a = origin.insert_gear(Vec2::new(10.0, y), small, 1.0).unwrap();
        let b = origin.insert_gear(Vec2::ZERO, 10.0, 1.0).unwrap();
        let c = origin.insert_gear(Vec2::new(20.0, 0.0), 10.0, 1.0).unwrap();
        origin.connect(a, b).unwrap();
        origin.connect(a, c).unwrap();
        origin.connect(b, c).unwrap();
        origin.set_applied_force(b, Some(1.0)).unwrap();

        let derived = derive_world(&origin);
        assert!(!derived.is_consistent());
        for id in [a, b, c] {
            assert_eq!(derived.gear(id).unwrap().validity, Validity::Inconsistent);
            assert_eq!(derived.gear(id).unwrap().angular_velocity, 0.0);
        }
    }

    #[test]
    fn test_drivers_disagreeing_at_low_speed() {
        let mut origin = Origin::default();
        let a = origin.insert_gear(Vec2::ZERO, 1.0, 1.0).unwrap();
        let b = origin.insert_gear(Vec2::new(2.0, 0.0), 1.0, 1.0).unwrap();
        origin.connect(a, b).unwrap();
        // Meshed gears must counter-rotate, both turning +1e-5 cannot hold
        origin.set_anchored(a, true, 1e-5).unwrap();
        origin.set_anchored(b, true, 1e-5).unwrap();

        let derived = derive_world(&origin);
        assert_eq!(derived.components()[0].validity, Validity::Inconsistent);
    }

    #[test]
    fn test_fixed_gears_agree() {
        let mut origin = Origin::default();
        let a = origin.insert_gear(Vec2::ZERO, 1.0, 1.0).unwrap();
        let b = origin.insert_gear(Vec2::new(2.0, 0.0), 1.0, 1.0).unwrap();
        origin.connect(a, b).unwrap();
        origin.set_anchored(a, true, 0.0).unwrap();
        origin.set_anchored(b, true, 0.0).unwrap();

        let derived = derive_world(&origin);
        assert!(derived.is_consistent());
        assert_eq!(derived.gear(a).unwrap().angular_velocity, 0.0);
    }

    #[test]
    fn test_conflicting_drivers() {
        let mut origin = Origin::default();
        let a = origin.insert_gear(Vec2::ZERO, 1.0, 1.0).unwrap();
        let b = origin.insert_gear(Vec2::new(2.0, 0.0), 1.0, 1.0).unwrap();
        origin.connect(a, b).unwrap();
        origin.set_anchored(b, true, 0.0).unwrap();
        origin.set_applied_force(a, Some(2.0)).unwrap();

        let derived = derive_world(&origin);
        assert_eq!(derived.components()[0].validity, Validity::Inconsistent);
        assert_eq!(derived.components()[0].reference, None);
    }

    #[test]
    fn test_agreeing_drivers() {
        let mut origin = Origin::default();
        let a = origin.insert_gear(Vec2::ZERO, 1.0, 1.0).unwrap();
        let b = origin.insert_gear(Vec2::new(2.0, 0.0), 1.0, 1.0).unwrap();
        origin.connect(a, b).unwrap();
        origin.set_anchored(a, true, 1.0).unwrap();
        origin.set_anchored(b, true, -1.0).unwrap();

        let derived = derive_world(&origin);
        assert!(derived.is_consistent());
        assert_eq!(derived.gear(b).unwrap().angular_velocity, -1.0);
    }

    #[test]
    fn test_belt_preserves_direction_and_drives_items() {
        let mut origin = Origin::default();
        let a = origin.insert_gear(Vec2::ZERO, 1.0, 1.0).unwrap();
        let b = origin.insert_gear(Vec2::new(10.0, 0.0), 2.0, 1.0).unwrap();
        let belt = origin.insert_belt(vec![a, b], 0.0).unwrap();
        origin.set_anchored(a, true, 2.0).unwrap();

        let derived = derive_world(&origin);
        let wb = derived.gear(b).unwrap().angular_velocity;
        assert!((wb - 1.0).abs() < 1e-6);
        let state = derived.belt(belt).unwrap();
        assert_eq!(state.driven_by, Some(a));
        assert!((state.velocity - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_belt_uses_authored_velocity_when_idle() {
        let mut origin = Origin::default();
        let a = origin.insert_gear(Vec2::ZERO, 1.0, 1.0).unwrap();
        let b = origin.insert_gear(Vec2::new(10.0, 0.0), 1.0, 1.0).unwrap();
        let belt = origin.insert_belt(vec![a, b], 0.1).unwrap();

        let state = *derive_world(&origin).belt(belt).unwrap();
        assert_eq!(state.velocity, 0.1);
        assert_eq!(state.driven_by, None);
    }

    #[test]
    fn test_mesh_and_belt_on_same_pair_conflict() {
        let mut origin = Origin::default();
        let a = origin.insert_gear(Vec2::ZERO, 1.0, 1.0).unwrap();
        let b = origin.insert_gear(Vec2::new(2.0, 0.0), 1.0, 1.0).unwrap();
        origin.connect(a, b).unwrap();
        let belt = origin.insert_belt(vec![a, b], 0.5).unwrap();

        let derived = derive_world(&origin);
        assert!(!derived.is_consistent());
        assert_eq!(derived.belt(belt).unwrap().validity, Validity::Inconsistent);
        assert_eq!(derived.belt(belt).unwrap().velocity, 0.0);
    }

    #[test]
    fn test_every_gear_has_entry() {
        let mut origin = Origin::default();
        for i in 0..5 {
            origin
                .insert_gear(Vec2::new(i as f32 * 10.0, 0.0), 1.0, 1.0)
                .unwrap();
        }
        let derived = derive_world(&origin);
        assert_eq!(derived.gears().count(), 5);
        assert_eq!(derived.components().len(), 5);
        assert!(derived.is_current(&origin));
    }
}
