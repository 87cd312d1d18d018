//! Integration tests for the goblin behavior

use drifter_ai::prelude::*;
use drifter_reflect::{FieldAccessor, InstanceHandle, ObjectTable, PropertyType, TypeBuilder, TypeRegistry};

struct Arena {
    registry: TypeRegistry,
    objects: ObjectTable,
    goblin: InstanceHandle,
}

impl Arena {
    fn new() -> Self {
        let mut registry = TypeRegistry::new();
        TypeBuilder::new("Entity", 28)
            .field("position", PropertyType::Vector2, 0)
            .field("tint", PropertyType::Color, 8)
            .field("health", PropertyType::Int, 24)
            .register(&mut registry)
            .unwrap();
        registry.seal();

        let mut objects = ObjectTable::new();
        let goblin = objects.create_named(&registry, "Entity").unwrap();
        Self {
            registry,
            objects,
            goblin,
        }
    }

    fn place(&mut self, x: f32, y: f32) {
        FieldAccessor::new(&self.registry)
            .set("Entity", "position", &mut self.objects, self.goblin, [x, y])
            .unwrap();
    }

    fn tick(&self, brain: &mut GoblinBrain, target: (f64, f64)) -> BehaviorOutput {
        let entity = EntityRef::new(
            FieldAccessor::new(&self.registry),
            &self.objects,
            "Entity",
            self.goblin,
        );
        brain.update(entity, target, 0.016).unwrap()
    }
}

#[test]
fn test_patrol_chase_attack_scenario() {
    let mut arena = Arena::new();
    let config = GoblinConfig {
        chase_distance: 5.0,
        attack_distance: 1.5,
        ..GoblinConfig::default()
    };
    let mut brain = GoblinBrain::with_seed(config, 1);
    let player = (0.0, 0.0);

    arena.place(10.0, 0.0);
    let out = arena.tick(&mut brain, player);
    assert_eq!(out.state, GoblinState::Patrol);
    assert!(!out.should_attack);

    arena.place(4.0, 0.0);
    let out = arena.tick(&mut brain, player);
    assert_eq!(out.state, GoblinState::Chase);
    assert!(out.velocity.0 < 0.0);

    arena.place(1.0, 0.0);
    let out = arena.tick(&mut brain, player);
    assert_eq!(out.state, GoblinState::Attack);
    assert!(out.should_attack);
    assert_eq!(brain.state(), GoblinState::Attack);
}

#[test]
fn test_chase_velocity_points_at_target() {
    let mut arena = Arena::new();
    let mut brain = GoblinBrain::with_seed(GoblinConfig::default(), 1);

    arena.place(0.0, 0.0);
    let out = arena.tick(&mut brain, (1.5, 2.0));
    assert_eq!(out.state, GoblinState::Chase);

    let (vx, vy) = out.velocity;
    assert!((vx - 1.2).abs() < 1e-6);
    assert!((vy - 1.6).abs() < 1e-6);
    assert!((vx.hypot(vy) - brain.config().chase_speed).abs() < 1e-9);
}

#[test]
fn test_one_transition_per_tick() {
    let mut arena = Arena::new();
    let mut brain = GoblinBrain::with_seed(GoblinConfig::default(), 1);

    // from patrol, a target in attack range first starts the chase
    arena.place(0.5, 0.0);
    assert_eq!(arena.tick(&mut brain, (0.0, 0.0)).state, GoblinState::Chase);
    assert_eq!(arena.tick(&mut brain, (0.0, 0.0)).state, GoblinState::Attack);
}
