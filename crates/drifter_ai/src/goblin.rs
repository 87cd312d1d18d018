//! Goblin patrol/chase/attack behavior
//!
//! The goblin reads its own `position` through the reflection accessor each
//! tick, measures the distance to a target, and steps a three-state machine.
//! The returned [`BehaviorOutput`] describes the state after this tick's
//! transition.

use crate::state_machine::{State, StateMachine};
use drifter_reflect::{FieldAccessor, InstanceHandle, InstanceStore, Result, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Field every goblin-driven type must declare as `Vector2`
pub const POSITION_FIELD: &str = "position";

/// Behavior states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoblinState {
    Patrol,
    Chase,
    Attack,
}

impl GoblinState {
    pub fn as_str(self) -> &'static str {
        match self {
            GoblinState::Patrol => "patrol",
            GoblinState::Chase => "chase",
            GoblinState::Attack => "attack",
        }
    }
}

impl fmt::Display for GoblinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl State for GoblinState {}

/// Tuning for a goblin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoblinConfig {
    /// Start chasing below this distance
    pub chase_distance: f64,
    /// Attack below this distance
    pub attack_distance: f64,
    /// Give up the chase beyond `chase_distance * lose_distance_factor`
    pub lose_distance_factor: f64,
    /// Seconds between wander direction changes
    pub patrol_interval: f64,
    pub wander_speed: f64,
    pub chase_speed: f64,
}

impl Default for GoblinConfig {
    fn default() -> Self {
        Self {
            chase_distance: 5.0,
            attack_distance: 1.5,
            lose_distance_factor: 1.5,
            patrol_interval: 3.0,
            wander_speed: 0.5,
            chase_speed: 2.0,
        }
    }
}

/// Read-only view of the entity a brain drives
pub struct EntityRef<'a, S: InstanceStore + ?Sized> {
    accessor: FieldAccessor<'a>,
    store: &'a S,
    type_name: &'a str,
    handle: InstanceHandle,
}

impl<'a, S: InstanceStore + ?Sized> EntityRef<'a, S> {
    pub fn new(
        accessor: FieldAccessor<'a>,
        store: &'a S,
        type_name: &'a str,
        handle: InstanceHandle,
    ) -> Self {
        Self {
            accessor,
            store,
            type_name,
            handle,
        }
    }

    pub fn type_name(&self) -> &'a str {
        self.type_name
    }

    pub fn handle(&self) -> InstanceHandle {
        self.handle
    }

    /// Current position
    pub fn position(&self) -> Result<(f64, f64)> {
        let [x, y]: Vec2 =
            self.accessor
                .get(self.type_name, POSITION_FIELD, self.store, self.handle)?;
        Ok((f64::from(x), f64::from(y)))
    }
}

impl<S: InstanceStore + ?Sized> Clone for EntityRef<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: InstanceStore + ?Sized> Copy for EntityRef<'_, S> {}

/// What the goblin wants to do this tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BehaviorOutput {
    pub state: GoblinState,
    pub velocity: (f64, f64),
    pub should_attack: bool,
}

impl BehaviorOutput {
    fn still(state: GoblinState) -> Self {
        Self {
            state,
            velocity: (0.0, 0.0),
            should_attack: false,
        }
    }
}

struct Senses {
    distance: f64,
}

/// Per-goblin behavior state
pub struct GoblinBrain {
    config: GoblinConfig,
    machine: StateMachine<GoblinState, Senses>,
    patrol_timer: f64,
    rng: StdRng,
}

impl GoblinBrain {
    pub fn new(config: GoblinConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic wander for replays and tests
    pub fn with_seed(config: GoblinConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: GoblinConfig, rng: StdRng) -> Self {
        let chase = config.chase_distance;
        let attack = config.attack_distance;
        let lose = config.chase_distance * config.lose_distance_factor;

        let mut machine = StateMachine::new(GoblinState::Patrol);
        machine.add_transition(GoblinState::Patrol, GoblinState::Chase, move |s: &Senses| {
            s.distance < chase
        });
        machine.add_transition(GoblinState::Chase, GoblinState::Patrol, move |s: &Senses| {
            s.distance > lose
        });
        machine.add_transition_priority(
            GoblinState::Chase,
            GoblinState::Attack,
            move |s: &Senses| s.distance < attack,
            1,
        );
        machine.add_transition(GoblinState::Attack, GoblinState::Chase, move |s: &Senses| {
            s.distance > attack
        });

        Self {
            config,
            machine,
            patrol_timer: 0.0,
            rng,
        }
    }

    pub fn config(&self) -> &GoblinConfig {
        &self.config
    }

    pub fn state(&self) -> GoblinState {
        *self.machine.current()
    }

    /// Run one tick against `target`
    pub fn update<S: InstanceStore + ?Sized>(
        &mut self,
        entity: EntityRef<'_, S>,
        target: (f64, f64),
        delta_time: f64,
    ) -> Result<BehaviorOutput> {
        let (x, y) = entity.position()?;
        let (dx, dy) = (target.0 - x, target.1 - y);
        let distance = dx.hypot(dy);

        if self.machine.update(&Senses { distance }, delta_time) {
            log::debug!(
                "Goblin {:?}: {} -> {} at distance {:.2}",
                entity.handle(),
                self.machine.previous().map_or("none", |s| s.as_str()),
                self.state(),
                distance
            );
            if self.state() == GoblinState::Patrol {
                self.patrol_timer = 0.0;
            }
        }

        let state = self.state();
        let mut output = BehaviorOutput::still(state);
        match state {
            GoblinState::Patrol => {
                self.patrol_timer += delta_time;
                if self.patrol_timer > self.config.patrol_interval {
                    let speed = self.config.wander_speed.abs();
                    output.velocity = (
                        self.rng.gen_range(-speed..=speed),
                        self.rng.gen_range(-speed..=speed),
                    );
                    self.patrol_timer = 0.0;
                }
            }
            GoblinState::Chase => {
                if distance > 0.0 {
                    let speed = self.config.chase_speed;
                    output.velocity = (dx / distance * speed, dy / distance * speed);
                }
            }
            GoblinState::Attack => output.should_attack = true,
        }
        Ok(output)
    }
}

impl Default for GoblinBrain {
    fn default() -> Self {
        Self::new(GoblinConfig::default())
    }
}

impl fmt::Debug for GoblinBrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoblinBrain")
            .field("state", &self.state())
            .field("patrol_timer", &self.patrol_timer)
            .field("config", &self.config)
            .finish()
    }
}
