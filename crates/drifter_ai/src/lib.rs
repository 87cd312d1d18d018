//! Drifter AI - Entity Behaviors
//!
//! State machines and the scripted behaviors built on them. Behaviors read
//! entity data through `drifter_reflect` and return intent; they never write
//! to the entity themselves.
//!
//! # Example
//!
//! ```ignore
//! use drifter_ai::prelude::*;
//!
//! let mut brain = GoblinBrain::with_seed(GoblinConfig::default(), 1);
//! let entity = EntityRef::new(FieldAccessor::new(&registry), &objects, "Entity", goblin);
//! let intent = brain.update(entity, player_pos, delta_time)?;
//! if intent.should_attack {
//!     combat.strike(goblin, player);
//! }
//! ```

pub mod goblin;
pub mod state_machine;

pub mod prelude {
    pub use crate::goblin::{BehaviorOutput, EntityRef, GoblinBrain, GoblinConfig, GoblinState};
    pub use crate::state_machine::{State, StateMachine, Transition};
}

pub use prelude::*;
