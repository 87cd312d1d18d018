//! Finite state machine driven by per-tick context

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// A state in the state machine
pub trait State: Clone + Eq + Hash + fmt::Debug {
    /// Called when entering this state
    fn on_enter(&self) {}
    /// Called when exiting this state
    fn on_exit(&self) {}
}

/// Transition guard evaluated against the tick context
pub type TransitionCondition<C> = Box<dyn Fn(&C) -> bool + Send + Sync>;

/// A guarded edge to a target state
pub struct Transition<S, C> {
    pub to: S,
    pub condition: TransitionCondition<C>,
    /// Higher is checked first
    pub priority: i32,
}

impl<S, C> Transition<S, C> {
    pub fn new<F>(to: S, condition: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        Self {
            to,
            condition: Box::new(condition),
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Evaluate the guard
    pub fn is_ready(&self, context: &C) -> bool {
        (self.condition)(context)
    }
}

impl<S: fmt::Debug, C> fmt::Debug for Transition<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("to", &self.to)
            .field("priority", &self.priority)
            .finish()
    }
}

/// State machine taking at most one transition per update.
///
/// Global transitions are checked before the current state's own
/// transitions. Among one state's transitions the highest priority wins;
/// equal priorities keep insertion order.
pub struct StateMachine<S: State, C> {
    current: S,
    previous: Option<S>,
    transitions: HashMap<S, Vec<Transition<S, C>>>,
    global_transitions: Vec<Transition<S, C>>,
    /// Seconds since the last state change
    time_in_state: f64,
}

impl<S: State, C> StateMachine<S, C> {
    pub fn new(initial: S) -> Self {
        initial.on_enter();
        Self {
            current: initial,
            previous: None,
            transitions: HashMap::new(),
            global_transitions: Vec::new(),
            time_in_state: 0.0,
        }
    }

    pub fn add_transition<F>(&mut self, from: S, to: S, condition: F)
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.insert(from, Transition::new(to, condition));
    }

    pub fn add_transition_priority<F>(&mut self, from: S, to: S, condition: F, priority: i32)
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.insert(from, Transition::new(to, condition).with_priority(priority));
    }

    /// Add a transition that can fire from any other state
    pub fn add_global_transition<F>(&mut self, to: S, condition: F)
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.global_transitions.push(Transition::new(to, condition));
    }

    pub fn current(&self) -> &S {
        &self.current
    }

    pub fn previous(&self) -> Option<&S> {
        self.previous.as_ref()
    }

    pub fn time_in_state(&self) -> f64 {
        self.time_in_state
    }

    pub fn is_in(&self, state: &S) -> bool {
        &self.current == state
    }

    /// Switch state unconditionally, running exit and enter hooks
    pub fn force_transition(&mut self, to: S) {
        log::trace!("State {:?} -> {:?}", self.current, to);
        self.current.on_exit();
        self.previous = Some(std::mem::replace(&mut self.current, to));
        self.current.on_enter();
        self.time_in_state = 0.0;
    }

    /// Advance time and take the first ready transition.
    ///
    /// Returns whether the state changed.
    pub fn update(&mut self, context: &C, delta_time: f64) -> bool {
        self.time_in_state += delta_time;

        let target = self
            .global_transitions
            .iter()
            .find(|t| t.to != self.current && t.is_ready(context))
            .or_else(|| {
                self.transitions
                    .get(&self.current)
                    .and_then(|list| list.iter().find(|t| t.is_ready(context)))
            })
            .map(|t| t.to.clone());

        match target {
            Some(to) => {
                self.force_transition(to);
                true
            }
            None => false,
        }
    }

    fn insert(&mut self, from: S, transition: Transition<S, C>) {
        let list = self.transitions.entry(from).or_default();
        let at = list
            .iter()
            .position(|t| t.priority < transition.priority)
            .unwrap_or(list.len());
        list.insert(at, transition);
    }
}

impl<S: State, C> fmt::Debug for StateMachine<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current)
            .field("previous", &self.previous)
            .field("time_in_state", &self.time_in_state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Gait {
        Idle,
        Walking,
        Running,
    }

    impl State for Gait {}

    struct Legs {
        speed: f32,
        stamina: f32,
    }

    #[test]
    fn test_transitions() {
        let mut fsm = StateMachine::<Gait, Legs>::new(Gait::Idle);
        fsm.add_transition(Gait::Idle, Gait::Walking, |ctx| ctx.speed > 0.0);
        fsm.add_transition(Gait::Walking, Gait::Running, |ctx| {
            ctx.speed > 5.0 && ctx.stamina > 0.0
        });
        fsm.add_transition(Gait::Running, Gait::Walking, |ctx| ctx.stamina <= 0.0);

        let mut legs = Legs {
            speed: 0.0,
            stamina: 100.0,
        };

        assert!(!fsm.update(&legs, 0.016));
        assert!(fsm.is_in(&Gait::Idle));

        legs.speed = 2.0;
        assert!(fsm.update(&legs, 0.016));
        assert!(fsm.is_in(&Gait::Walking));

        legs.speed = 10.0;
        fsm.update(&legs, 0.016);
        assert!(fsm.is_in(&Gait::Running));

        legs.stamina = 0.0;
        fsm.update(&legs, 0.016);
        assert!(fsm.is_in(&Gait::Walking));
        assert_eq!(fsm.previous(), Some(&Gait::Running));
    }

    #[test]
    fn test_one_step_per_update() {
        let mut fsm = StateMachine::<Gait, Legs>::new(Gait::Idle);
        fsm.add_transition(Gait::Idle, Gait::Walking, |ctx| ctx.speed > 0.0);
        fsm.add_transition(Gait::Walking, Gait::Running, |ctx| ctx.speed > 5.0);

        let legs = Legs {
            speed: 10.0,
            stamina: 1.0,
        };
        fsm.update(&legs, 0.016);
        assert!(fsm.is_in(&Gait::Walking));
        fsm.update(&legs, 0.016);
        assert!(fsm.is_in(&Gait::Running));
    }

    #[test]
    fn test_priority_order() {
        let mut fsm = StateMachine::<Gait, Legs>::new(Gait::Idle);
        fsm.add_transition(Gait::Idle, Gait::Walking, |_| true);
        fsm.add_transition_priority(Gait::Idle, Gait::Running, |ctx| ctx.speed > 5.0, 1);

        let mut legs = Legs {
            speed: 10.0,
            stamina: 1.0,
        };
        fsm.update(&legs, 0.016);
        assert!(fsm.is_in(&Gait::Running));

        fsm.force_transition(Gait::Idle);
        legs.speed = 1.0;
        fsm.update(&legs, 0.016);
        assert!(fsm.is_in(&Gait::Walking));
    }

    #[test]
    fn test_global_transition() {
        let mut fsm = StateMachine::<Gait, Legs>::new(Gait::Running);
        fsm.add_global_transition(Gait::Idle, |ctx| ctx.speed == 0.0);

        let mut legs = Legs {
            speed: 5.0,
            stamina: 100.0,
        };
        fsm.update(&legs, 0.016);
        assert!(fsm.is_in(&Gait::Running));

        legs.speed = 0.0;
        assert!(fsm.update(&legs, 0.016));
        assert!(fsm.is_in(&Gait::Idle));
        // already idle; the global edge does not re-fire
        assert!(!fsm.update(&legs, 0.016));
    }

    #[test]
    fn test_time_in_state() {
        let mut fsm = StateMachine::<Gait, Legs>::new(Gait::Idle);
        let legs = Legs {
            speed: 0.0,
            stamina: 0.0,
        };
        fsm.update(&legs, 0.5);
        fsm.update(&legs, 0.25);
        assert!((fsm.time_in_state() - 0.75).abs() < 1e-12);

        fsm.force_transition(Gait::Walking);
        assert_eq!(fsm.time_in_state(), 0.0);
        assert_eq!(fsm.previous(), Some(&Gait::Idle));
    }
}
