//! Game event system for decoupled communication with the host.
//!
//! Combat and AI systems emit events; the host drains them after each tick
//! to drive damage numbers, HP bars, sounds, and other presentation. The
//! queue order is the order side effects occurred.

use hecs::Entity;

use crate::systems::ai::MobAiState;

/// Events the simulation emits for the host to consume.
#[derive(Debug, Clone)]
pub enum GameEvent {
    /// A skill cast started.
    SkillCast {
        skill_id: i32,
        level: i32,
        caster_x: f32,
        caster_y: f32,
    },
    /// A projectile struck a mob.
    ProjectileHit {
        projectile_id: i32,
        skill_id: i32,
        mob: Entity,
        x: f32,
        y: f32,
    },
    /// A buff was applied to the player.
    BuffApplied { skill_id: i32, duration_ms: i32 },
    /// A buff expired or was replaced.
    BuffExpired { skill_id: i32 },
    /// A mob took damage (HP bar refresh hook).
    MobDamaged { mob: Entity, damage: i32 },
    /// A damage number to display.
    DamageNumber {
        damage: i32,
        x: f32,
        y: f32,
        critical: bool,
        /// Stacking index when one swing lands several hits.
        stack: i32,
    },
    /// A mob died and should play its death effect.
    MobDied { mob: Entity, x: f32, y: f32 },
    /// A mob's HP bar should be removed.
    MobHpBarRemoved { mob: Entity },
    /// A mob's AI state changed.
    AiStateChanged { mob: Entity, state: MobAiState },
}

/// Simple event queue - events are pushed during update, drained by the host
/// at end of frame.
#[derive(Default)]
pub struct EventQueue {
    events: Vec<GameEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Push an event to be processed later
    pub fn push(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Drain all events for processing
    pub fn drain(&mut self) -> impl Iterator<Item = GameEvent> + '_ {
        self.events.drain(..)
    }

    /// Peek at pending events without consuming them.
    pub fn pending(&self) -> &[GameEvent] {
        &self.events
    }

    /// Check if there are pending events
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
