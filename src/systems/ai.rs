//! Mob AI state machine: aggro, chasing, attacking, stuns, and death.
//!
//! Each mob carries a [`MobAi`] component updated once per tick. State
//! transitions key off target distance, per-attack cooldowns, and elapsed
//! time in state; HP lives in the separate `Health` component and enters
//! through [`damage_mob`].

use std::collections::HashMap;

use bitflags::bitflags;
use hecs::{Entity, World};

use crate::components::{Health, Position};
use crate::constants::{
    ALERT_DURATION, BOSS_AGGRO_TIMEOUT, CHASE_SPEED_MULTIPLIER, DEATH_DURATION,
    DEFAULT_AGGRO_RANGE, DEFAULT_ATTACK_RANGE, HIT_STUN_DURATION, IDLE_TO_PATROL_TIME,
    LOSE_AGGRO_TIME,
};
use crate::events::{EventQueue, GameEvent};
use crate::systems::movement::{MobAction, MoveDirection, Movement};
use crate::time::tick_diff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobAiState {
    /// Standing still, no target.
    Idle,
    /// Wandering the patrol range.
    Patrol,
    /// Detected the player, winding up before the chase.
    Alert,
    /// Actively pursuing the target.
    Chase,
    /// Executing an attack animation.
    Attack,
    /// Casting a mob skill.
    Skill,
    /// Hit-stunned.
    Hit,
    /// Playing the death animation. Terminal until the death timer elapses.
    Death,
    /// Out of the pool; only a fresh spawn leaves this state.
    Removed,
}

bitflags! {
    /// Status effects applied to mobs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MobStatusFlags: u32 {
        const STUN      = 1 << 0;
        const FREEZE    = 1 << 1;
        const POISON    = 1 << 2;
        const SEAL      = 1 << 3;
        const DARKNESS  = 1 << 4;
        const SPEED     = 1 << 5;
        const WEB       = 1 << 6;
        const P_IMMUNE  = 1 << 7;
        const M_IMMUNE  = 1 << 8;
        const HARD_SKIN = 1 << 9;
        const BURNED    = 1 << 10;
        const SHOWDOWN  = 1 << 11;
    }
}

/// How a mob left the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobDeathType {
    Normal,
    Killed,
    Bomb,
    Miss,
    Swallowed,
    Timeout,
}

/// One attack a mob can perform.
#[derive(Debug, Clone)]
pub struct MobAttackEntry {
    pub attack_id: i32,
    pub animation: String,
    pub damage: i32,
    pub range: i32,
    /// Delay into the animation before the damage lands (ms).
    pub delay_ms: i32,
    pub cooldown_ms: i32,
    pub ranged: bool,
    last_use_tick: i32,
}

impl MobAttackEntry {
    pub fn new(attack_id: i32, animation: &str, damage: i32, range: i32, cooldown_ms: i32) -> Self {
        Self {
            attack_id,
            animation: animation.to_string(),
            damage,
            range,
            delay_ms: 200,
            cooldown_ms,
            ranged: false,
            last_use_tick: 0,
        }
    }

    pub fn is_on_cooldown(&self, tick: i32) -> bool {
        tick_diff(tick, self.last_use_tick) < self.cooldown_ms
    }
}

/// One mob skill, linking to the skill table's "affected" animation played
/// on the victim.
#[derive(Debug, Clone)]
pub struct MobSkillEntry {
    pub skill_id: i32,
    pub level: i32,
    pub action_index: i32,
    pub animation: String,
    pub range: i32,
    pub cooldown_ms: i32,
    last_use_tick: i32,
}

impl MobSkillEntry {
    pub fn new(skill_id: i32, level: i32, action_index: i32, range: i32, cooldown_ms: i32) -> Self {
        Self {
            skill_id,
            level,
            action_index,
            animation: format!("skill{action_index}"),
            range,
            cooldown_ms,
            last_use_tick: 0,
        }
    }

    pub fn is_on_cooldown(&self, tick: i32) -> bool {
        tick_diff(tick, self.last_use_tick) < self.cooldown_ms
    }
}

/// Last known target data.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetInfo {
    pub x: f32,
    pub y: f32,
    pub distance: f32,
    pub valid: bool,
    pub last_seen_tick: i32,
}

/// AI controller component for one mob.
#[derive(Debug, Clone)]
pub struct MobAi {
    state: MobAiState,
    previous_state: MobAiState,
    state_start_tick: i32,

    attacks: Vec<MobAttackEntry>,
    skills: Vec<MobSkillEntry>,
    current_attack: Option<usize>,
    current_skill: Option<usize>,
    target: TargetInfo,

    level: i32,
    exp: i32,
    boss: bool,
    undead: bool,

    aggro_range: i32,
    attack_range: i32,
    chase_speed_multiplier: f32,
    /// Hit by the player; chases even without auto-aggro.
    aggroed: bool,
    /// Aggro on proximity alone (firstAttack map data).
    auto_aggro: bool,

    // Boss aggro timeout. 0 start tick = never aggroed.
    boss_aggro_start_tick: i32,
    boss_aggro_timed_out: bool,

    death_type: MobDeathType,

    status: MobStatusFlags,
    status_expiry: HashMap<MobStatusFlags, i32>,
}

impl MobAi {
    pub fn new(level: i32, exp: i32, boss: bool, undead: bool, auto_aggro: bool) -> Self {
        let (aggro_range, attack_range) = if boss {
            (DEFAULT_AGGRO_RANGE * 2, DEFAULT_ATTACK_RANGE * 2)
        } else {
            (DEFAULT_AGGRO_RANGE, DEFAULT_ATTACK_RANGE)
        };

        Self {
            state: MobAiState::Idle,
            previous_state: MobAiState::Idle,
            state_start_tick: 0,
            attacks: Vec::new(),
            skills: Vec::new(),
            current_attack: None,
            current_skill: None,
            target: TargetInfo::default(),
            level,
            exp,
            boss,
            undead,
            aggro_range,
            attack_range,
            chase_speed_multiplier: CHASE_SPEED_MULTIPLIER,
            aggroed: false,
            auto_aggro,
            boss_aggro_start_tick: 0,
            boss_aggro_timed_out: false,
            death_type: MobDeathType::Normal,
            status: MobStatusFlags::empty(),
            status_expiry: HashMap::new(),
        }
    }

    pub fn state(&self) -> MobAiState {
        self.state
    }

    pub fn previous_state(&self) -> MobAiState {
        self.previous_state
    }

    pub fn is_dead(&self) -> bool {
        matches!(self.state, MobAiState::Death | MobAiState::Removed)
    }

    pub fn is_boss(&self) -> bool {
        self.boss
    }

    pub fn is_undead(&self) -> bool {
        self.undead
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn exp(&self) -> i32 {
        self.exp
    }

    pub fn target(&self) -> &TargetInfo {
        &self.target
    }

    pub fn is_aggroed(&self) -> bool {
        self.aggroed
    }

    pub fn auto_aggro(&self) -> bool {
        self.auto_aggro
    }

    pub fn set_auto_aggro(&mut self, auto_aggro: bool) {
        self.auto_aggro = auto_aggro;
    }

    pub fn boss_aggro_timed_out(&self) -> bool {
        self.boss_aggro_timed_out
    }

    pub fn death_type(&self) -> MobDeathType {
        self.death_type
    }

    pub fn aggro_range(&self) -> i32 {
        self.aggro_range
    }

    pub fn set_aggro_range(&mut self, range: i32) {
        self.aggro_range = range;
    }

    pub fn attack_range(&self) -> i32 {
        self.attack_range
    }

    pub fn set_attack_range(&mut self, range: i32) {
        self.attack_range = range;
    }

    pub fn add_attack(&mut self, attack: MobAttackEntry) {
        self.attacks.push(attack);
    }

    pub fn add_skill(&mut self, skill: MobSkillEntry) {
        self.skills.push(skill);
    }

    /// Aggressive = actively hostile (alert, chasing, or attacking).
    pub fn is_aggressive(&self) -> bool {
        matches!(
            self.state,
            MobAiState::Alert | MobAiState::Chase | MobAiState::Attack
        )
    }

    pub fn state_elapsed(&self, tick: i32) -> i32 {
        tick_diff(tick, self.state_start_tick)
    }

    /// Transition states, resetting in-progress attack/skill bookkeeping.
    pub fn set_state(&mut self, new_state: MobAiState, tick: i32) {
        if self.state == new_state {
            return;
        }
        self.previous_state = self.state;
        self.state = new_state;
        self.state_start_tick = tick;

        if self.previous_state == MobAiState::Attack {
            self.current_attack = None;
        }
        if self.previous_state == MobAiState::Skill {
            self.current_skill = None;
        }
    }

    /// Per-tick state machine update.
    pub fn update(&mut self, tick: i32, mob_x: f32, mob_y: f32, player: Option<(f32, f32)>) {
        if self.is_dead() {
            self.update_death_state(tick);
            return;
        }

        self.update_status_effects(tick);

        // Bosses go permanently passive once the timeout elapses, even if
        // the player never leaves the map
        if self.boss
            && !self.boss_aggro_timed_out
            && self.boss_aggro_start_tick != 0
            && player.is_some()
            && tick_diff(tick, self.boss_aggro_start_tick) >= BOSS_AGGRO_TIMEOUT
        {
            self.boss_aggro_timed_out = true;
            self.aggroed = false;
            self.auto_aggro = false;
            if matches!(
                self.state,
                MobAiState::Chase | MobAiState::Alert | MobAiState::Attack
            ) {
                self.set_state(MobAiState::Patrol, tick);
            }
        }

        self.update_target(tick, mob_x, mob_y, player);

        // Stun and freeze suspend decisions but not timers
        if self
            .status
            .intersects(MobStatusFlags::STUN | MobStatusFlags::FREEZE)
        {
            return;
        }

        match self.state {
            MobAiState::Idle => self.update_idle(tick),
            MobAiState::Patrol => self.update_patrol(tick),
            MobAiState::Alert => self.update_alert(tick),
            MobAiState::Chase => self.update_chase(tick),
            MobAiState::Attack => {
                // Held until notify_attack_animation_complete; a vanished
                // attack entry falls back to chasing
                if self.current_attack.is_none() {
                    self.set_state(MobAiState::Chase, tick);
                }
            }
            MobAiState::Skill => {
                if self.current_skill.is_none() {
                    self.set_state(MobAiState::Chase, tick);
                }
            }
            MobAiState::Hit => self.update_hit(tick),
            MobAiState::Death | MobAiState::Removed => {}
        }
    }

    fn update_target(&mut self, tick: i32, mob_x: f32, mob_y: f32, player: Option<(f32, f32)>) {
        let Some((px, py)) = player else {
            if !self.aggroed {
                self.target.valid = false;
            } else {
                // Keep tracking the last known position
                let dx = self.target.x - mob_x;
                let dy = self.target.y - mob_y;
                self.target.distance = (dx * dx + dy * dy).sqrt();
            }
            return;
        };

        let dx = px - mob_x;
        let dy = py - mob_y;
        self.target.x = px;
        self.target.y = py;
        self.target.distance = (dx * dx + dy * dy).sqrt();
        self.target.valid = true;
        self.target.last_seen_tick = tick;
    }

    fn wants_aggro(&self) -> bool {
        self.target.valid
            && self.target.distance <= self.aggro_range as f32
            && (self.auto_aggro || self.aggroed)
    }

    fn mark_boss_aggro(&mut self, tick: i32) {
        if self.boss && self.boss_aggro_start_tick == 0 {
            self.boss_aggro_start_tick = tick;
        }
    }

    fn update_idle(&mut self, tick: i32) {
        if self.boss_aggro_timed_out {
            if self.state_elapsed(tick) > IDLE_TO_PATROL_TIME {
                self.set_state(MobAiState::Patrol, tick);
            }
            return;
        }

        if self.wants_aggro() {
            self.mark_boss_aggro(tick);
            self.set_state(MobAiState::Alert, tick);
            return;
        }

        if self.state_elapsed(tick) > IDLE_TO_PATROL_TIME {
            self.set_state(MobAiState::Patrol, tick);
        }
    }

    fn update_patrol(&mut self, tick: i32) {
        if self.boss_aggro_timed_out {
            return;
        }
        if self.wants_aggro() {
            self.mark_boss_aggro(tick);
            self.set_state(MobAiState::Alert, tick);
        }
    }

    fn update_alert(&mut self, tick: i32) {
        if !self.target.valid || self.target.distance > self.aggro_range as f32 * 1.5 {
            self.set_state(MobAiState::Patrol, tick);
            return;
        }
        if self.state_elapsed(tick) > ALERT_DURATION {
            self.set_state(MobAiState::Chase, tick);
        }
    }

    fn update_chase(&mut self, tick: i32) {
        // Aggroed mobs chase twice as long before giving up
        let lose_aggro = if self.aggroed {
            LOSE_AGGRO_TIME * 2
        } else {
            LOSE_AGGRO_TIME
        };
        if !self.target.valid || tick_diff(tick, self.target.last_seen_tick) > lose_aggro {
            self.aggroed = false;
            self.set_state(MobAiState::Patrol, tick);
            return;
        }

        if self.target.distance <= self.attack_range as f32 && !self.attacks.is_empty() {
            let distance = self.target.distance;
            let available = self.attacks.iter().position(|attack| {
                !attack.is_on_cooldown(tick) && distance <= attack.range as f32
            });
            if let Some(index) = available {
                self.attacks[index].last_use_tick = tick;
                self.current_attack = Some(index);
                self.set_state(MobAiState::Attack, tick);
            }
        }
    }

    fn update_hit(&mut self, tick: i32) {
        if self.state_elapsed(tick) <= HIT_STUN_DURATION {
            return;
        }
        if self.aggroed && self.target.valid {
            self.set_state(MobAiState::Chase, tick);
        } else if self.target.valid && self.target.distance <= self.aggro_range as f32 {
            self.set_state(MobAiState::Chase, tick);
        } else {
            self.set_state(MobAiState::Patrol, tick);
        }
    }

    fn update_death_state(&mut self, tick: i32) {
        if self.state == MobAiState::Death && self.state_elapsed(tick) > DEATH_DURATION {
            self.set_state(MobAiState::Removed, tick);
        }
    }

    /// Attack animation finished; resume the chase.
    pub fn notify_attack_animation_complete(&mut self, tick: i32) {
        if self.state == MobAiState::Attack {
            self.set_state(MobAiState::Chase, tick);
        }
    }

    /// React to damage: aggro toward the attacker and apply stun rules.
    /// Death is decided by the caller, which owns the Health component.
    pub fn on_damaged(&mut self, tick: i32, attacker: Option<(f32, f32)>) {
        if self.is_dead() {
            return;
        }

        if let Some((ax, ay)) = attacker {
            if !self.boss_aggro_timed_out {
                self.target.x = ax;
                self.target.y = ay;
                self.target.valid = true;
                self.target.last_seen_tick = tick;
                self.aggroed = true;
                self.mark_boss_aggro(tick);
            }
        }

        if !self.boss && self.state != MobAiState::Attack {
            self.set_state(MobAiState::Hit, tick);
        } else if self.boss && attacker.is_some() && !self.boss_aggro_timed_out {
            // Bosses skip hit-stun but still turn hostile
            if matches!(self.state, MobAiState::Idle | MobAiState::Patrol) {
                self.set_state(MobAiState::Chase, tick);
            }
        }
    }

    /// Enter the death state.
    pub fn kill(&mut self, tick: i32, death_type: MobDeathType) {
        self.death_type = death_type;
        self.set_state(MobAiState::Death, tick);
    }

    /// Aggro toward a position without damage (taunts, puppet targeting).
    pub fn force_aggro(&mut self, x: f32, y: f32, tick: i32) {
        if self.is_dead() || self.boss_aggro_timed_out {
            return;
        }
        self.target.x = x;
        self.target.y = y;
        self.target.valid = true;
        self.target.last_seen_tick = tick;
        self.aggroed = true;
        self.mark_boss_aggro(tick);
        if matches!(self.state, MobAiState::Idle | MobAiState::Patrol) {
            self.set_state(MobAiState::Chase, tick);
        }
    }

    pub fn clear_aggro(&mut self) {
        self.aggroed = false;
        self.target.valid = false;
    }

    /// Re-arm a boss's aggro timeout (respawn).
    pub fn reset_boss_aggro_timeout(&mut self) {
        self.boss_aggro_start_tick = 0;
        self.boss_aggro_timed_out = false;
    }

    pub fn current_attack(&self) -> Option<&MobAttackEntry> {
        if self.state != MobAiState::Attack {
            return None;
        }
        self.current_attack.and_then(|i| self.attacks.get(i))
    }

    pub fn current_skill(&self) -> Option<&MobSkillEntry> {
        if self.state != MobAiState::Skill {
            return None;
        }
        self.current_skill.and_then(|i| self.skills.get(i))
    }

    /// Begin casting a mob skill by index.
    pub fn use_skill(&mut self, index: usize, tick: i32) {
        if index >= self.skills.len() {
            return;
        }
        self.skills[index].last_use_tick = tick;
        self.current_skill = Some(index);
        self.set_state(MobAiState::Skill, tick);
    }

    /// Whether the in-progress attack lands its damage this frame.
    pub fn should_deal_damage(&self, tick: i32) -> bool {
        let Some(attack) = self.current_attack() else {
            return false;
        };
        let elapsed = self.state_elapsed(tick);
        elapsed >= attack.delay_ms && elapsed < attack.delay_ms + 50
    }

    /// Animation action matching the current state.
    pub fn recommended_action(&self) -> String {
        match self.state {
            MobAiState::Idle | MobAiState::Alert => MobAction::Stand.name().to_string(),
            MobAiState::Patrol | MobAiState::Chase => MobAction::Move.name().to_string(),
            MobAiState::Attack => self
                .current_attack()
                .map(|a| a.animation.clone())
                .unwrap_or_else(|| MobAction::Attack1.name().to_string()),
            MobAiState::Skill => self
                .current_skill()
                .map(|s| s.animation.clone())
                .unwrap_or_else(|| "skill1".to_string()),
            MobAiState::Hit => MobAction::Hit1.name().to_string(),
            MobAiState::Death | MobAiState::Removed => MobAction::Die1.name().to_string(),
        }
    }

    /// Chase direction from the mob's position: -1 left, 0 hold, 1 right.
    pub fn chase_direction(&self, mob_x: f32) -> i32 {
        if !self.target.valid || self.state != MobAiState::Chase {
            return 0;
        }
        let dx = self.target.x - mob_x;
        if dx.abs() < 5.0 {
            0
        } else if dx > 0.0 {
            1
        } else {
            -1
        }
    }

    pub fn speed_multiplier(&self) -> f32 {
        if self.state == MobAiState::Chase {
            self.chase_speed_multiplier
        } else {
            1.0
        }
    }

    // --- status effects -----------------------------------------------------

    pub fn has_status(&self, flag: MobStatusFlags) -> bool {
        self.status.intersects(flag)
    }

    pub fn status_flags(&self) -> MobStatusFlags {
        self.status
    }

    /// Apply a status effect for a duration. Stun and freeze interrupt the
    /// current action.
    pub fn apply_status(&mut self, flag: MobStatusFlags, duration_ms: i32, tick: i32) {
        self.status |= flag;
        self.status_expiry.insert(flag, tick.wrapping_add(duration_ms));

        if flag.intersects(MobStatusFlags::STUN | MobStatusFlags::FREEZE)
            && matches!(self.state, MobAiState::Attack | MobAiState::Chase)
        {
            self.set_state(MobAiState::Hit, tick);
        }
    }

    pub fn remove_status(&mut self, flag: MobStatusFlags) {
        self.status &= !flag;
        self.status_expiry.remove(&flag);
    }

    pub fn clear_status(&mut self) {
        self.status = MobStatusFlags::empty();
        self.status_expiry.clear();
    }

    pub fn status_remaining(&self, flag: MobStatusFlags, tick: i32) -> i32 {
        if !self.has_status(flag) {
            return 0;
        }
        self.status_expiry
            .get(&flag)
            .map(|&expiry| (expiry.wrapping_sub(tick)).max(0))
            .unwrap_or(0)
    }

    fn update_status_effects(&mut self, tick: i32) {
        if self.status.is_empty() {
            return;
        }
        let expired: Vec<MobStatusFlags> = self
            .status_expiry
            .iter()
            .filter(|(_, &expiry)| tick.wrapping_sub(expiry) >= 0)
            .map(|(&flag, _)| flag)
            .collect();
        for flag in expired {
            self.remove_status(flag);
        }
    }

    /// Reset to a fresh spawn.
    pub fn reset(&mut self) {
        self.state = MobAiState::Idle;
        self.previous_state = MobAiState::Idle;
        self.state_start_tick = 0;
        self.target = TargetInfo::default();
        self.current_attack = None;
        self.current_skill = None;
        self.aggroed = false;
        self.boss_aggro_start_tick = 0;
        self.boss_aggro_timed_out = false;
        self.clear_status();
        for attack in &mut self.attacks {
            attack.last_use_tick = 0;
        }
        for skill in &mut self.skills {
            skill.last_use_tick = 0;
        }
    }

    /// Force a state without transition bookkeeping (map state restore).
    pub fn restore_state(&mut self, state: MobAiState, tick: i32) {
        self.state = state;
        self.state_start_tick = tick;
    }
}

// --- world-level systems ----------------------------------------------------

/// Run every mob's AI state machine for this tick.
pub fn update_ai(world: &mut World, player: Option<(f32, f32)>, tick: i32, events: &mut EventQueue) {
    puffin::profile_function!();

    for (entity, (pos, ai)) in world.query_mut::<(&Position, &mut MobAi)>() {
        let before = ai.state();
        ai.update(tick, pos.x, pos.y, player);
        if ai.state() != before {
            events.push(GameEvent::AiStateChanged {
                mob: entity,
                state: ai.state(),
            });
        }
    }
}

/// Push one mob's AI decisions into its movement state: chase direction
/// and speed, and a full stop while dead. `frame_index` is the mob's
/// current animation frame, used to pace queued turns.
pub fn drive_movement(pos: &Position, ai: &MobAi, mv: &mut Movement, frame_index: i32) {
    if ai.is_dead() {
        if !mv.is_stopped() {
            mv.stop();
            mv.current_action = MobAction::Die1;
        }
        return;
    }
    if mv.is_stopped() {
        mv.resume();
    }

    mv.set_speed_multiplier(ai.speed_multiplier());
    match ai.chase_direction(pos.x) {
        -1 => mv.force_direction(MoveDirection::Left, frame_index),
        1 => mv.force_direction(MoveDirection::Right, frame_index),
        _ => {}
    }
}

/// Apply damage to a mob: HP, aggro, stun, and the death transition.
///
/// Returns true when this damage killed the mob. Presentation events
/// (damage numbers, HP bars) are the attacker's concern.
pub fn damage_mob(
    world: &mut World,
    mob: Entity,
    damage: i32,
    tick: i32,
    attacker: Option<(f32, f32)>,
) -> bool {
    let Ok(mut query) = world.query_one::<(&mut Health, &mut MobAi)>(mob) else {
        return false;
    };
    let Some((health, ai)) = query.get() else {
        return false;
    };

    if ai.is_dead() {
        return false;
    }

    health.current -= damage;
    ai.on_damaged(tick, attacker);

    if health.current <= 0 {
        health.current = 0;
        ai.kill(tick, MobDeathType::Killed);
        return true;
    }
    false
}

/// Entities whose AI reached Removed; the pool despawns them.
pub fn collect_removed(world: &World) -> Vec<Entity> {
    world
        .query::<&MobAi>()
        .iter()
        .filter(|(_, ai)| ai.state() == MobAiState::Removed)
        .map(|(entity, _)| entity)
        .collect()
}
