//! Combat resolution: casts, cooldowns, buffs, projectiles, and the basic
//! melee/ranged/magic attacks.
//!
//! The manager owns character-scoped skill state (learned levels, hotkeys,
//! cooldown stamps) and the transient combat state (projectiles, buffs,
//! hit effects, the in-flight cast). The mob pool, player, event queue,
//! and RNG are passed into each call; nothing is borrowed across ticks.
//!
//! Mob kills discovered while scanning the pool are queued and applied
//! after the scan completes - the iteration snapshot is never mutated
//! mid-scan.

use std::collections::HashMap;
use std::sync::Arc;

use hecs::{Entity, World};
use rand::Rng;

use crate::components::Position;
use crate::constants::{
    BASIC_SHOT_LIFETIME, BASIC_SHOT_SPEED, CRIT_MULTIPLIER, DAMAGE_VARIANCE_MAX,
    DAMAGE_VARIANCE_MIN, DEFAULT_CAST_DURATION, MAGIC_CRIT_PERCENT, MAGIC_DAMAGE_BONUS,
    MAGIC_HIT_HEIGHT, MAGIC_HIT_WIDTH, MAGIC_KNOCKBACK_BASE, MAGIC_KNOCKBACK_CAP,
    MAGIC_KNOCKBACK_SCALE, MAGIC_MP_COST, MELEE_HIT_HEIGHT, MELEE_HIT_WIDTH,
    MELEE_KNOCKBACK_BASE, MELEE_KNOCKBACK_CAP, MELEE_KNOCKBACK_SCALE, MELEE_MAX_TARGETS,
    MOB_HITBOX_HEIGHT, MOB_HITBOX_WIDTH, PROJECTILE_SPREAD_DEG,
};
use crate::events::{EventQueue, GameEvent};
use crate::geometry::{Rect, Trapezoid};
use crate::player::Player;
use crate::skills::data::{
    ActiveBuff, ActiveHitEffect, ActiveProjectile, BuffStat, ProjectileData, SkillCastInfo,
    SkillData, SkillKind, SkillLevelData,
};
use crate::skills::loader::SkillLoader;
use crate::systems::ai::{damage_mob, MobAi};
use crate::systems::movement::Movement;
use crate::time::tick_diff;

/// Manages active skills, projectiles, buffs, and cooldowns.
pub struct SkillManager {
    loader: SkillLoader,

    // Transient combat state.
    projectiles: Vec<ActiveProjectile>,
    buffs: Vec<ActiveBuff>,
    hit_effects: Vec<ActiveHitEffect>,
    current_cast: Option<SkillCastInfo>,

    // Character-scoped state.
    /// skill id -> last cast tick.
    cooldowns: HashMap<i32, i32>,
    /// skill id -> learned level.
    skill_levels: HashMap<i32, i32>,
    available_skills: Vec<Arc<SkillData>>,
    /// key index -> skill id.
    hotkeys: HashMap<i32, i32>,

    next_projectile_id: i32,
}

impl SkillManager {
    pub fn new(loader: SkillLoader) -> Self {
        Self {
            loader,
            projectiles: Vec::new(),
            buffs: Vec::new(),
            hit_effects: Vec::new(),
            current_cast: None,
            cooldowns: HashMap::new(),
            skill_levels: HashMap::new(),
            available_skills: Vec::new(),
            hotkeys: HashMap::new(),
            next_projectile_id: 1,
        }
    }

    pub fn loader(&self) -> &SkillLoader {
        &self.loader
    }

    // --- skill book ---------------------------------------------------------

    /// Load the skill list for a job; newly seen skills start unlearned.
    pub fn load_skills_for_job(&mut self, job_id: i32) {
        self.available_skills = self.loader.skills_for_job(job_id);
        for skill in &self.available_skills {
            self.skill_levels.entry(skill.skill_id).or_insert(0);
        }
    }

    pub fn set_skill_level(&mut self, skill_id: i32, level: i32) {
        self.skill_levels.insert(skill_id, level);
    }

    pub fn skill_level(&self, skill_id: i32) -> i32 {
        self.skill_levels.get(&skill_id).copied().unwrap_or(0)
    }

    pub fn set_hotkey(&mut self, key_index: i32, skill_id: i32) {
        self.hotkeys.insert(key_index, skill_id);
    }

    pub fn hotkey_skill(&self, key_index: i32) -> i32 {
        self.hotkeys.get(&key_index).copied().unwrap_or(0)
    }

    /// Learned skills, in book order.
    pub fn learned_skills(&self) -> impl Iterator<Item = &Arc<SkillData>> {
        self.available_skills
            .iter()
            .filter(|s| self.skill_level(s.skill_id) > 0)
    }

    /// Castable learned skills (not passive, not hidden).
    pub fn active_skills(&self) -> impl Iterator<Item = &Arc<SkillData>> {
        self.learned_skills()
            .filter(|s| s.kind != SkillKind::Passive && !s.invisible)
    }

    // --- cast gating --------------------------------------------------------

    /// Whether a cast would succeed right now. No side effects.
    pub fn can_cast_skill(&self, player: &Player, skill_id: i32, tick: i32) -> bool {
        let level = self.skill_level(skill_id);
        if level <= 0 {
            return false;
        }
        let Some(skill) = self.loader.skill(skill_id) else {
            return false;
        };
        if skill.kind == SkillKind::Passive {
            return false;
        }
        if self.is_on_cooldown(skill_id, tick) {
            return false;
        }
        let Some(level_data) = skill.level(level) else {
            return false;
        };
        if player.mp < level_data.mp_cost {
            return false;
        }
        if player.hp <= level_data.hp_cost {
            return false;
        }
        if let Some(cast) = &self.current_cast {
            if !cast.complete {
                return false;
            }
        }
        // Attacks are impossible on ladders/ropes/water; buffs and heals
        // stay legal there
        if skill.kind == SkillKind::Attack && !player.can_attack() {
            return false;
        }
        true
    }

    pub fn is_on_cooldown(&self, skill_id: i32, tick: i32) -> bool {
        let Some(&last_cast) = self.cooldowns.get(&skill_id) else {
            return false;
        };
        let Some(skill) = self.loader.skill(skill_id) else {
            return false;
        };
        let level = self.skill_level(skill_id);
        let Some(level_data) = skill.level(level) else {
            return false;
        };
        // A zero-or-negative cooldown is never on cooldown
        if level_data.cooldown_ms <= 0 {
            return false;
        }
        tick_diff(tick, last_cast) < level_data.cooldown_ms
    }

    pub fn cooldown_remaining(&self, skill_id: i32, tick: i32) -> i32 {
        let Some(&last_cast) = self.cooldowns.get(&skill_id) else {
            return 0;
        };
        let Some(skill) = self.loader.skill(skill_id) else {
            return 0;
        };
        let Some(level_data) = skill.level(self.skill_level(skill_id)) else {
            return 0;
        };
        if level_data.cooldown_ms <= 0 {
            return 0;
        }
        (level_data.cooldown_ms - tick_diff(tick, last_cast)).max(0)
    }

    // --- casting ------------------------------------------------------------

    /// Validate and start a cast. A failed gate leaves every piece of
    /// state untouched.
    pub fn try_cast_skill(
        &mut self,
        world: &mut World,
        player: &mut Player,
        events: &mut EventQueue,
        rng: &mut impl Rng,
        skill_id: i32,
        tick: i32,
    ) -> bool {
        if !self.can_cast_skill(player, skill_id, tick) {
            return false;
        }
        let Some(skill) = self.loader.skill(skill_id) else {
            return false;
        };
        let level = self.skill_level(skill_id);
        self.start_cast(&skill, level, world, player, events, rng, tick);
        true
    }

    pub fn try_cast_hotkey(
        &mut self,
        world: &mut World,
        player: &mut Player,
        events: &mut EventQueue,
        rng: &mut impl Rng,
        key_index: i32,
        tick: i32,
    ) -> bool {
        let skill_id = self.hotkey_skill(key_index);
        if skill_id <= 0 {
            return false;
        }
        self.try_cast_skill(world, player, events, rng, skill_id, tick)
    }

    #[allow(clippy::too_many_arguments)]
    fn start_cast(
        &mut self,
        skill: &Arc<SkillData>,
        level: i32,
        world: &mut World,
        player: &mut Player,
        events: &mut EventQueue,
        rng: &mut impl Rng,
        tick: i32,
    ) {
        let Some(level_data) = skill.level(level).cloned() else {
            return;
        };

        self.current_cast = Some(SkillCastInfo {
            skill_id: skill.skill_id,
            level,
            cast_tick: tick,
            caster_x: player.x,
            caster_y: player.y,
            facing_right: player.facing_right,
            complete: false,
        });

        player.mp = (player.mp - level_data.mp_cost).max(0);
        if level_data.hp_cost > 0 {
            player.hp = (player.hp - level_data.hp_cost).max(1);
        }

        if level_data.cooldown_ms > 0 {
            self.cooldowns.insert(skill.skill_id, tick);
        }

        player.trigger_action(skill.action_name.as_deref().unwrap_or("attack1"));

        events.push(GameEvent::SkillCast {
            skill_id: skill.skill_id,
            level,
            caster_x: player.x,
            caster_y: player.y,
        });

        match skill.kind {
            SkillKind::Buff => self.apply_buff(skill, level, &level_data, player, events, tick),
            SkillKind::Heal => apply_heal(&level_data, player),
            SkillKind::Attack => {
                if skill.projectile.is_some() {
                    self.spawn_skill_projectiles(skill, level, &level_data, player, tick);
                } else {
                    self.process_melee_attack(
                        skill,
                        level,
                        &level_data,
                        world,
                        player,
                        events,
                        rng,
                        tick,
                    );
                }
            }
            // Summons and movement skills resolve in the host's field
            // layer; the cast bookkeeping above is all that happens here
            SkillKind::Summon | SkillKind::Movement | SkillKind::Passive => {}
        }
    }

    // --- basic attacks ------------------------------------------------------

    /// Basic close-range swing: up to three targets in a facing-relative
    /// box, knockback scaled by damage.
    pub fn try_melee_attack(
        &mut self,
        world: &mut World,
        player: &mut Player,
        events: &mut EventQueue,
        rng: &mut impl Rng,
        tick: i32,
    ) -> bool {
        if !player.can_attack() {
            return false;
        }

        player.trigger_action("swingO1");

        let offset_x = if player.facing_right {
            10
        } else {
            -(MELEE_HIT_WIDTH + 10)
        };
        let hitbox = Rect::new(
            player.x as i32 + offset_x,
            player.y as i32 - MELEE_HIT_HEIGHT - 10,
            MELEE_HIT_WIDTH,
            MELEE_HIT_HEIGHT,
        );

        let targets = collect_living_mobs(world);
        let mut hit_count = 0;
        let mut killed: Vec<(Entity, f32, f32)> = Vec::new();

        for (mob, mob_x, mob_y) in targets {
            if hit_count >= MELEE_MAX_TARGETS {
                break;
            }
            if !hitbox.intersects(&mob_hitbox(mob_x, mob_y)) {
                continue;
            }

            let damage = calculate_basic_damage(player, rng);
            let died = damage_mob(world, mob, damage, tick, Some((player.x, player.y)));

            if !died {
                if let Ok(mut movement) = world.get::<&mut Movement>(mob) {
                    let force = (MELEE_KNOCKBACK_BASE + damage as f32 / MELEE_KNOCKBACK_SCALE)
                        .min(MELEE_KNOCKBACK_CAP);
                    movement.apply_knockback_dir(force, player.facing_right);
                }
            }

            events.push(GameEvent::MobDamaged { mob, damage });
            events.push(GameEvent::DamageNumber {
                damage,
                x: mob_x,
                y: mob_y - 30.0,
                critical: damage > 100,
                stack: hit_count as i32,
            });

            // Deaths resolve after the scan finishes
            if died {
                killed.push((mob, mob_x, mob_y));
            }
            hit_count += 1;
        }

        for (mob, mob_x, mob_y) in killed {
            emit_mob_death(events, mob, mob_x, mob_y);
        }

        hit_count > 0
    }

    /// Basic ranged shot: one straight projectile from hand height.
    pub fn try_shoot(&mut self, player: &mut Player, tick: i32) -> bool {
        if !player.can_attack() {
            return false;
        }

        player.trigger_action("shoot1");

        let data = ProjectileData {
            speed: BASIC_SHOT_SPEED,
            lifetime_ms: BASIC_SHOT_LIFETIME,
            max_hits: 1,
            ..Default::default()
        };

        let mut projectile =
            ActiveProjectile::new(self.next_projectile_id, 0, 1, data, tick);
        self.next_projectile_id += 1;
        projectile.x = player.x;
        projectile.y = player.y - 25.0;
        projectile.facing_right = player.facing_right;
        projectile.velocity_x = if player.facing_right {
            BASIC_SHOT_SPEED
        } else {
            -BASIC_SHOT_SPEED
        };

        self.projectiles.push(projectile);
        true
    }

    /// Basic magic bolt: bigger reach, single closest target, MP cost,
    /// crit roll.
    pub fn try_magic_attack(
        &mut self,
        world: &mut World,
        player: &mut Player,
        events: &mut EventQueue,
        rng: &mut impl Rng,
        tick: i32,
    ) -> bool {
        if !player.can_attack() {
            return false;
        }
        if player.mp < MAGIC_MP_COST {
            return false;
        }

        player.trigger_action("swingO1");
        player.mp -= MAGIC_MP_COST;

        let offset_x = if player.facing_right {
            20
        } else {
            -(MAGIC_HIT_WIDTH + 20)
        };
        let hitbox = Rect::new(
            player.x as i32 + offset_x,
            player.y as i32 - MAGIC_HIT_HEIGHT - 10,
            MAGIC_HIT_WIDTH,
            MAGIC_HIT_HEIGHT,
        );

        let mut closest: Option<(Entity, f32, f32, f32)> = None;
        for (mob, mob_x, mob_y) in collect_living_mobs(world) {
            if !hitbox.intersects(&mob_hitbox(mob_x, mob_y)) {
                continue;
            }
            let distance = (mob_x - player.x).abs();
            if closest.map_or(true, |(_, _, _, best)| distance < best) {
                closest = Some((mob, mob_x, mob_y, distance));
            }
        }

        let Some((mob, mob_x, mob_y, _)) = closest else {
            return false;
        };

        let mut damage = calculate_basic_damage(player, rng) + MAGIC_DAMAGE_BONUS;
        let critical = rng.gen_range(0..100) < MAGIC_CRIT_PERCENT;
        if critical {
            damage = (damage as f32 * CRIT_MULTIPLIER) as i32;
        }

        let died = damage_mob(world, mob, damage, tick, Some((player.x, player.y)));

        if !died {
            if let Ok(mut movement) = world.get::<&mut Movement>(mob) {
                let force = (MAGIC_KNOCKBACK_BASE + damage as f32 / MAGIC_KNOCKBACK_SCALE)
                    .min(MAGIC_KNOCKBACK_CAP);
                movement.apply_knockback_dir(force, player.facing_right);
            }
        }

        events.push(GameEvent::MobDamaged { mob, damage });
        events.push(GameEvent::DamageNumber {
            damage,
            x: mob_x,
            y: mob_y - 30.0,
            critical,
            stack: 0,
        });

        if died {
            emit_mob_death(events, mob, mob_x, mob_y);
        }

        true
    }

    /// Roll one of the three basic attacks.
    pub fn try_random_attack(
        &mut self,
        world: &mut World,
        player: &mut Player,
        events: &mut EventQueue,
        rng: &mut impl Rng,
        tick: i32,
    ) -> bool {
        match rng.gen_range(0..3) {
            0 => self.try_melee_attack(world, player, events, rng, tick),
            1 => self.try_shoot(player, tick),
            _ => self.try_magic_attack(world, player, events, rng, tick),
        }
    }

    // --- skill attack resolution --------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn process_melee_attack(
        &mut self,
        skill: &Arc<SkillData>,
        level: i32,
        level_data: &SkillLevelData,
        world: &mut World,
        player: &mut Player,
        events: &mut EventQueue,
        rng: &mut impl Rng,
        tick: i32,
    ) {
        let range = skill.attack_range(level, player.facing_right);
        // Directional skill volumes test as a trapezoid anchored at the
        // caster
        let volume = Trapezoid::from_rect(
            range.x as f32,
            range.y as f32,
            range.width as f32,
            range.height as f32,
            player.facing_right,
        )
        .offset(player.x, player.y);

        let max_targets = level_data.mob_count.max(1) as usize;
        let attack_count = level_data.attack_count.max(1);

        let targets = collect_living_mobs(world);
        let mut hit_count = 0;
        let mut killed: Vec<(Entity, f32, f32)> = Vec::new();

        for (mob, mob_x, mob_y) in targets {
            if hit_count >= max_targets {
                break;
            }
            if !volume.intersects_rect(&mob_hitbox(mob_x, mob_y)) {
                continue;
            }

            for strike in 0..attack_count {
                let damage = calculate_skill_damage(level_data, player, rng);
                let died = damage_mob(world, mob, damage, tick, Some((player.x, player.y)));

                events.push(GameEvent::MobDamaged { mob, damage });
                events.push(GameEvent::DamageNumber {
                    damage,
                    x: mob_x,
                    y: mob_y - 30.0,
                    critical: damage > level_data.damage,
                    stack: strike,
                });

                if let Some(hit_effect) = &skill.hit_effect {
                    self.hit_effects.push(ActiveHitEffect {
                        skill_id: skill.skill_id,
                        x: mob_x,
                        y: mob_y - 20.0,
                        start_tick: tick,
                        animation: hit_effect.clone(),
                        facing_right: player.facing_right,
                    });
                }

                if died {
                    killed.push((mob, mob_x, mob_y));
                    break;
                }
            }
            hit_count += 1;
        }

        for (mob, mob_x, mob_y) in killed {
            emit_mob_death(events, mob, mob_x, mob_y);
        }
    }

    // --- projectiles --------------------------------------------------------

    fn spawn_skill_projectiles(
        &mut self,
        skill: &Arc<SkillData>,
        level: i32,
        level_data: &SkillLevelData,
        player: &Player,
        tick: i32,
    ) {
        let Some(template) = &skill.projectile else {
            return;
        };
        let bullet_count = level_data.bullet_count.max(1);

        for i in 0..bullet_count {
            let mut projectile = ActiveProjectile::new(
                self.next_projectile_id,
                skill.skill_id,
                level,
                template.clone(),
                tick,
            );
            self.next_projectile_id += 1;
            projectile.level_data = Some(level_data.clone());
            projectile.x = player.x;
            projectile.y = player.y - 20.0;
            projectile.facing_right = player.facing_right;

            let speed = template.speed;
            if bullet_count > 1 {
                // Fan out around the facing axis
                let spread = (i as f32 - (bullet_count - 1) as f32 / 2.0)
                    * PROJECTILE_SPREAD_DEG.to_radians();
                let direction = if player.facing_right { 1.0 } else { -1.0 };
                projectile.velocity_x = speed * spread.cos() * direction;
                projectile.velocity_y = speed * spread.sin();
            } else {
                projectile.velocity_x = if player.facing_right { speed } else { -speed };
            }

            self.projectiles.push(projectile);
        }
    }

    fn update_projectiles(
        &mut self,
        world: &mut World,
        player: &Player,
        events: &mut EventQueue,
        rng: &mut impl Rng,
        tick: i32,
        step: f32,
    ) {
        let mut projectiles = std::mem::take(&mut self.projectiles);

        for projectile in &mut projectiles {
            projectile.update(step, tick);
            if projectile.is_expired() || projectile.is_exploding() {
                continue;
            }
            self.check_projectile_collisions(projectile, world, player, events, rng, tick);
        }

        projectiles.retain(|p| !p.is_expired());
        self.projectiles = projectiles;
    }

    fn check_projectile_collisions(
        &mut self,
        projectile: &mut ActiveProjectile,
        world: &mut World,
        player: &Player,
        events: &mut EventQueue,
        rng: &mut impl Rng,
        tick: i32,
    ) {
        let hitbox = projectile.hitbox();
        let max_targets = projectile
            .level_data
            .as_ref()
            .map_or(1, |l| l.mob_count.max(1));
        let skill = self.loader.skill(projectile.skill_id);

        for (mob, mob_x, mob_y) in collect_living_mobs(world) {
            if !projectile.can_hit_mob(mob.to_bits().get()) {
                continue;
            }
            if !hitbox.intersects(&mob_hitbox(mob_x, mob_y)) {
                continue;
            }

            projectile.register_hit(mob.to_bits().get(), tick);

            let attack_count = projectile
                .level_data
                .as_ref()
                .map_or(1, |l| l.attack_count.max(1));

            let mut killed = false;
            for strike in 0..attack_count {
                let damage = match (&skill, &projectile.level_data) {
                    (Some(_), Some(level_data)) => {
                        calculate_skill_damage(level_data, player, rng)
                    }
                    _ => calculate_basic_damage(player, rng),
                };

                let died = damage_mob(world, mob, damage, tick, Some((player.x, player.y)));

                events.push(GameEvent::MobDamaged { mob, damage });
                events.push(GameEvent::DamageNumber {
                    damage,
                    x: mob_x,
                    y: mob_y - 30.0,
                    critical: false,
                    stack: strike,
                });

                if let Some(hit_effect) = skill.as_ref().and_then(|s| s.hit_effect.as_ref()) {
                    self.hit_effects.push(ActiveHitEffect {
                        skill_id: projectile.skill_id,
                        x: mob_x,
                        y: mob_y - 20.0,
                        start_tick: tick,
                        animation: hit_effect.clone(),
                        facing_right: projectile.facing_right,
                    });
                }

                if died {
                    killed = true;
                    break;
                }
            }

            events.push(GameEvent::ProjectileHit {
                projectile_id: projectile.id,
                skill_id: projectile.skill_id,
                mob,
                x: mob_x,
                y: mob_y,
            });
            if killed {
                emit_mob_death(events, mob, mob_x, mob_y);
            }

            if projectile.is_exploding() || projectile.is_expired() {
                break;
            }
            if projectile.hit_count >= max_targets {
                break;
            }
        }
    }

    pub fn active_projectiles(&self) -> &[ActiveProjectile] {
        &self.projectiles
    }

    // --- buffs --------------------------------------------------------------

    fn apply_buff(
        &mut self,
        skill: &Arc<SkillData>,
        level: i32,
        level_data: &SkillLevelData,
        player: &mut Player,
        events: &mut EventQueue,
        tick: i32,
    ) {
        if level_data.duration_s <= 0 {
            return;
        }

        // Recasting replaces: the old buff's deltas revert before the new
        // ones apply, so stats never drift
        let mut removed = Vec::new();
        self.buffs.retain(|buff| {
            if buff.skill_id == skill.skill_id {
                removed.push(buff.clone());
                false
            } else {
                true
            }
        });
        for old in removed {
            apply_buff_stats(player, &old.level_data, false);
            events.push(GameEvent::BuffExpired {
                skill_id: old.skill_id,
            });
        }

        let buff = ActiveBuff {
            skill_id: skill.skill_id,
            level,
            start_tick: tick,
            duration_ms: level_data.duration_s * 1000,
            level_data: level_data.clone(),
        };

        apply_buff_stats(player, level_data, true);
        events.push(GameEvent::BuffApplied {
            skill_id: skill.skill_id,
            duration_ms: buff.duration_ms,
        });
        self.buffs.push(buff);
    }

    fn update_buffs(&mut self, player: &mut Player, events: &mut EventQueue, tick: i32) {
        let mut expired = Vec::new();
        self.buffs.retain(|buff| {
            if buff.is_expired(tick) {
                expired.push(buff.clone());
                false
            } else {
                true
            }
        });
        for buff in expired {
            apply_buff_stats(player, &buff.level_data, false);
            events.push(GameEvent::BuffExpired {
                skill_id: buff.skill_id,
            });
        }
    }

    pub fn active_buffs(&self) -> &[ActiveBuff] {
        &self.buffs
    }

    pub fn has_buff(&self, skill_id: i32) -> bool {
        self.buffs.iter().any(|b| b.skill_id == skill_id)
    }

    /// Sum of a stat's deltas across active buffs.
    pub fn buff_stat(&self, stat: BuffStat) -> i32 {
        self.buffs
            .iter()
            .map(|buff| stat_delta(&buff.level_data, stat))
            .sum()
    }

    // --- passives -----------------------------------------------------------

    /// Sum of a stat across learned passive skills.
    pub fn passive_bonus(&self, stat: BuffStat) -> i32 {
        self.available_skills
            .iter()
            .filter(|s| s.kind == SkillKind::Passive)
            .filter_map(|s| {
                let level = self.skill_level(s.skill_id);
                if level <= 0 {
                    return None;
                }
                s.level(level).map(|l| match stat {
                    BuffStat::CriticalRate => l.critical_rate,
                    BuffStat::Booster => l.x,
                    _ => stat_delta(l, stat),
                })
            })
            .sum()
    }

    /// Best weapon mastery among learned passives, floored at the base 10%.
    pub fn mastery(&self) -> i32 {
        self.available_skills
            .iter()
            .filter(|s| s.kind == SkillKind::Passive)
            .filter_map(|s| {
                let level = self.skill_level(s.skill_id);
                if level <= 0 {
                    return None;
                }
                s.level(level).map(|l| l.mastery)
            })
            .fold(10, i32::max)
    }

    // --- per-tick update ----------------------------------------------------

    /// Advance the in-flight cast, projectiles, buffs, and hit effects.
    pub fn update(
        &mut self,
        world: &mut World,
        player: &mut Player,
        events: &mut EventQueue,
        rng: &mut impl Rng,
        tick: i32,
        dt_ms: i32,
    ) {
        puffin::profile_function!();

        if let Some(cast) = &mut self.current_cast {
            if !cast.complete {
                let effect = self
                    .loader
                    .skill(cast.skill_id)
                    .and_then(|s| s.effect.clone());
                let animation_time = cast.animation_time(tick);
                cast.complete = match effect {
                    Some(effect) => effect.is_complete(animation_time),
                    None => animation_time > DEFAULT_CAST_DURATION,
                };
            }
        }

        let step = dt_ms as f32 / 16.67;
        self.update_projectiles(world, player, events, rng, tick, step);
        self.update_buffs(player, events, tick);
        self.hit_effects.retain(|effect| !effect.is_expired(tick));
    }

    pub fn current_cast(&self) -> Option<&SkillCastInfo> {
        self.current_cast.as_ref()
    }

    pub fn active_hit_effects(&self) -> &[ActiveHitEffect] {
        &self.hit_effects
    }

    // --- teardown -----------------------------------------------------------

    /// Map transition: drop map-scoped combat state, keep the character's
    /// skills. Learned levels, hotkeys, and cooldowns survive; projectiles,
    /// hit effects, the cast, and buffs (reverted first) do not.
    pub fn clear_map_state(&mut self, player: &mut Player) {
        self.projectiles.clear();
        self.hit_effects.clear();
        self.current_cast = None;

        for buff in &self.buffs {
            apply_buff_stats(player, &buff.level_data, false);
        }
        self.buffs.clear();
    }

    /// Full teardown: everything goes, including the skill book.
    pub fn clear(&mut self, player: &mut Player) {
        self.clear_map_state(player);
        self.cooldowns.clear();
        self.skill_levels.clear();
        self.hotkeys.clear();
        self.available_skills.clear();
    }
}

// --- free helpers -----------------------------------------------------------

/// Living mobs with their positions, snapshotted for a scan.
fn collect_living_mobs(world: &World) -> Vec<(Entity, f32, f32)> {
    world
        .query::<(&Position, &MobAi)>()
        .iter()
        .filter(|(_, (_, ai))| !ai.is_dead())
        .map(|(entity, (pos, _))| (entity, pos.x, pos.y))
        .collect()
}

/// Mob hitbox anchored at the feet position.
fn mob_hitbox(x: f32, y: f32) -> Rect {
    Rect::new(
        x as i32 - MOB_HITBOX_WIDTH / 2,
        y as i32 - MOB_HITBOX_HEIGHT,
        MOB_HITBOX_WIDTH,
        MOB_HITBOX_HEIGHT,
    )
}

/// Unmodified weapon swing damage with variance.
fn calculate_basic_damage(player: &Player, rng: &mut impl Rng) -> i32 {
    let variance = rng.gen_range(DAMAGE_VARIANCE_MIN..DAMAGE_VARIANCE_MAX);
    ((player.total_attack() as f32 * variance) as i32).max(1)
}

/// Skill damage: base attack scaled by the level's damage percent, with
/// variance.
fn calculate_skill_damage(
    level_data: &SkillLevelData,
    player: &Player,
    rng: &mut impl Rng,
) -> i32 {
    let multiplier = level_data.damage as f32 / 100.0;
    let variance = rng.gen_range(DAMAGE_VARIANCE_MIN..DAMAGE_VARIANCE_MAX);
    ((player.total_attack() as f32 * multiplier * variance) as i32).max(1)
}

/// Apply or revert a buff's stat deltas. The deltas are symmetric: one
/// apply followed by one revert restores the exact prior stats.
fn apply_buff_stats(player: &mut Player, level_data: &SkillLevelData, apply: bool) {
    let modifier = if apply { 1 } else { -1 };
    player.attack += level_data.pad * modifier;
    player.magic_attack += level_data.mad * modifier;
    player.defense += level_data.pdd * modifier;
    player.magic_defense += level_data.mdd * modifier;
    player.accuracy += level_data.acc * modifier;
    player.avoidability += level_data.eva * modifier;
    player.speed += level_data.speed * modifier;
    player.jump += level_data.jump * modifier;
}

fn stat_delta(level_data: &SkillLevelData, stat: BuffStat) -> i32 {
    match stat {
        BuffStat::Attack => level_data.pad,
        BuffStat::MagicAttack => level_data.mad,
        BuffStat::Defense => level_data.pdd,
        BuffStat::MagicDefense => level_data.mdd,
        BuffStat::Accuracy => level_data.acc,
        BuffStat::Avoidability => level_data.eva,
        BuffStat::Speed => level_data.speed,
        BuffStat::Jump => level_data.jump,
        BuffStat::CriticalRate => level_data.critical_rate,
        BuffStat::Booster => 0,
    }
}

fn apply_heal(level_data: &SkillLevelData, player: &mut Player) {
    let mut hp_heal = level_data.hp;
    // Percentage heals store the percent in x
    if level_data.x > 0 {
        hp_heal = player.max_hp * level_data.x / 100;
    }

    if hp_heal > 0 {
        player.hp = (player.hp + hp_heal).min(player.max_hp);
    }
    if level_data.mp > 0 {
        player.mp = (player.mp + level_data.mp).min(player.max_mp);
    }
}

fn emit_mob_death(events: &mut EventQueue, mob: Entity, x: f32, y: f32) {
    events.push(GameEvent::MobDied { mob, x, y });
    events.push(GameEvent::MobHpBarRemoved { mob });
}
