//! Skill definitions and the transient combat state they spawn.
//!
//! [`SkillData`] and [`SkillLevelData`] are immutable after load and shared
//! by id. The `Active*` types are per-cast state owned by the skill
//! manager, created on cast or hit and dropped on expiry.

use crate::geometry::Rect;
use crate::time::tick_diff;

/// What casting a skill does. Dispatch is an exhaustive match on this, so
/// adding a kind forces every call site to decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillKind {
    /// Direct damage (melee range or projectile).
    Attack,
    /// Timed reversible stat modification on the caster.
    Buff,
    /// HP/MP recovery.
    Heal,
    /// Spawns a summon.
    Summon,
    /// Teleports, flash jumps.
    Movement,
    /// Always on, never cast.
    Passive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkillElement {
    #[default]
    Physical,
    Fire,
    Ice,
    Lightning,
    Poison,
    Holy,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkillTarget {
    #[default]
    SingleEnemy,
    MultipleEnemy,
    SelfTarget,
    Party,
    Ground,
    Direction,
}

/// Which caster animation family the skill triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkillAttackType {
    #[default]
    Melee,
    Ranged,
    Magic,
    Summon,
    Special,
}

/// Buffable/passive stat identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuffStat {
    Attack,
    MagicAttack,
    Defense,
    MagicDefense,
    Accuracy,
    Avoidability,
    Speed,
    Jump,
    CriticalRate,
    Booster,
}

/// One row of a skill's per-level table.
#[derive(Debug, Clone, Default)]
pub struct SkillLevelData {
    pub level: i32,

    // Damage
    /// Damage percent (150 = 150%).
    pub damage: i32,
    pub attack_count: i32,
    pub mob_count: i32,

    // Costs
    pub mp_cost: i32,
    pub hp_cost: i32,

    // Timing
    pub cooldown_ms: i32,
    /// Buff duration in seconds.
    pub duration_s: i32,

    // Range
    pub range: i32,
    pub range_right: i32,
    pub range_left: i32,
    pub range_y: i32,

    // Buff stat deltas
    pub pad: i32,
    pub mad: i32,
    pub pdd: i32,
    pub mdd: i32,
    pub acc: i32,
    pub eva: i32,
    pub speed: i32,
    pub jump: i32,

    // Heal
    pub hp: i32,
    pub mp: i32,

    // Generic skill values
    pub prop: i32,
    pub x: i32,
    pub y: i32,
    pub z: i32,

    // Projectile
    pub bullet_count: i32,
    pub bullet_speed: i32,

    pub mastery: i32,
    pub critical_rate: i32,
}

/// One frame of a skill effect timeline.
#[derive(Debug, Clone, Copy)]
pub struct SkillFrame {
    pub sprite: u32,
    pub delay_ms: i32,
    pub flip: bool,
    pub origin: (i32, i32),
}

impl SkillFrame {
    pub fn new(sprite: u32, delay_ms: i32) -> Self {
        Self {
            sprite,
            delay_ms,
            flip: false,
            origin: (0, 0),
        }
    }
}

/// Delay-summed effect animation timeline.
#[derive(Debug, Clone, Default)]
pub struct SkillAnimation {
    pub name: String,
    pub frames: Vec<SkillFrame>,
    pub looping: bool,
    pub z_order: i32,
}

impl SkillAnimation {
    pub fn new(name: &str, frames: Vec<SkillFrame>) -> Self {
        Self {
            name: name.to_string(),
            frames,
            looping: false,
            z_order: 0,
        }
    }

    pub fn total_duration(&self) -> i32 {
        self.frames.iter().map(|f| f.delay_ms).sum()
    }

    /// Frame visible `time_ms` into the animation.
    pub fn frame_at(&self, time_ms: i32) -> Option<&SkillFrame> {
        if self.frames.is_empty() {
            return None;
        }
        let total = self.total_duration();
        if total == 0 {
            return self.frames.first();
        }

        let time = if self.looping {
            time_ms.rem_euclid(total)
        } else {
            time_ms.clamp(0, total - 1)
        };

        let mut elapsed = 0;
        for frame in &self.frames {
            elapsed += frame.delay_ms;
            if time < elapsed {
                return Some(frame);
            }
        }
        self.frames.last()
    }

    /// A non-looping animation is complete once its timeline has elapsed.
    pub fn is_complete(&self, time_ms: i32) -> bool {
        !self.looping && time_ms >= self.total_duration()
    }
}

/// Projectile template attached to ranged skills.
#[derive(Debug, Clone)]
pub struct ProjectileData {
    pub skill_id: i32,
    pub animation: Option<SkillAnimation>,
    /// Speed in px per normalized frame.
    pub speed: f32,
    /// Downward acceleration per normalized frame.
    pub gravity: f32,
    /// Lifetime in ms.
    pub lifetime_ms: f32,
    pub piercing: bool,
    pub max_hits: i32,
    pub explosion_radius: f32,
    pub explosion_animation: Option<SkillAnimation>,
}

impl Default for ProjectileData {
    fn default() -> Self {
        Self {
            skill_id: 0,
            animation: None,
            speed: 8.0,
            gravity: 0.0,
            lifetime_ms: 2000.0,
            piercing: false,
            max_hits: 1,
            explosion_radius: 0.0,
            explosion_animation: None,
        }
    }
}

/// Immutable skill definition.
#[derive(Debug, Clone)]
pub struct SkillData {
    pub skill_id: i32,
    pub name: String,
    pub description: String,
    pub max_level: i32,

    pub kind: SkillKind,
    pub element: SkillElement,
    pub target: SkillTarget,
    pub attack_type: SkillAttackType,

    /// Owning job id (e.g. 100 = Warrior).
    pub job: i32,
    /// Hidden from skill listings.
    pub invisible: bool,

    pub levels: Vec<SkillLevelData>,

    /// Effect on the caster while casting.
    pub effect: Option<SkillAnimation>,
    /// Effect on each struck target.
    pub hit_effect: Option<SkillAnimation>,
    /// Looping effect while the buff is active.
    pub affected_effect: Option<SkillAnimation>,
    pub projectile: Option<ProjectileData>,

    /// Caster animation action to trigger.
    pub action_name: Option<String>,
}

impl SkillData {
    pub fn new(skill_id: i32, name: &str, kind: SkillKind) -> Self {
        Self {
            skill_id,
            name: name.to_string(),
            description: String::new(),
            max_level: 1,
            kind,
            element: SkillElement::default(),
            target: SkillTarget::default(),
            attack_type: SkillAttackType::default(),
            job: 0,
            invisible: false,
            levels: Vec::new(),
            effect: None,
            hit_effect: None,
            affected_effect: None,
            projectile: None,
            action_name: None,
        }
    }

    /// Level row, clamped into [1, max_level].
    pub fn level(&self, level: i32) -> Option<&SkillLevelData> {
        let level = level.clamp(1, self.max_level);
        self.levels.iter().find(|l| l.level == level)
    }

    pub fn damage_multiplier(&self, level: i32) -> f32 {
        self.level(level).map_or(1.0, |l| l.damage as f32 / 100.0)
    }

    /// Attack range rectangle relative to the caster's feet.
    pub fn attack_range(&self, level: i32, facing_right: bool) -> Rect {
        let Some(level_data) = self.level(level) else {
            return Rect::default();
        };

        let mut range_x = if facing_right {
            level_data.range_right
        } else {
            level_data.range_left
        };
        if range_x == 0 {
            range_x = level_data.range;
        }

        let height = if level_data.range_y > 0 {
            level_data.range_y
        } else {
            60
        };

        Rect::new(
            if facing_right { 0 } else { -range_x },
            -level_data.range_y / 2,
            range_x,
            height,
        )
    }
}

/// A buff currently on the caster.
#[derive(Debug, Clone)]
pub struct ActiveBuff {
    pub skill_id: i32,
    pub level: i32,
    pub start_tick: i32,
    pub duration_ms: i32,
    pub level_data: SkillLevelData,
}

impl ActiveBuff {
    pub fn is_expired(&self, tick: i32) -> bool {
        tick_diff(tick, self.start_tick) >= self.duration_ms
    }

    pub fn remaining_ms(&self, tick: i32) -> i32 {
        (self.duration_ms - tick_diff(tick, self.start_tick)).max(0)
    }

    pub fn remaining_fraction(&self, tick: i32) -> f32 {
        if self.duration_ms <= 0 {
            return 0.0;
        }
        self.remaining_ms(tick) as f32 / self.duration_ms as f32
    }
}

/// A projectile in flight (or exploding in place).
#[derive(Debug, Clone)]
pub struct ActiveProjectile {
    pub id: i32,
    pub skill_id: i32,
    pub skill_level: i32,
    pub data: ProjectileData,
    pub level_data: Option<SkillLevelData>,

    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub facing_right: bool,

    pub spawn_tick: i32,
    pub hit_count: i32,
    hit_mob_ids: Vec<u64>,
    expired: bool,
    exploding: bool,
    pub explode_tick: i32,
}

impl ActiveProjectile {
    pub fn new(id: i32, skill_id: i32, skill_level: i32, data: ProjectileData, tick: i32) -> Self {
        Self {
            id,
            skill_id,
            skill_level,
            data,
            level_data: None,
            x: 0.0,
            y: 0.0,
            velocity_x: 0.0,
            velocity_y: 0.0,
            facing_right: true,
            spawn_tick: tick,
            hit_count: 0,
            hit_mob_ids: Vec::new(),
            expired: false,
            exploding: false,
            explode_tick: 0,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn is_exploding(&self) -> bool {
        self.exploding
    }

    /// Integrate one step. `step` is the frame-normalized delta
    /// (dt_ms / 16.67).
    pub fn update(&mut self, step: f32, tick: i32) {
        if self.expired {
            return;
        }

        if tick_diff(tick, self.spawn_tick) as f32 >= self.data.lifetime_ms {
            self.expired = true;
            return;
        }

        if self.exploding {
            // Exploding projectiles never resume flight; they expire once
            // the explosion animation has played out
            if let Some(explosion) = &self.data.explosion_animation {
                if explosion.is_complete(tick_diff(tick, self.explode_tick)) {
                    self.expired = true;
                }
            } else {
                self.expired = true;
            }
            return;
        }

        self.velocity_y += self.data.gravity * step;
        self.x += self.velocity_x * step;
        self.y += self.velocity_y * step;
    }

    pub fn hitbox(&self) -> Rect {
        Rect::new(self.x as i32 - 10, self.y as i32 - 10, 20, 20)
    }

    /// Enter the exploding sub-state (or expire outright without one).
    pub fn explode(&mut self, tick: i32) {
        if self.data.explosion_radius <= 0.0 && self.data.explosion_animation.is_none() {
            self.expired = true;
            return;
        }
        self.exploding = true;
        self.explode_tick = tick;
        self.velocity_x = 0.0;
        self.velocity_y = 0.0;
    }

    /// Whether this projectile may still hit the given mob.
    pub fn can_hit_mob(&self, mob_id: u64) -> bool {
        if self.hit_mob_ids.contains(&mob_id) {
            return false;
        }
        if !self.data.piercing && self.hit_count >= self.data.max_hits {
            return false;
        }
        true
    }

    /// Record a hit; a non-piercing projectile at its hit cap explodes.
    pub fn register_hit(&mut self, mob_id: u64, tick: i32) {
        self.hit_mob_ids.push(mob_id);
        self.hit_count += 1;

        if !self.data.piercing && self.hit_count >= self.data.max_hits {
            self.explode(tick);
        }
    }
}

/// The single in-flight cast. Caster position and facing are frozen at
/// cast time.
#[derive(Debug, Clone)]
pub struct SkillCastInfo {
    pub skill_id: i32,
    pub level: i32,
    pub cast_tick: i32,
    pub caster_x: f32,
    pub caster_y: f32,
    pub facing_right: bool,
    pub complete: bool,
}

impl SkillCastInfo {
    pub fn animation_time(&self, tick: i32) -> i32 {
        tick_diff(tick, self.cast_tick)
    }
}

/// A hit effect playing on a struck mob's position.
#[derive(Debug, Clone)]
pub struct ActiveHitEffect {
    pub skill_id: i32,
    pub x: f32,
    pub y: f32,
    pub start_tick: i32,
    pub animation: SkillAnimation,
    pub facing_right: bool,
}

impl ActiveHitEffect {
    pub fn animation_time(&self, tick: i32) -> i32 {
        tick_diff(tick, self.start_tick)
    }

    pub fn is_expired(&self, tick: i32) -> bool {
        self.animation.is_complete(self.animation_time(tick))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline(delays: &[i32]) -> SkillAnimation {
        SkillAnimation::new(
            "fx",
            delays
                .iter()
                .enumerate()
                .map(|(i, &d)| SkillFrame::new(i as u32, d))
                .collect(),
        )
    }

    #[test]
    fn test_animation_frame_at() {
        let anim = timeline(&[100, 100, 100]);
        assert_eq!(anim.frame_at(0).unwrap().sprite, 0);
        assert_eq!(anim.frame_at(150).unwrap().sprite, 1);
        assert_eq!(anim.frame_at(250).unwrap().sprite, 2);
        // Past the end clamps to the last frame
        assert_eq!(anim.frame_at(1000).unwrap().sprite, 2);
        assert!(anim.is_complete(300));
        assert!(!anim.is_complete(299));
    }

    #[test]
    fn test_animation_looping_wraps() {
        let mut anim = timeline(&[100, 100]);
        anim.looping = true;
        assert_eq!(anim.frame_at(250).unwrap().sprite, 0);
        assert!(!anim.is_complete(10_000));
    }

    #[test]
    fn test_level_lookup_clamps() {
        let mut skill = SkillData::new(1, "slash", SkillKind::Attack);
        skill.max_level = 2;
        skill.levels = vec![
            SkillLevelData {
                level: 1,
                damage: 150,
                ..Default::default()
            },
            SkillLevelData {
                level: 2,
                damage: 180,
                ..Default::default()
            },
        ];

        assert_eq!(skill.level(0).unwrap().level, 1);
        assert_eq!(skill.level(99).unwrap().level, 2);
        assert_eq!(skill.damage_multiplier(2), 1.8);
    }

    #[test]
    fn test_attack_range_faces_left() {
        let mut skill = SkillData::new(1, "slash", SkillKind::Attack);
        skill.max_level = 1;
        skill.levels = vec![SkillLevelData {
            level: 1,
            range: 120,
            range_y: 80,
            ..Default::default()
        }];

        let right = skill.attack_range(1, true);
        assert_eq!(right, Rect::new(0, -40, 120, 80));
        let left = skill.attack_range(1, false);
        assert_eq!(left, Rect::new(-120, -40, 120, 80));
    }

    #[test]
    fn test_buff_expiry() {
        let buff = ActiveBuff {
            skill_id: 1,
            level: 1,
            start_tick: 1000,
            duration_ms: 5000,
            level_data: SkillLevelData::default(),
        };

        assert!(!buff.is_expired(5999));
        assert!(buff.is_expired(6000));
        assert_eq!(buff.remaining_ms(3000), 3000);
        assert_eq!(buff.remaining_fraction(3500), 0.5);
    }

    #[test]
    fn test_projectile_lifetime_expiry() {
        let mut proj = ActiveProjectile::new(1, 0, 1, ProjectileData::default(), 1000);
        proj.velocity_x = 8.0;

        proj.update(1.0, 1016);
        assert!(!proj.is_expired());
        assert_eq!(proj.x, 8.0);

        proj.update(1.0, 3001);
        assert!(proj.is_expired());
    }

    #[test]
    fn test_projectile_gravity_curves_path() {
        let data = ProjectileData {
            gravity: 0.5,
            ..Default::default()
        };
        let mut proj = ActiveProjectile::new(1, 0, 1, data, 0);
        proj.velocity_x = 8.0;

        proj.update(1.0, 16);
        proj.update(1.0, 32);
        assert_eq!(proj.velocity_y, 1.0);
        assert_eq!(proj.y, 1.5);
    }

    #[test]
    fn test_projectile_no_double_hit() {
        let mut proj = ActiveProjectile::new(
            1,
            0,
            1,
            ProjectileData {
                max_hits: 2,
                ..Default::default()
            },
            0,
        );

        assert!(proj.can_hit_mob(7));
        proj.register_hit(7, 100);
        assert!(!proj.can_hit_mob(7));
        assert!(proj.can_hit_mob(8));
        proj.register_hit(8, 120);
        // Hit cap reached: no explosion animation, so it expires outright
        assert!(!proj.can_hit_mob(9));
        assert!(proj.is_expired());
    }

    #[test]
    fn test_exploding_projectile_stops_and_expires() {
        let data = ProjectileData {
            max_hits: 1,
            explosion_animation: Some(timeline(&[50, 50])),
            ..Default::default()
        };
        let mut proj = ActiveProjectile::new(1, 0, 1, data, 0);
        proj.velocity_x = 8.0;
        proj.update(1.0, 16);

        proj.register_hit(3, 16);
        assert!(proj.is_exploding());
        assert_eq!(proj.velocity_x, 0.0);

        // Motion never resumes while the explosion plays
        let x = proj.x;
        proj.update(1.0, 60);
        assert_eq!(proj.x, x);
        assert!(!proj.is_expired());

        proj.update(1.0, 130);
        assert!(proj.is_expired());
    }

    #[test]
    fn test_piercing_projectile_keeps_flying() {
        let data = ProjectileData {
            piercing: true,
            max_hits: 1,
            ..Default::default()
        };
        let mut proj = ActiveProjectile::new(1, 0, 1, data, 0);
        proj.velocity_x = 8.0;

        proj.register_hit(1, 10);
        proj.register_hit(2, 20);
        assert!(!proj.is_exploding());
        assert!(!proj.is_expired());
        assert!(proj.can_hit_mob(3));
    }
}
