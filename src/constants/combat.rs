//! Combat tuning constants.

/// Minimum damage variance multiplier
pub const DAMAGE_VARIANCE_MIN: f32 = 0.9;
/// Maximum damage variance multiplier
pub const DAMAGE_VARIANCE_MAX: f32 = 1.1;
/// Basic magic attack crit chance (percent)
pub const MAGIC_CRIT_PERCENT: i32 = 20;
/// Critical damage multiplier
pub const CRIT_MULTIPLIER: f32 = 1.5;

/// Basic melee hitbox (pixels)
pub const MELEE_HIT_WIDTH: i32 = 80;
pub const MELEE_HIT_HEIGHT: i32 = 60;
/// Basic melee target cap
pub const MELEE_MAX_TARGETS: usize = 3;
/// Basic magic hitbox (pixels) - longer reach, single target
pub const MAGIC_HIT_WIDTH: i32 = 120;
pub const MAGIC_HIT_HEIGHT: i32 = 80;
/// MP cost of the basic magic attack
pub const MAGIC_MP_COST: i32 = 10;
/// Flat bonus of the basic magic attack over melee
pub const MAGIC_DAMAGE_BONUS: i32 = 50;

/// Melee knockback: base force plus damage / MELEE_KNOCKBACK_SCALE, capped
pub const MELEE_KNOCKBACK_BASE: f32 = 6.0;
pub const MELEE_KNOCKBACK_SCALE: f32 = 50.0;
pub const MELEE_KNOCKBACK_CAP: f32 = 12.0;
/// Magic knockback is gentler
pub const MAGIC_KNOCKBACK_BASE: f32 = 4.0;
pub const MAGIC_KNOCKBACK_SCALE: f32 = 80.0;
pub const MAGIC_KNOCKBACK_CAP: f32 = 8.0;

/// Mob hitbox (pixels), anchored at the feet
pub const MOB_HITBOX_WIDTH: i32 = 40;
pub const MOB_HITBOX_HEIGHT: i32 = 50;

/// Basic arrow speed (px per physics step)
pub const BASIC_SHOT_SPEED: f32 = 8.0;
/// Basic arrow lifetime (ms)
pub const BASIC_SHOT_LIFETIME: f32 = 2000.0;
/// Angular spread between fanned projectiles (degrees)
pub const PROJECTILE_SPREAD_DEG: f32 = 10.0;
