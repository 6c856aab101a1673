//! Mob AI tuning constants.

/// Default aggro detection range (pixels)
pub const DEFAULT_AGGRO_RANGE: i32 = 200;
/// Default melee attack range (pixels)
pub const DEFAULT_ATTACK_RANGE: i32 = 50;
/// Time in alert state before chasing (ms)
pub const ALERT_DURATION: i32 = 500;
/// Default cooldown between mob attacks (ms)
pub const ATTACK_COOLDOWN: i32 = 1500;
/// Stun duration when a mob is hit (ms)
pub const HIT_STUN_DURATION: i32 = 300;
/// Death animation duration before the mob leaves the pool (ms)
pub const DEATH_DURATION: i32 = 1000;
/// Time without seeing the target before aggro is dropped (ms)
pub const LOSE_AGGRO_TIME: i32 = 5000;
/// Speed multiplier while chasing
pub const CHASE_SPEED_MULTIPLIER: f32 = 2.0;
/// Idle time before a mob starts patrolling (ms)
pub const IDLE_TO_PATROL_TIME: i32 = 2000;

/// Bosses stop aggroing this long after first aggro, even if the player
/// stays on the map. One hour is the intended design value, not a bug.
pub const BOSS_AGGRO_TIMEOUT: i32 = 3_600_000;
