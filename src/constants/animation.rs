//! Animation timing constants.

/// Frame delay used when a frame carries none (ms)
pub const DEFAULT_FRAME_DELAY: i32 = 100;
/// Floor for per-frame delays; guards against zero-delay spin (ms)
pub const MIN_FRAME_DELAY: i32 = 10;
/// Cast completion fallback when a skill has no effect animation (ms)
pub const DEFAULT_CAST_DURATION: i32 = 500;
/// Knockback recovery window (ms)
pub const KNOCKBACK_RECOVERY_MS: i32 = 500;
