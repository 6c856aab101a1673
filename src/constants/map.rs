//! Map and cache constants.

/// Maximum maps kept in the cross-map state cache
pub const MAX_CACHED_MAPS: usize = 10;
/// Cached map state lifetime; 0 disables expiry (ms)
pub const STATE_EXPIRY_MS: i32 = 300_000;
/// Margin kept from the map edge when clamping patrol bounds (pixels)
pub const MAP_EDGE_MARGIN: i32 = 30;
/// Wider margin used by flying mobs (pixels)
pub const FLY_EDGE_MARGIN: i32 = 50;
/// Distance below the map bottom before a fallen mob resets to spawn (pixels)
pub const FALL_RESET_MARGIN: f32 = 100.0;
/// Threshold distance before recalculating mirror boundaries (pixels)
pub const MIRROR_CHECK_THRESHOLD: f32 = 50.0;
