//! Position-memoized boundary lookup.
//!
//! Resolving which reflection boundary an entity falls under means testing
//! rectangles and walking fallbacks - too expensive to redo every frame for
//! an entity that has barely moved. The checker memoizes the last resolved
//! boundary and only recomputes once the entity has moved past a threshold
//! on either axis.

use crate::constants::MIRROR_CHECK_THRESHOLD;
use crate::geometry::Rect;

/// Caches a boundary lookup keyed on entity position.
#[derive(Debug, Clone)]
pub struct CachedBoundaryChecker<B: Clone> {
    cached: Option<B>,
    last_x: f32,
    last_y: f32,
    /// Distinguishes "never checked" from a legitimate prior position at
    /// the origin; a sentinel coordinate would collide with real positions.
    has_checked: bool,
    threshold: f32,
}

impl<B: Clone> CachedBoundaryChecker<B> {
    pub fn new() -> Self {
        Self::with_threshold(MIRROR_CHECK_THRESHOLD)
    }

    pub fn with_threshold(threshold: f32) -> Self {
        Self {
            cached: None,
            last_x: 0.0,
            last_y: 0.0,
            has_checked: false,
            threshold,
        }
    }

    /// The boundary resolved by the last recompute, if any.
    pub fn cached_boundary(&self) -> Option<&B> {
        self.cached.as_ref()
    }

    /// Resolve the boundary for the entity at (x, y).
    ///
    /// Recomputes only when the position has moved at least the threshold
    /// on either axis since the last recompute (the first call always
    /// recomputes). On recompute: `default` applies when the position lies
    /// inside `bounds`, otherwise the `fallback` lookup decides.
    ///
    /// Returns whether a recompute happened; a `false` return means the
    /// cached value was reused with no side effect.
    pub fn update_boundary<F>(
        &mut self,
        x: f32,
        y: f32,
        bounds: &Rect,
        default: Option<B>,
        fallback: F,
    ) -> bool
    where
        F: FnOnce(f32, f32) -> Option<B>,
    {
        if self.has_checked
            && (x - self.last_x).abs() < self.threshold
            && (y - self.last_y).abs() < self.threshold
        {
            return false;
        }

        self.last_x = x;
        self.last_y = y;
        self.has_checked = true;

        self.cached = if bounds.contains(x, y) {
            default
        } else {
            fallback(x, y)
        };

        true
    }

    /// Force a recompute on the next call and drop the cached value.
    pub fn invalidate(&mut self) {
        self.has_checked = false;
        self.cached = None;
    }

    /// Drop the cached value without resetting the position memo.
    pub fn clear_cache(&mut self) {
        self.cached = None;
    }
}

impl<B: Clone> Default for CachedBoundaryChecker<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Boundary(u32);

    fn no_fallback(_x: f32, _y: f32) -> Option<Boundary> {
        None
    }

    #[test]
    fn test_starts_empty() {
        let checker: CachedBoundaryChecker<Boundary> = CachedBoundaryChecker::new();
        assert!(checker.cached_boundary().is_none());
    }

    #[test]
    fn test_first_call_always_recomputes() {
        let mut checker = CachedBoundaryChecker::new();
        let rect = Rect::new(0, 0, 200, 200);

        let recalculated =
            checker.update_boundary(100.0, 100.0, &rect, Some(Boundary(1)), no_fallback);

        assert!(recalculated);
        assert_eq!(checker.cached_boundary(), Some(&Boundary(1)));
    }

    #[test]
    fn test_first_call_recomputes_at_origin() {
        // (0, 0) must not read as "already checked"
        let mut checker = CachedBoundaryChecker::new();
        let rect = Rect::new(-10, -10, 20, 20);

        assert!(checker.update_boundary(0.0, 0.0, &rect, Some(Boundary(7)), no_fallback));
    }

    #[test]
    fn test_within_threshold_uses_cache() {
        let mut checker = CachedBoundaryChecker::with_threshold(50.0);
        let rect = Rect::new(0, 0, 200, 200);

        checker.update_boundary(0.0, 0.0, &rect, Some(Boundary(1)), no_fallback);
        let recalculated =
            checker.update_boundary(30.0, 30.0, &rect, Some(Boundary(2)), no_fallback);

        assert!(!recalculated);
        assert_eq!(checker.cached_boundary(), Some(&Boundary(1)));
    }

    #[test]
    fn test_past_threshold_recomputes() {
        let mut checker = CachedBoundaryChecker::with_threshold(50.0);
        let rect = Rect::new(0, 0, 200, 200);

        checker.update_boundary(0.0, 0.0, &rect, Some(Boundary(1)), no_fallback);
        // One axis past the threshold is enough
        let recalculated =
            checker.update_boundary(51.0, 0.0, &rect, Some(Boundary(2)), no_fallback);

        assert!(recalculated);
        assert_eq!(checker.cached_boundary(), Some(&Boundary(2)));
    }

    #[test]
    fn test_outside_bounds_uses_fallback() {
        let mut checker = CachedBoundaryChecker::new();
        let rect = Rect::new(0, 0, 50, 50);

        checker.update_boundary(100.0, 100.0, &rect, Some(Boundary(1)), |_x, _y| {
            Some(Boundary(9))
        });

        assert_eq!(checker.cached_boundary(), Some(&Boundary(9)));
    }

    #[test]
    fn test_outside_bounds_without_fallback_clears() {
        let mut checker = CachedBoundaryChecker::new();
        let rect = Rect::new(0, 0, 50, 50);

        checker.update_boundary(100.0, 100.0, &rect, Some(Boundary(1)), no_fallback);

        assert!(checker.cached_boundary().is_none());
    }

    #[test]
    fn test_invalidate_forces_recompute() {
        let mut checker = CachedBoundaryChecker::with_threshold(50.0);
        let rect = Rect::new(0, 0, 200, 200);

        checker.update_boundary(100.0, 100.0, &rect, Some(Boundary(1)), no_fallback);
        checker.invalidate();
        assert!(checker.cached_boundary().is_none());

        // Tiny move still recomputes after invalidation
        let recalculated =
            checker.update_boundary(105.0, 105.0, &rect, Some(Boundary(2)), no_fallback);
        assert!(recalculated);
        assert_eq!(checker.cached_boundary(), Some(&Boundary(2)));
    }

    #[test]
    fn test_clear_cache_keeps_position_memo() {
        let mut checker = CachedBoundaryChecker::with_threshold(50.0);
        let rect = Rect::new(0, 0, 200, 200);

        checker.update_boundary(100.0, 100.0, &rect, Some(Boundary(1)), no_fallback);
        checker.clear_cache();
        assert!(checker.cached_boundary().is_none());

        // Position memo survives, so a nearby call stays cached (and empty)
        let recalculated =
            checker.update_boundary(110.0, 105.0, &rect, Some(Boundary(2)), no_fallback);
        assert!(!recalculated);
        assert!(checker.cached_boundary().is_none());
    }
}
