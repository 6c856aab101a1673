//! Hit-detection geometry: axis-aligned rectangles and the trapezoid
//! volume used by directional skill range checks.

/// Axis-aligned integer rectangle (x, y is the top-left corner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn left(&self) -> i32 {
        self.x
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    #[inline]
    pub fn top(&self) -> i32 {
        self.y
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.left() as f32
            && px <= self.right() as f32
            && py >= self.top() as f32
            && py <= self.bottom() as f32
    }

    /// Shift by a delta, returning a new rectangle.
    pub fn offset(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Directional hit-detection volume: a width that interpolates linearly
/// from `near_width` at the origin to `far_width` at `range`, extending in
/// the facing direction. Vertical skills shift it with `height_offset`.
///
/// Immutable by convention; transforms return new values.
#[derive(Debug, Clone, Copy)]
pub struct Trapezoid {
    pub origin_x: f32,
    pub origin_y: f32,
    pub near_width: f32,
    pub far_width: f32,
    pub range: f32,
    pub height_offset: f32,
    pub facing_right: bool,
}

impl Trapezoid {
    pub fn new(
        origin_x: f32,
        origin_y: f32,
        near_width: f32,
        far_width: f32,
        range: f32,
        facing_right: bool,
        height_offset: f32,
    ) -> Self {
        Self {
            origin_x,
            origin_y,
            near_width,
            far_width,
            range,
            height_offset,
            facing_right,
        }
    }

    /// Uniform-width trapezoid covering a rectangle.
    pub fn from_rect(x: f32, y: f32, width: f32, height: f32, facing_right: bool) -> Self {
        Self::new(
            if facing_right { x } else { x + width },
            y + height / 2.0,
            height,
            height,
            width,
            facing_right,
            0.0,
        )
    }

    /// Cone shape: narrow at the origin, widening with distance.
    pub fn cone(
        origin_x: f32,
        origin_y: f32,
        start_width: f32,
        end_width: f32,
        range: f32,
        facing_right: bool,
    ) -> Self {
        Self::new(origin_x, origin_y, start_width, end_width, range, facing_right, 0.0)
    }

    /// Test whether a point lies inside the volume.
    #[inline]
    pub fn contains_point(&self, px: f32, py: f32) -> bool {
        // Signed distance along the facing axis
        let dx = if self.facing_right {
            px - self.origin_x
        } else {
            self.origin_x - px
        };

        if dx < 0.0 || dx > self.range {
            return false;
        }

        // Interpolated width at this distance
        let t = if self.range > 0.0 { dx / self.range } else { 0.0 };
        let width = self.near_width + t * (self.far_width - self.near_width);
        let half_width = width / 2.0;

        let dy = py - (self.origin_y - self.height_offset);
        dy.abs() <= half_width
    }

    /// Approximate rectangle intersection: bounding-box rejection, then
    /// sampled containment at the center, corners, and edge midpoints.
    /// Exact polygon clipping is not worth it - hitboxes are small against
    /// the trapezoid's granularity.
    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        let bounds = self.bounding_rect_f32();
        if (rect.right() as f32) < bounds.0
            || rect.left() as f32 > bounds.2
            || (rect.bottom() as f32) < bounds.1
            || rect.top() as f32 > bounds.3
        {
            return false;
        }

        let (cx, cy) = rect.center();
        if self.contains_point(cx, cy) {
            return true;
        }

        let left = rect.left() as f32;
        let right = rect.right() as f32;
        let top = rect.top() as f32;
        let bottom = rect.bottom() as f32;

        self.contains_point(left, top)
            || self.contains_point(right, top)
            || self.contains_point(left, bottom)
            || self.contains_point(right, bottom)
            || self.contains_point(cx, top)
            || self.contains_point(cx, bottom)
            || self.contains_point(left, cy)
            || self.contains_point(right, cy)
    }

    /// (min_x, min_y, max_x, max_y) of the volume.
    fn bounding_rect_f32(&self) -> (f32, f32, f32, f32) {
        let (min_x, max_x) = if self.facing_right {
            (self.origin_x, self.origin_x + self.range)
        } else {
            (self.origin_x - self.range, self.origin_x)
        };
        let max_width = self.near_width.max(self.far_width);
        let mid_y = self.origin_y - self.height_offset;
        (min_x, mid_y - max_width / 2.0, max_x, mid_y + max_width / 2.0)
    }

    /// Bounding rectangle of the volume.
    pub fn bounding_rect(&self) -> Rect {
        let (min_x, min_y, max_x, max_y) = self.bounding_rect_f32();
        Rect::new(
            min_x as i32,
            min_y as i32,
            (max_x - min_x) as i32,
            (max_y - min_y) as i32,
        )
    }

    /// Scale all dimensions by a factor.
    pub fn scale(&self, factor: f32) -> Trapezoid {
        Trapezoid::new(
            self.origin_x,
            self.origin_y,
            self.near_width * factor,
            self.far_width * factor,
            self.range * factor,
            self.facing_right,
            self.height_offset * factor,
        )
    }

    /// Shift the origin by a delta.
    pub fn offset(&self, dx: f32, dy: f32) -> Trapezoid {
        Trapezoid::new(
            self.origin_x + dx,
            self.origin_y + dy,
            self.near_width,
            self.far_width,
            self.range,
            self.facing_right,
            self.height_offset,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersects() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        let c = Rect::new(20, 20, 5, 5);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_contains_point_boundary() {
        let trap = Trapezoid::new(0.0, 0.0, 10.0, 10.0, 100.0, true, 0.0);

        assert!(trap.contains_point(50.0, 4.0));
        assert!(!trap.contains_point(50.0, 6.0));
        assert!(!trap.contains_point(-1.0, 0.0));
        assert!(!trap.contains_point(101.0, 0.0));
    }

    #[test]
    fn test_contains_point_facing_left() {
        let trap = Trapezoid::new(0.0, 0.0, 10.0, 10.0, 100.0, false, 0.0);

        assert!(trap.contains_point(-50.0, 0.0));
        assert!(!trap.contains_point(50.0, 0.0));
    }

    #[test]
    fn test_cone_widens_with_distance() {
        let trap = Trapezoid::cone(0.0, 0.0, 10.0, 50.0, 100.0, true);

        // Near the origin only the narrow band hits
        assert!(!trap.contains_point(10.0, 10.0));
        // Far out the wide band does
        assert!(trap.contains_point(90.0, 20.0));
    }

    #[test]
    fn test_height_offset_shifts_band() {
        let trap = Trapezoid::new(0.0, 100.0, 20.0, 20.0, 50.0, true, 30.0);

        // Band is centered at y = 70
        assert!(trap.contains_point(25.0, 70.0));
        assert!(!trap.contains_point(25.0, 100.0));
    }

    #[test]
    fn test_intersects_rect() {
        let trap = Trapezoid::new(0.0, 0.0, 40.0, 40.0, 100.0, true, 0.0);

        assert!(trap.intersects_rect(&Rect::new(40, -10, 20, 20)));
        // Behind the origin
        assert!(!trap.intersects_rect(&Rect::new(-50, -10, 20, 20)));
        // Past the range
        assert!(!trap.intersects_rect(&Rect::new(150, -10, 20, 20)));
    }

    #[test]
    fn test_scale_and_offset_are_pure() {
        let trap = Trapezoid::new(0.0, 0.0, 10.0, 20.0, 100.0, true, 4.0);
        let scaled = trap.scale(2.0);
        let moved = trap.offset(5.0, -5.0);

        assert_eq!(trap.near_width, 10.0);
        assert_eq!(scaled.near_width, 20.0);
        assert_eq!(scaled.range, 200.0);
        assert_eq!(moved.origin_x, 5.0);
        assert_eq!(moved.origin_y, -5.0);
        assert_eq!(trap.origin_x, 0.0);
    }
}
