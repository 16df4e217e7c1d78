//! Integer axis-aligned rectangles
//!
//! Edges follow screen conventions: `right = x + w`, `bottom = y + h`, y grows
//! downward. Intersection is strict, so rectangles that merely share an edge
//! do not collide and zero-area rectangles never collide.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub fn left(&self) -> i32 {
        self.x
    }

    #[inline]
    pub fn top(&self) -> i32 {
        self.y
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    #[inline]
    pub fn center_x(&self) -> i32 {
        self.x + self.w / 2
    }

    #[inline]
    pub fn center_y(&self) -> i32 {
        self.y + self.h / 2
    }

    pub fn center(&self) -> (i32, i32) {
        (self.center_x(), self.center_y())
    }

    pub fn mid_bottom(&self) -> (i32, i32) {
        (self.center_x(), self.bottom())
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Strict overlap test
    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// True when the horizontal spans overlap (vertical position ignored)
    pub fn overlaps_horizontally(&self, other: &Rect) -> bool {
        !(self.right() <= other.left() || self.left() >= other.right())
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.w, self.h)
    }

    /// Grow (or shrink) around the centre by `dw`/`dh` total
    pub fn inflated(&self, dw: i32, dh: i32) -> Rect {
        Rect::new(self.x - dw / 2, self.y - dh / 2, self.w + dw, self.h + dh)
    }

    /// Same size, moved so its centre lands on `(cx, cy)`
    pub fn centered_on(&self, cx: i32, cy: i32) -> Rect {
        Rect::new(cx - self.w / 2, cy - self.h / 2, self.w, self.h)
    }

    /// Same size, moved so its mid-bottom lands on `(cx, bottom)`
    pub fn with_mid_bottom(&self, cx: i32, bottom: i32) -> Rect {
        Rect::new(cx - self.w / 2, bottom - self.h, self.w, self.h)
    }

    /// Manhattan distance between the two centres
    pub fn center_distance(&self, other: &Rect) -> i32 {
        (self.center_x() - other.center_x()).abs() + (self.center_y() - other.center_y()).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touching_edges_do_not_intersect() {
        let a = Rect::new(0, 0, 10, 10);
        let below = Rect::new(0, 10, 10, 10);
        let overlapping = Rect::new(5, 9, 10, 10);
        assert!(!a.intersects(&below));
        assert!(a.intersects(&overlapping));
        assert!(!a.intersects(&Rect::new(2, 2, 0, 5)));
    }

    #[test]
    fn test_union_and_inflate() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(20, 5, 5, 20);
        assert_eq!(a.union(&b), Rect::new(0, 0, 25, 25));
        assert_eq!(a.inflated(120, 120), Rect::new(-60, -60, 130, 130));
    }

    #[test]
    fn test_anchor_helpers() {
        let r = Rect::new(0, 0, 120, 60);
        assert_eq!(r.with_mid_bottom(100, 500), Rect::new(40, 440, 120, 60));
        assert_eq!(r.centered_on(0, 0), Rect::new(-60, -30, 120, 60));
        assert_eq!(r.mid_bottom(), (60, 60));
    }

    #[test]
    fn test_horizontal_overlap_ignores_y() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(a.overlaps_horizontally(&Rect::new(9, 500, 10, 1)));
        assert!(!a.overlaps_horizontally(&Rect::new(10, 0, 10, 10)));
    }
}
