//! Shared entity body: float position, derived pixel rect and mask
//!
//! `pos` is authoritative. `rect` is its rounded projection sized to the
//! current frame, and `mask` always matches the current frame. Every mutation
//! goes through a method here so the three never drift apart.

use glam::Vec2;
use image::RgbaImage;

use super::mask::CollisionMask;
use super::rect::Rect;
use crate::to_pixel;

/// What kind of surface a collider presents to a mover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Platform,
    Pipe,
    Companion,
}

#[derive(Debug, Clone)]
pub struct Body {
    pub pos: Vec2,
    pub rect: Rect,
    pub mask: CollisionMask,
}

impl Body {
    pub fn new(top_left: Vec2, frame: &RgbaImage, flip_x: bool) -> Self {
        let mask = CollisionMask::from_frame(frame, flip_x);
        Self::with_mask(top_left, mask)
    }

    pub fn with_mask(top_left: Vec2, mask: CollisionMask) -> Self {
        let (w, h) = mask.size();
        Self {
            pos: top_left,
            rect: Rect::new(to_pixel(top_left.x), to_pixel(top_left.y), w, h),
            mask,
        }
    }

    /// Swap in a new visual frame; the top-left corner stays put
    pub fn set_frame(&mut self, frame: &RgbaImage, flip_x: bool) {
        self.mask = CollisionMask::from_frame(frame, flip_x);
        let (w, h) = self.mask.size();
        self.rect.w = w;
        self.rect.h = h;
    }

    /// Re-derive the rect position from `pos`
    pub fn sync_rect(&mut self) {
        self.rect.x = to_pixel(self.pos.x);
        self.rect.y = to_pixel(self.pos.y);
    }

    /// Integrate velocity over `dt` and refresh the rect
    pub fn integrate(&mut self, vel: Vec2, dt: f32) {
        self.pos += vel * dt;
        self.sync_rect();
    }

    /// Place the rect's top-left on whole pixels and make `pos` agree
    pub fn place_at(&mut self, x: i32, y: i32) {
        self.rect.x = x;
        self.rect.y = y;
        self.pos = Vec2::new(x as f32, y as f32);
    }

    /// Move vertically by whole pixels; `pos.y` snaps to the grid
    pub fn shift_y(&mut self, dy: i32) {
        self.rect.y += dy;
        self.pos.y = self.rect.y as f32;
    }

    /// Move horizontally by whole pixels; `pos.x` snaps to the grid
    pub fn shift_x(&mut self, dx: i32) {
        self.rect.x += dx;
        self.pos.x = self.rect.x as f32;
    }

    /// World-space tight rectangle of the solid pixels. A fully transparent
    /// frame falls back to the whole rect.
    pub fn mask_rect(&self) -> Rect {
        match self.mask.bounds() {
            Some(local) => local.translated(self.rect.x, self.rect.y),
            None => self.rect,
        }
    }

    /// Mask overlap against another body at their current rects
    pub fn mask_overlaps(&self, other: &Body) -> bool {
        let offset = (other.rect.x - self.rect.x, other.rect.y - self.rect.y);
        self.mask.overlaps(&other.mask, offset)
    }

    /// Tight rect this body had when its top-left was at `prev`
    pub fn mask_rect_at(&self, prev: Vec2) -> Rect {
        let now = self.mask_rect();
        Rect::new(
            to_pixel(prev.x) + (now.x - self.rect.x),
            to_pixel(prev.y) + (now.y - self.rect.y),
            now.w,
            now.h,
        )
    }

    /// Keep the tight rect inside `bounds` horizontally and above its floor.
    /// Returns true when the floor was touched.
    pub fn clamp_to(&mut self, bounds: &Rect) -> bool {
        let hitbox = self.mask_rect();
        if hitbox.left() < bounds.left() {
            self.shift_x(bounds.left() - hitbox.left());
        }
        if hitbox.right() > bounds.right() {
            self.shift_x(bounds.right() - hitbox.right());
        }
        let hitbox = self.mask_rect();
        if hitbox.bottom() >= bounds.bottom() {
            self.shift_y(bounds.bottom() - hitbox.bottom());
            return true;
        }
        false
    }
}

/// Capability shared by everything a mover can collide with
pub trait Collider {
    fn body(&self) -> &Body;

    fn surface(&self) -> Surface;

    fn mask_rect(&self) -> Rect {
        self.body().mask_rect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use proptest::prelude::*;

    #[test]
    fn test_rect_follows_rounded_position() {
        let mut body = Body::with_mask(Vec2::new(10.4, 20.6), CollisionMask::solid(8, 8));
        assert_eq!(body.rect, Rect::new(10, 21, 8, 8));
        body.integrate(Vec2::new(100.0, -50.0), 0.1);
        assert_eq!(body.rect, Rect::new(20, 16, 8, 8));
    }

    #[test]
    fn test_mask_rect_uses_tight_bounds() {
        let frame = RgbaImage::from_fn(10, 10, |_, y| {
            if y >= 4 { Rgba([1, 1, 1, 255]) } else { Rgba([0, 0, 0, 0]) }
        });
        let body = Body::new(Vec2::new(100.0, 100.0), &frame, false);
        assert_eq!(body.mask_rect(), Rect::new(100, 104, 10, 6));
        assert_eq!(body.mask_rect_at(Vec2::new(100.0, 90.0)), Rect::new(100, 94, 10, 6));
    }

    #[test]
    fn test_transparent_frame_falls_back_to_rect() {
        let frame = RgbaImage::new(12, 6);
        let body = Body::new(Vec2::new(3.0, 4.0), &frame, false);
        assert_eq!(body.mask_rect(), Rect::new(3, 4, 12, 6));
    }

    #[test]
    fn test_clamp_to_bounds() {
        let bounds = Rect::new(0, 0, 100, 100);
        let mut body = Body::with_mask(Vec2::new(-5.0, 95.0), CollisionMask::solid(10, 10));
        assert!(body.clamp_to(&bounds));
        assert_eq!(body.rect, Rect::new(0, 90, 10, 10));
        assert_eq!(body.pos, Vec2::new(0.0, 90.0));
    }

    proptest! {
        #[test]
        fn prop_rect_tracks_rounded_position(
            x in -500.0f32..500.0,
            y in -500.0f32..500.0,
            vx in -400.0f32..400.0,
            vy in -900.0f32..900.0,
            dt in 0.0f32..0.05,
        ) {
            let mut body = Body::with_mask(Vec2::new(x, y), CollisionMask::solid(8, 12));
            body.integrate(Vec2::new(vx, vy), dt);
            prop_assert_eq!(body.rect.x, to_pixel(body.pos.x));
            prop_assert_eq!(body.rect.y, to_pixel(body.pos.y));
            prop_assert_eq!((body.rect.w, body.rect.h), (8, 12));
        }
    }
}
