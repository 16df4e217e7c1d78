//! Static platforms

use glam::Vec2;
use image::RgbaImage;

use super::body::{Body, Collider, Surface};
use super::mask::CollisionMask;
use crate::consts::PLATFORM_TOP_TRIM;

#[derive(Debug, Clone)]
pub struct Platform {
    pub id: u32,
    pub body: Body,
}

impl Platform {
    pub fn new(id: u32, top_left: (i32, i32), frame: &RgbaImage) -> Self {
        Self::with_trim(id, top_left, frame, PLATFORM_TOP_TRIM)
    }

    /// Build with a custom number of top rows removed from the mask
    pub fn with_trim(id: u32, top_left: (i32, i32), frame: &RgbaImage, trim: u32) -> Self {
        let mut mask = CollisionMask::from_frame(frame, false);
        mask.trim_top(trim);
        let pos = Vec2::new(top_left.0 as f32, top_left.1 as f32);
        Self {
            id,
            body: Body::with_mask(pos, mask),
        }
    }
}

impl Collider for Platform {
    fn body(&self) -> &Body {
        &self.body
    }

    fn surface(&self) -> Surface {
        Surface::Platform
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::frame::PLACEHOLDER_COLOR;
    use crate::sim::rect::Rect;

    #[test]
    fn test_collision_top_sits_below_visual_top() {
        let frame = RgbaImage::from_pixel(100, 100, PLACEHOLDER_COLOR);
        let platform = Platform::new(1, (200, 400), &frame);
        assert_eq!(platform.body.rect, Rect::new(200, 400, 100, 100));
        assert_eq!(platform.mask_rect(), Rect::new(200, 416, 100, 84));
    }

    #[test]
    fn test_zero_trim_keeps_full_mask() {
        let frame = RgbaImage::from_pixel(10, 10, PLACEHOLDER_COLOR);
        let platform = Platform::with_trim(1, (0, 0), &frame, 0);
        assert_eq!(platform.mask_rect(), Rect::new(0, 0, 10, 10));
    }
}
