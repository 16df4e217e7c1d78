//! World-to-screen mapping
//!
//! The camera follows the player's centre but never shows anything past the
//! world bounds. A world narrower than the viewport is centred instead.

use glam::Vec2;
use serde::Serialize;

use super::rect::Rect;
use crate::limit;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Camera {
    /// World-space position of the viewport's top-left corner
    pub offset: Vec2,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Camera {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            offset: Vec2::ZERO,
            viewport_width,
            viewport_height,
        }
    }

    /// Recompute the offset for a target centre inside `world`
    pub fn follow(&mut self, (target_x, target_y): (i32, i32), world: &Rect) {
        let half_w = self.viewport_width as f32 / 2.0;
        let half_h = self.viewport_height as f32 / 2.0;

        let max_scroll_x = (world.right() - self.viewport_width as i32) as f32;
        self.offset.x = if max_scroll_x <= world.left() as f32 {
            let world_center = world.left() as f32 + world.w as f32 / 2.0;
            (world_center - half_w).max(0.0)
        } else {
            limit(target_x as f32 - half_w, world.left() as f32, max_scroll_x)
        };

        let max_scroll_y = (world.h - self.viewport_height as i32) as f32;
        self.offset.y = if max_scroll_y <= 0.0 {
            0.0
        } else {
            limit(target_y as f32 - half_h, 0.0, max_scroll_y)
        };
    }

    /// Visible world area
    pub fn view(&self) -> Rect {
        Rect::new(
            self.offset.x as i32,
            self.offset.y as i32,
            self.viewport_width as i32,
            self.viewport_height as i32,
        )
    }

    pub fn to_screen(&self, world_rect: &Rect) -> Rect {
        world_rect.translated(-(self.offset.x as i32), -(self.offset.y as i32))
    }
}
