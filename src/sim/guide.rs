//! Tutorial guide character
//!
//! Stands on the goal tile, turns to face the player and cycles through a
//! list of hint lines when the player confirms while nearby.

use image::RgbaImage;
use image::imageops::{self, FilterType};

use super::rect::Rect;

/// Guide height relative to the goal tile
pub const GUIDE_SCALE: f32 = 1.5;
/// Interaction area growth around the guide (pixels, total per axis)
pub const GUIDE_REACH: i32 = 120;

pub const DEFAULT_HINTS: [&str; 5] = [
    "Interactuar: K",
    "Mover: WASD",
    "Correr: Shift",
    "Montura: L para bajar",
    "Llamar extensor: L cuando eres mini",
];

#[derive(Debug, Clone)]
pub struct Guide {
    pub rect: Rect,
    /// Mirrored to face a player on its left
    pub flipped: bool,
    image: RgbaImage,
    hints: Vec<String>,
    hint_index: usize,
}

impl Guide {
    /// Scale `source` to 1.5x the goal height and stand it on the goal
    pub fn new(source: &RgbaImage, goal: &Rect) -> Option<Self> {
        let (w, h) = source.dimensions();
        if h == 0 || w == 0 {
            return None;
        }
        let target_h = (goal.h as f32 * GUIDE_SCALE) as u32;
        let factor = target_h as f32 / h as f32;
        let target_w = ((w as f32 * factor) as u32).max(1);
        let image = imageops::resize(source, target_w, target_h.max(1), FilterType::Triangle);
        let (cx, bottom) = goal.mid_bottom();
        let rect = Rect::new(0, 0, target_w as i32, target_h.max(1) as i32).with_mid_bottom(cx, bottom);
        Some(Self {
            rect,
            flipped: false,
            image,
            hints: DEFAULT_HINTS.iter().map(|s| s.to_string()).collect(),
            hint_index: 0,
        })
    }

    pub fn set_hints(&mut self, hints: Vec<String>) {
        self.hints = hints;
        self.hint_index = 0;
    }

    pub fn current_hint(&self) -> Option<&str> {
        self.hints.get(self.hint_index).map(String::as_str)
    }

    pub fn advance_hint(&mut self) {
        if !self.hints.is_empty() {
            self.hint_index = (self.hint_index + 1) % self.hints.len();
        }
    }

    pub fn in_range(&self, player: &Rect) -> bool {
        self.rect.inflated(GUIDE_REACH, GUIDE_REACH).intersects(player)
    }

    pub fn face(&mut self, player: &Rect) {
        self.flipped = player.center_x() < self.rect.center_x();
    }

    /// Pixels to draw in the current orientation
    pub fn frame(&self) -> RgbaImage {
        if self.flipped {
            imageops::flip_horizontal(&self.image)
        } else {
            self.image.clone()
        }
    }
}
