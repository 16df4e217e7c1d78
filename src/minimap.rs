//! Minimap projection
//!
//! Read-only consumer of scene state. The whole world is fitted into a small
//! panel, then scaled by a user zoom. A world larger than the panel scrolls
//! to keep the player centred, clamped so the panel never shows past the
//! world edge.

use image::{Rgba, RgbaImage};
use serde::Serialize;

use crate::limit;
use crate::sim::rect::Rect;
use crate::sim::state::Scene;

pub const MINIMAP_SIZE: (u32, u32) = (200, 150);
pub const MINIMAP_MARGIN: i32 = 14;
pub const ZOOM_MIN: f32 = 0.3;
pub const ZOOM_MAX: f32 = 4.0;

const BACKGROUND: Rgba<u8> = Rgba([18, 24, 36, 200]);
const BORDER: Rgba<u8> = Rgba([90, 110, 150, 255]);
const DAMAGE_OUTLINE: Rgba<u8> = Rgba([255, 120, 80, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerKind {
    Platform,
    Pipe { damaged: bool },
    Companion,
    Player,
}

impl MarkerKind {
    fn fill(self) -> Rgba<u8> {
        match self {
            MarkerKind::Platform => Rgba([120, 120, 130, 255]),
            MarkerKind::Pipe { .. } => Rgba([70, 160, 90, 255]),
            MarkerKind::Companion => Rgba([200, 170, 60, 255]),
            MarkerKind::Player => Rgba([240, 240, 250, 255]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Marker {
    pub kind: MarkerKind,
    /// Panel-space rect
    pub rect: Rect,
}

/// One projected minimap: markers in draw order plus the camera outline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinimapFrame {
    pub size: (u32, u32),
    pub markers: Vec<Marker>,
    pub camera: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Minimap {
    pub size: (u32, u32),
    pub margin: i32,
    zoom: f32,
    bounds: Option<Rect>,
    base_scale: f32,
}

impl Default for Minimap {
    fn default() -> Self {
        Self::new(MINIMAP_SIZE, MINIMAP_MARGIN)
    }
}

impl Minimap {
    pub fn new(size: (u32, u32), margin: i32) -> Self {
        Self {
            size,
            margin,
            zoom: 1.0,
            bounds: None,
            base_scale: 1.0,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn scale(&self) -> f32 {
        self.base_scale * self.zoom
    }

    /// World area to fit. `None` disables the minimap.
    pub fn set_bounds(&mut self, bounds: Option<Rect>) {
        self.bounds = bounds;
        self.base_scale = match bounds {
            Some(b) if b.w > 0 && b.h > 0 => {
                (self.size.0 as f32 / b.w as f32).min(self.size.1 as f32 / b.h as f32)
            }
            _ => 1.0,
        };
    }

    pub fn adjust_zoom(&mut self, delta: f32) {
        self.zoom = limit(self.zoom + delta, ZOOM_MIN, ZOOM_MAX);
    }

    /// Top-left of the panel on a screen `viewport_width` wide
    pub fn screen_position(&self, viewport_width: u32) -> (i32, i32) {
        (viewport_width as i32 - self.size.0 as i32 - self.margin, self.margin)
    }

    /// Project the scene; `None` until bounds are set
    pub fn project(&self, scene: &Scene) -> Option<MinimapFrame> {
        let bounds = self.bounds?;
        let scale = self.scale();
        if scale <= 0.0 {
            return None;
        }
        let (px, py) = scene.player.body.rect.center();
        let offset_x = axis_offset(bounds.w as f32 * scale, self.size.0 as f32, bounds.left(), bounds.right(), px);
        let offset_y = axis_offset(bounds.h as f32 * scale, self.size.1 as f32, bounds.top(), bounds.bottom(), py);
        let to_panel = |r: &Rect| {
            Rect::new(
                (offset_x + (r.x - bounds.left()) as f32 * scale) as i32,
                (offset_y + (r.y - bounds.top()) as f32 * scale) as i32,
                ((r.w as f32 * scale) as i32).max(1),
                ((r.h as f32 * scale) as i32).max(1),
            )
        };

        let platforms = scene.platforms.iter().map(|p| (MarkerKind::Platform, p.body.rect));
        let pipes = scene.pipes.iter().map(|p| {
            (
                MarkerKind::Pipe {
                    damaged: p.is_damaged(),
                },
                p.body.rect,
            )
        });
        let companions = scene.companions.iter().map(|c| (MarkerKind::Companion, c.body.rect));
        let player = std::iter::once((MarkerKind::Player, scene.player.body.rect));
        let markers = platforms
            .chain(pipes)
            .chain(companions)
            .chain(player)
            .map(|(kind, rect)| Marker {
                kind,
                rect: to_panel(&rect),
            })
            .collect();

        Some(MinimapFrame {
            size: self.size,
            markers,
            camera: to_panel(&scene.camera.view()),
        })
    }
}

/// Centre a map that fits; otherwise follow `target`, clamped to the map edges
fn axis_offset(map_len: f32, panel_len: f32, start: i32, end: i32, target: i32) -> f32 {
    if map_len <= panel_len {
        return (panel_len - map_len) / 2.0;
    }
    let ratio = (target - start) as f32 / ((end - start) as f32).max(1.0);
    let offset = panel_len / 2.0 - ratio * map_len;
    limit(offset, panel_len - map_len, 0.0)
}

impl MinimapFrame {
    /// Flat-colour raster of the panel
    pub fn rasterize(&self) -> RgbaImage {
        let mut image = RgbaImage::from_pixel(self.size.0, self.size.1, BACKGROUND);
        for marker in &self.markers {
            fill_rect(&mut image, &marker.rect, marker.kind.fill());
            if marker.kind == (MarkerKind::Pipe { damaged: true }) {
                outline_rect(&mut image, &marker.rect, DAMAGE_OUTLINE, 2);
            }
        }
        outline_rect(&mut image, &self.camera, BORDER, 1);
        image
    }
}

fn fill_rect(image: &mut RgbaImage, rect: &Rect, color: Rgba<u8>) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    for y in rect.top().max(0)..rect.bottom().min(h) {
        for x in rect.left().max(0)..rect.right().min(w) {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

fn outline_rect(image: &mut RgbaImage, rect: &Rect, color: Rgba<u8>, width: i32) {
    let width = width.min(rect.w / 2).min(rect.h / 2).max(1);
    let edges = [
        Rect::new(rect.x, rect.y, rect.w, width),
        Rect::new(rect.x, rect.bottom() - width, rect.w, width),
        Rect::new(rect.x, rect.y, width, rect.h),
        Rect::new(rect.right() - width, rect.y, width, rect.h),
    ];
    for edge in &edges {
        fill_rect(image, edge, color);
    }
}
