//! Landing resolution against mask-based obstacles
//!
//! Only downward (or resting) movers are resolved, and only onto the top of an
//! obstacle: a genuine pixel overlap is snapped up when the mover's tight rect
//! was at or above the obstacle's top on the previous frame. Side contacts are
//! left alone, so horizontal penetration is tolerated rather than pushed back.

use glam::Vec2;

use super::body::{Body, Collider, Surface};
use crate::consts::SNAP_MARGIN;

/// Where a mover came to rest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Landing {
    /// Index of the obstacle in the slice that was searched
    pub index: usize,
    pub surface: Surface,
    /// World y of the obstacle's tight top edge
    pub top: i32,
}

/// Resolve a fall onto the first obstacle that qualifies.
///
/// On success the mover's tight bottom equals the obstacle's tight top and
/// its vertical velocity is zero.
pub fn resolve_landing<C: Collider>(
    mover: &mut Body,
    vel: &mut Vec2,
    prev_pos: Vec2,
    obstacles: &[C],
) -> Option<Landing> {
    if vel.y < 0.0 || mover.mask.is_empty() {
        return None;
    }
    let hitbox = mover.mask_rect();
    for (index, obstacle) in obstacles.iter().enumerate() {
        let other = obstacle.body();
        let other_box = other.mask_rect();
        if !hitbox.intersects(&other_box) {
            continue;
        }
        if !mover.mask_overlaps(other) {
            continue;
        }
        let prev_box = mover.mask_rect_at(prev_pos);
        if prev_box.bottom() > other_box.top() {
            // Already level with or below the top: a side contact
            continue;
        }
        mover.shift_y(other_box.top() - hitbox.bottom());
        vel.y = 0.0;
        return Some(Landing {
            index,
            surface: obstacle.surface(),
            top: other_box.top(),
        });
    }
    None
}

/// Close a small gap between the mover's feet and a surface just beneath it.
///
/// Used for a short window after leaving the ground so single-pixel steps
/// between connector pipes do not turn into falls.
pub fn snap_to_ground<C: Collider>(mover: &mut Body, vel: &mut Vec2, obstacles: &[C]) -> Option<Landing> {
    let hitbox = mover.mask_rect();
    for (index, obstacle) in obstacles.iter().enumerate() {
        let other_box = obstacle.mask_rect();
        if !hitbox.overlaps_horizontally(&other_box) {
            continue;
        }
        let gap = other_box.top() - hitbox.bottom();
        if (0..=SNAP_MARGIN).contains(&gap) {
            mover.shift_y(gap);
            vel.y = 0.0;
            return Some(Landing {
                index,
                surface: obstacle.surface(),
                top: other_box.top(),
            });
        }
    }
    None
}
