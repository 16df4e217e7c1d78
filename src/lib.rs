//! Hydrobot - a side-scrolling pipe-repair platformer
//!
//! Core modules:
//! - `sim`: Simulation core (physics, mask collisions, entity state machines, levels)
//! - `sprites`: Animated-sprite collaborator (frame sources, placeholders)
//! - `audio`: Sound collaborator contract and headless implementations
//! - `settings`: Data-driven configuration and scene table
//! - `minimap`: Read-only minimap projection of world state

pub mod audio;
pub mod minimap;
pub mod settings;
pub mod sim;
pub mod sprites;

pub use audio::{NullSound, SoundRecorder, SoundService};
pub use settings::{SceneConfig, SceneKind, Settings};
pub use sprites::{ImageSprites, PlaceholderSprites, SpriteKey, SpriteProvider};

/// Game configuration constants
pub mod consts {
    /// Target frame rate of the cooperative loop
    pub const TARGET_FPS: u32 = 60;
    /// Largest dt a single frame may integrate (seconds)
    pub const MAX_FRAME_DT: f32 = 0.05;

    /// Gravity applied to player and companion (units/s²)
    pub const GRAVITY: f32 = 1200.0;
    /// Terminal fall speed (units/s)
    pub const MAX_FALL_SPEED: f32 = 2400.0;

    /// Small form: can weld, slower
    pub const SMALL_MOVE_SPEED: f32 = 200.0;
    pub const SMALL_JUMP_SPEED: f32 = 530.0;
    /// Large form: riding the companion body
    pub const LARGE_MOVE_SPEED: f32 = 400.0;
    pub const LARGE_JUMP_SPEED: f32 = 710.0;
    /// Run modifier on horizontal speed
    pub const RUN_MULTIPLIER: f32 = 1.5;

    /// Player and companion sprites are scaled to this square size
    pub const ROBOT_SIZE: u32 = 120;

    /// Dock/undock rate limit (seconds)
    pub const DOCK_COOLDOWN: f32 = 0.3;
    /// Duration of a weld (seconds)
    pub const WELD_DURATION: f32 = 3.0;
    /// Post-landing window for the snap-to-ground pass (seconds)
    pub const EDGE_GRACE: f32 = 0.1;
    /// Max gap the snap-to-ground pass closes (pixels)
    pub const SNAP_MARGIN: i32 = 4;
    /// Crouch drop distance (pixels)
    pub const CROUCH_DROP: f32 = 10.0;
    /// Vertical tolerance when looking for a pipe under the feet (pixels)
    pub const PIPE_UNDERFOOT_MARGIN: i32 = 5;
    /// Repair search: half-size of the square search area (pixels)
    pub const REPAIR_SEARCH_RADIUS: i32 = 30;
    /// Repair search: area centre sits this far below the player centre
    pub const REPAIR_SEARCH_DROP: i32 = 42;

    /// Companion walking speed (units/s)
    pub const COMPANION_SPEED: f32 = 180.0;
    /// Horizontal alignment tolerance while following (pixels)
    pub const COMPANION_ALIGN_TOLERANCE: i32 = 3;
    /// Alignment tolerance when first called (pixels)
    pub const COMPANION_CALL_TOLERANCE: i32 = 8;
    /// Companion drops through platforms if its bottom is this far above the player top
    pub const COMPANION_DROP_GAP: i32 = 10;
    /// Pass-through window (seconds)
    pub const COMPANION_PASS_THROUGH: f32 = 0.25;
    /// Minimum downward speed when starting a pass-through drop
    pub const COMPANION_DROP_SPEED: f32 = 120.0;

    /// Pixels cleared off the top of platform and pipe masks
    pub const PLATFORM_TOP_TRIM: u32 = 16;
    /// Sprite scale applied to platform and pipe textures
    pub const TILE_SPRITE_SCALE: u32 = 7;

    /// Seconds of continuous damage before a pipe escalates one stage
    pub const PIPE_ESCALATION_SECS: f32 = 30.0;
    /// Vertical fall speed of tutorial pipes (units/s)
    pub const PIPE_FALL_SPEED: f32 = 320.0;
    /// Leak particles spawn within this distance of the pipe centre
    pub const LEAK_SPREAD: i32 = 12;
    /// Decal sprite scale
    pub const DECAL_SCALE: u32 = 4;

    /// Leak particle gravity (units/s²)
    pub const PARTICLE_GRAVITY: f32 = 500.0;
}

/// Clamp that tolerates `min > max` by preferring `min`
#[inline]
pub fn limit(value: f32, min: f32, max: f32) -> f32 {
    min.max(value.min(max))
}

/// Round a float coordinate to the integer pixel grid
#[inline]
pub fn to_pixel(value: f32) -> i32 {
    value.round() as i32
}

/// Format an elapsed time the way the completion screen shows it
pub fn format_elapsed(seconds: f32) -> String {
    let seconds = seconds.max(0.0);
    let minutes = (seconds / 60.0).floor();
    format!("{} min {:.2} s", minutes as u32, seconds - minutes * 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_prefers_min_when_inverted() {
        assert_eq!(limit(5.0, 0.0, 10.0), 5.0);
        assert_eq!(limit(-1.0, 0.0, 10.0), 0.0);
        assert_eq!(limit(11.0, 0.0, 10.0), 10.0);
        assert_eq!(limit(3.0, 8.0, 2.0), 8.0);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0.0), "0 min 0.00 s");
        assert_eq!(format_elapsed(75.5), "1 min 15.50 s");
    }
}
