//! Simulation core
//!
//! All gameplay logic lives here: physics, mask collisions, entity state
//! machines, level generation and the per-frame driver. The module is
//! deterministic for a given seed and input sequence:
//! - Seeded RNG only (held in [`SimContext`])
//! - Stable iteration order (entity groups are plain vectors)
//! - No rendering, windowing or mixer dependencies

pub mod body;
pub mod camera;
pub mod collision;
pub mod companion;
pub mod frame;
pub mod guide;
pub mod level;
pub mod mask;
pub mod particle;
pub mod pipe;
pub mod platform;
pub mod player;
pub mod rect;
pub mod state;
pub mod tick;

pub use body::{Body, Collider, Surface};
pub use camera::Camera;
pub use collision::{Landing, resolve_landing, snap_to_ground};
pub use companion::Companion;
pub use frame::FrameAnimation;
pub use guide::Guide;
pub use level::{Level, LevelError, LevelOptions, Tile, generate_level, load_level};
pub use mask::CollisionMask;
pub use particle::Particle;
pub use pipe::{BreakStage, Decal, FallState, LeakChannel, Orientation, Pipe, PipeStyle};
pub use platform::Platform;
pub use player::{Controls, Footing, Form, Player, PlayerOutcome, Release, Surroundings};
pub use rect::Rect;
pub use state::{Scene, SceneError, ScenePhase, SceneSummary, SimContext};
pub use tick::{TickInput, tick};
