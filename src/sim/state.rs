//! Scene state and shared simulation context
//!
//! A [`Scene`] owns every entity group of a loaded level. Cross-entity
//! singletons (leak-sound ownership, companion sound serials, the RNG and the
//! id allocator) live in [`SimContext`] so independent scenes never share
//! hidden state.

use glam::Vec2;
use image::RgbImage;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;
use thiserror::Error;

use super::camera::Camera;
use super::companion::Companion;
use super::frame::FrameAnimation;
use super::guide::Guide;
use super::level::{Level, LevelError, LevelOptions, generate_level, load_level};
use super::particle::Particle;
use super::pipe::{LeakChannel, Pipe};
use super::platform::Platform;
use super::player::{Form, Player};
use super::rect::Rect;
use crate::audio::{SoundService, register_effects};
use crate::consts::ROBOT_SIZE;
use crate::settings::{SceneConfig, SceneKind, Settings};
use crate::sprites::{SpriteKey, SpriteProvider};

/// State shared by every entity of one simulation
#[derive(Debug, Clone)]
pub struct SimContext {
    /// Owner of the looping leak sound
    pub leak: LeakChannel,
    pub rng: Pcg32,
    /// Cap on live leak particles
    pub max_particles: usize,
    next_id: u32,
    companion_serial: u32,
}

impl SimContext {
    pub fn new(seed: u64, max_particles: usize) -> Self {
        Self {
            leak: LeakChannel::default(),
            rng: Pcg32::seed_from_u64(seed),
            max_particles,
            next_id: 1,
            companion_serial: 0,
        }
    }

    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Serial for a companion's own movement sound key
    pub fn next_companion_serial(&mut self) -> u32 {
        let serial = self.companion_serial;
        self.companion_serial += 1;
        serial
    }
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("unknown scene '{0}'")]
    UnknownScene(String),
    #[error("scene '{0}' has no level geometry")]
    NoLevel(String),
    #[error(transparent)]
    Level(#[from] LevelError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ScenePhase {
    Playing,
    /// Every pipe fixed; `elapsed` is the play time in seconds
    Completed { elapsed: f32 },
}

/// Everything a running level owns
#[derive(Debug, Clone)]
pub struct Scene {
    pub name: String,
    pub kind: SceneKind,
    pub player: Player,
    pub platforms: Vec<Platform>,
    pub pipes: Vec<Pipe>,
    pub companions: Vec<Companion>,
    pub particles: Vec<Particle>,
    /// Movement bounds (world rect, horizontally offset into the viewport)
    pub bounds: Rect,
    pub camera: Camera,
    /// Tutorial goal tile
    pub goal: Option<Rect>,
    pub vertical_pipes: Vec<u32>,
    pub guide: Option<Guide>,
    pub phase: ScenePhase,
    pub elapsed: f32,
    /// Longest frame a single tick integrates (seconds)
    pub max_frame_dt: f32,
    /// Tutorial pipes have been told to fall
    pub falls_started: bool,
    pub ctx: SimContext,
    companion_anim: FrameAnimation,
}

/// Compact state dump for the headless runner
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneSummary {
    pub scene: String,
    pub phase: ScenePhase,
    pub elapsed: f32,
    pub pipes: usize,
    pub damaged: usize,
    pub repaired: usize,
    pub companions: usize,
    pub particles: usize,
    pub player_form: String,
    pub player_rect: Rect,
    pub camera: Vec2,
}

impl Scene {
    /// Load a scene from the settings' scene table
    pub fn load(
        name: &str,
        settings: &Settings,
        sprites: &dyn SpriteProvider,
        sound: &mut dyn SoundService,
    ) -> Result<Self, SceneError> {
        let config = settings
            .scene(name)
            .ok_or_else(|| SceneError::UnknownScene(name.to_string()))?;
        let mut ctx = SimContext::new(settings.seed(), settings.max_particles);
        let options = level_options(settings, config);
        let path = settings.map_path(config);
        let level = load_level(&path, &options, sprites, &mut ctx);
        if level.is_empty() {
            return Err(SceneError::NoLevel(name.to_string()));
        }
        Ok(Self::from_level(name, options.kind, level, settings, sprites, ctx, sound))
    }

    /// Build a scene straight from an in-memory bitmap
    pub fn from_bitmap(
        name: &str,
        map: &RgbImage,
        settings: &Settings,
        config: &SceneConfig,
        sprites: &dyn SpriteProvider,
        sound: &mut dyn SoundService,
    ) -> Result<Self, SceneError> {
        let mut ctx = SimContext::new(settings.seed(), settings.max_particles);
        let options = level_options(settings, config);
        let level = generate_level(map, &options, sprites, &mut ctx)?;
        Ok(Self::from_level(name, options.kind, level, settings, sprites, ctx, sound))
    }

    fn from_level(
        name: &str,
        kind: SceneKind,
        level: Level,
        settings: &Settings,
        sprites: &dyn SpriteProvider,
        mut ctx: SimContext,
        sound: &mut dyn SoundService,
    ) -> Self {
        register_effects(sound);
        let bounds = level.bounds();
        let spawn = spawn_point(&level, settings.viewport_width);
        let player = Player::new(ctx.next_entity_id(), spawn, sprites);

        let mut camera = Camera::new(settings.viewport_width, settings.viewport_height);
        camera.follow(player.body.rect.center(), &bounds);

        let guide = if kind.is_tutorial() {
            let image = sprites.animation(SpriteKey::Guide);
            level.goal.as_ref().and_then(|goal| Guide::new(image.current_frame(), goal))
        } else {
            None
        };

        log::info!(
            "Scene '{}' ready: {} platforms, {} pipes ({} damaged), player at ({}, {})",
            name,
            level.platforms.len(),
            level.pipes.len(),
            level.damaged_count(),
            spawn.x,
            spawn.y
        );

        Self {
            name: name.to_string(),
            kind,
            player,
            platforms: level.platforms,
            pipes: level.pipes,
            companions: Vec::new(),
            particles: Vec::new(),
            bounds,
            camera,
            goal: level.goal,
            vertical_pipes: level.vertical_pipes,
            guide,
            phase: ScenePhase::Playing,
            elapsed: 0.0,
            max_frame_dt: settings.max_frame_dt,
            falls_started: false,
            ctx,
            companion_anim: sprites.animation(SpriteKey::Companion),
        }
    }

    pub fn world_height(&self) -> i32 {
        self.bounds.h
    }

    pub fn damaged_count(&self) -> usize {
        self.pipes.iter().filter(|p| p.is_damaged()).count()
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.phase, ScenePhase::Completed { .. })
    }

    /// Tutorial pipes have all landed
    pub fn falls_complete(&self) -> bool {
        self.vertical_pipes
            .iter()
            .all(|id| self.pipes.iter().find(|p| p.id == *id).is_none_or(Pipe::fall_complete))
    }

    /// Every tutorial condition except the confirm press
    pub fn tutorial_ready(&self) -> bool {
        let Some(goal) = self.goal else {
            return false;
        };
        self.damaged_count() == 0
            && self.player.form() == Form::Large
            && self.player.body.rect.intersects(&goal)
            && self.falls_complete()
    }

    /// Put a freshly released companion into the world
    pub(crate) fn spawn_companion(&mut self, center_x: i32, bottom: i32, facing: i32, sound: &mut dyn SoundService) {
        let id = self.ctx.next_entity_id();
        let key = crate::audio::companion_move_key(self.ctx.next_companion_serial());
        let companion = Companion::released(id, (center_x, bottom), facing, self.companion_anim.clone(), key, sound);
        self.companions.push(companion);
    }

    pub fn summary(&self) -> SceneSummary {
        SceneSummary {
            scene: self.name.clone(),
            phase: self.phase,
            elapsed: self.elapsed,
            pipes: self.pipes.len(),
            damaged: self.damaged_count(),
            repaired: self.pipes.iter().filter(|p| p.is_repaired()).count(),
            companions: self.companions.len(),
            particles: self.particles.len(),
            player_form: format!("{:?}", self.player.form()),
            player_rect: self.player.body.rect,
            camera: self.camera.offset,
        }
    }
}

fn level_options(settings: &Settings, config: &SceneConfig) -> LevelOptions {
    LevelOptions {
        tile_size: settings.tile_size,
        viewport_width: settings.viewport_width,
        min_damaged: config.min_damaged,
        damage_probability: settings.damage_probability,
        kind: config.kind(),
    }
}

/// Above the platform closest to the floor, or the viewport centre near the floor
fn spawn_point(level: &Level, viewport_width: u32) -> Vec2 {
    let robot = ROBOT_SIZE as i32;
    let lowest = level
        .platforms
        .iter()
        .min_by_key(|p| level.world_height - p.body.rect.bottom());
    let (x, y) = match lowest {
        Some(platform) => (platform.body.rect.center_x() - robot / 2, platform.body.rect.top() - robot),
        None => (viewport_width as i32 / 2 - 25, level.world_height - robot),
    };
    Vec2::new(x as f32, y as f32)
}
