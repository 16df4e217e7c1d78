//! Level generation from a palette bitmap
//!
//! One pixel is one tile. Exact RGB matches select the tile type; anything
//! else is empty. The world is centred horizontally in the viewport when it
//! is narrower than it.

use std::path::Path;

use image::{Rgb, RgbImage};
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

use super::pipe::{Pipe, PipeStyle};
use super::platform::Platform;
use super::rect::Rect;
use super::state::SimContext;
use crate::settings::SceneKind;
use crate::sprites::{SpriteKey, SpriteProvider};

pub mod palette {
    use image::Rgb;

    pub const EMPTY: Rgb<u8> = Rgb([255, 255, 255]);
    pub const PLATFORM: Rgb<u8> = Rgb([0, 0, 0]);
    pub const PIPE: Rgb<u8> = Rgb([0, 255, 0]);
    pub const DAMAGEABLE_PIPE: Rgb<u8> = Rgb([255, 0, 0]);
    pub const CONNECTOR_PIPE: Rgb<u8> = Rgb([0, 0, 255]);
    pub const VERTICAL_PIPE: Rgb<u8> = Rgb([255, 255, 0]);
    pub const GOAL: Rgb<u8> = Rgb([0, 255, 255]);
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("cannot read level bitmap: {0}")]
    Image(#[from] image::ImageError),
    #[error("level bitmap has no pixels")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Empty,
    Platform,
    Pipe,
    DamageablePipe,
    ConnectorPipe,
    VerticalPipe,
    Goal,
}

impl Tile {
    const PALETTE: [(Rgb<u8>, Tile); 6] = [
        (palette::PLATFORM, Tile::Platform),
        (palette::PIPE, Tile::Pipe),
        (palette::DAMAGEABLE_PIPE, Tile::DamageablePipe),
        (palette::CONNECTOR_PIPE, Tile::ConnectorPipe),
        (palette::VERTICAL_PIPE, Tile::VerticalPipe),
        (palette::GOAL, Tile::Goal),
    ];

    pub fn from_rgb(color: Rgb<u8>) -> Self {
        Self::PALETTE
            .iter()
            .find(|(c, _)| *c == color)
            .map_or(Tile::Empty, |&(_, tile)| tile)
    }

    /// Tiles a connector pipe joins up with
    fn connects(self) -> bool {
        matches!(self, Tile::Pipe | Tile::DamageablePipe)
    }
}

/// Generation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelOptions {
    pub tile_size: u32,
    pub viewport_width: u32,
    /// Damaged non-tutorial pipes guaranteed after generation
    pub min_damaged: usize,
    pub damage_probability: f64,
    pub kind: SceneKind,
}

impl Default for LevelOptions {
    fn default() -> Self {
        Self {
            tile_size: 100,
            viewport_width: 700,
            min_damaged: 0,
            damage_probability: 0.1,
            kind: SceneKind::Standard,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Level {
    pub platforms: Vec<Platform>,
    pub pipes: Vec<Pipe>,
    pub world_width: i32,
    pub world_height: i32,
    /// Left edge of the world in screen space
    pub offset_x: i32,
    /// Tutorial goal tile
    pub goal: Option<Rect>,
    /// Ids of tutorial pipes that fall once repairs are done
    pub vertical_pipes: Vec<u32>,
}

impl Level {
    /// No geometry and zero dimensions
    pub fn empty() -> Self {
        Self::default()
    }

    /// Zero world height means "no level"
    pub fn is_empty(&self) -> bool {
        self.world_height == 0
    }

    /// Movement bounds of the world
    pub fn bounds(&self) -> Rect {
        Rect::new(self.offset_x, 0, self.world_width, self.world_height)
    }

    pub fn damaged_count(&self) -> usize {
        self.pipes.iter().filter(|p| p.is_damaged()).count()
    }
}

/// Read and generate a level. Any failure degrades to [`Level::empty`].
pub fn load_level(
    path: &Path,
    options: &LevelOptions,
    sprites: &dyn SpriteProvider,
    ctx: &mut SimContext,
) -> Level {
    let generated = read_bitmap(path).and_then(|map| generate_level(&map, options, sprites, ctx));
    match generated {
        Ok(level) => level,
        Err(e) => {
            log::warn!("Level {} unavailable: {e}", path.display());
            Level::empty()
        }
    }
}

fn read_bitmap(path: &Path) -> Result<RgbImage, LevelError> {
    Ok(image::open(path)?.to_rgb8())
}

/// Build every entity described by `map`
pub fn generate_level(
    map: &RgbImage,
    options: &LevelOptions,
    sprites: &dyn SpriteProvider,
    ctx: &mut SimContext,
) -> Result<Level, LevelError> {
    let (map_w, map_h) = map.dimensions();
    if map_w == 0 || map_h == 0 {
        return Err(LevelError::Empty);
    }
    let tile = options.tile_size as i32;
    let world_width = map_w as i32 * tile;
    let offset_x = ((options.viewport_width as i32 - world_width) / 2).max(0);

    let platform_anim = sprites.animation(SpriteKey::Platform);
    let pipe_anims = [PipeStyle::Straight, PipeStyle::StepUp, PipeStyle::StepDown]
        .map(|style| (style, sprites.animation(SpriteKey::Pipe(style))));
    let pipe_frame = |style: PipeStyle| {
        pipe_anims
            .iter()
            .find(|(s, _)| *s == style)
            .map(|(_, anim)| anim.current_frame())
            .unwrap_or(pipe_anims[0].1.current_frame())
    };
    let decal_sizes = sprites.decal_sizes();
    let tile_at = |x: u32, y: u32| Tile::from_rgb(*map.get_pixel(x, y));

    let mut level = Level {
        world_width,
        world_height: map_h as i32 * tile,
        offset_x,
        ..Level::default()
    };

    for y in 0..map_h {
        for x in 0..map_w {
            let pos = (x as i32 * tile + offset_x, y as i32 * tile);
            match tile_at(x, y) {
                Tile::Empty => {}
                Tile::Platform => {
                    let id = ctx.next_entity_id();
                    level.platforms.push(Platform::new(id, pos, platform_anim.current_frame()));
                }
                Tile::Pipe => {
                    let id = ctx.next_entity_id();
                    level.pipes.push(Pipe::new(id, pos, PipeStyle::Straight, pipe_frame(PipeStyle::Straight), decal_sizes));
                }
                Tile::DamageablePipe => {
                    let damaged = options.kind.forces_damage() || ctx.rng.random::<f64>() < options.damage_probability;
                    let id = ctx.next_entity_id();
                    let mut pipe = Pipe::new(id, pos, PipeStyle::Straight, pipe_frame(PipeStyle::Straight), decal_sizes);
                    if damaged {
                        pipe.damage(&mut ctx.rng);
                    }
                    level.pipes.push(pipe);
                }
                Tile::ConnectorPipe => {
                    let right = x + 1 < map_w && tile_at(x + 1, y).connects();
                    let left = x > 0 && tile_at(x - 1, y).connects();
                    let style = if right {
                        PipeStyle::StepDown
                    } else if left {
                        PipeStyle::StepUp
                    } else {
                        PipeStyle::Straight
                    };
                    let damaged = ctx.rng.random::<f64>() < options.damage_probability;
                    let id = ctx.next_entity_id();
                    let mut pipe = Pipe::new(id, pos, style, pipe_frame(style), decal_sizes);
                    if damaged {
                        pipe.damage(&mut ctx.rng);
                    }
                    level.pipes.push(pipe);
                }
                Tile::VerticalPipe => {
                    let id = ctx.next_entity_id();
                    let mut pipe = Pipe::new(id, pos, PipeStyle::Straight, pipe_frame(PipeStyle::Straight), decal_sizes);
                    pipe.mark_vertical();
                    level.vertical_pipes.push(id);
                    level.pipes.push(pipe);
                }
                Tile::Goal => {
                    level.goal = Some(Rect::new(pos.0, pos.1, tile, tile));
                }
            }
        }
    }

    backfill_damage(&mut level.pipes, options.min_damaged, ctx);

    log::info!(
        "Generated level {}x{} tiles: {} platforms, {} pipes ({} damaged), world {}x{}",
        map_w,
        map_h,
        level.platforms.len(),
        level.pipes.len(),
        level.damaged_count(),
        level.world_width,
        level.world_height
    );
    Ok(level)
}

/// Damage random intact non-tutorial pipes until `min_damaged` are damaged
fn backfill_damage(pipes: &mut [Pipe], min_damaged: usize, ctx: &mut SimContext) {
    if min_damaged == 0 {
        return;
    }
    let damaged = pipes.iter().filter(|p| !p.tutorial && p.is_damaged()).count();
    let missing = min_damaged.saturating_sub(damaged);
    if missing == 0 {
        return;
    }
    let mut candidates: Vec<usize> = pipes
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.tutorial && !p.is_damaged())
        .map(|(i, _)| i)
        .collect();
    candidates.shuffle(&mut ctx.rng);
    for &i in candidates.iter().take(missing) {
        pipes[i].damage(&mut ctx.rng);
    }
}
