//! Animated-sprite collaborator
//!
//! Entities never open files. They ask a [`SpriteProvider`] for a
//! [`FrameAnimation`] by [`SpriteKey`] and build their masks from whatever
//! frames come back. Two providers exist:
//! - [`PlaceholderSprites`]: solid frames of the right size, no disk access
//! - [`ImageSprites`]: loads PNG/GIF assets from an asset root with the
//!   `image` crate and falls back to placeholders on any failure

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use image::codecs::gif::GifDecoder;
use image::imageops::{self, FilterType};
use image::{AnimationDecoder, ImageError, RgbaImage};

use crate::consts::{DECAL_SCALE, ROBOT_SIZE, TILE_SPRITE_SCALE};
use crate::sim::frame::{DEFAULT_FRAME_MS, FrameAnimation};
use crate::sim::particle::DROPLET_VARIANTS;
use crate::sim::pipe::{BreakStage, PipeStyle};

/// Every sprite the simulation asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpriteKey {
    Platform,
    Pipe(PipeStyle),
    Decal(BreakStage),
    Droplet(u8),
    RobotWalk,
    RobotRun,
    RobotWeld,
    BigBotWalk,
    BigBotRun,
    Companion,
    Guide,
}

/// How a loaded frame is resized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sizing {
    Native,
    /// Integer upscale of both axes
    Scale(u32),
    /// Forced square size
    Square(u32),
}

impl SpriteKey {
    /// Asset path relative to the asset root
    pub fn path(&self) -> String {
        match self {
            SpriteKey::Platform => "texturas/obj_ecn/plataforma.png".into(),
            SpriteKey::Pipe(PipeStyle::Straight) => "texturas/obj_ecn/tuberia_h.png".into(),
            SpriteKey::Pipe(PipeStyle::StepUp) => "texturas/obj_ecn/tuberia_h1.png".into(),
            SpriteKey::Pipe(PipeStyle::StepDown) => "texturas/obj_ecn/tuberia_h-1.png".into(),
            SpriteKey::Decal(stage) => format!("texturas/obj_ecn/particulas/roto{}.png", stage.number()),
            SpriteKey::Droplet(variant) => {
                format!("texturas/obj_ecn/particulas/p_agua{}.png", variant % DROPLET_VARIANTS + 1)
            }
            SpriteKey::RobotWalk => "texturas/robot/robot_andar.gif".into(),
            SpriteKey::RobotRun => "texturas/robot/robot_correr.gif".into(),
            SpriteKey::RobotWeld => "texturas/robot/soldar.gif".into(),
            SpriteKey::BigBotWalk => "texturas/robot/granbot_andar.gif".into(),
            SpriteKey::BigBotRun => "texturas/robot/granbot_correr.gif".into(),
            SpriteKey::Companion => "texturas/robot/extensor.gif".into(),
            SpriteKey::Guide => "texturas/personajes/biopchito.png".into(),
        }
    }

    pub fn sizing(&self) -> Sizing {
        match self {
            SpriteKey::Platform | SpriteKey::Pipe(_) => Sizing::Scale(TILE_SPRITE_SCALE),
            SpriteKey::Decal(_) => Sizing::Scale(DECAL_SCALE),
            SpriteKey::Droplet(_) | SpriteKey::Guide => Sizing::Native,
            _ => Sizing::Square(ROBOT_SIZE),
        }
    }

    /// Frame duration used when the asset carries none
    pub fn frame_ms(&self) -> u32 {
        match self {
            SpriteKey::RobotRun | SpriteKey::BigBotRun => 80,
            _ => DEFAULT_FRAME_MS,
        }
    }
}

/// The animated-sprite service
pub trait SpriteProvider {
    fn animation(&self, key: SpriteKey) -> FrameAnimation;

    /// Size of the first frame
    fn frame_size(&self, key: SpriteKey) -> (u32, u32) {
        self.animation(key).current_frame().dimensions()
    }

    /// Decal sizes indexed by break stage
    fn decal_sizes(&self) -> [(u32, u32); 3] {
        BreakStage::ALL.map(|stage| self.frame_size(SpriteKey::Decal(stage)))
    }
}

/// Solid frames sized like the real assets would be in-game
#[derive(Debug, Clone)]
pub struct PlaceholderSprites {
    tile_size: u32,
}

impl PlaceholderSprites {
    pub fn new(tile_size: u32) -> Self {
        Self {
            tile_size: tile_size.max(1),
        }
    }

    pub fn size_of(&self, key: SpriteKey) -> (u32, u32) {
        match key {
            SpriteKey::Platform | SpriteKey::Pipe(_) => (self.tile_size, self.tile_size),
            SpriteKey::Decal(stage) => {
                let side = (12 + 4 * stage.number() as u32) * DECAL_SCALE;
                (side, side)
            }
            SpriteKey::Droplet(_) => (4, 4),
            SpriteKey::Guide => (50, 50),
            _ => (ROBOT_SIZE, ROBOT_SIZE),
        }
    }
}

impl Default for PlaceholderSprites {
    fn default() -> Self {
        Self::new(100)
    }
}

impl SpriteProvider for PlaceholderSprites {
    fn animation(&self, key: SpriteKey) -> FrameAnimation {
        let (w, h) = self.size_of(key);
        FrameAnimation::placeholder(w, h)
    }
}

/// Loads assets from disk, caching decoded animations per key
pub struct ImageSprites {
    root: PathBuf,
    fallback: PlaceholderSprites,
    cache: RefCell<HashMap<SpriteKey, FrameAnimation>>,
}

impl std::fmt::Debug for ImageSprites {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageSprites")
            .field("root", &self.root)
            .field("cached", &self.cache.borrow().len())
            .finish()
    }
}

impl ImageSprites {
    pub fn new(root: impl Into<PathBuf>, tile_size: u32) -> Self {
        Self {
            root: root.into(),
            fallback: PlaceholderSprites::new(tile_size),
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load(&self, key: SpriteKey) -> Result<FrameAnimation, ImageError> {
        let path = self.root.join(key.path());
        let frames = if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gif")) {
            decode_gif(&path)?
        } else {
            vec![(image::open(&path)?.to_rgba8(), 0)]
        };

        let mut images = Vec::with_capacity(frames.len());
        let mut durations = Vec::with_capacity(frames.len());
        for (frame, delay_ms) in frames {
            images.push(resize(frame, key.sizing()));
            durations.push(if delay_ms > 0 { delay_ms } else { key.frame_ms() });
        }
        if images.is_empty() {
            return Ok(self.fallback.animation(key));
        }
        Ok(FrameAnimation::with_durations(images, durations))
    }
}

impl SpriteProvider for ImageSprites {
    fn animation(&self, key: SpriteKey) -> FrameAnimation {
        if let Some(anim) = self.cache.borrow().get(&key) {
            let mut anim = anim.clone();
            anim.reset();
            return anim;
        }
        let anim = match self.load(key) {
            Ok(anim) => anim,
            Err(e) => {
                log::warn!("Sprite '{}' unavailable ({e}), using placeholder", key.path());
                self.fallback.animation(key)
            }
        };
        self.cache.borrow_mut().insert(key, anim.clone());
        anim
    }
}

fn decode_gif(path: &Path) -> Result<Vec<(RgbaImage, u32)>, ImageError> {
    let reader = BufReader::new(File::open(path)?);
    let decoder = GifDecoder::new(reader)?;
    let frames = decoder.into_frames().collect_frames()?;
    Ok(frames
        .into_iter()
        .map(|frame| {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let delay = if denom == 0 { 0 } else { numer / denom };
            (frame.into_buffer(), delay)
        })
        .collect())
}

fn resize(frame: RgbaImage, sizing: Sizing) -> RgbaImage {
    let (w, h) = frame.dimensions();
    let (tw, th) = match sizing {
        Sizing::Native => return frame,
        Sizing::Scale(s) => (w * s, h * s),
        Sizing::Square(side) => (side, side),
    };
    if (tw, th) == (w, h) {
        return frame;
    }
    imageops::resize(&frame, tw.max(1), th.max(1), FilterType::Nearest)
}
