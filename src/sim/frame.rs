//! Frame sequences supplied by the animated-sprite collaborator
//!
//! Decoding is not done here: a [`FrameAnimation`] is handed ready-made frames
//! and only tracks which one is current. A single-frame animation is valid and
//! simply never changes.

use std::sync::Arc;

use image::{Rgba, RgbaImage};

/// Fill colour of placeholder frames
pub const PLACEHOLDER_COLOR: Rgba<u8> = Rgba([0, 180, 255, 255]);
/// Frame duration used when none is supplied (ms)
pub const DEFAULT_FRAME_MS: u32 = 100;

#[derive(Clone)]
pub struct FrameAnimation {
    frames: Arc<Vec<RgbaImage>>,
    durations_ms: Vec<u32>,
    index: usize,
    elapsed_ms: f32,
    playing: bool,
}

impl std::fmt::Debug for FrameAnimation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameAnimation")
            .field("frames", &self.frames.len())
            .field("index", &self.index)
            .field("playing", &self.playing)
            .finish()
    }
}

impl FrameAnimation {
    /// Frames sharing one duration. An empty list yields a placeholder.
    pub fn new(frames: Vec<RgbaImage>, frame_ms: u32) -> Self {
        let durations = vec![frame_ms.max(1); frames.len()];
        Self::with_durations(frames, durations)
    }

    /// Frames with individual durations; missing durations use the default
    pub fn with_durations(frames: Vec<RgbaImage>, mut durations_ms: Vec<u32>) -> Self {
        let frames = if frames.is_empty() {
            vec![RgbaImage::from_pixel(50, 50, PLACEHOLDER_COLOR)]
        } else {
            frames
        };
        durations_ms.resize(frames.len(), DEFAULT_FRAME_MS);
        for d in &mut durations_ms {
            *d = (*d).max(1);
        }
        Self {
            frames: Arc::new(frames),
            durations_ms,
            index: 0,
            elapsed_ms: 0.0,
            playing: true,
        }
    }

    pub fn single(frame: RgbaImage) -> Self {
        Self::new(vec![frame], DEFAULT_FRAME_MS)
    }

    /// One solid frame of the given size
    pub fn placeholder(width: u32, height: u32) -> Self {
        Self::single(RgbaImage::from_pixel(width.max(1), height.max(1), PLACEHOLDER_COLOR))
    }

    pub fn current_frame(&self) -> &RgbaImage {
        &self.frames[self.index]
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Advance playback. At most one frame step per call.
    pub fn advance(&mut self, dt: f32) {
        if !self.playing {
            return;
        }
        self.elapsed_ms += dt * 1000.0;
        if self.elapsed_ms >= self.durations_ms[self.index] as f32 {
            self.elapsed_ms = 0.0;
            self.index = (self.index + 1) % self.frames.len();
        }
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn resume(&mut self) {
        self.playing = true;
    }

    pub fn reset(&mut self) {
        self.index = 0;
        self.elapsed_ms = 0.0;
        self.playing = true;
    }

    /// Override every frame's duration
    pub fn set_speed(&mut self, frame_ms: u32) {
        self.durations_ms.fill(frame_ms.max(1));
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}
