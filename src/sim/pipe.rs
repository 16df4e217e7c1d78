//! Pipes: platform-like obstacles with a damage / repair / fall lifecycle
//!
//! A damaged pipe leaks droplets and (if it owns the leak channel) loops the
//! water sound. Damage escalates every 30 seconds up to stage 3, each stage
//! leaking faster. Repair is terminal: the decal turns grey and the pipe can
//! never be damaged again. Tutorial pipes may additionally fall to the world
//! floor once the level's repairs are done.

use glam::Vec2;
use image::{RgbaImage, imageops};
use rand::Rng;
use rand::seq::IndexedRandom;

use super::body::{Body, Collider, Surface};
use super::mask::CollisionMask;
use super::particle::Particle;
use super::rect::Rect;
use super::state::SimContext;
use crate::audio::{Looping, PATCH_SOUNDS, PATCH_VOLUME, SoundEffect, SoundService};
use crate::consts::{LEAK_SPREAD, PIPE_ESCALATION_SECS, PIPE_FALL_SPEED, PLATFORM_TOP_TRIM};

/// Visual orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Sprite variant used to join neighbouring pipe segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipeStyle {
    Straight,
    /// Connector rising toward its left neighbour
    StepUp,
    /// Connector dropping toward its right neighbour
    StepDown,
}

/// How badly a damaged pipe is leaking
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BreakStage {
    Cracked = 1,
    Split = 2,
    Burst = 3,
}

impl BreakStage {
    pub const ALL: [BreakStage; 3] = [BreakStage::Cracked, BreakStage::Split, BreakStage::Burst];

    pub fn number(self) -> u8 {
        self as u8
    }

    /// Next stage, saturating at [`BreakStage::Burst`]
    pub fn escalated(self) -> Self {
        match self {
            BreakStage::Cracked => BreakStage::Split,
            BreakStage::Split | BreakStage::Burst => BreakStage::Burst,
        }
    }

    /// Seconds between droplet bursts
    pub fn leak_interval(self) -> f32 {
        match self {
            BreakStage::Cracked => 0.04,
            BreakStage::Split => 0.02,
            BreakStage::Burst => 0.01,
        }
    }

    /// Droplets per burst
    pub fn burst_size(self) -> usize {
        self.number() as usize
    }

    fn index(self) -> usize {
        self.number() as usize - 1
    }
}

/// Damage decal drawn over a pipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decal {
    /// Texture family, one per break stage
    pub texture: BreakStage,
    /// Counter-clockwise rotation in degrees (0, 90, 180, 270)
    pub rotation: u16,
    /// Size after rotation
    pub size: (i32, i32),
    /// Turned grey by a repair
    pub desaturated: bool,
}

impl Decal {
    const ROTATIONS: [u16; 4] = [0, 90, 180, 270];

    fn roll(texture: BreakStage, source_size: (u32, u32), rng: &mut impl Rng) -> Self {
        let rotation = *Self::ROTATIONS.choose(rng).unwrap_or(&0);
        let (w, h) = (source_size.0 as i32, source_size.1 as i32);
        let size = if rotation % 180 == 0 { (w, h) } else { (h, w) };
        Self {
            texture,
            rotation,
            size,
            desaturated: false,
        }
    }

    /// World rect when centred on `center`
    pub fn rect_at(&self, center: (i32, i32)) -> Rect {
        Rect::new(0, 0, self.size.0, self.size.1).centered_on(center.0, center.1)
    }

    /// Produce the pixels to draw from the stage texture
    pub fn render(&self, source: &RgbaImage) -> RgbaImage {
        let mut image = match self.rotation {
            90 => imageops::rotate270(source),
            180 => imageops::rotate180(source),
            270 => imageops::rotate90(source),
            _ => source.clone(),
        };
        if self.desaturated {
            desaturate(&mut image);
        }
        image
    }
}

/// Recolour every visible pixel to a light grey derived from its luma
pub fn desaturate(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        if a == 0 {
            continue;
        }
        let luma = (r as f32 * 0.299 + g as f32 * 0.587 + b as f32 * 0.114) as u32;
        let grey = ((luma as f32 * 0.4 + 150.0) as u32).min(255) as u8;
        pixel.0 = [grey, grey, grey, a];
    }
}

/// Vertical fall lifecycle of tutorial pipes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FallState {
    /// Not a falling pipe
    None,
    /// Waiting for the level's repairs to finish
    Pending,
    Falling { target_y: f32 },
    Complete,
}

/// Ownership of the single looping leak sound.
///
/// At most one pipe owns it; the owner hands it back when it stops leaking.
#[derive(Debug, Clone, Default)]
pub struct LeakChannel {
    owner: Option<u32>,
    looping: bool,
}

impl LeakChannel {
    pub fn owner(&self) -> Option<u32> {
        self.owner
    }

    /// Give the channel up if `pipe_id` holds it
    pub fn release(&mut self, pipe_id: u32, sound: &mut dyn SoundService) {
        if self.owner != Some(pipe_id) {
            return;
        }
        if self.looping {
            sound.stop(SoundEffect::WaterLeak.key());
        }
        self.owner = None;
        self.looping = false;
    }

    /// Claim the channel for `pipe_id` if it is free and keep the loop alive.
    /// Returns false when another pipe owns it.
    fn keep_alive(&mut self, pipe_id: u32, sound: &mut dyn SoundService) -> bool {
        match self.owner {
            Some(owner) if owner != pipe_id => return false,
            Some(_) => {}
            None => {
                self.owner = Some(pipe_id);
                self.looping = false;
            }
        }
        let key = SoundEffect::WaterLeak.key();
        if !self.looping || !sound.is_playing(key) {
            self.looping = sound.play(key, Looping::Forever, None, true).is_some();
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct Pipe {
    pub id: u32,
    pub body: Body,
    pub style: PipeStyle,
    pub orientation: Orientation,
    /// Tutorial-only pipes are excluded from damage backfill
    pub tutorial: bool,
    damaged: bool,
    repaired: bool,
    stage: BreakStage,
    damage_age: f32,
    leak_timer: f32,
    decal: Option<Decal>,
    decal_sizes: [(u32, u32); 3],
    fall: FallState,
}

impl Pipe {
    /// An intact pipe. `decal_sizes` holds the decal texture size per stage.
    pub fn new(id: u32, top_left: (i32, i32), style: PipeStyle, frame: &RgbaImage, decal_sizes: [(u32, u32); 3]) -> Self {
        let mut mask = CollisionMask::from_frame(frame, false);
        mask.trim_top(PLATFORM_TOP_TRIM);
        let pos = Vec2::new(top_left.0 as f32, top_left.1 as f32);
        Self {
            id,
            body: Body::with_mask(pos, mask),
            style,
            orientation: Orientation::Horizontal,
            tutorial: false,
            damaged: false,
            repaired: false,
            stage: BreakStage::Cracked,
            damage_age: 0.0,
            leak_timer: 0.0,
            decal: None,
            decal_sizes,
            fall: FallState::None,
        }
    }

    /// Turn this pipe into a tutorial pipe that falls once repairs are done
    pub fn mark_vertical(&mut self) {
        self.orientation = Orientation::Vertical;
        self.tutorial = true;
        self.fall = FallState::Pending;
    }

    pub fn is_damaged(&self) -> bool {
        self.damaged
    }

    pub fn is_repaired(&self) -> bool {
        self.repaired
    }

    pub fn stage(&self) -> BreakStage {
        self.stage
    }

    /// Seconds since the last escalation (or since damage began)
    pub fn damage_age(&self) -> f32 {
        self.damage_age
    }

    pub fn decal(&self) -> Option<&Decal> {
        self.decal.as_ref()
    }

    pub fn fall_state(&self) -> FallState {
        self.fall
    }

    pub fn requires_fall(&self) -> bool {
        self.fall == FallState::Pending
    }

    pub fn in_fall(&self) -> bool {
        matches!(self.fall, FallState::Falling { .. })
    }

    pub fn fall_target_y(&self) -> Option<f32> {
        match self.fall {
            FallState::Falling { target_y } => Some(target_y),
            _ => None,
        }
    }

    pub fn fall_complete(&self) -> bool {
        self.fall == FallState::Complete
    }

    /// Break the pipe. Repaired pipes stay repaired; damaged pipes are unchanged.
    pub fn damage(&mut self, rng: &mut impl Rng) {
        if self.repaired || self.damaged {
            return;
        }
        self.damaged = true;
        self.stage = BreakStage::Cracked;
        self.damage_age = 0.0;
        self.leak_timer = 0.0;
        self.decal = Some(Decal::roll(self.stage, self.decal_sizes[self.stage.index()], rng));
    }

    /// Area the repair search tests against: the decal while damaged,
    /// otherwise the tight collision rect.
    pub fn repair_rect(&self) -> Rect {
        match (&self.decal, self.damaged) {
            (Some(decal), true) => decal.rect_at(self.body.rect.center()),
            _ => self.mask_rect(),
        }
    }

    /// Patch the pipe. Returns false (and changes nothing) if it was not damaged.
    pub fn repair(&mut self, ctx: &mut SimContext, sound: &mut dyn SoundService) -> bool {
        if !self.damaged {
            return false;
        }
        self.damaged = false;
        self.repaired = true;
        if let Some(decal) = &mut self.decal {
            decal.desaturated = true;
        }
        self.damage_age = 0.0;
        self.leak_timer = 0.0;
        ctx.leak.release(self.id, sound);
        if let Some(path) = PATCH_SOUNDS.choose(&mut ctx.rng) {
            sound.play_oneshot(path, Some(PATCH_VOLUME));
        }
        log::debug!("Pipe {} repaired", self.id);
        true
    }

    /// Begin falling toward the world floor. A pipe already there completes at once.
    pub fn start_fall(&mut self, world_height: i32) {
        let target = (world_height - self.body.rect.h).max(0);
        if self.body.pos.y >= target as f32 {
            self.body.place_at(self.body.rect.x, target);
            self.fall = FallState::Complete;
            return;
        }
        self.fall = FallState::Falling {
            target_y: target as f32,
        };
    }

    /// Advance one frame: fall animation, leak sound, escalation, droplets
    pub fn update(&mut self, dt: f32, ctx: &mut SimContext, sound: &mut dyn SoundService, particles: &mut Vec<Particle>) {
        if let FallState::Falling { target_y } = self.fall {
            ctx.leak.release(self.id, sound);
            self.body.pos.y = (self.body.pos.y + PIPE_FALL_SPEED * dt).min(target_y);
            self.body.sync_rect();
            if self.body.pos.y >= target_y {
                self.fall = FallState::Complete;
            }
            return;
        }

        if !self.damaged {
            ctx.leak.release(self.id, sound);
            return;
        }

        ctx.leak.keep_alive(self.id, sound);

        self.damage_age += dt;
        if self.damage_age >= PIPE_ESCALATION_SECS {
            self.damage_age -= PIPE_ESCALATION_SECS;
            self.escalate(&mut ctx.rng);
        }

        self.leak_timer += dt;
        if self.leak_timer >= self.stage.leak_interval() {
            self.leak_timer = 0.0;
            let (cx, cy) = self.body.rect.center();
            for _ in 0..self.stage.burst_size() {
                if particles.len() >= ctx.max_particles {
                    break;
                }
                let x = cx + ctx.rng.random_range(-LEAK_SPREAD..=LEAK_SPREAD);
                let y = cy + ctx.rng.random_range(-LEAK_SPREAD..=LEAK_SPREAD);
                particles.push(Particle::spawn(Vec2::new(x as f32, y as f32), &mut ctx.rng));
            }
        }
    }

    fn escalate(&mut self, rng: &mut impl Rng) {
        if self.stage == BreakStage::Burst {
            return;
        }
        self.stage = self.stage.escalated();
        self.decal = Some(Decal::roll(self.stage, self.decal_sizes[self.stage.index()], rng));
        log::debug!("Pipe {} escalated to stage {}", self.id, self.stage.number());
    }
}

impl Collider for Pipe {
    fn body(&self) -> &Body {
        &self.body
    }

    fn surface(&self) -> Surface {
        Surface::Pipe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{SoundEvent, SoundRecorder, register_effects};
    use crate::sim::frame::PLACEHOLDER_COLOR;
    use image::Rgba;

    const DECALS: [(u32, u32); 3] = [(40, 20), (48, 24), (56, 28)];

    fn pipe(id: u32, x: i32, y: i32) -> Pipe {
        let frame = RgbaImage::from_pixel(100, 100, PLACEHOLDER_COLOR);
        Pipe::new(id, (x, y), PipeStyle::Straight, &frame, DECALS)
    }

    fn damaged_pipe(id: u32, ctx: &mut SimContext) -> Pipe {
        let mut p = pipe(id, 100 * id as i32, 300);
        p.damage(&mut ctx.rng);
        p
    }

    fn setup() -> (SimContext, SoundRecorder) {
        let mut sound = SoundRecorder::default();
        register_effects(&mut sound);
        (SimContext::new(42, 4096), sound)
    }

    #[test]
    fn test_new_pipe_is_intact_with_trimmed_mask() {
        let p = pipe(1, 0, 200);
        assert!(!p.is_damaged());
        assert!(!p.is_repaired());
        assert!(p.decal().is_none());
        assert_eq!(p.mask_rect(), Rect::new(0, 216, 100, 84));
        assert_eq!(p.repair_rect(), p.mask_rect());
    }

    #[test]
    fn test_damage_starts_at_stage_one_with_decal() {
        let (mut ctx, _) = setup();
        let p = damaged_pipe(1, &mut ctx);
        assert!(p.is_damaged());
        assert_eq!(p.stage(), BreakStage::Cracked);
        let decal = p.decal().unwrap();
        assert_eq!(decal.texture, BreakStage::Cracked);
        assert!(decal.size == (40, 20) || decal.size == (20, 40));
        assert_eq!(p.repair_rect().center(), p.body.rect.center());
    }

    #[test]
    fn test_escalation_every_thirty_seconds() {
        let (mut ctx, mut sound) = setup();
        let mut particles = Vec::new();
        let mut p = damaged_pipe(1, &mut ctx);

        for _ in 0..59 {
            p.update(0.5, &mut ctx, &mut sound, &mut particles);
        }
        assert_eq!(p.stage(), BreakStage::Cracked);
        p.update(0.5, &mut ctx, &mut sound, &mut particles);
        assert_eq!(p.stage(), BreakStage::Split);
        assert_eq!(p.decal().unwrap().texture, BreakStage::Split);

        for _ in 0..60 {
            p.update(0.5, &mut ctx, &mut sound, &mut particles);
        }
        assert_eq!(p.stage(), BreakStage::Burst);

        for _ in 0..120 {
            p.update(0.5, &mut ctx, &mut sound, &mut particles);
        }
        assert_eq!(p.stage(), BreakStage::Burst);
    }

    #[test]
    fn test_escalation_keeps_leftover_time() {
        let (mut ctx, mut sound) = setup();
        let mut particles = Vec::new();
        let mut p = damaged_pipe(1, &mut ctx);

        // 34 frames of 0.9 s reach 30.6 s
        for _ in 0..34 {
            p.update(0.9, &mut ctx, &mut sound, &mut particles);
        }
        assert_eq!(p.stage(), BreakStage::Split);
        assert!((p.damage_age() - 0.6).abs() < 1e-3);

        // 60.3 s after 67 frames, one frame earlier than counting from zero
        for _ in 0..32 {
            p.update(0.9, &mut ctx, &mut sound, &mut particles);
        }
        assert_eq!(p.stage(), BreakStage::Split);
        p.update(0.9, &mut ctx, &mut sound, &mut particles);
        assert_eq!(p.stage(), BreakStage::Burst);
    }

    #[test]
    fn test_leak_interval_halves_per_stage() {
        assert_eq!(BreakStage::Cracked.leak_interval(), 0.04);
        assert_eq!(BreakStage::Split.leak_interval(), 0.02);
        assert_eq!(BreakStage::Burst.leak_interval(), 0.01);
        assert_eq!(BreakStage::Burst.escalated(), BreakStage::Burst);
    }

    #[test]
    fn test_droplets_spawn_near_centre() {
        let (mut ctx, mut sound) = setup();
        let mut particles = Vec::new();
        let mut p = damaged_pipe(1, &mut ctx);
        p.update(0.05, &mut ctx, &mut sound, &mut particles);
        assert_eq!(particles.len(), 1);
        let (cx, cy) = p.body.rect.center();
        assert!((particles[0].pos.x - cx as f32).abs() <= LEAK_SPREAD as f32);
        assert!((particles[0].pos.y - cy as f32).abs() <= LEAK_SPREAD as f32);
    }

    #[test]
    fn test_particle_cap_is_respected() {
        let mut ctx = SimContext::new(1, 2);
        let mut sound = SoundRecorder::default();
        let mut particles = Vec::new();
        let mut p = damaged_pipe(1, &mut ctx);
        for _ in 0..10 {
            p.update(0.05, &mut ctx, &mut sound, &mut particles);
        }
        assert_eq!(particles.len(), 2);
    }

    #[test]
    fn test_repair_is_terminal() {
        let (mut ctx, mut sound) = setup();
        let mut p = damaged_pipe(1, &mut ctx);
        assert!(p.repair(&mut ctx, &mut sound));
        assert!(p.is_repaired());
        assert!(!p.is_damaged());
        assert!(p.decal().unwrap().desaturated);

        p.damage(&mut ctx.rng);
        assert!(!p.is_damaged());
        assert!(!p.repair(&mut ctx, &mut sound));
        assert!(p.is_repaired() && !p.is_damaged());
        assert!(sound.events().iter().any(|e| matches!(e, SoundEvent::OneShot { path, .. } if PATCH_SOUNDS.contains(&path.as_str()))));
    }

    #[test]
    fn test_repair_on_intact_pipe_is_a_noop() {
        let (mut ctx, mut sound) = setup();
        let mut p = pipe(1, 0, 0);
        assert!(!p.repair(&mut ctx, &mut sound));
        assert!(!p.is_repaired());
        assert!(sound.events().is_empty());
    }

    #[test]
    fn test_single_leak_sound_owner() {
        let (mut ctx, mut sound) = setup();
        let mut particles = Vec::new();
        let mut pipes = vec![damaged_pipe(1, &mut ctx), damaged_pipe(2, &mut ctx)];

        for p in &mut pipes {
            p.update(1.0 / 60.0, &mut ctx, &mut sound, &mut particles);
        }
        assert_eq!(ctx.leak.owner(), Some(1));
        assert!(sound.is_playing(SoundEffect::WaterLeak.key()));

        assert!(pipes[0].repair(&mut ctx, &mut sound));
        assert_eq!(ctx.leak.owner(), None);
        assert!(!sound.is_playing(SoundEffect::WaterLeak.key()));

        for p in &mut pipes {
            p.update(1.0 / 60.0, &mut ctx, &mut sound, &mut particles);
        }
        assert_eq!(ctx.leak.owner(), Some(2));
        assert!(sound.is_playing(SoundEffect::WaterLeak.key()));
    }

    #[test]
    fn test_fall_moves_at_constant_speed_then_completes() {
        let (mut ctx, mut sound) = setup();
        let mut particles = Vec::new();
        let mut p = pipe(1, 0, 0);
        p.mark_vertical();
        assert!(p.requires_fall());
        p.start_fall(420);
        assert_eq!(p.fall_target_y(), Some(320.0));

        p.update(0.5, &mut ctx, &mut sound, &mut particles);
        assert_eq!(p.body.pos.y, 160.0);
        assert_eq!(p.body.rect.y, 160);
        assert!(p.in_fall());

        p.update(0.5, &mut ctx, &mut sound, &mut particles);
        assert_eq!(p.body.rect.y, 320);
        assert!(p.fall_complete());

        p.update(0.5, &mut ctx, &mut sound, &mut particles);
        assert_eq!(p.body.rect.y, 320);
    }

    #[test]
    fn test_fall_from_floor_completes_immediately() {
        let mut p = pipe(1, 0, 400);
        p.mark_vertical();
        p.start_fall(420);
        assert!(p.fall_complete());
        assert_eq!(p.body.rect.y, 320);
        assert_eq!(p.body.pos.y, 320.0);
    }

    #[test]
    fn test_desaturate_keeps_alpha() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([255, 0, 0, 200]));
        img.put_pixel(1, 0, Rgba([9, 9, 9, 0]));
        desaturate(&mut img);
        // luma 76 -> 76 * 0.4 + 150 = 180
        assert_eq!(img.get_pixel(0, 0).0, [180, 180, 180, 200]);
        assert_eq!(img.get_pixel(1, 0).0, [9, 9, 9, 0]);
    }

    #[test]
    fn test_decal_render_rotates_and_greys() {
        let source = RgbaImage::from_pixel(4, 2, Rgba([0, 0, 255, 255]));
        let decal = Decal {
            texture: BreakStage::Cracked,
            rotation: 90,
            size: (2, 4),
            desaturated: true,
        };
        let out = decal.render(&source);
        assert_eq!(out.dimensions(), (2, 4));
        // luma 29 -> 161
        assert_eq!(out.get_pixel(0, 0).0, [161, 161, 161, 255]);
    }
}
