//! Player robot
//!
//! Two forms: Small (slow, can weld pipes shut) and Large (riding the
//! companion body, fast, cannot weld). Welding freezes all physics for its
//! duration. Dock/undock is rate limited and reports back to the caller,
//! which owns the companion collection.
//!
//! Per-frame order matters and mirrors how the level feels to play:
//! weld -> surface detection -> cooldown -> move/jump/gravity -> integrate ->
//! landing -> ground check -> edge-grace snap -> crouch -> repair -> dock ->
//! world clamp -> animation and sound.

use glam::Vec2;

use super::body::{Body, Surface};
use super::collision::{Landing, resolve_landing, snap_to_ground};
use super::companion::Companion;
use super::frame::FrameAnimation;
use super::pipe::Pipe;
use super::platform::Platform;
use super::rect::Rect;
use super::state::SimContext;
use crate::audio::{Looping, SoundEffect, SoundService};
use crate::consts::{
    CROUCH_DROP, DOCK_COOLDOWN, EDGE_GRACE, GRAVITY, LARGE_JUMP_SPEED, LARGE_MOVE_SPEED, MAX_FALL_SPEED,
    PIPE_UNDERFOOT_MARGIN, REPAIR_SEARCH_DROP, REPAIR_SEARCH_RADIUS, RUN_MULTIPLIER, SMALL_JUMP_SPEED,
    SMALL_MOVE_SPEED, WELD_DURATION,
};
use crate::sprites::{SpriteKey, SpriteProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    Small,
    Large,
}

impl Form {
    pub fn move_speed(self) -> f32 {
        match self {
            Form::Small => SMALL_MOVE_SPEED,
            Form::Large => LARGE_MOVE_SPEED,
        }
    }

    pub fn jump_speed(self) -> f32 {
        match self {
            Form::Small => SMALL_JUMP_SPEED,
            Form::Large => LARGE_JUMP_SPEED,
        }
    }

    fn move_sound(self) -> SoundEffect {
        match self {
            Form::Small => SoundEffect::RobotMove,
            Form::Large => SoundEffect::BigBotMove,
        }
    }
}

/// Keys held this frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub down: bool,
    pub run: bool,
    /// Dock onto / release the companion
    pub dock: bool,
    pub repair: bool,
}

/// Which kinds of surface the player is standing on this frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Footing {
    pub platform: bool,
    pub companion: bool,
    pub pipe: bool,
}

impl Footing {
    pub fn any(&self) -> bool {
        self.platform || self.companion || self.pipe
    }

    fn record(&mut self, surface: Surface) {
        match surface {
            Surface::Platform => self.platform = true,
            Surface::Companion => self.companion = true,
            Surface::Pipe => self.pipe = true,
        }
    }
}

/// A companion handed back to the world by an undock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    pub center_x: i32,
    pub bottom: i32,
    pub facing: i32,
}

/// What the caller has to apply after a player update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerOutcome {
    pub released: Option<Release>,
    /// Companion absorbed by a dock; remove it from the world
    pub docked: Option<u32>,
}

/// Everything the player collides with or acts upon
pub struct Surroundings<'a> {
    pub bounds: Rect,
    pub platforms: &'a [Platform],
    pub companions: &'a [Companion],
    pub pipes: &'a mut [Pipe],
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Weld {
    remaining: f32,
    pipe: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pose {
    Walk,
    Run,
    Weld,
}

#[derive(Debug, Clone)]
struct FormAnimations {
    walk: FrameAnimation,
    run: FrameAnimation,
    weld: Option<FrameAnimation>,
}

impl FormAnimations {
    fn load(form: Form, sprites: &dyn SpriteProvider) -> Self {
        match form {
            Form::Small => Self {
                walk: sprites.animation(SpriteKey::RobotWalk),
                run: sprites.animation(SpriteKey::RobotRun),
                weld: Some(sprites.animation(SpriteKey::RobotWeld)),
            },
            Form::Large => Self {
                walk: sprites.animation(SpriteKey::BigBotWalk),
                run: sprites.animation(SpriteKey::BigBotRun),
                weld: None,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: u32,
    pub body: Body,
    pub vel: Vec2,
    form: Form,
    pub on_ground: bool,
    pub can_jump: bool,
    /// Last horizontal direction, -1 or 1
    pub facing: i32,
    pub running: bool,
    pub footing: Footing,
    pub edge_grace: f32,
    pub action_cooldown: f32,
    weld: Option<Weld>,
    /// Companion under the feet this frame and its tight rect
    dock_target: Option<(u32, Rect)>,
    small: FormAnimations,
    large: FormAnimations,
    pose: Pose,
    move_sound: Option<SoundEffect>,
    repair_area: Option<Rect>,
}

impl Player {
    /// A Large-form player with its top-left at `top_left`
    pub fn new(id: u32, top_left: Vec2, sprites: &dyn SpriteProvider) -> Self {
        let small = FormAnimations::load(Form::Small, sprites);
        let large = FormAnimations::load(Form::Large, sprites);
        let body = Body::new(top_left, large.walk.current_frame(), false);
        Self {
            id,
            body,
            vel: Vec2::ZERO,
            form: Form::Large,
            on_ground: false,
            can_jump: true,
            facing: 1,
            running: false,
            footing: Footing::default(),
            edge_grace: 0.0,
            action_cooldown: 0.0,
            weld: None,
            dock_target: None,
            small,
            large,
            pose: Pose::Walk,
            move_sound: None,
            repair_area: None,
        }
    }

    pub fn form(&self) -> Form {
        self.form
    }

    pub fn is_welding(&self) -> bool {
        self.weld.is_some()
    }

    /// Pipe being welded and seconds left
    pub fn weld_progress(&self) -> Option<(u32, f32)> {
        self.weld.map(|w| (w.pipe, w.remaining))
    }

    /// Surface the player stands on, if any
    pub fn standing_on(&self) -> Option<Surface> {
        if self.footing.pipe {
            Some(Surface::Pipe)
        } else if self.footing.companion {
            Some(Surface::Companion)
        } else if self.footing.platform {
            Some(Surface::Platform)
        } else {
            None
        }
    }

    /// Area probed by the last repair attempt
    pub fn repair_area(&self) -> Option<Rect> {
        self.repair_area
    }

    pub fn current_frame(&self) -> &image::RgbaImage {
        self.animation().current_frame()
    }

    fn animations(&self) -> &FormAnimations {
        match self.form {
            Form::Small => &self.small,
            Form::Large => &self.large,
        }
    }

    fn animations_mut(&mut self) -> &mut FormAnimations {
        match self.form {
            Form::Small => &mut self.small,
            Form::Large => &mut self.large,
        }
    }

    fn animation(&self) -> &FrameAnimation {
        let anims = self.animations();
        match self.pose {
            Pose::Run => &anims.run,
            Pose::Weld => anims.weld.as_ref().unwrap_or(&anims.walk),
            Pose::Walk => &anims.walk,
        }
    }

    fn animation_mut(&mut self) -> &mut FrameAnimation {
        let pose = self.pose;
        let anims = self.animations_mut();
        match pose {
            Pose::Run => &mut anims.run,
            Pose::Weld => match anims.weld {
                Some(ref mut weld) => weld,
                None => &mut anims.walk,
            },
            Pose::Walk => &mut anims.walk,
        }
    }

    pub fn update(
        &mut self,
        controls: &Controls,
        dt: f32,
        env: &mut Surroundings<'_>,
        ctx: &mut SimContext,
        sound: &mut dyn SoundService,
    ) -> PlayerOutcome {
        let mut outcome = PlayerOutcome::default();

        if let Some(mut weld) = self.weld {
            self.vel = Vec2::ZERO;
            self.stop_move_sound(sound);
            weld.remaining -= dt;
            self.pose = Pose::Weld;
            let anim = self.animation_mut();
            anim.resume();
            anim.advance(dt);
            if weld.remaining > 0.0 {
                self.weld = Some(weld);
                self.refresh_frame();
                return outcome;
            }
            self.finish_weld(weld.pipe, env.pipes, ctx, sound);
        }

        self.footing = Footing::default();
        self.dock_target = None;
        self.detect_companion(env.companions);
        if self.form == Form::Small && self.on_ground {
            self.detect_pipe_underfoot(env.pipes);
        }

        if self.action_cooldown > 0.0 {
            self.action_cooldown -= dt;
        }

        self.on_ground = self.body.mask_rect().bottom() >= env.bounds.bottom();

        self.move_horizontal(controls);
        if controls.jump && self.can_jump {
            self.vel.y = -self.form.jump_speed();
            self.can_jump = false;
        }
        self.vel.y = (self.vel.y + GRAVITY * dt).min(MAX_FALL_SPEED);

        let prev = self.body.pos;
        self.body.integrate(self.vel, dt);

        if self.vel.y >= 0.0 {
            if let Some(landing) = resolve_landing(&mut self.body, &mut self.vel, prev, env.platforms) {
                self.land(landing, env.companions);
            }
        }
        if self.vel.y >= 0.0 {
            if let Some(landing) = resolve_landing(&mut self.body, &mut self.vel, prev, env.companions) {
                self.land(landing, env.companions);
            }
        }
        if self.form == Form::Small && self.vel.y >= 0.0 {
            if let Some(landing) = resolve_landing(&mut self.body, &mut self.vel, prev, &*env.pipes) {
                self.land(landing, env.companions);
            }
        }

        self.on_ground = self.body.mask_rect().bottom() >= env.bounds.bottom() || self.footing.any();
        if !self.on_ground {
            self.can_jump = false;
        }

        self.edge_grace = (self.edge_grace - dt).max(0.0);
        if !self.on_ground && self.edge_grace > 0.0 && self.vel.y >= 0.0 && !controls.down {
            self.snap_to_nearby_ground(env);
        }

        if controls.down && self.footing.any() {
            self.body.pos.y += CROUCH_DROP;
            self.body.sync_rect();
            self.footing = Footing::default();
            self.on_ground = false;
            self.can_jump = false;
        }

        if controls.repair {
            self.try_start_weld(env.pipes, sound);
        }
        if controls.dock {
            self.try_dock(&mut outcome, sound);
        }

        self.clamp_to_world(&env.bounds);
        self.update_animation(dt);
        self.update_move_sound(sound);
        self.refresh_frame();
        outcome
    }

    fn land(&mut self, landing: Landing, companions: &[Companion]) {
        self.on_ground = true;
        self.can_jump = true;
        self.edge_grace = EDGE_GRACE;
        self.footing.record(landing.surface);
        if landing.surface == Surface::Companion {
            if let Some(c) = companions.get(landing.index) {
                self.dock_target = Some((c.id, c.body.mask_rect()));
            }
        }
    }

    fn snap_to_nearby_ground(&mut self, env: &Surroundings<'_>) {
        let landing = snap_to_ground(&mut self.body, &mut self.vel, env.platforms)
            .or_else(|| snap_to_ground(&mut self.body, &mut self.vel, env.companions))
            .or_else(|| snap_to_ground(&mut self.body, &mut self.vel, &*env.pipes));
        if let Some(landing) = landing {
            self.land(landing, env.companions);
        }
    }

    fn move_horizontal(&mut self, controls: &Controls) {
        self.vel.x = 0.0;
        self.running = false;
        let speed = self.form.move_speed();
        if controls.left {
            self.vel.x = -speed;
            self.facing = -1;
        }
        if controls.right {
            self.vel.x = speed;
            self.facing = 1;
        }
        if controls.run && self.vel.x != 0.0 {
            self.running = true;
            self.vel.x *= RUN_MULTIPLIER;
        }
    }

    fn detect_companion(&mut self, companions: &[Companion]) {
        if self.body.mask.is_empty() {
            return;
        }
        for c in companions {
            if c.body.mask.is_empty() {
                continue;
            }
            if self.body.mask_overlaps(&c.body) {
                self.footing.companion = true;
                self.dock_target = Some((c.id, c.body.mask_rect()));
                break;
            }
        }
    }

    fn detect_pipe_underfoot(&mut self, pipes: &[Pipe]) {
        if self.body.mask.is_empty() {
            return;
        }
        let feet = self.body.mask_rect();
        self.footing.pipe = pipes.iter().any(|pipe| {
            let top = pipe.body.mask_rect();
            (feet.bottom() - top.top()).abs() <= PIPE_UNDERFOOT_MARGIN && feet.overlaps_horizontally(&top)
        });
    }

    /// Nearest damaged pipe whose repair rect touches the search square below the player
    fn find_repair_target(&mut self, pipes: &[Pipe]) -> Option<u32> {
        if self.body.mask.is_empty() {
            return None;
        }
        let cx = self.body.rect.center_x();
        let cy = self.body.rect.center_y() + REPAIR_SEARCH_DROP;
        let area = Rect::new(
            cx - REPAIR_SEARCH_RADIUS,
            cy - REPAIR_SEARCH_RADIUS,
            REPAIR_SEARCH_RADIUS * 2,
            REPAIR_SEARCH_RADIUS * 2,
        );
        self.repair_area = Some(area);
        pipes
            .iter()
            .filter(|pipe| pipe.is_damaged())
            .filter_map(|pipe| {
                let r = pipe.repair_rect();
                area.intersects(&r)
                    .then(|| ((r.center_x() - cx).abs() + (r.center_y() - cy).abs(), pipe.id))
            })
            .min_by_key(|&(distance, _)| distance)
            .map(|(_, id)| id)
    }

    fn try_start_weld(&mut self, pipes: &[Pipe], sound: &mut dyn SoundService) {
        if self.weld.is_some() || self.form == Form::Large || !self.footing.pipe {
            return;
        }
        let Some(pipe) = self.find_repair_target(pipes) else {
            return;
        };
        self.weld = Some(Weld {
            remaining: WELD_DURATION,
            pipe,
        });
        self.vel = Vec2::ZERO;
        self.stop_move_sound(sound);
        self.pose = Pose::Weld;
        self.animation_mut().reset();
        sound.play(SoundEffect::WeldStart.key(), Looping::Once, None, true);
        sound.play(SoundEffect::WeldLoop.key(), Looping::Forever, None, true);
        log::debug!("Welding pipe {pipe}");
    }

    fn finish_weld(&mut self, pipe_id: u32, pipes: &mut [Pipe], ctx: &mut SimContext, sound: &mut dyn SoundService) {
        self.weld = None;
        sound.stop(SoundEffect::WeldLoop.key());
        if let Some(pipe) = pipes.iter_mut().find(|p| p.id == pipe_id) {
            pipe.repair(ctx, sound);
        }
        self.pose = Pose::Walk;
    }

    fn try_dock(&mut self, outcome: &mut PlayerOutcome, sound: &mut dyn SoundService) {
        if self.weld.is_some() || self.action_cooldown > 0.0 {
            return;
        }
        if !self.on_ground && !self.footing.any() {
            return;
        }
        match (self.form, self.dock_target) {
            (Form::Small, Some((companion, hitbox))) if self.footing.companion => {
                self.switch_form(Form::Large, sound);
                let (cx, bottom) = hitbox.mid_bottom();
                let placed = self.body.rect.with_mid_bottom(cx, bottom);
                self.body.place_at(placed.x, placed.y);
                self.action_cooldown = DOCK_COOLDOWN;
                outcome.docked = Some(companion);
                log::info!("Docked companion {companion}");
            }
            (Form::Large, _) => {
                self.switch_form(Form::Small, sound);
                self.action_cooldown = DOCK_COOLDOWN;
                let release = Release {
                    center_x: self.body.rect.center_x(),
                    bottom: self.body.rect.bottom(),
                    facing: self.facing,
                };
                outcome.released = Some(release);
                log::info!("Released companion at ({}, {})", release.center_x, release.bottom);
            }
            _ => {}
        }
    }

    fn switch_form(&mut self, form: Form, sound: &mut dyn SoundService) {
        self.stop_move_sound(sound);
        self.form = form;
        self.pose = Pose::Walk;
        self.animation_mut().reset();
        sound.play(SoundEffect::Dock.key(), Looping::Once, None, true);
        self.refresh_frame();
    }

    fn clamp_to_world(&mut self, bounds: &Rect) {
        let hitbox = self.body.mask_rect();
        if hitbox.left() < bounds.left() {
            self.body.shift_x(bounds.left() - hitbox.left());
        }
        if hitbox.right() > bounds.right() {
            self.body.shift_x(bounds.right() - hitbox.right());
        }
        let hitbox = self.body.mask_rect();
        if hitbox.bottom() >= bounds.bottom() {
            self.body.shift_y(bounds.bottom() - hitbox.bottom());
            self.vel.y = 0.0;
            self.on_ground = true;
            self.can_jump = true;
        }
        if hitbox.top() < bounds.top() {
            self.body.shift_y(bounds.top() - hitbox.top());
            self.vel.y = 0.0;
        }
    }

    fn update_animation(&mut self, dt: f32) {
        if self.weld.is_some() {
            return;
        }
        let pose = if self.running { Pose::Run } else { Pose::Walk };
        if pose != self.pose {
            self.pose = pose;
            self.animation_mut().reset();
        }
        let still = self.vel.x == 0.0;
        let anim = self.animation_mut();
        if still {
            anim.pause();
        } else {
            anim.resume();
        }
        anim.advance(dt);
    }

    fn update_move_sound(&mut self, sound: &mut dyn SoundService) {
        if self.weld.is_some() || self.vel.x.abs() <= 1e-2 {
            self.stop_move_sound(sound);
            return;
        }
        let wanted = self.form.move_sound();
        if self.move_sound.is_some_and(|active| active != wanted) {
            self.stop_move_sound(sound);
        }
        self.move_sound = Some(wanted);
        sound.play(wanted.key(), Looping::Forever, None, false);
    }

    fn stop_move_sound(&mut self, sound: &mut dyn SoundService) {
        if let Some(active) = self.move_sound.take() {
            sound.stop(active.key());
        }
    }

    /// Rebuild rect and mask from the current frame, mirrored when facing left
    fn refresh_frame(&mut self) {
        let flip = self.facing < 0;
        let frame = self.animation().current_frame().clone();
        self.body.set_frame(&frame, flip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{SoundRecorder, register_effects};
    use crate::sim::frame::PLACEHOLDER_COLOR;
    use crate::sim::pipe::PipeStyle;
    use crate::sprites::PlaceholderSprites;
    use image::RgbaImage;

    const DT: f32 = 1.0 / 60.0;
    const BOUNDS: Rect = Rect::new(0, 0, 2000, 1000);

    struct World {
        platforms: Vec<Platform>,
        companions: Vec<Companion>,
        pipes: Vec<Pipe>,
        ctx: SimContext,
        sound: SoundRecorder,
    }

    impl World {
        fn new() -> Self {
            let mut sound = SoundRecorder::default();
            register_effects(&mut sound);
            Self {
                platforms: Vec::new(),
                companions: Vec::new(),
                pipes: Vec::new(),
                ctx: SimContext::new(5, 1024),
                sound,
            }
        }

        fn step(&mut self, player: &mut Player, controls: Controls) -> PlayerOutcome {
            let mut env = Surroundings {
                bounds: BOUNDS,
                platforms: &self.platforms,
                companions: &self.companions,
                pipes: &mut self.pipes,
            };
            player.update(&controls, DT, &mut env, &mut self.ctx, &mut self.sound)
        }

        fn settle(&mut self, player: &mut Player) {
            for _ in 0..30 {
                self.step(player, Controls::default());
            }
        }
    }

    fn tile() -> RgbaImage {
        RgbaImage::from_pixel(100, 100, PLACEHOLDER_COLOR)
    }

    fn player_at(x: f32, y: f32) -> Player {
        Player::new(1, Vec2::new(x, y), &PlaceholderSprites::default())
    }

    fn small_player_at(x: f32, y: f32, world: &mut World) -> Player {
        let mut p = player_at(x, y);
        p.switch_form(Form::Small, &mut world.sound);
        p
    }

    #[test]
    fn test_starts_large() {
        let p = player_at(0.0, 0.0);
        assert_eq!(p.form(), Form::Large);
        assert_eq!(p.body.rect, Rect::new(0, 0, 120, 120));
    }

    #[test]
    fn test_lands_on_platform_top() {
        let mut world = World::new();
        // Mask top at 500 after the 16px trim
        world.platforms.push(Platform::new(10, (300, 484), &tile()));
        let mut p = player_at(290.0, 300.0);
        for _ in 0..60 {
            world.step(&mut p, Controls::default());
        }
        assert_eq!(p.body.rect.bottom(), 500);
        assert_eq!(p.vel.y, 0.0);
        assert!(p.on_ground);
        assert_eq!(p.standing_on(), Some(Surface::Platform));
        assert_eq!(p.body.pos.y, p.body.rect.y as f32);
    }

    #[test]
    fn test_walking_into_side_is_not_lifted() {
        let mut world = World::new();
        world.platforms.push(Platform::new(10, (400, 900), &tile()));
        let mut p = player_at(200.0, 880.0);
        world.settle(&mut p);
        assert_eq!(p.body.rect.bottom(), 1000);
        let right = Controls {
            right: true,
            ..Default::default()
        };
        for _ in 0..30 {
            world.step(&mut p, right);
        }
        assert_eq!(p.body.rect.bottom(), 1000);
        assert!(p.body.rect.right() > 400);
    }

    #[test]
    fn test_edge_grace_carries_across_small_step() {
        let mut world = World::new();
        // Mask tops at 500 and 503
        world.platforms.push(Platform::new(10, (300, 484), &tile()));
        world.platforms.push(Platform::new(11, (400, 487), &tile()));
        let mut p = player_at(290.0, 380.0);
        world.settle(&mut p);
        assert_eq!(p.body.rect.bottom(), 500);

        let right = Controls {
            right: true,
            ..Default::default()
        };
        for _ in 0..24 {
            world.step(&mut p, right);
            assert!(p.on_ground);
        }
        assert!(p.body.rect.left() > 400);
        assert_eq!(p.body.rect.bottom(), 503);
        assert_eq!(p.standing_on(), Some(Surface::Platform));
    }

    #[test]
    fn test_no_snap_after_grace_runs_out() {
        let mut world = World::new();
        world.platforms.push(Platform::new(10, (300, 484), &tile()));
        let mut p = player_at(290.0, 380.0);
        world.settle(&mut p);
        assert!(p.edge_grace > 0.0);

        // Airborne for longer than the grace window
        world.platforms.clear();
        for _ in 0..8 {
            world.step(&mut p, Controls::default());
        }
        assert!(!p.on_ground);
        assert_eq!(p.edge_grace, 0.0);

        // A surface 3px under the feet is not snapped to
        world.platforms.push(Platform::new(11, (300, 487), &tile()));
        p.body.place_at(290, 380);
        p.vel = Vec2::ZERO;
        world.step(&mut p, Controls::default());
        assert!(!p.on_ground);
        assert_eq!(p.body.rect.bottom(), 500);

        // Same gap inside the window closes
        let mut q = player_at(290.0, 380.0);
        q.edge_grace = EDGE_GRACE;
        world.step(&mut q, Controls::default());
        assert!(q.on_ground);
        assert_eq!(q.body.rect.bottom(), 503);
    }

    #[test]
    fn test_holding_down_skips_snap() {
        let mut world = World::new();
        world.platforms.push(Platform::new(11, (300, 487), &tile()));
        let mut p = player_at(290.0, 380.0);
        p.edge_grace = EDGE_GRACE;
        let down = Controls {
            down: true,
            ..Default::default()
        };
        world.step(&mut p, down);
        assert!(!p.on_ground);
        assert_eq!(p.body.rect.bottom(), 500);
    }

    #[test]
    fn test_jump_requires_ground() {
        let mut world = World::new();
        let mut p = player_at(100.0, 880.0);
        world.settle(&mut p);
        let jump = Controls {
            jump: true,
            ..Default::default()
        };
        world.step(&mut p, jump);
        assert!(p.vel.y < 0.0);
        assert!(!p.can_jump);
        let rising = p.vel.y;
        world.step(&mut p, jump);
        assert!(p.vel.y > rising);
    }

    #[test]
    fn test_run_multiplies_speed() {
        let mut world = World::new();
        let mut p = player_at(100.0, 880.0);
        let run = Controls {
            left: true,
            run: true,
            ..Default::default()
        };
        world.step(&mut p, run);
        assert_eq!(p.vel.x, -LARGE_MOVE_SPEED * RUN_MULTIPLIER);
        assert_eq!(p.facing, -1);
        assert!(p.running);
        assert!(world.sound.is_playing(SoundEffect::BigBotMove.key()));
        world.step(&mut p, Controls::default());
        assert!(!world.sound.is_playing(SoundEffect::BigBotMove.key()));
    }

    #[test]
    fn test_undock_releases_companion_and_respects_cooldown() {
        let mut world = World::new();
        let mut p = player_at(500.0, 880.0);
        world.settle(&mut p);
        let dock = Controls {
            dock: true,
            ..Default::default()
        };
        let out = world.step(&mut p, dock);
        let release = out.released.unwrap();
        assert_eq!(p.form(), Form::Small);
        assert_eq!(release.bottom, 1000);
        assert_eq!(release.center_x, p.body.rect.center_x());
        assert_eq!(p.action_cooldown, DOCK_COOLDOWN);

        let again = world.step(&mut p, dock);
        assert_eq!(again, PlayerOutcome::default());
        assert_eq!(p.form(), Form::Small);
    }

    #[test]
    fn test_dock_onto_companion() {
        let mut world = World::new();
        let anim = FrameAnimation::placeholder(120, 120);
        let companion = Companion::new(42, Vec2::new(300.0, 380.0), anim, "movimiento_extensor_0".into(), &mut world.sound);
        world.companions.push(companion);
        let mut p = small_player_at(300.0, 250.0, &mut world);
        world.settle(&mut p);
        assert_eq!(p.body.rect.bottom(), 380);
        assert!(p.footing.companion);

        let out = world.step(
            &mut p,
            Controls {
                dock: true,
                ..Default::default()
            },
        );
        assert_eq!(out.docked, Some(42));
        assert_eq!(p.form(), Form::Large);
        assert_eq!(p.body.rect.mid_bottom(), world.companions[0].body.mask_rect().mid_bottom());
        assert_eq!(p.action_cooldown, DOCK_COOLDOWN);
    }

    #[test]
    fn test_crouch_drops_through() {
        let mut world = World::new();
        world.platforms.push(Platform::new(10, (300, 484), &tile()));
        let mut p = player_at(290.0, 300.0);
        world.settle(&mut p);
        assert_eq!(p.body.rect.bottom(), 500);
        let down = Controls {
            down: true,
            ..Default::default()
        };
        // Holding down disables the snap, so the next real contact drops through
        for _ in 0..3 {
            world.step(&mut p, down);
        }
        assert!(p.body.rect.bottom() > 500);
        assert!(!p.on_ground);
        for _ in 0..5 {
            world.step(&mut p, Controls::default());
        }
        assert!(p.body.rect.bottom() > 510);
    }

    #[test]
    fn test_weld_repairs_pipe_after_duration() {
        let mut world = World::new();
        let decals = PlaceholderSprites::default().decal_sizes();
        let mut pipe = Pipe::new(7, (300, 500), PipeStyle::Straight, &tile(), decals);
        pipe.damage(&mut world.ctx.rng);
        world.pipes.push(pipe);
        let mut p = small_player_at(290.0, 380.0, &mut world);
        world.settle(&mut p);
        assert_eq!(p.body.rect.bottom(), 516);
        assert!(p.footing.pipe);

        let repair = Controls {
            repair: true,
            ..Default::default()
        };
        world.step(&mut p, repair);
        assert!(p.is_welding());
        assert_eq!(p.weld_progress().map(|(id, _)| id), Some(7));
        assert!(world.sound.is_playing(SoundEffect::WeldLoop.key()));

        let frozen = p.body.rect;
        let walk = Controls {
            right: true,
            ..Default::default()
        };
        for _ in 0..170 {
            world.step(&mut p, walk);
        }
        assert!(p.is_welding());
        assert_eq!(p.body.rect, frozen);
        assert!(world.pipes[0].is_damaged());

        for _ in 0..20 {
            world.step(&mut p, Controls::default());
        }
        assert!(!p.is_welding());
        assert!(world.pipes[0].is_repaired());
        assert!(!world.sound.is_playing(SoundEffect::WeldLoop.key()));
    }

    #[test]
    fn test_repair_without_damaged_pipe_is_noop() {
        let mut world = World::new();
        let decals = PlaceholderSprites::default().decal_sizes();
        world.pipes.push(Pipe::new(7, (300, 500), PipeStyle::Straight, &tile(), decals));
        let mut p = small_player_at(290.0, 380.0, &mut world);
        world.settle(&mut p);
        world.step(
            &mut p,
            Controls {
                repair: true,
                ..Default::default()
            },
        );
        assert!(!p.is_welding());
        assert!(p.repair_area().is_some());
    }

    #[test]
    fn test_large_form_ignores_pipes() {
        let mut world = World::new();
        let decals = PlaceholderSprites::default().decal_sizes();
        world.pipes.push(Pipe::new(7, (300, 500), PipeStyle::Straight, &tile(), decals));
        let mut p = player_at(290.0, 380.0);
        for _ in 0..120 {
            world.step(&mut p, Controls::default());
        }
        assert_eq!(p.body.rect.bottom(), 1000);
    }

    #[test]
    fn test_world_clamp() {
        let mut world = World::new();
        let mut p = player_at(-50.0, -40.0);
        world.step(&mut p, Controls::default());
        assert_eq!(p.body.mask_rect().left(), 0);
        assert_eq!(p.body.mask_rect().top(), 0);
    }
}
