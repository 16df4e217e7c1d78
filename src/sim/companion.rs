//! Companion robot: the detachable body the player rides in Large form
//!
//! Once released it is an independent physics body that lands on platforms
//! (never pipes), walks back to the player when called, and drops through
//! platforms for a moment when it ends up above the player.

use glam::Vec2;

use super::body::{Body, Collider, Surface};
use super::collision::resolve_landing;
use super::frame::FrameAnimation;
use super::platform::Platform;
use super::rect::Rect;
use crate::audio::{COMPANION_MOVE_PATH, COMPANION_MOVE_VOLUME, Looping, SoundService};
use crate::consts::{
    COMPANION_ALIGN_TOLERANCE, COMPANION_CALL_TOLERANCE, COMPANION_DROP_GAP, COMPANION_DROP_SPEED,
    COMPANION_PASS_THROUGH, COMPANION_SPEED, GRAVITY, MAX_FALL_SPEED,
};

#[derive(Debug, Clone)]
pub struct Companion {
    pub id: u32,
    pub body: Body,
    pub vel: Vec2,
    /// Facing, -1 or 1
    pub direction: i32,
    pub moving: bool,
    /// Entity id of whoever called it
    pub follow_target: Option<u32>,
    pub on_ground: bool,
    pass_through: bool,
    pass_through_timer: f32,
    anim: FrameAnimation,
    sound_key: String,
    sound_active: bool,
}

impl Companion {
    /// A companion at `top_left`, registering its own movement loop under `sound_key`
    pub fn new(id: u32, top_left: Vec2, anim: FrameAnimation, sound_key: String, sound: &mut dyn SoundService) -> Self {
        sound.register(&sound_key, COMPANION_MOVE_PATH, None, COMPANION_MOVE_VOLUME);
        let body = Body::new(top_left, anim.current_frame(), false);
        Self {
            id,
            body,
            vel: Vec2::ZERO,
            direction: 1,
            moving: false,
            follow_target: None,
            on_ground: false,
            pass_through: false,
            pass_through_timer: 0.0,
            anim,
            sound_key,
            sound_active: false,
        }
    }

    /// Place a freshly released companion so its tight rect is centred on
    /// `center_x` with its bottom at `bottom`.
    pub fn released(
        id: u32,
        (center_x, bottom): (i32, i32),
        facing: i32,
        anim: FrameAnimation,
        sound_key: String,
        sound: &mut dyn SoundService,
    ) -> Self {
        let mut companion = Self::new(id, Vec2::ZERO, anim, sound_key, sound);
        companion.set_direction(facing);
        let hitbox = companion.body.mask_rect();
        companion.body.shift_x(center_x - hitbox.center_x());
        companion.body.shift_y(bottom - hitbox.bottom());
        companion
    }

    pub fn sound_key(&self) -> &str {
        &self.sound_key
    }

    pub fn is_passing_through(&self) -> bool {
        self.pass_through
    }

    pub fn animation(&self) -> &FrameAnimation {
        &self.anim
    }

    /// Face left (negative) or right, keeping the mid-bottom anchored
    pub fn set_direction(&mut self, direction: i32) {
        let direction = if direction < 0 { -1 } else { 1 };
        if direction == self.direction {
            return;
        }
        let (cx, bottom) = self.body.rect.mid_bottom();
        self.direction = direction;
        self.body.set_frame(self.anim.current_frame(), direction < 0);
        let anchored = self.body.rect.with_mid_bottom(cx, bottom);
        self.body.place_at(anchored.x, anchored.y);
    }

    /// Walk toward the caller. Already aligned: only drop if above them.
    pub fn call(&mut self, target_id: u32, target: &Rect) {
        if (self.body.rect.center_x() - target.center_x()).abs() <= COMPANION_CALL_TOLERANCE {
            if self.body.rect.bottom() < target.top() - COMPANION_DROP_GAP {
                self.start_drop();
            }
            return;
        }
        log::debug!("Companion {} called by {}", self.id, target_id);
        self.follow_target = Some(target_id);
        self.moving = true;
    }

    /// Ignore platforms briefly and fall
    pub fn start_drop(&mut self) {
        self.pass_through = true;
        self.pass_through_timer = COMPANION_PASS_THROUGH;
        self.vel.y = self.vel.y.max(COMPANION_DROP_SPEED);
        self.on_ground = false;
        log::debug!("Companion {} dropping through platforms", self.id);
    }

    /// One frame. `target` is the current rect of `follow_target`, if it still exists.
    pub fn update(
        &mut self,
        dt: f32,
        target: Option<Rect>,
        platforms: &[Platform],
        bounds: &Rect,
        sound: &mut dyn SoundService,
    ) {
        self.vel.x = 0.0;
        self.on_ground = false;

        if self.moving {
            match target {
                Some(target) => self.follow(&target),
                None => {
                    self.moving = false;
                    self.follow_target = None;
                }
            }
        }

        if self.pass_through {
            self.pass_through_timer -= dt;
            if self.pass_through_timer <= 0.0 {
                self.pass_through = false;
            }
        }

        self.vel.y = (self.vel.y + GRAVITY * dt).min(MAX_FALL_SPEED);

        let prev = self.body.pos;
        self.body.integrate(self.vel, dt);

        if !self.pass_through && resolve_landing(&mut self.body, &mut self.vel, prev, platforms).is_some() {
            self.on_ground = true;
        }

        if self.body.clamp_to(bounds) {
            self.vel.y = 0.0;
            self.on_ground = true;
        }

        if self.vel.x.abs() > 1e-2 {
            self.anim.resume();
        } else {
            self.anim.pause();
        }
        self.anim.advance(dt);
        self.body.set_frame(self.anim.current_frame(), self.direction < 0);
        self.update_sound(sound);
    }

    fn follow(&mut self, target: &Rect) {
        let dx = target.center_x() - self.body.rect.center_x();
        if dx.abs() > COMPANION_ALIGN_TOLERANCE {
            self.direction = dx.signum();
            self.vel.x = COMPANION_SPEED * dx.signum() as f32;
            return;
        }
        self.moving = false;
        if self.body.rect.bottom() < target.top() - COMPANION_DROP_GAP {
            self.start_drop();
        }
        self.follow_target = None;
    }

    fn update_sound(&mut self, sound: &mut dyn SoundService) {
        if self.moving && self.vel.x.abs() > 1e-2 {
            if !self.sound_active {
                self.sound_active = sound.play(&self.sound_key, Looping::Forever, None, true).is_some();
            }
        } else {
            self.stop_sound(sound);
        }
    }

    /// Silence the movement loop (also used when the companion is removed)
    pub fn stop_sound(&mut self, sound: &mut dyn SoundService) {
        if self.sound_active {
            sound.stop(&self.sound_key);
        }
        self.sound_active = false;
    }
}

impl Collider for Companion {
    fn body(&self) -> &Body {
        &self.body
    }

    fn surface(&self) -> Surface {
        Surface::Companion
    }
}
