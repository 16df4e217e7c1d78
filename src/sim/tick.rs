//! Per-frame simulation step
//!
//! One `tick` per rendered frame. The update order is fixed:
//! events -> player -> dock/release bookkeeping -> camera -> pipes ->
//! particles -> companions -> completion.

use super::particle::update_particles;
use super::player::{Controls, Form, Surroundings};
use super::state::{Scene, ScenePhase};
use crate::audio::{CELEBRATION_SOUND, SoundService};
use crate::format_elapsed;

/// Input for a single frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Keys held this frame
    pub controls: Controls,
    /// Call key pressed this frame (Small form only)
    pub call_companion: bool,
    /// Interact key pressed this frame: guide dialogue, tutorial finish
    pub confirm: bool,
}

/// Advance the scene by one frame of `dt` seconds (clamped to the scene's frame cap)
pub fn tick(scene: &mut Scene, input: &TickInput, dt: f32, sound: &mut dyn SoundService) {
    if scene.is_complete() {
        return;
    }
    let dt = dt.clamp(0.0, scene.max_frame_dt);
    scene.elapsed += dt;

    let caller = scene.player.body.rect;
    if input.call_companion && scene.player.form() == Form::Small {
        for companion in &mut scene.companions {
            companion.call(scene.player.id, &caller);
        }
    }
    if input.confirm {
        if let Some(guide) = scene.guide.as_mut().filter(|g| g.in_range(&caller)) {
            guide.advance_hint();
        }
    }

    let outcome = {
        let mut env = Surroundings {
            bounds: scene.bounds,
            platforms: &scene.platforms,
            companions: &scene.companions,
            pipes: &mut scene.pipes,
        };
        scene.player.update(&input.controls, dt, &mut env, &mut scene.ctx, sound)
    };

    if let Some(id) = outcome.docked {
        if let Some(index) = scene.companions.iter().position(|c| c.id == id) {
            let mut companion = scene.companions.remove(index);
            companion.stop_sound(sound);
        }
    }

    scene.camera.follow(scene.player.body.rect.center(), &scene.bounds);
    if let Some(guide) = scene.guide.as_mut() {
        guide.face(&scene.player.body.rect);
    }

    if let Some(release) = outcome.released {
        scene.spawn_companion(release.center_x, release.bottom, release.facing, sound);
    }

    for pipe in &mut scene.pipes {
        pipe.update(dt, &mut scene.ctx, sound, &mut scene.particles);
    }
    if scene.kind.is_tutorial() && !scene.falls_started && scene.damaged_count() == 0 {
        start_tutorial_falls(scene);
    }
    update_particles(&mut scene.particles, dt);

    let player_id = scene.player.id;
    let player_rect = scene.player.body.rect;
    for companion in &mut scene.companions {
        let target = companion
            .follow_target
            .filter(|&id| id == player_id)
            .map(|_| player_rect);
        companion.update(dt, target, &scene.platforms, &scene.bounds, sound);
    }

    let finished = if scene.kind.is_tutorial() {
        input.confirm && scene.tutorial_ready()
    } else {
        scene.damaged_count() == 0
    };
    if finished {
        complete(scene, sound);
    }
}

fn start_tutorial_falls(scene: &mut Scene) {
    let world_height = scene.world_height();
    for pipe in scene.pipes.iter_mut().filter(|p| p.requires_fall()) {
        pipe.start_fall(world_height);
        log::debug!("Pipe {} falling", pipe.id);
    }
    scene.falls_started = true;
}

fn complete(scene: &mut Scene, sound: &mut dyn SoundService) {
    scene.phase = ScenePhase::Completed {
        elapsed: scene.elapsed,
    };
    sound.play_oneshot(CELEBRATION_SOUND, None);
    log::info!("Scene '{}' complete in {}", scene.name, format_elapsed(scene.elapsed));
}
