//! Hydrobot headless runner
//!
//! `hydrobot [scene] [seconds] [settings.json] [minimap.png]`
//!
//! A settings path that does not exist yet is written out with the defaults.
//!
//! Loads a scene, plays it at the fixed frame rate with a small autopilot
//! (release the companion, walk to the nearest leak, weld it) and prints a
//! JSON summary of the final state.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;

use hydrobot::minimap::Minimap;
use hydrobot::sim::{Controls, Form, Scene, SceneSummary, TickInput, tick};
use hydrobot::{ImageSprites, Settings, SoundRecorder, format_elapsed};

/// Horizontal distance at which the autopilot stops and welds
const WELD_REACH: i32 = 20;
/// Frames without horizontal progress before the autopilot jumps
const STUCK_FRAMES: u32 = 20;

struct Args {
    scene: String,
    seconds: f32,
    settings: Option<PathBuf>,
    minimap: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let scene = args.next().unwrap_or_else(|| "1".to_string());
        let seconds = args.next().and_then(|s| s.parse().ok()).unwrap_or(120.0);
        let settings = args.next().map(PathBuf::from);
        let minimap = args.next().map(PathBuf::from);
        Self {
            scene,
            seconds,
            settings,
            minimap,
        }
    }
}

/// Scripted player for unattended runs
#[derive(Default)]
struct Autopilot {
    last_x: i32,
    stuck: u32,
}

impl Autopilot {
    fn input(&mut self, scene: &Scene) -> TickInput {
        let player = &scene.player;
        let mut controls = Controls::default();
        if player.is_welding() {
            return TickInput::default();
        }
        if player.form() == Form::Large {
            controls.dock = player.action_cooldown <= 0.0;
            return TickInput {
                controls,
                ..Default::default()
            };
        }

        let (px, py) = player.body.rect.center();
        let target = scene
            .pipes
            .iter()
            .filter(|p| p.is_damaged())
            .min_by_key(|p| (p.body.rect.center_x() - px).abs() + (p.body.rect.center_y() - py).abs());
        let Some(target) = target else {
            return TickInput::default();
        };

        let dx = target.body.rect.center_x() - px;
        if dx.abs() <= WELD_REACH && player.footing.pipe {
            controls.repair = true;
        } else {
            controls.left = dx < 0;
            controls.right = dx > 0;
            controls.run = dx.abs() > 200;
        }

        let x = player.body.rect.x;
        if controls.left || controls.right {
            self.stuck = if x == self.last_x { self.stuck + 1 } else { 0 };
        }
        self.last_x = x;
        if self.stuck >= STUCK_FRAMES || target.body.rect.bottom() < player.body.rect.top() {
            controls.jump = true;
            self.stuck = 0;
        }
        TickInput {
            controls,
            ..Default::default()
        }
    }
}

#[derive(Serialize)]
struct RunReport {
    frames: u64,
    elapsed_text: String,
    #[serde(flatten)]
    summary: SceneSummary,
    sound_events: usize,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    let settings = match &args.settings {
        Some(path) => Settings::load_or_create(path),
        None => Settings::load(None),
    };
    log::info!("Hydrobot (headless) starting scene '{}'", args.scene);

    let sprites = ImageSprites::new(settings.asset_root.clone(), settings.tile_size);
    let mut sound = SoundRecorder::new(settings.effects_volume);
    let mut scene = match Scene::load(&args.scene, &settings, &sprites, &mut sound) {
        Ok(scene) => scene,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let dt = settings.frame_dt(settings.frame_budget());
    let max_frames = (args.seconds.max(0.0) / dt).ceil() as u64;
    let mut pilot = Autopilot::default();
    let mut frames = 0;
    while frames < max_frames && !scene.is_complete() {
        let input = pilot.input(&scene);
        tick(&mut scene, &input, dt, &mut sound);
        frames += 1;
    }

    if let Some(path) = &args.minimap {
        save_minimap(&scene, path);
    }

    let report = RunReport {
        frames,
        elapsed_text: format_elapsed(scene.elapsed),
        summary: scene.summary(),
        sound_events: sound.events().len(),
    };
    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Failed to serialize report: {e}");
            ExitCode::FAILURE
        }
    }
}

fn save_minimap(scene: &Scene, path: &Path) {
    let mut minimap = Minimap::default();
    minimap.set_bounds(Some(scene.bounds));
    let Some(frame) = minimap.project(scene) else {
        return;
    };
    match frame.rasterize().save(path) {
        Ok(()) => log::info!("Minimap written to {}", path.display()),
        Err(e) => log::warn!("Could not write minimap {}: {e}", path.display()),
    }
}
