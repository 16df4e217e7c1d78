//! Sound collaborator contract
//!
//! The simulation never touches a mixer. It talks to a [`SoundService`] by
//! string key, and every call may silently do nothing when audio is missing.
//! Two implementations live here: [`NullSound`] (no audio at all) and
//! [`SoundRecorder`] (tracks what would be playing, for tests and the headless
//! runner).

use std::collections::{HashMap, HashSet};

/// Whether a sound repeats until stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Looping {
    Once,
    Forever,
}

/// Opaque handle for a started sound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackHandle {
    pub channel: u8,
}

/// The external sound service
pub trait SoundService {
    /// Register (or re-register) a keyed effect. Idempotent.
    fn register(&mut self, key: &str, path: &str, channel: Option<u8>, volume: f32);

    /// Start a keyed effect. Without `restart`, an effect already playing is
    /// left alone and its handle returned. `None` means audio is unavailable.
    fn play(&mut self, key: &str, looping: Looping, volume: Option<f32>, restart: bool) -> Option<PlaybackHandle>;

    /// Fire-and-forget effect addressed by path
    fn play_oneshot(&mut self, path: &str, volume: Option<f32>) -> Option<PlaybackHandle>;

    fn stop(&mut self, key: &str);

    fn is_playing(&self, key: &str) -> bool;
}

/// Keyed effects used by the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundEffect {
    /// Looping water leak (one pipe at a time)
    WaterLeak,
    /// Small-form movement loop
    RobotMove,
    /// Large-form movement loop
    BigBotMove,
    /// Dock/undock clunk
    Dock,
    /// Weld spark start
    WeldStart,
    /// Weld loop while repairing
    WeldLoop,
}

impl SoundEffect {
    pub const ALL: [SoundEffect; 6] = [
        SoundEffect::WaterLeak,
        SoundEffect::RobotMove,
        SoundEffect::BigBotMove,
        SoundEffect::Dock,
        SoundEffect::WeldStart,
        SoundEffect::WeldLoop,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            SoundEffect::WaterLeak => "sonido_agua_fuga",
            SoundEffect::RobotMove => "movimiento_robot",
            SoundEffect::BigBotMove => "movimiento_granbot",
            SoundEffect::Dock => "extensor_bajar",
            SoundEffect::WeldStart => "soldadura_inicio",
            SoundEffect::WeldLoop => "soldadura_bucle",
        }
    }

    /// Path relative to the asset root
    pub fn path(&self) -> &'static str {
        match self {
            SoundEffect::WaterLeak => "sonido/efectos/agua1.wav",
            SoundEffect::RobotMove => "sonido/efectos/robot/robot_movimiento.wav",
            SoundEffect::BigBotMove => COMPANION_MOVE_PATH,
            SoundEffect::Dock => "sonido/efectos/robot/granbot_bajar.wav",
            SoundEffect::WeldStart => "sonido/efectos/soldar1.wav",
            SoundEffect::WeldLoop => "sonido/efectos/soldar2.wav",
        }
    }

    /// Reserved mixer channel, if any
    pub fn channel(&self) -> Option<u8> {
        match self {
            SoundEffect::RobotMove | SoundEffect::BigBotMove => Some(1),
            SoundEffect::WeldStart => Some(2),
            SoundEffect::WeldLoop => Some(3),
            _ => None,
        }
    }

    pub fn volume(&self) -> f32 {
        match self {
            SoundEffect::WaterLeak => 0.25,
            SoundEffect::RobotMove => 0.35,
            _ => 0.2,
        }
    }
}

/// Companion movement loop (each companion registers its own key)
pub const COMPANION_MOVE_PATH: &str = "sonido/efectos/robot/granbot_movimiento.wav";
pub const COMPANION_MOVE_VOLUME: f32 = 0.2;
/// Patch one-shots, one picked at random per repair
pub const PATCH_SOUNDS: [&str; 2] = ["sonido/efectos/parche1.ogg", "sonido/efectos/parche2.ogg"];
pub const PATCH_VOLUME: f32 = 0.5;
/// Level-complete one-shot
pub const CELEBRATION_SOUND: &str = "sonido/efectos/felicidades.mp3";

pub fn companion_move_key(serial: u32) -> String {
    format!("movimiento_extensor_{serial}")
}

/// Register every fixed effect with the service
pub fn register_effects(sound: &mut dyn SoundService) {
    for effect in SoundEffect::ALL {
        sound.register(effect.key(), effect.path(), effect.channel(), effect.volume());
    }
}

/// No audio device: every call is a no-op
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSound;

impl SoundService for NullSound {
    fn register(&mut self, _key: &str, _path: &str, _channel: Option<u8>, _volume: f32) {}

    fn play(&mut self, _key: &str, _looping: Looping, _volume: Option<f32>, _restart: bool) -> Option<PlaybackHandle> {
        None
    }

    fn play_oneshot(&mut self, _path: &str, _volume: Option<f32>) -> Option<PlaybackHandle> {
        None
    }

    fn stop(&mut self, _key: &str) {}

    fn is_playing(&self, _key: &str) -> bool {
        false
    }
}

/// Something the recorder observed
#[derive(Debug, Clone, PartialEq)]
pub enum SoundEvent {
    Play { key: String, looping: Looping, volume: f32 },
    OneShot { path: String, volume: f32 },
    Stop { key: String },
}

#[derive(Debug, Clone)]
struct Registration {
    channel: Option<u8>,
    volume: f32,
}

/// Mixer-free sound service that remembers what is playing.
///
/// Looping effects stay "playing" until stopped; one-shots finish instantly.
#[derive(Debug, Clone)]
pub struct SoundRecorder {
    effects_volume: f32,
    registered: HashMap<String, Registration>,
    playing: HashSet<String>,
    events: Vec<SoundEvent>,
}

impl Default for SoundRecorder {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl SoundRecorder {
    pub fn new(effects_volume: f32) -> Self {
        Self {
            effects_volume: effects_volume.clamp(0.0, 1.0),
            registered: HashMap::new(),
            playing: HashSet::new(),
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[SoundEvent] {
        &self.events
    }

    /// Drain recorded events
    pub fn take_events(&mut self) -> Vec<SoundEvent> {
        std::mem::take(&mut self.events)
    }

    /// Keys of every looping effect currently playing
    pub fn playing(&self) -> impl Iterator<Item = &str> {
        self.playing.iter().map(String::as_str)
    }

    pub fn is_registered(&self, key: &str) -> bool {
        self.registered.contains_key(key)
    }

    fn final_volume(&self, base: f32, requested: Option<f32>) -> f32 {
        let base = requested.map(|v| v.clamp(0.0, 1.0)).unwrap_or(base);
        (base * self.effects_volume).clamp(0.0, 1.0)
    }
}

impl SoundService for SoundRecorder {
    fn register(&mut self, key: &str, _path: &str, channel: Option<u8>, volume: f32) {
        self.registered.insert(
            key.to_string(),
            Registration {
                channel,
                volume: volume.clamp(0.0, 1.0),
            },
        );
    }

    fn play(&mut self, key: &str, looping: Looping, volume: Option<f32>, restart: bool) -> Option<PlaybackHandle> {
        let Some(registration) = self.registered.get(key) else {
            log::warn!("Sound '{key}' played before registration");
            return None;
        };
        let handle = PlaybackHandle {
            channel: registration.channel.unwrap_or(0),
        };
        if !restart && self.playing.contains(key) {
            return Some(handle);
        }
        let volume = self.final_volume(registration.volume, volume);
        match looping {
            Looping::Forever => {
                self.playing.insert(key.to_string());
            }
            Looping::Once => {
                self.playing.remove(key);
            }
        }
        self.events.push(SoundEvent::Play {
            key: key.to_string(),
            looping,
            volume,
        });
        Some(handle)
    }

    fn play_oneshot(&mut self, path: &str, volume: Option<f32>) -> Option<PlaybackHandle> {
        let volume = self.final_volume(1.0, volume);
        self.events.push(SoundEvent::OneShot {
            path: path.to_string(),
            volume,
        });
        Some(PlaybackHandle { channel: 0 })
    }

    fn stop(&mut self, key: &str) {
        if self.playing.remove(key) {
            self.events.push(SoundEvent::Stop { key: key.to_string() });
        }
    }

    fn is_playing(&self, key: &str) -> bool {
        self.playing.contains(key)
    }
}
