//! Game settings and scene table
//!
//! Stored as JSON. Missing fields take their defaults, so a partial file is
//! fine; an unreadable one falls back to [`Settings::default`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{MAX_FRAME_DT, TARGET_FPS};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot access settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rules a scene plays by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SceneKind {
    #[default]
    Standard,
    /// Forced damage on red tiles, goal tile, falling pipes, confirm to finish
    Tutorial,
}

impl SceneKind {
    /// Tutorial maps are recognised by file name
    pub fn infer(map_path: &str) -> Self {
        let name = Path::new(map_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.contains("tutorial") || name.contains("mapeadot") {
            SceneKind::Tutorial
        } else {
            SceneKind::Standard
        }
    }

    pub fn is_tutorial(self) -> bool {
        self == SceneKind::Tutorial
    }

    /// Every damageable tile starts damaged
    pub fn forces_damage(self) -> bool {
        self.is_tutorial()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Level bitmap, relative to the asset root
    pub map: String,
    /// Damaged pipes guaranteed after generation
    #[serde(default)]
    pub min_damaged: usize,
    /// Inferred from the map name when absent
    #[serde(default)]
    pub kind: Option<SceneKind>,
}

impl SceneConfig {
    pub fn new(map: &str, min_damaged: usize) -> Self {
        Self {
            map: map.to_string(),
            min_damaged,
            kind: None,
        }
    }

    pub fn kind(&self) -> SceneKind {
        self.kind.unwrap_or_else(|| SceneKind::infer(&self.map))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// World pixels per bitmap pixel
    pub tile_size: u32,
    pub fps_cap: u32,
    /// Longest frame the simulation will integrate (seconds)
    pub max_frame_dt: f32,
    /// Chance a red tile starts damaged
    pub damage_probability: f64,
    /// Effects volume (0.0 - 1.0)
    pub effects_volume: f32,
    pub asset_root: PathBuf,
    /// Cap on live leak droplets
    pub max_particles: usize,
    /// RNG seed; a fixed default when absent
    pub seed: Option<u64>,
    pub scenes: BTreeMap<String, SceneConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        let mut scenes = BTreeMap::new();
        scenes.insert("1".to_string(), SceneConfig::new("texturas/mapeado/mapeado1.png", 3));
        scenes.insert("2".to_string(), SceneConfig::new("texturas/mapeado/mapeado2.png", 0));
        scenes.insert("3".to_string(), SceneConfig::new("texturas/mapeado/mapeado3.png", 0));
        scenes.insert(
            "tutorial".to_string(),
            SceneConfig {
                kind: Some(SceneKind::Tutorial),
                ..SceneConfig::new("texturas/mapeado/mapeadot.png", 0)
            },
        );
        Self {
            viewport_width: 700,
            viewport_height: 700,
            tile_size: 100,
            fps_cap: TARGET_FPS,
            max_frame_dt: MAX_FRAME_DT,
            damage_probability: 0.1,
            effects_volume: 0.6,
            asset_root: PathBuf::from("recursos"),
            max_particles: 2048,
            seed: None,
            scenes,
        }
    }
}

impl Settings {
    const DEFAULT_SEED: u64 = 0x5EED_0F_B07;

    pub fn from_path(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load from `path`, or defaults when there is no file or it is unusable
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            log::info!("Using default settings");
            return Self::default();
        };
        match Self::from_path(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Settings {} unusable ({e}), using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Load from `path`; a missing file is created with the defaults
    pub fn load_or_create(path: &Path) -> Self {
        if path.exists() {
            return Self::load(Some(path));
        }
        let settings = Self::default();
        if let Err(e) = settings.save(path) {
            log::warn!("Could not write default settings to {}: {e}", path.display());
        }
        settings
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    pub fn scene(&self, label: &str) -> Option<&SceneConfig> {
        self.scenes.get(label)
    }

    pub fn map_path(&self, scene: &SceneConfig) -> PathBuf {
        self.asset_root.join(&scene.map)
    }

    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or(Self::DEFAULT_SEED)
    }

    /// Frame time the simulation should integrate for a measured frame
    pub fn frame_dt(&self, measured: f32) -> f32 {
        measured.clamp(0.0, self.max_frame_dt)
    }

    /// Target duration of one frame at the cap
    pub fn frame_budget(&self) -> f32 {
        1.0 / self.fps_cap.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!((s.viewport_width, s.viewport_height), (700, 700));
        assert_eq!(s.tile_size, 100);
        assert_eq!(s.scene("1").unwrap().min_damaged, 3);
        assert_eq!(s.scene("2").unwrap().min_damaged, 0);
        assert_eq!(s.scene("tutorial").unwrap().kind(), SceneKind::Tutorial);
        assert_eq!(s.scene("3").unwrap().kind(), SceneKind::Standard);
        assert_eq!(s.map_path(s.scene("1").unwrap()), PathBuf::from("recursos/texturas/mapeado/mapeado1.png"));
    }

    #[test]
    fn test_kind_inferred_from_map_name() {
        assert_eq!(SceneKind::infer("maps/MapeadoT.png"), SceneKind::Tutorial);
        assert_eq!(SceneKind::infer("tutorial_2.png"), SceneKind::Tutorial);
        assert_eq!(SceneKind::infer("tutorial/mapeado1.png"), SceneKind::Standard);
        assert!(SceneConfig::new("x/mapeadot.png", 0).kind().forces_damage());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let s: Settings = serde_json::from_str(r#"{"tile_size": 64, "seed": 7}"#).unwrap();
        assert_eq!(s.tile_size, 64);
        assert_eq!(s.seed(), 7);
        assert_eq!(s.viewport_width, 700);
        assert_eq!(s.scenes.len(), 4);
    }

    #[test]
    fn test_frame_dt_is_capped() {
        let s = Settings::default();
        assert_eq!(s.frame_dt(0.2), MAX_FRAME_DT);
        assert_eq!(s.frame_dt(0.01), 0.01);
        assert!((s.frame_budget() - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_bad_file_falls_back() {
        let path = std::env::temp_dir().join(format!("hydrobot-settings-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::from_path(&path), Err(SettingsError::Json(_))));
        assert_eq!(Settings::load(Some(path.as_path())), Settings::default());

        let custom = Settings {
            seed: Some(3),
            ..Settings::default()
        };
        custom.save(&path).unwrap();
        assert_eq!(Settings::load(Some(path.as_path())), custom);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let path = std::env::temp_dir().join(format!("hydrobot-new-settings-{}.json", std::process::id()));
        std::fs::remove_file(&path).ok();
        assert_eq!(Settings::load_or_create(&path), Settings::default());
        assert_eq!(Settings::from_path(&path).unwrap(), Settings::default());

        let custom = Settings {
            tile_size: 50,
            ..Settings::default()
        };
        custom.save(&path).unwrap();
        assert_eq!(Settings::load_or_create(&path), custom);
        std::fs::remove_file(&path).ok();
    }
}
