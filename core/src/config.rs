//! Engine configuration (`config.toml`)
//!
//! Settings are stored in TOML format in the platform-specific config
//! directory. Every field has a default, so partial files are valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::compute::renderers::{EdgeDetectionRenderer, FxaaSettings, MAX_EDGE_DISTANCE};
use crate::error::ConfigError;
use crate::mesh::SkeletonMesh;
use crate::skeleton::BonesPerVertex;

/// File name of the configuration inside [`EngineConfig::config_dir`].
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Skeleton and animation settings
    #[serde(default)]
    pub skinning: SkinningConfig,
    /// Compute post-processing settings
    #[serde(default)]
    pub post_process: PostProcessConfig,
}

/// Skeleton mesh and animation playback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinningConfig {
    /// Bone slots per vertex (default: 4, one of 0/1/2/4)
    #[serde(default)]
    pub bones_per_vertex: BonesPerVertex,
    /// Reject duplicate bone names (default: on in debug builds)
    #[serde(default = "default_validate_bone_names")]
    pub validate_bone_names: bool,
    /// Normalized animation progress per second (default: 1.0)
    #[serde(default = "default_animation_speed")]
    pub animation_speed: f32,
}

/// Compute post-processing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostProcessConfig {
    /// Edge-distance flood-fill passes (default: 255, range: 1-255)
    #[serde(default = "default_edge_distance_passes")]
    pub edge_distance_passes: u32,
    /// FXAA sub-pixel quality (default: 0.75)
    #[serde(default = "default_fxaa_quality_subpix")]
    pub fxaa_quality_subpix: f32,
    /// FXAA edge threshold (default: 0.166)
    #[serde(default = "default_fxaa_edge_threshold")]
    pub fxaa_edge_threshold: f32,
    /// FXAA dark-area threshold (default: 0.0833)
    #[serde(default = "default_fxaa_edge_threshold_min")]
    pub fxaa_edge_threshold_min: f32,
}

fn default_validate_bone_names() -> bool {
    cfg!(debug_assertions)
}
fn default_animation_speed() -> f32 {
    1.0
}
fn default_edge_distance_passes() -> u32 {
    MAX_EDGE_DISTANCE
}
fn default_fxaa_quality_subpix() -> f32 {
    FxaaSettings::default().quality_subpix
}
fn default_fxaa_edge_threshold() -> f32 {
    FxaaSettings::default().edge_threshold
}
fn default_fxaa_edge_threshold_min() -> f32 {
    FxaaSettings::default().edge_threshold_min
}

impl Default for SkinningConfig {
    fn default() -> Self {
        Self {
            bones_per_vertex: BonesPerVertex::default(),
            validate_bone_names: default_validate_bone_names(),
            animation_speed: default_animation_speed(),
        }
    }
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            edge_distance_passes: default_edge_distance_passes(),
            fxaa_quality_subpix: default_fxaa_quality_subpix(),
            fxaa_edge_threshold: default_fxaa_edge_threshold(),
            fxaa_edge_threshold_min: default_fxaa_edge_threshold_min(),
        }
    }
}

impl SkinningConfig {
    /// Empty skeleton mesh using these settings.
    pub fn new_mesh(&self) -> SkeletonMesh {
        SkeletonMesh::new(self.bones_per_vertex, self.validate_bone_names)
    }
}

impl PostProcessConfig {
    pub fn fxaa(&self) -> FxaaSettings {
        FxaaSettings {
            quality_subpix: self.fxaa_quality_subpix,
            edge_threshold: self.fxaa_edge_threshold,
            edge_threshold_min: self.fxaa_edge_threshold_min,
        }
    }

    /// Edge detection renderer configured with these settings.
    pub fn edge_detection_renderer(&self) -> EdgeDetectionRenderer {
        EdgeDetectionRenderer::new().with_passes(self.edge_distance_passes)
    }
}

impl EngineConfig {
    /// Returns the platform-specific configuration directory.
    ///
    /// On Windows: `%APPDATA%\Tessera\config`
    /// On macOS: `~/Library/Application Support/io.tessera.Tessera`
    /// On Linux: `~/.config/Tessera`
    ///
    /// Returns `None` if the home directory cannot be determined.
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("io.tessera", "", "Tessera")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// `config.toml` inside [`config_dir`](Self::config_dir).
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
    }

    /// Load and sanitize the configuration at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config.sanitized())
    }

    /// Load from the default location, falling back to defaults when the file
    /// is missing or unreadable.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            warn!(path = %path.display(), "ignoring unreadable config: {e}");
            Self::default()
        })
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Defaults overlaid with `TESSERA_BONES_PER_VERTEX` and
    /// `TESSERA_EDGE_DISTANCE_PASSES`.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Overlay environment overrides on this configuration.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        fn parse_u32(var: &str) -> Option<u32> {
            std::env::var(var).ok()?.parse::<u32>().ok()
        }

        let mut config = self;

        if let Some(v) = parse_u32("TESSERA_BONES_PER_VERTEX") {
            match u8::try_from(v).ok().and_then(|v| BonesPerVertex::try_from(v).ok()) {
                Some(bones) => config.skinning.bones_per_vertex = bones,
                None => warn!(value = v, "ignoring invalid TESSERA_BONES_PER_VERTEX"),
            }
        }
        if let Some(v) = parse_u32("TESSERA_EDGE_DISTANCE_PASSES") {
            config.post_process.edge_distance_passes = v;
        }

        config.sanitized()
    }

    /// Clamp/repair settings into a valid state.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let mut out = self;

        let passes = out.post_process.edge_distance_passes;
        if !(1..=MAX_EDGE_DISTANCE).contains(&passes) {
            out.post_process.edge_distance_passes = passes.clamp(1, MAX_EDGE_DISTANCE);
            warn!(
                passes,
                clamped = out.post_process.edge_distance_passes,
                "edge_distance_passes out of range"
            );
        }

        let speed = out.skinning.animation_speed;
        if !speed.is_finite() {
            out.skinning.animation_speed = default_animation_speed();
            warn!(speed, "animation_speed is not finite, using default");
        }

        let defaults = FxaaSettings::default();
        let fxaa = &mut out.post_process;
        for (value, default, name) in [
            (&mut fxaa.fxaa_quality_subpix, defaults.quality_subpix, "fxaa_quality_subpix"),
            (&mut fxaa.fxaa_edge_threshold, defaults.edge_threshold, "fxaa_edge_threshold"),
            (
                &mut fxaa.fxaa_edge_threshold_min,
                defaults.edge_threshold_min,
                "fxaa_edge_threshold_min",
            ),
        ] {
            if !(0.0..=1.0).contains(&*value) {
                warn!(value = *value, "{name} outside 0..=1, using default");
                *value = default;
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    // =============================================================
    // Default value tests
    // =============================================================

    #[test]
    fn test_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.skinning.bones_per_vertex, BonesPerVertex::Four);
        assert_eq!(config.skinning.validate_bone_names, cfg!(debug_assertions));
        assert!((config.skinning.animation_speed - 1.0).abs() < f32::EPSILON);
        assert_eq!(config.post_process.edge_distance_passes, 255);
        assert_eq!(config.post_process.fxaa(), FxaaSettings::default());
    }

    // =============================================================
    // TOML serialization tests
    // =============================================================

    #[test]
    fn test_config_serialize_roundtrip() {
        let config = EngineConfig {
            skinning: SkinningConfig {
                bones_per_vertex: BonesPerVertex::Two,
                validate_bone_names: true,
                animation_speed: 0.5,
            },
            post_process: PostProcessConfig {
                edge_distance_passes: 32,
                ..Default::default()
            },
        };

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_deserialize_empty() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_config_deserialize_partial_skinning() {
        let toml_str = r#"
[skinning]
bones_per_vertex = 1
"#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.skinning.bones_per_vertex, BonesPerVertex::One);
        assert!((config.skinning.animation_speed - 1.0).abs() < f32::EPSILON); // default
        assert_eq!(config.post_process, PostProcessConfig::default());
    }

    #[test]
    fn test_config_rejects_bad_bones_per_vertex() {
        let toml_str = r#"
[skinning]
bones_per_vertex = 3
"#;
        assert!(toml::from_str::<EngineConfig>(toml_str).is_err());
    }

    // =============================================================
    // Sanitizing and files
    // =============================================================

    #[test]
    fn test_sanitized_clamps_values() {
        let mut config = EngineConfig::default();
        config.post_process.edge_distance_passes = 1000;
        config.post_process.fxaa_edge_threshold = 4.0;
        config.skinning.animation_speed = f32::NAN;

        let config = config.sanitized();
        assert_eq!(config.post_process.edge_distance_passes, 255);
        assert_eq!(config.post_process.fxaa_edge_threshold, 0.166);
        assert_eq!(config.skinning.animation_speed, 1.0);

        let mut config = EngineConfig::default();
        config.post_process.edge_distance_passes = 0;
        assert_eq!(config.sanitized().post_process.edge_distance_passes, 1);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let mut config = EngineConfig::default();
        config.post_process.edge_distance_passes = 12;

        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_sanitizes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[post_process]\nedge_distance_passes = 999\n").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.post_process.edge_distance_passes, 255);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            EngineConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));

        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[skinning\n").unwrap();
        assert!(matches!(EngineConfig::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_settings_flow_into_components() {
        let mut config = EngineConfig::default();
        config.skinning.bones_per_vertex = BonesPerVertex::One;
        config.post_process.edge_distance_passes = 7;

        assert_eq!(config.skinning.new_mesh().bones_per_vertex(), BonesPerVertex::One);
        assert_eq!(config.post_process.edge_detection_renderer().passes(), 7);
    }
}
