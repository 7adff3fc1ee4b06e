use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{MuteState, Result, TierCounts, TierMap};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub voices: VoiceConfig,
}

impl AppConfig {
    /// Reads a JSON config file. Missing fields fall back to defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_json(&raw)?;
        tracing::debug!(?path, "loaded config");
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Initial state and timing of the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tempo_bpm: f64,
    pub counts: TierCounts,
    pub muted: MuteState,
    pub lookahead_seconds: f64,
    pub tick_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tempo_bpm: 90.0,
            counts: TierCounts::default(),
            muted: MuteState::default(),
            lookahead_seconds: 0.2,
            tick_interval_ms: 25,
        }
    }
}

/// Per-tier output gains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub gains: TierMap<f32>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            gains: TierMap([1.0, 0.8, 0.65, 0.5]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TierId;

    #[test]
    fn partial_json_keeps_defaults() {
        let raw = r#"{
            "engine": { "tempo_bpm": 72, "counts": { "div1": 5, "div2": 3, "div3": 2 } }
        }"#;
        let config = AppConfig::from_json(raw).unwrap();

        assert_eq!(config.engine.tempo_bpm, 72.0);
        assert_eq!(config.engine.counts, TierCounts::new(5, 3, 2));
        assert_eq!(config.engine.tick_interval_ms, 25);
        assert_eq!(config.voices, VoiceConfig::default());
    }

    #[test]
    fn partial_counts_fill_from_defaults() {
        let config = AppConfig::from_json(r#"{ "engine": { "counts": { "div1": 5 } } }"#).unwrap();
        let defaults = TierCounts::default();

        assert_eq!(config.engine.counts.div1, 5);
        assert_eq!(config.engine.counts.div2, defaults.div2);
        assert_eq!(config.engine.counts.div3, defaults.div3);
    }

    #[test]
    fn mute_flags_parse_as_tier_array() {
        let raw = r#"{ "engine": { "muted": [false, true, false, true] } }"#;
        let config = AppConfig::from_json(raw).unwrap();
        assert!(config.engine.muted[TierId::Div1]);
        assert!(!config.engine.muted[TierId::Div2]);
    }

    #[test]
    fn serialised_config_reloads() {
        let config = AppConfig::default();
        let json = config.to_json_pretty().unwrap();
        assert_eq!(AppConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = AppConfig::from_json("{ nope").unwrap_err();
        assert!(format!("{err}").starts_with("config:"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = AppConfig::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, crate::RhythmError::Io(_)));
    }
}
