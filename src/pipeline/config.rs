//! Pipeline configuration and the settings file it is written back to

use crate::resampler::{ResamplerKind, SincConfig};
use crate::sync::speed::{
    DEFAULT_FAST_FORWARD_MULTIPLIERS, DEFAULT_FRAMESKIP_MIN_MULTIPLIER,
    DEFAULT_SLOW_MOTION_DIVISORS,
};
use crate::timing::DEFAULT_OUTPUT_RATE;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Options consumed by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Preferred resampling strategy
    pub resampler_strategy: ResamplerKind,
    /// Deliver (pitch-shifted) audio while fast-forwarding or in slow motion
    pub deliver_audio_during_non_normal_speed: bool,
    /// Fast-forward multipliers, cycled by the fast-forward combo
    pub fast_forward_multipliers: Vec<u32>,
    /// Slow-motion divisors, cycled by the slow-motion combo
    pub slow_motion_divisors: Vec<u32>,
    /// Requested output sample rate (Hz)
    pub output_rate_hint: f64,
    /// Sinc kernel parameters
    pub sinc: SincConfig,
    /// Multiplier from which intermediate fast-forward frames are not rendered
    pub frameskip_min_multiplier: u32,
    /// Largest output buffer capacity growth may reach, in frames; unbounded when `None`
    pub output_buffer_limit_frames: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            resampler_strategy: ResamplerKind::Sinc,
            deliver_audio_during_non_normal_speed: false,
            fast_forward_multipliers: DEFAULT_FAST_FORWARD_MULTIPLIERS.to_vec(),
            slow_motion_divisors: DEFAULT_SLOW_MOTION_DIVISORS.to_vec(),
            output_rate_hint: DEFAULT_OUTPUT_RATE,
            sinc: SincConfig::default(),
            frameskip_min_multiplier: DEFAULT_FRAMESKIP_MIN_MULTIPLIER,
            output_buffer_limit_frames: None,
        }
    }
}

impl PipelineConfig {
    /// Check the options for values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.output_rate_hint.is_finite() && self.output_rate_hint > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "output_rate_hint must be a positive rate, got {}",
                self.output_rate_hint
            )));
        }
        if self.fast_forward_multipliers.is_empty()
            || self.fast_forward_multipliers.contains(&0)
        {
            return Err(Error::InvalidConfig(
                "fast_forward_multipliers must be non-empty and non-zero".into(),
            ));
        }
        if self.slow_motion_divisors.is_empty() || self.slow_motion_divisors.contains(&0) {
            return Err(Error::InvalidConfig(
                "slow_motion_divisors must be non-empty and non-zero".into(),
            ));
        }
        Ok(())
    }

    /// True when switching from `self` to `other` needs a new resampler
    pub fn needs_rebuild(&self, other: &PipelineConfig) -> bool {
        self.resampler_strategy != other.resampler_strategy
            || self.output_rate_hint != other.output_rate_hint
            || self.sinc != other.sinc
    }

    /// Load a settings file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        let config: PipelineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a settings file, falling back to defaults when it does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the settings file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let cfg = PipelineConfig {
            output_rate_hint: 0.0,
            ..PipelineConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = PipelineConfig {
            fast_forward_multipliers: vec![],
            ..PipelineConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = PipelineConfig {
            slow_motion_divisors: vec![2, 0],
            ..PipelineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_needs_rebuild() {
        let a = PipelineConfig::default();
        let mut b = a.clone();
        b.deliver_audio_during_non_normal_speed = true;
        b.fast_forward_multipliers = vec![2];
        assert!(!a.needs_rebuild(&b));
        b.resampler_strategy = ResamplerKind::Decimation;
        assert!(a.needs_rebuild(&b));
        let mut c = a.clone();
        c.output_rate_hint = 48_000.0;
        assert!(a.needs_rebuild(&c));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: PipelineConfig =
            serde_json::from_str(r#"{ "resampler_strategy": "decimation" }"#).unwrap();
        assert_eq!(cfg.resampler_strategy, ResamplerKind::Decimation);
        assert_eq!(cfg.fast_forward_multipliers, vec![3, 5]);
        assert_eq!(cfg.sinc.taps, 32);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let cfg = PipelineConfig {
            resampler_strategy: ResamplerKind::Decimation,
            output_rate_hint: 44_100.0,
            ..PipelineConfig::default()
        };
        cfg.save(&path).unwrap();
        assert_eq!(PipelineConfig::load(&path).unwrap(), cfg);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PipelineConfig::load_or_default(dir.path().join("absent.json")).unwrap();
        assert_eq!(cfg, PipelineConfig::default());
    }
}
