//! Post-processing settings consumed by the blur and composite passes

use crate::error::{GlowError, Result};
use serde::{Deserialize, Serialize};

/// Default number of separable blur iterations.
pub const DEFAULT_BLUR_ITERATIONS: u32 = 10;

/// Upper bound accepted for blur iterations.
pub const MAX_BLUR_ITERATIONS: u32 = 64;

/// Full-screen effect applied by the composite pass. Mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectSelector {
    /// Regular tone-mapped output
    #[default]
    None,
    /// Show the blurred bright-pass texture verbatim
    Blur,
    /// Multiply the composite by a violet tint
    Tint,
}

impl EffectSelector {
    pub const ALL: [EffectSelector; 3] = [Self::None, Self::Blur, Self::Tint];

    /// Cycle to the next effect
    pub fn next(self) -> Self {
        match self {
            Self::None => Self::Blur,
            Self::Blur => Self::Tint,
            Self::Tint => Self::None,
        }
    }

    /// Value written into the composite uniform `effect` field
    pub fn as_u32(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Blur => 1,
            Self::Tint => 2,
        }
    }

    /// Human-readable label for display
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Blur => "Blur preview",
            Self::Tint => "Violet tint",
        }
    }
}

/// Polygon rasterization mode for the scene pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
}

impl PolygonMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Fill => Self::Line,
            Self::Line => Self::Fill,
        }
    }
}

/// Runtime-adjustable post-processing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessSettings {
    pub hdr_enabled: bool,
    /// Exposure for the `1 - exp(-x * exposure)` operator, must be > 0
    pub exposure: f32,
    /// Display gamma, must be > 0
    pub gamma: f32,
    pub bloom_enabled: bool,
    /// Luminance above which the scene shader writes a fragment to the bright attachment
    pub bloom_threshold: f32,
    /// Number of single-axis blur passes, at least 1
    pub blur_iterations: u32,
    pub effect: EffectSelector,
    pub polygon_mode: PolygonMode,
}

impl Default for PostProcessSettings {
    fn default() -> Self {
        Self {
            hdr_enabled: true,
            exposure: 1.0,
            gamma: 2.2,
            bloom_enabled: true,
            bloom_threshold: 1.0,
            blur_iterations: DEFAULT_BLUR_ITERATIONS,
            effect: EffectSelector::None,
            polygon_mode: PolygonMode::Fill,
        }
    }
}

impl PostProcessSettings {
    /// Check every numeric field against its allowed range.
    pub fn validate(&self) -> Result<()> {
        if !(self.exposure > 0.0) {
            return Err(out_of_range("exposure", 0.0, f64::MAX, self.exposure as f64));
        }
        if !(self.gamma > 0.0) {
            return Err(out_of_range("gamma", 0.0, f64::MAX, self.gamma as f64));
        }
        if self.bloom_threshold.is_nan() || self.bloom_threshold < 0.0 {
            return Err(out_of_range(
                "bloom_threshold",
                0.0,
                f64::MAX,
                self.bloom_threshold as f64,
            ));
        }
        if self.blur_iterations == 0 || self.blur_iterations > MAX_BLUR_ITERATIONS {
            return Err(out_of_range(
                "blur_iterations",
                1.0,
                MAX_BLUR_ITERATIONS as f64,
                self.blur_iterations as f64,
            ));
        }
        Ok(())
    }

    /// Clamp out-of-range values back into their valid range, logging each fix.
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if !(self.exposure > 0.0) {
            log::warn!("exposure {} is not positive, using {}", self.exposure, defaults.exposure);
            self.exposure = defaults.exposure;
        }
        if !(self.gamma > 0.0) {
            log::warn!("gamma {} is not positive, using {}", self.gamma, defaults.gamma);
            self.gamma = defaults.gamma;
        }
        if self.bloom_threshold.is_nan() || self.bloom_threshold < 0.0 {
            log::warn!(
                "bloom_threshold {} is not a non-negative number, using {}",
                self.bloom_threshold,
                defaults.bloom_threshold
            );
            self.bloom_threshold = defaults.bloom_threshold;
        }
        let clamped = self.blur_iterations.clamp(1, MAX_BLUR_ITERATIONS);
        if clamped != self.blur_iterations {
            log::warn!(
                "blur_iterations {} out of range, clamped to {}",
                self.blur_iterations,
                clamped
            );
            self.blur_iterations = clamped;
        }
    }

    /// Adjust exposure multiplicatively, keeping it positive.
    pub fn scale_exposure(&mut self, factor: f32) {
        self.exposure = (self.exposure * factor).clamp(0.01, 100.0);
    }
}

fn out_of_range(field: &str, min: f64, max: f64, value: f64) -> GlowError {
    GlowError::ValueOutOfRange {
        field: field.to_string(),
        min,
        max,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = PostProcessSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.blur_iterations, 10);
        assert_eq!(settings.effect, EffectSelector::None);
    }

    #[test]
    fn zero_iterations_rejected() {
        let settings = PostProcessSettings {
            blur_iterations: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(GlowError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn non_positive_exposure_and_gamma_rejected() {
        let settings = PostProcessSettings {
            exposure: 0.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = PostProcessSettings {
            gamma: -1.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = PostProcessSettings {
            gamma: f32::NAN,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn sanitize_restores_valid_values() {
        let mut settings = PostProcessSettings {
            exposure: -3.0,
            gamma: 0.0,
            bloom_threshold: -1.0,
            blur_iterations: 0,
            ..Default::default()
        };
        settings.sanitize();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.blur_iterations, 1);
        assert_eq!(settings.exposure, 1.0);
    }

    #[test]
    fn nan_bloom_threshold_is_rejected_and_replaced() {
        let mut settings = PostProcessSettings {
            bloom_threshold: f32::NAN,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        settings.sanitize();
        assert_eq!(settings.bloom_threshold, 1.0);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn effect_cycle_and_codes() {
        assert_eq!(EffectSelector::None.next(), EffectSelector::Blur);
        assert_eq!(EffectSelector::Tint.next(), EffectSelector::None);
        let codes: Vec<u32> = EffectSelector::ALL.iter().map(|e| e.as_u32()).collect();
        assert_eq!(codes, vec![0, 1, 2]);
    }

    #[test]
    fn exposure_scaling_stays_positive() {
        let mut settings = PostProcessSettings::default();
        for _ in 0..100 {
            settings.scale_exposure(0.5);
        }
        assert!(settings.exposure > 0.0);
    }
}
