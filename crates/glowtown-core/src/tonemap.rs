//! CPU reference for the scene brightness test and the composite pass
//!
//! These functions mirror `scene.wgsl` (`scene_output`) and `composite.wgsl`
//! (`fs_composite`) line for line, so the composite policy can be checked
//! without a GPU. The shader code has to be kept in step by hand. Only the
//! shared constants are compared against the WGSL, in glowtown-render's tests.

use crate::settings::{EffectSelector, PostProcessSettings};
use glam::Vec3;

/// Rec. 709 luma weights used by the bright-pass test.
pub const LUMINANCE_WEIGHTS: Vec3 = Vec3::new(0.2126, 0.7152, 0.0722);

/// Colour multiplied over the composite when [`EffectSelector::Tint`] is active.
pub const VIOLET_TINT: Vec3 = Vec3::new(0.6, 0.2, 0.8);

fn map3(v: Vec3, f: impl Fn(f32) -> f32) -> Vec3 {
    Vec3::new(f(v.x), f(v.y), f(v.z))
}

/// Relative luminance of a linear colour.
pub fn luminance(color: Vec3) -> f32 {
    color.dot(LUMINANCE_WEIGHTS)
}

/// Colour written to the bright attachment: the input if its luminance exceeds
/// `threshold`, black otherwise.
pub fn bright_pass(color: Vec3, threshold: f32) -> Vec3 {
    if luminance(color) > threshold {
        color
    } else {
        Vec3::ZERO
    }
}

/// Exposure operator `1 - exp(-x * exposure)`.
pub fn exposure_tone_map(radiance: Vec3, exposure: f32) -> Vec3 {
    map3(radiance, |x| 1.0 - (-x * exposure).exp())
}

/// LDR path used when HDR is disabled.
pub fn clamp_ldr(radiance: Vec3) -> Vec3 {
    radiance.clamp(Vec3::ZERO, Vec3::ONE)
}

/// `pow(x, 1 / gamma)`. Negative inputs are treated as zero.
pub fn gamma_correct(color: Vec3, gamma: f32) -> Vec3 {
    map3(color, |x| x.max(0.0).powf(1.0 / gamma))
}

/// Tone-mapped colour before gamma correction.
pub fn tone_map(radiance: Vec3, settings: &PostProcessSettings) -> Vec3 {
    if settings.hdr_enabled {
        exposure_tone_map(radiance, settings.exposure)
    } else {
        clamp_ldr(radiance)
    }
}

/// Final displayed colour for one texel.
///
/// `radiance` is the scene's attachment 0 sample, `blurred` the final
/// ping-pong buffer sample.
pub fn composite(radiance: Vec3, blurred: Vec3, settings: &PostProcessSettings) -> Vec3 {
    if settings.effect == EffectSelector::Blur {
        return blurred;
    }

    let mut hdr = radiance;
    if settings.bloom_enabled {
        hdr += blurred;
    }

    let mapped = gamma_correct(tone_map(hdr, settings), settings.gamma);

    match settings.effect {
        EffectSelector::Tint => mapped * VIOLET_TINT,
        _ => mapped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn hdr_settings() -> PostProcessSettings {
        PostProcessSettings {
            hdr_enabled: true,
            exposure: 1.0,
            gamma: 2.2,
            bloom_enabled: false,
            effect: EffectSelector::None,
            ..Default::default()
        }
    }

    #[test]
    fn unit_radiance_with_default_exposure() {
        let out = composite(Vec3::ONE, Vec3::ZERO, &hdr_settings());
        let expected = (1.0 - (-1.0f32).exp()).powf(1.0 / 2.2);
        assert!((expected - 0.715).abs() < 1e-3);
        for c in out.to_array() {
            assert!((c - expected).abs() < EPS, "{c} != {expected}");
        }
    }

    #[test]
    fn ldr_path_clamps_before_gamma() {
        let mapped = tone_map(
            Vec3::new(2.0, 0.5, -0.1),
            &PostProcessSettings {
                hdr_enabled: false,
                ..Default::default()
            },
        );
        assert_eq!(mapped, Vec3::new(1.0, 0.5, 0.0));
    }

    #[test]
    fn tone_map_is_monotonic() {
        let settings = hdr_settings();
        for exposure in [0.1f32, 0.5, 1.0, 2.0, 8.0] {
            let settings = PostProcessSettings {
                exposure,
                ..settings.clone()
            };
            let mut last = -1.0f32;
            for i in 0..2000 {
                let x = i as f32 * 0.01;
                let out = luminance(composite(Vec3::splat(x), Vec3::ZERO, &settings));
                assert!(out >= last, "exposure {exposure}: {out} < {last} at x = {x}");
                last = out;
            }
        }
    }

    #[test]
    fn gamma_round_trip() {
        for gamma in [1.0f32, 1.8, 2.2, 2.4] {
            for i in 0..=100 {
                let v = Vec3::splat(i as f32 / 100.0);
                let back = gamma_correct(gamma_correct(v, gamma), 1.0 / gamma);
                assert!((back - v).abs().max_element() < EPS);
            }
        }
    }

    #[test]
    fn disabled_bloom_ignores_blur_input() {
        let radiance = Vec3::new(0.3, 1.7, 4.0);
        let settings = hdr_settings();
        let with_blur = composite(radiance, Vec3::new(9.0, 9.0, 9.0), &settings);
        let without = gamma_correct(tone_map(radiance, &settings), settings.gamma);
        assert!((with_blur - without).abs().max_element() < EPS);
    }

    #[test]
    fn bloom_adds_before_tone_mapping() {
        let settings = PostProcessSettings {
            bloom_enabled: true,
            ..hdr_settings()
        };
        let out = composite(Vec3::splat(0.5), Vec3::splat(0.5), &settings);
        let expected = composite(Vec3::ONE, Vec3::ZERO, &hdr_settings());
        assert!((out - expected).abs().max_element() < EPS);
    }

    #[test]
    fn blur_preview_is_verbatim() {
        let blurred = Vec3::new(3.5, -0.25, 0.125);
        for hdr_enabled in [false, true] {
            for bloom_enabled in [false, true] {
                let settings = PostProcessSettings {
                    hdr_enabled,
                    bloom_enabled,
                    exposure: 7.0,
                    gamma: 0.3,
                    effect: EffectSelector::Blur,
                    ..Default::default()
                };
                assert_eq!(composite(Vec3::splat(100.0), blurred, &settings), blurred);
            }
        }
    }

    #[test]
    fn tint_multiplies_after_gamma() {
        let settings = PostProcessSettings {
            effect: EffectSelector::Tint,
            ..hdr_settings()
        };
        let plain = composite(Vec3::ONE, Vec3::ZERO, &hdr_settings());
        let tinted = composite(Vec3::ONE, Vec3::ZERO, &settings);
        assert!((tinted - plain * VIOLET_TINT).abs().max_element() < EPS);
    }

    #[test]
    fn bright_pass_thresholds_on_luminance() {
        assert_eq!(bright_pass(Vec3::splat(0.9), 1.0), Vec3::ZERO);
        let hot = Vec3::new(0.5, 2.0, 0.5);
        assert_eq!(bright_pass(hot, 1.0), hot);
        // Pure blue has low luma even when large
        assert_eq!(bright_pass(Vec3::new(0.0, 0.0, 10.0), 1.0), Vec3::ZERO);
    }
}
