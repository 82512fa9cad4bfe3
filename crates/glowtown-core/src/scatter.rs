//! Random placement of the instanced wind turbines

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Lightweight xorshift32 PRNG
pub struct ScatterRng {
    state: u32,
}

impl ScatterRng {
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Integer in [0, modulus)
    pub fn below(&mut self, modulus: u32) -> u32 {
        self.next_u32() % modulus.max(1)
    }
}

/// Upper bound on scattered instances, kept in step with the instance buffer
pub const MAX_TURBINES: u32 = 1000;

/// How many instances to scatter and from which seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceScatter {
    pub count: u32,
    pub seed: u32,
}

impl Default for InstanceScatter {
    fn default() -> Self {
        Self {
            count: 50,
            seed: 0x5eed_2024,
        }
    }
}

impl InstanceScatter {
    /// Clamp `count` to [`MAX_TURBINES`].
    pub fn sanitize(&mut self) {
        if self.count > MAX_TURBINES {
            log::warn!(
                "turbine count {} exceeds {}, clamping",
                self.count,
                MAX_TURBINES
            );
            self.count = MAX_TURBINES;
        }
    }

    /// Model matrices spread over a 100 x 10 x 100 block above the city, each
    /// with a uniform scale in [0, 0.33).
    pub fn model_matrices(&self) -> Vec<Mat4> {
        let mut rng = ScatterRng::new(self.seed);
        (0..self.count.min(MAX_TURBINES))
            .map(|_| {
                let x = rng.below(100) as f32 - 50.0;
                let y = 15.0 + rng.below(10) as f32;
                let z = 3.0 + rng.below(100) as f32;
                let scale = rng.below(100) as f32 / 300.0;
                Mat4::from_translation(Vec3::new(x, y, z)) * Mat4::from_scale(Vec3::splat(scale))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scatter_is_deterministic_per_seed() {
        let scatter = InstanceScatter::default();
        assert_eq!(scatter.model_matrices(), scatter.model_matrices());

        let other = InstanceScatter {
            seed: 7,
            ..scatter
        };
        assert_ne!(scatter.model_matrices(), other.model_matrices());
    }

    #[test]
    fn instances_stay_in_bounds() {
        let matrices = InstanceScatter::default().model_matrices();
        assert_eq!(matrices.len(), 50);
        for m in matrices {
            let t = m.w_axis.truncate();
            assert!((-50.0..50.0).contains(&t.x));
            assert!((15.0..25.0).contains(&t.y));
            assert!((3.0..103.0).contains(&t.z));
            let scale = m.x_axis.x;
            assert!((0.0..0.34).contains(&scale));
            assert_eq!(m.y_axis.y, scale);
        }
    }

    #[test]
    fn oversized_count_is_clamped() {
        let mut scatter = InstanceScatter {
            count: u32::MAX,
            seed: 1,
        };
        assert_eq!(scatter.model_matrices().len(), MAX_TURBINES as usize);

        scatter.sanitize();
        assert_eq!(scatter.count, MAX_TURBINES);
    }

    #[test]
    fn zero_seed_is_not_stuck() {
        let mut rng = ScatterRng::new(0);
        let a = rng.next_u32();
        let b = rng.next_u32();
        assert_ne!(a, 0);
        assert_ne!(a, b);
    }
}
