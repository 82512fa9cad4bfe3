//! Ping-pong schedule for the separable bloom blur
//!
//! Iteration 0 reads the scene's bright attachment and writes ping-pong
//! buffer A with a horizontal pass. Every later iteration reads the previous
//! destination, writes the other buffer and flips the axis. After `N`
//! iterations the blurred image lives in [`BlurSchedule::final_slot`].

use crate::error::{GlowError, Result};

/// One-sided Gaussian kernel, centre tap first. Both sides together sum to 1.
pub const GAUSSIAN_WEIGHTS: [f32; 5] = [0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216];

/// Blur direction of a single pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurAxis {
    Horizontal,
    Vertical,
}

impl BlurAxis {
    /// Unit texel step along this axis, in texels
    pub fn direction(self) -> [f32; 2] {
        match self {
            Self::Horizontal => [1.0, 0.0],
            Self::Vertical => [0.0, 1.0],
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }
}

/// Member of the ping-pong pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PingPongSlot {
    A,
    B,
}

impl PingPongSlot {
    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }

    pub fn from_parity(i: u32) -> Self {
        if i % 2 == 0 {
            Self::A
        } else {
            Self::B
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// Texture a blur pass samples from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurSource {
    /// Attachment 1 of the scene target
    Bright,
    PingPong(PingPongSlot),
}

/// A single blur draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurStep {
    pub iteration: u32,
    pub source: BlurSource,
    pub destination: PingPongSlot,
    pub axis: BlurAxis,
}

impl BlurStep {
    /// True if the step would sample the texture it renders into.
    pub fn aliases(&self) -> bool {
        self.source == BlurSource::PingPong(self.destination)
    }
}

/// Fixed-length ping-pong blur schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurSchedule {
    iterations: u32,
}

impl Default for BlurSchedule {
    fn default() -> Self {
        Self {
            iterations: crate::settings::DEFAULT_BLUR_ITERATIONS,
        }
    }
}

impl BlurSchedule {
    /// Create a schedule of `iterations` passes. Zero iterations is rejected
    /// since the composite pass would have no blurred image to sample.
    pub fn new(iterations: u32) -> Result<Self> {
        if iterations == 0 {
            return Err(GlowError::ValueOutOfRange {
                field: "blur_iterations".into(),
                min: 1.0,
                max: u32::MAX as f64,
                value: 0.0,
            });
        }
        Ok(Self { iterations })
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// The `i`-th step of the schedule.
    pub fn step(&self, iteration: u32) -> BlurStep {
        let destination = PingPongSlot::from_parity(iteration);
        let source = if iteration == 0 {
            BlurSource::Bright
        } else {
            BlurSource::PingPong(destination.other())
        };
        let axis = if iteration % 2 == 0 {
            BlurAxis::Horizontal
        } else {
            BlurAxis::Vertical
        };
        BlurStep {
            iteration,
            source,
            destination,
            axis,
        }
    }

    /// All steps in submission order.
    pub fn steps(&self) -> impl Iterator<Item = BlurStep> + '_ {
        (0..self.iterations).map(|i| self.step(i))
    }

    /// Buffer holding the blurred image after the last iteration.
    pub fn final_slot(&self) -> PingPongSlot {
        PingPongSlot::from_parity(self.iterations - 1)
    }
}

/// Apply one 1D pass of the kernel to a row with clamp-to-edge addressing.
/// Mirrors `fs_blur` in `blur.wgsl`.
pub fn blur_row(row: &[f32]) -> Vec<f32> {
    let last = row.len().saturating_sub(1) as isize;
    (0..row.len())
        .map(|i| {
            let mut sum = row[i] * GAUSSIAN_WEIGHTS[0];
            for (k, w) in GAUSSIAN_WEIGHTS.iter().enumerate().skip(1) {
                let left = (i as isize - k as isize).clamp(0, last) as usize;
                let right = (i as isize + k as isize).clamp(0, last) as usize;
                sum += (row[left] + row[right]) * w;
            }
            sum
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_ends_in_b() {
        let schedule = BlurSchedule::new(10).unwrap();
        assert_eq!(schedule.steps().count(), 10);
        assert_eq!(schedule.final_slot(), PingPongSlot::B);
    }

    #[test]
    fn first_step_reads_bright_attachment() {
        let schedule = BlurSchedule::new(1).unwrap();
        let step = schedule.step(0);
        assert_eq!(step.source, BlurSource::Bright);
        assert_eq!(step.destination, PingPongSlot::A);
        assert_eq!(step.axis, BlurAxis::Horizontal);
        assert_eq!(schedule.final_slot(), PingPongSlot::A);
    }

    #[test]
    fn final_slot_is_last_destination_and_no_step_aliases() {
        for n in 1..=32 {
            let schedule = BlurSchedule::new(n).unwrap();
            let steps: Vec<_> = schedule.steps().collect();
            assert_eq!(steps.len() as u32, n);
            assert_eq!(steps[steps.len() - 1].destination, schedule.final_slot());
            for step in &steps {
                assert!(!step.aliases(), "iteration {} aliases", step.iteration);
            }
        }
    }

    #[test]
    fn steps_chain_and_alternate() {
        let schedule = BlurSchedule::new(6).unwrap();
        let steps: Vec<_> = schedule.steps().collect();
        for pair in steps.windows(2) {
            assert_eq!(pair[1].source, BlurSource::PingPong(pair[0].destination));
            assert_eq!(pair[1].axis, pair[0].axis.flipped());
            assert_ne!(pair[1].destination, pair[0].destination);
        }
    }

    #[test]
    fn zero_iterations_rejected() {
        assert!(BlurSchedule::new(0).is_err());
    }

    #[test]
    fn kernel_is_normalized() {
        let total: f32 = GAUSSIAN_WEIGHTS[0] + 2.0 * GAUSSIAN_WEIGHTS[1..].iter().sum::<f32>();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn blur_preserves_flat_rows_and_spreads_peaks() {
        let flat = blur_row(&[2.0; 16]);
        assert!(flat.iter().all(|v| (v - 2.0).abs() < 1e-4));

        let mut row = vec![0.0; 21];
        row[10] = 1.0;
        let out = blur_row(&row);
        assert!((out[10] - GAUSSIAN_WEIGHTS[0]).abs() < 1e-6);
        assert!((out[8] - out[12]).abs() < 1e-6);
        assert!((out.iter().sum::<f32>() - 1.0).abs() < 1e-4);
    }
}
