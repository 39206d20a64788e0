//! Minimum detectable object size.
//!
//! The operator picks a fraction of the frame height; the pixel threshold is
//! derived lazily from the height of the next processed frame.

use std::fmt;

use anyhow::{anyhow, Result};

/// Operator-facing size presets, in menu order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SizePreset {
    Fruit50,
    Fruit40,
    Fruit30,
    Fruit20,
}

impl SizePreset {
    pub const ALL: [SizePreset; 4] = [
        SizePreset::Fruit50,
        SizePreset::Fruit40,
        SizePreset::Fruit30,
        SizePreset::Fruit20,
    ];

    pub fn fraction(self) -> f32 {
        match self {
            SizePreset::Fruit50 => 0.5,
            SizePreset::Fruit40 => 0.4,
            SizePreset::Fruit30 => 0.3,
            SizePreset::Fruit20 => 0.2,
        }
    }

    pub fn percent(self) -> u32 {
        match self {
            SizePreset::Fruit50 => 50,
            SizePreset::Fruit40 => 40,
            SizePreset::Fruit30 => 30,
            SizePreset::Fruit20 => 20,
        }
    }

    pub fn from_percent(percent: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|preset| preset.percent() == percent)
    }

    /// Menu item text.
    pub fn label(self) -> String {
        format!("Fruit size {}%", self.percent())
    }
}

impl fmt::Display for SizePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Relative fruit size and the pixel threshold derived from it.
///
/// `absolute_pixels` is either 0 (recompute on the next frame) or
/// `round(relative_fraction * height)` for the most recently processed frame.
#[derive(Clone, Debug, PartialEq)]
pub struct SizePolicy {
    relative_fraction: f32,
    absolute_pixels: u32,
}

impl SizePolicy {
    pub fn new(relative_fraction: f32) -> Result<Self> {
        validate_fraction(relative_fraction)?;
        Ok(Self {
            relative_fraction,
            absolute_pixels: 0,
        })
    }

    pub fn from_preset(preset: SizePreset) -> Self {
        Self {
            relative_fraction: preset.fraction(),
            absolute_pixels: 0,
        }
    }

    pub fn relative_fraction(&self) -> f32 {
        self.relative_fraction
    }

    /// Current pixel threshold; 0 means not yet computed.
    pub fn absolute_pixels(&self) -> u32 {
        self.absolute_pixels
    }

    /// Overwrite the fraction and force recomputation on the next frame.
    pub fn set_relative_fruit_size(&mut self, fraction: f32) -> Result<()> {
        validate_fraction(fraction)?;
        self.relative_fraction = fraction;
        self.absolute_pixels = 0;
        Ok(())
    }

    pub fn apply_preset(&mut self, preset: SizePreset) {
        self.relative_fraction = preset.fraction();
        self.absolute_pixels = 0;
    }

    /// Pixel threshold for a frame of the given height.
    ///
    /// Computes the threshold when it is unset. A rounded value of 0 leaves
    /// it unset, so detection runs without a minimum size.
    pub fn threshold_for(&mut self, frame_height: u32) -> u32 {
        if self.absolute_pixels == 0 {
            let rounded = (frame_height as f32 * self.relative_fraction).round();
            if rounded > 0.0 {
                self.absolute_pixels = rounded as u32;
            }
        }
        self.absolute_pixels
    }
}

impl Default for SizePolicy {
    fn default() -> Self {
        Self::from_preset(SizePreset::Fruit20)
    }
}

fn validate_fraction(fraction: f32) -> Result<()> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(anyhow!(
            "relative fruit size must be in (0, 1], got {}",
            fraction
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_map_to_fractions() {
        let fractions: Vec<f32> = SizePreset::ALL.iter().map(|p| p.fraction()).collect();
        assert_eq!(fractions, vec![0.5, 0.4, 0.3, 0.2]);
        assert_eq!(SizePreset::Fruit30.label(), "Fruit size 30%");
        assert_eq!(SizePreset::from_percent(40), Some(SizePreset::Fruit40));
        assert_eq!(SizePreset::from_percent(45), None);
    }

    #[test]
    fn threshold_computed_once_per_fraction() {
        let mut policy = SizePolicy::from_preset(SizePreset::Fruit50);
        assert_eq!(policy.absolute_pixels(), 0);
        assert_eq!(policy.threshold_for(480), 240);
        // Persists even if a later frame has a different height.
        assert_eq!(policy.threshold_for(720), 240);

        policy.apply_preset(SizePreset::Fruit20);
        assert_eq!(policy.absolute_pixels(), 0);
        assert_eq!(policy.threshold_for(480), 96);
    }

    #[test]
    fn reset_is_unconditional() -> Result<()> {
        let mut policy = SizePolicy::default();
        policy.set_relative_fruit_size(0.2)?;
        assert_eq!(policy.absolute_pixels(), 0);
        policy.threshold_for(480);
        policy.set_relative_fruit_size(0.2)?;
        assert_eq!(policy.absolute_pixels(), 0);
        Ok(())
    }

    #[test]
    fn tiny_frames_leave_threshold_unset() {
        let mut policy = SizePolicy::from_preset(SizePreset::Fruit20);
        assert_eq!(policy.threshold_for(2), 0);
        assert_eq!(policy.absolute_pixels(), 0);
        assert_eq!(policy.threshold_for(3), 1);
    }

    #[test]
    fn rejects_out_of_range_fractions() {
        assert!(SizePolicy::new(0.0).is_err());
        assert!(SizePolicy::new(1.5).is_err());
        assert!(SizePolicy::new(f32::NAN).is_err());
        assert!(SizePolicy::new(1.0).is_ok());

        let mut policy = SizePolicy::default();
        assert!(policy.set_relative_fruit_size(-0.1).is_err());
        assert_eq!(policy.relative_fraction(), 0.2);
    }

    #[test]
    fn every_fraction_rounds_against_height() -> Result<()> {
        for step in 1..=100u32 {
            let fraction = step as f32 / 100.0;
            let mut policy = SizePolicy::new(fraction)?;
            let expected = (fraction * 480.0).round() as u32;
            assert_eq!(policy.threshold_for(480), expected);
            assert_eq!(policy.threshold_for(480), expected);
        }
        Ok(())
    }
}
