//! [`ZoneLayout`] – reduces a sonar sweep to three danger levels.
//!
//! Each zone (left, center, right) owns a window of adjacent sonar indices.
//! The zone's danger level is the *closest* reading inside its window, so a
//! single near echo is enough to mark the whole zone as dangerous.
//!
//! The default layout matches the front arc of a Pioneer P3-DX sonar ring:
//!
//! | Zone | Indices |
//! |---|---|
//! | left | `2..4` |
//! | center | `4..6` |
//! | right | `6..8` |
//!
//! # Example
//!
//! ```rust
//! use sonarnav_control::zones::ZoneLayout;
//!
//! let readings = [1.0, 1.0, 0.9, 0.7, 0.2, 0.6, 1.0, 0.95];
//! let danger = ZoneLayout::default().aggregate(&readings).unwrap();
//! assert_eq!(danger.left, 0.7);
//! assert_eq!(danger.center, 0.2);
//! assert_eq!(danger.right, 0.95);
//! ```

use std::ops::Range;

use serde::{Deserialize, Serialize};
use sonarnav_types::{DangerTriple, NavError};

/// Index windows of the three zones within a reading sequence.
///
/// Windows are half-open (`start..end`), must be non-empty and must not
/// overlap.  Call [`ZoneLayout::validate`] on layouts that did not come from
/// [`ZoneLayout::new`] (e.g. deserialized ones).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneLayout {
    pub left: Range<usize>,
    pub center: Range<usize>,
    pub right: Range<usize>,
}

impl Default for ZoneLayout {
    fn default() -> Self {
        Self {
            left: 2..4,
            center: 4..6,
            right: 6..8,
        }
    }
}

impl ZoneLayout {
    /// Build a validated layout.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::Configuration`] when a window is empty or two
    /// windows overlap.
    pub fn new(
        left: Range<usize>,
        center: Range<usize>,
        right: Range<usize>,
    ) -> Result<Self, NavError> {
        let layout = Self {
            left,
            center,
            right,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Check the layout invariants.
    pub fn validate(&self) -> Result<(), NavError> {
        let windows = [
            ("left", &self.left),
            ("center", &self.center),
            ("right", &self.right),
        ];
        for (name, window) in windows {
            if window.start >= window.end {
                return Err(NavError::Configuration(format!(
                    "{name} zone window {}..{} is empty",
                    window.start, window.end
                )));
            }
        }
        for (i, (name_a, a)) in windows.iter().enumerate() {
            for (name_b, b) in &windows[i + 1..] {
                if a.start < b.end && b.start < a.end {
                    return Err(NavError::Configuration(format!(
                        "{name_a} zone window {}..{} overlaps {name_b} zone window {}..{}",
                        a.start, a.end, b.start, b.end
                    )));
                }
            }
        }
        Ok(())
    }

    /// Minimum number of readings needed to cover every window.
    pub fn required_len(&self) -> usize {
        self.left.end.max(self.center.end).max(self.right.end)
    }

    /// Reduce `readings` to a [`DangerTriple`].
    ///
    /// # Errors
    ///
    /// * [`NavError::InvalidInput`] when `readings` is shorter than
    ///   [`required_len`][Self::required_len].
    /// * [`NavError::InvalidReading`] when a reading inside a window is NaN or
    ///   negative.  Readings outside every window are never inspected.
    pub fn aggregate(&self, readings: &[f32]) -> Result<DangerTriple, NavError> {
        let required = self.required_len();
        if readings.len() < required {
            return Err(NavError::InvalidInput {
                required,
                actual: readings.len(),
            });
        }
        Ok(DangerTriple {
            left: window_min(readings, &self.left)?,
            center: window_min(readings, &self.center)?,
            right: window_min(readings, &self.right)?,
        })
    }
}

/// Aggregate with the default P3-DX layout.
pub fn aggregate(readings: &[f32]) -> Result<DangerTriple, NavError> {
    ZoneLayout::default().aggregate(readings)
}

fn window_min(readings: &[f32], window: &Range<usize>) -> Result<f32, NavError> {
    let mut closest = f32::INFINITY;
    for index in window.clone() {
        let value = readings[index];
        if value.is_nan() || value < 0.0 {
            return Err(NavError::InvalidReading { index, value });
        }
        closest = closest.min(value);
    }
    Ok(closest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn min_of(values: &[f32]) -> f32 {
        values.iter().copied().fold(f32::INFINITY, f32::min)
    }

    #[test]
    fn default_layout_covers_eight_readings() {
        assert_eq!(ZoneLayout::default().required_len(), 8);
        assert!(ZoneLayout::default().validate().is_ok());
    }

    #[test]
    fn all_clear_readings_give_uniform_triple() {
        let danger = aggregate(&[0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]).unwrap();
        assert_eq!(
            danger,
            DangerTriple {
                left: 1.0,
                center: 1.0,
                right: 1.0
            }
        );
    }

    #[test]
    fn each_zone_takes_its_window_minimum() {
        let readings = [0.05, 0.05, 0.9, 0.3, 0.7, 0.75, 0.41, 0.4];
        let danger = aggregate(&readings).unwrap();
        assert_eq!(danger.left, 0.3);
        assert_eq!(danger.center, 0.7);
        assert_eq!(danger.right, 0.4);
    }

    #[test]
    fn readings_outside_windows_are_ignored() {
        // Indices 0, 1 and 8.. belong to no zone.
        let readings = [-5.0, f32::NAN, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, f32::NAN];
        let danger = aggregate(&readings).unwrap();
        assert_eq!(danger.center, 1.0);
    }

    #[test]
    fn sixteen_sonar_ring_is_accepted() {
        let mut readings = vec![1.0_f32; 16];
        readings[5] = 0.25;
        let danger = aggregate(&readings).unwrap();
        assert_eq!(danger.center, 0.25);
    }

    #[test]
    fn short_sequences_are_invalid_input() {
        for len in 0..8 {
            let readings = vec![1.0_f32; len];
            assert_eq!(
                aggregate(&readings),
                Err(NavError::InvalidInput {
                    required: 8,
                    actual: len
                })
            );
        }
    }

    #[test]
    fn nan_in_window_is_rejected() {
        let mut readings = [1.0_f32; 8];
        readings[4] = f32::NAN;
        let err = aggregate(&readings).unwrap_err();
        assert!(matches!(err, NavError::InvalidReading { index: 4, .. }));
    }

    #[test]
    fn negative_in_window_is_rejected() {
        let mut readings = [1.0_f32; 8];
        readings[7] = -0.1;
        let err = aggregate(&readings).unwrap_err();
        assert!(matches!(err, NavError::InvalidReading { index: 7, .. }));
    }

    #[test]
    fn infinite_reading_means_no_echo() {
        let mut readings = [f32::INFINITY; 8];
        readings[2] = 0.6;
        let danger = aggregate(&readings).unwrap();
        assert_eq!(danger.left, 0.6);
        assert!(danger.center.is_infinite());
    }

    #[test]
    fn empty_window_is_configuration_error() {
        let err = ZoneLayout::new(2..2, 4..6, 6..8).unwrap_err();
        assert!(matches!(err, NavError::Configuration(_)));
    }

    #[test]
    fn overlapping_windows_are_configuration_error() {
        let err = ZoneLayout::new(2..5, 4..6, 6..8).unwrap_err();
        assert!(matches!(err, NavError::Configuration(_)));
    }

    #[test]
    fn custom_layout_changes_required_len() {
        let layout = ZoneLayout::new(0..3, 7..9, 12..16).unwrap();
        assert_eq!(layout.required_len(), 16);
        let readings: Vec<f32> = (0..16).map(|i| i as f32 / 10.0).collect();
        let danger = layout.aggregate(&readings).unwrap();
        assert_eq!(danger.left, 0.0);
        assert_eq!(danger.center, 0.7);
        assert_eq!(danger.right, 1.2);
        assert!(matches!(
            layout.aggregate(&readings[..15]),
            Err(NavError::InvalidInput {
                required: 16,
                actual: 15
            })
        ));
    }

    #[test]
    fn layout_deserializes_from_toml_ranges() {
        let raw = r#"
            left = { start = 1, end = 3 }
            center = { start = 3, end = 5 }
            right = { start = 5, end = 7 }
        "#;
        let layout: ZoneLayout = toml::from_str(raw).unwrap();
        assert_eq!(layout.center, 3..5);
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn randomized_sequences_match_window_minima() {
        let mut rng = StdRng::seed_from_u64(0x50_4e_41_52);
        for _ in 0..2_000 {
            let len = rng.gen_range(8..24);
            let readings: Vec<f32> = (0..len).map(|_| rng.gen_range(0.0..5.0)).collect();
            let danger = aggregate(&readings).unwrap();
            assert_eq!(danger.left, min_of(&readings[2..4]));
            assert_eq!(danger.center, min_of(&readings[4..6]));
            assert_eq!(danger.right, min_of(&readings[6..8]));
        }
    }

    #[test]
    fn randomized_short_sequences_fail() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let len = rng.gen_range(0..8);
            let readings: Vec<f32> = (0..len).map(|_| rng.gen_range(0.0..5.0)).collect();
            assert!(aggregate(&readings).unwrap_err().is_invalid_input());
        }
    }
}
