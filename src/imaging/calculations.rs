//! Pure calculation functions for avatar geometry and compression.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::Quality;
use serde::{Deserialize, Serialize};

/// A square region inside a source bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

/// Calculate the centered square crop for a bitmap.
///
/// The side is the smaller dimension; the square is centered along the
/// larger one. Content outside the square is discarded (no letterboxing).
///
/// # Examples
/// ```
/// # use simple_avatar::imaging::{CropRect, calculate_center_crop};
/// // Portrait 416x626 → 416px square, 105px down from the top
/// assert_eq!(
///     calculate_center_crop(416, 626),
///     CropRect { x: 0, y: 105, size: 416 }
/// );
/// ```
pub fn calculate_center_crop(width: u32, height: u32) -> CropRect {
    let size = width.min(height);
    CropRect {
        x: (width - size) / 2,
        y: (height - size) / 2,
        size,
    }
}

/// Qualities the compressor tries, highest first.
///
/// Starts at `start` and steps down by `step` while the value stays at or
/// above `floor`. A zero step yields a single attempt. A start below the
/// floor is raised to the floor.
///
/// # Examples
/// ```
/// # use simple_avatar::imaging::{Quality, quality_schedule};
/// let qs: Vec<u32> = quality_schedule(Quality::new(85), 10, Quality::new(50))
///     .into_iter()
///     .map(Quality::value)
///     .collect();
/// assert_eq!(qs, vec![85, 75, 65, 55]);
/// ```
pub fn quality_schedule(start: Quality, step: u32, floor: Quality) -> Vec<Quality> {
    if start < floor {
        return vec![floor];
    }
    if step == 0 {
        return vec![start];
    }

    let mut schedule = Vec::new();
    let mut current = start.value();
    while current >= floor.value() {
        schedule.push(Quality::new(current));
        match current.checked_sub(step) {
            Some(next) => current = next,
            None => break,
        }
    }
    schedule
}

/// Size reduction as a percentage of the original (`0.0` when the original is empty).
///
/// Negative when the output is larger than the input.
pub fn compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    (1.0 - compressed_size as f64 / original_size as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // calculate_center_crop tests
    // =========================================================================

    #[test]
    fn crop_portrait_centers_vertically() {
        assert_eq!(
            calculate_center_crop(416, 626),
            CropRect {
                x: 0,
                y: 105,
                size: 416
            }
        );
    }

    #[test]
    fn crop_landscape_centers_horizontally() {
        assert_eq!(
            calculate_center_crop(1920, 1080),
            CropRect {
                x: 420,
                y: 0,
                size: 1080
            }
        );
    }

    #[test]
    fn crop_square_is_whole_image() {
        for side in [1, 2, 512, 4000] {
            assert_eq!(
                calculate_center_crop(side, side),
                CropRect {
                    x: 0,
                    y: 0,
                    size: side
                }
            );
        }
    }

    #[test]
    fn crop_odd_difference_rounds_down() {
        // 101 - 100 = 1 spare pixel → offset 0, square still fits
        let rect = calculate_center_crop(101, 100);
        assert_eq!(rect.x, 0);
        assert!(rect.x + rect.size <= 101);
    }

    #[test]
    fn crop_always_square_and_contained() {
        for width in 1..=48 {
            for height in 1..=48 {
                let rect = calculate_center_crop(width, height);
                assert_eq!(rect.size, width.min(height), "{width}x{height}");
                assert!(rect.x + rect.size <= width, "{width}x{height}");
                assert!(rect.y + rect.size <= height, "{width}x{height}");
            }
        }
    }

    #[test]
    fn crop_extreme_aspect() {
        let rect = calculate_center_crop(10_000, 3);
        assert_eq!(rect.size, 3);
        assert_eq!(rect.x, 4998);
        assert_eq!(rect.y, 0);
    }

    // =========================================================================
    // quality_schedule tests
    // =========================================================================

    fn values(schedule: Vec<Quality>) -> Vec<u32> {
        schedule.into_iter().map(Quality::value).collect()
    }

    #[test]
    fn schedule_default_is_four_attempts() {
        let schedule = quality_schedule(Quality::new(85), 10, Quality::new(50));
        assert_eq!(values(schedule), vec![85, 75, 65, 55]);
    }

    #[test]
    fn schedule_includes_floor_when_hit_exactly() {
        let schedule = quality_schedule(Quality::new(80), 10, Quality::new(50));
        assert_eq!(values(schedule), vec![80, 70, 60, 50]);
    }

    #[test]
    fn schedule_never_leaves_bounds() {
        for step in 1..=30 {
            let schedule = quality_schedule(Quality::new(85), step, Quality::new(50));
            assert_eq!(schedule.first().map(|q| q.value()), Some(85));
            for pair in schedule.windows(2) {
                assert_eq!(pair[0].value() - pair[1].value(), step);
            }
            assert!(schedule.iter().all(|q| q.value() >= 50 && q.value() <= 85));
        }
    }

    #[test]
    fn schedule_zero_step_is_single_attempt() {
        let schedule = quality_schedule(Quality::new(85), 0, Quality::new(50));
        assert_eq!(values(schedule), vec![85]);
    }

    #[test]
    fn schedule_start_below_floor_uses_floor() {
        let schedule = quality_schedule(Quality::new(40), 10, Quality::new(50));
        assert_eq!(values(schedule), vec![50]);
    }

    #[test]
    fn schedule_large_step_stops_without_underflow() {
        let schedule = quality_schedule(Quality::new(5), 10, Quality::new(1));
        assert_eq!(values(schedule), vec![5]);
    }

    // =========================================================================
    // compression_ratio tests
    // =========================================================================

    #[test]
    fn ratio_of_601kb_to_60kb() {
        let ratio = compression_ratio(601 * 1024, 60 * 1024);
        assert!((ratio - 90.016).abs() < 0.01, "got {ratio}");
    }

    #[test]
    fn ratio_empty_original_is_zero() {
        assert_eq!(compression_ratio(0, 100), 0.0);
    }

    #[test]
    fn ratio_negative_when_output_grows() {
        assert!(compression_ratio(100, 150) < 0.0);
    }
}
