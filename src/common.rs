//! Console helpers shared by the binaries

use std::time::Instant;

/// Tracks elapsed time since creation
pub struct TimeKeeper {
    start: Instant,
}

impl TimeKeeper {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed time in seconds
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Average rate of `count` events since creation
    pub fn rate(&self, count: u64) -> f64 {
        let elapsed = self.elapsed_secs();
        if elapsed > 0.0 {
            count as f64 / elapsed
        } else {
            0.0
        }
    }
}

impl Default for TimeKeeper {
    fn default() -> Self {
        Self::new()
    }
}

/// Horizontal bar centred on zero
///
/// # Arguments
/// * `value` - The value to display; non-finite values draw an empty bar
/// * `max_value` - Maximum absolute value (defines scale)
/// * `width` - Cells on either side of the centre marker combined; the bar is
///   `width + 1` characters including the marker
///
/// # Example
/// ```
/// use accel_angle_tracker::create_bar;
///
/// // 45 degrees on a +/-180 degree scale with 40-char width
/// let bar = create_bar(45.0, 180.0, 40);
/// assert_eq!(bar.chars().count(), 41);
/// ```
pub fn create_bar(value: f32, max_value: f32, width: usize) -> String {
    let normalized = if value.is_finite() {
        (value / max_value).clamp(-1.0, 1.0)
    } else {
        0.0
    };
    let center = width / 2;
    let bar_length = ((normalized.abs() * center as f32) as usize).min(center);

    let mut bar = String::with_capacity(width * 3 + 1);
    if normalized < 0.0 {
        bar.push_str(&" ".repeat(center - bar_length));
        bar.push_str(&"█".repeat(bar_length));
        bar.push('|');
        bar.push_str(&" ".repeat(center));
    } else {
        bar.push_str(&" ".repeat(center));
        bar.push('|');
        bar.push_str(&"█".repeat(bar_length));
        bar.push_str(&" ".repeat(center - bar_length));
    }

    bar
}

/// Angle for display, `--` before calibration
pub fn format_angle(angle: Option<f32>) -> String {
    match angle {
        Some(a) if a.is_finite() => format!("{:8.2}°", a),
        Some(_) => "     n/a ".to_string(),
        None => "      -- ".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_bar_zero() {
        let bar = create_bar(0.0, 180.0, 40);
        assert_eq!(bar.chars().count(), 41);
        assert!(bar.contains('|'));
        assert!(!bar.contains('█'));
    }

    #[test]
    fn test_create_bar_negative_extends_left() {
        let bar = create_bar(-90.0, 180.0, 40);
        assert_eq!(bar.chars().count(), 41);
        let marker = bar.chars().position(|c| c == '|').unwrap();
        let first_block = bar.chars().position(|c| c == '█').unwrap();
        assert!(first_block < marker);
    }

    #[test]
    fn test_create_bar_clamps_and_handles_nan() {
        let full = create_bar(720.0, 180.0, 20);
        assert_eq!(full.chars().filter(|&c| c == '█').count(), 10);
        let nan = create_bar(f32::NAN, 180.0, 20);
        assert_eq!(nan.chars().filter(|&c| c == '█').count(), 0);
    }

    #[test]
    fn test_format_angle() {
        assert_eq!(format_angle(Some(12.5)).trim(), "12.50°");
        assert_eq!(format_angle(None).trim(), "--");
        assert_eq!(format_angle(Some(f32::NAN)).trim(), "n/a");
    }

    #[test]
    fn test_timekeeper() {
        let keeper = TimeKeeper::new();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let elapsed = keeper.elapsed_secs();
        assert!(elapsed >= 0.01);
        assert!(keeper.rate(10) > 0.0);
    }
}
