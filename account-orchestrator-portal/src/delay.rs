//! Human-like delay generation.
//!
//! Scripted traffic with metronome timing is trivially fingerprintable, so
//! every pause between portal actions is drawn from a Gaussian-shaped
//! distribution clamped to a caller-supplied range. Pure function of
//! `(min, max)` over the platform's default RNG; no shared state, reseeded
//! per call.

use std::time::Duration;

use rand::Rng;

/// Number of uniform samples averaged per draw. The Irwin–Hall mean of four
/// uniforms is close enough to a bell curve for traffic shaping.
const SHAPE_SAMPLES: u32 = 4;

/// Draw one bounded, Gaussian-shaped delay from `[min, max]`.
///
/// Degenerate ranges collapse to `min`.
#[must_use]
pub fn human_delay(min: Duration, max: Duration) -> Duration {
    if min >= max {
        return min;
    }

    let mut rng = rand::rng();
    let mut sum = 0.0_f64;
    for _ in 0..SHAPE_SAMPLES {
        sum += rng.random_range(0.0_f64..1.0_f64);
    }
    let fraction = sum / f64::from(SHAPE_SAMPLES);

    let span_ms = (max - min).as_millis() as f64;
    let offset_ms = (span_ms * fraction).round() as u64;
    min + Duration::from_millis(offset_ms)
}

/// Sleep for one [`human_delay`] draw.
pub async fn human_pause(min: Duration, max: Duration) {
    let delay = human_delay(min, max);
    log::debug!("pausing {:.2}s between actions", delay.as_secs_f32());
    tokio::time::sleep(delay).await;
}
