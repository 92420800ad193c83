//! Throughput sampling on a monotonic clock.

use std::time::{Duration, Instant};

/// Raw speed from consecutive byte totals. Never negative: a total that
/// shrinks (a restart from zero) reads as 0.
#[derive(Debug, Default)]
pub struct SpeedSampler {
    last: Option<(u64, Instant)>,
}

impl SpeedSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, bytes: u64, now: Instant) -> f64 {
        let speed = match self.last {
            Some((prev_bytes, prev_at)) => {
                let dt = now.saturating_duration_since(prev_at).as_secs_f64();
                if dt > 0.0 {
                    bytes.saturating_sub(prev_bytes) as f64 / dt
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        self.last = Some((bytes, now));
        speed
    }
}

/// Display-only smoothing: a zero sample is shown as the last nonzero speed
/// while that speed is younger than the window. Tuning always uses raw speed.
#[derive(Debug)]
pub struct DisplaySmoother {
    window: Duration,
    last_nonzero: Option<(f64, Instant)>,
}

impl DisplaySmoother {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_nonzero: None,
        }
    }

    pub fn smooth(&mut self, raw: f64, now: Instant) -> f64 {
        if raw > 0.0 {
            self.last_nonzero = Some((raw, now));
            return raw;
        }
        match self.last_nonzero {
            Some((speed, at)) if now.saturating_duration_since(at) < self.window => speed,
            _ => 0.0,
        }
    }
}
