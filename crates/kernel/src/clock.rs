/// Timing state observed by the frame clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSample {
    pub last_timestamp_ms: Option<f64>,
    pub smoothed_fps: Option<f64>,
    /// Weight of the newest frame in the FPS moving average.
    pub ema_alpha: f64,
}

/// Measures frame deltas and keeps an exponentially smoothed frame rate.
#[derive(Debug, Clone)]
pub struct FrameClock {
    sample: FrameSample,
}

impl FrameClock {
    pub const DEFAULT_ALPHA: f64 = 0.2;

    pub fn new(ema_alpha: f64) -> Self {
        Self {
            sample: FrameSample {
                last_timestamp_ms: None,
                smoothed_fps: None,
                ema_alpha,
            },
        }
    }

    /// Record a frame at `now_ms`.
    ///
    /// The first call after construction or [`reset`](Self::reset) only sets
    /// the baseline and returns `None`. Later calls return the delta since the
    /// previous call. A zero or negative delta leaves the FPS estimate alone.
    pub fn tick(&mut self, now_ms: f64) -> Option<f64> {
        let last = self.sample.last_timestamp_ms.replace(now_ms)?;
        let delta_ms = now_ms - last;

        if delta_ms > 0.0 {
            let instant_fps = 1000.0 / delta_ms;
            let alpha = self.sample.ema_alpha;
            self.sample.smoothed_fps = Some(match self.sample.smoothed_fps {
                None => instant_fps,
                Some(fps) => (1.0 - alpha) * fps + alpha * instant_fps,
            });
        } else {
            tracing::trace!(delta_ms, "non-positive frame delta, fps unchanged");
        }

        Some(delta_ms)
    }

    /// Forget the baseline so the next tick yields no delta. The FPS
    /// estimate is kept.
    pub fn reset(&mut self) {
        self.sample.last_timestamp_ms = None;
    }

    pub fn sample(&self) -> &FrameSample {
        &self.sample
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ALPHA)
    }
}
