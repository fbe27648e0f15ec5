use crate::core::config::AdaptiveDebounceConfig;
use crate::debounce::fixed::FixedDebounce;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Measures frame-to-frame timing and picks a debounce delay tier.
///
/// Keeps the most recent `window` frame durations. Once the window is full
/// every new frame drops the oldest sample and re-selects the delay from the
/// window's mean frame rate. Until the first window fills the configured
/// initial delay stays in effect.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    config: AdaptiveDebounceConfig,
    samples: VecDeque<Duration>,
    last_frame: Option<Instant>,
    current_delay: Duration,
    last_fps: Option<f64>,
}

impl FrameSampler {
    pub fn new(config: AdaptiveDebounceConfig) -> Self {
        let current_delay = config.initial_delay();
        let window = config.window.max(1);
        Self {
            config,
            samples: VecDeque::with_capacity(window + 1),
            last_frame: None,
            current_delay,
            last_fps: None,
        }
    }

    /// Records a rendered frame at `now`. Returns the selected delay once
    /// the window is full.
    pub fn record_frame(&mut self, now: Instant) -> Option<Duration> {
        let selected = self
            .last_frame
            .map(|prev| now.saturating_duration_since(prev))
            .and_then(|elapsed| self.record_frame_duration(elapsed));
        self.last_frame = Some(now);
        selected
    }

    pub fn record_frame_duration(&mut self, duration: Duration) -> Option<Duration> {
        let window = self.config.window.max(1);
        self.samples.push_back(duration);
        while self.samples.len() > window {
            self.samples.pop_front();
        }
        if self.samples.len() < window {
            return None;
        }

        let total: Duration = self.samples.iter().sum();
        let mean_ms = total.as_secs_f64() * 1000.0 / self.samples.len() as f64;

        let fps = if mean_ms > 0.0 {
            1000.0 / mean_ms
        } else {
            f64::INFINITY
        };
        let delay = self.config.select_delay(fps);
        if delay != self.current_delay {
            log::info!(
                "frame rate {:.1} fps, debounce delay {:?} -> {:?}",
                fps,
                self.current_delay,
                delay
            );
        }
        self.last_fps = Some(fps);
        self.current_delay = delay;
        Some(delay)
    }

    pub fn current_delay(&self) -> Duration {
        self.current_delay
    }

    /// Mean frame rate of the window at the last evaluation
    pub fn last_fps(&self) -> Option<f64> {
        self.last_fps
    }

    pub fn pending_samples(&self) -> usize {
        self.samples.len()
    }

    /// Forgets the sampled window and the last frame timestamp, keeping the
    /// selected delay. Used when rendering pauses (hidden tab, unmount).
    pub fn reset(&mut self) {
        self.samples.clear();
        self.last_frame = None;
    }
}

/// Debounce whose quiet period follows the measured frame rate
#[derive(Debug, Clone)]
pub struct AdaptiveDebounce<T> {
    sampler: FrameSampler,
    debounce: FixedDebounce<T>,
}

impl<T: Clone> AdaptiveDebounce<T> {
    pub fn new(config: AdaptiveDebounceConfig) -> Self {
        let sampler = FrameSampler::new(config);
        let debounce = FixedDebounce::new(sampler.current_delay());
        Self { sampler, debounce }
    }

    pub fn on_frame(&mut self, now: Instant) {
        if let Some(delay) = self.sampler.record_frame(now) {
            self.debounce.set_delay(delay);
        }
    }

    /// Starts the timer with whatever delay is currently selected
    pub fn push(&mut self, value: T, now: Instant) {
        let delay = self.sampler.current_delay();
        self.debounce.push_with_delay(value, now, delay);
    }

    pub fn poll(&mut self, now: Instant) -> Option<T> {
        self.debounce.poll(now)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    pub fn cancel(&mut self) {
        self.debounce.cancel();
        self.sampler.reset();
    }

    pub fn current_delay(&self) -> Duration {
        self.sampler.current_delay()
    }

    pub fn sampler(&self) -> &FrameSampler {
        &self.sampler
    }
}
