//! Rolling frame-rate window used to decide on safe mode.

use std::collections::VecDeque;

use crate::config::DirectorConfig;

/// Fixed-size window of frame-rate samples.
#[derive(Debug, Clone)]
pub struct FpsMonitor {
    samples: VecDeque<f64>,
    window: usize,
    min_samples: usize,
    threshold: f64,
}

impl FpsMonitor {
    /// Create a monitor from director settings.
    pub fn new(config: &DirectorConfig) -> Self {
        let window = config.fps_window.max(1);
        Self {
            samples: VecDeque::with_capacity(window),
            window,
            min_samples: config.fps_min_samples.clamp(1, window),
            threshold: config.fps_threshold,
        }
    }

    /// Add a sample. Non-finite or negative values are ignored.
    pub fn push(&mut self, fps: f64) -> bool {
        if !fps.is_finite() || fps < 0.0 {
            return false;
        }
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(fps);
        true
    }

    /// Rolling average, `None` while empty.
    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    /// Enough samples and the average is below threshold.
    pub fn is_degraded(&self) -> bool {
        self.samples.len() >= self.min_samples
            && self.average().is_some_and(|avg| avg < self.threshold)
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples are held.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drop all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
