//! Moving-average smoothing over a bounded window of vector samples.
//!
//! The buffer sits behind a mutex so the capture task can feed samples while
//! other holders of the filter read it. The window size is fixed for the
//! lifetime of an instance: resizing means building a new filter.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::TrackingError;

#[derive(Debug)]
pub struct SmoothingFilter<const N: usize> {
    window_size: usize,
    buffer: Mutex<VecDeque<[f64; N]>>,
}

/// Head angles: yaw, pitch, roll.
pub type HeadFilter = SmoothingFilter<3>;
/// Gaze: horizontal, vertical.
pub type GazeFilter = SmoothingFilter<2>;

impl<const N: usize> SmoothingFilter<N> {
    pub fn new(window_size: usize) -> Result<Self, TrackingError> {
        if window_size == 0 {
            return Err(TrackingError::InvalidConfiguration(
                "smoothing window size must be positive".to_string(),
            ));
        }
        Ok(Self {
            window_size,
            buffer: Mutex::new(VecDeque::with_capacity(window_size)),
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Push a sample, evicting the oldest one when full, and return the component-wise mean.
    pub fn add(&self, sample: [f64; N]) -> [f64; N] {
        let mut buffer = self.lock();
        if buffer.len() == self.window_size {
            buffer.pop_front();
        }
        buffer.push_back(sample);
        mean(&buffer)
    }

    pub fn reset(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<[f64; N]>> {
        // Samples are plain numbers; a poisoned buffer is still valid.
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn mean<const N: usize>(samples: &VecDeque<[f64; N]>) -> [f64; N] {
    let mut sum = [0.0; N];
    for sample in samples {
        for (acc, v) in sum.iter_mut().zip(sample) {
            *acc += v;
        }
    }
    let count = samples.len().max(1) as f64;
    sum.map(|v| v / count)
}
