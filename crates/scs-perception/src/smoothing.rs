//! Fixed-window moving average.
//!
//! The buffer always holds exactly `window` samples and starts zero-filled,
//! so until `window` real samples have been pushed the mean is biased toward
//! zero.  Callers that care must account for the warm-up themselves.

/// Circular buffer of the last `window` samples of one channel.
#[derive(Debug, Clone)]
pub struct SmoothingBuffer {
    samples: Vec<f64>,
    next: usize,
}

impl SmoothingBuffer {
    /// A window of `0` is treated as `1`.
    pub fn new(window: usize) -> Self {
        Self {
            samples: vec![0.0; window.max(1)],
            next: 0,
        }
    }

    /// Overwrite the oldest slot with `sample`.
    pub fn push(&mut self, sample: f64) {
        self.samples[self.next] = sample;
        self.next = (self.next + 1) % self.samples.len();
    }

    /// Arithmetic mean over the whole window, zero slots included.
    pub fn mean(&self) -> f64 {
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Zero every slot and rewind.
    pub fn clear(&mut self) {
        self.samples.fill(0.0);
        self.next = 0;
    }

    pub fn window(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warm_up_mean_is_biased_toward_zero() {
        let mut buf = SmoothingBuffer::new(5);
        buf.push(100.0);
        assert!((buf.mean() - 20.0).abs() < 1e-9);
        for _ in 0..4 {
            buf.push(100.0);
        }
        assert!((buf.mean() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn oldest_sample_is_overwritten_round_robin() {
        let mut buf = SmoothingBuffer::new(3);
        for s in [3.0, 6.0, 9.0] {
            buf.push(s);
        }
        buf.push(12.0); // evicts 3.0
        assert!((buf.mean() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn clear_restores_zero_window() {
        let mut buf = SmoothingBuffer::new(4);
        buf.push(8.0);
        buf.clear();
        assert_eq!(buf.mean(), 0.0);
        assert_eq!(buf.window(), 4);
    }

    #[test]
    fn zero_window_behaves_as_single_slot() {
        let mut buf = SmoothingBuffer::new(0);
        buf.push(7.0);
        buf.push(5.0);
        assert_eq!(buf.window(), 1);
        assert_eq!(buf.mean(), 5.0);
    }
}
