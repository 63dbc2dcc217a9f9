use parking_lot::Mutex;

/// A bounded window of recent observations backing quantile estimates for
/// timers and distribution summaries. Once full, the oldest observation is
/// overwritten, so quantiles reflect roughly the last `capacity` recordings
/// rather than the whole meter lifetime. This is an estimator, not an exact
/// streaming quantile sketch; declared quantiles are advisory samples for
/// backends that cannot compute their own.
#[derive(Debug)]
pub(crate) struct SampleWindow {
    inner: Mutex<Ring>,
}

#[derive(Debug)]
struct Ring {
    values: Vec<f64>,
    next: usize,
    capacity: usize,
}

const DEFAULT_CAPACITY: usize = 1024;

impl SampleWindow {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Ring {
                values: Vec::new(),
                next: 0,
                capacity: DEFAULT_CAPACITY,
            }),
        }
    }

    pub(crate) fn record(&self, value: f64) {
        let mut ring = self.inner.lock();
        if ring.values.len() < ring.capacity {
            ring.values.push(value);
        } else {
            let slot = ring.next;
            ring.values[slot] = value;
        }
        ring.next = (ring.next + 1) % ring.capacity;
    }

    /// Nearest-rank quantile over the current window. `q` outside `[0, 1]` is
    /// clamped; an empty window reports 0.
    pub(crate) fn quantile(&self, q: f64) -> f64 {
        let ring = self.inner.lock();
        if ring.values.is_empty() {
            return 0.0;
        }
        let mut sorted = ring.values.clone();
        drop(ring);
        sorted.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let q = q.clamp(0.0, 1.0);
        let rank = ((q * sorted.len() as f64).ceil() as usize).clamp(1, sorted.len());
        sorted[rank - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_reports_zero() {
        let window = SampleWindow::new();
        assert_eq!(window.quantile(0.5), 0.0);
    }

    #[test]
    fn nearest_rank_quantiles() {
        let window = SampleWindow::new();
        for v in 1..=100 {
            window.record(v as f64);
        }
        assert_eq!(window.quantile(0.5), 50.0);
        assert_eq!(window.quantile(0.99), 99.0);
        assert_eq!(window.quantile(1.0), 100.0);
        assert_eq!(window.quantile(0.0), 1.0);
    }

    #[test]
    fn window_wraps_after_capacity() {
        let window = SampleWindow::new();
        for v in 0..(DEFAULT_CAPACITY + 10) {
            window.record(v as f64);
        }
        // The lowest retained value is the 11th recording.
        assert_eq!(window.quantile(0.0), 10.0);
    }
}
