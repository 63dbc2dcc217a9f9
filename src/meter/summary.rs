use std::sync::{atomic, Arc};

use smallvec::smallvec;

use super::window::SampleWindow;
use super::{tags_with, Sample, Samples, Statistic};
use crate::tag::Tags;

#[derive(Debug)]
struct SummaryInner {
    count: atomic::AtomicU64,
    // f64 bits, CAS-updated.
    total: atomic::AtomicU64,
    max: atomic::AtomicU64,
    quantiles: Vec<f64>,
    window: Option<SampleWindow>,
}

/// Tracks the distribution of a sampled value that is not a duration: payload
/// sizes, batch counts, queue depths at dequeue. Negative amounts are dropped,
/// matching counter semantics. An optional base unit declared at registration
/// only affects the exported name, never the recorded numbers.
#[derive(Debug, Clone)]
pub struct DistributionSummary {
    inner: Arc<SummaryInner>,
}

fn cas_f64(cell: &atomic::AtomicU64, update: impl Fn(f64) -> f64) {
    let mut current = cell.load(atomic::Ordering::Relaxed);
    loop {
        let next = update(f64::from_bits(current));
        match cell.compare_exchange_weak(
            current,
            next.to_bits(),
            atomic::Ordering::Relaxed,
            atomic::Ordering::Relaxed,
        ) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
}

impl DistributionSummary {
    pub(crate) fn new(quantiles: Vec<f64>) -> Self {
        let window = if quantiles.is_empty() {
            None
        } else {
            Some(SampleWindow::new())
        };
        Self {
            inner: Arc::new(SummaryInner {
                count: atomic::AtomicU64::new(0),
                total: atomic::AtomicU64::new(0.0f64.to_bits()),
                max: atomic::AtomicU64::new(0.0f64.to_bits()),
                quantiles,
                window,
            }),
        }
    }

    pub fn record(&self, amount: f64) {
        // Zero amounts count; negative and NaN amounts are dropped so they
        // cannot poison the running total.
        if amount.is_nan() || amount < 0.0 {
            return;
        }
        self.inner.count.fetch_add(1, atomic::Ordering::Relaxed);
        cas_f64(&self.inner.total, |total| total + amount);
        cas_f64(&self.inner.max, |max| max.max(amount));
        if let Some(window) = &self.inner.window {
            window.record(amount);
        }
    }

    pub fn count(&self) -> u64 {
        self.inner.count.load(atomic::Ordering::Relaxed)
    }

    pub fn total(&self) -> f64 {
        f64::from_bits(self.inner.total.load(atomic::Ordering::Relaxed))
    }

    pub fn max(&self) -> f64 {
        f64::from_bits(self.inner.max.load(atomic::Ordering::Relaxed))
    }

    pub(crate) fn collect(&self, tags: &Tags) -> Samples {
        let mut samples: Samples = smallvec![
            Sample::new(tags.clone(), Statistic::Count, self.count() as f64),
            Sample::new(tags.clone(), Statistic::Total, self.total()),
            Sample::new(tags.clone(), Statistic::Max, self.max()),
        ];
        if let Some(window) = &self.inner.window {
            for q in &self.inner.quantiles {
                samples.push(Sample::new(
                    tags_with(tags, "quantile", &q.to_string()),
                    Statistic::Value,
                    window.quantile(*q),
                ));
            }
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_accumulate() {
        let summary = DistributionSummary::new(Vec::new());
        summary.record(2.0);
        summary.record(8.0);
        assert_eq!(summary.count(), 2);
        assert_eq!(summary.total(), 10.0);
        assert_eq!(summary.max(), 8.0);
    }

    #[test]
    fn negative_amounts_are_dropped() {
        let summary = DistributionSummary::new(Vec::new());
        summary.record(-1.0);
        assert_eq!(summary.count(), 0);
        assert_eq!(summary.total(), 0.0);
    }

    #[test]
    fn nan_amounts_are_dropped_but_zero_counts() {
        let summary = DistributionSummary::new(Vec::new());
        summary.record(f64::NAN);
        assert_eq!(summary.count(), 0);
        summary.record(0.0);
        summary.record(4.0);
        assert_eq!(summary.count(), 2);
        assert_eq!(summary.total(), 4.0);
    }

    #[test]
    fn collect_shape_is_stable() {
        let summary = DistributionSummary::new(vec![0.5, 0.99]);
        let before = summary.collect(&Tags::new());
        summary.record(1.0);
        summary.record(2.0);
        let after = summary.collect(&Tags::new());
        assert_eq!(before.len(), after.len());
        assert_eq!(after.len(), 5);
        assert_eq!(after[0].statistic, Statistic::Count);
        assert_eq!(after[1].statistic, Statistic::Total);
        assert_eq!(after[2].statistic, Statistic::Max);
        assert_eq!(after[3].statistic, Statistic::Value);
        assert_eq!(after[4].statistic, Statistic::Value);
    }
}
