use std::sync::{atomic, Arc};

use smallvec::smallvec;

use super::{Sample, Samples, Statistic};
use crate::tag::Tags;

/// A monotonically increasing count of events. Negative increments are
/// silently dropped so the reported value can never go down. The count is
/// cumulative since creation; rate-of-change is the exporter's problem.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    // f64 bits in an AtomicU64, updated with a CAS loop. Counts are doubles
    // so call sites can record fractional amounts (bytes as KiB, etc).
    inner: Arc<atomic::AtomicU64>,
}

impl Counter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.increment_by(1.0);
    }

    pub fn increment_by(&self, amount: f64) {
        // NaN is dropped along with non-positive amounts; one poisoned
        // increment would otherwise stick to the count forever.
        if amount.is_nan() || amount <= 0.0 {
            return;
        }
        let mut current = self.inner.load(atomic::Ordering::Relaxed);
        loop {
            let next = f64::from_bits(current) + amount;
            match self.inner.compare_exchange_weak(
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

    /// The cumulative count since this counter was created.
    pub fn count(&self) -> f64 {
        f64::from_bits(self.inner.load(atomic::Ordering::Relaxed))
    }

    pub(crate) fn collect(&self, tags: &Tags) -> Samples {
        smallvec![Sample::new(tags.clone(), Statistic::Count, self.count())]
    }
}
