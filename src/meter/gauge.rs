use std::fmt;
use std::sync::Arc;

use smallvec::smallvec;

use super::{Sample, Samples, Statistic};
use crate::tag::Tags;

/// An instantaneous value read from a caller-supplied function at collection
/// time. The gauge holds no state of its own; whatever the supplier observes
/// when a snapshot is taken is what gets reported.
#[derive(Clone)]
pub struct Gauge {
    supplier: Arc<dyn Fn() -> f64 + Send + Sync>,
}

impl Gauge {
    pub(crate) fn new(supplier: Arc<dyn Fn() -> f64 + Send + Sync>) -> Self {
        Self { supplier }
    }

    /// Evaluate the supplier now.
    pub fn value(&self) -> f64 {
        (self.supplier)()
    }

    pub(crate) fn collect(&self, tags: &Tags) -> Samples {
        smallvec![Sample::new(tags.clone(), Statistic::Value, self.value())]
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gauge").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[test]
    fn reads_the_supplier_lazily() {
        let state = Arc::new(AtomicI64::new(0));
        let reader = Arc::clone(&state);
        let gauge = Gauge::new(Arc::new(move || reader.load(Ordering::Relaxed) as f64));
        assert_eq!(gauge.value(), 0.0);
        state.store(42, Ordering::Relaxed);
        assert_eq!(gauge.value(), 42.0);
    }

    #[test]
    fn collect_is_a_single_value_sample() {
        let gauge = Gauge::new(Arc::new(|| 7.0));
        let samples = gauge.collect(&Tags::new());
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].statistic, Statistic::Value);
        assert_eq!(samples[0].value, 7.0);
    }
}
