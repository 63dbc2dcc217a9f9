use std::sync::{atomic, Arc};
use std::time::{Duration, Instant};

use smallvec::smallvec;

use super::window::SampleWindow;
use super::{tags_with, Sample, Samples, Statistic};
use crate::tag::Tags;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

#[derive(Debug)]
struct TimerInner {
    count: atomic::AtomicU64,
    total_nanos: atomic::AtomicU64,
    max_nanos: atomic::AtomicU64,
    quantiles: Vec<f64>,
    window: Option<SampleWindow>,
}

/// Records durations of short-lived events. Callers time the event themselves
/// (or use [`Timer::time`]) and hand the finished duration over; nothing here
/// ever blocks beyond a couple of relaxed atomic updates, except when declared
/// quantiles route the observation through the sample window's mutex.
///
/// Exported time values are in seconds, matching the `_duration_seconds` name
/// suffix the default convention applies.
#[derive(Debug, Clone)]
pub struct Timer {
    inner: Arc<TimerInner>,
}

impl Timer {
    pub(crate) fn new(quantiles: Vec<f64>) -> Self {
        let window = if quantiles.is_empty() {
            None
        } else {
            Some(SampleWindow::new())
        };
        Self {
            inner: Arc::new(TimerInner {
                count: atomic::AtomicU64::new(0),
                total_nanos: atomic::AtomicU64::new(0),
                max_nanos: atomic::AtomicU64::new(0),
                quantiles,
                window,
            }),
        }
    }

    pub fn record(&self, duration: Duration) {
        self.record_nanos(duration.as_nanos() as u64);
    }

    pub fn record_nanos(&self, nanos: u64) {
        self.inner.count.fetch_add(1, atomic::Ordering::Relaxed);
        self.inner
            .total_nanos
            .fetch_add(nanos, atomic::Ordering::Relaxed);
        self.inner
            .max_nanos
            .fetch_max(nanos, atomic::Ordering::Relaxed);
        if let Some(window) = &self.inner.window {
            window.record(nanos as f64 / NANOS_PER_SEC);
        }
    }

    /// Time a closure and record its duration.
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        let started = Instant::now();
        let out = f();
        self.record(started.elapsed());
        out
    }

    pub fn count(&self) -> u64 {
        self.inner.count.load(atomic::Ordering::Relaxed)
    }

    pub fn total_time_seconds(&self) -> f64 {
        self.inner.total_nanos.load(atomic::Ordering::Relaxed) as f64 / NANOS_PER_SEC
    }

    pub fn max_seconds(&self) -> f64 {
        self.inner.max_nanos.load(atomic::Ordering::Relaxed) as f64 / NANOS_PER_SEC
    }

    pub(crate) fn collect(&self, tags: &Tags) -> Samples {
        let mut samples: Samples = smallvec![
            Sample::new(tags.clone(), Statistic::Count, self.count() as f64),
            Sample::new(tags.clone(), Statistic::TotalTime, self.total_time_seconds()),
            Sample::new(tags.clone(), Statistic::Max, self.max_seconds()),
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
        let timer = Timer::new(Vec::new());
        timer.record(Duration::from_millis(250));
        timer.record(Duration::from_millis(750));
        assert_eq!(timer.count(), 2);
        assert_eq!(timer.total_time_seconds(), 1.0);
        assert_eq!(timer.max_seconds(), 0.75);
    }

    #[test]
    fn time_runs_the_closure() {
        let timer = Timer::new(Vec::new());
        let out = timer.time(|| 7);
        assert_eq!(out, 7);
        assert_eq!(timer.count(), 1);
    }

    #[test]
    fn collect_shape_is_stable_without_quantiles() {
        let timer = Timer::new(Vec::new());
        let tags = Tags::new();
        assert_eq!(timer.collect(&tags).len(), 3);
        timer.record(Duration::from_secs(1));
        let samples = timer.collect(&tags);
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].statistic, Statistic::Count);
        assert_eq!(samples[1].statistic, Statistic::TotalTime);
        assert_eq!(samples[2].statistic, Statistic::Max);
    }

    #[test]
    fn quantiles_are_extra_tagged_samples() {
        let timer = Timer::new(vec![0.5]);
        for ms in [100u64, 200, 300] {
            timer.record(Duration::from_millis(ms));
        }
        let samples = timer.collect(&Tags::new());
        assert_eq!(samples.len(), 4);
        let q = &samples[3];
        assert_eq!(q.statistic, Statistic::Value);
        let tag = q.tags.iter().next().unwrap();
        assert_eq!((tag.key(), tag.value()), ("quantile", "0.5"));
        assert_eq!(q.value, 0.2);
    }
}
