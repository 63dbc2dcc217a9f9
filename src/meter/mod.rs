//! The instrument kinds and the shared measurement contract. The kind set is
//! closed and known at design time, so meters are a sum type rather than an
//! open trait hierarchy: every registered meter is one [`MeterImpl`] variant,
//! and every variant answers a single `collect` capability producing a
//! fixed-cardinality, fixed-order list of samples.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::tag::{Tag, Tags};

pub(crate) mod counter;
pub(crate) mod gauge;
pub(crate) mod long_task;
pub(crate) mod summary;
pub(crate) mod timer;
pub(crate) mod window;

pub use counter::Counter;
pub use gauge::Gauge;
pub use long_task::{LongTaskTimer, NOT_FOUND};
pub use summary::DistributionSummary;
pub use timer::Timer;

/// The closed set of instrument kinds. Custom meters that emit samples shaped
/// like one of the standard kinds without the matching API register as that
/// kind; everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeterKind {
    Counter,
    Gauge,
    LongTaskTimer,
    Timer,
    DistributionSummary,
    Other,
}

impl fmt::Display for MeterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MeterKind::Counter => "counter",
            MeterKind::Gauge => "gauge",
            MeterKind::LongTaskTimer => "long_task_timer",
            MeterKind::Timer => "timer",
            MeterKind::DistributionSummary => "distribution_summary",
            MeterKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// What a single sample's number means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    Count,
    Total,
    TotalTime,
    Max,
    Value,
    ActiveTasks,
    Duration,
}

impl Statistic {
    /// The value used for the synthetic `statistic` discriminator tag on
    /// long-task-timer samples.
    pub fn tag_value(&self) -> &'static str {
        match self {
            Statistic::Count => "count",
            Statistic::Total => "total",
            Statistic::TotalTime => "totalTime",
            Statistic::Max => "max",
            Statistic::Value => "value",
            Statistic::ActiveTasks => "activeTasks",
            Statistic::Duration => "duration",
        }
    }
}

/// One exported number: the tags it is keyed by (the meter's own tags, plus
/// any synthetic discriminator such as `statistic` or `quantile`), what the
/// number means, and the number itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub tags: Tags,
    pub statistic: Statistic,
    pub value: f64,
}

impl Sample {
    pub(crate) fn new(tags: Tags, statistic: Statistic, value: f64) -> Self {
        Self {
            tags,
            statistic,
            value,
        }
    }
}

/// The fixed-order sample list a meter produces on collection.
pub type Samples = SmallVec<[Sample; 4]>;

/// A deferred measurement for custom meters: the statistic kind plus a
/// supplier evaluated at collection time.
#[derive(Clone)]
pub struct Measurement {
    statistic: Statistic,
    supplier: Arc<dyn Fn() -> f64 + Send + Sync>,
}

impl Measurement {
    pub fn new(statistic: Statistic, supplier: impl Fn() -> f64 + Send + Sync + 'static) -> Self {
        Self {
            statistic,
            supplier: Arc::new(supplier),
        }
    }
}

impl fmt::Debug for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Measurement")
            .field("statistic", &self.statistic)
            .finish_non_exhaustive()
    }
}

/// A custom meter: a fixed, caller-supplied list of measurements collected
/// under the meter's own tags. The list's length and order never change after
/// registration.
#[derive(Debug, Clone)]
pub struct CustomMeter {
    measurements: Arc<Vec<Measurement>>,
}

impl CustomMeter {
    pub(crate) fn new(measurements: Vec<Measurement>) -> Self {
        Self {
            measurements: Arc::new(measurements),
        }
    }

    pub(crate) fn collect(&self, tags: &Tags) -> Samples {
        self.measurements
            .iter()
            .map(|m| Sample::new(tags.clone(), m.statistic, (m.supplier)()))
            .collect()
    }
}

/// The per-registry-entry instrument storage. Kind checks at re-registration
/// time match on this, no downcasting involved.
#[derive(Debug, Clone)]
pub(crate) enum MeterImpl {
    Counter(Counter),
    Gauge(Gauge),
    Timer(Timer),
    LongTaskTimer(LongTaskTimer),
    DistributionSummary(DistributionSummary),
    Custom(CustomMeter),
}

impl MeterImpl {
    pub(crate) fn collect(&self, tags: &Tags) -> Samples {
        match self {
            MeterImpl::Counter(c) => c.collect(tags),
            MeterImpl::Gauge(g) => g.collect(tags),
            MeterImpl::Timer(t) => t.collect(tags),
            MeterImpl::LongTaskTimer(t) => t.collect(tags),
            MeterImpl::DistributionSummary(s) => s.collect(tags),
            MeterImpl::Custom(c) => c.collect(tags),
        }
    }
}

/// Append a synthetic discriminator tag to a meter's own tags.
pub(crate) fn tags_with(tags: &Tags, key: &str, value: &str) -> Tags {
    let mut out = tags.clone();
    out.push(Tag::new(key, value));
    out
}
