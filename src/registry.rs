//! The registry is the single entry point instrumented code uses to obtain an
//! instrument. Registration is the heavyweight step: the naming convention
//! runs, tags are normalized and deduplicated, and the identity is checked
//! against everything registered before. We expect call sites to register
//! once and cache the returned handle, so the hot path is the instrument
//! itself, not the registry; repeat registrations of the same identity are
//! cheap, side-effect-free clones of the existing handle.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use twox_hash::XxHash64;

use crate::clock::{Clock, SystemClock};
use crate::meter::{
    Counter, CustomMeter, DistributionSummary, Gauge, LongTaskTimer, Measurement, MeterImpl,
    MeterKind, Samples, Timer,
};
use crate::naming::{NamingConvention, SnakeCaseNaming};
use crate::tag::{MeterId, Tag, Tags};
use crate::utils::BuildMidHasher;

/// Process-wide registry, initialized on first access and alive until process
/// exit. Libraries should prefer taking a `&Registry` so they stay testable;
/// this exists for application code that wants ambient registration.
pub static DEFAULT_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

const MID_SEED: u64 = 0xdeadbeef;

/// Registration failures. These are configuration bugs and the only raising
/// paths in the crate; nothing on the measurement path ever returns an error.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The same identity was registered under two different instrument kinds.
    #[error("meter '{name}' is already registered as a {existing}, cannot re-register it as a {requested}")]
    KindConflict {
        name: String,
        existing: MeterKind,
        requested: MeterKind,
    },
    /// Two registrations normalize to the same backend identifier but carry
    /// different tag keys, which label-based backends reject.
    #[error("meter '{name}' is already registered with tag keys {existing:?}, cannot re-register it with tag keys {requested:?}")]
    TagKeyConflict {
        name: String,
        existing: Vec<String>,
        requested: Vec<String>,
    },
    /// One identity, one kind, but two different implementations: a standard
    /// instrument on one side and a custom measurement list on the other, so
    /// the requested handle type cannot be returned.
    #[error("meter '{name}' is already registered as a {kind} with a different implementation (custom vs standard), cannot return the requested handle")]
    ImplementationConflict { name: String, kind: MeterKind },
}

/// One registry entry: the convention-applied identity, the declared kind,
/// and the instrument itself. Kind and identity never change after creation.
struct RegisteredMeter {
    id: MeterId,
    kind: MeterKind,
    description: Option<String>,
    meter: MeterImpl,
}

/// Per-family shape, keyed by convention-applied name. Enforces that every
/// identity sharing one exported name agrees on kind and tag keys.
struct FamilyShape {
    kind: MeterKind,
    tag_keys: Vec<String>,
}

/// Consistency tables consulted on first registration of an identity.
struct ShapeTables {
    /// Convention-applied name -> family shape.
    families: HashMap<String, FamilyShape>,
    /// Raw name -> declared kind. One raw name never registers under two
    /// kinds, even when the convention would give the two kinds distinct
    /// exported names (a raw `m` timer exports as `m_duration_seconds`, but
    /// re-registering raw `m` as a counter is still a configuration bug).
    raw_kinds: HashMap<String, MeterKind>,
}

/// A read-only, point-in-time view of one meter, produced by
/// [`Registry::snapshot`]. Backend exporters render these into their own wire
/// format; nothing here knows about any particular backend.
#[derive(Debug, Clone)]
pub struct MeterSnapshot {
    pub id: MeterId,
    pub kind: MeterKind,
    pub description: Option<String>,
    pub samples: Samples,
}

pub struct Registry {
    convention: Box<dyn NamingConvention>,
    clock: Arc<dyn Clock>,
    /// mid -> meter. The mid is a seeded hash of the convention-applied
    /// identity, so raw spellings that normalize to the same exported series
    /// resolve to the same entry, and the map skips rehashing via
    /// [`BuildMidHasher`]. Writes only happen on first registration of an
    /// identity; everything else is a read.
    meters: RwLock<HashMap<u64, Arc<RegisteredMeter>, BuildMidHasher>>,
    shapes: Mutex<ShapeTables>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// A registry driven by the given clock. Tests hand in a
    /// [`crate::clock::MockClock`] here to make long-task durations exact.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_convention(Box::new(SnakeCaseNaming), clock)
    }

    pub fn with_convention(convention: Box<dyn NamingConvention>, clock: Arc<dyn Clock>) -> Self {
        Self {
            convention,
            clock,
            meters: RwLock::new(HashMap::with_hasher(BuildMidHasher)),
            shapes: Mutex::new(ShapeTables {
                families: HashMap::new(),
                raw_kinds: HashMap::new(),
            }),
        }
    }

    /// The identity hash keying the meter map: a seeded hash over the
    /// convention-applied name and the key-sorted normalized tag pairs, so
    /// neither tag listing order nor the raw spelling of a name produces a
    /// distinct identity.
    fn mid(name: &str, tags: &Tags) -> u64 {
        let mut hasher = XxHash64::with_seed(MID_SEED);
        name.hash(&mut hasher);
        for tag in tags.sorted() {
            tag.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Number of meters currently registered.
    pub fn meter_count(&self) -> usize {
        self.meters.read().len()
    }

    pub fn counter(&self, name: &str, tags: &[(&str, &str)]) -> Result<Counter, RegistryError> {
        self.counter_builder(name).tags(tags).register()
    }

    pub fn counter_builder<'a>(&'a self, name: &'a str) -> CounterBuilder<'a> {
        CounterBuilder {
            common: BuilderCommon::new(self, name),
        }
    }

    pub fn gauge(
        &self,
        name: &str,
        tags: &[(&str, &str)],
        supplier: impl Fn() -> f64 + Send + Sync + 'static,
    ) -> Result<Gauge, RegistryError> {
        self.gauge_builder(name, supplier).tags(tags).register()
    }

    pub fn gauge_builder<'a>(
        &'a self,
        name: &'a str,
        supplier: impl Fn() -> f64 + Send + Sync + 'static,
    ) -> GaugeBuilder<'a> {
        GaugeBuilder {
            common: BuilderCommon::new(self, name),
            supplier: Arc::new(supplier),
        }
    }

    pub fn timer(&self, name: &str, tags: &[(&str, &str)]) -> Result<Timer, RegistryError> {
        self.timer_builder(name).tags(tags).register()
    }

    pub fn timer_builder<'a>(&'a self, name: &'a str) -> TimerBuilder<'a> {
        TimerBuilder {
            common: BuilderCommon::new(self, name),
            quantiles: Vec::new(),
        }
    }

    pub fn long_task_timer(
        &self,
        name: &str,
        tags: &[(&str, &str)],
    ) -> Result<LongTaskTimer, RegistryError> {
        self.long_task_timer_builder(name).tags(tags).register()
    }

    pub fn long_task_timer_builder<'a>(&'a self, name: &'a str) -> LongTaskTimerBuilder<'a> {
        LongTaskTimerBuilder {
            common: BuilderCommon::new(self, name),
        }
    }

    pub fn summary(
        &self,
        name: &str,
        tags: &[(&str, &str)],
    ) -> Result<DistributionSummary, RegistryError> {
        self.summary_builder(name).tags(tags).register()
    }

    pub fn summary_builder<'a>(&'a self, name: &'a str) -> SummaryBuilder<'a> {
        SummaryBuilder {
            common: BuilderCommon::new(self, name),
            base_unit: None,
            quantiles: Vec::new(),
        }
    }

    /// Register a custom meter: a caller-supplied, fixed list of measurements
    /// exported under an explicitly declared kind. For structures that emit
    /// samples shaped like a standard instrument without having its API.
    pub fn register_custom(
        &self,
        name: &str,
        tags: &[(&str, &str)],
        kind: MeterKind,
        measurements: Vec<Measurement>,
    ) -> Result<CustomMeter, RegistryError> {
        let registered = self.register(
            name,
            kind,
            Tags::from_pairs(tags),
            None,
            None,
            |_| MeterImpl::Custom(CustomMeter::new(measurements)),
        )?;
        match &registered.meter {
            MeterImpl::Custom(custom) => Ok(custom.clone()),
            _ => Err(self.impl_conflict(&registered, kind)),
        }
    }

    /// Produce a point-in-time enumeration of every registered meter, sorted
    /// by exported name then tags for stable output. Handles are cloned out
    /// under the read lock and measured afterwards, so collection cost never
    /// holds up registration of new identities.
    pub fn snapshot(&self) -> Vec<MeterSnapshot> {
        let handles: Vec<Arc<RegisteredMeter>> = {
            let meters = self.meters.read();
            meters.values().cloned().collect()
        };
        let mut snapshots: Vec<MeterSnapshot> = handles
            .iter()
            .map(|m| MeterSnapshot {
                id: m.id.clone(),
                kind: m.kind,
                description: m.description.clone(),
                samples: m.meter.collect(&m.id.tags),
            })
            .collect();
        snapshots.sort_by(|a, b| {
            (&a.id.name, a.id.tags.sorted()).cmp(&(&b.id.name, b.id.tags.sorted()))
        });
        snapshots
    }

    fn kind_conflict(&self, existing: &RegisteredMeter, requested: MeterKind) -> RegistryError {
        let err = RegistryError::KindConflict {
            name: existing.id.name.clone(),
            existing: existing.kind,
            requested,
        };
        tracing::error!(name = %existing.id.name, %err, "meter registration conflict");
        err
    }

    /// The declared kinds agree but the stored implementation is the wrong
    /// shape for the requested handle: a custom meter where a standard
    /// instrument was asked for, or the other way around.
    fn impl_conflict(&self, existing: &RegisteredMeter, requested: MeterKind) -> RegistryError {
        let err = RegistryError::ImplementationConflict {
            name: existing.id.name.clone(),
            kind: requested,
        };
        tracing::error!(name = %existing.id.name, %err, "meter registration conflict");
        err
    }

    /// The registration protocol. Exactly one meter is ever retained per
    /// identity; concurrent first registrations race on the write lock and
    /// every caller gets a handle to the single winner.
    fn register(
        &self,
        raw_name: &str,
        kind: MeterKind,
        raw_tags: Tags,
        description: Option<String>,
        base_unit: Option<&str>,
        build: impl FnOnce(&Arc<dyn Clock>) -> MeterImpl,
    ) -> Result<Arc<RegisteredMeter>, RegistryError> {
        // The convention runs up front and the exported identity is the dedup
        // key: `queue.depth` and `queueDepth` are the same counter, and a
        // backend never sees two series under one identifier.
        let name = self.convention.name(raw_name, kind, base_unit);
        let tags: Tags = raw_tags
            .iter()
            .map(|t| Tag::new(self.convention.tag_key(t.key()), t.value()))
            .collect();
        let mid = Self::mid(&name, &tags);

        // Fast path: already registered.
        {
            let meters = self.meters.read();
            if let Some(existing) = meters.get(&mid) {
                if existing.kind == kind {
                    return Ok(Arc::clone(existing));
                }
                return Err(self.kind_conflict(existing, kind));
            }
        }

        let mut tag_keys: Vec<String> = tags.keys().map(String::from).collect();
        tag_keys.sort_unstable();

        let mut meters = self.meters.write();
        match meters.entry(mid) {
            Entry::Occupied(entry) => {
                let existing = entry.get();
                if existing.kind == kind {
                    Ok(Arc::clone(existing))
                } else {
                    Err(self.kind_conflict(existing, kind))
                }
            }
            Entry::Vacant(entry) => {
                {
                    let mut shapes = self.shapes.lock();
                    if let Some(&existing_kind) = shapes.raw_kinds.get(raw_name) {
                        if existing_kind != kind {
                            let err = RegistryError::KindConflict {
                                name: raw_name.to_string(),
                                existing: existing_kind,
                                requested: kind,
                            };
                            tracing::error!(name = %raw_name, %err, "meter registration conflict");
                            return Err(err);
                        }
                    }
                    match shapes.families.entry(name.clone()) {
                        Entry::Occupied(family) => {
                            let shape = family.get();
                            if shape.kind != kind {
                                let err = RegistryError::KindConflict {
                                    name: name.clone(),
                                    existing: shape.kind,
                                    requested: kind,
                                };
                                tracing::error!(name = %name, %err, "meter registration conflict");
                                return Err(err);
                            }
                            if shape.tag_keys != tag_keys {
                                let err = RegistryError::TagKeyConflict {
                                    name: name.clone(),
                                    existing: shape.tag_keys.clone(),
                                    requested: tag_keys,
                                };
                                tracing::error!(name = %name, %err, "meter registration conflict");
                                return Err(err);
                            }
                        }
                        Entry::Vacant(family) => {
                            family.insert(FamilyShape {
                                kind,
                                tag_keys,
                            });
                        }
                    }
                    shapes.raw_kinds.insert(raw_name.to_string(), kind);
                }
                let registered = Arc::new(RegisteredMeter {
                    id: MeterId::new(name, tags),
                    kind,
                    description,
                    meter: build(&self.clock),
                });
                tracing::debug!(name = %registered.id.name, kind = %kind, "registered meter");
                Ok(Arc::clone(entry.insert(registered)))
            }
        }
    }
}

/// Fields every builder carries: the registry, the raw name, fixed tags, and
/// optional help text.
struct BuilderCommon<'a> {
    registry: &'a Registry,
    name: &'a str,
    tags: Tags,
    description: Option<String>,
}

impl<'a> BuilderCommon<'a> {
    fn new(registry: &'a Registry, name: &'a str) -> Self {
        Self {
            registry,
            name,
            tags: Tags::new(),
            description: None,
        }
    }

    fn tags(&mut self, tags: &[(&str, &str)]) {
        for (k, v) in tags {
            self.tags.push(Tag::new(*k, *v));
        }
    }
}

macro_rules! builder_common_methods {
    () => {
        /// Append fixed tags. Duplicate keys overwrite, last write wins.
        pub fn tags(mut self, tags: &[(&str, &str)]) -> Self {
            self.common.tags(tags);
            self
        }

        pub fn tag(mut self, key: &str, value: &str) -> Self {
            self.common.tags.push(Tag::new(key, value));
            self
        }

        /// Help text surfaced to exporters alongside the samples.
        pub fn description(mut self, description: impl Into<String>) -> Self {
            self.common.description = Some(description.into());
            self
        }
    };
}

pub struct CounterBuilder<'a> {
    common: BuilderCommon<'a>,
}

impl CounterBuilder<'_> {
    builder_common_methods!();

    pub fn register(self) -> Result<Counter, RegistryError> {
        let registered = self.common.registry.register(
            self.common.name,
            MeterKind::Counter,
            self.common.tags,
            self.common.description,
            None,
            |_| MeterImpl::Counter(Counter::new()),
        )?;
        match &registered.meter {
            MeterImpl::Counter(counter) => Ok(counter.clone()),
            _ => Err(self
                .common
                .registry
                .impl_conflict(&registered, MeterKind::Counter)),
        }
    }
}

pub struct GaugeBuilder<'a> {
    common: BuilderCommon<'a>,
    supplier: Arc<dyn Fn() -> f64 + Send + Sync>,
}

impl GaugeBuilder<'_> {
    builder_common_methods!();

    /// Registering a gauge under an identity that already has one returns the
    /// existing gauge; the new supplier is dropped.
    pub fn register(self) -> Result<Gauge, RegistryError> {
        let supplier = self.supplier;
        let registered = self.common.registry.register(
            self.common.name,
            MeterKind::Gauge,
            self.common.tags,
            self.common.description,
            None,
            move |_| MeterImpl::Gauge(Gauge::new(supplier)),
        )?;
        match &registered.meter {
            MeterImpl::Gauge(gauge) => Ok(gauge.clone()),
            _ => Err(self
                .common
                .registry
                .impl_conflict(&registered, MeterKind::Gauge)),
        }
    }
}

pub struct TimerBuilder<'a> {
    common: BuilderCommon<'a>,
    quantiles: Vec<f64>,
}

impl TimerBuilder<'_> {
    builder_common_methods!();

    /// Request additional per-quantile samples, each tagged with a `quantile`
    /// key, alongside the count/total/max statistics.
    pub fn quantiles(mut self, quantiles: &[f64]) -> Self {
        self.quantiles = quantiles.to_vec();
        self
    }

    pub fn register(self) -> Result<Timer, RegistryError> {
        let quantiles = self.quantiles;
        let registered = self.common.registry.register(
            self.common.name,
            MeterKind::Timer,
            self.common.tags,
            self.common.description,
            None,
            move |_| MeterImpl::Timer(Timer::new(quantiles)),
        )?;
        match &registered.meter {
            MeterImpl::Timer(timer) => Ok(timer.clone()),
            _ => Err(self
                .common
                .registry
                .impl_conflict(&registered, MeterKind::Timer)),
        }
    }
}

pub struct LongTaskTimerBuilder<'a> {
    common: BuilderCommon<'a>,
}

impl LongTaskTimerBuilder<'_> {
    builder_common_methods!();

    pub fn register(self) -> Result<LongTaskTimer, RegistryError> {
        let registered = self.common.registry.register(
            self.common.name,
            MeterKind::LongTaskTimer,
            self.common.tags,
            self.common.description,
            None,
            |clock| MeterImpl::LongTaskTimer(LongTaskTimer::new(Arc::clone(clock))),
        )?;
        match &registered.meter {
            MeterImpl::LongTaskTimer(timer) => Ok(timer.clone()),
            _ => Err(self
                .common
                .registry
                .impl_conflict(&registered, MeterKind::LongTaskTimer)),
        }
    }
}

pub struct SummaryBuilder<'a> {
    common: BuilderCommon<'a>,
    base_unit: Option<String>,
    quantiles: Vec<f64>,
}

impl SummaryBuilder<'_> {
    builder_common_methods!();

    /// Declared unit of recorded amounts; appended to the exported name by
    /// the naming convention.
    pub fn base_unit(mut self, unit: impl Into<String>) -> Self {
        self.base_unit = Some(unit.into());
        self
    }

    pub fn quantiles(mut self, quantiles: &[f64]) -> Self {
        self.quantiles = quantiles.to_vec();
        self
    }

    pub fn register(self) -> Result<DistributionSummary, RegistryError> {
        let quantiles = self.quantiles;
        let registered = self.common.registry.register(
            self.common.name,
            MeterKind::DistributionSummary,
            self.common.tags,
            self.common.description,
            self.base_unit.as_deref(),
            move |_| MeterImpl::DistributionSummary(DistributionSummary::new(quantiles)),
        )?;
        match &registered.meter {
            MeterImpl::DistributionSummary(summary) => Ok(summary.clone()),
            _ => Err(self
                .common
                .registry
                .impl_conflict(&registered, MeterKind::DistributionSummary)),
        }
    }
}
