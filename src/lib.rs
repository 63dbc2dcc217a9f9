//! An in-process metrics instrumentation core. Application code registers
//! named, tagged instruments against a [`Registry`] and records into them;
//! backend exporters pull [`Registry::snapshot`] on their own schedule and
//! render the samples into whatever wire shape their backend wants. Nothing
//! in this crate knows about exposition formats or line protocols.
//!
//! ```
//! use meterkit::{Registry, RegistryError};
//!
//! fn main() -> Result<(), RegistryError> {
//!     let registry = Registry::new();
//!     let requests = registry.counter("http/requests", &[("status", "ok")])?;
//!     requests.increment();
//!
//!     let replays = registry.long_task_timer("replay", &[("shard", "a")])?;
//!     let task = replays.start();
//!     // ... the task can outlive any number of snapshot pulls ...
//!     replays.stop(task);
//!
//!     for snap in registry.snapshot() {
//!         println!("{} [{}] {:?}", snap.id.name, snap.kind, snap.samples);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Design rules that hold everywhere:
//! - Registration is the only operation that can fail, and only on a
//!   configuration conflict (one identity, two kinds; or one exported name,
//!   two tag-key sets). The measurement path never errors, never panics, and
//!   never blocks on anything slower than a map shard.
//! - The naming convention runs once at registration; exported names are
//!   cached, not recomputed per pull.
//! - Durations come from an injected monotonic [`Clock`], never wall time.

pub mod clock;
pub mod meter;
pub mod naming;
pub mod registry;
pub mod tag;

mod utils;

pub use clock::{Clock, MockClock, SystemClock};
pub use meter::{
    Counter, CustomMeter, DistributionSummary, Gauge, LongTaskTimer, Measurement, MeterKind,
    Sample, Samples, Statistic, Timer,
};
pub use meter::NOT_FOUND;
pub use naming::{NamingConvention, SnakeCaseNaming};
pub use registry::{MeterSnapshot, Registry, RegistryError, DEFAULT_REGISTRY};
pub use tag::{MeterId, Tag, Tags};
