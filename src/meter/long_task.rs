//! The long-task timer tracks tasks that overlap and can outlive any single
//! export pull: batch jobs, replays, long-held connections. Each registered
//! tag combination is its own child with an independent id generator and an
//! independent concurrent task map; children share nothing, so two children
//! under the same family name never contend with each other.
//!
//! No operation here ever fails or blocks beyond a shard-local map operation.
//! Stopping an id that was never started (or was already stopped) returns the
//! `NOT_FOUND` sentinel instead of an error so instrumentation call sites
//! never need existence checks and cannot introduce new failure paths into
//! the code they are measuring.

use std::sync::{atomic, Arc};

use dashmap::DashMap;
use smallvec::smallvec;

use super::{tags_with, Sample, Samples, Statistic};
use crate::clock::Clock;
use crate::tag::Tags;

/// Sentinel returned by [`LongTaskTimer::stop`] and
/// [`LongTaskTimer::duration`] for ids that are not currently active.
pub const NOT_FOUND: i64 = -1;

#[derive(Debug)]
struct ChildInner {
    clock: Arc<dyn Clock>,
    /// Active task id -> monotonic start reading.
    tasks: DashMap<u64, u64>,
    /// Ids are issued strictly increasing and never reused while active. A
    /// u64 will not roll over within any plausible process lifetime.
    next_task: atomic::AtomicU64,
}

/// One child of a long-task timer family: the handle instrumented code calls
/// `start`/`stop` on. Cheap to clone; clones share the same task population.
#[derive(Debug, Clone)]
pub struct LongTaskTimer {
    inner: Arc<ChildInner>,
}

impl LongTaskTimer {
    pub(crate) fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(ChildInner {
                clock,
                tasks: DashMap::new(),
                next_task: atomic::AtomicU64::new(0),
            }),
        }
    }

    /// Begin tracking a new task and return its id. Safe to call from any
    /// number of threads; never waits on an in-progress stop or snapshot.
    pub fn start(&self) -> u64 {
        let task = self.inner.next_task.fetch_add(1, atomic::Ordering::Relaxed);
        self.inner
            .tasks
            .insert(task, self.inner.clock.monotonic_time());
        task
    }

    /// Stop tracking `task` and return its elapsed time in nanoseconds, or
    /// [`NOT_FOUND`] if the id is not active. Removal is atomic, so exactly
    /// one of two racing stops observes the duration.
    pub fn stop(&self, task: u64) -> i64 {
        match self.inner.tasks.remove(&task) {
            Some((_, started)) => (self.inner.clock.monotonic_time() - started) as i64,
            None => NOT_FOUND,
        }
    }

    /// Elapsed time of `task` in nanoseconds without stopping it, or
    /// [`NOT_FOUND`] if the id is not active.
    pub fn duration(&self, task: u64) -> i64 {
        match self.inner.tasks.get(&task) {
            Some(entry) => (self.inner.clock.monotonic_time() - *entry.value()) as i64,
            None => NOT_FOUND,
        }
    }

    /// Number of currently active tasks. Under concurrent start/stop traffic
    /// this reflects some valid interleaving near the read, nothing stronger.
    pub fn active_tasks(&self) -> usize {
        self.inner.tasks.len()
    }

    /// Sum of elapsed time over the active set, in nanoseconds. `now` is read
    /// once, but the set itself can shift while being summed; the result is a
    /// best-effort aggregate, not a transactional snapshot.
    pub fn total_duration(&self) -> i64 {
        let now = self.inner.clock.monotonic_time();
        let mut sum = 0i64;
        for entry in self.inner.tasks.iter() {
            sum += (now - *entry.value()) as i64;
        }
        sum
    }

    /// Exactly two samples per child, in fixed order, each carrying a
    /// synthetic `statistic` tag discriminating which aggregate it is.
    pub(crate) fn collect(&self, tags: &Tags) -> Samples {
        smallvec![
            Sample::new(
                tags_with(tags, "statistic", Statistic::ActiveTasks.tag_value()),
                Statistic::ActiveTasks,
                self.active_tasks() as f64,
            ),
            Sample::new(
                tags_with(tags, "statistic", Statistic::Duration.tag_value()),
                Statistic::Duration,
                self.total_duration() as f64,
            ),
        ]
    }
}
