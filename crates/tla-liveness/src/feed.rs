//! Discovered-state feed
//!
//! The [`Explorer`] walks the model breadth-first and publishes what it finds
//! to a [`StateFeed`]. Property workers read the feed concurrently:
//!
//! - full states live in a sharded map keyed by fingerprint, so lookups of
//!   unrelated fingerprints never contend;
//! - the event log is append-only; each worker keeps its own cursor and
//!   blocks on a condition variable when it has caught up.
//!
//! A state is always inserted into the map before any event that mentions it
//! is published.

use crate::error::EvalError;
use crate::fingerprint::Fingerprint;
use crate::model::{EvalContext, ModelEvaluator};
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use rustc_hash::{FxHashSet, FxHasher};
use std::collections::VecDeque;
use std::fmt;
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace};

type FxBuildHasher = BuildHasherDefault<FxHasher>;

/// FxHasher-based DashMap for the shared fingerprint -> state table.
type FxDashMap<K, V> = DashMap<K, V, FxBuildHasher>;

/// One entry of the feed log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// A new initial state
    Initial(Fingerprint),
    /// All successors of `source` are known
    Expanded {
        source: Fingerprint,
        successors: Arc<[Fingerprint]>,
    },
}

/// Exploration status as seen by feed readers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    /// More events may follow
    Running,
    /// Every reachable state was expanded
    Exhausted,
    /// Exploration stopped at the state limit
    Truncated { limit: usize },
    /// The model evaluator failed
    Failed(EvalError),
    /// Exploration stopped because nobody was reading
    Cancelled,
}

impl FeedStatus {
    /// Whether no further events will be published
    pub fn is_finished(&self) -> bool {
        !matches!(self, FeedStatus::Running)
    }
}

impl fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedStatus::Running => write!(f, "running"),
            FeedStatus::Exhausted => write!(f, "exhausted"),
            FeedStatus::Truncated { limit } => write!(f, "truncated at {} states", limit),
            FeedStatus::Failed(e) => write!(f, "failed: {}", e),
            FeedStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Events handed to a reader by [`StateFeed::wait_events`]
#[derive(Debug, Clone)]
pub struct FeedBatch {
    pub events: Vec<FeedEvent>,
    /// Feed status when the batch was taken
    pub status: FeedStatus,
}

#[derive(Debug)]
struct FeedLog {
    events: Vec<FeedEvent>,
    status: FeedStatus,
}

/// Append-only feed of discovered states, shared by all property workers
pub struct StateFeed<S> {
    states: FxDashMap<Fingerprint, S>,
    log: Mutex<FeedLog>,
    appended: Condvar,
    consumers: AtomicUsize,
}

impl<S: Clone> Default for StateFeed<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone> StateFeed<S> {
    pub fn new() -> Self {
        Self {
            states: FxDashMap::default(),
            log: Mutex::new(FeedLog {
                events: Vec::new(),
                status: FeedStatus::Running,
            }),
            appended: Condvar::new(),
            consumers: AtomicUsize::new(0),
        }
    }

    /// Store `state`. Returns false if the fingerprint was already known.
    pub fn insert_state(&self, fp: Fingerprint, state: S) -> bool {
        match self.states.entry(fp) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(state);
                true
            }
        }
    }

    pub fn state(&self, fp: Fingerprint) -> Option<S> {
        self.states.get(&fp).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, fp: Fingerprint) -> bool {
        self.states.contains_key(&fp)
    }

    /// Number of distinct states stored
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Append `events` and wake waiting readers.
    ///
    /// Events published after the feed finished are dropped.
    pub fn publish(&self, events: impl IntoIterator<Item = FeedEvent>) {
        let mut log = self.log.lock();
        if log.status.is_finished() {
            return;
        }
        let before = log.events.len();
        log.events.extend(events);
        if log.events.len() > before {
            trace!(published = log.events.len() - before, total = log.events.len(), "feed append");
            self.appended.notify_all();
        }
    }

    /// Mark the feed finished. The first final status wins.
    pub fn finish(&self, status: FeedStatus) {
        let mut log = self.log.lock();
        if log.status.is_finished() {
            return;
        }
        debug!(%status, events = log.events.len(), "feed finished");
        log.status = status;
        self.appended.notify_all();
    }

    pub fn status(&self) -> FeedStatus {
        self.log.lock().status.clone()
    }

    /// Number of events published so far
    pub fn len(&self) -> usize {
        self.log.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block until there are events past `cursor` or the feed is finished,
    /// then return at most `limit` of them.
    ///
    /// An empty batch means the feed is finished and fully read.
    pub fn wait_events(&self, cursor: usize, limit: usize) -> FeedBatch {
        let mut log = self.log.lock();
        while log.events.len() <= cursor && !log.status.is_finished() {
            self.appended.wait(&mut log);
        }
        let start = cursor.min(log.events.len());
        let end = start.saturating_add(limit.max(1)).min(log.events.len());
        FeedBatch {
            events: log.events[start..end].to_vec(),
            status: log.status.clone(),
        }
    }

    /// Register a reader. The explorer stops once every guard is dropped.
    pub fn register_consumer(&self) -> ConsumerGuard<'_, S> {
        self.consumers.fetch_add(1, Ordering::SeqCst);
        ConsumerGuard { feed: self }
    }

    /// Number of live readers
    pub fn consumers(&self) -> usize {
        self.consumers.load(Ordering::SeqCst)
    }
}

impl<S> fmt::Debug for StateFeed<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateFeed")
            .field("states", &self.states.len())
            .field("log", &*self.log.lock())
            .field("consumers", &self.consumers.load(Ordering::SeqCst))
            .finish()
    }
}

/// Registration of one feed reader; dropping it unregisters the reader
pub struct ConsumerGuard<'f, S> {
    feed: &'f StateFeed<S>,
}

impl<S> Drop for ConsumerGuard<'_, S> {
    fn drop(&mut self) {
        self.feed.consumers.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<S> fmt::Debug for ConsumerGuard<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerGuard").finish_non_exhaustive()
    }
}

/// Options for [`Explorer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplorerConfig {
    /// Add a stuttering step to every state
    pub stuttering: bool,
    /// Maximum number of distinct states
    pub max_states: Option<usize>,
    /// Expanded states per published batch
    pub batch: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            stuttering: false,
            max_states: None,
            batch: 256,
        }
    }
}

/// Finishes the feed as cancelled if exploration unwinds.
struct FinishOnDrop<'f, S: Clone>(&'f StateFeed<S>);

impl<S: Clone> Drop for FinishOnDrop<'_, S> {
    fn drop(&mut self) {
        self.0.finish(FeedStatus::Cancelled);
    }
}

/// Breadth-first explorer that fills a [`StateFeed`]
pub struct Explorer<'a, M: ModelEvaluator> {
    model: &'a M,
    feed: &'a StateFeed<M::State>,
    config: ExplorerConfig,
}

impl<'a, M: ModelEvaluator> Explorer<'a, M> {
    pub fn new(model: &'a M, feed: &'a StateFeed<M::State>, config: ExplorerConfig) -> Self {
        Self {
            model,
            feed,
            config,
        }
    }

    /// Explore until the state space is exhausted, the state limit is hit,
    /// the evaluator fails, or no reader is left. Returns the final status,
    /// which is also recorded in the feed.
    pub fn run(&self, ctx: &mut EvalContext) -> FeedStatus {
        let _finish = FinishOnDrop(self.feed);
        let status = self.explore(ctx);
        self.feed.finish(status.clone());
        info!(
            states = self.feed.state_count(),
            events = self.feed.len(),
            %status,
            "exploration finished"
        );
        status
    }

    fn explore(&self, ctx: &mut EvalContext) -> FeedStatus {
        let initial = match ctx.initial_states(self.model) {
            Ok(states) => states,
            Err(e) => return FeedStatus::Failed(e),
        };
        let initial: Vec<(Fingerprint, M::State)> = initial
            .into_iter()
            .map(|s| (self.model.fingerprint(&s), s))
            .collect();
        if let Some(limit) = self.over_limit(&initial) {
            return FeedStatus::Truncated { limit };
        }

        let mut queue: VecDeque<(Fingerprint, M::State)> = VecDeque::new();
        let mut events = Vec::new();
        for (fp, state) in initial {
            if self.feed.insert_state(fp, state.clone()) {
                events.push(FeedEvent::Initial(fp));
                queue.push_back((fp, state));
            }
        }
        self.feed.publish(events.drain(..));

        let batch = self.config.batch.max(1);
        while let Some((fp, state)) = queue.pop_front() {
            if self.feed.consumers() == 0 {
                self.feed.publish(events.drain(..));
                return FeedStatus::Cancelled;
            }
            let successors = match ctx.successors(self.model, &state) {
                Ok(succs) => succs,
                Err(e) => {
                    self.feed.publish(events.drain(..));
                    return FeedStatus::Failed(e);
                }
            };

            let mut seen = FxHashSet::default();
            let mut entries: Vec<(Fingerprint, M::State)> = Vec::with_capacity(successors.len() + 1);
            for succ in successors {
                let succ_fp = self.model.fingerprint(&succ);
                if seen.insert(succ_fp) {
                    entries.push((succ_fp, succ));
                }
            }
            if self.config.stuttering && seen.insert(fp) {
                entries.push((fp, state));
            }

            if let Some(limit) = self.over_limit(&entries) {
                self.feed.publish(events.drain(..));
                return FeedStatus::Truncated { limit };
            }
            let mut fps = Vec::with_capacity(entries.len());
            for (succ_fp, succ) in entries {
                fps.push(succ_fp);
                if self.feed.insert_state(succ_fp, succ.clone()) {
                    queue.push_back((succ_fp, succ));
                }
            }
            events.push(FeedEvent::Expanded {
                source: fp,
                successors: fps.into(),
            });
            if events.len() >= batch {
                self.feed.publish(events.drain(..));
                debug!(
                    states = self.feed.state_count(),
                    queue = queue.len(),
                    "exploration progress"
                );
            }
        }
        self.feed.publish(events.drain(..));
        FeedStatus::Exhausted
    }

    /// The state limit, if storing `entries` would exceed it
    fn over_limit(&self, entries: &[(Fingerprint, M::State)]) -> Option<usize> {
        let limit = self.config.max_states?;
        let fresh: FxHashSet<Fingerprint> = entries
            .iter()
            .map(|(fp, _)| *fp)
            .filter(|fp| !self.feed.contains(*fp))
            .collect();
        (self.feed.state_count() + fresh.len() > limit).then_some(limit)
    }
}
