//! Model evaluator interface
//!
//! The liveness engine does not understand the specification language. A
//! [`ModelEvaluator`] produces initial states and successors, fingerprints
//! states, and evaluates the atomic predicates a property mentions.
//!
//! Every call receives an [`EvalContext`]. A context is created by the checker
//! for one run and one thread; it carries the call counters and the predicate
//! memo table that would otherwise be process-global.

use crate::error::EvalResult;
use crate::fingerprint::Fingerprint;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an atomic predicate understood by the evaluator
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PredicateId(pub u32);

impl fmt::Debug for PredicateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl fmt::Display for PredicateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Source of states, transitions and predicate values.
///
/// Implementations must be deterministic: the same state always yields the
/// same successors in the same order. The checker relies on this for
/// reproducible counterexamples.
pub trait ModelEvaluator: Sync {
    /// Concrete state value. Only the evaluator looks inside it.
    type State: Clone + Send + Sync + fmt::Debug;

    /// Fingerprint of a state. Equal states must have equal fingerprints and
    /// distinct states distinct ones.
    fn fingerprint(&self, state: &Self::State) -> Fingerprint;

    /// The (finite) set of initial states.
    fn initial_states(&self, ctx: &mut EvalContext) -> EvalResult<Vec<Self::State>>;

    /// The (finite) set of successors of `state`. May be expensive.
    fn successors(
        &self,
        ctx: &mut EvalContext,
        state: &Self::State,
    ) -> EvalResult<Vec<Self::State>>;

    /// Evaluate an atomic predicate. State predicates receive `next = None`;
    /// action predicates receive the successor state.
    fn evaluate_predicate(
        &self,
        ctx: &mut EvalContext,
        predicate: PredicateId,
        state: &Self::State,
        next: Option<&Self::State>,
    ) -> EvalResult<bool>;
}

/// Counters for evaluator calls made through one context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalStats {
    pub initial_calls: u64,
    pub successor_calls: u64,
    pub predicate_calls: u64,
    pub predicate_cache_hits: u64,
}

type PredicateKey = (PredicateId, Fingerprint, Option<Fingerprint>);

/// Per-run, per-thread evaluation context
#[derive(Debug, Default)]
pub struct EvalContext {
    stats: EvalStats,
    predicate_cache: FxHashMap<PredicateKey, bool>,
    cache_predicates: bool,
}

impl EvalContext {
    /// Create a context that memoizes predicate results
    pub fn new() -> Self {
        Self {
            stats: EvalStats::default(),
            predicate_cache: FxHashMap::default(),
            cache_predicates: true,
        }
    }

    /// Create a context that always calls through to the evaluator
    pub fn uncached() -> Self {
        Self {
            cache_predicates: false,
            ..Self::default()
        }
    }

    pub fn stats(&self) -> EvalStats {
        self.stats
    }

    /// Number of memoized predicate results
    pub fn cached_predicates(&self) -> usize {
        self.predicate_cache.len()
    }

    /// Initial states of `model`, counted.
    pub fn initial_states<M: ModelEvaluator>(&mut self, model: &M) -> EvalResult<Vec<M::State>> {
        self.stats.initial_calls += 1;
        model.initial_states(self)
    }

    /// Successors of `state`, counted.
    pub fn successors<M: ModelEvaluator>(
        &mut self,
        model: &M,
        state: &M::State,
    ) -> EvalResult<Vec<M::State>> {
        self.stats.successor_calls += 1;
        model.successors(self, state)
    }

    /// Evaluate `predicate` on `(state, next)`, memoized by fingerprints.
    pub fn predicate<M: ModelEvaluator>(
        &mut self,
        model: &M,
        predicate: PredicateId,
        state: (Fingerprint, &M::State),
        next: Option<(Fingerprint, &M::State)>,
    ) -> EvalResult<bool> {
        let key = (predicate, state.0, next.map(|(fp, _)| fp));
        if self.cache_predicates {
            if let Some(&value) = self.predicate_cache.get(&key) {
                self.stats.predicate_cache_hits += 1;
                return Ok(value);
            }
        }
        self.stats.predicate_calls += 1;
        let value = model.evaluate_predicate(self, predicate, state.1, next.map(|(_, s)| s))?;
        if self.cache_predicates {
            self.predicate_cache.insert(key, value);
        }
        Ok(value)
    }
}
