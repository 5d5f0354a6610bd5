//! Table-driven model evaluator
//!
//! [`ExplicitModel`] is a [`ModelEvaluator`] over an explicitly enumerated
//! state graph: states are tuples of named integer variables, transitions are
//! listed edge by edge, and predicates are plain closures. It stands in for a
//! real specification front end in tests and benchmarks.
//!
//! # Example
//!
//! ```
//! use tla_liveness::explicit::{ExplicitModel, ExplicitState};
//! use tla_liveness::model::PredicateId;
//!
//! let mut b = ExplicitModel::builder(["x"]);
//! let s0 = b.state([0]);
//! let s1 = b.state([1]);
//! b.initial(s0);
//! b.path(&[s0, s1, s0]);
//! b.state_predicate(PredicateId(0), |s: &ExplicitState| s.get("x") == Some(0));
//! let model = b.build();
//! assert_eq!(model.state_count(), 2);
//! ```

use crate::error::{EvalError, EvalResult};
use crate::fingerprint::Fingerprint;
use crate::model::{EvalContext, ModelEvaluator, PredicateId};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A state of an [`ExplicitModel`]: one integer per variable
#[derive(Clone)]
pub struct ExplicitState {
    names: Arc<[Arc<str>]>,
    values: Arc<[i64]>,
    fingerprint: Fingerprint,
}

impl ExplicitState {
    fn new(names: Arc<[Arc<str>]>, values: Vec<i64>) -> Self {
        let fingerprint = Fingerprint::of_ints(&values);
        Self {
            names,
            values: values.into(),
            fingerprint,
        }
    }

    /// Value of variable `name`
    pub fn get(&self, name: &str) -> Option<i64> {
        self.names
            .iter()
            .position(|n| n.as_ref() == name)
            .map(|i| self.values[i])
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }
}

impl PartialEq for ExplicitState {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Eq for ExplicitState {}

impl Hash for ExplicitState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.values.hash(state);
    }
}

impl fmt::Debug for ExplicitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for ExplicitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.names.iter().zip(self.values.iter()).enumerate() {
            if i > 0 {
                write!(f, " /\\ ")?;
            }
            write!(f, "{} = {}", name, value)?;
        }
        Ok(())
    }
}

/// Handle to a state registered with an [`ExplicitModelBuilder`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StateRef(usize);

type StatePredicate = Arc<dyn Fn(&ExplicitState) -> bool + Send + Sync>;
type ActionPredicate = Arc<dyn Fn(&ExplicitState, &ExplicitState) -> bool + Send + Sync>;

#[derive(Clone)]
enum Predicate {
    State(StatePredicate),
    Action(ActionPredicate),
}

/// Explicitly enumerated state graph
#[derive(Clone)]
pub struct ExplicitModel {
    states: Vec<ExplicitState>,
    by_fingerprint: FxHashMap<Fingerprint, usize>,
    initial: Vec<usize>,
    successors: Vec<Vec<usize>>,
    predicates: FxHashMap<PredicateId, Predicate>,
    failing: FxHashSet<usize>,
}

impl ExplicitModel {
    pub fn builder<N: Into<Arc<str>>>(names: impl IntoIterator<Item = N>) -> ExplicitModelBuilder {
        let names: Vec<Arc<str>> = names.into_iter().map(Into::into).collect();
        ExplicitModelBuilder {
            names: names.into(),
            states: Vec::new(),
            by_values: FxHashMap::default(),
            initial: Vec::new(),
            successors: Vec::new(),
            predicates: FxHashMap::default(),
            failing: FxHashSet::default(),
        }
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn transition_count(&self) -> usize {
        self.successors.iter().map(Vec::len).sum()
    }

    pub fn state(&self, r: StateRef) -> &ExplicitState {
        &self.states[r.0]
    }

    /// Look up a state by its variable values
    pub fn state_by_values(&self, values: &[i64]) -> Option<&ExplicitState> {
        let fp = Fingerprint::of_ints(values);
        self.by_fingerprint.get(&fp).map(|&i| &self.states[i])
    }

    fn index_of(&self, state: &ExplicitState) -> Option<usize> {
        self.by_fingerprint.get(&state.fingerprint).copied()
    }
}

impl fmt::Debug for ExplicitModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplicitModel")
            .field("states", &self.states.len())
            .field("transitions", &self.transition_count())
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

impl ModelEvaluator for ExplicitModel {
    type State = ExplicitState;

    fn fingerprint(&self, state: &ExplicitState) -> Fingerprint {
        state.fingerprint
    }

    fn initial_states(&self, _ctx: &mut EvalContext) -> EvalResult<Vec<ExplicitState>> {
        Ok(self.initial.iter().map(|&i| self.states[i].clone()).collect())
    }

    fn successors(
        &self,
        _ctx: &mut EvalContext,
        state: &ExplicitState,
    ) -> EvalResult<Vec<ExplicitState>> {
        let idx = self
            .index_of(state)
            .ok_or_else(|| EvalError::successors(state.fingerprint, "state not in model"))?;
        if self.failing.contains(&idx) {
            return Err(EvalError::successors(
                state.fingerprint,
                format!("injected failure at {}", state),
            ));
        }
        Ok(self.successors[idx]
            .iter()
            .map(|&i| self.states[i].clone())
            .collect())
    }

    fn evaluate_predicate(
        &self,
        _ctx: &mut EvalContext,
        predicate: PredicateId,
        state: &ExplicitState,
        next: Option<&ExplicitState>,
    ) -> EvalResult<bool> {
        match self.predicates.get(&predicate) {
            None => Err(EvalError::UnknownPredicate(predicate)),
            Some(Predicate::State(f)) => Ok(f(state)),
            Some(Predicate::Action(f)) => match next {
                Some(next) => Ok(f(state, next)),
                None => Err(EvalError::predicate(
                    predicate,
                    state.fingerprint,
                    "action predicate evaluated without a successor state",
                )),
            },
        }
    }
}

/// Builder for [`ExplicitModel`]
pub struct ExplicitModelBuilder {
    names: Arc<[Arc<str>]>,
    states: Vec<ExplicitState>,
    by_values: FxHashMap<Vec<i64>, usize>,
    initial: Vec<usize>,
    successors: Vec<Vec<usize>>,
    predicates: FxHashMap<PredicateId, Predicate>,
    failing: FxHashSet<usize>,
}

impl ExplicitModelBuilder {
    /// Register (or look up) the state with the given variable values.
    ///
    /// # Panics
    ///
    /// Panics if the number of values differs from the number of variables.
    pub fn state(&mut self, values: impl IntoIterator<Item = i64>) -> StateRef {
        let values: Vec<i64> = values.into_iter().collect();
        assert_eq!(
            values.len(),
            self.names.len(),
            "state arity must match the variable list"
        );
        if let Some(&i) = self.by_values.get(&values) {
            return StateRef(i);
        }
        let i = self.states.len();
        self.states
            .push(ExplicitState::new(Arc::clone(&self.names), values.clone()));
        self.successors.push(Vec::new());
        self.by_values.insert(values, i);
        StateRef(i)
    }

    pub fn initial(&mut self, s: StateRef) -> &mut Self {
        if !self.initial.contains(&s.0) {
            self.initial.push(s.0);
        }
        self
    }

    /// Add the transition `from -> to`. Duplicate transitions are ignored.
    pub fn transition(&mut self, from: StateRef, to: StateRef) -> &mut Self {
        let succ = &mut self.successors[from.0];
        if !succ.contains(&to.0) {
            succ.push(to.0);
        }
        self
    }

    /// Add transitions along consecutive states of `path`.
    pub fn path(&mut self, path: &[StateRef]) -> &mut Self {
        for w in path.windows(2) {
            self.transition(w[0], w[1]);
        }
        self
    }

    pub fn state_predicate(
        &mut self,
        id: PredicateId,
        f: impl Fn(&ExplicitState) -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        self.predicates.insert(id, Predicate::State(Arc::new(f)));
        self
    }

    pub fn action_predicate(
        &mut self,
        id: PredicateId,
        f: impl Fn(&ExplicitState, &ExplicitState) -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        self.predicates.insert(id, Predicate::Action(Arc::new(f)));
        self
    }

    /// Make `successors` fail for state `s`.
    pub fn fail_successors(&mut self, s: StateRef) -> &mut Self {
        self.failing.insert(s.0);
        self
    }

    pub fn build(&self) -> ExplicitModel {
        let by_fingerprint = self
            .states
            .iter()
            .enumerate()
            .map(|(i, s)| (s.fingerprint, i))
            .collect();
        ExplicitModel {
            states: self.states.clone(),
            by_fingerprint,
            initial: self.initial.clone(),
            successors: self.successors.clone(),
            predicates: self.predicates.clone(),
            failing: self.failing.clone(),
        }
    }
}
