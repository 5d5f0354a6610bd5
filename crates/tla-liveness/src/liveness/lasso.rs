//! Counterexample extraction
//!
//! A violating SCC is turned into a lasso: a finite prefix from an initial
//! state to a root node of the SCC, followed by a cycle through the SCC that
//! starts and ends at the root and visits a fulfilling node for every promise.
//! Repeating the cycle forever yields a behavior that violates the property.
//!
//! All searches are breadth-first with successors taken in ascending
//! [`NodeId`] order, so the lasso depends only on the graph content.

use crate::error::{LivenessError, LivenessResult};
use crate::liveness::behavior_graph::{BehaviorGraph, NodeId};
use crate::liveness::scc::Scc;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::fmt;
use tracing::debug;

/// A finite prefix followed by a repeating cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lasso<S> {
    /// Initial state up to and including the cycle root
    pub prefix: Vec<S>,
    /// Cycle root, the states of one pass through the cycle, and the root again
    pub cycle: Vec<S>,
}

impl<S> Lasso<S> {
    /// Index of the repeated state within the prefix
    pub fn cycle_start(&self) -> usize {
        self.prefix.len().saturating_sub(1)
    }

    /// Total number of states in prefix and cycle
    pub fn len(&self) -> usize {
        self.prefix.len() + self.cycle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty() && self.cycle.is_empty()
    }

    /// The behavior up to the first return to the cycle root
    pub fn states(&self) -> impl Iterator<Item = &S> {
        self.prefix.iter().chain(self.cycle.iter().skip(1))
    }
}

impl<S: fmt::Display> fmt::Display for Lasso<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut n = 0;
        for state in self.prefix.iter() {
            n += 1;
            let label = if n == 1 { " <Initial predicate>" } else { "" };
            writeln!(f, "State {}:{}", n, label)?;
            writeln!(f, "{}", state)?;
            writeln!(f)?;
        }
        let inner = self.cycle.len().saturating_sub(2);
        for state in self.cycle.iter().skip(1).take(inner) {
            n += 1;
            writeln!(f, "State {}:", n)?;
            writeln!(f, "{}", state)?;
            writeln!(f)?;
        }
        write!(f, "Back to state {}", self.cycle_start() + 1)
    }
}

/// Build a lasso through `scc`.
///
/// Fails with [`LivenessError::UnreachableScc`] when no initial node reaches
/// the SCC or the SCC is not strongly connected.
pub fn extract<S: Clone>(scc: &Scc, graph: &BehaviorGraph<S>) -> LivenessResult<Lasso<S>> {
    let (root, prefix_nodes) = find_prefix(scc, graph)?;
    let cycle_nodes = find_cycle(scc, graph, root)?;
    debug!(
        root,
        prefix = prefix_nodes.len(),
        cycle = cycle_nodes.len(),
        "extracted lasso"
    );
    Ok(Lasso {
        prefix: project(scc, graph, &prefix_nodes)?,
        cycle: project(scc, graph, &cycle_nodes)?,
    })
}

fn sorted_successors<S>(graph: &BehaviorGraph<S>, id: NodeId) -> SmallVec<[NodeId; 8]> {
    let mut succs: SmallVec<[NodeId; 8]> = graph.successors(id).iter().copied().collect();
    succs.sort_unstable();
    succs
}

/// Walk `parents` back from `to` and return the path in forward order.
fn unwind(parents: &FxHashMap<NodeId, NodeId>, to: NodeId) -> Vec<NodeId> {
    let mut path = vec![to];
    let mut current = to;
    while let Some(&parent) = parents.get(&current) {
        path.push(parent);
        current = parent;
    }
    path.reverse();
    path
}

/// Shortest path from any initial node to the first SCC node met.
fn find_prefix<S>(scc: &Scc, graph: &BehaviorGraph<S>) -> LivenessResult<(NodeId, Vec<NodeId>)> {
    let mut roots: Vec<NodeId> = graph.init_nodes().to_vec();
    roots.sort_unstable();

    let mut parents: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let mut seen: FxHashSet<NodeId> = roots.iter().copied().collect();
    let mut queue: VecDeque<NodeId> = roots.into_iter().collect();

    while let Some(v) = queue.pop_front() {
        if scc.contains(v) {
            return Ok((v, unwind(&parents, v)));
        }
        for w in sorted_successors(graph, v) {
            if seen.insert(w) {
                parents.insert(w, v);
                queue.push_back(w);
            }
        }
    }
    Err(LivenessError::unreachable_scc(
        scc.len(),
        "no initial node reaches the component",
    ))
}

/// Shortest path of at least one edge from `from` to a node accepted by
/// `is_target`, staying inside `scc`. The returned path excludes `from`.
fn path_within<S>(
    scc: &Scc,
    graph: &BehaviorGraph<S>,
    from: NodeId,
    is_target: impl Fn(NodeId) -> bool,
) -> Option<Vec<NodeId>> {
    let mut parents: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let mut seen: FxHashSet<NodeId> = FxHashSet::default();
    let mut queue: VecDeque<NodeId> = VecDeque::new();

    for w in sorted_successors(graph, from) {
        if scc.contains(w) && seen.insert(w) {
            queue.push_back(w);
        }
    }
    while let Some(v) = queue.pop_front() {
        if is_target(v) {
            return Some(unwind(&parents, v));
        }
        for w in sorted_successors(graph, v) {
            if scc.contains(w) && seen.insert(w) {
                parents.insert(w, v);
                queue.push_back(w);
            }
        }
    }
    None
}

/// Cycle from `root` back to `root` that fulfills every promise.
///
/// Not the shortest cycle through `root`: that one can miss a promise, and
/// then the lasso would not be a counterexample.
fn find_cycle<S>(scc: &Scc, graph: &BehaviorGraph<S>, root: NodeId) -> LivenessResult<Vec<NodeId>> {
    let tableau = graph.tableau();
    let tableau_idx = |id: NodeId| graph.node(id).key.tableau_idx;
    let mut pending: Vec<usize> = (0..tableau.promise_count())
        .filter(|&p| !tableau.fulfills(tableau_idx(root), p))
        .collect();

    let mut cycle = vec![root];
    let mut current = root;
    while !pending.is_empty() {
        let step = path_within(scc, graph, current, |id| {
            pending.iter().any(|&p| tableau.fulfills(tableau_idx(id), p))
        })
        .ok_or_else(|| {
            LivenessError::unreachable_scc(scc.len(), "promise unreachable within the component")
        })?;
        current = *step.last().unwrap_or(&current);
        pending.retain(|&p| !tableau.fulfills(tableau_idx(current), p));
        cycle.extend(step);
    }

    let back = path_within(scc, graph, current, |id| id == root).ok_or_else(|| {
        LivenessError::unreachable_scc(scc.len(), "no path back to the cycle root")
    })?;
    cycle.extend(back);
    Ok(cycle)
}

fn project<S: Clone>(scc: &Scc, graph: &BehaviorGraph<S>, path: &[NodeId]) -> LivenessResult<Vec<S>> {
    path.iter()
        .map(|&id| {
            graph.state_of(id).cloned().ok_or_else(|| {
                LivenessError::unreachable_scc(scc.len(), format!("no state stored for node {}", id))
            })
        })
        .collect()
}
