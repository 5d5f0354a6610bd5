//! Bad-cycle detection over the behavior graph
//!
//! Strongly connected components are computed with Tarjan's algorithm,
//! starting from the initial product nodes so that every component found is
//! reachable. The traversal keeps an explicit stack; behavior graphs of real
//! models are far deeper than the thread stack allows for recursion.
//!
//! An SCC is violating when it is nontrivial (more than one node, or a single
//! node with a self-loop) and every promise of the tableau is fulfilled by at
//! least one of its nodes. A behavior that stays in such an SCC forever visits
//! each fulfilling node infinitely often, so it satisfies the negated property.

use crate::liveness::behavior_graph::{GraphView, NodeId};
use rustc_hash::FxHashMap;
use std::fmt;
use tracing::{debug, trace};

/// A strongly connected component, node ids sorted ascending
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scc {
    nodes: Vec<NodeId>,
}

impl Scc {
    pub fn new(mut nodes: Vec<NodeId>) -> Self {
        nodes.sort_unstable();
        nodes.dedup();
        Self { nodes }
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.binary_search(&id).is_ok()
    }

    /// Smallest node id, used to order SCCs
    pub fn min_node(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }
}

impl fmt::Display for Scc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, id) in self.nodes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "n{}", id)?;
        }
        write!(f, "}}")
    }
}

/// Result of one scan of the behavior graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Graph generation the scan looked at
    pub generation: u64,
    /// Number of reachable SCCs examined
    pub sccs_scanned: usize,
    /// Violating SCCs, sorted by smallest node id
    pub violating: Vec<Scc>,
}

impl ScanReport {
    pub fn has_violation(&self) -> bool {
        !self.violating.is_empty()
    }
}

/// Scans behavior graph snapshots for violating SCCs.
#[derive(Debug, Default)]
pub struct BadCycleDetector {
    last_scanned: Option<u64>,
    scans: u64,
}

impl BadCycleDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scans that actually ran
    pub fn scans(&self) -> u64 {
        self.scans
    }

    /// Scan `view` unless its generation was already scanned.
    ///
    /// Returns `None` for a skipped scan. Since the graph only grows, an
    /// unchanged generation cannot hold a violating SCC the previous scan
    /// missed.
    pub fn scan<S>(&mut self, view: &GraphView<'_, S>) -> Option<ScanReport> {
        if self.last_scanned == Some(view.generation()) {
            trace!(generation = view.generation(), "skipping scan of unchanged graph");
            return None;
        }
        self.last_scanned = Some(view.generation());
        self.scans += 1;

        let sccs = reachable_sccs(view);
        let sccs_scanned = sccs.len();
        let mut violating: Vec<Scc> = sccs
            .into_iter()
            .filter(|scc| is_violating(view, scc))
            .collect();
        violating.sort_by_key(|scc| scc.min_node());

        debug!(
            generation = view.generation(),
            nodes = view.node_count(),
            sccs = sccs_scanned,
            violating = violating.len(),
            "scanned behavior graph"
        );
        Some(ScanReport {
            generation: view.generation(),
            sccs_scanned,
            violating,
        })
    }
}

/// Whether `scc` has at least one internal edge
pub fn is_nontrivial<S>(view: &GraphView<'_, S>, scc: &Scc) -> bool {
    match scc.nodes() {
        [] => false,
        [single] => view.successors(*single).any(|succ| succ == *single),
        _ => true,
    }
}

/// Whether `scc` is nontrivial and fulfills every promise of the tableau
pub fn is_violating<S>(view: &GraphView<'_, S>, scc: &Scc) -> bool {
    if !is_nontrivial(view, scc) {
        return false;
    }
    let tableau = view.tableau();
    (0..tableau.promise_count()).all(|promise| {
        scc.nodes()
            .iter()
            .any(|&id| tableau.fulfills(view.tableau_idx(id), promise))
    })
}

/// Per-node Tarjan bookkeeping
#[derive(Clone, Copy)]
struct Visit {
    index: usize,
    lowlink: usize,
    on_stack: bool,
}

/// SCCs reachable from the initial nodes of `view`, in completion order.
pub fn reachable_sccs<S>(view: &GraphView<'_, S>) -> Vec<Scc> {
    let graph = view.graph();
    let bound = view.node_count();
    let mut visits: FxHashMap<NodeId, Visit> = FxHashMap::default();
    let mut stack: Vec<NodeId> = Vec::new();
    // (node, position of the next successor to look at)
    let mut frames: Vec<(NodeId, usize)> = Vec::new();
    let mut next_index = 0usize;
    let mut sccs = Vec::new();

    for root in view.init_nodes() {
        if visits.contains_key(&root) {
            continue;
        }
        visits.insert(
            root,
            Visit {
                index: next_index,
                lowlink: next_index,
                on_stack: true,
            },
        );
        next_index += 1;
        stack.push(root);
        frames.push((root, 0));

        while let Some(frame) = frames.last_mut() {
            let (v, pos) = *frame;
            let succs = graph.successors(v);
            if let Some(&w) = succs.get(pos) {
                frame.1 += 1;
                if w >= bound {
                    continue;
                }
                match visits.get(&w).copied() {
                    None => {
                        visits.insert(
                            w,
                            Visit {
                                index: next_index,
                                lowlink: next_index,
                                on_stack: true,
                            },
                        );
                        next_index += 1;
                        stack.push(w);
                        frames.push((w, 0));
                    }
                    Some(seen) if seen.on_stack => {
                        if let Some(visit) = visits.get_mut(&v) {
                            visit.lowlink = visit.lowlink.min(seen.index);
                        }
                    }
                    Some(_) => {}
                }
                continue;
            }

            // All successors of v are done
            frames.pop();
            let Some(&visit) = visits.get(&v) else {
                continue;
            };
            if let Some(&(parent, _)) = frames.last() {
                if let Some(p) = visits.get_mut(&parent) {
                    p.lowlink = p.lowlink.min(visit.lowlink);
                }
            }
            if visit.lowlink == visit.index {
                let mut members = Vec::new();
                while let Some(w) = stack.pop() {
                    if let Some(vw) = visits.get_mut(&w) {
                        vw.on_stack = false;
                    }
                    members.push(w);
                    if w == v {
                        break;
                    }
                }
                sccs.push(Scc::new(members));
            }
        }
    }
    sccs
}
