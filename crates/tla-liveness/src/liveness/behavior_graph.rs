//! Behavior graph for liveness checking
//!
//! The behavior graph is the product of the state graph and the tableau.
//! Each node is a `(state, tableau_node)` pair, and transitions follow both:
//! - The state graph (via the model's next-state relation)
//! - The tableau (via guarded tableau edges enabled by the concrete step)
//!
//! A liveness violation exists iff there is a reachable accepting cycle in this
//! product graph.
//!
//! Nodes live in an arena and are addressed by [`NodeId`], which doubles as the
//! creation order. The graph only grows: nodes are never removed and an
//! existing node only gains outgoing edges. Every mutation bumps a generation
//! counter so readers can tell whether a [`GraphView`] is stale.

use crate::error::EvalResult;
use crate::fingerprint::Fingerprint;
use crate::liveness::tableau::{Tableau, TableauNodeId};
use crate::model::{EvalContext, ModelEvaluator};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Arena index of a product node; smaller ids were created earlier
pub type NodeId = usize;

/// Key of a behavior graph node: (state fingerprint, tableau node index) pair
///
/// Two behavior graph nodes are equal iff they have the same state fingerprint
/// AND the same tableau index.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BehaviorGraphNode {
    /// Fingerprint of the state
    pub state_fp: Fingerprint,
    /// Index of the tableau node
    pub tableau_idx: TableauNodeId,
}

impl BehaviorGraphNode {
    pub fn new(state_fp: Fingerprint, tableau_idx: TableauNodeId) -> Self {
        Self {
            state_fp,
            tableau_idx,
        }
    }
}

impl fmt::Debug for BehaviorGraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BG({}, t{})", self.state_fp, self.tableau_idx)
    }
}

impl fmt::Display for BehaviorGraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, t{})", self.state_fp, self.tableau_idx)
    }
}

/// A node of the product graph
#[derive(Debug, Clone)]
pub struct ProductNode {
    pub key: BehaviorGraphNode,
    /// Successor nodes in the order the edges were recorded
    pub successors: SmallVec<[NodeId; 4]>,
    /// Whether the node pairs an initial state with an initial tableau node
    pub initial: bool,
}

/// The behavior graph: product of state graph × tableau
#[derive(Clone)]
pub struct BehaviorGraph<S> {
    tableau: Arc<Tableau>,
    nodes: Vec<ProductNode>,
    index: FxHashMap<BehaviorGraphNode, NodeId>,
    by_state: FxHashMap<Fingerprint, SmallVec<[NodeId; 2]>>,
    /// Full states of every fingerprint in the graph (for lasso projection)
    states: FxHashMap<Fingerprint, S>,
    init_nodes: Vec<NodeId>,
    edges: FxHashSet<(NodeId, NodeId)>,
    generation: u64,
}

impl<S: Clone> BehaviorGraph<S> {
    /// Create an empty behavior graph over `tableau`
    pub fn new(tableau: Arc<Tableau>) -> Self {
        Self {
            tableau,
            nodes: Vec::new(),
            index: FxHashMap::default(),
            by_state: FxHashMap::default(),
            states: FxHashMap::default(),
            init_nodes: Vec::new(),
            edges: FxHashSet::default(),
            generation: 0,
        }
    }

    /// Pair initial states with the initial tableau nodes they satisfy.
    ///
    /// Returns the nodes created by this call.
    pub fn extend_initial<M>(
        &mut self,
        model: &M,
        ctx: &mut EvalContext,
        states: &[(Fingerprint, S)],
    ) -> EvalResult<Vec<NodeId>>
    where
        M: ModelEvaluator<State = S>,
    {
        let tableau = Arc::clone(&self.tableau);
        let mut created = Vec::new();
        for (fp, state) in states {
            for &t in tableau.init_nodes() {
                if !tableau.admits_initial(t, model, ctx, (*fp, state))? {
                    continue;
                }
                let (id, is_new) = self.get_or_create(BehaviorGraphNode::new(*fp, t), state);
                if is_new {
                    created.push(id);
                }
                if !self.nodes[id].initial {
                    self.nodes[id].initial = true;
                    self.init_nodes.push(id);
                    self.generation += 1;
                }
            }
        }
        Ok(created)
    }

    /// Record the successors of state `source` for every node keyed by it.
    ///
    /// Returns the nodes created by this call. Repeating a call with the same
    /// arguments creates nothing and records no new edge.
    pub fn extend<M>(
        &mut self,
        model: &M,
        ctx: &mut EvalContext,
        source: Fingerprint,
        successors: &[(Fingerprint, S)],
    ) -> EvalResult<Vec<NodeId>>
    where
        M: ModelEvaluator<State = S>,
    {
        // A self-loop may add nodes for `source` while we iterate
        let mut created = Vec::new();
        let mut i = 0;
        while let Some(&node) = self.by_state.get(&source).and_then(|ids| ids.get(i)) {
            created.extend(self.expand_node(model, ctx, node, successors)?);
            i += 1;
        }
        Ok(created)
    }

    /// Evaluate every guarded edge leaving `node`'s tableau node against each
    /// step from `node`'s state to one of `successors`.
    ///
    /// Returns the nodes created by this call.
    pub fn expand_node<M>(
        &mut self,
        model: &M,
        ctx: &mut EvalContext,
        node: NodeId,
        successors: &[(Fingerprint, S)],
    ) -> EvalResult<Vec<NodeId>>
    where
        M: ModelEvaluator<State = S>,
    {
        let key = self.nodes[node].key;
        let mut targets: Vec<(usize, TableauNodeId)> = Vec::new();
        {
            let Some(state) = self.states.get(&key.state_fp) else {
                return Ok(Vec::new());
            };
            let current = (key.state_fp, state);
            for (i, (fp, next)) in successors.iter().enumerate() {
                for edge in self.tableau.edges_from(key.tableau_idx) {
                    if edge.guard.eval(model, ctx, current, (*fp, next))? {
                        targets.push((i, edge.to));
                    }
                }
            }
        }

        let mut created = Vec::new();
        for (i, t) in targets {
            let (fp, next) = &successors[i];
            let (id, is_new) = self.get_or_create(BehaviorGraphNode::new(*fp, t), next);
            if is_new {
                created.push(id);
            }
            self.add_edge(node, id);
        }
        Ok(created)
    }

    /// Get the node for `key`, creating it if needed. Returns `(id, created)`.
    fn get_or_create(&mut self, key: BehaviorGraphNode, state: &S) -> (NodeId, bool) {
        if let Some(&id) = self.index.get(&key) {
            return (id, false);
        }
        let id = self.nodes.len();
        self.nodes.push(ProductNode {
            key,
            successors: SmallVec::new(),
            initial: false,
        });
        self.index.insert(key, id);
        self.by_state.entry(key.state_fp).or_default().push(id);
        self.states
            .entry(key.state_fp)
            .or_insert_with(|| state.clone());
        self.generation += 1;
        (id, true)
    }

    /// Record the edge `from -> to`. Returns false if it already existed.
    fn add_edge(&mut self, from: NodeId, to: NodeId) -> bool {
        if !self.edges.insert((from, to)) {
            return false;
        }
        self.nodes[from].successors.push(to);
        self.generation += 1;
        true
    }
}

impl<S> BehaviorGraph<S> {
    pub fn tableau(&self) -> &Arc<Tableau> {
        &self.tableau
    }

    /// Check if a (state, tableau_idx) pair has been visited
    pub fn contains(&self, key: &BehaviorGraphNode) -> bool {
        self.index.contains_key(key)
    }

    pub fn node_id(&self, key: &BehaviorGraphNode) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    pub fn node(&self, id: NodeId) -> &ProductNode {
        &self.nodes[id]
    }

    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].successors
    }

    /// Product nodes keyed by state `fp`, in creation order
    pub fn nodes_for_state(&self, fp: Fingerprint) -> &[NodeId] {
        self.by_state.get(&fp).map(|ids| ids.as_slice()).unwrap_or(&[])
    }

    /// Full state for fingerprint `fp`
    pub fn state(&self, fp: Fingerprint) -> Option<&S> {
        self.states.get(&fp)
    }

    /// Full state of product node `id`
    pub fn state_of(&self, id: NodeId) -> Option<&S> {
        self.states.get(&self.nodes[id].key.state_fp)
    }

    /// Initial nodes, in creation order
    pub fn init_nodes(&self) -> &[NodeId] {
        &self.init_nodes
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.edges.contains(&(from, to))
    }

    /// Number of product nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of product edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Counter bumped by every mutation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Read-only view of the graph as of now
    pub fn snapshot(&self) -> GraphView<'_, S> {
        GraphView {
            graph: self,
            node_count: self.nodes.len(),
            generation: self.generation,
        }
    }
}

impl<S> fmt::Debug for BehaviorGraph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorGraph")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("init_nodes", &self.init_nodes.len())
            .field("generation", &self.generation)
            .finish()
    }
}

/// Snapshot of a [`BehaviorGraph`] taken at one generation.
///
/// Only nodes that existed when the snapshot was taken are visible.
pub struct GraphView<'g, S> {
    graph: &'g BehaviorGraph<S>,
    node_count: usize,
    generation: u64,
}

impl<S> Clone for GraphView<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for GraphView<'_, S> {}

impl<'g, S> GraphView<'g, S> {
    pub fn graph(&self) -> &'g BehaviorGraph<S> {
        self.graph
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn tableau(&self) -> &'g Tableau {
        &self.graph.tableau
    }

    pub fn tableau_idx(&self, id: NodeId) -> TableauNodeId {
        self.graph.nodes[id].key.tableau_idx
    }

    pub fn init_nodes(&self) -> impl Iterator<Item = NodeId> + 'g {
        let bound = self.node_count;
        self.graph
            .init_nodes
            .iter()
            .copied()
            .filter(move |&id| id < bound)
    }

    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + 'g {
        let bound = self.node_count;
        self.graph.nodes[id]
            .successors
            .iter()
            .copied()
            .filter(move |&succ| succ < bound)
    }
}
