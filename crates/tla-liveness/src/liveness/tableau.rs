//! Tableau construction
//!
//! The tableau of a formula is a graph whose infinite paths describe the
//! behaviors satisfying it. To check a property `P` we build the tableau of
//! `~P`: a behavior that can run forever through the product of the state
//! graph and this tableau, keeping every promise, is a counterexample.
//!
//! Construction follows the particle tableau of Manna & Pnueli (the same
//! construction TLC's `TBGraph` uses):
//!
//! - The negated property is put in positive normal form and its closure is
//!   interned into a table of `(kind, children)` entries.
//! - A *particle* is a consistent set of closure formulas closed under
//!   `A /\ B -> {A, B}`, `[]A -> {A, ()[]A}` and one choice per
//!   `A \/ B -> {A} | {B}` and `<>A -> {A} | {()<>A}`.
//! - The initial nodes are the particles of `{~P}`; the successors of a node
//!   are the particles of `{A : ()A in node}`.
//!
//! A node *fulfills* promise `<>A` when it contains `A` or does not contain
//! `<>A` at all. State literals of a node must hold in the node's state;
//! action literals must hold on the step leaving it.

use crate::error::{EvalResult, LivenessError, LivenessResult};
use crate::fingerprint::Fingerprint;
use crate::liveness::live_expr::LiveExpr;
use crate::model::{EvalContext, ModelEvaluator, PredicateId};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::ops::Range;
use tracing::debug;

/// Index of a node in a [`Tableau`]
pub type TableauNodeId = usize;

/// Tableaux larger than this are rejected rather than built.
pub const MAX_TABLEAU_NODES: usize = 1 << 16;

/// Identifier of an interned closure formula
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct FormulaId(u32);

/// Operator of a closure formula
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FormulaKind {
    True,
    False,
    State(Literal),
    Action(Literal),
    And,
    Or,
    Always,
    Eventually,
    Next,
}

/// A possibly negated atomic predicate
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Literal {
    pub pred: PredicateId,
    pub positive: bool,
}

impl Literal {
    pub fn negated(self) -> Self {
        Literal {
            pred: self.pred,
            positive: !self.positive,
        }
    }

    fn holds<M: ModelEvaluator>(
        self,
        model: &M,
        ctx: &mut EvalContext,
        state: (Fingerprint, &M::State),
        next: Option<(Fingerprint, &M::State)>,
    ) -> EvalResult<bool> {
        Ok(ctx.predicate(model, self.pred, state, next)? == self.positive)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.positive {
            write!(f, "{}", self.pred)
        } else {
            write!(f, "~{}", self.pred)
        }
    }
}

type Children = SmallVec<[FormulaId; 2]>;

#[derive(Debug, Clone)]
struct ClosureEntry {
    kind: FormulaKind,
    children: Children,
}

/// Interned sub-formulas of the negated property
#[derive(Debug, Clone, Default)]
pub struct Closure {
    entries: Vec<ClosureEntry>,
    index: FxHashMap<(FormulaKind, Children), FormulaId>,
}

impl Closure {
    fn intern(&mut self, kind: FormulaKind, children: Children) -> FormulaId {
        if let Some(&id) = self.index.get(&(kind, children.clone())) {
            return id;
        }
        let id = FormulaId(self.entries.len() as u32);
        self.entries.push(ClosureEntry {
            kind,
            children: children.clone(),
        });
        self.index.insert((kind, children), id);
        id
    }

    fn lookup(&self, kind: FormulaKind) -> Option<FormulaId> {
        self.index.get(&(kind, Children::new())).copied()
    }

    /// Intern a formula in positive normal form.
    fn intern_expr(&mut self, expr: &LiveExpr) -> LivenessResult<FormulaId> {
        let (kind, children) = match expr {
            LiveExpr::Bool(true) => (FormulaKind::True, Children::new()),
            LiveExpr::Bool(false) => (FormulaKind::False, Children::new()),
            LiveExpr::StatePred(pred) => (
                FormulaKind::State(Literal {
                    pred: *pred,
                    positive: true,
                }),
                Children::new(),
            ),
            LiveExpr::ActionPred(pred) => (
                FormulaKind::Action(Literal {
                    pred: *pred,
                    positive: true,
                }),
                Children::new(),
            ),
            LiveExpr::Not(inner) => match inner.as_ref() {
                LiveExpr::StatePred(pred) => (
                    FormulaKind::State(Literal {
                        pred: *pred,
                        positive: false,
                    }),
                    Children::new(),
                ),
                LiveExpr::ActionPred(pred) => (
                    FormulaKind::Action(Literal {
                        pred: *pred,
                        positive: false,
                    }),
                    Children::new(),
                ),
                other => {
                    return Err(LivenessError::malformed(format!(
                        "negation of {} survived normalization",
                        other
                    )))
                }
            },
            LiveExpr::And(es) | LiveExpr::Or(es) => {
                let mut children = Children::new();
                for e in es {
                    children.push(self.intern_expr(e)?);
                }
                let kind = if matches!(expr, LiveExpr::And(_)) {
                    FormulaKind::And
                } else {
                    FormulaKind::Or
                };
                (kind, children)
            }
            LiveExpr::Always(e) => (FormulaKind::Always, smallvec_of(self.intern_expr(e)?)),
            LiveExpr::Eventually(e) => {
                (FormulaKind::Eventually, smallvec_of(self.intern_expr(e)?))
            }
            LiveExpr::Next(e) => (FormulaKind::Next, smallvec_of(self.intern_expr(e)?)),
        };
        Ok(self.intern(kind, children))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn kind(&self, id: FormulaId) -> FormulaKind {
        self.entries[id.0 as usize].kind
    }

    pub fn children(&self, id: FormulaId) -> &[FormulaId] {
        &self.entries[id.0 as usize].children
    }

    /// Rebuild the formula for display
    pub fn to_expr(&self, id: FormulaId) -> LiveExpr {
        let children = self.children(id);
        let lit = |l: Literal, atom: LiveExpr| {
            if l.positive {
                atom
            } else {
                LiveExpr::Not(Box::new(atom))
            }
        };
        match self.kind(id) {
            FormulaKind::True => LiveExpr::Bool(true),
            FormulaKind::False => LiveExpr::Bool(false),
            FormulaKind::State(l) => lit(l, LiveExpr::StatePred(l.pred)),
            FormulaKind::Action(l) => lit(l, LiveExpr::ActionPred(l.pred)),
            FormulaKind::And => LiveExpr::And(children.iter().map(|&c| self.to_expr(c)).collect()),
            FormulaKind::Or => LiveExpr::Or(children.iter().map(|&c| self.to_expr(c)).collect()),
            FormulaKind::Always => LiveExpr::always(self.to_expr(children[0])),
            FormulaKind::Eventually => LiveExpr::eventually(self.to_expr(children[0])),
            FormulaKind::Next => LiveExpr::next(self.to_expr(children[0])),
        }
    }

    /// All particles of the formula set `seed`, in a deterministic order.
    fn particles(&mut self, seed: &[FormulaId]) -> Vec<Vec<FormulaId>> {
        struct Partial {
            members: BTreeSet<FormulaId>,
            todo: Vec<FormulaId>,
        }

        let mut out: Vec<Vec<FormulaId>> = Vec::new();
        let mut stack = vec![Partial {
            members: BTreeSet::new(),
            todo: seed.iter().rev().copied().collect(),
        }];

        'partials: while let Some(mut partial) = stack.pop() {
            while let Some(f) = partial.todo.pop() {
                if !partial.members.insert(f) {
                    continue;
                }
                let kind = self.kind(f);
                let children = self.entries[f.0 as usize].children.clone();
                match kind {
                    FormulaKind::True | FormulaKind::Next => {}
                    FormulaKind::False => continue 'partials,
                    FormulaKind::State(l) | FormulaKind::Action(l) => {
                        let opposite = match kind {
                            FormulaKind::State(_) => FormulaKind::State(l.negated()),
                            _ => FormulaKind::Action(l.negated()),
                        };
                        if let Some(neg) = self.lookup(opposite) {
                            if partial.members.contains(&neg) {
                                continue 'partials;
                            }
                        }
                    }
                    FormulaKind::And => partial.todo.extend(children.iter().rev()),
                    FormulaKind::Always => {
                        let again = self.intern(FormulaKind::Next, smallvec_of(f));
                        partial.todo.push(again);
                        partial.todo.push(children[0]);
                    }
                    FormulaKind::Or | FormulaKind::Eventually => {
                        let branches: Children = if kind == FormulaKind::Or {
                            children
                        } else {
                            let later = self.intern(FormulaKind::Next, smallvec_of(f));
                            SmallVec::from_slice(&[children[0], later])
                        };
                        // Pushed in reverse so the first branch is expanded first
                        for &branch in branches.iter().rev() {
                            let mut todo = partial.todo.clone();
                            todo.push(branch);
                            stack.push(Partial {
                                members: partial.members.clone(),
                                todo,
                            });
                        }
                        continue 'partials;
                    }
                }
            }
            let particle: Vec<FormulaId> = partial.members.into_iter().collect();
            if !out.contains(&particle) {
                out.push(particle);
            }
        }
        out
    }
}

fn smallvec_of(id: FormulaId) -> Children {
    let mut v = Children::new();
    v.push(id);
    v
}

/// Guard of a tableau edge, evaluated on a concrete step `(s, s')`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    /// Action literals of the source node, on `(s, s')`
    pub action: SmallVec<[Literal; 4]>,
    /// State literals of the target node, on `s'`
    pub state: SmallVec<[Literal; 4]>,
}

impl Guard {
    /// True when every literal holds on the step.
    pub fn eval<M: ModelEvaluator>(
        &self,
        model: &M,
        ctx: &mut EvalContext,
        current: (Fingerprint, &M::State),
        next: (Fingerprint, &M::State),
    ) -> EvalResult<bool> {
        for lit in &self.action {
            if !lit.holds(model, ctx, current, Some(next))? {
                return Ok(false);
            }
        }
        for lit in &self.state {
            if !lit.holds(model, ctx, next, None)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn is_trivial(&self) -> bool {
        self.action.is_empty() && self.state.is_empty()
    }
}

/// Guarded edge between two tableau nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableauEdge {
    pub from: TableauNodeId,
    pub to: TableauNodeId,
    pub guard: Guard,
}

/// Obligation node of a tableau
#[derive(Debug, Clone)]
pub struct TableauNode {
    pub id: TableauNodeId,
    /// Closure formulas holding at this node, sorted
    pub particle: Vec<FormulaId>,
    /// Literals the node's state must satisfy
    pub state_literals: SmallVec<[Literal; 4]>,
    /// Literals the step leaving the node must satisfy
    pub action_literals: SmallVec<[Literal; 4]>,
    /// Indices (into [`Tableau::promises`]) of the promises this node fulfills
    pub fulfills: SmallVec<[u32; 4]>,
    pub successors: Vec<TableauNodeId>,
    edges: Range<usize>,
}

/// Tableau of a negated liveness property
#[derive(Debug, Clone)]
pub struct Tableau {
    property: LiveExpr,
    negated: LiveExpr,
    closure: Closure,
    nodes: Vec<TableauNode>,
    init_nodes: Vec<TableauNodeId>,
    edges: Vec<TableauEdge>,
    promises: Vec<FormulaId>,
}

impl Tableau {
    /// Build the tableau for checking `property`.
    pub fn build(property: &LiveExpr) -> LivenessResult<Tableau> {
        Self::build_inner(property, None)
    }

    /// Build the tableau for checking `fairness => property`.
    pub fn build_with_fairness(property: &LiveExpr, fairness: &LiveExpr) -> LivenessResult<Tableau> {
        Self::build_inner(property, Some(fairness))
    }

    fn build_inner(property: &LiveExpr, fairness: Option<&LiveExpr>) -> LivenessResult<Tableau> {
        if property.contains_next() || fairness.is_some_and(|f| f.contains_next()) {
            return Err(LivenessError::malformed(
                "the next operator () is internal to the tableau and cannot appear in a property",
            ));
        }
        if property.clone().push_negation().extract_promises().is_empty() {
            return Err(LivenessError::malformed(format!(
                "{} has no eventuality (<>, ~[] or ~>); safety properties are not checked here",
                property
            )));
        }

        let negated = match fairness {
            None => LiveExpr::not(property.clone()),
            Some(f) => LiveExpr::and(vec![f.clone(), LiveExpr::not(property.clone())]),
        }
        .push_negation();
        debug_assert!(negated.is_positive_form());

        let mut closure = Closure::default();
        let root = closure.intern_expr(&negated)?;

        let mut particles: Vec<Vec<FormulaId>> = Vec::new();
        let mut successors: Vec<Vec<TableauNodeId>> = Vec::new();
        let mut index: FxHashMap<Vec<FormulaId>, TableauNodeId> = FxHashMap::default();
        let mut queue = VecDeque::new();

        let mut intern_node = |particle: Vec<FormulaId>,
                               particles: &mut Vec<Vec<FormulaId>>,
                               successors: &mut Vec<Vec<TableauNodeId>>,
                               queue: &mut VecDeque<TableauNodeId>|
         -> LivenessResult<TableauNodeId> {
            if let Some(&id) = index.get(&particle) {
                return Ok(id);
            }
            let id = particles.len();
            if id >= MAX_TABLEAU_NODES {
                return Err(LivenessError::malformed(format!(
                    "tableau exceeds {} nodes",
                    MAX_TABLEAU_NODES
                )));
            }
            index.insert(particle.clone(), id);
            particles.push(particle);
            successors.push(Vec::new());
            queue.push_back(id);
            Ok(id)
        };

        let mut init_nodes = Vec::new();
        for particle in closure.particles(&[root]) {
            let id = intern_node(particle, &mut particles, &mut successors, &mut queue)?;
            init_nodes.push(id);
        }

        while let Some(id) = queue.pop_front() {
            let seed: Vec<FormulaId> = particles[id]
                .iter()
                .filter(|&&f| closure.kind(f) == FormulaKind::Next)
                .map(|&f| closure.children(f)[0])
                .collect();
            for particle in closure.particles(&seed) {
                let succ = intern_node(particle, &mut particles, &mut successors, &mut queue)?;
                if !successors[id].contains(&succ) {
                    successors[id].push(succ);
                }
            }
        }

        let promises: Vec<FormulaId> = (0..closure.len() as u32)
            .map(FormulaId)
            .filter(|&f| closure.kind(f) == FormulaKind::Eventually)
            .collect();

        let mut nodes: Vec<TableauNode> = particles
            .into_iter()
            .zip(successors)
            .enumerate()
            .map(|(id, (particle, successors))| {
                let mut state_literals = SmallVec::new();
                let mut action_literals = SmallVec::new();
                for &f in &particle {
                    match closure.kind(f) {
                        FormulaKind::State(l) => state_literals.push(l),
                        FormulaKind::Action(l) => action_literals.push(l),
                        _ => {}
                    }
                }
                let fulfills = promises
                    .iter()
                    .enumerate()
                    .filter(|&(_, &p)| {
                        let body = closure.children(p)[0];
                        particle.binary_search(&body).is_ok() || particle.binary_search(&p).is_err()
                    })
                    .map(|(i, _)| i as u32)
                    .collect();
                TableauNode {
                    id,
                    particle,
                    state_literals,
                    action_literals,
                    fulfills,
                    successors,
                    edges: 0..0,
                }
            })
            .collect();

        let mut edges = Vec::new();
        for from in 0..nodes.len() {
            let start = edges.len();
            for &to in &nodes[from].successors {
                edges.push(TableauEdge {
                    from,
                    to,
                    guard: Guard {
                        action: nodes[from].action_literals.clone(),
                        state: nodes[to].state_literals.clone(),
                    },
                });
            }
            nodes[from].edges = start..edges.len();
        }

        debug!(
            property = %property,
            nodes = nodes.len(),
            edges = edges.len(),
            promises = promises.len(),
            closure = closure.len(),
            actions = negated.contains_action(),
            "built tableau"
        );

        Ok(Tableau {
            property: property.clone(),
            negated,
            closure,
            nodes,
            init_nodes,
            edges,
            promises,
        })
    }

    /// The property being checked
    pub fn property(&self) -> &LiveExpr {
        &self.property
    }

    /// The formula the tableau describes (the negated property, in positive
    /// normal form)
    pub fn negated(&self) -> &LiveExpr {
        &self.negated
    }

    pub fn closure(&self) -> &Closure {
        &self.closure
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: TableauNodeId) -> &TableauNode {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[TableauNode] {
        &self.nodes
    }

    pub fn init_nodes(&self) -> &[TableauNodeId] {
        &self.init_nodes
    }

    pub fn edges(&self) -> &[TableauEdge] {
        &self.edges
    }

    /// Guarded edges leaving `id`
    pub fn edges_from(&self, id: TableauNodeId) -> &[TableauEdge] {
        &self.edges[self.nodes[id].edges.clone()]
    }

    /// Number of promises (`<>A` sub-formulas) of the negated property
    pub fn promise_count(&self) -> usize {
        self.promises.len()
    }

    pub fn promise(&self, index: usize) -> LiveExpr {
        self.closure.to_expr(self.promises[index])
    }

    /// Whether node `id` fulfills promise `promise`
    pub fn fulfills(&self, id: TableauNodeId, promise: usize) -> bool {
        self.nodes[id].fulfills.contains(&(promise as u32))
    }

    /// Whether `state` may start a behavior in initial node `id`
    pub fn admits_initial<M: ModelEvaluator>(
        &self,
        id: TableauNodeId,
        model: &M,
        ctx: &mut EvalContext,
        state: (Fingerprint, &M::State),
    ) -> EvalResult<bool> {
        for lit in &self.nodes[id].state_literals {
            if !lit.holds(model, ctx, state, None)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Display for Tableau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "tableau of {}", self.negated)?;
        for node in &self.nodes {
            let init = if self.init_nodes.contains(&node.id) {
                " [init]"
            } else {
                ""
            };
            write!(f, "  t{}{} {{", node.id, init)?;
            for (i, &formula) in node.particle.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", self.closure.to_expr(formula))?;
            }
            write!(f, "}} ->")?;
            for succ in &node.successors {
                write!(f, " t{}", succ)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p() -> LiveExpr {
        LiveExpr::StatePred(PredicateId(1))
    }

    #[test]
    fn test_rejects_safety_property() {
        let err = Tableau::build(&LiveExpr::always(p())).unwrap_err();
        assert!(matches!(err, LivenessError::MalformedProperty { .. }));

        let err = Tableau::build(&LiveExpr::Bool(true)).unwrap_err();
        assert!(matches!(err, LivenessError::MalformedProperty { .. }));
    }

    #[test]
    fn test_rejects_next_operator() {
        let prop = LiveExpr::eventually(LiveExpr::next(p()));
        let err = Tableau::build(&prop).unwrap_err();
        assert!(err.to_string().contains("next operator"));
    }

    #[test]
    fn test_negated_always_counts_as_eventuality() {
        // ~[]P is <>~P
        let tableau = Tableau::build(&LiveExpr::not(LiveExpr::always(p()))).unwrap();
        assert_eq!(tableau.negated(), &LiveExpr::always(p()));
    }

    #[test]
    fn test_eventually_always_tableau_shape() {
        // ~<>[]P = []<>~P: two nodes, both initial, fully connected
        let tableau = Tableau::build(&LiveExpr::eventually_always(p())).unwrap();
        assert_eq!(tableau.len(), 2);
        assert_eq!(tableau.init_nodes(), &[0, 1]);
        assert_eq!(tableau.promise_count(), 1);
        assert_eq!(
            tableau.promise(0),
            LiveExpr::eventually(LiveExpr::not(p()))
        );

        // t0 chose ~P now and fulfills the promise; t1 postponed it
        let neg_p = Literal {
            pred: PredicateId(1),
            positive: false,
        };
        assert_eq!(tableau.node(0).state_literals.as_slice(), &[neg_p]);
        assert!(tableau.fulfills(0, 0));
        assert!(tableau.node(1).state_literals.is_empty());
        assert!(!tableau.fulfills(1, 0));

        for id in 0..2 {
            assert_eq!(tableau.node(id).successors, vec![0, 1]);
            assert_eq!(tableau.edges_from(id).len(), 2);
        }
        assert_eq!(tableau.edges_from(1)[0].guard.state.as_slice(), &[neg_p]);
        assert!(tableau.edges_from(0)[1].guard.is_trivial());
    }

    #[test]
    fn test_infinitely_often_tableau_shape() {
        // ~[]<>P = <>[]~P
        let tableau = Tableau::build(&LiveExpr::infinitely_often(p())).unwrap();
        assert_eq!(tableau.len(), 3);
        assert_eq!(tableau.init_nodes(), &[0, 1]);
        // t0 entered []~P; t2 stays in []~P forever; t1 is still waiting
        assert!(tableau.fulfills(0, 0));
        assert!(!tableau.fulfills(1, 0));
        assert!(tableau.fulfills(2, 0));
        assert_eq!(tableau.node(0).successors, vec![2]);
        assert_eq!(tableau.node(1).successors, vec![0, 1]);
        assert_eq!(tableau.node(2).successors, vec![2]);
    }

    #[test]
    fn test_contradictory_particles_are_dropped() {
        // The negation is <>(P /\ ~P) /\ []~P; the promise can never be kept
        let contradiction = LiveExpr::and(vec![p(), LiveExpr::not(p())]);
        let prop = LiveExpr::implies(LiveExpr::eventually(contradiction), LiveExpr::eventually(p()));
        let tableau = Tableau::build(&prop).unwrap();
        for node in tableau.nodes() {
            let lits = &node.state_literals;
            assert!(!lits.iter().any(|l| lits.contains(&l.negated())));
        }
        assert!(tableau.nodes().iter().all(|n| !n.fulfills.contains(&0)));
    }

    #[test]
    fn test_action_literals_guard_outgoing_edges() {
        // ~[]<>A = <>[]~A
        let a = LiveExpr::ActionPred(PredicateId(7));
        let tableau = Tableau::build(&LiveExpr::infinitely_often(a)).unwrap();
        let not_a = Literal {
            pred: PredicateId(7),
            positive: false,
        };
        let node = tableau.node(0);
        assert_eq!(node.action_literals.as_slice(), &[not_a]);
        for edge in tableau.edges_from(0) {
            assert_eq!(edge.guard.action.as_slice(), &[not_a]);
        }
    }

    #[test]
    fn test_fairness_is_conjoined() {
        let wf = LiveExpr::weak_fairness(PredicateId(2), PredicateId(3));
        let plain = Tableau::build(&LiveExpr::infinitely_often(p())).unwrap();
        let fair = Tableau::build_with_fairness(&LiveExpr::infinitely_often(p()), &wf).unwrap();
        assert!(fair.len() > plain.len());
        assert!(fair.promise_count() > plain.promise_count());
        assert!(matches!(fair.negated(), LiveExpr::And(_)));
    }

    #[test]
    fn test_build_is_deterministic() {
        let prop = LiveExpr::leads_to(p(), LiveExpr::StatePred(PredicateId(2)));
        let a = Tableau::build(&prop).unwrap();
        let b = Tableau::build(&prop).unwrap();
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.edges(), b.edges());
    }

    #[test]
    fn test_display_lists_particles_and_successors() {
        let tableau = Tableau::build(&LiveExpr::eventually_always(p())).unwrap();
        let text = tableau.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + tableau.len());
        assert!(lines[0].starts_with("tableau of "));
        assert!(lines[1].starts_with("  t0 [init] {"));
        assert!(lines[1].ends_with("} -> t0 t1"));
        assert!(lines[2].ends_with("} -> t0 t1"));
    }
}
