//! Property-based tests for the liveness checker
//!
//! Random small state graphs are checked against `[]<>p` and `<>[]p`, and the
//! verdicts are compared with brute-force cycle searches. Counterexamples are
//! replayed against the graph to make sure they are real behaviors.

use proptest::prelude::*;
use std::collections::VecDeque;
use std::sync::Arc;
use tla_liveness::explicit::{ExplicitModel, ExplicitState};
use tla_liveness::liveness::{BadCycleDetector, BehaviorGraph, Lasso, Tableau};
use tla_liveness::{
    EvalContext, Fingerprint, LiveExpr, LivenessCheckMode, LivenessChecker, LivenessConfig,
    LivenessError, PredicateId, Verdict,
};

// ============================================================================
// Helper functions
// ============================================================================

const P: PredicateId = PredicateId(0);
const Q: PredicateId = PredicateId(1);

/// A state graph over `x = 0..labels.len()`, initial state 0.
/// `labels[x]` is the truth value of `p` in state x.
#[derive(Debug, Clone)]
struct Graph {
    labels: Vec<bool>,
    edges: Vec<(usize, usize)>,
}

impl Graph {
    fn model(&self) -> ExplicitModel {
        let mut b = ExplicitModel::builder(["x"]);
        let refs: Vec<_> = (0..self.labels.len() as i64).map(|x| b.state([x])).collect();
        b.initial(refs[0]);
        for &(from, to) in &self.edges {
            b.transition(refs[from], refs[to]);
        }
        let labels = self.labels.clone();
        b.state_predicate(P, move |s: &ExplicitState| labels[s.get("x").unwrap() as usize]);
        b.state_predicate(Q, |s: &ExplicitState| s.get("x").unwrap() % 2 == 0);
        b.build()
    }

    fn successors(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges.iter().filter(move |e| e.0 == v).map(|e| e.1)
    }

    fn has_edge(&self, from: i64, to: i64) -> bool {
        self.edges.contains(&(from as usize, to as usize))
    }

    fn reachable(&self) -> Vec<bool> {
        let mut seen = vec![false; self.labels.len()];
        let mut queue = VecDeque::from([0]);
        seen[0] = true;
        while let Some(v) = queue.pop_front() {
            for w in self.successors(v) {
                if !seen[w] {
                    seen[w] = true;
                    queue.push_back(w);
                }
            }
        }
        seen
    }

    /// Whether `v` lies on a cycle of nodes accepted by `allowed`
    fn on_cycle(&self, v: usize, allowed: impl Fn(usize) -> bool) -> bool {
        let mut seen = vec![false; self.labels.len()];
        let mut queue: VecDeque<usize> = self.successors(v).filter(|&w| allowed(w)).collect();
        while let Some(u) = queue.pop_front() {
            if u == v {
                return true;
            }
            if seen[u] {
                continue;
            }
            seen[u] = true;
            queue.extend(self.successors(u).filter(|&w| allowed(w)));
        }
        false
    }

    /// Brute force: []<>p fails iff a reachable cycle avoids p entirely
    fn violates_infinitely_often(&self) -> bool {
        let reach = self.reachable();
        (0..self.labels.len()).any(|v| {
            reach[v] && !self.labels[v] && self.on_cycle(v, |u| reach[u] && !self.labels[u])
        })
    }

    /// Brute force: <>[]p fails iff a reachable ~p state lies on a cycle
    fn violates_eventually_always(&self) -> bool {
        let reach = self.reachable();
        (0..self.labels.len())
            .any(|v| reach[v] && !self.labels[v] && self.on_cycle(v, |u| reach[u]))
    }

    /// Whether `lasso` is a behavior of this graph
    fn replays(&self, lasso: &Lasso<ExplicitState>) -> bool {
        let x = |s: &ExplicitState| s.get("x").unwrap();
        let prefix: Vec<i64> = lasso.prefix.iter().map(x).collect();
        let cycle: Vec<i64> = lasso.cycle.iter().map(x).collect();
        prefix.first() == Some(&0)
            && cycle.len() >= 2
            && prefix.last() == cycle.first()
            && cycle.first() == cycle.last()
            && prefix.windows(2).all(|w| self.has_edge(w[0], w[1]))
            && cycle.windows(2).all(|w| self.has_edge(w[0], w[1]))
    }

    fn label(&self, s: &ExplicitState) -> bool {
        self.labels[s.get("x").unwrap() as usize]
    }
}

/// Strategy for small random graphs (for performance)
fn small_graph() -> impl Strategy<Value = Graph> {
    (1usize..=6)
        .prop_flat_map(|n| {
            (
                prop::collection::vec(any::<bool>(), n),
                prop::collection::vec((0..n, 0..n), 0..=2 * n),
            )
        })
        .prop_map(|(labels, edges)| Graph { labels, edges })
}

fn check_mode() -> impl Strategy<Value = LivenessCheckMode> {
    prop_oneof![
        Just(LivenessCheckMode::Periodic),
        Just(LivenessCheckMode::Final)
    ]
}

fn config(mode: LivenessCheckMode, interval: usize) -> LivenessConfig {
    LivenessConfig {
        check_mode: mode,
        scan_interval: interval,
        parallel: false,
        ..LivenessConfig::default()
    }
}

fn check(model: &ExplicitModel, config: LivenessConfig, prop: LiveExpr) -> Verdict<ExplicitState> {
    let mut report = LivenessChecker::new(model, config).property("prop", prop).check();
    report.properties.remove(0).outcome.unwrap()
}

fn infinitely_often_p() -> LiveExpr {
    LiveExpr::infinitely_often(LiveExpr::state_pred(P))
}

fn eventually_always_p() -> LiveExpr {
    LiveExpr::eventually_always(LiveExpr::state_pred(P))
}

// ============================================================================
// Verdicts against brute force
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_infinitely_often_matches_brute_force(
        g in small_graph(),
        mode in check_mode(),
        interval in 1usize..4,
    ) {
        let verdict = check(&g.model(), config(mode, interval), infinitely_often_p());
        prop_assert_eq!(verdict.is_violated(), g.violates_infinitely_often());
        prop_assert!(!verdict.is_indeterminate());
        if let Some(lasso) = verdict.lasso() {
            prop_assert!(g.replays(lasso), "lasso is not a behavior: {:?}", lasso);
            // The cycle never passes through p
            prop_assert!(lasso.cycle.iter().all(|s| !g.label(s)));
        }
    }

    #[test]
    fn prop_eventually_always_matches_brute_force(
        g in small_graph(),
        mode in check_mode(),
        interval in 1usize..4,
    ) {
        let verdict = check(&g.model(), config(mode, interval), eventually_always_p());
        prop_assert_eq!(verdict.is_violated(), g.violates_eventually_always());
        if let Some(lasso) = verdict.lasso() {
            prop_assert!(g.replays(lasso), "lasso is not a behavior: {:?}", lasso);
            // The cycle leaves p at least once
            prop_assert!(lasso.cycle.iter().any(|s| !g.label(s)));
        }
    }

    #[test]
    fn prop_lasso_len_and_cycle_start(g in small_graph()) {
        let verdict = check(&g.model(), config(LivenessCheckMode::Final, 1), infinitely_often_p());
        if let Some(lasso) = verdict.lasso() {
            prop_assert_eq!(lasso.len(), lasso.prefix.len() + lasso.cycle.len());
            prop_assert_eq!(lasso.cycle_start(), lasso.prefix.len() - 1);
            prop_assert_eq!(&lasso.prefix[lasso.cycle_start()], &lasso.cycle[0]);
        }
    }
}

// ============================================================================
// Determinism and monotonicity
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_reruns_are_identical(g in small_graph(), interval in 1usize..4) {
        let model = g.model();
        let prop = LiveExpr::or(vec![infinitely_often_p(), eventually_always_p()]);
        let first = check(&model, config(LivenessCheckMode::Periodic, interval), prop.clone());
        let second = check(&model, config(LivenessCheckMode::Periodic, interval), prop);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_parallel_matches_sequential(g in small_graph()) {
        let model = g.model();
        let run = |parallel: bool| {
            let config = LivenessConfig {
                parallel,
                scan_interval: 2,
                ..LivenessConfig::default()
            };
            LivenessChecker::new(&model, config)
                .property("often", infinitely_often_p())
                .property("stable", eventually_always_p())
                .check()
                .properties
                .into_iter()
                .map(|p| p.outcome)
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(run(true), run(false));
    }

    #[test]
    fn prop_violations_survive_more_exploration(g in small_graph(), limit in 1usize..6) {
        let model = g.model();
        let limited = LivenessConfig {
            max_states: Some(limit),
            ..config(LivenessCheckMode::Final, 1)
        };
        let partial = check(&model, limited, infinitely_often_p());
        let full = check(&model, config(LivenessCheckMode::Final, 1), infinitely_often_p());
        if partial.is_violated() {
            prop_assert!(full.is_violated());
        }
        // A truncated run never claims the property holds
        if partial.is_satisfied() {
            prop_assert!(full.is_satisfied());
        }
    }
}

// ============================================================================
// Behavior graph laws
// ============================================================================

/// Feed every state of `g` to `graph`, sweeping until nothing new appears.
fn saturate(
    g: &Graph,
    model: &ExplicitModel,
    graph: &mut BehaviorGraph<ExplicitState>,
    ctx: &mut EvalContext,
) {
    let entry = |x: usize| {
        let s = model.state_by_values(&[x as i64]).unwrap().clone();
        (s.fingerprint(), s)
    };
    graph.extend_initial(model, ctx, &[entry(0)]).unwrap();
    loop {
        let before = graph.len();
        for v in 0..g.labels.len() {
            let succs: Vec<(Fingerprint, ExplicitState)> = g.successors(v).map(entry).collect();
            graph.extend(model, ctx, entry(v).0, &succs).unwrap();
        }
        if graph.len() == before {
            break;
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_extend_is_idempotent(g in small_graph()) {
        let model = g.model();
        let tableau = Arc::new(Tableau::build(&infinitely_often_p()).unwrap());
        let mut ctx = EvalContext::new();
        let mut graph = BehaviorGraph::new(tableau);
        saturate(&g, &model, &mut graph, &mut ctx);

        let before = BadCycleDetector::new().scan(&graph.snapshot()).unwrap();
        let (nodes, edges, generation) = (graph.len(), graph.edge_count(), graph.generation());
        saturate(&g, &model, &mut graph, &mut ctx);

        prop_assert_eq!(graph.len(), nodes);
        prop_assert_eq!(graph.edge_count(), edges);
        prop_assert_eq!(graph.generation(), generation);
        let after = BadCycleDetector::new().scan(&graph.snapshot()).unwrap();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn prop_product_nodes_are_unique(g in small_graph()) {
        let model = g.model();
        let tableau = Arc::new(Tableau::build(&eventually_always_p()).unwrap());
        let mut ctx = EvalContext::new();
        let mut graph = BehaviorGraph::new(tableau);
        saturate(&g, &model, &mut graph, &mut ctx);

        let mut keys: Vec<_> = (0..graph.len()).map(|id| graph.node(id).key).collect();
        let total = keys.len();
        keys.sort_by_key(|k| (k.state_fp, k.tableau_idx));
        keys.dedup();
        prop_assert_eq!(keys.len(), total);
        for id in 0..graph.len() {
            prop_assert_eq!(graph.node_id(&graph.node(id).key), Some(id));
        }
    }
}

// ============================================================================
// Tableau construction
// ============================================================================

/// Strategy for temporal formulas over two state predicates
fn live_expr() -> impl Strategy<Value = LiveExpr> {
    let leaf = prop_oneof![
        Just(LiveExpr::state_pred(P)),
        Just(LiveExpr::state_pred(Q)),
        any::<bool>().prop_map(LiveExpr::Bool),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(LiveExpr::not),
            inner.clone().prop_map(LiveExpr::always),
            inner.clone().prop_map(LiveExpr::eventually),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| LiveExpr::and(vec![a, b])),
            (inner.clone(), inner).prop_map(|(a, b)| LiveExpr::or(vec![a, b])),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_tableau_is_well_formed(expr in live_expr()) {
        match Tableau::build(&expr) {
            Ok(tableau) => {
                prop_assert!(!expr.clone().push_negation().extract_promises().is_empty());
                for node in tableau.nodes() {
                    prop_assert!(node.successors.iter().all(|&s| s < tableau.len()));
                    prop_assert!(node.fulfills.iter().all(|&p| (p as usize) < tableau.promise_count()));
                }
                prop_assert!(tableau.init_nodes().iter().all(|&i| i < tableau.len()));
                let again = Tableau::build(&expr).unwrap();
                prop_assert_eq!(tableau.to_string(), again.to_string());
            }
            Err(LivenessError::MalformedProperty { .. }) => {
                prop_assert!(expr.clone().push_negation().extract_promises().is_empty());
            }
            Err(e) => prop_assert!(false, "unexpected error {}", e),
        }
    }
}
