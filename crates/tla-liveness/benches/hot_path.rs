//! Microbenchmarks for hot path components
//!
//! These benchmarks measure isolated operations of the liveness pipeline:
//! - Tableau construction for common property shapes
//! - Behavior graph extension (guard evaluation, node/edge creation)
//! - SCC scans of a saturated behavior graph
//! - Lasso extraction
//! - End-to-end checks, sequential and parallel
//!
//! Run with: cargo bench -p tla-liveness --bench hot_path

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use tla_liveness::explicit::{ExplicitModel, ExplicitState};
use tla_liveness::liveness::{lasso, BadCycleDetector, BehaviorGraph, Tableau};
use tla_liveness::{
    EvalContext, Fingerprint, LiveExpr, LivenessChecker, LivenessConfig, PredicateId,
};

// ============================================================================
// Test Data Generators
// ============================================================================

const AT_ZERO: PredicateId = PredicateId(0);
const EVEN: PredicateId = PredicateId(1);

/// Ring of `n` states with chords: x -> x+1 and x -> 2x (mod n)
fn ring_model(n: i64) -> ExplicitModel {
    let mut b = ExplicitModel::builder(["x"]);
    let refs: Vec<_> = (0..n).map(|x| b.state([x])).collect();
    b.initial(refs[0]);
    for x in 0..n {
        b.transition(refs[x as usize], refs[((x + 1) % n) as usize]);
        b.transition(refs[x as usize], refs[((2 * x) % n) as usize]);
    }
    b.state_predicate(AT_ZERO, |s: &ExplicitState| s.get("x") == Some(0));
    b.state_predicate(EVEN, |s: &ExplicitState| s.get("x").unwrap_or(1) % 2 == 0);
    b.build()
}

fn properties() -> Vec<(&'static str, LiveExpr)> {
    let zero = LiveExpr::state_pred(AT_ZERO);
    let even = LiveExpr::state_pred(EVEN);
    vec![
        ("infinitely_often", LiveExpr::infinitely_often(zero.clone())),
        ("eventually_always", LiveExpr::eventually_always(even.clone())),
        ("leads_to", LiveExpr::leads_to(even.clone(), zero.clone())),
        (
            "conjunction",
            LiveExpr::and(vec![
                LiveExpr::infinitely_often(zero),
                LiveExpr::infinitely_often(even),
            ]),
        ),
    ]
}

/// Product of `prop` with the whole of `model`
fn saturated_graph(model: &ExplicitModel, n: i64, prop: &LiveExpr) -> BehaviorGraph<ExplicitState> {
    let tableau = Arc::new(Tableau::build(prop).unwrap());
    let mut graph = BehaviorGraph::new(tableau);
    let mut ctx = EvalContext::new();
    extend_all(model, n, &mut graph, &mut ctx);
    graph
}

fn extend_all(
    model: &ExplicitModel,
    n: i64,
    graph: &mut BehaviorGraph<ExplicitState>,
    ctx: &mut EvalContext,
) {
    let entry = |x: i64| {
        let s = model.state_by_values(&[x]).unwrap().clone();
        (s.fingerprint(), s)
    };
    graph.extend_initial(model, ctx, &[entry(0)]).unwrap();
    loop {
        let before = graph.len();
        for x in 0..n {
            let succs: Vec<(Fingerprint, ExplicitState)> =
                vec![entry((x + 1) % n), entry((2 * x) % n)];
            graph.extend(model, ctx, entry(x).0, &succs).unwrap();
        }
        if graph.len() == before {
            break;
        }
    }
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_tableau_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("tableau_build");
    for (name, prop) in properties() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &prop, |b, prop| {
            b.iter(|| Tableau::build(black_box(prop)).unwrap())
        });
    }
    let fair = LiveExpr::weak_fairness(PredicateId(2), PredicateId(3));
    let prop = LiveExpr::infinitely_often(LiveExpr::state_pred(AT_ZERO));
    group.bench_function("with_weak_fairness", |b| {
        b.iter(|| Tableau::build_with_fairness(black_box(&prop), black_box(&fair)).unwrap())
    });
    group.finish();
}

fn bench_graph_extend(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_extend");
    let prop = LiveExpr::leads_to(LiveExpr::state_pred(EVEN), LiveExpr::state_pred(AT_ZERO));
    let tableau = Arc::new(Tableau::build(&prop).unwrap());
    for n in [64i64, 256, 1024] {
        let model = ring_model(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let mut graph = BehaviorGraph::new(Arc::clone(&tableau));
                let mut ctx = EvalContext::new();
                extend_all(&model, n, &mut graph, &mut ctx);
                black_box(graph.len())
            })
        });
    }
    group.finish();
}

fn bench_scc_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scc_scan");
    let prop = LiveExpr::eventually_always(LiveExpr::state_pred(EVEN));
    for n in [64i64, 256, 1024] {
        let model = ring_model(n);
        let graph = saturated_graph(&model, n, &prop);
        group.throughput(Throughput::Elements(graph.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &graph, |b, graph| {
            b.iter(|| {
                let mut detector = BadCycleDetector::new();
                black_box(detector.scan(&graph.snapshot()))
            })
        });
    }
    group.finish();
}

fn bench_lasso_extract(c: &mut Criterion) {
    let prop = LiveExpr::eventually_always(LiveExpr::state_pred(EVEN));
    let n = 256;
    let model = ring_model(n);
    let graph = saturated_graph(&model, n, &prop);
    let report = BadCycleDetector::new().scan(&graph.snapshot()).unwrap();
    let scc = report.violating[0].clone();
    c.bench_function("lasso_extract_256", |b| {
        b.iter(|| lasso::extract(black_box(&scc), &graph).unwrap())
    });
}

fn bench_full_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_check");
    group.sample_size(20);
    let model = ring_model(512);
    for parallel in [false, true] {
        let config = LivenessConfig {
            parallel,
            ..LivenessConfig::default()
        };
        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_function(label, |b| {
            b.iter(|| {
                let mut checker = LivenessChecker::new(&model, config.clone());
                for (name, prop) in properties() {
                    checker = checker.property(name, prop);
                }
                black_box(checker.check())
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_tableau_build,
    bench_graph_extend,
    bench_scc_scan,
    bench_lasso_extract,
    bench_full_check
);
criterion_main!(benches);
