//! Randomized graphs: every run terminates and respects dependencies.

use dagrun::{
    FnElement, Graph, GraphBuilder, GraphRunner, NodeDisposition, OnFailure, RunnerConfig,
    StatusCode,
};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

struct Generated {
    graph: Arc<Graph>,
    // (node, predecessors) by index
    edges: Vec<Vec<usize>>,
    journal: Arc<Mutex<Vec<usize>>>,
}

// Acyclic by construction: node i only depends on nodes 0..i.
fn build(raw_deps: Vec<Vec<usize>>, failing: &HashSet<usize>) -> Generated {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let mut builder = GraphBuilder::new();
    let mut edges = Vec::new();
    let mut ids = Vec::new();

    for (i, potential) in raw_deps.into_iter().enumerate() {
        let log = journal.clone();
        let fail = failing.contains(&i);
        let id = builder
            .add_node(
                format!("node_{}", i),
                FnElement::new(move || {
                    log.lock().push(i);
                    if fail {
                        StatusCode::error("GENERATED", "node.failed")
                    } else {
                        StatusCode::ok()
                    }
                }),
            )
            .unwrap();
        ids.push(id);

        let deps: HashSet<usize> = if i == 0 {
            HashSet::new()
        } else {
            potential.into_iter().map(|d| d % i).collect()
        };
        for dep in &deps {
            builder.add_dependency(id, ids[*dep]).unwrap();
        }
        edges.push(deps.into_iter().collect());
    }

    Generated {
        graph: Arc::new(builder.build().unwrap()),
        edges,
        journal,
    }
}

fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_nodes).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), n)
    })
}

fn run(graph: &Arc<Graph>, workers: usize, on_failure: OnFailure) -> dagrun::GraphRunReport {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let config = RunnerConfig::builder()
        .max_workers(workers)
        .on_failure(on_failure)
        .build()
        .unwrap();
    let runner = GraphRunner::new(config).unwrap();
    runtime.block_on(runner.run(graph)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_every_node_runs_once_after_its_predecessors(
        raw in dag_strategy(24),
        workers in 1..6usize,
    ) {
        let generated = build(raw, &HashSet::new());
        let report = run(&generated.graph, workers, OnFailure::Continue);

        prop_assert!(report.is_ok());
        let journal = generated.journal.lock().clone();
        prop_assert_eq!(journal.len(), generated.edges.len());

        let position = |n: usize| journal.iter().position(|x| *x == n).unwrap();
        for (node, preds) in generated.edges.iter().enumerate() {
            for pred in preds {
                prop_assert!(position(*pred) < position(node));
            }
        }
    }

    #[test]
    fn test_every_node_is_accounted_for_under_any_policy(
        raw in dag_strategy(16),
        failing in proptest::collection::hash_set(0..16usize, 0..4),
        workers in 1..4usize,
        policy in prop_oneof![
            Just(OnFailure::Continue),
            Just(OnFailure::SkipDependents),
            Just(OnFailure::Stop),
        ],
    ) {
        let generated = build(raw, &failing);
        let report = run(&generated.graph, workers, policy);
        let nodes = generated.edges.len();

        prop_assert_eq!(report.outcomes.len(), nodes);
        let fails_somewhere = failing.iter().any(|i| *i < nodes);
        prop_assert_eq!(report.is_error(), fails_somewhere);

        if policy == OnFailure::Continue {
            prop_assert_eq!(report.count(NodeDisposition::NotReached), 0);
            prop_assert_eq!(report.count(NodeDisposition::Skipped), 0);
        }
        if policy != OnFailure::Stop {
            prop_assert_eq!(report.count(NodeDisposition::NotReached), 0);
        }
        if policy != OnFailure::SkipDependents {
            prop_assert_eq!(report.count(NodeDisposition::Skipped), 0);
        }
    }
}
