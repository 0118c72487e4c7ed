use procflow_rust::query::{group_critical_path, group_headcount, upstream_headcount};
use procflow_rust::{
    headcount, process, validate, EngineConfig, ProcessedGraph, TaskRecord, ValidationErrorKind,
};

fn l6(parent: &str, id: &str, t: f64, p: f64, succs: &[&str]) -> TaskRecord {
    TaskRecord::l6("[D1] Delivery", parent, id)
        .with_resources(p, t, 1.0)
        .with_successors(succs.iter().copied())
}

fn ids(path: &[&str]) -> Vec<String> {
    path.iter().map(|s| s.to_string()).collect()
}

fn count(processed: &ProcessedGraph, kind: ValidationErrorKind) -> usize {
    processed.errors_of_kind(kind).count()
}

#[test]
fn scenario_a_linear_chain() {
    let records = vec![
        TaskRecord::l5("[D1] Delivery", "G"),
        l6("G", "X", 2.0, 3.0, &["Y"]),
        l6("G", "Y", 3.0, 2.0, &["Z"]),
        l6("G", "Z", 1.0, 4.0, &[]),
    ];
    let config = EngineConfig::default();
    let processed = process(&records, &config);
    assert!(processed.errors.is_empty(), "{:?}", processed.errors);

    let path = group_critical_path(&processed.graph, "G", &config).unwrap();
    assert_eq!(path.paths, vec![ids(&["G::X", "G::Y", "G::Z"])]);
    assert_eq!(path.total_duration, 6.0);

    let hc = group_headcount(&processed.graph, "G", &config).unwrap();
    let spans: Vec<(f64, f64, f64)> = hc
        .intervals
        .iter()
        .map(|iv| (iv.start_week, iv.end_week, iv.headcount))
        .collect();
    assert_eq!(
        spans,
        vec![(0.0, 2.0, 3.0), (2.0, 5.0, 2.0), (5.0, 6.0, 4.0)]
    );
    assert_eq!(hc.intervals[0].active_task_ids, ids(&["G::X"]));
    assert_eq!(hc.max_headcount, 4.0);
    assert_eq!(hc.total_weeks, 6.0);

    // the parent carries its children's sums
    let parent = processed.graph.l5.get("G").unwrap();
    assert_eq!(parent.duration_weeks, 6.0);
    assert_eq!(parent.headcount, 9.0);
    assert_eq!(parent.effort, 3.0);
}

#[test]
fn scenario_b_diamond() {
    let records = vec![
        TaskRecord::l5("[D1] Delivery", "G"),
        l6("G", "X", 2.0, 3.0, &["Y", "W"]),
        l6("G", "Y", 3.0, 2.0, &["Z"]),
        l6("G", "W", 4.0, 1.0, &["Z"]),
        l6("G", "Z", 1.0, 4.0, &[]),
    ];
    let config = EngineConfig::default();
    let processed = process(&records, &config);

    let path = group_critical_path(&processed.graph, "G", &config).unwrap();
    assert_eq!(path.paths, vec![ids(&["G::X", "G::W", "G::Z"])]);
    assert_eq!(path.total_duration, 7.0);
    assert_eq!(path.all_path_node_ids, ids(&["G::X", "G::W", "G::Z"]));

    let hc = group_headcount(&processed.graph, "G", &config).unwrap();
    assert_eq!(hc.headcount_at(3.0), 3.0);
    assert_eq!(hc.total_weeks, 7.0);
}

#[test]
fn scenario_c_self_loop() {
    let records = vec![TaskRecord::l5("Ops", "S").with_successors(["S"])];
    let processed = process(&records, &EngineConfig::default());

    assert_eq!(count(&processed, ValidationErrorKind::SelfLoopError), 1);
    let s = processed.graph.l5.get("S").unwrap();
    assert!(!s.successors.contains(&"S".to_string()));
    assert!(!s.predecessors.contains(&"S".to_string()));

    // a second pass over the repaired graph finds nothing more to strip
    let again = validate(processed.graph.clone(), &EngineConfig::default());
    assert!(again
        .errors
        .iter()
        .all(|e| e.kind != ValidationErrorKind::SelfLoopError));
}

#[test]
fn scenario_d_missing_reference() {
    let records = vec![TaskRecord::l5("Ops", "M").with_predecessors(["Q99"])];
    let processed = process(&records, &EngineConfig::default());

    assert_eq!(count(&processed, ValidationErrorKind::MissingPredecessor), 1);
    let error = processed
        .errors_of_kind(ValidationErrorKind::MissingPredecessor)
        .next()
        .unwrap();
    assert_eq!(error.source_task_id, "M");
    assert_eq!(error.missing_task_id.as_deref(), Some("Q99"));

    let placeholder = processed.graph.l5.get("Q99").unwrap();
    assert_eq!(placeholder.category, "Unspecified");
    assert_eq!(placeholder.successors, ids(&["M"]));
    assert!(placeholder.is_placeholder);
}

#[test]
fn scenario_e_two_cycle() {
    let records = vec![
        TaskRecord::l5("Ops", "A").with_successors(["B"]),
        TaskRecord::l5("Ops", "B").with_successors(["A"]),
    ];
    let processed = process(&records, &EngineConfig::default());

    assert_eq!(count(&processed, ValidationErrorKind::BidirectionalError), 1);
    assert!(processed.graph.l5.get("A").unwrap().has_cycle);
    assert!(processed.graph.l5.get("B").unwrap().has_cycle);

    // aggregation still terminates on the cycle
    let a = processed.graph.l5.get("A").unwrap();
    assert!(a.cumulative_effort.is_some());
}

#[test]
fn upstream_schedule_uses_group_peaks() {
    let records = vec![
        TaskRecord::l5("Ops", "G").with_successors(["H"]),
        l6("G", "a", 2.0, 3.0, &["b"]),
        l6("G", "b", 2.0, 2.0, &[]),
        TaskRecord::l5("Ops", "H")
            .with_resources(1.0, 1.0, 1.0)
            .with_predecessors(["G"]),
    ];
    let config = EngineConfig::default();
    let processed = process(&records, &config);

    let hc = upstream_headcount(&processed.graph, "H", &config).unwrap();
    // G rolls up to T=4 and P=5, but a and b run one after the other: peak 3
    assert_eq!(processed.graph.l5.get("G").unwrap().headcount, 5.0);
    assert_eq!(hc.intervals[0].headcount, 3.0);
    assert_eq!(hc.intervals[0].end_week, 4.0);
    assert_eq!(hc.max_headcount, 3.0);
    assert_eq!(hc.total_weeks, 5.0);
}

#[test]
fn bidirectional_ladder_stays_linear() {
    // 30 rungs of two tasks, every rung linked both ways to the next
    let depth = 30;
    let name = |layer: usize, rail: usize| format!("R{}_{}", layer, rail);
    let mut records = Vec::new();
    for layer in 0..depth {
        for rail in 0..2 {
            let mut neighbours = Vec::new();
            for other in 0..2 {
                if layer > 0 {
                    neighbours.push(name(layer - 1, other));
                }
                if layer + 1 < depth {
                    neighbours.push(name(layer + 1, other));
                }
            }
            records.push(
                TaskRecord::l5("Ops", &name(layer, rail))
                    .with_resources(1.0, 1.0, 1.0)
                    .with_successors(neighbours.clone())
                    .with_predecessors(neighbours),
            );
        }
    }
    let config = EngineConfig::default();
    let processed = process(&records, &config);

    assert_eq!(processed.graph.l5.len(), 60);
    assert!(count(&processed, ValidationErrorKind::BidirectionalError) > 0);
    assert!(processed
        .graph
        .l5
        .iter()
        .all(|t| t.cumulative_effort.is_some()));

    let hc = headcount(processed.graph.l5.iter(), &config);
    assert!(!hc.intervals.is_empty());
    assert!(hc.total_weeks >= 1.0 && hc.total_weeks <= 60.0);
}
