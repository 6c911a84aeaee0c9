extern crate stylus;

mod common;

use stylus::prelude::*;

use crate::common::Trace;

fn parallel_settings() -> Settings {
    Settings {
        execution_thread: false,
        parallel_translate: true,
        num_workers: 2,
        ..Default::default()
    }
}

fn record_markers(seq: &mut CommandSequence, tag: &str, count: usize) {
    seq.begin();
    for i in 0..count {
        seq.push_marker(&format!("{}-{}", tag, i)).unwrap();
    }
}

fn expected_markers(tag: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("push_marker {}-{}", tag, i))
        .collect()
}

#[test]
fn trailing_undersized_unit_merges_into_its_predecessor() {
    let _ = env_logger::try_init();

    let executor = Executor::headless(parallel_settings()).unwrap();
    let shared = executor.shared();

    let mut a = shared.create_sequence("a");
    let mut b = shared.create_sequence("b");
    record_markers(&mut a, "a", 1000);
    record_markers(&mut b, "b", 10);

    let traces: Vec<Trace> = (0..4).map(|_| Trace::new()).collect();
    let contexts = traces
        .iter()
        .map(|v| Box::new(v.context()) as Box<dyn Context + Send>)
        .collect();

    let submit = shared
        .queue_parallel_submit(vec![a, b], contexts, 50)
        .unwrap();

    // 10 commands are not worth a worker dispatch of their own.
    assert_eq!(submit.unit_count(), 1);

    let outcome = submit.wait().unwrap();
    assert_eq!(outcome.sequences.len(), 2);
    assert_eq!(outcome.contexts.len(), 4);
    assert_eq!(outcome.stats.commands, 1010);

    // Both sequences landed on the first context, each in append order.
    let mut expected = expected_markers("a", 1000);
    expected.extend(expected_markers("b", 10));
    assert_eq!(traces[0].calls(), expected);
    for trace in &traces[1..] {
        assert!(trace.calls().is_empty());
    }
}

#[test]
fn units_split_once_the_threshold_is_reached() {
    let executor = Executor::headless(parallel_settings()).unwrap();
    let shared = executor.shared();

    let mut a = shared.create_sequence("a");
    let mut b = shared.create_sequence("b");
    let mut c = shared.create_sequence("c");
    record_markers(&mut a, "a", 100);
    record_markers(&mut b, "b", 60);
    record_markers(&mut c, "c", 10);

    let traces: Vec<Trace> = (0..2).map(|_| Trace::new()).collect();
    let contexts = traces
        .iter()
        .map(|v| Box::new(v.context()) as Box<dyn Context + Send>)
        .collect();

    let submit = shared
        .queue_parallel_submit(vec![a, b, c], contexts, 50)
        .unwrap();
    assert_eq!(submit.unit_count(), 2);

    let outcome = submit.wait().unwrap();
    assert_eq!(outcome.sequences.len(), 3);
    assert_eq!(outcome.contexts.len(), 2);

    assert_eq!(traces[0].calls(), expected_markers("a", 100));

    // Across units there is no order; within a unit, submission order holds.
    let mut expected = expected_markers("b", 60);
    expected.extend(expected_markers("c", 10));
    assert_eq!(traces[1].calls(), expected);
}

#[test]
fn unit_count_never_exceeds_the_contexts_supplied() {
    let executor = Executor::headless(parallel_settings()).unwrap();
    let shared = executor.shared();

    let mut sequences = Vec::new();
    for i in 0..4 {
        let mut seq = shared.create_sequence("bulk");
        record_markers(&mut seq, &format!("s{}", i), 100);
        sequences.push(seq);
    }

    let traces: Vec<Trace> = (0..2).map(|_| Trace::new()).collect();
    let contexts = traces
        .iter()
        .map(|v| Box::new(v.context()) as Box<dyn Context + Send>)
        .collect();

    let submit = shared.queue_parallel_submit(sequences, contexts, 50).unwrap();
    assert_eq!(submit.unit_count(), 2);

    let outcome = submit.wait().unwrap();
    assert_eq!(outcome.stats.commands, 400);
    assert_eq!(traces[0].len() + traces[1].len(), 400);
}

#[test]
fn parallel_translate_disabled_runs_units_inline() {
    let settings = Settings {
        parallel_translate: false,
        num_workers: 0,
        ..parallel_settings()
    };
    let executor = Executor::headless(settings).unwrap();
    let shared = executor.shared();

    let mut a = shared.create_sequence("a");
    let mut b = shared.create_sequence("b");
    record_markers(&mut a, "a", 30);
    record_markers(&mut b, "b", 30);

    let trace = Trace::new();
    let contexts = vec![Box::new(trace.context()) as Box<dyn Context + Send>];

    let submit = shared
        .queue_parallel_submit(vec![a, b], contexts, 50)
        .unwrap();
    assert_eq!(submit.unit_count(), 1);
    // Everything already replayed on the calling thread.
    assert_eq!(trace.len(), 60);

    let outcome = submit.wait().unwrap();
    assert_eq!(outcome.stats.commands, 60);
}

#[test]
fn a_panicking_unit_surfaces_as_an_error() {
    let executor = Executor::headless(parallel_settings()).unwrap();
    let shared = executor.shared();

    let mut seq = shared.create_sequence("poison");
    seq.begin();
    seq.push_marker("before").unwrap();
    seq.run(|_| panic!("poisoned translate")).unwrap();

    let trace = Trace::new();
    let contexts = vec![Box::new(trace.context()) as Box<dyn Context + Send>];

    let submit = shared
        .queue_parallel_submit(vec![seq], contexts, 50)
        .unwrap();

    match submit.wait() {
        Err(Error::TranslatePanic(msg)) => assert!(msg.contains("poisoned translate")),
        other => panic!("expected a translate panic, got {:?}", other.map(|_| ())),
    }
}
