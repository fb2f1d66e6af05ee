use core::ops::ControlFlow;
use std::format;
use std::string::ToString;
use std::thread;
use std::time::Duration;
use std::vec;
use std::vec::Vec;
use test_log::test;

use super::producer::split_ranges;
use super::*;
use crate::error::Error;
use crate::list::prelude::*;
use crate::list::{Discipline, Engine};

fn quick_config(nodes: usize, consumers: usize) -> BenchConfigBuilder {
    BenchConfig::builder()
        .nodes(nodes)
        .consumers(consumers)
        .initial_delay(Duration::ZERO)
        .timeout(Duration::from_secs(30))
}

#[test]
fn test_sample() {
    let sample = Sample::new(7);
    assert_eq!(sample.value, 70);
    assert!(sample.is_intact());
    assert!(!Sample { index: 7, value: 71 }.is_intact());
}

#[test]
fn test_split_ranges() {
    assert_eq!(split_ranges(10, 1), vec![0..10]);
    assert_eq!(split_ranges(10, 3), vec![0..4, 4..7, 7..10]);
    assert_eq!(split_ranges(2, 4), vec![0..1, 1..2, 2..2, 2..2]);
    assert_eq!(split_ranges(5, 0), vec![0..5]);

    let ranges = split_ranges(1001, 8);
    assert_eq!(ranges.iter().map(|r| r.len()).sum::<usize>(), 1001);
    assert!(ranges.windows(2).all(|w| w[0].end == w[1].start));
}

#[test]
fn test_produce_single_writer() {
    for discipline in Discipline::ALL {
        let engine = Engine::new(discipline, 100).unwrap();
        let report = produce(&engine, 100, 1).unwrap();
        assert_eq!(report.inserted, 100);
        assert_eq!(report.writers, 1);
        assert_eq!(engine.len(), 100);
    }

    // A single writer inserts in index order, so ids match indexes.
    let engine = Engine::new(Discipline::Locked, 50).unwrap();
    produce(&engine, 50, 1).unwrap();
    engine.visit(|id, sample| {
        assert_eq!(id, sample.index);
        ControlFlow::Continue(())
    });
}

#[test]
fn test_produce_multiple_writers() {
    for discipline in Discipline::ALL {
        let engine = Engine::new(discipline, 1000).unwrap();
        let report = produce(&engine, 1000, 4).unwrap();
        assert_eq!(report.inserted, 1000);
        assert_eq!(report.writers, 4);

        let mut indexes = Vec::new();
        engine.visit(|_, sample| {
            assert!(sample.is_intact());
            indexes.push(sample.index);
            ControlFlow::Continue(())
        });
        indexes.sort_unstable();
        assert_eq!(indexes, (0..1000).collect::<Vec<u64>>());
    }
}

#[test]
fn test_produce_past_capacity_fails() {
    let engine = Engine::new(Discipline::Locked, 10).unwrap();
    assert!(matches!(produce(&engine, 11, 1), Err(Error::Range { id: 10, .. })));
    assert_eq!(engine.len(), 10);
}

#[test]
fn test_scan_once_counts_visible_nodes() {
    let config = quick_config(20, 1).build().unwrap();
    for discipline in Discipline::ALL {
        let engine = Engine::new(discipline, config.nodes).unwrap();
        let consumer = Consumer::new(1, &engine, &config, CancelToken::new());
        assert_eq!(consumer.scan_once(), Ok(0));

        for i in 0..5 {
            engine.insert(Sample::new(i)).unwrap();
        }
        assert_eq!(consumer.scan_once(), Ok(5));

        for i in 5..20 {
            engine.insert(Sample::new(i)).unwrap();
        }
        assert_eq!(consumer.scan_once(), Ok(20));
    }
}

#[test]
fn test_scan_once_skips_corrupt_samples() {
    let config = quick_config(3, 1).build().unwrap();
    let engine = Engine::new(Discipline::LockFree, 3).unwrap();
    engine.insert(Sample::new(0)).unwrap();
    engine.insert(Sample { index: 1, value: 0 }).unwrap();
    engine.insert(Sample::new(2)).unwrap();

    let consumer = Consumer::new(1, &engine, &config, CancelToken::new());
    assert_eq!(consumer.scan_once(), Ok(2));
}

#[test]
fn test_scan_counts_never_decrease_while_producing() {
    let config = quick_config(2000, 1).build().unwrap();
    for discipline in Discipline::ALL {
        let engine = Engine::new(discipline, config.nodes).unwrap();
        let consumer = Consumer::new(1, &engine, &config, CancelToken::new());

        thread::scope(|s| {
            let reader = s.spawn(|| {
                let mut last = 0;
                loop {
                    let observed = consumer.scan_once().unwrap();
                    assert!(observed >= last, "{observed} < {last}");
                    last = observed;
                    if observed == config.nodes {
                        break;
                    }
                }
            });
            produce(&engine, config.nodes, 1).unwrap();
            reader.join().unwrap();
        });
    }
}

#[test]
fn test_consumer_converges_on_full_list() {
    let config = quick_config(100, 1).build().unwrap();
    for discipline in Discipline::ALL {
        let engine = Engine::new(discipline, config.nodes).unwrap();
        produce(&engine, config.nodes, 1).unwrap();

        let outcome = Consumer::new(3, &engine, &config, CancelToken::new())
            .run()
            .unwrap();
        let ConsumerOutcome::Converged(report) = outcome else {
            panic!("expected convergence, got {outcome:?}");
        };
        assert_eq!(report.consumer, 3);
        assert_eq!(report.observed, 100);
        assert_eq!(report.retries, 0);
    }
}

#[test]
fn test_consumer_gives_up_after_max_retries() {
    let config = quick_config(10, 1).max_retries(5).build().unwrap();
    for discipline in Discipline::ALL {
        let engine = Engine::new(discipline, config.nodes).unwrap();
        for i in 0..4 {
            engine.insert(Sample::new(i)).unwrap();
        }

        let outcome = Consumer::new(1, &engine, &config, CancelToken::new())
            .run()
            .unwrap();
        let ConsumerOutcome::DidNotConverge(report) = outcome else {
            panic!("expected to give up, got {outcome:?}");
        };
        assert_eq!(report.observed, 4);
        assert_eq!(report.retries, 5);
    }
}

#[test]
fn test_consumer_gives_up_after_timeout() {
    let config = quick_config(10, 1)
        .max_retries(u64::MAX)
        .timeout(Duration::from_millis(20))
        .build()
        .unwrap();
    let engine = Engine::new(Discipline::LockFree, config.nodes).unwrap();

    let outcome = Consumer::new(1, &engine, &config, CancelToken::new())
        .run()
        .unwrap();
    assert!(matches!(outcome, ConsumerOutcome::DidNotConverge(_)));
    assert!(outcome.report().elapsed >= Duration::from_millis(20));
}

#[test]
fn test_consumer_cancelled_while_sleeping() {
    let config = quick_config(10, 1)
        .initial_delay(Duration::from_secs(60))
        .build()
        .unwrap();
    let engine = Engine::new(Discipline::Locked, config.nodes).unwrap();
    let cancel = CancelToken::new();

    let outcome = thread::scope(|s| {
        let handle = s.spawn(|| Consumer::new(1, &engine, &config, cancel.clone()).run());
        thread::sleep(Duration::from_millis(20));
        cancel.cancel();
        handle.join().unwrap()
    })
    .unwrap();

    assert!(matches!(outcome, ConsumerOutcome::Cancelled(_)));
    assert_eq!(outcome.report().retries, 0);
}

#[test]
fn test_consumer_cancelled_while_scanning() {
    let config = quick_config(10, 1).max_retries(u64::MAX).build().unwrap();
    let engine = Engine::new(Discipline::LockFree, config.nodes).unwrap();
    let cancel = CancelToken::new();

    let outcome = thread::scope(|s| {
        let handle = s.spawn(|| Consumer::new(1, &engine, &config, cancel.clone()).run());
        thread::sleep(Duration::from_millis(20));
        cancel.cancel();
        handle.join().unwrap()
    })
    .unwrap();

    assert!(matches!(outcome, ConsumerOutcome::Cancelled(_)));
    assert!(!outcome.is_converged());
}

#[test]
fn test_run_converges_for_every_discipline() {
    let config = quick_config(1000, 4).build().unwrap();
    let reports = run_all(&config).unwrap();
    assert_eq!(reports.len(), 2);

    for (report, discipline) in reports.iter().zip(Discipline::ALL) {
        assert_eq!(report.discipline, discipline);
        assert!(report.converged(), "{report}");
        assert_eq!(report.producer.inserted, 1000);
        assert_eq!(report.consumers.len(), 4);
        for (i, outcome) in report.consumers.iter().enumerate() {
            assert_eq!(outcome.report().consumer, i + 1);
            assert_eq!(outcome.report().observed, 1000);
        }
    }
}

#[test]
fn test_run_with_multiple_writers() {
    let config = quick_config(2000, 2)
        .writers(4)
        .discipline(Discipline::LockFree)
        .build()
        .unwrap();
    let reports = run_all(&config).unwrap();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].converged());
    assert_eq!(reports[0].producer.writers, 4);
}

#[test]
fn test_run_edge_sizes() {
    for discipline in Discipline::ALL {
        // No consumers: the producer still runs.
        let report = run(&quick_config(10, 0).build().unwrap(), discipline).unwrap();
        assert!(report.consumers.is_empty());
        assert!(report.converged());
        assert_eq!(report.producer.inserted, 10);

        // No nodes: every consumer converges on its first pass.
        let report = run(&quick_config(0, 3).build().unwrap(), discipline).unwrap();
        assert!(report.converged());
        assert!(report.consumers.iter().all(|o| o.report().retries == 0));
    }
}

#[test]
fn test_report_display() {
    let report = ConsumerReport {
        consumer: 2,
        observed: 10,
        retries: 3,
        elapsed: Duration::from_micros(1500),
        last_pass: Duration::from_micros(40),
    };
    assert_eq!(
        report.to_string(),
        "thrdid: 2, nodes processed 10, retrycnt: 3, duration (usec): 1500, last pass (usec): 40"
    );

    let producer = ProducerReport {
        inserted: 10,
        writers: 1,
        elapsed: Duration::from_micros(25),
    };
    assert_eq!(
        producer.to_string(),
        "main thread: time taken in adding 10 nodes with 1 writer(s) (usec): 25"
    );
}

#[test]
fn test_outcome_display() {
    let report = ConsumerReport {
        consumer: 1,
        observed: 4,
        retries: 0,
        elapsed: Duration::from_micros(7),
        last_pass: Duration::from_micros(7),
    };
    let line = report.to_string();

    assert_eq!(ConsumerOutcome::Converged(report.clone()).to_string(), line);
    assert_eq!(
        ConsumerOutcome::DidNotConverge(report.clone()).to_string(),
        format!("did not converge: {line}")
    );
    assert_eq!(
        ConsumerOutcome::Cancelled(report).to_string(),
        format!("cancelled: {line}")
    );
}

#[test]
fn test_run_each_reports_after_every_run() {
    let config = quick_config(200, 2).build().unwrap();
    let mut delivered = Vec::new();

    let reports = run_each(&config, |report| {
        // Each report arrives before the next discipline has been run.
        assert_eq!(report.discipline, Discipline::ALL[delivered.len()]);
        delivered.push(report.clone());
    })
    .unwrap();

    assert_eq!(delivered.len(), Discipline::ALL.len());
    assert_eq!(delivered, reports);
    assert!(reports.iter().all(BenchReport::converged));
}
