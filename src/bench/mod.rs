//! Read-during-write benchmark.
//!
//! One run builds an engine, starts the consumer threads, then lets the
//! producer insert `nodes` samples. Each consumer sleeps for the initial
//! delay and then scans the engine over and over until a single pass observes
//! every sample. Nothing makes the consumers start before the first insert;
//! the retry loop is what guarantees they see the complete list regardless of
//! timing.
//!
//! The locked engine is scanned the way an indexed reader would: one lookup
//! per expected id, each under the list's mutex. The lock-free engine is
//! scanned by a traversal that never takes a lock.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use listbench::bench::{self, BenchConfig};
//! use listbench::list::Discipline;
//!
//! let config = BenchConfig::builder()
//!     .nodes(100)
//!     .consumers(2)
//!     .initial_delay(Duration::ZERO)
//!     .build()
//!     .unwrap();
//!
//! let report = bench::run(&config, Discipline::LockFree).unwrap();
//! assert!(report.converged());
//! assert_eq!(report.producer.inserted, 100);
//! ```
use core::fmt;
use std::thread;
use std::vec::Vec;

use crate::error::Error;
use crate::list::{Discipline, Engine};
use crate::logging::{debug, info};

mod config;
mod consumer;
mod producer;

#[cfg(test)]
mod tests;

pub use config::*;
pub use consumer::{CancelToken, Consumer, ConsumerOutcome, ConsumerReport};
pub use producer::{ProducerReport, produce};

/// The payload inserted by the benchmark.
///
/// `value` is always `index * 10`, so a reader can check that it is looking at
/// a completely written node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub index: u64,
    pub value: u64,
}

impl Sample {
    pub fn new(index: u64) -> Self {
        Self {
            index,
            value: index.wrapping_mul(10),
        }
    }

    pub fn is_intact(&self) -> bool {
        self.value == self.index.wrapping_mul(10)
    }
}

/// Results of one benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchReport {
    pub discipline: Discipline,
    pub producer: ProducerReport,
    /// One entry per consumer, ordered by consumer id.
    pub consumers: Vec<ConsumerOutcome>,
}

impl BenchReport {
    /// True if every consumer observed every node.
    pub fn converged(&self) -> bool {
        self.consumers.iter().all(ConsumerOutcome::is_converged)
    }

}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}] {}", self.discipline, self.producer)?;
        for outcome in &self.consumers {
            writeln!(f, "[{}] {}", self.discipline, outcome)?;
        }
        Ok(())
    }
}

/// Run the benchmark once against an engine of the given discipline.
///
/// Consumers are spawned before the producer starts inserting. Each thread
/// logs its line as soon as it finishes. If the producer fails, the consumers
/// are cancelled and the producer's error is returned once every thread has
/// stopped.
pub fn run(config: &BenchConfig, discipline: Discipline) -> Result<BenchReport, Error> {
    let engine = Engine::new(discipline, config.nodes)?;
    let cancel = CancelToken::new();
    debug!(
        "[{}] {} nodes, {} consumer(s), {} writer(s)",
        discipline,
        config.nodes,
        config.consumers,
        config.writers
    );

    thread::scope(|s| -> Result<BenchReport, Error> {
        let consumers: Vec<_> = (1..=config.consumers)
            .map(|id| {
                let consumer = Consumer::new(id, &engine, config, cancel.clone());
                s.spawn(move || consumer.run())
            })
            .collect();

        let producer = produce(&engine, config.nodes, config.writers);
        match &producer {
            Ok(report) => info!("[{}] {}", discipline, report),
            Err(_) => cancel.cancel(),
        }

        let outcomes: Vec<Result<ConsumerOutcome, Error>> = consumers
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| Error::WorkerPanicked("consumer"))
                    .and_then(|outcome| outcome)
            })
            .collect();

        Ok(BenchReport {
            discipline,
            producer: producer?,
            consumers: outcomes.into_iter().collect::<Result<_, _>>()?,
        })
    })
}

/// Run the benchmark for every discipline in the config, in order.
pub fn run_all(config: &BenchConfig) -> Result<Vec<BenchReport>, Error> {
    run_each(config, |_| {})
}

/// Like [`run_all`], but hands each report to `on_report` as soon as its run
/// ends, before the next discipline starts.
pub fn run_each<F>(config: &BenchConfig, mut on_report: F) -> Result<Vec<BenchReport>, Error>
where
    F: FnMut(&BenchReport),
{
    config
        .disciplines
        .iter()
        .map(|discipline| {
            let report = run(config, *discipline)?;
            on_report(&report);
            Ok(report)
        })
        .collect()
}
