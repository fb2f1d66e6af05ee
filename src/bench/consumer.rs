use core::fmt;
use core::ops::ControlFlow;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::Error;
use crate::list::prelude::*;
use crate::list::{Discipline, Engine, NodeId};
use crate::logging::{info, trace, warn};

use super::Sample;
use super::config::BenchConfig;

/// Longest uninterrupted sleep while waiting out the initial delay, so a
/// cancellation is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// A shared flag asking every consumer holding a clone to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// What a consumer measured by the time it stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerReport {
    /// 1-based consumer thread id.
    pub consumer: usize,
    /// Nodes counted by the last scan pass.
    pub observed: usize,
    /// Scan passes after the first one.
    pub retries: u64,
    /// Time from the first scan pass to the end of the last one.
    pub elapsed: Duration,
    /// Duration of the last scan pass alone.
    pub last_pass: Duration,
}

impl fmt::Display for ConsumerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "thrdid: {}, nodes processed {}, retrycnt: {}, ",
            self.consumer,
            self.observed,
            self.retries
        )?;
        write!(
            f,
            "duration (usec): {}, last pass (usec): {}",
            self.elapsed.as_micros(),
            self.last_pass.as_micros()
        )
    }
}

/// How a consumer stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerOutcome {
    /// A scan pass observed every expected node.
    Converged(ConsumerReport),
    /// The retry cap or the timeout was reached first.
    DidNotConverge(ConsumerReport),
    /// The run was cancelled.
    Cancelled(ConsumerReport),
}

impl ConsumerOutcome {
    pub fn report(&self) -> &ConsumerReport {
        match self {
            ConsumerOutcome::Converged(report)
            | ConsumerOutcome::DidNotConverge(report)
            | ConsumerOutcome::Cancelled(report) => report,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, ConsumerOutcome::Converged(_))
    }

    /// Log the outcome, tagged with the engine it was measured on.
    pub fn log(&self, discipline: Discipline) {
        if self.is_converged() {
            info!("[{}] {}", discipline, self);
        } else {
            warn!("[{}] {}", discipline, self);
        }
    }
}

impl fmt::Display for ConsumerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsumerOutcome::Converged(report) => write!(f, "{report}"),
            ConsumerOutcome::DidNotConverge(report) => write!(f, "did not converge: {report}"),
            ConsumerOutcome::Cancelled(report) => write!(f, "cancelled: {report}"),
        }
    }
}

enum ConsumerState {
    Sleeping,
    Scanning,
    Done(ConsumerOutcome),
}

/// A reader thread that scans an engine until it has seen every node.
pub struct Consumer<'a> {
    id: usize,
    engine: &'a Engine<Sample>,
    expected: usize,
    initial_delay: Duration,
    max_retries: u64,
    timeout: Duration,
    cancel: CancelToken,
}

impl<'a> Consumer<'a> {
    pub fn new(
        id: usize,
        engine: &'a Engine<Sample>,
        config: &BenchConfig,
        cancel: CancelToken,
    ) -> Self {
        Self {
            id,
            engine,
            expected: config.nodes,
            initial_delay: config.initial_delay,
            max_retries: config.max_retries,
            timeout: config.timeout,
            cancel,
        }
    }

    /// Count the nodes visible right now.
    ///
    /// On the locked engine every expected id is looked up through the index
    /// table, taking the lock once per id. On the lock-free engine the list is
    /// traversed once and only intact samples are counted.
    ///
    /// # Returns
    /// * `Err(Error::Range)` - If an expected id is outside the locked engine's table
    pub fn scan_once(&self) -> Result<usize, Error> {
        match self.engine {
            Engine::Locked(list) => (0..self.expected as NodeId).try_fold(0, |observed, id| {
                list.contains_by_id(id).map(|found| observed + usize::from(found))
            }),
            Engine::LockFree(list) => {
                let mut observed = 0;
                list.traverse(|id, sample| {
                    if sample.is_intact() {
                        observed += 1;
                    } else {
                        warn!("Consumer {} saw a corrupt node {}: {:?}", self.id, id, sample);
                    }
                    ControlFlow::Continue(())
                });
                Ok(observed)
            }
        }
    }

    /// Run the consumer to completion.
    ///
    /// Sleeps for the initial delay, then scans until a pass observes every
    /// expected node, the retry cap or timeout is hit, or the run is cancelled.
    /// The outcome is logged as soon as the consumer stops.
    pub fn run(self) -> Result<ConsumerOutcome, Error> {
        let mut state = ConsumerState::Sleeping;
        let mut started = Instant::now();
        let mut retries = 0;
        let mut observed = 0;
        let mut last_pass = Duration::ZERO;

        loop {
            state = match state {
                ConsumerState::Sleeping => {
                    if self.sleep_unless_cancelled() {
                        started = Instant::now();
                        ConsumerState::Scanning
                    } else {
                        ConsumerState::Done(ConsumerOutcome::Cancelled(
                            self.report(observed, retries, Duration::ZERO, last_pass),
                        ))
                    }
                }
                ConsumerState::Scanning => {
                    if self.cancel.is_cancelled() {
                        let report = self.report(observed, retries, started.elapsed(), last_pass);
                        ConsumerState::Done(ConsumerOutcome::Cancelled(report))
                    } else {
                        let pass = Instant::now();
                        observed = self.scan_once()?;
                        last_pass = pass.elapsed();
                        trace!("Consumer {} pass {} observed {}", self.id, retries, observed);

                        let report =
                            || self.report(observed, retries, started.elapsed(), last_pass);
                        if observed == self.expected {
                            ConsumerState::Done(ConsumerOutcome::Converged(report()))
                        } else if retries >= self.max_retries || started.elapsed() >= self.timeout {
                            ConsumerState::Done(ConsumerOutcome::DidNotConverge(report()))
                        } else {
                            retries += 1;
                            ConsumerState::Scanning
                        }
                    }
                }
                ConsumerState::Done(outcome) => {
                    outcome.log(self.engine.discipline());
                    return Ok(outcome);
                }
            };
        }
    }

    /// Returns false if cancelled before the delay ran out.
    fn sleep_unless_cancelled(&self) -> bool {
        let deadline = Instant::now() + self.initial_delay;
        loop {
            if self.cancel.is_cancelled() {
                return false;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }

    fn report(
        &self,
        observed: usize,
        retries: u64,
        elapsed: Duration,
        last_pass: Duration,
    ) -> ConsumerReport {
        ConsumerReport {
            consumer: self.id,
            observed,
            retries,
            elapsed,
            last_pass,
        }
    }
}
