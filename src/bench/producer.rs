use core::fmt;
use core::ops::Range;
use std::thread;
use std::time::{Duration, Instant};
use std::vec::Vec;

use crate::error::Error;
use crate::list::Engine;
use crate::list::prelude::*;
use crate::logging::debug;

use super::Sample;

/// What the producer measured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerReport {
    /// Nodes inserted across all writers.
    pub inserted: usize,
    /// Number of writer threads used.
    pub writers: usize,
    /// Time from the first insertion to the last writer finishing.
    pub elapsed: Duration,
}

impl fmt::Display for ProducerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "main thread: time taken in adding {} nodes with {} writer(s) (usec): {}",
            self.inserted,
            self.writers,
            self.elapsed.as_micros()
        )
    }
}

/// Split `0..nodes` into `writers` contiguous ranges whose lengths differ by at most one.
pub(crate) fn split_ranges(nodes: usize, writers: usize) -> Vec<Range<usize>> {
    let writers = writers.max(1);
    let (chunk, extra) = (nodes / writers, nodes % writers);
    let mut start = 0;
    (0..writers)
        .map(|w| {
            let len = chunk + usize::from(w < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

fn insert_range(engine: &Engine<Sample>, range: Range<usize>) -> Result<usize, Error> {
    let len = range.len();
    for index in range {
        engine.insert(Sample::new(index as u64))?;
    }
    Ok(len)
}

/// Insert `Sample::new(i)` for every `i` in `0..nodes`.
///
/// With one writer the insertion runs on the calling thread in index order.
/// With more, each writer thread inserts its own contiguous range and all of
/// them run at once.
///
/// # Returns
/// * `Err` - The first error any writer hit; the other writers still finish
pub fn produce(
    engine: &Engine<Sample>,
    nodes: usize,
    writers: usize,
) -> Result<ProducerReport, Error> {
    let ranges = split_ranges(nodes, writers);
    let writers = ranges.len();
    debug!("Producing {} nodes with {} writer(s)", nodes, writers);

    let start = Instant::now();
    let inserted = if writers == 1 {
        insert_range(engine, 0..nodes)?
    } else {
        thread::scope(|s| {
            let handles: Vec<_> = ranges
                .into_iter()
                .map(|range| s.spawn(move || insert_range(engine, range)))
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .map_err(|_| Error::WorkerPanicked("writer"))
                        .and_then(|inserted| inserted)
                })
                .collect::<Vec<_>>()
                .into_iter()
                .sum::<Result<usize, Error>>()
        })?
    };

    Ok(ProducerReport {
        inserted,
        writers,
        elapsed: start.elapsed(),
    })
}
