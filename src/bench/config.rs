use std::format;
use std::string::{String, ToString};
use std::time::Duration;
use std::vec;
use std::vec::Vec;

use crate::error::Error;
use crate::list::Discipline;

/// Printed when the command line cannot be parsed.
pub const USAGE: &str = "Usage: listbench <nodecnt> <thrdcnt>";

/// Delay before a consumer starts scanning.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(2);
/// Scan passes a consumer may retry before giving up.
pub const DEFAULT_MAX_RETRIES: u64 = 1_000_000;
/// Time a consumer may spend scanning before giving up.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub const ENV_DISCIPLINE: &str = "LISTBENCH_DISCIPLINE";
pub const ENV_WRITERS: &str = "LISTBENCH_WRITERS";
pub const ENV_INITIAL_DELAY_MS: &str = "LISTBENCH_INITIAL_DELAY_MS";
pub const ENV_MAX_RETRIES: &str = "LISTBENCH_MAX_RETRIES";
pub const ENV_TIMEOUT_MS: &str = "LISTBENCH_TIMEOUT_MS";

/// Parameters of a benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    /// Number of nodes the producer inserts and every consumer must observe.
    pub nodes: usize,
    /// Number of consumer threads.
    pub consumers: usize,
    /// Number of writer threads sharing the insertion of `nodes`.
    pub writers: usize,
    /// Engines to benchmark, one run each, in this order.
    pub disciplines: Vec<Discipline>,
    pub initial_delay: Duration,
    pub max_retries: u64,
    pub timeout: Duration,
}

impl BenchConfig {
    pub fn builder() -> BenchConfigBuilder {
        BenchConfigBuilder::new()
    }
}

/// Builder for [`BenchConfig`].
///
/// Starts from the defaults, then takes values from the command line, the
/// environment, or explicit setters. [`BenchConfigBuilder::build`] validates
/// the result.
#[derive(Debug, Clone)]
pub struct BenchConfigBuilder {
    nodes: usize,
    consumers: usize,
    writers: usize,
    disciplines: Vec<Discipline>,
    initial_delay: Duration,
    max_retries: u64,
    timeout: Duration,
}

impl Default for BenchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BenchConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            nodes: 0,
            consumers: 0,
            writers: 1,
            disciplines: Discipline::ALL.to_vec(),
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a builder from the positional arguments `<nodecnt> <thrdcnt>`.
    ///
    /// # Arguments
    /// * `args` - The arguments without the program name
    ///
    /// # Returns
    /// * `Err(Error::Usage)` - If there are not exactly two arguments or one
    ///   of them is not a non-negative integer
    pub fn from_args<I, S>(args: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let [nodes, consumers] = args.as_slice() else {
            return Err(Error::Usage(format!("expected 2 arguments, got {}", args.len())));
        };

        Ok(Self::new()
            .nodes(parse_number("nodecnt", nodes.as_ref())?)
            .consumers(parse_number("thrdcnt", consumers.as_ref())?))
    }

    /// Apply the `LISTBENCH_*` environment variables found through `lookup`.
    ///
    /// Unset variables leave the current value alone.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_DISCIPLINE) {
            self.disciplines = parse_disciplines(&value)?;
        }
        if let Some(value) = lookup(ENV_WRITERS) {
            self.writers = parse_number(ENV_WRITERS, &value)?;
        }
        if let Some(value) = lookup(ENV_INITIAL_DELAY_MS) {
            self.initial_delay = Duration::from_millis(parse_number(ENV_INITIAL_DELAY_MS, &value)?);
        }
        if let Some(value) = lookup(ENV_MAX_RETRIES) {
            self.max_retries = parse_number(ENV_MAX_RETRIES, &value)?;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            self.timeout = Duration::from_millis(parse_number(ENV_TIMEOUT_MS, &value)?);
        }
        Ok(self)
    }

    pub fn nodes(mut self, nodes: usize) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn consumers(mut self, consumers: usize) -> Self {
        self.consumers = consumers;
        self
    }

    pub fn writers(mut self, writers: usize) -> Self {
        self.writers = writers;
        self
    }

    /// Benchmark a single discipline.
    pub fn discipline(mut self, discipline: Discipline) -> Self {
        self.disciplines = vec![discipline];
        self
    }

    pub fn initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    pub fn max_retries(mut self, max_retries: u64) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate the settings and build the config.
    ///
    /// # Returns
    /// * `Err(Error::Usage)` - If no writer would insert the nodes
    pub fn build(self) -> Result<BenchConfig, Error> {
        if self.writers == 0 && self.nodes > 0 {
            return Err(Error::Usage("at least one writer is needed".to_string()));
        }
        Ok(BenchConfig {
            nodes: self.nodes,
            consumers: self.consumers,
            writers: self.writers.max(1),
            disciplines: self.disciplines,
            initial_delay: self.initial_delay,
            max_retries: self.max_retries,
            timeout: self.timeout,
        })
    }
}

fn parse_number<N: core::str::FromStr>(name: &str, value: &str) -> Result<N, Error> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Usage(format!("{name} must be a non-negative integer, got `{value}`")))
}

fn parse_disciplines(value: &str) -> Result<Vec<Discipline>, Error> {
    if value.trim().eq_ignore_ascii_case("both") {
        Ok(Discipline::ALL.to_vec())
    } else {
        value.parse().map(|discipline| vec![discipline])
    }
}
