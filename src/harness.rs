//! Shared-counter stress test.
//!
//! Every participant repeatedly locks, increments one shared counter with a
//! separate load and store, and unlocks. Any overlap of two critical sections
//! can lose an increment, so a final count below `participants * iterations`
//! means mutual exclusion was broken.
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use clap::ValueEnum;

use crate::error::BakeryError;
use crate::threads::affinity;
use crate::threads::bakery::{BoundedBakery, NaiveBakery, OrderedBakery, RawBakery, Ticket};

pub const DEFAULT_PARTICIPANTS: usize = 16;
pub const DEFAULT_ITERATIONS: usize = 1_000_000;
pub const DEFAULT_CEILING: Ticket = 1 << 16;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Variant {
    Naive,
    #[default]
    Ordered,
    Bounded,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Variant::Naive => "naive",
            Variant::Ordered => "ordered",
            Variant::Bounded => "bounded",
        })
    }
}

/// Where participant threads may run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Pinning {
    /// Leave it to the scheduler.
    #[default]
    None,
    /// Participant `i` runs on the `i % k`-th allowed CPU.
    Spread,
    /// Every participant shares the first allowed CPU.
    Single,
}

impl Pinning {
    fn cpu_for(self, id: usize, cpus: &[usize]) -> Option<usize> {
        match self {
            Pinning::None => None,
            Pinning::Spread if !cpus.is_empty() => Some(cpus[id % cpus.len()]),
            Pinning::Spread => None,
            Pinning::Single => cpus.first().copied(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HarnessConfig {
    pub participants: usize,
    pub iterations: usize,
    pub variant: Variant,
    /// Only used by [`Variant::Bounded`].
    pub ceiling: Ticket,
    pub pinning: Pinning,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            participants: DEFAULT_PARTICIPANTS,
            iterations: DEFAULT_ITERATIONS,
            variant: Variant::default(),
            ceiling: DEFAULT_CEILING,
            pinning: Pinning::default(),
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<(), BakeryError> {
        if self.participants == 0 {
            return Err(BakeryError::NoParticipants);
        }
        if self.iterations == 0 {
            return Err(BakeryError::NoIterations);
        }
        self.expected().map(|_| ())
    }

    /// Total increments a correct run ends with.
    pub fn expected(&self) -> Result<u64, BakeryError> {
        let participants = u64::try_from(self.participants);
        let iterations = u64::try_from(self.iterations);
        match (participants, iterations) {
            (Ok(p), Ok(i)) => p.checked_mul(i),
            _ => None,
        }
        .ok_or(BakeryError::TooManyIterations {
            participants: self.participants,
            iterations: self.iterations,
        })
    }
}

#[derive(Clone, Debug)]
pub struct Report {
    pub variant: Variant,
    pub participants: usize,
    pub iterations: usize,
    pub expected: u64,
    pub observed: u64,
    /// Largest ticket any participant entered with.
    pub max_ticket: Ticket,
    pub elapsed: Duration,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.expected == self.observed
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Variant:    {}", self.variant)?;
        writeln!(f, "Threads:    {}", self.participants)?;
        writeln!(f, "Iterations: {}", self.iterations)?;
        writeln!(f, "Expected:   {}", self.expected)?;
        writeln!(f, "Observed:   {}", self.observed)?;
        writeln!(f, "Max ticket: {}", self.max_ticket)?;
        writeln!(f, "Elapsed:    {:.3?}", self.elapsed)?;
        write!(f, "{}", if self.passed() { "Passed!" } else { "FAILED!" })
    }
}

/// Critical-section state. Read-modify-write is split into a load and a
/// store on purpose: only the lock keeps two updates from interleaving.
#[derive(Default)]
struct Unsynchronized {
    counter: AtomicU64,
    max_ticket: AtomicUsize,
}

impl Unsynchronized {
    fn record(&self, ticket: Ticket) {
        let count = self.counter.load(Ordering::Relaxed);
        self.counter.store(count + 1, Ordering::Relaxed);
        if ticket > self.max_ticket.load(Ordering::Relaxed) {
            self.max_ticket.store(ticket, Ordering::Relaxed);
        }
    }
}

/// Build the configured variant and hammer it.
pub fn run(config: &HarnessConfig) -> Result<Report, BakeryError> {
    config.validate()?;
    match config.variant {
        Variant::Naive => run_with(config, &NaiveBakery::new(config.participants)),
        Variant::Ordered => run_with(config, &OrderedBakery::new(config.participants)),
        Variant::Bounded => run_with(
            config,
            &BoundedBakery::new(config.participants, config.ceiling)?,
        ),
    }
}

/// Hammer an already built lock. It must have room for `config.participants`.
pub fn run_with<L: RawBakery>(config: &HarnessConfig, lock: &L) -> Result<Report, BakeryError> {
    config.validate()?;
    debug_assert!(lock.participants() >= config.participants);

    let cpus = match config.pinning {
        Pinning::None => Vec::new(),
        Pinning::Spread | Pinning::Single => affinity::allowed_cpus()?,
    };
    tracing::info!(
        variant = %config.variant,
        participants = config.participants,
        iterations = config.iterations,
        pinning = ?config.pinning,
        "starting bakery run"
    );

    let shared = Unsynchronized::default();
    let start = Instant::now();
    thread::scope(|s| {
        let handles: Vec<_> = (0..config.participants)
            .map(|id| {
                let shared = &shared;
                let cpu = config.pinning.cpu_for(id, &cpus);
                let iterations = config.iterations;
                s.spawn(move || -> Result<(), BakeryError> {
                    if let Some(cpu) = cpu {
                        affinity::pin_current_thread(cpu)?;
                    }
                    for _ in 0..iterations {
                        let ticket = lock.lock(id);
                        shared.record(ticket); // critical section
                        lock.unlock(id);
                    }
                    tracing::debug!(id, "participant finished");
                    Ok(())
                })
            })
            .collect();

        handles
            .into_iter()
            .enumerate()
            .try_for_each(|(id, handle)| {
                handle
                    .join()
                    .map_err(|_| BakeryError::WorkerPanicked { id })?
            })
    })?;
    let elapsed = start.elapsed();

    let report = Report {
        variant: config.variant,
        participants: config.participants,
        iterations: config.iterations,
        expected: config.expected()?,
        observed: shared.counter.load(Ordering::Relaxed),
        max_ticket: shared.max_ticket.load(Ordering::Relaxed),
        elapsed,
    };
    if report.passed() {
        tracing::info!(observed = report.observed, ?elapsed, "run passed");
    } else {
        tracing::warn!(
            expected = report.expected,
            observed = report.observed,
            "lost updates, mutual exclusion violated"
        );
    }
    Ok(report)
}
