//! Randomized write-then-read verification of a register transport.
//!
//! Each iteration writes a random value to a random register and reads it straight back. The run
//! stops at the first iteration where the write isn't acknowledged, the read isn't acknowledged,
//! the data doesn't match, or the transport fails.

use crate::transport::Transport;
use rand::{
    rngs::StdRng,
    Rng,
    SeedableRng,
};
use std::ops::RangeInclusive;
use thiserror::Error;
use udpreg::frame::MAX_ADDRESS;
use tracing::{
    debug,
    info,
    warn,
};

pub const DEFAULT_ITERATIONS: usize = 100_000;
pub const DEFAULT_ADDRESSES: RangeInclusive<u32> = 0..=0xFFFF;

/// Parameters of one verification run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyConfig {
    pub iterations: usize,
    /// Registers are drawn uniformly from this range
    pub addresses: RangeInclusive<u32>,
    /// When `None` the generator is seeded from the OS
    pub seed: Option<u64>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            addresses: DEFAULT_ADDRESSES,
            seed: None,
        }
    }
}

impl VerifyConfig {
    /// Partition this run into at most `workers` runs over disjoint address ranges, so each can
    /// drive its own transport concurrently without clobbering another's registers. Iterations
    /// are spread as evenly as possible. Seeded configs give each part a distinct derived seed.
    ///
    /// The range is clamped to [`MAX_ADDRESS`] first, as wider addresses alias onto the same
    /// registers once truncated on the wire. A range with nothing at or below it stays whole.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn split(&self, workers: usize) -> Vec<VerifyConfig> {
        let start = *self.addresses.start();
        let end = (*self.addresses.end()).min(MAX_ADDRESS);
        if end < start {
            return vec![self.clone()];
        }
        let span = u64::from(end - start) + 1;
        // Never hand out an empty address range
        let parts = (workers.max(1) as u64).min(span);
        (0..parts)
            .map(|i| {
                let lo = u64::from(start) + span * i / parts;
                let hi = u64::from(start) + span * (i + 1) / parts - 1;
                let iterations = self.iterations / parts as usize
                    + usize::from((i as usize) < self.iterations % parts as usize);
                VerifyConfig {
                    iterations,
                    // Both bounds lie within the original u32 range
                    addresses: lo as u32..=hi as u32,
                    seed: self.seed.map(|s| s.wrapping_add(i)),
                }
            })
            .collect()
    }
}

/// What went wrong in a failing iteration
#[derive(Error, Debug)]
pub enum FailureKind {
    #[error("the write was not acknowledged")]
    WriteNotAcked,
    #[error("the read was not acknowledged")]
    ReadNotAcked,
    #[error("read back {received:#010x}")]
    DataMismatch { received: u32 },
    #[error("transport failure: {0}")]
    Transport(#[from] udpreg::Error),
}

/// The first iteration that didn't survive the round trip
#[derive(Error, Debug)]
#[error("Iteration {iteration} failed at address {address:#x} after writing {written:#010x}: {kind}")]
pub struct Failure {
    pub iteration: usize,
    pub address: u32,
    pub written: u32,
    pub kind: FailureKind,
}

impl Failure {
    /// The data read back, if a read completed at all
    #[must_use]
    pub fn received(&self) -> Option<u32> {
        match self.kind {
            FailureKind::DataMismatch { received } => Some(received),
            _ => None,
        }
    }

    /// Whether the protocol itself broke down (framing, timeout or socket), as opposed to the
    /// device answering with wrong data or the wrong ack
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(self.kind, FailureKind::Transport(_))
    }
}

/// The outcome of a verification run
#[derive(Debug)]
pub enum Report {
    Passed { iterations: usize },
    Failed(Failure),
}

impl Report {
    #[must_use]
    pub fn passed(&self) -> bool {
        matches!(self, Report::Passed { .. })
    }

    /// Turn a failing report into an error
    /// # Errors
    /// Returns the failure of a failed run
    pub fn into_result(self) -> Result<usize, Failure> {
        match self {
            Report::Passed { iterations } => Ok(iterations),
            Report::Failed(failure) => Err(failure),
        }
    }
}

/// Drives a [`Transport`] with random write/read pairs
#[derive(Debug)]
pub struct Verifier {
    config: VerifyConfig,
    rng: StdRng,
}

impl Verifier {
    #[must_use]
    pub fn new(config: VerifyConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    #[must_use]
    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    /// Run every iteration against `transport`, stopping at the first failure
    pub fn run<T>(&mut self, transport: &mut T) -> Report
    where
        T: Transport,
    {
        self.run_with_progress(transport, |_| {})
    }

    /// Like [`Verifier::run`], calling `progress` with the index of every iteration that passed.
    /// An empty address range has nothing to check and passes with zero iterations.
    pub fn run_with_progress<T, F>(&mut self, transport: &mut T, mut progress: F) -> Report
    where
        T: Transport,
        F: FnMut(usize),
    {
        info!(
            iterations = self.config.iterations,
            addresses = ?self.config.addresses,
            seed = ?self.config.seed,
            "Starting round-trip verification"
        );
        if self.config.addresses.is_empty() {
            warn!(addresses = ?self.config.addresses, "Empty address range, nothing to verify");
            return Report::Passed { iterations: 0 };
        }
        for iteration in 0..self.config.iterations {
            let address = self.rng.gen_range(self.config.addresses.clone());
            let written: u32 = self.rng.gen();
            if let Err(kind) = round_trip(transport, address, written) {
                let failure = Failure {
                    iteration,
                    address,
                    written,
                    kind,
                };
                warn!(%failure, "Round-trip verification failed");
                return Report::Failed(failure);
            }
            debug!(iteration, address, written, "Round trip ok");
            progress(iteration);
        }
        info!(
            iterations = self.config.iterations,
            "Round-trip verification passed"
        );
        Report::Passed {
            iterations: self.config.iterations,
        }
    }
}

fn round_trip<T>(transport: &mut T, address: u32, written: u32) -> Result<(), FailureKind>
where
    T: Transport,
{
    if !transport.write_register(address, written)? {
        return Err(FailureKind::WriteNotAcked);
    }
    match transport.read_register(address)? {
        None => Err(FailureKind::ReadNotAcked),
        Some(received) if received != written => Err(FailureKind::DataMismatch { received }),
        Some(_) => Ok(()),
    }
}
