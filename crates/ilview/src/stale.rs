//! Generation-counter guard against stale asynchronous results.
//!
//! When the "current url" can change while a resolution is in flight, a
//! slow earlier resolution must not overwrite the outcome of a faster
//! later one. Each named channel carries a monotonically increasing
//! generation counter in a process-wide table: created lazily on first
//! use, never torn down, reset only by process restart. There is no lock
//! around the guarded computation, no queue, and no cancellation of
//! superseded work.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};

static GENERATIONS: OnceLock<Mutex<HashMap<String, u64>>> = OnceLock::new();

fn table() -> std::sync::MutexGuard<'static, HashMap<String, u64>> {
    GENERATIONS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Result of settling a guarded computation.
///
/// `Stale` is a valid discard outcome, not an error: the computation ran
/// to completion but a newer one started on the same channel in the
/// meantime, so its value must not be applied to visible state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    Fresh(T),
    Stale,
}

impl<T> Outcome<T> {
    pub fn is_stale(&self) -> bool {
        matches!(self, Outcome::Stale)
    }

    /// The value, if this outcome is the freshest one for its channel.
    pub fn fresh(self) -> Option<T> {
        match self {
            Outcome::Fresh(value) => Some(value),
            Outcome::Stale => None,
        }
    }
}

/// Captured generation marker for one invocation on one channel.
///
/// `begin` bumps the channel's latest generation and captures it; after
/// the wrapped computation completes, `settle` compares the captured
/// marker against the channel's latest. The superseded computation still
/// runs to completion: callers must ensure it has no observable side
/// effect besides its return value, or design for idempotent overwrite.
#[derive(Debug)]
pub struct StaleGuard {
    channel: String,
    generation: u64,
}

impl StaleGuard {
    /// Start a new invocation on `channel`, superseding any outstanding
    /// one.
    pub fn begin(channel: &str) -> StaleGuard {
        let mut generations = table();
        let slot = generations.entry(channel.to_string()).or_insert(0);
        *slot += 1;
        StaleGuard {
            channel: channel.to_string(),
            generation: *slot,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Tag `value` as fresh or stale depending on whether a newer
    /// invocation started on this channel since `begin`.
    pub fn settle<T>(self, value: T) -> Outcome<T> {
        let latest = table().get(&self.channel).copied().unwrap_or(0);
        if latest == self.generation {
            Outcome::Fresh(value)
        } else {
            Outcome::Stale
        }
    }
}

/// Run `computation` under a guard on `channel`.
pub async fn guarded<T, F>(channel: &str, computation: F) -> Outcome<T>
where
    F: Future<Output = T>,
{
    let guard = StaleGuard::begin(channel);
    let value = computation.await;
    guard.settle(value)
}
