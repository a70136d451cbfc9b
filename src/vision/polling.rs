//! Deadline-bounded polling over a batch of targets

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};

use super::error::{VisionError, VisionResult};
use crate::backend::{BackendResult, deadline_after};

/// Pause between two probing rounds
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Drop repeated targets, keeping the first occurrence and input order
pub fn unique_targets(targets: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(targets.len());
    for target in targets {
        if !unique.contains(target) {
            unique.push(target.clone());
        }
    }
    unique
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingEngine {
    poll_interval: Duration,
}

impl Default for PollingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PollingEngine {
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Probe every unsatisfied target once per round until all of them
    /// yield a value or the deadline passes.
    ///
    /// The deadline is fixed at entry. Reaching it is not an error here:
    /// the outcome tells which targets were never satisfied. Backend
    /// errors raised by `probe` abort the loop.
    pub async fn poll_each<T, F, Fut>(
        &self,
        targets: &[String],
        timeout: Duration,
        mut probe: F,
    ) -> VisionResult<PollOutcome<T>>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = BackendResult<Option<T>>>,
    {
        let mut outcome = PollOutcome::pending(unique_targets(targets));
        if outcome.is_empty() {
            return Ok(outcome);
        }

        let deadline = deadline_after(timeout);
        let mut round = 0u32;
        loop {
            round += 1;
            for (target, slot) in outcome.entries.iter_mut() {
                if slot.is_none() {
                    *slot = probe(target.clone()).await?;
                }
            }

            let pending = outcome.pending_count();
            log::debug!(
                "Poll round {}: {}/{} targets satisfied",
                round,
                outcome.len() - pending,
                outcome.len()
            );
            if pending == 0 {
                break;
            }

            let now = Instant::now();
            if now >= deadline {
                log::debug!("Deadline reached after {} rounds, {} pending", round, pending);
                break;
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }

        Ok(outcome)
    }

    /// Like [`PollingEngine::poll_each`], but every target must be satisfied
    /// before the deadline. Fails with `MatchTimeout` naming exactly the
    /// targets still missing.
    pub async fn poll_all<T, F, Fut>(
        &self,
        targets: &[String],
        timeout: Duration,
        probe: F,
    ) -> VisionResult<PollOutcome<T>>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = BackendResult<Option<T>>>,
    {
        let outcome = self.poll_each(targets, timeout, probe).await?;
        if outcome.is_complete() {
            Ok(outcome)
        } else {
            Err(VisionError::MatchTimeout {
                timeout,
                targets: outcome.missing(),
            })
        }
    }
}

/// Per-target result of a polling run, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome<T> {
    entries: Vec<(String, Option<T>)>,
}

impl<T> PollOutcome<T> {
    fn pending(targets: Vec<String>) -> Self {
        Self {
            entries: targets.into_iter().map(|target| (target, None)).collect(),
        }
    }

    fn pending_count(&self) -> usize {
        self.entries.iter().filter(|(_, slot)| slot.is_none()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.pending_count() == 0
    }

    /// Targets never satisfied
    pub fn missing(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, slot)| slot.is_none())
            .map(|(target, _)| target.clone())
            .collect()
    }

    /// Targets that were satisfied, with their values
    pub fn satisfied(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries
            .iter()
            .filter_map(|(target, slot)| slot.as_ref().map(|value| (target.as_str(), value)))
    }

    /// Resolve every slot, satisfied or not, into a final value
    pub fn into_map<U>(self, mut resolve: impl FnMut(Option<T>) -> U) -> TargetMap<U> {
        TargetMap {
            entries: self
                .entries
                .into_iter()
                .map(|(target, slot)| (target, resolve(slot)))
                .collect(),
        }
    }
}

/// Ordered target -> value mapping returned by batch operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMap<T> {
    entries: Vec<(String, T)>,
}

impl<T> TargetMap<T> {
    pub fn get(&self, target: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(name, _)| name == target)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries
            .iter()
            .map(|(target, value)| (target.as_str(), value))
    }

    pub fn targets(&self) -> Vec<&str> {
        self.entries.iter().map(|(target, _)| target.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for TargetMap<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> IntoIterator for TargetMap<T> {
    type Item = (String, T);
    type IntoIter = std::vec::IntoIter<(String, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<T: Serialize> Serialize for TargetMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (target, value) in &self.entries {
            map.serialize_entry(target, value)?;
        }
        map.end()
    }
}
