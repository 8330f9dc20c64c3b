//! Per-subject command cooldowns
//!
//! An in-memory throttle, not a security boundary. Entries are never removed
//! on the hot path; an expired entry is simply re-armed. The periodic sweep
//! keeps the map bounded by the set of recently active subjects.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Outcome of a cooldown check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownStatus {
    /// Not on cooldown; a fresh cooldown has been armed
    Ready,
    /// Still cooling down; nothing was changed
    Active { remaining_secs: u64 },
}

impl CooldownStatus {
    #[cfg(test)]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

/// Expiry map for one gated command
#[derive(Debug, Default)]
pub struct CooldownTracker {
    entries: Mutex<HashMap<String, Instant>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the subject and, if it is not cooling down, arm `duration`.
    ///
    /// Check and arm happen under one lock, so two concurrent calls for the
    /// same subject can never both see `Ready`.
    pub fn check_and_arm(&self, subject: &str, duration: Duration) -> CooldownStatus {
        let now = Instant::now();
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(&expires_at) = entries.get(subject) {
            if now < expires_at {
                return CooldownStatus::Active {
                    remaining_secs: ceil_secs(expires_at - now),
                };
            }
        }

        entries.insert(subject.to_string(), now + duration);
        CooldownStatus::Ready
    }

    /// Current expiry for a subject, if one is recorded
    #[cfg(test)]
    pub fn expires_at(&self, subject: &str) -> Option<Instant> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(subject)
            .copied()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, expires_at| now < *expires_at);
        before - entries.len()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Cooldown trackers for every gated command
#[derive(Debug, Default)]
pub struct Cooldowns {
    pub build: CooldownTracker,
    pub profile: CooldownTracker,
    pub ping: CooldownTracker,
}

impl Cooldowns {
    pub fn sweep(&self) -> usize {
        self.build.sweep() + self.profile.sweep() + self.ping.sweep()
    }
}

/// Periodically sweep expired cooldowns until `shutdown` fires
pub fn spawn_sweeper(
    cooldowns: std::sync::Arc<Cooldowns>,
    every: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = cooldowns.sweep();
                    if removed > 0 {
                        tracing::debug!(removed, "Swept expired cooldowns");
                    }
                }
            }
        }
    })
}
