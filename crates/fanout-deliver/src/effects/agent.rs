//! Delivery agents: rate-limited channels with round-robin, failure-aware
//! selection.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::core::HealthState;

/// Enforces a minimum interval between sends on one channel.
///
/// The lock covers only the check, the sleep and the stamp, never the send
/// itself.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last_send: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_send: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep out the rest of the interval since the previous send, then stamp.
    pub async fn wait(&self) {
        let mut last_send = self.last_send.lock().await;
        if let Some(last) = *last_send {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        *last_send = Some(Instant::now());
    }
}

/// One secondary channel with its own pacer and failure counter.
#[derive(Debug)]
pub struct Agent<C> {
    id: usize,
    channel: C,
    pacer: Pacer,
    failures: AtomicU32,
}

impl<C> Agent<C> {
    pub fn new(id: usize, channel: C, interval: Duration) -> Self {
        Self {
            id,
            channel,
            pacer: Pacer::new(interval),
            failures: AtomicU32::new(0),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::Acquire)
    }

    pub fn health(&self, threshold: u32) -> HealthState {
        HealthState::from_failures(self.failures(), threshold)
    }

    pub fn record_success(&self) {
        self.failures.store(0, Ordering::Release);
    }

    /// Returns the new consecutive failure count.
    pub fn record_failure(&self) -> u32 {
        self.failures.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn reset(&self) {
        self.failures.store(0, Ordering::Release);
    }
}

/// Secondary agents behind a shared rotating cursor.
#[derive(Debug)]
pub struct AgentPool<C> {
    agents: Vec<Agent<C>>,
    cursor: AtomicUsize,
    threshold: u32,
}

impl<C> AgentPool<C> {
    /// Build a pool from channels, all sharing the same send interval.
    pub fn new(channels: impl IntoIterator<Item = C>, interval: Duration, threshold: u32) -> Self {
        let agents: Vec<_> = channels
            .into_iter()
            .enumerate()
            .map(|(id, channel)| Agent::new(id, channel, interval))
            .collect();

        if agents.is_empty() {
            warn!("no worker agents available, using primary channel only");
        } else {
            info!(agent_count = agents.len(), "worker agent pool ready");
        }

        Self {
            agents,
            cursor: AtomicUsize::new(0),
            threshold: threshold.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agents(&self) -> &[Agent<C>] {
        &self.agents
    }

    /// Pick the next agent below the failure threshold.
    ///
    /// Tries up to twice the pool size. When every agent is tripped, all
    /// counters are reset and the first agent is returned. `None` only for
    /// an empty pool.
    pub fn next(&self) -> Option<&Agent<C>> {
        let len = self.agents.len();
        if len == 0 {
            return None;
        }

        for _ in 0..len * 2 {
            let index = self.cursor.fetch_add(1, Ordering::AcqRel) % len;
            let agent = &self.agents[index];
            if agent.health(self.threshold).is_available() {
                return Some(agent);
            }
        }

        debug!(agent_count = len, "all agents tripped, resetting failure counters");
        for agent in &self.agents {
            agent.reset();
        }
        self.agents.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(size: usize) -> AgentPool<&'static str> {
        let names = ["a", "b", "c", "d"];
        AgentPool::new(names.into_iter().take(size), Duration::ZERO, 3)
    }

    #[test]
    fn test_round_robin() {
        let pool = pool(3);
        let ids: Vec<_> = (0..6).map(|_| pool.next().unwrap().id()).collect();
        assert_eq!(ids, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_skips_tripped_agents() {
        let pool = pool(3);
        for _ in 0..3 {
            pool.agents()[1].record_failure();
        }

        for _ in 0..6 {
            assert_ne!(pool.next().unwrap().id(), 1);
        }
        assert_eq!(pool.agents()[1].failures(), 3);
    }

    #[test]
    fn test_degraded_agent_still_selected() {
        let pool = pool(1);
        pool.agents()[0].record_failure();
        pool.agents()[0].record_failure();

        let agent = pool.next().unwrap();
        assert_eq!(agent.health(3), HealthState::Degraded(2));
    }

    #[test]
    fn test_all_tripped_resets_and_returns_first() {
        let pool = pool(2);
        for agent in pool.agents() {
            for _ in 0..3 {
                agent.record_failure();
            }
        }

        let agent = pool.next().unwrap();

        assert_eq!(agent.id(), 0);
        assert!(pool.agents().iter().all(|a| a.health(3) == HealthState::Healthy));
    }

    #[test]
    fn test_success_resets_counter() {
        let pool = pool(1);
        let agent = pool.next().unwrap();
        assert_eq!(agent.record_failure(), 1);
        assert_eq!(agent.record_failure(), 2);
        agent.record_success();
        assert_eq!(agent.failures(), 0);
    }

    #[test]
    fn test_empty_pool() {
        assert!(pool(0).next().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_spaces_sends() {
        let pacer = Pacer::new(Duration::from_millis(100));
        let start = Instant::now();

        pacer.wait().await;
        pacer.wait().await;
        pacer.wait().await;

        assert!(start.elapsed() >= Duration::from_millis(200));
        assert!(start.elapsed() < Duration::from_millis(300));
    }
}
