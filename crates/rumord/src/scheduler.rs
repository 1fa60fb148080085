//! Round scheduling

use crate::cluster::Cluster;
use crate::engine::RoundReport;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Scheduler errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Gossip interval must be positive")]
    ZeroInterval,
    #[error("Run duration must be positive")]
    ZeroDuration,
    #[error("Gossip interval {interval:?} exceeds run duration {duration:?}")]
    IntervalExceedsDuration {
        interval: Duration,
        duration: Duration,
    },
    #[error("Run duration {0:?} is too long to schedule")]
    DurationTooLong(Duration),
}

/// Aggregate counters over all rounds of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub rounds_started: u64,
    pub rounds_completed: u64,
    pub sends_attempted: u64,
    pub sends_delivered: u64,
    pub sends_failed: u64,
}

impl SchedulerStats {
    fn absorb(&mut self, report: &RoundReport) {
        self.rounds_completed += 1;
        self.sends_attempted += report.attempted as u64;
        self.sends_delivered += report.delivered.len() as u64;
        self.sends_failed += report.failed.len() as u64;
    }
}

/// Starts a round from a uniformly random node at a fixed interval until the
/// run duration has elapsed
pub struct Scheduler {
    interval: Duration,
    duration: Duration,
    rng: StdRng,
}

impl Scheduler {
    pub fn new(
        interval: Duration,
        duration: Duration,
        seed: Option<u64>,
    ) -> Result<Self, SchedulerError> {
        if interval.is_zero() {
            return Err(SchedulerError::ZeroInterval);
        }
        if duration.is_zero() {
            return Err(SchedulerError::ZeroDuration);
        }
        if interval > duration {
            return Err(SchedulerError::IntervalExceedsDuration { interval, duration });
        }
        // The deadline and the tick after it must both be representable
        if Instant::now()
            .checked_add(duration)
            .and_then(|deadline| deadline.checked_add(interval))
            .is_none()
        {
            return Err(SchedulerError::DurationTooLong(duration));
        }

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            interval,
            duration,
            rng,
        })
    }

    /// Drive rounds until the deadline, then wait for every round still in
    /// flight. Rounds are never cancelled.
    pub async fn run(&mut self, cluster: &Cluster) -> SchedulerStats {
        let mut stats = SchedulerStats::default();
        let mut rounds = JoinSet::new();

        if cluster.is_empty() {
            return stats;
        }

        let deadline = match Instant::now().checked_add(self.duration) {
            Some(deadline) => deadline,
            None => {
                warn!("Run duration {:?} overflows the clock, no rounds started", self.duration);
                return stats;
            }
        };
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if Instant::now() >= deadline {
                break;
            }

            let node = cluster.nodes()[self.rng.gen_range(0..cluster.len())].clone();
            debug!("Scheduling gossip round from Node {}", node.id());

            rounds.spawn(async move { node.gossip().await });
            stats.rounds_started += 1;
        }

        info!(
            "Run duration elapsed, waiting for {} in-flight rounds",
            rounds.len()
        );

        while let Some(res) = rounds.join_next().await {
            match res {
                Ok(report) => stats.absorb(&report),
                Err(e) => warn!("Gossip round panicked: {}", e),
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumor_core::Event;
    use rumor_net::{Latency, NoLatency, SimulatedTransport, UniformLatency};
    use std::sync::Arc;

    fn cluster(n: usize, latency: Arc<dyn Latency>) -> Cluster {
        Cluster::new(n, Arc::new(SimulatedTransport::new(latency.clone())), latency).unwrap()
    }

    #[test]
    fn test_parameter_validation() {
        let ms = Duration::from_millis;
        assert!(matches!(
            Scheduler::new(ms(0), ms(100), None),
            Err(SchedulerError::ZeroInterval)
        ));
        assert!(matches!(
            Scheduler::new(ms(10), ms(0), None),
            Err(SchedulerError::ZeroDuration)
        ));
        assert!(matches!(
            Scheduler::new(ms(200), ms(100), None),
            Err(SchedulerError::IntervalExceedsDuration { .. })
        ));
        assert!(Scheduler::new(ms(100), ms(100), None).is_ok());
    }

    #[test]
    fn test_unrepresentable_duration_rejected() {
        let result = Scheduler::new(Duration::from_millis(10), Duration::from_secs(u64::MAX), None);
        assert!(matches!(result, Err(SchedulerError::DurationTooLong(_))));

        // A long but representable run is still accepted
        let day = Duration::from_secs(24 * 60 * 60);
        assert!(Scheduler::new(Duration::from_secs(1), day, None).is_ok());
    }

    #[tokio::test]
    async fn test_run_joins_every_round() {
        let cluster = cluster(4, Arc::new(NoLatency));
        let mut scheduler = Scheduler::new(
            Duration::from_millis(10),
            Duration::from_millis(100),
            Some(42),
        )
        .unwrap();

        let stats = scheduler.run(&cluster).await;
        assert!(stats.rounds_started >= 1);
        assert_eq!(stats.rounds_started, stats.rounds_completed);
        assert_eq!(stats.sends_attempted, stats.rounds_started * 3);
        assert_eq!(stats.sends_delivered, stats.sends_attempted);
        assert_eq!(stats.sends_failed, 0);

        // Every send left exactly one "sent" and one "received" record
        let total: usize = cluster.nodes().iter().map(|n| n.log_len()).sum();
        assert_eq!(total as u64, stats.sends_delivered * 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_rounds_started_near_deadline_complete() {
        // Latency far exceeds the interval so rounds overlap and outlive the deadline
        let cluster = cluster(5, Arc::new(UniformLatency::from_millis(50)));
        let mut scheduler = Scheduler::new(
            Duration::from_millis(5),
            Duration::from_millis(40),
            Some(7),
        )
        .unwrap();

        let stats = scheduler.run(&cluster).await;
        assert_eq!(stats.rounds_started, stats.rounds_completed);

        let received: usize = cluster
            .nodes()
            .iter()
            .map(|n| n.log().iter().filter(|r| r.event == Event::Received).count())
            .sum();
        assert_eq!(received as u64, stats.sends_delivered);
    }

    #[tokio::test]
    async fn test_single_node_cluster() {
        let cluster = cluster(1, Arc::new(NoLatency));
        let mut scheduler = Scheduler::new(
            Duration::from_millis(10),
            Duration::from_millis(30),
            Some(1),
        )
        .unwrap();

        let stats = scheduler.run(&cluster).await;
        assert!(stats.rounds_started >= 1);
        assert_eq!(stats.sends_attempted, 0);
    }
}
