//! Bounded fan-out of host pipelines.

use super::probe::{probe_host, ProbeOutcome, ProbeTimeouts};
use super::prober::Prober;
use crate::config::MAX_CONCURRENT_PROBES;
use crate::report::HostProbeResult;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Runs one pipeline per address with at most `concurrency` active at once.
pub struct ConcurrentProber {
    prober: Arc<dyn Prober>,
    timeouts: ProbeTimeouts,
    concurrency: usize,
}

impl ConcurrentProber {
    pub fn new(prober: Arc<dyn Prober>, timeouts: ProbeTimeouts) -> Self {
        Self {
            prober,
            timeouts,
            concurrency: MAX_CONCURRENT_PROBES,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Probe every address and return the live hosts in completion order.
    pub async fn probe_all(&self, addresses: &[Ipv4Addr]) -> Vec<HostProbeResult> {
        self.probe_all_with(addresses, |_, _| {}).await
    }

    /// Like [`probe_all`](Self::probe_all), calling `on_settled` with the
    /// number of settled hosts each time a pipeline finishes.
    ///
    /// Returns only after every pipeline has finished. A pipeline that panics
    /// counts as an unreachable host.
    pub async fn probe_all_with<F>(&self, addresses: &[Ipv4Addr], mut on_settled: F) -> Vec<HostProbeResult>
    where
        F: FnMut(usize, Option<&HostProbeResult>),
    {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for &address in addresses {
            let semaphore = semaphore.clone();
            let prober = self.prober.clone();
            let timeouts = self.timeouts;

            tasks.spawn(async move {
                // The semaphore is never closed, so acquiring cannot fail.
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return ProbeOutcome::Unreachable;
                };
                probe_host(prober.as_ref(), address, &timeouts).await
            });
        }

        let mut devices = Vec::new();
        let mut settled = 0;

        while let Some(joined) = tasks.join_next().await {
            settled += 1;
            match joined {
                Ok(ProbeOutcome::Resolved(result)) => {
                    tracing::debug!(
                        "Host {} is up ({:?} ms)",
                        result.address,
                        result.response_time_ms
                    );
                    on_settled(settled, Some(&result));
                    devices.push(result);
                }
                Ok(ProbeOutcome::Unreachable) => on_settled(settled, None),
                Err(e) => {
                    tracing::debug!("Scan task failed: {}", e);
                    on_settled(settled, None);
                }
            }
        }

        devices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::prober::Reachability;
    use crate::scanner::MacAddress;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Even last octets answer; octet 13 panics.
    struct EvenHosts;

    #[async_trait]
    impl Prober for EvenHosts {
        async fn check_reachability(&self, address: Ipv4Addr, _: Duration) -> Reachability {
            let last = address.octets()[3];
            if last == 13 {
                panic!("probe exploded for {}", address);
            }
            if last % 2 == 0 {
                Reachability::Reachable { elapsed_ms: 1.0 }
            } else {
                Reachability::Unreachable
            }
        }

        async fn resolve_hostname(&self, _: Ipv4Addr, _: Duration) -> Option<String> {
            None
        }

        async fn lookup_neighbor(&self, _: Ipv4Addr, _: Duration) -> Option<MacAddress> {
            None
        }
    }

    fn addresses(count: u8) -> Vec<Ipv4Addr> {
        (1..=count).map(|i| Ipv4Addr::new(10, 0, 0, i)).collect()
    }

    fn pool() -> ConcurrentProber {
        ConcurrentProber::new(
            Arc::new(EvenHosts),
            ProbeTimeouts::new(Duration::from_secs(1)),
        )
    }

    #[tokio::test]
    async fn test_only_live_hosts_returned() {
        let mut found: Vec<Ipv4Addr> = pool()
            .probe_all(&addresses(10))
            .await
            .into_iter()
            .map(|d| d.address)
            .collect();
        found.sort();
        let expected: Vec<Ipv4Addr> = (1..=5).map(|i| Ipv4Addr::new(10, 0, 0, i * 2)).collect();
        assert_eq!(found, expected);
    }

    #[tokio::test]
    async fn test_panicking_task_is_isolated() {
        let mut settled = 0;
        let devices = pool()
            .probe_all_with(&addresses(20), |done, _| settled = done)
            .await;
        assert_eq!(settled, 20);
        assert_eq!(devices.len(), 10);
        assert!(devices.iter().all(|d| d.address.octets()[3] != 13));
    }

    #[tokio::test]
    async fn test_empty_input() {
        assert!(pool().probe_all(&[]).await.is_empty());
    }

    #[test]
    fn test_concurrency_has_floor_of_one() {
        assert_eq!(pool().concurrency(), MAX_CONCURRENT_PROBES);
        assert_eq!(pool().with_concurrency(0).concurrency(), 1);
    }
}
