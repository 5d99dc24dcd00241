//! Bounded polling with exponential backoff.
//!
//! The manager runs controller deployment and cluster preparation as
//! out-of-band jobs. Completion is confirmed by probing a status
//! endpoint until it reports a terminal state, never by a fixed sleep;
//! every wait has a deadline.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub deadline: Duration,
}

/// Controller deployments take several minutes each and the manager
/// refuses to run two at once.
pub const CONTROLLER_DEPLOY: PollPolicy = PollPolicy {
    initial_interval: Duration::from_secs(15),
    max_interval: Duration::from_secs(120),
    deadline: Duration::from_secs(1200),
};

/// Host preparation pushes VIBs to every host in the cluster.
pub const CLUSTER_PREP: PollPolicy = PollPolicy {
    initial_interval: Duration::from_secs(10),
    max_interval: Duration::from_secs(60),
    deadline: Duration::from_secs(600),
};

/// Probe until the closure reports a value or the deadline passes.
///
/// The interval doubles after every probe up to `max_interval`. A probe
/// error is terminal and propagates as-is; deadline expiry is a typed
/// [`Error::Timeout`] naming the operation.
pub async fn poll_until<T, F, Fut>(policy: PollPolicy, operation: &str, mut probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let started = Instant::now();
    let mut interval = policy.initial_interval;
    loop {
        if let Some(value) = probe().await? {
            return Ok(value);
        }
        if started.elapsed() + interval > policy.deadline {
            return Err(Error::Timeout {
                operation: operation.to_string(),
                waited_secs: started.elapsed().as_secs(),
            });
        }
        tokio::time::sleep(interval).await;
        interval = (interval * 2).min(policy.max_interval);
    }
}
