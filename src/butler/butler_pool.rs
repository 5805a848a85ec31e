use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{Instrument, Span, debug, error, info, warn};

use crate::butler::DynamicApplier;
use crate::types::asset::Asset;
use crate::types::dispatch_message::DispatchMessage;

pub type WorkQueue = Arc<Mutex<mpsc::Receiver<DispatchMessage>>>;

/// Sites this instance may configure.
#[derive(Debug, Clone, Default)]
pub struct LocationPolicy {
    allowed: Vec<String>,
    ignore: bool,
}

impl LocationPolicy {
    pub fn new(allowed: Vec<String>, ignore: bool) -> Self {
        Self { allowed, ignore }
    }

    pub fn permits(&self, asset: &Asset) -> bool {
        self.ignore || self.allowed.is_empty() || self.allowed.contains(&asset.location)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButlerReport {
    pub id: usize,
    pub applied: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ButlerReport {
    pub fn received(&self) -> usize {
        self.applied + self.failed + self.skipped
    }
}

#[derive(Debug, Clone, Default)]
pub struct PoolReport {
    pub butlers: Vec<ButlerReport>,
    pub crashed: usize,
}

impl PoolReport {
    pub fn received(&self) -> usize {
        self.butlers.iter().map(ButlerReport::received).sum()
    }

    pub fn applied(&self) -> usize {
        self.butlers.iter().map(|b| b.applied).sum()
    }

    pub fn failed(&self) -> usize {
        self.butlers.iter().map(|b| b.failed).sum()
    }

    pub fn skipped(&self) -> usize {
        self.butlers.iter().map(|b| b.skipped).sum()
    }
}

/// Fixed set of butlers draining one work queue until it is closed.
pub struct ButlerPool {
    butlers: JoinSet<ButlerReport>,
}

impl ButlerPool {
    pub fn spawn(
        count: usize,
        queue: mpsc::Receiver<DispatchMessage>,
        applier: DynamicApplier,
        policy: LocationPolicy,
        span: Span,
    ) -> Self {
        let queue: WorkQueue = Arc::new(Mutex::new(queue));
        let policy = Arc::new(policy);
        let mut butlers = JoinSet::new();

        for id in 0..count {
            let butler = Butler {
                id,
                queue: queue.clone(),
                applier: applier.clone(),
                policy: policy.clone(),
            };
            let span = tracing::info_span!(parent: &span, "butler", id);
            butlers.spawn(butler.run().instrument(span));
        }

        info!(parent: &span, count, "spawned butlers");

        Self { butlers }
    }

    /// Returns once every butler has exited.
    pub async fn wait(mut self) -> PoolReport {
        let mut report = PoolReport::default();

        while let Some(joined) = self.butlers.join_next().await {
            match joined {
                Ok(butler) => report.butlers.push(butler),
                Err(e) => {
                    error!(error = %e, "butler crashed");
                    report.crashed += 1;
                }
            }
        }

        report.butlers.sort_by_key(|b| b.id);
        report
    }
}

struct Butler {
    id: usize,
    queue: WorkQueue,
    applier: DynamicApplier,
    policy: Arc<LocationPolicy>,
}

impl Butler {
    async fn run(self) -> ButlerReport {
        let mut report = ButlerReport {
            id: self.id,
            ..ButlerReport::default()
        };

        loop {
            let message = { self.queue.lock().await.recv().await };
            let Some(message) = message else {
                break;
            };

            let asset = &message.asset;

            if !self.policy.permits(asset) {
                warn!(
                    address = %asset.address,
                    location = %asset.location,
                    "asset location is not one of ours, skipping"
                );
                report.skipped += 1;
                continue;
            }

            match self.applier.apply(asset, &message.setup).await {
                Ok(()) => {
                    debug!(address = %asset.address, "setup applied");
                    report.applied += 1;
                }
                Err(e) => {
                    error!(asset = %asset, error = %e, "setup failed");
                    report.failed += 1;
                }
            }
        }

        debug!(received = report.received(), "butler exiting, queue closed");
        report
    }
}
