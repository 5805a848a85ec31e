use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{Instrument, Span, debug, error, info, warn};

use crate::butler::butler_pool::{ButlerPool, PoolReport};
use crate::inventory::DynamicInventorySource;
use crate::resource::setup_resource::SetupResource;
use crate::types::asset::Batch;
use crate::types::dispatch_message::DispatchMessage;

pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

const SOURCE_CHANNEL_CAPACITY: usize = 1;

#[derive(Debug, Clone)]
pub struct DispatchSummary {
    pub batches: usize,
    pub dispatched: usize,
    pub pool: PoolReport,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Moves batches from the inventory sources onto the butler queue.
pub struct Dispatcher {
    queue_capacity: usize,
    span: Span,
}

#[derive(Default)]
struct FeedStats {
    batches: usize,
    dispatched: usize,
}

impl Dispatcher {
    pub fn new(queue_capacity: usize, span: Span) -> Self {
        Self {
            queue_capacity: queue_capacity.max(1),
            span,
        }
    }

    /// Runs every source to completion and waits for the butlers to drain.
    ///
    /// A failing source stops the feed, but the queue is still closed and
    /// the pool awaited before the error is returned.
    pub async fn run<F>(
        &self,
        sources: Vec<DynamicInventorySource>,
        setup: Arc<SetupResource>,
        spawn_pool: F,
    ) -> Result<DispatchSummary>
    where
        F: FnOnce(mpsc::Receiver<DispatchMessage>) -> ButlerPool,
    {
        let started_at = Utc::now();

        let (batch_tx, mut batch_rx) = mpsc::channel::<Batch>(SOURCE_CHANNEL_CAPACITY);
        let mut producers = JoinSet::new();

        for source in sources {
            let channel = batch_tx.clone();
            let name = source.name();
            let span = tracing::info_span!(parent: &self.span, "inventory", source = name);

            producers.spawn(
                async move {
                    source
                        .produce_batches(channel)
                        .await
                        .with_context(|| format!("inventory source {name} failed"))
                }
                .instrument(span),
            );
        }
        drop(batch_tx);

        let (queue_tx, queue_rx) = mpsc::channel::<DispatchMessage>(self.queue_capacity);
        let pool = spawn_pool(queue_rx);

        let mut stats = FeedStats::default();
        let fed = self
            .feed(&mut producers, &mut batch_rx, &queue_tx, &setup, &mut stats)
            .instrument(self.span.clone())
            .await;

        if let Err(e) = &fed {
            error!(parent: &self.span, error = ?e, "inventory failed, stopping dispatch");
            producers.abort_all();
        }

        drop(queue_tx);
        let pool = pool.wait().await;

        info!(
            parent: &self.span,
            batches = stats.batches,
            dispatched = stats.dispatched,
            received = pool.received(),
            applied = pool.applied(),
            failed = pool.failed(),
            skipped = pool.skipped(),
            "butlers finished"
        );

        fed?;

        Ok(DispatchSummary {
            batches: stats.batches,
            dispatched: stats.dispatched,
            pool,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn feed(
        &self,
        producers: &mut JoinSet<Result<()>>,
        batches: &mut mpsc::Receiver<Batch>,
        queue: &mpsc::Sender<DispatchMessage>,
        setup: &Arc<SetupResource>,
        stats: &mut FeedStats,
    ) -> Result<()> {
        let mut channel_open = true;

        while channel_open || !producers.is_empty() {
            tokio::select! {
                biased;

                batch = batches.recv(), if channel_open => match batch {
                    Some(batch) => {
                        stats.batches += 1;
                        stats.dispatched += dispatch_batch(batch, queue, setup).await?;
                    }
                    None => {
                        debug!("all inventory sources closed");
                        channel_open = false;
                    }
                },
                Some(joined) = producers.join_next(), if !producers.is_empty() => {
                    joined.context("inventory source panicked")??;
                }
            }
        }

        Ok(())
    }
}

async fn dispatch_batch(
    batch: Batch,
    queue: &mpsc::Sender<DispatchMessage>,
    setup: &Arc<SetupResource>,
) -> Result<usize> {
    let mut dispatched = 0;

    for asset in batch {
        if !asset.is_dispatchable() {
            warn!(?asset, "asset without address reached dispatch, dropping it");
            continue;
        }

        queue
            .send(DispatchMessage::new(asset, setup.clone()))
            .await
            .context("butler queue closed while dispatching")?;
        dispatched += 1;
    }

    Ok(dispatched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::butler::ConfigApplier;
    use crate::butler::butler_pool::LocationPolicy;
    use crate::inventory::{BatchSender, InventorySource};
    use crate::types::asset::Asset;
    use anyhow::bail;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    struct ScriptedSource {
        batches: Vec<Batch>,
        fail_after: bool,
    }

    impl ScriptedSource {
        fn new(batches: Vec<Vec<&str>>) -> Self {
            Self {
                batches: batches
                    .into_iter()
                    .map(|batch| batch.into_iter().map(Asset::with_address).collect())
                    .collect(),
                fail_after: false,
            }
        }

        fn failing(mut self) -> Self {
            self.fail_after = true;
            self
        }
    }

    #[async_trait]
    impl InventorySource for ScriptedSource {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn produce_batches(&self, channel: BatchSender) -> Result<()> {
            for batch in &self.batches {
                channel.send(batch.clone()).await?;
            }
            if self.fail_after {
                bail!("page fetch failed: http://dora.local/v1/chassis");
            }
            Ok(())
        }
    }

    /// Records addresses and notes whether the queue was already closed.
    #[derive(Default)]
    struct RecordingApplier {
        seen: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        overlapped: AtomicBool,
    }

    #[async_trait]
    impl ConfigApplier for RecordingApplier {
        async fn apply(&self, asset: &Asset, _setup: &SetupResource) -> Result<()> {
            if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                self.overlapped.store(true, Ordering::SeqCst);
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.seen.lock().unwrap().push(asset.address.clone());
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn setup() -> Arc<SetupResource> {
        Arc::new(SetupResource::from_yaml("setup.yml", "syslog: {}\n").unwrap())
    }

    async fn run(
        sources: Vec<DynamicInventorySource>,
        butlers: usize,
        applier: Arc<RecordingApplier>,
    ) -> Result<DispatchSummary> {
        Dispatcher::new(DEFAULT_QUEUE_CAPACITY, Span::none())
            .run(sources, setup(), |queue| {
                ButlerPool::spawn(butlers, queue, applier, LocationPolicy::default(), Span::none())
            })
            .await
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_asset_from_every_source_reaches_a_butler() {
        let first = ScriptedSource::new(vec![
            (0..15).map(|_| "a").collect(),
            vec!["a", "a"],
        ]);
        let second = ScriptedSource::new(vec![vec!["b"; 30], vec![], vec!["b"; 4]]);
        let sources: Vec<DynamicInventorySource> = vec![Box::new(first), Box::new(second)];

        let applier = Arc::new(RecordingApplier::default());
        let summary = run(sources, 4, applier.clone()).await.unwrap();

        assert_eq!(summary.batches, 5);
        assert_eq!(summary.dispatched, 51);
        assert_eq!(summary.pool.received(), 51);
        assert_eq!(summary.pool.applied(), 51);
        assert_eq!(applier.seen.lock().unwrap().len(), 51);
        assert!(applier.in_flight.load(Ordering::SeqCst) == 0);
        assert!(summary.finished_at >= summary.started_at);
    }

    #[tokio::test]
    async fn preserves_order_within_a_single_source_and_butler() {
        let source = ScriptedSource::new(vec![vec!["1", "2", "3"], vec!["4", "5"]]);
        let sources: Vec<DynamicInventorySource> = vec![Box::new(source)];
        let applier = Arc::new(RecordingApplier::default());

        run(sources, 1, applier.clone()).await.unwrap();

        assert_eq!(*applier.seen.lock().unwrap(), vec!["1", "2", "3", "4", "5"]);
        assert!(!applier.overlapped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn no_sources_still_closes_and_drains() {
        let applier = Arc::new(RecordingApplier::default());
        let summary = run(Vec::new(), 3, applier).await.unwrap();

        assert_eq!(summary.dispatched, 0);
        assert_eq!(summary.pool.butlers.len(), 3);
    }

    #[tokio::test]
    async fn source_failure_is_returned_after_pool_drains() {
        let failing = ScriptedSource::new(vec![vec!["10.0.0.1", "10.0.0.2"]]).failing();
        let sources: Vec<DynamicInventorySource> = vec![Box::new(failing)];
        let applier = Arc::new(RecordingApplier::default());

        let error = run(sources, 2, applier.clone())
            .await
            .unwrap_err();

        assert!(format!("{error:#}").contains("http://dora.local/v1/chassis"));
        assert_eq!(applier.seen.lock().unwrap().len(), 2);
        assert_eq!(applier.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn addressless_assets_are_never_queued() {
        let source = ScriptedSource::new(vec![vec!["10.0.0.1", "", "10.0.0.2"]]);
        let sources: Vec<DynamicInventorySource> = vec![Box::new(source)];
        let applier = Arc::new(RecordingApplier::default());

        let summary = run(sources, 2, applier).await.unwrap();

        assert_eq!(summary.dispatched, 2);
        assert_eq!(summary.pool.received(), 2);
    }

    /// Sends one asset per batch and counts each completed send.
    struct TrickleSource {
        assets: usize,
        sent: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl InventorySource for TrickleSource {
        fn name(&self) -> &'static str {
            "trickle"
        }

        async fn produce_batches(&self, channel: BatchSender) -> Result<()> {
            for i in 0..self.assets {
                channel.send(vec![Asset::with_address(format!("10.0.1.{i}"))]).await?;
                self.sent.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    /// Slow applier tracking how far the source ran ahead of it.
    struct BacklogApplier {
        sent: Arc<AtomicUsize>,
        started: AtomicUsize,
        max_backlog: AtomicUsize,
    }

    #[async_trait]
    impl ConfigApplier for BacklogApplier {
        async fn apply(&self, _asset: &Asset, _setup: &SetupResource) -> Result<()> {
            let started = self.started.fetch_add(1, Ordering::SeqCst) + 1;
            let backlog = self.sent.load(Ordering::SeqCst).saturating_sub(started);
            self.max_backlog.fetch_max(backlog, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(2)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn full_queue_holds_back_the_sources() {
        const CAPACITY: usize = 3;
        const ASSETS: usize = 50;

        let sent = Arc::new(AtomicUsize::new(0));
        let applier = Arc::new(BacklogApplier {
            sent: sent.clone(),
            started: AtomicUsize::new(0),
            max_backlog: AtomicUsize::new(0),
        });
        let sources: Vec<DynamicInventorySource> = vec![Box::new(TrickleSource {
            assets: ASSETS,
            sent,
        })];

        let queue_capacity = Arc::new(AtomicUsize::new(0));
        let seen_capacity = queue_capacity.clone();
        let pool_applier = applier.clone();

        let summary = Dispatcher::new(CAPACITY, Span::none())
            .run(sources, setup(), move |queue| {
                seen_capacity.store(queue.max_capacity(), Ordering::SeqCst);
                ButlerPool::spawn(1, queue, pool_applier, LocationPolicy::default(), Span::none())
            })
            .await
            .unwrap();

        assert_eq!(queue_capacity.load(Ordering::SeqCst), CAPACITY);
        assert_eq!(summary.pool.applied(), ASSETS);

        // queue slots, plus one batch waiting in the source channel, one in
        // the dispatcher's hands and one taken by the butler
        let max_backlog = applier.max_backlog.load(Ordering::SeqCst);
        assert!(max_backlog <= CAPACITY + 3, "backlog reached {max_backlog}");
        assert!(max_backlog >= CAPACITY, "queue never filled: {max_backlog}");
    }
}
