pub mod ip_list;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::types::asset::Batch;

pub type BatchSender = mpsc::Sender<Batch>;

pub type DynamicInventorySource = Box<dyn InventorySource + Send + Sync>;

#[async_trait]
pub trait InventorySource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Sends zero or more batches, then returns. The sender is dropped on
    /// return, which is how the consumer learns this source is exhausted.
    async fn produce_batches(&self, channel: BatchSender) -> Result<()>;
}
