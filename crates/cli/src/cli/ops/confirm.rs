use clap::Args;
use std::fmt;

use common::confirmation::{ConfirmationRecord, TrackerError};
use common::event_log::TxReceipt;
use common::shard::{InvalidShardId, ShardId};

use crate::state::StateError;

#[derive(Args, Debug, Clone)]
#[command(about = "Attest, as a custodian, that shards are being stored")]
pub struct Confirm {
    /// Shard ids being attested
    #[arg(required = true)]
    pub shard_ids: Vec<String>,

    /// Name the attestation is made under
    #[arg(long)]
    pub party: String,
}

#[derive(Debug)]
pub struct ConfirmOutput {
    receipt: TxReceipt,
    records: Vec<ConfirmationRecord>,
}

impl fmt::Display for ConfirmOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Transaction {} included at block {}",
            self.receipt.tx_hash, self.receipt.block_height
        )?;
        for record in &self.records {
            writeln!(f, "  {} confirmed by {}", record.shard_id, record.attesting_party)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error(transparent)]
    InvalidShardId(#[from] InvalidShardId),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Confirm {
    type Error = ConfirmError;
    type Output = ConfirmOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let shard_ids = self
            .shard_ids
            .iter()
            .map(|id| id.parse())
            .collect::<Result<Vec<ShardId>, _>>()?;
        let services = ctx.services().await?;

        let (receipt, records) = services
            .tracker
            .confirm_storage(&shard_ids, &self.party)
            .await?;
        Ok(ConfirmOutput { receipt, records })
    }
}
