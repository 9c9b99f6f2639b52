use clap::Args;
use std::fmt;

use common::confirmation::{ConfirmationRecord, TrackerError};
use common::shard::{InvalidShardId, ShardId};

use crate::state::StateError;

#[derive(Args, Debug, Clone)]
#[command(about = "Wait until a custodian confirms storing a shard (Ctrl-C to stop)")]
pub struct Watch {
    pub shard_id: String,

    /// Print the known confirmation instead of waiting, if there is one
    #[arg(long)]
    pub history: bool,
}

#[derive(Debug)]
pub struct WatchOutput(ConfirmationRecord);

impl fmt::Display for WatchOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} confirmed by {} at block {}",
            self.0.shard_id, self.0.attesting_party, self.0.block_height
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error(transparent)]
    InvalidShardId(#[from] InvalidShardId),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Watch {
    type Error = WatchError;
    type Output = WatchOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let shard_id: ShardId = self.shard_id.parse()?;
        let services = ctx.services().await?;

        if self.history {
            if let Some(record) = services.tracker.query_history(&shard_id).await? {
                return Ok(WatchOutput(record));
            }
        }

        tracing::info!(shard_id = %shard_id, "waiting for storage confirmation");
        let record = services
            .tracker
            .watch_once_until(&shard_id, tokio::signal::ctrl_c())
            .await?;
        Ok(WatchOutput(record))
    }
}
