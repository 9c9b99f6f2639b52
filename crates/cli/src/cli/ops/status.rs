use clap::Args;
use std::fmt;

use common::confirmation::{ShardStatus, TrackerError};

use crate::state::StateError;

#[derive(Args, Debug, Clone)]
#[command(about = "Show which uploaded shards custodians have confirmed")]
pub struct Status {
    /// Query the event journal for newer confirmations first
    #[arg(long)]
    pub sync: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug)]
pub struct StatusOutput {
    pub statuses: Vec<ShardStatus>,
    json: bool,
}

impl fmt::Display for StatusOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.json {
            return write!(
                f,
                "{}",
                serde_json::to_string_pretty(&self.statuses).unwrap_or_default()
            );
        }
        if self.statuses.is_empty() {
            return write!(f, "No uploaded shards. Use 'keysplit shard upload' to add one.");
        }

        writeln!(f, "{:<12}  {:<12}  {:<8}  {}", "SHARD", "STATUS", "BLOCK", "PARTY")?;
        writeln!(f, "{}", "-".repeat(60))?;
        for status in &self.statuses {
            match &status.confirmation {
                Some(record) => writeln!(
                    f,
                    "{:<12}  {:<12}  {:<8}  {}",
                    status.shard_id.short(),
                    "confirmed",
                    record.block_height,
                    record.attesting_party
                )?,
                None => writeln!(
                    f,
                    "{:<12}  {:<12}  {:<8}  {}",
                    status.shard_id.short(),
                    "unconfirmed",
                    "-",
                    "-"
                )?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Status {
    type Error = StatusError;
    type Output = StatusOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let services = ctx.services().await?;
        let statuses = if self.sync {
            services.tracker.sync_owned().await?
        } else {
            services.tracker.shard_status().await?
        };
        Ok(StatusOutput {
            statuses,
            json: self.json,
        })
    }
}
