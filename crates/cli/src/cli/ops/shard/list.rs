//! List owned and held shards

use clap::Args;
use std::fmt;

use common::shard::ShardId;
use serde::Serialize;

use super::ShardOpError;

#[derive(Args, Debug, Clone)]
#[command(about = "List shards uploaded by and kept by this account")]
pub struct List {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct Listing {
    pub owned: Vec<ShardId>,
    pub held: Vec<ShardId>,
}

#[derive(Debug)]
pub struct ListOutput {
    pub listing: Listing,
    json: bool,
}

impl fmt::Display for ListOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.json {
            return write!(
                f,
                "{}",
                serde_json::to_string_pretty(&self.listing).unwrap_or_default()
            );
        }

        writeln!(f, "{:<8}  {}", "KIND", "SHARD ID")?;
        writeln!(f, "{}", "-".repeat(74))?;
        for shard_id in &self.listing.owned {
            writeln!(f, "{:<8}  {}", "uploaded", shard_id)?;
        }
        for shard_id in &self.listing.held {
            writeln!(f, "{:<8}  {}", "local", shard_id)?;
        }
        if self.listing.owned.is_empty() && self.listing.held.is_empty() {
            write!(f, "No shards yet. Use 'keysplit split --save' or 'keysplit shard upload'.")?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for List {
    type Error = ShardOpError;
    type Output = ListOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let services = ctx.services().await?;
        let listing = Listing {
            owned: services.custody.owned_shards().await?,
            held: services.custody.held_shards().await?,
        };
        Ok(ListOutput {
            listing,
            json: self.json,
        })
    }
}
