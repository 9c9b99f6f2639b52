use clap::{Args, Subcommand};

pub mod download;
pub mod get;
pub mod list;
pub mod remove;
pub mod save;
pub mod upload;

use common::shard::{CustodyError, InvalidShardId};

use crate::cli::op::Op;
use crate::state::StateError;

crate::command_enum! {
    (Save, save::Save),
    (Get, get::Get),
    (Remove, remove::Remove),
    (Upload, upload::Upload),
    (Download, download::Download),
    (List, list::List),
}

pub type ShardCommand = Command;

#[derive(Args, Debug, Clone)]
#[command(about = "Keep, fetch and hand out individual shares")]
pub struct Shard {
    #[command(subcommand)]
    pub command: ShardCommand,
}

#[async_trait::async_trait]
impl Op for Shard {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

/// Failure of any single shard command
#[derive(Debug, thiserror::Error)]
pub enum ShardOpError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Custody(#[from] CustodyError),
    #[error(transparent)]
    InvalidShardId(#[from] InvalidShardId),
}
