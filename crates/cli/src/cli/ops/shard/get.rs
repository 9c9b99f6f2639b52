use clap::Args;

use common::crypto::Mnemonic;
use common::shard::ShardId;

use super::ShardOpError;

#[derive(Args, Debug, Clone)]
#[command(about = "Decrypt a locally kept share")]
pub struct Get {
    pub shard_id: String,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Get {
    type Error = ShardOpError;
    type Output = Mnemonic;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let shard_id: ShardId = self.shard_id.parse()?;
        let services = ctx.services().await?;
        Ok(services.custody.fetch_local(&shard_id, None).await?)
    }
}
