use clap::Args;

use common::shard::ShardId;

use super::ShardOpError;

#[derive(Args, Debug, Clone)]
#[command(about = "Destroy a locally kept share")]
pub struct Remove {
    pub shard_id: String,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Remove {
    type Error = ShardOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let shard_id: ShardId = self.shard_id.parse()?;
        let services = ctx.services().await?;

        if services.custody.remove_local(&shard_id).await? {
            Ok(format!("Removed {}", shard_id))
        } else {
            Err(common::shard::CustodyError::NotFound(shard_id.to_string()).into())
        }
    }
}
