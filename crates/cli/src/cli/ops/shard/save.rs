use clap::Args;

use common::crypto::Mnemonic;
use common::shard::ShardId;

use super::ShardOpError;

#[derive(Args, Debug, Clone)]
#[command(about = "Encrypt a share under the password and keep it locally")]
pub struct Save {
    /// Share mnemonic, quoted
    pub share: String,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Save {
    type Error = ShardOpError;
    type Output = ShardId;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let services = ctx.services().await?;
        let share = Mnemonic::from(self.share.as_str());
        Ok(services.custody.persist_local(&share, None).await?)
    }
}
