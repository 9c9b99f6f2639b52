use clap::Args;

use common::crypto::Mnemonic;

use super::ShardOpError;

#[derive(Args, Debug, Clone)]
#[command(about = "Fetch a share from remote custody")]
pub struct Download {
    /// Retrieval capability, `<locator>:<key>`
    pub capability: String,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Download {
    type Error = ShardOpError;
    type Output = Mnemonic;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let services = ctx.services().await?;
        Ok(services.custody.download_capability(&self.capability).await?)
    }
}
