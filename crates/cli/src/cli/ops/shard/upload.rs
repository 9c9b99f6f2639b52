use clap::Args;
use std::fmt;

use common::crypto::Mnemonic;
use common::shard::ShardRecord;

use super::ShardOpError;

#[derive(Args, Debug, Clone)]
#[command(about = "Hand a share to remote custody")]
pub struct Upload {
    /// Share mnemonic, quoted
    pub share: String,
}

#[derive(Debug)]
pub struct UploadOutput(ShardRecord);

impl fmt::Display for UploadOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Shard:      {}", self.0.shard_id)?;
        writeln!(f, "Locator:    {}", self.0.locator)?;
        writeln!(f, "Capability: {}", self.0.capability())?;
        writeln!(f)?;
        write!(f, "Give the capability to the custodian. Anyone holding it can read the share.")
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Upload {
    type Error = ShardOpError;
    type Output = UploadOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let services = ctx.services().await?;
        let share = Mnemonic::from(self.share.as_str());
        let record = services.custody.upload_remote(&share).await?;
        Ok(UploadOutput(record))
    }
}
