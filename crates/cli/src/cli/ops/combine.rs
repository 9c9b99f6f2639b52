use clap::Args;

use common::crypto::{KeySplitError, Mnemonic};

use crate::state::StateError;

#[derive(Args, Debug, Clone)]
#[command(about = "Recombine shares into the secret mnemonic")]
pub struct Combine {
    /// Share mnemonics, each quoted
    #[arg(required = true)]
    pub shares: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CombineError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Combine(#[from] KeySplitError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Combine {
    type Error = CombineError;
    type Output = Mnemonic;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let services = ctx.services().await?;
        let shares: Vec<Mnemonic> = self.shares.iter().map(|s| Mnemonic::from(s.as_str())).collect();

        Ok(services.splitter.combine(&shares, None).await?)
    }
}
