use clap::Args;
use std::fmt;

use common::crypto::{KeySplitError, Mnemonic};
use common::shard::{CustodyError, ShardId};

use crate::state::StateError;

#[derive(Args, Debug, Clone)]
#[command(about = "Split a secret mnemonic into password protected shares")]
pub struct Split {
    /// Secret mnemonic, quoted
    pub secret: String,

    /// Number of shares to produce
    #[arg(short = 'n', long)]
    pub shares: usize,

    /// Number of shares needed to recombine
    #[arg(short = 't', long)]
    pub threshold: usize,

    /// Also keep every share encrypted in the local ledger
    #[arg(long)]
    pub save: bool,
}

#[derive(Debug)]
pub struct SplitOutput {
    pub shares: Vec<(ShardId, Mnemonic)>,
    pub threshold: usize,
    pub saved: bool,
}

impl fmt::Display for SplitOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} shares, any {} recombine{}",
            self.shares.len(),
            self.threshold,
            if self.saved { " (saved locally)" } else { "" }
        )?;
        for (i, (shard_id, share)) in self.shares.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "#{} {}", i + 1, shard_id)?;
            writeln!(f, "{}", share)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Split(#[from] KeySplitError),
    #[error(transparent)]
    Custody(#[from] CustodyError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Split {
    type Error = SplitError;
    type Output = SplitOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let services = ctx.services().await?;
        let secret = Mnemonic::from(self.secret.as_str());

        let mnemonics = services
            .splitter
            .split(&secret, self.shares, self.threshold, None)
            .await?;

        let mut shares = Vec::with_capacity(mnemonics.len());
        for share in mnemonics {
            let shard_id = if self.save {
                services.custody.persist_local(&share, None).await?
            } else {
                services.custody.identify_mnemonic(&share)?
            };
            shares.push((shard_id, share));
        }

        Ok(SplitOutput {
            shares,
            threshold: self.threshold,
            saved: self.save,
        })
    }
}
