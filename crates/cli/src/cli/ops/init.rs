use std::path::PathBuf;

use clap::Args;
use object_store::ObjectStoreConfig;
use url::Url;

use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Account the local ledger entries are namespaced under
    #[arg(long, default_value = "default")]
    pub account: String,

    /// PBKDF2 rounds used to stretch the password
    #[arg(long, default_value_t = common::crypto::DEFAULT_KDF_ITERATIONS)]
    pub kdf_iterations: u32,

    /// Mnemonic wordlist (english, japanese, spanish, ...)
    #[arg(long, default_value = "english")]
    pub language: String,

    /// Write daily rolling log files to this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Upload shards to this HTTP custody endpoint instead of the local objects directory
    #[arg(long)]
    pub custody_url: Option<Url>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            account: self.account.clone(),
            kdf_iterations: self.kdf_iterations,
            language: self.language.clone(),
            log_dir: self.log_dir.clone(),
            object_store: self
                .custody_url
                .clone()
                .map(|url| ObjectStoreConfig::Http { url }),
            ..Default::default()
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let output = format!(
            "Initialized keysplit directory at: {}\n\
             - Config: {}\n\
             - Ledger: {}\n\
             - Events: {}\n\
             - Custody: {}\n\
             - Account: {}\n\
             - Wordlist: {}\n\
             - KDF iterations: {}",
            state.state_dir.display(),
            state.config_path.display(),
            state.ledger_path.display(),
            state.events_path.display(),
            custody_description(&state.object_store_config()),
            state.config.account,
            state.config.language,
            state.config.kdf_iterations
        );

        Ok(output)
    }
}

fn custody_description(config: &ObjectStoreConfig) -> String {
    match config {
        ObjectStoreConfig::Memory => "in memory".to_string(),
        ObjectStoreConfig::Local { path } => path.display().to_string(),
        ObjectStoreConfig::S3 {
            endpoint, bucket, ..
        } => format!("s3 bucket {} at {}", bucket, endpoint),
        ObjectStoreConfig::Http { url } => url.to_string(),
    }
}
