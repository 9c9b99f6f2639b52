pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "keysplit")]
#[command(about = "Split a mnemonic into password protected shards and track who holds them")]
pub struct Args {
    /// Path to the keysplit state directory (defaults to ~/.keysplit)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Password protecting the shards
    #[arg(long, global = true, env = "KEYSPLIT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: crate::Command,
}
