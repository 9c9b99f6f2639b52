// CLI modules
mod cli;
mod logging;
mod state;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Combine, Confirm, Init, Shard, Split, Status, Version, Watch};
use logging::LogSettings;

command_enum! {
    (Init, Init),
    (Split, Split),
    (Combine, Combine),
    (Shard, Shard),
    (Confirm, Confirm),
    (Watch, Watch),
    (Status, Status),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let ctx = cli::op::OpContext::new(args.config_path, args.password);

    // Before init there is no config, so fall back to defaults
    let guards = match ctx.load_state() {
        Ok(state) => LogSettings::from_config(&state.config),
        Err(_) => LogSettings::default(),
    }
    .init();

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("Error: {}", e);
            drop(guards);
            std::process::exit(1);
        }
    }
}
