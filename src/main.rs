// file: src/main.rs
// version: 1.0.0
// guid: 5c92c187-9458-49e9-99aa-ca5178ad515a

//! CIFAR-10 training job tool - Main entry point

use cifar_train_job::{
    cli::{
        args::{Cli, Commands},
        commands::*,
    },
    logging::init_logger,
    Result,
};
use clap::Parser;
use tokio::signal;
use tracing::{error, warn};

async fn run(command: Commands) -> Result<i32> {
    match command {
        Commands::Init { output, force } => init_command(&output, force).await.map(|_| 0),
        Commands::Render {
            config,
            output,
            overrides,
        } => render_command(config, output, overrides).await.map(|_| 0),
        Commands::Validate { config } => validate_command(config).await.map(|_| 0),
        Commands::Inspect { script, json } => inspect_command(&script, json).await.map(|_| 0),
        Commands::Submit {
            config,
            script_dir,
            sbatch,
            dry_run,
            json,
            overrides,
        } => submit_command(config, &script_dir, &sbatch, dry_run, json, overrides)
            .await
            .map(|_| 0),
        Commands::RunLocal {
            config,
            script_dir,
            shell,
            skip_modules,
            no_time_limit,
            dry_run,
            json,
            overrides,
        } => {
            let options = RunLocalOptions {
                script_dir,
                shell,
                skip_modules,
                enforce_time_limit: !no_time_limit,
                dry_run,
                json,
            };
            run_local_command(config, options, overrides).await
        }
        Commands::CheckPrereqs { config } => check_prerequisites_command(config).await.map(|_| 0),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    if let Err(e) = init_logger(cli.verbose, cli.quiet, cli.json_logs) {
        eprintln!("{}", e);
    }

    let shutdown_signal = async {
        if signal::ctrl_c().await.is_err() {
            // no handler available, never resolve
            std::future::pending::<()>().await;
        }
        warn!("Received Ctrl+C, stopping");
    };

    let code = tokio::select! {
        result = run(cli.command) => match result {
            Ok(code) => code,
            Err(e) => {
                error!("{}", e);
                1
            }
        },
        _ = shutdown_signal => 130, // Standard exit code for Ctrl+C
    };

    std::process::exit(code);
}
