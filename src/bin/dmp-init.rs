use std::path::PathBuf;

use clap::Parser;
use colored::*;
use tracing::error;

use dmp_import::config::load_config;
use dmp_import::logging::init_logging;
use dmp_import::store::PgStore;

#[derive(Parser, Debug)]
#[command(name = "dmp-init", about = "Create the artists and songs tables")]
struct Args {
    /// Drop existing tables before recreating them
    #[arg(long)]
    recreate: bool,

    /// Path to the database configuration YAML file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Append-only action/error log
    #[arg(long, default_value = "app.log")]
    log_file: PathBuf,
}

async fn run(args: &Args) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    println!("Database : {}", config.display_target().bright_white());

    let store = PgStore::connect(&config).await?;
    if args.recreate {
        println!("{} Dropping existing tables...", "→".yellow());
    }
    let result = store.create_tables(args.recreate).await;
    store.close().await;
    result?;

    println!("  {} Tables ready", "✓".green());
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_file) {
        eprintln!("Cannot open {}: {}", args.log_file.display(), e);
        std::process::exit(1);
    }

    println!("{}", "DMP Table Init".bright_cyan().bold());
    println!("{}", "==============".bright_black());

    if let Err(e) = run(&args).await {
        error!("{:#}", e);
        eprintln!("{} {:#}", "✗".red(), e);
        std::process::exit(1);
    }
}
