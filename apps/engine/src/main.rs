//! # Moowwee Engine Operator Tool
//!
//! ## Usage
//! ```bash
//! # Apply pending migrations to the configured database
//! moowwee-engine migrate
//!
//! # Resolve, price and print a job's breakdown without storing it
//! moowwee-engine quote REQ-7GQ2K9XA
//!
//! # Print a job
//! moowwee-engine --config ./engine.toml show REQ-7GQ2K9XA
//! ```

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing::info;

use moowwee_db::migrations::migration_status;
use moowwee_engine::{init_tracing, Engine, EngineConfig};

enum Command {
    Migrate,
    Quote(String),
    Show(String),
}

const USAGE: &str = "Usage: moowwee-engine [--config PATH] <migrate | quote REQ-… | show REQ-…>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let (config_path, command) = match parse_args(&args)? {
        Some(parsed) => parsed,
        None => {
            println!("{}", USAGE);
            return Ok(());
        }
    };

    let config = EngineConfig::load(config_path).context("cannot load configuration")?;
    init_tracing(&config.logging.filter);

    let engine = Engine::from_config(&config)
        .await
        .context("cannot start engine")?;

    match command {
        Command::Migrate => {
            let (total, applied) = migration_status(engine.db.pool()).await?;
            info!(total, applied, "Migrations checked");
            println!("✅ {} of {} migrations applied", applied, total);
        }
        Command::Quote(request_number) => {
            let job = engine.requests.get_by_number(&request_number).await?;
            let quote = engine.requests.preview_quote(&job.id).await?;
            println!("{}", serde_json::to_string_pretty(&quote)?);
        }
        Command::Show(request_number) => {
            let job = engine.requests.get_by_number(&request_number).await?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
    }

    engine.db.close().await;
    Ok(())
}

/// Returns `None` when help was requested.
fn parse_args(args: &[String]) -> anyhow::Result<Option<(Option<PathBuf>, Command)>> {
    let mut config_path = None;
    let mut rest = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                let path = args.get(i).context("--config requires a path")?;
                config_path = Some(PathBuf::from(path));
            }
            "--help" | "-h" => return Ok(None),
            other => rest.push(other.to_string()),
        }
        i += 1;
    }

    let command = match rest.as_slice() {
        [cmd] if cmd == "migrate" => Command::Migrate,
        [cmd, number] if cmd == "quote" => Command::Quote(number.clone()),
        [cmd, number] if cmd == "show" => Command::Show(number.clone()),
        [] => bail!("missing command\n{}", USAGE),
        _ => bail!("unrecognized arguments: {}\n{}", rest.join(" "), USAGE),
    };

    Ok(Some((config_path, command)))
}
