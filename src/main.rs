use anyhow::Context;
use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};

use update_notifier::config::{NotifierConfig, RUNNER_ARG, log_path, state_db_path, state_key};
use update_notifier::logging;
use update_notifier::runner;
use update_notifier::state::{SqliteStateStore, StateStore, current_timestamp_ms};

#[derive(Parser)]
#[command(name = "update-notifier")]
#[command(version, about = "Manage and run out-of-band update checks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the stored state of a package
    Status { package: String },
    /// Stop checking and notifying for a package
    OptOut { package: String },
    /// Resume checking and notifying for a package
    OptIn { package: String },
    /// Look up the latest version now and print it
    Check {
        #[arg(long)]
        name: String,
        /// Version to compare against
        #[arg(long)]
        current: String,
        #[arg(long)]
        github_owner: Option<String>,
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,
        #[arg(long)]
        registry_url: Option<String>,
    },
    /// Run a detached check for a serialized config
    #[command(name = RUNNER_ARG, hide = true)]
    RunCheck { payload: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Command::RunCheck { payload } = &cli.command {
        runner::run_payload(payload);
        return Ok(());
    }

    let _guard = logging::init_file_logging(&log_path()).ok();

    match cli.command {
        Command::Status { package } => status(&package),
        Command::OptOut { package } => set_opt_out(&package, true),
        Command::OptIn { package } => set_opt_out(&package, false),
        Command::Check {
            name,
            current,
            github_owner,
            github_token,
            registry_url,
        } => {
            let mut builder = NotifierConfig::builder(name, current);
            if let Some(owner) = github_owner {
                builder = builder.github(owner);
            }
            if let Some(token) = github_token {
                builder = builder.github_token(token);
            }
            if let Some(url) = registry_url {
                builder = builder.registry_url(url);
            }
            check(builder.build()?)
        }
        Command::RunCheck { .. } => Ok(()),
    }
}

fn open_store() -> anyhow::Result<SqliteStateStore> {
    let path = state_db_path();
    SqliteStateStore::open(&path)
        .with_context(|| format!("failed to open state store at {}", path.display()))
}

fn status(package: &str) -> anyhow::Result<()> {
    let store = open_store()?;
    let state = store.load(&state_key(package), current_timestamp_ms())?;

    let last_check = Local
        .timestamp_millis_opt(state.last_update_check)
        .single()
        .map(|time| time.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| state.last_update_check.to_string());

    println!("package:    {}", package);
    println!("opted out:  {}", state.opt_out);
    println!("last check: {}", last_check);
    match state.pending_update {
        Some(update) => println!(
            "pending:    {} -> {} ({})",
            update.current, update.latest, update.change_kind
        ),
        None => println!("pending:    none"),
    }
    Ok(())
}

fn set_opt_out(package: &str, opt_out: bool) -> anyhow::Result<()> {
    let store = open_store()?;
    store.set_opt_out(&state_key(package), opt_out, current_timestamp_ms())?;
    if opt_out {
        println!("Update notifications disabled for {}", package);
    } else {
        println!("Update notifications enabled for {}", package);
    }
    Ok(())
}

fn check(config: NotifierConfig) -> anyhow::Result<()> {
    let update = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(update_notifier::check_now(&config))?;

    if update.is_available() {
        println!(
            "{} {} -> {} ({})",
            update.name, update.current, update.latest, update.change_kind
        );
        println!("Run {} to update", config.install_hint);
    } else {
        println!("{} {} is up to date", update.name, update.current);
    }
    Ok(())
}
