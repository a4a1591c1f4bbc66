use clap::Parser;
use gavel::adapters::{InMemoryAuditLog, InMemoryLedger, InMemoryRoster, PostgresAuditLog};
use gavel::cli::{self, Cli, Commands, SeedFile};
use gavel::config::AppConfig;
use gavel::engine::AuctionHouse;
use gavel::error::Result;
use gavel::ports::AuditLog;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)?;
    init_logging(&config);

    if let Err(errors) = config.validate() {
        for error in &errors {
            warn!("config: {error}");
        }
        return Err(gavel::error::GavelError::Validation(format!(
            "invalid configuration ({} problems)",
            errors.len()
        )));
    }

    match cli.command {
        None => run_engine(config, None).await?,
        Some(Commands::Run { seed_file }) => run_engine(config, seed_file).await?,
        Some(Commands::Seed { file }) => {
            let file = SeedFile::load(&file)?;
            cli::print_seed_plan(&file);
        }
        Some(Commands::CheckConfig) => {
            info!("configuration is valid");
            println!(
                "active_slots={} duration={}s min_increment={} snipe_window={}s",
                config.auction.active_slots,
                config.auction.duration_secs,
                config.auction.min_increment,
                config.snipe.window_secs
            );
        }
    }

    Ok(())
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run_engine(config: AppConfig, seed_file: Option<String>) -> Result<()> {
    let ledger = Arc::new(InMemoryLedger::new());
    let roster = Arc::new(InMemoryRoster::new());

    let audit: Arc<dyn AuditLog> = match &config.database {
        Some(db) => {
            info!("audit log backed by Postgres");
            Arc::new(PostgresAuditLog::connect(&db.url, db.max_connections).await?)
        }
        None => {
            info!("audit log in memory (no database configured)");
            Arc::new(InMemoryAuditLog::new())
        }
    };

    let house = Arc::new(AuctionHouse::new(
        config,
        ledger.clone(),
        roster,
        audit,
    ));

    if let Some(path) = seed_file {
        let file = SeedFile::load(&path)?;
        for team in &file.teams {
            ledger.set_balance(team.id, team.balance);
        }
        for item in file.items {
            house.seed(item).await?;
        }
        info!("seeded from {path}");
    }

    // Log the public feed so an operator tailing the process sees every
    // transaction
    let mut events = house.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(?event, "auction event");
        }
    });

    house.start_sweeper();
    info!("auction engine running; ctrl-c to stop");

    signal::ctrl_c().await?;
    info!("shutdown requested");
    house.stop_sweeper();

    let queue = house.queue_stats().await;
    let sweeper = house.sweeper_stats().await;
    info!(%queue, settled = sweeper.items_settled, failed = sweeper.items_failed, "final stats");

    Ok(())
}
