//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here.

use dotenv::dotenv;
use split_ledger::adapters::locking::InProcessGroupLock;
use split_ledger::adapters::persistence::{JsonStore, SqliteRepo};
use split_ledger::adapters::ui::Session;
use split_ledger::adapters::ui::tui::ConsoleInputPort;
use split_ledger::domain::GroupId;
use split_ledger::ports::{ExpenseStore, GroupLockPort, GroupStore, InputPort};
use split_ledger::shared::config::{AppConfig, StoreBackend};
use split_ledger::usecases::LedgerService;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "config not readable, using defaults");
        AppConfig::default()
    });

    let data_path = cfg.data_dir_or_default();
    tokio::fs::create_dir_all(&data_path)
        .await
        .map_err(|e| anyhow::anyhow!("create data dir: {}", e))?;
    let data_dir_abs = data_path
        .canonicalize()
        .unwrap_or_else(|_| data_path.clone());
    info!(path = %data_dir_abs.display(), "data directory");

    // --- Store: one adapter serves both outbound ports ---
    let backend = cfg.store_or_default();
    let (groups, expenses, location): (Arc<dyn GroupStore>, Arc<dyn ExpenseStore>, PathBuf) =
        match backend {
            StoreBackend::Sqlite => {
                let repo = Arc::new(
                    SqliteRepo::connect(&data_path)
                        .await
                        .map_err(|e| anyhow::anyhow!("SQLite connect failed: {}", e))?,
                );
                let location = repo.path().to_path_buf();
                info!(path = %location.display(), "using SQLite store");
                (
                    Arc::clone(&repo) as Arc<dyn GroupStore>,
                    repo as Arc<dyn ExpenseStore>,
                    location,
                )
            }
            StoreBackend::Json => {
                let location = data_path.join("ledger.json");
                let store = JsonStore::new(&location);
                store.load().await.map_err(|e| anyhow::anyhow!("{}", e))?;
                let store = Arc::new(store);
                info!(path = %location.display(), "using JSON store");
                (
                    Arc::clone(&store) as Arc<dyn GroupStore>,
                    store as Arc<dyn ExpenseStore>,
                    location,
                )
            }
        };

    let lock: Arc<dyn GroupLockPort> = Arc::new(InProcessGroupLock::new());
    let ledger = Arc::new(LedgerService::new(Arc::clone(&groups), expenses, lock));

    let default_group = match cfg.group_id.as_deref() {
        Some(raw) => Some(
            raw.parse::<GroupId>()
                .map_err(|e| anyhow::anyhow!("SPLIT_LEDGER_GROUP_ID: {}", e))?,
        ),
        None => None,
    };
    let member = cfg.member();
    if member.is_none() {
        info!("SPLIT_LEDGER_MEMBER not set; the console will ask who is acting");
    }

    split_ledger::adapters::ui::init_ui(&Session {
        store: backend.as_str(),
        location: &location,
        member: member.as_deref(),
    });

    let input_port: Arc<dyn InputPort> = Arc::new(ConsoleInputPort::new(
        ledger,
        groups,
        member,
        default_group,
        data_path.join("exports"),
    ));

    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
