//! Application configuration. Storage location, backend, acting member.

use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "./data";

/// Which store the binary wires behind the ledger ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Json,
}

impl StoreBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::Json => "json",
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Directory for ledger.db / ledger.json and CSV exports. Read from SPLIT_LEDGER_DATA_DIR.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// `sqlite` or `json`. Read from SPLIT_LEDGER_STORE.
    #[serde(default)]
    pub store: Option<StoreBackend>,

    /// Acting member's email for console operations. Read from SPLIT_LEDGER_MEMBER.
    #[serde(default)]
    pub member: Option<String>,

    /// Group opened on start instead of the picker. Read from SPLIT_LEDGER_GROUP_ID.
    #[serde(default)]
    pub group_id: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("SPLIT_LEDGER"));
        if let Ok(path) = std::env::var("SPLIT_LEDGER_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    pub fn data_dir_or_default(&self) -> PathBuf {
        PathBuf::from(self.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR))
    }

    pub fn store_or_default(&self) -> StoreBackend {
        self.store.unwrap_or_default()
    }

    /// Acting member, ignoring blank values.
    pub fn member(&self) -> Option<String> {
        self.member
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    }
}
