use std::{fs, path::PathBuf};

use common::config::{parse_language, KeySplitConfig};
use common::confirmation::ConfirmationTracker;
use common::crypto::{KdfParams, KeySplitter, Password, DEFAULT_KDF_ITERATIONS};
use common::event_log::JournalEventLedger;
use common::ledger::{FileLedger, FileLedgerError, Ledger};
use common::shard::ShardCustodyStore;
use object_store::{ObjectStore, ObjectStoreConfig, ObjectStoreError};
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "keysplit";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const LEDGER_FILE_NAME: &str = "ledger.json";
pub const EVENTS_FILE_NAME: &str = "events.jsonl";
pub const OBJECTS_DIR_NAME: &str = "objects";

pub type Custody = ShardCustodyStore<FileLedger, ObjectStore>;
pub type Tracker = ConfirmationTracker<JournalEventLedger, FileLedger>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Account the ledger entries are namespaced under
    #[serde(default = "default_account")]
    pub account: String,
    /// PBKDF2 rounds for password protected shards
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,
    /// Mnemonic wordlist (english, japanese, ...)
    #[serde(default = "default_language")]
    pub language: String,
    /// Default log level, `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Also write daily rolling logs here when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    /// Remote custody backend. Defaults to the `objects/` directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_store: Option<ObjectStoreConfig>,
}

fn default_account() -> String {
    "default".to_string()
}

fn default_kdf_iterations() -> u32 {
    DEFAULT_KDF_ITERATIONS
}

fn default_language() -> String {
    "english".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            account: default_account(),
            kdf_iterations: default_kdf_iterations(),
            language: default_language(),
            log_level: default_log_level(),
            log_dir: None,
            object_store: None,
        }
    }
}

/// The pieces every shard command works with
pub struct Services {
    pub config: KeySplitConfig,
    pub splitter: KeySplitter,
    pub custody: Custody,
    pub tracker: Tracker,
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the state directory (~/.keysplit)
    pub state_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Path to the local ledger
    pub ledger_path: PathBuf,
    /// Path to the confirmation journal
    pub events_path: PathBuf,
    /// Path to the default object store directory
    pub objects_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the state directory path (custom or default ~/.keysplit)
    pub fn state_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    fn at(state_dir: PathBuf, config: AppConfig) -> Self {
        Self {
            config_path: state_dir.join(CONFIG_FILE_NAME),
            ledger_path: state_dir.join(LEDGER_FILE_NAME),
            events_path: state_dir.join(EVENTS_FILE_NAME),
            objects_path: state_dir.join(OBJECTS_DIR_NAME),
            state_dir,
            config,
        }
    }

    /// Initialize a new state directory
    pub fn init(custom_path: Option<PathBuf>, config: Option<AppConfig>) -> Result<Self, StateError> {
        let state_dir = Self::state_dir(custom_path)?;
        if state_dir.join(CONFIG_FILE_NAME).exists() {
            return Err(StateError::AlreadyInitialized);
        }

        let config = config.unwrap_or_default();
        if parse_language(&config.language).is_none() {
            return Err(StateError::UnknownLanguage(config.language));
        }

        let state = Self::at(state_dir, config);
        fs::create_dir_all(&state.objects_path)?;
        fs::write(&state.config_path, toml::to_string_pretty(&state.config)?)?;
        // Empty ledger and journal, both are created lazily on first write too
        fs::write(&state.ledger_path, "")?;
        fs::write(&state.events_path, "")?;

        Ok(state)
    }

    /// Load existing state from the state directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let state_dir = Self::state_dir(custom_path)?;
        if !state_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_path = state_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }
        let config: AppConfig = toml::from_str(&fs::read_to_string(&config_path)?)?;

        Ok(Self::at(state_dir, config))
    }

    /// Core settings, with the CLI password as the default
    pub fn keysplit_config(&self, password: Option<Password>) -> Result<KeySplitConfig, StateError> {
        let language = parse_language(&self.config.language)
            .ok_or_else(|| StateError::UnknownLanguage(self.config.language.clone()))?;

        let mut config = KeySplitConfig::new(self.config.account.clone())
            .with_language(language)
            .with_kdf(KdfParams::with_iterations(self.config.kdf_iterations));
        if let Some(password) = password {
            config = config.with_password(password);
        }
        Ok(config)
    }

    pub fn object_store_config(&self) -> ObjectStoreConfig {
        self.config
            .object_store
            .clone()
            .unwrap_or_else(|| ObjectStoreConfig::Local {
                path: self.objects_path.clone(),
            })
    }

    /// Open the ledger, object store and journal behind this directory
    pub async fn services(&self, password: Option<Password>) -> Result<Services, StateError> {
        let config = self.keysplit_config(password)?;
        let ledger = Ledger::new(FileLedger::open(&self.ledger_path).await?);
        let remote = ObjectStore::new(self.object_store_config()).await?;
        let events = JournalEventLedger::new(&self.events_path);

        tracing::debug!(
            state_dir = %self.state_dir.display(),
            account = %config.account,
            "opened keysplit state"
        );

        Ok(Services {
            splitter: KeySplitter::new(&config),
            custody: ShardCustodyStore::new(&config, ledger.clone(), remote),
            tracker: ConfirmationTracker::new(&config, ledger, events),
            config,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("keysplit directory not initialized. Run 'keysplit init' first")]
    NotInitialized,

    #[error("keysplit directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("unknown wordlist: {0}")]
    UnknownLanguage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("ledger error: {0}")]
    Ledger(#[from] FileLedgerError),

    #[error("object store error: {0}")]
    ObjectStore(#[from] ObjectStoreError),
}
