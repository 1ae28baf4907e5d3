//! Configuration layering: defaults, then the `[main]` table of a TOML file,
//! then environment and command line (both via clap). Whatever is still
//! missing afterwards is asked for interactively.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use photosync_core::DEFAULT_BASE_URL;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::prompt::Prompter;
use crate::sync::{PipelineOptions, RunOptions};

const DEFAULT_CONCURRENCY: usize = 1;
const KEYRING_SERVICE: &str = "photosync";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("config file {0} must contain a [main] section")]
    MissingMainSection(PathBuf),
    #[error("invalid value for '{key}': {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("no stored password for {0}; pass one explicitly")]
    NoStoredPassword(String),
    #[error("prompt failed: {0:#}")]
    Prompt(#[from] anyhow::Error),
}

/// Partially filled configuration from one source. Later sources override
/// earlier ones field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub username: Option<String>,
    pub password: Option<String>,
    pub destination: Option<PathBuf>,
    pub overwrite: Option<bool>,
    pub remove: Option<bool>,
    pub assume_yes: Option<bool>,
    pub api_url: Option<String>,
    pub concurrency: Option<usize>,
    pub item_timeout_secs: Option<u64>,
}

impl Settings {
    pub fn merge(self, overlay: Settings) -> Settings {
        Settings {
            username: overlay.username.or(self.username),
            password: overlay.password.or(self.password),
            destination: overlay.destination.or(self.destination),
            overwrite: overlay.overwrite.or(self.overwrite),
            remove: overlay.remove.or(self.remove),
            assume_yes: overlay.assume_yes.or(self.assume_yes),
            api_url: overlay.api_url.or(self.api_url),
            concurrency: overlay.concurrency.or(self.concurrency),
            item_timeout_secs: overlay.item_timeout_secs.or(self.item_timeout_secs),
        }
    }

    pub fn from_file(path: &Path) -> Result<Settings, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    fn from_toml(text: &str, path: &Path) -> Result<Settings, ConfigError> {
        let file: ConfigFile = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let main = file
            .main
            .ok_or_else(|| ConfigError::MissingMainSection(path.to_path_buf()))?;

        for key in main.unknown.keys() {
            warn!("Unknown configuration key \"{key}\", skipping");
        }

        Ok(Settings {
            username: main.username,
            password: main.password,
            destination: main.destination.map(PathBuf::from),
            overwrite: main.overwrite.map(|v| v.parse("overwrite")).transpose()?,
            remove: main.remove.map(|v| v.parse("remove")).transpose()?,
            assume_yes: main.assume_yes.map(|v| v.parse("assume_yes")).transpose()?,
            api_url: main.api_url,
            concurrency: main.concurrency,
            item_timeout_secs: main.item_timeout_secs,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    main: Option<MainSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MainSection {
    username: Option<String>,
    password: Option<String>,
    destination: Option<String>,
    overwrite: Option<Flag>,
    remove: Option<Flag>,
    assume_yes: Option<Flag>,
    api_url: Option<String>,
    concurrency: Option<usize>,
    item_timeout_secs: Option<u64>,
    #[serde(flatten)]
    unknown: toml::Table,
}

/// Accepts TOML booleans as well as the usual textual spellings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    fn parse(self, key: &'static str) -> Result<bool, ConfigError> {
        match self {
            Flag::Bool(value) => Ok(value),
            Flag::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue { key, value: text }),
            },
        }
    }
}

/// Where stored passwords are looked up.
pub trait PasswordStore {
    fn stored_password(&self, username: &str) -> Option<String>;
}

/// System keyring, service name `photosync`, one entry per username.
pub struct KeyringStore;

impl PasswordStore for KeyringStore {
    fn stored_password(&self, username: &str) -> Option<String> {
        let entry = match keyring::Entry::new(KEYRING_SERVICE, username) {
            Ok(entry) => entry,
            Err(err) => {
                debug!("keyring unavailable: {err}");
                return None;
            }
        };
        match entry.get_password() {
            Ok(password) => Some(password),
            Err(keyring::Error::NoEntry) => None,
            Err(err) => {
                debug!("keyring lookup failed: {err}");
                None
            }
        }
    }
}

/// Fully resolved configuration for one run.
#[derive(Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub destination: PathBuf,
    pub overwrite: bool,
    pub remove: bool,
    pub assume_yes: bool,
    pub api_url: String,
    pub concurrency: usize,
    pub item_timeout: Option<Duration>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("password", &"******")
            .field("destination", &self.destination)
            .field("overwrite", &self.overwrite)
            .field("remove", &self.remove)
            .field("assume_yes", &self.assume_yes)
            .field("api_url", &self.api_url)
            .field("concurrency", &self.concurrency)
            .field("item_timeout", &self.item_timeout)
            .finish()
    }
}

impl Config {
    /// Fills the gaps in `settings`, asking through `prompter` where needed.
    ///
    /// An explicitly empty password means "use the stored one"; a missing
    /// password is looked up in `store` first and asked for otherwise. The
    /// destination is asked for again until it is an existing, writable
    /// directory.
    pub fn resolve(
        settings: Settings,
        prompter: &mut dyn Prompter,
        store: &dyn PasswordStore,
    ) -> Result<Config, ConfigError> {
        let username = match settings.username.filter(|u| !u.trim().is_empty()) {
            Some(username) => username,
            None => prompter.input("Specify username")?,
        };

        let password = match settings.password {
            Some(password) if !password.is_empty() => password,
            Some(_) => store
                .stored_password(&username)
                .ok_or_else(|| ConfigError::NoStoredPassword(username.clone()))?,
            None => match store.stored_password(&username) {
                Some(password) => password,
                None => prompter.password(&format!("Enter password for {username}"))?,
            },
        };

        let home = dirs::home_dir();
        let mut destination = settings
            .destination
            .map(|path| absolutize(&path, home.as_deref()));
        let destination = loop {
            match check_destination(destination.as_deref()) {
                Ok(path) => break path,
                Err(reason) => {
                    let answer =
                        prompter.input(&format!("{reason}Specify destination directory"))?;
                    destination = Some(absolutize(Path::new(answer.trim()), home.as_deref()));
                }
            }
        };

        let concurrency = settings.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "concurrency",
                value: concurrency.to_string(),
            });
        }

        Ok(Config {
            username,
            password,
            destination,
            overwrite: settings.overwrite.unwrap_or(false),
            remove: settings.remove.unwrap_or(false),
            assume_yes: settings.assume_yes.unwrap_or(false),
            api_url: settings
                .api_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            concurrency,
            item_timeout: settings
                .item_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        })
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            destination: self.destination.clone(),
            pipeline: PipelineOptions {
                overwrite: self.overwrite,
                concurrency: self.concurrency,
                item_timeout: self.item_timeout,
            },
            remove: self.remove,
        }
    }
}

fn absolutize(path: &Path, home: Option<&Path>) -> PathBuf {
    let expanded = match (path.to_str(), home) {
        (Some("~"), Some(home)) => home.to_path_buf(),
        (Some(value), Some(home)) if value.starts_with("~/") => home.join(&value[2..]),
        _ => path.to_path_buf(),
    };
    std::path::absolute(&expanded).unwrap_or(expanded)
}

/// Returns the usable destination, or the reason it is not usable.
fn check_destination(destination: Option<&Path>) -> Result<PathBuf, &'static str> {
    let Some(path) = destination.filter(|p| !p.as_os_str().is_empty()) else {
        return Err("Destination is not set. ");
    };
    if !path.is_dir() {
        return Err("Destination is not a directory. ");
    }
    if !is_writable(path) {
        return Err("Destination is not writeable. ");
    }
    Ok(path.to_path_buf())
}

/// Creates and removes a marker file in `dir`.
fn is_writable(dir: &Path) -> bool {
    let marker = dir.join(format!(".photosync-write-check-{}", std::process::id()));
    match OpenOptions::new().write(true).create_new(true).open(&marker) {
        Ok(file) => {
            drop(file);
            if let Err(err) = fs::remove_file(&marker) {
                warn!(
                    path = %marker.display(),
                    "failed to remove write check file: {err}"
                );
            }
            true
        }
        Err(err) => {
            debug!(path = %dir.display(), "destination not writable: {err}");
            false
        }
    }
}
