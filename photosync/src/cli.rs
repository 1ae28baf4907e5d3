use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::Settings;

/// Mirror a remote photo library into a local directory
#[derive(Parser, Debug)]
#[command(name = "photosync")]
#[command(about, long_about = None, version)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Account username
    #[arg(short, long, env = "PHOTOSYNC_USERNAME")]
    pub username: Option<String>,

    /// Account password; pass an empty value to use the stored one
    #[arg(short, long, env = "PHOTOSYNC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Directory to download photos into
    #[arg(short, long, env = "PHOTOSYNC_DESTINATION", value_name = "PATH")]
    pub destination: Option<PathBuf>,

    /// Replace local files that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Offer to delete local files the library no longer has
    #[arg(long)]
    pub remove: bool,

    /// Confirm removal without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Read settings from the [main] section of a TOML file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Base URL of the photo library service
    #[arg(long, env = "PHOTOSYNC_API_URL", value_name = "URL")]
    pub api_url: Option<String>,

    /// Number of downloads in flight at once
    #[arg(short = 'j', long, env = "PHOTOSYNC_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Per-photo timeout in seconds (0 disables it)
    #[arg(long, env = "PHOTOSYNC_ITEM_TIMEOUT_SECS", value_name = "SECS")]
    pub item_timeout: Option<u64>,

    /// Increase log verbosity (-v warn, -vv info, -vvv debug, -vvvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Settings given on the command line or through the environment. Switches
    /// left off do not override lower layers.
    pub fn settings(&self) -> Settings {
        Settings {
            username: self.username.clone(),
            password: self.password.clone(),
            destination: self.destination.clone(),
            overwrite: self.overwrite.then_some(true),
            remove: self.remove.then_some(true),
            assume_yes: self.yes.then_some(true),
            api_url: self.api_url.clone(),
            concurrency: self.concurrency,
            item_timeout_secs: self.item_timeout,
        }
    }
}
