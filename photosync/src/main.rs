use std::path::PathBuf;

use clap::Parser;
use photosync::cli::Cli;
use photosync::config::{Config, KeyringStore, Settings};
use photosync::progress::ConsoleObserver;
use photosync::prompt::{self, TerminalPrompter};
use photosync::remote::PhotoLibraryRemote;
use photosync::sync::{self, RemovalOutcome};
use photosync::{auth_flow, logging};
use photosync_core::{PhotoLibraryClient, SessionClient};
use tracing::{debug, error};

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("photosync").join("config.toml"))
        .filter(|path| path.is_file())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;

    sync_library(&cli).await
}

async fn sync_library(cli: &Cli) -> anyhow::Result<()> {
    let file_settings = match cli.config.clone().or_else(default_config_path) {
        Some(path) => Settings::from_file(&path)?,
        None => Settings::default(),
    };
    let settings = file_settings.merge(cli.settings());

    let mut prompter = TerminalPrompter::new();
    let config = Config::resolve(settings, &mut prompter, &KeyringStore)?;
    debug!(?config, "configuration resolved");

    let sessions = SessionClient::with_base_url(&config.api_url)?;
    let session =
        auth_flow::connect(&sessions, &config.username, &config.password, &mut prompter).await?;
    let library = PhotoLibraryClient::with_base_url(&config.api_url, session.session_token)?;
    let remote = PhotoLibraryRemote::new(library);

    println!(
        "Downloading all photos into '{}' while {} existing…",
        config.destination.display(),
        if config.overwrite { "overwriting" } else { "skipping" }
    );

    let observer = ConsoleObserver::new(cli.verbose);
    let assume_yes = config.assume_yes;
    let report = sync::run(&remote, &config.run_options(), &observer, |candidates| {
        prompt::confirm_removal(&mut prompter, candidates, assume_yes)
    })
    .await
    .map_err(|err| {
        let cause = if err.is_auth_expired() {
            "session expired, sign in again"
        } else {
            "sync incomplete"
        };
        anyhow::Error::new(err).context(cause)
    })?;

    let Some(removal) = report.removal else {
        return Ok(());
    };
    match removal.outcome {
        RemovalOutcome::NothingToDo => println!("Nothing to do."),
        RemovalOutcome::Aborted => {}
        RemovalOutcome::Removed => println!("Removed {} files", removal.removed),
    }
    for failure in &removal.failures {
        error!(
            path = %failure.entry.path.display(),
            "failed to remove: {}",
            failure.error
        );
    }
    if !removal.is_clean() {
        anyhow::bail!("{} files could not be removed", removal.failures.len());
    }
    Ok(())
}
