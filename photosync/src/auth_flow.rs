use anyhow::{Context, bail};
use photosync_core::{Session, SessionClient, TrustedDevice};
use tracing::info;

use crate::prompt::Prompter;

/// Signs in and, when the account asks for it, walks the user through
/// two-step verification on one of their trusted devices.
pub async fn connect(
    client: &SessionClient,
    username: &str,
    password: &str,
    prompter: &mut dyn Prompter,
) -> anyhow::Result<Session> {
    info!("Connecting to photo library…");
    let session = client
        .sign_in(username, password)
        .await
        .context("sign-in failed")?;
    if !session.requires_2sa {
        return Ok(session);
    }

    println!("Two-step authentication required.");
    let devices = client
        .trusted_devices(&session)
        .await
        .context("failed to list trusted devices")?;
    if devices.is_empty() {
        bail!("two-step authentication required but no trusted devices are registered");
    }
    let labels: Vec<String> = devices.iter().map(TrustedDevice::label).collect();

    let choice = prompter.select("Which device would you like to use?", &labels, 0)?;
    let device = devices
        .get(choice)
        .with_context(|| format!("no trusted device at index {choice}"))?;

    if !client
        .send_verification_code(&session, device)
        .await
        .context("failed to request verification code")?
    {
        bail!("Failed to send verification code");
    }

    let code = prompter.input("Please enter validation code")?;
    client
        .validate_verification_code(&session, device, code.trim())
        .await
        .context("failed to validate verification code")?
        .context("Failed to verify verification code")
}
