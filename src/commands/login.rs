// `flux-relay login [--headless]`: device-code login.
//
// Browser mode opens the verification page and polls for the token.
// Headless mode only prints the page URL; the user copies the token from
// the success page into `flux-relay config set token`.

use anyhow::{anyhow, Result};
use std::io;
use std::process::Command;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use super::api_failure;
use crate::auth::{poll_for_token, PollPolicy};
use crate::settings::Settings;
use crate::ui;

/// Time for the browser round trip before the first poll.
const FIRST_POLL_DELAY: Duration = Duration::from_secs(3);

pub fn run(settings: &Settings, headless: bool) -> Result<()> {
    let store = settings.store();
    let mut config = store.load()?;
    let client = settings.client()?;

    if let Some(token) = config.access_token() {
        match client.current_user(token) {
            Ok(me) => {
                ui::success("Already logged in!");
                println!();
                println!("   Email: {}", me.developer.email);
                if !me.developer.name.is_empty() {
                    println!("   Name: {}", me.developer.name);
                }
                println!("   User ID: {}", me.developer.id);
                println!();
                println!("To log in as a different user, run 'flux-relay logout' first.");
                return Ok(());
            }
            Err(e) => debug!(error = %e, "stored token rejected, starting a new login"),
        }
    }

    println!("Starting authentication flow...");
    println!();
    let code = client
        .initiate_device_code()
        .map_err(|e| api_failure("Failed to initiate device code", e))?;
    println!("Device Code: {}", code.user_code);
    println!("Verification URL: {}", code.verification_uri);
    println!();

    let mut headless = headless;
    if !headless {
        println!("Opening browser...");
        if let Err(e) = open_browser(&code.verification_uri) {
            debug!(error = %e, "could not open browser");
            println!();
            ui::warning("Could not open browser automatically.");
            println!("Switching to headless mode...");
            println!();
            headless = true;
        }
    }

    if headless {
        println!("Visit the following URL to login:");
        println!("   {}", code.verification_uri);
        println!();
        println!("After logging in, you will receive an access token on the success page.");
        println!("Copy the token and run:");
        println!("   flux-relay config set token \"YOUR_TOKEN_HERE\"");
        return Ok(());
    }

    println!("Waiting for authentication... (Press Ctrl+C to cancel)");
    thread::sleep(FIRST_POLL_DELAY);

    let policy = PollPolicy::from_server_interval(code.interval);
    let pb = ui::spinner("Waiting for browser authorization...");
    let polled = poll_for_token(&client, &code.device_code, policy, |attempt| {
        if attempt % 10 == 0 {
            info!(attempt, max = policy.max_attempts, "still waiting for authorization");
            pb.set_message(format!(
                "Still waiting... (attempt {}/{})",
                attempt, policy.max_attempts
            ));
        }
    });
    pb.finish_and_clear();
    let token = polled.map_err(|e| anyhow!("authentication failed: {}", e))?;

    config.apply_token(&token);
    store.save(&config)?;

    println!();
    ui::success("Authentication complete!");
    println!("   Token saved to: {}", store.path().display());
    Ok(())
}

#[cfg(target_os = "windows")]
fn browser_command(url: &str) -> Command {
    let mut cmd = Command::new("rundll32");
    cmd.args(["url.dll,FileProtocolHandler", url]);
    cmd
}

#[cfg(target_os = "macos")]
fn browser_command(url: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(url);
    cmd
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn browser_command(url: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(url);
    cmd
}

/// Launch the platform's URL opener without waiting for it.
fn open_browser(url: &str) -> io::Result<()> {
    browser_command(url).spawn().map(|_| ())
}
