// `flux-relay logout`: forget the stored session.

use anyhow::Result;

use crate::settings::Settings;
use crate::ui;

pub fn run(settings: &Settings) -> Result<()> {
    let store = settings.store();
    if !store.load()?.has_session() {
        println!("No active session found. You are already logged out.");
        return Ok(());
    }

    store.remove()?;
    ui::success("Logged out successfully");
    println!("   Token removed from: {}", store.path().display());
    Ok(())
}
