// `flux-relay config set token <token>`: store a token copied from the
// login success page (the headless login path).

use anyhow::{anyhow, bail, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use tracing::debug;

use crate::cli::{ConfigCommand, SetKey};
use crate::settings::Settings;
use crate::ui;

/// Lifetime assumed when the token carries no readable `exp` claim.
const FALLBACK_LIFETIME_HOURS: i64 = 24;

pub fn run(settings: &Settings, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Set {
            key: SetKey::Token { token },
        } => set_token(settings, token.trim()),
    }
}

fn set_token(settings: &Settings, token: &str) -> Result<()> {
    if token.is_empty() {
        bail!("token must not be empty");
    }

    let client = settings.client()?;
    let pb = ui::spinner("Validating token...");
    let res = client.current_user(token);
    pb.finish_and_clear();
    let me = res.map_err(|e| anyhow!("invalid token: {}", e))?;

    let expires_at = jwt_expiry(token).unwrap_or_else(|| {
        debug!("token has no readable exp claim, assuming 24h");
        Utc::now() + Duration::hours(FALLBACK_LIFETIME_HOURS)
    });

    let store = settings.store();
    store.update(|c| {
        c.access_token = token.to_string();
        c.refresh_token.clear();
        c.expires_at = Some(expires_at);
        c.developer_id = me.developer.id.clone();
        c.email = me.developer.email.clone();
    })?;

    ui::success("Token saved successfully!");
    println!(
        "   Logged in as: {} ({})",
        me.developer.email, me.developer.id
    );
    println!("   Token saved to: {}", store.path().display());
    Ok(())
}

/// Expiry from the `exp` claim of a JWT. The signature is not checked;
/// the backend does that on every request.
pub fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?;
    let secs = exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))?;
    Utc.timestamp_opt(secs, 0).single()
}
