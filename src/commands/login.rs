//! `creditchat login` / `creditchat logout`

use crate::client::{ApiClient, SavedSession};
use crate::config::Config;
use crate::error::Result;
use colored::Colorize;
use std::time::Duration;

/// Save a bearer token in the system keyring
///
/// The token is checked against the configured server when it is
/// reachable; an unreachable server only produces a warning.
pub async fn login(config: &Config, token: &str) -> Result<()> {
    let api = ApiClient::new(&config.client.server_url, token, Duration::from_secs(10))?;
    match api.user().await {
        Ok(user) => println!(
            "{}",
            format!("Logged in as {} ({} credits)", user.name, user.credits).green()
        ),
        Err(e) if is_auth_error(&e) => return Err(e),
        Err(e) => {
            tracing::warn!("Could not verify token: {:#}", e);
            println!(
                "{}",
                "Server not reachable; token saved without verification".yellow()
            );
        }
    }

    SavedSession {
        token: token.to_string(),
        last_chat_id: None,
    }
    .save()?;
    tracing::info!("Saved session token to keyring");
    Ok(())
}

/// Forget the saved token
pub fn logout() -> Result<()> {
    SavedSession::clear()?;
    println!("{}", "Logged out".green());
    Ok(())
}

fn is_auth_error(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<crate::error::CreditChatError>(),
        Some(crate::error::CreditChatError::Authentication(_))
    )
}
