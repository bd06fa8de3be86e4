//! Source credential handling.
//!
//! Passwords typed at the prompt are held in [`Zeroizing`] buffers and are
//! spliced into the connection URL only in memory. Nothing here logs the
//! resulting URL unredacted.

use cdcsync_core::error::redact_database_url;
use cdcsync_core::{Result, SyncError};
use url::Url;
use zeroize::Zeroizing;

/// Returns a copy of `connection_string` with its password replaced.
///
/// # Errors
/// Returns a configuration error when the string is not a URL that can
/// carry credentials (for example a snapshot path).
pub fn with_password(connection_string: &str, password: &str) -> Result<Zeroizing<String>> {
    let mut url = Url::parse(connection_string).map_err(|e| {
        SyncError::configuration(format!(
            "Invalid source URL '{}': {}",
            redact_database_url(connection_string),
            e
        ))
    })?;

    url.set_password(Some(password)).map_err(|()| {
        SyncError::configuration(format!(
            "Source URL '{}' cannot carry a password",
            redact_database_url(connection_string)
        ))
    })?;

    Ok(Zeroizing::new(url.to_string()))
}

/// Reads a password from the terminal without echo.
///
/// # Errors
/// Fails when no terminal is available.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    let password = rpassword::prompt_password("Source database password: ")
        .map_err(|e| SyncError::io("Failed to read password", e))?;
    Ok(Zeroizing::new(password))
}

/// Resolves the connection string handed to the adapter factory.
///
/// With `prompt` set and a URL-shaped source, the typed password replaces
/// any password in the URL. Snapshot sources ignore the prompt.
pub fn resolve_source(source: &str, prompt: bool) -> Result<Zeroizing<String>> {
    if !prompt {
        return Ok(Zeroizing::new(source.to_string()));
    }

    if !source.contains("://") {
        tracing::warn!("--password-prompt ignored for snapshot source");
        return Ok(Zeroizing::new(source.to_string()));
    }

    let password = prompt_password()?;
    with_password(source, &password)
}
