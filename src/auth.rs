// src/auth.rs
// Login state machine: probe for an authenticated session, drive the login
// form when there is none. Every outcome short of driver breakage is a clean
// `Ok(bool)`; lookup timeouts are branches, not errors.

use anyhow::Result;
use tracing::{debug, error};

use crate::session::{BrowserSession, Lookup};
use crate::site;

/// True when the current page shows the authenticated-only account link.
/// Safe to call at any point; a persisted session makes this pass without
/// touching the login form.
pub async fn probe_authenticated<S: BrowserSession>(session: &S) -> Result<bool> {
    let scope = session.page_scope().await?;
    let authenticated = session.find(&scope, site::AUTH_PROBE).await?.is_found();
    debug!(authenticated, "session probe");
    Ok(authenticated)
}

/// Establish an authenticated session on the site home page.
pub async fn authenticate<S: BrowserSession>(
    session: &S,
    username: &str,
    password: &str,
) -> Result<bool> {
    session.navigate(site::HOME_URL).await?;

    if probe_authenticated(session).await? {
        return Ok(true);
    }

    let scope = session.page_scope().await?;

    let Some(trigger) = session.find(&scope, site::LOGIN_TRIGGER).await?.found() else {
        error!("login trigger not found, site structure mismatch");
        return Ok(false);
    };
    let label = session.text(&trigger).await?;
    if label.trim() != site::LOGIN_TRIGGER_LABEL {
        error!(label = %label.trim(), "login trigger has unexpected label");
        return Ok(false);
    }
    session.click(&trigger).await?;

    let Some(username_field) = session.find(&scope, site::LOGIN_USERNAME).await?.found() else {
        error!("username field not found");
        return Ok(false);
    };
    let Some(password_field) = session.find(&scope, site::LOGIN_PASSWORD).await?.found() else {
        error!("password field not found");
        return Ok(false);
    };
    session.send_keys(&username_field, username).await?;
    session.send_keys(&password_field, password).await?;

    let Some(submit) = session.find(&scope, site::LOGIN_SUBMIT).await?.found() else {
        error!("submit button not found");
        return Ok(false);
    };
    debug!("submitting login form");
    session.click(&submit).await?;

    if probe_authenticated(session).await? {
        return Ok(true);
    }

    // Best effort: surface the site's own failure message. Its absence is
    // not a further failure.
    match session.find(&scope, site::LOGIN_ERROR).await? {
        Lookup::Found(el) => {
            let message = session.text(&el).await?;
            error!(message = %message.trim(), "login rejected");
        }
        _ => error!("login failed without an inline error message"),
    }
    Ok(false)
}
