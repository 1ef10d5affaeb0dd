// src/resolve.rs
// For every entry that references a detail page, recover the external video
// URL from the page's embedded player frame. The embed is sometimes
// double-wrapped, so after a miss in the top frame exactly one nested frame
// is tried. Any miss beyond that is a site-layout regression and fails the
// whole batch; entries without an asset link pass through untouched.

use anyhow::Result;
use tracing::{debug, error};

use crate::auth;
use crate::notification::NotificationEntry;
use crate::session::{BrowserSession, Lookup};
use crate::site;

pub async fn resolve_links<S: BrowserSession>(
    session: &S,
    entries: &mut [NotificationEntry],
) -> Result<bool> {
    for entry in entries.iter_mut() {
        let Some(asset_link) = entry.asset_link.clone() else {
            continue;
        };
        debug!(url = %asset_link, "resolving media link");
        session.navigate(&asset_link).await?;

        // The detail page must load as a logged-in view; a redirect to a
        // public page here means the session died mid-run.
        if !auth::probe_authenticated(session).await? {
            error!(url = %asset_link, "detail page is not an authenticated view");
            return Ok(false);
        }

        let scope = session.page_scope().await?;
        let Some(frame) = session.find(&scope, site::DETAIL_FRAME).await?.found() else {
            error!(url = %asset_link, "player frame not found");
            return Ok(false);
        };
        let Some(frame_scope) = session.enter_frame(&scope, &frame).await?.found() else {
            error!(url = %asset_link, "cannot enter player frame");
            return Ok(false);
        };

        let mut media_link = canonical_link(session, &frame_scope).await?;

        if media_link.is_none() {
            debug!("no canonical link in top frame, trying one nested frame");
            let Some(nested) = session.find(&frame_scope, site::NESTED_FRAME).await?.found()
            else {
                error!(url = %asset_link, "no nested frame to fall back to");
                return Ok(false);
            };
            let Some(nested_scope) = session.enter_frame(&frame_scope, &nested).await?.found()
            else {
                error!(url = %asset_link, "cannot enter nested frame");
                return Ok(false);
            };
            media_link = canonical_link(session, &nested_scope).await?;
        }

        match media_link {
            Some(link) => {
                debug!(link = %link, "media link resolved");
                entry.resolved_media_link = Some(link);
            }
            None => {
                error!(url = %asset_link, "no canonical link in either frame");
                return Ok(false);
            }
        }
    }
    Ok(true)
}

async fn canonical_link<S: BrowserSession>(
    session: &S,
    scope: &S::Scope,
) -> Result<Option<String>> {
    match session.find(scope, site::CANONICAL_LINK).await? {
        Lookup::Found(el) => Ok(session.attribute(&el, "href").await?),
        _ => Ok(None),
    }
}
