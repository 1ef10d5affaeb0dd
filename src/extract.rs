// src/extract.rs
// Feed extraction: navigate, verify no redirect, enumerate entries in
// document order, classify, and apply the temporal + content filters.
//
// `Ok(None)` means "could not read the feed" (redirect or structure
// mismatch) and is distinct from `Ok(Some(vec![]))`, an authenticated feed
// with zero entries.

use anyhow::Result;
use tracing::{debug, error};

use crate::filter::NotificationFilter;
use crate::notification::{NotificationEntry, NotificationKind};
use crate::session::BrowserSession;
use crate::site;

pub async fn extract<S: BrowserSession>(
    session: &S,
    date_filter: Option<&NotificationFilter>,
    title_filter: Option<&NotificationFilter>,
) -> Result<Option<Vec<NotificationEntry>>> {
    session.navigate(site::FEED_URL).await?;

    if !session.wait_for_url(site::FEED_URL).await? {
        error!(
            current = %session.current_url().await?,
            "feed page redirected, session is not valid"
        );
        return Ok(None);
    }

    let scope = session.page_scope().await?;
    let Some(container) = session.find(&scope, site::FEED_CONTAINER).await?.found() else {
        error!("feed container not found");
        return Ok(None);
    };

    let items = session.find_all(&container, site::FEED_ITEM).await?;
    debug!(count = items.len(), "raw feed entries");

    let mut entries = Vec::with_capacity(items.len());
    for item in &items {
        // One malformed entry means the site layout changed; partial data is
        // worse than none.
        let entry = match parse_entry(session, item).await? {
            Some(entry) => entry,
            None => {
                error!("malformed feed entry, aborting extraction");
                return Ok(None);
            }
        };

        if let Some(filter) = date_filter {
            if !filter.passes(&entry.occurred_on) {
                debug!(date = %entry.occurred_on, "entry dropped by date filter");
                continue;
            }
        }
        // Title filtering only applies to video uploads; notices have no
        // meaningful title to filter on.
        if entry.kind == NotificationKind::VideoUpload {
            if let Some(filter) = title_filter {
                if !filter.passes(&entry.title) {
                    debug!(title = %entry.title, "entry dropped by title filter");
                    continue;
                }
            }
        }

        entries.push(entry);
    }

    debug!(count = entries.len(), "entries after content filters");
    Ok(Some(entries))
}

/// Map one raw element to a structured entry. `None` = a required
/// sub-element was missing.
async fn parse_entry<S: BrowserSession>(
    session: &S,
    item: &S::Handle,
) -> Result<Option<NotificationEntry>> {
    let Some(type_el) = session.find_now(item, site::ITEM_TYPE).await?.found() else {
        return Ok(None);
    };
    let type_label = session.text(&type_el).await?;

    let (kind, block, asset_link) = if type_label.trim() == site::TYPE_LABEL_VIDEO {
        let Some(block) = session.find_now(item, site::ITEM_VIDEO_BLOCK).await?.found() else {
            return Ok(None);
        };
        let Some(href) = session.attribute(&block, "href").await? else {
            return Ok(None);
        };
        (NotificationKind::VideoUpload, block, Some(href.trim().to_string()))
    } else {
        let Some(block) = session.find_now(item, site::ITEM_NOTICE_BLOCK).await?.found() else {
            return Ok(None);
        };
        (NotificationKind::GeneralNotice, block, None)
    };

    let Some(date_el) = session.find_now(&block, site::BLOCK_DATE).await?.found() else {
        return Ok(None);
    };
    let Some(title_el) = session.find_now(&block, site::BLOCK_TITLE).await?.found() else {
        return Ok(None);
    };

    let occurred_on = session.text(&date_el).await?.trim().to_string();
    let title = session.text(&title_el).await?.trim().to_string();
    // Fingerprint is computed here, before any filtering, so the history can
    // cover everything seen this run.
    let body = session.text(&block).await?.trim().to_string();

    let entry = NotificationEntry::new(kind, occurred_on, title, body, asset_link);
    debug!(fingerprint = %entry.fingerprint, kind = ?entry.kind, "entry parsed");
    Ok(Some(entry))
}
