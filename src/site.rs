// src/site.rs
// Everything the bot knows about the money-tab page structure lives here,
// so the pipeline stages carry no literal URLs or selectors.

/// Public landing page; also where persisted session state is re-applied.
pub const HOME_URL: &str = "https://www.money-tab.com";

/// Member notification feed. Redirects away when the session is not valid.
pub const FEED_URL: &str = "https://www.money-tab.com/profile/notification";

/// Type-indicator label for a video upload entry.
pub const TYPE_LABEL_VIDEO: &str = "新到影片";
/// Type-indicator label for a general notice entry.
pub const TYPE_LABEL_NOTICE: &str = "重要通知";

/// Present only for a logged-in session; used as the authentication probe.
pub const AUTH_PROBE: &str = "a[href='/profile/account']:has(svg.svg-icon)";

/// Control that reveals the login form.
pub const LOGIN_TRIGGER: &str = "section > div > div > span[role='button']:has(span)";
/// Expected text of the login trigger; anything else means the page layout moved.
pub const LOGIN_TRIGGER_LABEL: &str = "登入";

pub const LOGIN_USERNAME: &str = "form:has(input#username) input#username";
pub const LOGIN_PASSWORD: &str = "form:has(input#username) input#password";
pub const LOGIN_SUBMIT: &str = "form:has(input#username) button[type='submit']";
/// Inline failure message rendered under the form after a rejected login.
pub const LOGIN_ERROR: &str =
    "form:has(input#username) div > div.input-row + div.input-row + div";

/// Region holding the ordered list of notification entries.
pub const FEED_CONTAINER: &str = "section > div > div > p + div";
/// One raw feed entry.
pub const FEED_ITEM: &str = "div[class^='notice_item']";
/// Type-indicator sub-element inside an entry.
pub const ITEM_TYPE: &str = "div > span + span";
/// Link block of a video entry; href points at the detail page.
pub const ITEM_VIDEO_BLOCK: &str = "div + div > a.block[href]";
/// Plain block of a notice entry (no link).
pub const ITEM_NOTICE_BLOCK: &str = "div + div";
pub const BLOCK_DATE: &str = "div > span";
pub const BLOCK_TITLE: &str = "div:has(span) + p";

/// Embedded player frame on a video detail page.
pub const DETAIL_FRAME: &str = "main > section > div + div iframe";
/// The site sometimes double-wraps the embed; one nested descent is allowed.
pub const NESTED_FRAME: &str = "iframe";
/// Canonical link inside the embed document; its href is the external video URL.
pub const CANONICAL_LINK: &str = "link[rel='canonical']";

/// Date tokens on the feed are rendered in this format.
pub const DATE_DISPLAY_FORMAT: &str = "%d.%m.%Y";
/// Placeholder accepted in the configured date filter, replaced at run start.
pub const TODAY_TOKEN: &str = "TODAY";
