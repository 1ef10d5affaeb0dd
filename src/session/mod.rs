// src/session/mod.rs
pub mod artifacts;
pub mod cdp;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome of a single element lookup. Absence is a value, not an error:
/// `NotFound` is an immediate miss, `TimedOut` a miss that outlasted the
/// configured wait. Driver breakage surfaces as `Err` from the session call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    TimedOut,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// Cookie fields the bot persists across runs. Expiry is left to the site;
/// a restored cookie lives for the browser session it was restored into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub http_only: bool,
    pub secure: bool,
}

/// Browser-side state worth carrying between invocations: cookies plus the
/// local-storage items of the site origin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub cookies: Vec<StoredCookie>,
    pub local_storage: BTreeMap<String, String>,
}

impl SessionSnapshot {
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.local_storage.is_empty()
    }
}

/// The browser seam the pipeline stages are written against.
///
/// Selectors are opaque structural patterns (see `site`). A `Scope` names a
/// document: the page itself, or the document embedded in a frame, obtained
/// explicitly from `enter_frame` rather than by mutating a driver cursor.
/// `find` and `wait_for_url` apply the session's single configured bounded
/// wait; `find_now`/`find_all` report what is present right now.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    type Handle: Send + Sync;
    type Scope: Clone + Send + Sync;

    async fn navigate(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// Bounded wait until the page URL equals `expected`. `false` means the
    /// site went somewhere else (e.g. a redirect off a protected page).
    async fn wait_for_url(&self, expected: &str) -> Result<bool>;

    /// Scope of the document currently loaded in the page.
    async fn page_scope(&self) -> Result<Self::Scope>;

    /// Scope of the document embedded in `frame`, found under `scope`.
    async fn enter_frame(
        &self,
        scope: &Self::Scope,
        frame: &Self::Handle,
    ) -> Result<Lookup<Self::Scope>>;

    /// Bounded-wait lookup of the first match under a document scope.
    async fn find(&self, scope: &Self::Scope, selector: &str) -> Result<Lookup<Self::Handle>>;

    /// Immediate lookup of the first match under an element.
    async fn find_now(
        &self,
        parent: &Self::Handle,
        selector: &str,
    ) -> Result<Lookup<Self::Handle>>;

    /// Immediate lookup of all matches under an element, in document order.
    async fn find_all(&self, parent: &Self::Handle, selector: &str) -> Result<Vec<Self::Handle>>;

    /// Full rendered text of an element.
    async fn text(&self, el: &Self::Handle) -> Result<String>;

    async fn attribute(&self, el: &Self::Handle, name: &str) -> Result<Option<String>>;

    async fn click(&self, el: &Self::Handle) -> Result<()>;

    async fn send_keys(&self, el: &Self::Handle, text: &str) -> Result<()>;

    /// Capture cookies + local storage of the current origin.
    async fn snapshot(&self) -> Result<SessionSnapshot>;

    /// Re-apply a captured snapshot. Local-storage writes land on the
    /// currently loaded origin, so navigate to the site first.
    async fn restore(&self, snapshot: &SessionSnapshot) -> Result<()>;
}
