// src/session/cdp.rs
// chromiumoxide binding for `BrowserSession`. Thin I/O wrapper: lookups,
// navigation, and state snapshot/restore, with no pipeline logic.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{BrowserSession, Lookup, SessionSnapshot, StoredCookie};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

const LOCAL_STORAGE_EXPORT: &str = r#"
(() => {
    const out = {};
    for (let i = 0; i < localStorage.length; i++) {
        const key = localStorage.key(i);
        out[key] = localStorage.getItem(key);
    }
    return out;
})()
"#;

/// Launch parameters for the managed Chrome instance.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub user_data_dir: Option<PathBuf>,
    /// Single bounded wait reused for every element/URL wait.
    pub wait_timeout: Duration,
}

/// A document the session is currently reading. CDP keeps no WebDriver-style
/// frame cursor, so a frame scope is entered by loading the frame's own
/// document as the active one; the scope value records which document that is.
#[derive(Debug, Clone)]
pub struct CdpScope {
    doc_url: Option<String>,
}

pub struct CdpSession {
    browser: Browser,
    page: Page,
    wait_timeout: Duration,
    handler_task: JoinHandle<()>,
}

impl CdpSession {
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder();
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(dir) = &options.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        builder = builder.args([
            "--disable-gpu",
            "--disable-extensions",
            "--no-default-browser-check",
        ]);
        let config = builder.build().map_err(|e| anyhow!(e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("launching browser")?;

        // The handler stream must be pumped for the lifetime of the session.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("opening page")?;

        Ok(Self {
            browser,
            page,
            wait_timeout: options.wait_timeout,
            handler_task,
        })
    }

    /// Quit the browser. The optional delay is a debug aid for watching the
    /// final page state in headed mode.
    pub async fn close(mut self, wait_before_quit: Duration) {
        if !wait_before_quit.is_zero() {
            debug!(?wait_before_quit, "sleeping before browser quit");
            tokio::time::sleep(wait_before_quit).await;
        }
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "browser did not close cleanly");
        }
        let _ = self.browser.wait().await;
        self.handler_task.abort();
    }

    async fn find_with_wait(&self, selector: &str) -> Result<Lookup<Element>> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            // A miss and a transient CDP error look the same here; a dead
            // session fails the next navigation instead.
            if let Ok(el) = self.page.find_element(selector).await {
                return Ok(Lookup::Found(el));
            }
            if Instant::now() >= deadline {
                return Ok(Lookup::TimedOut);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl BrowserSession for CdpSession {
    type Handle = Element;
    type Scope = CdpScope;

    async fn navigate(&self, url: &str) -> Result<()> {
        debug!(url, "navigate");
        self.page
            .goto(url)
            .await
            .with_context(|| format!("navigating to {url}"))?;
        self.page
            .wait_for_navigation()
            .await
            .context("waiting for navigation")?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn wait_for_url(&self, expected: &str) -> Result<bool> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            if self.current_url().await? == expected {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn page_scope(&self) -> Result<CdpScope> {
        Ok(CdpScope { doc_url: None })
    }

    async fn enter_frame(
        &self,
        _scope: &CdpScope,
        frame: &Element,
    ) -> Result<Lookup<CdpScope>> {
        let src = match frame.attribute("src").await? {
            Some(src) if !src.trim().is_empty() => src.trim().to_string(),
            _ => return Ok(Lookup::NotFound),
        };
        debug!(src = %src, "entering frame document");
        self.navigate(&src).await?;
        Ok(Lookup::Found(CdpScope {
            doc_url: Some(src),
        }))
    }

    async fn find(&self, scope: &CdpScope, selector: &str) -> Result<Lookup<Element>> {
        // Callers descend scopes linearly, so the scoped document is the one
        // currently loaded; the scope value is kept for diagnostics.
        if let Some(doc) = &scope.doc_url {
            debug!(doc = %doc, selector, "scoped find");
        }
        self.find_with_wait(selector).await
    }

    async fn find_now(&self, parent: &Element, selector: &str) -> Result<Lookup<Element>> {
        match parent.find_element(selector).await {
            Ok(el) => Ok(Lookup::Found(el)),
            Err(_) => Ok(Lookup::NotFound),
        }
    }

    async fn find_all(&self, parent: &Element, selector: &str) -> Result<Vec<Element>> {
        Ok(parent.find_elements(selector).await.unwrap_or_default())
    }

    async fn text(&self, el: &Element) -> Result<String> {
        Ok(el.inner_text().await?.unwrap_or_default())
    }

    async fn attribute(&self, el: &Element, name: &str) -> Result<Option<String>> {
        Ok(el.attribute(name).await?)
    }

    async fn click(&self, el: &Element) -> Result<()> {
        el.click().await.context("clicking element")?;
        Ok(())
    }

    async fn send_keys(&self, el: &Element, text: &str) -> Result<()> {
        el.click().await.context("focusing element")?;
        el.type_str(text).await.context("typing into element")?;
        Ok(())
    }

    async fn snapshot(&self) -> Result<SessionSnapshot> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .context("reading cookies")?
            .into_iter()
            .map(|c| StoredCookie {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                http_only: c.http_only,
                secure: c.secure,
            })
            .collect();

        let local_storage: BTreeMap<String, String> = self
            .page
            .evaluate(LOCAL_STORAGE_EXPORT)
            .await
            .context("reading local storage")?
            .into_value()
            .context("decoding local storage")?;

        Ok(SessionSnapshot {
            cookies,
            local_storage,
        })
    }

    async fn restore(&self, snapshot: &SessionSnapshot) -> Result<()> {
        if !snapshot.cookies.is_empty() {
            let params: Vec<CookieParam> = snapshot
                .cookies
                .iter()
                .map(|c| {
                    let mut p = CookieParam::new(c.name.clone(), c.value.clone());
                    p.domain = Some(c.domain.clone());
                    p.path = Some(c.path.clone());
                    p.http_only = Some(c.http_only);
                    p.secure = Some(c.secure);
                    p
                })
                .collect();
            self.page
                .set_cookies(params)
                .await
                .context("restoring cookies")?;
        }

        if !snapshot.local_storage.is_empty() {
            let payload = serde_json::to_string(&snapshot.local_storage)
                .context("encoding local storage")?;
            let script = format!(
                "(() => {{ const items = {payload}; \
                 for (const [key, value] of Object.entries(items)) \
                 localStorage.setItem(key, value); return true; }})()"
            );
            self.page
                .evaluate(script)
                .await
                .context("restoring local storage")?;
        }

        debug!(
            cookies = snapshot.cookies.len(),
            local_storage = snapshot.local_storage.len(),
            "session snapshot restored"
        );
        Ok(())
    }
}
