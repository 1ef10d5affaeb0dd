// src/testing.rs
// Scripted doubles for the two I/O seams, used by unit and integration
// tests. `MockSession` plays the site: login form, feed, detail pages with
// (optionally nested) player frames. `MockNotifier` records posts and can be
// told to start failing after N of them.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::notify::{ChannelProfile, Notifier};
use crate::session::{BrowserSession, Lookup, SessionSnapshot};
use crate::site;

/// One scripted feed entry as the page would render it.
#[derive(Debug, Clone)]
pub struct MockEntry {
    pub type_label: String,
    pub date: String,
    pub title: String,
    pub body: String,
    pub href: Option<String>,
}

impl MockEntry {
    pub fn video(date: &str, title: &str, body: &str, href: &str) -> Self {
        Self {
            type_label: site::TYPE_LABEL_VIDEO.into(),
            date: date.into(),
            title: title.into(),
            body: body.into(),
            href: Some(href.into()),
        }
    }

    pub fn notice(date: &str, title: &str, body: &str) -> Self {
        Self {
            type_label: site::TYPE_LABEL_NOTICE.into(),
            date: date.into(),
            title: title.into(),
            body: body.into(),
            href: None,
        }
    }
}

/// Player frame on a detail page; `nested` models the double-wrapped embed.
#[derive(Debug, Clone, Default)]
pub struct MockFrame {
    pub canonical: Option<String>,
    pub nested: Option<Box<MockFrame>>,
}

impl MockFrame {
    pub fn with_canonical(link: &str) -> Self {
        Self {
            canonical: Some(link.into()),
            nested: None,
        }
    }

    pub fn wrapping(inner: MockFrame) -> Self {
        Self {
            canonical: None,
            nested: Some(Box::new(inner)),
        }
    }
}

#[derive(Debug)]
pub struct MockState {
    pub current_url: String,
    pub logged_in: bool,
    /// Credentials the site accepts; `None` rejects everything.
    pub accepts: Option<(String, String)>,
    pub login_trigger_label: String,
    /// Inline error text shown after a rejected login.
    pub login_error: Option<String>,
    pub login_form_open: bool,
    pub last_login_failed: bool,
    pub typed_username: String,
    pub typed_password: String,
    pub feed_entries: Vec<MockEntry>,
    /// Entry indexes whose date sub-element is missing (layout breakage).
    pub malformed_items: HashSet<usize>,
    /// Where the feed page goes when the session is not valid.
    pub feed_redirect: String,
    /// Detail page URL → its player frame.
    pub detail_frames: HashMap<String, MockFrame>,
    /// URLs on which the authentication probe fails even when logged in.
    pub probe_fail_urls: HashSet<String>,
    /// Restoring artifacts logs the session in (a still-valid cookie).
    pub restore_authenticates: bool,
    pub snapshot_value: SessionSnapshot,
    pub restored: Vec<SessionSnapshot>,
    pub nav_log: Vec<String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            current_url: "about:blank".into(),
            logged_in: false,
            accepts: None,
            login_trigger_label: site::LOGIN_TRIGGER_LABEL.into(),
            login_error: None,
            login_form_open: false,
            last_login_failed: false,
            typed_username: String::new(),
            typed_password: String::new(),
            feed_entries: Vec::new(),
            malformed_items: HashSet::new(),
            feed_redirect: site::HOME_URL.into(),
            detail_frames: HashMap::new(),
            probe_fail_urls: HashSet::new(),
            restore_authenticates: false,
            snapshot_value: SessionSnapshot::default(),
            restored: Vec::new(),
            nav_log: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockHandle {
    Probe,
    LoginTrigger,
    UsernameField,
    PasswordField,
    SubmitButton,
    LoginError,
    FeedContainer,
    FeedItem(usize),
    ItemType(usize),
    ItemBlock(usize),
    BlockDate(usize),
    BlockTitle(usize),
    Frame(u8),
    Canonical(u8),
}

/// Scope depth: the page itself, or how many frames deep we are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockScope {
    Page,
    Frame(u8),
}

pub struct MockSession {
    state: Mutex<MockState>,
}

impl MockSession {
    pub fn new(state: MockState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn state<R>(&self, f: impl FnOnce(&MockState) -> R) -> R {
        f(&self.state.lock().unwrap())
    }

    fn frame_at(state: &MockState, depth: u8) -> Option<MockFrame> {
        let top = state.detail_frames.get(&state.current_url)?;
        match depth {
            1 => Some(top.clone()),
            2 => top.nested.as_deref().cloned(),
            _ => None,
        }
    }

    fn probe_visible(state: &MockState) -> bool {
        state.logged_in && !state.probe_fail_urls.contains(&state.current_url)
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    type Handle = MockHandle;
    type Scope = MockScope;

    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.nav_log.push(url.to_string());
        state.login_form_open = false;
        state.current_url = if url == site::FEED_URL && !state.logged_in {
            state.feed_redirect.clone()
        } else {
            url.to_string()
        };
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().current_url.clone())
    }

    async fn wait_for_url(&self, expected: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().current_url == expected)
    }

    async fn page_scope(&self) -> Result<MockScope> {
        Ok(MockScope::Page)
    }

    async fn enter_frame(
        &self,
        _scope: &MockScope,
        frame: &MockHandle,
    ) -> Result<Lookup<MockScope>> {
        match frame {
            MockHandle::Frame(depth) => Ok(Lookup::Found(MockScope::Frame(*depth))),
            _ => Ok(Lookup::NotFound),
        }
    }

    async fn find(&self, scope: &MockScope, selector: &str) -> Result<Lookup<MockHandle>> {
        let state = self.state.lock().unwrap();
        let found = match scope {
            MockScope::Page => match selector {
                site::AUTH_PROBE if Self::probe_visible(&state) => Some(MockHandle::Probe),
                site::LOGIN_TRIGGER if !state.logged_in => Some(MockHandle::LoginTrigger),
                site::LOGIN_USERNAME if state.login_form_open => Some(MockHandle::UsernameField),
                site::LOGIN_PASSWORD if state.login_form_open => Some(MockHandle::PasswordField),
                site::LOGIN_SUBMIT if state.login_form_open => Some(MockHandle::SubmitButton),
                site::LOGIN_ERROR
                    if state.last_login_failed && state.login_error.is_some() =>
                {
                    Some(MockHandle::LoginError)
                }
                site::FEED_CONTAINER if state.current_url == site::FEED_URL => {
                    Some(MockHandle::FeedContainer)
                }
                site::DETAIL_FRAME
                    if state.detail_frames.contains_key(&state.current_url) =>
                {
                    Some(MockHandle::Frame(1))
                }
                _ => None,
            },
            MockScope::Frame(depth) => match selector {
                site::CANONICAL_LINK => Self::frame_at(&state, *depth)
                    .filter(|f| f.canonical.is_some())
                    .map(|_| MockHandle::Canonical(*depth)),
                site::NESTED_FRAME => Self::frame_at(&state, *depth)
                    .filter(|f| f.nested.is_some())
                    .map(|_| MockHandle::Frame(depth + 1)),
                _ => None,
            },
        };
        Ok(found.map_or(Lookup::TimedOut, Lookup::Found))
    }

    async fn find_now(
        &self,
        parent: &MockHandle,
        selector: &str,
    ) -> Result<Lookup<MockHandle>> {
        let state = self.state.lock().unwrap();
        let found = match (parent, selector) {
            (MockHandle::FeedItem(i), site::ITEM_TYPE) => Some(MockHandle::ItemType(*i)),
            (MockHandle::FeedItem(i), site::ITEM_VIDEO_BLOCK) => state
                .feed_entries
                .get(*i)
                .filter(|e| e.href.is_some())
                .map(|_| MockHandle::ItemBlock(*i)),
            (MockHandle::FeedItem(i), site::ITEM_NOTICE_BLOCK) => {
                Some(MockHandle::ItemBlock(*i))
            }
            (MockHandle::ItemBlock(i), site::BLOCK_DATE) => {
                if state.malformed_items.contains(i) {
                    None
                } else {
                    Some(MockHandle::BlockDate(*i))
                }
            }
            (MockHandle::ItemBlock(i), site::BLOCK_TITLE) => Some(MockHandle::BlockTitle(*i)),
            _ => None,
        };
        Ok(found.map_or(Lookup::NotFound, Lookup::Found))
    }

    async fn find_all(&self, parent: &MockHandle, selector: &str) -> Result<Vec<MockHandle>> {
        let state = self.state.lock().unwrap();
        match (parent, selector) {
            (MockHandle::FeedContainer, site::FEED_ITEM) => {
                Ok((0..state.feed_entries.len()).map(MockHandle::FeedItem).collect())
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn text(&self, el: &MockHandle) -> Result<String> {
        let state = self.state.lock().unwrap();
        let text = match el {
            MockHandle::LoginTrigger => state.login_trigger_label.clone(),
            MockHandle::LoginError => state.login_error.clone().unwrap_or_default(),
            MockHandle::ItemType(i) => state.feed_entries[*i].type_label.clone(),
            MockHandle::BlockDate(i) => state.feed_entries[*i].date.clone(),
            MockHandle::BlockTitle(i) => state.feed_entries[*i].title.clone(),
            MockHandle::ItemBlock(i) => state.feed_entries[*i].body.clone(),
            _ => String::new(),
        };
        Ok(text)
    }

    async fn attribute(&self, el: &MockHandle, name: &str) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        let value = match (el, name) {
            (MockHandle::ItemBlock(i), "href") => state.feed_entries[*i].href.clone(),
            (MockHandle::Canonical(depth), "href") => {
                Self::frame_at(&state, *depth).and_then(|f| f.canonical)
            }
            (MockHandle::Frame(depth), "src") => {
                Some(format!("mock-frame://depth/{depth}"))
            }
            _ => None,
        };
        Ok(value)
    }

    async fn click(&self, el: &MockHandle) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match el {
            MockHandle::LoginTrigger => state.login_form_open = true,
            MockHandle::SubmitButton => {
                let submitted = (
                    state.typed_username.clone(),
                    state.typed_password.clone(),
                );
                state.logged_in = state.accepts.as_ref() == Some(&submitted);
                state.last_login_failed = !state.logged_in;
            }
            _ => {}
        }
        Ok(())
    }

    async fn send_keys(&self, el: &MockHandle, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match el {
            MockHandle::UsernameField => state.typed_username.push_str(text),
            MockHandle::PasswordField => state.typed_password.push_str(text),
            _ => {}
        }
        Ok(())
    }

    async fn snapshot(&self) -> Result<SessionSnapshot> {
        Ok(self.state.lock().unwrap().snapshot_value.clone())
    }

    async fn restore(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.restored.push(snapshot.clone());
        if state.restore_authenticates {
            state.logged_in = true;
        }
        Ok(())
    }
}

/// Recording notifier; optionally fails once `fail_after` posts succeeded.
pub struct MockNotifier {
    posts: Mutex<Vec<(String, String)>>,
    fail_after: Option<usize>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            posts: Mutex::new(Vec::new()),
            fail_after: None,
        }
    }

    pub fn failing_after(n: usize) -> Self {
        Self {
            posts: Mutex::new(Vec::new()),
            fail_after: Some(n),
        }
    }

    pub fn posts(&self) -> Vec<(String, String)> {
        self.posts.lock().unwrap().clone()
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    fn profile(&self) -> ChannelProfile {
        ChannelProfile {
            max_message_len: 4096,
            line_break: "\n",
        }
    }

    async fn post(&self, destination: &str, text: &str) -> Result<()> {
        let mut posts = self.posts.lock().unwrap();
        if let Some(n) = self.fail_after {
            if posts.len() >= n {
                bail!("channel rejected post #{}", posts.len() + 1);
            }
        }
        posts.push((destination.to_string(), text.to_string()));
        Ok(())
    }
}
