// src/config.rs
// Bot configuration: TOML file, overridden by MONEYTAB_BOT_* environment
// variables. Validation happens before any browser or network action.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

use crate::filter::{expand_today, NotificationFilter};

pub const DEFAULT_CONFIG_PATH: &str = "moneytab-bot.toml";

const ENV_PREFIX: &str = "MONEYTAB_BOT_";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BotConfig {
    /// Run Chrome without a window.
    pub headless: bool,
    /// Optional Chrome profile directory, created if missing.
    pub user_data_dir: Option<PathBuf>,
    /// Where history and session artifacts live.
    pub state_dir: PathBuf,
    /// Single bounded wait for every element/URL wait, in milliseconds.
    pub wait_timeout_ms: u64,
    /// Debug aid: keep the browser open this long before quitting.
    pub wait_before_quit_ms: u64,
    pub persist_cookies: bool,
    pub persist_local_storage: bool,
    pub login: String,
    pub password: String,
    /// Filter over the displayed entry date, `^`-prefixed for deny-list.
    /// The literal `TODAY` expands to the current date.
    pub date_filter: Option<String>,
    /// Filter over video titles, same syntax. Notices are exempt.
    pub title_filter: Option<String>,
    pub telegram_bot_token: String,
    /// Chat ids every surviving entry is posted to.
    pub telegram_chat_ids: Vec<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            headless: true,
            user_data_dir: None,
            state_dir: PathBuf::from("."),
            wait_timeout_ms: 5_000,
            wait_before_quit_ms: 0,
            persist_cookies: true,
            persist_local_storage: true,
            login: String::new(),
            password: String::new(),
            date_filter: None,
            title_filter: None,
            telegram_bot_token: String::new(),
            telegram_chat_ids: Vec::new(),
        }
    }
}

impl BotConfig {
    /// Load from `path` (or the default path when it exists), then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let data = fs::read_to_string(p)
                    .with_context(|| format!("reading config from {}", p.display()))?;
                toml::from_str(&data)
                    .with_context(|| format!("parsing config from {}", p.display()))?
            }
            None => {
                let p = Path::new(DEFAULT_CONFIG_PATH);
                if p.exists() {
                    let data = fs::read_to_string(p)
                        .with_context(|| format!("reading config from {}", p.display()))?;
                    toml::from_str(&data)
                        .with_context(|| format!("parsing config from {}", p.display()))?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_var("HEADLESS") {
            self.headless = parse_bool(&v);
        }
        if let Some(v) = env_var("USER_DATA_DIR") {
            self.user_data_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = env_var("STATE_DIR") {
            self.state_dir = PathBuf::from(v);
        }
        if let Some(v) = env_var("WAIT_TIMEOUT_MS") {
            self.wait_timeout_ms = parse_ms("WAIT_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = env_var("WAIT_BEFORE_QUIT_MS") {
            self.wait_before_quit_ms = parse_ms("WAIT_BEFORE_QUIT_MS", &v)?;
        }
        if let Some(v) = env_var("PERSIST_COOKIES") {
            self.persist_cookies = parse_bool(&v);
        }
        if let Some(v) = env_var("PERSIST_LOCAL_STORAGE") {
            self.persist_local_storage = parse_bool(&v);
        }
        if let Some(v) = env_var("LOGIN") {
            self.login = v.trim().to_string();
        }
        if let Some(v) = env_var("PASSWORD") {
            self.password = v.trim().to_string();
        }
        if let Some(v) = env_var("DATE_FILTER") {
            self.date_filter = some_nonempty(v);
        }
        if let Some(v) = env_var("TITLE_FILTER") {
            self.title_filter = some_nonempty(v);
        }
        if let Some(v) = env_var("TG_BOT_TOKEN") {
            self.telegram_bot_token = v.trim().to_string();
        }
        if let Some(v) = env_var("TG_CHAT_IDS") {
            self.telegram_chat_ids = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(())
    }

    /// Reject configurations that cannot run, before touching the browser.
    pub fn validate(&self) -> Result<()> {
        if self.wait_timeout_ms == 0 {
            bail!("wait_timeout_ms must be greater than zero");
        }
        if self.login.is_empty() {
            bail!("login is not configured");
        }
        if self.password.is_empty() {
            bail!("password is not configured");
        }
        if self.telegram_bot_token.is_empty() {
            bail!("telegram_bot_token is not configured");
        }
        if self.telegram_chat_ids.is_empty() {
            bail!("telegram_chat_ids is empty");
        }
        fs::create_dir_all(&self.state_dir).with_context(|| {
            format!("state_dir {} is not usable", self.state_dir.display())
        })?;
        if let Some(dir) = &self.user_data_dir {
            fs::create_dir_all(dir)
                .with_context(|| format!("user_data_dir {} is not usable", dir.display()))?;
        }
        Ok(())
    }

    /// The configured date filter with `TODAY` expanded, or none.
    pub fn date_filter(&self) -> Option<NotificationFilter> {
        self.date_filter
            .as_deref()
            .map(|spec| NotificationFilter::parse(&expand_today(spec)))
    }

    pub fn title_filter(&self) -> Option<NotificationFilter> {
        self.title_filter.as_deref().map(NotificationFilter::parse)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{name}")).ok()
}

fn parse_bool(v: &str) -> bool {
    v.trim().eq_ignore_ascii_case("true")
}

fn parse_ms(name: &str, v: &str) -> Result<u64> {
    v.trim()
        .parse()
        .map_err(|_| anyhow!("invalid {ENV_PREFIX}{name}: {v}"))
}

fn some_nonempty(v: String) -> Option<String> {
    let trimmed = v.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterMode;

    #[test]
    fn toml_round_trip_with_defaults() {
        let cfg: BotConfig = toml::from_str(
            r#"
            login = "user"
            password = "secret"
            telegram_bot_token = "123:abc"
            telegram_chat_ids = ["-100200300"]
            date_filter = "^TODAY"
            "#,
        )
        .unwrap();
        assert!(cfg.headless);
        assert_eq!(cfg.wait_timeout_ms, 5_000);
        assert_eq!(cfg.telegram_chat_ids, vec!["-100200300".to_string()]);
        let filter = cfg.date_filter().unwrap();
        assert_eq!(filter.mode(), FilterMode::DenyList);
    }

    #[test]
    fn zero_wait_timeout_is_rejected() {
        let cfg = BotConfig {
            wait_timeout_ms: 0,
            ..BotConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = BotConfig {
            state_dir: dir.path().to_path_buf(),
            ..BotConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn complete_config_validates() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = BotConfig {
            login: "user".into(),
            password: "secret".into(),
            telegram_bot_token: "123:abc".into(),
            telegram_chat_ids: vec!["42".into()],
            state_dir: dir.path().to_path_buf(),
            ..BotConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_take_precedence() {
        std::env::set_var("MONEYTAB_BOT_LOGIN", "env-user");
        std::env::set_var("MONEYTAB_BOT_TG_CHAT_IDS", "1, 2,");
        let cfg = BotConfig::load(None).unwrap();
        assert_eq!(cfg.login, "env-user");
        assert_eq!(cfg.telegram_chat_ids, vec!["1".to_string(), "2".into()]);
        std::env::remove_var("MONEYTAB_BOT_LOGIN");
        std::env::remove_var("MONEYTAB_BOT_TG_CHAT_IDS");
    }
}
