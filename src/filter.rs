// src/filter.rs
use std::collections::HashSet;

use crate::site::{DATE_DISPLAY_FORMAT, TODAY_TOKEN};

/// Whether listed keys are excluded (deny) or exclusively included (allow).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    DenyList,
    AllowList,
}

/// Allow/deny predicate over one string attribute of an entry.
///
/// An unconfigured filter is represented as `Option<NotificationFilter>::None`
/// at the call sites, which passes everything. That is not the same thing as
/// an allow-list with an empty key set, which passes nothing.
#[derive(Debug, Clone)]
pub struct NotificationFilter {
    mode: FilterMode,
    keys: HashSet<String>,
}

impl NotificationFilter {
    /// Parse the config syntax: comma-separated keys, leading `^` selects
    /// deny-list mode, otherwise allow-list mode.
    pub fn parse(spec: &str) -> Self {
        let (mode, rest) = match spec.strip_prefix('^') {
            Some(rest) => (FilterMode::DenyList, rest),
            None => (FilterMode::AllowList, spec),
        };
        let keys = rest
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        Self { mode, keys }
    }

    pub fn deny_list<I: IntoIterator<Item = String>>(keys: I) -> Self {
        Self {
            mode: FilterMode::DenyList,
            keys: keys.into_iter().collect(),
        }
    }

    pub fn allow_list<I: IntoIterator<Item = String>>(keys: I) -> Self {
        Self {
            mode: FilterMode::AllowList,
            keys: keys.into_iter().collect(),
        }
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Membership XORed with mode: deny-list passes everything except listed
    /// keys, allow-list passes only listed keys.
    pub fn passes(&self, key: &str) -> bool {
        (self.mode == FilterMode::DenyList) ^ self.keys.contains(key)
    }
}

/// Replace the `TODAY` placeholder with the current local date in the site's
/// display format, so a cron-driven config can pin the filter to "today".
pub fn expand_today(spec: &str) -> String {
    spec.replace(
        TODAY_TOKEN,
        &chrono::Local::now().format(DATE_DISPLAY_FORMAT).to_string(),
    )
}
