//! Session data types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A point in time persisted as epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(#[serde(with = "chrono::serde::ts_milliseconds")] pub DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

/// Everything remembered about one assistant session.
///
/// Methods here mutate an in-memory snapshot only; `SessionStore` owns the
/// load/save cycle around them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionData {
    /// Project-relative paths, in first-seen order, without duplicates.
    pub modified_files: Vec<String>,
    pub active_domains: Vec<String>,
    /// Skill name -> last time it was surfaced, for cooldown.
    pub last_activated_skills: BTreeMap<String, Timestamp>,
    pub current_prompt_skills: Vec<String>,
    pub tool_use_count: u64,
    pub created_at: Timestamp,
}

impl Default for SessionData {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl SessionData {
    /// Create an empty session record.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            modified_files: Vec::new(),
            active_domains: Vec::new(),
            last_activated_skills: BTreeMap::new(),
            current_prompt_skills: Vec::new(),
            tool_use_count: 0,
            created_at: Timestamp(now),
        }
    }

    /// Append a modified path. Returns false if it was already tracked.
    pub fn add_modified_file(&mut self, path: &str) -> bool {
        if self.modified_files.iter().any(|p| p == path) {
            return false;
        }
        self.modified_files.push(path.to_string());
        true
    }

    pub fn record_activation(&mut self, skill: &str, now: DateTime<Utc>) {
        self.last_activated_skills
            .insert(skill.to_string(), Timestamp(now));
    }

    /// Whether `skill` was activated within `window` before `now`.
    pub fn is_recently_activated(&self, skill: &str, window: Duration, now: DateTime<Utc>) -> bool {
        match self.last_activated_skills.get(skill) {
            Some(Timestamp(at)) => now - *at < window,
            None => false,
        }
    }

    /// Drop cooldown entries older than `max_age`. Returns how many were removed.
    pub fn prune_stale_activations(&mut self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let before = self.last_activated_skills.len();
        self.last_activated_skills
            .retain(|_, Timestamp(at)| now - *at <= max_age);
        before - self.last_activated_skills.len()
    }

    /// Bump the tool use counter and return the new value.
    pub fn increment_tool_use_count(&mut self) -> u64 {
        self.tool_use_count += 1;
        self.tool_use_count
    }

    /// Replace the skills surfaced for the latest prompt.
    pub fn set_current_prompt_skills(&mut self, names: &[String]) {
        self.current_prompt_skills.clear();
        for name in names {
            if !self.current_prompt_skills.contains(name) {
                self.current_prompt_skills.push(name.clone());
            }
        }
    }

    pub fn add_active_domains(&mut self, names: &[String]) {
        for name in names {
            if !self.active_domains.contains(name) {
                self.active_domains.push(name.clone());
            }
        }
    }
}
