//! Member roster and free-text member resolution.
#![allow(dead_code)]
//!
//! Telegram has no member enumeration for ordinary group chats, so the
//! roster is built from observed traffic: anyone who has sent a message or
//! queued a track is registered. Resolution against the roster is a pure
//! query; truncation for display happens at the presentation layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A known chat member.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Member {
    /// Sender ID (unique per member).
    pub id: i64,

    /// Display name.
    pub name: String,

    /// Telegram @username, if the member has one.
    pub username: Option<String>,
}

impl Member {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            username: None,
        }
    }

    pub fn with_username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    /// Label used in prompts and result messages.
    pub fn label(&self) -> String {
        match &self.username {
            Some(u) => format!("{} (@{})", self.name, u),
            None => self.name.clone(),
        }
    }
}

/// Shared, cloneable roster of known members.
#[derive(Clone, Default)]
pub struct Roster {
    inner: Arc<Mutex<HashMap<i64, Member>>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or refresh) a member seen in chat traffic.
    pub fn register(&self, member: Member) {
        let mut members = self.inner.lock().unwrap();
        members.insert(member.id, member);
    }

    /// Number of known members.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Look up a member by sender ID.
    pub fn get(&self, id: i64) -> Option<Member> {
        self.inner.lock().unwrap().get(&id).cloned()
    }

    /// Resolve a free-text query to matching members.
    ///
    /// Match tiers, strongest first: numeric sender ID, exact @username,
    /// exact name (case-insensitive), name prefix, name substring. Results
    /// within a tier are ordered by sender ID for stable output; a member
    /// matches at most once. Returns 0, 1, or N members; callers decide what
    /// to do with each cardinality.
    pub fn resolve(&self, query: &str) -> Vec<Member> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let members = self.inner.lock().unwrap();

        // Numeric ID is unambiguous.
        if let Ok(id) = query.parse::<i64>() {
            if let Some(member) = members.get(&id) {
                return vec![member.clone()];
            }
        }

        let handle = parse_handle(query);
        let lowered = query.to_lowercase();

        let mut exact_handle = Vec::new();
        let mut exact_name = Vec::new();
        let mut prefix = Vec::new();
        let mut contains = Vec::new();

        for member in members.values() {
            if let (Some(h), Some(u)) = (handle.as_deref(), member.username.as_deref()) {
                if u.eq_ignore_ascii_case(h) {
                    exact_handle.push(member.clone());
                    continue;
                }
            }

            let name = member.name.to_lowercase();
            if name == lowered {
                exact_name.push(member.clone());
            } else if name.starts_with(&lowered) {
                prefix.push(member.clone());
            } else if name.contains(&lowered) {
                contains.push(member.clone());
            }
        }

        for tier in [&mut exact_handle, &mut exact_name, &mut prefix, &mut contains] {
            tier.sort_by_key(|m| m.id);
        }

        if !exact_handle.is_empty() {
            return exact_handle;
        }

        let mut out = exact_name;
        out.extend(prefix);
        out.extend(contains);
        out
    }
}

/// Extract a bare username from an `@handle` query.
fn parse_handle(query: &str) -> Option<String> {
    let re = Regex::new(r"^@?([A-Za-z0-9_]{3,})$").ok()?;
    let caps = re.captures(query)?;
    Some(caps.get(1)?.as_str().to_string())
}
