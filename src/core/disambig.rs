//! Interactive disambiguation of ambiguous member queries.
#![allow(dead_code)]
//!
//! When a query matches several members, the invoker gets a numbered prompt
//! plus a cancel choice. Each open prompt is a `PendingSelect` in a shared
//! `SelectRegistry`, keyed by a ULID correlation id that rides along in the
//! callback data. Exactly one response wins: the oneshot sender is taken
//! under the registry lock, so late or duplicate responses are no-ops.
//! Prompts expire after a fixed timeout and expired entries are dropped from
//! the registry, either by the waiting task or by `sweep_expired`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

use super::roster::Member;

/// A response to an open prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Choice {
    /// Zero-based index into the offered candidates.
    Index(usize),
    Cancel,
}

/// Terminal outcome of one disambiguation.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectOutcome {
    Chosen(Member),
    Cancelled,
    Expired,
}

/// One open prompt awaiting a response.
struct PendingSelect {
    /// Only the original invoker may respond.
    invoker_id: i64,

    /// Candidates offered, already truncated for display.
    candidates: Vec<Member>,

    /// Unix millis past which the prompt is dead.
    expires_at: i64,

    /// Taken by the first valid response; None means already resolved.
    tx: Option<oneshot::Sender<SelectOutcome>>,
}

/// Shared registry of open prompts, correlation id -> pending state.
#[derive(Clone, Default)]
pub struct SelectRegistry {
    inner: Arc<Mutex<HashMap<String, PendingSelect>>>,
}

impl SelectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open prompts.
    pub fn open_count(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Open a prompt for `invoker_id` over `candidates`.
    ///
    /// Returns the correlation id to embed in callback data and the receiver
    /// the orchestrator awaits.
    pub fn open(
        &self,
        invoker_id: i64,
        candidates: Vec<Member>,
        timeout: Duration,
    ) -> (String, oneshot::Receiver<SelectOutcome>) {
        let correlation_id = ulid::Ulid::new().to_string();
        let (tx, rx) = oneshot::channel();

        let pending = PendingSelect {
            invoker_id,
            candidates,
            expires_at: now_millis() + timeout.as_millis() as i64,
            tx: Some(tx),
        };

        let mut prompts = self.inner.lock().unwrap();
        prompts.insert(correlation_id.clone(), pending);
        tracing::debug!("Opened prompt {} for invoker {}", correlation_id, invoker_id);

        (correlation_id, rx)
    }

    /// Deliver a response to an open prompt.
    ///
    /// Returns true if this response resolved the prompt. Responses from
    /// anyone but the invoker, responses to unknown or already-resolved
    /// prompts, and out-of-range indices are all silently ignored — an
    /// expected race, not a fault.
    pub fn respond(&self, correlation_id: &str, responder_id: i64, choice: Choice) -> bool {
        let mut prompts = self.inner.lock().unwrap();

        let Some(pending) = prompts.get_mut(correlation_id) else {
            tracing::debug!("Stale response to prompt {}", correlation_id);
            return false;
        };

        if pending.invoker_id != responder_id {
            tracing::debug!(
                "Ignoring response to prompt {} from non-invoker {}",
                correlation_id,
                responder_id
            );
            return false;
        }

        let outcome = match choice {
            Choice::Cancel => SelectOutcome::Cancelled,
            Choice::Index(i) => match pending.candidates.get(i) {
                Some(member) => SelectOutcome::Chosen(member.clone()),
                None => return false,
            },
        };

        // First valid response takes the sender; anything after is a no-op.
        let Some(tx) = pending.tx.take() else {
            return false;
        };

        prompts.remove(correlation_id);
        // The waiter may have timed out and dropped its receiver already.
        let _ = tx.send(outcome);
        true
    }

    /// Await the outcome of a prompt, expiring it after `timeout`.
    ///
    /// No registry lock is held across the await. On expiry the entry is
    /// dropped from the registry, so a selection racing the timeout either
    /// wins cleanly or is discarded as stale.
    pub async fn wait(
        &self,
        correlation_id: &str,
        rx: oneshot::Receiver<SelectOutcome>,
        timeout: Duration,
    ) -> SelectOutcome {
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            // Sender dropped: entry was swept, treat as expiry.
            Ok(Err(_)) => SelectOutcome::Expired,
            Err(_) => {
                self.inner.lock().unwrap().remove(correlation_id);
                tracing::debug!("Prompt {} expired", correlation_id);
                SelectOutcome::Expired
            }
        }
    }

    /// Drop an open prompt without resolving it.
    ///
    /// Used when the prompt could not be presented; any response that
    /// arrives afterwards is stale.
    pub fn close(&self, correlation_id: &str) {
        if self.inner.lock().unwrap().remove(correlation_id).is_some() {
            tracing::debug!("Closed prompt {}", correlation_id);
        }
    }

    /// Drop entries past their expiry, returning how many were removed.
    ///
    /// The waiting task normally cleans up after itself; the sweep covers
    /// prompts abandoned without a waiter so the registry stays bounded.
    pub fn sweep_expired(&self) -> usize {
        let now = now_millis();
        let mut prompts = self.inner.lock().unwrap();
        let before = prompts.len();
        prompts.retain(|_, p| p.expires_at > now);
        before - prompts.len()
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
