//! Shared in-memory playback queue for tinywax.
#![allow(dead_code)]
//!
//! One process-wide queue of tracks, each owned by the sender who queued it.
//! Command handlers and the playback side all go through `TrackQueue`, so
//! every mutation happens in a single pass under the queue lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// A queued track.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Track {
    /// Unique ID (ULID)
    pub id: String,

    /// Sender ID of whoever queued the track.
    pub owner_id: i64,

    /// Display name of the owner at queue time.
    pub owner_name: String,

    /// Track title.
    pub title: String,

    /// When queued (unix millis)
    pub queued_at: i64,
}

impl Track {
    /// Create a new track with current timestamp.
    pub fn new(owner_id: i64, owner_name: &str, title: &str) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            owner_id,
            owner_name: owner_name.to_string(),
            title: title.to_string(),
            queued_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Shared, cloneable handle to the process-wide queue.
#[derive(Clone, Default)]
pub struct TrackQueue {
    inner: Arc<Mutex<Vec<Track>>>,
}

impl TrackQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track at the end of the queue.
    pub fn push(&self, track: Track) {
        let mut queue = self.inner.lock().unwrap();
        tracing::debug!("Queued track {} for owner {}", track.id, track.owner_id);
        queue.push(track);
    }

    /// Number of queued tracks.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Remove every track owned by `owner_id`, returning how many were removed.
    ///
    /// A single retain pass under the lock: no reader can observe a
    /// partially-filtered queue, the count is exactly what this call removed,
    /// and the relative order of surviving tracks is unchanged. Removing for
    /// an owner with nothing queued returns 0.
    pub fn remove_all_by_owner(&self, owner_id: i64) -> usize {
        let mut queue = self.inner.lock().unwrap();
        let before = queue.len();
        queue.retain(|t| t.owner_id != owner_id);
        let removed = before - queue.len();
        if removed > 0 {
            tracing::info!("Removed {} track(s) owned by {}", removed, owner_id);
        }
        removed
    }

    /// Snapshot of the queue contents, in order.
    pub fn snapshot(&self) -> Vec<Track> {
        self.inner.lock().unwrap().clone()
    }

    /// Tracks queued per owner.
    pub fn owner_counts(&self) -> HashMap<i64, usize> {
        let queue = self.inner.lock().unwrap();
        let mut counts = HashMap::new();
        for track in queue.iter() {
            *counts.entry(track.owner_id).or_insert(0) += 1;
        }
        counts
    }
}
