//! Sync queue entry types.
//!
//! Queue entries are persisted under the `sync_queue` storage key as a JSON
//! array and survive app restarts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wildflower_core::PostId;

use crate::api::types::NewPost;

/// Storage key holding the persisted queue.
pub const SYNC_QUEUE_KEY: &str = "sync_queue";

/// Number of failures after which an item is dropped permanently.
pub const MAX_SYNC_FAILURES: u32 = 3;

/// A write action that can be deferred and replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SyncAction {
    /// Create a comment on a post.
    Comment {
        /// Post being commented on.
        post_id: PostId,
        /// Comment text.
        content: String,
    },
    /// Toggle the like state of a post.
    Like {
        /// Post being liked.
        post_id: PostId,
    },
    /// Publish a new post.
    Post {
        /// The post payload.
        #[serde(flatten)]
        post: NewPost,
    },
}

/// Discriminant of a [`SyncAction`], used for queue deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncActionKind {
    Comment,
    Like,
    Post,
}

impl SyncAction {
    /// The action's kind.
    #[must_use]
    pub const fn kind(&self) -> SyncActionKind {
        match self {
            Self::Comment { .. } => SyncActionKind::Comment,
            Self::Like { .. } => SyncActionKind::Like,
            Self::Post { .. } => SyncActionKind::Post,
        }
    }
}

/// A queued action awaiting replay.
///
/// Uniqueness is per `(id, kind)`: re-enqueueing an equivalent action
/// updates the existing entry's payload and timestamp instead of
/// duplicating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueueItem {
    /// Caller-chosen identity (e.g. the post ID for a like).
    pub id: String,
    /// The deferred action.
    #[serde(flatten)]
    pub action: SyncAction,
    /// When the item was (last) enqueued.
    pub enqueued_at: DateTime<Utc>,
    /// Failures so far. The item is dropped when this reaches
    /// [`MAX_SYNC_FAILURES`].
    pub retry_count: u32,
}

impl SyncQueueItem {
    /// Create a fresh entry with a zero retry count.
    #[must_use]
    pub fn new(id: impl Into<String>, action: SyncAction) -> Self {
        Self {
            id: id.into(),
            action,
            enqueued_at: Utc::now(),
            retry_count: 0,
        }
    }

    /// Whether this entry has the same `(id, kind)` identity as another
    /// enqueue request.
    #[must_use]
    pub fn same_identity(&self, id: &str, kind: SyncActionKind) -> bool {
        self.id == id && self.action.kind() == kind
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_id_plus_kind() {
        let item = SyncQueueItem::new(
            "post-1",
            SyncAction::Like {
                post_id: PostId::new("post-1"),
            },
        );

        assert!(item.same_identity("post-1", SyncActionKind::Like));
        assert!(!item.same_identity("post-1", SyncActionKind::Comment));
        assert!(!item.same_identity("post-2", SyncActionKind::Like));
    }

    #[test]
    fn test_queue_item_serde_roundtrip() {
        let item = SyncQueueItem::new(
            "c-1",
            SyncAction::Comment {
                post_id: PostId::new("post-1"),
                content: "lovely".to_string(),
            },
        );

        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains(r#""type":"comment""#));
        assert!(json.contains(r#""retryCount":0"#));

        let back: SyncQueueItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }
}
